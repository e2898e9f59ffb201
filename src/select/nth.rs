use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// An `An+B` formula, as used by `:nth-child` and friends.
///
/// The formula's `B` is 1-based, as in CSS, but [`Nth::matches`] takes 0-based indexes: `:nth-child(1)` matches the
/// child at index 0.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Nth {
    step: i64,
    offset: i64,
}

/// An `nth-*` argument that isn't a valid formula.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[error("n-th rule couldn't be parsed ({0:?})")]
pub struct FormulaError(String);

/// Parses `text` and returns a predicate over 0-based indexes.
///
/// ```
/// let nth = treeq::select::compile_nth("2n+1").unwrap();
/// let matched: Vec<_> = (0..6).filter(|&i| nth(i)).collect();
/// assert_eq!(matched, [0, 2, 4]);
/// ```
pub fn compile_nth(text: &str) -> Result<impl Fn(usize) -> bool, FormulaError> {
    let nth = Nth::parse(text)?;
    Ok(move |index| nth.matches(index))
}

impl Nth {
    pub fn new(step: i64, offset: i64) -> Self {
        Self { step, offset }
    }

    /// Parses `even`, `odd`, `An+B` or `B`, case-insensitively and ignoring surrounding whitespace.
    pub fn parse(text: &str) -> Result<Self, FormulaError> {
        let normalized = text.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "even" => return Ok(Self::new(2, 0)),
            "odd" => return Ok(Self::new(2, 1)),
            _ => {}
        }
        let error = || FormulaError(text.to_string());
        let mut scanner = Scanner {
            bytes: normalized.as_bytes(),
            pos: 0,
        };

        let mut sign = scanner.sign();
        let mut number = scanner.number().map_err(|_| error())?;
        let mut step = 0;
        if scanner.peek() == Some(b'n') {
            scanner.pos += 1;
            step = sign * number.unwrap_or(1);
            scanner.skip_whitespace();
            if scanner.peek().is_some() {
                if !matches!(scanner.peek(), Some(b'+' | b'-')) {
                    return Err(error());
                }
                sign = scanner.sign();
                scanner.skip_whitespace();
                number = scanner.number().map_err(|_| error())?;
            } else {
                sign = 1;
                number = Some(0);
            }
        }
        match number {
            Some(number) if scanner.peek().is_none() => Ok(Self::new(step, sign * number)),
            _ => Err(error()),
        }
    }

    /// `A`
    pub fn step(&self) -> i64 {
        self.step
    }

    /// `B`
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Whether the formula selects the given 0-based index.
    pub fn matches(&self, index: usize) -> bool {
        let Ok(index) = i64::try_from(index) else {
            return false;
        };
        let step = self.step;
        let start = self.offset - 1;
        if start < 0 && step <= 0 {
            return false;
        }
        match step {
            -1 => index <= start,
            0 => index == start,
            1 => start < 0 || index >= start,
            _ => {
                let modulus = step.abs();
                let remainder = start.rem_euclid(modulus);
                let in_range = if step > 1 { index >= start } else { index <= start };
                in_range && index.rem_euclid(modulus) == remainder
            }
        }
    }
}

impl FromStr for Nth {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for Nth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.step, self.offset) {
            (0, offset) => write!(f, "{offset}"),
            (step, 0) => write!(f, "{step}n"),
            (step, offset) if offset < 0 => write!(f, "{step}n{offset}"),
            (step, offset) => write!(f, "{step}n+{offset}"),
        }
    }
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Scanner<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn sign(&mut self) -> i64 {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                -1
            }
            Some(b'+') => {
                self.pos += 1;
                1
            }
            _ => 1,
        }
    }

    /// Reads a run of digits: `Ok(None)` if there are none, `Err` if they overflow.
    fn number(&mut self) -> Result<Option<i64>, ()> {
        let start = self.pos;
        let mut value: i64 = 0;
        while let Some(digit @ b'0'..=b'9') = self.peek() {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(i64::from(digit - b'0')))
                .ok_or(())?;
            self.pos += 1;
        }
        Ok((self.pos != start).then_some(value))
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r' | b'\x0C')) {
            self.pos += 1;
        }
    }
}
