use crate::query::error::{DetachedSpan, ParseError, ParseErrorKind};
use std::fmt::Write;

/// A position within selector text, with single-character lookahead.
///
/// All positions are byte offsets that always sit on a char boundary.
pub(crate) struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub(crate) fn peek_is(&self, ch: char) -> bool {
        self.peek() == Some(ch)
    }

    #[cfg(test)]
    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    pub(crate) fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    pub(crate) fn advance_by(&mut self, bytes: usize) {
        self.pos = (self.pos + bytes).min(self.text.len());
    }

    /// Skips CSS whitespace, returning whether any was found.
    pub(crate) fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(is_whitespace) {
            self.advance();
        }
        self.pos != start
    }

    pub(crate) fn error_here(&self, kind: ParseErrorKind) -> ParseError {
        let end = match self.peek() {
            Some(ch) => self.pos + ch.len_utf8(),
            None => self.pos,
        };
        ParseError::new(kind, DetachedSpan { start: self.pos, end })
    }

    pub(crate) fn error_at(&self, start: usize, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, DetachedSpan { start, end: self.pos })
    }

    /// Reads an identifier, decoding escapes. May return an empty string.
    pub(crate) fn identifier(&mut self) -> Result<String, ParseError> {
        let mut result = String::new();
        while let Some(ch) = self.peek() {
            if is_ident(ch) {
                self.advance();
                result.push(ch);
            } else if ch == '\\' {
                let escape_start = self.pos;
                self.advance();
                match self.peek() {
                    None => {
                        return Err(self.error_here(ParseErrorKind::UnexpectedEnd {
                            expected: "escaped character",
                        }))
                    }
                    Some(escaped) if is_ident_special(escaped) || !escaped.is_ascii_hexdigit() => {
                        self.advance();
                        result.push(escaped);
                    }
                    Some(_) => result.push(self.hex_escape(escape_start)?),
                }
            } else {
                break;
            }
        }
        Ok(result)
    }

    /// Reads a quoted string. The cursor must be on the opening quote.
    pub(crate) fn quoted_string(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let Some(quote) = self.advance() else {
            return Err(self.error_here(ParseErrorKind::UnexpectedEnd { expected: "string" }));
        };
        let mut result = String::new();
        loop {
            let Some(ch) = self.advance() else {
                return Err(self.error_at(start, ParseErrorKind::UnterminatedString(quote)));
            };
            if ch == quote {
                return Ok(result);
            }
            if ch != '\\' {
                result.push(ch);
                continue;
            }
            let escape_start = self.pos - 1;
            match self.peek() {
                None => return Err(self.error_at(start, ParseErrorKind::UnterminatedString(quote))),
                Some(hex) if hex.is_ascii_hexdigit() && short_escape(hex, quote).is_none() => {
                    result.push(self.hex_escape(escape_start)?);
                }
                Some(escaped) => {
                    self.advance();
                    result.push(short_escape(escaped, quote).unwrap_or(escaped));
                }
            }
        }
    }

    /// Reads an unquoted value up to (but not including) `terminator`, decoding identifier-style escapes and trimming
    /// unescaped whitespace at both ends.
    pub(crate) fn unquoted_until(&mut self, terminator: char) -> Result<String, ParseError> {
        let mut result = String::new();
        let mut significant_len = 0;
        while let Some(ch) = self.peek() {
            if ch == terminator {
                break;
            }
            if ch == '\\' {
                let escape_start = self.pos;
                self.advance();
                match self.peek() {
                    None => {
                        return Err(self.error_here(ParseErrorKind::UnexpectedEnd {
                            expected: "escaped character",
                        }))
                    }
                    Some(hex) if hex.is_ascii_hexdigit() => result.push(self.hex_escape(escape_start)?),
                    Some(escaped) => {
                        self.advance();
                        result.push(escaped);
                    }
                }
                significant_len = result.len();
            } else {
                self.advance();
                if !(result.is_empty() && is_whitespace(ch)) {
                    result.push(ch);
                    if !is_whitespace(ch) {
                        significant_len = result.len();
                    }
                }
            }
        }
        result.truncate(significant_len);
        Ok(result)
    }

    /// Decodes `HHHHHH ` (the backslash has already been consumed), combining a UTF-16 surrogate pair if one is
    /// written as two consecutive escapes.
    fn hex_escape(&mut self, escape_start: usize) -> Result<char, ParseError> {
        let high = self.hex_code_point();
        if (0xD800..=0xDBFF).contains(&high) {
            let rest = self.rest();
            if rest.starts_with('\\') && rest[1..].starts_with(|c: char| c.is_ascii_hexdigit()) {
                let checkpoint = self.pos;
                self.advance();
                let low = self.hex_code_point();
                if (0xDC00..=0xDFFF).contains(&low) {
                    let combined = ((high - 0xD800) << 10) + (low - 0xDC00) + 0x10000;
                    return self.code_point_to_char(combined, escape_start);
                }
                self.pos = checkpoint;
            }
        }
        self.code_point_to_char(high, escape_start)
    }

    fn hex_code_point(&mut self) -> u32 {
        let mut code_point = 0u32;
        let mut digits = 0;
        while digits < 6 {
            let Some(digit) = self.peek().and_then(|ch| ch.to_digit(16)) else {
                break;
            };
            self.advance();
            code_point = code_point * 16 + digit;
            digits += 1;
        }
        if self.peek_is(' ') {
            self.advance();
        }
        code_point
    }

    fn code_point_to_char(&self, code_point: u32, escape_start: usize) -> Result<char, ParseError> {
        char::from_u32(code_point).ok_or_else(|| {
            self.error_at(
                escape_start,
                ParseErrorKind::InvalidEscape(self.text[escape_start + 1..self.pos].trim_end().to_string()),
            )
        })
    }
}

pub(crate) fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

pub(crate) fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '-' || ch == '_'
}

pub(crate) fn is_ident(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn is_ident_special(ch: char) -> bool {
    matches!(
        ch,
        '!' | '"'
            | '#'
            | '$'
            | '%'
            | '&'
            | '\''
            | '('
            | ')'
            | '*'
            | '+'
            | ','
            | '.'
            | '/'
            | ';'
            | '<'
            | '='
            | '>'
            | '?'
            | '@'
            | '['
            | '\\'
            | ']'
            | '^'
            | '`'
            | '{'
            | '|'
            | '}'
            | '~'
    )
}

/// The short escapes allowed within a string quoted by `quote`.
fn short_escape(ch: char, quote: char) -> Option<char> {
    match ch {
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'f' => Some('\x0C'),
        '\\' => Some('\\'),
        _ if ch == quote => Some(quote),
        _ => None,
    }
}

/// Escapes `ident` so that it reads back as a single identifier.
pub(crate) fn escape_identifier(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    for (i, ch) in ident.chars().enumerate() {
        if is_ident_special(ch) {
            out.push('\\');
            out.push(ch);
        } else if ch == '_' || ch == '-' || ch.is_ascii_alphabetic() || (i != 0 && ch.is_ascii_digit()) {
            out.push(ch);
        } else {
            let _ = write!(out, "\\{:x} ", u32::from(ch));
        }
    }
    out
}

/// Escapes `text` as a double-quoted string.
pub(crate) fn escape_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0C' => out.push_str("\\f"),
            // Always six digits, so the escape can't be read back as a short escape like `\f`.
            ch if ch.is_control() => {
                let _ = write!(out, "\\{:06x} ", u32::from(ch));
            }
            ch => out.push(ch),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    mod identifiers {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn plain() {
            check_identifier("hello-world_2 rest", "hello-world_2", " rest");
        }

        #[test]
        fn escaped_special() {
            check_identifier(r"a\.b.c", "a.b", ".c");
        }

        #[test]
        fn hex_escape_with_trailing_space() {
            check_identifier(r"snow\2603 man", "snow☃man", "");
        }

        #[test]
        fn hex_escape_without_trailing_space() {
            check_identifier(r"\31 23", "123", "");
        }

        #[test]
        fn surrogate_pair() {
            check_identifier(r"\d83d\de00", "😀", "");
        }

        #[test]
        fn lone_surrogate() {
            let mut cursor = Cursor::new(r"\d83d");
            let err = cursor.identifier().unwrap_err();
            assert_eq!(err.kind(), &ParseErrorKind::InvalidEscape("d83d".to_string()));
        }

        #[test]
        fn escape_at_end() {
            let mut cursor = Cursor::new(r"abc\");
            let err = cursor.identifier().unwrap_err();
            assert_eq!(
                err.kind(),
                &ParseErrorKind::UnexpectedEnd {
                    expected: "escaped character"
                }
            );
        }

        fn check_identifier(input: &str, expect: &str, remaining: &str) {
            let mut cursor = Cursor::new(input);
            assert_eq!(cursor.identifier().unwrap(), expect);
            assert_eq!(cursor.rest(), remaining);
        }
    }

    mod strings {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn double_quoted() {
            check_string(r#""hello"X"#, "hello", "X");
        }

        #[test]
        fn single_quoted_with_other_quote() {
            check_string(r#"'it"s'"#, "it\"s", "");
        }

        #[test]
        fn short_escapes() {
            check_string(r#""a\nb\tc\\d\"e""#, "a\nb\tc\\d\"e", "");
        }

        #[test]
        fn single_quote_escape_in_double_quotes_is_literal() {
            check_string(r#""a\'b""#, "a'b", "");
        }

        #[test]
        fn hex_escape() {
            check_string(r#""snow\2603 man""#, "snow☃man", "");
        }

        #[test]
        fn unterminated() {
            let mut cursor = Cursor::new(r#""hello"#);
            let err = cursor.quoted_string().unwrap_err();
            assert_eq!(err.kind(), &ParseErrorKind::UnterminatedString('"'));
        }

        fn check_string(input: &str, expect: &str, remaining: &str) {
            let mut cursor = Cursor::new(input);
            assert_eq!(cursor.quoted_string().unwrap(), expect);
            assert_eq!(cursor.rest(), remaining);
        }
    }

    mod unquoted {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn trims_unescaped_whitespace() {
            let mut cursor = Cursor::new("  2n + 1  )");
            assert_eq!(cursor.unquoted_until(')').unwrap(), "2n + 1");
            assert_eq!(cursor.rest(), ")");
        }

        #[test]
        fn keeps_escaped_whitespace() {
            let mut cursor = Cursor::new(r"a\20 )");
            assert_eq!(cursor.unquoted_until(')').unwrap(), "a ");
        }
    }

    mod escaping {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn identifier_specials() {
            assert_eq!(escape_identifier("a.b#c"), r"a\.b\#c");
        }

        #[test]
        fn identifier_leading_digit() {
            assert_eq!(escape_identifier("1a2"), r"\31 a2");
        }

        #[test]
        fn identifier_space_and_unicode() {
            assert_eq!(escape_identifier("a b☃"), r"a\20 b\2603 ");
        }

        #[test]
        fn identifier_round_trip() {
            for original in ["a.b", "1a2", "a b☃", "😀x", "2n+1"] {
                let escaped = escape_identifier(original);
                let mut cursor = Cursor::new(&escaped);
                assert_eq!(cursor.identifier().unwrap(), original);
                assert!(cursor.is_at_end());
            }
        }

        #[test]
        fn string_escapes() {
            assert_eq!(escape_str("a\"b\\c\nd\x0Be"), r#""a\"b\\c\nd\00000b e""#);
        }

        #[test]
        fn string_round_trip() {
            let original = "a\"b\\c\nd\x0Be\tf";
            let escaped = escape_str(original);
            assert_eq!(Cursor::new(&escaped).quoted_string().unwrap(), original);
        }

        #[test]
        fn string_round_trip_all_controls() {
            for ch in (0..=0x9Fu32).filter_map(char::from_u32).filter(|ch| ch.is_control()) {
                let original = format!("a{ch}b {ch}");
                let escaped = escape_str(&original);
                let mut cursor = Cursor::new(&escaped);
                assert_eq!(cursor.quoted_string().unwrap(), original, "U+{:04X} as {escaped}", u32::from(ch));
                assert_eq!(cursor.rest(), "");
            }
        }
    }
}
