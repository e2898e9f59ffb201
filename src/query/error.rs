use pest::error::ErrorVariant;
use pest::Span;
use std::fmt::{Display, Formatter};

/// A selector string that couldn't be parsed.
///
/// The error keeps a [`DetachedSpan`] into the text that was parsed. Use [`ParseError::describe`] to get a
/// diagnostic that points at the offending spot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParseError {
    pub(crate) kind: ParseErrorKind,
    pub(crate) span: DetachedSpan,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum ParseErrorKind {
    #[error("expected {expected} but end of input reached")]
    UnexpectedEnd { expected: &'static str },
    #[error("expected {expected} but {found:?} found")]
    UnexpectedChar { expected: &'static str, found: char },
    #[error("rule expected after {0:?}")]
    RuleExpected(char),
    #[error("rule expected but {0:?} found")]
    TrailingInput(char),
    #[error("unterminated string; expected closing {0}")]
    UnterminatedString(char),
    #[error("invalid escape sequence: \\{0}")]
    InvalidEscape(String),
    #[error("expected identifier after {0:?}")]
    EmptyIdentifier(char),
    #[error("unknown operator {0:?}")]
    UnknownOperator(char),
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, span: DetachedSpan) -> Self {
        Self { kind, span }
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// Where in the selector text the error was found, in bytes.
    pub fn span(&self) -> DetachedSpan {
        self.span
    }

    /// Renders this error against the selector text it came from, with a caret pointing at the error.
    ///
    /// If the span doesn't fit `query_text` (because the error came from a different string), this falls back to
    /// just the message.
    pub fn describe(&self, query_text: &str) -> String {
        match Span::new(query_text, self.span.start, self.span.end) {
            None => self.kind.to_string(),
            Some(span) => {
                let pest_err = pest::error::Error::<()>::new_from_span(
                    ErrorVariant::CustomError {
                        message: self.kind.to_string(),
                    },
                    span,
                );
                pest_err.to_string()
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at byte {}", self.kind, self.span.start)
    }
}

/// Like a [pest::Span], but without a reference to the underlying `&str`, and thus cheaply Copyable.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Hash)]
pub struct DetachedSpan {
    pub start: usize,
    pub end: usize,
}

impl DetachedSpan {
    #[cfg(test)]
    pub(crate) fn at(pos: usize) -> Self {
        Self { start: pos, end: pos }
    }
}

impl From<Span<'_>> for DetachedSpan {
    fn from(value: Span) -> Self {
        Self {
            start: value.start(),
            end: value.end(),
        }
    }
}
