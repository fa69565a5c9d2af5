use alloc::collections::TryReserveError;
use core::fmt;

/// What went wrong while reading a list from text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// Input ended where an element or an opening parenthesis was expected.
    UnexpectedEnd,
    /// A list did not start with `(`.
    MissingOpen { found: char },
    /// Input ended where `,` or `)` was expected.
    MissingClose,
    /// `)` or `,` appeared where an atom was expected.
    UnexpectedDelimiter { found: char },
    /// Two elements were not separated by `,`.
    MissingSeparator { found: char },
    /// Non-whitespace text followed the outermost list.
    TrailingInput { found: char },
    /// Lists were nested deeper than the reader allows.
    TooDeep { limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParseError {
    /// Byte offset into the input of the character that failed.
    pub position: usize,
    pub kind: ParseErrorKind,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd => f.write_str("unexpected end of input"),
            Self::MissingOpen { found } => write!(f, "expected '(' to open a list, found {found:?}"),
            Self::MissingClose => f.write_str("input ended before ')' closed the list"),
            Self::UnexpectedDelimiter { found } => {
                write!(f, "unexpected delimiter {found:?} where an atom was expected")
            }
            Self::MissingSeparator { found } => {
                write!(f, "expected ',' or ')' between elements, found {found:?}")
            }
            Self::TrailingInput { found } => {
                write!(f, "unexpected {found:?} after the end of the list")
            }
            Self::TooDeep { limit } => write!(f, "nesting exceeds the limit of {limit}"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at position {}: {}", self.position, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    Parse(ParseError),
    /// The heap could not provide another node.
    AllocationFailure,
    /// An element or head reference is stale or belongs to another list.
    InvalidReference,
    /// Pushing the list would make it contain itself.
    WouldCycle,
}

impl From<ParseError> for ListError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<TryReserveError> for ListError {
    fn from(_: TryReserveError) -> Self {
        Self::AllocationFailure
    }
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(error) => fmt::Display::fmt(error, f),
            Self::AllocationFailure => f.write_str("out of memory while allocating a list node"),
            Self::InvalidReference => {
                f.write_str("reference does not belong to a live element of this list")
            }
            Self::WouldCycle => f.write_str("a list cannot contain itself"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

#[cfg(feature = "std")]
impl std::error::Error for ListError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn parse_errors_render_position_and_reason() {
        let error = ListError::from(ParseError {
            position: 3,
            kind: ParseErrorKind::MissingSeparator { found: 'y' },
        });

        assert_eq!(
            error.to_string(),
            "parse error at position 3: expected ',' or ')' between elements, found 'y'"
        );
    }

    #[test]
    fn reserve_failure_is_allocation_failure() {
        let mut v = alloc::vec::Vec::<u64>::new();
        let error = v.try_reserve(usize::MAX).unwrap_err();

        assert_eq!(ListError::from(error), ListError::AllocationFailure);
    }
}
