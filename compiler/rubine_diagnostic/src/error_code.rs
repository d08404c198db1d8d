//! Error codes for all front-end diagnostics.
//!
//! Each error code is a unique identifier (e.g., `E4001`) with the first digit
//! indicating the phase. Used for `--explain` lookups and documentation.

use std::fmt;

/// Error codes for all front-end diagnostics.
///
/// Format: E#### where the first digit indicates the phase:
/// - E1xxx: Parser errors
/// - E4xxx: Desugar errors
/// - E9xxx: Internal errors
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Parser Errors (E1xxx)
    /// Unexpected token
    E1001,
    /// Expected expression
    E1002,
    /// Unclosed delimiter
    E1003,

    // Desugar Errors (E4xxx)
    /// Unsupported construct
    E4001,
    /// Invalid integer literal
    E4002,
    /// Invalid float literal
    E4003,
    /// Duplicate hash key
    E4004,
    /// Dynamic constant assignment
    E4005,
    /// Anonymous rest argument cannot be forwarded
    E4006,
    /// Unsupported rest position in destructuring
    E4007,
    /// Block argument not allowed with return/break/next
    E4008,
    /// Invalid singleton definition target
    E4009,
    /// Expression nesting too deep
    E4010,
    /// `yield` without a declared block parameter
    E4011,

    // Internal Errors (E9xxx)
    /// Internal front-end error
    E9001,
    /// Too many errors
    E9002,
}

impl ErrorCode {
    /// All error code variants, for exhaustive testing.
    ///
    /// Kept in sync with `as_str()` which is exhaustive (Rust match enforces
    /// it). When adding a new variant: add it to the enum, `as_str()`, and
    /// here. The `all_variants_classified` test catches any omission.
    pub const ALL: &[ErrorCode] = &[
        // Parser
        ErrorCode::E1001,
        ErrorCode::E1002,
        ErrorCode::E1003,
        // Desugar
        ErrorCode::E4001,
        ErrorCode::E4002,
        ErrorCode::E4003,
        ErrorCode::E4004,
        ErrorCode::E4005,
        ErrorCode::E4006,
        ErrorCode::E4007,
        ErrorCode::E4008,
        ErrorCode::E4009,
        ErrorCode::E4010,
        ErrorCode::E4011,
        // Internal
        ErrorCode::E9001,
        ErrorCode::E9002,
    ];

    /// Get the numeric code as a string (e.g., "E4001").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Parser
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            // Desugar
            ErrorCode::E4001 => "E4001",
            ErrorCode::E4002 => "E4002",
            ErrorCode::E4003 => "E4003",
            ErrorCode::E4004 => "E4004",
            ErrorCode::E4005 => "E4005",
            ErrorCode::E4006 => "E4006",
            ErrorCode::E4007 => "E4007",
            ErrorCode::E4008 => "E4008",
            ErrorCode::E4009 => "E4009",
            ErrorCode::E4010 => "E4010",
            ErrorCode::E4011 => "E4011",
            // Internal
            ErrorCode::E9001 => "E9001",
            ErrorCode::E9002 => "E9002",
        }
    }

    /// Check if this is a parser/syntax error (E1xxx range).
    pub fn is_parser_error(&self) -> bool {
        matches!(self, ErrorCode::E1001 | ErrorCode::E1002 | ErrorCode::E1003)
    }

    /// Check if this is a desugar error (E4xxx range).
    pub fn is_desugar_error(&self) -> bool {
        matches!(
            self,
            ErrorCode::E4001
                | ErrorCode::E4002
                | ErrorCode::E4003
                | ErrorCode::E4004
                | ErrorCode::E4005
                | ErrorCode::E4006
                | ErrorCode::E4007
                | ErrorCode::E4008
                | ErrorCode::E4009
                | ErrorCode::E4010
                | ErrorCode::E4011
        )
    }

    /// Check if this is an internal error (E9xxx range).
    pub fn is_internal_error(&self) -> bool {
        matches!(self, ErrorCode::E9001 | ErrorCode::E9002)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse an error code string like `"E4001"`.
///
/// Case-insensitive. Derived from [`ErrorCode::ALL`] and [`ErrorCode::as_str()`],
/// so it is automatically exhaustive.
impl std::str::FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        Self::ALL
            .iter()
            .find(|code| code.as_str() == upper)
            .copied()
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn all_variants_classified() {
        for code in ErrorCode::ALL {
            let classified = code.is_parser_error()
                || code.is_desugar_error()
                || code.is_internal_error();
            assert!(classified, "{code} belongs to no phase");
        }
    }

    #[test]
    fn as_str_matches_debug() {
        for code in ErrorCode::ALL {
            assert_eq!(code.as_str(), format!("{code:?}"));
        }
    }

    #[test]
    fn from_str_round_trips() {
        for code in ErrorCode::ALL {
            assert_eq!(code.as_str().parse(), Ok(*code));
            assert_eq!(code.as_str().to_lowercase().parse(), Ok(*code));
        }
        assert_eq!("E0000".parse::<ErrorCode>(), Err(()));
    }
}
