use thiserror::Error;

/// Errors raised parsing a `birdc show ospf state all` dump.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OspfParseError {
    /// A top-level line was neither `area <id>` nor `other ASBRs`.
    #[error("expected 'area <id>' or 'other ASBRs', got: {line}")]
    UnexpectedTopLevel {
        /// The offending line, indentation stripped.
        line: String,
    },

    /// A line inside an area/ASBR block wasn't a `router <id>` header.
    #[error("expected 'router <id>', got: {line}")]
    ExpectedRouterHeader {
        /// The offending line, indentation stripped.
        line: String,
    },

    /// A typed entry line (`distance`, `vlink`, ...) didn't match the
    /// `<keyword> <value> [metric <m>] ...` shape its keyword requires.
    #[error("malformed '{keyword}' entry: {line}")]
    MalformedEntry {
        /// The keyword that introduced the line.
        keyword: &'static str,
        /// The offending line, indentation stripped.
        line: String,
    },

    /// A numeric field failed to parse.
    #[error("invalid number in '{context}': {value}")]
    InvalidNumber {
        /// What was being parsed when the failure occurred.
        context: &'static str,
        /// The text that failed to parse as a number.
        value: String,
    },
}
