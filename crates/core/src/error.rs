use serde::{Deserialize, Serialize};

/// Numeric diagnostic codes. The numbering follows the one mainstream
/// structural type checkers use, so an annotated sample reads the same
/// whichever oracle checks it.
pub mod codes {
    pub const UNTERMINATED_LITERAL: u32 = 1002;
    pub const TOKEN_EXPECTED: u32 = 1005;
    pub const INVALID_CHARACTER: u32 = 1127;
    pub const DUPLICATE_IDENTIFIER: u32 = 2300;
    pub const CANNOT_FIND_NAME: u32 = 2304;
    pub const NOT_ASSIGNABLE: u32 = 2322;
    pub const NO_SUCH_METHOD: u32 = 2339;
    pub const ARGUMENT_NOT_ASSIGNABLE: u32 = 2345;
    pub const NOT_CALLABLE: u32 = 2349;
    pub const UNKNOWN_LITERAL_MEMBER: u32 = 2353;
    pub const REDECLARED_VARIABLE: u32 = 2451;
    pub const CIRCULAR_ALIAS: u32 = 2456;
    pub const ARGUMENT_COUNT: u32 = 2554;
    pub const ASSIGN_TO_CONST: u32 = 2588;
    pub const TOO_COMPLEX: u32 = 2590;
    pub const MISSING_MEMBERS: u32 = 2739;
    pub const MISSING_MEMBER: u32 = 2741;
    pub const NO_OVERLOAD_MATCHES: u32 = 2769;
}

/// A static diagnostic: something the checker refuses to accept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    /// 1-based line the diagnostic is reported against.
    pub line: u32,
    pub code: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(file: &str, line: u32, code: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            file: file.to_owned(),
            line,
            code,
            message: message.into(),
        }
    }

    pub fn parse(file: &str, line: u32, message: impl Into<String>) -> Self {
        Diagnostic::new(file, line, codes::TOKEN_EXPECTED, message)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({}): error ts{}: {}",
            self.file, self.line, self.code, self.message
        )
    }
}
