//! CLI command implementations
//!
//! Commands return the process exit code:
//! `0` success, `2` configuration or validation error, `3` access denied,
//! `4` upstream dependency failure, `5` anything else.

pub mod everything;
pub mod hash;
pub mod providers;
pub mod validate;

use crate::domain::ErrorKind;

/// Maps a gateway error kind to the process exit code
pub fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Validation | ErrorKind::Configuration => 2,
        ErrorKind::Unauthorized | ErrorKind::Forbidden => 3,
        ErrorKind::Dependency => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ErrorKind::Validation, 2)]
    #[test_case(ErrorKind::Configuration, 2)]
    #[test_case(ErrorKind::Unauthorized, 3)]
    #[test_case(ErrorKind::Forbidden, 3)]
    #[test_case(ErrorKind::Dependency, 4)]
    #[test_case(ErrorKind::Cancelled, 5)]
    #[test_case(ErrorKind::Service, 5)]
    fn test_exit_code(kind: ErrorKind, expected: i32) {
        assert_eq!(exit_code(kind), expected);
    }
}
