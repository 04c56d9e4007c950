use std::io;
use std::path::Path;

use thiserror::Error;

use crate::utils::path_must_str;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("required binary `{0}` not available to context")]
    MissingBin(String),

    #[error("{0}")]
    IO(io::Error),

    #[error("command failed with status {0}: {1}")]
    CommandError(i32, String),

    #[error("no adb device connected")]
    NoAdbDevice,
    #[error("adb device {0} not found")]
    AdbDeviceNotFound(String),

    /// A device check did not hold, the calling test should fail
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// A precondition of the calling test isn't met, the test should be
    /// skipped instead of failed
    #[error("skipped: {0}")]
    Skipped(String),

    #[error("invalid apex file {0}: {1}")]
    InvalidApex(String, String),

    #[error("generic error: {0}")]
    Generic(String),

    #[error("invalid config {0}: {1}")]
    InvalidConfig(String, String),

    #[error("file {0} doesn't exist")]
    MissingFile(String),
}

impl Error {
    pub fn new_cfg<S: ToString + ?Sized>(path: &Path, s: &S) -> Self {
        let as_str = path_must_str(path);
        Self::InvalidConfig(as_str.into(), s.to_string())
    }

    pub fn new_apex<S: ToString + ?Sized>(path: &Path, s: &S) -> Self {
        Self::InvalidApex(path_must_str(path).into(), s.to_string())
    }

    /// True if this error means the test should be skipped
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::IO(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Generic(value.to_string())
    }
}

/// Returns an [Error::Assertion] from the current function unless the
/// condition holds.
#[macro_export]
macro_rules! check {
    ($cond:expr, $($msg:tt)+) => {
        if !($cond) {
            return Err($crate::Error::Assertion(format!($($msg)+)));
        }
    };
}

/// Returns an [Error::Skipped] from the current function unless the
/// condition holds.
#[macro_export]
macro_rules! assume {
    ($cond:expr, $($msg:tt)+) => {
        if !($cond) {
            return Err($crate::Error::Skipped(format!($($msg)+)));
        }
    };
}

#[cfg(test)]
mod test {
    use super::*;

    fn checked(v: usize) -> Result<usize> {
        check!(v == 3, "expected 3, got {}", v);
        Ok(v)
    }

    fn assumed(ok: bool) -> Result<()> {
        assume!(ok, "not supported");
        Ok(())
    }

    #[test]
    fn test_check_macro() {
        assert_eq!(checked(3).unwrap(), 3);
        match checked(2) {
            Err(Error::Assertion(msg)) => assert_eq!(msg, "expected 3, got 2"),
            _ => panic!("expected an assertion error"),
        }
    }

    #[test]
    fn test_assume_macro() {
        assert!(assumed(true).is_ok());
        let err = assumed(false).unwrap_err();
        assert!(err.is_skip());
        assert_eq!(err.to_string(), "skipped: not supported");
    }
}
