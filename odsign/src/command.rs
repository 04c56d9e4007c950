use std::borrow::Cow;
use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::process::{Command, ExitStatus, Output};

use log::Level::Debug;
use log::{debug, log_enabled};

pub struct CmdOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CmdOutput {
    /// Converts to a `Result` object that is `Ok` only if the [ExitStatus] is
    /// success.
    pub fn err_on_status(self) -> crate::Result<Self> {
        if self.status.success() {
            return Ok(self);
        }

        Err(crate::Error::CommandError(
            self.exit_code(),
            self.stderr_utf8_lossy().to_string(),
        ))
    }

    /// The exit code of the process, or -1 if it was killed by a signal
    #[inline]
    pub fn exit_code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    #[inline]
    pub fn ok(&self) -> bool {
        self.status.success()
    }

    #[inline]
    pub fn stdout_contains(&self, needle: &str) -> bool {
        self.stdout_utf8_lossy().contains(needle)
    }

    #[inline]
    pub fn stderr_contains(&self, needle: &str) -> bool {
        self.stderr_utf8_lossy().contains(needle)
    }

    #[inline]
    pub fn stdout_utf8_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    #[inline]
    pub fn stderr_utf8_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

impl From<Output> for CmdOutput {
    fn from(output: Output) -> Self {
        Self {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// Same layout as a Tradefed `CommandResult`, so assertion messages carry the
/// full picture of what the device said.
impl fmt::Display for CmdOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CommandResult: exit code={}, out={}, err={}",
            self.exit_code(),
            self.stdout_utf8_lossy(),
            self.stderr_utf8_lossy()
        )
    }
}

pub fn run_cmd<C, S>(cmd: C, args: &[S]) -> io::Result<CmdOutput>
where
    C: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    if log_enabled!(Debug) {
        log_cmd(&cmd, args);
    }
    Command::new(cmd)
        .args(args)
        .output()
        .map(|output| output.into())
}

pub fn log_cmd<C, S>(cmd: &C, args: &[S])
where
    C: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    let nargs = args.len();
    if nargs > 0 {
        let mut args_string = String::new();
        for (i, e) in args.iter().enumerate() {
            args_string.push_str(&e.as_ref().to_string_lossy());
            if i < nargs - 1 {
                args_string.push(' ');
            }
        }
        debug!(
            "Running command: `{} {}`",
            cmd.as_ref().to_string_lossy(),
            args_string
        );
    } else {
        debug!("Running command: `{}`", cmd.as_ref().to_string_lossy());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    fn output(raw_status: i32, stdout: &str, stderr: &str) -> CmdOutput {
        CmdOutput {
            status: ExitStatus::from_raw(raw_status),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_err_on_status() {
        assert!(output(0, "fine", "").err_on_status().is_ok());

        // Exit code 1 is encoded in the high byte of the raw wait status
        match output(1 << 8, "", "no such file").err_on_status() {
            Err(crate::Error::CommandError(code, stderr)) => {
                assert_eq!(code, 1);
                assert_eq!(stderr, "no such file");
            }
            _ => panic!("expected a command error"),
        }
    }

    #[test]
    fn test_display() {
        let out = output(1 << 8, "abc\n", "oops");
        assert_eq!(
            out.to_string(),
            "CommandResult: exit code=1, out=abc\n, err=oops"
        );
    }
}
