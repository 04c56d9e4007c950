use std::io;

use lazy_static::lazy_static;
use regex::Regex;

use crate::command::{run_cmd, CmdOutput};
use crate::config::{AdbConfig, Config};
use crate::Context;

/// The Adb trait just abstracts the `adb` commands needed to drive a device
/// through an odsign test run
pub trait Adb: Send + Sync {
    fn get_connected_devices(&self) -> crate::Result<Vec<String>>;

    /// Stage the given APEX files with `adb install-multi-apex`
    ///
    /// The APEXes only become active after a reboot.
    fn install_multi_apex(&self, apexes: &[String]) -> io::Result<CmdOutput>;

    /// Uninstall the given package
    fn uninstall(&self, package: &str) -> crate::Result<()>;

    /// Essentially the same as running `adb shell '...'`
    ///
    /// The returned status is the exit status of the command on the device.
    fn shell(&self, shell_cmd: &str) -> io::Result<CmdOutput>;

    /// Same as `adb root`
    fn root(&self) -> io::Result<CmdOutput>;

    /// Same as `adb unroot`
    fn unroot(&self) -> io::Result<CmdOutput>;

    /// Same as `adb reboot`
    fn reboot(&self) -> io::Result<CmdOutput>;

    /// Same as `adb wait-for-device`, blocks until the device is reachable
    fn wait_for_device(&self) -> io::Result<CmdOutput>;

    /// Same as `adb get-state`, prints `device` when the device is online
    fn get_state(&self) -> io::Result<CmdOutput>;
}

lazy_static! {
    static ref DEVICE_NOT_FOUND: Regex =
        Regex::new(r"device\s+'([^']+)'\s+not\s+found").expect("valid regex");
}

/// Turns stderr written by the `adb` binary itself (as opposed to the command
/// run on the device) into an error, if it recognizes it.
pub fn adb_stderr_to_error(stderr: &str) -> Option<crate::Error> {
    if stderr.contains("no devices/emulators") {
        return Some(crate::Error::NoAdbDevice);
    }
    let caps = DEVICE_NOT_FOUND.captures(stderr)?;
    let serial = caps
        .get(1)
        .map(|m| String::from(m.as_str()))
        .unwrap_or_else(|| "?".into());
    Some(crate::Error::AdbDeviceNotFound(serial))
}

/// Parse the output of `adb devices -l` into the serials of the devices that
/// are online
pub fn parse_devices(output: &str) -> Vec<String> {
    output
        .lines()
        // Skip the "List of devices attached" header
        .skip(1)
        .filter_map(|l| {
            let mut split = l.split_ascii_whitespace();
            let serial = split.next()?;
            match split.next() {
                Some("device") => Some(serial.to_string()),
                _ => None,
            }
        })
        .collect()
}

#[derive(Clone)]
/// An `Adb` implementation that just invokes the external `adb` command.
pub struct ExecAdb {
    bin: String,
    serial: Option<String>,
}

impl ExecAdb {
    /// Creates a new `ExecAdb` from the given context.
    ///
    /// This will first check the project config file for:
    ///
    /// [adb]
    /// executable = "..."
    /// serial = "..."
    ///
    /// and fall back to the environment for anything missing from it.
    pub fn new(ctx: &dyn Context) -> crate::Result<Self> {
        match ctx.get_project_config()? {
            Some(cfg) => Self::try_from_config(ctx, cfg),
            None => Self::from_env(ctx),
        }
    }

    pub fn from_env(ctx: &dyn Context) -> crate::Result<Self> {
        let bin = ctx.get_bin("adb")?;
        let serial = ctx.maybe_get_env("ANDROID_SERIAL");

        Ok(Self { bin, serial })
    }

    pub fn has_serial(&self) -> bool {
        self.serial.is_some()
    }

    pub fn get_serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    pub fn with_serial(mut self, serial: String) -> Self {
        self.serial = Some(serial);
        self
    }

    fn try_from_config(ctx: &dyn Context, cfg: &Config) -> crate::Result<Self> {
        let adb = AdbConfig::from_config(cfg)?;
        let bin = match adb.executable {
            Some(v) => v,
            None => ctx.get_bin("adb")?,
        };
        let serial = adb.serial.or_else(|| ctx.maybe_get_env("ANDROID_SERIAL"));
        Ok(Self { bin, serial })
    }
}

macro_rules! adb_cmd {
    ($adb:ident, $cmd:literal $(, $args:expr)*) => {
        if let Some(ref serial) = $adb.serial {
            run_cmd(&$adb.bin, &["-s", serial, $cmd $(, $args)*])
        } else {
            run_cmd(&$adb.bin, &[$cmd $(, $args)*])
        }
    }
}

impl Adb for ExecAdb {
    /// Returns a list of all connected devices (similar to `adb devices -l`)
    fn get_connected_devices(&self) -> crate::Result<Vec<String>> {
        let output = run_cmd(&self.bin, &["devices", "-l"])?.err_on_status()?;
        let device_list = parse_devices(&output.stdout_utf8_lossy());

        if device_list.is_empty() {
            return Err(crate::Error::NoAdbDevice);
        }

        Ok(device_list)
    }

    fn install_multi_apex(&self, apexes: &[String]) -> io::Result<CmdOutput> {
        let mut args: Vec<&str> = Vec::with_capacity(apexes.len() + 3);
        if let Some(ref serial) = self.serial {
            args.push("-s");
            args.push(serial);
        }
        args.push("install-multi-apex");
        args.extend(apexes.iter().map(String::as_str));
        run_cmd(&self.bin, &args)
    }

    fn uninstall(&self, package: &str) -> crate::Result<()> {
        let out = adb_cmd!(self, "uninstall", package)?;
        // `adb uninstall` reports some failures on stdout with a zero status
        if out.stdout_contains("Failure") {
            let msg = out.stdout_utf8_lossy().trim().to_string();
            log::debug!("uninstall {} failed: {}", package, msg);
            return Err(crate::Error::CommandError(out.exit_code(), msg));
        }
        out.err_on_status().map(|_| ())
    }

    fn shell(&self, shell_cmd: &str) -> io::Result<CmdOutput> {
        adb_cmd!(self, "shell", shell_cmd)
    }

    fn root(&self) -> io::Result<CmdOutput> {
        adb_cmd!(self, "root")
    }

    fn unroot(&self) -> io::Result<CmdOutput> {
        adb_cmd!(self, "unroot")
    }

    fn reboot(&self) -> io::Result<CmdOutput> {
        adb_cmd!(self, "reboot")
    }

    fn wait_for_device(&self) -> io::Result<CmdOutput> {
        adb_cmd!(self, "wait-for-device")
    }

    fn get_state(&self) -> io::Result<CmdOutput> {
        adb_cmd!(self, "get-state")
    }
}
