use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use itertools::join;

use crate::adb::{adb_stderr_to_error, Adb};
use crate::check;
use crate::command::CmdOutput;
use crate::config::{DEFAULT_POLL_INTERVAL, REBOOT_OFFLINE_TIMEOUT};
use crate::utils::path_must_str;

/// How many times root state is re-checked after `adb root`/`adb unroot`
const ROOT_CHECK_ATTEMPTS: usize = 5;

/// Higher level operations on a device reachable through [Adb]
pub struct Device<A> {
    adb: A,
    poll_interval: Duration,
    offline_timeout: Duration,
}

/// Parse a property the way Android's `GetBoolProperty` does
pub fn parse_bool_prop(value: &str) -> Option<bool> {
    match value {
        "1" | "y" | "yes" | "on" | "true" => Some(true),
        "0" | "n" | "no" | "off" | "false" => Some(false),
        _ => None,
    }
}

impl<A: Adb> Device<A> {
    pub fn new(adb: A) -> Self {
        Self {
            adb,
            poll_interval: DEFAULT_POLL_INTERVAL,
            offline_timeout: REBOOT_OFFLINE_TIMEOUT,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_offline_timeout(mut self, offline_timeout: Duration) -> Self {
        self.offline_timeout = offline_timeout;
        self
    }

    /// Run a shell command and return everything about the result
    ///
    /// A non-zero exit status is not an error here, but `adb` failing to reach
    /// the device is.
    pub fn execute_shell_v2(&self, cmd: &str) -> crate::Result<CmdOutput> {
        let out = self.adb.shell(cmd)?;
        if !out.ok() {
            if let Some(e) = adb_stderr_to_error(&out.stderr_utf8_lossy()) {
                return Err(e);
            }
        }
        Ok(out)
    }

    /// Run a shell command and return its stdout, ignoring the exit status
    pub fn execute_shell(&self, cmd: &str) -> crate::Result<String> {
        let out = self.execute_shell_v2(cmd)?;
        Ok(out.stdout_utf8_lossy().into_owned())
    }

    pub fn get_property(&self, name: &str) -> crate::Result<Option<String>> {
        let out = self.execute_shell(&format!("getprop {}", name))?;
        let value = out.trim();
        if value.is_empty() {
            Ok(None)
        } else {
            Ok(Some(value.into()))
        }
    }

    pub fn get_boolean_property(&self, name: &str, default: bool) -> crate::Result<bool> {
        Ok(self
            .get_property(name)?
            .as_deref()
            .and_then(parse_bool_prop)
            .unwrap_or(default))
    }

    pub fn is_adb_root(&self) -> crate::Result<bool> {
        let out = self.execute_shell_v2("id -u")?;
        Ok(out.ok() && out.stdout_utf8_lossy().trim() == "0")
    }

    /// Restart adbd as root, returns whether adbd ended up running as root
    pub fn enable_adb_root(&self) -> crate::Result<bool> {
        if self.is_adb_root()? {
            return Ok(true);
        }
        log::info!("enabling adb root");
        let out = self.adb.root()?;
        if out.stdout_contains("cannot run as root") || out.stderr_contains("cannot run as root") {
            log::warn!("adb root refused: {}", out.stdout_utf8_lossy().trim());
            return Ok(false);
        }
        self.adb.wait_for_device()?;
        Ok(self.poll_root_state(true))
    }

    /// Restart adbd as the shell user, returns whether adbd ended up
    /// unprivileged
    pub fn disable_adb_root(&self) -> crate::Result<bool> {
        if !self.is_adb_root()? {
            return Ok(true);
        }
        log::info!("disabling adb root");
        self.adb.unroot()?;
        self.adb.wait_for_device()?;
        Ok(self.poll_root_state(false))
    }

    fn poll_root_state(&self, want_root: bool) -> bool {
        for attempt in 0..ROOT_CHECK_ATTEMPTS {
            // adbd may still be restarting, so failures here aren't fatal
            match self.is_adb_root() {
                Ok(is_root) if is_root == want_root => return true,
                Ok(_) => {}
                Err(e) => log::debug!("checking root state: {}", e),
            }
            if attempt + 1 < ROOT_CHECK_ATTEMPTS {
                thread::sleep(self.poll_interval);
            }
        }
        log::warn!(
            "adbd didn't switch to {} after {} checks",
            if want_root { "root" } else { "shell" },
            ROOT_CHECK_ATTEMPTS
        );
        false
    }

    fn is_online(&self) -> bool {
        match self.adb.get_state() {
            Ok(out) => out.ok() && out.stdout_utf8_lossy().trim() == "device",
            Err(_) => false,
        }
    }

    fn is_boot_complete(&self) -> bool {
        match self.get_property("dev.bootcomplete") {
            Ok(Some(v)) => v == "1",
            Ok(None) => false,
            Err(e) => {
                log::trace!("boot complete check failed: {}", e);
                false
            }
        }
    }

    /// Call `done` until it returns true or the timeout elapses
    fn poll_until<F: FnMut() -> bool>(&self, timeout: Duration, mut done: F) -> bool {
        let start = Instant::now();
        loop {
            if done() {
                return true;
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return false;
            }
            thread::sleep(self.poll_interval.min(timeout - elapsed));
        }
    }

    /// Reboot the device and wait for it to go offline
    ///
    /// This doesn't wait for the boot to finish, see
    /// [Device::wait_for_boot_complete].
    pub fn reboot(&self) -> crate::Result<()> {
        log::info!("rebooting device");
        self.adb.reboot()?.err_on_status()?;
        if !self.poll_until(self.offline_timeout, || !self.is_online()) {
            log::warn!(
                "device still online {:?} after reboot",
                self.offline_timeout
            );
        }
        Ok(())
    }

    /// Wait for `dev.bootcomplete` to be set, returns false on timeout
    pub fn wait_for_boot_complete(&self, timeout: Duration) -> bool {
        let done = self.poll_until(timeout, || self.is_boot_complete());
        if done {
            log::info!("boot complete");
        }
        done
    }

    /// Uninstall the given package, returning the failure message if there
    /// was one
    pub fn uninstall_package(&self, package: &str) -> Option<String> {
        match self.adb.uninstall(package) {
            Ok(()) => None,
            Err(e) => {
                log::warn!("failed to uninstall {}: {}", package, e);
                Some(e.to_string())
            }
        }
    }

    /// Stage the given APEXes, they're activated by the next reboot
    pub fn install_multi_apex(&self, apexes: &[PathBuf]) -> crate::Result<()> {
        let args: Vec<String> = apexes
            .iter()
            .map(|it| path_must_str(it).to_string())
            .collect();
        let out = self.adb.install_multi_apex(&args)?;
        check!(out.ok(), "Failed to install {}: {}", join(&args, ", "), out);
        Ok(())
    }
}
