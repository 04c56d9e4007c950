//! Checks that the artifacts odrefresh compiles into the ART APEX data
//! directory are the ones Zygote and system_server actually map.

use std::collections::BTreeSet;

use itertools::join;
use lazy_static::lazy_static;
use regex::Regex;

use crate::adb::Adb;
use crate::maps::{
    has_known_extension, mapped_artifacts, split_path_list, system_server_artifact_path,
    system_server_isa,
};
use crate::{assume, check, ApexInfo, Device, Settings, TestProperties};

pub const ART_APEX_DALVIK_CACHE_DIRNAME: &str = "/data/misc/apexdata/com.android.art/dalvik-cache";

pub const ZYGOTE_NAMES: &[&str] = &["zygote", "zygote64"];

pub const APP_ARTIFACT_EXTENSIONS: &[&str] = &[".art", ".odex", ".vdex"];
pub const BCP_ARTIFACT_EXTENSIONS: &[&str] = &[".art", ".oat", ".vdex"];

pub const ODREFRESH_COMPILATION_LOG: &str = "/data/misc/odrefresh/compilation-log.txt";

const TAG: &str = "odsign";
pub const WAS_ADB_ROOT_KEY: &str = "odsign:WAS_ADB_ROOT";
pub const ADB_ROOT_ENABLED_KEY: &str = "odsign:ADB_ROOT_ENABLED";

lazy_static! {
    static ref SINGLE_PID: Regex = Regex::new(r"^\d+$").expect("valid regex");
}

pub struct OdsignTestUtils<A> {
    device: Device<A>,
    settings: Settings,
}

impl<A: Adb> OdsignTestUtils<A> {
    pub fn new(device: Device<A>, settings: Settings) -> Self {
        Self { device, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Install the test ART APEX and reboot into it
    ///
    /// Skips when the device can't update APEXes.
    pub fn install_test_apex(&self) -> crate::Result<()> {
        assume!(
            self.device.get_boolean_property("ro.apex.updatable", false)?,
            "Updating APEX is not supported"
        );
        let apex = self.settings.find_test_file(&self.settings.test_apex)?;
        log::info!("[{}] installing {}", TAG, apex.to_string_lossy());
        self.device.install_multi_apex(&[apex])?;
        self.reboot()?;
        self.remove_compilation_log_to_avoid_backoff()
    }

    pub fn uninstall_test_apex(&self) -> crate::Result<()> {
        let apex = self.settings.find_test_file(&self.settings.test_apex)?;
        let info = ApexInfo::from_file(&apex)?;
        log::info!("[{}] uninstalling {}", TAG, info.name);
        self.device.uninstall_package(&info.name);
        self.remove_compilation_log_to_avoid_backoff()
    }

    /// The dalvik-cache files the given process maps, filtered with
    /// `grep_pattern`
    pub fn get_mapped_artifacts(
        &self,
        pid: &str,
        grep_pattern: &str,
    ) -> crate::Result<BTreeSet<String>> {
        let grep_command = format!("grep \"{}\" /proc/{}/maps", grep_pattern, pid);
        let result = self.device.execute_shell_v2(&grep_command)?;
        check!(result.ok(), "{}", result);
        Ok(mapped_artifacts(
            &result.stdout_utf8_lossy(),
            ART_APEX_DALVIK_CACHE_DIRNAME,
        ))
    }

    /// Returns the mapped artifacts of the Zygote process, or `None` if the
    /// process does not exist.
    pub fn get_zygote_loaded_artifacts(
        &self,
        zygote_name: &str,
    ) -> crate::Result<Option<BTreeSet<String>>> {
        let result = self
            .device
            .execute_shell_v2(&format!("pidof {}", zygote_name))?;
        if !result.ok() {
            log::debug!("[{}] no {} process", TAG, zygote_name);
            return Ok(None);
        }
        // A Zygote that just forked and hasn't exec'd an app yet shows up as
        // more than one pid, any of them will do. Toybox's `pidof -s` prints
        // every pid anyway, so split it ourselves.
        let stdout = result.stdout_utf8_lossy();
        let zygote_pid = stdout.split_whitespace().next().unwrap_or("");
        check!(!zygote_pid.is_empty(), "pidof {} printed no pid", zygote_name);

        let grep_pattern = format!("{}.*boot", ART_APEX_DALVIK_CACHE_DIRNAME);
        self.get_mapped_artifacts(zygote_pid, &grep_pattern)
            .map(Some)
    }

    pub fn get_system_server_loaded_artifacts(&self) -> crate::Result<BTreeSet<String>> {
        let result = self.device.execute_shell_v2("pidof system_server")?;
        check!(result.ok(), "{}", result);
        let stdout = result.stdout_utf8_lossy();
        let system_server_pid = stdout.trim();
        check!(!system_server_pid.is_empty(), "pidof system_server printed no pid");
        check!(
            SINGLE_PID.is_match(system_server_pid),
            "There should be exactly one `system_server` process"
        );

        // system_server artifacts all contain "@classes" in their names
        let grep_pattern = format!("{}.*@classes", ART_APEX_DALVIK_CACHE_DIRNAME);
        self.get_mapped_artifacts(system_server_pid, &grep_pattern)
    }

    pub fn verify_zygote_loaded_artifacts(
        &self,
        zygote_name: &str,
        mapped_artifacts: &BTreeSet<String>,
        boot_image_stem: &str,
    ) -> crate::Result<()> {
        check!(
            mapped_artifacts.len() == 3,
            "Expect 3 bootclasspath artifacts, {} maps {}",
            zygote_name,
            mapped_artifacts.len()
        );

        let all_artifacts = join(mapped_artifacts, ",");
        for extension in BCP_ARTIFACT_EXTENSIONS {
            let artifact = format!("{}{}", boot_image_stem, extension);
            let found = mapped_artifacts.iter().any(|a| a.ends_with(&artifact));
            check!(
                found,
                "{} {} not found: '{}'",
                zygote_name,
                artifact,
                all_artifacts
            );
        }
        Ok(())
    }

    /// Verify that every running Zygote (there may be a 32 and a 64 bit one)
    /// maps the boot image with the given stem. Returns the verified files.
    pub fn verify_zygotes_loaded_artifacts(
        &self,
        boot_image_stem: &str,
    ) -> crate::Result<BTreeSet<String>> {
        let mut zygote_count = 0;
        let mut verified_artifacts = BTreeSet::new();
        for zygote_name in ZYGOTE_NAMES {
            let mapped = match self.get_zygote_loaded_artifacts(zygote_name)? {
                Some(v) => v,
                None => continue,
            };
            self.verify_zygote_loaded_artifacts(zygote_name, &mapped, boot_image_stem)?;
            zygote_count += 1;
            verified_artifacts.extend(mapped);
        }
        check!(zygote_count > 0, "No zygote processes found");
        Ok(verified_artifacts)
    }

    pub fn verify_system_server_loaded_artifacts(&self) -> crate::Result<()> {
        let classpath_elements = self.get_list_from_environment_variable("SYSTEMSERVERCLASSPATH")?;
        check!(
            !classpath_elements.is_empty(),
            "SYSTEMSERVERCLASSPATH is empty"
        );
        let standalone_jars =
            self.get_list_from_environment_variable("STANDALONE_SYSTEMSERVER_JARS")?;

        let mapped = self.get_system_server_loaded_artifacts()?;
        let first = match mapped.iter().next() {
            Some(v) => v,
            None => {
                return Err(crate::Error::Assertion(format!(
                    "No mapped artifacts under {}",
                    ART_APEX_DALVIK_CACHE_DIRNAME
                )))
            }
        };
        let isa = match system_server_isa(first) {
            Some(v) => v,
            None => {
                return Err(crate::Error::Assertion(format!(
                    "Can't find the instruction set of {}",
                    first
                )))
            }
        };
        log::debug!("[{}] system_server isa is {}", TAG, isa);

        // Every jar on the system_server classpath needs all of its artifacts
        for element in classpath_elements.iter().chain(standalone_jars.iter()) {
            for extension in APP_ARTIFACT_EXTENSIONS {
                let full_artifact_path = system_server_artifact_path(
                    ART_APEX_DALVIK_CACHE_DIRNAME,
                    isa,
                    element,
                    extension,
                );
                check!(
                    mapped.contains(&full_artifact_path),
                    "Missing {}",
                    full_artifact_path
                );
            }
        }

        for artifact in &mapped {
            check!(
                has_known_extension(artifact, APP_ARTIFACT_EXTENSIONS),
                "Unknown artifact kind: {}",
                artifact
            );
        }
        Ok(())
    }

    pub fn have_compilation_log(&self) -> crate::Result<bool> {
        let result = self
            .device
            .execute_shell_v2(&format!("stat {}", ODREFRESH_COMPILATION_LOG))?;
        Ok(result.ok())
    }

    /// odrefresh backs off compiling when its log records recent attempts
    pub fn remove_compilation_log_to_avoid_backoff(&self) -> crate::Result<()> {
        self.device
            .execute_shell(&format!("rm -f {}", ODREFRESH_COMPILATION_LOG))?;
        Ok(())
    }

    pub fn reboot(&self) -> crate::Result<()> {
        self.device.reboot()?;
        let timeout = self.settings.boot_complete_timeout;
        check!(
            self.device.wait_for_boot_complete(timeout),
            "Device didn't boot in {:?}",
            timeout
        );
        Ok(())
    }

    pub fn restart_zygote(&self) -> crate::Result<()> {
        // Waiting for boot relies on `dev.bootcomplete`
        self.device.execute_shell("setprop dev.bootcomplete 0")?;
        self.device.execute_shell("setprop ctl.restart zygote")?;
        let timeout = self.settings.restart_zygote_timeout;
        check!(
            self.device.wait_for_boot_complete(timeout),
            "Zygote didn't start in {:?}",
            timeout
        );
        Ok(())
    }

    /// Enables adb root or skips the test if adb root is not supported
    pub fn enable_adb_root_or_skip(&self, props: &mut TestProperties) -> crate::Result<()> {
        props.set_bool(WAS_ADB_ROOT_KEY, self.device.is_adb_root()?);
        let adb_root_enabled = self.device.enable_adb_root()?;
        assume!(
            adb_root_enabled,
            "ADB root failed and required to get process maps"
        );
        props.set_bool(ADB_ROOT_ENABLED_KEY, adb_root_enabled);
        Ok(())
    }

    /// Restores the device to the state before
    /// [OdsignTestUtils::enable_adb_root_or_skip] was called
    pub fn restore_adb_root(&self, props: &TestProperties) -> crate::Result<()> {
        if props.get_bool_or_default(ADB_ROOT_ENABLED_KEY)
            && !props.get_bool_or_default(WAS_ADB_ROOT_KEY)
        {
            if !self.device.disable_adb_root()? {
                log::warn!("[{}] adbd is still running as root", TAG);
            }
        }
        Ok(())
    }

    fn get_list_from_environment_variable(&self, name: &str) -> crate::Result<Vec<String>> {
        let value = self.device.execute_shell(&format!("echo ${}", name))?;
        Ok(split_path_list(&value))
    }
}
