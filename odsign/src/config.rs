use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toml::{Table, Value};

use crate::maps::split_path_list;
use crate::utils::read_file;
use crate::Context;

/// A parsed `odsign.toml`
#[derive(Clone)]
pub struct Config {
    path: PathBuf,
    base: Table,
}

/// A view of one table of a [Config], remembering its dotted path for error
/// messages
pub struct ConfigMap<'c> {
    path: &'c Path,
    name: Option<Cow<'c, str>>,
    table: &'c Table,
}

impl Config {
    pub fn parse(source: &Path) -> crate::Result<Self> {
        let as_str = read_file(source)?;
        Self::parse_str(source, &as_str)
    }

    pub fn parse_str(source: &Path, content: &str) -> crate::Result<Self> {
        let base: Table = match toml::from_str(content) {
            Ok(v) => v,
            Err(e) => return Err(crate::Error::new_cfg(source, &e)),
        };
        Ok(Self {
            base,
            path: PathBuf::from(source),
        })
    }

    pub fn get_map(&self) -> ConfigMap<'_> {
        ConfigMap {
            name: None,
            path: &self.path,
            table: &self.base,
        }
    }
}

impl<'c> ConfigMap<'c> {
    fn key_path<'a>(&self, key: &'a str) -> Cow<'a, str> {
        match &self.name {
            None => Cow::Borrowed(key),
            Some(v) => Cow::Owned(format!("{}.{}", v, key)),
        }
    }

    /// Helper to create a crate::Error for an invalid key
    pub fn invalid_key(&self, key: &str, expected: &str) -> crate::Error {
        crate::Error::new_cfg(
            self.path,
            &format!(
                "invalid value for key: {} (expected type: {})",
                self.key_path(key),
                expected
            ),
        )
    }

    /// Look up `key` and convert it with `conv`, a value `conv` rejects is an
    /// invalid key
    fn maybe_get_as<T, F>(&self, key: &str, expected: &str, conv: F) -> crate::Result<Option<T>>
    where
        F: FnOnce(&'c Value) -> Option<T>,
    {
        match self.table.get(key) {
            None => Ok(None),
            Some(v) => conv(v)
                .map(Some)
                .ok_or_else(|| self.invalid_key(key, expected)),
        }
    }

    pub fn maybe_get_int_typecheck(&self, key: &str) -> crate::Result<Option<i64>> {
        self.maybe_get_as(key, "int", Value::as_integer)
    }

    /// Same as [ConfigMap::maybe_get_int_typecheck] but the value must not be
    /// negative
    pub fn maybe_get_u64_typecheck(&self, key: &str) -> crate::Result<Option<u64>> {
        self.maybe_get_as(key, "non-negative int", |v| {
            v.as_integer().and_then(|it| u64::try_from(it).ok())
        })
    }

    pub fn maybe_get_str_typecheck(&self, key: &str) -> crate::Result<Option<&'c str>> {
        self.maybe_get_as(key, "string", Value::as_str)
    }

    pub fn maybe_get_map_typecheck(&self, key: &str) -> crate::Result<Option<ConfigMap<'c>>> {
        let table = match self.maybe_get_as(key, "table", Value::as_table)? {
            Some(v) => v,
            None => return Ok(None),
        };
        Ok(Some(ConfigMap {
            name: Some(Cow::Owned(self.key_path(key).into_owned())),
            path: self.path,
            table,
        }))
    }
}

/// The `[adb]` section of the project config
#[derive(Default, Debug, PartialEq)]
pub struct AdbConfig {
    pub executable: Option<String>,
    pub serial: Option<String>,
}

impl AdbConfig {
    pub fn from_config(cfg: &Config) -> crate::Result<Self> {
        let base = cfg.get_map();
        let adb = match base.maybe_get_map_typecheck("adb")? {
            Some(v) => v,
            None => return Ok(Self::default()),
        };
        Ok(Self {
            executable: adb.maybe_get_str_typecheck("executable")?.map(String::from),
            serial: adb.maybe_get_str_typecheck("serial")?.map(String::from),
        })
    }
}

pub const DEFAULT_TEST_APEX: &str = "test_com.android.art.apex";
pub const BOOT_COMPLETE_TIMEOUT: Duration = Duration::from_secs(2 * 60);
pub const RESTART_ZYGOTE_COMPLETE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const REBOOT_OFFLINE_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything an odsign test run can be tuned with
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// File name of the test ART APEX
    pub test_apex: String,
    /// Directories searched, in order, for test files
    pub search_dirs: Vec<PathBuf>,
    pub boot_complete_timeout: Duration,
    pub restart_zygote_timeout: Duration,
    /// How long to wait for the device to drop off after `adb reboot`
    pub reboot_offline_timeout: Duration,
    /// Delay between polls while waiting for the device
    pub poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            test_apex: DEFAULT_TEST_APEX.into(),
            search_dirs: Vec::new(),
            boot_complete_timeout: BOOT_COMPLETE_TIMEOUT,
            restart_zygote_timeout: RESTART_ZYGOTE_COMPLETE_TIMEOUT,
            reboot_offline_timeout: REBOOT_OFFLINE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Settings {
    /// Build the settings from the context's environment and project config
    pub fn from_context(ctx: &dyn Context) -> crate::Result<Self> {
        let mut settings = Self {
            search_dirs: ctx.get_test_file_dirs()?,
            ..Default::default()
        };
        if let Some(cfg) = ctx.get_project_config()? {
            settings.apply_config(cfg)?;
        }
        Ok(settings)
    }

    /// Override defaults with anything set in the given config
    pub fn apply_config(&mut self, cfg: &Config) -> crate::Result<()> {
        let base = cfg.get_map();

        if let Some(apex) = base.maybe_get_map_typecheck("apex")? {
            if let Some(name) = apex.maybe_get_str_typecheck("test-apex")? {
                self.test_apex = name.into();
            }
            if let Some(dirs) = apex.maybe_get_str_typecheck("search-dirs")? {
                let mut configured: Vec<PathBuf> =
                    split_path_list(dirs).into_iter().map(PathBuf::from).collect();
                configured.append(&mut self.search_dirs);
                self.search_dirs = configured;
            }
        }

        if let Some(timeouts) = base.maybe_get_map_typecheck("timeouts")? {
            if let Some(secs) = timeouts.maybe_get_u64_typecheck("boot-complete-secs")? {
                self.boot_complete_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = timeouts.maybe_get_u64_typecheck("restart-zygote-secs")? {
                self.restart_zygote_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = timeouts.maybe_get_u64_typecheck("reboot-offline-secs")? {
                self.reboot_offline_timeout = Duration::from_secs(secs);
            }
            if let Some(ms) = timeouts.maybe_get_u64_typecheck("poll-interval-ms")? {
                self.poll_interval = Duration::from_millis(ms);
            }
        }
        Ok(())
    }

    /// Find the given test file in the search directories
    pub fn find_test_file(&self, name: &str) -> crate::Result<PathBuf> {
        self.search_dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| crate::Error::MissingFile(name.into()))
    }
}
