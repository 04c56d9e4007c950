use blanket::blanket;
use once_cell::sync::OnceCell;
use std::env;
use std::path::PathBuf;

use which::{which, which_in};

use crate::config::Config;
use crate::maps::split_path_list;
use crate::utils::ensure_dir_exists;
use crate::Error;

use std::ops::DerefMut;
use std::sync::Mutex;

#[derive(Clone)]
struct CachedBin {
    name: String,
    path: String,
}

fn wrapped_which(bin: &str) -> Option<PathBuf> {
    if let Ok(odsign_path) = env::var("ODSIGN_PATH") {
        let cwd = env::current_dir().ok()?;
        return which_in(bin, Some(&odsign_path), &cwd).ok();
    }
    which(bin).ok()
}

fn find_program(prog: &str) -> Option<String> {
    wrapped_which(prog).map(|it| it.to_string_lossy().into())
}

/// Context is a trait for an object that can help standardize file locations,
/// find binaries, and lookup env vars.
///
/// Most methods on this trait have a default implementation that is perfectly
/// safe to leave unchanged.
#[blanket(derive(Ref, Box))]
pub trait Context: Send + Sync {
    fn maybe_get_env(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn maybe_get_bin(&self, bin: &str) -> Option<String> {
        find_program(bin)
    }

    fn has_bin(&self, bin: &str) -> bool {
        self.maybe_get_bin(bin).is_some()
    }

    fn get_bin(&self, bin: &str) -> crate::Result<String> {
        self.maybe_get_bin(bin)
            .ok_or_else(|| Error::MissingBin(bin.into()))
    }

    /// The project directory is `$ODSIGN_PROJECT_HOME`, or the current
    /// directory when that isn't set
    fn get_project_dir(&self) -> crate::Result<PathBuf> {
        let home = match self.maybe_get_env("ODSIGN_PROJECT_HOME") {
            Some(env) => PathBuf::from(env),
            None => env::current_dir()?,
        };
        if !home.exists() {
            return Err(Error::Generic(format!(
                "ODSIGN_PROJECT_HOME set to {}, but that directory doesn't exist",
                home.to_string_lossy()
            )));
        }
        Ok(home)
    }

    fn get_project_dir_child(&self, child: &str) -> crate::Result<PathBuf> {
        self.get_project_dir().map(|x| x.join(child))
    }

    fn get_project_config_file(&self) -> crate::Result<PathBuf> {
        self.get_project_dir_child("odsign.toml")
    }

    fn get_project_config<'a>(&'a self) -> crate::Result<Option<&'a Config>>;

    fn get_output_dir(&self) -> crate::Result<PathBuf> {
        self.get_project_dir_child("odsign_out")
    }

    fn get_output_dir_child(&self, child: &str) -> crate::Result<PathBuf> {
        self.get_output_dir().map(|x| x.join(child))
    }

    /// Where the test run property bag is persisted between invocations
    fn get_properties_file(&self) -> crate::Result<PathBuf> {
        let out = self.get_output_dir()?;
        ensure_dir_exists(&out)?;
        Ok(out.join("properties.json"))
    }

    /// Directories searched for test files such as the test APEX: anything
    /// listed in `$ODSIGN_TESTCASES` followed by the project directory
    fn get_test_file_dirs(&self) -> crate::Result<Vec<PathBuf>> {
        let mut dirs: Vec<PathBuf> = self
            .maybe_get_env("ODSIGN_TESTCASES")
            .map(|it| split_path_list(&it).into_iter().map(PathBuf::from).collect())
            .unwrap_or_default();
        dirs.push(self.get_project_dir()?);
        Ok(dirs)
    }
}

pub struct DefaultContext {
    bin_cache: Mutex<Vec<CachedBin>>,
    project_config: OnceCell<Option<Config>>,
}

impl Clone for DefaultContext {
    fn clone(&self) -> Self {
        let cache = self.bin_cache.lock().expect("failed to lock");
        Self {
            bin_cache: Mutex::new(cache.clone()),
            project_config: self.project_config.clone(),
        }
    }
}

impl DefaultContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for DefaultContext {
    fn default() -> Self {
        Self {
            bin_cache: Mutex::new(Vec::new()),
            project_config: OnceCell::new(),
        }
    }
}

pub(crate) fn load_project_config(ctx: &dyn Context) -> crate::Result<Option<Config>> {
    let path = ctx.get_project_config_file()?;
    if !path.exists() {
        log::debug!("no project config at {}", path.to_string_lossy());
        Ok(None)
    } else {
        Ok(Some(Config::parse(&path)?))
    }
}

impl Context for DefaultContext {
    fn get_project_config<'a>(&'a self) -> crate::Result<Option<&'a Config>> {
        let cfg = self
            .project_config
            .get_or_try_init(|| load_project_config(self))?;
        Ok(cfg.as_ref())
    }

    fn maybe_get_bin(&self, prog: &str) -> Option<String> {
        let mut cache_guard = self.bin_cache.lock().expect("failed to lock");
        let cache = cache_guard.deref_mut();
        if let Some(val) = cache.iter().find(|it| it.name == prog) {
            return Some(val.path.clone());
        }

        let found = find_program(prog)?;

        cache.push(CachedBin {
            name: prog.into(),
            path: found.clone(),
        });

        Some(found)
    }
}
