use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::{parse_bool_lenient, path_must_str};

/// Key/value bag shared between the steps of a single test run
///
/// Mirrors the string property map a test harness hands to every test in an
/// invocation. The CLI persists it as JSON so that `enable-root` and
/// `restore-root` can run as separate processes.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestProperties {
    values: BTreeMap<String, String>,
}

impl TestProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the properties from the given file, an absent file is an empty
    /// bag
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read(path)?;
        serde_json::from_slice(&content).map_err(|e| {
            crate::Error::Generic(format!("bad properties file {}: {}", path_must_str(path), e))
        })
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_vec_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn put<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value of a boolean property, or false if it does not
    /// exist
    pub fn get_bool_or_default(&self, key: &str) -> bool {
        self.get(key).map(parse_bool_lenient).unwrap_or(false)
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.put(key, value.to_string());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{tmp_context, TestContext};
    use rstest::*;

    #[test]
    fn test_bools() {
        let mut props = TestProperties::new();
        assert!(!props.get_bool_or_default("missing"));

        props.set_bool("a", true);
        props.set_bool("b", false);
        props.put("c", "TRUE");
        props.put("d", "1");

        assert_eq!(props.get("a"), Some("true"));
        assert!(props.get_bool_or_default("a"));
        assert!(!props.get_bool_or_default("b"));
        assert!(props.get_bool_or_default("c"));
        assert!(!props.get_bool_or_default("d"));
    }

    #[rstest]
    fn test_save_and_load(tmp_context: TestContext) {
        let path = tmp_context.get_temp_path(Some("json"));
        assert!(TestProperties::load(&path).expect("loading").is_empty());

        let mut props = TestProperties::new();
        props.set_bool("odsign:WAS_ADB_ROOT", false);
        props.put("other", "value");
        props.save(&path).expect("saving");

        let loaded = TestProperties::load(&path).expect("loading");
        assert_eq!(loaded, props);
    }

    #[rstest]
    fn test_load_garbage(tmp_context: TestContext) {
        let path = tmp_context.new_tmp_file("{not json").expect("writing");
        assert!(TestProperties::load(&path).is_err());
    }
}
