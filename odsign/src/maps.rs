//! Parsing of `/proc/<pid>/maps` output and the naming scheme of the
//! artifacts ART writes to the dalvik-cache.

use std::collections::BTreeSet;

use crate::DEVICE_PATH_SEP_CHAR;

/// Collect the paths of the files mapped in the given `/proc/<pid>/maps`
/// output, starting at `cache_dir`.
///
/// Anonymous mappings (`[anon:...]`, `[heap]`, ...) are ignored, as are lines
/// that don't mention `cache_dir` at all.
pub fn mapped_artifacts(maps_output: &str, cache_dir: &str) -> BTreeSet<String> {
    let mut mapped = BTreeSet::new();
    for line in maps_output.lines() {
        if line.contains('[') {
            continue;
        }
        match line.find(cache_dir) {
            Some(start) => {
                mapped.insert(line[start..].to_string());
            }
            None => {
                if !line.trim().is_empty() {
                    log::debug!("ignoring maps line outside of {}: {}", cache_dir, line);
                }
            }
        }
    }
    mapped
}

/// The instruction set directory of a system_server artifact.
///
/// Artifact paths look like `<cache_dir>/<isa>/system@framework@some.jar@classes.odex`
pub fn system_server_isa(artifact: &str) -> Option<&str> {
    let mut components = artifact.rsplit(DEVICE_PATH_SEP_CHAR);
    components.next()?;
    components.next().filter(|it| !it.is_empty())
}

/// Turn a device path into the flattened name ART uses in the dalvik-cache,
/// `/system/framework/services.jar` becomes `system@framework@services.jar`
pub fn escape_classpath_element(element: &str) -> String {
    element
        .strip_prefix(DEVICE_PATH_SEP_CHAR)
        .unwrap_or(element)
        .replace(DEVICE_PATH_SEP_CHAR, "@")
}

/// The artifact path expected for the given system_server classpath element
pub fn system_server_artifact_path(
    cache_dir: &str,
    isa: &str,
    element: &str,
    extension: &str,
) -> String {
    format!(
        "{}/{}/{}@classes{}",
        cache_dir,
        isa,
        escape_classpath_element(element),
        extension
    )
}

/// Split a `:` separated list such as `$SYSTEMSERVERCLASSPATH`, dropping
/// empty entries
pub fn split_path_list(value: &str) -> Vec<String> {
    value
        .trim()
        .split(':')
        .filter(|it| !it.is_empty())
        .map(String::from)
        .collect()
}

/// True if the artifact ends with one of the given extensions
pub fn has_known_extension(artifact: &str, extensions: &[&str]) -> bool {
    extensions.iter().any(|ext| artifact.ends_with(ext))
}
