use std::fs::{self, create_dir_all};
use std::io;
use std::path::Path;

pub fn ensure_dir_exists(p: &Path) -> io::Result<()> {
    if p.exists() {
        return Ok(());
    }

    create_dir_all(p)
}

pub fn path_must_str(path: &Path) -> &str {
    path.to_str().expect("paths should be valid utf-8")
}

pub fn read_file(path: &Path) -> crate::Result<String> {
    if !path.exists() {
        return Err(crate::Error::MissingFile(path_must_str(path).into()));
    }
    Ok(fs::read_to_string(path)?)
}

/// Parse a boolean the way Java's `Boolean.parseBoolean` does: only a
/// case insensitive `true` is true.
pub fn parse_bool_lenient(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_bool_lenient() {
        assert!(parse_bool_lenient("true"));
        assert!(parse_bool_lenient("TRUE"));
        assert!(!parse_bool_lenient("1"));
        assert!(!parse_bool_lenient("yes"));
        assert!(!parse_bool_lenient(""));
    }
}
