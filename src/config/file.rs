//! `KEY=VALUE` config file reader.
//!
//! The format is compatible with systemd's `EnvironmentFile`: blank lines and
//! `#` comments are ignored, values may be wrapped in double quotes. There is
//! no escaping, no variable expansion and no multi-line values.

use std::collections::BTreeMap;
use std::path::Path;

use super::ConfigError;

/// Parse config file contents into a key/value map.
///
/// Lines without `=` are skipped. Later duplicates override earlier ones.
pub fn parse_env_file(contents: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        vars.insert(key.trim().to_owned(), unquote(value.trim()).to_owned());
    }
    vars
}

/// Strip one pair of surrounding double quotes.
fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value
            .get(1..value.len().saturating_sub(1))
            .unwrap_or(value)
    } else {
        value
    }
}

/// Read and parse a config file. A missing file yields an empty map.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] if the file exists but cannot be read.
pub fn load_env_file(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(parse_env_file(&contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}
