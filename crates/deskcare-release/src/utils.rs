//! Small filesystem helpers shared by the commands

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::{Error, Result};

/// Create the parent directory of `path` if it does not exist
pub fn ensure_parent_dir(path: &Utf8Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Serialize `value` as JSON indented with four spaces, newline terminated
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    buf.push(b'\n');

    String::from_utf8(buf).map_err(|e| {
        Error::config(
            format!("Serialized JSON is not valid UTF-8: {}", e),
            "This is likely a bug in deskcare-release",
        )
    })
}

/// Overwrite `path` with the JSON form of `value`
pub fn write_json<T: Serialize>(path: &Utf8Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    std::fs::write(path, to_json_pretty(value)?)?;
    Ok(())
}

/// Convert a walkdir entry path to UTF-8
pub fn utf8_path(path: &std::path::Path) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).map_err(|p| {
        Error::config(
            format!("Path is not valid UTF-8: {:?}", p),
            "Ensure all file paths contain only valid UTF-8 characters",
        )
    })
}

/// Join the components of a relative path with `/`, regardless of platform
pub fn slash_path(rel: &Utf8Path) -> String {
    rel.components()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/")
}
