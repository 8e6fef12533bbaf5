use std::path::{Component, Path};

use crate::RemoteError;

/// Validates a name returned by a directory listing.
///
/// The name must be exactly one normal path component, otherwise joining it
/// onto the output root could escape that root.
pub fn validate_entry_name(name: &str) -> Result<(), RemoteError> {
    if name.is_empty() {
        return Err(RemoteError::InvalidPath("empty entry name".into()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(RemoteError::InvalidPath(format!(
            "separator in entry name: {name}"
        )));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(RemoteError::InvalidPath(format!(
            "entry name is not a plain file name: {name}"
        ))),
    }
}

/// Validates a `/`-separated remote path.
///
/// Leading and repeated slashes are allowed; `.` segments are ignored.
/// Rejects parent traversal and Windows prefixes.
pub fn validate_remote_path(path: &str) -> Result<(), RemoteError> {
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(RemoteError::InvalidPath(format!(
                    "parent directory traversal not allowed: {path}"
                )));
            }
            _ => {
                let mut components = Path::new(segment).components();
                if !matches!(
                    (components.next(), components.next()),
                    (Some(Component::Normal(_)), None)
                ) {
                    return Err(RemoteError::InvalidPath(format!(
                        "path prefix not allowed: {path}"
                    )));
                }
            }
        }
    }
    Ok(())
}
