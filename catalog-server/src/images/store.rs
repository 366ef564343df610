//! Variant file storage

use super::ImageRole;
use std::fs;
use std::io;
use std::path::Path;
use uuid::Uuid;

/// Write `bytes` to `{media_root}/{catalog_path}/{ROLE}_image-{uuid}.webp`
///
/// The file is written under a temporary name and renamed into place.
/// Returns the path relative to `media_root`.
pub fn write_variant(
    media_root: &Path,
    catalog_path: &str,
    role: ImageRole,
    bytes: &[u8],
) -> io::Result<String> {
    let dir_rel = catalog_path.trim_matches('/');
    let dir = media_root.join(dir_rel);
    fs::create_dir_all(&dir)?;

    let file_name = format!("{}_image-{}.webp", role.as_str(), Uuid::new_v4());
    let tmp = dir.join(format!(".{file_name}.tmp"));
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, dir.join(&file_name)) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    Ok(if dir_rel.is_empty() {
        file_name
    } else {
        format!("{dir_rel}/{file_name}")
    })
}

/// Best-effort removal of a variant whose record was not stored
pub fn remove_variant(media_root: &Path, relative: &str) {
    if let Err(e) = fs::remove_file(media_root.join(relative)) {
        tracing::debug!(path = relative, error = %e, "Orphan variant not removed");
    }
}
