//! Floor-plan image fixtures.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use probe_core::ImageAsset;
use std::fs;
use std::path::Path;

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// First `.jpg`/`.jpeg`/`.png` in `dir` by file name, or `None` when the
/// directory is missing or holds no image.
pub fn find_image(dir: &Path) -> Result<Option<ImageAsset>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut candidates: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && mime_for(path).is_some())
        .collect();
    candidates.sort();

    let Some(path) = candidates.into_iter().next() else {
        return Ok(None);
    };
    let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Some(ImageAsset {
        file_name,
        mime: mime_for(&path).unwrap_or("application/octet-stream").to_string(),
        base64: STANDARD.encode(&bytes),
        bytes,
    }))
}
