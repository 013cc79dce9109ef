use anyhow::{Context, Result, bail};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

pub const DEFAULT_DOWNLOAD_PATH: &str = "./download/";

/// Where `relative_path` lands under `dir`. Paths that would escape `dir`
/// are rejected.
pub fn download_target(dir: &Path, relative_path: &str) -> Result<PathBuf> {
    let relative = Path::new(relative_path);
    if relative_path.is_empty()
        || relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
    {
        bail!("Refusing to save download outside {}: '{}'", dir.display(), relative_path);
    }
    Ok(dir.join(relative))
}

/// Write downloaded content to `dir/relative_path`, creating parent
/// directories as needed. Existing files are overwritten.
pub async fn save_download(dir: &Path, relative_path: &str, bytes: &[u8]) -> Result<PathBuf> {
    let target = download_target(dir, relative_path)?;

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    tokio::fs::write(&target, bytes)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;

    debug!("Saved {} bytes to {}", bytes.len(), target.display());
    Ok(target)
}
