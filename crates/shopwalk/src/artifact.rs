//! Files a run leaves behind: the product snapshot and failure screenshots.

use crate::result::ShopwalkResult;
use std::path::{Path, PathBuf};

/// Name and displayed price of the product a run picked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    /// Product title
    pub name: String,
    /// Price exactly as displayed
    pub price_text: String,
}

impl ProductSnapshot {
    /// File contents: `Product: <name>\nPrice: <price>`
    #[must_use]
    pub fn render(&self) -> String {
        format!("Product: {}\nPrice: {}", self.name, self.price_text)
    }
}

/// Replace `path` with `contents` in one step, creating parent directories.
///
/// The bytes go to a sibling temp file that is then renamed over the target,
/// so readers never observe a half-written file.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> ShopwalkResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent).await?;
    let file_name = path
        .file_name()
        .map_or_else(|| "output".into(), |n| n.to_string_lossy().into_owned());
    let tmp = parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));
    tokio::fs::write(&tmp, contents).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Write the product snapshot, overwriting any previous run
pub async fn write_snapshot(path: &Path, snapshot: &ProductSnapshot) -> ShopwalkResult<()> {
    write_atomic(path, snapshot.render().as_bytes()).await?;
    tracing::info!(
        path = %path.display(),
        product = %snapshot.name,
        price = %snapshot.price_text,
        "product snapshot written"
    );
    Ok(())
}

/// `<dir>/<flow>_<timestamp>.png`
#[must_use]
pub fn screenshot_path(dir: &Path, flow: &str) -> PathBuf {
    let slug: String = flow
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S%.3f");
    dir.join(format!("{slug}_{stamp}.png"))
}

/// Store a failure screenshot and return where it went
pub async fn save_screenshot(dir: &Path, flow: &str, png: &[u8]) -> ShopwalkResult<PathBuf> {
    let path = screenshot_path(dir, flow);
    write_atomic(&path, png).await?;
    Ok(path)
}
