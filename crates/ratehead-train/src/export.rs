//! Artifact I/O for the fitted head.
//!
//! Wire format: compact JSON with exactly two keys, `W` (one number per
//! embedding dimension, index-aligned) and `b` (a number). No version or
//! metadata; consumers know the dimension out of band.

use std::fs;
use std::path::Path;
use tracing::info;

use ratehead_core::error::{Error, Result};
use ratehead_core::types::LinearHead;

/// Write `head` to `path`, creating parent directories and replacing any existing file.
pub fn export_head(head: &LinearHead, path: &Path) -> Result<()> {
    if head.weights.is_empty() {
        return Err(Error::InvalidHead("W is empty".into()));
    }
    // JSON has no NaN/inf; serde_json would write them as null.
    if let Some(i) = head.weights.iter().position(|w| !w.is_finite()) {
        return Err(Error::InvalidHead(format!("W[{i}] is not finite ({})", head.weights[i])));
    }
    if !head.bias.is_finite() {
        return Err(Error::InvalidHead(format!("b is not finite ({})", head.bias)));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_string(head)?;
    fs::write(path, payload)?;
    info!("✅ Exported head weights to {} (W length={}, b={})", path.display(), head.weights.len(), head.bias);
    Ok(())
}

/// Read an artifact back, requiring exactly `dimension` weights.
pub fn load_head(path: &Path, dimension: usize) -> Result<LinearHead> {
    let raw = fs::read_to_string(path)?;
    let head: LinearHead = serde_json::from_str(&raw).map_err(|e| {
        Error::InvalidHead(format!("expected {{ W: number[{dimension}], b: number }} in {}: {e}", path.display()))
    })?;
    if head.weights.len() != dimension {
        return Err(Error::InvalidHead(format!(
            "expected W of length {dimension}, got {} in {}",
            head.weights.len(),
            path.display()
        )));
    }
    Ok(head)
}
