use anyhow::{Context, Result};
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;

use hakwonplus::upload::{upload_to_r2, ProgressFn};
use hakwonplus::utils::format_bytes;

pub async fn upload(url: &str, file: &Path, content_type: Option<&str>) -> Result<()> {
    let body = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    println!("Uploading {} ({})", file.display(), format_bytes(body.len() as u64));

    let on_progress: ProgressFn = Arc::new(|percent| println!("  {percent}%"));
    upload_to_r2(url, Bytes::from(body), content_type, Some(on_progress))
        .result()
        .await?;

    println!("Upload complete");
    Ok(())
}
