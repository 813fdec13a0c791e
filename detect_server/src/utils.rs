//! Utility functions
//!
use std::{fs::File, io::Cursor, path::PathBuf};

use anyhow::{bail, Context, Result};
use reqwest::Client;

use crate::config::Args;

/// Download a file from a URL to a given filepath.
pub async fn download_file(
    client: &Client,
    url: &str,
    filepath: impl AsRef<std::path::Path>,
) -> Result<()> {
    let resp = client.get(url).send().await?.error_for_status()?;

    let mut file = File::create(filepath)?;
    let mut content = Cursor::new(resp.bytes().await?);
    std::io::copy(&mut content, &mut file)?;

    Ok(())
}

/// Find the model file, downloading it into the cache directory if necessary.
pub async fn resolve_model_path(args: &Args) -> Result<PathBuf> {
    if args.model.is_file() {
        return Ok(args.model.clone());
    }

    let url = match &args.model_url {
        Some(url) => url,
        None => bail!(
            "model {} not found and no --model-url given",
            args.model.display()
        ),
    };

    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("detect_server");
    let filepath = cache_dir.join(model_file_name(url));
    if filepath.is_file() {
        log::info!("Using cached model {}", filepath.display());
        return Ok(filepath);
    }

    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("failed to create {}", cache_dir.display()))?;
    log::info!("Downloading model from {} to {}", url, filepath.display());

    // Download into a temporary name first so an interrupted download is not mistaken for a model
    let partial = filepath.with_extension("part");
    download_file(&Client::new(), url, &partial).await?;
    std::fs::rename(&partial, &filepath)?;

    Ok(filepath)
}

/// Name of the cached model file for a download URL.
fn model_file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => "model.onnx".to_owned(),
    }
}
