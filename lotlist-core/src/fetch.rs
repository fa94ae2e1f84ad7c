//! Manifest download
//!
//! Single-shot blocking HTTP GET; no retries.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::path::Path;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Build the HTTP client shared by download and conversion
pub fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("lotlist/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to create HTTP client")
}

/// Substitute an auction id into a manifest URL template
pub fn manifest_url(template: &str, auction_id: &str) -> Result<String> {
    let auction_id = auction_id.trim();
    if auction_id.is_empty() {
        anyhow::bail!("auction id must not be empty");
    }
    if !auction_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        anyhow::bail!(
            "auction id may only contain letters, digits, '-' and '_' (got {:?})",
            auction_id
        );
    }

    let url = template.replace("{auction_id}", auction_id);
    reqwest::Url::parse(&url).with_context(|| format!("invalid manifest URL: {}", url))?;
    Ok(url)
}

/// GET `url` and write the body to `dest`, creating parent directories
pub fn download_to(client: &Client, url: &str, dest: &Path) -> Result<()> {
    tracing::debug!(%url, dest = %dest.display(), "downloading");

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("request failed: {}", url))?;
    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("GET {} returned {}", url, status);
    }
    let bytes = response
        .bytes()
        .with_context(|| format!("failed to read response body: {}", url))?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(dest, &bytes)
        .with_context(|| format!("failed to write file: {}", dest.display()))?;

    tracing::debug!(bytes = bytes.len(), "download complete");
    Ok(())
}

/// Download the manifest spreadsheet for an auction
pub fn download_manifest(
    client: &Client,
    template: &str,
    auction_id: &str,
    dest: &Path,
) -> Result<()> {
    let url = manifest_url(template, auction_id)?;
    download_to(client, &url, dest)
        .with_context(|| format!("failed to download manifest for auction {}", auction_id))
}
