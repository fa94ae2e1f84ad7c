//! Report persistence and viewing
//!
//! Global invariants enforced:
//! - Output paths are a pure function of (naming, directory, auction id)
//! - Reports are written atomically and overwrite earlier runs

use crate::manifest::Manifest;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

/// How report files are named on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputNaming {
    /// `<dir>/<id>/<id>.html`
    #[default]
    PerAuction,
    /// `<dir>/auction_id_<id>.html`
    Shared,
}

impl OutputNaming {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputNaming::PerAuction => "per_auction",
            OutputNaming::Shared => "shared",
        }
    }
}

/// Make an auction id safe to use as a file name
pub fn sanitize_auction_id(auction_id: &str) -> String {
    let cleaned: String = auction_id
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "unknown".to_string()
    } else {
        cleaned
    }
}

fn artifact_path(naming: OutputNaming, directory: &Path, auction_id: &str, ext: &str) -> PathBuf {
    let id = sanitize_auction_id(auction_id);
    match naming {
        OutputNaming::PerAuction => directory.join(&id).join(format!("{}.{}", id, ext)),
        OutputNaming::Shared => directory.join(format!("auction_id_{}.{}", id, ext)),
    }
}

/// Path of the HTML report for an auction
pub fn report_path(naming: OutputNaming, directory: &Path, auction_id: &str) -> PathBuf {
    artifact_path(naming, directory, auction_id, "html")
}

/// Path the downloaded manifest spreadsheet is stored at
pub fn download_path(naming: OutputNaming, directory: &Path, auction_id: &str) -> PathBuf {
    artifact_path(naming, directory, auction_id, "xls")
}

/// Pick the auction id used to name a report.
///
/// Priority 1: explicitly supplied id.
/// Priority 2: first auction id found in the manifest rows.
/// Priority 3: the manifest file stem.
pub fn resolve_auction_id(explicit: Option<&str>, manifest: &Manifest, source: &Path) -> String {
    if let Some(id) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
        return id.to_string();
    }
    if let Some(id) = manifest.auction_id() {
        return id.to_string();
    }
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Write a report, creating parent directories as needed
pub fn write_report(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    // Atomic write (temp + rename pattern)
    let temp_path = path.with_extension("html.tmp");
    std::fs::write(&temp_path, html)
        .with_context(|| format!("failed to write temporary file: {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("failed to rename temporary file to: {}", path.display()))?;

    tracing::info!(path = %path.display(), "report written");
    Ok(())
}

/// `file://` URL for a local path
pub fn file_url(path: &Path) -> Result<String> {
    let absolute = if path.is_relative() {
        std::env::current_dir()
            .context("failed to read current directory")?
            .join(path)
    } else {
        path.to_path_buf()
    };
    let display = absolute.to_string_lossy().replace('\\', "/");
    if display.starts_with('/') {
        Ok(format!("file://{}", display))
    } else {
        Ok(format!("file:///{}", display))
    }
}

/// Launcher for `url` on `os` (as in `std::env::consts::OS`).
///
/// Windows goes through the URL protocol handler rather than `cmd /C start`,
/// so `&` and `^` in the path reach the browser unchanged.
fn opener_command(os: &str, url: &str) -> Command {
    let mut cmd = match os {
        "macos" => Command::new("open"),
        "windows" => {
            let mut cmd = Command::new("rundll32");
            cmd.arg("url.dll,FileProtocolHandler");
            cmd
        }
        _ => Command::new("xdg-open"),
    };
    cmd.arg(url);
    cmd
}

/// Open a written report with the platform's default browser
pub fn open_in_browser(path: &Path) -> Result<()> {
    let url = file_url(path)?;
    tracing::debug!(%url, "opening report");

    let status = opener_command(std::env::consts::OS, &url)
        .status()
        .context("failed to launch browser")?;
    if !status.success() {
        anyhow::bail!("browser launcher exited with {}", status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestRow;

    #[test]
    fn test_report_path_per_auction() {
        let path = report_path(OutputNaming::PerAuction, Path::new("."), "12345");
        assert_eq!(path, PathBuf::from("./12345/12345.html"));
    }

    #[test]
    fn test_report_path_shared() {
        let path = report_path(OutputNaming::Shared, Path::new("Auction Lists"), "777");
        assert_eq!(path, PathBuf::from("Auction Lists/auction_id_777.html"));
    }

    #[test]
    fn test_download_path_matches_report_dir() {
        let path = download_path(OutputNaming::PerAuction, Path::new("out"), "9");
        assert_eq!(path, PathBuf::from("out/9/9.xls"));
    }

    #[test]
    fn test_sanitize_auction_id() {
        assert_eq!(sanitize_auction_id(" 123 "), "123");
        assert_eq!(sanitize_auction_id("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_auction_id("a:b*c"), "a_b_c");
        assert_eq!(sanitize_auction_id(""), "unknown");
        assert_eq!(sanitize_auction_id(".."), "unknown");
    }

    fn manifest_with_ids(ids: &[Option<&str>]) -> Manifest {
        Manifest {
            rows: ids
                .iter()
                .map(|id| ManifestRow {
                    title: "t".to_string(),
                    sku: Some(1),
                    manufacturer: String::new(),
                    auction_id: id.map(str::to_string),
                })
                .collect(),
            ..Manifest::default()
        }
    }

    #[test]
    fn test_resolve_auction_id_priority() {
        let manifest = manifest_with_ids(&[None, Some("from-rows")]);
        let source = Path::new("/tmp/manifest-file.csv");

        assert_eq!(resolve_auction_id(Some("given"), &manifest, source), "given");
        assert_eq!(resolve_auction_id(Some("  "), &manifest, source), "from-rows");
        assert_eq!(resolve_auction_id(None, &manifest, source), "from-rows");
        assert_eq!(
            resolve_auction_id(None, &manifest_with_ids(&[None]), source),
            "manifest-file"
        );
    }

    #[test]
    fn test_write_report_creates_dirs_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = report_path(OutputNaming::PerAuction, dir.path(), "42");

        write_report(&path, "<html>one</html>").unwrap();
        write_report(&path, "<html>two</html>").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html>two</html>");
        assert!(!path.with_extension("html.tmp").exists());
    }

    fn command_line(cmd: &Command) -> Vec<String> {
        std::iter::once(cmd.get_program())
            .chain(cmd.get_args())
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_opener_passes_url_as_single_argument() {
        let url = "file:///C:/Auction Lists/a&b^c.html";

        assert_eq!(
            command_line(&opener_command("windows", url)),
            vec!["rundll32", "url.dll,FileProtocolHandler", url]
        );
        assert_eq!(command_line(&opener_command("macos", url)), vec!["open", url]);
        assert_eq!(command_line(&opener_command("linux", url)), vec!["xdg-open", url]);
    }

    #[test]
    fn test_file_url_is_absolute() {
        let url = file_url(Path::new("report.html")).unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("/report.html"));
    }
}
