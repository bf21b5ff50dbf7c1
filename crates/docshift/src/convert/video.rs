//! Remote video downloads through yt-dlp.
//!
//! yt-dlp runs as a subprocess and is asked to print the final path of the
//! file it wrote. The reported path is then normalized to the `.mp4`
//! container the endpoints promise.

use super::{FetchOptions, FetchRequest, VideoFetcher};
use crate::{DocshiftError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Prefer separate mp4/m4a streams, fall back to a single mp4.
pub const FORMAT_SELECTOR: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]";

const TARGET_EXTENSION: &str = "mp4";

/// The platforms the service downloads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSource {
    YouTube,
    TikTok,
}

impl VideoSource {
    pub fn output_template(&self) -> &'static str {
        match self {
            VideoSource::YouTube => "%(id)s_%(title)s.%(ext)s",
            VideoSource::TikTok => "tiktok_%(id)s_%(upload_date)s_%(timestamp)s.%(ext)s",
        }
    }

    pub fn options(&self) -> FetchOptions {
        match self {
            VideoSource::YouTube => FetchOptions::default(),
            VideoSource::TikTok => FetchOptions {
                retries: Some(5),
                fragment_retries: Some(5),
                skip_unavailable_fragments: true,
            },
        }
    }

    /// Prefix for collaborator failures reported to the client.
    pub fn failure_context(&self) -> &'static str {
        match self {
            VideoSource::YouTube => "Failed to download video",
            VideoSource::TikTok => "Failed to download TikTok video",
        }
    }

    pub fn request(&self, url: impl Into<String>, output_dir: impl Into<PathBuf>) -> FetchRequest {
        FetchRequest {
            url: url.into(),
            output_dir: output_dir.into(),
            output_template: self.output_template().to_string(),
            options: self.options(),
        }
    }
}

/// Fetch a video and return the path of the `.mp4` it produced.
///
/// If the engine reports a different container, the same stem with an
/// `.mp4` extension is expected instead. A missing file is a failure.
pub fn download_video(fetcher: &dyn VideoFetcher, request: &FetchRequest) -> Result<PathBuf> {
    let reported = fetcher.fetch(request)?;
    let expected = normalize_container(&reported);

    if !expected.is_file() {
        return Err(DocshiftError::collaborator(format!(
            "expected output {} was not produced",
            expected.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
        )));
    }

    tracing::debug!("Downloaded {} to {}", request.url, expected.display());
    Ok(expected)
}

fn normalize_container(reported: &Path) -> PathBuf {
    let is_mp4 = reported
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(TARGET_EXTENSION));
    if is_mp4 {
        reported.to_path_buf()
    } else {
        reported.with_extension(TARGET_EXTENSION)
    }
}

/// [`VideoFetcher`] that shells out to the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    binary: PathBuf,
}

impl YtDlpFetcher {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    fn args(request: &FetchRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-f",
            FORMAT_SELECTOR,
            "--merge-output-format",
            TARGET_EXTENSION,
            "--remux-video",
            TARGET_EXTENSION,
            "--no-playlist",
            "--quiet",
            "--no-warnings",
            "--no-progress",
            "--print",
            "after_move:filepath",
        ]
        .iter()
        .map(OsString::from)
        .collect();

        args.push("-P".into());
        args.push(request.output_dir.clone().into_os_string());
        args.push("-o".into());
        args.push(request.output_template.clone().into());

        if let Some(retries) = request.options.retries {
            args.push("--retries".into());
            args.push(retries.to_string().into());
        }
        if let Some(retries) = request.options.fragment_retries {
            args.push("--fragment-retries".into());
            args.push(retries.to_string().into());
        }
        if request.options.skip_unavailable_fragments {
            args.push("--skip-unavailable-fragments".into());
        }

        args.push("--".into());
        args.push(request.url.clone().into());
        args
    }
}

impl VideoFetcher for YtDlpFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<PathBuf> {
        let output = Command::new(&self.binary)
            .args(Self::args(request))
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DocshiftError::MissingDependency(format!(
                        "yt-dlp executable '{}' was not found. Install it with 'pip install yt-dlp' or set tools.yt_dlp.",
                        self.binary.display()
                    ))
                } else {
                    DocshiftError::collaborator_with_source(
                        format!("could not run '{}'", self.binary.display()),
                        e,
                    )
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("yt-dlp exited with an error");
            return Err(DocshiftError::collaborator(detail.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reported = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| DocshiftError::collaborator("yt-dlp did not report an output file"))?;

        Ok(PathBuf::from(reported))
    }
}
