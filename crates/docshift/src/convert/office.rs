//! PDF to DOCX through LibreOffice's headless mode.
//!
//! # System Requirement
//!
//! LibreOffice must be installed and `soffice` reachable:
//! - **macOS**: `brew install --cask libreoffice`
//! - **Linux**: `apt install libreoffice` or `dnf install libreoffice`
//! - **Windows**: `winget install LibreOffice.LibreOffice`
//!
//! PDFs are opened with the Writer PDF import filter so the result is an
//! editable text document rather than a Draw drawing.

use super::DocumentConverter;
use crate::storage::{BestEffort, remove_path};
use crate::{DocshiftError, Result};
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::runtime::Handle;
use tokio::time::timeout;

/// Default timeout for a LibreOffice conversion, in seconds.
pub const DEFAULT_CONVERSION_TIMEOUT: u64 = 300;

fn libreoffice_install_message() -> String {
    "LibreOffice (soffice/libreoffice) is required for PDF to Word conversion. \
Install: macOS: 'brew install --cask libreoffice', \
Linux: 'apt install libreoffice', \
Windows: 'winget install LibreOffice.LibreOffice'. \
If LibreOffice is installed in a custom location, set tools.soffice or the DOCSHIFT_LIBREOFFICE_PATH environment variable."
        .to_string()
}

fn soffice_candidates() -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    let mut push_candidate = |path: PathBuf| {
        if seen.insert(path.clone()) {
            candidates.push(path);
        }
    };

    for var in ["DOCSHIFT_LIBREOFFICE_PATH", "SOFFICE_PATH", "LIBREOFFICE_PATH"] {
        if let Some(value) = env::var_os(var).filter(|v| !v.is_empty()) {
            push_candidate(PathBuf::from(value));
        }
    }

    if cfg!(target_os = "macos") {
        push_candidate(PathBuf::from("/Applications/LibreOffice.app/Contents/MacOS/soffice"));
    }

    if cfg!(target_os = "windows") {
        push_candidate(PathBuf::from("C:\\Program Files\\LibreOffice\\program\\soffice.exe"));
    }

    if let Some(prefix) = env::var_os("HOMEBREW_PREFIX") {
        push_candidate(PathBuf::from(prefix).join("bin/soffice"));
    }

    if let Some(path_env) = env::var_os("PATH") {
        for dir in env::split_paths(&path_env) {
            push_candidate(dir.join("soffice"));
            push_candidate(dir.join("libreoffice"));
            push_candidate(dir.join("soffice.exe"));
        }
    }

    candidates
}

fn locate_soffice_binary() -> Result<PathBuf> {
    soffice_candidates()
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| DocshiftError::MissingDependency(libreoffice_install_message()))
}

/// [`DocumentConverter`] backed by `soffice --headless`.
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    soffice: Option<PathBuf>,
    timeout: Duration,
}

impl LibreOfficeConverter {
    /// `soffice` overrides binary discovery when set.
    pub fn new(soffice: Option<PathBuf>, timeout: Duration) -> Self {
        Self { soffice, timeout }
    }

    fn binary(&self) -> Result<PathBuf> {
        match &self.soffice {
            Some(path) if path.is_file() => Ok(path.clone()),
            Some(path) => Err(DocshiftError::MissingDependency(format!(
                "Configured LibreOffice executable '{}' does not exist",
                path.display()
            ))),
            None => locate_soffice_binary(),
        }
    }
}

impl DocumentConverter for LibreOfficeConverter {
    fn convert_to_docx(&self, pdf: &Path, output: &Path) -> Result<()> {
        let soffice = self.binary()?;
        let out_dir = output
            .parent()
            .ok_or_else(|| DocshiftError::Other(format!("Output path has no parent: {}", output.display())))?;

        // Per-run profile and raw output, removed whatever the outcome.
        let scratch = out_dir.join(format!("soffice-{}", uuid::Uuid::new_v4().simple()));
        std::fs::create_dir(&scratch)?;

        let result = self
            .run_soffice(&soffice, &scratch, pdf)
            .and_then(|produced| std::fs::rename(&produced, output).map_err(DocshiftError::from));
        remove_path(&scratch).best_effort();
        result
    }
}

/// `file://` URL for `-env:UserInstallation`.
fn profile_url(dir: &Path) -> String {
    let path = dir.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{}", path)
    } else {
        format!("file:///{}", path)
    }
}

/// Drive `future` on the ambient runtime, or on a private one when called
/// outside any runtime.
fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    match Handle::try_current() {
        Ok(handle) => Ok(handle.block_on(future)),
        Err(_) => {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
            Ok(runtime.block_on(future))
        }
    }
}

/// Spawn `command` and collect its output, killing it after `limit`.
async fn wait_with_timeout(mut command: Command, soffice: &Path, limit: Duration) -> Result<std::process::Output> {
    let child = command.spawn().map_err(|e| {
        DocshiftError::collaborator_with_source(format!("Failed to execute LibreOffice at '{}'", soffice.display()), e)
    })?;

    match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(DocshiftError::collaborator_with_source("Failed to wait for LibreOffice", e)),
        // Dropping the wait future kills the child.
        Err(_) => Err(DocshiftError::collaborator(format!(
            "LibreOffice conversion timed out after {} seconds",
            limit.as_secs()
        ))),
    }
}

impl LibreOfficeConverter {
    /// Run soffice with its profile and `--outdir` under `scratch`, returning the produced file.
    fn run_soffice(&self, soffice: &Path, scratch: &Path, pdf: &Path) -> Result<PathBuf> {
        let profile = scratch.join("profile");
        let out_dir = scratch.join("out");
        std::fs::create_dir(&out_dir)?;

        let mut command = Command::new(soffice);
        command
            .arg(format!("-env:UserInstallation={}", profile_url(&profile)))
            .arg("--headless")
            .arg("--infilter=writer_pdf_import")
            .arg("--convert-to")
            .arg("docx")
            .arg("--outdir")
            .arg(&out_dir)
            .arg(pdf)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = block_on(wait_with_timeout(command, soffice, self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocshiftError::collaborator(format!(
                "LibreOffice process failed with return code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let input_stem = pdf
            .file_stem()
            .ok_or_else(|| DocshiftError::Other("Invalid input file name".to_string()))?;
        let produced = out_dir.join(format!("{}.docx", input_stem.to_string_lossy()));

        match std::fs::metadata(&produced) {
            Ok(meta) if meta.len() > 0 => Ok(produced),
            Ok(_) => Err(DocshiftError::collaborator("LibreOffice conversion produced empty file")),
            Err(_) => Err(DocshiftError::collaborator(
                "LibreOffice conversion completed but output file not found",
            )),
        }
    }
}
