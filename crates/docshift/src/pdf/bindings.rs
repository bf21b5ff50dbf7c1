use super::error::PdfError;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Mutex;

/// Directory searched for the pdfium shared library before the system paths.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Cached outcome of the first binding attempt.
enum InitializationState {
    Uninitialized,
    /// `lib_dir` is `None` when the system library was used.
    Initialized { lib_dir: Option<PathBuf> },
    Failed(String),
}

/// Pdfium is bound once, on first use. Later calls create fresh bindings
/// from the cached location.
static PDFIUM_STATE: Lazy<Mutex<InitializationState>> = Lazy::new(|| Mutex::new(InitializationState::Uninitialized));

fn bind_at(lib_dir: Option<&PathBuf>) -> Result<Box<dyn PdfiumLibraryBindings>, PdfiumError> {
    match lib_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_system_library(),
    }
}

fn bind_pdfium_impl() -> Result<Option<PathBuf>, String> {
    if let Some(dir) = std::env::var_os(PDFIUM_LIB_PATH_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
    {
        match bind_at(Some(&dir)) {
            Ok(_) => return Ok(Some(dir)),
            Err(e) => tracing::warn!(
                "Could not load pdfium from {}={}: {}; falling back to the system library",
                PDFIUM_LIB_PATH_ENV,
                dir.display(),
                e
            ),
        }
    }

    bind_at(None)
        .map(|_| None)
        .map_err(|e| format!("Failed to initialize Pdfium: {}", e))
}

/// Get Pdfium bindings, initializing on the first call.
///
/// A failed initialization is remembered; later calls fail fast with the
/// same message instead of probing the filesystem again.
pub(crate) fn bind_pdfium(context: &'static str) -> Result<Box<dyn PdfiumLibraryBindings>, PdfError> {
    let mut state = PDFIUM_STATE
        .lock()
        .map_err(|e| PdfError::BindingFailed(format!("Failed to acquire lock on Pdfium state ({}): {}", context, e)))?;

    if let InitializationState::Uninitialized = &*state {
        *state = match bind_pdfium_impl() {
            Ok(lib_dir) => {
                tracing::info!("Pdfium initialized ({})", context);
                InitializationState::Initialized { lib_dir }
            }
            Err(err) => InitializationState::Failed(err),
        };
    }

    match &*state {
        InitializationState::Initialized { lib_dir } => bind_at(lib_dir.as_ref())
            .map_err(|e| PdfError::BindingFailed(format!("Failed to create Pdfium bindings ({}): {}", context, e))),
        InitializationState::Failed(err) => Err(PdfError::BindingFailed(format!(
            "Pdfium initialization failed ({}): {}",
            context, err
        ))),
        InitializationState::Uninitialized => Err(PdfError::BindingFailed(format!(
            "Pdfium state not initialized ({})",
            context
        ))),
    }
}

/// A ready-to-use [`Pdfium`] instance.
pub(crate) fn pdfium(context: &'static str) -> Result<Pdfium, PdfError> {
    Ok(Pdfium::new(bind_pdfium(context)?))
}
