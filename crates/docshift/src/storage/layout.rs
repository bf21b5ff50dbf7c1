//! Category roots and collision-free path allocation.
//!
//! Every artifact lives under the root of its [`Category`]. Names carry a
//! random 128-bit identifier (UUID v4, 32 hex digits), and the allocator
//! re-rolls on the off chance a name is already taken.

use crate::core::StorageConfig;
use crate::{DocshiftError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Artifact category; each one owns a storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Upload,
    Video,
    Spreadsheet,
    Document,
    ImageArchive,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Upload,
        Category::Video,
        Category::Spreadsheet,
        Category::Document,
        Category::ImageArchive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Upload => "upload",
            Category::Video => "video",
            Category::Spreadsheet => "spreadsheet",
            Category::Document => "document",
            Category::ImageArchive => "image_archive",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved storage roots, one per category.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    downloads: PathBuf,
    pdf_uploads: PathBuf,
    excel_outputs: PathBuf,
    word_outputs: PathBuf,
    image_outputs: PathBuf,
}

impl StorageLayout {
    pub fn from_config(config: &StorageConfig) -> Self {
        let resolve = |root: &Path| config.base_dir.join(root);
        Self {
            downloads: resolve(&config.downloads),
            pdf_uploads: resolve(&config.pdf_uploads),
            excel_outputs: resolve(&config.excel_outputs),
            word_outputs: resolve(&config.word_outputs),
            image_outputs: resolve(&config.image_outputs),
        }
    }

    /// Layout with the default root names under `base_dir`.
    pub fn under(base_dir: impl Into<PathBuf>) -> Self {
        Self::from_config(&StorageConfig {
            base_dir: base_dir.into(),
            ..StorageConfig::default()
        })
    }

    pub fn root(&self, category: Category) -> &Path {
        match category {
            Category::Upload => &self.pdf_uploads,
            Category::Video => &self.downloads,
            Category::Spreadsheet => &self.excel_outputs,
            Category::Document => &self.word_outputs,
            Category::ImageArchive => &self.image_outputs,
        }
    }

    /// Create every category root that does not exist yet.
    pub fn ensure(&self) -> Result<()> {
        for category in Category::ALL {
            let root = self.root(category);
            if !root.is_dir() {
                std::fs::create_dir_all(root)?;
                tracing::info!("Created {} storage root at {}", category, root.display());
            }
        }
        Ok(())
    }

    /// Allocate a fresh file path under the category root.
    ///
    /// The extension is appended as given (a leading dot is tolerated). The
    /// file itself is not created.
    pub fn allocate(&self, category: Category, extension: Option<&str>) -> PathBuf {
        let root = self.root(category);
        loop {
            let mut name = unique_id();
            if let Some(ext) = extension.map(|e| e.trim_start_matches('.')).filter(|e| !e.is_empty()) {
                name.push('.');
                name.push_str(ext);
            }
            let path = root.join(name);
            if !path.exists() {
                tracing::debug!("Allocated {} path {}", category, path.display());
                return path;
            }
        }
    }

    /// Allocate `<stem>_<id>.<extension>` under the category root.
    ///
    /// `stem` must already be sanitized.
    pub fn allocate_derived(&self, category: Category, stem: &str, extension: &str) -> PathBuf {
        let root = self.root(category);
        let extension = extension.trim_start_matches('.');
        loop {
            let path = root.join(format!("{}_{}.{}", stem, unique_id(), extension));
            if !path.exists() {
                tracing::debug!("Allocated {} path {}", category, path.display());
                return path;
            }
        }
    }

    /// Allocate and create a working directory, `<prefix>_<id>` or `<id>`.
    ///
    /// The directory exists when this returns. Creation is atomic, so two
    /// callers can never end up sharing a directory.
    pub fn allocate_dir(&self, category: Category, prefix: Option<&str>) -> Result<PathBuf> {
        let root = self.root(category);
        loop {
            let name = match prefix {
                Some(prefix) => format!("{}_{}", prefix, unique_id()),
                None => unique_id(),
            };
            let path = root.join(name);
            match std::fs::create_dir(&path) {
                Ok(()) => {
                    tracing::debug!("Created {} working directory {}", category, path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(DocshiftError::Io(std::io::Error::new(
                        e.kind(),
                        format!("Failed to create directory {}: {}", path.display(), e),
                    )));
                }
            }
        }
    }
}

/// `path` with `.<extension>` appended to its full file name.
///
/// Unlike [`Path::with_extension`] this never eats a dot that is part of a stem.
pub fn with_appended_extension(path: &Path, extension: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".");
    os.push(extension.trim_start_matches('.'));
    PathBuf::from(os)
}

fn unique_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_creates_all_roots() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::under(dir.path());
        layout.ensure().unwrap();

        for category in Category::ALL {
            assert!(layout.root(category).is_dir(), "missing root for {category}");
        }
        assert_eq!(layout.root(Category::Upload), dir.path().join("pdf_uploads"));
        assert_eq!(layout.root(Category::Video), dir.path().join("downloads"));

        // Idempotent.
        layout.ensure().unwrap();
    }

    #[test]
    fn test_allocate_is_rooted_and_extension_is_kept() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::under(dir.path());
        layout.ensure().unwrap();

        let path = layout.allocate(Category::Upload, Some("pdf"));
        assert!(path.starts_with(layout.root(Category::Upload)));
        assert_eq!(path.extension().unwrap(), "pdf");
        assert!(!path.exists());

        let dotted = layout.allocate(Category::Upload, Some(".pdf"));
        assert!(dotted.to_string_lossy().ends_with(".pdf"));
        assert!(!dotted.to_string_lossy().ends_with("..pdf"));

        let bare = layout.allocate(Category::Upload, None);
        assert_eq!(bare.file_name().unwrap().len(), 32);
    }

    #[test]
    fn test_allocate_never_collides() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::under(dir.path());
        layout.ensure().unwrap();

        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(layout.allocate(Category::Spreadsheet, Some("xlsx"))));
        }
    }

    #[test]
    fn test_allocate_derived_name_shape() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::under(dir.path());
        layout.ensure().unwrap();

        let path = layout.allocate_derived(Category::Document, "report", "docx");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("report_"));
        assert!(name.ends_with(".docx"));
        assert_eq!(name.len(), "report_".len() + 32 + ".docx".len());
    }

    #[test]
    fn test_allocate_dir_creates_distinct_directories() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::under(dir.path());
        layout.ensure().unwrap();

        let a = layout.allocate_dir(Category::ImageArchive, Some("scan")).unwrap();
        let b = layout.allocate_dir(Category::ImageArchive, Some("scan")).unwrap();
        assert!(a.is_dir());
        assert!(b.is_dir());
        assert_ne!(a, b);
        assert!(a.file_name().unwrap().to_string_lossy().starts_with("scan_"));
    }

    #[test]
    fn test_allocate_dir_without_root_fails() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::under(dir.path().join("missing"));
        assert!(layout.allocate_dir(Category::Video, None).is_err());
    }

    #[test]
    fn test_with_appended_extension_keeps_dotted_stems() {
        let path = Path::new("/tmp/v1.2_abc");
        assert_eq!(with_appended_extension(path, "zip"), PathBuf::from("/tmp/v1.2_abc.zip"));
    }
}
