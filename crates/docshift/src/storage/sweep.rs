//! Startup sweep of artifacts left behind by a previous process.
//!
//! Deferred deletions live only in memory, so a restart strands whatever was
//! still queued. The sweep removes direct children of every category root
//! whose modification time is older than `max_age`.

use super::cleanup::{Removal, remove_path};
use super::layout::{Category, StorageLayout};
use std::time::{Duration, SystemTime};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
}

/// Remove stale entries under every category root.
///
/// Missing roots are skipped. Individual failures are counted and logged,
/// never returned.
pub fn sweep_stale(layout: &StorageLayout, max_age: Duration) -> SweepReport {
    let mut report = SweepReport::default();
    let now = SystemTime::now();

    for category in Category::ALL {
        let root = layout.root(category);
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Skipping sweep of {}: {}", root.display(), e);
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(_) => continue,
            };
            let age = now.duration_since(modified).unwrap_or_default();
            if age < max_age {
                continue;
            }

            match remove_path(&path) {
                Ok(Removal::Removed) => report.removed += 1,
                Ok(Removal::AlreadyGone) => {}
                Err(e) => {
                    tracing::warn!("Sweep could not remove stale artifact: {}", e);
                    report.failed += 1;
                }
            }
        }
    }

    if report.removed > 0 || report.failed > 0 {
        tracing::info!(
            "Swept stale artifacts: {} removed, {} failed",
            report.removed,
            report.failed
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use tempfile::tempdir;

    fn age(path: &std::path::Path, secs: u64) {
        let then = SystemTime::now() - Duration::from_secs(secs);
        filetime::set_file_mtime(path, FileTime::from_system_time(then)).unwrap();
    }

    #[test]
    fn test_sweep_removes_only_stale_entries() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::under(dir.path());
        layout.ensure().unwrap();

        let stale_upload = layout.root(Category::Upload).join("old.pdf");
        std::fs::write(&stale_upload, b"%PDF").unwrap();
        age(&stale_upload, 3600);

        let stale_session = layout.root(Category::ImageArchive).join("scan_old");
        std::fs::create_dir_all(&stale_session).unwrap();
        std::fs::write(stale_session.join("scan_page_1.png"), b"png").unwrap();
        age(&stale_session, 3600);

        let fresh_output = layout.root(Category::Spreadsheet).join("fresh.xlsx");
        std::fs::write(&fresh_output, b"PK").unwrap();

        let report = sweep_stale(&layout, Duration::from_secs(900));

        assert_eq!(report, SweepReport { removed: 2, failed: 0 });
        assert!(!stale_upload.exists());
        assert!(!stale_session.exists());
        assert!(fresh_output.exists());
        for category in Category::ALL {
            assert!(layout.root(category).is_dir());
        }
    }

    #[test]
    fn test_sweep_missing_roots_is_noop() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::under(dir.path().join("nothing-here"));
        assert_eq!(sweep_stale(&layout, Duration::ZERO), SweepReport::default());
    }
}
