use std::fs;

use tracing::debug;

use crate::index::{FilesMap, PackageFileInfo};
use crate::store::{Cafs, now_millis, system_time_millis};

/// Files modified within this window after their last check are trusted
const MTIME_SLACK_MS: i64 = 100;

impl Cafs {
    /// Check that every file of a package is present and intact.
    ///
    /// Objects whose size differs from the record, or whose content no
    /// longer matches its hash, are removed so the next write restores them.
    /// Files untouched since `checked_at` are not re-hashed; files that are
    /// re-hashed successfully get a fresh `checked_at`.
    pub fn verify_integrity(&self, files: &mut FilesMap) -> bool {
        let mut passed = true;
        for (name, info) in files.iter_mut() {
            if !self.verify_file(info) {
                debug!(
                    file = %name,
                    integrity = %info.integrity,
                    "Stored file failed verification"
                );
                passed = false;
            }
        }
        passed
    }

    fn verify_file(&self, info: &mut PackageFileInfo) -> bool {
        let path = self.content_path(&info.integrity, info.mode);
        let Ok(meta) = fs::metadata(&path) else {
            return false;
        };

        if meta.len() != info.size {
            self.remove_object(&path);
            return false;
        }

        let mtime = meta.modified().ok().map(system_time_millis);
        let modified_since_check = match (mtime, info.checked_at) {
            (Some(mtime), Some(checked_at)) => mtime - checked_at > MTIME_SLACK_MS,
            _ => true,
        };
        if !modified_since_check {
            return true;
        }

        match fs::read(&path) {
            Ok(bytes) if info.integrity.check(&bytes) => {
                info.checked_at = Some(now_millis());
                true
            }
            _ => {
                self.remove_object(&path);
                false
            }
        }
    }
}
