//! Freshness of packages installed from `file:` tarballs
//!
//! A local tarball can change without its path changing. After unpacking
//! one, the integrity it was unpacked from is recorded next to the store so
//! later installs can tell whether the stored files are still current.

use std::path::{Path, PathBuf};

use depot_core::{Integrity, Resolution};

use crate::error::RequestError;

const TARBALL_INTEGRITY_FILENAME: &str = "tarball-integrity";

/// True when the stored package was unpacked from the tarball currently on disk.
pub async fn is_up_to_date(
    resolution: &Resolution,
    record_dir: &Path,
    lockfile_dir: &Path,
) -> bool {
    let Ok(recorded) = tokio::fs::read_to_string(record_dir.join(TARBALL_INTEGRITY_FILENAME)).await
    else {
        return false;
    };
    let Ok(recorded) = Integrity::parse(recorded.trim()) else {
        return false;
    };
    if resolution.integrity().is_some_and(|integrity| *integrity != recorded) {
        return false;
    }

    let Some(relative) = resolution.local_tarball_path() else {
        return false;
    };
    let Ok(bytes) = tokio::fs::read(lockfile_dir.join(relative)).await else {
        return false;
    };
    tokio::task::spawn_blocking(move || recorded.check(&bytes))
        .await
        .unwrap_or(false)
}

/// Remember which tarball a package was unpacked from.
pub async fn write_record(record_dir: &Path, integrity: &Integrity) -> Result<(), RequestError> {
    let path: PathBuf = record_dir.join(TARBALL_INTEGRITY_FILENAME);
    let io_error = |source| RequestError::Io {
        path: path.clone(),
        source,
    };
    tokio::fs::create_dir_all(record_dir).await.map_err(io_error)?;
    tokio::fs::write(&path, integrity.to_string())
        .await
        .map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn local(integrity: Option<Integrity>) -> Resolution {
        Resolution::Tarball {
            tarball: "file:pkg.tgz".to_string(),
            integrity,
        }
    }

    #[tokio::test]
    async fn test_missing_record_is_stale() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("pkg.tgz"), b"v1").unwrap();
        let record_dir = temp_dir.path().join("record");
        assert!(!is_up_to_date(&local(None), &record_dir, temp_dir.path()).await);
    }

    #[tokio::test]
    async fn test_record_matches_unchanged_tarball() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("pkg.tgz"), b"v1").unwrap();
        let integrity = Integrity::from_bytes(b"v1");
        let record_dir = temp_dir.path().join("record");
        write_record(&record_dir, &integrity).await.unwrap();

        assert!(is_up_to_date(&local(Some(integrity.clone())), &record_dir, temp_dir.path()).await);
        // Unknown integrity falls back to hashing the tarball
        assert!(is_up_to_date(&local(None), &record_dir, temp_dir.path()).await);
    }

    #[tokio::test]
    async fn test_changed_tarball_is_stale() {
        let temp_dir = TempDir::new().unwrap();
        let record_dir = temp_dir.path().join("record");
        write_record(&record_dir, &Integrity::from_bytes(b"v1")).await.unwrap();
        std::fs::write(temp_dir.path().join("pkg.tgz"), b"v2").unwrap();

        assert!(!is_up_to_date(&local(None), &record_dir, temp_dir.path()).await);
        assert!(
            !is_up_to_date(
                &local(Some(Integrity::from_bytes(b"v2"))),
                &record_dir,
                temp_dir.path()
            )
            .await
        );
    }
}
