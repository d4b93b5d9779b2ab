use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use depot_core::{BundledManifest, Integrity, PkgResolutionId, dep_path_to_filename};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{CafsError, io_error};
use crate::index::{FilesMap, PackageFileInfo, PackageFilesIndex};

const FILES_DIR: &str = "files";
const INDEX_DIR: &str = "index";
const LOCAL_DIR: &str = "local";
const TMP_DIR: &str = "tmp";

/// Handle to a store directory on disk.
///
/// Cheap to clone; every clone refers to the same directory. Several
/// handles, in one process or many, may share a store.
#[derive(Debug, Clone)]
pub struct Cafs {
    store_dir: PathBuf,
}

impl Cafs {
    /// Open (creating if needed) the store rooted at `store_dir`.
    pub fn open(store_dir: impl Into<PathBuf>) -> Result<Self, CafsError> {
        let store_dir = store_dir.into();
        for dir in [FILES_DIR, INDEX_DIR, TMP_DIR] {
            let path = store_dir.join(dir);
            fs::create_dir_all(&path).map_err(io_error("create store directory", &path))?;
        }
        debug!(store = %store_dir.display(), "Opened content-addressable store");
        Ok(Self { store_dir })
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Location of the object holding content with `integrity`.
    pub fn content_path(&self, integrity: &Integrity, mode: u32) -> PathBuf {
        let hex = integrity.hex_digest();
        let (prefix, rest) = hex.split_at(2);
        let name = if mode & 0o111 != 0 {
            format!("{rest}-exec")
        } else {
            rest.to_string()
        };
        self.store_dir.join(FILES_DIR).join(prefix).join(name)
    }

    /// Location of the files index for a package id.
    pub fn index_path(&self, id: &PkgResolutionId, max_length: usize) -> PathBuf {
        self.store_dir
            .join(INDEX_DIR)
            .join(format!("{}.json", dep_path_to_filename(id.as_str(), max_length)))
    }

    /// Directory holding freshness records for a package installed from a local tarball.
    pub fn local_record_dir(&self, id: &PkgResolutionId, max_length: usize) -> PathBuf {
        self.store_dir
            .join(LOCAL_DIR)
            .join(dep_path_to_filename(id.as_str(), max_length))
    }

    /// Store one file. An existing object is left untouched only when its
    /// bytes match; a damaged object is replaced.
    pub fn add_file(&self, bytes: &[u8], mode: u32) -> Result<PackageFileInfo, CafsError> {
        let integrity = Integrity::from_bytes(bytes);
        let path = self.content_path(&integrity, mode);
        let size = bytes.len() as u64;

        if !holds_content(&path, bytes) {
            self.write_atomic(&path, bytes, Some(mode))?;
        }

        Ok(PackageFileInfo {
            integrity,
            mode,
            size,
            checked_at: Some(now_millis()),
        })
    }

    /// Read a stored file, checking it against its recorded integrity.
    pub fn read_file_content(&self, info: &PackageFileInfo) -> Result<Vec<u8>, CafsError> {
        let path = self.content_path(&info.integrity, info.mode);
        let bytes = fs::read(&path).map_err(io_error("read content object", &path))?;
        if !info.integrity.check(&bytes) {
            return Err(CafsError::IntegrityMismatch {
                path,
                expected: info.integrity.clone(),
                actual: Integrity::with_algorithm(info.integrity.algorithm(), &bytes),
            });
        }
        Ok(bytes)
    }

    /// Read and parse the `package.json` recorded in `files`, if there is one.
    pub fn read_manifest(&self, files: &FilesMap) -> Result<Option<BundledManifest>, CafsError> {
        let Some(info) = files.get("package.json") else {
            return Ok(None);
        };
        let bytes = self.read_file_content(info)?;
        BundledManifest::from_json_slice(&bytes)
            .map(Some)
            .map_err(CafsError::InvalidManifest)
    }

    /// Absolute object paths for every file of a package
    pub fn files_to_paths(&self, files: &FilesMap) -> BTreeMap<String, PathBuf> {
        files
            .iter()
            .map(|(name, info)| (name.clone(), self.content_path(&info.integrity, info.mode)))
            .collect()
    }

    /// Load a files index. Missing or unreadable indexes yield `None`.
    pub fn read_index(&self, path: &Path) -> Result<Option<PackageFilesIndex>, CafsError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read files index", path)(e)),
        };
        match serde_json::from_slice(&bytes) {
            Ok(index) => Ok(Some(index)),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Ignoring unreadable files index");
                Ok(None)
            }
        }
    }

    /// Publish a files index atomically.
    pub fn write_index(&self, path: &Path, index: &PackageFilesIndex) -> Result<(), CafsError> {
        let json = serde_json::to_vec(index).map_err(|source| CafsError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        self.write_atomic(path, &json, None)
    }

    /// Write `bytes` to a staging file and rename it over `target`.
    pub(crate) fn write_atomic(
        &self,
        target: &Path,
        bytes: &[u8],
        mode: Option<u32>,
    ) -> Result<(), CafsError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_error("create directory", parent))?;
        }

        let tmp_dir = self.store_dir.join(TMP_DIR);
        fs::create_dir_all(&tmp_dir).map_err(io_error("create directory", &tmp_dir))?;
        let mut tmp =
            NamedTempFile::new_in(&tmp_dir).map_err(io_error("create temp file in", &tmp_dir))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(io_error("write temp file", tmp.path()))?;

        if let Some(mode) = mode {
            set_mode(tmp.path(), mode)?;
        }

        tmp.persist(target)
            .map_err(|e| io_error("move into place", target)(e.error))?;
        Ok(())
    }

    pub(crate) fn remove_object(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                debug!(path = %path.display(), error = %e, "Failed to remove content object");
            }
        }
    }
}

fn holds_content(path: &Path, bytes: &[u8]) -> bool {
    let same_size = fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() == bytes.len() as u64)
        .unwrap_or(false);
    if !same_size {
        return false;
    }
    match fs::read(path) {
        Ok(existing) if existing == bytes => true,
        Ok(_) => {
            debug!(path = %path.display(), "Replacing corrupted content object");
            false
        }
        Err(_) => false,
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), CafsError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = if mode & 0o111 != 0 { 0o755 } else { 0o644 };
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(io_error("set permissions on", path))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), CafsError> {
    Ok(())
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn system_time_millis(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp_millis()
}
