use std::fs;
use std::io::Read;
use std::path::{Component, Path};

use depot_core::BundledManifest;
use flate2::read::GzDecoder;
use tracing::{debug, warn};

use crate::error::{CafsError, io_error};
use crate::index::FilesMap;
use crate::store::Cafs;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A file of a package, before it is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the package root, `/`-separated
    pub path: String,
    pub bytes: Vec<u8>,
    pub mode: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddFilesResult {
    pub files: FilesMap,
    /// The package's own `package.json`, if it has one
    pub manifest: Option<BundledManifest>,
}

impl Cafs {
    /// Store every entry and return the resulting files index.
    pub fn add_files<I>(&self, entries: I) -> Result<AddFilesResult, CafsError>
    where
        I: IntoIterator<Item = FileEntry>,
    {
        let mut result = AddFilesResult::default();
        for entry in entries {
            if entry.path == "package.json" {
                result.manifest = Some(
                    BundledManifest::from_json_slice(&entry.bytes)
                        .map_err(CafsError::InvalidManifest)?,
                );
            }
            let info = self.add_file(&entry.bytes, entry.mode)?;
            result.files.insert(entry.path, info);
        }
        debug!(files = result.files.len(), "Added files to store");
        Ok(result)
    }

    /// Unpack a tar archive (gzip-compressed or not) into the store.
    ///
    /// The archive's top-level directory (`package/` for registry tarballs)
    /// is stripped from every path.
    pub fn add_files_from_tarball(&self, bytes: &[u8]) -> Result<AddFilesResult, CafsError> {
        let reader: Box<dyn Read + '_> = if bytes.starts_with(&GZIP_MAGIC) {
            Box::new(GzDecoder::new(bytes))
        } else {
            Box::new(bytes)
        };

        let mut archive = tar::Archive::new(reader);
        let mut entries = Vec::new();
        for entry in archive.entries().map_err(CafsError::Archive)? {
            let mut entry = entry.map_err(CafsError::Archive)?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let raw_path = entry.path().map_err(CafsError::Archive)?.into_owned();
            let Some(path) = package_relative_path(&raw_path) else {
                warn!(path = %raw_path.display(), "Skipping archive entry outside the package");
                continue;
            };
            let mode = entry.header().mode().unwrap_or(0o644);
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).map_err(CafsError::Archive)?;
            entries.push(FileEntry { path, bytes, mode });
        }

        self.add_files(entries)
    }

    /// Copy a package directory into the store, skipping `node_modules` and `.git`.
    pub fn add_files_from_dir(&self, dir: &Path) -> Result<AddFilesResult, CafsError> {
        let mut entries = Vec::new();
        collect_dir(dir, "", &mut entries)?;
        self.add_files(entries)
    }
}

fn package_relative_path(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.len() > 1 {
        parts.remove(0);
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

fn collect_dir(dir: &Path, prefix: &str, entries: &mut Vec<FileEntry>) -> Result<(), CafsError> {
    let read_dir = fs::read_dir(dir).map_err(io_error("read directory", dir))?;
    for dir_entry in read_dir {
        let dir_entry = dir_entry.map_err(io_error("read directory", dir))?;
        let name = dir_entry.file_name().to_string_lossy().into_owned();
        if name == "node_modules" || name == ".git" {
            continue;
        }
        let path = dir_entry.path();
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };

        let meta = fs::metadata(&path).map_err(io_error("stat", &path))?;
        if meta.is_dir() {
            collect_dir(&path, &relative, entries)?;
        } else if meta.is_file() {
            let bytes = fs::read(&path).map_err(io_error("read", &path))?;
            entries.push(FileEntry {
                path: relative,
                bytes,
                mode: file_mode(&meta),
            });
        }
    }
    Ok(())
}

#[cfg(unix)]
fn file_mode(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn file_mode(_meta: &fs::Metadata) -> u32 {
    0o644
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;

    fn tarball(files: &[(&str, &[u8], u32)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, bytes, mode) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(bytes.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append_data(&mut header, path, *bytes).unwrap();
        }
        let tar = builder.into_inner().unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tar).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_tarball_prefix_is_stripped() {
        let temp_dir = TempDir::new().unwrap();
        let cafs = Cafs::open(temp_dir.path()).unwrap();
        let bytes = tarball(&[
            ("package/package.json", br#"{"name":"foo","version":"v1.0.0"}"#, 0o644),
            ("package/lib/index.js", b"module.exports = 1", 0o644),
            ("package/bin/cli.js", b"#!/usr/bin/env node", 0o755),
        ]);

        let result = cafs.add_files_from_tarball(&bytes).unwrap();
        let names: Vec<_> = result.files.keys().cloned().collect();
        assert_eq!(names, vec!["bin/cli.js", "lib/index.js", "package.json"]);
        assert!(result.files["bin/cli.js"].is_executable());

        let manifest = result.manifest.unwrap();
        assert_eq!(manifest.name, "foo");
        assert_eq!(manifest.version, "1.0.0");
    }

    #[test]
    fn test_tarball_without_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let cafs = Cafs::open(temp_dir.path()).unwrap();
        let bytes = tarball(&[("repo/README.md", b"# hi", 0o644)]);

        let result = cafs.add_files_from_tarball(&bytes).unwrap();
        assert!(result.manifest.is_none());
        assert!(result.files.contains_key("README.md"));
    }

    #[test]
    fn test_relative_paths() {
        assert_eq!(
            package_relative_path(Path::new("package/a/b.js")).as_deref(),
            Some("a/b.js")
        );
        assert_eq!(package_relative_path(Path::new("b.js")).as_deref(), Some("b.js"));
        assert_eq!(package_relative_path(Path::new("package/../../etc/passwd")), None);
    }

    #[test]
    fn test_add_files_from_dir_skips_node_modules() {
        let temp_dir = TempDir::new().unwrap();
        let pkg = temp_dir.path().join("pkg");
        fs::create_dir_all(pkg.join("src")).unwrap();
        fs::create_dir_all(pkg.join("node_modules/dep")).unwrap();
        fs::write(pkg.join("package.json"), br#"{"name":"local","version":"0.0.1"}"#).unwrap();
        fs::write(pkg.join("src/main.js"), b"main()").unwrap();
        fs::write(pkg.join("node_modules/dep/index.js"), b"dep()").unwrap();

        let cafs = Cafs::open(temp_dir.path().join("store")).unwrap();
        let result = cafs.add_files_from_dir(&pkg).unwrap();

        assert!(result.files.contains_key("src/main.js"));
        assert!(result.files.contains_key("package.json"));
        assert!(!result.files.keys().any(|k| k.starts_with("node_modules")));
        assert_eq!(result.manifest.unwrap().name, "local");
    }

    #[test]
    fn test_invalid_manifest_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let cafs = Cafs::open(temp_dir.path()).unwrap();
        let err = cafs
            .add_files(vec![FileEntry {
                path: "package.json".to_string(),
                bytes: b"{ nope".to_vec(),
                mode: 0o644,
            }])
            .unwrap_err();
        assert_eq!(err.code(), "BAD_PACKAGE_JSON");
    }
}
