//! Content-addressable file store
//!
//! Every file of every package is stored once, under the SHA-512 digest of
//! its content. A package is described by a small JSON files index mapping
//! its relative paths to those digests.
//!
//! ## Layout
//!
//! ```text
//! <store>/
//!   files/<hex[0..2]>/<hex[2..]>           content object
//!   files/<hex[0..2]>/<hex[2..]>-exec      executable content object
//!   index/<encoded package id>.json        package files index
//!   local/<encoded package id>/            freshness records for local tarballs
//!   tmp/                                   staging for atomic publishes
//! ```
//!
//! Objects and indexes are written to `tmp/` first and renamed into place,
//! so a reader sees either the complete file or nothing. Writing content
//! that already exists is a no-op, which makes concurrent writers from
//! several processes safe: whoever renames last publishes identical bytes.

pub mod error;
pub mod index;
pub mod store;
pub mod unpack;
pub mod verify;

pub use error::CafsError;
pub use index::{FilesMap, PackageFileInfo, PackageFilesIndex, ResolvedFrom};
pub use store::Cafs;
pub use unpack::{AddFilesResult, FileEntry};
