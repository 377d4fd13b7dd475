//! Repository archive creation.
//!
//! Turns each platform's staged repository subtree into
//! `repos/<project>-<platform>.tar.gz` under the build's version directory.
//!
//! # Sub-modules
//!
//! - [`archiver`]: skip/strict policy and batch orchestration.
//! - [`backend`]: the `tar` tool and in-process archive writers.
//! - [`digest`]: SHA-256 of written archives.
//! - [`layout`]: staging tree paths.
//! - [`naming`]: archive name policy.

pub mod archiver;
pub mod backend;
pub mod digest;
pub mod layout;
pub mod naming;

pub use archiver::{
    ArchiveOutcome, ArchiveReport, Archiver, CreatedArchive, FailurePolicy, PlatformOutcome,
    STRICT_MODE_ENV, StrictMode, UnknownFailurePolicy,
};
pub use backend::{
    ArchiveBackend, ArchiveRequest, BackendKind, NativeBackend, TarToolBackend, backend_for,
};
pub use digest::compute_sha256;
pub use layout::{ArchiveLayout, REPOS_DIR, is_empty_or_absent};
pub use naming::{ARCHIVE_EXTENSION, ArchiveName};
