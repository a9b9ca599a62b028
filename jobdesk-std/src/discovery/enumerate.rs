//! Enumeration strategies: which type identifiers live under a namespace.
//!
//! A namespace is a Rust module path such as `sdk_b` or `my_crate::workers`.
//! A namespace matches a type identifier when its segments appear, in order
//! and aligned on `::`, in the identifier's module path, so `sdk_b` matches
//! both `sdk_b::StoneWorker` and `app::sdk_b::StoneWorker`.

use super::catalog::ProviderRegistration;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;
use zip::{ZipArchive, result::ZipError};

/// Default file suffix of compiled-unit files.
pub const DEFAULT_SUFFIX: &str = ".worker";

/// Errors raised by an [`Enumerator`].
#[derive(Error, Debug)]
pub enum EnumerateError {
    /// Nothing is known under the namespace. Scans skip it with a warning.
    #[error("namespace `{0}` was not found")]
    NotFound(String),

    /// Reading the underlying resource failed.
    #[error("could not read `{}`", path.display())]
    Io {
        /// The resource being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The archive is unreadable or not a zip archive.
    #[error("could not open archive `{}`", path.display())]
    Archive {
        /// The archive file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: ZipError,
    },
}

impl EnumerateError {
    fn io(path: &Path, source: io::Error) -> Self {
        EnumerateError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Lists the type identifiers under a namespace.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot enumerate namespaces",
    label = "missing `Enumerator` implementation"
)]
pub trait Enumerator: Send + Sync {
    /// Identifiers of the types under `namespace`.
    fn enumerate(&self, namespace: &str) -> Result<Vec<String>, EnumerateError>;
}

/// Whether `type_name` lives under `namespace`.
pub fn in_namespace(namespace: &str, type_name: &str) -> bool {
    let namespace = namespace.trim_matches(':');
    if namespace.is_empty() {
        return true;
    }
    let module = match type_name.rfind("::") {
        Some(end) => &type_name[..end],
        None => return false,
    };
    let wanted: Vec<&str> = namespace.split("::").collect();
    let segments: Vec<&str> = module.split("::").collect();
    segments
        .windows(wanted.len())
        .any(|window| window == wanted.as_slice())
}

/// Lists the `#[worker]` registrations linked into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryEnumerator;

impl Enumerator for InventoryEnumerator {
    fn enumerate(&self, namespace: &str) -> Result<Vec<String>, EnumerateError> {
        let found: Vec<String> = ProviderRegistration::all()
            .filter(|registration| in_namespace(namespace, registration.type_name))
            .map(|registration| registration.type_name.to_owned())
            .collect();
        if found.is_empty() {
            return Err(EnumerateError::NotFound(namespace.to_owned()));
        }
        Ok(found)
    }
}

/// Maps `a/b/Type<suffix>` to `a::b::Type`.
fn identifier_for(relative: &Path, suffix: &str) -> Option<String> {
    let text = relative.to_str()?;
    let stem = text.strip_suffix(suffix)?;
    let segments: Vec<&str> = stem
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("::"))
}

fn namespace_path(namespace: &str) -> PathBuf {
    namespace
        .split("::")
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Walks a directory tree of compiled-unit files.
///
/// `<root>/a/b/Type.worker` is the type `a::b::Type`.
#[derive(Debug, Clone)]
pub struct DirectoryEnumerator {
    root: PathBuf,
    suffix: String,
}

impl DirectoryEnumerator {
    /// Enumerate under `root` with the default suffix.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            suffix: DEFAULT_SUFFIX.to_owned(),
        }
    }

    /// Use a different file suffix.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    fn walk(&self, dir: &Path) -> Result<Vec<String>, EnumerateError> {
        let mut found = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(dir).to_path_buf();
                EnumerateError::Io {
                    path,
                    source: err.into(),
                }
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                found.extend(identifier_for(relative, &self.suffix));
            }
        }
        Ok(found)
    }
}

impl Enumerator for DirectoryEnumerator {
    fn enumerate(&self, namespace: &str) -> Result<Vec<String>, EnumerateError> {
        let dir = self.root.join(namespace_path(namespace));
        if !dir.is_dir() {
            return Err(EnumerateError::NotFound(namespace.to_owned()));
        }
        let mut found = self.walk(&dir)?;
        found.sort();
        Ok(found)
    }
}

/// Walks the entries of a zip archive (`.jar` layout).
///
/// The entry `a/b/Type.worker` is the type `a::b::Type`; directory entries
/// and entries without the suffix are ignored.
#[derive(Debug, Clone)]
pub struct ArchiveEnumerator {
    archive: PathBuf,
    suffix: String,
}

impl ArchiveEnumerator {
    /// Enumerate the entries of `archive` with the default suffix.
    pub fn new(archive: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            suffix: DEFAULT_SUFFIX.to_owned(),
        }
    }

    /// Use a different entry suffix.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    fn open(&self) -> Result<ZipArchive<fs::File>, EnumerateError> {
        let file = fs::File::open(&self.archive).map_err(|err| EnumerateError::io(&self.archive, err))?;
        ZipArchive::new(file).map_err(|source| EnumerateError::Archive {
            path: self.archive.clone(),
            source,
        })
    }
}

impl Enumerator for ArchiveEnumerator {
    fn enumerate(&self, namespace: &str) -> Result<Vec<String>, EnumerateError> {
        let archive = self.open()?;
        let prefix = namespace_path(namespace);
        let mut found: Vec<String> = archive
            .file_names()
            .map(Path::new)
            .filter(|entry| entry.starts_with(&prefix))
            .filter_map(|entry| identifier_for(entry, &self.suffix))
            .collect();
        if found.is_empty() {
            return Err(EnumerateError::NotFound(namespace.to_owned()));
        }
        found.sort();
        Ok(found)
    }
}

/// Where compiled units live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A directory tree.
    Directory(PathBuf),
    /// A zip archive.
    Archive(PathBuf),
}

/// Enumerates several sources, picking the strategy by source kind.
///
/// A namespace is only reported as not found when no source knows it.
#[derive(Debug, Clone, Default)]
pub struct SourceEnumerator {
    sources: Vec<Source>,
    suffix: Option<String>,
}

impl SourceEnumerator {
    /// Enumerate over `sources`.
    pub fn new(sources: impl IntoIterator<Item = Source>) -> Self {
        Self {
            sources: sources.into_iter().collect(),
            suffix: None,
        }
    }

    /// Add a source.
    pub fn source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    /// Use a different suffix for every source.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    fn strategy(&self, source: &Source) -> Box<dyn Enumerator> {
        let suffix = self.suffix.as_deref().unwrap_or(DEFAULT_SUFFIX);
        match source {
            Source::Directory(root) => Box::new(DirectoryEnumerator::new(root).with_suffix(suffix)),
            Source::Archive(archive) => {
                Box::new(ArchiveEnumerator::new(archive).with_suffix(suffix))
            }
        }
    }
}

impl Enumerator for SourceEnumerator {
    fn enumerate(&self, namespace: &str) -> Result<Vec<String>, EnumerateError> {
        let mut found = Vec::new();
        let mut known = false;
        for source in &self.sources {
            match self.strategy(source).enumerate(namespace) {
                Ok(identifiers) => {
                    known = true;
                    for identifier in identifiers {
                        if !found.contains(&identifier) {
                            found.push(identifier);
                        }
                    }
                }
                Err(EnumerateError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        if !known {
            return Err(EnumerateError::NotFound(namespace.to_owned()));
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_match_on_segment_boundaries() {
        assert!(in_namespace("sdk_b", "sdk_b::StoneWorker"));
        assert!(in_namespace("sdk_b", "app::sdk_b::StoneWorker"));
        assert!(in_namespace("app::sdk_b", "app::sdk_b::deep::StoneWorker"));
        assert!(!in_namespace("sdk", "sdk_b::StoneWorker"));
        assert!(!in_namespace("sdk_b", "StoneWorker"));
    }

    #[test]
    fn directory_maps_paths_to_identifiers() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("sdk_b").join("stones");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("StoneWorker.worker"), b"").unwrap();
        fs::write(dir.join("notes.txt"), b"").unwrap();
        fs::write(root.path().join("sdk_b").join("Digger.worker"), b"").unwrap();

        let enumerator = DirectoryEnumerator::new(root.path());
        let found = enumerator.enumerate("sdk_b").unwrap();
        assert_eq!(found, vec!["sdk_b::Digger", "sdk_b::stones::StoneWorker"]);

        let nested = enumerator.enumerate("sdk_b::stones").unwrap();
        assert_eq!(nested, vec!["sdk_b::stones::StoneWorker"]);

        assert!(matches!(
            enumerator.enumerate("sdk_z"),
            Err(EnumerateError::NotFound(ns)) if ns == "sdk_z"
        ));
    }

    fn write_archive(path: &Path, entries: &[&str]) {
        let mut writer = zip::ZipWriter::new(fs::File::create(path).unwrap());
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for entry in entries {
            if entry.ends_with('/') {
                writer.add_directory(*entry, options).unwrap();
            } else {
                writer.start_file(*entry, options).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn archive_entries_map_to_identifiers() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("sdk.jar");
        write_archive(
            &archive,
            &[
                "META-INF/MANIFEST.MF",
                "sdk_b/",
                "sdk_b/StoneWorker.worker",
                "sdk_b/stones/Digger.worker",
                "sdk_c/Other.worker",
            ],
        );

        let enumerator = ArchiveEnumerator::new(&archive);
        assert_eq!(
            enumerator.enumerate("sdk_b").unwrap(),
            vec!["sdk_b::StoneWorker", "sdk_b::stones::Digger"]
        );
        assert!(matches!(
            enumerator.enumerate("sdk_z"),
            Err(EnumerateError::NotFound(_))
        ));

        let missing = ArchiveEnumerator::new(dir.path().join("absent.jar"));
        assert!(matches!(
            missing.enumerate("sdk_b"),
            Err(EnumerateError::Io { .. })
        ));

        let not_zip = dir.path().join("listing.txt");
        fs::write(&not_zip, "sdk_b/StoneWorker.worker\n").unwrap();
        assert!(matches!(
            ArchiveEnumerator::new(&not_zip).enumerate("sdk_b"),
            Err(EnumerateError::Archive { .. })
        ));
    }

    #[test]
    fn sources_merge_and_only_fail_when_nobody_knows_the_namespace() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("sdk_b")).unwrap();
        fs::write(root.path().join("sdk_b").join("StoneWorker.worker"), b"").unwrap();
        let archive = root.path().join("archive.jar");
        write_archive(&archive, &["sdk_b/StoneWorker.worker", "sdk_b/Digger.worker"]);

        let enumerator = SourceEnumerator::new([
            Source::Directory(root.path().to_path_buf()),
            Source::Archive(archive),
        ]);
        assert_eq!(
            enumerator.enumerate("sdk_b").unwrap(),
            vec!["sdk_b::StoneWorker", "sdk_b::Digger"]
        );
        assert!(matches!(
            enumerator.enumerate("sdk_z"),
            Err(EnumerateError::NotFound(_))
        ));
    }
}
