//! # Deployable Archive Module
//!
//! Read-only access to a packaged application: entry enumeration, nested
//! library archives and resource reads.
//!
//! ## Implementations
//!
//! - [`DirectoryArchive`] - an exploded deployment on disk
//! - [`JarArchive`] - a zip/jar file, or jar bytes nested in another archive
//! - [`InMemoryArchive`] - entries held in memory (embedding and tests)
//!
//! Entry names always use `/` as separator, regardless of platform, and
//! never start with a leading `/`.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;
use zip::ZipArchive;

/// A deployable unit that can be introspected.
pub trait DeployableArchive: Send + Sync {
    /// All entry paths in the archive, including nested library archives.
    fn entries(&self) -> io::Result<Vec<String>>;

    /// Open the entry `name` as a nested archive.
    fn sub_archive(&self, name: &str) -> io::Result<Box<dyn DeployableArchive>>;

    /// Read the bytes of entry `name`, `Ok(None)` when the entry is absent.
    fn read_entry(&self, name: &str) -> io::Result<Option<Vec<u8>>>;
}

/// Open a deployment path: directories are exploded deployments, anything
/// else is treated as a jar/war file.
pub fn open_archive(path: &Path) -> io::Result<Box<dyn DeployableArchive>> {
    if path.is_dir() {
        Ok(Box::new(DirectoryArchive::new(path)))
    } else {
        Ok(Box::new(JarArchive::open(path)?))
    }
}

/// Exploded deployment rooted at a directory.
#[derive(Debug, Clone)]
pub struct DirectoryArchive {
    root: PathBuf,
}

impl DirectoryArchive {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Map an entry name onto the filesystem, refusing anything that would
    /// escape the root.
    fn map_path(&self, name: &str) -> Option<PathBuf> {
        let mut pb = self.root.clone();
        for comp in Path::new(name.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }
}

impl DeployableArchive for DirectoryArchive {
    fn entries(&self) -> io::Result<Vec<String>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let name = relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("/");
            entries.push(name);
        }
        Ok(entries)
    }

    fn sub_archive(&self, name: &str) -> io::Result<Box<dyn DeployableArchive>> {
        let path = self
            .map_path(name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid entry path"))?;
        if path.is_dir() {
            return Ok(Box::new(DirectoryArchive::new(path)));
        }
        Ok(Box::new(JarArchive::open(&path)?))
    }

    fn read_entry(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        let Some(path) = self.map_path(name) else {
            return Ok(None);
        };
        if !path.is_file() {
            return Ok(None);
        }
        fs::read(&path).map(Some)
    }
}

/// A jar (zip) archive held in memory.
///
/// Nested jars are read into memory and opened the same way, so a library
/// inside a war never touches the filesystem.
pub struct JarArchive {
    entries: Vec<String>,
    zip: Mutex<ZipArchive<Cursor<Vec<u8>>>>,
}

impl JarArchive {
    /// Open a jar file from disk.
    pub fn open(path: &Path) -> io::Result<Self> {
        Self::from_bytes(fs::read(path)?)
    }

    /// Open jar bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> io::Result<Self> {
        let zip = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut entries: Vec<String> = zip
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(|name| name.trim_start_matches('/').to_string())
            .collect();
        entries.sort();
        Ok(Self {
            entries,
            zip: Mutex::new(zip),
        })
    }
}

impl std::fmt::Debug for JarArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JarArchive")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl DeployableArchive for JarArchive {
    fn entries(&self) -> io::Result<Vec<String>> {
        Ok(self.entries.clone())
    }

    fn sub_archive(&self, name: &str) -> io::Result<Box<dyn DeployableArchive>> {
        let bytes = self.read_entry(name)?.ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such entry: {name}"))
        })?;
        Ok(Box::new(JarArchive::from_bytes(bytes)?))
    }

    fn read_entry(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        let mut zip = self.zip.lock();
        let mut file = match zip.by_name(name) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        };
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(Some(buf))
    }
}

/// Archive whose entries live in memory.
///
/// An entry registered through [`InMemoryArchive::with_library`] is a
/// nested archive; [`InMemoryArchive::with_broken_library`] registers an
/// entry that exists but cannot be opened.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArchive {
    files: BTreeMap<String, Vec<u8>>,
    libraries: BTreeMap<String, InMemoryArchive>,
    broken: Vec<String>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(name.into(), bytes.into());
        self
    }

    pub fn with_library(mut self, name: impl Into<String>, library: InMemoryArchive) -> Self {
        self.libraries.insert(name.into(), library);
        self
    }

    pub fn with_broken_library(mut self, name: impl Into<String>) -> Self {
        self.broken.push(name.into());
        self
    }
}

impl DeployableArchive for InMemoryArchive {
    fn entries(&self) -> io::Result<Vec<String>> {
        let mut entries: Vec<String> = self
            .files
            .keys()
            .chain(self.libraries.keys())
            .chain(self.broken.iter())
            .cloned()
            .collect();
        entries.sort();
        entries.dedup();
        Ok(entries)
    }

    fn sub_archive(&self, name: &str) -> io::Result<Box<dyn DeployableArchive>> {
        if let Some(lib) = self.libraries.get(name) {
            return Ok(Box::new(lib.clone()));
        }
        if self.broken.iter().any(|b| b == name) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("corrupt archive: {name}"),
            ));
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such entry: {name}"),
        ))
    }

    fn read_entry(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.files.get(name).cloned())
    }
}
