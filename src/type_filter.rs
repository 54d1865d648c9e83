//! # Type Filter Module
//!
//! Selects the types that belong to a deployed application out of the full
//! type catalog.
//!
//! ## Selection Rules
//!
//! 1. Every `.class` entry of the deployable unit is normalized
//!    (`WEB-INF/classes/` prefix stripped, `/` → `.`, `.class` stripped) and
//!    resolved against the catalog. Names the catalog does not know are
//!    dropped.
//! 2. With `scan_lib`, every `WEB-INF/lib/*.jar` entry is opened as a nested
//!    archive and its classes are resolved the same way. A library that
//!    cannot be opened fails the whole selection: a silently smaller type set
//!    would attribute types inconsistently between builds.
//! 3. The union goes through [`OpenApiConfig::valid_classes`] when a
//!    configuration is present.

use crate::archive::DeployableArchive;
use crate::catalog::{TypeCatalog, TypeRef};
use crate::config::OpenApiConfig;
use std::collections::BTreeSet;
use std::io;
use thiserror::Error;
use tracing::debug;

pub const CLASSES_PREFIX: &str = "WEB-INF/classes/";
pub const LIB_PREFIX: &str = "WEB-INF/lib/";
pub const LIB_SUFFIX: &str = ".jar";
pub const CLASS_SUFFIX: &str = ".class";

#[derive(Debug, Error)]
pub enum TypeFilterError {
    #[error("failed to enumerate archive entries: {0}")]
    Archive(#[source] io::Error),
    #[error("failed to open library archive {name}: {source}")]
    LibraryArchive {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Qualified type name for a class entry, `None` for non-class entries.
pub fn class_name(entry: &str) -> Option<String> {
    let stem = entry.strip_suffix(CLASS_SUFFIX)?;
    let stem = stem.strip_prefix(CLASSES_PREFIX).unwrap_or(stem);
    Some(stem.replace('/', "."))
}

fn resolve_entries<'a, I>(entries: I, catalog: &dyn TypeCatalog, out: &mut BTreeSet<TypeRef>)
where
    I: IntoIterator<Item = &'a String>,
{
    for entry in entries {
        let Some(name) = class_name(entry) else {
            continue;
        };
        match catalog.resolve(&name) {
            Some(type_ref) => {
                out.insert(type_ref);
            }
            None => debug!(class = %name, "class not in type catalog, skipping"),
        }
    }
}

fn library_types(
    archive: &dyn DeployableArchive,
    entries: &[String],
    catalog: &dyn TypeCatalog,
) -> Result<BTreeSet<TypeRef>, TypeFilterError> {
    let mut types = BTreeSet::new();
    for name in entries
        .iter()
        .filter(|e| e.starts_with(LIB_PREFIX) && e.ends_with(LIB_SUFFIX))
    {
        let lib = archive
            .sub_archive(name)
            .map_err(|source| TypeFilterError::LibraryArchive {
                name: name.clone(),
                source,
            })?;
        let lib_entries = lib
            .entries()
            .map_err(|source| TypeFilterError::LibraryArchive {
                name: name.clone(),
                source,
            })?;
        let before = types.len();
        resolve_entries(&lib_entries, catalog, &mut types);
        debug!(library = %name, types = types.len() - before, "scanned library archive");
    }
    Ok(types)
}

/// Types of the deployed application, filtered by configuration.
pub fn filter_types(
    archive: &dyn DeployableArchive,
    config: Option<&OpenApiConfig>,
    catalog: &dyn TypeCatalog,
) -> Result<BTreeSet<TypeRef>, TypeFilterError> {
    let entries = archive.entries().map_err(TypeFilterError::Archive)?;

    let mut types = match config {
        Some(c) if c.scan_lib => library_types(archive, &entries, catalog)?,
        _ => BTreeSet::new(),
    };
    resolve_entries(&entries, catalog, &mut types);

    Ok(match config {
        Some(c) => c.valid_classes(types),
        None => types,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name_normalization() {
        assert_eq!(
            class_name("WEB-INF/classes/a/B.class").as_deref(),
            Some("a.B")
        );
        assert_eq!(class_name("c/D.class").as_deref(), Some("c.D"));
        assert_eq!(class_name("index.html"), None);
        assert_eq!(class_name("WEB-INF/lib/x.jar"), None);
    }

    #[test]
    fn test_class_name_inner_class() {
        assert_eq!(class_name("a/B$Inner.class").as_deref(), Some("a.B$Inner"));
    }
}
