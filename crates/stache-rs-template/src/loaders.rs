//! Partial template loaders.
//!
//! A `{{>name}}` tag asks the compiler's [`TemplateLoader`] for the source
//! of `name` the first time the tag executes. The default compiler uses
//! [`NoLoader`], so templates with partials need a loader configured.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use stache_rs_core::error::StacheError;

/// Loads partial template source text by name.
pub trait TemplateLoader: Send + Sync {
    /// Loads the template source with the given name.
    ///
    /// # Errors
    ///
    /// Returns `TemplateDoesNotExist` if the template cannot be found.
    fn load(&self, name: &str) -> Result<String, StacheError>;
}

impl<F> TemplateLoader for F
where
    F: Fn(&str) -> Result<String, StacheError> + Send + Sync,
{
    fn load(&self, name: &str) -> Result<String, StacheError> {
        self(name)
    }
}

/// Rejects every load; the default for a new compiler.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLoader;

impl TemplateLoader for NoLoader {
    fn load(&self, name: &str) -> Result<String, StacheError> {
        Err(StacheError::Unsupported(format!(
            "Template loading not configured; cannot load partial '{name}'"
        )))
    }
}

/// Loads partials from one or more directories on the filesystem.
///
/// Searches each directory in order, appending the suffix to the partial
/// name, and returns the first match. Names that would escape the
/// directory (absolute paths or `..` components) are never found.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    dirs: Vec<PathBuf>,
    suffix: String,
}

impl FileSystemLoader {
    /// Creates a loader over `dirs` with no suffix.
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            suffix: String::new(),
        }
    }

    /// Sets the suffix appended to partial names (e.g. `.mustache`).
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }
}

impl TemplateLoader for FileSystemLoader {
    fn load(&self, name: &str) -> Result<String, StacheError> {
        let file = format!("{name}{}", self.suffix);
        let relative = Path::new(&file);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StacheError::TemplateDoesNotExist(format!(
                "Template '{name}' has an invalid path"
            )));
        }

        for dir in &self.dirs {
            let path = dir.join(relative);
            if path.is_file() {
                return std::fs::read_to_string(&path).map_err(|e| {
                    StacheError::TemplateDoesNotExist(format!(
                        "Error reading template '{}': {e}",
                        path.display()
                    ))
                });
            }
        }

        Err(StacheError::TemplateDoesNotExist(format!(
            "Template '{file}' not found in directories: {:?}",
            self.dirs
        )))
    }
}

/// Loads partials from an in-memory map of name to source.
#[derive(Debug, Default)]
pub struct StringLoader {
    templates: RwLock<HashMap<String, String>>,
}

impl StringLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(templates: HashMap<String, String>) -> Self {
        Self {
            templates: RwLock::new(templates),
        }
    }

    /// Adds or replaces a partial. Templates that already loaded the old
    /// source keep using it.
    pub fn add(&self, name: impl Into<String>, source: impl Into<String>) {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), source.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StringLoader {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl TemplateLoader for StringLoader {
    fn load(&self, name: &str) -> Result<String, StacheError> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| StacheError::TemplateDoesNotExist(format!("Template '{name}' not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_loader_basic() {
        let loader = StringLoader::new();
        loader.add("hello", "Hello {{name}}!");
        assert_eq!(loader.load("hello").unwrap(), "Hello {{name}}!");
    }

    #[test]
    fn test_string_loader_not_found() {
        let loader = StringLoader::new();
        assert!(matches!(
            loader.load("missing"),
            Err(StacheError::TemplateDoesNotExist(_))
        ));
    }

    #[test]
    fn test_string_loader_from_iter_and_overwrite() {
        let loader: StringLoader = [("a", "content A"), ("b", "content B")].into_iter().collect();
        assert_eq!(loader.load("a").unwrap(), "content A");
        loader.add("a", "version 2");
        assert_eq!(loader.load("a").unwrap(), "version 2");
        assert_eq!(loader.load("b").unwrap(), "content B");
    }

    #[test]
    fn test_no_loader_is_unsupported() {
        assert!(matches!(NoLoader.load("x"), Err(StacheError::Unsupported(_))));
    }

    #[test]
    fn test_closure_loader() {
        let loader = |name: &str| -> Result<String, StacheError> { Ok(format!("<{name}>")) };
        assert_eq!(loader.load("p").unwrap(), "<p>");
    }

    #[test]
    fn test_filesystem_loader_not_found() {
        let loader = FileSystemLoader::new(vec![PathBuf::from("/nonexistent/path")]);
        assert!(loader.load("missing").is_err());
    }

    #[test]
    fn test_filesystem_loader_searches_dirs_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("row.mustache"), "from second").unwrap();
        std::fs::write(second.path().join("head.mustache"), "head second").unwrap();
        std::fs::write(first.path().join("head.mustache"), "head first").unwrap();

        let loader = FileSystemLoader::new(vec![first.path().to_path_buf(), second.path().to_path_buf()])
            .with_suffix(".mustache");
        assert_eq!(loader.load("row").unwrap(), "from second");
        assert_eq!(loader.load("head").unwrap(), "head first");
    }

    #[test]
    fn test_filesystem_loader_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileSystemLoader::new(vec![dir.path().to_path_buf()]);
        assert!(loader.load("../etc/passwd").is_err());
        assert!(loader.load("/etc/passwd").is_err());
    }
}
