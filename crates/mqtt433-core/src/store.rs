//! Persistent configuration store.
//!
//! One XML document at a well-known path holds the whole configuration. The
//! store loads it into a [`ConfigTree`], keeps the document's leading comment
//! (the inline schema description) and writes both back on save.
//!
//! ```rust,no_run
//! use mqtt433_core::store::{ConfigStore, DocumentSchema};
//!
//! const SCHEMA: DocumentSchema = DocumentSchema {
//!     root: "example",
//!     default_annotation: "Describe the keys here.",
//! };
//!
//! let store = ConfigStore::open("/etc/example.xml", SCHEMA)?;
//! println!("{} top-level keys", store.tree().len());
//! # Ok::<(), mqtt433_core::ConfigError>(())
//! ```

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};
use crate::tree::ConfigTree;

/// Fixed shape of a daemon's configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentSchema {
    /// Name of the root element.
    pub root: &'static str,
    /// Comment written into a freshly created document.
    pub default_annotation: &'static str,
}

/// Configuration tree bound to its document on disk.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    schema: DocumentSchema,
    tree: ConfigTree,
    annotation: Option<String>,
}

impl ConfigStore {
    /// Store with no content, not yet associated with a loaded document.
    pub fn empty(path: impl Into<PathBuf>, schema: DocumentSchema) -> Self {
        Self {
            path: path.into(),
            schema,
            tree: ConfigTree::new(),
            annotation: None,
        }
    }

    /// Open the document at `path`, creating a default one when it is
    /// missing and the directory is writable.
    ///
    /// A missing document that cannot be created leaves the store empty.
    pub fn open(path: impl Into<PathBuf>, schema: DocumentSchema) -> Result<Self> {
        let mut store = Self::empty(path, schema);

        if !store.path.is_file() {
            store.create_default();
        }
        if store.path.is_file() {
            store.load()?;
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> DocumentSchema {
        self.schema
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ConfigTree {
        &mut self.tree
    }

    /// Comment preserved from the loaded document.
    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    pub fn set_annotation(&mut self, annotation: Option<String>) {
        self.annotation = annotation;
    }

    /// Parse the document into the tree, replacing the current content.
    pub fn load(&mut self) -> Result<()> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ConfigError::NotFound(self.path.clone())
            } else {
                ConfigError::io(&self.path, e)
            }
        })?;

        let (tree, annotation) = parse_document(&content, &self.path, self.schema.root)?;
        debug!(
            "Loaded {} top-level keys from {}",
            tree.len(),
            self.path.display()
        );
        self.tree = tree;
        self.annotation = annotation;
        Ok(())
    }

    /// Discard in-memory state and load the document again.
    pub fn reload(&mut self) -> Result<()> {
        self.tree.clear();
        self.annotation = None;
        self.load()
    }

    /// Serialize the tree back to the document.
    pub fn save(&self) -> Result<()> {
        let content = self.render();
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| ConfigError::io(&self.path, e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| ConfigError::io(&self.path, e))?;
        info!("Saved configuration to {}", self.path.display());
        Ok(())
    }

    /// Write a document holding only the default annotation.
    ///
    /// Returns `false` without touching the store when the document cannot be
    /// created.
    pub fn create_default(&mut self) -> bool {
        info!("Creating new XML file {}", self.path.display());

        let annotation = self.schema.default_annotation.to_string();
        let content = render_document(self.schema.root, Some(&annotation), &ConfigTree::new());

        let written = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(content.as_bytes()));

        match written {
            Ok(()) => {
                self.annotation = Some(annotation);
                true
            }
            Err(e) => {
                warn!(
                    "XML file {} cannot be created, please run as super user: {}",
                    self.path.display(),
                    e
                );
                false
            }
        }
    }

    /// Document text for the current tree and annotation.
    pub fn render(&self) -> String {
        render_document(self.schema.root, self.annotation.as_deref(), &self.tree)
    }
}

/// Parse document text into a tree plus its annotation.
pub fn parse_document(
    content: &str,
    path: &Path,
    expected_root: &str,
) -> Result<(ConfigTree, Option<String>)> {
    let doc = roxmltree::Document::parse(content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != expected_root {
        warn!(
            "Root element <{}> in {} does not match <{}>",
            root.tag_name().name(),
            path.display(),
            expected_root
        );
    }

    let tree = ConfigTree::from_element(root)?;
    Ok((tree, find_annotation(&doc, None)))
}

/// First comment of the document, or of the first element named `scope`.
pub fn find_annotation(doc: &roxmltree::Document<'_>, scope: Option<&str>) -> Option<String> {
    let container = match scope {
        Some(tag) => doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == tag)?,
        None => doc.root(),
    };

    container
        .descendants()
        .find(|n| n.is_comment())
        .and_then(|n| n.text())
        .map(str::to_string)
}

/// Annotation lookup on raw document text. Malformed text has no annotation.
pub fn extract_annotation(content: &str, scope: Option<&str>) -> Option<String> {
    let doc = roxmltree::Document::parse(content).ok()?;
    find_annotation(&doc, scope)
}

fn render_document(root: &str, annotation: Option<&str>, tree: &ConfigTree) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");

    if annotation.is_none() && tree.is_empty() {
        out.push_str(&format!("<{}/>\n", root));
        return out;
    }

    out.push_str(&format!("<{}>\n", root));
    if let Some(comment) = annotation {
        out.push_str(&format!("\t<!--{}-->\n", comment));
    }
    tree.write_xml(&mut out, 1);
    out.push_str(&format!("</{}>\n", root));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: DocumentSchema = DocumentSchema {
        root: "test",
        default_annotation: "Test document.\n    <key> a key",
    };

    #[test]
    fn test_render_empty_document() {
        let store = ConfigStore::empty("/nonexistent/test.xml", SCHEMA);
        assert_eq!(
            store.render(),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<test/>\n"
        );
    }

    #[test]
    fn test_render_with_annotation() {
        let mut store = ConfigStore::empty("/nonexistent/test.xml", SCHEMA);
        store.set_annotation(Some(" schema ".to_string()));
        store.tree_mut().insert("broker", "localhost");
        store.tree_mut().insert("port", 1883i64);

        assert_eq!(
            store.render(),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<test>\n\t<!-- schema -->\n\
             \t<broker>localhost</broker>\n\t<port>1883</port>\n</test>\n"
        );
    }

    #[test]
    fn test_scoped_annotation() {
        let xml = "<test><!--top--><devices><lamp><!--inner--><a>1</a></lamp></devices></test>";
        assert_eq!(extract_annotation(xml, None).as_deref(), Some("top"));
        assert_eq!(extract_annotation(xml, Some("lamp")).as_deref(), Some("inner"));
        assert_eq!(extract_annotation(xml, Some("missing")), None);
        assert_eq!(extract_annotation("<test><a/></test>", None), None);
    }

    #[test]
    fn test_parse_error_reports_path() {
        let err = parse_document("<test><a></test>", Path::new("/etc/test.xml"), "test").unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, PathBuf::from("/etc/test.xml")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
