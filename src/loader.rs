//! Test document loader.
//!
//! Turns paths, readers and byte buffers into [`File`]s and [`Suite`]s.
//! Each document is parsed twice: first just the envelope, to pick a parser
//! from the Context's type registry, then in full by that parser.

use crate::context::Context;
use crate::error::{LoadError, ParseError};
use crate::file::File;
use crate::parser::ParseTarget;
use crate::schema::{DEFAULT_TYPE, Envelope};
use crate::suite::{Runnable, Suite};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Extensions picked up when walking a directory.
pub const DEFAULT_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Loads test documents against a [`Context`].
#[derive(Debug, Clone)]
pub struct Loader<'a> {
    ctx: &'a Context,
    extensions: Vec<String>,
    default_type: String,
}

impl<'a> Loader<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self {
            ctx,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            default_type: DEFAULT_TYPE.to_string(),
        }
    }

    /// Replace the extensions picked up when walking a directory. A leading
    /// dot is ignored and matching is case-insensitive.
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Type used for documents that declare none.
    pub fn with_default_type(mut self, type_name: &str) -> Self {
        self.default_type = type_name.to_string();
        self
    }

    /// Load a directory as a Suite, or a single document as a File.
    pub fn from_path(&self, path: &Path) -> Result<Runnable, LoadError> {
        let meta = std::fs::metadata(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if meta.is_dir() {
            Ok(Runnable::Suite(self.from_dir(path)?))
        } else {
            Ok(Runnable::File(self.from_file(path)?))
        }
    }

    /// Walk `dir` recursively in lexical order and load every document with
    /// a matching extension into one Suite.
    pub fn from_dir(&self, dir: &Path) -> Result<Suite, LoadError> {
        let root = std::path::absolute(dir).map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        info!(dir = %root.display(), "loading suite");

        let mut suite = Suite::new(&root);
        for path in find_documents(&root, self.extensions.as_slice())? {
            suite.append(self.from_file(&path)?);
        }
        debug!(dir = %root.display(), files = suite.len(), "loaded suite");
        Ok(suite)
    }

    /// Load a single document from disk.
    pub fn from_file(&self, path: &Path) -> Result<File, LoadError> {
        let contents = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.from_bytes_at(path, &contents)
    }

    /// Load a document from a reader. The File has no path.
    pub fn from_reader(&self, mut reader: impl Read) -> Result<File, LoadError> {
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).map_err(LoadError::Read)?;
        self.from_bytes(&contents)
    }

    /// Load a document from memory. The File has no path, so its name is
    /// whatever the document declares.
    pub fn from_bytes(&self, contents: &[u8]) -> Result<File, LoadError> {
        self.parse(None, contents)
    }

    /// Load a document from memory as if it had been read from `path`.
    pub fn from_bytes_at(&self, path: &Path, contents: &[u8]) -> Result<File, LoadError> {
        self.parse(Some(path), contents)
    }

    fn parse(&self, path: Option<&Path>, contents: &[u8]) -> Result<File, LoadError> {
        self.build(path, contents)
            .map_err(|source| LoadError::Parse {
                path: path.map(Path::to_path_buf),
                source,
            })
    }

    fn build(&self, path: Option<&Path>, contents: &[u8]) -> Result<File, ParseError> {
        let envelope = Envelope::parse(contents)?;
        let type_name = envelope.type_or(&self.default_type).to_lowercase();
        let parser = self
            .ctx
            .types()
            .get(&type_name)
            .ok_or_else(|| ParseError::UnknownType(type_name.clone()))?;
        debug!(path = ?path, type_name = %type_name, "dispatching document");

        let mut file = File::new(&type_name).with_require(envelope.require);
        if let Some(name) = envelope.name {
            file = file.with_name(name);
        }
        if let Some(description) = envelope.description {
            file = file.with_description(description);
        }
        if let Some(path) = path {
            file = file.with_path(path);
        }

        parser.parse(&mut ParseTarget::new(&mut file, self.ctx), contents)?;
        Ok(file)
    }
}

/// Load `path` with default options.
pub fn from_path(ctx: &Context, path: impl AsRef<Path>) -> Result<Runnable, LoadError> {
    Loader::new(ctx).from_path(path.as_ref())
}

/// Load a document from a reader with default options.
pub fn from_reader(ctx: &Context, reader: impl Read) -> Result<File, LoadError> {
    Loader::new(ctx).from_reader(reader)
}

/// Load a document from memory with default options.
pub fn from_bytes(ctx: &Context, contents: &[u8]) -> Result<File, LoadError> {
    Loader::new(ctx).from_bytes(contents)
}

/// Paths of the documents a walk of `dir` would load, in load order.
pub fn find_documents<S: AsRef<str>>(
    dir: &Path,
    extensions: &[S],
) -> Result<Vec<PathBuf>, LoadError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                extensions
                    .iter()
                    .any(|e| e.as_ref().trim_start_matches('.').eq_ignore_ascii_case(ext))
            });
        if entry.file_type().is_file() && matches {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}
