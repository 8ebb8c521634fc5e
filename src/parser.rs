//! Test-type parsers and the type registry.

use crate::context::Context;
use crate::error::ParseError;
use crate::file::{File, TestUnit};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

/// Decodes a type-specific schema from raw document bytes into test units.
pub trait Parser: Send + Sync {
    /// Decode `contents` and append zero or more units to `target`.
    ///
    /// An error aborts construction of the enclosing File.
    fn parse(&self, target: &mut ParseTarget<'_>, contents: &[u8]) -> Result<(), ParseError>;
}

/// The File under construction, handed to a [`Parser`].
pub struct ParseTarget<'a> {
    file: &'a mut File,
    ctx: &'a Context,
}

impl<'a> ParseTarget<'a> {
    pub(crate) fn new(file: &'a mut File, ctx: &'a Context) -> Self {
        Self { file, ctx }
    }

    /// Append a unit to the File.
    pub fn append(&mut self, unit: impl TestUnit + 'static) {
        self.file.append(unit);
    }

    /// The context the document is being loaded under.
    pub fn context(&self) -> &Context {
        self.ctx
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.path()
    }

    pub fn name(&self) -> &str {
        self.file.name()
    }

    pub fn units_len(&self) -> usize {
        self.file.units().len()
    }
}

/// Case-insensitive test-type name to parser store.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    entries: IndexMap<String, Arc<dyn Parser>>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in test types registered.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        crate::exec::register(&mut reg);
        reg
    }

    /// Register `parser` under each of `names`. Later registrations of a
    /// name replace earlier ones.
    pub fn register(&mut self, parser: impl Parser + 'static, names: &[&str]) {
        self.register_arc(Arc::new(parser), names);
    }

    pub fn register_arc(&mut self, parser: Arc<dyn Parser>, names: &[&str]) {
        for name in names {
            self.entries.insert(name.to_lowercase(), parser.clone());
        }
    }

    /// The parser for `type_name`, if registered.
    pub fn get(&self, type_name: &str) -> Option<Arc<dyn Parser>> {
        self.entries.get(&type_name.to_lowercase()).cloned()
    }

    /// Registered type names (lower-cased), in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

static DEFAULT_TYPES: Lazy<RwLock<TypeRegistry>> =
    Lazy::new(|| RwLock::new(TypeRegistry::with_builtins()));

/// Register a parser with the process-wide default registry.
///
/// Same discipline as [`register_fixture`](crate::register_fixture): register
/// before any context snapshots the defaults.
pub fn register_parser(parser: impl Parser + 'static, names: &[&str]) {
    DEFAULT_TYPES.write().register(parser, names);
}

/// Snapshot of the process-wide default type registry.
pub fn default_types() -> TypeRegistry {
    DEFAULT_TYPES.read().clone()
}
