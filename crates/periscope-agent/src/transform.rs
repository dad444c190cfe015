//! Source transformers for transpiled dialects.
//!
//! Conditions and expressions against a `.coffee` or `.es6` file are
//! written in that dialect; a registered transformer translates them to
//! the native dialect before parsing. The registry's extension list also
//! feeds the scanner's allow-list.

use std::collections::HashMap;

use thiserror::Error;

/// The runtime's native source extension.
pub const NATIVE_EXTENSION: &str = "js";

/// Failure reported by a transformer's front end.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransformError {
    /// The upstream compiler's message.
    pub message: String,
}

impl TransformError {
    /// Create a transform error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Translates expression text from a transpiled dialect to the native one.
pub trait SourceTransformer {
    /// Translate `source`, or fail with the front end's message.
    fn transpile(&self, source: &str) -> Result<String, TransformError>;
}

/// Transformer for dialects that are a syntactic superset handled by the
/// native parser unchanged (e.g. `.es6`).
pub struct IdentityTransformer;

impl SourceTransformer for IdentityTransformer {
    fn transpile(&self, source: &str) -> Result<String, TransformError> {
        Ok(source.to_string())
    }
}

/// Extension-keyed registry of transformers.
pub struct TransformerRegistry {
    by_extension: HashMap<String, Box<dyn SourceTransformer>>,
}

impl TransformerRegistry {
    /// Registry with the native extension and the `.es6` passthrough.
    pub fn new() -> Self {
        let mut registry = Self {
            by_extension: HashMap::new(),
        };
        registry.register("es6", Box::new(IdentityTransformer));
        registry
    }

    /// Register a transformer for a file extension (without the dot).
    pub fn register(&mut self, extension: impl Into<String>, transformer: Box<dyn SourceTransformer>) {
        self.by_extension.insert(extension.into(), transformer);
    }

    /// Whether breakpoints may target files with this extension.
    pub fn is_supported(&self, extension: &str) -> bool {
        extension == NATIVE_EXTENSION || self.by_extension.contains_key(extension)
    }

    /// All supported extensions: the scanner's allow-list.
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = std::iter::once(NATIVE_EXTENSION.to_string())
            .chain(self.by_extension.keys().cloned())
            .collect();
        extensions.sort();
        extensions.dedup();
        extensions
    }

    /// Translate expression text for a file of the given extension.
    ///
    /// Native text passes through untouched.
    pub fn transpile_for(&self, extension: &str, source: &str) -> Result<String, TransformError> {
        if extension == NATIVE_EXTENSION {
            return Ok(source.to_string());
        }
        match self.by_extension.get(extension) {
            Some(transformer) => transformer.transpile(source),
            None => Err(TransformError::new(format!(
                "no transformer registered for extension `{extension}`"
            ))),
        }
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
