pub mod go;
pub mod python;
pub mod rust_lang;
pub mod typescript;

use crate::domain::ParsedFile;
use cv_core::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// One implementation per source language (spec §4.1). Grounded on
/// `dk-engine::parser::LanguageParser`.
pub trait LanguageExtractor: Send + Sync {
    fn extensions(&self) -> &'static [&'static str];
    fn language_name(&self) -> &'static str;
    fn parse(&self, path: &str, source: &str) -> Result<ParsedFile>;
}

/// Maps file extensions to the language extractor that handles them,
/// mirroring `dk-engine::parser::registry::ParserRegistry`.
pub struct LanguageRegistry {
    by_extension: HashMap<&'static str, Arc<dyn LanguageExtractor>>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        let mut by_extension: HashMap<&'static str, Arc<dyn LanguageExtractor>> = HashMap::new();
        let extractors: Vec<Arc<dyn LanguageExtractor>> = vec![
            Arc::new(rust_lang::RustExtractor),
            Arc::new(typescript::TypeScriptExtractor),
            Arc::new(python::PythonExtractor),
            Arc::new(go::GoExtractor),
        ];
        for extractor in extractors {
            for ext in extractor.extensions() {
                by_extension.insert(ext, Arc::clone(&extractor));
            }
        }
        Self { by_extension }
    }

    pub fn for_extension(&self, ext: &str) -> Option<Arc<dyn LanguageExtractor>> {
        self.by_extension.get(ext).cloned()
    }

    pub fn supports(&self, ext: &str) -> bool {
        self.by_extension.contains_key(ext)
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_known_extensions() {
        let reg = LanguageRegistry::new();
        assert!(reg.supports("rs"));
        assert!(reg.supports("ts"));
        assert!(reg.supports("py"));
        assert!(reg.supports("go"));
        assert!(!reg.supports("exe"));
    }
}
