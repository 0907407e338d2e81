//! Parser (spec §4.1): turns a file's raw bytes into a `ParsedFile` (source),
//! a `ParsedDocument` (markdown), or a `ParseOutcome::Rejected` for binary,
//! oversized, or otherwise unrecognized input.

pub mod domain;
pub mod languages;
pub mod markdown;
mod ts_support;

pub use domain::{ParseOutcome, ParsedDocument, ParsedFile};
pub use languages::LanguageRegistry;

use cv_core::Result;

/// Default cap on parsed files, matching `Config::max_file_size` — overridable
/// by the caller (which already applies `CV_MAX_FILE_SIZE`/config precedence).
pub const DEFAULT_MAX_FILE_SIZE: usize = 1024 * 1024;

/// Bytes sampled from the head of a file to decide if it's binary.
const BINARY_SNIFF_WINDOW: usize = 8192;

pub struct Parser {
    registry: LanguageRegistry,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            registry: LanguageRegistry::new(),
        }
    }

    /// `parse(path, bytes) -> ParsedFile | ParsedDocument | nil` per spec §4.1.
    pub fn parse(&self, path: &str, bytes: &[u8], max_file_size: usize) -> Result<ParseOutcome> {
        if bytes.len() > max_file_size {
            return Ok(ParseOutcome::Rejected {
                reason: format!("file exceeds max size ({} > {})", bytes.len(), max_file_size),
            });
        }
        if is_binary(bytes) {
            return Ok(ParseOutcome::Rejected {
                reason: "binary content (NUL byte in sampled window)".to_string(),
            });
        }

        let source = match std::str::from_utf8(bytes) {
            Ok(s) => s,
            Err(_) => {
                return Ok(ParseOutcome::Rejected {
                    reason: "not valid UTF-8".to_string(),
                })
            }
        };

        let ext = extension_of(path);
        if ext == "md" || ext == "markdown" {
            return Ok(ParseOutcome::Document(markdown::parse_markdown(path, source)));
        }

        match self.registry.for_extension(&ext) {
            Some(extractor) => {
                let parsed = extractor.parse(path, source)?;
                Ok(ParseOutcome::Source(parsed))
            }
            None => Ok(ParseOutcome::Rejected {
                reason: format!("no extractor registered for extension '{ext}'"),
            }),
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn extension_of(path: &str) -> String {
    path.rsplit('.')
        .next()
        .filter(|ext| *ext != path)
        .unwrap_or("")
        .to_lowercase()
}

fn is_binary(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(BINARY_SNIFF_WINDOW)];
    window.contains(&0u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversized_files_before_parsing() {
        let parser = Parser::new();
        let bytes = vec![b'a'; 10];
        let outcome = parser.parse("a.rs", &bytes, 5).unwrap();
        assert!(matches!(outcome, ParseOutcome::Rejected { .. }));
    }

    #[test]
    fn rejects_binary_via_nul_byte_sniff() {
        let parser = Parser::new();
        let bytes = vec![b'a', 0u8, b'b'];
        let outcome = parser.parse("a.bin", &bytes, DEFAULT_MAX_FILE_SIZE).unwrap();
        assert!(matches!(outcome, ParseOutcome::Rejected { .. }));
    }

    #[test]
    fn routes_markdown_to_document_parser() {
        let parser = Parser::new();
        let outcome = parser
            .parse("README.md", b"# R\n## S\ntext\n", DEFAULT_MAX_FILE_SIZE)
            .unwrap();
        assert!(matches!(outcome, ParseOutcome::Document(_)));
    }

    #[test]
    fn routes_source_extension_to_registered_extractor() {
        let parser = Parser::new();
        let outcome = parser
            .parse("src/a.ts", b"export function f() { g(); }", DEFAULT_MAX_FILE_SIZE)
            .unwrap();
        match outcome {
            ParseOutcome::Source(parsed) => assert_eq!(parsed.symbols.len(), 1),
            _ => panic!("expected Source outcome"),
        }
    }

    #[test]
    fn unknown_extension_is_rejected_not_errored() {
        let parser = Parser::new();
        let outcome = parser
            .parse("a.exe", b"whatever", DEFAULT_MAX_FILE_SIZE)
            .unwrap();
        assert!(matches!(outcome, ParseOutcome::Rejected { .. }));
    }
}
