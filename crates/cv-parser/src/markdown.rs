//! Markdown parsing: frontmatter, headings, links, H2-bounded sections, and
//! document-type inference (spec §4.1). Grounded on the teacher's
//! `shared/models::ParsedDocument`/`DocumentSection` shape, built on
//! `pulldown-cmark` per the pack's markdown convention.

use crate::domain::{Heading, InferredDocumentType, Link, ParsedDocument, Section};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

pub fn parse_markdown(path: &str, source: &str) -> ParsedDocument {
    let (frontmatter_raw, body, body_line_offset) = split_frontmatter(source);
    let (frontmatter, custom_fields, explicit_document_type) = parse_frontmatter(frontmatter_raw);

    let headings = extract_headings(&body, body_line_offset);
    let links = extract_links(&body, body_line_offset);
    let sections = extract_sections(&body, &headings, body_line_offset);

    let inferred_document_type = infer_document_type(path);

    ParsedDocument {
        path: path.to_string(),
        frontmatter,
        custom_fields,
        explicit_document_type,
        inferred_document_type,
        headings,
        links,
        sections,
    }
}

/// Splits a leading `---\n...\n---` YAML block from the document body.
/// Returns (frontmatter text or "", body text, 1-based line number body starts on).
fn split_frontmatter(source: &str) -> (&str, String, u32) {
    if !source.starts_with("---") {
        return ("", source.to_string(), 1);
    }
    let mut lines = source.lines();
    let first = lines.next().unwrap_or("");
    if first.trim() != "---" {
        return ("", source.to_string(), 1);
    }
    let rest = &source[first.len()..];
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    if let Some(end) = rest.find("\n---") {
        let fm = &rest[..end];
        let after_delim = &rest[end + 4..];
        let body = after_delim.strip_prefix('\n').unwrap_or(after_delim);
        let body_line_offset = fm.lines().count() as u32 + 3;
        (fm, body.to_string(), body_line_offset)
    } else {
        ("", source.to_string(), 1)
    }
}

/// Best-effort YAML parse; unknown/unrecognized keys land in `custom_fields`.
/// `document_type` is lifted out separately since it participates in
/// inference precedence.
fn parse_frontmatter(
    raw: &str,
) -> (
    serde_json::Map<String, serde_json::Value>,
    serde_json::Map<String, serde_json::Value>,
    Option<String>,
) {
    let mut frontmatter = serde_json::Map::new();
    let mut custom_fields = serde_json::Map::new();
    let mut explicit_document_type = None;

    if raw.trim().is_empty() {
        return (frontmatter, custom_fields, explicit_document_type);
    }

    let parsed: Result<serde_yaml::Value, _> = serde_yaml::from_str(raw);
    let known_keys = ["document_type", "status", "title", "owner", "tags"];

    if let Ok(serde_yaml::Value::Mapping(map)) = parsed {
        for (k, v) in map {
            let key = match k.as_str() {
                Some(s) => s.to_string(),
                None => continue,
            };
            let json_value = yaml_to_json(v);
            if key == "document_type" {
                explicit_document_type = json_value.as_str().map(|s| s.to_string());
            }
            if known_keys.contains(&key.as_str()) {
                frontmatter.insert(key, json_value);
            } else {
                custom_fields.insert(key, json_value);
            }
        }
    }

    (frontmatter, custom_fields, explicit_document_type)
}

fn yaml_to_json(value: serde_yaml::Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

fn infer_document_type(path: &str) -> InferredDocumentType {
    let file_name = path.rsplit('/').next().unwrap_or(path).to_uppercase();
    let lower_path = path.to_lowercase();

    if file_name.starts_with("README") {
        return InferredDocumentType::Readme;
    }
    if file_name.starts_with("CHANGELOG") {
        return InferredDocumentType::Changelog;
    }
    if lower_path.contains("/adr/") || is_adr_filename(&lower_path) {
        return InferredDocumentType::Adr;
    }
    if lower_path.contains("/guides/") || lower_path.contains("/guide/") {
        return InferredDocumentType::Guide;
    }
    if lower_path.ends_with("spec.md") || lower_path.contains("/specs/") {
        return InferredDocumentType::Spec;
    }
    InferredDocumentType::Other
}

fn is_adr_filename(lower_path: &str) -> bool {
    let name = lower_path.rsplit('/').next().unwrap_or(lower_path);
    name.starts_with("adr-") && name.ends_with(".md")
}

fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut last_was_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && !slug.is_empty() {
            slug.push('-');
            last_was_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn extract_headings(body: &str, line_offset: u32) -> Vec<Heading> {
    let parser = Parser::new_ext(body, Options::empty());
    let mut headings = Vec::new();
    let mut in_heading: Option<u8> = None;
    let mut current_text = String::new();
    let mut current_line = 0u32;

    for (event, range) in parser.into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                in_heading = Some(heading_level_to_u8(level));
                current_text.clear();
                current_line = line_offset + body[..range.start].lines().count() as u32;
            }
            Event::Text(text) | Event::Code(text) if in_heading.is_some() => {
                current_text.push_str(&text);
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(level) = in_heading.take() {
                    headings.push(Heading {
                        level,
                        text: current_text.trim().to_string(),
                        line: current_line,
                        slug: slugify(&current_text),
                    });
                }
            }
            _ => {}
        }
    }
    headings
}

fn extract_links(body: &str, line_offset: u32) -> Vec<Link> {
    let parser = Parser::new_ext(body, Options::empty());
    let mut links = Vec::new();
    let mut in_link: Option<String> = None;
    let mut text = String::new();
    let mut line = 0u32;

    for (event, range) in parser.into_offset_iter() {
        match event {
            Event::Start(Tag::Link { dest_url, .. }) => {
                in_link = Some(dest_url.to_string());
                text.clear();
                line = line_offset + body[..range.start].lines().count() as u32;
            }
            Event::Text(t) if in_link.is_some() => {
                text.push_str(&t);
            }
            Event::End(TagEnd::Link) => {
                if let Some(target) = in_link.take() {
                    let is_internal = !target.starts_with("http://") && !target.starts_with("https://");
                    let is_code_ref = is_internal
                        && (target.ends_with(".rs")
                            || target.ends_with(".ts")
                            || target.ends_with(".py")
                            || target.ends_with(".go")
                            || target.contains('#'));
                    links.push(Link {
                        target,
                        text: text.trim().to_string(),
                        line,
                        is_internal,
                        is_code_ref,
                    });
                }
            }
            _ => {}
        }
    }
    links
}

/// Chunks the body at H2 boundaries. Content before the first H2 (including
/// the H1 title) forms its own leading section.
fn extract_sections(body: &str, headings: &[Heading], line_offset: u32) -> Vec<Section> {
    let total_lines = body.lines().count() as u32 + line_offset;
    let boundaries: Vec<&Heading> = headings.iter().filter(|h| h.level <= 2).collect();

    if boundaries.is_empty() {
        if body.trim().is_empty() {
            return Vec::new();
        }
        return vec![Section {
            heading: String::new(),
            slug: String::new(),
            level: 0,
            start_line: line_offset,
            end_line: total_lines,
            text: body.to_string(),
        }];
    }

    let mut sections = Vec::new();
    let lines: Vec<&str> = body.lines().collect();

    for (i, heading) in boundaries.iter().enumerate() {
        let start = heading.line;
        let end = boundaries
            .get(i + 1)
            .map(|next| next.line.saturating_sub(1))
            .unwrap_or(total_lines);
        let start_idx = (start.saturating_sub(line_offset)) as usize;
        let end_idx = ((end.saturating_sub(line_offset)) as usize).min(lines.len());
        let text = lines
            .get(start_idx..end_idx)
            .unwrap_or(&[])
            .join("\n");
        sections.push(Section {
            heading: heading.text.clone(),
            slug: heading.slug.clone(),
            level: heading.level,
            start_line: start,
            end_line: end,
            text,
        });
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_readme_changelog_adr() {
        assert_eq!(infer_document_type("README.md"), InferredDocumentType::Readme);
        assert_eq!(infer_document_type("CHANGELOG.md"), InferredDocumentType::Changelog);
        assert_eq!(infer_document_type("docs/adr/adr-003-storage.md"), InferredDocumentType::Adr);
        assert_eq!(infer_document_type("adr-003-storage.md"), InferredDocumentType::Adr);
        assert_eq!(infer_document_type("docs/random.md"), InferredDocumentType::Other);
    }

    #[test]
    fn explicit_frontmatter_overrides_inference() {
        let src = "---\ndocument_type: guide\n---\n# README content\n";
        let doc = parse_markdown("README.md", src);
        assert_eq!(doc.inferred_document_type, InferredDocumentType::Readme);
        assert_eq!(doc.explicit_document_type.as_deref(), Some("guide"));
    }

    #[test]
    fn unknown_frontmatter_keys_go_to_custom_fields() {
        let src = "---\nstatus: active\nreviewed_by: alice\n---\nbody\n";
        let doc = parse_markdown("a.md", src);
        assert!(doc.frontmatter.contains_key("status"));
        assert!(doc.custom_fields.contains_key("reviewed_by"));
    }

    #[test]
    fn sections_chunk_at_h2_boundaries() {
        let src = "# R\n## S\ntext\n";
        let doc = parse_markdown("README.md", src);
        assert_eq!(doc.headings.len(), 2);
        assert_eq!(doc.headings[1].text, "S");
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].heading, "S");
        assert!(doc.sections[0].text.contains("text"));
    }

    #[test]
    fn links_are_classified_internal_vs_external() {
        let src = "[ext](https://example.com) [code](./src/a.rs)\n";
        let doc = parse_markdown("a.md", src);
        assert_eq!(doc.links.len(), 2);
        assert!(!doc.links[0].is_internal);
        assert!(doc.links[1].is_internal);
        assert!(doc.links[1].is_code_ref);
    }
}
