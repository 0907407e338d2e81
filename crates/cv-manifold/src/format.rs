//! Fragment concatenation in the caller's chosen format (spec §4.7).

use crate::dimension::DimensionScore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Xml,
    Markdown,
    Json,
}

pub fn render(dimensions: &[DimensionScore], format: OutputFormat) -> String {
    match format {
        OutputFormat::Xml => render_xml(dimensions),
        OutputFormat::Markdown => render_markdown(dimensions),
        OutputFormat::Json => render_json(dimensions),
    }
}

fn render_xml(dimensions: &[DimensionScore]) -> String {
    let mut out = String::from("<context>\n");
    for d in dimensions {
        out.push_str(&format!(
            "  <dimension name=\"{}\" score=\"{:.3}\">{}</dimension>\n",
            d.dimension.as_str(),
            d.score,
            xml_escape(&d.fragment)
        ));
    }
    out.push_str("</context>");
    out
}

fn render_markdown(dimensions: &[DimensionScore]) -> String {
    let mut out = String::new();
    for d in dimensions {
        out.push_str(&format!("## {} ({:.2})\n{}\n\n", d.dimension.as_str(), d.score, d.fragment));
    }
    out.trim_end().to_string()
}

fn render_json(dimensions: &[DimensionScore]) -> String {
    serde_json::to_string_pretty(dimensions).unwrap_or_default()
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::Dimension;

    fn sample() -> Vec<DimensionScore> {
        vec![DimensionScore {
            dimension: Dimension::Structural,
            score: 0.5,
            refs: vec!["a.rs".into()],
            fragment: "2 files, 3 symbols".into(),
            byte_budget: 100,
        }]
    }

    #[test]
    fn xml_wraps_each_dimension() {
        let out = render(&sample(), OutputFormat::Xml);
        assert!(out.contains("<dimension name=\"structural\""));
    }

    #[test]
    fn markdown_has_a_heading_per_dimension() {
        let out = render(&sample(), OutputFormat::Markdown);
        assert!(out.starts_with("## structural"));
    }

    #[test]
    fn json_round_trips_as_array() {
        let out = render(&sample(), OutputFormat::Json);
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 1);
    }
}
