// crates/extract/src/fm.rs

use crate::ExtractError;
use domain::doc::Metadata;
use serde_json::Value as Json;

/// Which front-matter dialect was found at the top of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmKind {
    Yaml,
    Toml,
    Json,
}

/// Split a Markdown document into front matter and body.
///
/// Detection cascade: YAML (`---` fences), then TOML (`+++` fences),
/// then a leading JSON object.
/// Returns the parsed data (if any) and the body
/// text with the front matter removed; a document without front matter
/// comes back unchanged.
pub fn split_front_matter(full: &str) -> Result<(Option<(FmKind, Json)>, String), ExtractError> {
    use gray_matter::engine::YAML;
    use gray_matter::Matter;

    // 1. YAML
    {
        let matter: Matter<YAML> = Matter::new();
        if let Ok(parsed) = matter.parse::<Json>(full) {
            if let Some(data) = parsed.data {
                return Ok((Some((FmKind::Yaml, data)), parsed.content));
            }
        }
    }

    // 2. TOML, handled manually; the delimiter scan is trivial and
    //    `toml::from_str` is less strict than gray_matter's TOML engine.
    let trimmed = full.trim_start_matches('\u{feff}');
    if trimmed.starts_with("+++") {
        let after = &trimmed[3..];
        let after = after
            .strip_prefix('\n')
            .or_else(|| after.strip_prefix("\r\n"))
            .unwrap_or(after);

        if let Some(end_idx) = after.find("\n+++") {
            let fm_src = &after[..end_idx];
            let toml_val = toml::from_str::<toml::Value>(fm_src)
                .map_err(|e| ExtractError::FrontMatter(e.to_string()))?;
            let json = serde_json::to_value(toml_val)
                .map_err(|e| ExtractError::FrontMatter(e.to_string()))?;
            let body = after[end_idx + 4..].trim_start().to_owned();
            return Ok((Some((FmKind::Toml, json)), body));
        }
    }

    // 3. JSON front matter: the whole document is a single object.
    let lead = trimmed.trim_start();
    if lead.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Json>(lead) {
            return Ok((Some((FmKind::Json, value)), String::new()));
        }
    }

    Ok((None, full.to_owned()))
}

/// Merge parsed front matter into a metadata map, stringifying values.
/// Nested structures keep their JSON rendering.
pub fn merge_into_metadata(data: &Json, metadata: &mut Metadata) {
    if let Json::Object(map) = data {
        for (key, value) in map {
            let rendered = match value {
                Json::String(s) => s.clone(),
                other => other.to_string(),
            };
            metadata.insert(key.clone(), rendered);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_front_matter_is_split_out() {
        let doc = "---\ntitle: Notes\ntags:\n  - a\n  - b\n---\nThe body.\n";
        let (fm, body) = split_front_matter(doc).expect("split");

        let (kind, data) = fm.expect("front matter present");
        assert_eq!(kind, FmKind::Yaml);
        assert_eq!(data["title"], "Notes");
        assert_eq!(body.trim(), "The body.");
    }

    #[test]
    fn toml_front_matter_is_split_out() {
        let doc = "+++\ntitle = \"Notes\"\ndraft = true\n+++\nThe body.\n";
        let (fm, body) = split_front_matter(doc).expect("split");

        let (kind, data) = fm.expect("front matter present");
        assert_eq!(kind, FmKind::Toml);
        assert_eq!(data["title"], "Notes");
        assert_eq!(data["draft"], true);
        assert_eq!(body.trim(), "The body.");
    }

    #[test]
    fn json_front_matter_consumes_the_document() {
        let doc = r#"{ "title": "Notes", "count": 3 }"#;
        let (fm, body) = split_front_matter(doc).expect("split");

        let (kind, data) = fm.expect("front matter present");
        assert_eq!(kind, FmKind::Json);
        assert_eq!(data["count"], 3);
        assert!(body.is_empty());
    }

    #[test]
    fn plain_markdown_passes_through() {
        let doc = "# Heading\n\nJust text.\n";
        let (fm, body) = split_front_matter(doc).expect("split");

        assert!(fm.is_none());
        assert_eq!(body, doc);
    }

    #[test]
    fn metadata_merge_stringifies_values() {
        let data = serde_json::json!({
            "title": "Notes",
            "draft": true,
            "tags": ["a", "b"],
        });

        let mut metadata = Metadata::new();
        merge_into_metadata(&data, &mut metadata);

        assert_eq!(metadata["title"], "Notes");
        assert_eq!(metadata["draft"], "true");
        assert_eq!(metadata["tags"], r#"["a","b"]"#);
    }
}
