//! HTML to plain text for web content.

use ego_tree::NodeRef;
use scraper::{node::Node, Html, Selector};
use std::sync::LazyLock;

/// Subtrees that carry no searchable prose.
const DROP_TAGS: &[&str] = &["script", "style", "video", "img", "canvas"];

static MAIN_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("main").expect("static selector"));

/// Reduce an HTML page to the readable text of its `<main>` subtrees.
///
/// `<script>`, `<style>`, `<video>`, `<img>` and `<canvas>` subtrees are
/// dropped, whitespace runs collapse to single spaces, and the result is
/// trimmed. Pages without a `<main>` element produce the empty string.
pub fn clean_html(html: &str) -> String {
    let doc = Html::parse_document(html);

    let mut raw = String::new();
    for main in doc.select(&MAIN_SELECTOR) {
        collect_text(*main, &mut raw);
        raw.push(' ');
    }

    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text),
            Node::Element(el) => {
                if DROP_TAGS.contains(&el.name()) {
                    continue;
                }
                collect_text(child, out);
            }
            _ => {}
        }
    }
}
