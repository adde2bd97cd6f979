//! The wiki conversion grammar: headings, paragraphs, and anchors.
//!
//! Only the rendering the engine needs is defined here; every other tag
//! degrades to content passthrough in the engine itself.

use demarkup_core::{Grammar, GrammarError, NodeId, Renderer, Tree, convert};
use once_cell::sync::Lazy;

use crate::links::{self, LinkRendering, LinkShape};

/// Builds a fresh wiki grammar.
///
/// The stock grammar is also available pre-built through
/// [`wiki_grammar`]; deriving from either yields an independent copy.
pub fn build_grammar() -> Result<Grammar, GrammarError> {
    Grammar::builder()
        .whitelist_attributes(&["class", "id", "name", "href"])
        .rule(&["h1"], heading_one)
        .rule(&["h2"], heading_two)
        .rule(&["h3", "h4", "h5", "h6"], prefixed_heading)
        .rule(&["p"], paragraph)
        .rule(&["a"], anchor)
        .pre_processing("ul.toc", swap_toc)
        .post_processing(r"\n{3,}", "\n\n")
        .build()
}

static WIKI: Lazy<Grammar> =
    Lazy::new(|| build_grammar().expect("stock wiki grammar is valid"));

/// The stock wiki grammar, built once and shared.
pub fn wiki_grammar() -> &'static Grammar {
    &WIKI
}

/// Converts raw HTML to wiki markup using the stock grammar.
pub fn to_wiki(raw: &str) -> Result<String, demarkup_core::ConvertError> {
    convert(raw, wiki_grammar())
}

// Underline lengths are fixed, not tracking the title.
fn heading_one(cx: &Renderer<'_>, node: NodeId) -> String {
    format!("{}\n=====", cx.content_of(node))
}

fn heading_two(cx: &Renderer<'_>, node: NodeId) -> String {
    format!("{}\n----", cx.content_of(node))
}

fn prefixed_heading(cx: &Renderer<'_>, node: NodeId) -> String {
    let tag = cx.tree().tag(node).unwrap_or("h6");
    format!("{tag}. {}\n", cx.content_of(node))
}

fn paragraph(cx: &Renderer<'_>, node: NodeId) -> String {
    format!("{}\n", cx.content_of(node))
}

fn anchor(cx: &Renderer<'_>, node: NodeId) -> String {
    let content = cx.content_of(node);
    let text = cx.tree().text_content(node);
    let attrs = cx.attributes(node);
    let attr = |name: &str| {
        attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    };

    let shape = LinkShape {
        content: &content,
        text: &text,
        name: attr("name"),
        href: attr("href"),
        parent_tag: cx.tree().parent_tag(node),
    };
    match links::classify(&shape) {
        LinkRendering::Parts {
            prefix,
            separator,
            target,
        } => format!("[{prefix}{separator}{target}]"),
        LinkRendering::Literal(text) => text,
    }
}

/// Replaces a table-of-contents list with the dialect's `[[toc]]` macro.
fn swap_toc(tree: &mut Tree, node: NodeId) {
    tree.replace_with_text(node, "[[toc]]");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_render_with_fixed_underlines() {
        assert_eq!(to_wiki("<h1>title</h1>").unwrap(), "title\n=====");
        assert_eq!(to_wiki("<h2>title</h2>").unwrap(), "title\n----");
        assert_eq!(to_wiki("<h3>title</h3>").unwrap(), "h3. title\n");
        assert_eq!(to_wiki("<h5>title</h5>").unwrap(), "h5. title\n");
    }

    #[test]
    fn toc_list_becomes_macro() {
        assert_eq!(
            to_wiki(r#"<ul class="toc"><li>one</li></ul><p>hi</p>"#).unwrap(),
            "[[toc]]hi\n"
        );
    }

    #[test]
    fn derived_grammar_can_override_a_heading() {
        fn loud(cx: &Renderer<'_>, node: NodeId) -> String {
            format!("{}\n#####", cx.content_of(node))
        }
        let derived = wiki_grammar().derive().rule(&["h1"], loud).build().unwrap();
        assert_eq!(convert("<h1>t</h1>", &derived).unwrap(), "t\n#####");
        // The stock grammar is untouched.
        assert_eq!(to_wiki("<h1>t</h1>").unwrap(), "t\n=====");
    }
}
