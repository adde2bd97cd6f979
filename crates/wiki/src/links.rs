//! Link and anchor classification for the wiki dialect.
//!
//! The dialect writes a hyperlink either as a bare `[target]` or as a
//! labelled `[label -> target]` pair. The classifier's whole job is
//! deciding, from the shape of the href alone, whether label and
//! destination are redundant (bare) or must both be shown — mirroring
//! the wiki's own slug-to-title convention.
//!
//! Branches are evaluated top to bottom and the first match wins; every
//! later branch assumes all earlier predicates failed. The order is
//! semantically load-bearing.

use once_cell::sync::Lazy;
use regex::Regex;

static EXTERNAL_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:https?|s?ftp)://").expect("scheme pattern compiles"));
static PAGINATION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/page/\+[0-9]+$").expect("pagination pattern compiles"));
static TRAILING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+$").expect("digit pattern compiles"));
static TRAILING_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z-]*[^/]$").expect("slug pattern compiles"));

/// The observable shape of an anchor element, as seen by the classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkShape<'a> {
    /// The anchor's inner content, already recursively converted.
    pub content: &'a str,
    /// Flattened inner text (tags stripped), used when the link is
    /// dropped entirely.
    pub text: &'a str,
    /// The `name` attribute, if present.
    pub name: Option<&'a str>,
    /// The `href` attribute, if present.
    pub href: Option<&'a str>,
    /// Tag of the parent element, if any.
    pub parent_tag: Option<&'a str>,
}

/// How an anchor renders in the wiki dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRendering {
    /// Three-part rendering the caller wraps in its link delimiters.
    Parts {
        /// Leading part, usually the label.
        prefix: String,
        /// Separator between label and target; empty when the label is
        /// self-describing.
        separator: String,
        /// Link target; empty when redundant with the label.
        target: String,
    },
    /// Complete literal output that bypasses the link delimiters.
    Literal(String),
}

impl LinkRendering {
    fn parts(
        prefix: impl Into<String>,
        separator: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        LinkRendering::Parts {
            prefix: prefix.into(),
            separator: separator.into(),
            target: target.into(),
        }
    }
}

fn is_heading(tag: Option<&str>) -> bool {
    matches!(tag, Some("h1" | "h2" | "h3" | "h4" | "h5" | "h6"))
}

/// Classifies an anchor into its wiki rendering.
///
/// Exactly one branch applies to any input; see the module docs for the
/// ordering contract.
pub fn classify(link: &LinkShape<'_>) -> LinkRendering {
    // Named bookmark outside headings. Heading anchors are implicit in
    // the dialect and fall through to the no-href branch below.
    if let Some(name) = link.name
        && !is_heading(link.parent_tag)
    {
        return if link.content == name || link.content == name.replace('-', " ") {
            LinkRendering::parts("# ", link.content, " #")
        } else {
            LinkRendering::parts(format!("# {}", link.content), " -> ", format!("{name} #"))
        };
    }

    // No destination left to express; keep the text alone.
    let Some(href) = link.href.filter(|href| !href.is_empty()) else {
        return LinkRendering::Literal(link.text.to_string());
    };

    // Anchor on another page.
    if href.starts_with("/#") {
        return LinkRendering::parts(format!("\"{}\"", link.content), ":", href);
    }

    // Anchor on this page.
    if href.starts_with('#') {
        return LinkRendering::parts(link.content, " -> ", href);
    }

    // External absolute URL; self-describing ones drop the label.
    if EXTERNAL_SCHEME.is_match(href) {
        let stripped = EXTERNAL_SCHEME.replace(href, "");
        return if stripped == link.content {
            LinkRendering::parts(href, "", "")
        } else {
            LinkRendering::parts(link.content, " -> ", href)
        };
    }

    // A relative link the dialect cannot express; drop the link and keep
    // only its flattened text.
    if !href.starts_with('/') {
        return LinkRendering::Literal(link.text.to_string());
    }

    // Too deep to resolve as a simple page reference; pass through.
    if href.matches('/').count() >= 3 {
        return LinkRendering::parts(link.content, " -> ", href);
    }

    // Paginated listing: keep the `+`, drop the page number.
    if PAGINATION_SUFFIX.is_match(href) {
        let target = TRAILING_DIGITS.replace(href, "").into_owned();
        return LinkRendering::parts(link.content, " -> ", target);
    }

    page_link(link.content, href)
}

/// The default branch: page and namespaced wiki links.
fn page_link(content: &str, href: &str) -> LinkRendering {
    let segments: Vec<&str> = href.split('/').collect();
    let context_name = segments.get(1).copied().unwrap_or_default();
    let page_name = segments.get(2).copied().unwrap_or(context_name);
    let wiki_page_name = humanize_slug(page_name);

    if context_name == "page" {
        return if content == wiki_page_name {
            LinkRendering::parts(content, "", "")
        } else {
            LinkRendering::parts(content, " -> ", wiki_page_name)
        };
    }

    if context_name != page_name {
        return if content == wiki_page_name {
            LinkRendering::parts(context_name, " / ", wiki_page_name)
        } else {
            LinkRendering::parts(content, " -> ", format!("{context_name} / {wiki_page_name}"))
        };
    }

    // Self-referencing group page: the label may be spelled as the raw
    // slug, its humanized form, or the humanized form re-dashed.
    if content == page_name
        || content == wiki_page_name
        || content == wiki_page_name.replace(' ', "-")
    {
        return LinkRendering::parts(wiki_page_name, "", "");
    }
    LinkRendering::parts(content, " -> ", href)
}

/// Humanizes the trailing lowercase/dash run of a slug by turning its
/// dashes into spaces. Everything before that run (underscores, digits,
/// fragment marks) is preserved as written.
fn humanize_slug(slug: &str) -> String {
    match TRAILING_SLUG.find(slug) {
        Some(found) => {
            let mut out = String::with_capacity(slug.len());
            out.push_str(&slug[..found.start()]);
            out.push_str(&slug[found.start()..found.end()].replace('-', " "));
            out
        }
        None => slug.to_string(),
    }
}
