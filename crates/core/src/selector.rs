//! Structural selectors used by pre-processing rules.
//!
//! The supported grammar is intentionally small: a selector is a
//! whitespace-separated list of compounds meaning *descendant*, and each
//! compound is `tag`, `.class`, `#id`, or a combination such as
//! `ul.toc`. Syntax errors surface at grammar-build time.

use crate::dom::{NodeId, Tree};
use crate::error::SelectorError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

/// A compiled structural selector.
#[derive(Debug, Clone)]
pub struct Selector {
    compounds: Vec<Compound>,
    source: String,
}

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_'
}

impl Selector {
    /// Parses selector text, failing on anything outside the supported
    /// grammar.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let bytes = input.as_bytes();
        let mut compounds = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i].is_ascii_whitespace() {
                i += 1;
                continue;
            }
            let mut compound = Compound::default();
            if is_name_byte(bytes[i]) {
                let start = i;
                while i < bytes.len() && is_name_byte(bytes[i]) {
                    i += 1;
                }
                compound.tag = Some(input[start..i].to_ascii_lowercase());
            }
            loop {
                match bytes.get(i).copied() {
                    Some(marker @ (b'.' | b'#')) => {
                        i += 1;
                        let start = i;
                        while i < bytes.len() && is_name_byte(bytes[i]) {
                            i += 1;
                        }
                        if start == i {
                            return Err(SelectorError::MissingName {
                                marker: marker as char,
                                offset: start,
                            });
                        }
                        let name = input[start..i].to_string();
                        if marker == b'.' {
                            compound.classes.push(name);
                        } else {
                            compound.id = Some(name);
                        }
                    }
                    Some(b) if b.is_ascii_whitespace() => break,
                    None => break,
                    Some(_) => {
                        let found = input[i..].chars().next().unwrap_or('\u{fffd}');
                        return Err(SelectorError::UnexpectedChar { found, offset: i });
                    }
                }
            }
            compounds.push(compound);
        }

        if compounds.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(Selector {
            compounds,
            source: input.to_string(),
        })
    }

    /// The selector text as originally written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True if `node` matches this selector within `tree`.
    ///
    /// The last compound must match the node itself; each earlier
    /// compound must match some strictly higher ancestor, in order.
    pub fn matches(&self, tree: &Tree, node: NodeId) -> bool {
        let Some((last, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        if !matches_compound(last, tree, node) {
            return false;
        }
        let mut cursor = node;
        for compound in ancestors.iter().rev() {
            let mut found = false;
            while let Some(parent) = tree.parent(cursor) {
                cursor = parent;
                if matches_compound(compound, tree, cursor) {
                    found = true;
                    break;
                }
            }
            if !found {
                return false;
            }
        }
        true
    }

    /// All matching elements under the tree root, in document order.
    pub fn find_all(&self, tree: &Tree) -> Vec<NodeId> {
        tree.descendants(tree.root())
            .filter(|&id| tree.is_element(id) && self.matches(tree, id))
            .collect()
    }
}

fn matches_compound(compound: &Compound, tree: &Tree, id: NodeId) -> bool {
    let Some(tag) = tree.tag(id) else {
        return false;
    };
    if let Some(want) = &compound.tag
        && want != tag
    {
        return false;
    }
    if let Some(want) = &compound.id
        && tree.attr(id, "id") != Some(want.as_str())
    {
        return false;
    }
    compound.classes.iter().all(|class| {
        tree.attr(id, "class")
            .is_some_and(|value| value.split_whitespace().any(|c| c == class))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn fixture() -> Tree {
        parse(concat!(
            r#"<div id="main" class="wrap">"#,
            r#"<ul class="toc deep"><li>one</li></ul>"#,
            r#"<p class="note">two</p>"#,
            "</div>",
            r#"<p>outside</p>"#,
        ))
        .unwrap()
    }

    fn texts_of(tree: &Tree, matches: &[NodeId]) -> Vec<String> {
        matches.iter().map(|&id| tree.text_content(id)).collect()
    }

    #[test]
    fn tag_selector() {
        let tree = fixture();
        let sel = Selector::parse("p").unwrap();
        assert_eq!(texts_of(&tree, &sel.find_all(&tree)), ["two", "outside"]);
    }

    #[test]
    fn class_selector() {
        let tree = fixture();
        let sel = Selector::parse(".note").unwrap();
        assert_eq!(texts_of(&tree, &sel.find_all(&tree)), ["two"]);
    }

    #[test]
    fn class_matches_within_multi_valued_attribute() {
        let tree = fixture();
        let sel = Selector::parse(".deep").unwrap();
        assert_eq!(sel.find_all(&tree).len(), 1);
    }

    #[test]
    fn id_selector() {
        let tree = fixture();
        let sel = Selector::parse("#main").unwrap();
        let found = sel.find_all(&tree);
        assert_eq!(found.len(), 1);
        assert_eq!(tree.tag(found[0]), Some("div"));
    }

    #[test]
    fn compound_tag_and_class() {
        let tree = fixture();
        let sel = Selector::parse("ul.toc").unwrap();
        assert_eq!(sel.find_all(&tree).len(), 1);
        assert!(Selector::parse("p.toc").unwrap().find_all(&tree).is_empty());
    }

    #[test]
    fn descendant_combinator_spans_levels() {
        let tree = fixture();
        // li is not a direct child of the div, but is a descendant.
        let sel = Selector::parse("div.wrap li").unwrap();
        assert_eq!(texts_of(&tree, &sel.find_all(&tree)), ["one"]);
        // p outside the div must not match.
        let scoped = Selector::parse("#main p").unwrap();
        assert_eq!(texts_of(&tree, &scoped.find_all(&tree)), ["two"]);
    }

    #[test]
    fn parse_errors() {
        assert_eq!(Selector::parse("").unwrap_err(), SelectorError::Empty);
        assert_eq!(Selector::parse("   ").unwrap_err(), SelectorError::Empty);
        assert_eq!(
            Selector::parse(".").unwrap_err(),
            SelectorError::MissingName {
                marker: '.',
                offset: 1
            }
        );
        assert_eq!(
            Selector::parse("ul..x").unwrap_err(),
            SelectorError::MissingName {
                marker: '.',
                offset: 3
            }
        );
        assert_eq!(
            Selector::parse("p > a").unwrap_err(),
            SelectorError::UnexpectedChar {
                found: '>',
                offset: 2
            }
        );
    }
}
