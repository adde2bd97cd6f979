//! Grammar composition: per-tag rules, attribute whitelist, and the
//! pre-/post-processing pipelines.
//!
//! A [`Grammar`] is assembled once through [`GrammarBuilder`] and frozen
//! by `build()`; selector and pattern syntax errors are fatal there,
//! before any conversion can run. A frozen grammar is immutable and can
//! be shared read-only across concurrent conversions of distinct trees.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use regex::Regex;

use crate::dom::{NodeId, Tree};
use crate::error::GrammarError;
use crate::render::Renderer;
use crate::selector::Selector;

/// Renders one element of the source tree into the target dialect.
///
/// Implemented for any `Fn(&Renderer, NodeId) -> String`, so plain
/// functions register directly as rules.
pub trait TagHandler: Send + Sync {
    /// Renders `node`, using `cx` to recurse into its content.
    fn render(&self, cx: &Renderer<'_>, node: NodeId) -> String;
}

impl<F> TagHandler for F
where
    F: for<'a, 'b> Fn(&'a Renderer<'b>, NodeId) -> String + Send + Sync,
{
    fn render(&self, cx: &Renderer<'_>, node: NodeId) -> String {
        (self)(cx, node)
    }
}

/// Mutates a matched node during the pre-processing pass.
pub trait Mutator: Send + Sync {
    /// Rewrites `node` in place within `tree`.
    fn mutate(&self, tree: &mut Tree, node: NodeId);
}

impl<F> Mutator for F
where
    F: Fn(&mut Tree, NodeId) + Send + Sync,
{
    fn mutate(&self, tree: &mut Tree, node: NodeId) {
        (self)(tree, node)
    }
}

/// Replacement side of a post-processing rule.
#[derive(Clone)]
pub enum Replacement {
    /// Literal template; `$1`-style capture back-references are expanded.
    Template(String),
    /// Function of the whole matched substring.
    Func(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

#[derive(Clone)]
struct PreRule {
    source: String,
    selector: Selector,
    mutator: Arc<dyn Mutator>,
}

#[derive(Clone)]
struct PostRule {
    source: String,
    pattern: Regex,
    replacement: Replacement,
}

/// Definition-time surface for assembling a [`Grammar`].
#[derive(Default)]
pub struct GrammarBuilder {
    rules: HashMap<String, Arc<dyn TagHandler>>,
    default_rule: Option<Arc<dyn TagHandler>>,
    whitelist: Option<HashSet<String>>,
    pre: Vec<(String, Arc<dyn Mutator>)>,
    post: Vec<(String, Replacement)>,
}

impl GrammarBuilder {
    /// Registers `handler` for each tag; the last registration for a tag
    /// wins.
    pub fn rule(mut self, tags: &[&str], handler: impl TagHandler + 'static) -> Self {
        let handler: Arc<dyn TagHandler> = Arc::new(handler);
        for tag in tags {
            self.rules
                .insert(tag.to_ascii_lowercase(), Arc::clone(&handler));
        }
        self
    }

    /// Installs the fallback handler for tags with no explicit rule.
    pub fn default_rule(mut self, handler: impl TagHandler + 'static) -> Self {
        self.default_rule = Some(Arc::new(handler));
        self
    }

    /// Sets the full attribute whitelist for this grammar.
    ///
    /// A derived grammar that never calls this inherits its base's list
    /// verbatim; calling it replaces the list outright, never merges.
    pub fn whitelist_attributes(mut self, names: &[&str]) -> Self {
        self.whitelist = Some(names.iter().map(|name| name.to_ascii_lowercase()).collect());
        self
    }

    /// Appends a pre-processing rule.
    ///
    /// Re-registering an existing selector replaces its mutator in place,
    /// keeping the rule's original position in the pipeline.
    pub fn pre_processing(mut self, selector: &str, mutator: impl Mutator + 'static) -> Self {
        upsert(&mut self.pre, selector, Arc::new(mutator) as Arc<dyn Mutator>);
        self
    }

    /// Appends a post-processing substitution with a literal template.
    ///
    /// Same replace-in-place semantics as [`pre_processing`] when the
    /// pattern text is already registered.
    ///
    /// [`pre_processing`]: GrammarBuilder::pre_processing
    pub fn post_processing(mut self, pattern: &str, template: &str) -> Self {
        upsert(
            &mut self.post,
            pattern,
            Replacement::Template(template.to_string()),
        );
        self
    }

    /// Appends a post-processing substitution computed per match.
    pub fn post_processing_with(
        mut self,
        pattern: &str,
        replacer: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        upsert(&mut self.post, pattern, Replacement::Func(Arc::new(replacer)));
        self
    }

    /// Compiles selectors and patterns and freezes the grammar.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        let mut pre = Vec::with_capacity(self.pre.len());
        for (source, mutator) in self.pre {
            let selector =
                Selector::parse(&source).map_err(|err| GrammarError::Selector {
                    selector: source.clone(),
                    source: err,
                })?;
            pre.push(PreRule {
                source,
                selector,
                mutator,
            });
        }

        let mut post = Vec::with_capacity(self.post.len());
        for (source, replacement) in self.post {
            let pattern = Regex::new(&source).map_err(|err| GrammarError::Pattern {
                pattern: source.clone(),
                source: err,
            })?;
            post.push(PostRule {
                source,
                pattern,
                replacement,
            });
        }

        Ok(Grammar {
            rules: self.rules,
            default_rule: self.default_rule,
            whitelist: self.whitelist.unwrap_or_default(),
            pre,
            post,
        })
    }
}

/// A frozen conversion grammar: rule table, default handler, attribute
/// whitelist, and ordered pre-/post-processing pipelines.
pub struct Grammar {
    rules: HashMap<String, Arc<dyn TagHandler>>,
    default_rule: Option<Arc<dyn TagHandler>>,
    whitelist: HashSet<String>,
    pre: Vec<PreRule>,
    post: Vec<PostRule>,
}

impl std::fmt::Debug for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grammar")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .field("default_rule", &self.default_rule.is_some())
            .field("whitelist", &self.whitelist)
            .field("pre", &self.pre.len())
            .field("post", &self.post.len())
            .finish()
    }
}

impl Grammar {
    /// Starts an empty grammar definition.
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::default()
    }

    /// Starts a new definition seeded with a deep copy of this grammar.
    ///
    /// The copy shares nothing mutable with its base: rule tables and
    /// pipelines are copied, and the `Arc`-shared handlers themselves are
    /// immutable, so later edits to either grammar never affect the other.
    pub fn derive(&self) -> GrammarBuilder {
        GrammarBuilder {
            rules: self.rules.clone(),
            default_rule: self.default_rule.clone(),
            whitelist: Some(self.whitelist.clone()),
            pre: self
                .pre
                .iter()
                .map(|rule| (rule.source.clone(), Arc::clone(&rule.mutator)))
                .collect(),
            post: self
                .post
                .iter()
                .map(|rule| (rule.source.clone(), rule.replacement.clone()))
                .collect(),
        }
    }

    pub(crate) fn handler_for(&self, tag: &str) -> Option<&Arc<dyn TagHandler>> {
        self.rules.get(tag).or(self.default_rule.as_ref())
    }

    /// The element's attributes filtered through the whitelist, in
    /// document order.
    pub fn attributes(&self, tree: &Tree, node: NodeId) -> Vec<(String, String)> {
        tree.attrs(node)
            .iter()
            .filter(|(name, _)| self.whitelist.contains(name))
            .cloned()
            .collect()
    }

    /// Runs every pre-processing rule over `tree`, in registration order.
    ///
    /// Each rule performs exactly one scan-and-mutate pass: matches are
    /// collected against the current tree, then the mutator runs once per
    /// match. There is no fixed-point re-scan, so rule authors order
    /// rules such that later rules see the effects of earlier ones.
    pub fn apply_pre_processing(&self, tree: &mut Tree) {
        for rule in &self.pre {
            let matches = rule.selector.find_all(tree);
            log::trace!(
                "pre-processing `{}`: {} match(es)",
                rule.source,
                matches.len()
            );
            for id in matches {
                rule.mutator.mutate(tree, id);
            }
        }
    }

    /// Applies every post-processing substitution, in registration order,
    /// each as a global substitution over the previous rule's output.
    pub fn apply_post_processing(&self, text: String) -> String {
        let mut current = text;
        for rule in &self.post {
            log::trace!("post-processing `{}`", rule.source);
            current = match &rule.replacement {
                Replacement::Template(template) => rule
                    .pattern
                    .replace_all(&current, template.as_str())
                    .into_owned(),
                Replacement::Func(replacer) => rule
                    .pattern
                    .replace_all(&current, |caps: &regex::Captures<'_>| replacer(&caps[0]))
                    .into_owned(),
            };
        }
        current
    }
}

fn upsert<T>(list: &mut Vec<(String, T)>, key: &str, value: T) {
    match list.iter_mut().find(|(existing, _)| existing == key) {
        Some((_, slot)) => *slot = value,
        None => list.push((key.to_string(), value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GrammarError;
    use crate::parse::parse;
    use crate::render::convert;

    fn shout(cx: &Renderer<'_>, node: NodeId) -> String {
        format!("{}!", cx.content_of(node))
    }

    fn whisper(cx: &Renderer<'_>, node: NodeId) -> String {
        format!("({})", cx.content_of(node))
    }

    #[test]
    fn last_rule_registration_wins() {
        let grammar = Grammar::builder()
            .rule(&["p"], shout)
            .rule(&["p"], whisper)
            .build()
            .unwrap();
        assert_eq!(convert("<p>hi</p>", &grammar).unwrap(), "(hi)");
    }

    #[test]
    fn reregistered_post_rule_keeps_its_position() {
        let base = Grammar::builder()
            .post_processing("a", "b")
            .post_processing("b+", "c")
            .build()
            .unwrap();
        assert_eq!(base.apply_post_processing("a".to_string()), "c");

        // Overriding the first pattern must keep it running before `b+`,
        // so its doubled output still collapses to a single `c`.
        let overridden = base.derive().post_processing("a", "bb").build().unwrap();
        assert_eq!(overridden.apply_post_processing("a".to_string()), "c");
    }

    #[test]
    fn post_rules_compose_sequentially() {
        let grammar = Grammar::builder()
            .post_processing("x", "y")
            .post_processing("y+", "z")
            .build()
            .unwrap();
        assert_eq!(grammar.apply_post_processing("xxy".to_string()), "z");
    }

    #[test]
    fn post_template_back_references() {
        let grammar = Grammar::builder()
            .post_processing(r"(\w+)-(\w+)", "$2-$1")
            .build()
            .unwrap();
        assert_eq!(grammar.apply_post_processing("ab-cd".to_string()), "cd-ab");
    }

    #[test]
    fn post_function_replacement() {
        let grammar = Grammar::builder()
            .post_processing_with("[0-9]+", |matched| format!("<{matched}>"))
            .build()
            .unwrap();
        assert_eq!(
            grammar.apply_post_processing("a1b22".to_string()),
            "a<1>b<22>"
        );
    }

    #[test]
    fn whitelist_filters_attributes() {
        let grammar = Grammar::builder()
            .whitelist_attributes(&["class", "href"])
            .build()
            .unwrap();
        let tree = parse(r#"<a href="/x" rel="nofollow" class="ext">x</a>"#).unwrap();
        let a = tree.children(tree.root())[0];
        assert_eq!(
            grammar.attributes(&tree, a),
            vec![
                ("href".to_string(), "/x".to_string()),
                ("class".to_string(), "ext".to_string()),
            ]
        );
    }

    #[test]
    fn derived_grammar_is_independent_of_its_base() {
        let base = Grammar::builder().rule(&["p"], shout).build().unwrap();
        let derived = base.derive().rule(&["p"], whisper).build().unwrap();
        assert_eq!(convert("<p>hi</p>", &base).unwrap(), "hi!");
        assert_eq!(convert("<p>hi</p>", &derived).unwrap(), "(hi)");
    }

    #[test]
    fn derived_grammar_inherits_whitelist_when_silent() {
        let base = Grammar::builder()
            .whitelist_attributes(&["href"])
            .build()
            .unwrap();
        let silent = base.derive().build().unwrap();
        let replaced = base.derive().whitelist_attributes(&["id"]).build().unwrap();

        let tree = parse(r#"<a href="/x" id="y">x</a>"#).unwrap();
        let a = tree.children(tree.root())[0];
        assert_eq!(silent.attributes(&tree, a).len(), 1);
        assert_eq!(silent.attributes(&tree, a)[0].0, "href");
        assert_eq!(replaced.attributes(&tree, a)[0].0, "id");
    }

    #[test]
    fn invalid_selector_fails_at_build_time() {
        fn noop(_: &mut Tree, _: NodeId) {}
        let err = Grammar::builder()
            .pre_processing("p > a", noop)
            .build()
            .unwrap_err();
        assert!(matches!(err, GrammarError::Selector { selector, .. } if selector == "p > a"));
    }

    #[test]
    fn invalid_pattern_fails_at_build_time() {
        let err = Grammar::builder()
            .post_processing("(", "x")
            .build()
            .unwrap_err();
        assert!(matches!(err, GrammarError::Pattern { pattern, .. } if pattern == "("));
    }
}
