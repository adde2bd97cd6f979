//! Traversal/dispatch engine and the top-level conversion pipeline.

use std::cell::Cell;

use crate::dom::{NodeId, Tree};
use crate::error::ConvertError;
use crate::grammar::Grammar;
use crate::parse;

/// Dispatch recursion bound. Elements nested deeper than this degrade to
/// flattened text instead of exhausting the stack on pathological input.
const MAX_DEPTH: usize = 512;

/// Renders node sequences of one tree against a frozen [`Grammar`].
///
/// Handlers receive a shared reference to the renderer so they can
/// recurse into their own subtree via [`content_of`].
///
/// [`content_of`]: Renderer::content_of
pub struct Renderer<'a> {
    grammar: &'a Grammar,
    tree: &'a Tree,
    depth: Cell<usize>,
}

impl<'a> Renderer<'a> {
    /// Creates a renderer over `tree` driven by `grammar`'s rule table.
    pub fn new(grammar: &'a Grammar, tree: &'a Tree) -> Self {
        Renderer {
            grammar,
            tree,
            depth: Cell::new(0),
        }
    }

    /// The tree being rendered.
    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    /// The grammar driving dispatch.
    pub fn grammar(&self) -> &'a Grammar {
        self.grammar
    }

    /// Whitelist-filtered attributes of `node`.
    pub fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.grammar.attributes(self.tree, node)
    }

    /// Renders a node sequence in document order.
    pub fn render(&self, nodes: &[NodeId]) -> String {
        nodes.iter().map(|&id| self.render_node(id)).collect()
    }

    /// Renders one node.
    ///
    /// Text renders as its verbatim content. An element dispatches to its
    /// tag's handler, then to the grammar's default handler, and finally
    /// degrades to content passthrough (tag elided) — an unrecognized tag
    /// never aborts a conversion.
    pub fn render_node(&self, node: NodeId) -> String {
        if let Some(content) = self.tree.text(node) {
            return content.to_string();
        }
        if self.depth.get() >= MAX_DEPTH {
            log::warn!("render depth exceeded {MAX_DEPTH}; flattening subtree");
            return self.tree.text_content(node);
        }

        self.depth.set(self.depth.get() + 1);
        let tag = self.tree.tag(node);
        let rendered = match tag.and_then(|tag| self.grammar.handler_for(tag)) {
            Some(handler) => handler.render(self, node),
            None => {
                log::trace!("no rule for `{}`; passing content through", tag.unwrap_or(""));
                self.content_of(node)
            }
        };
        self.depth.set(self.depth.get() - 1);
        rendered
    }

    /// Renders `node`'s children without re-dispatching `node` itself.
    pub fn content_of(&self, node: NodeId) -> String {
        self.render(self.tree.children(node))
    }
}

/// Converts raw markup to the target dialect using `grammar`.
///
/// The pipeline is: parse, mutate the tree through the grammar's
/// pre-processing rules, render the root's children, then rewrite the
/// string through the post-processing substitutions. Deterministic, with
/// no side effects beyond the returned string.
pub fn convert(raw: &str, grammar: &Grammar) -> Result<String, ConvertError> {
    let mut tree = parse::parse(raw)?;
    grammar.apply_pre_processing(&mut tree);
    let renderer = Renderer::new(grammar, &tree);
    let rendered = renderer.render(tree.children(tree.root()));
    log::debug!("converted {} bytes of markup", raw.len());
    Ok(grammar.apply_post_processing(rendered))
}
