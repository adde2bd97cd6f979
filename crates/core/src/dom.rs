//! Arena-backed document tree of text and element nodes.
//!
//! Nodes live in a flat arena owned by [`Tree`]; a [`NodeId`] stays valid
//! across structural mutation. Detaching a node keeps it allocated but
//! unreachable from the root, so pre-processing mutators can hold ids
//! collected before the mutation started.

/// Identifier of a node inside a [`Tree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Text(String),
    Element(ElementData),
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// An in-memory parsed document.
///
/// The root is a synthetic `#document` element whose children are the
/// top-level nodes of the input. The tree is acyclic and every attached
/// non-root node has exactly one parent.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Tree {
    /// Creates an empty tree containing only the `#document` root.
    pub fn new() -> Self {
        let root = NodeData {
            parent: None,
            kind: NodeKind::Element(ElementData {
                tag: "#document".to_string(),
                attrs: Vec::new(),
                children: Vec::new(),
            }),
        };
        Tree {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// The synthetic document root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData { parent: None, kind });
        id
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(content.into()))
    }

    /// Creates a detached element node with no attributes or children.
    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }))
    }

    /// Appends a detached node as the last child of `parent`.
    ///
    /// `parent` must be an element and `child` must be detached; attaching
    /// a node under its own descendant would break the acyclicity
    /// invariant, so callers detach first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.nodes[child.0].parent.is_none(),
            "append_child on an attached node"
        );
        self.nodes[child.0].parent = Some(parent);
        if let NodeKind::Element(el) = &mut self.nodes[parent.0].kind {
            el.children.push(child);
        }
    }

    /// True if `id` is an element node.
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element(_))
    }

    /// Tag name of an element, `None` for text nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(&el.tag),
            NodeKind::Text(_) => None,
        }
    }

    /// Content of a text node, `None` for elements.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(content) => Some(content),
            NodeKind::Element(_) => None,
        }
    }

    /// Value of the named attribute, if present.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// All attributes of an element, in document order.
    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => &el.attrs,
            NodeKind::Text(_) => &[],
        }
    }

    /// Sets an attribute, replacing an existing value for the same name.
    pub fn set_attr(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        if let NodeKind::Element(el) = &mut self.nodes[id.0].kind {
            let name = name.into();
            let value = value.into();
            match el.attrs.iter_mut().find(|(key, _)| *key == name) {
                Some((_, slot)) => *slot = value,
                None => el.attrs.push((name, value)),
            }
        }
    }

    /// Ordered children of a node; empty for text nodes.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => &el.children,
            NodeKind::Text(_) => &[],
        }
    }

    /// Parent of a node, `None` for the root and detached nodes.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Tag of the parent element, if the node has one.
    pub fn parent_tag(&self, id: NodeId) -> Option<&str> {
        self.parent(id).and_then(|parent| self.tag(parent))
    }

    /// Flattened text content of a subtree (tags stripped).
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match &self.nodes[current.0].kind {
                NodeKind::Text(content) => out.push_str(content),
                NodeKind::Element(el) => stack.extend(el.children.iter().rev()),
            }
        }
        out
    }

    /// Document-order iterator over the descendants of `id`, excluding
    /// `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { tree: self, stack }
    }

    /// Removes `id` from its parent's child list. No-op when detached.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take()
            && let NodeKind::Element(el) = &mut self.nodes[parent.0].kind
        {
            el.children.retain(|&child| child != id);
        }
    }

    /// Puts `new` in `old`'s slot under its parent and detaches `old`.
    ///
    /// No-op when `old` has no parent.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) {
        let Some(parent) = self.nodes[old.0].parent else {
            return;
        };
        self.detach(new);
        self.nodes[old.0].parent = None;
        self.nodes[new.0].parent = Some(parent);
        if let NodeKind::Element(el) = &mut self.nodes[parent.0].kind
            && let Some(slot) = el.children.iter().position(|&child| child == old)
        {
            el.children[slot] = new;
        }
    }

    /// Replaces a node with a fresh text node, returning the new id.
    pub fn replace_with_text(&mut self, old: NodeId, content: impl Into<String>) -> NodeId {
        let text = self.create_text(content);
        self.replace_with(old, text);
        text
    }

    /// Content of the immediately preceding sibling, if it is text.
    pub fn preceding_text(&self, id: NodeId) -> Option<&str> {
        self.sibling_at_offset(id, -1).and_then(|prev| self.text(prev))
    }

    /// Content of the immediately following sibling, if it is text.
    pub fn following_text(&self, id: NodeId) -> Option<&str> {
        self.sibling_at_offset(id, 1).and_then(|next| self.text(next))
    }

    fn sibling_at_offset(&self, id: NodeId, offset: isize) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&child| child == id)?;
        let target = index.checked_add_signed(offset)?;
        siblings.get(target).copied()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Document-order traversal of a subtree, created by [`Tree::descendants`].
pub struct Descendants<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        let children = self.tree.children(current);
        self.stack.extend(children.iter().rev());
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let p = tree.create_element("p");
        tree.set_attr(p, "class", "greeting");
        let hello = tree.create_text("hello ");
        let b = tree.create_element("b");
        let world = tree.create_text("world");
        tree.append_child(b, world);
        tree.append_child(p, hello);
        tree.append_child(p, b);
        tree.append_child(tree.root(), p);
        (tree, p, hello, b)
    }

    #[test]
    fn navigation_and_attributes() {
        let (tree, p, hello, b) = sample();
        assert_eq!(tree.tag(p), Some("p"));
        assert_eq!(tree.attr(p, "class"), Some("greeting"));
        assert_eq!(tree.attr(p, "id"), None);
        assert_eq!(tree.children(p), &[hello, b]);
        assert_eq!(tree.parent(p), Some(tree.root()));
        assert_eq!(tree.parent_tag(b), Some("p"));
        assert!(tree.is_element(b));
        assert!(!tree.is_element(hello));
    }

    #[test]
    fn set_attr_replaces_existing_value() {
        let (mut tree, p, _, _) = sample();
        tree.set_attr(p, "class", "other");
        assert_eq!(tree.attr(p, "class"), Some("other"));
        assert_eq!(tree.attrs(p).len(), 1);
    }

    #[test]
    fn text_content_flattens_nested_markup() {
        let (tree, p, _, _) = sample();
        assert_eq!(tree.text_content(p), "hello world");
        assert_eq!(tree.text_content(tree.root()), "hello world");
    }

    #[test]
    fn descendants_are_document_ordered() {
        let (tree, p, hello, b) = sample();
        let order: Vec<NodeId> = tree.descendants(tree.root()).collect();
        assert_eq!(order[..3], [p, hello, b]);
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn detach_removes_from_parent() {
        let (mut tree, p, _, b) = sample();
        tree.detach(b);
        assert_eq!(tree.parent(b), None);
        assert_eq!(tree.children(p).len(), 1);
        assert_eq!(tree.text_content(p), "hello ");
    }

    #[test]
    fn replace_with_text_keeps_position() {
        let (mut tree, p, hello, b) = sample();
        let marker = tree.replace_with_text(b, "[[toc]]");
        assert_eq!(tree.children(p), &[hello, marker]);
        assert_eq!(tree.parent(b), None);
        assert_eq!(tree.text_content(p), "hello [[toc]]");
    }

    #[test]
    fn sibling_text_peeking() {
        let (tree, _, _, b) = sample();
        assert_eq!(tree.preceding_text(b), Some("hello "));
        assert_eq!(tree.following_text(b), None);
    }
}
