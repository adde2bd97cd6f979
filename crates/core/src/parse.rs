//! Permissive HTML parsing into a [`Tree`].
//!
//! The parser is deliberately forgiving: stray close tags are ignored,
//! unclosed elements are closed at end of input, and a `<` that cannot
//! open a tag is treated as literal text. The only fatal conditions are
//! an unterminated tag open and an unterminated quoted attribute, where
//! no sensible tree can be reconstructed.

use crate::dom::{NodeId, Tree};
use crate::error::ParseError;

/// Elements that never take children.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose contents are captured verbatim, without tag scanning.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Parses raw HTML into a document tree.
pub fn parse(raw: &str) -> Result<Tree, ParseError> {
    Parser { input: raw, pos: 0 }.run()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn run(mut self) -> Result<Tree, ParseError> {
        let mut tree = Tree::new();
        let mut open: Vec<NodeId> = vec![tree.root()];
        let mut text = String::new();

        while self.pos < self.input.len() {
            let rest = &self.input[self.pos..];
            let Some(lt) = rest.find('<') else {
                text.push_str(rest);
                self.pos = self.input.len();
                break;
            };
            text.push_str(&rest[..lt]);
            self.pos += lt;

            if self.starts_with("<!--") {
                self.skip_comment();
            } else if self.starts_with("</") {
                flush_text(&mut tree, &open, &mut text);
                self.close_tag(&tree, &mut open)?;
            } else if self.starts_with("<!") || self.starts_with("<?") {
                self.skip_declaration();
            } else if self.at_tag_start() {
                flush_text(&mut tree, &open, &mut text);
                self.open_tag(&mut tree, &mut open)?;
            } else {
                // A `<` that opens nothing is literal text.
                text.push('<');
                self.pos += 1;
            }
        }
        flush_text(&mut tree, &open, &mut text);
        Ok(tree)
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.input[self.pos..].starts_with(prefix)
    }

    fn at_tag_start(&self) -> bool {
        self.input
            .as_bytes()
            .get(self.pos + 1)
            .is_some_and(|b| b.is_ascii_alphabetic())
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn take_name(&mut self) -> String {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len()
            && (bytes[self.pos].is_ascii_alphanumeric() || bytes[self.pos] == b'-')
        {
            self.pos += 1;
        }
        self.input[start..self.pos].to_ascii_lowercase()
    }

    fn skip_comment(&mut self) {
        // Lenient: an unterminated comment swallows the rest of the input.
        match self.input[self.pos + 4..].find("-->") {
            Some(end) => self.pos += 4 + end + 3,
            None => self.pos = self.input.len(),
        }
    }

    fn skip_declaration(&mut self) {
        match self.input[self.pos..].find('>') {
            Some(end) => self.pos += end + 1,
            None => self.pos = self.input.len(),
        }
    }

    fn close_tag(&mut self, tree: &Tree, open: &mut Vec<NodeId>) -> Result<(), ParseError> {
        let offset = self.pos;
        self.pos += 2;
        let name = self.take_name();
        let Some(gt) = self.input[self.pos..].find('>') else {
            return Err(ParseError::UnterminatedTag { offset });
        };
        self.pos += gt + 1;
        if name.is_empty() {
            return Ok(());
        }
        // Pop to the nearest matching open element, implicitly closing
        // anything nested inside it. A closer with no match is ignored.
        if let Some(depth) = open
            .iter()
            .rposition(|&id| tree.tag(id) == Some(name.as_str()))
            && depth > 0
        {
            open.truncate(depth);
        }
        Ok(())
    }

    fn open_tag(&mut self, tree: &mut Tree, open: &mut Vec<NodeId>) -> Result<(), ParseError> {
        let offset = self.pos;
        self.pos += 1;
        let name = self.take_name();
        let element = tree.create_element(name.clone());

        let mut self_closing = false;
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ParseError::UnterminatedTag { offset }),
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') => {
                    self.pos += 1;
                    if self.peek() == Some(b'>') {
                        self.pos += 1;
                        self_closing = true;
                        break;
                    }
                }
                Some(_) => self.attribute(tree, element)?,
            }
        }

        let parent = open.last().copied().unwrap_or_else(|| tree.root());
        tree.append_child(parent, element);

        if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
            return Ok(());
        }
        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            self.raw_text(tree, element, &name);
            return Ok(());
        }
        open.push(element);
        Ok(())
    }

    fn attribute(&mut self, tree: &mut Tree, element: NodeId) -> Result<(), ParseError> {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        while self.pos < bytes.len() && !b"=/> \t\r\n".contains(&bytes[self.pos]) {
            self.pos += 1;
        }
        if self.pos == start {
            // Junk byte that cannot start a name; skip it to keep moving.
            self.pos += 1;
            return Ok(());
        }
        let name = self.input[start..self.pos].to_ascii_lowercase();
        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            tree.set_attr(element, name, "");
            return Ok(());
        }
        self.pos += 1;
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                let open_quote = self.pos;
                self.pos += 1;
                let Some(end) = self.input[self.pos..].find(quote as char) else {
                    return Err(ParseError::UnterminatedAttribute { offset: open_quote });
                };
                let value = &self.input[self.pos..self.pos + end];
                self.pos += end + 1;
                value
            }
            _ => {
                let start = self.pos;
                while self.pos < bytes.len() && !b"> \t\r\n".contains(&bytes[self.pos]) {
                    self.pos += 1;
                }
                &self.input[start..self.pos]
            }
        };
        let decoded = html_escape::decode_html_entities(value).into_owned();
        tree.set_attr(element, name, decoded);
        Ok(())
    }

    fn raw_text(&mut self, tree: &mut Tree, element: NodeId, name: &str) {
        let closer = format!("</{name}");
        let rest = &self.input[self.pos..];
        let end = find_ascii_ci(rest, &closer).unwrap_or(rest.len());
        if end > 0 {
            let content = tree.create_text(&rest[..end]);
            tree.append_child(element, content);
        }
        self.pos += end;
        if self.pos < self.input.len() {
            match self.input[self.pos..].find('>') {
                Some(gt) => self.pos += gt + 1,
                None => self.pos = self.input.len(),
            }
        }
    }
}

fn flush_text(tree: &mut Tree, open: &[NodeId], text: &mut String) {
    if text.is_empty() {
        return;
    }
    let parent = open.last().copied().unwrap_or_else(|| tree.root());
    let decoded = html_escape::decode_html_entities(text).into_owned();
    let node = tree.create_text(decoded);
    tree.append_child(parent, node);
    text.clear();
}

fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < n.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| {
        h[i..i + n.len()]
            .iter()
            .zip(n)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    })
}
