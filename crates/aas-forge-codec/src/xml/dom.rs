//! Minimal namespace-stripped element tree built from quick-xml events.

use crate::error::CodecError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// An XML element with its local name, attributes, text and children.
#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    /// Local name, prefix stripped
    pub name: String,
    /// Attributes with their raw (prefixed) keys
    pub attrs: Vec<(String, String)>,
    /// Concatenated text content
    pub text: String,
    /// Child elements in document order
    pub children: Vec<Node>,
}

impl Node {
    /// First child with the given local name.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed, non-empty text of this element.
    pub fn text(&self) -> Option<String> {
        let text = self.text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Trimmed, non-empty text of the first child with the given name.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).and_then(Node::text)
    }

    /// Untrimmed text of a leaf element. `None` when the element is empty
    /// or has children, whose text is only layout whitespace.
    pub fn raw_text(&self) -> Option<String> {
        (self.children.is_empty() && !self.text.is_empty()).then(|| self.text.clone())
    }

    /// Untrimmed text of the first child with the given name.
    pub fn child_raw_text(&self, name: &str) -> Option<String> {
        self.child(name).and_then(Node::raw_text)
    }

    /// Attribute value by local or prefixed key.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key || k.rsplit(':').next() == Some(key))
            .map(|(_, v)| v.as_str())
    }

    /// First descendant (depth-first, pre-order) matching the predicate.
    pub fn find_descendant<F>(&self, predicate: &F) -> Option<&Node>
    where
        F: Fn(&Node) -> bool,
    {
        for child in &self.children {
            if predicate(child) {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(predicate) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with the given local name, in document order.
    pub fn descendants_named<'a>(&'a self, name: &str, out: &mut Vec<&'a Node>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.descendants_named(name, out);
        }
    }
}

/// Parse a document into its root element.
pub(crate) fn parse(input: &[u8]) -> Result<Node, CodecError> {
    // Text is kept verbatim; accessors decide whether to trim.
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => stack.push(start_node(e)?),
            Ok(Event::Empty(ref e)) => {
                let node = start_node(e)?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| CodecError::xml("unbalanced end tag"))?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| CodecError::xml(format!("text decode error: {e}")))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CodecError::xml(format!(
                    "XML parse error at position {}: {e}",
                    reader.error_position()
                )));
            }
            Ok(_) => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(CodecError::xml("unexpected end of document"));
    }
    root.ok_or_else(|| CodecError::Missing("root element".to_string()))
}

fn start_node(e: &BytesStart<'_>) -> Result<Node, CodecError> {
    let name = std::str::from_utf8(e.local_name().as_ref())
        .map_err(|e| CodecError::xml(format!("invalid tag name: {e}")))?
        .to_string();

    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| CodecError::xml(format!("attribute error: {e}")))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| CodecError::xml(format!("attribute key error: {e}")))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| CodecError::xml(format!("attribute value error: {e}")))?
            .to_string();
        attrs.push((key, value));
    }

    Ok(Node {
        name,
        attrs,
        ..Node::default()
    })
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<(), CodecError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        Ok(())
    } else if root.is_none() {
        *root = Some(node);
        Ok(())
    } else {
        Err(CodecError::xml("multiple root elements"))
    }
}
