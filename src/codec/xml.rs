//! Minimal XML building and tree parsing on top of quick-xml.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{EppError, Result};

/// Append-only XML writer producing a UTF-8 document.
///
/// Write failures are latched and reported once by [`XmlWriter::finish`].
pub(crate) struct XmlWriter {
    writer: Writer<Vec<u8>>,
    open: Vec<String>,
    failed: Option<String>,
}

impl XmlWriter {
    pub fn new() -> Self {
        let mut w = Self {
            writer: Writer::new(Vec::new()),
            open: Vec::new(),
            failed: None,
        };
        w.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))));
        w
    }

    fn write(&mut self, event: Event<'_>) {
        if self.failed.is_some() {
            return;
        }
        if let Err(e) = self.writer.write_event(event) {
            self.failed = Some(e.to_string());
        }
    }

    fn start<'a>(tag: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
        BytesStart::new(tag).with_attributes(attrs.iter().copied())
    }

    /// Open an element; must be matched by [`XmlWriter::close`].
    pub fn open(&mut self, tag: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.write(Event::Start(Self::start(tag, attrs)));
        self.open.push(tag.to_string());
        self
    }

    /// Close the innermost open element.
    pub fn close(&mut self) -> &mut Self {
        if let Some(tag) = self.open.pop() {
            self.write(Event::End(BytesEnd::new(tag)));
        }
        self
    }

    /// Self-closing element.
    pub fn empty(&mut self, tag: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.write(Event::Empty(Self::start(tag, attrs)));
        self
    }

    /// Element with text content.
    pub fn leaf(&mut self, tag: &str, text: &str) -> &mut Self {
        self.leaf_with(tag, &[], text)
    }

    /// Element with attributes and text content.
    pub fn leaf_with(&mut self, tag: &str, attrs: &[(&str, &str)], text: &str) -> &mut Self {
        self.write(Event::Start(Self::start(tag, attrs)));
        self.write(Event::Text(BytesText::new(text)));
        self.write(Event::End(BytesEnd::new(tag)));
        self
    }

    /// Element only when a value is present.
    pub fn leaf_opt(&mut self, tag: &str, text: Option<&str>) -> &mut Self {
        if let Some(text) = text {
            self.leaf(tag, text);
        }
        self
    }

    /// Close everything still open and return the document.
    pub fn finish(mut self) -> Result<String> {
        while !self.open.is_empty() {
            self.close();
        }
        if let Some(reason) = self.failed {
            return Err(EppError::Codec(format!("cannot write document: {reason}")));
        }
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| EppError::Codec(format!("document is not UTF-8: {e}")))
    }
}

/// Parsed element: local name, attributes, text and children.
///
/// Namespace prefixes are dropped; lookups are by local name relative to a
/// known parent, which is unambiguous for EPP documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Node {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    text: String,
    pub children: Vec<Node>,
}

impl Node {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| EppError::Codec(format!("bad attribute: {e}")))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            attrs,
            ..Default::default()
        })
    }

    /// Trimmed text content.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Attribute value by local name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First child with the given local name.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follow a chain of child names.
    pub fn path(&self, names: &[&str]) -> Option<&Node> {
        names.iter().try_fold(self, |node, name| node.child(name))
    }

    /// Non-empty text of the first child with the given name.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .map(Node::text)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    /// First descendant (depth-first) with the given local name.
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.children
            .iter()
            .find_map(|c| if c.name == name { Some(c) } else { c.find(name) })
    }
}

/// Parse a document and return its root element.
pub(crate) fn parse(xml: &str) -> Result<Node> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Node> = vec![Node::default()];

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Node::from_start(&start)?),
            Event::Empty(start) => {
                let node = Node::from_start(&start)?;
                attach(&mut stack, node)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| EppError::Codec("unbalanced end tag".to_string()))?;
                attach(&mut stack, node)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(EppError::Codec("unterminated element".to_string()));
    }
    stack
        .pop()
        .and_then(|doc| doc.children.into_iter().next())
        .ok_or_else(|| EppError::Codec("empty document".to_string()))
}

fn attach(stack: &mut [Node], node: Node) -> Result<()> {
    stack
        .last_mut()
        .map(|parent| parent.children.push(node))
        .ok_or_else(|| EppError::Codec("element outside document".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_escapes_and_closes() {
        let mut w = XmlWriter::new();
        w.open("a", &[("x", "1&2")]).leaf("b", "<hi>").empty("c", &[]);
        let xml = w.finish().unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#));
        assert!(xml.ends_with(r#"<a x="1&amp;2"><b>&lt;hi&gt;</b><c/></a>"#));
    }

    #[test]
    fn test_parse_strips_prefixes() {
        let root = parse(
            r#"<?xml version="1.0"?>
            <epp xmlns="urn:x"><d:info xmlns:d="urn:d"><d:name> a.it </d:name><d:status s="ok"/></d:info></epp>"#,
        )
        .unwrap();
        assert_eq!(root.name, "epp");
        let info = root.child("info").unwrap();
        assert_eq!(info.child_text("name").as_deref(), Some("a.it"));
        assert_eq!(info.child("status").unwrap().attr("s"), Some("ok"));
        assert!(root.find("status").is_some());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("<epp><unclosed></epp>").is_err());
        assert!(parse("").is_err());
    }
}
