//! Byte-span tree of a markup document.
//!
//! The tree records where every element, text run and piece of markup sits in
//! the source text. Nothing is normalized: the parser decides what is a table
//! and the writer copies everything else back from these spans.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::common::error::{Error, Result};
use crate::common::xml::unescape_xml;

const MAX_DEPTH: usize = 1000;

/// Half-open byte range into the document source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Attribute {
    pub qname: String,
    pub local: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub qname: String,
    pub local: String,
    pub attributes: Vec<Attribute>,
    pub parent: Option<usize>,
    /// Start tag, or the whole element when it is empty (`<a/>`)
    pub open: Span,
    /// End tag; `None` for empty elements
    pub close: Option<Span>,
    pub children: Vec<Node>,
}

impl Element {
    #[inline]
    pub fn span(&self) -> Span {
        Span::new(self.open.start, self.close.map_or(self.open.end, |c| c.end))
    }

    /// Attribute lookup by local name, ignoring any prefix.
    pub fn attribute(&self, local: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.local == local)
    }

    #[inline]
    pub fn is_empty_element(&self) -> bool {
        self.close.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Node {
    Element(usize),
    /// Character data, including entity references
    Text(Span),
    CData(Span),
    /// Comments, processing instructions, declarations
    Markup(Span),
}

#[derive(Debug, Clone)]
pub(crate) struct SpanTree {
    pub elements: Vec<Element>,
    pub top: Vec<Node>,
    pub root: usize,
}

impl SpanTree {
    /// Build the span tree of `source`, starting at byte `offset`.
    ///
    /// `offset` lets a leading byte order mark stay outside the tokenizer while
    /// spans keep pointing into the full source.
    pub fn build(source: &str, offset: usize) -> Result<Self> {
        let text = &source[offset..];
        let mut reader = Reader::from_str(text);
        let mut buf = Vec::with_capacity(1024);

        let mut elements: Vec<Element> = Vec::new();
        let mut top: Vec<Node> = Vec::new();
        let mut stack: Vec<usize> = Vec::new();
        let mut root = None;

        loop {
            let start = reader.buffer_position() as usize + offset;
            let event = match reader.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(e) => {
                    let position = reader.buffer_position();
                    return Err(Error::MalformedDocument(format!(
                        "XML parsing error at position {}: {}",
                        position, e
                    )));
                },
            };
            let end = reader.buffer_position() as usize + offset;
            let span = Span::new(start, end);

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    if stack.is_empty() && root.is_some() {
                        return Err(Error::MalformedDocument(format!(
                            "second root element at position {}",
                            start
                        )));
                    }
                    if stack.len() >= MAX_DEPTH {
                        return Err(Error::MalformedDocument(format!(
                            "Maximum XML depth {} exceeded",
                            MAX_DEPTH
                        )));
                    }
                    let idx = elements.len();
                    elements.push(read_element(e, stack.last().copied(), span)?);
                    attach(&mut elements, &mut top, &stack, Node::Element(idx));
                    if stack.is_empty() {
                        root = Some(idx);
                    }
                    if !is_empty {
                        stack.push(idx);
                    }
                },
                Event::End(_) => {
                    let Some(idx) = stack.pop() else {
                        return Err(Error::MalformedDocument(format!(
                            "unexpected end tag at position {}",
                            start
                        )));
                    };
                    elements[idx].close = Some(span);
                },
                Event::CData(_) => {
                    attach(&mut elements, &mut top, &stack, Node::CData(span));
                },
                Event::Eof => break,
                _ => {
                    // Text and entity references are character data; the rest is markup
                    let node = if text.as_bytes().get(start - offset) == Some(&b'<') {
                        Node::Markup(span)
                    } else {
                        if stack.is_empty() && !span.slice(source).trim().is_empty() {
                            return Err(Error::MalformedDocument(format!(
                                "text outside the root element at position {}",
                                start
                            )));
                        }
                        Node::Text(span)
                    };
                    attach(&mut elements, &mut top, &stack, node);
                },
            }
            buf.clear();
        }

        if let Some(&open) = stack.last() {
            return Err(Error::MalformedDocument(format!(
                "unclosed element <{}>",
                elements[open].qname
            )));
        }
        let Some(root) = root else {
            return Err(Error::MalformedDocument("no root element".to_string()));
        };

        Ok(Self {
            elements,
            top,
            root,
        })
    }

    #[inline]
    pub fn element(&self, idx: usize) -> &Element {
        &self.elements[idx]
    }

    /// Indices of the element children of `idx`, in document order.
    pub fn element_children(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.elements[idx].children.iter().filter_map(|node| match node {
            Node::Element(child) => Some(*child),
            _ => None,
        })
    }

    /// Decoded character data of `idx` and all of its descendants.
    pub fn text_content(&self, source: &str, idx: usize) -> String {
        let mut out = String::new();
        self.collect_text(source, idx, &mut out);
        out
    }

    fn collect_text(&self, source: &str, idx: usize, out: &mut String) {
        for node in &self.elements[idx].children {
            match node {
                Node::Text(span) => out.push_str(&unescape_xml(span.slice(source))),
                Node::CData(span) => {
                    let raw = span.slice(source);
                    let inner = raw
                        .strip_prefix("<![CDATA[")
                        .and_then(|s| s.strip_suffix("]]>"))
                        .unwrap_or(raw);
                    out.push_str(inner);
                },
                Node::Element(child) => self.collect_text(source, *child, out),
                Node::Markup(_) => {},
            }
        }
    }
}

fn attach(elements: &mut [Element], top: &mut Vec<Node>, stack: &[usize], node: Node) {
    match stack.last() {
        Some(&parent) => elements[parent].children.push(node),
        None => top.push(node),
    }
}

fn read_element(e: &BytesStart, parent: Option<usize>, open: Span) -> Result<Element> {
    let qname = std::str::from_utf8(e.name().as_ref())?.to_string();
    let local = std::str::from_utf8(e.local_name().as_ref())?.to_string();

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| {
            Error::MalformedDocument(format!("bad attribute in <{}>: {}", qname, err))
        })?;
        attributes.push(Attribute {
            qname: std::str::from_utf8(attr.key.as_ref())?.to_string(),
            local: std::str::from_utf8(attr.key.local_name().as_ref())?.to_string(),
            value: unescape_xml(std::str::from_utf8(&attr.value)?),
        });
    }

    Ok(Element {
        qname,
        local,
        attributes,
        parent,
        open,
        close: None,
        children: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_cover_source() {
        let src = r#"<?xml version="1.0"?><a x="1"><b>t&amp;u</b><c/></a>"#;
        let tree = SpanTree::build(src, 0).unwrap();
        let root = tree.element(tree.root);
        assert_eq!(root.local, "a");
        assert_eq!(root.span().slice(src), r#"<a x="1"><b>t&amp;u</b><c/></a>"#);
        assert_eq!(root.attribute("x").unwrap().value, "1");

        let kids: Vec<_> = tree.element_children(tree.root).collect();
        assert_eq!(kids.len(), 2);
        assert_eq!(tree.element(kids[0]).span().slice(src), "<b>t&amp;u</b>");
        assert!(tree.element(kids[1]).is_empty_element());
        assert_eq!(tree.text_content(src, kids[0]), "t&u");
    }

    #[test]
    fn test_prefixed_attribute_lookup() {
        let src = r#"<ss:Worksheet xmlns:ss="urn:x" ss:Name="survey"/>"#;
        let tree = SpanTree::build(src, 0).unwrap();
        let root = tree.element(tree.root);
        assert_eq!(root.local, "Worksheet");
        let name = root.attribute("Name").unwrap();
        assert_eq!(name.qname, "ss:Name");
        assert_eq!(name.value, "survey");
    }

    #[test]
    fn test_malformed_inputs() {
        for src in ["<a><b></a>", "<a>", "", "   ", "<a/><b/>", "<a></a>junk"] {
            let err = SpanTree::build(src, 0).unwrap_err();
            assert!(
                matches!(err, Error::MalformedDocument(_)),
                "{src:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_offset_skips_prefix() {
        let src = "\u{feff}<a>x</a>";
        let tree = SpanTree::build(src, 3).unwrap();
        assert_eq!(tree.element(tree.root).span(), Span::new(3, src.len()));
    }
}
