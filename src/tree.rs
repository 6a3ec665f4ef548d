// Tree document model: ordered, attributed nodes and their markup encoding

use crate::error::{DocumentError, DocumentResult};
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

/// Default indent unit for canonical output
pub const DEFAULT_INDENT: &str = "    ";

/// One named node: attributes, optional text and ordered children.
///
/// Leaf nodes carry text and container nodes carry children. This is not
/// enforced; the canonical encoding drops the text of container nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attributes<K, V, I>(mut self, attributes: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in attributes {
            self.attributes.insert(k.into(), v.into());
        }
        self
    }

    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut Node> + 'a {
        self.children.iter_mut().filter(move |c| c.name == name)
    }

}

/// Parse a markup document into its root node.
pub fn parse(source: &str) -> DocumentResult<Node> {
    let mut reader = Reader::from_str(source);
    reader.trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let pos = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(start_node(&e, pos)?),
            Ok(Event::Empty(e)) => {
                let node = start_node(&e, pos)?;
                attach(&mut stack, &mut root, node, pos)?;
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| malformed(pos, "closing tag without an open element"))?;
                attach(&mut stack, &mut root, node, pos)?;
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| malformed(pos, e))?;
                push_text(&mut stack, &text, pos)?;
            }
            Ok(Event::CData(c)) => {
                let raw = c.into_inner();
                push_text(&mut stack, &String::from_utf8_lossy(&raw), pos)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(reader.buffer_position(), e)),
            // declaration, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(
            reader.buffer_position(),
            format!("element <{}> is never closed", open.name),
        ));
    }
    root.ok_or_else(|| malformed(0, "document has no root element"))
}

fn malformed(pos: usize, message: impl ToString) -> DocumentError {
    DocumentError::Malformed {
        pos,
        message: message.to_string(),
    }
}

fn start_node(e: &BytesStart, pos: usize) -> DocumentResult<Node> {
    let mut node = Node::new(String::from_utf8_lossy(e.name().as_ref()));
    for attr in e.attributes() {
        let attr = attr.map_err(|err| malformed(pos, err))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|err| malformed(pos, err))?;
        node.attributes.insert(key, value.into_owned());
    }
    Ok(node)
}

fn attach(
    stack: &mut [Node],
    root: &mut Option<Node>,
    node: Node,
    pos: usize,
) -> DocumentResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else if root.is_some() {
        return Err(malformed(pos, "more than one root element"));
    } else {
        *root = Some(node);
    }
    Ok(())
}

fn push_text(stack: &mut [Node], text: &str, pos: usize) -> DocumentResult<()> {
    match stack.last_mut() {
        Some(top) => {
            top.text.get_or_insert_with(String::new).push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(malformed(pos, "text outside the root element")),
    }
}

/// Normalize a tree in place: leaf text is trimmed (and dropped when empty),
/// container text is dropped since indentation replaces it.
pub fn canonicalize(node: &mut Node) {
    if node.children.is_empty() {
        node.text = node
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);
    } else {
        node.text = None;
        for child in &mut node.children {
            canonicalize(child);
        }
    }
}

/// Encode a tree with one `indent` per nesting level.
///
/// The indent unit is its first character repeated to its length, so
/// `"    "` and `"\t"` both work. Output depends only on the canonical form
/// of the tree, so serializing an unchanged tree twice gives identical bytes.
pub fn serialize(node: &Node, indent: &str) -> DocumentResult<String> {
    let indent_char = indent.bytes().next().unwrap_or(b' ');
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), indent_char, indent.len());

    let decl = BytesStart::from_content("xml version='1.0' encoding='utf-8'", 3);
    writer
        .write_event(Event::Decl(BytesDecl::from_start(decl)))
        .map_err(encode_error)?;
    write_node(&mut writer, node)?;

    let mut out = String::from_utf8(writer.into_inner().into_inner()).map_err(encode_error)?;
    out.push('\n');
    Ok(out)
}

fn write_node<W: Write>(writer: &mut Writer<W>, node: &Node) -> DocumentResult<()> {
    let mut start = BytesStart::new(node.name.as_str());
    for (k, v) in &node.attributes {
        start.push_attribute((k.as_str(), v.as_str()));
    }

    if !node.children.is_empty() {
        writer.write_event(Event::Start(start)).map_err(encode_error)?;
        for child in &node.children {
            write_node(writer, child)?;
        }
        return writer
            .write_event(Event::End(BytesEnd::new(node.name.as_str())))
            .map_err(encode_error);
    }

    match node.text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => {
            writer.write_event(Event::Start(start)).map_err(encode_error)?;
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(encode_error)?;
            writer
                .write_event(Event::End(BytesEnd::new(node.name.as_str())))
                .map_err(encode_error)
        }
        _ => writer.write_event(Event::Empty(start)).map_err(encode_error),
    }
}

fn encode_error(e: impl ToString) -> DocumentError {
    DocumentError::Encode {
        message: e.to_string(),
    }
}

/// Read and parse a document file.
pub fn read(path: &Path) -> DocumentResult<Node> {
    let source = fs::read_to_string(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&source)
}

/// Canonicalize the tree, then persist its encoding to `path`.
pub fn write(node: &mut Node, path: &Path, indent: &str) -> DocumentResult<()> {
    canonicalize(node);
    fs::write(path, serialize(node, indent)?).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })
}
