//! XML reading and writing for [`Document`].
//!
//! The reader keeps everything needed for a lossless round trip: the
//! declaration, attribute order, whitespace text, comments and CDATA.
//! Element nodes remember the byte range they were read from.

use std::io::Cursor;
use std::path::Path;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use smol_str::SmolStr;

use super::{Document, DocumentError, NodeData, NodeId, XmlDecl, XmlOptions};
use crate::base::{LineIndex, TextRange, TextSize};

// ============================================================================
// READER
// ============================================================================

impl Document {
    /// Parse a document from XML text.
    pub fn parse(text: &str, options: &XmlOptions) -> Result<Self, DocumentError> {
        let mut doc = Document::new();
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<NodeId> = Vec::new();

        loop {
            let start = TextSize::from(reader.buffer_position() as u32);
            let event = reader.read_event().map_err(|e| {
                DocumentError::xml(format!(
                    "Parse error at position {}: {e}",
                    reader.error_position()
                ))
            })?;
            let end = TextSize::from(reader.buffer_position() as u32);
            let range = Some(TextRange::new(start, end.max(start)));

            match event {
                Event::Decl(ref decl) => {
                    doc.set_declaration(Some(read_decl(decl)?));
                }
                Event::Start(ref e) => {
                    let data = element_data(e)?;
                    let id = push(&mut doc, &stack, data, range);
                    stack.push(id);
                }
                Event::Empty(ref e) => {
                    let data = element_data(e)?;
                    push(&mut doc, &stack, data, range);
                }
                Event::End(_) => {
                    if let Some(id) = stack.pop() {
                        doc.set_range_end(id, end);
                    }
                }
                Event::Text(ref e) => {
                    let text = e
                        .unescape()
                        .map_err(|e| DocumentError::xml(format!("Text error: {e}")))?;
                    let blank = text.trim().is_empty();
                    // Whitespace around the root is not part of the tree.
                    if stack.is_empty() || (blank && !options.keep_whitespace) {
                        continue;
                    }
                    push(&mut doc, &stack, NodeData::Text(text.into_owned()), range);
                }
                Event::CData(ref e) => {
                    let text = utf8(e)?;
                    push(&mut doc, &stack, NodeData::CData(text), range);
                }
                Event::Comment(ref e) => {
                    if options.keep_comments {
                        let text = utf8(e)?;
                        push(&mut doc, &stack, NodeData::Comment(text), range);
                    }
                }
                Event::PI(ref e) => {
                    let text = utf8(e)?;
                    push(&mut doc, &stack, NodeData::ProcessingInstruction(text), range);
                }
                Event::DocType(ref e) => {
                    let text = utf8(e)?;
                    push(&mut doc, &stack, NodeData::DocType(text), range);
                }
                Event::Eof => break,
            }
        }

        if !stack.is_empty() {
            return Err(DocumentError::xml("Unexpected end of input: unclosed element"));
        }
        if doc.root().is_none() {
            return Err(DocumentError::MissingRoot);
        }
        doc.set_line_index(LineIndex::new(text));
        Ok(doc)
    }

    /// Parse a document from bytes, which must be UTF-8.
    pub fn from_bytes(input: &[u8], options: &XmlOptions) -> Result<Self, DocumentError> {
        let text = std::str::from_utf8(input).map_err(|e| DocumentError::utf8(e.to_string()))?;
        Self::parse(text, options)
    }

    /// Read and parse a document from disk.
    pub fn from_file(path: &Path, options: &XmlOptions) -> Result<Self, DocumentError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, options)
    }
}

fn push(doc: &mut Document, stack: &[NodeId], data: NodeData, range: Option<TextRange>) -> NodeId {
    match stack.last() {
        Some(parent) => doc.push_child(*parent, data, range),
        None => doc.push_top(data, range),
    }
}

fn utf8(bytes: &[u8]) -> Result<String, DocumentError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| DocumentError::utf8(e.to_string()))
}

fn element_data(e: &BytesStart<'_>) -> Result<NodeData, DocumentError> {
    let tag = std::str::from_utf8(e.name().as_ref())
        .map_err(|e| DocumentError::xml(format!("Element name error: {e}")))?
        .to_string();
    let mut data = NodeData::element(tag);
    if let NodeData::Element { attributes, .. } = &mut data {
        for attr_result in e.attributes() {
            let attr =
                attr_result.map_err(|e| DocumentError::xml(format!("Attribute error: {e}")))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| DocumentError::xml(format!("Attribute key error: {e}")))?;
            let value = attr
                .unescape_value()
                .map_err(|e| DocumentError::xml(format!("Attribute value error: {e}")))?
                .to_string();
            attributes.insert(SmolStr::new(key), value);
        }
    }
    Ok(data)
}

fn read_decl(decl: &BytesDecl<'_>) -> Result<XmlDecl, DocumentError> {
    let field = |bytes: &[u8]| -> Result<SmolStr, DocumentError> {
        std::str::from_utf8(bytes)
            .map(SmolStr::new)
            .map_err(|e| DocumentError::utf8(e.to_string()))
    };
    let version = decl
        .version()
        .map_err(|e| DocumentError::xml(format!("Declaration error: {e}")))?;
    let encoding = match decl.encoding() {
        Some(Ok(encoding)) => Some(field(encoding.as_ref())?),
        Some(Err(e)) => return Err(DocumentError::xml(format!("Declaration error: {e}"))),
        None => None,
    };
    let standalone = match decl.standalone() {
        Some(Ok(standalone)) => Some(field(standalone.as_ref())?),
        Some(Err(e)) => return Err(DocumentError::xml(format!("Declaration error: {e}"))),
        None => None,
    };
    Ok(XmlDecl {
        version: field(version.as_ref())?,
        encoding,
        standalone,
    })
}

// ============================================================================
// WRITER
// ============================================================================

impl Document {
    /// Serialize the document.
    pub fn to_xml(&self, options: &XmlOptions) -> Result<String, DocumentError> {
        let mut buffer = Cursor::new(Vec::new());
        let mut writer = match options.indent {
            Some(indent) => Writer::new_with_indent(&mut buffer, b' ', indent),
            None => Writer::new(&mut buffer),
        };

        if let Some(decl) = self.declaration() {
            writer
                .write_event(Event::Decl(BytesDecl::new(
                    &decl.version,
                    decl.encoding.as_deref(),
                    decl.standalone.as_deref(),
                )))
                .map_err(|e| DocumentError::xml(format!("Write error: {e}")))?;
            line_break(&mut writer, options)?;
        }

        for id in self.top_level() {
            self.write_node(&mut writer, *id, options)?;
            line_break(&mut writer, options)?;
        }

        let mut output = buffer.into_inner();
        if options.indent.is_some() {
            output.push(b'\n');
        }
        String::from_utf8(output).map_err(|e| DocumentError::utf8(e.to_string()))
    }

    /// Serialize one node and its subtree.
    pub fn node_to_xml(&self, id: NodeId, options: &XmlOptions) -> Result<String, DocumentError> {
        let mut buffer = Cursor::new(Vec::new());
        let mut writer = match options.indent {
            Some(indent) => Writer::new_with_indent(&mut buffer, b' ', indent),
            None => Writer::new(&mut buffer),
        };
        self.write_node(&mut writer, id, options)?;
        String::from_utf8(buffer.into_inner()).map_err(|e| DocumentError::utf8(e.to_string()))
    }

    fn write_node<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        id: NodeId,
        options: &XmlOptions,
    ) -> Result<(), DocumentError> {
        let node = self.node(id)?;
        let event = match node.data() {
            NodeData::Element { tag, attributes } => {
                let mut start = BytesStart::new(tag.as_str());
                for (key, value) in attributes {
                    start.push_attribute((key.as_str(), value.as_str()));
                }
                let children: Vec<NodeId> = node
                    .children()
                    .iter()
                    .copied()
                    .filter(|c| !self.skip_on_write(*c, options))
                    .collect();
                if children.is_empty() {
                    Event::Empty(start)
                } else {
                    write(writer, Event::Start(start))?;
                    for child in children {
                        self.write_node(writer, child, options)?;
                    }
                    Event::End(BytesEnd::new(tag.as_str()))
                }
            }
            NodeData::Text(text) => {
                if self.skip_on_write(id, options) {
                    return Ok(());
                }
                Event::Text(BytesText::new(text))
            }
            NodeData::Comment(text) => Event::Comment(BytesText::from_escaped(text.as_str())),
            NodeData::CData(text) => Event::CData(BytesCData::new(text.as_str())),
            NodeData::ProcessingInstruction(text) => Event::PI(BytesPI::new(text.as_str())),
            NodeData::DocType(text) => Event::DocType(BytesText::from_escaped(text.as_str())),
        };
        write(writer, event)
    }

    fn skip_on_write(&self, id: NodeId, options: &XmlOptions) -> bool {
        options.indent.is_some() && self.node(id).map(|n| n.data().is_blank()).unwrap_or(false)
    }
}

fn write<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), DocumentError> {
    writer
        .write_event(event)
        .map_err(|e| DocumentError::xml(format!("Write error: {e}")))
}

fn line_break<W: std::io::Write>(
    writer: &mut Writer<W>,
    options: &XmlOptions,
) -> Result<(), DocumentError> {
    if options.indent.is_some() {
        return Ok(());
    }
    write(writer, Event::Text(BytesText::from_escaped("\n")))
}
