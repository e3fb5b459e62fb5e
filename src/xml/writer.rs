//! Push-style XML serializer

use crate::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

/// Streaming serializer: start-element / attribute / characters / end-element.
///
/// A start tag stays open until its first child or text arrives, so attributes
/// can be added after `start_element`. Elements closed without content are
/// written self-closing. Nothing is buffered beyond the current start tag.
pub struct XmlWriter<W: Write> {
    writer: Writer<W>,
    pending: Option<BytesStart<'static>>,
    stack: Vec<String>,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new(inner),
            pending: None,
            stack: Vec::new(),
        }
    }

    /// Write the `<?xml ...?>` declaration
    pub fn start_document(&mut self) -> Result<()> {
        self.writer.write_event(Event::Decl(BytesDecl::new(
            "1.0",
            Some("UTF-8"),
            Some("yes"),
        )))?;
        Ok(())
    }

    pub fn start_element(&mut self, name: &str) -> Result<()> {
        self.flush_pending()?;
        self.pending = Some(BytesStart::new(name.to_string()));
        self.stack.push(name.to_string());
        Ok(())
    }

    /// Add an attribute to the element opened by the last `start_element`.
    pub fn attribute(&mut self, name: &str, value: &str) -> Result<()> {
        match self.pending.as_mut() {
            Some(start) => {
                start.push_attribute((name, value));
                Ok(())
            }
            None => Err(Error::MalformedXml(format!(
                "attribute '{}' written outside a start tag",
                name
            ))),
        }
    }

    /// Declare a namespace on the open start tag; `None` declares the default.
    pub fn namespace_decl(&mut self, prefix: Option<&str>, uri: &str) -> Result<()> {
        match prefix {
            Some(prefix) => self.attribute(&format!("xmlns:{}", prefix), uri),
            None => self.attribute("xmlns", uri),
        }
    }

    pub fn characters(&mut self, text: &str) -> Result<()> {
        self.flush_pending()?;
        if !text.is_empty() {
            self.writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        Ok(())
    }

    pub fn end_element(&mut self, name: &str) -> Result<()> {
        match self.stack.pop() {
            Some(open) if open == name => {}
            Some(open) => {
                return Err(Error::MalformedXml(format!(
                    "closing </{}> while <{}> is open",
                    name, open
                )))
            }
            None => {
                return Err(Error::MalformedXml(format!(
                    "closing </{}> with no open element",
                    name
                )))
            }
        }

        match self.pending.take() {
            Some(start) => self.writer.write_event(Event::Empty(start))?,
            None => self
                .writer
                .write_event(Event::End(BytesEnd::new(name.to_string())))?,
        }
        Ok(())
    }

    /// `<name>text</name>`
    pub fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start_element(name)?;
        self.characters(text)?;
        self.end_element(name)
    }

    /// `<name val="value"/>`, the common OOXML leaf shape
    pub fn val_element(&mut self, name: &str, value: &str) -> Result<()> {
        self.start_element(name)?;
        self.attribute("val", value)?;
        self.end_element(name)
    }

    /// Finish the document and return the sink.
    pub fn into_inner(mut self) -> Result<W> {
        if let Some(open) = self.stack.last() {
            return Err(Error::MalformedXml(format!("<{}> was never closed", open)));
        }
        self.flush_pending()?;
        Ok(self.writer.into_inner())
    }

    fn flush_pending(&mut self) -> Result<()> {
        if let Some(start) = self.pending.take() {
            self.writer.write_event(Event::Start(start))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finish(writer: XmlWriter<Vec<u8>>) -> String {
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_nested_elements() {
        let mut w = XmlWriter::new(Vec::new());
        w.start_element("root").unwrap();
        w.namespace_decl(None, "urn:a").unwrap();
        w.namespace_decl(Some("r"), "urn:r").unwrap();
        w.start_element("empty").unwrap();
        w.attribute("v", "1 < 2").unwrap();
        w.end_element("empty").unwrap();
        w.text_element("t", "a & b").unwrap();
        w.end_element("root").unwrap();

        assert_eq!(
            finish(w),
            r#"<root xmlns="urn:a" xmlns:r="urn:r"><empty v="1 &lt; 2"/><t>a &amp; b</t></root>"#
        );
    }

    #[test]
    fn test_attribute_after_content_fails() {
        let mut w = XmlWriter::new(Vec::new());
        w.start_element("root").unwrap();
        w.characters("x").unwrap();
        assert!(matches!(w.attribute("a", "b"), Err(Error::MalformedXml(_))));
    }

    #[test]
    fn test_mismatched_end_fails() {
        let mut w = XmlWriter::new(Vec::new());
        w.start_element("a").unwrap();
        w.start_element("b").unwrap();
        assert!(matches!(w.end_element("a"), Err(Error::MalformedXml(_))));
    }

    #[test]
    fn test_unclosed_document_fails() {
        let mut w = XmlWriter::new(Vec::new());
        w.start_element("a").unwrap();
        assert!(w.into_inner().is_err());
    }
}
