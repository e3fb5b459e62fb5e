//! Pull-style XML reader with an explicit element stack

use crate::error::{Error, Result};
use log::trace;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;

/// Events surfaced to part readers.
///
/// Element names are local names; namespace prefixes are dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlEvent {
    Start(String),
    End(String),
    Characters(String),
    Eof,
}

/// Pull parser over one part.
///
/// Tracks the open elements so that nesting errors are reported as
/// [`Error::MalformedXml`] and unknown subtrees can be skipped wholesale.
pub struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    stack: Vec<String>,
    /// Attributes of the most recent start tag as (qualified name, value)
    attributes: Vec<(String, String)>,
}

impl<'a> XmlReader<&'a [u8]> {
    /// Read from an in-memory string
    pub fn from_str(xml: &'a str) -> Self {
        Self::from_reader(xml.as_bytes())
    }
}

impl<R: BufRead> XmlReader<R> {
    pub fn from_reader(inner: R) -> Self {
        let mut reader = Reader::from_reader(inner);
        let config = reader.config_mut();
        // `<a/>` arrives as Start + End
        config.expand_empty_elements = true;
        config.check_end_names = false;
        config.trim_text(false);

        Self {
            reader,
            buf: Vec::new(),
            stack: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Number of currently open elements
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Local name of the innermost open element
    pub fn current_element(&self) -> Option<&str> {
        self.stack.last().map(|s| s.as_str())
    }

    /// Advance to the next event.
    pub fn next_event(&mut self) -> Result<XmlEvent> {
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => {
                    let name = local_name(&e);
                    self.attributes = collect_attributes(&e)?;
                    self.stack.push(name.clone());
                    return Ok(XmlEvent::Start(name));
                }
                Event::End(e) => {
                    let qualified = e.name();
                    let name = String::from_utf8_lossy(qualified.local_name().as_ref()).into_owned();
                    return match self.stack.pop() {
                        Some(open) if open == name => Ok(XmlEvent::End(name)),
                        Some(open) => Err(Error::MalformedXml(format!(
                            "expected </{}>, found </{}>",
                            open, name
                        ))),
                        None => Err(Error::MalformedXml(format!(
                            "unexpected closing tag </{}>",
                            name
                        ))),
                    };
                }
                Event::Text(t) => {
                    return Ok(XmlEvent::Characters(t.unescape()?.into_owned()));
                }
                Event::CData(c) => {
                    return Ok(XmlEvent::Characters(String::from_utf8_lossy(&c).into_owned()));
                }
                Event::Eof => {
                    if let Some(open) = self.stack.last() {
                        return Err(Error::MalformedXml(format!(
                            "unexpected end of document inside <{}>",
                            open
                        )));
                    }
                    return Ok(XmlEvent::Eof);
                }
                _ => {}
            }
        }
    }

    /// Attribute of the most recent start tag, matched by qualified or local name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .or_else(|| {
                self.attributes.iter().find(|(key, _)| {
                    !key.starts_with("xmlns")
                        && key.rsplit_once(':').map(|(_, local)| local) == Some(name)
                })
            })
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Like [`attribute`](Self::attribute), failing with `MissingAttribute`.
    pub fn required_attribute(&self, name: &str) -> Result<&str> {
        self.attribute(name).ok_or_else(|| Error::MissingAttribute {
            element: self.current_element().unwrap_or("").to_string(),
            attr: name.to_string(),
        })
    }

    /// Boolean attribute (`1`/`true`/`on`); `default` when absent.
    pub fn bool_attribute(&self, name: &str, default: bool) -> bool {
        match self.attribute(name) {
            Some(value) => super::parse_bool(value),
            None => default,
        }
    }

    /// Integer attribute; `None` when absent, an error when unparsable.
    pub fn u32_attribute(&self, name: &str) -> Result<Option<u32>> {
        match self.attribute(name) {
            Some(value) => value.trim().parse().map(Some).map_err(|_| {
                Error::MalformedXml(format!(
                    "attribute '{}' on <{}> is not an integer: '{}'",
                    name,
                    self.current_element().unwrap_or(""),
                    value
                ))
            }),
            None => Ok(None),
        }
    }

    /// Skip to the opening tag of the document element and check its name.
    pub fn expect_start(&mut self, name: &str) -> Result<()> {
        loop {
            match self.next_event()? {
                XmlEvent::Characters(_) => continue,
                XmlEvent::Start(found) if found == name => return Ok(()),
                XmlEvent::Start(found) => {
                    return Err(Error::MalformedXml(format!(
                        "expected <{}>, found <{}>",
                        name, found
                    )))
                }
                XmlEvent::End(found) => {
                    return Err(Error::MalformedXml(format!(
                        "expected <{}>, found </{}>",
                        name, found
                    )))
                }
                XmlEvent::Eof => {
                    return Err(Error::MalformedXml(format!(
                        "expected <{}>, found end of document",
                        name
                    )))
                }
            }
        }
    }

    /// Next child element of the innermost open element.
    ///
    /// Returns `None` once the parent's closing tag has been consumed. Text
    /// between children is ignored. Callers must consume each returned child
    /// completely (nested `next_child` loop, [`read_text`](Self::read_text) or
    /// [`skip_element`](Self::skip_element)).
    pub fn next_child(&mut self) -> Result<Option<String>> {
        loop {
            match self.next_event()? {
                XmlEvent::Start(name) => return Ok(Some(name)),
                XmlEvent::End(_) | XmlEvent::Eof => return Ok(None),
                XmlEvent::Characters(_) => continue,
            }
        }
    }

    /// Text content of the innermost open element, consuming its closing tag.
    ///
    /// Nested elements are skipped.
    pub fn read_text(&mut self) -> Result<String> {
        let depth = self.stack.len();
        let mut text = String::new();

        loop {
            match self.next_event()? {
                XmlEvent::Characters(t) => text.push_str(&t),
                XmlEvent::Start(_) => self.skip_element()?,
                XmlEvent::End(_) if self.stack.len() < depth => break,
                XmlEvent::End(_) => {}
                XmlEvent::Eof => break,
            }
        }

        Ok(text)
    }

    /// Consume the innermost open element and everything inside it.
    pub fn skip_element(&mut self) -> Result<()> {
        let depth = self.stack.len();
        if depth == 0 {
            return Ok(());
        }
        if let Some(name) = self.current_element() {
            trace!("skipping <{}>", name);
        }

        loop {
            match self.next_event()? {
                XmlEvent::End(_) if self.stack.len() < depth => break,
                XmlEvent::Eof => break,
                _ => {}
            }
        }

        Ok(())
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned()
}

fn collect_attributes(e: &BytesStart) -> Result<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(attributes)
}
