//! Rich text: a string made of formatted runs

use crate::error::Result;
use crate::shared::{Font, FontElement};
use crate::xml::{needs_space_preserve, XmlReader, XmlWriter};
use std::fmt;
use std::io::{BufRead, Write};

/// One run of uniformly formatted text
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RichTextRun {
    pub text: String,
    /// Run formatting; `None` inherits the cell's font
    pub font: Option<Font>,
}

/// Text as stored in a shared string, inline string or comment.
///
/// Equality is structural and order sensitive: the same runs in a different
/// order are a different value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RichText {
    runs: Vec<RichTextRun>,
}

impl RichText {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single unformatted run
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            runs: vec![RichTextRun {
                text: text.into(),
                font: None,
            }],
        }
    }

    pub fn add_run(&mut self, text: impl Into<String>, font: Option<Font>) {
        self.runs.push(RichTextRun {
            text: text.into(),
            font,
        });
    }

    pub fn with_run(mut self, text: impl Into<String>, font: Option<Font>) -> Self {
        self.add_run(text, font);
        self
    }

    pub fn runs(&self) -> &[RichTextRun] {
        &self.runs
    }

    /// True when no run carries formatting
    pub fn is_plain(&self) -> bool {
        self.runs.iter().all(|run| run.font.is_none())
    }

    /// Concatenated text of all runs
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// Parse from reader (after the `<si>`/`<is>`/`<text>` start tag).
    ///
    /// Phonetic runs are dropped.
    pub fn read<R: BufRead>(xml: &mut XmlReader<R>) -> Result<Self> {
        let mut text = RichText::new();
        let mut plain: Option<String> = None;

        while let Some(child) = xml.next_child()? {
            match child.as_str() {
                "t" => {
                    let t = xml.read_text()?;
                    plain.get_or_insert_with(String::new).push_str(&t);
                }
                "r" => {
                    let mut run = RichTextRun::default();
                    while let Some(inner) = xml.next_child()? {
                        match inner.as_str() {
                            "rPr" => run.font = Some(Font::read(xml)?),
                            "t" => run.text.push_str(&xml.read_text()?),
                            _ => xml.skip_element()?,
                        }
                    }
                    text.runs.push(run);
                }
                _ => xml.skip_element()?,
            }
        }

        if let Some(plain) = plain {
            if text.runs.is_empty() {
                return Ok(RichText::plain(plain));
            }
            text.runs.insert(0, RichTextRun { text: plain, font: None });
        }
        if text.runs.is_empty() {
            return Ok(RichText::plain(""));
        }
        Ok(text)
    }

    /// Write the runs inside an already opened container element.
    pub fn write<W: Write>(&self, xml: &mut XmlWriter<W>) -> Result<()> {
        if self.runs.len() == 1 && self.is_plain() {
            return write_t(xml, &self.runs[0].text);
        }

        for run in &self.runs {
            xml.start_element("r")?;
            if let Some(font) = &run.font {
                font.write(xml, FontElement::Run)?;
            }
            write_t(xml, &run.text)?;
            xml.end_element("r")?;
        }
        Ok(())
    }
}

fn write_t<W: Write>(xml: &mut XmlWriter<W>, text: &str) -> Result<()> {
    xml.start_element("t")?;
    if needs_space_preserve(text) {
        xml.attribute("xml:space", "preserve")?;
    }
    xml.characters(text)?;
    xml.end_element("t")
}

impl fmt::Display for RichText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for run in &self.runs {
            f.write_str(&run.text)?;
        }
        Ok(())
    }
}

impl From<&str> for RichText {
    fn from(s: &str) -> Self {
        RichText::plain(s)
    }
}

impl From<String> for RichText {
    fn from(s: String) -> Self {
        RichText::plain(s)
    }
}
