//! Stylesheet tables: fonts, fills, borders, alignments, protections, number
//! formats and the cell formats combining them

use crate::error::{Error, Result};
use crate::number::{format_number, parse_number};
use crate::shared::intern::InternTable;
use crate::shared::number_format::{builtin_code, builtin_id, NumberFormat, FIRST_CUSTOM_ID};
use crate::xml::{bool_text, XmlReader, XmlWriter};
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

// === Colors ===

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColorKind {
    Auto,
    /// ARGB hex, e.g. `FF1F497D`
    Rgb(String),
    Theme(u32),
    Indexed(u32),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub kind: ColorKind,
    pub tint: Option<OrderedFloat<f64>>,
}

impl Color {
    pub fn rgb(argb: impl Into<String>) -> Self {
        Self {
            kind: ColorKind::Rgb(argb.into()),
            tint: None,
        }
    }

    pub fn theme(index: u32) -> Self {
        Self {
            kind: ColorKind::Theme(index),
            tint: None,
        }
    }

    pub fn indexed(index: u32) -> Self {
        Self {
            kind: ColorKind::Indexed(index),
            tint: None,
        }
    }

    /// Read the color on the current element and consume it.
    pub fn read<R: BufRead>(xml: &mut XmlReader<R>) -> Result<Option<Self>> {
        let kind = if let Some(rgb) = xml.attribute("rgb") {
            Some(ColorKind::Rgb(rgb.to_string()))
        } else if let Some(theme) = xml.u32_attribute("theme")? {
            Some(ColorKind::Theme(theme))
        } else if let Some(indexed) = xml.u32_attribute("indexed")? {
            Some(ColorKind::Indexed(indexed))
        } else if xml.bool_attribute("auto", false) {
            Some(ColorKind::Auto)
        } else {
            None
        };
        let tint = match xml.attribute("tint") {
            Some(tint) => Some(OrderedFloat(parse_number(tint)?)),
            None => None,
        };
        xml.skip_element()?;

        Ok(kind.map(|kind| Color { kind, tint }))
    }

    pub fn write<W: Write>(&self, xml: &mut XmlWriter<W>, element: &str) -> Result<()> {
        xml.start_element(element)?;
        match &self.kind {
            ColorKind::Auto => xml.attribute("auto", "1")?,
            ColorKind::Rgb(rgb) => xml.attribute("rgb", rgb)?,
            ColorKind::Theme(theme) => xml.attribute("theme", &theme.to_string())?,
            ColorKind::Indexed(indexed) => xml.attribute("indexed", &indexed.to_string())?,
        }
        if let Some(tint) = self.tint {
            xml.attribute("tint", &format_number(tint.0)?)?;
        }
        xml.end_element(element)
    }
}

// === Fonts ===

/// Font record; also the formatting of a rich-text run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Font {
    pub name: Option<String>,
    /// Size in points
    pub size: Option<OrderedFloat<f64>>,
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    pub outline: bool,
    pub shadow: bool,
    /// Underline style (`single`, `double`, ...)
    pub underline: Option<String>,
    /// `superscript` or `subscript`
    pub vert_align: Option<String>,
    pub color: Option<Color>,
    pub family: Option<u32>,
    pub charset: Option<u32>,
    /// `minor` or `major`
    pub scheme: Option<String>,
}

/// Which schema a font is serialized under
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontElement {
    /// `<font>` in the stylesheet
    Stylesheet,
    /// `<rPr>` of a rich-text run
    Run,
}

impl Font {
    /// Calibri 11, the default body font of new workbooks
    pub fn standard() -> Self {
        Self {
            name: Some("Calibri".into()),
            size: Some(OrderedFloat(11.0)),
            color: Some(Color::theme(1)),
            family: Some(2),
            scheme: Some("minor".into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = Some(OrderedFloat(size));
        self
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Parse from reader (after the `<font>`/`<rPr>` start tag), consuming
    /// its end tag.
    pub fn read<R: BufRead>(xml: &mut XmlReader<R>) -> Result<Self> {
        let mut font = Font::default();

        while let Some(child) = xml.next_child()? {
            match child.as_str() {
                "b" => font.bold = xml.bool_attribute("val", true),
                "i" => font.italic = xml.bool_attribute("val", true),
                "strike" => font.strike = xml.bool_attribute("val", true),
                "outline" => font.outline = xml.bool_attribute("val", true),
                "shadow" => font.shadow = xml.bool_attribute("val", true),
                "u" => {
                    font.underline = Some(xml.attribute("val").unwrap_or("single").to_string())
                }
                "vertAlign" => font.vert_align = xml.attribute("val").map(String::from),
                "sz" => {
                    if let Some(size) = xml.attribute("val") {
                        font.size = Some(OrderedFloat(parse_number(size)?));
                    }
                }
                "color" => {
                    font.color = Color::read(xml)?;
                    continue;
                }
                "name" | "rFont" => font.name = xml.attribute("val").map(String::from),
                "family" => font.family = xml.u32_attribute("val")?,
                "charset" => font.charset = xml.u32_attribute("val")?,
                "scheme" => font.scheme = xml.attribute("val").map(String::from),
                _ => {}
            }
            xml.skip_element()?;
        }

        Ok(font)
    }

    /// Write as `<font>` or `<rPr>`, each in its schema's child order.
    pub fn write<W: Write>(&self, xml: &mut XmlWriter<W>, element: FontElement) -> Result<()> {
        match element {
            FontElement::Stylesheet => {
                xml.start_element("font")?;
                self.write_flags(xml)?;
                self.write_underline(xml)?;
                self.write_size_and_color(xml)?;
                if let Some(name) = &self.name {
                    xml.val_element("name", name)?;
                }
                self.write_family_charset(xml, false)?;
                if let Some(scheme) = &self.scheme {
                    xml.val_element("scheme", scheme)?;
                }
                xml.end_element("font")
            }
            FontElement::Run => {
                xml.start_element("rPr")?;
                if let Some(name) = &self.name {
                    xml.val_element("rFont", name)?;
                }
                self.write_family_charset(xml, true)?;
                self.write_flags(xml)?;
                if let Some(color) = &self.color {
                    color.write(xml, "color")?;
                }
                if let Some(size) = self.size {
                    xml.val_element("sz", &format_number(size.0)?)?;
                }
                self.write_underline(xml)?;
                if let Some(scheme) = &self.scheme {
                    xml.val_element("scheme", scheme)?;
                }
                xml.end_element("rPr")
            }
        }
    }

    fn write_flags<W: Write>(&self, xml: &mut XmlWriter<W>) -> Result<()> {
        for (set, name) in [
            (self.bold, "b"),
            (self.italic, "i"),
            (self.strike, "strike"),
            (self.outline, "outline"),
            (self.shadow, "shadow"),
        ] {
            if set {
                xml.start_element(name)?;
                xml.end_element(name)?;
            }
        }
        Ok(())
    }

    fn write_underline<W: Write>(&self, xml: &mut XmlWriter<W>) -> Result<()> {
        if let Some(underline) = &self.underline {
            xml.start_element("u")?;
            if underline != "single" {
                xml.attribute("val", underline)?;
            }
            xml.end_element("u")?;
        }
        if let Some(vert_align) = &self.vert_align {
            xml.val_element("vertAlign", vert_align)?;
        }
        Ok(())
    }

    fn write_size_and_color<W: Write>(&self, xml: &mut XmlWriter<W>) -> Result<()> {
        if let Some(size) = self.size {
            xml.val_element("sz", &format_number(size.0)?)?;
        }
        if let Some(color) = &self.color {
            color.write(xml, "color")?;
        }
        Ok(())
    }

    fn write_family_charset<W: Write>(&self, xml: &mut XmlWriter<W>, charset_first: bool) -> Result<()> {
        let family = self.family.map(|v| ("family", v));
        let charset = self.charset.map(|v| ("charset", v));
        let ordered = if charset_first {
            [charset, family]
        } else {
            [family, charset]
        };
        for (name, value) in ordered.into_iter().flatten() {
            xml.val_element(name, &value.to_string())?;
        }
        Ok(())
    }
}

// === Fills ===

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PatternFill {
    /// `none`, `solid`, `gray125`, ...
    pub pattern_type: Option<String>,
    pub fg_color: Option<Color>,
    pub bg_color: Option<Color>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GradientStop {
    pub position: OrderedFloat<f64>,
    pub color: Color,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct GradientFill {
    /// `linear` (default) or `path`
    pub gradient_type: Option<String>,
    pub degree: Option<OrderedFloat<f64>>,
    pub left: Option<OrderedFloat<f64>>,
    pub right: Option<OrderedFloat<f64>>,
    pub top: Option<OrderedFloat<f64>>,
    pub bottom: Option<OrderedFloat<f64>>,
    pub stops: Vec<GradientStop>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Fill {
    Pattern(PatternFill),
    Gradient(GradientFill),
}

impl Default for Fill {
    fn default() -> Self {
        Self::none()
    }
}

impl Fill {
    pub fn none() -> Self {
        Fill::Pattern(PatternFill {
            pattern_type: Some("none".into()),
            ..Default::default()
        })
    }

    /// The fill Excel expects at index 1
    pub fn gray125() -> Self {
        Fill::Pattern(PatternFill {
            pattern_type: Some("gray125".into()),
            ..Default::default()
        })
    }

    pub fn solid(color: Color) -> Self {
        Fill::Pattern(PatternFill {
            pattern_type: Some("solid".into()),
            fg_color: Some(color),
            bg_color: None,
        })
    }

    /// Parse from reader (after the `<fill>` start tag)
    pub fn read<R: BufRead>(xml: &mut XmlReader<R>) -> Result<Self> {
        let mut fill = Fill::Pattern(PatternFill::default());

        while let Some(child) = xml.next_child()? {
            match child.as_str() {
                "patternFill" => {
                    let mut pattern = PatternFill {
                        pattern_type: xml.attribute("patternType").map(String::from),
                        ..Default::default()
                    };
                    while let Some(color) = xml.next_child()? {
                        match color.as_str() {
                            "fgColor" => pattern.fg_color = Color::read(xml)?,
                            "bgColor" => pattern.bg_color = Color::read(xml)?,
                            _ => xml.skip_element()?,
                        }
                    }
                    fill = Fill::Pattern(pattern);
                }
                "gradientFill" => {
                    let mut gradient = GradientFill {
                        gradient_type: xml.attribute("type").map(String::from),
                        degree: real_attribute(xml, "degree")?,
                        left: real_attribute(xml, "left")?,
                        right: real_attribute(xml, "right")?,
                        top: real_attribute(xml, "top")?,
                        bottom: real_attribute(xml, "bottom")?,
                        stops: Vec::new(),
                    };
                    while let Some(stop) = xml.next_child()? {
                        if stop != "stop" {
                            xml.skip_element()?;
                            continue;
                        }
                        let position = real_attribute(xml, "position")?.unwrap_or_default();
                        let mut color = None;
                        while let Some(inner) = xml.next_child()? {
                            if inner == "color" {
                                color = Color::read(xml)?;
                            } else {
                                xml.skip_element()?;
                            }
                        }
                        if let Some(color) = color {
                            gradient.stops.push(GradientStop { position, color });
                        }
                    }
                    fill = Fill::Gradient(gradient);
                }
                _ => xml.skip_element()?,
            }
        }

        Ok(fill)
    }

    pub fn write<W: Write>(&self, xml: &mut XmlWriter<W>) -> Result<()> {
        xml.start_element("fill")?;
        match self {
            Fill::Pattern(pattern) => {
                xml.start_element("patternFill")?;
                if let Some(pattern_type) = &pattern.pattern_type {
                    xml.attribute("patternType", pattern_type)?;
                }
                if let Some(fg) = &pattern.fg_color {
                    fg.write(xml, "fgColor")?;
                }
                if let Some(bg) = &pattern.bg_color {
                    bg.write(xml, "bgColor")?;
                }
                xml.end_element("patternFill")?;
            }
            Fill::Gradient(gradient) => {
                xml.start_element("gradientFill")?;
                if let Some(gradient_type) = &gradient.gradient_type {
                    xml.attribute("type", gradient_type)?;
                }
                for (name, value) in [
                    ("degree", gradient.degree),
                    ("left", gradient.left),
                    ("right", gradient.right),
                    ("top", gradient.top),
                    ("bottom", gradient.bottom),
                ] {
                    if let Some(value) = value {
                        xml.attribute(name, &format_number(value.0)?)?;
                    }
                }
                for stop in &gradient.stops {
                    xml.start_element("stop")?;
                    xml.attribute("position", &format_number(stop.position.0)?)?;
                    stop.color.write(xml, "color")?;
                    xml.end_element("stop")?;
                }
                xml.end_element("gradientFill")?;
            }
        }
        xml.end_element("fill")
    }
}

fn real_attribute<R: BufRead>(
    xml: &XmlReader<R>,
    name: &str,
) -> Result<Option<OrderedFloat<f64>>> {
    match xml.attribute(name) {
        Some(value) => Ok(Some(OrderedFloat(parse_number(value)?))),
        None => Ok(None),
    }
}

// === Borders ===

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BorderSide {
    /// `thin`, `medium`, `dashed`, ...
    pub style: Option<String>,
    pub color: Option<Color>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Border {
    pub left: Option<BorderSide>,
    pub right: Option<BorderSide>,
    pub top: Option<BorderSide>,
    pub bottom: Option<BorderSide>,
    pub diagonal: Option<BorderSide>,
    pub diagonal_up: bool,
    pub diagonal_down: bool,
}

impl Border {
    /// Parse from reader (after the `<border>` start tag)
    pub fn read<R: BufRead>(xml: &mut XmlReader<R>) -> Result<Self> {
        let mut border = Border {
            diagonal_up: xml.bool_attribute("diagonalUp", false),
            diagonal_down: xml.bool_attribute("diagonalDown", false),
            ..Default::default()
        };

        while let Some(child) = xml.next_child()? {
            let slot = match child.as_str() {
                "left" | "start" => &mut border.left,
                "right" | "end" => &mut border.right,
                "top" => &mut border.top,
                "bottom" => &mut border.bottom,
                "diagonal" => &mut border.diagonal,
                _ => {
                    xml.skip_element()?;
                    continue;
                }
            };

            let mut side = BorderSide {
                style: xml.attribute("style").map(String::from),
                color: None,
            };
            while let Some(inner) = xml.next_child()? {
                if inner == "color" {
                    side.color = Color::read(xml)?;
                } else {
                    xml.skip_element()?;
                }
            }
            if side != BorderSide::default() {
                *slot = Some(side);
            }
        }

        Ok(border)
    }

    pub fn write<W: Write>(&self, xml: &mut XmlWriter<W>) -> Result<()> {
        xml.start_element("border")?;
        if self.diagonal_up {
            xml.attribute("diagonalUp", "1")?;
        }
        if self.diagonal_down {
            xml.attribute("diagonalDown", "1")?;
        }
        for (name, side) in [
            ("left", &self.left),
            ("right", &self.right),
            ("top", &self.top),
            ("bottom", &self.bottom),
            ("diagonal", &self.diagonal),
        ] {
            xml.start_element(name)?;
            if let Some(side) = side {
                if let Some(style) = &side.style {
                    xml.attribute("style", style)?;
                }
                if let Some(color) = &side.color {
                    color.write(xml, "color")?;
                }
            }
            xml.end_element(name)?;
        }
        xml.end_element("border")
    }
}

// === Alignment / protection ===

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Alignment {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: bool,
    pub shrink_to_fit: bool,
    pub indent: Option<u32>,
    pub text_rotation: Option<u32>,
}

impl Alignment {
    /// Read the current `<alignment>` element and consume it.
    pub fn read<R: BufRead>(xml: &mut XmlReader<R>) -> Result<Self> {
        let alignment = Alignment {
            horizontal: xml.attribute("horizontal").map(String::from),
            vertical: xml.attribute("vertical").map(String::from),
            wrap_text: xml.bool_attribute("wrapText", false),
            shrink_to_fit: xml.bool_attribute("shrinkToFit", false),
            indent: xml.u32_attribute("indent")?,
            text_rotation: xml.u32_attribute("textRotation")?,
        };
        xml.skip_element()?;
        Ok(alignment)
    }

    pub fn write<W: Write>(&self, xml: &mut XmlWriter<W>) -> Result<()> {
        xml.start_element("alignment")?;
        if let Some(horizontal) = &self.horizontal {
            xml.attribute("horizontal", horizontal)?;
        }
        if let Some(vertical) = &self.vertical {
            xml.attribute("vertical", vertical)?;
        }
        if let Some(rotation) = self.text_rotation {
            xml.attribute("textRotation", &rotation.to_string())?;
        }
        if self.wrap_text {
            xml.attribute("wrapText", "1")?;
        }
        if let Some(indent) = self.indent {
            xml.attribute("indent", &indent.to_string())?;
        }
        if self.shrink_to_fit {
            xml.attribute("shrinkToFit", "1")?;
        }
        xml.end_element("alignment")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Protection {
    pub locked: bool,
    pub hidden: bool,
}

impl Default for Protection {
    fn default() -> Self {
        Self {
            locked: true,
            hidden: false,
        }
    }
}

impl Protection {
    /// Read the current `<protection>` element and consume it.
    pub fn read<R: BufRead>(xml: &mut XmlReader<R>) -> Result<Self> {
        let protection = Protection {
            locked: xml.bool_attribute("locked", true),
            hidden: xml.bool_attribute("hidden", false),
        };
        xml.skip_element()?;
        Ok(protection)
    }

    pub fn write<W: Write>(&self, xml: &mut XmlWriter<W>) -> Result<()> {
        xml.start_element("protection")?;
        xml.attribute("locked", bool_text(self.locked))?;
        xml.attribute("hidden", bool_text(self.hidden))?;
        xml.end_element("protection")
    }
}

// === Cell formats ===

/// The `applyX` flags of a cell format; `None` when the attribute is absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ApplyFlags {
    pub number_format: Option<bool>,
    pub font: Option<bool>,
    pub fill: Option<bool>,
    pub border: Option<bool>,
    pub alignment: Option<bool>,
    pub protection: Option<bool>,
}

/// A `<xf>` record: indices into the component tables.
///
/// Two records are equal when their indices are, not when the components they
/// point at happen to be.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CellFormat {
    pub number_format_id: u32,
    pub font_id: u32,
    pub fill_id: u32,
    pub border_id: u32,
    pub alignment_id: Option<u32>,
    pub protection_id: Option<u32>,
    pub apply: ApplyFlags,
}

/// A cell format with every component resolved to its value
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Format {
    pub number_format: NumberFormat,
    pub font: Font,
    pub fill: Fill,
    pub border: Border,
    pub alignment: Option<Alignment>,
    pub protection: Option<Protection>,
    pub apply: ApplyFlags,
}

impl Default for Format {
    fn default() -> Self {
        Self {
            number_format: NumberFormat::general(),
            font: Font::standard(),
            fill: Fill::none(),
            border: Border::default(),
            alignment: None,
            protection: None,
            apply: ApplyFlags::default(),
        }
    }
}

impl Format {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a number format code, picking the built-in id when one matches.
    pub fn with_number_format(mut self, code: &str) -> Self {
        let id = builtin_id(code).unwrap_or(FIRST_CUSTOM_ID);
        self.number_format = NumberFormat::new(id, code);
        self.apply.number_format = Some(true);
        self
    }

    pub fn with_font(mut self, font: Font) -> Self {
        self.font = font;
        self.apply.font = Some(true);
        self
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = fill;
        self.apply.fill = Some(true);
        self
    }

    pub fn with_border(mut self, border: Border) -> Self {
        self.border = border;
        self.apply.border = Some(true);
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self.apply.alignment = Some(true);
        self
    }

    pub fn with_protection(mut self, protection: Protection) -> Self {
        self.protection = Some(protection);
        self.apply.protection = Some(true);
        self
    }

    pub fn is_date(&self) -> bool {
        self.number_format.is_date()
    }
}

/// The styles part held in memory
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stylesheet {
    /// Formats that need a `<numFmt>`: customs (id >= 164) and built-in ids
    /// whose code is not in the built-in table
    pub number_formats: BTreeMap<u32, String>,
    pub fonts: InternTable<Font>,
    pub fills: InternTable<Fill>,
    pub borders: InternTable<Border>,
    pub alignments: InternTable<Alignment>,
    pub protections: InternTable<Protection>,
    pub cell_formats: InternTable<CellFormat>,
}

impl Stylesheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tables a new workbook starts with: the standard font, the two
    /// mandatory fills, an empty border and the default cell format.
    pub fn with_defaults() -> Self {
        let mut stylesheet = Self::new();
        stylesheet.fills.intern(Fill::none());
        stylesheet.fills.intern(Fill::gray125());
        stylesheet.add_format(&Format::default());
        stylesheet
    }

    /// Number format stored under `id`
    pub fn number_format(&self, id: u32) -> Result<NumberFormat> {
        if let Some(code) = self.number_formats.get(&id) {
            return Ok(NumberFormat::new(id, code.clone()));
        }
        builtin_code(id)
            .map(|code| NumberFormat::new(id, code))
            .ok_or_else(|| Error::KeyNotFound(format!("number format {}", id)))
    }

    /// Id for a number format, registering it when needed.
    ///
    /// Built-in ids are kept. Custom codes are deduplicated by text and get
    /// the next free id from 164 on.
    pub fn add_number_format(&mut self, format: &NumberFormat) -> u32 {
        if format.id < FIRST_CUSTOM_ID {
            if builtin_code(format.id) != Some(format.code.as_str()) {
                self.number_formats.insert(format.id, format.code.clone());
            }
            return format.id;
        }

        if let Some(id) = builtin_id(&format.code) {
            return id;
        }
        if let Some((&id, _)) = self
            .number_formats
            .iter()
            .find(|&(&id, code)| id >= FIRST_CUSTOM_ID && *code == format.code)
        {
            return id;
        }

        let id = self
            .number_formats
            .keys()
            .next_back()
            .map_or(FIRST_CUSTOM_ID, |last| (*last + 1).max(FIRST_CUSTOM_ID));
        self.number_formats.insert(id, format.code.clone());
        id
    }

    /// Intern every component of `format`, then the cell format itself.
    pub fn add_format(&mut self, format: &Format) -> u32 {
        let record = CellFormat {
            number_format_id: self.add_number_format(&format.number_format),
            font_id: self.fonts.intern(format.font.clone()),
            fill_id: self.fills.intern(format.fill.clone()),
            border_id: self.borders.intern(format.border.clone()),
            alignment_id: format
                .alignment
                .as_ref()
                .map(|a| self.alignments.intern(a.clone())),
            protection_id: format
                .protection
                .as_ref()
                .map(|p| self.protections.intern(p.clone())),
            apply: format.apply,
        };
        self.cell_formats.intern(record)
    }

    /// Resolve the cell format at `index`.
    pub fn format(&self, index: u32) -> Result<Format> {
        let record = self
            .cell_formats
            .get(index)
            .ok_or_else(|| Error::InvalidReference(format!("cell format {}", index)))?;

        Ok(Format {
            number_format: self
                .number_format(record.number_format_id)
                .unwrap_or_default(),
            font: lookup(&self.fonts, record.font_id, "font")?,
            fill: lookup(&self.fills, record.fill_id, "fill")?,
            border: lookup(&self.borders, record.border_id, "border")?,
            alignment: record
                .alignment_id
                .map(|i| lookup(&self.alignments, i, "alignment"))
                .transpose()?,
            protection: record
                .protection_id
                .map(|i| lookup(&self.protections, i, "protection"))
                .transpose()?,
            apply: record.apply,
        })
    }

    /// Check that every cell format points inside its component tables.
    pub fn validate(&self) -> Result<()> {
        for i in 0..self.cell_formats.len() as u32 {
            self.format(i)?;
        }
        Ok(())
    }
}

fn lookup<T: Clone + Eq + std::hash::Hash>(table: &InternTable<T>, index: u32, what: &str) -> Result<T> {
    table
        .get(index)
        .cloned()
        .ok_or_else(|| Error::InvalidReference(format!("{} {} out of range", what, index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_to_string(write: impl FnOnce(&mut XmlWriter<Vec<u8>>) -> Result<()>) -> String {
        let mut xml = XmlWriter::new(Vec::new());
        write(&mut xml).unwrap();
        String::from_utf8(xml.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_font_roundtrip_both_schemas() {
        let font = Font::standard().with_bold(true).with_size(10.5);

        let xml = write_to_string(|w| font.write(w, FontElement::Stylesheet));
        assert!(xml.starts_with("<font><b/><sz val=\"10.5\"/>"));
        let mut reader = XmlReader::from_str(&xml);
        reader.expect_start("font").unwrap();
        assert_eq!(Font::read(&mut reader).unwrap(), font);

        let xml = write_to_string(|w| font.write(w, FontElement::Run));
        assert!(xml.starts_with("<rPr><rFont val=\"Calibri\"/>"));
        let mut reader = XmlReader::from_str(&xml);
        reader.expect_start("rPr").unwrap();
        assert_eq!(Font::read(&mut reader).unwrap(), font);
    }

    #[test]
    fn test_font_bool_val_zero() {
        let mut reader = XmlReader::from_str(r#"<font><b val="0"/><i/><u/></font>"#);
        reader.expect_start("font").unwrap();
        let font = Font::read(&mut reader).unwrap();
        assert!(!font.bold);
        assert!(font.italic);
        assert_eq!(font.underline.as_deref(), Some("single"));
    }

    #[test]
    fn test_fill_and_border_roundtrip() {
        let fill = Fill::solid(Color::rgb("FFFF0000"));
        let xml = write_to_string(|w| fill.write(w));
        let mut reader = XmlReader::from_str(&xml);
        reader.expect_start("fill").unwrap();
        assert_eq!(Fill::read(&mut reader).unwrap(), fill);

        let border = Border {
            bottom: Some(BorderSide {
                style: Some("thin".into()),
                color: Some(Color {
                    kind: ColorKind::Theme(4),
                    tint: Some(OrderedFloat(-0.25)),
                }),
            }),
            ..Default::default()
        };
        let xml = write_to_string(|w| border.write(w));
        let mut reader = XmlReader::from_str(&xml);
        reader.expect_start("border").unwrap();
        assert_eq!(Border::read(&mut reader).unwrap(), border);
    }

    #[test]
    fn test_formats_compare_by_component_index() {
        let mut stylesheet = Stylesheet::with_defaults();
        let bold = Format::new().with_font(Font::standard().with_bold(true));

        let a = stylesheet.add_format(&bold);
        let b = stylesheet.add_format(&bold.clone());
        assert_eq!(a, b);
        assert_eq!(stylesheet.fonts.len(), 2);

        let italic = Format::new().with_font(Font::standard().with_italic(true));
        assert_ne!(stylesheet.add_format(&italic), a);
        assert_eq!(stylesheet.format(a).unwrap(), bold);
    }

    #[test]
    fn test_custom_number_formats_start_at_164() {
        let mut stylesheet = Stylesheet::new();
        let date = NumberFormat::new(200, "yyyy-mm-dd");
        let time = NumberFormat::new(300, "hh:mm");

        assert_eq!(stylesheet.add_number_format(&date), 164);
        assert_eq!(stylesheet.add_number_format(&time), 165);
        assert_eq!(stylesheet.add_number_format(&date), 164);
        assert_eq!(stylesheet.add_number_format(&NumberFormat::new(170, "0.00")), 2);
        assert_eq!(stylesheet.number_format(165).unwrap().code, "hh:mm");
    }

    #[test]
    fn test_format_out_of_range_is_invalid_reference() {
        let mut stylesheet = Stylesheet::with_defaults();
        stylesheet.cell_formats.push(CellFormat {
            font_id: 7,
            ..Default::default()
        });
        assert!(matches!(stylesheet.format(1), Err(Error::InvalidReference(_))));
        assert!(matches!(stylesheet.format(9), Err(Error::InvalidReference(_))));
        assert!(stylesheet.validate().is_err());
    }
}
