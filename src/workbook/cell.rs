//! Cell values

use crate::workbook::RichText;

/// The value held by a cell
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    /// No value (a cell may still carry a format)
    #[default]
    Empty,
    Number(f64),
    Bool(bool),
    Text(RichText),
    /// Error literal such as `#DIV/0!`
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&RichText> {
        match self {
            CellValue::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Plain text of a text value
    pub fn to_plain_string(&self) -> Option<String> {
        self.as_text().map(|t| t.plain_text())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(RichText::plain(s))
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(RichText::plain(s))
    }
}

impl From<RichText> for CellValue {
    fn from(t: RichText) -> Self {
        CellValue::Text(t)
    }
}

/// A cell: value, format and formula
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    /// Index into the workbook stylesheet's cell formats
    pub format: Option<u32>,
    /// Formula text without the leading `=`
    pub formula: Option<String>,
}

impl Cell {
    pub fn new(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: u32) -> Self {
        self.format = Some(format);
        self
    }

    /// Attach a formula. A cached text result keeps only its plain text,
    /// since `t="str"` values carry no runs.
    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        if let CellValue::Text(text) = &self.value {
            if text.runs().len() != 1 || !text.is_plain() {
                self.value = CellValue::Text(RichText::plain(text.plain_text()));
            }
        }
        self.formula = Some(formula.into());
        self
    }

    pub fn has_value(&self) -> bool {
        !self.value.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Font;

    #[test]
    fn test_formula_text_result_is_plain() {
        let rich = RichText::new()
            .with_run("bold", Some(Font::standard().with_bold(true)))
            .with_run(" tail", None);
        let cell = Cell::new(rich).with_formula("A1&B1");
        assert_eq!(cell.value, CellValue::Text(RichText::plain("bold tail")));
        assert_eq!(cell.formula.as_deref(), Some("A1&B1"));

        let cell = Cell::new(2.5).with_formula("1+1.5");
        assert_eq!(cell.value, CellValue::Number(2.5));
    }
}
