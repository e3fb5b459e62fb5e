//! XML layer: a pull reader and a push writer over quick-xml

mod namespace;
mod reader;
mod writer;

pub use namespace::*;
pub use reader::{XmlEvent, XmlReader};
pub use writer::XmlWriter;

/// Parse an OOXML boolean (`1`, `true`, `on`)
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "on")
}

/// Boolean attribute text as Excel writes it
pub fn bool_text(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Whether text needs `xml:space="preserve"` to survive a round trip
pub fn needs_space_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("false"));
    }

    #[test]
    fn test_needs_space_preserve() {
        assert!(needs_space_preserve(" lead"));
        assert!(needs_space_preserve("trail\n"));
        assert!(!needs_space_preserve("inner space"));
        assert!(!needs_space_preserve(""));
    }

    #[test]
    fn test_namespace_constants() {
        assert!(SML.contains("spreadsheetml"));
        assert!(R.contains("relationships"));
    }
}
