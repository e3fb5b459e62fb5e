//! Number formats: the built-in table and date detection

/// First id available to custom formats
pub const FIRST_CUSTOM_ID: u32 = 164;

/// Formats every spreadsheet application knows by id without a `<numFmt>`
const BUILTIN: &[(u32, &str)] = &[
    (0, "General"),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (12, "# ?/?"),
    (13, "# ??/??"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (18, "h:mm AM/PM"),
    (19, "h:mm:ss AM/PM"),
    (20, "h:mm"),
    (21, "h:mm:ss"),
    (22, "m/d/yy h:mm"),
    (37, "#,##0 ;(#,##0)"),
    (38, "#,##0 ;[Red](#,##0)"),
    (39, "#,##0.00;(#,##0.00)"),
    (40, "#,##0.00;[Red](#,##0.00)"),
    (45, "mm:ss"),
    (46, "[h]:mm:ss"),
    (47, "mmss.0"),
    (48, "##0.0E+0"),
    (49, "@"),
];

/// A number format code and the id it is stored under.
///
/// Equality looks at the code only: custom ids are renumbered on every save.
#[derive(Clone, Debug)]
pub struct NumberFormat {
    pub id: u32,
    pub code: String,
}

impl PartialEq for NumberFormat {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for NumberFormat {}

impl std::hash::Hash for NumberFormat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::general()
    }
}

impl NumberFormat {
    pub fn new(id: u32, code: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
        }
    }

    pub fn general() -> Self {
        Self::new(0, "General")
    }

    /// Built-in format by id
    pub fn builtin(id: u32) -> Option<Self> {
        builtin_code(id).map(|code| Self::new(id, code))
    }

    pub fn is_builtin(&self) -> bool {
        self.id < FIRST_CUSTOM_ID && builtin_code(self.id) == Some(self.code.as_str())
    }

    pub fn is_date(&self) -> bool {
        is_date_format(&self.code)
    }
}

pub fn builtin_code(id: u32) -> Option<&'static str> {
    BUILTIN
        .iter()
        .find(|(builtin, _)| *builtin == id)
        .map(|(_, code)| *code)
}

pub fn builtin_id(code: &str) -> Option<u32> {
    BUILTIN
        .iter()
        .find(|(_, builtin)| *builtin == code)
        .map(|(id, _)| *id)
}

/// Whether a format code renders its value as a date or time.
///
/// Quoted literals, escaped characters and bracketed sections other than
/// elapsed-time tokens (`[h]`, `[mm]`, `[ss]`) are ignored.
pub fn is_date_format(code: &str) -> bool {
    if code.eq_ignore_ascii_case("general") {
        return false;
    }

    let mut chars = code.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for quoted in chars.by_ref() {
                    if quoted == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let mut section = String::new();
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                    section.push(inner);
                }
                let section = section.to_ascii_lowercase();
                if !section.is_empty() && section.chars().all(|c| matches!(c, 'h' | 'm' | 's')) {
                    return true;
                }
            }
            // only the first section decides
            ';' => return false,
            'd' | 'D' | 'm' | 'M' | 'y' | 'Y' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }
    false
}
