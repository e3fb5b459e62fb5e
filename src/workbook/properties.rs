//! Document properties (`docProps/*.xml`)

/// Core properties (`docProps/core.xml`). Dates are W3CDTF text as stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub keywords: Option<String>,
    pub description: Option<String>,
    pub last_modified_by: Option<String>,
    pub category: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
}

impl CoreProperties {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Extended (application) properties (`docProps/app.xml`)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtendedProperties {
    pub application: Option<String>,
    pub app_version: Option<String>,
    pub company: Option<String>,
    pub manager: Option<String>,
}

impl ExtendedProperties {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Value of a custom property
#[derive(Clone, Debug, PartialEq)]
pub enum CustomValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

/// A user-defined property (`docProps/custom.xml`)
#[derive(Clone, Debug, PartialEq)]
pub struct CustomProperty {
    pub name: String,
    pub value: CustomValue,
}

impl CustomProperty {
    pub fn new(name: impl Into<String>, value: CustomValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A workbook-level or sheet-scoped defined name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DefinedName {
    pub name: String,
    /// Formula text, e.g. `Sheet1!$A$1:$B$4`
    pub value: String,
    /// Index of the sheet the name is local to
    pub local_sheet: Option<u32>,
    pub hidden: bool,
}
