//! Part path handling for OPC packages

use std::fmt;

/// A separator-normalized location inside a package.
///
/// Paths are plain strings: nothing here touches the filesystem. Backslashes are
/// rewritten to `/` on construction so that `xl\workbook.xml` and `xl/workbook.xml`
/// compare equal. Package parts are keyed without a leading `/`
/// (e.g. `xl/worksheets/sheet1.xml`); the package root itself is `/`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartPath {
    path: String,
}

impl PartPath {
    /// Create a new path, normalizing separators.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.contains('\\') {
            path.replace('\\', "/")
        } else {
            path
        };
        Self { path }
    }

    /// The package root (`/`), used as the source of package-level relationships.
    pub fn root() -> Self {
        Self { path: "/".into() }
    }

    /// Get the path as a string slice
    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// True for `/...` and for drive-letter prefixes such as `C:/...`.
    pub fn is_absolute(&self) -> bool {
        self.path.starts_with('/') || self.drive_prefix_len() > 0
    }

    /// True for `/`, `C:` and `C:/`.
    pub fn is_root(&self) -> bool {
        if self.path == "/" {
            return true;
        }
        let drive = self.drive_prefix_len();
        drive > 0 && (self.path.len() == drive || &self.path[drive..] == "/")
    }

    fn drive_prefix_len(&self) -> usize {
        let bytes = self.path.as_bytes();
        if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
            2
        } else {
            0
        }
    }

    /// Path components, ignoring empty segments.
    pub fn split(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Final component, or an empty string for the root.
    pub fn filename(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
    }

    /// Extension of the final component (text after its last dot).
    pub fn extension(&self) -> &str {
        self.split_extension().1
    }

    /// Split the final component on its last dot: `("sheet1", "xml")`.
    pub fn split_extension(&self) -> (&str, &str) {
        let name = self.filename();
        match name.rfind('.') {
            Some(pos) => (&name[..pos], &name[pos + 1..]),
            None => (name, ""),
        }
    }

    /// Parent directory. The root is its own parent; a bare file name has an
    /// empty parent.
    pub fn parent(&self) -> PartPath {
        if self.is_root() {
            return self.clone();
        }
        let trimmed = self.path.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(0) => PartPath::root(),
            Some(pos) => PartPath {
                path: trimmed[..pos].to_string(),
            },
            None => PartPath::default(),
        }
    }

    /// Append a component, inserting exactly one separator unless this path
    /// already ends with one. Repeated separators are not collapsed.
    pub fn append(&self, component: impl AsRef<str>) -> PartPath {
        let component = component.as_ref().replace('\\', "/");
        if self.path.is_empty() {
            return PartPath { path: component };
        }
        if self.path.ends_with('/') {
            return PartPath {
                path: format!("{}{}", self.path, component),
            };
        }
        PartPath {
            path: format!("{}/{}", self.path, component),
        }
    }

    /// Strip the longest common prefix of components shared with `base`.
    ///
    /// Relative paths are returned unchanged.
    pub fn relative_to(&self, base: &PartPath) -> PartPath {
        if !self.is_absolute() {
            return self.clone();
        }

        let ours = self.split();
        let theirs = base.split();
        let common = ours
            .iter()
            .zip(theirs.iter())
            .take_while(|(a, b)| a == b)
            .count();

        PartPath {
            path: ours[common..].join("/"),
        }
    }

    /// The relationships part belonging to this part.
    ///
    /// `xl/workbook.xml` maps to `xl/_rels/workbook.xml.rels`, the root maps to
    /// `_rels/.rels`.
    pub fn relationships_path(&self) -> PartPath {
        if self.is_root() || self.path.is_empty() {
            return PartPath::new("_rels/.rels");
        }
        let parent = self.parent();
        let rels_dir = if parent.is_empty() || parent.is_root() {
            PartPath::new("_rels")
        } else {
            parent.append("_rels")
        };
        rels_dir.append(format!("{}.rels", self.filename()))
    }

    /// Check if this path points to a relationships part
    pub fn is_relationships(&self) -> bool {
        self.extension() == "rels" && self.parent().filename() == "_rels"
    }
}

impl fmt::Display for PartPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl From<&str> for PartPath {
    fn from(s: &str) -> Self {
        PartPath::new(s)
    }
}

impl From<String> for PartPath {
    fn from(s: String) -> Self {
        PartPath::new(s)
    }
}

/// Well-known part paths
pub mod well_known {
    use super::PartPath;

    pub fn content_types() -> PartPath {
        PartPath::new("[Content_Types].xml")
    }

    pub fn package_rels() -> PartPath {
        PartPath::new("_rels/.rels")
    }

    pub fn workbook() -> PartPath {
        PartPath::new("xl/workbook.xml")
    }

    pub fn styles() -> PartPath {
        PartPath::new("xl/styles.xml")
    }

    pub fn shared_strings() -> PartPath {
        PartPath::new("xl/sharedStrings.xml")
    }

    pub fn theme() -> PartPath {
        PartPath::new("xl/theme/theme1.xml")
    }

    pub fn core_props() -> PartPath {
        PartPath::new("docProps/core.xml")
    }

    pub fn app_props() -> PartPath {
        PartPath::new("docProps/app.xml")
    }

    pub fn custom_props() -> PartPath {
        PartPath::new("docProps/custom.xml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator_normalization() {
        assert_eq!(
            PartPath::new("xl\\worksheets\\sheet1.xml"),
            PartPath::new("xl/worksheets/sheet1.xml")
        );
    }

    #[test]
    fn test_absolute_and_root() {
        assert!(PartPath::new("/xl/workbook.xml").is_absolute());
        assert!(PartPath::new("C:/data/book.xlsx").is_absolute());
        assert!(!PartPath::new("xl/workbook.xml").is_absolute());

        assert!(PartPath::root().is_root());
        assert!(PartPath::new("C:").is_root());
        assert!(PartPath::new("C:\\").is_root());
        assert!(!PartPath::new("/xl").is_root());
    }

    #[test]
    fn test_filename_and_extension() {
        let path = PartPath::new("xl/worksheets/sheet1.xml");
        assert_eq!(path.filename(), "sheet1.xml");
        assert_eq!(path.extension(), "xml");
        assert_eq!(path.split_extension(), ("sheet1", "xml"));

        let rels = PartPath::new("_rels/.rels");
        assert_eq!(rels.extension(), "rels");

        let dotted = PartPath::new("xl/media/image.v2.png");
        assert_eq!(dotted.split_extension(), ("image.v2", "png"));

        let bare = PartPath::new("xl/README");
        assert_eq!(bare.extension(), "");

        // only the final component is considered
        let dir_dot = PartPath::new("xl.d/file");
        assert_eq!(dir_dot.extension(), "");
    }

    #[test]
    fn test_parent() {
        assert_eq!(
            PartPath::new("xl/worksheets/sheet1.xml").parent().as_str(),
            "xl/worksheets"
        );
        assert_eq!(PartPath::new("/xl").parent(), PartPath::root());
        assert_eq!(PartPath::new("workbook.xml").parent().as_str(), "");
        assert_eq!(PartPath::root().parent(), PartPath::root());
    }

    #[test]
    fn test_append() {
        assert_eq!(PartPath::new("xl").append("workbook.xml").as_str(), "xl/workbook.xml");
        assert_eq!(PartPath::new("xl/").append("workbook.xml").as_str(), "xl/workbook.xml");
        assert_eq!(PartPath::root().append("xl").as_str(), "/xl");
        assert_eq!(PartPath::default().append("xl").as_str(), "xl");
        // no collapsing
        assert_eq!(PartPath::new("xl/").append("/a").as_str(), "xl//a");
    }

    #[test]
    fn test_relative_to() {
        let path = PartPath::new("/xl/worksheets/sheet1.xml");
        assert_eq!(path.relative_to(&PartPath::new("/xl")).as_str(), "worksheets/sheet1.xml");
        assert_eq!(path.relative_to(&PartPath::root()).as_str(), "xl/worksheets/sheet1.xml");

        let relative = PartPath::new("worksheets/sheet1.xml");
        assert_eq!(relative.relative_to(&PartPath::new("/xl")), relative);
    }

    #[test]
    fn test_relationships_path() {
        assert_eq!(
            PartPath::new("xl/workbook.xml").relationships_path().as_str(),
            "xl/_rels/workbook.xml.rels"
        );
        assert_eq!(PartPath::root().relationships_path().as_str(), "_rels/.rels");
        assert_eq!(
            PartPath::new("book.xml").relationships_path().as_str(),
            "_rels/book.xml.rels"
        );
    }

    #[test]
    fn test_is_relationships() {
        assert!(PartPath::new("xl/_rels/workbook.xml.rels").is_relationships());
        assert!(PartPath::new("_rels/.rels").is_relationships());
        assert!(!PartPath::new("xl/workbook.xml").is_relationships());
    }
}
