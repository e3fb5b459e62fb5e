//! Package manifest: the relationship graph plus the content-type table

use crate::error::{Error, Result};
use crate::opc::content_types::ContentTypes;
use crate::opc::part_path::well_known;
use crate::opc::relationships::{format_id, id_number, validate_id};
use crate::opc::{PartPath, Relationship, RelationshipType, TargetMode};
use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Tracks which parts exist in a package and how they relate.
///
/// Relationships are keyed by their source part (the package root for
/// package-level relationships), then by id. Ids are `rIdN` with N the smallest
/// unused positive integer for that source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    relationships: BTreeMap<PartPath, BTreeMap<String, Relationship>>,
    content_types: ContentTypes,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all relationships and content types.
    pub fn clear(&mut self) {
        self.relationships.clear();
        self.content_types.clear();
    }

    // === Relationships ===

    /// Add a relationship from `source`, allocating the smallest free `rIdN`.
    ///
    /// `target` is stored as written in the `.rels` part: relative to the
    /// source's directory, absolute (`/xl/...`) or an external URI.
    pub fn register_relationship(
        &mut self,
        source: &PartPath,
        rel_type: RelationshipType,
        target: &str,
        mode: TargetMode,
    ) -> String {
        let id = self.next_relationship_id(source);
        debug!("registered {} from '{}' -> '{}'", id, source, target);

        self.relationships
            .entry(source_key(source))
            .or_default()
            .insert(
                id.clone(),
                Relationship {
                    id: id.clone(),
                    rel_type,
                    source: source_key(source),
                    target: target.to_string(),
                    mode,
                },
            );
        id
    }

    /// Add a relationship keeping its id, as read from a `.rels` part.
    pub fn register_relationship_with_id(&mut self, rel: Relationship) -> Result<()> {
        validate_id(&rel.id)?;
        let source = source_key(&rel.source);
        let table = self.relationships.entry(source.clone()).or_default();
        if table.contains_key(&rel.id) {
            return Err(Error::MalformedXml(format!(
                "duplicate relationship id '{}' in '{}'",
                rel.id, source
            )));
        }
        table.insert(rel.id.clone(), Relationship { source, ..rel });
        Ok(())
    }

    /// Remove a relationship and close the gap it leaves.
    ///
    /// Every `rIdN` of the same source numbered above the removed one moves down
    /// by one. The returned map holds `old id -> new id` for each renamed
    /// relationship; cached ids must be rewritten through it.
    pub fn unregister_relationship(
        &mut self,
        source: &PartPath,
        id: &str,
    ) -> Result<HashMap<String, String>> {
        let key = source_key(source);
        let table = self
            .relationships
            .get_mut(&key)
            .ok_or_else(|| Error::KeyNotFound(format!("relationships of '{}'", source)))?;
        table
            .remove(id)
            .ok_or_else(|| Error::KeyNotFound(format!("relationship '{}' of '{}'", id, source)))?;

        let mut renamed = HashMap::new();
        if let Some(removed) = id_number(id) {
            let shifted: Vec<(u32, String)> = table
                .keys()
                .filter_map(|k| id_number(k).filter(|n| *n > removed).map(|n| (n, k.clone())))
                .collect::<BTreeMap<_, _>>()
                .into_iter()
                .collect();

            for (number, old) in shifted {
                if let Some(mut rel) = table.remove(&old) {
                    let new = format_id(number - 1);
                    rel.id = new.clone();
                    table.insert(new.clone(), rel);
                    renamed.insert(old, new);
                }
            }
        }

        if table.is_empty() {
            self.relationships.remove(&key);
        }
        Ok(renamed)
    }

    /// The id `register_relationship` would allocate next for `source`.
    pub fn next_relationship_id(&self, source: &PartPath) -> String {
        let used: BTreeSet<u32> = self
            .relationships
            .get(&source_key(source))
            .map(|table| table.keys().filter_map(|k| id_number(k)).collect())
            .unwrap_or_default();

        let mut next = 1;
        while used.contains(&next) {
            next += 1;
        }
        format_id(next)
    }

    pub fn has_relationship(&self, source: &PartPath, rel_type: &RelationshipType) -> bool {
        self.relationships_of_type(source, rel_type).next().is_some()
    }

    pub fn has_relationship_id(&self, source: &PartPath, id: &str) -> bool {
        self.relationships
            .get(&source_key(source))
            .is_some_and(|table| table.contains_key(id))
    }

    /// Look up a relationship by source and id.
    pub fn relationship(&self, source: &PartPath, id: &str) -> Result<&Relationship> {
        self.relationships
            .get(&source_key(source))
            .and_then(|table| table.get(id))
            .ok_or_else(|| Error::KeyNotFound(format!("relationship '{}' of '{}'", id, source)))
    }

    /// First relationship of a type (lowest id) from `source`.
    pub fn relationship_by_type(
        &self,
        source: &PartPath,
        rel_type: &RelationshipType,
    ) -> Result<&Relationship> {
        self.relationships_of_type(source, rel_type)
            .next()
            .ok_or_else(|| {
                Error::KeyNotFound(format!("relationship of type {} from '{}'", rel_type, source))
            })
    }

    /// Relationships of `source` ordered by id number.
    pub fn relationships(&self, source: &PartPath) -> Vec<&Relationship> {
        let mut rels: Vec<&Relationship> = self
            .relationships
            .get(&source_key(source))
            .map(|table| table.values().collect())
            .unwrap_or_default();
        rels.sort_by_key(|rel| (id_number(&rel.id).unwrap_or(u32::MAX), rel.id.clone()));
        rels
    }

    pub fn relationships_of_type<'a>(
        &'a self,
        source: &PartPath,
        rel_type: &RelationshipType,
    ) -> impl Iterator<Item = &'a Relationship> + 'a {
        let rel_type = rel_type.clone();
        self.relationships(source)
            .into_iter()
            .filter(move |rel| rel.rel_type == rel_type)
    }

    /// Parts that own at least one relationship
    pub fn sources(&self) -> impl Iterator<Item = &PartPath> {
        self.relationships.keys()
    }

    /// Absolute location of the part a relationship points to.
    pub fn target_of(&self, rel: &Relationship) -> Result<PartPath> {
        self.canonicalize(&[rel])
    }

    /// Resolve a chain of relationships into one package path.
    ///
    /// Each link contributes the directory of its target, the last link its full
    /// target; `.` and `..` segments are then collapsed. The walk starts in the
    /// directory of the first link's source, so a chain starting at the package
    /// root yields a root-relative path.
    pub fn canonicalize(&self, chain: &[&Relationship]) -> Result<PartPath> {
        let first = chain
            .first()
            .ok_or_else(|| Error::KeyNotFound("empty relationship chain".into()))?;

        let mut segments: Vec<String> = Vec::new();
        let start = source_key(&first.source);
        if !start.is_root() {
            push_segments(&mut segments, start.parent().as_str());
        }

        for (i, rel) in chain.iter().enumerate() {
            if rel.is_external() {
                return Err(Error::InvalidReference(format!(
                    "external relationship '{}' cannot be part of a path",
                    rel.id
                )));
            }
            let target = rel.target_path();
            if target.as_str().starts_with('/') {
                segments.clear();
            }
            let component = if i + 1 == chain.len() {
                target
            } else {
                target.parent()
            };
            push_segments(&mut segments, component.as_str());
        }

        Ok(PartPath::new(segments.join("/")))
    }

    /// Every part the graph knows about: relationship sources, internal targets,
    /// their `.rels` parts and `[Content_Types].xml`.
    pub fn parts(&self) -> Vec<PartPath> {
        let mut parts = BTreeSet::new();
        parts.insert(well_known::content_types());

        for (source, table) in &self.relationships {
            if !source.is_root() {
                parts.insert(source.clone());
            }
            parts.insert(source.relationships_path());

            for rel in table.values().filter(|rel| !rel.is_external()) {
                if let Ok(target) = self.target_of(rel) {
                    parts.insert(target);
                }
            }
        }

        parts.into_iter().collect()
    }

    // === Content types ===

    /// Content type of `part`: override first, then default by extension.
    pub fn content_type(&self, part: &PartPath) -> Result<&str> {
        self.content_types.get(part)
    }

    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    pub fn set_content_types(&mut self, content_types: ContentTypes) {
        self.content_types = content_types;
    }

    pub fn has_default_type(&self, extension: &str) -> bool {
        self.content_types.has_default(extension)
    }

    pub fn default_type(&self, extension: &str) -> Result<&str> {
        self.content_types.default_type(extension)
    }

    pub fn register_default_type(&mut self, extension: &str, content_type: &str) {
        self.content_types.add_default(extension, content_type);
    }

    pub fn unregister_default_type(&mut self, extension: &str) -> Result<()> {
        self.content_types
            .remove_default(extension)
            .map(|_| ())
            .ok_or_else(|| Error::KeyNotFound(format!("default content type for '.{}'", extension)))
    }

    pub fn has_override_type(&self, part: &PartPath) -> bool {
        self.content_types.has_override(part)
    }

    pub fn override_type(&self, part: &PartPath) -> Result<&str> {
        self.content_types.override_type(part)
    }

    pub fn register_override_type(&mut self, part: &PartPath, content_type: &str) {
        self.content_types.add_override(part, content_type);
    }

    pub fn unregister_override_type(&mut self, part: &PartPath) -> Result<()> {
        self.content_types
            .remove_override(part)
            .map(|_| ())
            .ok_or_else(|| Error::KeyNotFound(format!("content type override for '{}'", part)))
    }
}

/// Sources are stored without a leading `/`, except the root itself.
fn source_key(source: &PartPath) -> PartPath {
    if source.is_root() || source.is_empty() {
        PartPath::root()
    } else {
        source.relative_to(&PartPath::root())
    }
}

fn push_segments(segments: &mut Vec<String>, path: &str) {
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::content_types::{WORKBOOK, WORKSHEET, XML};
    use pretty_assertions::assert_eq;

    fn ids(manifest: &Manifest, source: &PartPath) -> Vec<String> {
        manifest
            .relationships(source)
            .into_iter()
            .map(|rel| rel.id.clone())
            .collect()
    }

    fn workbook_with_sheets(n: usize) -> (Manifest, PartPath) {
        let mut manifest = Manifest::new();
        let workbook = well_known::workbook();
        for i in 1..=n {
            manifest.register_relationship(
                &workbook,
                RelationshipType::Worksheet,
                &format!("worksheets/sheet{}.xml", i),
                TargetMode::Internal,
            );
        }
        (manifest, workbook)
    }

    #[test]
    fn test_ids_are_dense() {
        let (manifest, workbook) = workbook_with_sheets(4);
        assert_eq!(ids(&manifest, &workbook), vec!["rId1", "rId2", "rId3", "rId4"]);
    }

    #[test]
    fn test_ids_are_per_source() {
        let (mut manifest, _) = workbook_with_sheets(2);
        let id = manifest.register_relationship(
            &PartPath::root(),
            RelationshipType::OfficeDocument,
            "xl/workbook.xml",
            TargetMode::Internal,
        );
        assert_eq!(id, "rId1");
    }

    #[test]
    fn test_unregister_compacts_ids() {
        let (mut manifest, workbook) = workbook_with_sheets(5);
        let renamed = manifest.unregister_relationship(&workbook, "rId2").unwrap();

        assert_eq!(ids(&manifest, &workbook), vec!["rId1", "rId2", "rId3", "rId4"]);

        let mut expected = HashMap::new();
        expected.insert("rId3".to_string(), "rId2".to_string());
        expected.insert("rId4".to_string(), "rId3".to_string());
        expected.insert("rId5".to_string(), "rId4".to_string());
        assert_eq!(renamed, expected);

        // the old rId3 target now lives under rId2
        assert_eq!(
            manifest.relationship(&workbook, "rId2").unwrap().target,
            "worksheets/sheet3.xml"
        );
    }

    #[test]
    fn test_smallest_free_id_is_reused() {
        let mut manifest = Manifest::new();
        let workbook = well_known::workbook();
        for id in ["rId1", "rId3"] {
            manifest
                .register_relationship_with_id(Relationship {
                    id: id.into(),
                    rel_type: RelationshipType::Worksheet,
                    source: workbook.clone(),
                    target: format!("worksheets/{}.xml", id),
                    mode: TargetMode::Internal,
                })
                .unwrap();
        }
        assert_eq!(manifest.next_relationship_id(&workbook), "rId2");
    }

    #[test]
    fn test_unregister_missing_is_key_not_found() {
        let (mut manifest, workbook) = workbook_with_sheets(1);
        assert!(matches!(
            manifest.unregister_relationship(&workbook, "rId9"),
            Err(Error::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_content_type_precedence() {
        let mut manifest = Manifest::new();
        manifest.register_default_type("xml", XML);
        let workbook = well_known::workbook();
        manifest.register_override_type(&workbook, WORKBOOK);

        assert_eq!(manifest.content_type(&workbook).unwrap(), WORKBOOK);
        assert_eq!(manifest.content_type(&PartPath::new("xl/other.xml")).unwrap(), XML);
        assert!(matches!(
            manifest.content_type(&PartPath::new("xl/media/a.png")),
            Err(Error::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_canonicalize_chain() {
        let mut manifest = Manifest::new();
        let root = PartPath::root();
        manifest.register_relationship(
            &root,
            RelationshipType::OfficeDocument,
            "xl/workbook.xml",
            TargetMode::Internal,
        );
        let workbook = well_known::workbook();
        manifest.register_relationship(
            &workbook,
            RelationshipType::Worksheet,
            "./worksheets/../worksheets/sheet1.xml",
            TargetMode::Internal,
        );

        let office = manifest.relationship(&root, "rId1").unwrap().clone();
        let sheet = manifest.relationship(&workbook, "rId1").unwrap().clone();

        assert_eq!(
            manifest.canonicalize(&[&office, &sheet]).unwrap().as_str(),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            manifest.target_of(&sheet).unwrap().as_str(),
            "xl/worksheets/sheet1.xml"
        );
    }

    #[test]
    fn test_canonicalize_absolute_and_parent_targets() {
        let sheet = PartPath::new("xl/worksheets/sheet1.xml");
        let comments = Relationship {
            id: "rId1".into(),
            rel_type: RelationshipType::Comments,
            source: sheet.clone(),
            target: "../comments1.xml".into(),
            mode: TargetMode::Internal,
        };
        let absolute = Relationship {
            target: "/xl/comments2.xml".into(),
            ..comments.clone()
        };

        let manifest = Manifest::new();
        assert_eq!(manifest.target_of(&comments).unwrap().as_str(), "xl/comments1.xml");
        assert_eq!(manifest.target_of(&absolute).unwrap().as_str(), "xl/comments2.xml");
    }

    #[test]
    fn test_canonicalize_empty_chain_fails() {
        assert!(Manifest::new().canonicalize(&[]).is_err());
    }

    #[test]
    fn test_parts_includes_sources_and_targets() {
        let mut manifest = Manifest::new();
        manifest.register_relationship(
            &PartPath::root(),
            RelationshipType::OfficeDocument,
            "xl/workbook.xml",
            TargetMode::Internal,
        );
        let workbook = well_known::workbook();
        manifest.register_relationship(
            &workbook,
            RelationshipType::Worksheet,
            "worksheets/sheet1.xml",
            TargetMode::Internal,
        );
        manifest.register_relationship(
            &PartPath::new("xl/worksheets/sheet1.xml"),
            RelationshipType::Hyperlink,
            "https://example.com",
            TargetMode::External,
        );
        manifest.register_override_type(&PartPath::new("xl/worksheets/sheet1.xml"), WORKSHEET);

        let parts: Vec<String> = manifest.parts().iter().map(|p| p.to_string()).collect();
        assert_eq!(
            parts,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "xl/_rels/workbook.xml.rels",
                "xl/workbook.xml",
                "xl/worksheets/_rels/sheet1.xml.rels",
                "xl/worksheets/sheet1.xml",
            ]
        );
    }

    #[test]
    fn test_clear_resets_everything() {
        let (mut manifest, workbook) = workbook_with_sheets(3);
        manifest.register_default_type("xml", XML);
        manifest.clear();

        assert_eq!(manifest, Manifest::new());
        assert_eq!(
            manifest.register_relationship(
                &workbook,
                RelationshipType::Worksheet,
                "worksheets/sheet1.xml",
                TargetMode::Internal
            ),
            "rId1"
        );
    }

    #[test]
    fn test_relationship_by_type() {
        let (mut manifest, workbook) = workbook_with_sheets(2);
        manifest.register_relationship(
            &workbook,
            RelationshipType::Stylesheet,
            "styles.xml",
            TargetMode::Internal,
        );

        let styles = manifest
            .relationship_by_type(&workbook, &RelationshipType::Stylesheet)
            .unwrap();
        assert_eq!(styles.id, "rId3");
        let first = manifest
            .relationship_by_type(&workbook, &RelationshipType::Worksheet)
            .unwrap();
        assert_eq!(first.id, "rId1");
        assert_eq!(
            manifest
                .relationships_of_type(&workbook, &RelationshipType::Worksheet)
                .count(),
            2
        );
        assert!(matches!(
            manifest.relationship_by_type(&workbook, &RelationshipType::Theme),
            Err(Error::KeyNotFound(_))
        ));
    }
}
