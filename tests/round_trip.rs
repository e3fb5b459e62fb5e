//! Integration test: write workbooks and read them back

use linch_xlsx_rs::opc::{well_known, ArchiveReader, PartPath};
use linch_xlsx_rs::{
    Cell, CellReference, CellValue, Comment, CoreProperties, CustomProperty, CustomValue, Error,
    Font, Format, Hyperlink, HyperlinkTarget, RangeReference, RichText, SheetState, Workbook,
};
use pretty_assertions::assert_eq;
use std::io::Cursor;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn part_text(bytes: &[u8], path: &str) -> String {
    let mut archive = ArchiveReader::new(Cursor::new(bytes)).expect("Failed to open archive");
    let data = archive
        .read_part(&PartPath::new(path))
        .expect("Part should exist");
    String::from_utf8(data).expect("Part should be UTF-8")
}

fn part_names(bytes: &[u8]) -> Vec<String> {
    let archive = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive
        .part_names()
        .iter()
        .map(|p| p.as_str().to_string())
        .collect();
    names.sort();
    names
}

fn a1(text: &str) -> CellReference {
    CellReference::parse(text).unwrap()
}

#[test]
fn test_minimal_package_parts() {
    init_logger();
    let bytes = Workbook::new().to_bytes().expect("Failed to write");

    assert_eq!(
        part_names(&bytes),
        vec![
            "[Content_Types].xml",
            "_rels/.rels",
            "xl/_rels/workbook.xml.rels",
            "xl/styles.xml",
            "xl/workbook.xml",
            "xl/worksheets/sheet1.xml",
        ]
    );

    let rels = part_text(&bytes, "_rels/.rels");
    assert!(rels.contains(r#"Id="rId1""#));
    assert!(rels.contains(r#"Target="xl/workbook.xml""#));

    let content_types = part_text(&bytes, "[Content_Types].xml");
    assert!(content_types.contains(r#"<Default Extension="rels""#));
    assert!(content_types.contains(r#"PartName="/xl/workbook.xml""#));
    assert!(!content_types.contains("vml"));
}

#[test]
fn test_values_round_trip() {
    init_logger();
    let mut workbook = Workbook::new();
    let sheet = workbook.sheet_mut(0).unwrap();
    sheet.set("A1", 0.3).unwrap();
    sheet.set("B1", 123456789012345.0).unwrap();
    sheet.set("C1", -1.5e-7).unwrap();
    sheet.set("A2", true).unwrap();
    sheet.set("B2", "text").unwrap();
    sheet.set_value(a1("C2"), CellValue::Error("#DIV/0!".into()));
    sheet.set_cell(a1("A3"), Cell::new(0.6).with_formula("A1*2"));
    sheet.set_cell(a1("B3"), Cell::new("ab").with_formula("\"a\"&\"b\""));

    let bytes = workbook.to_bytes().unwrap();
    let read = Workbook::from_bytes(&bytes).expect("Failed to read back");
    let sheet = &read.sheets()[0];

    assert_eq!(sheet.get("A1").unwrap(), &CellValue::Number(0.3));
    assert_eq!(sheet.get("B1").unwrap(), &CellValue::Number(123456789012345.0));
    assert_eq!(sheet.get("C1").unwrap(), &CellValue::Number(-1.5e-7));
    assert_eq!(sheet.get("A2").unwrap(), &CellValue::Bool(true));
    assert_eq!(sheet.get("B2").unwrap(), &CellValue::from("text"));
    assert_eq!(sheet.get("C2").unwrap(), &CellValue::Error("#DIV/0!".into()));

    let formula = sheet.cell(a1("A3")).unwrap();
    assert_eq!(formula.formula.as_deref(), Some("A1*2"));
    assert_eq!(formula.value, CellValue::Number(0.6));
    let text_formula = sheet.cell(a1("B3")).unwrap();
    assert_eq!(text_formula.formula.as_deref(), Some("\"a\"&\"b\""));
    assert_eq!(text_formula.value, CellValue::from("ab"));
}

#[test]
fn test_numbers_are_written_shortest() {
    let mut workbook = Workbook::new();
    let sheet = workbook.sheet_mut(0).unwrap();
    sheet.set("A1", 0.1 + 0.2).unwrap();
    sheet.set("A2", 1e21).unwrap();

    let bytes = workbook.to_bytes().unwrap();
    let xml = part_text(&bytes, "xl/worksheets/sheet1.xml");
    assert!(xml.contains("<v>0.3</v>"), "{}", xml);
    assert!(xml.contains("<v>1E+21</v>"), "{}", xml);
}

#[test]
fn test_non_finite_numbers_are_rejected() {
    let mut workbook = Workbook::new();
    workbook.sheet_mut(0).unwrap().set("A1", f64::NAN).unwrap();
    assert!(matches!(workbook.to_bytes(), Err(Error::FormattingOverflow(_))));
}

#[test]
fn test_shared_strings_are_deduplicated() {
    let mut workbook = Workbook::new();
    let sheet = workbook.sheet_mut(0).unwrap();
    sheet.set("A1", "x").unwrap();
    sheet.set("A2", "y").unwrap();
    sheet.set("A3", "x").unwrap();

    let bytes = workbook.to_bytes().unwrap();
    assert!(part_names(&bytes).contains(&"xl/sharedStrings.xml".to_string()));

    let sst = part_text(&bytes, "xl/sharedStrings.xml");
    assert!(sst.contains(r#"count="3" uniqueCount="2""#), "{}", sst);

    let xml = part_text(&bytes, "xl/worksheets/sheet1.xml");
    assert!(xml.contains(r#"<c r="A1" t="s"><v>0</v></c>"#), "{}", xml);
    assert!(xml.contains(r#"<c r="A3" t="s"><v>0</v></c>"#), "{}", xml);
}

#[test]
fn test_rich_text_round_trip() {
    let text = RichText::new()
        .with_run("bold", Some(Font::standard().with_bold(true)))
        .with_run(" plain", None);
    let mut workbook = Workbook::new();
    workbook.sheet_mut(0).unwrap().set("A1", text.clone()).unwrap();

    let read = Workbook::from_bytes(&workbook.to_bytes().unwrap()).unwrap();
    let value = read.sheets()[0].get("A1").unwrap();
    assert_eq!(value.as_text().map(|t| t.plain_text()), Some("bold plain".into()));
    assert_eq!(value.as_text().map(|t| t.runs().len()), Some(2));
}

#[test]
fn test_formula_with_text_result_round_trips() {
    let rich = RichText::new()
        .with_run("bold", Some(Font::standard().with_bold(true)))
        .with_run(" plain", None);
    let cell = Cell::new(rich).with_formula("\"bold\"&\" plain\"");
    let mut workbook = Workbook::new();
    workbook.sheet_mut(0).unwrap().set_cell(a1("B2"), cell.clone());

    let read = Workbook::from_bytes(&workbook.to_bytes().unwrap()).unwrap();
    let sheet = &read.sheets()[0];
    assert_eq!(sheet.cell(a1("B2")), Some(&cell));
}

#[test]
fn test_formats_round_trip() {
    let mut workbook = Workbook::new();
    let bold = workbook.add_format(
        &Format::new()
            .with_number_format("0.000")
            .with_font(Font::standard().with_bold(true)),
    );
    let sheet = workbook.sheet_mut(0).unwrap();
    sheet.set_cell(a1("A1"), Cell::new(1.5).with_format(bold));
    sheet.set("A2", 2.0).unwrap();

    let read = Workbook::from_bytes(&workbook.to_bytes().unwrap()).unwrap();
    let format = read.cell_format(0, a1("A1")).unwrap().expect("A1 keeps its format");
    assert!(format.font.bold);
    assert_eq!(format.number_format.code, "0.000");
    assert!(format.number_format.id >= 164);
    assert_eq!(read.cell_format(0, a1("A2")).unwrap(), None);
}

#[test]
fn test_sheet_records_round_trip() {
    let mut workbook = Workbook::new();
    workbook.add_sheet("Second").state = SheetState::Hidden;
    workbook.active_tab = 1;

    let sheet = workbook.sheet_mut(0).unwrap();
    sheet.set("A1", "merged").unwrap();
    sheet.merge_cells(RangeReference::parse("A1:B2").unwrap());
    sheet.row_properties_mut(3).height = Some(24.0);
    sheet.row_properties_mut(4).hidden = true;

    let read = Workbook::from_bytes(&workbook.to_bytes().unwrap()).unwrap();
    assert_eq!(read.sheet_titles(), vec!["Sheet1", "Second"]);
    assert_eq!(read.sheets()[1].state, SheetState::Hidden);
    assert_eq!(read.active_tab, 1);

    let sheet = &read.sheets()[0];
    assert_eq!(sheet.merged_cells, vec![RangeReference::parse("A1:B2").unwrap()]);
    assert_eq!(sheet.row_properties(3).and_then(|r| r.height), Some(24.0));
    assert!(sheet.row_properties(4).map(|r| r.hidden).unwrap_or(false));
}

#[test]
fn test_comments_and_hyperlinks_round_trip() {
    init_logger();
    let mut workbook = Workbook::new();
    let sheet = workbook.sheet_mut(0).unwrap();
    sheet.set("A1", "see note").unwrap();
    sheet.set_comment(a1("A1"), Comment::new("Ann", "first"));
    sheet.set_comment(a1("C4"), Comment::new("Bo", "second"));
    sheet.add_hyperlink(Hyperlink {
        range: RangeReference::parse("B1").unwrap(),
        target: HyperlinkTarget::External("https://example.com/".into()),
        tooltip: Some("Example".into()),
        display: None,
    });
    sheet.add_hyperlink(Hyperlink {
        range: RangeReference::parse("B2").unwrap(),
        target: HyperlinkTarget::Internal("Sheet1!A1".into()),
        tooltip: None,
        display: None,
    });

    let bytes = workbook.to_bytes().unwrap();
    let names = part_names(&bytes);
    assert!(names.contains(&"xl/comments1.xml".to_string()));
    assert!(names.contains(&"xl/drawings/vmlDrawing1.vml".to_string()));
    assert!(names.contains(&"xl/worksheets/_rels/sheet1.xml.rels".to_string()));

    let rels = part_text(&bytes, "xl/worksheets/_rels/sheet1.xml.rels");
    assert!(rels.contains(r#"Id="rId1""#));
    assert!(rels.contains(r#"TargetMode="External""#));
    assert!(rels.contains(r#"Target="../comments1.xml""#));

    let read = Workbook::from_bytes(&bytes).unwrap();
    let sheet = &read.sheets()[0];
    assert_eq!(sheet.comment(a1("A1")), Some(&Comment::new("Ann", "first")));
    assert_eq!(sheet.comment(a1("C4")), Some(&Comment::new("Bo", "second")));
    assert_eq!(sheet.hyperlinks.len(), 2);
    assert_eq!(
        sheet.hyperlinks[0].target,
        HyperlinkTarget::External("https://example.com/".into())
    );
    assert_eq!(sheet.hyperlinks[0].tooltip.as_deref(), Some("Example"));
    assert_eq!(
        sheet.hyperlinks[1].target,
        HyperlinkTarget::Internal("Sheet1!A1".into())
    );
}

#[test]
fn test_document_properties_round_trip() {
    let mut workbook = Workbook::new();
    workbook.core_properties = CoreProperties {
        title: Some("Budget".into()),
        creator: Some("Ann".into()),
        modified: Some("2024-05-06T07:08:09Z".into()),
        ..Default::default()
    };
    workbook.extended_properties.company = Some("Acme".into());
    workbook.custom_properties = vec![
        CustomProperty::new("Reviewed", CustomValue::Bool(true)),
        CustomProperty::new("Score", CustomValue::Number(9.5)),
    ];

    let bytes = workbook.to_bytes().unwrap();
    let names = part_names(&bytes);
    for part in ["docProps/core.xml", "docProps/app.xml", "docProps/custom.xml"] {
        assert!(names.contains(&part.to_string()), "missing {}", part);
    }

    let read = Workbook::from_bytes(&bytes).unwrap();
    assert_eq!(read.core_properties, workbook.core_properties);
    assert_eq!(read.extended_properties.company.as_deref(), Some("Acme"));
    assert_eq!(read.custom_properties, workbook.custom_properties);
}

#[test]
fn test_manifest_is_kept_after_read() {
    let bytes = Workbook::new().to_bytes().unwrap();
    let read = Workbook::from_bytes(&bytes).unwrap();

    let manifest = read.manifest();
    let parts = manifest.parts();
    assert!(parts.contains(&well_known::workbook()));
    assert!(parts.contains(&well_known::styles()));
    assert!(parts.contains(&PartPath::new("xl/worksheets/sheet1.xml")));
    assert!(manifest
        .content_type(&well_known::workbook())
        .unwrap()
        .contains("spreadsheetml"));
}

#[test]
fn test_empty_workbook_cannot_be_written() {
    let workbook = Workbook::empty();
    assert!(matches!(workbook.to_bytes(), Err(Error::InvalidFile(_))));
}

#[test]
fn test_reread_is_stable() {
    let mut workbook = Workbook::new();
    let sheet = workbook.sheet_mut(0).unwrap();
    sheet.set("A1", "a").unwrap();
    sheet.set("B2", 2.5).unwrap();
    sheet.set_comment(a1("B2"), Comment::new("Ann", "n"));

    let first = workbook.to_bytes().unwrap();
    let second = Workbook::from_bytes(&first).unwrap().to_bytes().unwrap();
    assert_eq!(part_names(&first), part_names(&second));
    assert_eq!(
        part_text(&first, "xl/worksheets/sheet1.xml"),
        part_text(&second, "xl/worksheets/sheet1.xml")
    );
    assert_eq!(
        part_text(&first, "xl/sharedStrings.xml"),
        part_text(&second, "xl/sharedStrings.xml")
    );
}
