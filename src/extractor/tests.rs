use super::*;
use super::test_support::write_pdf;
use std::io::Write;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

fn write_docx(path: &Path, body: &str) {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    let file = File::create(path).expect("should create docx file");
    let mut zip = ZipWriter::new(file);
    zip.start_file("[Content_Types].xml", SimpleFileOptions::default())
        .expect("should start content types");
    zip.write_all(b"<Types/>").expect("should write content types");
    zip.start_file(DOCX_BODY_PART, SimpleFileOptions::default())
        .expect("should start document part");
    zip.write_all(xml.as_bytes()).expect("should write document part");
    zip.finish().expect("should finish docx");
}

#[test]
fn detects_kind_case_insensitively() {
    assert_eq!(
        DocumentKind::from_path(Path::new("guide.PDF")),
        Some(DocumentKind::Pdf)
    );
    assert_eq!(
        DocumentKind::from_path(Path::new("notes.Docx")),
        Some(DocumentKind::Docx)
    );
    assert_eq!(
        DocumentKind::from_path(Path::new("a.txt")),
        Some(DocumentKind::Txt)
    );
    assert_eq!(DocumentKind::from_path(Path::new("scan.png")), None);
    assert_eq!(DocumentKind::from_path(Path::new("README")), None);
    assert_eq!(DocumentKind::from_path(Path::new("legacy.doc")), None);
}

#[test]
fn reads_txt_verbatim() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("a.txt");
    fs::write(&path, "diabetes management guide\n\n  insulin dosing  ").expect("should write");

    let text = extract_text(&path).expect("should extract txt");
    assert_eq!(text, "diabetes management guide\n\n  insulin dosing  ");
}

#[test]
fn invalid_utf8_txt_is_an_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("latin1.txt");
    fs::write(&path, [0x63, 0x61, 0x66, 0xe9]).expect("should write");

    let result = extract_text(&path);
    assert!(matches!(result, Err(ExtractionError::InvalidUtf8 { .. })));
}

#[test]
fn unsupported_extension_yields_empty_text() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("image.png");
    fs::write(&path, [0x89, 0x50, 0x4e, 0x47]).expect("should write");

    assert_eq!(extract_text(&path).expect("should not fail"), "");
}

#[test]
fn missing_file_is_an_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = extract_text(&temp_dir.path().join("gone.txt"));
    assert!(matches!(result, Err(ExtractionError::Io { .. })));
}

#[test]
fn docx_joins_non_blank_paragraphs() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("protocol.docx");
    write_docx(
        &path,
        concat!(
            "<w:p><w:r><w:t>Cardiac </w:t></w:r><w:r><w:t>surgery protocol</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>   </w:t></w:r></w:p>",
            "<w:p/>",
            "<w:p><w:r><w:t>Step&amp;1</w:t><w:tab/><w:t>prep</w:t></w:r></w:p>",
        ),
    );

    let text = extract_text(&path).expect("should extract docx");
    assert_eq!(text, "Cardiac surgery protocol\nStep&1\tprep");
}

#[test]
fn docx_without_body_part_is_an_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("empty.docx");
    let file = File::create(&path).expect("should create file");
    let mut zip = ZipWriter::new(file);
    zip.start_file("other.xml", SimpleFileOptions::default())
        .expect("should start file");
    zip.write_all(b"<x/>").expect("should write");
    zip.finish().expect("should finish");

    assert!(matches!(
        extract_text(&path),
        Err(ExtractionError::Docx { .. })
    ));
}

#[test]
fn corrupt_docx_is_an_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("broken.docx");
    fs::write(&path, "definitely not a zip archive").expect("should write");

    assert!(matches!(
        extract_text(&path),
        Err(ExtractionError::Docx { .. })
    ));
}

#[test]
fn corrupt_pdf_is_an_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("broken.pdf");
    fs::write(&path, "this is not a pdf").expect("should write");

    assert!(matches!(
        extract_text(&path),
        Err(ExtractionError::Pdf { .. })
    ));
}

#[test]
fn paragraph_text_ignores_markup_outside_runs() {
    let xml = r#"<w:document><w:body>
        <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Heading</w:t></w:r></w:p>
        <w:p><w:r><w:t xml:space="preserve">Line one</w:t><w:br/><w:t>Line two</w:t></w:r></w:p>
    </w:body></w:document>"#;

    let paragraphs = docx_paragraphs(xml).expect("should parse");
    assert_eq!(paragraphs, vec!["Heading", "Line one\nLine two"]);
}

#[test]
fn pdf_pages_are_concatenated_in_order() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("guide.pdf");
    write_pdf(
        &path,
        &["Diabetes management guide", "Insulin dosing and glucose checks"],
    );

    let text = extract_text(&path).expect("should extract pdf");

    let first = text.find("Diabetes management guide").expect("page one text");
    let second = text.find("Insulin dosing and glucose checks").expect("page two text");
    assert!(first < second);
    assert_eq!(text, text.trim());
}

#[test]
fn pdf_extension_is_matched_case_insensitively() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("PROTOCOL.PDF");
    write_pdf(&path, &["Cardiac surgery protocol"]);

    let text = extract_text(&path).expect("should extract pdf");
    assert!(text.contains("Cardiac surgery protocol"));
}

#[test]
fn table_paragraphs_are_not_body_paragraphs() {
    let xml = r#"<w:document><w:body>
        <w:p><w:r><w:t>Dosage overview</w:t></w:r></w:p>
        <w:tbl><w:tr><w:tc><w:p><w:r><w:t>Metformin</w:t></w:r></w:p></w:tc>
        <w:tc><w:tbl><w:tr><w:tc><w:p><w:r><w:t>500mg</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:tc></w:tr></w:tbl>
        <w:p><w:r><w:t>Follow up in two weeks</w:t></w:r></w:p>
    </w:body></w:document>"#;

    let paragraphs = docx_paragraphs(xml).expect("should parse");
    assert_eq!(paragraphs, vec!["Dosage overview", "Follow up in two weeks"]);
}

#[test]
fn text_box_does_not_clobber_anchoring_paragraph() {
    let xml = r#"<w:document><w:body>
        <w:p><w:r><w:t>Before box </w:t></w:r><w:r><w:drawing><wps:txbx><w:txbxContent>
            <w:p><w:r><w:t>Sidebar note</w:t></w:r></w:p>
        </w:txbxContent></wps:txbx></w:drawing></w:r><w:r><w:t>after box</w:t></w:r></w:p>
    </w:body></w:document>"#;

    let paragraphs = docx_paragraphs(xml).expect("should parse");
    assert_eq!(paragraphs, vec!["Before box after box"]);
}
