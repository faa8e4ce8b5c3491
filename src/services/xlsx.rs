//! Minimal XLSX writer for the report sheets. An .xlsx file is a zip of
//! OOXML parts; we emit workbook metadata plus one worksheet per sheet,
//! with text as inline strings so no shared-string table is needed.

use std::io::{Cursor, Write};

use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::services::report::{Cell, Sheet};

const MAX_SHEET_NAME_LEN: usize = 31;

#[derive(Debug, Error)]
pub(crate) enum XlsxError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Strips the characters Excel rejects in sheet and file names.
pub(crate) fn clean_excel_name(name: &str) -> String {
    let cleaned: String =
        name.chars().filter(|c| !matches!(c, '\\' | '/' | '?' | '*' | '[' | ']' | ':')).collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() {
        "Unknown".to_string()
    } else {
        cleaned
    }
}

pub(crate) fn sheet_name(name: &str) -> String {
    clean_excel_name(name).chars().take(MAX_SHEET_NAME_LEN).collect()
}

pub(crate) fn workbook_bytes(sheets: &[Sheet]) -> Result<Vec<u8>, XlsxError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", opts)?;
    zip.write_all(content_types(sheets.len()).as_bytes())?;

    zip.start_file("_rels/.rels", opts)?;
    zip.write_all(ROOT_RELS.as_bytes())?;

    zip.start_file("xl/workbook.xml", opts)?;
    zip.write_all(workbook_xml(sheets).as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", opts)?;
    zip.write_all(workbook_rels(sheets.len()).as_bytes())?;

    zip.start_file("xl/styles.xml", opts)?;
    zip.write_all(STYLES_XML.as_bytes())?;

    for (index, sheet) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), opts)?;
        zip.write_all(worksheet_xml(sheet).as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="1"><fill><patternFill patternType="none"/></fill></fills><borders count="1"><border/></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs></styleSheet>"#;

fn content_types(sheet_count: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
    );
    for index in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{index}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn workbook_xml(sheets: &[Sheet]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    for (index, sheet) in sheets.iter().enumerate() {
        let id = index + 1;
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{id}" r:id="rId{id}"/>"#,
            escape_xml(&sheet.name)
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels(sheet_count: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for index in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{index}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{index}.xml"/>"#
        ));
    }
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        sheet_count + 1
    ));
    xml.push_str("</Relationships>");
    xml
}

fn worksheet_xml(sheet: &Sheet) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    );

    if !sheet.widths.is_empty() {
        xml.push_str("<cols>");
        for (index, width) in sheet.widths.iter().enumerate() {
            let col = index + 1;
            xml.push_str(&format!(
                r#"<col min="{col}" max="{col}" width="{width}" customWidth="1"/>"#
            ));
        }
        xml.push_str("</cols>");
    }

    xml.push_str("<sheetData>");

    xml.push_str(r#"<row r="1">"#);
    for (col, header) in sheet.headers.iter().enumerate() {
        push_text_cell(&mut xml, col, 1, header);
    }
    xml.push_str("</row>");

    for (row_index, row) in sheet.rows.iter().enumerate() {
        let row_number = row_index + 2;
        xml.push_str(&format!(r#"<row r="{row_number}">"#));
        for (col, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(text) => push_text_cell(&mut xml, col, row_number, text),
                Cell::Number(value) => xml.push_str(&format!(
                    r#"<c r="{}{row_number}"><v>{value}</v></c>"#,
                    column_ref(col)
                )),
            }
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn push_text_cell(xml: &mut String, col: usize, row: usize, text: &str) {
    xml.push_str(&format!(
        r#"<c r="{}{row}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
        column_ref(col),
        escape_xml(text)
    ));
}

/// Zero-based column index to the A1-style column letters.
fn column_ref(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_else(|_| "A".to_string())
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use zip::ZipArchive;

    use super::*;

    fn sample_sheet() -> Sheet {
        Sheet {
            name: "Matematika".to_string(),
            headers: vec!["Nama Siswa".to_string(), "Nilai".to_string()],
            widths: vec![25, 15],
            rows: vec![vec![Cell::Text("Andi & Budi".to_string()), Cell::Number(87.5)]],
        }
    }

    #[test]
    fn column_refs_cover_two_letter_range() {
        assert_eq!(column_ref(0), "A");
        assert_eq!(column_ref(25), "Z");
        assert_eq!(column_ref(26), "AA");
        assert_eq!(column_ref(27), "AB");
        assert_eq!(column_ref(51), "AZ");
        assert_eq!(column_ref(52), "BA");
    }

    #[test]
    fn sheet_names_are_cleaned_and_truncated() {
        assert_eq!(sheet_name("Seni/Budaya: [Musik]?"), "SeniBudaya Musik");
        assert_eq!(sheet_name("   "), "Unknown");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
    }

    #[test]
    fn produced_archive_is_a_readable_workbook() {
        let bytes = workbook_bytes(&[sample_sheet()]).expect("workbook");
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("open archive");

        for entry in
            ["[Content_Types].xml", "_rels/.rels", "xl/workbook.xml", "xl/worksheets/sheet1.xml"]
        {
            assert!(archive.by_name(entry).is_ok(), "missing entry {entry}");
        }

        let mut sheet = String::new();
        archive.by_name("xl/worksheets/sheet1.xml").unwrap().read_to_string(&mut sheet).unwrap();
        assert!(sheet.contains("Andi &amp; Budi"));
        assert!(sheet.contains("<v>87.5</v>"));

        let mut workbook = String::new();
        archive.by_name("xl/workbook.xml").unwrap().read_to_string(&mut workbook).unwrap();
        assert!(workbook.contains(r#"name="Matematika""#));
    }

    #[test]
    fn every_sheet_gets_its_own_part() {
        let mut second = sample_sheet();
        second.name = "IPAS".to_string();
        let bytes = workbook_bytes(&[sample_sheet(), second]).expect("workbook");
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("open archive");

        assert!(archive.by_name("xl/worksheets/sheet2.xml").is_ok());
    }
}
