// ! XLSX writer producing a minimal SpreadsheetML package

use anyhow::Result;
use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::SheetData;
use crate::reader::Value;
use crate::reader::table::format_number;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Characters Excel does not allow in sheet names
const INVALID_SHEET_CHARS: [char; 7] = ['\\', '/', '?', '*', '[', ']', ':'];

/// Write `sheets` as an XLSX workbook at `output_path`
pub fn write_workbook_xlsx(output_path: &Path, sheets: &[SheetData]) -> Result<()> {
    validate_sheet_names(sheets)?;

    let output_file = File::create(output_path)?;
    let mut zip_writer = ZipWriter::new(output_file);
    let options = SimpleFileOptions::default();

    zip_writer.start_file("[Content_Types].xml", options)?;
    zip_writer.write_all(content_types_xml(sheets.len()).as_bytes())?;

    zip_writer.start_file("_rels/.rels", options)?;
    zip_writer.write_all(package_rels_xml().as_bytes())?;

    zip_writer.start_file("xl/workbook.xml", options)?;
    zip_writer.write_all(workbook_xml(sheets).as_bytes())?;

    zip_writer.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip_writer.write_all(workbook_rels_xml(sheets.len()).as_bytes())?;

    for (i, sheet) in sheets.iter().enumerate() {
        zip_writer.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip_writer.write_all(&worksheet_xml(sheet)?)?;
    }

    zip_writer.finish()?;
    Ok(())
}

fn validate_sheet_names(sheets: &[SheetData]) -> Result<()> {
    if sheets.is_empty() {
        anyhow::bail!("A workbook needs at least one sheet");
    }

    let mut seen = HashSet::new();
    for sheet in sheets {
        let name = sheet.name.as_str();
        if name.is_empty() || name.chars().count() > 31 {
            anyhow::bail!("Invalid sheet name '{}': must be 1-31 characters", name);
        }
        if name.contains(INVALID_SHEET_CHARS) || !name.chars().all(is_xml_char) {
            anyhow::bail!("Invalid sheet name '{}': contains a reserved character", name);
        }
        if !seen.insert(name.to_lowercase()) {
            anyhow::bail!("Duplicate sheet name '{}'", name);
        }
    }
    Ok(())
}

// Package parts

fn content_types_xml(sheet_count: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
"#,
    );
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            i
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn package_rels_xml() -> String {
    String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#,
    )
}

fn workbook_xml(sheets: &[SheetData]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{}" xmlns:r="{}">
<sheets>
"#,
        MAIN_NS, REL_NS
    );
    for (i, sheet) in sheets.iter().enumerate() {
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape(sheet.name.as_str()),
            i + 1,
            i + 1
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
    );
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            i, i
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

// Worksheet body

fn worksheet_xml(sheet: &SheetData) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.write_event(Event::Start(
        BytesStart::new("worksheet").with_attributes([("xmlns", MAIN_NS)]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;

    let header: Vec<Value> = sheet.headers.iter().map(|h| Value::from(h.as_str())).collect();
    for (row_index, row) in std::iter::once(&header).chain(sheet.rows.iter()).enumerate() {
        let row_number = (row_index + 1).to_string();
        writer.write_event(Event::Start(
            BytesStart::new("row").with_attributes([("r", row_number.as_str())]),
        ))?;

        for (col_index, value) in row.iter().enumerate() {
            let reference = cell_reference(row_index as u32, col_index as u32);
            write_cell(&mut writer, &reference, value)?;
        }

        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;

    Ok(writer.into_inner().into_inner())
}

fn write_cell(writer: &mut Writer<Cursor<Vec<u8>>>, reference: &str, value: &Value) -> Result<()> {
    match value {
        Value::Empty => {}
        Value::Number(n) if n.is_finite() => {
            writer.write_event(Event::Start(
                BytesStart::new("c").with_attributes([("r", reference)]),
            ))?;
            write_text_element(writer, "v", &format_number(*n))?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
        Value::Boolean(b) => {
            writer.write_event(Event::Start(
                BytesStart::new("c").with_attributes([("r", reference), ("t", "b")]),
            ))?;
            write_text_element(writer, "v", if *b { "1" } else { "0" })?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
        Value::Number(n) => write_inline_string(writer, reference, &n.to_string())?,
        Value::Text(s) | Value::Error(s) => write_inline_string(writer, reference, s)?,
    }
    Ok(())
}

fn write_inline_string(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    reference: &str,
    text: &str,
) -> Result<()> {
    writer.write_event(Event::Start(
        BytesStart::new("c").with_attributes([("r", reference), ("t", "inlineStr")]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("is")))?;
    writer.write_event(Event::Start(
        BytesStart::new("t").with_attributes([("xml:space", "preserve")]),
    ))?;
    writer.write_event(Event::Text(BytesText::new(&xml_safe(text))))?;
    writer.write_event(Event::End(BytesEnd::new("t")))?;
    writer.write_event(Event::End(BytesEnd::new("is")))?;
    writer.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

fn write_text_element(writer: &mut Writer<Cursor<Vec<u8>>>, tag: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// Drop characters that XML 1.0 does not allow, such as C0 control codes
fn xml_safe(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|c| is_xml_char(*c)).collect())
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Excel-style reference for 0-based coordinates (e.g., (0, 27) -> "AB1")
fn cell_reference(row: u32, col: u32) -> String {
    let mut letters = String::new();
    let mut col = col;
    loop {
        letters.insert(0, (b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    format!("{}{}", letters, row + 1)
}
