// ! Writer module for exporting report workbooks

mod xlsx_writer;

pub use xlsx_writer::write_workbook_xlsx;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::path::Path;

use crate::pipeline::Report;
use crate::reader::Value;

pub const SUMMARY_SHEET: &str = "学院汇总";
pub const DETAIL_SHEET: &str = "购买明细";
pub const STATS_SHEET: &str = "统计摘要";

const SUMMARY_HEADERS: [&str; 6] = ["学号", "姓名", "学院", "专业", "行政班", "教材采购总费用"];
const DETAIL_HEADERS: [&str; 6] = ["学号", "姓名", "学院", "专业", "行政班", "ISBN"];
const STATS_HEADERS: [&str; 7] = [
    "统计时间",
    "目标学院关键词",
    "匹配到的学院",
    "价格列来源",
    "总学生数",
    "采购总费用",
    "人均费用",
];

/// One worksheet to be written: a header row followed by data rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetData {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl SheetData {
    pub fn new<S: Into<String>>(name: S, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }
}

/// Write sheets to a workbook file, choosing the format from the extension
pub fn write_workbook<P: AsRef<Path>>(path: P, sheets: &[SheetData]) -> Result<()> {
    let path = path.as_ref();

    match path.extension().and_then(|s| s.to_str()) {
        Some("xlsx") => write_workbook_xlsx(path, sheets)
            .with_context(|| format!("Failed to write workbook: {}", path.display())),
        Some("ods") => {
            anyhow::bail!("ODS format not yet supported for writing")
        }
        _ => anyhow::bail!("Unsupported file format: {}", path.display()),
    }
}

/// Write the three-sheet report workbook for a finished run
pub fn write_report<P: AsRef<Path>>(path: P, report: &Report) -> Result<()> {
    write_workbook(path, &report_sheets(report))
}

/// Lay out a report as group summary, purchase detail and run summary sheets
pub fn report_sheets(report: &Report) -> Vec<SheetData> {
    let mut summary = SheetData::new(SUMMARY_SHEET, to_headers(&SUMMARY_HEADERS));
    for group in &report.groups {
        summary.rows.push(vec![
            Value::from(group.student_id.as_str()),
            Value::from(group.name.as_str()),
            Value::from(group.college.as_str()),
            Value::from(group.major.as_str()),
            Value::from(group.administrative_class.as_str()),
            decimal_value(group.total_cost),
        ]);
    }

    let mut detail_headers = to_headers(&DETAIL_HEADERS);
    detail_headers.extend(report.extra_columns.iter().cloned());
    detail_headers.push("单册价格".to_string());
    detail_headers.push("个人总计".to_string());

    let mut details = SheetData::new(DETAIL_SHEET, detail_headers);
    for detail in &report.details {
        let student = &detail.record.student;
        let mut row = vec![
            Value::from(student.student_id.as_str()),
            Value::from(student.name.as_str()),
            student.college.as_deref().map(Value::from).unwrap_or_default(),
            Value::from(student.major.as_str()),
            Value::from(student.administrative_class.as_str()),
            Value::from(student.book_isbn.as_str()),
        ];
        row.extend(student.extra.iter().cloned());
        row.push(decimal_value(detail.record.unit_price));
        row.push(decimal_value(detail.student_total));
        details.rows.push(row);
    }

    let s = &report.summary;
    let mut stats = SheetData::new(STATS_SHEET, to_headers(&STATS_HEADERS));
    stats.rows.push(vec![
        Value::from(s.timestamp_display()),
        Value::from(s.keyword.as_str()),
        Value::from(s.matched_colleges_display()),
        Value::from(s.price_column.as_str()),
        Value::Number(s.total_students as f64),
        decimal_value(s.total_cost),
        decimal_value(s.mean_cost.round_dp(2)),
    ]);

    vec![summary, details, stats]
}

/// `教材费用统计_{keyword}_{YYYYmmdd_HHMMSS}.xlsx`
pub fn report_file_name(keyword: &str, timestamp: &DateTime<Local>) -> String {
    let keyword: String = keyword
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!(
        "教材费用统计_{}_{}.xlsx",
        keyword,
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

fn to_headers(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| s.to_string()).collect()
}

fn decimal_value(d: Decimal) -> Value {
    d.to_f64().map(Value::Number).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_report_file_name() {
        let ts = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();

        assert_eq!(
            report_file_name("计算机", &ts),
            "教材费用统计_计算机_20240305_140709.xlsx"
        );
        assert_eq!(
            report_file_name("a/b\\c", &ts),
            "教材费用统计_a_b_c_20240305_140709.xlsx"
        );
    }

    #[test]
    fn test_unsupported_extension() {
        let sheets = [SheetData::new("S", vec!["a".to_string()])];

        let err = write_workbook("report.ods", &sheets).unwrap_err();
        assert!(err.to_string().contains("ODS"));

        assert!(write_workbook("report.csv", &sheets).is_err());
    }
}
