use bookcost_core::writer::{DETAIL_SHEET, STATS_SHEET, SUMMARY_SHEET};
use bookcost_core::{Pipeline, SheetData, Table, Value, read_table, write_report, write_workbook};
use chrono::{Local, TimeZone};
use tempfile::tempdir;

fn text(s: &str) -> Value {
    Value::from(s)
}

fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => *n,
        other => panic!("expected a number, got {other:?}"),
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn inputs() -> (Table, Table) {
    let students = Table::from_rows(
        vec!["学号", "姓名", "学院", "专业", "行政班", "ISBN", "手机"],
        vec![
            vec![text("S1"), text("张三"), text("计算机学院"), text("软件工程"), text("软工1班"), text("111"), text("138")],
            vec![text("S1"), text("张三"), text("计算机学院"), text("软件工程"), text("软工1班"), text("222"), text("138")],
            vec![text("S2"), text("李四"), text("计算机学院"), text("软件工程"), text("软工2班"), text("111"), Value::Empty],
        ],
    );
    let books = Table::from_rows(
        vec!["ISBN", "折后价"],
        vec![
            vec![text("111"), Value::Number(50.0)],
            vec![text("222"), text("33.335")],
        ],
    );
    (students, books)
}

#[test]
fn test_report_workbook_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("report.xlsx");
    let timestamp = Local.with_ymd_and_hms(2024, 9, 1, 8, 30, 0).unwrap();
    let (students, books) = inputs();

    let report = Pipeline::new()
        .run_at(students, books, "计算机", timestamp)
        .unwrap();
    write_report(&path, &report).unwrap();

    // First sheet is the group summary
    let summary = read_table(&path, None).unwrap();
    assert_eq!(
        summary.columns,
        vec!["学号", "姓名", "学院", "专业", "行政班", "教材采购总费用"]
    );
    assert_eq!(summary.len(), 2);
    assert_eq!(summary.get(0, "学号"), Some(&text("S1")));
    assert!(approx_eq(number(summary.get(0, "教材采购总费用")), 83.335));
    assert!(approx_eq(number(summary.get(1, "教材采购总费用")), 50.0));

    let details = read_table(&path, Some(DETAIL_SHEET)).unwrap();
    assert_eq!(
        details.columns,
        vec!["学号", "姓名", "学院", "专业", "行政班", "ISBN", "手机", "单册价格", "个人总计"]
    );
    assert_eq!(details.len(), 3);
    assert_eq!(details.get(1, "ISBN"), Some(&text("222")));
    assert!(approx_eq(number(details.get(1, "个人总计")), 83.335));
    assert!(details.get(2, "手机").is_none_or(Value::is_missing));

    let stats = read_table(&path, Some(STATS_SHEET)).unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats.get(0, "统计时间"), Some(&text("2024-09-01 08:30:00")));
    assert_eq!(stats.get(0, "目标学院关键词"), Some(&text("计算机")));
    assert_eq!(stats.get(0, "价格列来源"), Some(&text("折后价")));
    assert!(approx_eq(number(stats.get(0, "总学生数")), 2.0));
    // Mean is rounded to cents on output
    assert!(approx_eq(number(stats.get(0, "人均费用")), 66.67));
}

#[test]
fn test_report_sheet_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("report.xlsx");
    let (students, books) = inputs();

    let report = Pipeline::new().run(students, books, "计算机").unwrap();
    write_report(&path, &report).unwrap();

    assert!(read_table(&path, Some(SUMMARY_SHEET)).is_ok());
    assert!(read_table(&path, Some(DETAIL_SHEET)).is_ok());
    assert!(read_table(&path, Some(STATS_SHEET)).is_ok());
    assert!(read_table(&path, Some("Sheet1")).is_err());
}

#[test]
fn test_generic_workbook_escapes_text() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.xlsx");
    let sheet = SheetData {
        name: "Data".to_string(),
        headers: vec!["name".to_string(), "flag".to_string()],
        rows: vec![vec![text("a < b & c"), Value::Boolean(true)]],
    };

    write_workbook(&path, &[sheet]).unwrap();

    let table = read_table(&path, Some("Data")).unwrap();
    assert_eq!(table.get(0, "name"), Some(&text("a < b & c")));
    assert_eq!(table.get(0, "flag"), Some(&Value::Boolean(true)));
}
