//! College filtering and cost aggregation

use chrono::{DateTime, Local};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{NoMatchError, OverflowError, PipelineError};
use crate::join::JoinedRecord;

/// Total spend of one student within the filtered set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummaryRow {
    pub student_id: String,
    pub name: String,
    pub college: String,
    pub major: String,
    pub administrative_class: String,
    pub total_cost: Decimal,
}

/// A filtered purchase row annotated with its student's total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    #[serde(flatten)]
    pub record: JoinedRecord,
    pub student_total: Decimal,
}

/// Audit record of one report run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub timestamp: DateTime<Local>,
    pub keyword: String,
    /// Distinct colleges in the filtered set, in first-appearance order
    pub matched_colleges: Vec<String>,
    /// Source label of the column used as the discounted price
    pub price_column: String,
    pub total_students: usize,
    pub total_cost: Decimal,
    pub mean_cost: Decimal,
}

impl RunSummary {
    pub fn matched_colleges_display(&self) -> String {
        self.matched_colleges.join(", ")
    }

    pub fn timestamp_display(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Result tables of the aggregation stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub groups: Vec<GroupSummaryRow>,
    pub details: Vec<DetailRow>,
    pub matched_colleges: Vec<String>,
    /// Sum of the group totals
    pub total_cost: Decimal,
}

impl Aggregation {
    /// Distinct student numbers across the group rows
    pub fn total_students(&self) -> usize {
        self.groups
            .iter()
            .map(|g| g.student_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Rows whose college contains `keyword` (case-sensitive). Rows without a
/// college never match.
pub fn filter_by_college<'a>(records: &'a [JoinedRecord], keyword: &str) -> Vec<&'a JoinedRecord> {
    records
        .iter()
        .filter(|r| {
            r.student
                .college
                .as_deref()
                .is_some_and(|college| college.contains(keyword))
        })
        .collect()
}

/// Up to `limit` distinct colleges, in first-appearance order
pub fn distinct_colleges<'a, I>(records: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a JoinedRecord>,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter_map(|r| r.student.college.as_deref())
        .filter(|college| seen.insert(*college))
        .take(limit)
        .map(str::to_string)
        .collect()
}

/// Filter by college keyword and compute per-student totals.
///
/// An empty filter result is fatal: the error suggests up to `sample_limit`
/// colleges from the unfiltered records. Totals beyond the decimal range fail
/// with [`OverflowError`].
pub fn aggregate(
    records: &[JoinedRecord],
    keyword: &str,
    sample_limit: usize,
) -> Result<Aggregation, PipelineError> {
    let filtered = filter_by_college(records, keyword);

    if filtered.is_empty() {
        return Err(NoMatchError {
            keyword: keyword.to_string(),
            available: distinct_colleges(records, sample_limit),
        }
        .into());
    }

    let matched_colleges = distinct_colleges(filtered.iter().copied(), usize::MAX);

    // Group rows come out ordered by the composite key
    let mut groups: BTreeMap<(&str, &str, &str, &str, &str), Decimal> = BTreeMap::new();
    let mut student_totals: HashMap<&str, Decimal> = HashMap::new();

    for record in &filtered {
        let s = &record.student;
        let key = (
            s.student_id.as_str(),
            s.name.as_str(),
            s.college.as_deref().unwrap_or_default(),
            s.major.as_str(),
            s.administrative_class.as_str(),
        );
        add_cost(groups.entry(key).or_default(), record.unit_price, &s.student_id)?;
        add_cost(
            student_totals.entry(s.student_id.as_str()).or_default(),
            record.unit_price,
            &s.student_id,
        )?;
    }

    let groups: Vec<GroupSummaryRow> = groups
        .into_iter()
        .map(
            |((student_id, name, college, major, class), total_cost)| GroupSummaryRow {
                student_id: student_id.to_string(),
                name: name.to_string(),
                college: college.to_string(),
                major: major.to_string(),
                administrative_class: class.to_string(),
                total_cost,
            },
        )
        .collect();

    let total_cost = groups
        .iter()
        .try_fold(Decimal::ZERO, |total, g| total.checked_add(g.total_cost))
        .ok_or(OverflowError::RunTotal)?;

    let details = filtered
        .iter()
        .map(|record| DetailRow {
            record: (*record).clone(),
            student_total: student_totals
                .get(record.student.student_id.as_str())
                .copied()
                .unwrap_or_default(),
        })
        .collect();

    Ok(Aggregation {
        groups,
        details,
        matched_colleges,
        total_cost,
    })
}

fn add_cost(total: &mut Decimal, price: Decimal, student_id: &str) -> Result<(), OverflowError> {
    *total = total
        .checked_add(price)
        .ok_or_else(|| OverflowError::StudentTotal {
            student_id: student_id.to_string(),
        })?;
    Ok(())
}

/// Build the run summary for an aggregation
pub fn summarize(
    aggregation: &Aggregation,
    keyword: &str,
    price_column: &str,
    timestamp: DateTime<Local>,
) -> RunSummary {
    let total_students = aggregation.total_students();
    let total_cost = aggregation.total_cost;
    let mean_cost = total_cost
        .checked_div(Decimal::from(total_students as u64))
        .unwrap_or_default();

    RunSummary {
        timestamp,
        keyword: keyword.to_string(),
        matched_colleges: aggregation.matched_colleges.clone(),
        price_column: price_column.to_string(),
        total_students,
        total_cost,
        mean_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::StudentRecord;
    use std::str::FromStr;

    fn record(id: &str, college: Option<&str>, isbn: &str, price: &str) -> JoinedRecord {
        JoinedRecord {
            student: StudentRecord {
                student_id: id.to_string(),
                name: format!("name-{id}"),
                college: college.map(str::to_string),
                major: "专业".to_string(),
                administrative_class: "1班".to_string(),
                book_isbn: isbn.to_string(),
                extra: Vec::new(),
            },
            unit_price: dec(price),
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_substring_filter() {
        let records = vec![
            record("1", Some("计算机学院"), "111", "10"),
            record("2", Some("计算机科学与技术学院"), "111", "10"),
            record("3", Some("外国语学院"), "111", "10"),
            record("4", None, "111", "10"),
        ];

        let matched: Vec<_> = filter_by_college(&records, "计算机")
            .iter()
            .map(|r| r.student.student_id.as_str())
            .collect();
        assert_eq!(matched, vec!["1", "2"]);

        // The empty keyword matches every college that is present
        assert_eq!(filter_by_college(&records, "").len(), 3);

        // Case-sensitive
        let records = vec![record("1", Some("School of Law"), "111", "10")];
        assert!(filter_by_college(&records, "law").is_empty());
    }

    #[test]
    fn test_no_match_lists_available_colleges() {
        let records = vec![
            record("1", Some("文学院"), "111", "10"),
            record("2", Some("文学院"), "222", "20"),
        ];

        let err = aggregate(&records, "计算机", 10).unwrap_err();

        assert_eq!(
            err,
            PipelineError::NoMatch(NoMatchError {
                keyword: "计算机".to_string(),
                available: vec!["文学院".to_string()],
            })
        );
    }

    #[test]
    fn test_no_match_sample_is_limited() {
        let records: Vec<_> = (0..15)
            .map(|i| record(&i.to_string(), Some(&format!("学院{i}")), "111", "1"))
            .collect();

        let Err(PipelineError::NoMatch(err)) = aggregate(&records, "计算机", 10) else {
            panic!("expected a NoMatch error");
        };

        assert_eq!(err.available.len(), 10);
        assert_eq!(err.available[0], "学院0");
        assert_eq!(err.available[9], "学院9");
    }

    #[test]
    fn test_group_and_detail_totals() {
        let records = vec![
            record("2", Some("计算机学院"), "111", "50"),
            record("1", Some("计算机学院"), "111", "50"),
            record("2", Some("计算机学院"), "222", "12.5"),
            record("3", Some("外国语学院"), "222", "12.5"),
        ];

        let agg = aggregate(&records, "计算机", 10).unwrap();

        assert_eq!(agg.groups.len(), 2);
        assert_eq!(agg.groups[0].student_id, "1");
        assert_eq!(agg.groups[0].total_cost, dec("50"));
        assert_eq!(agg.groups[1].student_id, "2");
        assert_eq!(agg.groups[1].total_cost, dec("62.5"));

        // Detail rows keep filtered order and carry the student total
        let details: Vec<_> = agg
            .details
            .iter()
            .map(|d| (d.record.student.student_id.as_str(), d.student_total))
            .collect();
        assert_eq!(
            details,
            vec![("2", dec("62.5")), ("1", dec("50")), ("2", dec("62.5"))]
        );
        assert_eq!(agg.matched_colleges, vec!["计算机学院"]);
    }

    #[test]
    fn test_summary_invariants() {
        let records = vec![
            record("1", Some("计算机学院"), "111", "50"),
            record("2", Some("计算机科学与技术学院"), "111", "50"),
            record("2", Some("计算机科学与技术学院"), "222", "25"),
        ];
        let agg = aggregate(&records, "计算机", 10).unwrap();
        let summary = summarize(&agg, "计算机", "折后价", Local::now());

        assert_eq!(summary.total_students, 2);
        assert_eq!(summary.total_cost, dec("125"));
        assert_eq!(
            summary.total_cost,
            agg.groups.iter().map(|g| g.total_cost).sum::<Decimal>()
        );
        assert_eq!(summary.mean_cost, dec("62.5"));
        assert_eq!(
            summary.matched_colleges_display(),
            "计算机学院, 计算机科学与技术学院"
        );
        assert_eq!(summary.price_column, "折后价");
    }

    #[test]
    fn test_distinct_students_not_group_rows() {
        // Same student number under two spellings of the name: two group rows, one student
        let mut renamed = record("1", Some("计算机学院"), "222", "30");
        renamed.student.name = "another".to_string();
        let records = vec![record("1", Some("计算机学院"), "111", "10"), renamed];

        let agg = aggregate(&records, "计算机", 10).unwrap();
        let summary = summarize(&agg, "计算机", "折后价", Local::now());

        assert_eq!(agg.groups.len(), 2);
        assert_eq!(summary.total_students, 1);
        assert_eq!(summary.mean_cost, dec("40"));
        assert!(agg.details.iter().all(|d| d.student_total == dec("40")));
    }

    #[test]
    fn test_student_total_overflow_is_an_error() {
        let records = vec![
            record("S1", Some("计算机学院"), "111", "50000000000000000000000000000"),
            record("S1", Some("计算机学院"), "222", "50000000000000000000000000000"),
        ];

        let err = aggregate(&records, "计算机", 10).unwrap_err();

        assert_eq!(
            err,
            PipelineError::Overflow(OverflowError::StudentTotal {
                student_id: "S1".to_string()
            })
        );
    }

    #[test]
    fn test_run_total_overflow_is_an_error() {
        // Each student fits on their own, the sum across students does not
        let records = vec![
            record("S1", Some("计算机学院"), "111", "50000000000000000000000000000"),
            record("S2", Some("计算机学院"), "111", "50000000000000000000000000000"),
        ];

        let err = aggregate(&records, "计算机", 10).unwrap_err();

        assert_eq!(err, PipelineError::Overflow(OverflowError::RunTotal));
    }
}
