//! Enforcement proceeding records as scraped from the search results table.

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One row of the results table, kept as raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProceedingRecord {
    /// Debtor name, birth date and region as printed by the site.
    pub subject_description: String,
    /// Proceeding number and opening date.
    pub production_number_and_date: String,
    /// Details of the enforcement document.
    pub document_details: String,
    /// Subject of execution (amounts owed).
    pub subject_of_execution: String,
    /// Bailiff department with address.
    pub department: String,
    /// Assigned bailiff with phone.
    pub bailiff: String,
    /// Termination data, raw. `None` when the cell is empty (proceeding still open).
    pub termination_info: Option<String>,
}

impl RawProceedingRecord {
    /// Build a record from the eight cell texts of a results row.
    ///
    /// Cell 4 holds the service-column (links) and is not kept.
    pub fn from_cells(cells: &[String; 8]) -> Self {
        let termination = &cells[3];
        Self {
            subject_description: cells[0].clone(),
            production_number_and_date: cells[1].clone(),
            document_details: cells[2].clone(),
            termination_info: (!termination.is_empty()).then(|| termination.clone()),
            subject_of_execution: cells[5].clone(),
            department: cells[6].clone(),
            bailiff: cells[7].clone(),
        }
    }

    /// Termination info in the canonical `date, article, part, point` form.
    pub fn normalized_termination(&self) -> Option<String> {
        self.termination_info
            .as_deref()
            .map(|raw| normalize_termination(raw, Local::now().date_naive()))
    }
}

/// Rewrite the site's termination text into `YYYY-MM-DD, N, M, K`.
///
/// Two shapes are recognised:
/// - three tokens (article 33, case transferred elsewhere): today's date, the
///   numeric tail of the third token, and dashes for the rest;
/// - seven tokens `DD.MM.YYYY ст. N ч. M п. K`.
///
/// Anything else is returned unchanged.
pub fn normalize_termination(raw: &str, today: NaiveDate) -> String {
    let tokens: Vec<&str> = raw.split_whitespace().collect();

    match tokens.as_slice() {
        [_, _, third] => {
            let tail = third.trim_start_matches(|c: char| !c.is_ascii_digit());
            let value = if tail.is_empty() { *third } else { tail };
            format!("{}, {}, -, -", today.format("%Y-%m-%d"), value)
        }
        [date, "ст.", article, "ч.", part, "п.", point] => {
            match NaiveDate::parse_from_str(date, "%d.%m.%Y") {
                Ok(date) => format!(
                    "{}, {}, {}, {}",
                    date.format("%Y-%m-%d"),
                    article,
                    part,
                    point
                ),
                Err(_) => raw.to_string(),
            }
        }
        _ => raw.to_string(),
    }
}

/// How the query was addressed. The protocol client only issues name queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestKind {
    pub by_client_name: bool,
    pub by_proceeding_number: bool,
}

impl Default for RequestKind {
    fn default() -> Self {
        Self {
            by_client_name: true,
            by_proceeding_number: false,
        }
    }
}

/// Accumulated result of one logical query.
///
/// Records are appended in page-walk order and never reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProceedingBatch {
    records: Vec<RawProceedingRecord>,
    pub client_id: Option<i64>,
    pub request_id: Option<i64>,
    pub task_start: NaiveDateTime,
    pub task_end: NaiveDateTime,
    pub kind: RequestKind,
}

impl Default for ProceedingBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl ProceedingBatch {
    pub fn new() -> Self {
        let now = Local::now().naive_local();
        Self {
            records: Vec::new(),
            client_id: None,
            request_id: None,
            task_start: now,
            task_end: now,
            kind: RequestKind::default(),
        }
    }

    pub fn push(&mut self, record: RawProceedingRecord) {
        self.records.push(record);
    }

    /// Append every record of `other`, keeping its order.
    pub fn extend(&mut self, other: ProceedingBatch) {
        self.records.extend(other.records);
    }

    /// Attach the owner of the query.
    pub fn tag(&mut self, client_id: i64, request_id: Option<i64>) {
        self.client_id = Some(client_id);
        self.request_id = request_id;
    }

    pub fn records(&self) -> &[RawProceedingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Mark the start of the task (first request of the query).
    pub fn mark_started(&mut self, at: NaiveDateTime) {
        self.task_start = at;
    }

    /// Mark the end of the task (last page walked).
    pub fn mark_finished(&mut self, at: NaiveDateTime) {
        self.task_end = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn cells(values: [&str; 8]) -> [String; 8] {
        values.map(|v| v.to_string())
    }

    #[test]
    fn test_normalize_full_form() {
        assert_eq!(
            normalize_termination("27.10.2021 ст. 46 ч. 1 п. 3", today()),
            "2021-10-27, 46, 1, 3"
        );
    }

    #[test]
    fn test_normalize_article_33_short_form() {
        assert_eq!(
            normalize_termination("ст.33 ч.1 п.2", today()),
            "2024-03-15, 2, -, -"
        );
    }

    #[test]
    fn test_normalize_passes_garbage_through() {
        assert_eq!(normalize_termination("garbled text", today()), "garbled text");
    }

    #[test]
    fn test_normalize_wrong_connectors_passes_through() {
        let raw = "27.10.2021 ст. 46 ч. 1 x. 3";
        assert_eq!(normalize_termination(raw, today()), raw);
    }

    #[test]
    fn test_normalize_bad_date_passes_through() {
        let raw = "31.02.2021 ст. 46 ч. 1 п. 3";
        assert_eq!(normalize_termination(raw, today()), raw);
    }

    #[test]
    fn test_from_cells_maps_columns() {
        let record = RawProceedingRecord::from_cells(&cells([
            "ИВАНОВ ИВАН 01.01.1980",
            "1/21/77025-ИП от 02.11.2021",
            "Судебный приказ",
            "",
            "links",
            "Задолженность: 100 руб.",
            "ОСП",
            "ПЕТРОВ П. П.",
        ]));
        assert_eq!(record.termination_info, None);
        assert_eq!(record.subject_of_execution, "Задолженность: 100 руб.");
        assert_eq!(record.bailiff, "ПЕТРОВ П. П.");
    }

    #[test]
    fn test_termination_cell_is_kept_raw() {
        let with_cell = |cell: &str| {
            RawProceedingRecord::from_cells(&cells(["", "", "", cell, "", "", "", ""]))
        };
        assert_eq!(with_cell(" ").termination_info.as_deref(), Some(" "));
        assert_eq!(
            with_cell(" 27.10.2021 ст. 46 ч. 1 п. 3 ").termination_info.as_deref(),
            Some(" 27.10.2021 ст. 46 ч. 1 п. 3 ")
        );
        assert_eq!(with_cell("").termination_info, None);
    }

    #[test]
    fn test_batch_extend_keeps_order() {
        let record = |name: &str| {
            RawProceedingRecord::from_cells(&cells([name, "", "", "", "", "", "", ""]))
        };
        let mut first = ProceedingBatch::new();
        first.push(record("a"));
        let mut second = ProceedingBatch::new();
        second.push(record("b"));
        second.push(record("c"));
        first.extend(second);

        let names: Vec<&str> = first
            .records()
            .iter()
            .map(|r| r.subject_description.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
