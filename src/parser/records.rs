//! Results table extraction.

use scraper::{ElementRef, Html};

use super::ParseError;
use crate::models::{ProceedingBatch, RawProceedingRecord};

/// Cells in a well-formed results row.
const ROW_CELLS: usize = 8;

/// Turns the results fragment into proceeding records.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse an HTML fragment. Client and request ids are left unset.
    pub fn parse(&self, document: &str) -> Result<ProceedingBatch, ParseError> {
        self.parse_html(&Html::parse_document(document))
    }

    /// Parse an already built DOM.
    ///
    /// Exactly one table is expected; rows without eight cells (headers,
    /// group captions) are skipped.
    pub fn parse_html(&self, html: &Html) -> Result<ProceedingBatch, ParseError> {
        let tables: Vec<ElementRef> = html.select(selector!("table")).collect();
        if tables.len() != 1 {
            return Err(ParseError::StructureMismatch(format!(
                "expected exactly one results table, found {}",
                tables.len()
            )));
        }

        let mut batch = ProceedingBatch::new();
        for row in tables[0].select(selector!("tr")) {
            let cells: Vec<String> = row
                .select(selector!("td"))
                .map(|cell| cell.text().collect::<String>())
                .collect();

            if let Ok(cells) = <[String; ROW_CELLS]>::try_from(cells) {
                batch.push(RawProceedingRecord::from_cells(&cells));
            }
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(prefix: &str) -> String {
        let cells: String = (0..8)
            .map(|i| format!("<td>{}-{}</td>", prefix, i))
            .collect();
        format!("<tr>{}</tr>", cells)
    }

    #[test]
    fn test_keeps_only_eight_cell_rows() {
        let html = format!(
            "<table><tr><td>Регион</td><td>x</td><td>y</td></tr>{}{}{}</table>",
            row("a"),
            row("b"),
            row("c")
        );
        let batch = ResponseParser::new().parse(&html).unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.records()[0].subject_description, "a-0");
        assert_eq!(batch.records()[2].bailiff, "c-7");
        assert_eq!(batch.records()[1].termination_info.as_deref(), Some("b-3"));
        assert_eq!(batch.client_id, None);
    }

    #[test]
    fn test_cell_text_includes_nested_markup() {
        let html = "<table><tr><td><b>ИВАНОВ</b> ИВАН</td><td>1</td><td>2</td><td> </td>\
                    <td><a href=\"#\">x</a></td><td>5</td><td>6</td><td>7</td></tr></table>";
        let batch = ResponseParser::new().parse(html).unwrap();
        let record = &batch.records()[0];
        assert_eq!(record.subject_description, "ИВАНОВ ИВАН");
        assert_eq!(record.termination_info, None);
    }

    #[test]
    fn test_table_count_mismatch_is_structural() {
        for html in [
            "<div>nothing here</div>".to_string(),
            format!("<table>{}</table><table>{}</table>", row("a"), row("b")),
        ] {
            assert!(matches!(
                ResponseParser::new().parse(&html),
                Err(ParseError::StructureMismatch(_))
            ));
        }
    }
}
