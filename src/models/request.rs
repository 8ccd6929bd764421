//! Parameters of a single person/region lookup.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifies one person/region query against the bailiff service.
///
/// Immutable once built; the protocol client only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSpec {
    /// Owner of the query in the downstream store.
    pub client_id: i64,
    pub last_name: String,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub birth_date: NaiveDate,
    /// Region number in the site's own numbering.
    pub region_code: u32,
    /// Downstream request id, if the query was issued on behalf of one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<i64>,
}

impl RequestSpec {
    /// Create a new request spec without a middle name or request id.
    pub fn new(
        client_id: i64,
        last_name: impl Into<String>,
        first_name: impl Into<String>,
        birth_date: NaiveDate,
        region_code: u32,
    ) -> Self {
        Self {
            client_id,
            last_name: last_name.into(),
            first_name: first_name.into(),
            middle_name: None,
            birth_date,
            region_code,
            request_id: None,
        }
    }

    pub fn with_middle_name(mut self, middle_name: impl Into<String>) -> Self {
        self.middle_name = Some(middle_name.into());
        self
    }

    pub fn with_request_id(mut self, request_id: i64) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Birth date in the form the search form expects (`DD.MM.YYYY`).
    pub fn birth_date_param(&self) -> String {
        self.birth_date.format("%d.%m.%Y").to_string()
    }

    /// Short label for logs.
    pub fn label(&self) -> String {
        format!("client #{} ({})", self.client_id, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_birth_date_param() {
        let spec = RequestSpec::new(
            7,
            "Иванов",
            "Иван",
            NaiveDate::from_ymd_opt(1975, 11, 3).unwrap(),
            77,
        );
        assert_eq!(spec.birth_date_param(), "03.11.1975");
    }

    #[test]
    fn test_deserialize_optional_fields() {
        let json = r#"{
            "client_id": 12,
            "last_name": "Петров",
            "first_name": "Пётр",
            "birth_date": "1980-01-31",
            "region_code": 39
        }"#;
        let spec: RequestSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.middle_name, None);
        assert_eq!(spec.request_id, None);
        assert_eq!(spec.region_code, 39);
    }
}
