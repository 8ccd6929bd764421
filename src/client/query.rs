//! Query string of the search endpoint.

use super::session::Nonce;
use crate::models::RequestSpec;

/// Ordered key/value pairs sent to `ajax_search`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pairs: Vec<(&'static str, String)>,
}

impl SearchQuery {
    /// Extended search by person name and birth date in one region.
    pub fn build(spec: &RequestSpec, nonce: &Nonce, code: Option<&str>, page: Option<u32>) -> Self {
        let mut pairs = vec![
            ("system", "ip".to_string()),
            ("nocache", "1".to_string()),
            ("is[extended]", "1".to_string()),
            ("is[variant]", "1".to_string()),
            ("is[last_name]", spec.last_name.clone()),
            ("is[first_name]", spec.first_name.clone()),
            ("is[patronymic]", spec.middle_name.clone().unwrap_or_default()),
            ("is[date]", spec.birth_date_param()),
            ("is[region_id][0]", spec.region_code.to_string()),
            ("_", nonce.timestamp.to_string()),
            ("callback", nonce.callback.clone()),
        ];
        if let Some(code) = code {
            pairs.push(("code", code.to_string()));
        }
        if let Some(page) = page {
            pairs.push(("page", page.to_string()));
        }
        Self { pairs }
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn spec() -> RequestSpec {
        RequestSpec::new(
            5,
            "Иванов",
            "Иван",
            NaiveDate::from_ymd_opt(1980, 1, 2).unwrap(),
            77,
        )
    }

    fn nonce() -> Nonce {
        Nonce {
            callback: "jQuery12345678901234567890_1700000000".to_string(),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_base_parameters() {
        let query = SearchQuery::build(&spec(), &nonce(), None, None);
        assert_eq!(query.get("system"), Some("ip"));
        assert_eq!(query.get("is[patronymic]"), Some(""));
        assert_eq!(query.get("is[date]"), Some("02.01.1980"));
        assert_eq!(query.get("is[region_id][0]"), Some("77"));
        assert_eq!(query.get("_"), Some("1700000000"));
        assert_eq!(query.get("code"), None);
        assert_eq!(query.get("page"), None);
    }

    #[test]
    fn test_code_and_page() {
        let spec = spec().with_middle_name("Иванович");
        let query = SearchQuery::build(&spec, &nonce(), Some("абв12"), Some(3));
        assert_eq!(query.get("is[patronymic]"), Some("Иванович"));
        assert_eq!(query.get("code"), Some("абв12"));
        assert_eq!(query.get("page"), Some("3"));
    }
}
