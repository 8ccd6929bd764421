//! Persisted state of a batch run.

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize};

/// Timestamp format of the tracker file.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Snapshot of a running batch. Every field must be present in the file,
/// optional ones as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseState {
    #[serde(rename = "startDate", with = "datetime")]
    pub start_date: NaiveDateTime,
    #[serde(rename = "processId")]
    pub process_id: u32,
    #[serde(rename = "countSuccess")]
    pub success_count: u64,
    #[serde(
        rename = "lastSuccessDate",
        serialize_with = "datetime::serialize_opt",
        deserialize_with = "datetime::deserialize_opt"
    )]
    pub last_success_date: Option<NaiveDateTime>,
    #[serde(
        rename = "lastErrorDate",
        serialize_with = "datetime::serialize_opt",
        deserialize_with = "datetime::deserialize_opt"
    )]
    pub last_error_date: Option<NaiveDateTime>,
    #[serde(rename = "lastError", deserialize_with = "required_option")]
    pub last_error_message: Option<String>,
}

impl ParseState {
    pub fn new(process_id: u32, started_at: NaiveDateTime) -> Self {
        Self {
            start_date: started_at,
            process_id,
            success_count: 0,
            last_success_date: None,
            last_error_date: None,
            last_error_message: None,
        }
    }

    /// Fresh state for the current process.
    pub fn for_current_process() -> Self {
        Self::new(std::process::id(), now())
    }

    pub fn record_success(&mut self, at: NaiveDateTime) {
        self.success_count += 1;
        self.last_success_date = Some(at);
    }

    pub fn record_error(&mut self, message: &str, at: NaiveDateTime) {
        self.last_error_date = Some(at);
        self.last_error_message = Some(message.to_string());
    }

    /// Successful queries per hour since start, two decimals. Zero before any time has passed.
    pub fn average_per_hour(&self, now: NaiveDateTime) -> f64 {
        let seconds = (now - self.start_date).num_seconds();
        if seconds <= 0 {
            return 0.0;
        }
        let rate = self.success_count as f64 / (seconds as f64 / 3600.0);
        (rate * 100.0).round() / 100.0
    }
}

/// Local wall-clock time truncated to whole seconds, as stored in the file.
pub fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

fn required_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

mod datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, DATE_FORMAT).map_err(serde::de::Error::custom)
    }

    pub fn serialize_opt<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize_opt<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| NaiveDateTime::parse_from_str(&raw, DATE_FORMAT))
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}
