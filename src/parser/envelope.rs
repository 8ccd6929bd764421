//! JSONP envelope handling.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::ParseError;

fn line_break_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("line break pattern is valid"))
}

/// Extract the HTML fragment from a `callback({... "data": "<html>" ...});` body.
///
/// The JSON object is the span from the first `{` to the last `}`. Line
/// breaks in the fragment are flattened to spaces.
pub fn unwrap_envelope(body: &str) -> Result<String, ParseError> {
    let (start, end) = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(ParseError::MalformedResponse(
                "no JSON object in response".to_string(),
            ))
        }
    };

    let json: Value = serde_json::from_str(&body[start..=end])
        .map_err(|e| ParseError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let data = json
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::MalformedResponse("missing `data` field".to_string()))?;

    Ok(line_break_pattern().replace_all(data, " ").into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwraps_jsonp() {
        let body = r#"jQuery340_171({"data":"<div>a<br>b<br/>c<BR />d</div>","err":""});"#;
        assert_eq!(unwrap_envelope(body).unwrap(), "<div>a b c d</div>");
    }

    #[test]
    fn test_missing_data_is_malformed() {
        for body in ["", "callback();", r#"cb({"err":"x"});"#, r#"cb({"data": 5});"#, "cb({oops});"] {
            assert!(matches!(
                unwrap_envelope(body),
                Err(ParseError::MalformedResponse(_))
            ));
        }
    }
}
