//! Extraction of the `bstp` stop array the route page injects into its script.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::js_literal::{self, LiteralError};
use crate::model::StopRecord;

static BSTP_ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var\s+bstp\s*=\s*").expect("valid bstp regex"));

/// Returns the stops of the `var bstp = [...]` assignment in `html`.
///
/// `Ok(None)` means the page has no such assignment. Elements that aren't
/// objects are skipped.
pub fn extract_stops(html: &str) -> Result<Option<Vec<StopRecord>>, LiteralError> {
    let Some(assignment) = BSTP_ASSIGNMENT.find(html) else {
        return Ok(None);
    };

    let (value, _) = js_literal::parse_prefix(&html[assignment.end()..])?;

    let Value::Array(items) = value else {
        return Ok(None);
    };

    let stops = items
        .iter()
        .filter_map(Value::as_object)
        .map(StopRecord::from_raw)
        .collect();

    Ok(Some(stops))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_quoted_stop() -> Result<(), anyhow::Error> {
        let html = r#"<script>
            var sid = 'abc';
            var bstp = [{'stop_id':'1','stop_name':'A','lat':'1.23','lng':'4.56','dr':'N','zone':'Z'}];
        </script>"#;

        let stops = extract_stops(html)?.unwrap();

        assert_eq!(
            stops,
            vec![StopRecord {
                id: "1".into(),
                name: "A".into(),
                lat: 1.23,
                lng: 4.56,
                direction: "N".into(),
                zone: "Z".into(),
            }]
        );

        Ok(())
    }

    #[test]
    fn missing_assignment_is_none() -> Result<(), anyhow::Error> {
        assert_eq!(extract_stops("<script>var sid = 'abc';</script>")?, None);

        Ok(())
    }

    #[test]
    fn empty_array_is_empty() -> Result<(), anyhow::Error> {
        assert_eq!(extract_stops("var bstp = [];")?, Some(vec![]));

        Ok(())
    }

    #[test]
    fn malformed_array_is_error() {
        assert!(extract_stops("var bstp = [{'stop_id': '1'};").is_err());
    }

    #[test]
    fn deeply_nested_array_is_error() {
        let html = format!("var bstp = {};", "[".repeat(200_000));

        assert!(extract_stops(&html).is_err());
    }
}
