//! JSON query file loader.

use std::fs;
use std::path::Path;

use crate::domain::error::ScreenerError;
use crate::domain::query::QueryState;

pub fn load_query<P: AsRef<Path>>(path: P) -> Result<QueryState, ScreenerError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    parse_query(&content).map_err(|e| match e {
        ScreenerError::QueryParse { reason, .. } => ScreenerError::QueryParse {
            file: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

pub fn parse_query(content: &str) -> Result<QueryState, ScreenerError> {
    serde_json::from_str(content).map_err(|e| ScreenerError::QueryParse {
        file: "<inline>".to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::{RightOperand, TimeModifierMode};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const QUERY: &str = r#"{
        "name": "EMA cross",
        "groups": [{
            "id": "daily",
            "logic": "AND",
            "timeframe": "1d",
            "conditions": [
                {
                    "leftIndicator": "ema", "leftParams": {"period": 9},
                    "operator": "crossed_above",
                    "rightType": "indicator", "rightIndicator": "ema",
                    "rightParams": {"period": 21},
                    "timeModifier": true, "timeModifierMode": "within_last",
                    "timeModifierBars": 3
                },
                {"leftIndicator": "rsi", "operator": "is_between",
                 "rightValue": "40", "rightValue2": 70}
            ]
        }]
    }"#;

    #[test]
    fn load_query_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", QUERY).unwrap();

        let query = load_query(file.path()).unwrap();
        assert_eq!(query.name, "EMA cross");
        let conditions = &query.groups[0].conditions;
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].left.period(20), 9);
        assert_eq!(conditions[0].time_modifier, Some(TimeModifierMode::WithinLast));
        assert_eq!(conditions[0].modifier_bars, Some(3));
        assert!(matches!(&conditions[0].right, RightOperand::Series { indicator, multiplier }
            if indicator.period(20) == 21 && *multiplier == 1.0));
        assert_eq!(conditions[1].right, RightOperand::range(40.0, 70.0));
    }

    #[test]
    fn malformed_json_names_the_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{\"groups\": [").unwrap();

        let err = load_query(file.path()).unwrap_err();
        let expected = file.path().display().to_string();
        assert!(matches!(err, ScreenerError::QueryParse { file, .. } if file == expected));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_query("/nonexistent/query.json").unwrap_err();
        assert!(matches!(err, ScreenerError::Io(_)));
    }

    #[test]
    fn empty_object_is_empty_query() {
        let query = parse_query("{}").unwrap();
        assert!(query.groups.is_empty());
    }
}
