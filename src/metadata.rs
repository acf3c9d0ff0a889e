use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

/// Seconds from the load request to each milestone.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Timing {
    #[serde(serialize_with = "seconds")]
    pub start: f64,
    #[serde(serialize_with = "seconds")]
    pub load: f64,
    #[serde(serialize_with = "seconds")]
    pub finish: f64,
}

/// Largest magnitude below which every whole `f64` converts exactly to `i64`.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Whole seconds print without a fractional part (`1`, not `1.0`).
fn seconds<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < EXACT_INTEGER_LIMIT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

impl Timing {
    pub fn from_durations(start: Duration, load: Duration, finish: Duration) -> Self {
        Self {
            start: start.as_secs_f64(),
            load: load.as_secs_f64(),
            finish: finish.as_secs_f64(),
        }
    }
}

/// Summary of one page load. Field names serialize in the form templates reference
/// (`{{.Title}}`, `{{.URI}}`, `{{.Timing.Load}}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "URI")]
    pub uri: String,
    #[serde(rename = "Timing")]
    pub timing: Timing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_converts_durations_to_seconds() {
        let timing = Timing::from_durations(
            Duration::from_millis(120),
            Duration::from_millis(1500),
            Duration::from_secs(2),
        );
        assert!((timing.start - 0.12).abs() < 1e-9);
        assert!((timing.load - 1.5).abs() < 1e-9);
        assert!((timing.finish - 2.0).abs() < 1e-9);
    }

    #[test]
    fn whole_seconds_serialize_without_a_fraction() {
        let timing = Timing {
            start: 0.0,
            load: 0.75,
            finish: 3.0,
        };
        assert_eq!(
            serde_json::to_string(&timing).unwrap(),
            r#"{"Start":0,"Load":0.75,"Finish":3}"#
        );
    }
}
