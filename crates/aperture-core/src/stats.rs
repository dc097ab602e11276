//! Read-side aggregate counters over all persisted records.

use serde::{Deserialize, Serialize};

use crate::types::{ImageRecord, ImageStatus};

/// Summary counters computed on demand. Pure read-side computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    /// Count of all items ever inserted, any status
    pub total: usize,

    /// Count of items with status `failed`
    pub failed: usize,

    /// successes/total as a percentage with two decimal places ("0%" when
    /// there are no items)
    pub success_rate: String,

    /// Mean of `processing_time_seconds` where set, rounded to two
    /// decimals; 0 when no item has one
    pub average_processing_time_seconds: f64,
}

/// Compute summary counters over all records.
///
/// Items still `processing` count toward `total` but neither `failed` nor
/// the success rate numerator.
pub fn compute(records: &[ImageRecord]) -> StatsSummary {
    let total = records.len();
    let failed = records
        .iter()
        .filter(|r| r.status == ImageStatus::Failed)
        .count();
    let success = records
        .iter()
        .filter(|r| r.status == ImageStatus::Success)
        .count();

    let success_rate = if total > 0 {
        format!("{:.2}%", success as f64 / total as f64 * 100.0)
    } else {
        "0%".to_string()
    };

    let times: Vec<f64> = records
        .iter()
        .filter_map(|r| r.processing_time_seconds)
        .collect();
    let average_processing_time_seconds = if times.is_empty() {
        0.0
    } else {
        let mean = times.iter().sum::<f64>() / times.len() as f64;
        (mean * 100.0).round() / 100.0
    };

    StatsSummary {
        total,
        failed,
        success_rate,
        average_processing_time_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImageMetadata, ImageRecord, TerminalOutcome};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn success_record(id: &str, seconds: f64) -> ImageRecord {
        let mut record = ImageRecord::new(id, format!("{id}.png"));
        record.apply_terminal(
            TerminalOutcome::Success {
                metadata: ImageMetadata {
                    width: 1,
                    height: 1,
                    format: "png".to_string(),
                    size_bytes: 1,
                    exif: BTreeMap::new(),
                    caption: None,
                },
                processing_time_seconds: seconds,
            },
            Utc::now(),
        );
        record
    }

    fn failed_record(id: &str) -> ImageRecord {
        ImageRecord::rejected(id, format!("{id}.txt"), "invalid file format")
    }

    #[test]
    fn test_zero_items() {
        let stats = compute(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.success_rate, "0%");
        assert_eq!(stats.average_processing_time_seconds, 0.0);
    }

    #[test]
    fn test_mixture_counts() {
        let records = vec![
            success_record("a", 1.0),
            success_record("b", 2.0),
            failed_record("c"),
            ImageRecord::new("d", "d.png"), // still processing
        ];
        let stats = compute(&records);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.success_rate, "50.00%");
        assert_eq!(stats.average_processing_time_seconds, 1.5);
    }

    #[test]
    fn test_rate_has_two_decimals() {
        let records = vec![
            success_record("a", 1.0),
            failed_record("b"),
            failed_record("c"),
        ];
        let stats = compute(&records);
        assert_eq!(stats.success_rate, "33.33%");
    }

    #[test]
    fn test_average_rounds_to_two_decimals() {
        let records = vec![success_record("a", 0.333), success_record("b", 0.334)];
        let stats = compute(&records);
        assert_eq!(stats.average_processing_time_seconds, 0.33);
    }

    #[test]
    fn test_processing_items_excluded_from_average() {
        let records = vec![success_record("a", 4.0), ImageRecord::new("b", "b.png")];
        let stats = compute(&records);
        assert_eq!(stats.average_processing_time_seconds, 4.0);
    }
}
