//! Representative species of a run
//!
//! The most frequent label wins. Ties go to the label that was heard first,
//! then to the alphabetically smaller label.

use crate::types::DetectionEvent;
use std::collections::HashMap;

/// Pick the primary species from a set of detections
///
/// Returns `None` when there are no detections.
pub fn primary_species(detections: &[DetectionEvent]) -> Option<String> {
    // label -> (count, earliest timestamp)
    let mut tally: HashMap<&str, (usize, f64)> = HashMap::new();
    for d in detections {
        let entry = tally.entry(d.species.as_str()).or_insert((0, d.timestamp));
        entry.0 += 1;
        entry.1 = entry.1.min(d.timestamp);
    }

    tally
        .into_iter()
        .max_by(|(label_a, (count_a, first_a)), (label_b, (count_b, first_b))| {
            count_a
                .cmp(count_b)
                .then_with(|| first_b.total_cmp(first_a))
                .then_with(|| label_b.cmp(label_a))
        })
        .map(|(label, _)| label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_has_no_primary() {
        assert_eq!(primary_species(&[]), None);
    }

    #[test]
    fn test_most_frequent_wins() {
        let detections = vec![
            DetectionEvent::new(1.0, 0.99, "Little Brown Bat"),
            DetectionEvent::new(2.3, 0.91, "Big Brown Bat"),
            DetectionEvent::new(7.1, 0.92, "Big Brown Bat"),
        ];
        assert_eq!(primary_species(&detections).as_deref(), Some("Big Brown Bat"));
    }

    #[test]
    fn test_tie_goes_to_earliest() {
        let detections = vec![
            DetectionEvent::new(4.0, 0.9, "Hoary Bat"),
            DetectionEvent::new(1.5, 0.7, "Little Brown Bat"),
            DetectionEvent::new(6.0, 0.9, "Hoary Bat"),
            DetectionEvent::new(8.0, 0.7, "Little Brown Bat"),
        ];
        assert_eq!(primary_species(&detections).as_deref(), Some("Little Brown Bat"));
    }

    #[test]
    fn test_full_tie_is_deterministic() {
        let detections = vec![
            DetectionEvent::new(2.0, 0.9, "Tricolored Bat"),
            DetectionEvent::new(2.0, 0.9, "Eastern Red Bat"),
        ];
        assert_eq!(primary_species(&detections).as_deref(), Some("Eastern Red Bat"));
    }

    #[test]
    fn test_unsorted_input_uses_earliest_timestamp() {
        let detections = vec![
            DetectionEvent::new(9.0, 0.9, "A"),
            DetectionEvent::new(5.0, 0.9, "B"),
            DetectionEvent::new(1.0, 0.9, "A"),
            DetectionEvent::new(6.0, 0.9, "B"),
        ];
        assert_eq!(primary_species(&detections).as_deref(), Some("A"));
    }
}
