use chrono::{DateTime, Utc};
use tracing::debug;

use crate::ChecklistItem;
use crate::collaborator::ChecklistCompletion;

/// Folds external completion-analysis results into the session checklist.
///
/// Completions are monotonic: once an item is marked complete it never
/// reverts, and repeated completions for the same item are ignored.
pub struct ChecklistProgressTracker {
    items: Vec<ChecklistItem>,
    confidence_threshold: f64,
    /// One analysis in flight at a time bounds external-call volume.
    analysis_in_flight: bool,
}

impl ChecklistProgressTracker {
    pub fn new(items: Vec<ChecklistItem>, confidence_threshold: f64) -> Self {
        Self {
            items,
            confidence_threshold,
            analysis_in_flight: false,
        }
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn pending(&self) -> Vec<&ChecklistItem> {
        self.items.iter().filter(|i| !i.completed).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.items.iter().filter(|i| !i.completed).count()
    }

    pub fn completed_ids(&self) -> Vec<i64> {
        self.items
            .iter()
            .filter(|i| i.completed)
            .map(|i| i.id)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|i| i.completed)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Claims the analysis slot. Returns false when an analysis is already
    /// running or there is nothing left to detect.
    pub fn try_begin_analysis(&mut self) -> bool {
        if self.analysis_in_flight || self.pending_count() == 0 {
            return false;
        }
        self.analysis_in_flight = true;
        true
    }

    pub fn finish_analysis(&mut self) {
        self.analysis_in_flight = false;
    }

    /// Applies collaborator completions at or above the confidence threshold.
    /// Returns the items that newly flipped to completed, for event emission.
    /// Sub-threshold completions are dropped, not stored for later; only
    /// future transcript growth can re-trigger them.
    pub fn apply_completions(
        &mut self,
        completions: &[ChecklistCompletion],
        now: DateTime<Utc>,
    ) -> Vec<ChecklistItem> {
        let mut newly_completed = Vec::new();

        for completion in completions {
            if completion.confidence < self.confidence_threshold {
                debug!(
                    item_id = completion.item_id,
                    confidence = completion.confidence,
                    "Completion below confidence threshold, ignoring"
                );
                continue;
            }
            let Some(item) = self.items.iter_mut().find(|i| i.id == completion.item_id) else {
                debug!(item_id = completion.item_id, "Completion for unknown item");
                continue;
            };
            if item.completed {
                continue;
            }
            item.completed = true;
            item.extracted_info = Some(completion.extracted_info.clone());
            item.completed_at = Some(now);
            newly_completed.push(item.clone());
        }

        newly_completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, label: &str) -> ChecklistItem {
        ChecklistItem {
            id,
            label: label.to_string(),
            description: None,
            category: None,
            order: id as u32,
            required: true,
            completed: false,
            extracted_info: None,
            completed_at: None,
        }
    }

    fn completion(item_id: i64, confidence: f64) -> ChecklistCompletion {
        ChecklistCompletion {
            item_id,
            extracted_info: "around $50k MRR".to_string(),
            confidence,
        }
    }

    fn tracker() -> ChecklistProgressTracker {
        ChecklistProgressTracker::new(
            vec![item(1, "Revenue target"), item(2, "Team size"), item(3, "Timeline")],
            0.8,
        )
    }

    #[test]
    fn threshold_filters_low_confidence() {
        let mut t = tracker();
        let newly = t.apply_completions(&[completion(1, 0.79), completion(2, 0.8)], Utc::now());
        assert_eq!(newly.len(), 1);
        assert_eq!(newly[0].id, 2);
        assert_eq!(t.pending_count(), 2);
    }

    #[test]
    fn completion_is_monotonic() {
        let mut t = tracker();
        let first = t.apply_completions(&[completion(1, 0.9)], Utc::now());
        assert_eq!(first.len(), 1);
        let again = t.apply_completions(&[completion(1, 0.95)], Utc::now());
        assert!(again.is_empty(), "already-completed item must not re-fire");
        assert!(t.items()[0].completed);
    }

    #[test]
    fn unknown_items_ignored() {
        let mut t = tracker();
        let newly = t.apply_completions(&[completion(99, 0.9)], Utc::now());
        assert!(newly.is_empty());
    }

    #[test]
    fn analysis_guard_single_flight() {
        let mut t = tracker();
        assert!(t.try_begin_analysis());
        assert!(!t.try_begin_analysis());
        t.finish_analysis();
        assert!(t.try_begin_analysis());
    }

    #[test]
    fn no_analysis_when_exhausted() {
        let mut t = tracker();
        t.apply_completions(
            &[completion(1, 0.9), completion(2, 0.9), completion(3, 0.9)],
            Utc::now(),
        );
        assert!(t.is_complete());
        assert!(!t.try_begin_analysis());
        assert_eq!(t.completed_ids(), vec![1, 2, 3]);
    }
}
