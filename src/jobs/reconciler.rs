//! Merges freshly probed patches into the locally held records.
//!
//! Probes are terse and may arrive out of order, so the merge keeps
//! whatever richer data we already hold and never lets a status move
//! backwards or out of a terminal state.

use std::collections::HashMap;
use tracing::{debug, warn};

use super::record::{JobId, JobPatch, JobRecord, JobStatus};

/// Output of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub records: Vec<JobRecord>,
    /// True when any merged record differs from before, including a
    /// display name filled in for the first time.
    pub changed: bool,
}

/// Merge `fetched` into `current`, returning the next generation of records.
///
/// Records keep their order. Patches for ids we do not hold are ignored.
pub fn reconcile(current: &[JobRecord], fetched: &[JobPatch]) -> Reconciled {
    let mut by_id: HashMap<&JobId, &JobPatch> = HashMap::with_capacity(fetched.len());
    for patch in fetched {
        by_id.insert(&patch.id, patch);
    }

    let mut changed = false;
    let records: Vec<JobRecord> = current
        .iter()
        .map(|record| match by_id.remove(&record.id) {
            Some(patch) => {
                let merged = merge_record(record, patch);
                if merged != *record {
                    changed = true;
                }
                merged
            }
            None => record.clone(),
        })
        .collect();

    for orphan in by_id.keys() {
        debug!("Ignoring status for job {} which is no longer tracked", orphan);
    }

    Reconciled { records, changed }
}

fn merge_record(current: &JobRecord, patch: &JobPatch) -> JobRecord {
    if !current.status.can_advance_to(patch.status) {
        if current.status.is_terminal() {
            debug!(
                "Job {} is already {}, ignoring reported {}",
                current.id, current.status, patch.status
            );
        } else {
            warn!(
                "Job {} reported {} after {}, keeping the later stage",
                current.id, patch.status, current.status
            );
        }
        return current.clone();
    }

    let status = patch.status;
    let insights = match (&current.insights, &patch.insights) {
        (existing, Some(incoming)) if status == JobStatus::Completed => {
            let merged = existing
                .clone()
                .unwrap_or_default()
                .overlay(incoming.clone());
            (!merged.is_empty()).then_some(merged)
        }
        (existing, _) => existing.clone(),
    };

    JobRecord {
        id: current.id.clone(),
        display_name: pick_name(&current.display_name, patch.display_name.as_deref()),
        status,
        insights,
    }
}

fn pick_name(current: &str, incoming: Option<&str>) -> String {
    match incoming {
        Some(name) if current.is_empty() && !name.is_empty() => name.to_string(),
        _ => current.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::record::MeetingInsights;

    fn payload() -> MeetingInsights {
        MeetingInsights {
            summary: Some("Agreed to ship the beta".to_string()),
            transcript: Some("Ana: let's ship it".to_string()),
            participants: vec!["Ana".to_string(), "Bo".to_string()],
            decisions: vec!["Ship the beta".to_string()],
            sentiment: Some("Positive".to_string()),
            ..Default::default()
        }
    }

    fn record(id: &str, status: JobStatus) -> JobRecord {
        JobRecord::new(id, format!("{id}.mp3"), status)
    }

    #[test]
    fn test_completion_brings_payload() {
        let current = vec![record("A", JobStatus::Transcribing)];
        let fetched = vec![JobPatch::status("A", JobStatus::Completed).with_insights(payload())];

        let result = reconcile(&current, &fetched);
        assert!(result.changed);
        assert_eq!(result.records[0].status, JobStatus::Completed);
        assert_eq!(result.records[0].insights, Some(payload()));
    }

    #[test]
    fn test_terse_probe_keeps_payload() {
        let current = vec![record("A", JobStatus::Completed).with_insights(payload())];
        let fetched = vec![JobPatch::status("A", JobStatus::Completed)];

        let result = reconcile(&current, &fetched);
        assert!(!result.changed);
        assert_eq!(result.records[0].insights, Some(payload()));
    }

    #[test]
    fn test_empty_incoming_payload_does_not_clear() {
        let current = vec![record("A", JobStatus::Completed).with_insights(payload())];
        let fetched =
            vec![JobPatch::status("A", JobStatus::Completed).with_insights(MeetingInsights::default())];

        let result = reconcile(&current, &fetched);
        assert!(!result.changed);
        assert_eq!(result.records[0].insights, Some(payload()));
    }

    #[test]
    fn test_partial_payload_is_merged_field_by_field() {
        let current = vec![record("A", JobStatus::Completed).with_insights(payload())];
        let partial = MeetingInsights {
            summary: Some("Revised summary".to_string()),
            ..Default::default()
        };
        let fetched = vec![JobPatch::status("A", JobStatus::Completed).with_insights(partial)];

        let result = reconcile(&current, &fetched);
        let insights = result.records[0].insights.clone().unwrap();
        assert!(result.changed);
        assert_eq!(insights.summary.as_deref(), Some("Revised summary"));
        assert_eq!(insights.transcript, payload().transcript);
        assert_eq!(insights.participants, payload().participants);
    }

    #[test]
    fn test_backward_status_rejected() {
        let current = vec![record("A", JobStatus::Analyzing)];
        let fetched = vec![JobPatch::status("A", JobStatus::Transcribing)];

        let result = reconcile(&current, &fetched);
        assert!(!result.changed);
        assert_eq!(result.records[0].status, JobStatus::Analyzing);
    }

    #[test]
    fn test_terminal_status_is_final() {
        let current = vec![
            record("A", JobStatus::Completed).with_insights(payload()),
            record("B", JobStatus::Failed),
        ];
        let fetched = vec![
            JobPatch::status("A", JobStatus::Transcribing),
            JobPatch::failed("A"),
            JobPatch::status("B", JobStatus::Completed).with_insights(payload()),
        ];

        let result = reconcile(&current, &fetched);
        assert!(!result.changed);
        assert_eq!(result.records, current);
    }

    #[test]
    fn test_failure_from_any_unresolved_stage() {
        let current = vec![
            record("A", JobStatus::Queued),
            record("B", JobStatus::Transcribing),
            record("C", JobStatus::Analyzing),
        ];
        let fetched = vec![JobPatch::failed("A"), JobPatch::failed("B"), JobPatch::failed("C")];

        let result = reconcile(&current, &fetched);
        assert!(result.changed);
        assert!(result.records.iter().all(|r| r.status == JobStatus::Failed));
    }

    #[test]
    fn test_payload_ignored_before_completion() {
        let current = vec![record("A", JobStatus::Queued)];
        let fetched = vec![JobPatch::status("A", JobStatus::Analyzing).with_insights(payload())];

        let result = reconcile(&current, &fetched);
        assert_eq!(result.records[0].status, JobStatus::Analyzing);
        assert!(result.records[0].insights.is_none());
    }

    #[test]
    fn test_unknown_ids_ignored() {
        let current = vec![record("A", JobStatus::Queued)];
        let fetched = vec![JobPatch::status("Z", JobStatus::Completed)];

        let result = reconcile(&current, &fetched);
        assert!(!result.changed);
        assert_eq!(result.records, current);
    }

    #[test]
    fn test_unfetched_records_untouched() {
        let current = vec![record("A", JobStatus::Queued), record("B", JobStatus::Transcribing)];
        let fetched = vec![JobPatch::status("B", JobStatus::Analyzing)];

        let result = reconcile(&current, &fetched);
        assert_eq!(result.records[0], current[0]);
        assert_eq!(result.records[1].status, JobStatus::Analyzing);
    }

    #[test]
    fn test_order_is_preserved() {
        let current = vec![
            record("C", JobStatus::Queued),
            record("A", JobStatus::Queued),
            record("B", JobStatus::Queued),
        ];
        let fetched = vec![
            JobPatch::status("B", JobStatus::Transcribing),
            JobPatch::status("C", JobStatus::Transcribing),
        ];

        let result = reconcile(&current, &fetched);
        let ids: Vec<&str> = result.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_merge_with_self_is_idempotent() {
        let current = vec![
            record("A", JobStatus::Queued),
            record("B", JobStatus::Analyzing),
            record("C", JobStatus::Completed).with_insights(payload()),
            record("D", JobStatus::Failed),
        ];
        let fetched: Vec<JobPatch> = current.iter().map(JobRecord::to_patch).collect();

        let result = reconcile(&current, &fetched);
        assert!(!result.changed);
        assert_eq!(result.records, current);
    }

    #[test]
    fn test_display_name_is_immutable() {
        let current = vec![record("A", JobStatus::Queued)];
        let mut patch = JobPatch::status("A", JobStatus::Transcribing);
        patch.display_name = Some("renamed.mp3".to_string());

        let result = reconcile(&current, &[patch]);
        assert_eq!(result.records[0].display_name, "A.mp3");
    }

    #[test]
    fn test_missing_display_name_is_filled_and_committed() {
        let current = vec![JobRecord::new("A", "", JobStatus::Transcribing)];
        let mut patch = JobPatch::status("A", JobStatus::Transcribing);
        patch.display_name = Some("standup.mp3".to_string());

        let result = reconcile(&current, &[patch]);
        assert_eq!(result.records[0].display_name, "standup.mp3");
        assert_eq!(result.records[0].status, JobStatus::Transcribing);
        assert!(result.changed);
    }

    #[test]
    fn test_status_and_payload_monotonic_over_sequence() {
        // Responses arriving out of order across several polls.
        let batches = vec![
            vec![JobPatch::status("A", JobStatus::Transcribing)],
            vec![JobPatch::status("A", JobStatus::Queued)],
            vec![JobPatch::status("A", JobStatus::Completed).with_insights(payload())],
            vec![JobPatch::status("A", JobStatus::Analyzing)],
            vec![JobPatch::status("A", JobStatus::Completed)],
            vec![JobPatch::failed("A")],
        ];

        let mut records = vec![record("A", JobStatus::Queued)];
        let mut seen = vec![JobStatus::Queued];
        let mut had_payload = false;

        for batch in batches {
            records = reconcile(&records, &batch).records;
            let current = &records[0];
            let last = *seen.last().unwrap();
            assert!(last.can_advance_to(current.status), "{last} -> {}", current.status);
            seen.push(current.status);

            if had_payload {
                assert!(current.has_insights());
            }
            had_payload |= current.has_insights();
        }

        assert_eq!(records[0].status, JobStatus::Completed);
        assert!(had_payload);
    }
}
