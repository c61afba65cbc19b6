//! Follows tracked meetings in the terminal until they finish processing.

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::time::Duration;

use crate::jobs::{JobId, JobRecord, JobStatus, SchedulerHandle};

/// Describe what changed between two snapshots, one line per meeting.
pub fn describe_changes(previous: &[JobRecord], current: &[JobRecord]) -> Vec<String> {
    let before: HashMap<&JobId, JobStatus> =
        previous.iter().map(|r| (&r.id, r.status)).collect();

    current
        .iter()
        .filter_map(|record| match before.get(&record.id) {
            None => Some(format!(
                "#{} {}: {}",
                record.id, record.display_name, record.status
            )),
            Some(old) if *old != record.status => Some(format!(
                "#{} {}: {} -> {}",
                record.id, record.display_name, old, record.status
            )),
            Some(_) => None,
        })
        .collect()
}

/// Print status changes until nothing is left processing.
///
/// Returns early, leaving the scheduler running, on Ctrl-C.
pub async fn follow(handle: &SchedulerHandle, show_progress: bool) -> Result<()> {
    let mut updates = handle.subscribe();
    let mut previous = handle.snapshot();

    let pb = show_progress.then(create_spinner);
    let emit = |line: String| match &pb {
        Some(pb) => pb.println(line),
        None => println!("{}", line),
    };

    for line in describe_changes(&[], &previous) {
        emit(line);
    }
    if let Some(pb) = &pb {
        pb.set_message(progress_message(&previous));
    }

    let idle = handle.wait_idle();
    tokio::pin!(idle);

    loop {
        tokio::select! {
            result = &mut idle => {
                result?;
                break;
            }
            changed = updates.changed() => {
                changed.map_err(|_| anyhow!("Tracker stopped unexpectedly"))?;
                let current = updates.borrow_and_update().clone();
                for line in describe_changes(&previous, &current) {
                    emit(line);
                }
                if let Some(pb) = &pb {
                    pb.set_message(progress_message(&current));
                }
                previous = current;
            }
            _ = tokio::signal::ctrl_c() => {
                if let Some(pb) = &pb {
                    pb.abandon_with_message("Interrupted");
                }
                return Ok(());
            }
        }
    }

    for line in describe_changes(&previous, &handle.snapshot()) {
        emit(line);
    }
    if let Some(pb) = pb {
        pb.finish_with_message("All meetings processed");
    }

    Ok(())
}

fn progress_message(records: &[JobRecord]) -> String {
    let processing = records.iter().filter(|r| r.status.is_unresolved()).count();
    match processing {
        0 => "Nothing processing".to_string(),
        1 => "1 meeting processing...".to_string(),
        n => format!("{} meetings processing...", n),
    }
}

fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
