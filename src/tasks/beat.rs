//! Calendar scheduling for periodic tasks.
//!
//! The beat loop does not execute anything itself. It enqueues due tasks
//! onto the same queue the workers drain, so periodic work gets the same
//! retry and crash-recovery semantics as everything else.

use std::time::Duration;

use chrono::{DateTime, Datelike, Duration as ChronoDuration, Utc, Weekday};
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::tasks::{prune, runs, TaskContext};

const TICK_SECS: u64 = 60;

/// When a periodic task fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Every fixed interval, starting one interval after boot.
    Every(ChronoDuration),
    /// Once a week at the given UTC hour.
    Weekly { weekday: Weekday, hour: u32 },
}

impl Schedule {
    /// Next fire time strictly after `after`.
    pub fn next_fire(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Schedule::Every(interval) => after + *interval,
            Schedule::Weekly { weekday, hour } => {
                let mut candidate = after
                    .date_naive()
                    .and_hms_opt(*hour, 0, 0)
                    .unwrap_or_else(|| after.naive_utc())
                    .and_utc();
                while candidate.weekday() != *weekday || candidate <= after {
                    candidate += ChronoDuration::days(1);
                }
                candidate
            }
        }
    }
}

/// One periodic task and when it next fires.
#[derive(Debug, Clone)]
pub struct BeatEntry {
    pub task_name: &'static str,
    pub schedule: Schedule,
    next_fire: DateTime<Utc>,
}

impl BeatEntry {
    fn new(task_name: &'static str, schedule: Schedule) -> Self {
        Self {
            task_name,
            schedule,
            next_fire: schedule.next_fire(Utc::now()),
        }
    }
}

/// Built-in periodic schedule: summary drift recovery on a short interval,
/// pruning staggered across early Sunday morning UTC.
pub fn default_schedule() -> Vec<BeatEntry> {
    vec![
        BeatEntry::new(
            runs::SYNC_ABORTED_RUNS,
            Schedule::Every(ChronoDuration::minutes(30)),
        ),
        BeatEntry::new(
            prune::PRUNE_OLD_ARTIFACTS,
            Schedule::Weekly {
                weekday: Weekday::Sun,
                hour: 4,
            },
        ),
        BeatEntry::new(
            prune::PRUNE_OLD_IMPORTS,
            Schedule::Weekly {
                weekday: Weekday::Sun,
                hour: 5,
            },
        ),
        BeatEntry::new(
            prune::PRUNE_OLD_RESULTS,
            Schedule::Weekly {
                weekday: Weekday::Sun,
                hour: 6,
            },
        ),
        BeatEntry::new(
            prune::PRUNE_OLD_RUNS,
            Schedule::Weekly {
                weekday: Weekday::Sun,
                hour: 7,
            },
        ),
    ]
}

/// Spawns the beat loop.
pub fn start_beat(ctx: TaskContext) {
    tokio::spawn(async move {
        let mut entries = default_schedule();
        info!(entries = entries.len(), "beat scheduler started");
        loop {
            sleep(Duration::from_secs(TICK_SECS)).await;
            let now = Utc::now();
            for entry in &mut entries {
                if now < entry.next_fire {
                    continue;
                }
                match ctx
                    .db
                    .enqueue_task(entry.task_name, json!([]), json!({}))
                    .await
                {
                    Ok(task) => {
                        debug!(task = %task.id, name = entry.task_name, "periodic task enqueued")
                    }
                    Err(err) => {
                        error!(name = entry.task_name, error = %err, "failed to enqueue periodic task")
                    }
                }
                entry.next_fire = entry.schedule.next_fire(now);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_interval_schedule_advances_by_interval() {
        let schedule = Schedule::Every(ChronoDuration::minutes(30));
        let after = Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap();
        assert_eq!(
            schedule.next_fire(after),
            Utc.with_ymd_and_hms(2026, 3, 4, 12, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_weekly_schedule_finds_the_next_window() {
        let schedule = Schedule::Weekly {
            weekday: Weekday::Sun,
            hour: 6,
        };
        // Wednesday noon fires the coming Sunday
        let wednesday = Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap();
        assert_eq!(
            schedule.next_fire(wednesday),
            Utc.with_ymd_and_hms(2026, 3, 8, 6, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_weekly_schedule_never_fires_in_the_past() {
        let schedule = Schedule::Weekly {
            weekday: Weekday::Sun,
            hour: 6,
        };
        // exactly at the window: next fire is a week out
        let sunday_six = Utc.with_ymd_and_hms(2026, 3, 8, 6, 0, 0).unwrap();
        assert_eq!(
            schedule.next_fire(sunday_six),
            Utc.with_ymd_and_hms(2026, 3, 15, 6, 0, 0).unwrap()
        );
        // just before the window: fires the same day
        let sunday_early = Utc.with_ymd_and_hms(2026, 3, 8, 3, 0, 0).unwrap();
        assert_eq!(
            schedule.next_fire(sunday_early),
            Utc.with_ymd_and_hms(2026, 3, 8, 6, 0, 0).unwrap()
        );
    }
}
