use chrono::{Duration, NaiveTime};

pub const DEFAULT_DATABASE: &str = "finance_tracker.db";

/// Fire times (UTC) of the two background jobs and the advisory lock TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub materialize_at: NaiveTime,
    pub evaluate_at: NaiveTime,
    /// A job lock older than this is treated as left behind by a crashed run.
    pub lock_ttl: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            materialize_at: NaiveTime::MIN,
            evaluate_at: NaiveTime::from_hms_opt(0, 5, 0).unwrap_or(NaiveTime::MIN),
            lock_ttl: Duration::minutes(60),
        }
    }
}

impl SchedulerConfig {
    pub fn new(materialize_at: NaiveTime, evaluate_at: NaiveTime, lock_ttl_minutes: u32) -> Self {
        Self {
            materialize_at,
            evaluate_at,
            lock_ttl: Duration::minutes(i64::from(lock_ttl_minutes)),
        }
    }

    /// Materialized expenses are only visible to the evaluator if the
    /// materializer fires first in the day.
    pub fn evaluator_runs_after_materializer(&self) -> bool {
        self.evaluate_at > self.materialize_at
    }
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, String> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| format!("Invalid time '{}'. Please use HH:MM.", s))
}
