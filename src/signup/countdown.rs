use chrono::{DateTime, TimeZone, Utc};

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;

/// Time left until launch, split for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    /// Whole seconds from `now` to `target`, never negative. The page
    /// recomputes this once a second while it is shown.
    pub fn until<Tz: TimeZone>(target: &DateTime<Tz>, now: DateTime<Utc>) -> Countdown {
        let total_seconds = target
            .with_timezone(&Utc)
            .signed_duration_since(now)
            .num_seconds()
            .max(0);

        Countdown {
            days: total_seconds / SECONDS_PER_DAY,
            hours: (total_seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR,
            minutes: (total_seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE,
            seconds: total_seconds % SECONDS_PER_MINUTE,
        }
    }

    pub fn is_finished(&self) -> bool {
        *self == Countdown::default()
    }
}
