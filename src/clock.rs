use chrono::{DateTime, Local, Utc};

use crate::payroll::date_cursor::IsoDate;

/// Source of "now" for payroll runs and cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Today's calendar date in the server's local timezone.
    fn today(&self) -> IsoDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> IsoDate {
        IsoDate::from_naive(Local::now().date_naive())
    }
}

#[cfg(test)]
pub use fixed::FixedClock;

#[cfg(test)]
mod fixed {
    use std::sync::Mutex;

    use chrono::{DateTime, Duration, Utc};

    use super::Clock;
    use crate::payroll::date_cursor::IsoDate;

    /// Manually driven clock; `today` is the UTC date of `now`.
    pub struct FixedClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        pub fn at(now: DateTime<Utc>) -> Self {
            FixedClock {
                now: Mutex::new(now),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }

        fn today(&self) -> IsoDate {
            IsoDate::from_naive(self.now().date_naive())
        }
    }
}
