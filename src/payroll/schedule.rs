use chrono::TimeZone;
use tracing::debug;

use crate::model::payroll::PaySystem;
use crate::payroll::date_cursor::{IsoDate, add_days, add_months, add_weeks};

/// Upper bound on dates produced by one resolver call.
pub const MAX_DUE_DATES: usize = 5000;

/// Moves a due date forward by one cycle of `pay_system`.
pub fn advance<Tz: TimeZone>(date: IsoDate, pay_system: PaySystem, tz: &Tz) -> Option<IsoDate> {
    match pay_system {
        PaySystem::Daily => add_days(date, 1, tz),
        PaySystem::Weekly => add_weeks(date, 1, tz),
        PaySystem::Monthly => add_months(date, 1),
    }
}

/// Output of [`resolve_due_dates`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DueDates {
    pub dates: Vec<IsoDate>,
    /// The cap was hit while due dates up to `end` remained.
    pub truncated: bool,
}

/// Every due date from `start` through `end`, both inclusive, ascending.
///
/// A missing bound or `start > end` means nothing is due yet and yields an
/// empty list. Output stops early at [`MAX_DUE_DATES`], or when a step fails
/// to move the cursor forward.
pub fn build_due_dates<Tz: TimeZone>(
    start: Option<IsoDate>,
    end: Option<IsoDate>,
    pay_system: PaySystem,
    tz: &Tz,
) -> Vec<IsoDate> {
    resolve_due_dates(start, end, pay_system, tz).dates
}

/// [`build_due_dates`], also reporting whether the cap cut the range short.
pub fn resolve_due_dates<Tz: TimeZone>(
    start: Option<IsoDate>,
    end: Option<IsoDate>,
    pay_system: PaySystem,
    tz: &Tz,
) -> DueDates {
    let (Some(start), Some(end)) = (start, end) else {
        return DueDates::default();
    };
    if start > end {
        return DueDates::default();
    }

    let mut out = DueDates::default();
    let mut cursor = start;
    while cursor <= end {
        if out.dates.len() >= MAX_DUE_DATES {
            debug!(%start, %end, %pay_system, cap = MAX_DUE_DATES, "Due date backlog truncated");
            out.truncated = true;
            break;
        }
        out.dates.push(cursor);

        match advance(cursor, pay_system, tz) {
            Some(next) if next > cursor => cursor = next,
            _ => break,
        }
    }
    out
}

/// First due date strictly after `today`.
///
/// Daily and weekly schedules jump straight to the cycle after `today`;
/// monthly schedules step from `start` so the day-of-month overflow carries
/// exactly as in [`build_due_dates`].
pub fn next_due_after<Tz: TimeZone>(
    start: IsoDate,
    today: IsoDate,
    pay_system: PaySystem,
    tz: &Tz,
) -> Option<IsoDate> {
    if start > today {
        return Some(start);
    }

    let period_days = match pay_system {
        PaySystem::Daily => 1,
        PaySystem::Weekly => 7,
        PaySystem::Monthly => return next_monthly_after(start, today),
    };
    let elapsed = (today.naive() - start.naive()).num_days();
    let first_guess = elapsed / period_days + 1;
    // a DST shift can land one day short of the calendar answer
    (first_guess..first_guess + 3)
        .filter_map(|cycles| add_days(start, cycles.checked_mul(period_days)?, tz))
        .find(|next| *next > today)
}

fn next_monthly_after(start: IsoDate, today: IsoDate) -> Option<IsoDate> {
    let mut cursor = start;
    while cursor <= today {
        cursor = add_months(cursor, 1).filter(|next| *next > cursor)?;
    }
    Some(cursor)
}
