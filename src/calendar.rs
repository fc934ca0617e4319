use std::fmt::{Display, Formatter};

use chrono::{
    DateTime, Datelike, Days, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    DateOutOfRange,
    UnresolvableLocalTime(NaiveDateTime),
    InvalidWeekPosition { week: u32, weekday: u8 },
}

impl Display for CalendarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CalendarError::DateOutOfRange => {
                write!(f, "date arithmetic left the representable range")
            }
            CalendarError::UnresolvableLocalTime(naive) => {
                write!(f, "local time cannot be resolved to an instant: {naive}")
            }
            CalendarError::InvalidWeekPosition { week, weekday } => {
                write!(f, "invalid week position: week {week}, weekday {weekday}")
            }
        }
    }
}

impl std::error::Error for CalendarError {}

/// Local date/time field decomposition of an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateComponents {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub weekday: Weekday,
    /// Week number under the configured week-start/first-week rule.
    pub week_of_year: u32,
    /// The year that claims the week, which near January 1 may differ
    /// from `year`.
    pub year_for_week: i32,
}

/// Timezone- and week-rule-aware calendar used for all day and week math.
///
/// The defaults mirror a Gregorian calendar with Sunday-first weeks where
/// week 1 is the week containing January 1. `min_days_in_first_week: 4`
/// together with a Monday `week_start` yields ISO-8601 week numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarSpec {
    /// `None` uses the system-local timezone.
    pub timezone: Option<Tz>,
    pub week_start: Weekday,
    pub min_days_in_first_week: u8,
}

impl Default for CalendarSpec {
    fn default() -> Self {
        Self {
            timezone: None,
            week_start: Weekday::Sun,
            min_days_in_first_week: 1,
        }
    }
}

impl CalendarSpec {
    /// The calendar date of `t` in the configured timezone.
    pub fn local_date(&self, t: DateTime<Utc>) -> NaiveDate {
        match self.timezone {
            Some(tz) => t.with_timezone(&tz).date_naive(),
            None => t.with_timezone(&Local).date_naive(),
        }
    }

    pub fn components(&self, t: DateTime<Utc>) -> Result<DateComponents, CalendarError> {
        let date = self.local_date(t);
        let (year_for_week, week_of_year) = self.week_numbering(date)?;
        Ok(DateComponents {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            weekday: date.weekday(),
            week_of_year,
            year_for_week,
        })
    }

    /// The instant the given local calendar day begins.
    ///
    /// A forward DST transition can skip local midnight entirely; the day
    /// then begins at the first local minute that exists. An ambiguous
    /// midnight resolves to the earlier instant.
    pub fn midnight(&self, date: NaiveDate) -> Result<DateTime<Utc>, CalendarError> {
        let naive = date.and_time(NaiveTime::MIN);
        match self.timezone {
            Some(tz) => resolve_local(&tz, naive),
            None => resolve_local(&Local, naive),
        }
    }

    pub fn start_of_day(&self, t: DateTime<Utc>) -> Result<DateTime<Utc>, CalendarError> {
        self.midnight(self.local_date(t))
    }

    pub fn add_days(&self, date: NaiveDate, days: i64) -> Result<NaiveDate, CalendarError> {
        date.checked_add_signed(Duration::days(days))
            .ok_or(CalendarError::DateOutOfRange)
    }

    /// Days from the configured week start to `weekday`, in `0..=6`.
    fn days_into_week(&self, weekday: Weekday) -> i64 {
        i64::from((weekday.num_days_from_monday() + 7 - self.week_start.num_days_from_monday()) % 7)
    }

    /// The first day of the week containing `date`.
    pub fn first_of_week(&self, date: NaiveDate) -> Result<NaiveDate, CalendarError> {
        date.checked_sub_days(Days::new(self.days_into_week(date.weekday()) as u64))
            .ok_or(CalendarError::DateOutOfRange)
    }

    /// The first day of week 1 of `year` under the min-days rule.
    fn first_week_start(&self, year: i32) -> Result<NaiveDate, CalendarError> {
        let jan1 = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(CalendarError::DateOutOfRange)?;
        let week_start = self.first_of_week(jan1)?;
        let days_in_year = 7 - self.days_into_week(jan1.weekday());
        if days_in_year >= i64::from(self.min_days_in_first_week) {
            Ok(week_start)
        } else {
            week_start
                .checked_add_days(Days::new(7))
                .ok_or(CalendarError::DateOutOfRange)
        }
    }

    /// `(year_for_week, week_of_year)` of the week containing `date`.
    pub fn week_numbering(&self, date: NaiveDate) -> Result<(i32, u32), CalendarError> {
        let week_start = self.first_of_week(date)?;
        // With a min-days rule of m, a week belongs to the later year exactly
        // when day (7 - m) of the week still falls in it; that day's year is
        // the week's year.
        let deciding = week_start
            .checked_add_days(Days::new(
                7u64.saturating_sub(u64::from(self.min_days_in_first_week)),
            ))
            .ok_or(CalendarError::DateOutOfRange)?;
        let year = deciding.year();
        let first = self.first_week_start(year)?;
        let week = ((week_start - first).num_days() / 7) as u32 + 1;
        Ok((year, week))
    }

    /// The date at `weekday_index` (1..=7, counted from the configured week
    /// start) of the given `(year_for_week, week_of_year)` bucket.
    pub fn date_of_week(
        &self,
        year_for_week: i32,
        week_of_year: u32,
        weekday_index: u8,
    ) -> Result<NaiveDate, CalendarError> {
        if week_of_year == 0 || !(1..=7).contains(&weekday_index) {
            return Err(CalendarError::InvalidWeekPosition {
                week: week_of_year,
                weekday: weekday_index,
            });
        }
        let first = self.first_week_start(year_for_week)?;
        let offset = u64::from(week_of_year - 1) * 7 + u64::from(weekday_index - 1);
        first
            .checked_add_days(Days::new(offset))
            .ok_or(CalendarError::DateOutOfRange)
    }
}

fn resolve_local<Z: TimeZone>(
    tz: &Z,
    naive: NaiveDateTime,
) -> Result<DateTime<Utc>, CalendarError> {
    if let Some(t) = map_local(tz, naive) {
        return Ok(t);
    }

    let mut cursor = naive + Duration::minutes(1);
    for _ in 0..120 {
        if let Some(t) = map_local(tz, cursor) {
            return Ok(t);
        }
        cursor += Duration::minutes(1);
    }

    Err(CalendarError::UnresolvableLocalTime(naive))
}

fn map_local<Z: TimeZone>(tz: &Z, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => Some(t.with_timezone(&Utc)),
        LocalResult::Ambiguous(first, second) => Some(first.min(second).with_timezone(&Utc)),
        LocalResult::None => None,
    }
}
