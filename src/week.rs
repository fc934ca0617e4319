use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::calendar::{CalendarError, CalendarSpec};
use crate::domain::Topic;

/// One local calendar day, closed on both ends: `[midnight, next midnight - 1s]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayInterval {
    /// Builds the interval for a local calendar day. The end bound comes from
    /// the next day's resolved midnight, so DST days keep their true length.
    pub fn of(date: NaiveDate, calendar: &CalendarSpec) -> Result<Self, CalendarError> {
        let start = calendar.midnight(date)?;
        let next = calendar.midnight(calendar.add_days(date, 1)?)?;
        Ok(Self {
            start,
            end: next - Duration::seconds(1),
        })
    }
}

/// Seven contiguous day intervals plus the calendar identity of the week.
///
/// A `Week` is fully determined by `(year_for_week, week_of_year)` under a
/// given calendar; `month` and `first_weekday_day_of_month` are derived from
/// the week's first day, which keeps `previous`/`next` round trips exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Week {
    pub year_for_week: i32,
    pub week_of_year: u32,
    pub month: u32,
    pub first_weekday_day_of_month: u32,
    pub day_intervals: [DayInterval; 7],
}

impl Week {
    /// `"2023:28"` style identity.
    pub fn id(&self) -> String {
        format!("{}:{}", self.year_for_week, self.week_of_year)
    }

    /// The week containing the instant `t`.
    pub fn containing(t: DateTime<Utc>, calendar: &CalendarSpec) -> Result<Self, CalendarError> {
        Self::of_date(calendar.local_date(t), calendar)
    }

    /// The week containing the local calendar day `date`.
    pub fn of_date(date: NaiveDate, calendar: &CalendarSpec) -> Result<Self, CalendarError> {
        let (year_for_week, week_of_year) = calendar.week_numbering(date)?;
        let first_day = calendar.date_of_week(year_for_week, week_of_year, 1)?;

        let mut day_intervals = [DayInterval {
            start: DateTime::<Utc>::MIN_UTC,
            end: DateTime::<Utc>::MIN_UTC,
        }; 7];
        for (offset, interval) in day_intervals.iter_mut().enumerate() {
            let day = calendar.add_days(first_day, offset as i64)?;
            *interval = DayInterval::of(day, calendar)?;
        }

        Ok(Self {
            year_for_week,
            week_of_year,
            month: first_day.month(),
            first_weekday_day_of_month: first_day.day(),
            day_intervals,
        })
    }

    pub fn first_moment(&self) -> DateTime<Utc> {
        self.day_intervals[0].start
    }

    pub fn last_moment(&self) -> DateTime<Utc> {
        self.day_intervals[6].end
    }

    pub fn previous(&self, calendar: &CalendarSpec) -> Result<Self, CalendarError> {
        self.offset_weeks(-1, calendar)
    }

    pub fn next(&self, calendar: &CalendarSpec) -> Result<Self, CalendarError> {
        self.offset_weeks(1, calendar)
    }

    /// Rebuilds the week `weeks` weeks away from this one. Week navigation is
    /// unbounded; an error here means the calendar itself failed.
    pub fn offset_weeks(&self, weeks: i64, calendar: &CalendarSpec) -> Result<Self, CalendarError> {
        let first_day = calendar.date_of_week(self.year_for_week, self.week_of_year, 1)?;
        let shifted = calendar.add_days(first_day, weeks * 7)?;
        Self::of_date(shifted, calendar)
    }
}

/// A topic paired with one of its weeks, as rendered by a weekly summary.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicWeek {
    pub topic: Topic,
    pub week: Week,
}

impl TopicWeek {
    pub fn id(&self) -> String {
        format!("{}:{}", self.topic.id, self.week.id())
    }
}
