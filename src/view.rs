use chrono::{DateTime, Utc};

use crate::calendar::{CalendarError, CalendarSpec};
use crate::domain::{format_duration, ActiveAccounting, DomainError, Goal, Topic};
use crate::week::TopicWeek;

pub const PLACEHOLDER: &str = "--:--:--";

/// Per-day completion marker for a weekly summary row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalMarker {
    /// No session data yet for this day (or the day is in the future).
    NoData,
    /// A goal exists but the ratio is at or below zero.
    Empty,
    /// Some progress toward the goal.
    Partial,
    /// The goal was reached or exceeded.
    Complete,
}

impl GoalMarker {
    fn from_ratio(ratio: f64) -> Self {
        if ratio <= 0.0 {
            GoalMarker::Empty
        } else if ratio < 1.0 {
            GoalMarker::Partial
        } else {
            GoalMarker::Complete
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            GoalMarker::NoData => "◌",
            GoalMarker::Empty => "○",
            GoalMarker::Partial => "◐",
            GoalMarker::Complete => "●",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    /// Month/day of the interval start, local calendar: `07/09`.
    pub day_label: String,
    pub duration: String,
    pub goal: String,
    pub marker: GoalMarker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekSummary {
    pub title: String,
    pub subtitle: String,
    pub days: Vec<DaySummary>,
}

/// Projects a topic's tracked time onto one week, one row per day.
///
/// A day shows placeholders when it lies in the future or when all session
/// data postdates it; otherwise its total runs from the day's start to the
/// earlier of `now` and the day's end. The goal column resolves the goal
/// history at the day's start, so past days keep the goal that was active
/// then.
pub fn week_summary(
    topic_week: &TopicWeek,
    now: DateTime<Utc>,
    calendar: &CalendarSpec,
    accounting: ActiveAccounting,
) -> Result<WeekSummary, DomainError> {
    let topic = &topic_week.topic;
    let week = &topic_week.week;

    let mut days = Vec::with_capacity(week.day_intervals.len());
    for interval in &week.day_intervals {
        let day_label = calendar
            .local_date(interval.start)
            .format("%m/%d")
            .to_string();

        let tracked = if now < interval.start || !topic.sessions_before(interval.end) {
            None
        } else {
            Some(topic.total_between(interval.start, now.min(interval.end), accounting)?)
        };
        let duration = match tracked {
            Some(total) => format_duration(total),
            None => PLACEHOLDER.to_string(),
        };

        let target = topic.goal_for(interval.start).and_then(Goal::duration);
        let goal = match target {
            Some(target) => format_duration(target),
            None => PLACEHOLDER.to_string(),
        };

        let marker = match (tracked, target) {
            (Some(total), Some(target)) => {
                let ratio = total.num_seconds() as f64 / target.num_seconds() as f64;
                GoalMarker::from_ratio(ratio)
            }
            _ => GoalMarker::NoData,
        };

        days.push(DaySummary {
            day_label,
            duration,
            goal,
            marker,
        });
    }

    Ok(WeekSummary {
        title: format!("Week {}", week.week_of_year),
        subtitle: format!(
            "{} - {}",
            calendar.local_date(week.first_moment()).format("%Y-%m-%d"),
            calendar.local_date(week.last_moment()).format("%Y-%m-%d")
        ),
        days,
    })
}

/// The daily status data: today's total against the current goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicStatus {
    pub timer: String,
    pub goal: String,
    pub goal_complete: bool,
    pub session_count: usize,
    pub running: bool,
}

impl TopicStatus {
    pub fn action_label(&self) -> &'static str {
        if self.running { "stop" } else { "start" }
    }
}

pub fn topic_status(
    topic: &Topic,
    start_of_today: DateTime<Utc>,
    now: DateTime<Utc>,
    accounting: ActiveAccounting,
) -> Result<TopicStatus, DomainError> {
    let total_today = topic.total_between(start_of_today, now, accounting)?;
    let goal = match topic.current_goal().and_then(Goal::duration) {
        Some(target) => format_duration(target),
        None => PLACEHOLDER.to_string(),
    };

    Ok(TopicStatus {
        timer: format_duration(total_today),
        goal,
        goal_complete: topic.is_goal_complete(start_of_today, now, accounting),
        session_count: topic.session_count_between(start_of_today, now)?,
        running: topic.is_running(),
    })
}

/// Cached start of "today" plus the moment it rolls over.
///
/// Elapsed-time displays read `start_of_today` every tick; the caller
/// refreshes the anchor so the value snaps to the new day exactly at local
/// midnight instead of drifting with a stale cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodayAnchor {
    start_of_today: DateTime<Utc>,
    rolls_over_at: DateTime<Utc>,
}

impl TodayAnchor {
    pub fn new(now: DateTime<Utc>, calendar: &CalendarSpec) -> Result<Self, CalendarError> {
        let start_of_today = calendar.start_of_day(now)?;
        let tomorrow = calendar.add_days(calendar.local_date(now), 1)?;
        Ok(Self {
            start_of_today,
            rolls_over_at: calendar.midnight(tomorrow)?,
        })
    }

    pub fn start_of_today(&self) -> DateTime<Utc> {
        self.start_of_today
    }

    /// Recomputes the anchor once `now` has crossed the cached midnight.
    /// Returns whether a rollover happened.
    pub fn refresh(
        &mut self,
        now: DateTime<Utc>,
        calendar: &CalendarSpec,
    ) -> Result<bool, CalendarError> {
        if now < self.rolls_over_at {
            return Ok(false);
        }
        *self = Self::new(now, calendar)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use chrono_tz::Tz;
    use uuid::Uuid;

    use crate::calendar::CalendarSpec;
    use crate::domain::{ActiveAccounting, Goal, Session, Topic, TopicCommand};
    use crate::week::{TopicWeek, Week};

    use super::{topic_status, week_summary, GoalMarker, TodayAnchor, PLACEHOLDER};

    fn calendar() -> CalendarSpec {
        CalendarSpec {
            timezone: Some(Tz::UTC),
            ..CalendarSpec::default()
        }
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, day, hour, minute, 0).unwrap()
    }

    fn session(start: DateTime<Utc>, end: DateTime<Utc>) -> Session {
        Session::new(Uuid::new_v4(), start, end).expect("session should be valid")
    }

    // Week of Sunday 2026-07-05 .. Saturday 2026-07-11.
    fn topic_week(topic: Topic) -> TopicWeek {
        let week = Week::of_date(NaiveDate::from_ymd_opt(2026, 7, 8).unwrap(), &calendar())
            .expect("week should build");
        TopicWeek { topic, week }
    }

    #[test]
    fn summary_has_one_row_per_day_with_labels() {
        let mut topic = Topic::new(Uuid::nil());
        topic.sessions.push(session(at(6, 9, 0), at(6, 10, 0)));

        let summary = week_summary(
            &topic_week(topic),
            at(8, 12, 0),
            &calendar(),
            ActiveAccounting::RawStart,
        )
        .expect("summary should build");

        assert_eq!(summary.title, "Week 28");
        assert_eq!(summary.subtitle, "2026-07-05 - 2026-07-11");
        assert_eq!(summary.days.len(), 7);
        assert_eq!(summary.days[0].day_label, "07/05");
        assert_eq!(summary.days[6].day_label, "07/11");
    }

    #[test]
    fn future_days_show_placeholders() {
        let mut topic = Topic::new(Uuid::nil());
        topic.sessions.push(session(at(6, 9, 0), at(6, 10, 0)));

        let summary = week_summary(
            &topic_week(topic),
            at(8, 12, 0),
            &calendar(),
            ActiveAccounting::RawStart,
        )
        .expect("summary should build");

        // 07/09 onward lies after `now`.
        for day in &summary.days[4..] {
            assert_eq!(day.duration, PLACEHOLDER);
            assert_eq!(day.marker, GoalMarker::NoData);
        }
    }

    #[test]
    fn days_before_any_session_data_show_placeholders() {
        let mut topic = Topic::new(Uuid::nil());
        topic.sessions.push(session(at(7, 9, 0), at(7, 10, 0)));

        let summary = week_summary(
            &topic_week(topic),
            at(8, 12, 0),
            &calendar(),
            ActiveAccounting::RawStart,
        )
        .expect("summary should build");

        // 07/05 and 07/06 predate the earliest session; tracking starts 07/07.
        assert_eq!(summary.days[0].duration, PLACEHOLDER);
        assert_eq!(summary.days[0].marker, GoalMarker::NoData);
        assert_eq!(summary.days[1].duration, PLACEHOLDER);
        assert_eq!(summary.days[2].duration, "01:00:00");
        assert_eq!(summary.days[3].duration, "00:00:00");
    }

    #[test]
    fn tracked_days_format_their_totals() {
        let mut topic = Topic::new(Uuid::nil());
        topic.sessions.push(session(at(5, 9, 0), at(5, 10, 0)));
        topic.sessions.push(session(at(6, 9, 0), at(6, 10, 30)));

        let summary = week_summary(
            &topic_week(topic),
            at(8, 12, 0),
            &calendar(),
            ActiveAccounting::RawStart,
        )
        .expect("summary should build");

        assert_eq!(summary.days[0].duration, "01:00:00");
        assert_eq!(summary.days[1].duration, "01:30:00");
        assert_eq!(summary.days[2].duration, "00:00:00");
    }

    #[test]
    fn markers_cover_all_four_states() {
        let mut topic = Topic::new(Uuid::nil());
        // One-hour goal from the start of the week.
        topic.goals = vec![Goal::new(
            Uuid::new_v4(),
            at(5, 0, 0),
            Some(Duration::hours(1)),
        )];
        topic.sessions.push(session(at(5, 9, 0), at(5, 9, 30)));
        topic.sessions.push(session(at(6, 9, 0), at(6, 10, 0)));

        let summary = week_summary(
            &topic_week(topic),
            at(8, 12, 0),
            &calendar(),
            ActiveAccounting::RawStart,
        )
        .expect("summary should build");

        assert_eq!(summary.days[0].marker, GoalMarker::Partial);
        assert_eq!(summary.days[1].marker, GoalMarker::Complete);
        assert_eq!(summary.days[2].marker, GoalMarker::Empty);
        assert_eq!(summary.days[5].marker, GoalMarker::NoData);
    }

    #[test]
    fn goal_column_resolves_history_per_day() {
        let mut topic = Topic::new(Uuid::nil());
        topic.sessions.push(session(at(5, 9, 0), at(5, 10, 0)));
        topic.goals = vec![
            Goal::new(Uuid::new_v4(), at(5, 0, 0), Some(Duration::hours(1))),
            Goal::new(Uuid::new_v4(), at(7, 0, 0), Some(Duration::hours(2))),
        ];

        let summary = week_summary(
            &topic_week(topic),
            at(8, 12, 0),
            &calendar(),
            ActiveAccounting::RawStart,
        )
        .expect("summary should build");

        assert_eq!(summary.days[0].goal, "01:00:00");
        assert_eq!(summary.days[1].goal, "01:00:00");
        assert_eq!(summary.days[2].goal, "02:00:00");
        assert_eq!(summary.days[3].goal, "02:00:00");
    }

    #[test]
    fn goal_column_shows_placeholder_before_any_goal() {
        let mut topic = Topic::new(Uuid::nil());
        topic.sessions.push(session(at(5, 9, 0), at(5, 10, 0)));
        topic.goals = vec![Goal::new(
            Uuid::new_v4(),
            at(7, 0, 0),
            Some(Duration::hours(2)),
        )];

        let summary = week_summary(
            &topic_week(topic),
            at(8, 12, 0),
            &calendar(),
            ActiveAccounting::RawStart,
        )
        .expect("summary should build");

        assert_eq!(summary.days[0].goal, PLACEHOLDER);
        assert_eq!(summary.days[0].marker, GoalMarker::NoData);
    }

    #[test]
    fn status_reports_timer_goal_and_session_count() {
        let mut topic = Topic::new(Uuid::nil())
            .apply(TopicCommand::SetGoal {
                id: Uuid::new_v4(),
                start_of_day: at(8, 0, 0),
                duration: Some(Duration::hours(1)),
            })
            .expect("set should apply")
            .topic;
        topic.sessions.push(session(at(8, 9, 0), at(8, 9, 30)));
        topic.active_session_start = Some(at(8, 11, 0));

        let status = topic_status(
            &topic,
            at(8, 0, 0),
            at(8, 11, 45),
            ActiveAccounting::RawStart,
        )
        .expect("status should build");

        assert_eq!(status.timer, "01:15:00");
        assert_eq!(status.goal, "01:00:00");
        assert!(status.goal_complete);
        assert_eq!(status.session_count, 2);
        assert!(status.running);
        assert_eq!(status.action_label(), "stop");
    }

    #[test]
    fn status_without_goal_shows_placeholder() {
        let topic = Topic::new(Uuid::nil());
        let status = topic_status(
            &topic,
            at(8, 0, 0),
            at(8, 12, 0),
            ActiveAccounting::RawStart,
        )
        .expect("status should build");

        assert_eq!(status.timer, "00:00:00");
        assert_eq!(status.goal, PLACEHOLDER);
        assert!(!status.goal_complete);
        assert!(!status.running);
        assert_eq!(status.action_label(), "start");
    }

    #[test]
    fn today_anchor_rolls_over_at_local_midnight() {
        let calendar = calendar();
        let mut anchor = TodayAnchor::new(at(8, 23, 58), &calendar).expect("anchor should build");
        assert_eq!(anchor.start_of_today(), at(8, 0, 0));

        let unchanged = anchor
            .refresh(at(8, 23, 59), &calendar)
            .expect("refresh should work");
        assert!(!unchanged);
        assert_eq!(anchor.start_of_today(), at(8, 0, 0));

        let rolled = anchor
            .refresh(at(9, 0, 0), &calendar)
            .expect("refresh should work");
        assert!(rolled);
        assert_eq!(anchor.start_of_today(), at(9, 0, 0));
    }
}
