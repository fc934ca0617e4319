use std::fmt::{Display, Formatter};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    InvertedRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    InvertedSession {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    SessionAlreadyActive(DateTime<Utc>),
    NoActiveSession,
    AppendOutOfOrder {
        last: DateTime<Utc>,
        next: DateTime<Utc>,
    },
    UnknownSession(Uuid),
    UnknownGoal(Uuid),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::InvertedRange { start, end } => {
                write!(f, "query range is inverted: {start} > {end}")
            }
            DomainError::InvertedSession { start, end } => {
                write!(f, "session would end before it starts: {start} > {end}")
            }
            DomainError::SessionAlreadyActive(started) => {
                write!(f, "a session is already running since {started}")
            }
            DomainError::NoActiveSession => write!(f, "no session is running"),
            DomainError::AppendOutOfOrder { last, next } => {
                write!(f, "append would break start ordering: {next} < {last}")
            }
            DomainError::UnknownSession(id) => write!(f, "session not found: {id}"),
            DomainError::UnknownGoal(id) => write!(f, "goal not found: {id}"),
        }
    }
}

impl std::error::Error for DomainError {}

/// One completed work interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Session {
    pub fn new(id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, DomainError> {
        if start > end {
            return Err(DomainError::InvertedSession { start, end });
        }
        Ok(Self { id, start, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// A change event in the goal history: from `start` onward the daily target
/// is `duration`, until superseded by a later goal. `None` explicitly unsets
/// the goal; a non-positive duration normalizes to `None` at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    /// Normalized to a local midnight by the caller.
    pub start: DateTime<Utc>,
    duration_seconds: Option<i64>,
}

impl Goal {
    pub fn new(id: Uuid, start: DateTime<Utc>, duration: Option<Duration>) -> Self {
        let duration_seconds = duration
            .map(|duration| duration.num_seconds())
            .filter(|seconds| *seconds > 0);
        Self {
            id,
            start,
            duration_seconds,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_seconds.map(Duration::seconds)
    }
}

/// How the in-progress session counts toward an interval total.
///
/// `RawStart` mirrors the long-standing behavior: the active session
/// contributes `end - active_session_start` even when its start precedes the
/// queried range. Recorded sessions are clamped to the range either way, so
/// the two modes disagree whenever an active session crosses the range start.
/// `Clamped` treats the active session like a recorded one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveAccounting {
    #[default]
    RawStart,
    Clamped,
}

/// The tracked subject: recorded sessions, goal history, and the start of a
/// currently-running session if any.
///
/// `sessions` and `goals` are kept sorted by `start` ascending with unique
/// ids. `apply` enforces the ordering at the append boundary; reads assume it
/// and short-circuit on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: Uuid,
    pub active_session_start: Option<DateTime<Utc>>,
    pub sessions: Vec<Session>,
    pub goals: Vec<Goal>,
}

impl Topic {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            active_session_start: None,
            sessions: Vec::new(),
            goals: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.active_session_start.is_some()
    }

    /// Total tracked time whose moments fall within `[start, end]`.
    ///
    /// Recorded sessions count only the portion inside the range. The active
    /// session counts per `accounting`; see [`ActiveAccounting`].
    pub fn total_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        accounting: ActiveAccounting,
    ) -> Result<Duration, DomainError> {
        if start > end {
            return Err(DomainError::InvertedRange { start, end });
        }

        let mut total = match (self.active_session_start, accounting) {
            (None, _) => Duration::zero(),
            (Some(active_start), ActiveAccounting::RawStart) => end - active_start,
            (Some(active_start), ActiveAccounting::Clamped) => {
                let counted_start = active_start.max(start);
                if counted_start > end {
                    Duration::zero()
                } else {
                    end - counted_start
                }
            }
        };

        for session in Self::sessions_between(&self.sessions, start, end)? {
            let counted_start = session.start.max(start);
            let counted_end = session.end.min(end);
            total += counted_end - counted_start;
        }

        Ok(total)
    }

    /// Recorded sessions whose own `start` or `end` falls within `[start, end]`,
    /// newest first. A session strictly spanning the whole range matches with
    /// neither endpoint and is not returned.
    ///
    /// Assumes `sessions` is sorted by `start` ascending: once a non-match is
    /// seen after at least one match, no older session can match either.
    pub fn sessions_between(
        sessions: &[Session],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<&Session>, DomainError> {
        if start > end {
            return Err(DomainError::InvertedRange { start, end });
        }

        let range = start..=end;
        let mut matching: Vec<&Session> = Vec::new();
        for session in sessions.iter().rev() {
            if range.contains(&session.start) || range.contains(&session.end) {
                matching.push(session);
            } else if !matching.is_empty() {
                break;
            }
        }

        Ok(matching)
    }

    /// Matching recorded sessions plus one for the active session if any,
    /// whether or not its start falls in the range.
    pub fn session_count_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        let matching = Self::sessions_between(&self.sessions, start, end)?;
        let active = usize::from(self.active_session_start.is_some());
        Ok(matching.len() + active)
    }

    /// Did any session (recorded, or active when none are recorded) start at
    /// or before `date`? Distinguishes "no data yet" from "zero tracked time".
    pub fn sessions_before(&self, date: DateTime<Utc>) -> bool {
        if let Some(earliest) = self.sessions.first() {
            earliest.start <= date
        } else if let Some(active_start) = self.active_session_start {
            active_start <= date
        } else {
            false
        }
    }

    /// The most recently effective goal: maximum `start`.
    pub fn current_goal(&self) -> Option<&Goal> {
        self.goals.iter().max_by_key(|goal| goal.start)
    }

    /// The goal in effect on `date`: the newest goal whose `start <= date`.
    /// Past days keep the goal that was active then.
    pub fn goal_for(&self, date: DateTime<Utc>) -> Option<&Goal> {
        self.goals.iter().rev().find(|goal| goal.start <= date)
    }

    /// True when a current goal carries a duration and the tracked total
    /// since `day_start` has reached it.
    pub fn is_goal_complete(
        &self,
        day_start: DateTime<Utc>,
        now: DateTime<Utc>,
        accounting: ActiveAccounting,
    ) -> bool {
        let Some(target) = self.current_goal().and_then(Goal::duration) else {
            return false;
        };
        match self.total_between(day_start, now, accounting) {
            Ok(total) => total >= target,
            Err(_) => false,
        }
    }

    /// Applies `command` to a copy of the topic. An empty event list means
    /// nothing changed and there is nothing to persist.
    pub fn apply(&self, command: TopicCommand) -> Result<Applied, DomainError> {
        let mut topic = self.clone();
        let mut events = Vec::new();

        match command {
            TopicCommand::StartSession { at } => {
                if let Some(started) = topic.active_session_start {
                    return Err(DomainError::SessionAlreadyActive(started));
                }
                topic.active_session_start = Some(at);
                events.push(TopicEvent::SessionStarted { at });
            }
            TopicCommand::StopSession { id, at } => {
                let Some(active_start) = topic.active_session_start else {
                    return Err(DomainError::NoActiveSession);
                };
                let session = Session::new(id, active_start, at)?;
                if let Some(last) = topic.sessions.last() {
                    if last.start > session.start {
                        return Err(DomainError::AppendOutOfOrder {
                            last: last.start,
                            next: session.start,
                        });
                    }
                }
                topic.active_session_start = None;
                topic.sessions.push(session);
                events.push(TopicEvent::SessionRecorded { session });
            }
            TopicCommand::SetGoal {
                id,
                start_of_day,
                duration,
            } => {
                let goal = Goal::new(id, start_of_day, duration);
                // Same effective duration as the current goal: nothing to record.
                if topic.current_goal().and_then(Goal::duration) == goal.duration() {
                    return Ok(Applied { topic, events });
                }
                if let Some(last) = topic.goals.last() {
                    if last.start > goal.start {
                        return Err(DomainError::AppendOutOfOrder {
                            last: last.start,
                            next: goal.start,
                        });
                    }
                }
                topic.goals.push(goal);
                events.push(TopicEvent::GoalSet { goal });
            }
            TopicCommand::RemoveSession { id } => {
                let index = topic
                    .sessions
                    .iter()
                    .position(|session| session.id == id)
                    .ok_or(DomainError::UnknownSession(id))?;
                topic.sessions.remove(index);
                events.push(TopicEvent::SessionRemoved { id });
            }
            TopicCommand::RemoveGoal { id } => {
                let index = topic
                    .goals
                    .iter()
                    .position(|goal| goal.id == id)
                    .ok_or(DomainError::UnknownGoal(id))?;
                topic.goals.remove(index);
                events.push(TopicEvent::GoalRemoved { id });
            }
        }

        Ok(Applied { topic, events })
    }
}

/// Ids and timestamps are caller-supplied so the core stays clock-free.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TopicCommand {
    StartSession {
        at: DateTime<Utc>,
    },
    StopSession {
        id: Uuid,
        at: DateTime<Utc>,
    },
    SetGoal {
        id: Uuid,
        start_of_day: DateTime<Utc>,
        duration: Option<Duration>,
    },
    RemoveSession {
        id: Uuid,
    },
    RemoveGoal {
        id: Uuid,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TopicEvent {
    SessionStarted { at: DateTime<Utc> },
    SessionRecorded { session: Session },
    GoalSet { goal: Goal },
    SessionRemoved { id: Uuid },
    GoalRemoved { id: Uuid },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub topic: Topic,
    pub events: Vec<TopicEvent>,
}

impl Applied {
    /// The caller owes a persistence write exactly when something changed.
    pub fn requires_save(&self) -> bool {
        !self.events.is_empty()
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
