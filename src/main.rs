mod calendar;
mod domain;
mod storage;
mod topics;
mod view;
mod week;

use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::domain::{format_duration, Applied, TopicCommand, TopicEvent};
use crate::storage::{load_topic, remove_topic, save_topic, StorageError};
use crate::topics::{config_path, data_dir, load_config};
use crate::view::{topic_status, week_summary, TodayAnchor};
use crate::week::{TopicWeek, Week};

#[derive(Debug, Parser)]
#[command(name = "goaltrack", about = "Terminal-first session tracker with daily goals")]
struct Cli {
	#[arg(long)]
	data_dir: Option<PathBuf>,
	#[arg(long)]
	config: Option<PathBuf>,
	#[arg(long)]
	topic: Option<Uuid>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Init,
	Start,
	Stop,
	Status,
	Watch,
	Goal {
		#[arg(long, conflicts_with = "clear")]
		duration: Option<String>,
		#[arg(long)]
		clear: bool,
	},
	Week {
		#[arg(long)]
		date: Option<String>,
		#[arg(long, default_value_t = 0, allow_negative_numbers = true)]
		offset: i64,
	},
	Sessions {
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
	Goals,
	RemoveSession {
		#[arg(long)]
		id: Uuid,
	},
	RemoveGoal {
		#[arg(long)]
		id: Uuid,
	},
	Reset,
}

fn main() {
	env_logger::init();
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();

	let config = load_config(&cli.config.unwrap_or_else(config_path))?;
	let calendar = config.calendar_spec()?;
	let accounting = config.accounting();
	let data_dir = cli.data_dir.unwrap_or_else(data_dir);
	let topic_id = cli.topic.unwrap_or_else(|| config.topic_id());

	let topic = load_topic(&data_dir, topic_id)?;
	log::debug!(
		"loaded topic {topic_id}: {} sessions, {} goals, running: {}",
		topic.sessions.len(),
		topic.goals.len(),
		topic.is_running()
	);

	match cli.command.unwrap_or(Command::Status) {
		Command::Init => {
			save_topic(&data_dir, &topic)?;
			println!("initialized topic {} at {}", topic.id, data_dir.display());
		}
		Command::Start => {
			let now = Utc::now();
			let applied = topic.apply(TopicCommand::StartSession { at: now })?;
			commit(&applied, &data_dir)?;
			println!("started session at {}", now.to_rfc3339());
		}
		Command::Stop => {
			let applied = topic.apply(TopicCommand::StopSession {
				id: Uuid::new_v4(),
				at: Utc::now(),
			})?;
			commit(&applied, &data_dir)?;
			if let Some(TopicEvent::SessionRecorded { session }) = applied.events.first() {
				println!("stopped after {}", format_duration(session.duration()));
			}
		}
		Command::Status => {
			let now = Utc::now();
			let today = calendar.components(now)?;
			println!(
				"{} {}-{:02}-{:02} (week {} of {})",
				today.weekday, today.year, today.month, today.day,
				today.week_of_year, today.year_for_week
			);

			let anchor = TodayAnchor::new(now, &calendar)?;
			let status = topic_status(&topic, anchor.start_of_today(), now, accounting)?;

			let running = if status.running { " (running)" } else { "" };
			println!("{} / {}{running}", status.timer, status.goal);
			let unit = if status.session_count == 1 {
				"session"
			} else {
				"sessions"
			};
			println!("{} {unit} today", status.session_count);
			if status.goal_complete {
				println!("daily goal reached");
			}
			println!("next: goaltrack {}", status.action_label());
		}
		Command::Watch => {
			let mut anchor = TodayAnchor::new(Utc::now(), &calendar)?;
			loop {
				let now = Utc::now();
				if anchor.refresh(now, &calendar)? {
					log::debug!("day rolled over at {now}");
				}
				let status = topic_status(&topic, anchor.start_of_today(), now, accounting)?;
				let running = if status.running { " (running)" } else { "          " };
				print!("\r{} / {}{running}", status.timer, status.goal);
				io::stdout().flush()?;
				thread::sleep(StdDuration::from_secs(1));
			}
		}
		Command::Goal { duration, clear } => {
			let target = if clear {
				None
			} else {
				match duration {
					Some(raw) => Some(parse_goal_duration(&raw)?),
					None => return Err("pass --duration <e.g. 1h30m> or --clear".into()),
				}
			};

			let now = Utc::now();
			let applied = topic.apply(TopicCommand::SetGoal {
				id: Uuid::new_v4(),
				start_of_day: calendar.start_of_day(now)?,
				duration: target,
			})?;
			commit(&applied, &data_dir)?;

			if let Some(TopicEvent::GoalSet { goal }) = applied.events.first() {
				match goal.duration() {
					Some(target) => println!("daily goal set to {}", format_duration(target)),
					None => println!("daily goal cleared"),
				}
			} else {
				println!("daily goal unchanged");
			}
		}
		Command::Week { date, offset } => {
			let now = Utc::now();
			let anchored = match date {
				Some(raw) => {
					let day = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")?;
					Week::of_date(day, &calendar)?
				}
				None => Week::containing(now, &calendar)?,
			};
			let week = if offset == 0 {
				anchored
			} else {
				anchored.offset_weeks(offset, &calendar)?
			};

			let topic_week = TopicWeek { topic, week };
			log::debug!("projecting {}", topic_week.id());
			let summary = week_summary(&topic_week, now, &calendar, accounting)?;
			println!("{} ({})", summary.title, summary.subtitle);
			for day in &summary.days {
				println!(
					"{} {} | {} / {}",
					day.marker.symbol(),
					day.day_label,
					day.duration,
					day.goal
				);
			}
		}
		Command::Sessions { limit } => {
			if let Some(active_start) = topic.active_session_start {
				println!("active since {}", active_start.to_rfc3339());
			}
			if topic.sessions.is_empty() {
				if !topic.is_running() {
					println!("no sessions recorded");
				}
			} else {
				for session in topic.sessions.iter().rev().take(limit) {
					println!(
						"{} | {} | {}",
						session.start.to_rfc3339(),
						format_duration(session.duration()),
						session.id
					);
				}
			}
		}
		Command::Goals => {
			if topic.goals.is_empty() {
				println!("no goals set");
			} else {
				for goal in topic.goals.iter().rev() {
					let target = goal
						.duration()
						.map(format_duration)
						.unwrap_or_else(|| "unset".to_string());
					println!(
						"{} | {} | {}",
						calendar.local_date(goal.start).format("%Y-%m-%d"),
						target,
						goal.id
					);
				}
			}
		}
		Command::RemoveSession { id } => {
			let applied = topic.apply(TopicCommand::RemoveSession { id })?;
			commit(&applied, &data_dir)?;
			println!("removed session {id}");
		}
		Command::RemoveGoal { id } => {
			let applied = topic.apply(TopicCommand::RemoveGoal { id })?;
			commit(&applied, &data_dir)?;
			println!("removed goal {id}");
		}
		Command::Reset => {
			remove_topic(&data_dir, topic_id)?;
			println!("removed topic {topic_id}");
		}
	}

	Ok(())
}

fn commit(applied: &Applied, data_dir: &Path) -> Result<(), StorageError> {
	if !applied.requires_save() {
		return Ok(());
	}

	save_topic(data_dir, &applied.topic)?;
	for event in &applied.events {
		log::debug!("applied {event:?}");
	}
	Ok(())
}

/// Accepts `1h30m`, `45m`, `90s` style values, or a bare number of minutes.
fn parse_goal_duration(input: &str) -> Result<Duration, Box<dyn Error>> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err("empty duration".into());
	}

	if let Ok(minutes) = trimmed.parse::<i64>() {
		return Duration::try_minutes(minutes)
			.ok_or_else(|| format!("duration out of range: {input}").into());
	}

	let mut total = Duration::zero();
	let mut digits = String::new();
	for ch in trimmed.chars() {
		if ch.is_ascii_digit() {
			digits.push(ch);
			continue;
		}

		let value: i64 = digits
			.parse()
			.map_err(|_| format!("invalid duration: {input}"))?;
		digits.clear();
		let part = match ch {
			'h' => Duration::try_hours(value),
			'm' => Duration::try_minutes(value),
			's' => Duration::try_seconds(value),
			other => return Err(format!("invalid duration unit '{other}' in {input}").into()),
		};
		total = part
			.and_then(|part| total.checked_add(&part))
			.ok_or_else(|| format!("duration out of range: {input}"))?;
	}

	if !digits.is_empty() {
		return Err(format!("missing unit in duration: {input}").into());
	}

	Ok(total)
}
