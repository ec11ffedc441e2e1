use anyhow::{Context, Result, bail};
use chime_core::{Alarm, AlarmScheduler, AlarmStore, ScheduleOutcome, next_trigger};
use chrono::{Utc, Weekday};
use clap::{Parser, Subcommand};

mod alert;
mod config;
mod dispatch;
mod state;
mod store;
mod wakeups;

use dispatch::{CliScheduler, format_local};

#[derive(Parser, Debug)]
#[command(name = "chime", version, about = "Personal alarm-clock manager")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the default config to ~/.chime/config.toml
    Init,

    /// Create an alarm and schedule its next wake-up
    Add {
        #[arg(long)]
        hour: u32,

        #[arg(long)]
        minute: u32,

        /// Display label
        #[arg(long, default_value = "Alarm")]
        label: String,

        /// Weekdays to ring on, comma separated (mon,tue,...,sun)
        #[arg(long, value_delimiter = ',')]
        days: Vec<String>,

        /// Repeat weekly on the selected days instead of ringing once
        #[arg(long, default_value_t = false)]
        repeat: bool,

        /// Create the alarm disabled
        #[arg(long, default_value_t = false)]
        disabled: bool,
    },

    /// List alarms, newest first
    List,

    /// Change an alarm and replace its wake-up registration
    Edit {
        id: i64,

        #[arg(long)]
        hour: Option<u32>,

        #[arg(long)]
        minute: Option<u32>,

        #[arg(long)]
        label: Option<String>,

        /// Replace the weekday selection (comma separated; "none" clears it)
        #[arg(long, value_delimiter = ',')]
        days: Option<Vec<String>>,

        #[arg(long)]
        repeat: Option<bool>,
    },

    /// Enable an alarm and schedule it
    Enable { id: i64 },

    /// Disable an alarm and cancel its wake-up
    Disable { id: i64 },

    /// Delete an alarm and cancel its wake-up
    Remove { id: i64 },

    /// Fire every due wake-up registration
    Dispatch {
        /// Show what would fire without firing it
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Summarize the wake-up registration table
    Status,

    /// Foreground loop: sleep until the next wake-up and fire it
    Watch,

    /// Re-register every enabled alarm (run after boot)
    Restore,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config()?;
    let tz = cfg.tz()?;

    let mut sched: CliScheduler = AlarmScheduler::new(
        store::JsonAlarmStore::open_default()?,
        wakeups::FileWakeupService::open_default()?,
        alert::TerminalAlert::new(cfg.alerts.desktop_notifications),
        tz,
    );

    match cli.command {
        Command::Init => config::init_config()?,

        Command::Add {
            hour,
            minute,
            label,
            days,
            repeat,
            disabled,
        } => add(&mut sched, hour, minute, label, &days, repeat, disabled)?,

        Command::List => list(&sched)?,

        Command::Edit {
            id,
            hour,
            minute,
            label,
            days,
            repeat,
        } => edit(&mut sched, id, hour, minute, label, days, repeat)?,

        Command::Enable { id } => {
            let alarm = load(&sched, id)?;
            let alarm = Alarm {
                is_enabled: true,
                ..alarm
            };
            sched.store_mut().put(&alarm)?;
            report_scheduled(&mut sched, &alarm)?;
        }

        Command::Disable { id } => {
            let alarm = load(&sched, id)?;
            let alarm = Alarm {
                is_enabled: false,
                ..alarm
            };
            sched.store_mut().put(&alarm)?;
            sched.cancel(id)?;
            println!("Alarm {id} disabled");
        }

        Command::Remove { id } => {
            let alarm = load(&sched, id)?;
            sched.cancel(id)?;
            sched.store_mut().delete(id)?;
            println!("Alarm {} removed ({})", id, alarm.label);
        }

        Command::Dispatch { dry_run } => {
            dispatch::dispatch(&mut sched, dry_run)?;
        }

        Command::Status => dispatch::status(&sched)?,

        Command::Watch => dispatch::watch(&mut sched, cfg.watch.poll_seconds).await?,

        Command::Restore => {
            let summary = sched.restore_all(Utc::now())?;
            println!(
                "Restored {} alarm(s); {} disabled skipped; {} failed",
                summary.scheduled,
                summary.skipped_disabled,
                summary.failures.len()
            );
            for (id, err) in &summary.failures {
                println!("  alarm {id}: {err}");
            }
        }
    }

    Ok(())
}

fn load(sched: &CliScheduler, id: i64) -> Result<Alarm> {
    sched
        .store()
        .get(id)?
        .with_context(|| format!("no alarm with id {id}"))
}

fn add(
    sched: &mut CliScheduler,
    hour: u32,
    minute: u32,
    label: String,
    days: &[String],
    repeat: bool,
    disabled: bool,
) -> Result<()> {
    let mut alarm = Alarm::new(hour, minute)
        .with_label(label)
        .with_repeat_days(&parse_days(days)?);
    alarm.is_recurring = repeat;
    alarm.is_enabled = !disabled;
    alarm.validate()?;

    let id = sched.store_mut().put(&alarm)?;
    alarm.id = id;
    report_scheduled(sched, &alarm)
}

fn edit(
    sched: &mut CliScheduler,
    id: i64,
    hour: Option<u32>,
    minute: Option<u32>,
    label: Option<String>,
    days: Option<Vec<String>>,
    repeat: Option<bool>,
) -> Result<()> {
    let mut alarm = load(sched, id)?;
    if let Some(h) = hour {
        alarm.hour = h;
    }
    if let Some(m) = minute {
        alarm.minute = m;
    }
    if let Some(l) = label {
        alarm.label = l;
    }
    if let Some(days) = days {
        alarm.replace_repeat_days(&parse_days(&days)?);
    }
    if let Some(r) = repeat {
        alarm.is_recurring = r;
    }
    alarm.validate()?;

    sched.store_mut().put(&alarm)?;
    report_scheduled(sched, &alarm)
}

fn report_scheduled(sched: &mut CliScheduler, alarm: &Alarm) -> Result<()> {
    match sched.schedule(alarm, Utc::now())? {
        ScheduleOutcome::Scheduled(when) => {
            println!(
                "Alarm {} set for {}",
                alarm.id,
                format_local(when, sched.timezone())
            );
        }
        ScheduleOutcome::SkippedDisabled => {
            println!("Alarm {} saved (disabled)", alarm.id);
        }
    }
    Ok(())
}

fn list(sched: &CliScheduler) -> Result<()> {
    let alarms = sched.store().list_all()?;
    if alarms.is_empty() {
        println!("No alarms. Add one: chime add --hour 7 --minute 0");
        return Ok(());
    }

    let now = Utc::now();
    let tz = sched.timezone();
    for a in &alarms {
        let state = if a.is_enabled { "on " } else { "off" };
        let days_str = a
            .repeat_days()
            .iter()
            .map(|d| day_code(*d))
            .collect::<Vec<_>>()
            .join(",");
        let cadence = match (a.is_recurring, a.has_repeat_days()) {
            (true, _) => format!("every {days_str}"),
            (false, true) => format!("once {days_str}"),
            (false, false) => "once".to_string(),
        };
        let next = if a.is_enabled {
            match next_trigger(a, now, tz) {
                Some(t) => format_local(t, tz),
                None => "unschedulable".to_string(),
            }
        } else {
            "-".to_string()
        };
        println!(
            "{:>3} [{}] {:02}:{:02}  {:<20} {:<20} next: {}",
            a.id, state, a.hour, a.minute, cadence, a.label, next
        );
    }
    Ok(())
}

fn parse_days(days: &[String]) -> Result<Vec<Weekday>> {
    let mut out = Vec::new();
    for day in days {
        let day = day.trim().to_lowercase();
        if day.is_empty() || day == "none" {
            continue;
        }
        let parsed = match day.as_str() {
            "mon" | "monday" => Weekday::Mon,
            "tue" | "tuesday" => Weekday::Tue,
            "wed" | "wednesday" => Weekday::Wed,
            "thu" | "thursday" => Weekday::Thu,
            "fri" | "friday" => Weekday::Fri,
            "sat" | "saturday" => Weekday::Sat,
            "sun" | "sunday" => Weekday::Sun,
            other => bail!("unknown weekday: {other}"),
        };
        out.push(parsed);
    }
    Ok(out)
}

fn day_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}
