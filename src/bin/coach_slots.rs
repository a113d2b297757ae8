use lib::slots::{board, booking_gateway, helpers, models, run_tool, snapshot_getter};

use std::{
    error::Error,
    io::{self, BufRead, Write},
};

use chrono::{Datelike, NaiveDate, Utc};
use clap::Parser;
use helpers::{build_duty_message, format_booking, load_config};
use lettre::{
    transport::smtp::authentication::{Credentials, Mechanism},
    SmtpTransport,
};
use log::{error, info};
use booking_gateway::{BookingGateway, Decision};
use models::{Args, Command, Config, ReviewArgs, SlotArgs};
use run_tool::{perform_action, review_application, run, RequestedAction};
use snapshot_getter::{ShiftApi, SnapshotGetter};

fn ask(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn print_board(snapshot: &board::BoardSnapshot, config: &Config, date: NaiveDate) {
    let profile = config.viewer_profile();
    println!("{} as {}", date, profile.viewer_id);
    for (coordinate, view) in snapshot.project_day(date, &profile) {
        let reason = view
            .blocking_reason
            .map(|reason| format!("  ({reason})"))
            .unwrap_or_default();
        println!(
            "{:<9} {} #{}  {:<40} {:?}{}",
            coordinate.shift_type.as_str(),
            coordinate.slot_level,
            coordinate.slot_number,
            view.label,
            view.action,
            reason
        );
    }
}

fn print_calendar(snapshot: &board::BoardSnapshot, month: &str) -> Result<(), Box<dyn Error>> {
    let first = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")?;
    for (date, markers) in snapshot.calendar_markers(first.year(), first.month()) {
        let markers = markers
            .iter()
            .map(|m| format!("{} {}", m.icon, m.shift_type))
            .collect::<Vec<_>>()
            .join(", ");
        println!("{date}  {markers}");
    }
    Ok(())
}

async fn act(
    api: &ShiftApi,
    config: &Config,
    slot: &SlotArgs,
    requested: RequestedAction,
) -> Result<(), Box<dyn Error>> {
    let coordinate = slot.coordinate();
    let confirm = |prompt: &str| slot.yes || ask(prompt);
    let profile = config.viewer_profile();
    match perform_action(api, api, &profile, &coordinate, requested, confirm).await {
        Ok(outcome) => {
            if let Some(message) = &outcome.message {
                println!("{message}");
            }
            match &outcome.after {
                Some(view) => println!("{}: {}", coordinate, view.label),
                None => println!("{}: done, reload to see the new state", coordinate),
            }
            Ok(())
        }
        Err(failure) => {
            error!("{} failed: {}", coordinate, failure);
            if let Some(view) = &failure.previous {
                println!("{}: {}", coordinate, view.label);
            }
            Err(failure.into())
        }
    }
}

async fn review(
    api: &ShiftApi,
    args: &ReviewArgs,
    decision: Decision,
) -> Result<(), Box<dyn Error>> {
    let coordinate = args.coordinate();
    let outcome = review_application(api, &coordinate, &args.student, decision).await?;
    let verdict = match decision {
        Decision::Approve => "approved",
        Decision::Reject => "rejected",
    };
    println!("{}: {} {}", coordinate, outcome.application.student_name, verdict);
    if let Some(message) = &outcome.message {
        println!("{message}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    /* Setup logging */
    env_logger::builder()
        .target(env_logger::Target::Stdout)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    /* Get all the required resources */
    let args = Args::parse();
    let config = load_config(&args)?;
    let api = ShiftApi::from_config(reqwest::Client::new(), &config);

    match &args.command {
        Command::Board { date } => {
            let snapshot = api.get_snapshot().await?;
            print_board(&snapshot, &config, *date);
        }
        Command::Calendar { month } => {
            let snapshot = api.get_snapshot().await?;
            print_calendar(&snapshot, month)?;
        }
        Command::Mine => {
            let snapshot = api.get_snapshot().await?;
            let mine = snapshot.own_bookings(&config.viewer_profile().viewer_id);
            if mine.is_empty() {
                println!("No bookings found");
            }
            for record in mine {
                println!("{}", format_booking(record));
            }
        }
        Command::Book(slot) => act(&api, &config, slot, RequestedAction::Book).await?,
        Command::Cancel(slot) => act(&api, &config, slot, RequestedAction::Cancel).await?,
        Command::Notify => {
            let mail = config
                .mail
                .as_ref()
                .ok_or("config.json has no mail section")?;
            let sender = SmtpTransport::relay(&mail.relay)?
                .credentials(Credentials::new(
                    mail.sender_username.to_owned(),
                    mail.sender_password.to_owned(),
                ))
                .authentication(vec![Mechanism::Plain])
                .build();
            let sent = run(&api, &sender, &args, &config).await?;
            info!("Sent {} letters", sent);
        }
        Command::Pending => {
            let pending = api.pending_applications().await?;
            if pending.is_empty() {
                println!("No pending requests");
            }
            for record in &pending {
                println!("{}  {} ({})", record.coordinate, record.student_name, record.student_id);
            }
        }
        Command::Approve(review_args) => review(&api, review_args, Decision::Approve).await?,
        Command::Reject(review_args) => review(&api, review_args, Decision::Reject).await?,
        Command::Duty { date } => {
            let date = match date {
                Some(date) => *date,
                None => {
                    let offset = config
                        .local_offset()
                        .ok_or("utc_offset_hours must be within -23..=23")?;
                    Utc::now().with_timezone(&offset).date_naive()
                }
            };
            let snapshot = api.get_snapshot().await?;
            let roster = snapshot.duty_roster(date);
            println!("{}", build_duty_message(date, &config.venue, &roster));
        }
    }

    Ok(())
}
