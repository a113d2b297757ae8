use std::{collections::BTreeMap, error::Error, fs::File, io::BufReader, path::Path};

use chrono::{Datelike, NaiveDate, Weekday};
use figment::{
    providers::{Env, Format, Json},
    Figment,
};
use lettre::{message::header::ContentType, Message};
use log::{debug, info};
use serde::de::DeserializeOwned;
use similar::TextDiff;

use super::{
    board::BoardSnapshot,
    models::{booking_model::BookingRecord, Args, Config, MailConfig, Viewer},
};

/// Viewer id -> rendered own-booking lines
pub type ViewerBoards = BTreeMap<String, Vec<String>>;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let file = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(file)?)
}

pub fn load_config(args: &Args) -> Result<Config, figment::Error> {
    let config = Figment::new()
        .merge(Json::file(&args.config_json_path))
        .merge(Env::prefixed("SLOTS_").split("__"))
        .extract()?;
    info!(
        "Read config.json from {}",
        args.config_json_path.display()
    );
    Ok(config)
}

pub fn log_all_viewers(viewers: &[Viewer]) {
    for viewer in viewers.iter() {
        debug!(
            "Serving {} ({}), notified at {}",
            viewer.name, viewer.student_id, viewer.email
        );
    }
}

pub fn get_viewers(args: &Args) -> Result<Vec<Viewer>, Box<dyn Error>> {
    info!(
        "Reading viewers.json from {}",
        std::path::absolute(&args.viewers_json_path)?.display()
    );
    let viewers: Vec<Viewer> = read_json(&args.viewers_json_path)?;
    log_all_viewers(&viewers);
    Ok(viewers)
}

pub fn get_previous_board(args: &Args) -> Result<ViewerBoards, Box<dyn Error>> {
    info!(
        "Reading previous board from {}",
        std::path::absolute(&args.previous_board_json_path)?.display()
    );
    if args.previous_board_json_path.exists() {
        read_json(&args.previous_board_json_path)
    } else {
        Ok(ViewerBoards::new())
    }
}

pub fn write_previous_board(args: &Args, board: &ViewerBoards) -> Result<(), Box<dyn Error>> {
    info!(
        "Writing {} viewers to {}",
        board.len(),
        std::path::absolute(&args.previous_board_json_path)?.display()
    );
    let board_file = File::create(&args.previous_board_json_path)?;
    Ok(serde_json::to_writer_pretty(board_file, board)?)
}

pub fn format_booking(record: &BookingRecord) -> String {
    format!("{}: {}", record.coordinate, record.status)
}

pub fn collect_viewer_boards(snapshot: &BoardSnapshot, viewers: &[Viewer]) -> ViewerBoards {
    viewers
        .iter()
        .map(|viewer| {
            let lines = snapshot
                .own_bookings(&viewer.student_id)
                .into_iter()
                .map(format_booking)
                .collect::<Vec<_>>();
            (viewer.student_id.to_owned(), lines)
        })
        .collect()
}

fn as_text(lines: &[String]) -> String {
    lines.iter().map(|line| format!("{line}\n")).collect()
}

/// Unified diff per viewer whose bookings changed. A viewer missing from the
/// old board is diffed against nothing.
pub fn generate_diff_messages(old: &ViewerBoards, new: &ViewerBoards) -> BTreeMap<String, String> {
    let mut changed = BTreeMap::new();

    for (viewer_id, new_lines) in new {
        let old_lines = old.get(viewer_id).map(Vec::as_slice).unwrap_or_default();
        if old_lines == new_lines.as_slice() {
            continue;
        }
        let old_text = as_text(old_lines);
        let new_text = as_text(new_lines);
        let diff = TextDiff::from_lines(&old_text, &new_text);
        let pretty_diff = diff.unified_diff().context_radius(1).to_string();
        debug!("Changes for {}: {}", viewer_id, pretty_diff);
        changed.insert(viewer_id.to_owned(), pretty_diff);
    }

    changed
}

pub fn generate_email(
    mail: &MailConfig,
    viewer: &Viewer,
    diff: &str,
) -> Result<Message, Box<dyn Error>> {
    let email = Message::builder()
        .from(format!("{} <{}>", mail.sender_fullname, mail.sender_username).parse()?)
        .to(format!("{} <{}>", viewer.name, viewer.email).parse()?)
        .subject("Your shift bookings have changed")
        .header(ContentType::TEXT_PLAIN)
        .body(format!(
            "Dear {},\n\nYour shift bookings have changed:\n\n{}\n{}",
            viewer.name, diff, "This letter was generated automatically, please do not reply."
        ))?;

    Ok(email)
}

/// A weekday without approved coaches is a public holiday.
pub fn build_duty_message(date: NaiveDate, venue: &str, roster: &[&BookingRecord]) -> String {
    let date_str = date.format("%d %b %Y (%A)");

    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return format!("📌 {date_str}\n\n🚫 Weekend, {venue} closed.");
    }
    if roster.is_empty() {
        return format!("📌 {date_str}\n\n🚫 Public Holiday, {venue} closed.");
    }

    let mut lines = vec![format!("📌 {date_str}\n👥 Student Coach on Duty:\n")];
    for record in roster {
        lines.push(format!(
            "• {} — {} ({})",
            record.student_name, record.coordinate.shift_type, record.coordinate.slot_level
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
#[path = "tests/tests.rs"]
mod tests;
