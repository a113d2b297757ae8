use std::path::PathBuf;

use chrono::{FixedOffset, NaiveDate};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::{Deserialize, Deserializer, Serialize};

use super::{
    board::ViewerProfile,
    projection::{Eligibility, MissingControl},
};

pub mod booking_model;

use booking_model::{Coordinate, ShiftType, SlotLevel, SlotNumber};

/// A model for describing viewers watched by the `notify` command.
/// Consists of:
/// 1. Viewer's name, written at the beginning of the letter
/// 2. Viewer's student id as the server knows it
/// 3. Viewer's email address to which they will receive letters
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Viewer {
    pub name: String,
    #[serde(deserialize_with = "trimmed")]
    pub student_id: String,
    pub email: String,
}

/// Ids on the wire are compared trimmed, so hand-written ones are too.
fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(String::deserialize(deserializer)?.trim().to_owned())
}

/// A model for describing ARGS of the tool.
/// Consists of:
/// 1. Path to config.json, with the server address, the acting viewer and the mail settings.
/// 2. Path to viewers.json, the list of viewers who receive change notifications.
/// 3. Path to previous_board.json, the viewers' bookings as of the last `notify` run.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, value_name = "FILE", default_value = "config.json")]
    pub config_json_path: PathBuf,
    #[arg(long, value_name = "FILE", default_value = "viewers.json")]
    pub viewers_json_path: PathBuf,
    #[arg(long, value_name = "FILE", default_value = "previous_board.json")]
    pub previous_board_json_path: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show every slot of a day as the configured viewer sees it
    Board {
        #[arg(long)]
        date: NaiveDate,
    },
    /// Show booking markers for every day of a month (YYYY-MM)
    Calendar {
        #[arg(long)]
        month: String,
    },
    /// List the configured viewer's own bookings
    Mine,
    /// Apply for a slot
    Book(SlotArgs),
    /// Withdraw an application, or ask to cancel an approved shift
    Cancel(SlotArgs),
    /// Mail watched viewers whose bookings changed since the last run
    Notify,
    /// List applications awaiting an admin decision (admin session)
    Pending,
    /// Approve a pending application (admin session)
    Approve(ReviewArgs),
    /// Reject a pending application (admin session)
    Reject(ReviewArgs),
    /// Print the coaches on duty for a day (today in the configured offset by default)
    Duty {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SlotArgs {
    #[arg(long)]
    pub date: NaiveDate,
    #[arg(long)]
    pub shift: ShiftType,
    #[arg(long)]
    pub level: SlotLevel,
    #[arg(long)]
    pub slot: SlotNumber,
    /// Do not ask for confirmation
    #[arg(long, short)]
    pub yes: bool,
}

impl SlotArgs {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.date, self.shift, self.level, self.slot)
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ReviewArgs {
    #[arg(long)]
    pub date: NaiveDate,
    #[arg(long)]
    pub shift: ShiftType,
    #[arg(long)]
    pub level: SlotLevel,
    #[arg(long)]
    pub slot: SlotNumber,
    /// Student id of the applicant
    #[arg(long)]
    pub student: String,
}

impl ReviewArgs {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.date, self.shift, self.level, self.slot)
    }
}

/// A model for describing mail settings.
/// Consists of:
/// 1. SMTP server address
/// 2. Email address from which the letters will be sent
/// 3. Email sender display name, that will be shown in the letter
/// 4. Password for email account from which the letters will be sent
#[derive(Deserialize, Debug, Clone)]
pub struct MailConfig {
    pub relay: String,
    pub sender_username: String,
    pub sender_fullname: String,
    pub sender_password: String,
}

fn default_division() -> String {
    "Student Coach".to_owned()
}

fn default_venue() -> String {
    "ProjectHub".to_owned()
}

/// Singapore time, where the coaches work
fn default_utc_offset_hours() -> i32 {
    8
}

/// A model for describing configuration of the tool.
#[derive(Deserialize, Debug)]
pub struct Config {
    pub base_url: String,
    #[serde(default = "default_division")]
    pub division: String,
    pub viewer_id: String,
    #[serde(default)]
    pub viewer_on_job_training: bool,
    #[serde(default)]
    pub viewer_night_shift: bool,
    pub max_bookings_per_month: usize,
    #[serde(default)]
    pub missing_control: MissingControl,
    #[serde(default)]
    pub session_cookie: Option<String>,
    #[serde(default)]
    pub mail: Option<MailConfig>,
    /// Name used in the duty message
    #[serde(default = "default_venue")]
    pub venue: String,
    /// Offset of the coaches' local time, decides what "today" is
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl Config {
    pub fn viewer_profile(&self) -> ViewerProfile {
        ViewerProfile {
            viewer_id: self.viewer_id.trim().to_owned(),
            eligibility: Eligibility {
                on_job_training: self.viewer_on_job_training,
                night_shift: self.viewer_night_shift,
            },
            max_bookings_per_month: self.max_bookings_per_month,
            missing_control: self.missing_control,
        }
    }

    /// `None` when `utc_offset_hours` is outside of -23..=23.
    pub fn local_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours.checked_mul(3600)?)
    }
}
