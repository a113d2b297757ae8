//! Module with booking and slot control models compatible with the shift server's REST API
use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::slots::errors::DecodeError;

/// Spreadsheet-backed endpoints are loose about scalar types: ids come as
/// numbers or strings, flags as booleans or 0/1.
#[derive(Deserialize, Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum WireScalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl WireScalar {
    /// String form used for identity comparisons.
    pub fn to_key(&self) -> String {
        match self {
            WireScalar::Bool(b) => b.to_string(),
            WireScalar::Int(n) => n.to_string(),
            WireScalar::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
            WireScalar::Float(f) => f.to_string(),
            WireScalar::Text(s) => s.trim().to_owned(),
        }
    }

    pub fn to_flag(&self) -> bool {
        match self {
            WireScalar::Bool(b) => *b,
            WireScalar::Int(n) => *n != 0,
            WireScalar::Float(f) => *f != 0.0,
            WireScalar::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShiftType {
    Morning,
    Afternoon,
    Night,
}

impl ShiftType {
    pub const ALL: [ShiftType; 3] = [ShiftType::Morning, ShiftType::Afternoon, ShiftType::Night];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftType::Morning => "Morning",
            ShiftType::Afternoon => "Afternoon",
            ShiftType::Night => "Night",
        }
    }
}

impl FromStr for ShiftType {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShiftType::ALL
            .into_iter()
            .find(|shift| shift.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DecodeError::UnknownShiftType(s.to_owned()))
    }
}

impl fmt::Display for ShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SlotLevel {
    L3,
    L4,
    L6,
}

impl SlotLevel {
    pub const ALL: [SlotLevel; 3] = [SlotLevel::L3, SlotLevel::L4, SlotLevel::L6];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotLevel::L3 => "L3",
            SlotLevel::L4 => "L4",
            SlotLevel::L6 => "L6",
        }
    }
}

impl FromStr for SlotLevel {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SlotLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DecodeError::UnknownSlotLevel(s.to_owned()))
    }
}

impl fmt::Display for SlotLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every level has exactly two slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotNumber {
    One,
    Two,
}

impl SlotNumber {
    pub const ALL: [SlotNumber; 2] = [SlotNumber::One, SlotNumber::Two];

    pub fn get(&self) -> u8 {
        match self {
            SlotNumber::One => 1,
            SlotNumber::Two => 2,
        }
    }
}

impl TryFrom<&WireScalar> for SlotNumber {
    type Error = DecodeError;

    fn try_from(value: &WireScalar) -> Result<Self, Self::Error> {
        value.to_key().parse()
    }
}

impl FromStr for SlotNumber {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(SlotNumber::One),
            "2" => Ok(SlotNumber::Two),
            other => Err(DecodeError::InvalidSlotNumber(other.to_owned())),
        }
    }
}

impl fmt::Display for SlotNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Pending,
    Approved,
    Rejected,
}

impl Status {
    /// Absent or blank statuses are pending applications; anything outside
    /// the three known values is rejected.
    pub fn normalize(raw: Option<&str>) -> Result<Self, DecodeError> {
        let trimmed = raw.map(str::trim).unwrap_or_default();
        match trimmed {
            "" | "Pending" => Ok(Status::Pending),
            "Approved" => Ok(Status::Approved),
            "Rejected" => Ok(Status::Rejected),
            other => Err(DecodeError::UnknownStatus(other.to_owned())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Approved => "Approved",
            Status::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, DecodeError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|source| DecodeError::InvalidDate {
        value: raw.to_owned(),
        source,
    })
}

/// One bookable slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub date: NaiveDate,
    pub shift_type: ShiftType,
    pub slot_level: SlotLevel,
    pub slot_number: SlotNumber,
}

impl Coordinate {
    pub fn new(
        date: NaiveDate,
        shift_type: ShiftType,
        slot_level: SlotLevel,
        slot_number: SlotNumber,
    ) -> Self {
        Self {
            date,
            shift_type,
            slot_level,
            slot_number,
        }
    }

    /// All slots of a day, shift by shift, level by level.
    pub fn day_grid(date: NaiveDate) -> impl Iterator<Item = Coordinate> {
        ShiftType::ALL.into_iter().flat_map(move |shift_type| {
            SlotLevel::ALL.into_iter().flat_map(move |slot_level| {
                SlotNumber::ALL.into_iter().map(move |slot_number| {
                    Coordinate::new(date, shift_type, slot_level, slot_number)
                })
            })
        })
    }

    fn decode(
        date: &str,
        shift_type: &str,
        slot_level: &str,
        slot_number: &WireScalar,
    ) -> Result<Self, DecodeError> {
        Ok(Coordinate::new(
            parse_date(date)?,
            shift_type.parse()?,
            slot_level.parse()?,
            SlotNumber::try_from(slot_number)?,
        ))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} #{}",
            self.date, self.shift_type, self.slot_level, self.slot_number
        )
    }
}

/// Booking record as it comes out of `/api/applications`.
#[derive(Deserialize, Debug, Serialize, Clone)]
pub struct RawBookingRecord {
    pub student_id: WireScalar,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub shift_type: Option<String>,
    #[serde(default)]
    pub slot_level: Option<String>,
    pub slot_number: WireScalar,
    #[serde(default)]
    pub status: Option<String>,
}

impl RawBookingRecord {
    pub fn belongs_to(&self, division: &str) -> bool {
        self.division.as_deref().map(str::trim) == Some(division)
            && self.shift_type.as_deref().is_some_and(|s| !s.trim().is_empty())
            && self.date.as_deref().is_some_and(|d| !d.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRecord {
    pub student_id: String,
    pub student_name: String,
    pub division: String,
    pub coordinate: Coordinate,
    pub status: Status,
}

impl TryFrom<RawBookingRecord> for BookingRecord {
    type Error = DecodeError;

    fn try_from(raw: RawBookingRecord) -> Result<Self, Self::Error> {
        let student_id = raw.student_id.to_key();
        if student_id.is_empty() {
            return Err(DecodeError::MissingStudentId);
        }
        let status = Status::normalize(raw.status.as_deref())?;
        let coordinate = Coordinate::decode(
            raw.date.as_deref().unwrap_or_default(),
            raw.shift_type.as_deref().unwrap_or_default(),
            raw.slot_level.as_deref().unwrap_or_default(),
            &raw.slot_number,
        )?;

        Ok(BookingRecord {
            student_id,
            student_name: raw.student_name.unwrap_or_default().trim().to_owned(),
            division: raw.division.unwrap_or_default().trim().to_owned(),
            coordinate,
            status,
        })
    }
}

/// Slot control record as it comes out of `/api/slot_controls`.
#[derive(Deserialize, Debug, Serialize, Clone)]
pub struct RawSlotControl {
    pub date: String,
    pub shift_type: String,
    pub slot_level: String,
    pub slot_number: WireScalar,
    #[serde(alias = "isopen")]
    pub is_open: WireScalar,
    #[serde(default, alias = "remarks")]
    pub remark: Option<String>,
    #[serde(default, alias = "onjobtrain")]
    pub on_job_training: Option<WireScalar>,
    #[serde(default, alias = "nightshift")]
    pub night_shift: Option<WireScalar>,
}

/// Administrative override for one coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotControl {
    pub coordinate: Coordinate,
    pub is_open: bool,
    pub remark: String,
    /// Booking requires on-the-job training
    pub on_job_training: bool,
    /// Booking requires night shift clearance
    pub night_shift: bool,
}

impl SlotControl {
    pub fn open(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            is_open: true,
            remark: String::new(),
            on_job_training: false,
            night_shift: false,
        }
    }

    pub fn closed(coordinate: Coordinate, remark: &str) -> Self {
        Self {
            is_open: false,
            remark: remark.to_owned(),
            ..Self::open(coordinate)
        }
    }
}

impl TryFrom<RawSlotControl> for SlotControl {
    type Error = DecodeError;

    fn try_from(raw: RawSlotControl) -> Result<Self, Self::Error> {
        Ok(SlotControl {
            coordinate: Coordinate::decode(
                &raw.date,
                &raw.shift_type,
                &raw.slot_level,
                &raw.slot_number,
            )?,
            is_open: raw.is_open.to_flag(),
            remark: raw.remark.unwrap_or_default().trim().to_owned(),
            on_job_training: raw.on_job_training.is_some_and(|f| f.to_flag()),
            night_shift: raw.night_shift.is_some_and(|f| f.to_flag()),
        })
    }
}
