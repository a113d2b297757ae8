//! Snapshot of one division's bookings and slot controls, and the views derived from it.
use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use log::{debug, warn};

use super::{
    errors::DecodeError,
    models::booking_model::{
        BookingRecord, Coordinate, RawBookingRecord, RawSlotControl, ShiftType, SlotControl,
        Status,
    },
    projection::{project, Eligibility, MissingControl, SlotView, ViewerContext},
};

/// The parts of the viewer that do not depend on the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerProfile {
    pub viewer_id: String,
    pub eligibility: Eligibility,
    pub max_bookings_per_month: usize,
    pub missing_control: MissingControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarMarker {
    pub icon: &'static str,
    pub shift_type: ShiftType,
}

/// Keeps the records of `division` and decodes them, all or nothing.
pub fn decode_records(
    division: &str,
    raw_records: Vec<RawBookingRecord>,
) -> Result<Vec<BookingRecord>, DecodeError> {
    let total = raw_records.len();
    let records = raw_records
        .into_iter()
        .filter(|raw| raw.belongs_to(division))
        .map(BookingRecord::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    debug!(
        "Kept {} of {} records for division {}",
        records.len(),
        total,
        division
    );
    Ok(records)
}

/// A fetched snapshot. Never patched: a refetch builds a new one.
#[derive(Debug, Clone, Default)]
pub struct BoardSnapshot {
    slots: BTreeMap<Coordinate, Vec<BookingRecord>>,
    controls: BTreeMap<Coordinate, SlotControl>,
}

impl BoardSnapshot {
    /// Decodes both lists. A single record with an unknown status fails the
    /// whole snapshot.
    pub fn from_raw(
        division: &str,
        raw_records: Vec<RawBookingRecord>,
        raw_controls: Vec<RawSlotControl>,
    ) -> Result<Self, DecodeError> {
        let records = decode_records(division, raw_records)?;
        let controls = raw_controls
            .into_iter()
            .map(SlotControl::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(records, controls))
    }

    pub fn new(records: Vec<BookingRecord>, controls: Vec<SlotControl>) -> Self {
        let mut slots: BTreeMap<Coordinate, Vec<BookingRecord>> = BTreeMap::new();
        for record in records {
            slots.entry(record.coordinate).or_default().push(record);
        }

        let mut by_coordinate = BTreeMap::new();
        for control in controls {
            if let Some(previous) = by_coordinate.insert(control.coordinate, control) {
                warn!(
                    "Duplicate slot control for {}, keeping the later one",
                    previous.coordinate
                );
            }
        }

        Self {
            slots,
            controls: by_coordinate,
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &BookingRecord> {
        self.slots.values().flatten()
    }

    pub fn records_at(&self, coordinate: &Coordinate) -> &[BookingRecord] {
        self.slots
            .get(coordinate)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn control_at(&self, coordinate: &Coordinate) -> Option<&SlotControl> {
        self.controls.get(coordinate)
    }

    /// Viewer's bookings in the month of `date` that still count against the cap.
    pub fn monthly_count(&self, viewer_id: &str, date: NaiveDate) -> usize {
        self.records()
            .filter(|r| {
                r.student_id == viewer_id
                    && r.status != Status::Rejected
                    && r.coordinate.date.year() == date.year()
                    && r.coordinate.date.month() == date.month()
            })
            .count()
    }

    pub fn viewer_context(&self, profile: &ViewerProfile, date: NaiveDate) -> ViewerContext {
        ViewerContext::new(
            &profile.viewer_id,
            self.monthly_count(&profile.viewer_id, date),
            profile.max_bookings_per_month,
        )
        .with_eligibility(profile.eligibility)
        .with_missing_control(profile.missing_control)
    }

    pub fn project_slot(&self, coordinate: &Coordinate, profile: &ViewerProfile) -> SlotView {
        let viewer = self.viewer_context(profile, coordinate.date);
        project(
            self.records_at(coordinate),
            self.control_at(coordinate),
            &viewer,
        )
    }

    pub fn project_day(
        &self,
        date: NaiveDate,
        profile: &ViewerProfile,
    ) -> Vec<(Coordinate, SlotView)> {
        let viewer = self.viewer_context(profile, date);
        Coordinate::day_grid(date)
            .map(|coordinate| {
                let view = project(
                    self.records_at(&coordinate),
                    self.control_at(&coordinate),
                    &viewer,
                );
                (coordinate, view)
            })
            .collect()
    }

    /// Status markers per day for every record of the given month.
    pub fn calendar_markers(
        &self,
        year: i32,
        month: u32,
    ) -> BTreeMap<NaiveDate, Vec<CalendarMarker>> {
        let mut markers: BTreeMap<NaiveDate, Vec<CalendarMarker>> = BTreeMap::new();
        for record in self
            .records()
            .filter(|r| r.coordinate.date.year() == year && r.coordinate.date.month() == month)
        {
            let icon = match record.status {
                Status::Pending => "🟡",
                Status::Approved => "🟢",
                Status::Rejected => "🔴",
            };
            markers
                .entry(record.coordinate.date)
                .or_default()
                .push(CalendarMarker {
                    icon,
                    shift_type: record.coordinate.shift_type,
                });
        }
        markers
    }

    pub fn own_bookings(&self, viewer_id: &str) -> Vec<&BookingRecord> {
        self.records()
            .filter(|r| r.student_id == viewer_id)
            .collect()
    }

    pub fn duty_roster(&self, date: NaiveDate) -> Vec<&BookingRecord> {
        self.records()
            .filter(|r| r.coordinate.date == date && r.status == Status::Approved)
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/board_tests.rs"]
mod tests;
