//! Projection of one slot coordinate into what the viewer sees and may do.
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
    errors::ActionError,
    models::booking_model::{BookingRecord, SlotControl, Status},
};

/// What to assume for a coordinate that has no slot control record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingControl {
    Closed,
    Open,
}

/// Slots without a control record are not bookable.
pub const DEFAULT_MISSING_CONTROL: MissingControl = MissingControl::Closed;

impl Default for MissingControl {
    fn default() -> Self {
        DEFAULT_MISSING_CONTROL
    }
}

/// Clearances held by the viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Eligibility {
    pub on_job_training: bool,
    pub night_shift: bool,
}

impl Eligibility {
    /// Reason the viewer may not book a slot with these requirements, if any.
    pub fn check(&self, control: &SlotControl) -> Option<&'static str> {
        match (control.on_job_training, control.night_shift) {
            (true, false) if !self.on_job_training => Some("OJT required"),
            (false, true) if !self.night_shift => Some("Night shift eligibility required"),
            (true, true) if !self.on_job_training && !self.night_shift => {
                Some("OJT or Night shift required")
            }
            _ => None,
        }
    }
}

/// Everything about the viewer the projection depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerContext {
    pub viewer_id: String,
    /// Viewer's non-rejected bookings in the slot's month
    pub monthly_count: usize,
    pub max_bookings_per_month: usize,
    pub eligibility: Eligibility,
    pub missing_control: MissingControl,
}

impl ViewerContext {
    pub fn new(viewer_id: &str, monthly_count: usize, max_bookings_per_month: usize) -> Self {
        Self {
            viewer_id: viewer_id.to_owned(),
            monthly_count,
            max_bookings_per_month,
            eligibility: Eligibility::default(),
            missing_control: DEFAULT_MISSING_CONTROL,
        }
    }

    pub fn with_eligibility(mut self, eligibility: Eligibility) -> Self {
        self.eligibility = eligibility;
        self
    }

    pub fn with_missing_control(mut self, missing_control: MissingControl) -> Self {
        self.missing_control = missing_control;
        self
    }

    pub fn has_booking_left(&self) -> bool {
        self.monthly_count < self.max_bookings_per_month
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SlotState {
    Closed,
    Available,
    OwnPending,
    OwnApproved,
    OwnRejected,
    FilledByOther,
    Waitlisted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SlotAction {
    None,
    Book,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BlockingReason {
    AdminRemark(String),
    SlotFilled,
    MonthlyCapReached,
    Ineligible(String),
}

impl fmt::Display for BlockingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockingReason::AdminRemark(remark) => f.write_str(remark),
            BlockingReason::SlotFilled => f.write_str("slot filled"),
            BlockingReason::MonthlyCapReached => f.write_str("monthly cap reached"),
            BlockingReason::Ineligible(reason) => f.write_str(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub state: SlotState,
    pub action: SlotAction,
    pub label: String,
    pub blocking_reason: Option<BlockingReason>,
    /// Pending applications by other viewers
    pub waitlist_count: usize,
}

impl SlotView {
    fn new(state: SlotState, action: SlotAction, label: String) -> Self {
        Self {
            state,
            action,
            label,
            blocking_reason: None,
            waitlist_count: 0,
        }
    }

    fn closed(remark: Option<String>) -> Self {
        let label = match &remark {
            Some(remark) => format!("Closed: {remark}"),
            None => "Closed".to_owned(),
        };
        Self {
            blocking_reason: remark.map(BlockingReason::AdminRemark),
            ..Self::new(SlotState::Closed, SlotAction::None, label)
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.action == SlotAction::None || self.blocking_reason.is_some()
    }
}

/// Derives the viewer's view of one coordinate. `records` must all belong to
/// that coordinate. The first matching rule wins: closure, then the viewer's
/// own record, then an approved occupant, then pending applications.
pub fn project(
    records: &[BookingRecord],
    control: Option<&SlotControl>,
    viewer: &ViewerContext,
) -> SlotView {
    let is_open = match control {
        Some(control) => control.is_open,
        None => viewer.missing_control == MissingControl::Open,
    };
    if !is_open {
        let remark = control
            .map(|control| control.remark.trim())
            .filter(|remark| !remark.is_empty())
            .map(str::to_owned);
        return SlotView::closed(remark);
    }

    if let Some(own) = records.iter().find(|r| r.student_id == viewer.viewer_id) {
        return match own.status {
            Status::Pending => SlotView::new(
                SlotState::OwnPending,
                SlotAction::Cancel,
                "🟡 Applied pending approval — Cancel".to_owned(),
            ),
            Status::Approved => SlotView::new(
                SlotState::OwnApproved,
                SlotAction::Cancel,
                format!("🟢 {} — Cancel", own.student_name),
            ),
            Status::Rejected => SlotView::new(
                SlotState::OwnRejected,
                SlotAction::None,
                "🔴 Rejected".to_owned(),
            ),
        };
    }

    if let Some(occupant) = records
        .iter()
        .find(|r| r.status == Status::Approved && r.student_id != viewer.viewer_id)
    {
        return SlotView {
            blocking_reason: Some(BlockingReason::SlotFilled),
            ..SlotView::new(
                SlotState::FilledByOther,
                SlotAction::None,
                format!("🟢 {}", occupant.student_name),
            )
        };
    }

    let waitlist_count = records
        .iter()
        .filter(|r| r.status == Status::Pending && r.student_id != viewer.viewer_id)
        .count();
    let view = if waitlist_count > 0 {
        SlotView {
            waitlist_count,
            ..SlotView::new(
                SlotState::Waitlisted,
                SlotAction::Book,
                format!("🟡 Join waiting list ({waitlist_count})"),
            )
        }
    } else {
        SlotView::new(SlotState::Available, SlotAction::Book, "Book".to_owned())
    };

    guard_booking(view, control, viewer)
}

/// Local checks in front of a booking. The server has the final word.
fn guard_booking(
    mut view: SlotView,
    control: Option<&SlotControl>,
    viewer: &ViewerContext,
) -> SlotView {
    if let Some(reason) = control.and_then(|control| viewer.eligibility.check(control)) {
        view.action = SlotAction::None;
        view.blocking_reason = Some(BlockingReason::Ineligible(reason.to_owned()));
    } else if !viewer.has_booking_left() {
        view.blocking_reason = Some(BlockingReason::MonthlyCapReached);
    }
    view
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelKind {
    WithdrawPending,
    /// The server turns this into a cancellation request for an admin
    RequestApprovedCancellation,
}

impl CancelKind {
    pub fn prompt(&self) -> &'static str {
        match self {
            CancelKind::WithdrawPending => "Cancel this pending shift?",
            CancelKind::RequestApprovedCancellation => {
                "This shift is approved. Cancellation requires admin approval. Proceed?"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Book,
    Cancel(CancelKind),
}

/// Turns a view into the request it allows, or the reason it allows none.
pub fn resolve_action(view: &SlotView) -> Result<Intent, ActionError> {
    match (view.action, view.state) {
        (SlotAction::Book, _) => match &view.blocking_reason {
            Some(reason) => Err(ActionError::Blocked(reason.clone())),
            None => Ok(Intent::Book),
        },
        (SlotAction::Cancel, SlotState::OwnApproved) => {
            Ok(Intent::Cancel(CancelKind::RequestApprovedCancellation))
        }
        (SlotAction::Cancel, _) => Ok(Intent::Cancel(CancelKind::WithdrawPending)),
        (SlotAction::None, _) => match &view.blocking_reason {
            Some(reason) => Err(ActionError::Blocked(reason.clone())),
            None => Err(ActionError::NoAction),
        },
    }
}

#[cfg(test)]
#[path = "tests/projection_tests.rs"]
mod tests;
