use thiserror::Error as ThisError;

use super::{
    models::booking_model::Coordinate,
    projection::{BlockingReason, SlotState, SlotView},
};

/// Raised when a record coming from the server does not fit the closed
/// vocabulary the client understands. Any of these means the client and the
/// server disagree on the schema, so nothing is guessed.
#[derive(ThisError, Debug)]
pub enum DecodeError {
    #[error("Invalid status from backend: {0}")]
    UnknownStatus(String),

    #[error("Unknown shift type: {0}")]
    UnknownShiftType(String),

    #[error("Unknown slot level: {0}")]
    UnknownSlotLevel(String),

    #[error("Invalid slot number: {0}")]
    InvalidSlotNumber(String),

    #[error("Invalid date {value}: {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Record has an empty student id")]
    MissingStudentId,
}

/// Everything that can go wrong while talking to the server.
#[derive(ThisError, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The server answered, but refused the request
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The server answered with something that is not JSON
    #[error("Unexpected server response (HTTP {status})")]
    UnexpectedResponse { status: u16, body: String },
}

#[derive(ThisError, Debug)]
pub enum ActionError {
    /// Refused locally, no request was issued
    #[error("{0}")]
    Blocked(BlockingReason),

    #[error("No action is available for this slot")]
    NoAction,

    #[error("Cannot {requested} a slot in state {state:?}")]
    Mismatch {
        requested: &'static str,
        state: SlotState,
    },

    #[error("Cancelled by user")]
    Declined,

    #[error("No pending application from {student_id} for {coordinate}")]
    NotPending {
        student_id: String,
        coordinate: Coordinate,
    },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// A failed action together with the view the user was looking at. The view
/// is returned as-is: nothing is mutated before the server confirms.
#[derive(ThisError, Debug)]
#[error("{source}")]
pub struct ActionFailure {
    pub previous: Option<SlotView>,
    #[source]
    pub source: ActionError,
}

impl ActionFailure {
    pub fn new(previous: Option<SlotView>, source: impl Into<ActionError>) -> Self {
        Self {
            previous,
            source: source.into(),
        }
    }
}
