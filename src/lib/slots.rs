//! Client side of the student-coach shift booking service: snapshot decoding,
//! slot projection, booking actions and change notifications.
pub mod board;
pub mod booking_gateway;
pub mod errors;
pub mod helpers;
pub mod letter_sender;
pub mod models;
pub mod projection;
pub mod run_tool;
pub mod snapshot_getter;
