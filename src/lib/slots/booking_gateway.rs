use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::{
    board::decode_records,
    errors::GatewayError,
    models::booking_model::{BookingRecord, Coordinate, RawBookingRecord, ShiftType, SlotLevel},
    snapshot_getter::ShiftApi,
};

/// Body of `POST /api/submit`.
#[derive(Serialize, Debug, PartialEq)]
pub struct BookingRequest {
    pub date: String,
    pub shift_type: ShiftType,
    pub slot_level: SlotLevel,
    pub slot_number: u8,
}

impl From<&Coordinate> for BookingRequest {
    fn from(coordinate: &Coordinate) -> Self {
        Self {
            date: coordinate.date.to_string(),
            shift_type: coordinate.shift_type,
            slot_level: coordinate.slot_level,
            slot_number: coordinate.slot_number.get(),
        }
    }
}

/// Body of `POST /api/coach/cancel`.
#[derive(Serialize, Debug, PartialEq)]
pub struct CancelRequest {
    pub date: String,
    pub shift: ShiftType,
    pub level: SlotLevel,
    pub slot: u8,
}

impl From<&Coordinate> for CancelRequest {
    fn from(coordinate: &Coordinate) -> Self {
        Self {
            date: coordinate.date.to_string(),
            shift: coordinate.shift_type,
            level: coordinate.slot_level,
            slot: coordinate.slot_number.get(),
        }
    }
}

/// Body of `POST /api/admin/approve` and `POST /api/admin/reject`.
#[derive(Serialize, Debug, PartialEq)]
pub struct ReviewRequest {
    pub date: String,
    pub shift: ShiftType,
    pub level: SlotLevel,
    pub slot: u8,
    pub student_id: String,
}

impl ReviewRequest {
    pub fn new(coordinate: &Coordinate, student_id: &str) -> Self {
        let CancelRequest {
            date,
            shift,
            level,
            slot,
        } = CancelRequest::from(coordinate);
        Self {
            date,
            shift,
            level,
            slot,
            student_id: student_id.trim().to_owned(),
        }
    }
}

/// An admin's verdict on a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
        }
    }

    fn path(&self) -> &'static str {
        match self {
            Decision::Approve => "/api/admin/approve",
            Decision::Reject => "/api/admin/reject",
        }
    }
}

/// The server answers either `{success, error}` or `{status, message}`.
/// Admin endpoints answer `{status: "ok" | "not_found"}`.
#[derive(Deserialize, Debug, Default)]
pub struct ServerReply {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ServerReply {
    fn accepted(&self, http_ok: bool) -> bool {
        match (self.success, self.status.as_deref()) {
            (Some(success), _) => success && http_ok,
            (None, Some(status)) => {
                (status.eq_ignore_ascii_case("success") || status.eq_ignore_ascii_case("ok"))
                    && http_ok
            }
            (None, None) => http_ok,
        }
    }

    /// Message for the user on success, error on refusal.
    pub fn into_result(self, http_status: u16) -> Result<Option<String>, GatewayError> {
        let http_ok = (200..300).contains(&http_status);
        if self.accepted(http_ok) {
            return Ok(self.message);
        }
        let not_found = self.status.as_deref() == Some("not_found");
        let message = self.error.or(self.message).unwrap_or_else(|| {
            if not_found {
                "Booking not found".to_owned()
            } else {
                "Action failed.".to_owned()
            }
        });
        Err(GatewayError::Rejected {
            status: http_status,
            message,
        })
    }
}

/// A trait, necessary for every entity that can change bookings on the server.
#[allow(async_fn_in_trait)]
pub trait BookingGateway {
    async fn book(&self, coordinate: &Coordinate) -> Result<Option<String>, GatewayError>;
    async fn cancel(&self, coordinate: &Coordinate) -> Result<Option<String>, GatewayError>;

    /// Applications awaiting an admin decision. Needs an admin session.
    async fn pending_applications(&self) -> Result<Vec<BookingRecord>, GatewayError>;

    async fn approve(
        &self,
        coordinate: &Coordinate,
        student_id: &str,
    ) -> Result<Option<String>, GatewayError>;

    async fn reject(
        &self,
        coordinate: &Coordinate,
        student_id: &str,
    ) -> Result<Option<String>, GatewayError>;
}

impl ShiftApi {
    async fn post_action<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<String>, GatewayError> {
        let response = self.post(path).json(body).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let reply: ServerReply = match serde_json::from_str(&text) {
            Ok(reply) => reply,
            Err(_) => {
                warn!("Server returned non-JSON reply to {}: {}", path, text);
                return Err(GatewayError::UnexpectedResponse { status, body: text });
            }
        };
        reply.into_result(status)
    }

    async fn review(
        &self,
        coordinate: &Coordinate,
        student_id: &str,
        decision: Decision,
    ) -> Result<Option<String>, GatewayError> {
        info!(
            "Sending {} for {} on {}",
            decision.as_str(),
            student_id,
            coordinate
        );
        self.post_action(decision.path(), &ReviewRequest::new(coordinate, student_id))
            .await
    }
}

impl BookingGateway for ShiftApi {
    async fn book(&self, coordinate: &Coordinate) -> Result<Option<String>, GatewayError> {
        info!("Submitting booking for {}", coordinate);
        self.post_action("/api/submit", &BookingRequest::from(coordinate))
            .await
    }

    async fn cancel(&self, coordinate: &Coordinate) -> Result<Option<String>, GatewayError> {
        info!("Cancelling booking for {}", coordinate);
        self.post_action("/api/coach/cancel", &CancelRequest::from(coordinate))
            .await
    }

    async fn pending_applications(&self) -> Result<Vec<BookingRecord>, GatewayError> {
        let raws: Vec<RawBookingRecord> = self.get_list("/api/admin/pending_applications").await?;
        Ok(decode_records(self.division(), raws)?)
    }

    async fn approve(
        &self,
        coordinate: &Coordinate,
        student_id: &str,
    ) -> Result<Option<String>, GatewayError> {
        self.review(coordinate, student_id, Decision::Approve).await
    }

    async fn reject(
        &self,
        coordinate: &Coordinate,
        student_id: &str,
    ) -> Result<Option<String>, GatewayError> {
        self.review(coordinate, student_id, Decision::Reject).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(json: &str) -> ServerReply {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn both_reply_shapes_are_understood() {
        assert_eq!(reply(r#"{"success": true}"#).into_result(200).unwrap(), None);
        assert_eq!(
            reply(r#"{"status": "success", "message": "Shift booked (Pending) — Preference 2"}"#)
                .into_result(200)
                .unwrap()
                .as_deref(),
            Some("Shift booked (Pending) — Preference 2")
        );
        assert_eq!(
            reply(r#"{"message": "Shift cancelled"}"#)
                .into_result(200)
                .unwrap()
                .as_deref(),
            Some("Shift cancelled")
        );
    }

    #[test]
    fn refusals_carry_the_server_message() {
        let err = reply(r#"{"success": false, "error": "You already booked this shift"}"#)
            .into_result(400)
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Rejected { status: 400, ref message }
                if message == "You already booked this shift"
        ));

        let err = reply(r#"{"message": "Rejected shifts cannot be cancelled"}"#)
            .into_result(400)
            .unwrap_err();
        assert_eq!(err.to_string(), "Rejected shifts cannot be cancelled");

        let err = reply("{}").into_result(500).unwrap_err();
        assert_eq!(err.to_string(), "Action failed.");
    }

    #[test]
    fn admin_replies_are_understood() {
        assert_eq!(reply(r#"{"status": "ok"}"#).into_result(200).unwrap(), None);

        let err = reply(r#"{"status": "not_found"}"#)
            .into_result(200)
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { status: 200, .. }));
        assert_eq!(err.to_string(), "Booking not found");

        let err = reply(r#"{"status": "error", "message": "Unauthorized"}"#)
            .into_result(403)
            .unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized");
    }
}
