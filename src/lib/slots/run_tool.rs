use std::{collections::BTreeSet, error::Error};

use log::{info, warn};

use super::{
    board::ViewerProfile,
    booking_gateway::{BookingGateway, Decision},
    errors::{ActionError, ActionFailure},
    helpers::{
        collect_viewer_boards, generate_diff_messages, get_previous_board, get_viewers,
        write_previous_board, ViewerBoards,
    },
    letter_sender::LetterSender,
    models::{
        booking_model::{BookingRecord, Coordinate},
        Args, Config,
    },
    projection::{resolve_action, Intent, SlotView},
    snapshot_getter::SnapshotGetter,
};

/// Mails every watched viewer whose bookings changed since the previous run,
/// then stores the new board. Viewers whose letter failed keep their old lines
/// in the stored board, so the change is mailed again next run. Returns the
/// number of letters sent.
pub async fn run<SG: SnapshotGetter, LS: LetterSender>(
    snapshot_getter: &SG,
    letter_sender: &LS,
    args: &Args,
    config: &Config,
) -> Result<usize, Box<dyn Error>> {
    let mail = config
        .mail
        .as_ref()
        .ok_or("config.json has no mail section")?;
    let viewers = get_viewers(args)?;
    let board_old = get_previous_board(args)?;
    info!("Found {} viewers in previous board", board_old.len());

    let snapshot = snapshot_getter.get_snapshot().await?;
    let board_new = collect_viewer_boards(&snapshot, &viewers);
    let viewers_changed = generate_diff_messages(&board_old, &board_new);
    info!("Found {} changed viewer boards", viewers_changed.len());

    let delivery = letter_sender.form_and_send_letters(&viewers, mail, &viewers_changed);
    let board_stored = keep_undelivered(board_old, board_new, &delivery.failed);
    write_previous_board(args, &board_stored)?;
    Ok(delivery.sent)
}

fn keep_undelivered(
    mut board_old: ViewerBoards,
    mut board_new: ViewerBoards,
    failed: &BTreeSet<String>,
) -> ViewerBoards {
    for viewer_id in failed {
        warn!("Keeping previous board for {} until a letter goes through", viewer_id);
        match board_old.remove(viewer_id) {
            Some(lines) => board_new.insert(viewer_id.to_owned(), lines),
            None => board_new.remove(viewer_id),
        };
    }
    board_new
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedAction {
    Book,
    Cancel,
}

impl RequestedAction {
    fn as_str(&self) -> &'static str {
        match self {
            RequestedAction::Book => "book",
            RequestedAction::Cancel => "cancel",
        }
    }

    fn matches(&self, intent: &Intent) -> bool {
        matches!(
            (self, intent),
            (RequestedAction::Book, Intent::Book) | (RequestedAction::Cancel, Intent::Cancel(_))
        )
    }
}

#[derive(Debug)]
pub struct ActionOutcome {
    pub intent: Intent,
    pub message: Option<String>,
    pub before: SlotView,
    /// `None` when the refetch after the change failed
    pub after: Option<SlotView>,
}

/// Projects the slot from a fresh snapshot, checks the request locally, asks
/// for confirmation where needed, sends it and projects again.
pub async fn perform_action<SG, BG, C>(
    snapshot_getter: &SG,
    gateway: &BG,
    profile: &ViewerProfile,
    coordinate: &Coordinate,
    requested: RequestedAction,
    confirm: C,
) -> Result<ActionOutcome, ActionFailure>
where
    SG: SnapshotGetter,
    BG: BookingGateway,
    C: FnOnce(&str) -> bool,
{
    let snapshot = snapshot_getter
        .get_snapshot()
        .await
        .map_err(|e| ActionFailure::new(None, e))?;
    let before = snapshot.project_slot(coordinate, profile);
    drop(snapshot);

    let intent = match resolve_action(&before) {
        Ok(intent) => intent,
        Err(e) => return Err(ActionFailure::new(Some(before), e)),
    };
    if !requested.matches(&intent) {
        let state = before.state;
        return Err(ActionFailure::new(
            Some(before),
            ActionError::Mismatch {
                requested: requested.as_str(),
                state,
            },
        ));
    }

    let result = match intent {
        Intent::Book => gateway.book(coordinate).await,
        Intent::Cancel(kind) => {
            if !confirm(kind.prompt()) {
                return Err(ActionFailure::new(Some(before), ActionError::Declined));
            }
            gateway.cancel(coordinate).await
        }
    };
    let message = match result {
        Ok(message) => message,
        Err(e) => return Err(ActionFailure::new(Some(before), e)),
    };

    let after = match snapshot_getter.get_snapshot().await {
        Ok(snapshot) => Some(snapshot.project_slot(coordinate, profile)),
        Err(e) => {
            warn!("Could not refresh {} after {}: {}", coordinate, requested.as_str(), e);
            None
        }
    };

    Ok(ActionOutcome {
        intent,
        message,
        before,
        after,
    })
}

#[derive(Debug)]
pub struct ReviewOutcome {
    /// The application as it was before the decision
    pub application: BookingRecord,
    pub message: Option<String>,
}

/// Approves or rejects one pending application. The application must be in
/// the pending list, otherwise no request is sent.
pub async fn review_application<BG: BookingGateway>(
    gateway: &BG,
    coordinate: &Coordinate,
    student_id: &str,
    decision: Decision,
) -> Result<ReviewOutcome, ActionError> {
    let student_id = student_id.trim();
    let pending = gateway.pending_applications().await?;
    info!("Found {} pending applications", pending.len());

    let application = pending
        .into_iter()
        .find(|record| record.coordinate == *coordinate && record.student_id == student_id)
        .ok_or_else(|| ActionError::NotPending {
            student_id: student_id.to_owned(),
            coordinate: *coordinate,
        })?;

    let message = match decision {
        Decision::Approve => gateway.approve(coordinate, student_id).await?,
        Decision::Reject => gateway.reject(coordinate, student_id).await?,
    };
    info!(
        "{} {} for {}",
        decision.as_str(),
        application.student_name,
        coordinate
    );

    Ok(ReviewOutcome {
        application,
        message,
    })
}
