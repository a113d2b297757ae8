use std::path::PathBuf;

use crate::slots::{
    models::{
        booking_model::{parse_date, RawBookingRecord, RawSlotControl},
        Command,
    },
    projection::MissingControl,
};

use super::*;

fn test_args() -> Args {
    Args {
        config_json_path: PathBuf::from("tests/test.config.json"),
        viewers_json_path: PathBuf::from("tests/test.viewers.json"),
        previous_board_json_path: PathBuf::from("tests/test.previous_board.json"),
        command: Command::Notify,
    }
}

fn test_snapshot() -> BoardSnapshot {
    let records: Vec<RawBookingRecord> =
        read_json(Path::new("tests/test.applications.json")).unwrap();
    let controls: Vec<RawSlotControl> =
        read_json(Path::new("tests/test.slot_controls.json")).unwrap();
    BoardSnapshot::from_raw("Student Coach", records, controls).unwrap()
}

#[test]
fn get_viewers_valid_json() {
    let viewers = get_viewers(&test_args()).unwrap();
    assert_eq!(viewers.len(), 2);
    assert_eq!(viewers[0].name, "Alex Tan");
    assert_eq!(viewers[1].student_id, "S2");
    assert_eq!(viewers[1].email, "bea.lim@example.edu");
}

#[test]
fn load_config_from_json() {
    let config = load_config(&test_args()).unwrap();
    assert_eq!(config.viewer_id, "S2");
    assert_eq!(config.max_bookings_per_month, 3);
    assert_eq!(config.division, "Student Coach");
    assert_eq!(config.missing_control, MissingControl::Closed);
    assert!(config.session_cookie.is_none());

    let profile = config.viewer_profile();
    assert!(profile.eligibility.night_shift);
    assert!(!profile.eligibility.on_job_training);
    assert_eq!(config.venue, "ProjectHub");
    assert_eq!(config.local_offset().unwrap().local_minus_utc(), 8 * 3600);
    assert_eq!(config.mail.unwrap().sender_fullname, "Shift Board");
}

#[test]
fn out_of_range_offset_is_refused() {
    let mut config = load_config(&test_args()).unwrap();
    config.utc_offset_hours = 30;
    assert!(config.local_offset().is_none());
}

#[test]
fn padded_viewer_ids_match_the_board() {
    let viewer: Viewer = serde_json::from_str(
        r#"{"name": "Bea Lim", "student_id": " S2 ", "email": "bea.lim@example.edu"}"#,
    )
    .unwrap();
    assert_eq!(viewer.student_id, "S2");

    let boards = collect_viewer_boards(&test_snapshot(), &[viewer]);
    assert_eq!(boards["S2"].len(), 3);
}

#[test]
fn missing_previous_board_is_empty() {
    let args = Args {
        previous_board_json_path: PathBuf::from("tests/does.not.exist.json"),
        ..test_args()
    };
    assert!(get_previous_board(&args).unwrap().is_empty());
}

#[test]
fn viewer_boards_list_own_bookings_in_order() {
    let viewers = get_viewers(&test_args()).unwrap();
    let boards = collect_viewer_boards(&test_snapshot(), &viewers);
    assert_eq!(boards["S1"], vec!["2025-03-03 Morning L3 #1: Approved"]);
    assert_eq!(
        boards["S2"],
        vec![
            "2025-03-03 Morning L3 #2: Pending",
            "2025-03-04 Afternoon L4 #1: Rejected",
            "2025-03-05 Night L6 #1: Approved"
        ]
    );
}

#[test]
fn diff_messages_only_for_changed_viewers() {
    let viewers = get_viewers(&test_args()).unwrap();
    let old = get_previous_board(&test_args()).unwrap();
    let new = collect_viewer_boards(&test_snapshot(), &viewers);

    let changed = generate_diff_messages(&old, &new);
    assert_eq!(changed.len(), 1);
    let diff = &changed["S2"];
    assert!(diff.contains("-2025-03-04 Afternoon L4 #1: Pending\n"));
    assert!(diff.contains("+2025-03-04 Afternoon L4 #1: Rejected\n"));
    assert!(diff.contains("+2025-03-05 Night L6 #1: Approved\n"));
    assert!(!diff.contains("-2025-03-03 Morning L3 #2"));
}

#[test]
fn new_viewer_gets_full_board() {
    let mut new = ViewerBoards::new();
    new.insert("S9".to_owned(), vec!["2025-03-03 Morning L3 #1: Pending".to_owned()]);
    new.insert("S8".to_owned(), vec![]);

    let changed = generate_diff_messages(&ViewerBoards::new(), &new);
    assert_eq!(changed.len(), 1);
    assert!(changed["S9"].contains("+2025-03-03 Morning L3 #1: Pending"));
}

#[test]
fn email_is_addressed_to_viewer() {
    let config = load_config(&test_args()).unwrap();
    let mail = config.mail.unwrap();
    let viewer = &get_viewers(&test_args()).unwrap()[1];
    let email = generate_email(&mail, viewer, "+2025-03-05 Night L6 #1: Approved\n").unwrap();
    let recipients = email
        .envelope()
        .to()
        .iter()
        .map(|address| address.to_string())
        .collect::<Vec<_>>();
    assert_eq!(recipients, vec!["bea.lim@example.edu"]);
}

#[test]
fn duty_message_lists_approved_coaches() {
    let snapshot = test_snapshot();
    let monday = parse_date("2025-03-03").unwrap();
    let message = build_duty_message(monday, "ProjectHub", &snapshot.duty_roster(monday));
    assert_eq!(
        message,
        "📌 03 Mar 2025 (Monday)\n👥 Student Coach on Duty:\n\n• Alex — Morning (L3)"
    );
}

#[test]
fn duty_message_for_closed_days() {
    let snapshot = test_snapshot();
    let saturday = parse_date("2025-03-08").unwrap();
    assert_eq!(
        build_duty_message(saturday, "ProjectHub", &snapshot.duty_roster(saturday)),
        "📌 08 Mar 2025 (Saturday)\n\n🚫 Weekend, ProjectHub closed."
    );

    let tuesday = parse_date("2025-03-04").unwrap();
    assert_eq!(
        build_duty_message(tuesday, "ProjectHub", &snapshot.duty_roster(tuesday)),
        "📌 04 Mar 2025 (Tuesday)\n\n🚫 Public Holiday, ProjectHub closed."
    );
}
