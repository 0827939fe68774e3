use chrono::{TimeZone, Utc};
use pn2gw_core::report::{self, Presentation};
use pn2gw_core::{BridgeError, Conversion};
use pn2gw_types::SkippedHandInfo;

const DETAIL_JSON: &str = r#"[
    {"hand_number": 3, "hand_id": "c3", "reason": "incomplete_hand", "detail": "no ending line",
     "raw_input": ["-- starting hand #3 --", "Alice: folds"]},
    {"hand_number": "4", "hand_id": "d4", "reason": "too_many_players", "detail": "11 players", "player_count": 11},
    {"hand_number": 5, "hand_id": "e5", "reason": "incomplete_hand", "detail": "no ending line"},
    {"hand_number": 6, "hand_id": "f6", "reason": "run_it_twice", "detail": "unsupported"}
]"#;

#[test]
fn test_guest_payload_to_report() {
    let now = Utc.with_ymd_and_hms(2024, 1, 15, 22, 0, 0).unwrap();
    let infos = SkippedHandInfo::parse_list(DETAIL_JSON).unwrap();
    let conversion = Conversion {
        hand_history: "converted".to_string(),
        skipped_count: infos.len() as u32,
        skipped_hands: Some(infos),
    };

    let presentation = report::present_conversion(&Ok(conversion), now);
    let Presentation::Success {
        message,
        hand_history,
        skipped_report: Some(text),
    } = presentation
    else {
        panic!("expected success with a report");
    };

    assert_eq!(message, "Conversion successful! (4 hands were skipped)");
    assert_eq!(hand_history, "converted");
    assert!(text.contains("Time: 2024-01-15T22:00:00.000Z"));

    let summary: Vec<&str> = text
        .lines()
        .skip_while(|line| *line != "=== Summary by Reason ===")
        .skip(1)
        .take_while(|line| !line.is_empty())
        .collect();
    assert_eq!(
        summary,
        vec![
            "Incomplete hand (not properly closed): 2 hands",
            "Too many players (> 10): 1 hands",
            "run_it_twice: 1 hands",
        ]
    );

    assert!(text.contains("Hand Number: #4\nHand ID: d4"));
    assert!(text.contains("Player Count: 11"));
    assert!(text.contains("Raw Input (2 lines):"));
    assert_eq!(text.matches("--- Hand #").count(), 4);
    assert!(text.ends_with("Detail: unsupported"));
}

#[test]
fn test_guest_error_presentation() {
    let now = Utc::now();
    let result: Result<Conversion, BridgeError> = Err(BridgeError::Conversion {
        message: "Hero name is required".to_string(),
    });

    assert_eq!(
        report::present_conversion(&result, now),
        Presentation::Error {
            message: "Conversion failed.".to_string(),
            detail: Some("Hero name is required".to_string()),
        }
    );
}
