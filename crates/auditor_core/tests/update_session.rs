use std::sync::Once;

use auditor_core::{
    update, AppState, BrokenLinkRecord, Effect, Msg, ProgressEvent, SessionStatus, StatusCode,
    DEFAULT_NOTIFICATION_MS,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(auditor_logging::initialize_for_tests);
}

fn submit_url(state: AppState, input: &str) -> (AppState, Vec<Effect>) {
    let (state, _) = update(state, Msg::UrlInputChanged(input.to_string()));
    update(state, Msg::CheckSubmitted)
}

fn send(state: AppState, session_id: u64, event: ProgressEvent) -> (AppState, Vec<Effect>) {
    update(state, Msg::StreamEvent { session_id, event })
}

fn record(link: &str, status: i64) -> BrokenLinkRecord {
    BrokenLinkRecord {
        link: link.to_string(),
        link_text: None,
        page_url: "https://example.com".to_string(),
        status_code: StatusCode::Numeric(status),
        success: false,
    }
}

#[test]
fn submit_opens_stream_and_starts_running() {
    init_logging();
    let (mut state, effects) = submit_url(AppState::new(), "  https://example.com ");

    assert_eq!(
        effects,
        vec![Effect::OpenStream {
            session_id: 1,
            target_url: "https://example.com".to_string(),
        }]
    );
    let view = state.view();
    assert_eq!(view.session.status, SessionStatus::Running);
    assert_eq!(view.session.processed, 0);
    assert_eq!(view.session.total, 0);
    assert_eq!(view.session.progress_label, None);
    assert_eq!(view.submit_label, "Checking...");
    assert!(!view.submit_enabled);
    assert!(state.consume_dirty());
}

#[test]
fn empty_submit_is_ignored() {
    init_logging();
    let (state, effects) = submit_url(AppState::new(), "   ");
    assert!(effects.is_empty());
    assert_eq!(state.view().session.status, SessionStatus::Idle);
}

#[test]
fn documented_example_flow() {
    init_logging();
    let (state, _) = submit_url(AppState::new(), "https://example.com");
    let (state, effects) = send(state, 1, ProgressEvent::Init { total_pages: 10 });
    assert!(effects.is_empty());
    assert_eq!(
        state.view().session.progress_label.as_deref(),
        Some("Processed 0 out of 10 web pages")
    );

    let mut state = state;
    for _ in 0..5 {
        state = send(state, 1, ProgressEvent::Checked).0;
    }
    let view = state.view();
    assert_eq!(
        view.session.progress_label.as_deref(),
        Some("Processed 5 out of 10 web pages")
    );
    assert_eq!(view.session.percent, 50);

    let (state, effects) = send(
        state,
        1,
        ProgressEvent::Completed {
            broken_links: vec![record("https://example.com/x", 404)],
        },
    );
    assert_eq!(effects, vec![Effect::CloseStream { session_id: 1 }]);
    let view = state.view();
    assert_eq!(view.session.status, SessionStatus::Completed);
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].index, 1);
    assert_eq!(view.rows[0].status, "404");
    assert_eq!(view.rows[0].link_text, "N/A");
    assert!(!view.rows[0].success);
    assert!(view.can_export);
    assert_eq!(view.submit_label, "Check Links");
}

#[test]
fn completed_keeps_payload_order_and_freezes_session() {
    init_logging();
    let links = vec![
        record("https://example.com/b", 500),
        record("https://example.com/a", 404),
        record("https://example.com/c", 410),
    ];
    let (state, _) = submit_url(AppState::new(), "https://example.com");
    let (state, _) = send(state, 1, ProgressEvent::Init { total_pages: 3 });
    let (state, _) = send(
        state,
        1,
        ProgressEvent::Completed {
            broken_links: links.clone(),
        },
    );
    assert_eq!(state.session().broken_links(), links.as_slice());

    let before = state.clone();
    let (state, effects) = send(state, 1, ProgressEvent::Checked);
    let (state, _) = send(
        state,
        1,
        ProgressEvent::Error {
            message: "late".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.session(), before.session());
    assert!(state.view().notification.is_none());
}

#[test]
fn percent_is_rounded_and_capped() {
    init_logging();
    let (state, _) = submit_url(AppState::new(), "https://example.com");
    let (state, _) = send(state, 1, ProgressEvent::Init { total_pages: 3 });
    let (state, _) = send(state, 1, ProgressEvent::Checked);
    assert_eq!(state.view().session.percent, 33);

    let (state, _) = send(state, 1, ProgressEvent::Checked);
    assert_eq!(state.view().session.percent, 67);

    let mut state = state;
    for _ in 0..4 {
        state = send(state, 1, ProgressEvent::Checked).0;
    }
    let view = state.view();
    assert_eq!(view.session.processed, 3);
    assert_eq!(view.session.percent, 100);
    assert_eq!(view.session.fraction, 1.0);
}

#[test]
fn checked_before_init_is_ignored() {
    init_logging();
    let (state, _) = submit_url(AppState::new(), "https://example.com");
    let (mut state, _) = update(state, Msg::NoOp);
    assert!(state.consume_dirty());

    let (mut state, effects) = send(state, 1, ProgressEvent::Checked);
    assert!(effects.is_empty());
    assert_eq!(state.view().session.processed, 0);
    assert_eq!(state.view().session.fraction, 0.0);
    assert!(!state.consume_dirty());
}

#[test]
fn second_init_does_not_change_total() {
    init_logging();
    let (state, _) = submit_url(AppState::new(), "https://example.com");
    let (state, _) = send(state, 1, ProgressEvent::Init { total_pages: 4 });
    let (state, _) = send(state, 1, ProgressEvent::Checked);
    let (state, _) = send(state, 1, ProgressEvent::Init { total_pages: 99 });
    assert_eq!(state.view().session.total, 4);
    assert_eq!(state.view().session.processed, 1);
}

#[test]
fn error_event_shows_notification_and_closes() {
    init_logging();
    let (state, _) = submit_url(AppState::new(), "https://example.com");
    let (state, _) = send(state, 1, ProgressEvent::Init { total_pages: 2 });
    let (state, effects) = send(
        state,
        1,
        ProgressEvent::Error {
            message: "Invalid URL provided".to_string(),
        },
    );

    assert_eq!(effects, vec![Effect::CloseStream { session_id: 1 }]);
    let view = state.view();
    assert_eq!(view.session.status, SessionStatus::Errored);
    assert!(view.rows.is_empty());
    assert!(!view.can_export);
    let notification = view.notification.expect("notification visible");
    assert_eq!(notification.message, "Invalid URL provided");
    assert_eq!(notification.remaining_percent, 100.0);
    assert_eq!(
        state.notification().progress_percent(),
        100.0,
        "fresh notification lasts {DEFAULT_NOTIFICATION_MS} ms"
    );
}

#[test]
fn error_event_without_message_gets_generic_reason() {
    init_logging();
    let (state, _) = submit_url(AppState::new(), "https://example.com");
    let (state, effects) = send(
        state,
        1,
        ProgressEvent::Error {
            message: String::new(),
        },
    );

    assert_eq!(effects, vec![Effect::CloseStream { session_id: 1 }]);
    assert_eq!(state.view().session.status, SessionStatus::Errored);
    assert_eq!(state.notification().message(), Some("The link check failed"));
}

#[test]
fn transport_failure_errors_the_session() {
    init_logging();
    let (state, _) = submit_url(AppState::new(), "https://example.com");
    let (state, effects) = update(
        state,
        Msg::StreamFailed {
            session_id: 1,
            message: "connection refused".to_string(),
        },
    );
    assert_eq!(effects, vec![Effect::CloseStream { session_id: 1 }]);
    assert_eq!(state.view().session.status, SessionStatus::Errored);
    assert_eq!(
        state.view().notification.unwrap().message,
        "connection refused"
    );
}

#[test]
fn stream_closed_while_running_is_a_failure() {
    init_logging();
    let (state, _) = submit_url(AppState::new(), "https://example.com");
    let (state, effects) = update(state, Msg::StreamClosed { session_id: 1 });
    assert_eq!(effects, vec![Effect::CloseStream { session_id: 1 }]);
    assert_eq!(state.view().session.status, SessionStatus::Errored);
    assert!(state.view().notification.is_some());
}

#[test]
fn stream_closed_after_completion_is_ignored() {
    init_logging();
    let (state, _) = submit_url(AppState::new(), "https://example.com");
    let (state, _) = send(
        state,
        1,
        ProgressEvent::Completed {
            broken_links: Vec::new(),
        },
    );
    let (state, effects) = update(state, Msg::StreamClosed { session_id: 1 });
    assert!(effects.is_empty());
    assert_eq!(state.view().session.status, SessionStatus::Completed);
}

#[test]
fn resubmit_closes_previous_stream_and_resets() {
    init_logging();
    let (state, _) = submit_url(AppState::new(), "https://a.example.com");
    let (state, _) = send(state, 1, ProgressEvent::Init { total_pages: 10 });
    let (state, _) = send(state, 1, ProgressEvent::Checked);

    let (state, effects) = submit_url(state, "https://b.example.com");
    assert_eq!(
        effects,
        vec![
            Effect::CloseStream { session_id: 1 },
            Effect::OpenStream {
                session_id: 2,
                target_url: "https://b.example.com".to_string(),
            },
        ]
    );
    let view = state.view();
    assert_eq!(view.session.session_id, 2);
    assert_eq!(view.session.processed, 0);
    assert_eq!(view.session.total, 0);
    assert!(view.rows.is_empty());

    // Late events from the discarded connection must not leak in.
    let (state, _) = send(state, 1, ProgressEvent::Init { total_pages: 7 });
    let (state, _) = send(
        state,
        1,
        ProgressEvent::Completed {
            broken_links: vec![record("https://a.example.com/x", 404)],
        },
    );
    assert_eq!(state.view().session.total, 0);
    assert_eq!(state.view().session.status, SessionStatus::Running);
}

#[test]
fn resubmit_after_completion_clears_results() {
    init_logging();
    let (state, _) = submit_url(AppState::new(), "https://example.com");
    let (state, _) = send(
        state,
        1,
        ProgressEvent::Completed {
            broken_links: vec![record("https://example.com/x", 404)],
        },
    );
    let (state, effects) = update(state, Msg::CheckSubmitted);
    assert_eq!(
        effects,
        vec![Effect::OpenStream {
            session_id: 2,
            target_url: "https://example.com".to_string(),
        }]
    );
    assert!(state.session().broken_links().is_empty());
}

#[test]
fn export_emits_records_without_touching_state() {
    init_logging();
    let links = vec![
        record("https://example.com/x", 404),
        record("https://example.com/y", 500),
    ];
    let (state, _) = submit_url(AppState::new(), "https://example.com");
    let (mut state, _) = send(
        state,
        1,
        ProgressEvent::Completed {
            broken_links: links.clone(),
        },
    );
    assert!(state.consume_dirty());
    let before = state.clone();

    let (state, first) = update(state, Msg::ExportClicked);
    let (mut state, second) = update(state, Msg::ExportClicked);
    assert_eq!(first, vec![Effect::ExportCsv { records: links }]);
    assert_eq!(first, second);
    assert_eq!(state, before);
    assert!(!state.consume_dirty());
}

#[test]
fn export_without_results_does_nothing() {
    init_logging();
    let (_, effects) = update(AppState::new(), Msg::ExportClicked);
    assert!(effects.is_empty());
}

#[test]
fn export_outcome_is_reported() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::ExportSucceeded {
            path: "out/broken_links.csv".to_string(),
        },
    );
    assert_eq!(
        state.view().notice.as_deref(),
        Some("Saved out/broken_links.csv")
    );

    let (state, _) = update(
        state,
        Msg::ExportFailed {
            message: "permission denied".to_string(),
        },
    );
    assert_eq!(
        state.view().notification.unwrap().message,
        "Export failed: permission denied"
    );
}
