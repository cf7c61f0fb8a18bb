use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::client::ClientOptions;
use crate::clipboard::{self, Clipboard, ClipboardError};
use crate::filter::StatusFilter;
use crate::records::{GrievanceStatus, Record};
use crate::runner::{Options, Session};
use crate::toast::{Severity, ToastChange};
use crate::view::{
    self, Command, DashboardView, Effect, IgnoreReason, ViewChange, ViewOptions,
};

#[derive(Clone, Debug)]
struct Captured {
    request_line: String,
    body: String,
}

struct Stub {
    base_url: String,
    seen: Arc<Mutex<Vec<Captured>>>,
}

impl Stub {
    fn requests(&self) -> Vec<Captured> {
        self.seen.lock().unwrap().clone()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        _ => "Internal Server Error",
    }
}

/// One-route HTTP server on loopback that answers every request with the
/// same status and body.
async fn stub_server(status: u16, body: &'static str) -> Stub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let header_end = loop {
                let n = socket.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    break None;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break Some(pos + 4);
                }
            };
            let Some(header_end) = header_end else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let length = head
                .lines()
                .filter_map(|l| l.split_once(':'))
                .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < header_end + length {
                let n = socket.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let captured = Captured {
                request_line: head.lines().next().unwrap_or_default().to_string(),
                body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
            };
            log.lock().unwrap().push(captured);

            let response = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                reason(status),
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    Stub {
        base_url: format!("http://{addr}"),
        seen,
    }
}

fn options(base_url: &str) -> Options {
    Options {
        client: ClientOptions {
            base_url: base_url.to_string(),
            timeout: Some(Duration::from_secs(5)),
            proxy: None,
        },
        view: ViewOptions::default(),
    }
}

fn sample_records() -> Vec<Record> {
    let mut water = Record::new(
        "482913",
        GrievanceStatus::Pending,
        "Category: [Water Supply] Summary: No water for 3 days",
    );
    water.hash = Some("ab12cd34".to_string());
    let roads = Record::new("482914", GrievanceStatus::Resolved, "Category: [Roads] Summary: Pothole");
    vec![water, roads]
}

#[derive(Clone, Default)]
struct RecordingClipboard {
    writes: Arc<Mutex<Vec<String>>>,
}

impl Clipboard for RecordingClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn saved_status_updates_badge() {
    let stub = stub_server(200, "OK").await;
    let mut session =
        Session::new(sample_records(), options(&stub.base_url), clipboard::open(false)).unwrap();

    session.dispatch(Command::SelectStatus {
        id: "482913".into(),
        status: GrievanceStatus::Resolved,
    });
    let started = session.dispatch(Command::SaveStatus { id: "482913".into() });
    assert!(started.changes.contains(&ViewChange::SaveControl {
        id: "482913".into(),
        label: view::SAVING_LABEL
    }));
    assert!(session.view().is_saving("482913"));
    assert_eq!(session.pending(), 1);

    let again = session.dispatch(Command::SaveStatus { id: "482913".into() });
    assert_eq!(
        again.changes,
        vec![ViewChange::Ignored {
            id: "482913".into(),
            reason: IgnoreReason::SaveInFlight
        }]
    );
    assert_eq!(session.pending(), 1);

    let settled = session.settle().await;
    assert!(settled.changes.contains(&ViewChange::BadgeUpdated {
        id: "482913".into(),
        text: "Resolved".into(),
        class: "status-resolved"
    }));
    assert!(settled.changes.contains(&ViewChange::SaveControl {
        id: "482913".into(),
        label: view::SAVED_LABEL
    }));

    let record = session.view().record("482913").unwrap();
    assert_eq!(record.record.status, GrievanceStatus::Resolved);
    assert_eq!(record.badge.text, "Resolved");
    assert!(session.view().alert().is_none());
    assert!(!session.view().is_saving("482913"));

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].request_line.starts_with("POST /update_status "));
    assert!(requests[0].body.contains("g_id=482913"));
    assert!(requests[0].body.contains("new_status=Resolved"));
}

#[tokio::test]
async fn multi_word_status_is_form_encoded() {
    let stub = stub_server(200, "OK").await;
    let mut session =
        Session::new(sample_records(), options(&stub.base_url), clipboard::open(false)).unwrap();
    session.dispatch(Command::SelectStatus {
        id: "482913".into(),
        status: GrievanceStatus::InProgress,
    });
    session.dispatch(Command::SaveStatus { id: "482913".into() });
    session.settle().await;

    let requests = stub.requests();
    assert!(requests[0].body.contains("new_status=In+Progress"));
    assert_eq!(
        session.view().record("482913").unwrap().badge.class,
        "status-in-progress"
    );
}

#[tokio::test]
async fn rejected_status_keeps_badge_and_alerts() {
    let stub = stub_server(500, "boom").await;
    let mut session =
        Session::new(sample_records(), options(&stub.base_url), clipboard::open(false)).unwrap();
    session.dispatch(Command::SelectStatus {
        id: "482913".into(),
        status: GrievanceStatus::Rejected,
    });
    session.dispatch(Command::SaveStatus { id: "482913".into() });
    let settled = session.settle().await;

    assert!(settled.changes.contains(&ViewChange::Alert {
        message: view::UPDATE_REJECTED_ALERT.into()
    }));
    assert!(settled.changes.contains(&ViewChange::SaveControl {
        id: "482913".into(),
        label: view::SAVE_LABEL
    }));
    let record = session.view().record("482913").unwrap();
    assert_eq!(record.record.status, GrievanceStatus::Pending);
    assert_eq!(record.badge.text, "Pending");
    assert_eq!(session.view().alert(), Some(view::UPDATE_REJECTED_ALERT));

    let dismissed = session.dispatch(Command::DismissAlert);
    assert_eq!(dismissed.changes, vec![ViewChange::AlertDismissed]);
    assert!(session.view().alert().is_none());
}

#[tokio::test]
async fn unreachable_server_reports_error_alert() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut session = Session::new(
        sample_records(),
        options(&format!("http://{addr}")),
        clipboard::open(false),
    )
    .unwrap();
    session.dispatch(Command::SaveStatus { id: "482913".into() });
    session.settle().await;

    assert_eq!(session.view().alert(), Some(view::UPDATE_ERROR_ALERT));
    assert_eq!(
        session.view().record("482913").unwrap().record.status,
        GrievanceStatus::Pending
    );
}

#[tokio::test]
async fn verify_found_shows_block_details() {
    let stub = stub_server(
        200,
        r#"{"found": true, "block_index": 7, "timestamp": "2024-01-02 10:00:00", "blockchain": "Local", "block_hash": "ff00"}"#,
    )
    .await;
    let mut session =
        Session::new(sample_records(), options(&stub.base_url), clipboard::open(false)).unwrap();
    session.dispatch(Command::Verify { id: "482913".into() });
    session.settle().await;

    let toast = session.view().toast().unwrap();
    assert_eq!(
        toast.message,
        "✓ Verified on Block #7 at 2024-01-02 10:00:00 (Local)"
    );
    assert_eq!(toast.severity, Severity::Success);
    assert!(stub.requests()[0]
        .request_line
        .starts_with("GET /verify_grievance/482913 "));
}

#[tokio::test]
async fn verify_warns_on_hash_mismatch() {
    let stub = stub_server(200, r#"{"found": true, "block_index": 7, "audio_hash": "0xDEADBEEF"}"#).await;
    let mut session =
        Session::new(sample_records(), options(&stub.base_url), clipboard::open(false)).unwrap();
    session.dispatch(Command::Verify { id: "482913".into() });
    session.settle().await;

    let toast = session.view().toast().unwrap();
    assert_eq!(toast.message, view::MISMATCH_TOAST);
    assert_eq!(toast.severity, Severity::Warning);
}

#[tokio::test]
async fn verify_not_found_body_wins_over_status() {
    let stub = stub_server(404, r#"{"found": false}"#).await;
    let mut session =
        Session::new(sample_records(), options(&stub.base_url), clipboard::open(false)).unwrap();
    session.dispatch(Command::Verify { id: "482913".into() });
    session.settle().await;

    let toast = session.view().toast().unwrap();
    assert_eq!(toast.message, view::NOT_FOUND_TOAST);
    assert_eq!(toast.severity, Severity::Warning);
}

#[tokio::test]
async fn verify_garbage_body_fails() {
    let stub = stub_server(200, "<html>oops</html>").await;
    let mut session =
        Session::new(sample_records(), options(&stub.base_url), clipboard::open(false)).unwrap();
    session.dispatch(Command::Verify { id: "482913".into() });
    session.settle().await;

    let toast = session.view().toast().unwrap();
    assert_eq!(toast.message, view::VERIFY_FAILED_TOAST);
    assert_eq!(toast.severity, Severity::Error);
}

#[tokio::test]
async fn copy_hash_replaces_previous_toast() {
    let clipboard = RecordingClipboard::default();
    let writes = clipboard.writes.clone();
    let mut session = Session::new(
        sample_records(),
        options("http://127.0.0.1:5000"),
        Box::new(clipboard),
    )
    .unwrap();

    let first = session.dispatch(Command::CopyHash { id: "482913".into() });
    assert!(first.changes.contains(&ViewChange::CopyControl {
        id: "482913".into(),
        label: view::COPIED_LABEL
    }));
    assert!(first
        .changes
        .contains(&ViewChange::Toast(ToastChange::Shown { id: 1, replaced: None })));

    let second = session.dispatch(Command::CopyHash { id: "482913".into() });
    assert!(second
        .changes
        .contains(&ViewChange::Toast(ToastChange::Shown { id: 2, replaced: Some(1) })));

    assert_eq!(session.view().toast().unwrap().message, view::COPIED_TOAST);
    assert_eq!(writes.lock().unwrap().as_slice(), ["ab12cd34", "ab12cd34"]);

    let missing = session.dispatch(Command::CopyHash { id: "482914".into() });
    assert!(missing.effects.is_empty());
    assert_eq!(session.view().toast().unwrap().message, view::NO_HASH_TOAST);
}

#[tokio::test]
async fn disabled_clipboard_resets_copy_control() {
    let mut session = Session::new(
        sample_records(),
        options("http://127.0.0.1:5000"),
        clipboard::open(false),
    )
    .unwrap();
    let update = session.dispatch(Command::CopyHash { id: "482913".into() });
    assert!(!update
        .changes
        .iter()
        .any(|c| matches!(c, ViewChange::CopyControl { .. })));
    assert!(session.view().toast().is_none());
}

#[test]
fn stale_response_is_ignored() {
    let mut view = DashboardView::new(sample_records(), ViewOptions::default());
    let now = Instant::now();
    let update = view.update(Command::SaveStatus { id: "482913".into() }, now);
    let Some(Effect::SubmitStatus { ticket, .. }) = update.effects.first().cloned() else {
        panic!("expected a status submission");
    };
    let stale = view.update(
        Command::StatusSaved {
            id: "482913".into(),
            ticket: ticket + 1,
            status: GrievanceStatus::Resolved,
        },
        now,
    );
    assert_eq!(
        stale.changes,
        vec![ViewChange::Ignored {
            id: "482913".into(),
            reason: IgnoreReason::StaleResponse
        }]
    );
    assert!(view.is_saving("482913"));
}

#[test]
fn saved_label_reverts_after_feedback_window() {
    let mut view = DashboardView::new(sample_records(), ViewOptions::default());
    let now = Instant::now();
    let update = view.update(Command::SaveStatus { id: "482913".into() }, now);
    let Some(Effect::SubmitStatus { ticket, status, .. }) = update.effects.first().cloned() else {
        panic!("expected a status submission");
    };
    view.update(
        Command::StatusSaved {
            id: "482913".into(),
            ticket,
            status,
        },
        now,
    );

    let early = view.update(Command::Tick, now + Duration::from_millis(1500));
    assert!(!early.changes.contains(&ViewChange::SaveControl {
        id: "482913".into(),
        label: view::SAVE_LABEL
    }));
    let later = view.update(Command::Tick, now + Duration::from_millis(2000));
    assert!(later.changes.contains(&ViewChange::SaveControl {
        id: "482913".into(),
        label: view::SAVE_LABEL
    }));
}

#[tokio::test]
async fn snapshot_file_drives_search_and_filter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grievances.yml");
    std::fs::write(
        &path,
        r#"
"482913":
  status: Pending
  content: "Category: [Water Supply] Summary: No water"
  hash: ab12
"482914":
  status: In Progress
  content: "Category: [Roads] Summary: Pothole"
"482915":
  status: resolved
  content: "Category: [Water Supply] Summary: Leak fixed"
"#,
    )
    .unwrap();

    let records = crate::records::load_records(&path).await.unwrap();
    assert_eq!(records.len(), 3);

    let mut view = DashboardView::new(records, ViewOptions::default());
    let now = Instant::now();
    view.update(Command::Search("  WATER ".into()), now);
    assert_eq!(view.visible_ids(), vec!["482913", "482915"]);

    view.update(
        Command::SelectFilter(StatusFilter::Only(GrievanceStatus::InProgress)),
        now,
    );
    assert_eq!(view.visible_ids(), vec!["482914"]);

    view.update(Command::SelectFilter(StatusFilter::All), now);
    assert_eq!(view.visible_ids().len(), 3);
}
