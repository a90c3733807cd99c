use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::{College, CollegeCode},
    protocol::CollegeDraft,
};
use tokio::net::TcpListener;

use super::*;

async fn create_college(Json(body): Json<Value>) -> impl IntoResponse {
    if body["college_code"] == "CCS" {
        return (
            StatusCode::CONFLICT,
            Json(json!({"error": "College code already exists"})),
        );
    }
    (StatusCode::CREATED, Json(body))
}

async fn update_college(Path(code): Path<String>, Json(body): Json<Value>) -> impl IntoResponse {
    if code != "CCS" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "College not found"})),
        );
    }
    (StatusCode::OK, Json(body))
}

async fn spawn_server() -> SsisClient {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let app = Router::new()
        .route("/api/colleges/", post(create_college))
        .route("/api/colleges/:code", put(update_college));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    SsisClient::new(&format!("http://{addr}")).expect("client")
}

fn draft(code: &str, name: &str) -> CollegeDraft {
    CollegeDraft {
        college_code: CollegeCode::new(code),
        college_name: name.to_string(),
    }
}

fn ccs() -> College {
    College {
        id: Some(1),
        college_code: CollegeCode::new("CCS"),
        college_name: "College of Computer Studies".into(),
    }
}

#[test]
fn countdown_arms_after_three_seconds() {
    let opened = Instant::now();
    let dialog = DeleteConfirmation::open("BSCS", "Delete Program BSCS?", opened);

    assert_eq!(dialog.button_label(opened), "Wait (3)");
    assert_eq!(
        dialog.button_label(opened + Duration::from_millis(1_200)),
        "Wait (2)"
    );
    assert_eq!(
        dialog.confirm(opened + Duration::from_millis(2_500)),
        Err(CountdownPending { remaining_secs: 1 })
    );
    assert!(!dialog.is_armed(opened + Duration::from_millis(2_999)));

    let armed_at = opened + DELETE_COUNTDOWN;
    assert!(dialog.is_armed(armed_at));
    assert_eq!(dialog.button_label(armed_at), "Delete");
    assert_eq!(dialog.confirm(armed_at), Ok("BSCS"));
    assert_eq!(dialog.title(), "Delete Program BSCS?");
}

#[test]
fn edit_dialog_is_prefilled_from_record() {
    let dialog = EditorDialog::<College>::edit(&ccs());
    assert_eq!(
        dialog.mode(),
        &DialogMode::Edit {
            original_key: "CCS".into()
        }
    );
    assert_eq!(dialog.draft.college_name, "College of Computer Studies");
    assert!(dialog.can_submit());
}

#[test]
fn invalid_draft_disables_submit() {
    let mut dialog = EditorDialog::<College>::add(draft("C1", "College"));
    assert!(!dialog.can_submit());
    dialog.draft.college_code = CollegeCode::new("CEA");
    assert!(dialog.can_submit());
    dialog.close();
    assert!(!dialog.can_submit());
}

#[tokio::test]
async fn successful_add_refreshes_and_closes() {
    let client = spawn_server().await;
    let refreshed = Arc::new(AtomicUsize::new(0));
    let mut dialog = EditorDialog::<College>::add(draft("CAS", "College of Arts and Sciences"));

    let counter = Arc::clone(&refreshed);
    dialog
        .submit(&client, || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .expect("submit");

    assert_eq!(refreshed.load(Ordering::SeqCst), 1);
    assert!(!dialog.is_open());
    assert!(dialog.error().is_none());
}

#[tokio::test]
async fn server_rejection_stays_open_with_message() {
    let client = spawn_server().await;
    let refreshed = Arc::new(AtomicUsize::new(0));
    let mut dialog = EditorDialog::<College>::add(draft("CCS", "Computer Studies"));

    let counter = Arc::clone(&refreshed);
    let err = dialog
        .submit(&client, || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .expect_err("duplicate");

    assert!(matches!(err, ClientError::Server { status: 409, .. }));
    assert!(dialog.is_open());
    assert!(!dialog.is_in_flight());
    assert_eq!(dialog.error(), Some("College code already exists"));
    assert_eq!(refreshed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn edit_targets_original_key() {
    let client = spawn_server().await;
    let mut dialog = EditorDialog::<College>::edit(&ccs());
    dialog.draft.college_code = CollegeCode::new("CICS");

    dialog.submit(&client, || async {}).await.expect("update");
    assert!(!dialog.is_open());
}

#[tokio::test]
async fn validation_failure_is_reported_inline_without_request() {
    let client = SsisClient::new("http://127.0.0.1:9").expect("client");
    let mut dialog = EditorDialog::<College>::add(draft("", "College 1"));

    let err = dialog.submit(&client, || async {}).await.expect_err("invalid");
    assert!(matches!(err, ClientError::Validation(_)));
    let message = dialog.error().expect("inline error");
    assert!(message.contains("college_code"));
    assert!(message.contains("college_name"));
    assert!(dialog.is_open());
}
