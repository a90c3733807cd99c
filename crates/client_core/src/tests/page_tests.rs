use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::{CollegeCode, ProgramCode},
    protocol::ProgramDraft,
};
use tokio::{net::TcpListener, sync::Mutex};

use super::*;
use crate::dialogs::DELETE_COUNTDOWN;

#[derive(Clone)]
struct Catalog {
    programs: Arc<Mutex<Vec<Value>>>,
}

impl Catalog {
    fn seeded(count: usize) -> Self {
        let codes = ["BSCS", "BSIT", "BSIS", "BSCE", "BSEE", "BSME", "BSCA"];
        let programs = codes
            .iter()
            .take(count)
            .map(|code| {
                json!({
                    "program_code": code,
                    "program_name": format!("Bachelor {code}"),
                    "college_code": "CCS"
                })
            })
            .collect();
        Self {
            programs: Arc::new(Mutex::new(programs)),
        }
    }
}

async fn list_programs(
    State(catalog): State<Catalog>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let programs = catalog.programs.lock().await;
    let (Some(page), Some(limit)) = (
        params.get("page").and_then(|p| p.parse::<usize>().ok()),
        params.get("limit").and_then(|l| l.parse::<usize>().ok()),
    ) else {
        return Json(Value::Array(programs.clone()));
    };
    let data: Vec<Value> = programs
        .iter()
        .skip((page - 1) * limit)
        .take(limit)
        .cloned()
        .collect();
    Json(json!({"data": data, "total": programs.len()}))
}

async fn create_program(
    State(catalog): State<Catalog>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    catalog.programs.lock().await.push(body.clone());
    (StatusCode::CREATED, Json(body))
}

async fn get_program(State(catalog): State<Catalog>, Path(code): Path<String>) -> impl IntoResponse {
    let programs = catalog.programs.lock().await;
    match programs.iter().find(|p| p["program_code"] == code.as_str()) {
        Some(program) => (StatusCode::OK, Json(program.clone())),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Program not found"})),
        ),
    }
}

async fn update_program(
    State(catalog): State<Catalog>,
    Path(code): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let mut programs = catalog.programs.lock().await;
    match programs.iter_mut().find(|p| p["program_code"] == code.as_str()) {
        Some(program) => {
            *program = body.clone();
            (StatusCode::OK, Json(body))
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Program not found"})),
        ),
    }
}

async fn delete_program(
    State(catalog): State<Catalog>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    if code == "BSCS" {
        return (
            StatusCode::CONFLICT,
            Json(json!({"error": "Cannot delete this program because it has enrolled students. Please delete the students first."})),
        );
    }
    catalog
        .programs
        .lock()
        .await
        .retain(|p| p["program_code"] != code.as_str());
    (StatusCode::OK, Json(json!({"message": "Program deleted"})))
}

async fn spawn_catalog(catalog: Catalog) -> SsisClient {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let app = Router::new()
        .route("/api/programs/", get(list_programs).post(create_program))
        .route(
            "/api/programs/:code",
            get(get_program).put(update_program).delete(delete_program),
        )
        .with_state(catalog);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    SsisClient::new(&format!("http://{addr}")).expect("client")
}

fn draft(code: &str, name: &str) -> ProgramDraft {
    ProgramDraft {
        program_code: ProgramCode::new(code),
        program_name: name.to_string(),
        college_code: CollegeCode::new("CCS"),
    }
}

fn codes(snapshot: &ListSnapshot<Program>) -> Vec<&str> {
    snapshot.items.iter().map(|p| p.program_code.as_str()).collect()
}

#[tokio::test]
async fn new_page_sorts_by_default_column() {
    let client = spawn_catalog(Catalog::seeded(3)).await;
    let page = ListPage::<Program>::new(client, DEFAULT_PAGE_SIZE);
    page.load().await.expect("load");

    let snapshot = page.snapshot().await;
    assert_eq!(snapshot.query.sort_by.as_deref(), Some("program_code"));
    assert_eq!(snapshot.total, 3);
}

#[tokio::test]
async fn unknown_sort_column_and_facet_are_rejected() {
    let client = spawn_catalog(Catalog::seeded(3)).await;
    let page = ListPage::<Program>::new(client, DEFAULT_PAGE_SIZE);

    let err = page.sort_by("password").await.expect_err("not sortable");
    assert!(matches!(err, ClientError::Validation(_)));

    let mut filters = Filters::new();
    filters.insert("year".into(), ["1".to_string()].into());
    let err = page.filter(filters).await.expect_err("no such facet");
    assert!(matches!(err, ClientError::Validation(_)));
}

#[tokio::test]
async fn prepared_query_is_checked_and_loaded_as_is() {
    let client = spawn_catalog(Catalog::seeded(3)).await;

    let mut query = QueryState::new(2);
    query.sort_by = Some("dean".into());
    assert!(ListPage::<Program>::with_query(client.clone(), query).is_err());

    let mut query = QueryState::new(2);
    query.page = 2;
    query.sort_by = Some("program_name".into());
    let page = ListPage::<Program>::with_query(client, query).expect("valid query");
    page.load().await.expect("load");
    assert_eq!(codes(&page.snapshot().await), vec!["BSIS"]);
}

#[tokio::test]
async fn saved_add_refetches_and_closes_dialog() {
    let client = spawn_catalog(Catalog::seeded(2)).await;
    let mut page = ListPage::<Program>::new(client, DEFAULT_PAGE_SIZE);
    page.load().await.expect("load");

    page.open_add(draft("BSDS", "Data Science"));
    page.submit().await.expect("submit");

    assert!(page.editor().is_none());
    let snapshot = page.snapshot().await;
    assert_eq!(snapshot.total, 3);
    assert_eq!(codes(&snapshot).iter().filter(|c| **c == "BSDS").count(), 1);
}

#[tokio::test]
async fn edit_prefills_from_shown_row() {
    let client = spawn_catalog(Catalog::seeded(2)).await;
    let mut page = ListPage::<Program>::new(client, DEFAULT_PAGE_SIZE);
    page.load().await.expect("load");

    let editor = page.open_edit("BSIT").await.expect("open");
    assert_eq!(editor.draft.program_name, "Bachelor BSIT");
    editor.draft.program_name = "Information Technology".into();
    page.submit().await.expect("update");

    let snapshot = page.snapshot().await;
    assert_eq!(snapshot.items[1].program_name, "Information Technology");

    let err = page.open_edit("BSXX").await.err().expect("missing");
    assert_eq!(err.user_message("Failed to load program"), "Program not found");
}

#[tokio::test]
async fn delete_waits_for_countdown_then_refetches() {
    let client = spawn_catalog(Catalog::seeded(3)).await;
    let mut page = ListPage::<Program>::new(client, DEFAULT_PAGE_SIZE);
    page.load().await.expect("load");

    let opened = Instant::now();
    assert_eq!(
        page.request_delete("BSIT", opened).button_label(opened),
        "Wait (3)"
    );
    let pending = page
        .confirm_delete(opened + Duration::from_secs(1))
        .await
        .expect_err("still counting down");
    assert_eq!(pending.remaining_secs, 2);
    assert!(page.pending_delete().is_some());

    let outcome = page
        .confirm_delete(opened + Duration::from_secs(3))
        .await
        .expect("armed");
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(page.pending_delete().is_none());
    assert_eq!(codes(&page.snapshot().await), vec!["BSCS", "BSIS"]);
}

#[tokio::test]
async fn refused_delete_opens_error_dialog_and_keeps_row() {
    let client = spawn_catalog(Catalog::seeded(3)).await;
    let mut page = ListPage::<Program>::new(client, DEFAULT_PAGE_SIZE);
    page.load().await.expect("load");

    let opened = Instant::now();
    page.request_delete("BSCS", opened);
    let outcome = page
        .confirm_delete(opened + Duration::from_secs(3))
        .await
        .expect("armed");
    assert_eq!(outcome, DeleteOutcome::Failed);

    let dialog = page.error_dialog().expect("error dialog");
    assert_eq!(dialog.title, "Unable to Delete");
    assert_eq!(
        dialog.description,
        "Cannot delete this program because it has enrolled students. Please delete the students first."
    );
    assert_eq!(page.snapshot().await.total, 3);
    assert!(codes(&page.snapshot().await).contains(&"BSCS"));

    page.dismiss_error();
    assert!(page.error_dialog().is_none());
    assert_eq!(
        page.confirm_delete(Instant::now()).await,
        Ok(DeleteOutcome::NothingPending)
    );
}

#[tokio::test]
async fn deleting_last_row_of_last_page_steps_back() {
    let client = spawn_catalog(Catalog::seeded(3)).await;
    let mut page = ListPage::<Program>::new(client, 2);
    page.load().await.expect("load");
    page.controller().set_page(2).await.expect("page 2");
    assert_eq!(codes(&page.snapshot().await), vec!["BSIS"]);

    let opened = Instant::now();
    page.request_delete("BSIS", opened);
    page.confirm_delete(opened + DELETE_COUNTDOWN)
        .await
        .expect("armed");

    let snapshot = page.snapshot().await;
    assert_eq!(snapshot.query.page, 1);
    assert_eq!(codes(&snapshot), vec!["BSCS", "BSIT"]);
}

#[tokio::test]
async fn student_facets_list_programs_years_and_genders() {
    let client = spawn_catalog(Catalog::seeded(3)).await;
    let page = ListPage::<Student>::new(client, DEFAULT_PAGE_SIZE);

    let options = page.facet_options().await.expect("options");
    assert_eq!(options["program"], vec!["BSCS", "BSIS", "BSIT"]);
    assert_eq!(options["year"], vec!["1", "2", "3", "4"]);
    assert_eq!(options["gender"], vec!["Male", "Female", "Other"]);
}
