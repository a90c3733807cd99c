use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::{College, CollegeCode, Program, Student},
    error::ErrorCode,
    protocol::CollegeDraft,
};
use tokio::{net::TcpListener, sync::Mutex};

use super::*;

#[derive(Clone, Default)]
struct Recorded {
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

async fn spawn_server(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn list_students(
    State(recorded): State<Recorded>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    recorded.queries.lock().await.push(params);
    Json(json!({
        "data": [{
            "id": 1,
            "student_id": "2024-0001",
            "firstname": "Ana",
            "lastname": "Reyes",
            "program_code": "BSCS",
            "year": 1,
            "gender": "Female"
        }],
        "total": 42
    }))
}

async fn list_colleges_bare() -> Json<Value> {
    Json(json!([
        {"id": 1, "college_code": "CCS", "college_name": "College of Computer Studies"},
        {"id": 2, "college_code": "COE", "college_name": "College of Engineering"}
    ]))
}

async fn create_college(
    State(recorded): State<Recorded>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    recorded.bodies.lock().await.push(body.clone());
    (StatusCode::CREATED, Json(body))
}

async fn delete_program(Path(code): Path<String>) -> impl IntoResponse {
    (
        StatusCode::CONFLICT,
        Json(json!({
            "error": format!("Cannot delete {code} because it has enrolled students. Please delete the students first.")
        })),
    )
}

async fn programs_garbage() -> Json<Value> {
    Json(json!({"rows": []}))
}

fn app(recorded: Recorded) -> Router {
    Router::new()
        .route("/api/student/", get(list_students))
        .route(
            "/api/colleges/",
            get(list_colleges_bare).post(create_college),
        )
        .route("/api/programs/", get(programs_garbage))
        .route("/api/programs/:code", axum::routing::delete(delete_program))
        .with_state(recorded)
}

#[test]
fn api_root_appends_api_prefix() {
    let client = SsisClient::new("http://localhost:5000").expect("client");
    assert_eq!(client.api_root().as_str(), "http://localhost:5000/api");

    let client = SsisClient::new("https://ssis.example.edu/portal/").expect("client");
    assert_eq!(
        client.api_root().as_str(),
        "https://ssis.example.edu/portal/api"
    );
}

#[test]
fn rejects_non_http_base_url() {
    for bad in ["not a url", "mailto:registrar@example.edu", "ftp://host"] {
        let err = SsisClient::new(bad).expect_err("must reject");
        assert!(matches!(err, ClientError::Validation(_)), "{bad}");
    }
}

#[test]
fn keys_are_percent_encoded_into_one_segment() {
    let client = SsisClient::new("http://localhost:5000").expect("client");
    let url = client.url(&["student", "2024/0001"]).expect("url");
    assert_eq!(url.path(), "/api/student/2024%2F0001");
    let url = client.url(&["colleges", ""]).expect("url");
    assert_eq!(url.path(), "/api/colleges/");
}

#[tokio::test]
async fn fetch_page_sends_query_state_as_params() {
    let recorded = Recorded::default();
    let base = spawn_server(app(recorded.clone())).await;
    let client = SsisClient::new(&base).expect("client");

    let mut query = QueryState::new(10);
    query.page = 3;
    query.sort_by = Some("lastname".into());
    query.search_text = "rey".into();
    query
        .filters
        .insert("year".into(), ["1".to_string(), "2".to_string()].into());

    let page: PageResult<Student> = client.fetch_page(&query).await.expect("page");
    assert_eq!(page.total, 42);
    assert_eq!(page.items[0].display_name(), "Reyes, Ana");

    let queries = recorded.queries.lock().await;
    let params = &queries[0];
    assert_eq!(params["page"], "3");
    assert_eq!(params["limit"], "10");
    assert_eq!(params["sort_by"], "lastname");
    assert_eq!(params["sort_order"], "asc");
    assert_eq!(params["search"], "rey");
    assert_eq!(params["year"], "1,2");
}

#[tokio::test]
async fn bare_list_is_normalized() {
    let base = spawn_server(app(Recorded::default())).await;
    let client = SsisClient::new(&base).expect("client");

    let page: PageResult<College> = client
        .fetch_page(&QueryState::new(10))
        .await
        .expect("page");
    assert_eq!(page.total, 2);

    let all: Vec<College> = client.fetch_all().await.expect("all");
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn unexpected_list_shape_is_invalid_response() {
    let base = spawn_server(app(Recorded::default())).await;
    let client = SsisClient::new(&base).expect("client");

    let err = client
        .fetch_page::<Program>(&QueryState::new(10))
        .await
        .expect_err("must fail");
    assert!(matches!(err, ClientError::InvalidResponse(_)));
}

#[tokio::test]
async fn create_posts_json_draft() {
    let recorded = Recorded::default();
    let base = spawn_server(app(recorded.clone())).await;
    let client = SsisClient::new(&base).expect("client");

    client
        .create::<College>(CollegeDraft {
            college_code: CollegeCode::new("CAS"),
            college_name: "College of Arts and Sciences".into(),
        })
        .await
        .expect("create");

    let bodies = recorded.bodies.lock().await;
    assert_eq!(bodies[0]["college_code"], "CAS");
}

#[tokio::test]
async fn invalid_draft_is_never_sent() {
    let recorded = Recorded::default();
    let base = spawn_server(app(recorded.clone())).await;
    let client = SsisClient::new(&base).expect("client");

    let err = client
        .create::<College>(CollegeDraft {
            college_code: CollegeCode::new("C4S"),
            college_name: "Arts".into(),
        })
        .await
        .expect_err("invalid");
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(recorded.bodies.lock().await.is_empty());
}

#[tokio::test]
async fn conflict_message_is_surfaced_verbatim() {
    let base = spawn_server(app(Recorded::default())).await;
    let client = SsisClient::new(&base).expect("client");

    let err = client.delete::<Program>("BSCS").await.expect_err("conflict");
    assert_eq!(err.code(), Some(ErrorCode::Conflict));
    assert_eq!(
        err.user_message("Failed to delete program"),
        "Cannot delete BSCS because it has enrolled students. Please delete the students first."
    );
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = SsisClient::with_timeout(&format!("http://{addr}"), Duration::from_secs(2))
        .expect("client");
    let err = client.stats().await.expect_err("nothing listening");
    assert!(matches!(err, ClientError::Network(_)));
}
