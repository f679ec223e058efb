//! Shared fixtures: a stub indemnity backend and request helpers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tera::Tera;
use tower::ServiceExt;

use crewdesk::backend::BackendClient;
use crewdesk::router::build_app_router;
use crewdesk::state::AppState;

/// Desk wired to a stub backend, plus the number of requests the stub saw.
pub struct TestDesk {
    pub app: Router,
    pub state: Arc<AppState>,
    pub backend_requests: Arc<AtomicUsize>,
}

impl TestDesk {
    pub fn backend_requests(&self) -> usize {
        self.backend_requests.load(Ordering::SeqCst)
    }
}

async fn count_requests(
    State(counter): State<Arc<AtomicUsize>>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    counter.fetch_add(1, Ordering::SeqCst);
    next.run(request).await
}

/// 2025 has no prices on the stub; 2030 answers slowly.
async fn process_file(Json(body): Json<Value>) -> Json<Value> {
    match body["year"].as_i64() {
        Some(2025) => {
            return Json(json!({"success": false, "message": "No prices for 2025"}));
        }
        Some(2030) => tokio::time::sleep(Duration::from_millis(300)).await,
        _ => {}
    }
    Json(json!({
        "success": true,
        "summary": {
            "total_indemnites": 160.0,
            "nb_rotations": 2,
            "nb_vols": 3,
            "nb_problemes": 1,
            "pays_details": [{"pays": "Espagne", "count": 2, "total": 160.0}]
        },
        "rotations": [
            {"id": "R1", "total": 100.0, "vols": [
                {"date": "10-03-2024", "flight_no": "AB1", "adep": "LFLY", "ades": "LEMD",
                 "indemnite": 100.0, "pays": "Espagne", "diagnostic": "", "jour_sans_vol": false}
            ]},
            {"id": "R2", "total": 60.0, "vols": [
                {"date": "12-03-2024", "flight_no": "AB2", "adep": "LSGG", "ades": "LEBL",
                 "indemnite": 60.0, "pays": "Espagne", "diagnostic": "", "jour_sans_vol": false},
                {"date": "13-03-2024", "adep": "LEBL", "ades": "LEBL", "indemnite": 0.0,
                 "pays": "", "diagnostic": "Prix manquant", "jour_sans_vol": true}
            ]}
        ]
    }))
}

/// Names the report after the year it was asked for.
async fn export_pdf(Json(body): Json<Value>) -> Response {
    let year = body["year"].as_i64().unwrap_or_default();
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"rapport_{}.pdf\"", year),
            ),
        ],
        "%PDF",
    )
        .into_response()
}

fn stub_backend(counter: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route(
            "/get_available_years",
            get(|| async { Json(json!({"success": true, "years": [2024, 2023]})) }),
        )
        .route(
            "/upload_excel",
            post(|| async {
                Json(json!({"success": true, "filename": "roster.xlsx", "nb_vols": 3}))
            }),
        )
        .route("/process_file", post(process_file))
        .route(
            "/export_results",
            post(|| async {
                (
                    [
                        (
                            header::CONTENT_TYPE,
                            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                        ),
                        (
                            header::CONTENT_DISPOSITION,
                            "attachment; filename=\"export_indemnites_42.xlsx\"",
                        ),
                    ],
                    "PK",
                )
                    .into_response()
            }),
        )
        .route("/export_pdf", post(export_pdf))
        .route(
            "/get_config",
            get(|| async { Json(json!({"success": true, "bases": ["LFLY", "LSGG"]})) }),
        )
        .route(
            "/save_config",
            post(|| async { Json(json!({"success": true})) }),
        )
        .route(
            "/get_prices_periods/{year}",
            get(|| async {
                Json(json!({"success": true, "prices": [
                    {"icao_prefix": "LE", "country": "Espagne", "zone": "A",
                     "periods": [{"valid_from": null, "price": 60.0}]}
                ]}))
            }),
        )
        .route(
            "/search_airports",
            get(|| async {
                Json(json!({"success": true, "total": 1, "airports": [
                    {"icao_code": "LSGG", "iata_code": "GVA", "name": "GENEVE", "country": "LS",
                     "country_name": "Suisse", "type": "AD", "latitude": 46.238, "longitude": 6.1089}
                ]}))
            }),
        )
        .route(
            "/get_countries",
            get(|| async {
                Json(json!({"success": true, "countries": [
                    {"icao_prefix": "LS", "country_name": "Suisse"}
                ]}))
            }),
        )
        .route(
            "/get_airport_stats",
            get(|| async {
                Json(json!({"success": true, "total": 1, "types": [{"type": "AD", "count": 1}],
                            "countries": [{"country": "LS", "count": 1}]}))
            }),
        )
        .route(
            "/add_airport",
            post(|| async { Json(json!({"success": true, "message": "Aeroport ajoute"})) }),
        )
        .layer(middleware::from_fn_with_state(counter, count_requests))
}

/// Starts the stub backend and builds a desk router talking to it.
pub async fn test_desk() -> TestDesk {
    let backend_requests = Arc::new(AtomicUsize::new(0));
    let stub = stub_backend(backend_requests.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, stub).await.unwrap();
    });

    let tera = Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*.html")).unwrap();
    let backend = BackendClient::new(&format!("http://{}", addr), None).unwrap();
    let state = Arc::new(AppState::new(tera, backend));
    let app = build_app_router(
        state.clone(),
        concat!(env!("CARGO_MANIFEST_DIR"), "/static"),
    );

    TestDesk {
        app,
        state,
        backend_requests,
    }
}

pub async fn get_page(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_form(app: Router, uri: &str, body: &str) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Posts one file as `multipart/form-data` under `field`.
pub async fn post_file(app: Router, uri: &str, field: &str, file_name: &str, bytes: &[u8]) -> Response {
    let boundary = "crewdesk-test-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub fn location(response: &Response) -> &str {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response.headers()[header::LOCATION].to_str().unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
