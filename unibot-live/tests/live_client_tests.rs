//! HTTP-level tests for the live data clients against a local mock server

use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use unibot_core::{AnnouncementSource, AnnouncementsConfig, ErrorKind, UnibotError};
use unibot_live::{AnnouncementClient, DataSource, LiveDataService, FETCHED_CATEGORY};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANNOUNCEMENTS_PATH: &str = "/api/reva-about";

fn config_for(server: &MockServer, timeout_seconds: u64) -> AnnouncementsConfig {
    AnnouncementsConfig {
        base_url: server.uri(),
        path: ANNOUNCEMENTS_PATH.to_string(),
        timeout_seconds,
        ..AnnouncementsConfig::default()
    }
}

async fn server_replying(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ANNOUNCEMENTS_PATH))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

async fn fetch_error(template: ResponseTemplate) -> UnibotError {
    let server = server_replying(template).await;
    let client = AnnouncementClient::new(&config_for(&server, 5)).unwrap();
    client.fetch_announcements().await.unwrap_err()
}

#[tokio::test]
async fn test_fetch_normalizes_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ANNOUNCEMENTS_PATH))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "https://reva.edu.in/news/fest": {"title": "Tech Fest 2023", "content": "Annual fest"},
            "https://reva.edu.in/news/exam": {"title": "Exam Schedule"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnnouncementClient::new(&config_for(&server, 5)).unwrap();
    let items = client.fetch_announcements().await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Tech Fest 2023");
    assert_eq!(items[0].link.as_deref(), Some("https://reva.edu.in/news/fest"));
    assert_eq!(items[1].description, "No Content");
    assert!(items.iter().all(|item| item.category == FETCHED_CATEGORY));
    assert!(items.iter().all(|item| item.published_at.is_some()));
}

#[tokio::test]
async fn test_empty_object_is_empty_success() {
    let server = server_replying(ResponseTemplate::new(200).set_body_string("{}")).await;
    let client = AnnouncementClient::new(&config_for(&server, 5)).unwrap();

    assert!(client.fetch_announcements().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_server_failure_statuses() {
    let error = fetch_error(ResponseTemplate::new(500).set_body_string("down")).await;
    assert_eq!(error.kind(), ErrorKind::Server);
    assert_eq!(
        error.message(),
        "Server error (500): The announcement server is currently unavailable. Details: down"
    );

    let error = fetch_error(ResponseTemplate::new(404)).await;
    assert_eq!(error.kind(), ErrorKind::Server);
    assert_eq!(error.message(), "The announcements API endpoint was not found.");

    let error = fetch_error(ResponseTemplate::new(429)).await;
    assert_eq!(error.kind(), ErrorKind::Server);
    assert_eq!(error.message(), "Too many requests. Please try again later.");

    let error = fetch_error(ResponseTemplate::new(418).set_body_string("teapot")).await;
    assert_eq!(error.status(), Some(418));
    assert_eq!(
        error.message(),
        "API request failed with status 418. Details: teapot"
    );
}

#[tokio::test]
async fn test_invalid_body_is_parse_error() {
    let error = fetch_error(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>")).await;
    assert_eq!(error.kind(), ErrorKind::Parse);
    assert_eq!(
        error.message(),
        "Invalid response: Could not parse announcement data"
    );
}

#[tokio::test]
async fn test_slow_server_is_timeout() {
    let server = server_replying(
        ResponseTemplate::new(200)
            .set_body_string("{}")
            .set_delay(Duration::from_secs(3)),
    )
    .await;
    let client = AnnouncementClient::new(&config_for(&server, 1)).unwrap();

    let error = client.fetch_announcements().await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Reserve a port, then free it so nothing is listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = AnnouncementsConfig {
        base_url: format!("http://127.0.0.1:{}", port),
        timeout_seconds: 5,
        ..AnnouncementsConfig::default()
    };
    let client = AnnouncementClient::new(&config).unwrap();

    let error = client.fetch_announcements().await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Network);
    assert!(error
        .message()
        .starts_with("Unable to connect to the announcement server"));
}

#[tokio::test]
async fn test_fetch_data_from_registered_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/timetable"))
        .and(header("x-campus", "main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"slots": [1, 2, 3]})))
        .mount(&server)
        .await;

    let service = LiveDataService::default();
    service.register_source(
        DataSource::new("timetable", "Timetable", format!("{}/timetable", server.uri()))
            .with_header("x-campus", "main"),
    );

    let value = service.fetch_data("timetable").await.unwrap();
    assert_eq!(value["slots"][2], 3);
    assert_eq!(service.list_sources().len(), 1);

    let missing = service.fetch_data("unknown").await.unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::Unknown);
}

#[tokio::test]
async fn test_registered_source_errors_use_generic_labels() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let service = LiveDataService::default();
    service.register_source(DataSource::new("gone", "Gone", format!("{}/gone", server.uri())));

    let error = service.fetch_data("gone").await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Server);
    assert_eq!(error.message(), "The API endpoint was not found.");
}

#[tokio::test]
async fn test_polling_delivers_until_stopped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"open": true})))
        .mount(&server)
        .await;

    let service = LiveDataService::default();
    service.register_source(DataSource::new("status", "Status", format!("{}/status", server.uri())));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    service
        .start_polling(
            "status",
            move |outcome| sink.lock().unwrap().push(outcome.is_ok()),
            Some(Duration::from_millis(50)),
        )
        .unwrap();
    assert!(service.is_polling("status"));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(service.stop_polling("status"));
    assert!(!service.is_polling("status"));

    let delivered = seen.lock().unwrap().len();
    assert!(delivered >= 2, "expected several polls, got {}", delivered);
    assert!(seen.lock().unwrap().iter().all(|ok| *ok));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(seen.lock().unwrap().len(), delivered);
    assert!(!service.stop_polling("status"));
}

#[tokio::test]
async fn test_polling_requires_registered_source() {
    let service = LiveDataService::default();
    assert!(service.start_polling("nope", |_| {}, None).is_err());
    assert!(!service.is_polling("nope"));

    service.register_source(DataSource::new("zero", "Zero", "http://127.0.0.1:9/"));
    assert!(service
        .start_polling("zero", |_| {}, Some(Duration::ZERO))
        .is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_poll_handler_can_stop_its_own_poll() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"open": true})))
        .mount(&server)
        .await;

    let service = Arc::new(LiveDataService::default());
    service.register_source(DataSource::new("status", "Status", format!("{}/status", server.uri())));

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let weak = Arc::downgrade(&service);
    service
        .start_polling(
            "status",
            move |outcome| {
                let stopped = weak
                    .upgrade()
                    .map(|service| service.stop_polling("status"))
                    .unwrap_or(false);
                let _ = tx.send((outcome.is_ok(), stopped));
            },
            Some(Duration::from_millis(20)),
        )
        .unwrap();

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("poll handler returned")
        .expect("one outcome delivered");
    assert_eq!(first, (true, true));
    assert!(!service.is_polling("status"));

    // The handler is dropped after stopping, closing the channel with nothing more sent
    let rest = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("poll wound down");
    assert_eq!(rest, None);
}
