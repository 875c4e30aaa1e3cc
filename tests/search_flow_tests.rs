use std::cell::RefCell;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::rc::Rc;
use std::time::{Duration, Instant};

use pix_scout::config::Config;
use pix_scout::search_client::SearchClient;
use pix_scout::search_orchestrator::{OrchestratorSettings, SearchOrchestrator};

const WATERFALLS_BODY: &str = r#"{"photos":[
    {"name":"Upper falls","image_url":"https://photos.example.com/upper.jpg","created_at":"2015-11-08T14:00:00+0000"},
    {"name":"Lower falls","image_url":"https://photos.example.com/lower.jpg","created_at":"2015-11-09T09:30:00+0000"}
]}"#;

/// Serves exactly one HTTP response on a fresh local port, then goes away;
/// any later request to the same port is refused.
fn serve_once(status_line: &str, body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    );
    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut request = [0u8; 4096];
            let _ = stream.read(&mut request);
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{}/", addr)
}

/// A port nothing listens on, for provoking connection failures.
fn refused_host() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}

fn config(api_host: String) -> Config {
    Config {
        api_host,
        api_key: "test-key".to_string(),
        image_size: "4".to_string(),
        debounce_ms: 10,
        min_query_len: 1,
    }
}

async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(condition(), "condition not reached within deadline");
}

#[tokio::test(flavor = "current_thread")]
async fn test_waterfalls_query_reaches_results_in_server_order() {
    let config = config(serve_once("200 OK", WATERFALLS_BODY));
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let client = Rc::new(SearchClient::new(&config));
            let orchestrator =
                SearchOrchestrator::new(client, OrchestratorSettings::from(&config));
            orchestrator.creative_commons_only.set(true);

            orchestrator.search_text.set("waterfalls".to_string());
            wait_until(|| !orchestrator.search_results.get().is_empty()).await;

            let records = orchestrator.search_results.get();
            assert_eq!(records.len(), 2);
            assert_eq!(records[0].title, "Upper falls");
            assert_eq!(records[1].title, "Lower falls");
            assert!(!orchestrator.search_in_progress.get());
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn test_transport_failure_keeps_prior_results_and_reports() {
    // The stub serves the first search, then refuses the second.
    let config = config(serve_once("200 OK", WATERFALLS_BODY));
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let client = Rc::new(SearchClient::new(&config));
            let orchestrator =
                SearchOrchestrator::new(client, OrchestratorSettings::from(&config));
            let errors = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&errors);
            orchestrator
                .error_messages
                .subscribe(move |message: &String| sink.borrow_mut().push(message.clone()));

            orchestrator.search_text.set("waterfalls".to_string());
            wait_until(|| !orchestrator.search_results.get().is_empty()).await;
            let first_results = orchestrator.search_results.get();

            orchestrator.search_text.set("rivers".to_string());
            wait_until(|| !errors.borrow().is_empty()).await;

            assert_eq!(errors.borrow().len(), 1);
            assert!(errors.borrow()[0].contains("unreachable"));
            assert_eq!(orchestrator.search_results.get(), first_results);
            assert!(!orchestrator.search_in_progress.get());
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn test_refused_connection_surfaces_as_transport_error() {
    let config = config(refused_host());
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let client = Rc::new(SearchClient::new(&config));
            let orchestrator =
                SearchOrchestrator::new(client, OrchestratorSettings::from(&config));
            let errors = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&errors);
            orchestrator
                .error_messages
                .subscribe(move |message: &String| sink.borrow_mut().push(message.clone()));

            orchestrator.search_text.set("waterfalls".to_string());
            wait_until(|| !errors.borrow().is_empty()).await;

            assert!(errors.borrow()[0].contains("unreachable"));
            assert!(orchestrator.search_results.get().is_empty());
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn test_server_error_status_surfaces_as_transport_error() {
    let config = config(serve_once("500 Internal Server Error", "{}"));
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let client = Rc::new(SearchClient::new(&config));
            let orchestrator =
                SearchOrchestrator::new(client, OrchestratorSettings::from(&config));
            let errors = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&errors);
            orchestrator
                .error_messages
                .subscribe(move |message: &String| sink.borrow_mut().push(message.clone()));

            orchestrator.search_text.set("waterfalls".to_string());
            wait_until(|| !errors.borrow().is_empty()).await;

            assert!(errors.borrow()[0].contains("unreachable"));
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn test_unreadable_body_surfaces_as_parse_error() {
    let config = config(serve_once("200 OK", "surprise, not json"));
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let client = Rc::new(SearchClient::new(&config));
            let orchestrator =
                SearchOrchestrator::new(client, OrchestratorSettings::from(&config));
            let errors = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&errors);
            orchestrator
                .error_messages
                .subscribe(move |message: &String| sink.borrow_mut().push(message.clone()));

            orchestrator.search_text.set("waterfalls".to_string());
            wait_until(|| !errors.borrow().is_empty()).await;

            assert!(errors.borrow()[0].contains("not understood"));
        })
        .await;
}
