//! openFDA and CourtListener clients against a canned local HTTP server.
//!
//! Runs offline: each test binds 127.0.0.1 and serves a fixed list of
//! responses, one per connection, recording the request heads.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use tortlens_common::http::{ApiClient, RetryPolicy};
use tortlens_ingestion::pagination::PaginationConfig;
use tortlens_ingestion::sources::courtlistener::{CourtListenerClient, DocketSearch};
use tortlens_ingestion::sources::openfda::{OpenFdaClient, SearchQuery};

type RequestLog = Arc<Mutex<Vec<String>>>;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

/// Answer one request per connection with the next `(status, body)`.
fn serve(listener: TcpListener, responses: Vec<(u16, String)>) -> RequestLog {
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let seen = log.clone();
    tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => head.extend_from_slice(&buf[..n]),
                }
            }
            seen.lock().unwrap().push(String::from_utf8_lossy(&head).to_lowercase());

            let content_type = if body.starts_with('<') { "text/html" } else { "application/json" };
            let response = format!(
                "HTTP/1.1 {} Canned\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                content_type,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });
    log
}

fn requests(log: &RequestLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn event(key: &str) -> serde_json::Value {
    json!({
        "mdr_report_key": key,
        "date_received": "20210614",
        "event_type": "Malfunction",
        "device": [{ "brand_name": "DREAMSTATION", "manufacturer_d_name": "PHILIPS RESPIRONICS" }]
    })
}

fn no_matches() -> String {
    json!({ "error": { "code": "NOT_FOUND", "message": "No matches found!" } }).to_string()
}

fn quick_pages(page_size: usize) -> PaginationConfig {
    PaginationConfig {
        page_size,
        max_pages: None,
        delay: Duration::ZERO,
        max_skip: None,
    }
}

fn hit(id: u64, name: &str) -> serde_json::Value {
    json!({
        "docket_id": id,
        "caseName": name,
        "docketNumber": format!("2:15-md-{:05}", id),
        "court_id": "azd",
        "dateFiled": "2015-08-17",
        "docket_absolute_url": format!("/docket/{}/x/", id)
    })
}

#[tokio::test]
async fn test_openfda_retries_then_keeps_partial_results() {
    let (listener, base) = bind().await;
    let page = json!({ "meta": {}, "results": [event("1001"), event("1002")] }).to_string();
    let log = serve(
        listener,
        vec![
            (503, String::new()),
            (200, page),
            (500, String::new()),
            (500, String::new()),
        ],
    );

    let client = OpenFdaClient::new(
        ApiClient::new().unwrap(),
        Some("k".into()),
        RetryPolicy::new(1, Duration::from_millis(10)),
    )
    .with_base_url(format!("{}/", base));

    let outcome = client.search_events(&SearchQuery::new(), &quick_pages(2)).await;

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.records[1].report_id, "1002");
    assert_eq!(outcome.pages_fetched, 1);
    assert!(outcome.truncated);
    assert!(outcome.error.is_some());

    let seen = requests(&log);
    assert_eq!(seen.len(), 4, "one retry per page");
    assert!(seen[0].contains("skip=0") && seen[1].contains("skip=0"));
    assert!(seen[2].contains("skip=2") && seen[3].contains("skip=2"));
    assert!(seen.iter().all(|r| r.contains("api_key=k") && r.contains("limit=2")));
}

#[tokio::test]
async fn test_openfda_not_found_envelope_means_no_matches() {
    let (listener, base) = bind().await;
    let log = serve(listener, vec![(404, no_matches()), (404, no_matches()), (404, no_matches())]);

    let client = OpenFdaClient::new(ApiClient::new().unwrap(), None, RetryPolicy::none())
        .with_base_url(format!("{}/", base));
    let query = SearchQuery::new().field("device.brand_name", "NOSUCHDEVICE");

    assert_eq!(client.total(&query).await.unwrap(), 0);
    assert!(client.count(&query, "event_type.exact").await.unwrap().is_empty());

    let outcome = client.search_events(&query, &quick_pages(100)).await;
    assert!(outcome.records.is_empty());
    assert!(!outcome.truncated);
    assert_eq!(outcome.error, None);

    assert_eq!(requests(&log).len(), 3);
}

#[tokio::test]
async fn test_openfda_plain_404_is_an_error() {
    let (listener, base) = bind().await;
    let html = "<html><body>404 Not Found</body></html>".to_string();
    serve(listener, vec![(404, html.clone()), (404, html)]);

    let client = OpenFdaClient::new(ApiClient::new().unwrap(), None, RetryPolicy::none())
        .with_base_url(format!("{}/", base));

    assert!(client.total(&SearchQuery::new()).await.is_err());

    let outcome = client.search_events(&SearchQuery::new(), &quick_pages(100)).await;
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.pages_fetched, 0);
    assert!(outcome.truncated);
    assert!(outcome.error.unwrap().contains("404"));
}

#[tokio::test]
async fn test_courtlistener_follows_cursor() {
    let (listener, base) = bind().await;
    let first = json!({
        "count": 2,
        "next": format!("{}/?cursor=abc", base),
        "results": [hit(4356473, "In re Bard IVC Filters")]
    });
    let second = json!({ "count": 2, "next": null, "results": [hit(6045245, "In re Cook IVC Filters")] });
    let log = serve(listener, vec![(200, first.to_string()), (200, second.to_string())]);

    let client = CourtListenerClient::new(ApiClient::new().unwrap(), Some("tok".into()), RetryPolicy::none())
        .with_base_url(format!("{}/", base))
        .with_page_delay(Duration::ZERO);

    let outcome = client.search(&DocketSearch::new("IVC filter")).await;

    assert_eq!(outcome.rows.len(), 2);
    assert_eq!(outcome.rows[1].docket_id, 6045245);
    assert_eq!(outcome.pages_fetched, 2);
    assert_eq!(outcome.reported_count, Some(2));
    assert!(!outcome.truncated);
    assert_eq!(outcome.error, None);

    let seen = requests(&log);
    assert_eq!(seen.len(), 2);
    assert!(seen[0].contains("q=ivc"));
    // cursor URL is used as given, without re-sending the search params
    assert!(seen[1].starts_with("get /?cursor=abc "));
    assert!(!seen[1].contains("q="));
    assert!(seen.iter().all(|r| r.contains("authorization: token tok")));
}

#[tokio::test]
async fn test_courtlistener_failure_keeps_first_page() {
    let (listener, base) = bind().await;
    let first = json!({
        "count": 5,
        "next": format!("{}/?cursor=p2", base),
        "results": [hit(4356473, "In re Bard IVC Filters"), { "caseName": "no id" }]
    });
    serve(
        listener,
        vec![(200, first.to_string()), (404, json!({ "detail": "Not found." }).to_string())],
    );

    let client = CourtListenerClient::new(ApiClient::new().unwrap(), None, RetryPolicy::none())
        .with_base_url(format!("{}/", base))
        .with_page_delay(Duration::ZERO);

    let outcome = client.search(&DocketSearch::new("IVC filter")).await;

    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.pages_fetched, 1);
    assert_eq!(outcome.reported_count, Some(5));
    assert!(outcome.truncated);
    assert!(outcome.error.is_some());
}
