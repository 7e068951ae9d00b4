//! Live openFDA device-event search.
//!
//! Run with: cargo test --package tortlens-ingestion --test test_openfda_search -- --ignored --nocapture

use tortlens_common::http::{ApiClient, RetryPolicy};
use tortlens_ingestion::pagination::PaginationConfig;
use tortlens_ingestion::sources::openfda::{OpenFdaClient, SearchQuery};

fn client() -> OpenFdaClient {
    let api_key = std::env::var("TORTLENS_OPENFDA_API_KEY").ok();
    OpenFdaClient::new(ApiClient::new().unwrap(), api_key, RetryPolicy::none())
}

#[tokio::test]
#[ignore] // Requires network access
async fn test_search_ivc_filter_events() {
    let query = SearchQuery::new().field("device.device_report_product_code", "DTK");
    let config = PaginationConfig::default().with_max_pages(Some(2));

    let outcome = client().search_events(&query, &config).await;

    println!("Fetched {} records over {} pages (skipped {}, truncated {})",
        outcome.records.len(), outcome.pages_fetched, outcome.skipped, outcome.truncated);
    for r in outcome.records.iter().take(5) {
        println!("{} | {:?} | {} | {}", r.report_id, r.date_received, r.brand_name, r.patient_problems);
    }

    assert!(!outcome.records.is_empty(), "Should find IVC filter reports");
    assert!(outcome.records.len() <= 200);
}

#[tokio::test]
#[ignore] // Requires network access
async fn test_count_event_types() {
    let query = SearchQuery::new().field("device.generic_name", "hernia mesh");
    let buckets = client().count(&query, "event_type.exact").await.expect("count failed");

    for b in &buckets {
        println!("{:<24} {}", b.term, b.count);
    }
    assert!(!buckets.is_empty());
}

#[tokio::test]
#[ignore] // Requires network access
async fn test_no_match_is_empty_not_error() {
    let query = SearchQuery::new().field("device.brand_name", "zzzz-no-such-device-zzzz");
    let total = client().total(&query).await.expect("total failed");
    assert_eq!(total, 0);
}
