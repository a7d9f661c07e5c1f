//! End-to-end sync cycles against a mocked TAP endpoint.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use lexarchive_core::store::ArchiveStore;
use lexarchive_core::sync::{Reconciliation, Synchronizer};
use lexarchive_core::tap::TapClient;

fn columns() -> Vec<String> {
    vec![
        "pl_name".to_string(),
        "hostname".to_string(),
        "disc_year".to_string(),
        "pl_rade".to_string(),
    ]
}

fn fixture(server: &MockServer) -> (Arc<ArchiveStore>, Synchronizer) {
    let cols = columns();
    let store = Arc::new(ArchiveStore::open_in_memory("ps", &cols).unwrap());
    let tap = Arc::new(TapClient::new(&server.uri(), "ps", &cols));
    let synchronizer = Synchronizer::new(tap, Arc::clone(&store));
    (store, synchronizer)
}

fn query_of(req: &Request) -> String {
    req.url
        .query()
        .unwrap_or_default()
        .to_string()
}

/// Respond to a TAP query containing `needle` with the given CSV body.
async fn mount_query(server: &MockServer, needle: &'static str, body: &str) {
    let body = body.to_string();
    Mock::given(method("GET"))
        .and(query_param("format", "csv"))
        .and(move |req: &Request| query_of(req).contains(needle))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn bootstrap_cycle_fills_empty_mirror() {
    let server = MockServer::start().await;
    mount_query(&server, "count(*)", "count(*)\n1\n").await;
    mount_query(
        &server,
        "select+pl_name,hostname",
        "pl_name,hostname,disc_year,pl_rade\nK2-18 b,K2-18,2015,2.61\n",
    )
    .await;

    let (store, synchronizer) = fixture(&server);
    let report = synchronizer.run_cycle().await.unwrap();

    assert_eq!(report.strategy, Reconciliation::Bootstrap);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.deleted, 0);
    assert_eq!(report.marker, Utc::now().format("%Y-%m-%d").to_string());

    let ids = store.local_identifiers().unwrap();
    assert_eq!(ids, HashSet::from(["K2-18 b".to_string()]));
    assert_eq!(store.last_marker().unwrap(), Some(report.marker));
}

#[tokio::test]
async fn incremental_cycle_reinserts_changed_entities() {
    let server = MockServer::start().await;
    mount_query(&server, "count(*)", "count(*)\n2\n").await;
    mount_query(
        &server,
        "+from+ps+where",
        "pl_name,hostname,disc_year,pl_rade\nK2-18 b,K2-18,2015,2.75\n",
    )
    .await;

    let (store, synchronizer) = fixture(&server);
    // Seed the mirror as a previous cycle would have left it.
    store
        .apply(&lexarchive_core::store::ApplyPlan {
            to_delete: vec![],
            to_insert: vec![
                tap_row(&["K2-18 b", "K2-18", "2015", "2.61"]),
                tap_row(&["GJ 1214 b", "GJ 1214", "2009", "2.74"]),
            ],
            marker: "2020-01-01".to_string(),
        })
        .unwrap();

    let report = synchronizer.run_cycle().await.unwrap();

    assert_eq!(report.strategy, Reconciliation::Incremental);
    // The changed entity is deleted then reinserted; the untouched one stays.
    assert_eq!(report.deleted, 1);
    assert_eq!(report.inserted, 1);
    let ids = store.local_identifiers().unwrap();
    assert_eq!(
        ids,
        HashSet::from(["K2-18 b".to_string(), "GJ 1214 b".to_string()])
    );
    assert_eq!(store.count().unwrap(), 2);
}

#[tokio::test]
async fn count_mismatch_deletes_entities_removed_upstream() {
    let server = MockServer::start().await;
    // Local holds A,B,C (3 rows) while the remote reports 4 rows over
    // B,C,D: the count mismatch selects the full-diff strategy.
    mount_query(&server, "count(*)", "count(*)\n4\n").await;
    mount_query(&server, "select+distinct+pl_name", "pl_name\nB\nC\nD\n").await;
    mount_query(
        &server,
        "+from+ps+where",
        "pl_name,hostname,disc_year,pl_rade\nD,host-d,2024,1.1\n",
    )
    .await;

    let (store, synchronizer) = fixture(&server);
    store
        .apply(&lexarchive_core::store::ApplyPlan {
            to_delete: vec![],
            to_insert: vec![
                tap_row(&["A", "host-a", "2001", "1.0"]),
                tap_row(&["B", "host-b", "2002", "1.0"]),
                tap_row(&["C", "host-c", "2003", "1.0"]),
            ],
            marker: "2020-01-01".to_string(),
        })
        .unwrap();

    let report = synchronizer.run_cycle().await.unwrap();

    assert_eq!(report.strategy, Reconciliation::FullDiff);
    let ids = store.local_identifiers().unwrap();
    assert_eq!(
        ids,
        HashSet::from(["B".to_string(), "C".to_string(), "D".to_string()])
    );
    // A (removed upstream) and D (changed, reinserted) were deleted rows.
    assert_eq!(report.inserted, 1);
}

#[tokio::test]
async fn remote_failure_aborts_cycle_without_partial_writes() {
    let server = MockServer::start().await;
    mount_query(&server, "count(*)", "count(*)\n5\n").await;
    // Row fetch answers 500: the cycle must abort.
    Mock::given(method("GET"))
        .and(|req: &Request| query_of(req).contains("select+pl_name,hostname"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let (store, synchronizer) = fixture(&server);
    let err = synchronizer.run_cycle().await.unwrap_err();
    assert!(err.to_string().contains("500"), "got: {err}");

    assert_eq!(store.count().unwrap(), 0);
    assert_eq!(store.last_marker().unwrap(), None);
}

fn tap_row(cells: &[&str]) -> lexarchive_core::tap::TapRow {
    lexarchive_core::tap::TapRow {
        name: cells[0].to_string(),
        cells: cells
            .iter()
            .map(|c| lexarchive_core::values::CellValue::parse(c))
            .collect(),
    }
}
