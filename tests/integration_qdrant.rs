#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! Sync and search through the HTTP vector store client
//!
//! A wiremock server stands in for the vector store, so these tests check the
//! exact sequence of requests a recreate sync issues and how per-table failures
//! surface in the run report.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use catalog_vector_sync::config::QdrantConfig;
use catalog_vector_sync::database::StaticRecordSource;
use catalog_vector_sync::embeddings::Embedder;
use catalog_vector_sync::index::{IndexError, QdrantClient, VectorIndex};
use catalog_vector_sync::indexer::runner::RunOptions;
use catalog_vector_sync::indexer::{Driver, SyncRunner, TableOutcome, TableSpec, TableSyncer};
use catalog_vector_sync::records::Record;
use catalog_vector_sync::search::SearchClient;

const DIM: usize = 16;

fn client(server: &MockServer) -> Arc<dyn VectorIndex> {
    let config = QdrantConfig {
        url: Some(server.uri()),
        api_key: Some("secret-key".to_string()),
        ..QdrantConfig::default()
    };
    Arc::new(QdrantClient::new(&config).expect("client"))
}

fn ok(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"result": result, "status": "ok", "time": 0.001}))
}

fn spec(name: &str) -> TableSpec {
    TableSpec {
        name: name.to_string(),
        primary_key: Some("id".to_string()),
        text_fields: Some(vec!["name".to_string()]),
    }
}

async fn mount_fresh_collection(server: &MockServer, name: &str) {
    Mock::given(method("DELETE"))
        .and(path(format!("/collections/{name}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"status": {"error": "Not found"}})))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/collections/{name}")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/collections/{name}")))
        .and(body_partial_json(json!({"vectors": {"size": DIM, "distance": "Cosine"}})))
        .respond_with(ok(json!(true)))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn recreate_sync_over_http() {
    let server = MockServer::start().await;

    mount_fresh_collection(&server, "products").await;
    Mock::given(method("PUT"))
        .and(path("/collections/products/points"))
        .and(query_param("wait", "true"))
        .and(header("api-key", "secret-key"))
        .respond_with(ok(json!({"operation_id": 1, "status": "completed"})))
        .expect(3)
        .mount(&server)
        .await;

    mount_fresh_collection(&server, "shops").await;
    Mock::given(method("PUT"))
        .and(path("/collections/shops/points"))
        .respond_with(ResponseTemplate::new(500).set_body_string("storage error"))
        .expect(1)
        .mount(&server)
        .await;

    let source = StaticRecordSource::new()
        .with_table(
            "products",
            (0..5)
                .map(|i| Record::new().with("id", format!("p-{i}")).with("name", format!("ring {i}")))
                .collect(),
        )
        .with_table(
            "shops",
            vec![Record::new().with("id", "s-1").with("name", "Atelier Lune")],
        );

    let syncer = TableSyncer::new(client(&server), Arc::new(source), Embedder::new(DIM));
    let runner = SyncRunner::new(
        syncer,
        RunOptions {
            batch_size: 2,
            retry_backoff: Duration::ZERO,
            ..RunOptions::default()
        },
    );

    let report = runner
        .run(Driver::Scheduled, &[spec("products"), spec("shops")])
        .await;

    assert_eq!(
        report.outcome("products"),
        Some(&TableOutcome::Synced {
            records: 5,
            batches: 3,
            attempts: 1
        })
    );
    match report.outcome("shops") {
        Some(TableOutcome::Failed { error, attempts }) => {
            assert_eq!(*attempts, 1);
            assert!(error.contains("batch 0"), "{error}");
            assert!(error.contains("HTTP 500"), "{error}");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    // expectations on every mock are verified when the server drops
}

#[tokio::test(flavor = "multi_thread")]
async fn first_batch_carries_sequential_ids() {
    let server = MockServer::start().await;
    mount_fresh_collection(&server, "products").await;
    Mock::given(method("PUT"))
        .and(path("/collections/products/points"))
        .respond_with(ok(json!({"operation_id": 1, "status": "completed"})))
        .mount(&server)
        .await;

    let source = StaticRecordSource::new().with_table(
        "products",
        vec![
            Record::new().with("id", "a").with("name", "blue sapphire ring"),
            Record::new().with("id", "b").with("name", "pearl earrings"),
        ],
    );
    let syncer = TableSyncer::new(client(&server), Arc::new(source), Embedder::new(DIM));
    let report = SyncRunner::new(syncer, RunOptions::default())
        .run(Driver::Process, &[spec("products")])
        .await;
    assert!(report.is_success());

    let requests = server.received_requests().await.expect("recording is on");
    let upsert = requests
        .iter()
        .find(|request| request.url.path() == "/collections/products/points")
        .expect("points were upserted");
    let body: Value = serde_json::from_slice(&upsert.body).expect("json body");
    let points = body["points"].as_array().expect("points array");
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["id"], json!(0));
    assert_eq!(points[1]["id"], json!(1));
    assert_eq!(points[0]["payload"]["name"], json!("blue sapphire ring"));
    assert_eq!(points[0]["vector"].as_array().map(Vec::len), Some(DIM));
}

#[tokio::test(flavor = "multi_thread")]
async fn search_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/products"))
        .respond_with(ok(json!({
            "status": "green",
            "points_count": 2,
            "config": {"params": {"vectors": {"size": DIM, "distance": "Cosine"}}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/collections/products/points/search"))
        .and(body_partial_json(json!({"limit": 5, "with_payload": true})))
        .respond_with(ok(json!([
            {"id": 0, "version": 3, "score": 0.91, "payload": {"id": "a", "name": "blue sapphire ring"}},
            {"id": 1, "version": 3, "score": 0.12, "payload": {"id": "b", "name": "pearl earrings"}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let search = SearchClient::new(client(&server), Embedder::new(DIM));
    let hits = search.search("products", "sapphire", 5).expect("search");

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].payload["name"], json!("blue sapphire ring"));
    assert!(hits[0].score > hits[1].score);
}

#[tokio::test(flavor = "multi_thread")]
async fn search_rejects_collection_of_other_dimension() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/products"))
        .respond_with(ok(json!({
            "status": "green",
            "points_count": 10,
            "config": {"params": {"vectors": {"size": 768, "distance": "Cosine"}}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/collections/products/points/search"))
        .respond_with(ok(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let search = SearchClient::new(client(&server), Embedder::new(DIM));
    assert!(matches!(
        search.search("products", "sapphire", 5),
        Err(IndexError::DimensionMismatch {
            expected: DIM,
            actual: 768,
            ..
        })
    ));
}
