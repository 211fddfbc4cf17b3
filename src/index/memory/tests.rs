use super::*;
use serde_json::json;

fn point(id: u64, vector: Vec<f32>, name: &str) -> Point {
    let mut payload = Payload::new();
    payload.insert("name".to_string(), json!(name));
    Point {
        id: PointId::Num(id),
        vector,
        payload,
    }
}

fn index_with(name: &str, size: usize) -> MemoryIndex {
    let index = MemoryIndex::new();
    index
        .create_collection(name, VectorParams::cosine(size))
        .expect("should create collection");
    index
}

#[test]
fn create_then_describe() {
    let index = index_with("products", 3);
    let info = index
        .collection_info("products")
        .expect("should describe")
        .expect("collection should exist");
    assert_eq!(info.params, VectorParams::cosine(3));
    assert_eq!(info.points_count, Some(0));
    assert_eq!(
        index.list_collections().expect("should list"),
        vec!["products"]
    );
}

#[test]
fn creating_twice_conflicts() {
    let index = index_with("products", 3);
    let error = index
        .create_collection("products", VectorParams::cosine(3))
        .expect_err("second create should conflict");
    assert_eq!(error.status(), Some(409));
}

#[test]
fn delete_is_idempotent() {
    let index = index_with("products", 3);
    assert_eq!(
        index.delete_collection("products").expect("delete"),
        DeleteOutcome::Deleted
    );
    assert_eq!(
        index.delete_collection("products").expect("delete again"),
        DeleteOutcome::NotFound
    );
    assert!(!index.contains_collection("products"));
}

#[test]
fn upsert_overwrites_by_id() {
    let index = index_with("products", 2);
    index
        .upsert_points("products", &[point(0, vec![1.0, 0.0], "first")])
        .expect("upsert");
    index
        .upsert_points("products", &[point(0, vec![0.0, 1.0], "second")])
        .expect("upsert");

    let stored = index.points("products");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].payload["name"], json!("second"));
}

#[test]
fn upsert_rejects_wrong_dimension() {
    let index = index_with("products", 3);
    let error = index
        .upsert_points("products", &[point(0, vec![1.0, 0.0], "short")])
        .expect_err("dimension mismatch");
    assert_eq!(error.status(), Some(400));
    assert_eq!(index.point_count("products"), 0);
}

#[test]
fn upsert_into_missing_collection_fails() {
    let index = MemoryIndex::new();
    let error = index
        .upsert_points("nowhere", &[point(0, vec![1.0], "x")])
        .expect_err("missing collection");
    assert!(matches!(error, IndexError::CollectionNotFound(_)));
}

#[test]
fn search_ranks_by_cosine_similarity() {
    let index = index_with("products", 2);
    index
        .upsert_points(
            "products",
            &[
                point(0, vec![0.0, 1.0], "orthogonal"),
                point(1, vec![1.0, 0.0], "identical"),
                point(2, vec![1.0, 1.0], "diagonal"),
            ],
        )
        .expect("upsert");

    let hits = index
        .search_points("products", &[1.0, 0.0], 2)
        .expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].payload["name"], json!("identical"));
    assert_eq!(hits[1].payload["name"], json!("diagonal"));
    assert!((hits[0].score - 1.0).abs() < 1e-6);
}

#[test]
fn search_ranks_distances_ascending() {
    let index = MemoryIndex::new();
    index
        .create_collection(
            "shops",
            VectorParams {
                size: 1,
                distance: Distance::Euclid,
            },
        )
        .expect("create");
    index
        .upsert_points(
            "shops",
            &[point(0, vec![10.0], "far"), point(1, vec![1.5], "near")],
        )
        .expect("upsert");

    let hits = index.search_points("shops", &[1.0], 5).expect("search");
    assert_eq!(hits[0].payload["name"], json!("near"));
    assert!(hits[0].score < hits[1].score);
}

#[test]
fn injected_upsert_failures_follow_the_plan() {
    let index = index_with("products", 1);
    index.fail_upserts("products", 1, 1);

    assert!(index.upsert_points("products", &[point(0, vec![1.0], "a")]).is_ok());
    assert!(index.upsert_points("products", &[point(1, vec![1.0], "b")]).is_err());
    assert!(index.upsert_points("products", &[point(2, vec![1.0], "c")]).is_ok());
    assert_eq!(index.upsert_calls("products"), 3);
    assert_eq!(index.point_count("products"), 2);
}

#[test]
fn injected_delete_failures_are_consumed() {
    let index = index_with("products", 1);
    index.fail_deletes("products", 1);
    assert!(index.delete_collection("products").is_err());
    assert!(index.contains_collection("products"));
    assert_eq!(
        index.delete_collection("products").expect("delete"),
        DeleteOutcome::Deleted
    );
}

#[test]
fn scroll_matches_payload_values() {
    let index = index_with("products", 1);
    index
        .upsert_points(
            "products",
            &[
                point(0, vec![1.0], "Aurora"),
                point(1, vec![1.0], "Borealis"),
            ],
        )
        .expect("upsert");

    let found = index
        .scroll_by_payload("products", "name", &json!("Borealis"), 10)
        .expect("scroll");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], json!("Borealis"));

    let none = index
        .scroll_by_payload("products", "name", &json!("Nope"), 10)
        .expect("scroll");
    assert!(none.is_empty());
}
