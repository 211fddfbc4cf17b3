use super::*;
use serde_json::json;

#[test]
fn point_ids_serialize_as_bare_values() {
    let numeric = serde_json::to_value(PointId::Num(17)).expect("should serialize");
    assert_eq!(numeric, json!(17));

    let uuid = Uuid::parse_str("a3bb189e-8bf9-3888-9912-ace4e6543002").expect("valid uuid");
    let value = serde_json::to_value(PointId::Uuid(uuid)).expect("should serialize");
    assert_eq!(value, json!("a3bb189e-8bf9-3888-9912-ace4e6543002"));
}

#[test]
fn point_ids_deserialize_either_form() {
    let numeric: PointId = serde_json::from_value(json!(4)).expect("should parse number");
    assert_eq!(numeric, PointId::Num(4));

    let uuid: PointId = serde_json::from_value(json!("a3bb189e-8bf9-3888-9912-ace4e6543002"))
        .expect("should parse uuid");
    assert!(matches!(uuid, PointId::Uuid(_)));
}

#[test]
fn distance_uses_server_spelling() {
    assert_eq!(
        serde_json::to_value(Distance::Cosine).expect("should serialize"),
        json!("Cosine")
    );
    let parsed: Distance = serde_json::from_value(json!("Dot")).expect("should parse");
    assert_eq!(parsed, Distance::Dot);
    assert_eq!(Distance::Euclid.to_string(), "Euclid");
}

#[test]
fn vector_params_wire_shape() {
    let params = VectorParams::cosine(384);
    assert_eq!(
        serde_json::to_value(params).expect("should serialize"),
        json!({ "size": 384, "distance": "Cosine" })
    );
}

#[test]
fn status_is_only_reported_for_http_failures() {
    let status = IndexError::Status {
        operation: "upsert points",
        collection: "products".to_string(),
        status: 503,
        body: String::new(),
    };
    assert_eq!(status.status(), Some(503));
    assert_eq!(
        IndexError::CollectionNotFound("products".to_string()).status(),
        None
    );
}

#[test]
fn mismatch_errors_name_both_sides() {
    let error = IndexError::DimensionMismatch {
        collection: "shops".to_string(),
        expected: 384,
        actual: 768,
    };
    let message = error.to_string();
    assert!(message.contains("shops"));
    assert!(message.contains("384"));
    assert!(message.contains("768"));
}
