use super::*;

fn column(name: &str, data_type: &str) -> SourceColumn {
    SourceColumn {
        name: name.to_string(),
        kind: ColumnKind::from_data_type(data_type),
    }
}

#[test]
fn data_types_map_to_column_kinds() {
    assert_eq!(ColumnKind::from_data_type("uuid"), ColumnKind::Uuid);
    assert_eq!(
        ColumnKind::from_data_type("character varying"),
        ColumnKind::Text
    );
    assert_eq!(ColumnKind::from_data_type("text"), ColumnKind::Text);
    assert_eq!(ColumnKind::from_data_type("numeric"), ColumnKind::Numeric);
    assert_eq!(ColumnKind::from_data_type("integer"), ColumnKind::Integer);
    assert_eq!(ColumnKind::from_data_type("jsonb"), ColumnKind::Json);
    assert_eq!(
        ColumnKind::from_data_type("timestamp with time zone"),
        ColumnKind::TimestampTz
    );
    assert_eq!(ColumnKind::from_data_type("ARRAY"), ColumnKind::Other);
    assert_eq!(ColumnKind::from_data_type("USER-DEFINED"), ColumnKind::Other);
}

#[test]
fn identifiers_are_quoted() {
    assert_eq!(quote_ident("products"), "\"products\"");
    assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
}

#[test]
fn select_reads_numeric_and_unknown_columns_as_text() {
    let columns = vec![
        column("id", "uuid"),
        column("name", "character varying"),
        column("price", "numeric"),
        column("launched_on", "date"),
    ];

    let sql = select_sql("products", &columns, &["id".to_string()]);
    assert_eq!(
        sql,
        "SELECT \"id\", \"name\", \"price\"::text AS \"price\", \"launched_on\"::text AS \"launched_on\" FROM \"products\" ORDER BY \"id\""
    );
}

#[test]
fn select_without_primary_key_has_no_order() {
    let columns = vec![column("message", "text")];
    let sql = select_sql("ticket_responses", &columns, &[]);
    assert_eq!(sql, "SELECT \"message\" FROM \"ticket_responses\"");
}

#[test]
fn composite_keys_order_by_every_column() {
    let columns = vec![column("a", "integer"), column("b", "integer")];
    let sql = select_sql("pairs", &columns, &["a".to_string(), "b".to_string()]);
    assert!(sql.ends_with("ORDER BY \"a\", \"b\""));
}
