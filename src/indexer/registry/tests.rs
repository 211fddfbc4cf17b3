use super::*;

fn names(specs: &[TableSpec]) -> Vec<&str> {
    specs.iter().map(|spec| spec.name.as_str()).collect()
}

#[test]
fn text_type_heuristic() {
    assert!(is_text_type("VARCHAR"));
    assert!(is_text_type("varchar(255)"));
    assert!(is_text_type("TEXT"));
    assert!(is_text_type("CHAR(2)"));
    assert!(is_text_type("String"));
    assert!(!is_text_type("UUID"));
    assert!(!is_text_type("JSON"));
    assert!(!is_text_type("NUMERIC(10, 2)"));
    assert!(!is_text_type("DATETIME"));
}

#[test]
fn catalog_covers_the_application_tables() {
    let declared: Vec<&str> = catalog().iter().map(|table| table.name).collect();
    assert_eq!(
        declared,
        vec![
            "products",
            "shops",
            "product_images",
            "product_tryon_images",
            "users",
            "user_settings",
            "tickets",
            "ticket_responses"
        ]
    );
}

#[test]
fn derived_text_fields_keep_declaration_order() {
    let products = catalog_table("products").expect("products is declared");
    assert_eq!(
        text_fields_for(products),
        Some(vec![
            "name".to_string(),
            "description".to_string(),
            "category".to_string(),
            "subcategory".to_string(),
            "material".to_string(),
            "dimensions".to_string(),
        ])
    );
}

#[test]
fn table_without_text_columns_embeds_everything() {
    static NUMBERS: CatalogTable = CatalogTable {
        name: "numbers",
        primary_key: Some("id"),
        columns: &[ColumnSpec {
            name: "id",
            data_type: "INTEGER",
        }],
    };
    assert_eq!(text_fields_for(&NUMBERS), None);
}

#[test]
fn process_driver_syncs_every_declared_table() {
    let specs = Driver::Process.tables(&[]);
    assert_eq!(specs.len(), catalog().len());
    assert!(specs.iter().all(|spec| spec.primary_key.is_some()));
}

#[test]
fn process_driver_adds_configured_tables() {
    let extra = vec![
        TableConfig {
            name: "orders".to_string(),
            primary_key: Some("order_id".to_string()),
            text_fields: vec!["notes".to_string()],
        },
        TableConfig {
            name: "audit_log".to_string(),
            primary_key: None,
            text_fields: Vec::new(),
        },
        TableConfig {
            name: "products".to_string(),
            primary_key: Some("id".to_string()),
            text_fields: Vec::new(),
        },
    ];

    let specs = Driver::Process.tables(&extra);
    let listed = names(&specs);
    assert!(listed.contains(&"orders"));
    assert!(!listed.contains(&"audit_log"));
    assert_eq!(listed.iter().filter(|name| **name == "products").count(), 1);

    let orders = specs
        .iter()
        .find(|spec| spec.name == "orders")
        .expect("orders is selected");
    assert_eq!(orders.text_fields, Some(vec!["notes".to_string()]));
}

#[test]
fn scheduled_driver_uses_the_allowlist() {
    let specs = Driver::Scheduled.tables(&[TableConfig {
        name: "orders".to_string(),
        primary_key: Some("id".to_string()),
        text_fields: Vec::new(),
    }]);
    assert_eq!(names(&specs), vec!["products", "shops"]);

    let shops = &specs[1];
    assert_eq!(shops.primary_key.as_deref(), Some("id"));
    assert_eq!(
        shops.text_fields,
        Some(vec![
            "name".to_string(),
            "description".to_string(),
            "category".to_string(),
            "address".to_string(),
        ])
    );
}

#[test]
fn drivers_agree_on_shared_tables() {
    let process = Driver::Process.tables(&[]);
    let scheduled = Driver::Scheduled.tables(&[]);
    for spec in &scheduled {
        let other = process
            .iter()
            .find(|candidate| candidate.name == spec.name)
            .expect("scheduled tables are declared");
        assert_eq!(other.primary_key, spec.primary_key);
    }
}

#[test]
fn driver_parsing() {
    assert_eq!("process".parse::<Driver>(), Ok(Driver::Process));
    assert_eq!("scheduled".parse::<Driver>(), Ok(Driver::Scheduled));
    assert!("cron".parse::<Driver>().is_err());
    assert_eq!(Driver::Scheduled.to_string(), "scheduled");
}

#[test]
fn text_field_set_matches_list() {
    let spec = TableSpec {
        name: "products".to_string(),
        primary_key: Some("id".to_string()),
        text_fields: Some(vec!["name".to_string(), "category".to_string()]),
    };
    let set = spec.text_field_set().expect("fields are set");
    assert!(set.contains("name"));
    assert!(set.contains("category"));
    assert_eq!(set.len(), 2);
}

#[test]
fn drivers_differ_on_product_dimensions() {
    let text_fields = |driver: Driver| {
        driver
            .tables(&[])
            .into_iter()
            .find(|spec| spec.name == "products")
            .and_then(|spec| spec.text_fields)
            .expect("products has text fields")
    };

    let process = text_fields(Driver::Process);
    let scheduled = text_fields(Driver::Scheduled);
    assert!(process.contains(&"dimensions".to_string()));
    assert!(!scheduled.contains(&"dimensions".to_string()));
    assert!(scheduled.iter().all(|field| process.contains(field)));
}
