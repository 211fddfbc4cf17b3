use super::*;
use std::collections::HashMap;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name: &str| map.get(name).cloned()
}

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.qdrant.url, None);
    assert_eq!(config.qdrant.timeout_seconds, 30);
    assert_eq!(config.database.host, "localhost");
    assert_eq!(config.database.port, 5432);
    assert_eq!(config.sync.batch_size, 100);
    assert_eq!(config.sync.vector_size, 384);
    assert_eq!(config.sync.point_ids, PointIdMode::Sequential);
    assert_eq!(config.sync.table_retries, 0);
    assert!(config.ledger.enabled);
    assert_eq!(config.ledger.keep_runs, 200);
    assert!(config.tables.is_empty());
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid_config = config.clone();
    invalid_config.qdrant.url = Some("not a url".to_string());
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.qdrant.url = Some("ftp://vectors.example.com".to_string());
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.qdrant.timeout_seconds = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.sync.batch_size = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.sync.vector_size = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.sync.table_retries = 11;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.database.url = Some("mysql://localhost/shop".to_string());
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.database.max_connections = 0;
    assert!(invalid_config.validate().is_err());
}

#[test]
fn missing_url_is_fatal_only_when_requested() {
    let config = QdrantConfig::default();
    assert!(config.validate().is_ok());
    assert!(matches!(
        config.qdrant_url(),
        Err(ConfigError::MissingVectorStoreUrl)
    ));

    let blank = QdrantConfig {
        url: Some("   ".to_string()),
        ..QdrantConfig::default()
    };
    assert!(matches!(
        blank.qdrant_url(),
        Err(ConfigError::MissingVectorStoreUrl)
    ));
}

#[test]
fn qdrant_url_parsing() {
    let config = QdrantConfig {
        url: Some("https://xyz.cloud.qdrant.io:6333".to_string()),
        ..QdrantConfig::default()
    };
    let url = config.qdrant_url().expect("should parse url");
    assert_eq!(url.as_str(), "https://xyz.cloud.qdrant.io:6333/");
}

#[test]
fn setter_validation() {
    let mut qdrant = QdrantConfig::default();
    assert!(qdrant.set_url("http://localhost:6333".to_string()).is_ok());
    assert!(qdrant.set_url("localhost".to_string()).is_err());
    assert_eq!(qdrant.url.as_deref(), Some("http://localhost:6333"));
    assert!(qdrant.set_timeout_seconds(0).is_err());
    assert!(qdrant.set_timeout_seconds(600).is_ok());

    qdrant.set_api_key("secret".to_string());
    assert_eq!(qdrant.api_key.as_deref(), Some("secret"));
    qdrant.set_api_key("  ".to_string());
    assert_eq!(qdrant.api_key, None);

    let mut sync = SyncConfig::default();
    assert!(sync.set_batch_size(1).is_ok());
    assert!(sync.set_batch_size(10_000).is_ok());
    assert!(sync.set_batch_size(0).is_err());
    assert!(sync.set_batch_size(10_001).is_err());
    assert!(sync.set_vector_size(768).is_ok());
    assert!(sync.set_vector_size(0).is_err());
    assert!(sync.set_table_retries(3).is_ok());
    assert!(sync.set_table_retries(20).is_err());
}

#[test]
fn toml_serialization() {
    let mut config = Config::default();
    config.qdrant.url = Some("http://localhost:6333".to_string());
    config.sync.point_ids = PointIdMode::SourceKey;
    config.tables.push(TableConfig {
        name: "orders".to_string(),
        primary_key: Some("id".to_string()),
        text_fields: vec!["status".to_string(), "notes".to_string()],
    });

    let toml_str = toml::to_string_pretty(&config).expect("should serialize toml correctly");
    assert!(toml_str.contains("point_ids = \"source_key\""));
    assert!(toml_str.contains("[[tables]]"));

    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_config_uses_defaults() {
    let partial_toml = r#"
        [qdrant]
        url = "http://vectors:6333"

        [sync]
        batch_size = 250
    "#;

    let config: Config = toml::from_str(partial_toml).expect("should parse partial toml");
    assert_eq!(config.qdrant.url.as_deref(), Some("http://vectors:6333"));
    assert_eq!(config.qdrant.timeout_seconds, 30);
    assert_eq!(config.sync.batch_size, 250);
    assert_eq!(config.sync.vector_size, 384);
    assert_eq!(config.database, DatabaseConfig::default());
}

#[test]
fn ledger_retention_setting() {
    let config: Config = toml::from_str("[ledger]\nkeep_runs = 5\n").expect("should parse ledger");
    assert!(config.ledger.enabled);
    assert_eq!(config.ledger.keep_runs, 5);

    let config: Config = toml::from_str("[ledger]\nenabled = false\n").expect("should parse ledger");
    assert_eq!(config.ledger.keep_runs, 200);
}

#[test]
fn load_missing_config_returns_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::load_from(temp_dir.path()).expect("should load defaults");
    assert_eq!(config.sync, SyncConfig::default());
    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(config.ledger_path(), temp_dir.path().join("ledger.db"));
}

#[test]
fn save_then_load() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config {
        base_dir: temp_dir.path().join("nested"),
        ..Config::default()
    };
    config.qdrant.url = Some("http://localhost:6333".to_string());
    config.sync.table_retries = 2;

    config.save().expect("should save config");
    assert!(config.config_file_path().exists());

    let loaded = Config::load_from(temp_dir.path().join("nested")).expect("should load config");
    assert_eq!(loaded, config);
}

#[test]
fn load_rejects_invalid_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[sync]\nbatch_size = 0\n",
    )
    .expect("should write config");

    assert!(Config::load_from(temp_dir.path()).is_err());
}

#[test]
fn env_overrides_replace_file_values() {
    let mut config = Config::default();
    config.qdrant.url = Some("http://from-file:6333".to_string());

    config
        .apply_env_overrides(env(&[
            ("QDRANT_API_URL", "http://from-env:6333"),
            ("QDRANT_API_KEY", "env-key"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("DB_NAME", "catalog"),
            ("DB_USER", "sync"),
            ("DB_PASSWORD", "hunter2"),
        ]))
        .expect("overrides should apply");

    assert_eq!(config.qdrant.url.as_deref(), Some("http://from-env:6333"));
    assert_eq!(config.qdrant.api_key.as_deref(), Some("env-key"));
    assert_eq!(config.database.host, "db.internal");
    assert_eq!(config.database.port, 6543);
    assert_eq!(config.database.name, "catalog");
    assert_eq!(config.database.user, "sync");
    assert_eq!(config.database.password.as_deref(), Some("hunter2"));
}

#[test]
fn blank_env_values_are_ignored() {
    let mut config = Config::default();
    config.qdrant.url = Some("http://from-file:6333".to_string());
    config
        .apply_env_overrides(env(&[("QDRANT_API_URL", ""), ("QDRANT_API_KEY", " ")]))
        .expect("overrides should apply");
    assert_eq!(config.qdrant.url.as_deref(), Some("http://from-file:6333"));
    assert_eq!(config.qdrant.api_key, None);
}

#[test]
fn invalid_port_override_is_rejected() {
    let mut config = Config::default();
    let error = config
        .apply_env_overrides(env(&[("DB_PORT", "postgres")]))
        .expect_err("non-numeric port");
    assert!(matches!(
        error,
        ConfigError::InvalidEnvValue {
            name: "DB_PORT",
            ..
        }
    ));
}

#[test]
fn load_with_env_applies_overrides_before_validation() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::load_with_env(
        temp_dir.path(),
        env(&[("DATABASE_URL", "postgres://sync@db/catalog")]),
    )
    .expect("should load");
    assert_eq!(
        config.database.url.as_deref(),
        Some("postgres://sync@db/catalog")
    );

    let result = Config::load_with_env(temp_dir.path(), env(&[("QDRANT_API_URL", "nope")]));
    assert!(result.is_err());
}

#[test]
fn duplicate_tables_are_rejected() {
    let table = TableConfig {
        name: "orders".to_string(),
        primary_key: None,
        text_fields: Vec::new(),
    };
    let config = Config {
        tables: vec![table.clone(), table],
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::DuplicateTable(name)) if name == "orders"
    ));
}

#[test]
fn error_display_messages() {
    let errors = vec![
        ConfigError::MissingVectorStoreUrl,
        ConfigError::InvalidProtocol("ftp".to_string()),
        ConfigError::InvalidPort(0),
        ConfigError::InvalidBatchSize(0),
        ConfigError::InvalidUrl("invalid-url".to_string()),
    ];

    for error in errors {
        let message = format!("{error}");
        assert!(message.len() > 10);
    }
}
