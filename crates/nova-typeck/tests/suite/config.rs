use std::io::Write;

use nova_typeck::{json_schema, ConfigError, TypeckConfig};

use pretty_assertions::assert_eq;

#[test]
fn config_file_is_loaded_and_validated() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "release = 17\ninference_step_limit = 500\n\n[logging]\nlevel = \"debug\"\njson = true"
    )
    .unwrap();

    let config = TypeckConfig::load_from_path(file.path()).unwrap();
    assert_eq!(config.release, 17);
    assert_eq!(config.inference_step_limit, 500);
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
    assert!(config.var_enabled());
}

#[test]
fn missing_config_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typeck.toml");
    let err = TypeckConfig::load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("typeck.toml"));
}

#[test]
fn unknown_keys_and_bad_values_are_rejected() {
    assert!(matches!(
        TypeckConfig::load_from_str("relase = 11"),
        Err(ConfigError::Toml(_))
    ));
    assert!(matches!(
        TypeckConfig::load_from_str("release = 7"),
        Err(ConfigError::Invalid(_))
    ));
    assert!(matches!(
        TypeckConfig::load_from_str("inference_step_limit = 0"),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn json_schema_describes_every_setting() {
    let schema = serde_json::to_value(json_schema()).unwrap();
    let properties = schema["properties"].as_object().unwrap();
    for key in ["release", "var_inference", "inference_step_limit", "logging"] {
        assert!(properties.contains_key(key), "missing `{key}` in {schema:#}");
    }
    assert_eq!(schema["additionalProperties"], serde_json::json!(false));
}
