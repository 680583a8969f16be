use alto_reconcile::config::ReconcileConfig;
use alto_reconcile::error::ReconcileError;
use std::io::Write;
use tempfile::NamedTempFile;

fn config_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(json.as_bytes()).expect("Failed to write config");
    file
}

#[test]
fn missing_fields_fall_back_to_defaults() {
    let file = config_file(r#"{ "consecutive_bad_word_threshold": 5 }"#);
    let config = ReconcileConfig::load_from_file(file.path()).unwrap();

    assert_eq!(config.consecutive_bad_word_threshold, 5);
    assert_eq!(config.context_chars, 20);
    assert!(!config.strict);
}

#[test]
fn default_config_matches_empty_file() {
    let file = config_file("{}");
    assert_eq!(
        ReconcileConfig::load_from_file(file.path()).unwrap(),
        ReconcileConfig::default()
    );
    assert_eq!(ReconcileConfig::default().consecutive_bad_word_threshold, 2);
}

#[test]
fn zero_threshold_is_rejected() {
    let file = config_file(r#"{ "consecutive_bad_word_threshold": 0 }"#);
    assert!(matches!(
        ReconcileConfig::load_from_file(file.path()),
        Err(ReconcileError::Config(_))
    ));
}

#[test]
fn unreadable_or_malformed_files_are_config_errors() {
    let file = config_file("{ not json");
    assert!(matches!(
        ReconcileConfig::load_from_file(file.path()),
        Err(ReconcileError::Config(_))
    ));

    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ReconcileConfig::load_from_file(dir.path().join("missing.json")),
        Err(ReconcileError::Config(_))
    ));
}
