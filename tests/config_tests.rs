// Config loading and validation tests

use hwsnap::config::AppConfig;

const VALID_CONFIG: &str = r#"
[gather]
interval_secs = 30
gpu_interval_secs = 3

[spd]
report_path = "/var/lib/hwsnap/LibreHardwareMonitorReport.json"
decode_dimms_path = "/tmp/decode-dimms.txt"
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.gather.interval_secs, 30);
    assert_eq!(config.gather.gpu_interval_secs, 3);
    assert_eq!(
        config.spd.report_path.as_deref(),
        Some(std::path::Path::new(
            "/var/lib/hwsnap/LibreHardwareMonitorReport.json"
        ))
    );
    assert_eq!(
        config.spd.decode_dimms_path.as_deref(),
        Some(std::path::Path::new("/tmp/decode-dimms.txt"))
    );
}

#[test]
fn test_empty_config_falls_back_to_defaults() {
    let config = AppConfig::load_from_str("").expect("empty config");
    assert_eq!(config.gather.interval_secs, 60);
    assert_eq!(config.gather.gpu_interval_secs, 5);
    assert!(config.spd.report_path.is_none());
    assert!(config.spd.decode_dimms_path.is_none());
}

#[test]
fn test_partial_config_fills_missing_sections() {
    let config = AppConfig::load_from_str("[gather]\ninterval_secs = 10\n").unwrap();
    assert_eq!(config.gather.interval_secs, 10);
    assert_eq!(config.gather.gpu_interval_secs, 5);
    assert!(config.spd.report_path.is_none());
}

#[test]
fn test_config_validation_rejects_zero_interval() {
    let bad = VALID_CONFIG.replace("interval_secs = 30", "interval_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("gather.interval_secs"));
}

#[test]
fn test_config_validation_rejects_zero_gpu_interval() {
    let bad = VALID_CONFIG.replace("gpu_interval_secs = 3", "gpu_interval_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("gather.gpu_interval_secs"));
}

#[test]
fn test_env_report_path_is_not_a_file_setting() {
    // The env-derived search path is attached by the binary at startup,
    // never parsed out of the config file.
    let sneaky = format!("{}env_report_path = \"/somewhere\"\n", VALID_CONFIG);
    let config = AppConfig::load_from_str(&sneaky).expect("unknown keys are ignored");
    assert!(config.spd.env_report_path.is_none());
}

#[test]
fn test_missing_explicit_config_file_is_an_error() {
    let err = AppConfig::load(Some(std::path::Path::new("/nonexistent/config.toml"))).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/config.toml"));
}
