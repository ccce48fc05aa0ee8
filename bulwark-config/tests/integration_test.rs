//! Integration tests for bulwark-config

use bulwark_alerts::AlertSeverity;
use bulwark_config::*;
use bulwark_logging::LogFormat;
use std::io::Write;
use std::time::Duration;
use temp_env::with_vars;

#[test]
fn test_default_config_validation() {
    let config = BulwarkConfig::default();
    assert!(config.validate_all().is_ok());

    assert_eq!(config.retry.initial_delay, Duration::from_secs(5));
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.retry.backoff_multiplier, 2.0);
    assert_eq!(config.circuit_breaker.failure_threshold, 3);
    assert_eq!(config.circuit_breaker.open_timeout, Duration::from_secs(60));
    assert_eq!(config.health.poll_interval, Duration::from_secs(30));
    assert_eq!(config.services.mode, ServiceMode::Simulated);
}

#[test]
fn test_config_loader_from_env() {
    let vars = vec![
        ("BULWARK_RETRY_MAX_ATTEMPTS", Some("5")),
        ("BULWARK_BREAKER_FAILURE_THRESHOLD", Some("4")),
        ("BULWARK_HEALTH_INTERVAL_SECONDS", Some("10")),
        ("BULWARK_LOG_LEVEL", Some("debug")),
        ("BULWARK_LOG_FORMAT", Some("compact")),
        ("BULWARK_WEBHOOK_URL", Some("https://hooks.example.com/ops")),
        ("BULWARK_TELEGRAM_BOT_TOKEN", Some("123:abc")),
        ("BULWARK_TELEGRAM_CHAT_ID", Some("-100200")),
    ];

    with_vars(vars, || {
        let config = ConfigLoader::new().from_env().unwrap();

        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.circuit_breaker.failure_threshold, 4);
        assert_eq!(config.health.poll_interval, Duration::from_secs(10));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Compact);

        let webhook = config.alerts.webhook.unwrap();
        assert_eq!(webhook.url, "https://hooks.example.com/ops");
        let telegram = config.alerts.telegram.unwrap();
        assert_eq!(telegram.bot_token, "123:abc");
        assert_eq!(telegram.chat_id, "-100200");
    });
}

#[test]
fn test_invalid_env_value_is_reported() {
    with_vars(vec![("BULWARK_RETRY_MAX_ATTEMPTS", Some("many"))], || {
        let err = ConfigLoader::new().from_env().unwrap_err();
        assert!(matches!(err, ConfigError::EnvError(_)));
        assert!(err.to_string().contains("BULWARK_RETRY_MAX_ATTEMPTS"));
    });
}

#[test]
fn test_half_configured_telegram_fails_validation() {
    with_vars(vec![("BULWARK_TELEGRAM_BOT_TOKEN", Some("123:abc"))], || {
        let err = ConfigLoader::new().from_env().unwrap_err();
        assert!(matches!(err, ConfigError::DomainError { ref domain, .. } if domain == "alerts"));
    });
}

#[test]
fn test_live_mode_from_env_requires_keys() {
    with_vars(vec![("BULWARK_SERVICE_MODE", Some("live"))], || {
        assert!(ConfigLoader::new().from_env().is_err());
    });

    with_vars(
        vec![
            ("BULWARK_SERVICE_MODE", Some("live")),
            ("BULWARK_SPEECH_API_KEY", Some("xi-key")),
            ("BULWARK_LLM_API_KEY", Some("sk-key")),
        ],
        || {
            let config = ConfigLoader::new().from_env().unwrap();
            assert_eq!(config.services.mode, ServiceMode::Live);
            assert_eq!(config.services.llm.api_key.as_deref(), Some("sk-key"));
        },
    );
}

#[test]
fn test_sample_round_trips() {
    let yaml = BulwarkConfig::generate_sample();
    assert!(yaml.contains("initial_delay: 5s"));
    assert!(yaml.contains("open_timeout: 1m"));

    let parsed: BulwarkConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, BulwarkConfig::default());
}

#[test]
fn test_load_from_file() {
    let yaml = r#"
retry:
  initial_delay: 2s
  max_attempts: 4
  backoff_multiplier: 1.5
  max_delay: 30s
circuit_breaker:
  failure_threshold: 5
  open_timeout: 2m
health:
  poll_interval: 15s
logging:
  level: warn
  event_log: /tmp/bulwark/events.jsonl
alerts:
  min_severity: high
  webhook:
    url: https://hooks.example.com/bulwark
    timeout: 5s
services:
  mode: simulated
"#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    with_vars(vec![("BULWARK_RETRY_MAX_ATTEMPTS", None::<&str>)], || {
        let config = ConfigLoader::new().load(Some(file.path())).unwrap();

        assert_eq!(config.retry.initial_delay, Duration::from_secs(2));
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.max_delay, Some(Duration::from_secs(30)));
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.circuit_breaker.open_timeout, Duration::from_secs(120));
        assert_eq!(config.circuit_breaker.half_open_required_successes, 1);
        assert_eq!(config.health.poll_interval, Duration::from_secs(15));
        assert_eq!(config.health.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.alerts.min_severity, AlertSeverity::High);
        assert_eq!(
            config.alerts.webhook.as_ref().map(|w| w.timeout),
            Some(Duration::from_secs(5))
        );
    });
}

#[test]
fn test_missing_file_is_read_error() {
    let err = ConfigLoader::new()
        .load(Some("/nonexistent/bulwark.yaml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::FileReadError(_)));
}

#[test]
fn test_invalid_file_value_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"retry:\n  max_attempts: 0\n").unwrap();

    with_vars(vec![("BULWARK_RETRY_MAX_ATTEMPTS", None::<&str>)], || {
        let err = ConfigLoader::new().from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    });
}

#[test]
fn test_email_alerts_from_env() {
    let vars = vec![
        ("BULWARK_SMTP_HOST", Some("smtp.example.com")),
        ("BULWARK_SMTP_PORT", Some("465")),
        ("BULWARK_SMTP_USERNAME", Some("alerts")),
        ("BULWARK_SMTP_PASSWORD", Some("hunter2")),
        ("BULWARK_ALERT_EMAIL_FROM", Some("alerts@example.com")),
        ("BULWARK_ALERT_EMAIL_TO", Some("ops@example.com, oncall@example.com")),
    ];

    with_vars(vars, || {
        let config = ConfigLoader::new().from_env().unwrap();
        let email = config.alerts.email.unwrap();
        assert_eq!(email.smtp_host, "smtp.example.com");
        assert_eq!(email.smtp_port, 465);
        assert_eq!(email.username.as_deref(), Some("alerts"));
        assert_eq!(email.from, "alerts@example.com");
        assert_eq!(email.to, vec!["ops@example.com", "oncall@example.com"]);
    });

    // A host without recipients fails validation
    with_vars(
        vec![
            ("BULWARK_SMTP_HOST", Some("smtp.example.com")),
            ("BULWARK_ALERT_EMAIL_FROM", Some("alerts@example.com")),
        ],
        || {
            let err = ConfigLoader::new().from_env().unwrap_err();
            assert!(err.to_string().contains("email.to"));
        },
    );
}
