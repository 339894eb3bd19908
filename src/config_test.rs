use super::*;

const VARS: [&str; 10] = [
    "SKIRMISH_SERVER_URL",
    "SKIRMISH_BACKOFF_BASE_MS",
    "SKIRMISH_BACKOFF_CAP_MS",
    "SKIRMISH_LERP_FACTOR",
    "SKIRMISH_POSITION_EPSILON",
    "SKIRMISH_PROJECTILE_LIFETIME_MS",
    "SKIRMISH_AIM_RECENCY_MS",
    "SKIRMISH_NOTICE_TTL_MS",
    "SKIRMISH_STATUS_POLL_INTERVAL_MS",
    "SKIRMISH_FRAME_INTERVAL_MS",
];

/// # Safety
/// Only one test in this crate touches `SKIRMISH_*` variables.
unsafe fn clear_env() {
    for var in VARS {
        unsafe { std::env::remove_var(var) };
    }
}

#[test]
fn default_matches_documented_constants() {
    let cfg = SyncConfig::default();
    assert_eq!(cfg.backoff.base, Duration::from_millis(1000));
    assert_eq!(cfg.backoff.cap, Duration::from_millis(10_000));
    assert!((cfg.lerp_factor - 0.2).abs() < f64::EPSILON);
    assert!(cfg.validate().is_ok());
}

#[test]
fn validate_rejects_http_urls() {
    let cfg = SyncConfig { server_url: "http://localhost:3000".to_owned(), ..SyncConfig::default() };
    assert!(matches!(cfg.validate(), Err(ConfigError::InvalidServerUrl(_))));
}

#[test]
fn clamp_factor_rejects_non_positive_and_caps_at_one() {
    assert!((clamp_factor(0.0) - DEFAULT_LERP_FACTOR).abs() < f64::EPSILON);
    assert!((clamp_factor(f64::NAN) - DEFAULT_LERP_FACTOR).abs() < f64::EPSILON);
    assert!((clamp_factor(4.0) - 1.0).abs() < f64::EPSILON);
    assert!((clamp_factor(0.35) - 0.35).abs() < f64::EPSILON);
}

#[test]
fn from_env_reads_overrides_and_falls_back_on_garbage() {
    unsafe {
        clear_env();
        std::env::set_var("SKIRMISH_SERVER_URL", "wss://game.example.test/ws");
        std::env::set_var("SKIRMISH_BACKOFF_BASE_MS", "250");
        std::env::set_var("SKIRMISH_BACKOFF_CAP_MS", "100");
        std::env::set_var("SKIRMISH_LERP_FACTOR", "not-a-number");
        std::env::set_var("SKIRMISH_STATUS_POLL_INTERVAL_MS", " 2000 ");
    }

    let cfg = SyncConfig::from_env().unwrap();
    assert_eq!(cfg.server_url, "wss://game.example.test/ws");
    assert_eq!(cfg.backoff.base, Duration::from_millis(250));
    // The cap never sits below the base.
    assert_eq!(cfg.backoff.cap, Duration::from_millis(250));
    assert!((cfg.lerp_factor - DEFAULT_LERP_FACTOR).abs() < f64::EPSILON);
    assert_eq!(cfg.status_poll_interval_ms, 2000);
    assert_eq!(cfg.frame_interval_ms, DEFAULT_FRAME_INTERVAL_MS);

    unsafe { std::env::set_var("SKIRMISH_SERVER_URL", "tcp://nope") };
    assert!(SyncConfig::from_env().is_err());

    unsafe { clear_env() };
}
