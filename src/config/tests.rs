use std::collections::HashMap;

use super::*;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr, "0.0.0.0:3000".parse().expect("addr"));
    assert_eq!(settings.server.graceful_shutdown, Duration::from_secs(30));
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.store.url, "redis://localhost:6379");
    assert_eq!(settings.store.max_idle.get(), 3);
    assert_eq!(settings.store.idle_timeout, Duration::from_secs(240));
    assert_eq!(settings.store.connect_attempts.get(), 5);
    assert_eq!(settings.store.connect_retry_delay, Duration::from_secs(1));
    assert_eq!(settings.scorer.command, PathBuf::from("./get_score.rb"));
    assert_eq!(settings.scorer.timeout, Duration::from_secs(60));
    assert_eq!(
        settings.badge.template_path,
        PathBuf::from("templates/score.svg")
    );
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.store.url = Some("redis://from-file:6379".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        store: StoreOverrides {
            store_url: Some("redis://from-cli:6379".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.store.url, "redis://from-cli:6379");
}

#[test]
fn redis_url_is_preferred_over_rediscloud_url() {
    let mut raw = RawSettings::default();
    raw.apply_legacy_env(env(&[
        ("REDIS_URL", "redis://primary:6379"),
        ("REDISCLOUD_URL", "redis://cloud:6379"),
    ]));

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.store.url, "redis://primary:6379");
}

#[test]
fn rediscloud_url_is_used_when_redis_url_is_blank() {
    let mut raw = RawSettings::default();
    raw.apply_legacy_env(env(&[
        ("REDIS_URL", "  "),
        ("REDISCLOUD_URL", "redis://cloud:6379"),
    ]));

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.store.url, "redis://cloud:6379");
}

#[test]
fn configured_store_url_beats_legacy_variables() {
    let mut raw = RawSettings::default();
    raw.store.url = Some("redis://configured:6379".to_string());
    raw.apply_legacy_env(env(&[("REDIS_URL", "redis://primary:6379")]));

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.store.url, "redis://configured:6379");
}

#[test]
fn port_variable_sets_listener_port() {
    let mut raw = RawSettings::default();
    raw.apply_legacy_env(env(&[("PORT", "8080")]));

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.server.addr.port(), 8080);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_values_are_rejected_with_their_key() {
    let mut raw = RawSettings::default();
    raw.store.max_idle = Some(0);
    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "store.max_idle"),
        other => panic!("unexpected result: {other:?}"),
    }

    let mut raw = RawSettings::default();
    raw.scorer.timeout_seconds = Some(0);
    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "scorer.timeout_seconds"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "logging.level",
            ..
        })
    ));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["score-api"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "score-api",
        "serve",
        "--server-host",
        "127.0.0.1",
        "--store-url",
        "memory://",
        "--scorer-command",
        "/usr/local/bin/score",
        "--scorer-timeout-seconds",
        "5",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("127.0.0.1"));
            assert_eq!(serve.overrides.store.store_url.as_deref(), Some("memory://"));
            assert_eq!(
                serve.overrides.scorer.scorer_command,
                Some(PathBuf::from("/usr/local/bin/score"))
            );
            assert_eq!(serve.overrides.scorer.scorer_timeout_seconds, Some(5));
        }
    }
}
