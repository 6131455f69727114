use std::{fs, time::Duration};

use mockito::Matcher;
use unleash::{ClientConfig, Error, FnStrategy, Parameters};

const FEATURES: &str = r#"{
    "version": 1,
    "features": [
        { "name": "featureX", "enabled": true, "strategy": "default", "parameters": {} },
        { "name": "featureY", "enabled": true, "strategy": "userWithId", "parameters": { "userIds": "42" } },
        { "name": "featureZ", "enabled": true, "strategy": "gradualRollout", "parameters": null }
    ]
}"#;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn fetches_toggles_and_writes_backup() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let backup_path = dir.path().join("unleash-repo.json");

    let mut server = mockito::Server::new();
    let first = server
        .mock("GET", "/api/client/features")
        .match_header("if-none-match", Matcher::Missing)
        .match_header("authorization", "client-token")
        .with_status(200)
        .with_header("etag", "\"abc:1\"")
        .with_body(FEATURES)
        .create();
    let _rest = server
        .mock("GET", "/api/client/features")
        .match_header("if-none-match", "\"abc:1\"")
        .with_status(304)
        .create();

    let client = ClientConfig::new(format!("{}/api/client/features", server.url()))
        .poll_interval(Duration::from_millis(20))
        .backup_path(&backup_path)
        .header("Authorization", "client-token")
        .strategy(FnStrategy::new("userWithId", |parameters: &Parameters| {
            parameters.get("userIds").map(String::as_str) == Some("42")
        }))
        .to_client()
        .unwrap();

    client.wait_for_first_fetch().unwrap();
    first.assert();

    assert!(client.is_enabled("featureX"));
    assert!(client.is_enabled("featureY"));
    // Nobody registered "gradualRollout".
    assert!(!client.is_enabled_or("featureZ", true));
    assert!(!client.is_enabled("missing"));
    assert!(client.is_enabled_or("missing", true));
    assert_eq!(client.toggle_names().len(), 3);

    let backup = fs::read_to_string(&backup_path).unwrap();
    assert!(backup.contains("featureX"));

    // Subsequent ticks are answered with 304 and keep serving the same toggles.
    std::thread::sleep(Duration::from_millis(100));
    assert!(client.is_enabled("featureX"));

    client.shutdown().unwrap();
}

#[test]
fn cold_start_from_backup_when_server_is_down() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let backup_path = dir.path().join("unleash-repo.json");
    fs::write(&backup_path, FEATURES).unwrap();

    let client = ClientConfig::new("http://127.0.0.1:1/api/client/features")
        .connect_timeout(Duration::from_secs(1))
        .backup_path(&backup_path)
        .to_client()
        .unwrap();

    // Served from backup before any fetch has finished.
    assert!(client.is_enabled("featureX"));

    assert!(matches!(
        client.wait_for_first_fetch(),
        Err(Error::Network(_))
    ));

    assert!(client.is_enabled("featureX"));
    assert_eq!(fs::read_to_string(&backup_path).unwrap(), FEATURES);

    client.shutdown().unwrap();
}

#[test]
fn corrupt_backup_and_server_down_serves_defaults() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let backup_path = dir.path().join("unleash-repo.json");
    fs::write(&backup_path, "{ definitely not json").unwrap();

    let client = ClientConfig::new("http://127.0.0.1:1/api/client/features")
        .connect_timeout(Duration::from_secs(1))
        .backup_path(&backup_path)
        .to_client()
        .unwrap();

    assert!(client.snapshot().is_empty());
    assert!(client.is_enabled_or("featureX", true));
    assert!(!client.is_enabled_or("featureX", false));

    client.shutdown().unwrap();
}

#[test]
fn recovers_after_server_errors() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();

    let mut server = mockito::Server::new();
    let failing = server
        .mock("GET", "/api/client/features")
        .with_status(503)
        .expect_at_least(1)
        .create();

    let client = ClientConfig::new(format!("{}/api/client/features", server.url()))
        .poll_interval(Duration::from_millis(10))
        .backup_path(dir.path().join("unleash-repo.json"))
        .to_client()
        .unwrap();

    assert!(matches!(
        client.wait_for_first_fetch(),
        Err(Error::UnexpectedStatus(_))
    ));
    failing.assert();
    failing.remove();

    let _ok = server
        .mock("GET", "/api/client/features")
        .with_status(200)
        .with_body(FEATURES)
        .create();

    let mut enabled = false;
    for _ in 0..500 {
        if client.is_enabled("featureX") {
            enabled = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(enabled, "toggles were not refreshed after the server recovered");

    client.shutdown().unwrap();
}
