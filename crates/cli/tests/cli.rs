use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Telex</title>
    <link>https://telex.hu</link>
    <description>Hírek</description>
    <item>
      <title>Elfogadta a parlament a költségvetést</title>
      <link>https://telex.hu/belfold/2026/10/16/koltsegvetes</link>
    </item>
    <item>
      <title>Esőre számíthatunk a hétvégén</title>
      <link>https://telex.hu/idojaras/2026/10/16/eso</link>
    </item>
  </channel>
</rss>"#;

/// Offline config with the given feed sources inlined
fn write_config(dir: &TempDir, feeds: &str) -> PathBuf {
    let db_path = dir.path().join("data").join("seen.db");
    let content = format!(
        r#"[general]
state_db_path = "{}"

[pipeline]
publish_delay_secs = 0

[translator]
provider = "stub"

[llm]
provider = "none"

[feeds]
timeout_secs = 5
{}
"#,
        db_path.display(),
        feeds
    );
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, content).expect("write config");
    config_path
}

fn check_url(config_path: &Path, url: &str) -> Value {
    let output = cargo_bin_cmd!("news-relay")
        .arg("--config")
        .arg(config_path)
        .args(["history", "check", "--url", url, "--json"])
        .output()
        .expect("run history check");
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("valid json")
}

#[test]
fn config_init_writes_example_file() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");

    cargo_bin_cmd!("news-relay")
        .args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));

    let content = fs::read_to_string(&config_path).expect("read config");
    assert!(content.contains("[telegram]"));
    assert!(content.contains("poll_interval_secs = 1800"));
}

#[test]
fn config_init_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "# mine\n").expect("write config");

    cargo_bin_cmd!("news-relay")
        .args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), "# mine\n");

    cargo_bin_cmd!("news-relay")
        .args(["config", "init", "--force", "--path"])
        .arg(&config_path)
        .assert()
        .success();
    assert!(fs::read_to_string(&config_path).unwrap().contains("[pipeline]"));
}

#[test]
fn translate_outputs_valid_json() {
    let dir = TempDir::new().expect("temp dir");

    let output = cargo_bin_cmd!("news-relay")
        .current_dir(dir.path())
        .env("NEWS_RELAY__TRANSLATOR__PROVIDER", "stub")
        .env("NEWS_RELAY__LLM__PROVIDER", "none")
        .args([
            "translate",
            "--text",
            "Elfogadta a parlament a költségvetést",
            "--json",
        ])
        .output()
        .expect("run translate");

    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["translation"], "Elfogadta a parlament a költségvetést");
    assert_eq!(value["source_lang"], "HU");
    assert_eq!(value["target_lang"], "RU");
    assert_eq!(value["tags"], serde_json::json!([]));
}

#[test]
fn translate_rejects_unknown_provider() {
    let dir = TempDir::new().expect("temp dir");

    cargo_bin_cmd!("news-relay")
        .current_dir(dir.path())
        .env("NEWS_RELAY__TRANSLATOR__PROVIDER", "babelfish")
        .args(["translate", "--text", "Szia"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown translator provider"));
}

#[test]
fn history_check_reports_unseen_url() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = write_config(&dir, "sources = []");

    let value = check_url(&config_path, "https://telex.hu/nothing");
    assert_eq!(value["seen"], false);
    assert!(value.get("record").is_none());
}

#[test]
fn dry_run_once_with_no_feeds_succeeds() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = write_config(&dir, "sources = []");

    cargo_bin_cmd!("news-relay")
        .arg("--config")
        .arg(&config_path)
        .args(["run", "--once", "--dry-run"])
        .assert()
        .success();
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = TempDir::new().expect("temp dir");

    cargo_bin_cmd!("news-relay")
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .args(["history", "stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn run_once_with_outbox_records_dispatches_and_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("temp dir");
    let feeds = format!(
        "\n[[feeds.sources]]\nname = \"Telex\"\nurl = \"{}/rss\"\n",
        server.uri()
    );
    let config_path = write_config(&dir, &feeds);
    let outbox = dir.path().join("outbox.jsonl");

    cargo_bin_cmd!("news-relay")
        .arg("--config")
        .arg(&config_path)
        .args(["run", "--once", "--outbox"])
        .arg(&outbox)
        .assert()
        .success();

    let lines: Vec<Value> = fs::read_to_string(&outbox)
        .expect("read outbox")
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json line"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["channel"], "primary");
    assert_eq!(lines[0]["source"], "Telex");

    let value = check_url(&config_path, "https://telex.hu/idojaras/2026/10/16/eso");
    assert_eq!(value["seen"], true);
    assert_eq!(value["record"]["title"], "Esőre számíthatunk a hétvégén");

    cargo_bin_cmd!("news-relay")
        .arg("--config")
        .arg(&config_path)
        .args(["history", "stats", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total\": 2"));
}
