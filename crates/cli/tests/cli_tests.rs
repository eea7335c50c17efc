//! CLI integration tests

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

/// Run the built binary with an isolated home directory and no SKUQ_ variables
fn skuq(home: &Path, args: &[&str], envs: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_skuq"));
    command.args(args).env("HOME", home).env("NO_COLOR", "1");
    for (key, _) in std::env::vars() {
        if key.starts_with("SKUQ_") {
            command.env_remove(key);
        }
    }
    for (key, value) in envs {
        command.env(key, value);
    }
    command.output().expect("Failed to execute command")
}

fn records_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let home = tempfile::tempdir().unwrap();
    let output = skuq(home.path(), &["--help"], &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("quote"), "Should show quote command");
    assert!(stdout.contains("match"), "Should show match command");
    assert!(stdout.contains("classify"), "Should show classify command");
    assert!(stdout.contains("catalog"), "Should show catalog command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let home = tempfile::tempdir().unwrap();
    let output = skuq(home.path(), &["--version"], &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("skuq"), "Should show binary name");
}

/// Test quote command help
#[test]
fn test_quote_help() {
    let home = tempfile::tempdir().unwrap();
    let output = skuq(home.path(), &["quote", "--help"], &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Quote help should succeed");
    assert!(stdout.contains("--input"), "Should show input option");
    assert!(stdout.contains("--catalog-only"), "Should show catalog-only option");
    assert!(stdout.contains("--term"), "Should show term option");
}

/// Test offline catalog match as JSON
#[test]
fn test_match_json() {
    let home = tempfile::tempdir().unwrap();
    let output = skuq(
        home.path(),
        &["match", "--cpu", "16", "--memory", "64", "--format", "json"],
        &[],
    );

    assert!(output.status.success(), "Match should succeed");
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["sku"], "ecs.g6.4xlarge");
    assert_eq!(report["tier"], "exact");
}

/// Test nearest match reports its distance
#[test]
fn test_match_nearest() {
    let home = tempfile::tempdir().unwrap();
    let output = skuq(
        home.path(),
        &["match", "--cpu", "17", "--memory", "70", "-f", "json"],
        &[],
    );

    assert!(output.status.success(), "Match should succeed");
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["sku"], "ecs.g6.4xlarge");
    assert_eq!(report["tier"], "nearest");
    assert_eq!(report["distance"], 7.0);
}

/// Test SKU classification
#[test]
fn test_classify_json() {
    let home = tempfile::tempdir().unwrap();
    let output = skuq(
        home.path(),
        &["classify", "ecs.g9i.4xlarge", "ecs.g6.large", "--format", "json"],
        &[],
    );

    assert!(output.status.success(), "Classify should succeed");
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows[0]["disk_category"], "cloud_essd");
    assert_eq!(rows[1]["disk_category"], "cloud_efficiency");
}

/// Test catalog listing
#[test]
fn test_catalog_table() {
    let home = tempfile::tempdir().unwrap();
    let output = skuq(home.path(), &["catalog"], &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Catalog should succeed");
    assert!(stdout.contains("ecs.r6.8xlarge"));
    assert!(stdout.contains("Default SKU: ecs.g6.large"));
}

/// Test that quoting without a pricing endpoint fails with a clear message
#[test]
fn test_quote_without_pricing_endpoint() {
    let home = tempfile::tempdir().unwrap();
    let input = records_file("[]");
    let output = skuq(
        home.path(),
        &["quote", "--input", input.path().to_str().unwrap()],
        &[],
    );
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Quote should fail");
    assert!(stderr.contains("pricing_endpoint"), "Should name the missing setting");
}

/// Test a full catalog-only quote against a mock pricing service
#[test]
fn test_quote_catalog_only_against_mock_pricing() {
    let mut server = mockito::Server::new();
    let pricing = server
        .mock("POST", "/price")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"amount": "1932.00"}"#)
        .expect(2)
        .create();

    let home = tempfile::tempdir().unwrap();
    let input = records_file(
        r#"[
            {"source_ref": "row-1", "requirement": {"cpu_cores": 16, "memory_gb": 64}},
            {"source_ref": "row-2", "requirement": {"cpu_cores": 8, "memory_gb": 32}, "product_label": "PolarDB"},
            {"source_ref": "row-3", "requirement": {"cpu_cores": 17, "memory_gb": 70}}
        ]"#,
    );
    let ledger_path = home.path().join("ledger.json");

    let output = skuq(
        home.path(),
        &[
            "quote",
            "--input",
            input.path().to_str().unwrap(),
            "--output",
            ledger_path.to_str().unwrap(),
            "--catalog-only",
            "--format",
            "json",
        ],
        &[("SKUQ_PRICING_ENDPOINT", &server.url())],
    );

    assert!(
        output.status.success(),
        "Quote should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    pricing.assert();

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = &report["ledger"]["entries"];
    assert_eq!(entries[0]["sku"], "ecs.g6.4xlarge");
    assert_eq!(entries[0]["status"], "success");
    assert_eq!(entries[1]["status"], "skipped");
    assert_eq!(entries[2]["status"], "success");
    assert_eq!(report["summary"]["succeeded"], 2);
    assert_eq!(report["summary"]["skipped"], 1);

    let written = std::fs::read_to_string(&ledger_path).unwrap();
    assert!(written.contains("skipped non-target product (polardb)"));
}

/// Test configuration is read from the config file under HOME
#[test]
fn test_config_file_in_home() {
    let home = tempfile::tempdir().unwrap();
    let config_dir = home.path().join(".config").join("skuq");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        "concurrency = 0\n",
    )
    .unwrap();

    let output = skuq(home.path(), &["catalog"], &[]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Invalid config should be reported");
    assert!(stderr.contains("concurrency"));
}

/// Test the remote recommendation path: only target rows reach the service
#[test]
fn test_quote_through_recommendation_service() {
    let mut server = mockito::Server::new();
    let recommend = server
        .mock("POST", "/recommend")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"instance_types": ["ecs.g9i.4xlarge", "ecs.g9i.8xlarge"]}"#)
        .expect(1)
        .create();
    let pricing = server
        .mock("POST", "/price")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"amount": "12000"}"#)
        .expect(1)
        .create();

    let home = tempfile::tempdir().unwrap();
    let input = records_file(
        r#"[
            {"source_ref": "row-1", "requirement": {"cpu_cores": 16, "memory_gb": 64}},
            {"source_ref": "row-2", "requirement": {"cpu_cores": 4, "memory_gb": 8}, "product_label": "ApsaraDB RDS"}
        ]"#,
    );

    let output = skuq(
        home.path(),
        &[
            "quote",
            "--input",
            input.path().to_str().unwrap(),
            "--term",
            "annual",
            "--format",
            "json",
        ],
        &[
            ("SKUQ_RECOMMEND_ENDPOINT", &server.url()),
            ("SKUQ_PRICING_ENDPOINT", &server.url()),
        ],
    );

    assert!(
        output.status.success(),
        "Quote should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    recommend.assert();
    pricing.assert();

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = &report["ledger"]["entries"];
    assert_eq!(entries[0]["status"], "success");
    assert_eq!(entries[0]["sku"], "ecs.g9i.4xlarge");
    assert_eq!(entries[0]["monthly_price"], "1000.00");
    assert_eq!(entries[1]["status"], "skipped");
    assert!(entries[1]["sku"].is_null());
}

/// Test that an exhausted recommendation service never falls back to the catalog
#[test]
fn test_quote_recommendation_exhausted() {
    let mut server = mockito::Server::new();
    let recommend = server
        .mock("POST", "/recommend")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"instance_types": []}"#)
        .expect(3)
        .create();
    let pricing = server.mock("POST", "/price").expect(0).create();

    let home = tempfile::tempdir().unwrap();
    let input = records_file(
        r#"[{"source_ref": "row-1", "requirement": {"cpu_cores": 16, "memory_gb": 64}}]"#,
    );

    let output = skuq(
        home.path(),
        &["quote", "--input", input.path().to_str().unwrap(), "-f", "json"],
        &[
            ("SKUQ_RECOMMEND_ENDPOINT", &server.url()),
            ("SKUQ_PRICING_ENDPOINT", &server.url()),
        ],
    );

    assert!(output.status.success());
    recommend.assert();
    pricing.assert();

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entry = &report["ledger"]["entries"][0];
    assert_eq!(entry["status"], "failed");
    assert_eq!(entry["error_kind"], "recommendation_exhausted");
    assert!(entry["sku"].is_null());
    assert!(entry["monthly_price"].is_null());
    assert_eq!(report["summary"]["failed"], 1);
}
