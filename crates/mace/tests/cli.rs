//! Drives the `mace` binary end to end.

use std::process::Command;

use mace_models::signal_schema::SignalRow;
use mace_store::SqliteSignalStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn mace() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mace"))
}

fn run_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn decimal(value: &serde_json::Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

#[test]
fn plan_with_defaults_when_config_missing() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("absent.toml");

    let audit = run_json(mace().args(["--config", config.to_str().unwrap(), "plan"]));

    // All eleven agents estimate to 1.36 against the 1.00 default ceiling.
    assert_eq!(audit["optimizationApplied"], true);
    assert_eq!(audit["maxCost"], "1.00");
    assert!(audit["skippedAgentCount"].as_u64().unwrap() > 0);
}

#[test]
fn plan_for_selected_agents() {
    let audit = run_json(mace().args([
        "--config",
        "does-not-exist.toml",
        "plan",
        "--agents",
        "momentum,risk_assessment",
    ]));

    assert_eq!(audit["selectedAgentCount"], 2);
    assert_eq!(decimal(&audit["estimatedCost"]), dec!(0.22));
    assert_eq!(audit["optimizationApplied"], false);
}

#[test]
fn memory_reads_configured_store() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("signals.db");
    let writer = SqliteSignalStore::open_writable(db.to_str().unwrap()).unwrap();
    writer
        .insert(&SignalRow {
            agent_name: "momentum".to_string(),
            market_id: "mkt-1".to_string(),
            direction: Some("YES".to_string()),
            fair_probability: Some(0.55),
            confidence: Some(0.6),
            key_drivers: Some(serde_json::json!(["breakout"])),
            metadata: None,
            created_at: Some("2026-02-01T09:30:00Z".to_string()),
        })
        .unwrap();

    let config = dir.path().join("mace.toml");
    std::fs::write(
        &config,
        format!("[store]\nsqlite_path = {:?}\n", db.to_str().unwrap()),
    )
    .unwrap();

    let out = run_json(mace().args([
        "--config",
        config.to_str().unwrap(),
        "memory",
        "--market",
        "mkt-1",
        "--agents",
        "momentum,breaking_news",
    ]));

    assert_eq!(out["memories"]["momentum"]["has_history"], true);
    assert_eq!(out["memories"]["momentum"]["signals"][0]["key_drivers"][0], "breakout");
    assert_eq!(out["memories"]["breaking_news"]["has_history"], false);
    assert_eq!(out["retrievals"].as_array().unwrap().len(), 2);
}

#[test]
fn costs_from_usage_params() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("usage.json");
    std::fs::write(
        &input,
        r#"[
            {"provider":"nova","modelName":"amazon.nova-lite-v1:0","inputTokens":2000,"outputTokens":500},
            {"provider":"openai","modelName":"gpt-4","inputTokens":1000,"outputTokens":1000}
        ]"#,
    )
    .unwrap();

    let out = run_json(mace().args([
        "--config",
        "does-not-exist.toml",
        "costs",
        "--input",
        input.to_str().unwrap(),
    ]));

    assert_eq!(out["invocations"], 2);
    assert_eq!(decimal(&out["total_cost"]), dec!(0.09024));
    assert_eq!(decimal(&out["by_provider"]["nova"]["total_cost"]), dec!(0.00024));
    assert_eq!(out["nova"]["by_variant"]["lite"]["invocations"], 1);
}

#[test]
fn unknown_nova_model_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("usage.json");
    std::fs::write(
        &input,
        r#"[{"provider":"nova","modelName":"amazon.nova-ultra","inputTokens":1,"outputTokens":1}]"#,
    )
    .unwrap();

    let output = mace()
        .args(["costs", "--input", input.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
