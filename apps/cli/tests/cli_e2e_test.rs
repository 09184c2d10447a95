//! End-to-end tests: init, prepare, train, evaluate, infer, reset and the
//! backup commands against a mock backup service.

use assert_cmd::Command;
use mockito::Matcher;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn dmt(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dmt").unwrap();
    cmd.current_dir(temp.path())
        .env("HOME", temp.path())
        .env("NO_COLOR", "1")
        .env_remove("DMT_API_KEY")
        .env_remove("DMT_BASE_URL")
        .env_remove("DMT_DATA_DIR")
        .arg("--data-dir")
        .arg(temp.path().join("data"));
    cmd
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.arg("--json").assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

/// 100 housing-shaped rows.
fn write_dataset(path: &Path) {
    let rows: Vec<String> = (0..100)
        .map(|i| {
            let mut row: Vec<String> = (0..13)
                .map(|c| match c {
                    3 => format!("{}", i % 2),
                    8 => format!("{}", i % 5 + 1),
                    _ => format!("{}.5", (i * 3 + c * 7) % 29),
                })
                .collect();
            row.push(format!("{}", 15 + i % 20));
            row.join("  ")
        })
        .collect();
    std::fs::write(path, rows.join("\n")).unwrap();
}

fn initialized() -> TempDir {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("housing.data");
    write_dataset(&source);
    dmt(&temp).arg("init").arg("--dataset").arg(&source).assert().success();
    temp
}

#[test]
fn test_prepare_reports_split() {
    let temp = initialized();

    let data = json_output(dmt(&temp).args(["prepare", "--seed", "4"]));
    assert_eq!(data["records"], 100);
    assert_eq!(data["train"], 80);
    assert_eq!(data["test"], 20);
    assert_eq!(data["proportions"], "Train / Test: 80%(80) / 20%(20)");

    let data = json_output(dmt(&temp).args(["prepare", "--train-percentage", "0.7"]));
    assert_eq!(data["train"], 70);

    dmt(&temp)
        .args(["prepare", "--train-percentage", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("train percentage"));
}

#[test]
fn test_train_evaluate_infer_reset() {
    let temp = initialized();

    let report = json_output(dmt(&temp).args(["train", "--epochs", "20", "--seed", "9"]));
    assert_eq!(report["trainings_count"], 1);
    assert_eq!(report["summary"]["metrics"]["epochs_completed"], 20);
    assert_eq!(report["metrics"]["samples"], 20);
    let mae_baseline = report["metrics"]["mae_baseline"].as_f64().unwrap();
    let mae_retrained = report["metrics"]["mae_retrained"].as_f64().unwrap();
    assert!(mae_retrained < mae_baseline);

    // same seed, same test fold
    let metrics = json_output(dmt(&temp).args(["evaluate", "--seed", "9"]));
    assert!((metrics["mae_retrained"].as_f64().unwrap() - mae_retrained).abs() < 1e-6);

    let item = json_output(dmt(&temp).args(["infer", "3", "--seed", "9"]));
    assert_eq!(item["sample"], 3);
    assert_eq!(item["baseline_prediction"], 0.0);

    dmt(&temp)
        .args(["infer", "21", "--seed", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));

    let settings = json_output(dmt(&temp).args(["settings", "show"]));
    assert!(settings["final_loss_of_last_training"].as_f64().is_some());

    dmt(&temp).arg("reset").assert().success().stdout(predicate::str::contains("Model reset"));
    let metrics = json_output(dmt(&temp).args(["evaluate", "--seed", "9"]));
    assert_eq!(metrics["mae_baseline"], metrics["mae_retrained"]);
}

#[test]
fn test_train_prints_activity_log() {
    let temp = initialized();

    dmt(&temp)
        .args(["train", "--epochs", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Training starting:"))
        .stdout(predicate::str::contains("Training is done!"))
        .stdout(predicate::str::contains("Training complete"))
        .stdout(predicate::str::contains("RMSE"));
}

#[test]
fn test_backup_without_service_fails() {
    let temp = initialized();

    dmt(&temp)
        .arg("backup")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no backup service configured"));
}

#[test]
fn test_backup_and_rename_against_service() {
    let temp = initialized();
    let model_id = json_output(dmt(&temp).args(["settings", "show"]))["model_id"].as_str().unwrap().to_string();

    let mut server = mockito::Server::new();
    let backup = server
        .mock("POST", "/backupModel")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("apiKey".into(), "k".into()),
            Matcher::UrlEncoded("modelId".into(), model_id.clone()),
        ]))
        .with_status(201)
        .create();
    let rename = server
        .mock("PUT", "/changeModelId")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("oldId".into(), model_id.clone()),
            Matcher::UrlEncoded("newId".into(), "kitchen".into()),
        ]))
        .with_status(200)
        .create();

    let remote = |cmd: &mut Command| {
        cmd.env("DMT_BASE_URL", server.url()).env("DMT_API_KEY", "k");
    };

    let mut cmd = dmt(&temp);
    remote(&mut cmd);
    cmd.arg("backup").assert().success().stdout(predicate::str::contains("Model backed up"));
    backup.assert();

    let mut cmd = dmt(&temp);
    remote(&mut cmd);
    let renamed = json_output(cmd.args(["rename", "kitchen"]));
    assert_eq!(renamed["old_id"], model_id.as_str());
    assert_eq!(renamed["model_id"], "kitchen");
    rename.assert();

    let settings = json_output(dmt(&temp).args(["settings", "show"]));
    assert_eq!(settings["model_id"], "kitchen");
}

#[test]
fn test_restore_missing_model() {
    let temp = initialized();
    let mut server = mockito::Server::new();
    let restore = server.mock("GET", "/restoreModel").match_query(Matcher::Any).with_status(404).create();

    let mut cmd = dmt(&temp);
    cmd.env("DMT_BASE_URL", server.url())
        .env("DMT_API_KEY", "k")
        .args(["restore", "nobody"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No backup found for model id 'nobody'"));
    restore.assert();
}

#[test]
fn test_rename_rejects_empty_id() {
    let temp = initialized();

    dmt(&temp).args(["rename", " "]).assert().failure().stderr(predicate::str::contains("invalid model id"));
}
