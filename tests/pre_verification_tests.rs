use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

#[test]
fn test_token_rescues_only_matching_customer_and_amount() {
    let mut rows = common::warm_up_rows("alice", 3);
    rows.extend(common::warm_up_rows("bob", 3));
    rows.push("preverify, , alice, , 500, , , , ".to_string());
    rows.push("authorize, a1, alice, merch_1, 500.00, , , , 2026-05-04T12:00:00Z".to_string());
    rows.push("authorize, b1, bob, merch_1, 500, , , , 2026-05-04T12:00:00Z".to_string());
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    let file = common::requests_file(&rows);

    let mut cmd = Command::new(cargo_bin!("preverify"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("a1,pre_verified,true,50.0,high,500,true"))
        .stdout(predicate::str::contains("b1,declined,false,50.0,high,0,true"));
}

#[test]
fn test_low_risk_needs_no_token() {
    let file = common::requests_file(&[
        "authorize, t1, carol, merch_1, 499.99, 10001, 10002, , 2026-05-04T12:00:00Z",
    ]);

    let mut cmd = Command::new(cargo_bin!("preverify"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("t1,approved,true,20.0,low,0,true"));
}

#[test]
fn test_report_contains_merchant_analytics() {
    let mut rows = common::warm_up_rows("dave", 3);
    rows.push("preverify, , dave, , 500, , , , ".to_string());
    rows.push("authorize, d1, dave, merch_1, 500, , , , 2026-05-04T12:00:00Z".to_string());
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    let file = common::requests_file(&rows);
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("report.json");

    let mut cmd = Command::new(cargo_bin!("preverify"));
    cmd.arg(file.path()).arg("--report").arg(&report_path);
    cmd.assert().success();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    let merchant = &report["merchants"][0];
    assert_eq!(merchant["merchant_id"], "merch_1");
    assert_eq!(merchant["total_transactions"], 4);
    assert_eq!(merchant["total_pre_verified"], 1);
    assert_eq!(merchant["revenue_saved"], "500");
    assert_eq!(merchant["approval_rate"], 100.0);
    assert_eq!(report["history"].as_array().unwrap().len(), 4);
    assert_eq!(report["history"][3]["response"]["status"], "pre_verified");
}
