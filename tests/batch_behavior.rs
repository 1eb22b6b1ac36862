//! Behavior-driven tests for directory discovery and the batch runner
//!
//! These tests lay out instrument folders on disk and check what a batch
//! run produces: which instruments are analyzed, which are skipped, and how
//! files map onto trading days.

use std::fs;
use std::path::Path;

use brokerflow_tests::{
    run_batch, scan_instrument, write_export, Cohort, CoreError, DiscoveryError, FlowConfig,
    TradingDate,
};
use tempfile::tempdir;

fn seed_instrument(base: &Path, code: &str) {
    write_export(
        &base.join(code).join("JAN25/02.csv"),
        "2025-01-02",
        &["AK\t1,000\t1,000,000,000\t1,000\t\t\t0\t0\t0"],
    );
    write_export(
        &base.join(code).join("JAN25/03.csv"),
        "2025-01-03",
        &[
            "AK\t2,500\t2,600,000,000\t1,040\t\t\t0\t0\t0",
            "YP\t0\t0\t0\t\t\t800\t820,000,000\t1,025",
        ],
    );
}

// =============================================================================
// Batch: instruments analyzed and skipped
// =============================================================================

#[test]
fn when_user_runs_a_batch_every_instrument_folder_is_reported() {
    // Given: Two populated instruments and one empty folder
    let temp = tempdir().expect("tempdir");
    seed_instrument(temp.path(), "TLKM");
    seed_instrument(temp.path(), "BBCA");
    fs::create_dir_all(temp.path().join("EMPTY")).expect("mkdir");

    // When: The batch runs over the base directory
    let outcome = run_batch(temp.path(), &[], &FlowConfig::default()).expect("batch");

    // Then: Populated instruments are reported in code order, the empty one is skipped
    let codes: Vec<&str> = outcome.report.stocks.keys().map(String::as_str).collect();
    assert_eq!(codes, ["BBCA", "TLKM"]);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].code, "EMPTY");
    assert_eq!(outcome.skipped[0].reason, "no snapshot files");

    let bbca = &outcome.report.stocks["BBCA"];
    assert_eq!(bbca.daily.len(), 2);
    assert_eq!(bbca.date_start, "2025-01-02");
    assert_eq!(bbca.date_end, "2025-01-03");
}

#[test]
fn parallel_batch_output_matches_single_instrument_runs() {
    // Given: Several identical instruments
    let temp = tempdir().expect("tempdir");
    for code in ["AAAA", "BBBB", "CCCC", "DDDD", "EEEE"] {
        seed_instrument(temp.path(), code);
    }

    // When: The full batch runs and each instrument also runs alone
    let config = FlowConfig::default();
    let batch = run_batch(temp.path(), &[], &config).expect("batch");

    // Then: The per-instrument documents are identical
    for (code, report) in &batch.report.stocks {
        let single = run_batch(temp.path(), &[code.clone()], &config).expect("single");
        let expected = serde_json::to_value(&single.report.stocks[code]).expect("serialize");
        let actual = serde_json::to_value(report).expect("serialize");
        assert_eq!(actual, expected, "{code}");
    }
}

#[test]
fn when_user_filters_instruments_unknown_codes_are_skipped() {
    // Given: One instrument on disk
    let temp = tempdir().expect("tempdir");
    seed_instrument(temp.path(), "BBCA");

    // When: The user asks for it in lower case plus a code that does not exist
    let only = vec!["bbca".to_owned(), "ZZZZ".to_owned()];
    let outcome = run_batch(temp.path(), &only, &FlowConfig::default()).expect("batch");

    // Then: The known instrument runs and the unknown code is reported
    assert!(outcome.report.stocks.contains_key("BBCA"));
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].code, "ZZZZ");
    assert_eq!(outcome.skipped[0].reason, "instrument folder not found");
}

#[test]
fn when_base_directory_is_missing_the_batch_fails_as_input_error() {
    // Given: A path that does not exist
    let temp = tempdir().expect("tempdir");

    // When: The batch runs against it
    let error = run_batch(&temp.path().join("missing"), &[], &FlowConfig::default())
        .expect_err("batch must fail");

    // Then: The error is a discovery input error
    assert!(matches!(
        error,
        CoreError::Discovery(DiscoveryError::MissingBaseDir { .. })
    ));
    assert!(error.is_input_error());
}

#[test]
fn generated_document_has_timestamp_and_stock_map() {
    // Given: One instrument
    let temp = tempdir().expect("tempdir");
    seed_instrument(temp.path(), "BBCA");

    // When: The batch document is serialized
    let outcome = run_batch(temp.path(), &[], &FlowConfig::default()).expect("batch");
    let value = serde_json::to_value(&outcome.report).expect("serialize");

    // Then: generated_at is "YYYY-MM-DD HH:MM:SS" and stocks is keyed by code
    let generated_at = value["generated_at"].as_str().expect("timestamp");
    assert_eq!(generated_at.len(), 19);
    assert_eq!(&generated_at[10..11], " ");
    assert_eq!(value["stocks"]["BBCA"]["code"], "BBCA");
}

// =============================================================================
// Discovery: files to trading days
// =============================================================================

#[test]
fn when_two_files_share_a_date_the_first_in_path_order_is_kept() {
    // Given: "JAN25/02.csv" and "JAN25/2.csv" both map to 2 January 2025
    let temp = tempdir().expect("tempdir");
    let dir = temp.path().join("BBCA");
    write_export(&dir.join("JAN25/02.csv"), "2025-01-02", &["AK\t1\t1\t1\t\t\t0\t0\t0"]);
    write_export(&dir.join("JAN25/2.csv"), "2025-01-02", &["AK\t9\t9\t9\t\t\t0\t0\t0"]);
    write_export(&dir.join("FEB25/03.csv"), "2025-02-03", &["AK\t2\t2\t2\t\t\t0\t0\t0"]);

    // When: The instrument folder is scanned
    let files = scan_instrument(&dir).expect("scan");

    // Then: One file per date survives, ordered by date
    let names: Vec<String> = files
        .iter()
        .map(|file| {
            file.path
                .strip_prefix(&dir)
                .expect("under instrument")
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    assert_eq!(names, ["JAN25/02.csv", "FEB25/03.csv"]);
    assert_eq!(files[1].date, TradingDate::from_calendar(2025, 2, 3).ok());
}

#[test]
fn files_in_unrecognised_folders_are_analyzed_last_with_unknown_dates() {
    // Given: A dated export and one in a folder with no month token
    let temp = tempdir().expect("tempdir");
    let dir = temp.path().join("BBCA");
    write_export(
        &dir.join("JAN25/02.csv"),
        "2025-01-02",
        &["AK\t1,000\t1,000,000,000\t1,000\t\t\t0\t0\t0"],
    );
    write_export(
        &dir.join("archive/05.csv"),
        "",
        &["AK\t1,500\t1,600,000,000\t1,010\t\t\t0\t0\t0"],
    );

    // When: The batch runs
    let outcome = run_batch(temp.path(), &[], &FlowConfig::default()).expect("batch");
    let value = serde_json::to_value(&outcome.report.stocks["BBCA"]).expect("serialize");

    // Then: The undated day comes last with "Unknown" dates
    assert_eq!(value["daily"][0]["date"], "2025-01-02");
    assert_eq!(value["daily"][1]["date"], "Unknown");
    assert_eq!(value["daily"][1]["date_end"], "Unknown");
    assert_eq!(value["date_end"], "Unknown");
}

// =============================================================================
// Configuration: cohort membership
// =============================================================================

#[test]
fn when_user_supplies_a_config_file_cohorts_follow_it() {
    // Given: A config that makes YP institutional and nothing else
    let temp = tempdir().expect("tempdir");
    seed_instrument(temp.path(), "BBCA");
    let config_path = temp.path().join("brokers.json");
    fs::write(&config_path, r#"{ "institutional_brokers": ["yp"] }"#).expect("write config");

    // When: The batch runs with that config
    let config = FlowConfig::load(&config_path).expect("load config");
    let outcome = run_batch(temp.path(), &[], &config).expect("batch");

    // Then: AK counts as retail and YP as institutional
    assert_eq!(config.cohort_of("AK"), Cohort::Retail);
    let brokers = &outcome.report.stocks["BBCA"].brokers;
    let yp = brokers.iter().find(|broker| broker.code == "YP").expect("YP");
    let ak = brokers.iter().find(|broker| broker.code == "AK").expect("AK");
    assert_eq!(yp.cohort, Cohort::Whale);
    assert_eq!(ak.cohort, Cohort::Retail);
    assert!(outcome.report.stocks["BBCA"].summary.net(Cohort::Whale) < 0.0);
}
