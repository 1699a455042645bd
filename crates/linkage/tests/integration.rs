use std::collections::HashMap;

use refmerge_linkage::csv_table::{load_csv_table, select_output_columns, write_csv_table};
use refmerge_linkage::model::{LinkInput, MatchOutcome, Value};
use refmerge_linkage::{run, LinkConfig, NoopReporter};

const SIRCA_CSV: &str = "\
Gcode,CompanyTicker,FullCompanyName,MS_CompanyID,MS_SecurityID,join_key
g001,ACM,Acme Pty Ltd,AB,12,x
g002,BHP,BHP Group Limited,,,x
g003,,Unicorp,ZZ,99,x
g004,,,,,x
g005,,Unicorp,,,x
g006,QAN,Qantas Airways,CD,34,x
";

const SECREF_CSV: &str = "\
CompanyId,ShareClassId,ISIN,CUSIP,ActiveOrDelisted
AB,12,AU000001,C1,Active
CD,34,AU000002,C2,Delisted
AB,12,AU999999,C9,Active
";

const MASTER_CSV: &str = "\
ISIN,Symbol,CompanyName,ABN,TradingStatus
AU000002,QAN,Qantas Airways Limited,444,Delisted
AU000001,ACM,Acme Ltd,111,Listed
,BHP,BHP Group Ltd,222,Listed
AU000007,UNI,Unicorp Holdings,333,Suspended
AU000001,ZZZ,Acme Duplicate,999,Delisted
";

const CONFIG: &str = r#"
name = "Master company reference"

[primary]
file = "si_au_ref_names.csv"

[sources.secref]
file = "secref.csv"

[sources.master]
file = "master.csv"

[[stages]]
name = "security_reference"
source = "secref"
prefix = "SR_"
columns = ["CompanyId", "ISIN", "CUSIP", "ActiveOrDelisted", "IPODate"]

[[stages.strategies]]
id = "company_share_class"
primary_key = [{ column = "MS_CompanyID" }, { column = "MS_SecurityID" }]
secondary_key = [{ column = "CompanyId" }, { column = "ShareClassId" }]

[[stages]]
name = "master_company"
source = "master"
prefix = "MC_"
columns = ["ISIN", "ABN", "ACN", "TradingStatus"]
provenance = true

[[stages.strategies]]
id = "isin"
primary_key = [{ column = "SR_ISIN" }]
secondary_key = [{ column = "ISIN" }]

[[stages.strategies]]
id = "symbol"
primary_key = [{ column = "CompanyTicker", kind = "code" }]
secondary_key = [{ column = "Symbol", kind = "code" }]

[stages.fuzzy]
primary = { column = "FullCompanyName", kind = "name" }
secondary = { column = "CompanyName", kind = "name" }

[output]
columns = ["Gcode", "SR_ISIN", "MC_ABN"]
exclude = ["join_key"]

[report]
breakdown = ["MC_TradingStatus"]
distinct = ["Gcode"]
progress_every = 2
"#;

fn load_and_run() -> (LinkConfig, refmerge_linkage::LinkResult) {
    let config = LinkConfig::from_toml(CONFIG).unwrap();
    let input = LinkInput {
        primary: load_csv_table("sirca", SIRCA_CSV).unwrap(),
        sources: HashMap::from([
            ("secref".to_string(), load_csv_table("secref", SECREF_CSV).unwrap()),
            ("master".to_string(), load_csv_table("master", MASTER_CSV).unwrap()),
        ]),
    };
    let result = run(&config, input, &mut NoopReporter).unwrap();
    (config, result)
}

fn text(s: &str) -> Value {
    Value::text(s)
}

// -------------------------------------------------------------------------
// Row-level outcomes
// -------------------------------------------------------------------------

#[test]
fn left_preserving_and_ordered() {
    let (_, result) = load_and_run();
    let gcodes: Vec<&Value> = result.table.rows.iter().map(|r| r.value("Gcode")).collect();
    assert_eq!(
        gcodes,
        vec![
            &text("g001"),
            &text("g002"),
            &text("g003"),
            &text("g004"),
            &text("g005"),
            &text("g006")
        ]
    );
    assert_eq!(result.outcomes.len(), 2);
    assert!(result.outcomes.iter().all(|o| o.len() == 6));
}

#[test]
fn composite_key_then_isin() {
    let (_, result) = load_and_run();
    let row = &result.table.rows[0];
    // Duplicate (AB,12) in secref: the first row wins.
    assert_eq!(row.value("SR_ISIN"), &text("AU000001"));
    assert_eq!(row.value("SR_CUSIP"), &text("C1"));
    // Duplicate ISIN in master: the first row wins.
    assert_eq!(row.value("MC_ABN"), &text("111"));
    assert_eq!(row.value("MC_match_method"), &text("isin"));
    assert_eq!(
        result.outcomes[1][0],
        MatchOutcome::Exact {
            strategy: "isin".into(),
            row: 1
        }
    );
}

#[test]
fn ticker_fallback_when_composite_missing() {
    let (_, result) = load_and_run();
    let row = &result.table.rows[1];
    assert!(row.value("SR_ISIN").is_missing());
    assert_eq!(row.value("MC_ABN"), &text("222"));
    assert_eq!(row.value("MC_match_method"), &text("symbol"));
}

#[test]
fn isin_beats_symbol_even_when_both_match() {
    let (_, result) = load_and_run();
    // g006: SR_ISIN AU000002 and ticker QAN both point at master row 0.
    assert_eq!(
        result.outcomes[1][5],
        MatchOutcome::Exact {
            strategy: "isin".into(),
            row: 0
        }
    );
}

#[test]
fn fuzzy_fallback_is_shared_by_identical_keys() {
    let (_, result) = load_and_run();
    let mc = &result.outcomes[1];
    assert_eq!(mc[2], mc[4]);
    match &mc[2] {
        MatchOutcome::Fuzzy { key, row, score } => {
            assert_eq!(key, "unicorp holdings");
            assert_eq!(*row, 3);
            assert!((score - (1.0 - 9.0 / 16.0)).abs() < 1e-12);
        }
        other => panic!("expected fuzzy match, got {other:?}"),
    }
    assert_eq!(result.table.rows[2].value("MC_TradingStatus"), &text("Suspended"));
}

#[test]
fn nothing_to_link_stays_unmatched() {
    let (_, result) = load_and_run();
    let row = &result.table.rows[3];
    assert_eq!(result.outcomes[1][3], MatchOutcome::Unmatched);
    assert!(row.value("MC_ABN").is_missing());
    assert!(row.value("MC_match_score").is_missing());
}

// -------------------------------------------------------------------------
// Schema + Report
// -------------------------------------------------------------------------

#[test]
fn uniform_schema_and_skipped_columns() {
    let (_, result) = load_and_run();
    let t = &result.table;
    assert!(t.has_column("SR_CUSIP"));
    assert!(!t.has_column("SR_IPODate"));
    assert!(!t.has_column("MC_ACN"));
    for row in &t.rows {
        for col in &t.columns {
            assert!(row.contains(col), "row missing column {col}");
        }
    }
}

#[test]
fn report_counts() {
    let (_, result) = load_and_run();
    let s = &result.report.summary;
    assert_eq!(s.total_rows, 6);
    assert_eq!(s.stages.len(), 2);

    let sr = &s.stages[0];
    assert_eq!(sr.exact[0].matched, 2);
    assert_eq!(sr.unmatched, 4);

    let mc = &s.stages[1];
    assert_eq!(mc.exact[0].strategy, "isin");
    assert_eq!(mc.exact[0].matched, 2);
    assert_eq!(mc.exact[1].matched, 1);
    assert_eq!(mc.fuzzy_matched, 2);
    assert_eq!(mc.unmatched, 1);

    let status = &s.breakdown["MC_TradingStatus"];
    assert_eq!(status["Listed"], 2);
    assert_eq!(status["Delisted"], 1);
    assert_eq!(status["Suspended"], 2);
    assert_eq!(status["(unmatched/empty)"], 1);
    assert_eq!(s.distinct["Gcode"], 6);

    assert_eq!(result.report.meta.config_name, "Master company reference");
}

#[test]
fn written_output_honours_order_and_exclusions() {
    let (config, result) = load_and_run();
    let columns = select_output_columns(&result.table, &config.output.columns, &config.output.exclude);
    assert_eq!(&columns[..3], &["Gcode", "SR_ISIN", "MC_ABN"]);
    assert!(!columns.iter().any(|c| c == "join_key"));

    let csv = write_csv_table(&result.table, &columns, &config.output.missing).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("Gcode,SR_ISIN,MC_ABN,"));
    assert!(lines.next().unwrap().starts_with("g001,AU000001,111,"));
    assert!(lines.nth(2).unwrap().starts_with("g004,,,"));
}
