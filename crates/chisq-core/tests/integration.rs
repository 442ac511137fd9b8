use approx::assert_relative_eq;
use chisq_core::{
    analyze_manifest, Analyzer, AnalysisOptions, CoreError, CorrectionMethod, Findings,
    PostHocMethod,
};
use chisq_schema::{get_preset, list_presets, parse_manifest_str};
use std::fs;
use std::path::{Path, PathBuf};

fn write_manifest(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("chisq.toml");
    fs::write(&path, content).unwrap();
    path
}

fn preset(name: &str) -> &'static str {
    get_preset(name).unwrap().manifest
}

#[test]
fn core_description_is_the_purpose() {
    assert_eq!(env!("CARGO_PKG_DESCRIPTION"), chisq_schema::PURPOSE);
}

#[test]
fn every_inline_preset_analyses() {
    for preset in list_presets() {
        let normalized = parse_manifest_str(preset.manifest)
            .unwrap()
            .normalize()
            .unwrap();
        if matches!(normalized.source, chisq_schema::TableSource::Csv { .. }) {
            continue;
        }
        let report = chisq_core::analyze(&normalized, Path::new(".")).unwrap();
        assert!(report.analysis_id.is_some(), "preset {}", preset.name);
    }
}

#[test]
fn pairwise_preset_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), preset("pairwise"));

    let report = analyze_manifest(&manifest).unwrap();
    assert!(report.significant);
    assert_relative_eq!(report.omnibus.statistic, 10.775_828_460_038_985, max_relative = 1e-10);
    assert_eq!(report.omnibus.dof, 4);

    let post_hoc = report.post_hoc.unwrap();
    let Findings::Pairwise(items) = &post_hoc.findings else {
        panic!("expected pairwise findings");
    };
    assert_eq!(items[0].label(), "control vs drug_a");
    assert!(items[0].reject);
    assert_relative_eq!(items[0].adjusted_p_value, 0.019_127_434_093_594_773, max_relative = 1e-8);
    assert!(!items[1].reject);
    assert!(!items[2].reject);
}

#[test]
fn analysis_id_is_stable_across_formatting() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_manifest(dir.path(), preset("residuals"));
    let other = tempfile::tempdir().unwrap();
    let reformatted = preset("residuals")
        .replace("correction = \"holm\"", "correction = \"Holm\"")
        .replace("[[45, 30, 25]", "[ [45,30,25]");
    let b = write_manifest(other.path(), &reformatted);

    let ra = analyze_manifest(&a).unwrap();
    let rb = analyze_manifest(&b).unwrap();
    assert_eq!(ra.analysis_id, rb.analysis_id);
    assert_eq!(ra.short_id.unwrap().len(), 12);
}

#[test]
fn observations_manifest_reads_csv_next_to_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let mut csv = String::from("id,group,outcome\n");
    let groups = [
        ("a", "yes", 30),
        ("a", "no", 10),
        ("b", "yes", 12),
        ("b", "no", 28),
        ("c", "yes", 20),
        ("c", "no", 20),
    ];
    let mut id = 0;
    for (group, outcome, n) in groups {
        for _ in 0..n {
            id += 1;
            csv.push_str(&format!("{id},{group},{outcome}\n"));
        }
    }
    csv.push_str("999,,yes\n");
    fs::write(dir.path().join("observations.csv"), csv).unwrap();
    let manifest = write_manifest(dir.path(), preset("observations"));

    let report = analyze_manifest(&manifest).unwrap();
    assert_eq!(report.table.rows, vec!["a", "b", "c"]);
    assert_eq!(report.table.columns, vec!["no", "yes"]);
    assert_eq!(report.table.counts, vec![vec![10, 30], vec![28, 12], vec![20, 20]]);
    assert_eq!(report.table.total, 120);
    assert!(report.significant);
    assert_eq!(report.post_hoc.unwrap().family_size, 3);
}

#[test]
fn wide_table_csv_with_tab_delimiter() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("table.tsv"),
        "site\tbus\tcar\tbike\nurban\t45\t30\t25\nsuburban\t20\t60\t20\nrural\t10\t70\t5\n",
    )
    .unwrap();
    let manifest = write_manifest(
        dir.path(),
        r#"manifest_version = 1

[analysis]
name = "commute"
post_hoc = "one_vs_rest"
axis = "columns"
correction = "bonferroni"

[data]
path = "table.tsv"
format = "table"
delimiter = "\t"
"#,
    );

    let report = analyze_manifest(&manifest).unwrap();
    assert_eq!(report.name.as_deref(), Some("commute"));
    assert_relative_eq!(report.omnibus.statistic, 54.562_132_352_941_18, max_relative = 1e-10);
    let post_hoc = report.post_hoc.unwrap();
    let Findings::OneVsRest(items) = &post_hoc.findings else {
        panic!("expected one-vs-rest findings");
    };
    assert_eq!(
        items.iter().map(|c| c.first.as_str()).collect::<Vec<_>>(),
        vec!["bus", "car", "bike"]
    );
}

#[test]
fn missing_data_file_is_a_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), preset("observations"));
    let err = analyze_manifest(&manifest).unwrap_err();
    assert!(matches!(err, CoreError::Input(_)));
    assert!(err.to_string().starts_with("data error:"));
}

#[test]
fn invalid_manifest_is_a_manifest_error() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        dir.path(),
        "manifest_version = 1\n[analysis]\ncorrection = \"tukey\"\n[table]\nrows = [\"a\", \"b\"]\ncolumns = [\"x\", \"y\"]\ncounts = [[1, 2], [3, 4]]\n",
    );
    let err = analyze_manifest(&manifest).unwrap_err();
    assert!(matches!(err, CoreError::Manifest(_)));
    let message = err.to_string();
    assert!(message.starts_with("manifest error: unknown "), "{message}");
    assert_eq!(message.matches("manifest error:").count(), 1);
}

#[test]
fn zero_margin_table_is_a_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        dir.path(),
        "manifest_version = 1\n[table]\nrows = [\"a\", \"b\"]\ncolumns = [\"x\", \"y\"]\ncounts = [[0, 0], [3, 4]]\n",
    );
    let err = analyze_manifest(&manifest).unwrap_err();
    assert!(err.to_string().starts_with("data error:"), "{err}");
}

#[test]
fn correction_changes_rejections_not_raw_p_values() {
    let table = chisq_core::ContingencyTable::new(
        vec!["a".into(), "b".into(), "c".into()],
        vec!["x".into(), "y".into(), "z".into()],
        vec![vec![18, 22, 20], vec![35, 15, 10], vec![28, 20, 12]],
    )
    .unwrap();

    let run = |correction| {
        Analyzer::new(AnalysisOptions {
            correction,
            post_hoc: PostHocMethod::OneVsRest,
            ..AnalysisOptions::default()
        })
        .unwrap()
        .run(&table)
        .unwrap()
        .post_hoc
        .unwrap()
    };
    let none = run(CorrectionMethod::None);
    let bonferroni = run(CorrectionMethod::Bonferroni);
    assert_eq!(none.rejected, 2);
    assert_eq!(bonferroni.rejected, 1);

    let (Findings::OneVsRest(a), Findings::OneVsRest(b)) = (&none.findings, &bonferroni.findings)
    else {
        panic!("expected one-vs-rest findings");
    };
    for (x, y) in a.iter().zip(b) {
        assert_eq!(x.p_value, y.p_value);
        assert!(y.adjusted_p_value >= x.adjusted_p_value);
    }
}
