use std::fs;
use std::path::{Path, PathBuf};

use session_metrics::reader::read_csv_as_strings;
use session_metrics::schema::metrics;
use session_metrics::{run, PipelineConfig, RunOutcome};
use tempfile::TempDir;

const NORTH_CSV: &str = "\
Region,IgnatorID,StudentID,SessionID,Program,DA_Pre_Score,DA_Post_Score,DA_Pre_Date,DA_Post_Date
North,IG-1,S1,N1,Maths,4,7,2024-03-05 09:00:00,2024-03-05 15:00:00
North,IG-1,S2,N2,Maths,5,,2024-03-06,
North,IG-2,S3,N3,Science,,,,
North,IG-3,S1,L1,Library,,,,
";

// No region column: every row falls back to the file stem.
const PUNE_CSV: &str = "\
Ignator,Student,Session,Program Name,DA Pre,DA Post
IG-1,S1,P1,Maths,3,6
IG-4,S9,P2,Circle Time,,
";

struct Workspace {
    _tmp: TempDir,
    config: PipelineConfig,
}

impl Workspace {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            data_dir: tmp.path().join("data"),
            out_dir: tmp.path().join("docs"),
            ..PipelineConfig::default()
        };
        fs::create_dir_all(&config.data_dir).unwrap();
        Self { _tmp: tmp, config }
    }

    fn write(&self, name: &str, contents: &[u8]) {
        fs::write(self.config.data_dir.join(name), contents).unwrap();
    }

    fn output(&self, name: &str) -> PathBuf {
        self.config.out_dir.join(name)
    }
}

fn column(path: &Path, name: &str) -> Vec<Option<String>> {
    read_csv_as_strings(path)
        .unwrap()
        .column(name)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

fn owned(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|v| Some(v.to_string())).collect()
}

#[test]
fn metrics_from_mixed_sources() {
    let ws = Workspace::new();
    ws.write("North.csv", NORTH_CSV.as_bytes());
    ws.write("pune.csv", PUNE_CSV.as_bytes());
    ws.write("broken.xlsx", b"not a workbook");
    ws.write("notes.txt", b"ignored");

    let outcome = run(&ws.config).unwrap();
    let RunOutcome::Written(paths) = outcome else {
        panic!("expected a report, got {outcome:?}");
    };
    assert_eq!(paths.metrics_csv, ws.output("aggregated_metrics.csv"));
    assert!(paths.chart_html.exists());

    let csv = &paths.metrics_csv;
    assert_eq!(column(csv, metrics::REGION), owned(&["North", "pune", "TOTAL"]));
    assert_eq!(column(csv, metrics::UNIQUE_STUDENTS), owned(&["3", "2", "4"]));
    assert_eq!(column(csv, metrics::UNIQUE_IGNATORS), owned(&["3", "2", "4"]));
    assert_eq!(column(csv, metrics::SESSION_COUNT), owned(&["3", "1", "4"]));
    assert_eq!(column(csv, metrics::DA_PRE), owned(&["2", "1", "3"]));
    assert_eq!(column(csv, metrics::DA_POST), owned(&["1", "1", "2"]));
    assert_eq!(column(csv, metrics::PREPOST_GAP), owned(&["1", "0", "1"]));
    assert_eq!(
        column(csv, metrics::COMPLETION_RATE),
        owned(&["33.3", "100.0", "50.0"])
    );
    assert_eq!(column(csv, metrics::WASTAGE), owned(&["50.0", "0.0", "33.3"]));
    assert_eq!(
        column(csv, metrics::NO_DA_IGNATOR_COUNT),
        owned(&["1", "0", "0"])
    );
    assert_eq!(
        column(csv, metrics::NO_DA_IGNATOR_LIST)[0],
        Some("IG-2".to_string())
    );

    let html = fs::read_to_string(&paths.chart_html).unwrap();
    assert!(html.contains(r#""categories":["North","pune"]"#));
}

#[test]
fn empty_sources_produce_no_artifacts() {
    let ws = Workspace::new();
    ws.write("empty.csv", b"Region,Student\n");

    assert_eq!(run(&ws.config).unwrap(), RunOutcome::Empty);
    assert!(!ws.config.out_dir.exists());
}

#[test]
fn config_file_overrides_aliases_and_report_names() {
    let ws = Workspace::new();
    ws.write(
        "west.csv",
        b"Zone,Session,DA Pre\nWest,W1,4\nWest,W2,\n",
    );

    let mut config = PipelineConfig::from_toml(
        r#"
        [aliases]
        region = ["Zone"]

        [report]
        metrics_file = "metrics.csv"
        chart_file = "chart.html"
        "#,
    )
    .unwrap();
    config.data_dir = ws.config.data_dir.clone();
    config.out_dir = ws.config.out_dir.clone();

    let RunOutcome::Written(paths) = run(&config).unwrap() else {
        panic!("expected a report");
    };
    assert_eq!(paths.metrics_csv, ws.output("metrics.csv"));
    assert_eq!(paths.chart_html, ws.output("chart.html"));
    assert_eq!(column(&paths.metrics_csv, metrics::REGION), owned(&["West", "TOTAL"]));
    assert_eq!(
        column(&paths.metrics_csv, metrics::SESSION_COUNT),
        owned(&["2", "2"])
    );
}
