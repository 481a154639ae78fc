use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use plotselect::export::export_png;
use plotselect::ir::ChartBody;
use plotselect::kind::{PlotKind, Role};
use plotselect::resolve::{resolve_binding, RoleBinding, RoleOption};
use plotselect::runtime::render_chart;
use plotselect::{load_path, ColumnTag, FormatError, RenderOptions, Session};
use tempfile::TempDir;

const SALES_CSV: &str = "\
region,product,units,price,date
North,apples,10,1.5,2024-01-01
South,apples,7,1.6,2024-01-02
North,pears,3,2.1,2024-01-03
East,pears,,2.0,2024-01-04
South,apples,12,1.4,2024-01-05
North,plums,5,3.2,2024-01-06
";

/// Run the plotselect binary and return (success, stdout, stderr)
fn run_plotselect(args: &[&str]) -> (bool, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_plotselect"))
        .args(args)
        .output()
        .expect("Failed to spawn plotselect");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

fn write_fixture(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("Failed to write fixture");
    path
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("Temp path is not UTF-8")
}

#[test]
fn test_loader_infers_tags() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(&dir, "sales.csv", SALES_CSV);
    let table = load_path(&csv).unwrap();

    assert_eq!(table.n_rows(), 6);
    assert_eq!(table.column("region").unwrap().tag(), ColumnTag::Categorical);
    assert_eq!(table.column("units").unwrap().tag(), ColumnTag::Numeric);
    assert_eq!(table.column("date").unwrap().tag(), ColumnTag::Temporal);
}

#[test]
fn test_library_session_renders_png() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(&dir, "sales.csv", SALES_CSV);
    let mut session = Session::open(&csv).unwrap();

    session.select_kind(Some(PlotKind::Boxplot));
    session.bind(Role::X, RoleOption::Column("region".into())).unwrap();
    session.bind(Role::Y, RoleOption::Column("units".into())).unwrap();
    session.bind(Role::Hue, RoleOption::Column("product".into())).unwrap();
    session.render(&RenderOptions::default()).unwrap();

    assert_eq!(
        session.chart().map(|c| c.title.as_str()),
        Some("Boxplot of units per region")
    );
    let download = session.download().unwrap();
    assert_eq!(download.file_name, "plot.png");
    assert!(is_valid_png(&download.bytes));
}

#[test]
fn test_every_kind_renders_with_default_bindings() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(&dir, "sales.csv", SALES_CSV);
    let table = load_path(&csv).unwrap();

    for kind in PlotKind::ALL {
        let binding = RoleBinding::first_options(&table, kind);
        let resolved = resolve_binding(&table, kind, &binding)
            .unwrap_or_else(|e| panic!("{}: {}", kind, e));
        let chart = render_chart(&table, &resolved).unwrap();
        let download = export_png(&chart, &RenderOptions::default()).unwrap();
        assert!(is_valid_png(&download.bytes), "{}", kind);
    }
}

#[test]
fn test_temporal_line_plot_with_hue() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(&dir, "sales.csv", SALES_CSV);
    let table = load_path(&csv).unwrap();

    let binding = RoleBinding::new().x("date").y("price").hue("product");
    let resolved = resolve_binding(&table, PlotKind::LinePlot, &binding).unwrap();
    let chart = render_chart(&table, &resolved).unwrap();
    assert_eq!(chart.title, "Line plot of price vs. date");
    let ChartBody::Lines(xy) = &chart.body else {
        panic!("Expected lines");
    };
    let keys: Vec<_> = xy.series.iter().map(|s| s.key.as_deref()).collect();
    assert_eq!(keys, vec![Some("apples"), Some("pears"), Some("plums")]);
    assert!(is_valid_png(&export_png(&chart, &RenderOptions::default()).unwrap().bytes));
}

#[test]
fn test_cli_render_barplot() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(&dir, "sales.csv", SALES_CSV);
    let out = dir.path().join("bars.png");

    let (ok, stdout, stderr) = run_plotselect(&[
        "render",
        path_str(&csv),
        "--plot",
        "barplot",
        "--x",
        "region",
        "--y",
        "units",
        "--output",
        path_str(&out),
        "--width",
        "640",
        "--height",
        "480",
    ]);
    assert!(ok, "Failed: {}", stderr);
    assert!(stdout.contains("bars.png"));
    let png = fs::read(&out).unwrap();
    assert!(is_valid_png(&png));
}

#[test]
fn test_cli_render_heatmap_ignores_roles() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(&dir, "sales.csv", SALES_CSV);
    let out = dir.path().join("heatmap.png");

    let (ok, _, stderr) = run_plotselect(&[
        "render",
        path_str(&csv),
        "--plot",
        "Correlation Heatmap",
        "--x",
        "units",
        "--hue",
        "region",
        "--output",
        path_str(&out),
    ]);
    assert!(ok, "Failed: {}", stderr);
    assert!(is_valid_png(&fs::read(&out).unwrap()));
}

#[test]
fn test_cli_render_with_config() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(&dir, "sales.csv", SALES_CSV);
    let config = write_fixture(&dir, "options.json", r#"{"width": 400, "title_font_size": 16}"#);
    let out = dir.path().join("hist.png");

    let (ok, _, stderr) = run_plotselect(&[
        "render",
        path_str(&csv),
        "--plot",
        "histogram",
        "--x",
        "units",
        "--hue",
        "none",
        "--config",
        path_str(&config),
        "--output",
        path_str(&out),
    ]);
    assert!(ok, "Failed: {}", stderr);
    let png = fs::read(&out).unwrap();
    assert!(is_valid_png(&png));
    // IHDR width lives at bytes 16..20
    assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 400);
}

#[test]
fn test_cli_rejects_ineligible_column() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(&dir, "sales.csv", SALES_CSV);
    let out = dir.path().join("never.png");

    let (ok, _, stderr) = run_plotselect(&[
        "render",
        path_str(&csv),
        "--plot",
        "barplot",
        "--x",
        "units",
        "--y",
        "units",
        "--output",
        path_str(&out),
    ]);
    assert!(!ok);
    assert!(stderr.contains("units"), "stderr: {}", stderr);
    assert!(!out.exists());
}

#[test]
fn test_cli_options_json() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(&dir, "sales.csv", SALES_CSV);

    let (ok, stdout, stderr) =
        run_plotselect(&["options", path_str(&csv), "--plot", "violin-plot", "--json"]);
    assert!(ok, "Failed: {}", stderr);

    let listing: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(listing["kind"], "violin-plot");
    let roles = listing["roles"].as_array().unwrap();
    assert_eq!(roles.len(), 3);
    assert_eq!(roles[0]["role"], "x");
    assert_eq!(roles[0]["label"], "y");
    assert_eq!(roles[0]["options"], serde_json::json!(["units", "price"]));
    assert_eq!(roles[1]["options"], serde_json::json!(["region", "product"]));
    assert_eq!(roles[2]["optional"], true);
    assert_eq!(roles[2]["options"], serde_json::json!(["None", "region", "product"]));
}

#[test]
fn test_cli_violin_flags_follow_listed_labels() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(&dir, "sales.csv", SALES_CSV);
    let out = dir.path().join("violin.png");

    let (ok, stdout, stderr) = run_plotselect(&["options", path_str(&csv), "--plot", "violin-plot"]);
    assert!(ok, "Failed: {}", stderr);
    assert!(stdout.contains("y: units, price"), "stdout: {}", stdout);
    assert!(stdout.contains("x: region, product"), "stdout: {}", stdout);

    let (ok, _, stderr) = run_plotselect(&[
        "render",
        path_str(&csv),
        "--plot",
        "violin-plot",
        "--y",
        "units",
        "--x",
        "region",
        "--output",
        path_str(&out),
    ]);
    assert!(ok, "Failed: {}", stderr);
    assert!(is_valid_png(&fs::read(&out).unwrap()));

    let (ok, _, stderr) = run_plotselect(&[
        "render",
        path_str(&csv),
        "--plot",
        "violin-plot",
        "--x",
        "units",
        "--output",
        path_str(&out),
    ]);
    assert!(!ok);
    assert!(stderr.contains("Cannot bind x to 'units'"), "stderr: {}", stderr);
    assert!(stderr.contains("not eligible for 'x'"), "stderr: {}", stderr);
}

#[test]
fn test_cli_inspect() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(&dir, "sales.csv", SALES_CSV);

    let (ok, stdout, stderr) = run_plotselect(&["inspect", path_str(&csv), "--rows", "2"]);
    assert!(ok, "Failed: {}", stderr);
    assert!(stdout.contains("6 rows, 5 columns"));
    assert!(stdout.contains("temporal"));
    assert!(stdout.contains("North\tapples"));
    assert!(!stdout.contains("East"));
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let txt = write_fixture(&dir, "sales.txt", SALES_CSV);
    assert!(matches!(
        load_path(&txt),
        Err(FormatError::UnsupportedExtension(_))
    ));

    let (ok, _, stderr) = run_plotselect(&["inspect", path_str(&txt)]);
    assert!(!ok);
    assert!(stderr.contains("sales.txt"));
}

#[test]
fn test_headers_only_csv() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(&dir, "empty.csv", "a,b\n");
    let mut session = Session::open(&csv).unwrap();
    assert_eq!(session.table().n_rows(), 0);

    session.select_kind(Some(PlotKind::Scatterplot));
    session.fill_defaults().unwrap();
    assert_eq!(session.state().name(), "RoleBindingPending");
    assert_eq!(session.missing_roles(), vec![Role::X, Role::Y]);
}

#[test]
fn test_spreadsheet_first_sheet() {
    use simple_excel_writer::{Row, Workbook};

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scores.xlsx");
    let mut workbook = Workbook::create(path_str(&path));
    let mut sheet = workbook.create_sheet("Scores");
    workbook
        .write_sheet(&mut sheet, |sheet_writer| {
            sheet_writer.append_row(Row::from_iter(["team", "score"].iter().cloned()))?;
            sheet_writer.append_row(Row::from_iter(["red", "3.5"].iter().cloned()))?;
            sheet_writer.append_row(Row::from_iter(["blue", "4"].iter().cloned()))?;
            sheet_writer.append_row(Row::from_iter(["red", "2"].iter().cloned()))?;
            Ok(())
        })
        .unwrap();
    workbook.close().unwrap();

    let table = load_path(&path).unwrap();
    assert_eq!(table.column_names(), vec!["team", "score"]);
    assert_eq!(table.column("score").unwrap().tag(), ColumnTag::Numeric);

    let binding = RoleBinding::new().x("team").y("score");
    let resolved = resolve_binding(&table, PlotKind::Barplot, &binding).unwrap();
    let chart = render_chart(&table, &resolved).unwrap();
    let ChartBody::Bars(bars) = &chart.body else {
        panic!("Expected bars");
    };
    assert_eq!(bars.categories, vec!["red", "blue"]);
    assert_eq!(bars.groups[0].values, vec![Some(2.75), Some(4.0)]);
}
