// Renderer dispatch: one chart description per plot kind

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::data::{ColumnData, ColumnTag, Table};
use crate::ir::{
    AxisKind, BarChart, BarGroup, BoxChart, BoxGroup, Chart, ChartBody, CorrelationMatrix,
    HistogramChart, HistogramGroup, Series, ViolinChart, ViolinGroup, XyChart,
};
use crate::kind::PlotKind;
use crate::resolve::ResolvedBinding;
use crate::transform;

/// Build the chart description for a resolved binding.
///
/// Pure with respect to its inputs: the same table and binding always yield
/// the same chart.
pub fn render_chart(table: &Table, binding: &ResolvedBinding) -> Result<Chart> {
    let chart = match binding.kind {
        PlotKind::Boxplot => render_boxplot(table, binding)?,
        PlotKind::LinePlot => render_xy(table, binding, true)?,
        PlotKind::Scatterplot => render_xy(table, binding, false)?,
        PlotKind::Countplot => render_countplot(table, binding)?,
        PlotKind::Histogram => render_histogram(table, binding)?,
        PlotKind::Barplot => render_barplot(table, binding)?,
        PlotKind::ViolinPlot => render_violin(table, binding)?,
        PlotKind::CorrelationHeatmap => render_heatmap(table),
    };
    info!(kind = %binding.kind, title = %chart.title, "chart rendered");
    Ok(chart)
}

/// Columns bound for one render, looked up once.
struct Bound<'t> {
    x: Option<&'t ColumnData>,
    y: Option<&'t ColumnData>,
    hue: Option<&'t ColumnData>,
}

impl<'t> Bound<'t> {
    fn new(table: &'t Table, binding: &ResolvedBinding) -> Result<Self> {
        let lookup = |name: Option<&str>| -> Result<Option<&'t ColumnData>> {
            match name {
                Some(name) => {
                    let column = table
                        .column(name)
                        .with_context(|| format!("Column '{}' not found", name))?;
                    Ok(Some(column.data()))
                }
                None => Ok(None),
            }
        };
        Ok(Bound {
            x: lookup(binding.x.as_deref())?,
            y: lookup(binding.y.as_deref())?,
            hue: lookup(binding.hue.as_deref())?,
        })
    }

    /// Rows where every bound cell is present.
    fn complete_rows(&self, n_rows: usize, kind: PlotKind) -> Vec<usize> {
        let rows: Vec<usize> = (0..n_rows)
            .filter(|&row| {
                [self.x, self.y, self.hue]
                    .iter()
                    .flatten()
                    .all(|col| cell_present(col, row))
            })
            .collect();
        let dropped = n_rows - rows.len();
        if dropped > 0 {
            warn!(%kind, dropped, "rows with missing values skipped");
        }
        rows
    }

    fn hue_key(&self, row: usize) -> Option<String> {
        self.hue.and_then(|h| h.category_at(row)).map(str::to_string)
    }

    /// Hue groups in order of first appearance, or a single unnamed group.
    fn hue_groups(&self, rows: &[usize]) -> Vec<Option<String>> {
        match self.hue {
            Some(hue) => levels(hue, rows).into_iter().map(Some).collect(),
            None => vec![None],
        }
    }
}

fn cell_present(col: &ColumnData, row: usize) -> bool {
    match col.tag() {
        ColumnTag::Categorical => col.category_at(row).is_some(),
        ColumnTag::Numeric | ColumnTag::Temporal => col.value_at(row).is_some(),
    }
}

fn levels(col: &ColumnData, rows: &[usize]) -> Vec<String> {
    transform::unique_in_order(rows.iter().filter_map(|&r| col.category_at(r)))
}

fn axis_kind(col: &ColumnData) -> AxisKind {
    match col.tag() {
        ColumnTag::Temporal => AxisKind::Temporal,
        _ => AxisKind::Numeric,
    }
}

fn required<'a>(name: Option<&'a str>, role: &str, kind: PlotKind) -> Result<&'a str> {
    name.with_context(|| format!("{} requires the {} role to be bound", kind, role))
}

fn required_col<'t>(col: Option<&'t ColumnData>, role: &str, kind: PlotKind) -> Result<&'t ColumnData> {
    col.with_context(|| format!("{} requires the {} role to be bound", kind, role))
}

/// Numeric values of `value_col` per (category, hue group), aligned with
/// `categories` and `groups`.
fn grouped_values(
    bound: &Bound,
    rows: &[usize],
    category_col: Option<&ColumnData>,
    value_col: &ColumnData,
    categories: &[String],
    groups: &[Option<String>],
) -> Vec<Vec<Vec<f64>>> {
    let mut cells = vec![vec![Vec::new(); categories.len()]; groups.len()];
    for &row in rows {
        let Some(value) = value_col.value_at(row) else {
            continue;
        };
        let cat_idx = match category_col {
            Some(col) => col
                .category_at(row)
                .and_then(|c| categories.iter().position(|k| k == c)),
            None => Some(0),
        };
        let key = bound.hue_key(row);
        let group_idx = groups.iter().position(|g| *g == key);
        if let (Some(c), Some(g)) = (cat_idx, group_idx) {
            cells[g][c].push(value);
        }
    }
    cells
}

fn render_boxplot(table: &Table, binding: &ResolvedBinding) -> Result<Chart> {
    let kind = binding.kind;
    let bound = Bound::new(table, binding)?;
    let y_name = required(binding.y.as_deref(), "y", kind)?;
    let y = required_col(bound.y, "y", kind)?;
    let rows = bound.complete_rows(table.n_rows(), kind);

    let categories = match bound.x {
        Some(x) => levels(x, &rows),
        None => vec![String::new()],
    };
    let groups = bound.hue_groups(&rows);
    let cells = grouped_values(&bound, &rows, bound.x, y, &categories, &groups);

    let groups = groups
        .into_iter()
        .zip(cells)
        .map(|(key, per_cat)| BoxGroup {
            key,
            boxes: per_cat.iter().map(|v| transform::box_stats(v)).collect(),
        })
        .collect();

    let title = match binding.x.as_deref() {
        Some(x_name) => format!("Boxplot of {} per {}", y_name, x_name),
        None => format!("Boxplot of {}", y_name),
    };

    Ok(Chart {
        kind,
        title,
        x_label: binding.x.clone(),
        y_label: Some(y_name.to_string()),
        body: ChartBody::Boxes(BoxChart { categories, groups }),
    })
}

fn render_xy(table: &Table, binding: &ResolvedBinding, aggregate: bool) -> Result<Chart> {
    let kind = binding.kind;
    let bound = Bound::new(table, binding)?;
    let x_name = required(binding.x.as_deref(), "x", kind)?;
    let y_name = required(binding.y.as_deref(), "y", kind)?;
    let x = required_col(bound.x, "x", kind)?;
    let y = required_col(bound.y, "y", kind)?;
    let rows = bound.complete_rows(table.n_rows(), kind);

    let series = bound
        .hue_groups(&rows)
        .into_iter()
        .map(|key| {
            let points: Vec<(f64, f64)> = rows
                .iter()
                .filter(|&&r| bound.hue_key(r) == key)
                .filter_map(|&r| Some((x.value_at(r)?, y.value_at(r)?)))
                .collect();
            let points = if aggregate {
                transform::mean_by_x(&points)
            } else {
                points
            };
            Series { key, points }
        })
        .collect();

    let (title, body_fn): (String, fn(XyChart) -> ChartBody) = if aggregate {
        (format!("Line plot of {} vs. {}", y_name, x_name), ChartBody::Lines)
    } else {
        (format!("Scatterplot of {} vs. {}", y_name, x_name), ChartBody::Points)
    };

    Ok(Chart {
        kind,
        title,
        x_label: Some(x_name.to_string()),
        y_label: Some(y_name.to_string()),
        body: body_fn(XyChart {
            x_axis: axis_kind(x),
            y_axis: axis_kind(y),
            series,
        }),
    })
}

fn render_countplot(table: &Table, binding: &ResolvedBinding) -> Result<Chart> {
    let kind = binding.kind;
    let bound = Bound::new(table, binding)?;
    let x_name = required(binding.x.as_deref(), "x", kind)?;
    let x = required_col(bound.x, "x", kind)?;
    let rows = bound.complete_rows(table.n_rows(), kind);

    let categories = levels(x, &rows);
    let groups = bound.hue_groups(&rows);

    let mut counts = vec![vec![0usize; categories.len()]; groups.len()];
    for &row in &rows {
        let cat_idx = x.category_at(row).and_then(|c| categories.iter().position(|k| k == c));
        let key = bound.hue_key(row);
        let group_idx = groups.iter().position(|g| *g == key);
        if let (Some(c), Some(g)) = (cat_idx, group_idx) {
            counts[g][c] += 1;
        }
    }

    let groups = groups
        .into_iter()
        .zip(counts)
        .map(|(key, per_cat)| BarGroup {
            key,
            values: per_cat
                .into_iter()
                .map(|n| if n > 0 { Some(n as f64) } else { None })
                .collect(),
        })
        .collect();

    Ok(Chart {
        kind,
        title: format!("Countplot of {}", x_name),
        x_label: Some(x_name.to_string()),
        y_label: Some("count".to_string()),
        body: ChartBody::Bars(BarChart { categories, groups }),
    })
}

fn render_histogram(table: &Table, binding: &ResolvedBinding) -> Result<Chart> {
    let kind = binding.kind;
    let bound = Bound::new(table, binding)?;
    let x_name = required(binding.x.as_deref(), "x", kind)?;
    let x = required_col(bound.x, "x", kind)?;
    let rows = bound.complete_rows(table.n_rows(), kind);

    // Edges span every present x value, even where the hue cell is missing.
    let all_values: Vec<f64> = (0..table.n_rows()).filter_map(|r| x.value_at(r)).collect();
    let edges = transform::histogram_edges(&all_values);
    let bin_width = match edges.as_slice() {
        [first, second, ..] => second - first,
        _ => 1.0,
    };

    let groups = bound
        .hue_groups(&rows)
        .into_iter()
        .map(|key| {
            let values: Vec<f64> = rows
                .iter()
                .filter(|&&r| bound.hue_key(r) == key)
                .filter_map(|&r| x.value_at(r))
                .collect();
            HistogramGroup {
                counts: transform::bin_counts(&values, &edges),
                kde: transform::histogram_kde(&values, bin_width),
                key,
            }
        })
        .collect();

    Ok(Chart {
        kind,
        title: format!("Histogram of {}", x_name),
        x_label: Some(x_name.to_string()),
        y_label: Some("Count".to_string()),
        body: ChartBody::Histogram(HistogramChart {
            x_axis: axis_kind(x),
            edges,
            groups,
        }),
    })
}

fn render_barplot(table: &Table, binding: &ResolvedBinding) -> Result<Chart> {
    let kind = binding.kind;
    let bound = Bound::new(table, binding)?;
    let x_name = required(binding.x.as_deref(), "x", kind)?;
    let y_name = required(binding.y.as_deref(), "y", kind)?;
    let x = required_col(bound.x, "x", kind)?;
    let y = required_col(bound.y, "y", kind)?;
    let rows = bound.complete_rows(table.n_rows(), kind);

    let categories = levels(x, &rows);
    let groups = bound.hue_groups(&rows);
    let cells = grouped_values(&bound, &rows, Some(x), y, &categories, &groups);

    let groups = groups
        .into_iter()
        .zip(cells)
        .map(|(key, per_cat)| BarGroup {
            key,
            values: per_cat.iter().map(|v| transform::mean(v)).collect(),
        })
        .collect();

    Ok(Chart {
        kind,
        title: format!("Barplot of {} per {}", y_name, x_name),
        x_label: Some(x_name.to_string()),
        y_label: Some(y_name.to_string()),
        body: ChartBody::Bars(BarChart { categories, groups }),
    })
}

fn render_violin(table: &Table, binding: &ResolvedBinding) -> Result<Chart> {
    let kind = binding.kind;
    let bound = Bound::new(table, binding)?;
    let x_name = required(binding.x.as_deref(), "x", kind)?;
    let y_name = required(binding.y.as_deref(), "y", kind)?;
    let x = required_col(bound.x, "x", kind)?;
    let y = required_col(bound.y, "y", kind)?;
    let rows = bound.complete_rows(table.n_rows(), kind);

    // Categories come from the categorical y role; measurements from x.
    let categories = levels(y, &rows);
    let groups = bound.hue_groups(&rows);
    let cells = grouped_values(&bound, &rows, Some(y), x, &categories, &groups);

    let groups = groups
        .into_iter()
        .zip(cells)
        .map(|(key, per_cat)| ViolinGroup {
            key,
            violins: per_cat.iter().map(|v| transform::violin_stats(v)).collect(),
        })
        .collect();

    Ok(Chart {
        kind,
        title: format!("Violin plot of {} per {}", y_name, x_name),
        x_label: Some(x_name.to_string()),
        y_label: Some(y_name.to_string()),
        body: ChartBody::Violins(ViolinChart { categories, groups }),
    })
}

fn render_heatmap(table: &Table) -> Chart {
    let (labels, columns): (Vec<String>, Vec<Vec<Option<f64>>>) = table
        .columns_tagged(ColumnTag::Numeric)
        .filter_map(|c| match c.data() {
            ColumnData::Numeric(values) => Some((c.name().to_string(), values.clone())),
            _ => None,
        })
        .unzip();

    Chart {
        kind: PlotKind::CorrelationHeatmap,
        title: "Correlation heatmap of dataset".to_string(),
        x_label: None,
        y_label: None,
        body: ChartBody::Heatmap(CorrelationMatrix {
            values: transform::correlation_matrix(&columns),
            labels,
        }),
    }
}
