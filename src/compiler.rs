use anyhow::Result;
use plotters::style::RGBColor;

use crate::ir::{
    BarChart, BoxChart, BoxStats, Chart, ChartBody, CorrelationMatrix, DrawCommand, FillStyle,
    HistogramChart, LineStyle, PanelScales, PointStyle, SceneGraph, ViolinChart, XyChart,
};
use crate::palette::{ColorPalette, DivergingScale};
use crate::RenderOptions;

const BAR_WIDTH: f64 = 0.8;
const BOX_WIDTH: f64 = 0.6;
const VIOLIN_WIDTH: f64 = 0.8;

const INK: RGBColor = RGBColor(60, 60, 60);
const MISSING_CELL: RGBColor = RGBColor(235, 235, 235);
const WHITE: RGBColor = RGBColor(255, 255, 255);

// =============================================================================
// Boxplot Geometry Helpers
// =============================================================================

/// Computed geometry for a single boxplot, expressed as primitive shapes
struct BoxplotGeometry {
    lower_whisker: Vec<(f64, f64)>,
    upper_whisker: Vec<(f64, f64)>,
    min_cap: Vec<(f64, f64)>,
    max_cap: Vec<(f64, f64)>,
    box_tl: (f64, f64),
    box_br: (f64, f64),
    median_line: Vec<(f64, f64)>,
    outlier_points: Vec<(f64, f64)>,
}

fn compute_boxplot_geometry(x: f64, width: f64, stats: &BoxStats) -> BoxplotGeometry {
    let half_width = width / 2.0;
    let cap_half = width * 0.2;
    let (min, max) = (stats.lower_whisker, stats.upper_whisker);

    BoxplotGeometry {
        lower_whisker: vec![(x, min), (x, stats.q1)],
        upper_whisker: vec![(x, stats.q3), (x, max)],
        min_cap: vec![(x - cap_half, min), (x + cap_half, min)],
        max_cap: vec![(x - cap_half, max), (x + cap_half, max)],
        box_tl: (x - half_width, stats.q3),
        box_br: (x + half_width, stats.q1),
        median_line: vec![(x - half_width, stats.median), (x + half_width, stats.median)],
        outlier_points: stats.outliers.iter().map(|&v| (x, v)).collect(),
    }
}

// =============================================================================
// Dodging
// =============================================================================

/// Slot width and centre offset of group `group_idx` among the groups that
/// occupy the same category.
fn dodge(occupants: &[usize], group_idx: usize, total_width: f64) -> (f64, f64) {
    let num_at_x = occupants.len();
    match occupants.iter().position(|&g| g == group_idx) {
        Some(rank) if num_at_x > 0 => {
            let slot = total_width / num_at_x as f64;
            let offset = (rank as f64 - (num_at_x as f64 - 1.0) / 2.0) * slot;
            (slot, offset)
        }
        _ => (total_width, 0.0),
    }
}

/// For each category, the groups that have something to draw there.
fn occupancy<T>(n_categories: usize, groups: &[&[Option<T>]]) -> Vec<Vec<usize>> {
    (0..n_categories)
        .map(|c| {
            groups
                .iter()
                .enumerate()
                .filter(|(_, cells)| cells.get(c).map_or(false, Option::is_some))
                .map(|(g, _)| g)
                .collect()
        })
        .collect()
}

fn check_aligned(what: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        anyhow::bail!(
            "{} must align with categories (categories: {}, values: {})",
            what,
            expected,
            actual
        );
    }
    Ok(())
}

/// Compile a chart and its scales into a SceneGraph of drawing commands
pub fn compile_chart(
    chart: &Chart,
    scales: &PanelScales,
    options: &RenderOptions,
) -> Result<SceneGraph> {
    let palette = ColorPalette::category10();

    let commands = match &chart.body {
        ChartBody::Lines(xy) => compile_lines(xy, &palette),
        ChartBody::Points(xy) => compile_points(xy, &palette),
        ChartBody::Bars(bars) => compile_bars(bars, &palette)?,
        ChartBody::Boxes(boxes) => compile_boxes(boxes, &palette)?,
        ChartBody::Histogram(hist) => compile_histogram(hist, &palette)?,
        ChartBody::Violins(violins) => compile_violins(violins, &palette)?,
        ChartBody::Heatmap(matrix) => compile_heatmap(matrix)?,
    };

    Ok(SceneGraph {
        width: options.width,
        height: options.height,
        title: chart.title.clone(),
        x_label: chart.x_label.clone(),
        y_label: chart.y_label.clone(),
        x_scale: scales.x.clone(),
        y_scale: scales.y.clone(),
        commands,
    })
}

fn compile_lines(xy: &XyChart, palette: &ColorPalette) -> Vec<DrawCommand> {
    xy.series
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.points.is_empty())
        .map(|(idx, series)| DrawCommand::DrawLine {
            points: series.points.clone(),
            style: LineStyle {
                color: palette.color(idx),
                width: 2,
                alpha: 1.0,
            },
            legend: series.key.clone(),
        })
        .collect()
}

fn compile_points(xy: &XyChart, palette: &ColorPalette) -> Vec<DrawCommand> {
    xy.series
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.points.is_empty())
        .map(|(idx, series)| DrawCommand::DrawPoint {
            points: series.points.clone(),
            style: PointStyle {
                color: palette.color(idx),
                size: 3,
                alpha: 0.8,
            },
            legend: series.key.clone(),
        })
        .collect()
}

fn compile_bars(bars: &BarChart, palette: &ColorPalette) -> Result<Vec<DrawCommand>> {
    for group in &bars.groups {
        check_aligned("Bar values", bars.categories.len(), group.values.len())?;
    }
    let cells: Vec<&[Option<f64>]> = bars.groups.iter().map(|g| g.values.as_slice()).collect();
    let x_occupancy = occupancy(bars.categories.len(), &cells);

    let mut commands = Vec::new();
    for (group_idx, group) in bars.groups.iter().enumerate() {
        let style = FillStyle {
            color: palette.color(group_idx),
            alpha: 0.85,
            border: None,
        };
        let mut legend = group.key.clone();
        for (cat_idx, value) in group.values.iter().enumerate() {
            let Some(y_top) = *value else {
                continue;
            };
            let (slot_width, x_offset) = dodge(&x_occupancy[cat_idx], group_idx, BAR_WIDTH);
            let x_final = cat_idx as f64 + x_offset;
            let half_width = slot_width / 2.0;

            commands.push(DrawCommand::DrawRect {
                tl: (x_final - half_width, y_top),
                br: (x_final + half_width, 0.0),
                style: style.clone(),
                legend: legend.take(),
            });
        }
    }
    Ok(commands)
}

fn compile_boxes(boxes: &BoxChart, palette: &ColorPalette) -> Result<Vec<DrawCommand>> {
    for group in &boxes.groups {
        check_aligned("Boxes", boxes.categories.len(), group.boxes.len())?;
    }
    let cells: Vec<&[Option<_>]> = boxes.groups.iter().map(|g| g.boxes.as_slice()).collect();
    let x_occupancy = occupancy(boxes.categories.len(), &cells);

    let whisker_style = LineStyle {
        color: INK,
        width: 1,
        alpha: 1.0,
    };
    let median_style = LineStyle {
        color: WHITE,
        width: 2,
        alpha: 0.9,
    };

    let mut commands = Vec::new();
    for (group_idx, group) in boxes.groups.iter().enumerate() {
        let color = palette.color(group_idx);
        let box_style = FillStyle {
            color,
            alpha: 0.8,
            border: Some(INK),
        };
        let outlier_style = PointStyle {
            color: INK,
            size: 3,
            alpha: 0.8,
        };
        let mut legend = group.key.clone();

        for (cat_idx, stats) in group.boxes.iter().enumerate() {
            let Some(stats) = stats else {
                continue;
            };
            let (slot_width, x_offset) = dodge(&x_occupancy[cat_idx], group_idx, BOX_WIDTH);
            let geom = compute_boxplot_geometry(cat_idx as f64 + x_offset, slot_width * 0.9, stats);

            // Emit primitive commands in z-order: whiskers, caps, box, median, outliers
            for points in [geom.lower_whisker, geom.upper_whisker, geom.min_cap, geom.max_cap] {
                commands.push(DrawCommand::DrawLine {
                    points,
                    style: whisker_style.clone(),
                    legend: None,
                });
            }
            commands.push(DrawCommand::DrawRect {
                tl: geom.box_tl,
                br: geom.box_br,
                style: box_style.clone(),
                legend: legend.take(),
            });
            commands.push(DrawCommand::DrawLine {
                points: geom.median_line,
                style: median_style.clone(),
                legend: None,
            });
            if !geom.outlier_points.is_empty() {
                commands.push(DrawCommand::DrawPoint {
                    points: geom.outlier_points,
                    style: outlier_style.clone(),
                    legend: None,
                });
            }
        }
    }
    Ok(commands)
}

fn compile_histogram(hist: &HistogramChart, palette: &ColorPalette) -> Result<Vec<DrawCommand>> {
    let bins = hist.bin_count();
    for group in &hist.groups {
        check_aligned("Histogram counts", bins, group.counts.len())?;
    }
    let num_groups = hist.groups.len().max(1) as f64;

    let mut commands = Vec::new();
    for (group_idx, group) in hist.groups.iter().enumerate() {
        let color = palette.color(group_idx);
        let style = FillStyle {
            color,
            alpha: 0.6,
            border: Some(WHITE),
        };
        let mut legend = group.key.clone();

        // Side by side within each bin, never stacked
        for (bin, &count) in group.counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let left = hist.edges[bin];
            let slot = (hist.edges[bin + 1] - left) / num_groups;
            let x0 = left + group_idx as f64 * slot;
            commands.push(DrawCommand::DrawRect {
                tl: (x0, count as f64),
                br: (x0 + slot, 0.0),
                style: style.clone(),
                legend: legend.take(),
            });
        }

        if !group.kde.is_empty() {
            commands.push(DrawCommand::DrawLine {
                points: group.kde.clone(),
                style: LineStyle {
                    color,
                    width: 2,
                    alpha: 1.0,
                },
                legend: None,
            });
        }
    }
    Ok(commands)
}

/// Density at `value`, interpolated along the violin's grid.
fn density_at(grid: &[f64], density: &[f64], value: f64) -> f64 {
    for i in 1..grid.len().min(density.len()) {
        if value <= grid[i] {
            let span = grid[i] - grid[i - 1];
            let t = if span > 0.0 { (value - grid[i - 1]) / span } else { 0.0 };
            return density[i - 1] + t * (density[i] - density[i - 1]);
        }
    }
    0.0
}

fn compile_violins(violins: &ViolinChart, palette: &ColorPalette) -> Result<Vec<DrawCommand>> {
    for group in &violins.groups {
        check_aligned("Violins", violins.categories.len(), group.violins.len())?;
    }
    let cells: Vec<&[Option<_>]> = violins.groups.iter().map(|g| g.violins.as_slice()).collect();
    let y_occupancy = occupancy(violins.categories.len(), &cells);
    let n = violins.categories.len();

    let mut commands = Vec::new();
    for (group_idx, group) in violins.groups.iter().enumerate() {
        let style = FillStyle {
            color: palette.color(group_idx),
            alpha: 0.7,
            border: Some(INK),
        };
        let mut legend = group.key.clone();

        for (cat_idx, stats) in group.violins.iter().enumerate() {
            let Some(stats) = stats else {
                continue;
            };
            // First category at the top
            let (slot, offset) = dodge(&y_occupancy[cat_idx], group_idx, VIOLIN_WIDTH);
            let y = (n - 1 - cat_idx) as f64 - offset;
            let half = slot / 2.0;

            let mut outline: Vec<(f64, f64)> = stats
                .grid
                .iter()
                .zip(&stats.density)
                .map(|(&v, &d)| (v, y + d * half))
                .collect();
            outline.extend(
                stats
                    .grid
                    .iter()
                    .zip(&stats.density)
                    .rev()
                    .map(|(&v, &d)| (v, y - d * half)),
            );
            commands.push(DrawCommand::DrawPolygon {
                points: outline,
                style: style.clone(),
                legend: legend.take(),
            });

            for (q_idx, &q) in stats.quartiles.iter().enumerate() {
                let extent = density_at(&stats.grid, &stats.density, q) * half;
                commands.push(DrawCommand::DrawLine {
                    points: vec![(q, y - extent), (q, y + extent)],
                    style: LineStyle {
                        color: INK,
                        width: if q_idx == 1 { 2 } else { 1 },
                        alpha: 1.0,
                    },
                    legend: None,
                });
            }
        }
    }
    Ok(commands)
}

fn compile_heatmap(matrix: &CorrelationMatrix) -> Result<Vec<DrawCommand>> {
    let n = matrix.len();
    check_aligned("Correlation rows", n, matrix.values.len())?;
    for row in &matrix.values {
        check_aligned("Correlation columns", n, row.len())?;
    }
    let scale = DivergingScale::coolwarm();

    let mut commands = Vec::with_capacity(n * n * 2);
    for row in 0..n {
        let y = (n - 1 - row) as f64;
        for col in 0..n {
            let x = col as f64;
            let value = matrix.get(row, col);
            commands.push(DrawCommand::DrawRect {
                tl: (x - 0.5, y + 0.5),
                br: (x + 0.5, y - 0.5),
                style: FillStyle {
                    color: value.map_or(MISSING_CELL, |v| scale.color(v)),
                    alpha: 1.0,
                    border: Some(WHITE),
                },
                legend: None,
            });
            commands.push(DrawCommand::DrawText {
                pos: (x, y),
                text: matrix.annotation(row, col),
                color: value.map_or(INK, |v| scale.text_color(v)),
            });
        }
    }
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AxisKind, BarGroup, BoxGroup, Series};
    use crate::kind::PlotKind;
    use crate::scale::build_scales;

    fn compile(body: ChartBody) -> Result<SceneGraph> {
        let chart = Chart {
            kind: PlotKind::Barplot,
            title: "t".into(),
            x_label: Some("x".into()),
            y_label: Some("y".into()),
            body,
        };
        let scales = build_scales(&chart);
        compile_chart(&chart, &scales, &RenderOptions::default())
    }

    #[test]
    fn test_compile_line() {
        let scene = compile(ChartBody::Lines(XyChart {
            x_axis: AxisKind::Numeric,
            y_axis: AxisKind::Numeric,
            series: vec![Series {
                key: None,
                points: vec![(0.0, 10.0), (1.0, 20.0)],
            }],
        }))
        .unwrap();

        assert_eq!(scene.commands.len(), 1);
        assert_eq!(scene.width, 800);
        if let DrawCommand::DrawLine { points, legend, .. } = &scene.commands[0] {
            assert_eq!(points.len(), 2);
            assert_eq!(points[0], (0.0, 10.0));
            assert_eq!(*legend, None);
        } else {
            panic!("Expected DrawLine");
        }
    }

    #[test]
    fn test_dodged_bars_share_category_slot() {
        let scene = compile(ChartBody::Bars(BarChart {
            categories: vec!["A".into(), "B".into()],
            groups: vec![
                BarGroup {
                    key: Some("g".into()),
                    values: vec![Some(1.0), Some(2.0)],
                },
                BarGroup {
                    key: Some("h".into()),
                    values: vec![Some(3.0), None],
                },
            ],
        }))
        .unwrap();

        let rects: Vec<_> = scene
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::DrawRect { tl, br, legend, .. } => Some((*tl, *br, legend.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(rects.len(), 3);
        // Category A holds two half-width bars
        assert!((rects[0].1 .0 - rects[0].0 .0 - 0.4).abs() < 1e-9);
        // Category B holds one full-width bar
        assert!((rects[1].1 .0 - rects[1].0 .0 - 0.8).abs() < 1e-9);
        // Legend entries only on the first rect of each group
        assert_eq!(rects[0].2.as_deref(), Some("g"));
        assert_eq!(rects[1].2, None);
        assert_eq!(rects[2].2.as_deref(), Some("h"));
    }

    #[test]
    fn test_misaligned_bars_rejected() {
        let result = compile(ChartBody::Bars(BarChart {
            categories: vec!["A".into(), "B".into()],
            groups: vec![BarGroup {
                key: None,
                values: vec![Some(1.0)],
            }],
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_boxplot_primitives() {
        let scene = compile(ChartBody::Boxes(BoxChart {
            categories: vec!["A".into()],
            groups: vec![BoxGroup {
                key: None,
                boxes: vec![Some(BoxStats {
                    lower_whisker: 1.0,
                    q1: 2.0,
                    median: 3.0,
                    q3: 4.0,
                    upper_whisker: 5.0,
                    outliers: vec![9.0],
                })],
            }],
        }))
        .unwrap();
        // 4 whisker lines, box, median, outliers
        assert_eq!(scene.commands.len(), 7);
        assert!(matches!(scene.commands[4], DrawCommand::DrawRect { .. }));
    }

    #[test]
    fn test_heatmap_cells_and_annotations() {
        let scene = compile(ChartBody::Heatmap(CorrelationMatrix {
            labels: vec!["a".into(), "b".into()],
            values: vec![vec![Some(1.0), None], vec![None, Some(1.0)]],
        }))
        .unwrap();
        let texts: Vec<&str> = scene
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::DrawText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["1.00", "nan", "nan", "1.00"]);
    }

    #[test]
    fn test_density_at_interpolates() {
        let grid = [0.0, 1.0, 2.0];
        let density = [0.0, 1.0, 0.0];
        assert!((density_at(&grid, &density, 0.5) - 0.5).abs() < 1e-9);
        assert_eq!(density_at(&grid, &density, 5.0), 0.0);
    }
}
