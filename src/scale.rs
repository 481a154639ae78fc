use crate::ir::{AxisKind, Chart, ChartBody, PanelScales, Scale, ScaleKind};

/// Build the axis scales for a chart
pub fn build_scales(chart: &Chart) -> PanelScales {
    match &chart.body {
        ChartBody::Lines(xy) | ChartBody::Points(xy) => {
            let mut x_mm = MinMax::default();
            let mut y_mm = MinMax::default();
            for series in &xy.series {
                for &(x, y) in &series.points {
                    x_mm.push(x);
                    y_mm.push(y);
                }
            }
            PanelScales {
                x: continuous(x_mm, xy.x_axis),
                y: continuous(y_mm, xy.y_axis),
            }
        }
        ChartBody::Bars(bars) => {
            let mut y_mm = MinMax::default();
            for group in &bars.groups {
                for v in group.values.iter().flatten() {
                    y_mm.push(*v);
                }
            }
            // Bar charts always include 0
            y_mm.push(0.0);
            PanelScales {
                x: categorical(bars.categories.clone()),
                y: continuous(y_mm, AxisKind::Numeric),
            }
        }
        ChartBody::Boxes(boxes) => {
            let mut y_mm = MinMax::default();
            for stats in boxes.groups.iter().flat_map(|g| g.boxes.iter().flatten()) {
                y_mm.push(stats.lower_whisker);
                y_mm.push(stats.upper_whisker);
                for &o in &stats.outliers {
                    y_mm.push(o);
                }
            }
            PanelScales {
                x: categorical(boxes.categories.clone()),
                y: continuous(y_mm, AxisKind::Numeric),
            }
        }
        ChartBody::Histogram(hist) => {
            let mut x_mm = MinMax::default();
            let mut y_mm = MinMax::default();
            for &edge in &hist.edges {
                x_mm.push(edge);
            }
            y_mm.push(0.0);
            for group in &hist.groups {
                for &c in &group.counts {
                    y_mm.push(c as f64);
                }
                for &(_, d) in &group.kde {
                    y_mm.push(d);
                }
            }
            PanelScales {
                x: continuous(x_mm, hist.x_axis),
                y: continuous(y_mm, AxisKind::Numeric),
            }
        }
        ChartBody::Violins(violins) => {
            let mut x_mm = MinMax::default();
            for stats in violins.groups.iter().flat_map(|g| g.violins.iter().flatten()) {
                for &v in &stats.grid {
                    x_mm.push(v);
                }
            }
            PanelScales {
                x: continuous(x_mm, AxisKind::Numeric),
                y: categorical_top_down(violins.categories.clone()),
            }
        }
        ChartBody::Heatmap(matrix) => PanelScales {
            x: categorical(matrix.labels.clone()),
            y: categorical_top_down(matrix.labels.clone()),
        },
    }
}

#[derive(Debug, Clone)]
struct MinMax {
    min: f64,
    max: f64,
}

impl Default for MinMax {
    fn default() -> Self {
        MinMax {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl MinMax {
    fn push(&mut self, val: f64) {
        if !val.is_finite() {
            return;
        }
        if val < self.min {
            self.min = val;
        }
        if val > self.max {
            self.max = val;
        }
    }

    fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

fn continuous(mm: MinMax, axis: AxisKind) -> Scale {
    let domain = if mm.is_empty() {
        (0.0, 1.0)
    } else {
        pad_range(mm.min, mm.max)
    };
    Scale {
        domain,
        kind: ScaleKind::Continuous(axis),
    }
}

fn categorical(categories: Vec<String>) -> Scale {
    let n = categories.len().max(1) as f64;
    Scale {
        domain: (-0.5, n - 0.5),
        kind: ScaleKind::Categorical(categories),
    }
}

/// Categorical axis whose labels read from the top down.
///
/// Stored bottom-up, so category `i` of `categories` sits at `n - 1 - i`.
fn categorical_top_down(mut categories: Vec<String>) -> Scale {
    categories.reverse();
    categorical(categories)
}

fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding, max + padding)
    }
}
