use plotters::style::RGBColor;

use crate::kind::PlotKind;

// =============================================================================
// Phase 1: Chart description (renderer output)
// =============================================================================

/// A rendered figure, independent of any drawing backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub kind: PlotKind,
    pub title: String,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub body: ChartBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartBody {
    Boxes(BoxChart),
    Lines(XyChart),
    Points(XyChart),
    Bars(BarChart),
    Histogram(HistogramChart),
    Violins(ViolinChart),
    Heatmap(CorrelationMatrix),
}

/// How values on a continuous axis are labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    Numeric,
    /// Seconds since the Unix epoch, labelled as dates.
    Temporal,
}

/// One hue level's (x, y) points. `key` is `None` when no hue is bound.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub key: Option<String>,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XyChart {
    pub x_axis: AxisKind,
    pub y_axis: AxisKind,
    pub series: Vec<Series>,
}

/// Bars per category, one group per hue level.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub categories: Vec<String>,
    pub groups: Vec<BarGroup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarGroup {
    pub key: Option<String>,
    /// Aligned with `categories`; `None` where the group has no rows.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

/// Boxes per category. When no x is bound there is a single unnamed category.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxChart {
    pub categories: Vec<String>,
    pub groups: Vec<BoxGroup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxGroup {
    pub key: Option<String>,
    pub boxes: Vec<Option<BoxStats>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramChart {
    pub x_axis: AxisKind,
    /// Bin edges; `edges.len() == bin_count() + 1` unless the chart is empty.
    pub edges: Vec<f64>,
    pub groups: Vec<HistogramGroup>,
}

impl HistogramChart {
    pub fn bin_count(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramGroup {
    pub key: Option<String>,
    pub counts: Vec<usize>,
    /// Density curve scaled to counts; empty for groups with fewer than two values.
    pub kde: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViolinStats {
    /// Measurement values the density is sampled at.
    pub grid: Vec<f64>,
    /// Density at each grid value, normalised so the peak is 1.
    pub density: Vec<f64>,
    /// First quartile, median and third quartile.
    pub quartiles: [f64; 3],
}

/// Horizontal violins: measurement on x, categories on y.
#[derive(Debug, Clone, PartialEq)]
pub struct ViolinChart {
    pub categories: Vec<String>,
    pub groups: Vec<ViolinGroup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViolinGroup {
    pub key: Option<String>,
    pub violins: Vec<Option<ViolinStats>>,
}

/// Symmetric matrix of pairwise correlation coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// Row-major; `None` where the coefficient is undefined.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    /// Cell annotation, two decimal places.
    pub fn annotation(&self, row: usize, col: usize) -> String {
        match self.get(row, col) {
            Some(v) => format!("{:.2}", v),
            None => "nan".to_string(),
        }
    }
}

// =============================================================================
// Phase 2: Scaling
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ScaleKind {
    Continuous(AxisKind),
    /// Category `i` sits at position `i`.
    Categorical(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    pub domain: (f64, f64),
    pub kind: ScaleKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelScales {
    pub x: Scale,
    pub y: Scale,
}

// =============================================================================
// Phase 3: Compilation (Scene Graph)
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: RGBColor,
    pub width: u32,
    pub alpha: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointStyle {
    pub color: RGBColor,
    pub size: u32,
    pub alpha: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillStyle {
    pub color: RGBColor,
    pub alpha: f64,
    pub border: Option<RGBColor>,
}

/// A list of primitive drawing commands.
/// The backend executes these blindly.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneGraph {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub x_scale: Scale,
    pub y_scale: Scale,
    pub commands: Vec<DrawCommand>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    DrawLine {
        points: Vec<(f64, f64)>,
        style: LineStyle,
        legend: Option<String>,
    },
    DrawPoint {
        points: Vec<(f64, f64)>,
        style: PointStyle,
        legend: Option<String>,
    },
    DrawRect {
        // Top-Left, Bottom-Right
        tl: (f64, f64),
        br: (f64, f64),
        style: FillStyle,
        legend: Option<String>,
    },
    DrawPolygon {
        points: Vec<(f64, f64)>,
        style: FillStyle,
        legend: Option<String>,
    },
    DrawText {
        pos: (f64, f64),
        text: String,
        color: RGBColor,
    },
}
