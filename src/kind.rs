//! Plot kinds and their role signatures.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::data::ColumnTag;

const CATEGORICAL: &[ColumnTag] = &[ColumnTag::Categorical];
const NUMERIC: &[ColumnTag] = &[ColumnTag::Numeric];
const CONTINUOUS: &[ColumnTag] = &[ColumnTag::Numeric, ColumnTag::Temporal];

/// A named slot a plot kind binds to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    X,
    Y,
    Hue,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::X, Role::Y, Role::Hue];

    /// Name shown to the user when selecting this role.
    ///
    /// Violin plots put the numeric measurement on the horizontal axis, so
    /// their x and y are presented swapped.
    pub fn ui_label(self, kind: PlotKind) -> &'static str {
        match (kind, self) {
            (PlotKind::ViolinPlot, Role::X) => "y",
            (PlotKind::ViolinPlot, Role::Y) => "x",
            (_, Role::X) => "x",
            (_, Role::Y) => "y",
            (_, Role::Hue) => "hue",
        }
    }

    /// The role a user-facing label refers to for `kind`.
    pub fn from_ui_label(label: &str, kind: PlotKind) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.ui_label(kind) == label)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::X => "x",
            Role::Y => "y",
            Role::Hue => "hue",
        };
        f.write_str(name)
    }
}

/// Required column tags for one role of a plot kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSpec {
    pub accepts: &'static [ColumnTag],
    pub optional: bool,
}

impl RoleSpec {
    const fn required(accepts: &'static [ColumnTag]) -> Self {
        Self {
            accepts,
            optional: false,
        }
    }

    const fn optional(accepts: &'static [ColumnTag]) -> Self {
        Self {
            accepts,
            optional: true,
        }
    }

    pub fn accepts_tag(&self, tag: ColumnTag) -> bool {
        self.accepts.contains(&tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PlotKind {
    Boxplot,
    LinePlot,
    Scatterplot,
    Countplot,
    Histogram,
    Barplot,
    ViolinPlot,
    CorrelationHeatmap,
}

impl PlotKind {
    /// Menu order.
    pub const ALL: [PlotKind; 8] = [
        PlotKind::Boxplot,
        PlotKind::LinePlot,
        PlotKind::Scatterplot,
        PlotKind::Countplot,
        PlotKind::Histogram,
        PlotKind::Barplot,
        PlotKind::ViolinPlot,
        PlotKind::CorrelationHeatmap,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PlotKind::Boxplot => "Boxplot",
            PlotKind::LinePlot => "Line Plot",
            PlotKind::Scatterplot => "Scatterplot",
            PlotKind::Countplot => "Countplot",
            PlotKind::Histogram => "Histogram",
            PlotKind::Barplot => "Barplot",
            PlotKind::ViolinPlot => "Violin Plot",
            PlotKind::CorrelationHeatmap => "Correlation Heatmap",
        }
    }

    /// Command-line name.
    pub fn slug(self) -> &'static str {
        match self {
            PlotKind::Boxplot => "boxplot",
            PlotKind::LinePlot => "line-plot",
            PlotKind::Scatterplot => "scatterplot",
            PlotKind::Countplot => "countplot",
            PlotKind::Histogram => "histogram",
            PlotKind::Barplot => "barplot",
            PlotKind::ViolinPlot => "violin-plot",
            PlotKind::CorrelationHeatmap => "correlation-heatmap",
        }
    }

    /// Role signature. `None` means the kind does not use the role.
    pub fn role_spec(self, role: Role) -> Option<RoleSpec> {
        use PlotKind::*;
        match (self, role) {
            (CorrelationHeatmap, _) => None,
            (_, Role::Hue) => Some(RoleSpec::optional(CATEGORICAL)),

            (Boxplot, Role::X) => Some(RoleSpec::optional(CATEGORICAL)),
            (Boxplot, Role::Y) => Some(RoleSpec::required(NUMERIC)),

            (LinePlot | Scatterplot, Role::X) => Some(RoleSpec::required(CONTINUOUS)),
            (LinePlot | Scatterplot, Role::Y) => Some(RoleSpec::required(CONTINUOUS)),

            (Countplot, Role::X) => Some(RoleSpec::required(CATEGORICAL)),
            (Countplot, Role::Y) => None,

            (Histogram, Role::X) => Some(RoleSpec::required(CONTINUOUS)),
            (Histogram, Role::Y) => None,

            (Barplot, Role::X) => Some(RoleSpec::required(CATEGORICAL)),
            (Barplot, Role::Y) => Some(RoleSpec::required(NUMERIC)),

            (ViolinPlot, Role::X) => Some(RoleSpec::required(NUMERIC)),
            (ViolinPlot, Role::Y) => Some(RoleSpec::required(CATEGORICAL)),
        }
    }

    /// Roles the kind uses, in selection order.
    pub fn roles(self) -> Vec<(Role, RoleSpec)> {
        Role::ALL
            .iter()
            .filter_map(|&role| self.role_spec(role).map(|spec| (role, spec)))
            .collect()
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PlotKind {
    type Err = String;

    /// Accepts the command-line name or the menu label, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PlotKind::ALL
            .iter()
            .copied()
            .find(|k| k.slug().eq_ignore_ascii_case(wanted) || k.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let names: Vec<&str> = PlotKind::ALL.iter().map(|k| k.slug()).collect();
                format!("unknown plot type '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}
