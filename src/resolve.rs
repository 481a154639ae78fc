use serde::{Serialize, Serializer};
use std::fmt;
use tracing::debug;

use crate::data::Table;
use crate::error::BindingError;
use crate::kind::{PlotKind, Role};

/// One entry of a role's option list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleOption {
    None,
    Column(String),
}

impl Serialize for RoleOption {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl RoleOption {
    /// Interpret a user selection. A column with the literal name wins over
    /// the "none" keyword.
    pub fn from_user(selection: &str, table: &Table) -> Self {
        if table.column(selection).is_some() {
            RoleOption::Column(selection.to_string())
        } else if selection.trim().eq_ignore_ascii_case("none") {
            RoleOption::None
        } else {
            RoleOption::Column(selection.to_string())
        }
    }

    pub fn column(&self) -> Option<&str> {
        match self {
            RoleOption::None => None,
            RoleOption::Column(name) => Some(name.as_str()),
        }
    }
}

impl fmt::Display for RoleOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleOption::None => f.write_str("None"),
            RoleOption::Column(name) => f.write_str(name),
        }
    }
}

/// Columns whose tag satisfies the role signature, in table order.
pub fn eligible_columns<'t>(table: &'t Table, kind: PlotKind, role: Role) -> Vec<&'t str> {
    match kind.role_spec(role) {
        Some(spec) => table
            .columns()
            .iter()
            .filter(|c| spec.accepts_tag(c.tag()))
            .map(|c| c.name())
            .collect(),
        None => Vec::new(),
    }
}

/// Option list for a role: "None" first when the role is optional, then the
/// eligible columns. Empty when the kind does not use the role.
pub fn eligible(table: &Table, kind: PlotKind, role: Role) -> Vec<RoleOption> {
    let Some(spec) = kind.role_spec(role) else {
        return Vec::new();
    };
    let mut options = Vec::new();
    if spec.optional {
        options.push(RoleOption::None);
    }
    options.extend(
        eligible_columns(table, kind, role)
            .into_iter()
            .map(|name| RoleOption::Column(name.to_string())),
    );
    options
}

/// Required roles that no column of the table can fill.
pub fn unsatisfiable_roles(table: &Table, kind: PlotKind) -> Vec<Role> {
    kind.roles()
        .into_iter()
        .filter(|(role, spec)| !spec.optional && eligible_columns(table, kind, *role).is_empty())
        .map(|(role, _)| role)
        .collect()
}

/// Concrete column choice for each role of one render request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleBinding {
    pub x: Option<String>,
    pub y: Option<String>,
    pub hue: Option<String>,
}

impl RoleBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x(mut self, column: impl Into<String>) -> Self {
        self.x = Some(column.into());
        self
    }

    pub fn y(mut self, column: impl Into<String>) -> Self {
        self.y = Some(column.into());
        self
    }

    pub fn hue(mut self, column: impl Into<String>) -> Self {
        self.hue = Some(column.into());
        self
    }

    pub fn get(&self, role: Role) -> Option<&str> {
        match role {
            Role::X => self.x.as_deref(),
            Role::Y => self.y.as_deref(),
            Role::Hue => self.hue.as_deref(),
        }
    }

    pub fn set(&mut self, role: Role, option: RoleOption) {
        let value = option.column().map(str::to_string);
        match role {
            Role::X => self.x = value,
            Role::Y => self.y = value,
            Role::Hue => self.hue = value,
        }
    }

    /// What a fresh set of dropdowns shows: the first option of every role.
    pub fn first_options(table: &Table, kind: PlotKind) -> Self {
        let mut binding = Self::default();
        for (role, _) in kind.roles() {
            if let Some(option) = eligible(table, kind, role).into_iter().next() {
                binding.set(role, option);
            }
        }
        binding
    }
}

/// A binding that has been checked against a table and a role signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinding {
    pub kind: PlotKind,
    pub x: Option<String>,
    pub y: Option<String>,
    pub hue: Option<String>,
}

impl ResolvedBinding {
    pub fn get(&self, role: Role) -> Option<&str> {
        match role {
            Role::X => self.x.as_deref(),
            Role::Y => self.y.as_deref(),
            Role::Hue => self.hue.as_deref(),
        }
    }
}

/// Check one role's selection against the signature.
pub fn check_role(
    table: &Table,
    kind: PlotKind,
    role: Role,
    option: &RoleOption,
) -> Result<(), BindingError> {
    let spec = kind
        .role_spec(role)
        .ok_or(BindingError::RoleNotUsed { kind, role })?;

    match option {
        RoleOption::None if spec.optional => Ok(()),
        RoleOption::None => Err(BindingError::RoleBindingIncomplete { kind, role }),
        RoleOption::Column(name) => {
            let column = table
                .column(name)
                .ok_or_else(|| BindingError::UnknownColumn(name.clone()))?;
            if spec.accepts_tag(column.tag()) {
                Ok(())
            } else {
                Err(BindingError::IneligibleColumn {
                    kind,
                    role,
                    column: name.clone(),
                    tag: column.tag(),
                })
            }
        }
    }
}

/// Validate a complete binding for a plot kind.
///
/// Correlation heatmaps ignore bindings entirely.
pub fn resolve_binding(
    table: &Table,
    kind: PlotKind,
    binding: &RoleBinding,
) -> Result<ResolvedBinding, BindingError> {
    if kind == PlotKind::CorrelationHeatmap {
        return Ok(ResolvedBinding {
            kind,
            x: None,
            y: None,
            hue: None,
        });
    }

    for role in Role::ALL {
        let option = match binding.get(role) {
            Some(name) => RoleOption::Column(name.to_string()),
            None if kind.role_spec(role).is_none() => continue,
            None => RoleOption::None,
        };
        check_role(table, kind, role, &option)?;
    }

    debug!(%kind, ?binding, "role binding resolved");
    Ok(ResolvedBinding {
        kind,
        x: binding.x.clone(),
        y: binding.y.clone(),
        hue: binding.hue.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, ColumnData, ColumnTag};

    fn make_table() -> Table {
        Table::from_columns(vec![
            Column::new(
                "category",
                ColumnData::Categorical(vec![Some("A".into()), Some("B".into()), Some("A".into())]),
            ),
            Column::new("value", ColumnData::Numeric(vec![Some(1.0), Some(2.0), Some(3.0)])),
            Column::new(
                "when",
                ColumnData::Temporal(vec![
                    crate::data::parse_datetime("2024-01-01"),
                    crate::data::parse_datetime("2024-01-02"),
                    crate::data::parse_datetime("2024-01-03"),
                ]),
            ),
            Column::new(
                "group",
                ColumnData::Categorical(vec![Some("g".into()), Some("h".into()), Some("g".into())]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_eligible_matches_signature_for_every_kind() {
        let table = make_table();
        for kind in PlotKind::ALL {
            for role in Role::ALL {
                let options = eligible(&table, kind, role);
                match kind.role_spec(role) {
                    None => assert!(options.is_empty()),
                    Some(spec) => {
                        let expected: Vec<RoleOption> = table
                            .columns()
                            .iter()
                            .filter(|c| spec.accepts.contains(&c.tag()))
                            .map(|c| RoleOption::Column(c.name().to_string()))
                            .collect();
                        let has_none = options.first() == Some(&RoleOption::None);
                        assert_eq!(has_none, spec.optional, "{} {}", kind, role);
                        let columns: Vec<RoleOption> =
                            options.into_iter().filter(|o| *o != RoleOption::None).collect();
                        assert_eq!(columns, expected, "{} {}", kind, role);
                    }
                }
            }
        }
    }

    #[test]
    fn test_boxplot_options() {
        let table = make_table();
        assert_eq!(
            eligible(&table, PlotKind::Boxplot, Role::X),
            vec![
                RoleOption::None,
                RoleOption::Column("category".into()),
                RoleOption::Column("group".into())
            ]
        );
        assert_eq!(
            eligible(&table, PlotKind::Boxplot, Role::Y),
            vec![RoleOption::Column("value".into())]
        );
    }

    #[test]
    fn test_line_plot_accepts_temporal_x() {
        let table = make_table();
        assert_eq!(
            eligible_columns(&table, PlotKind::LinePlot, Role::X),
            vec!["value", "when"]
        );
    }

    #[test]
    fn test_unsatisfiable_roles() {
        let table = Table::from_columns(vec![Column::new(
            "label",
            ColumnData::Categorical(vec![Some("a".into())]),
        )])
        .unwrap();
        assert_eq!(unsatisfiable_roles(&table, PlotKind::Barplot), vec![Role::Y]);
        assert_eq!(
            unsatisfiable_roles(&table, PlotKind::Scatterplot),
            vec![Role::X, Role::Y]
        );
        assert!(unsatisfiable_roles(&table, PlotKind::Countplot).is_empty());
        assert!(unsatisfiable_roles(&table, PlotKind::CorrelationHeatmap).is_empty());
    }

    #[test]
    fn test_resolve_binding_ok() {
        let table = make_table();
        let binding = RoleBinding::new().x("category").y("value");
        let resolved = resolve_binding(&table, PlotKind::Barplot, &binding).unwrap();
        assert_eq!(resolved.x.as_deref(), Some("category"));
        assert_eq!(resolved.hue, None);
    }

    #[test]
    fn test_resolve_binding_missing_required() {
        let table = make_table();
        let binding = RoleBinding::new().x("category");
        assert_eq!(
            resolve_binding(&table, PlotKind::Barplot, &binding),
            Err(BindingError::RoleBindingIncomplete {
                kind: PlotKind::Barplot,
                role: Role::Y
            })
        );
    }

    #[test]
    fn test_resolve_binding_boxplot_without_x() {
        let table = make_table();
        let binding = RoleBinding::new().y("value");
        assert!(resolve_binding(&table, PlotKind::Boxplot, &binding).is_ok());
    }

    #[test]
    fn test_resolve_binding_wrong_tag() {
        let table = make_table();
        let binding = RoleBinding::new().x("value").y("value");
        assert_eq!(
            resolve_binding(&table, PlotKind::Barplot, &binding),
            Err(BindingError::IneligibleColumn {
                kind: PlotKind::Barplot,
                role: Role::X,
                column: "value".into(),
                tag: ColumnTag::Numeric,
            })
        );
    }

    #[test]
    fn test_resolve_binding_unknown_column() {
        let table = make_table();
        let binding = RoleBinding::new().x("nope");
        assert_eq!(
            resolve_binding(&table, PlotKind::Countplot, &binding),
            Err(BindingError::UnknownColumn("nope".into()))
        );
    }

    #[test]
    fn test_resolve_binding_unused_role() {
        let table = make_table();
        let binding = RoleBinding::new().x("category").y("value");
        assert_eq!(
            resolve_binding(&table, PlotKind::Countplot, &binding),
            Err(BindingError::RoleNotUsed {
                kind: PlotKind::Countplot,
                role: Role::Y
            })
        );
    }

    #[test]
    fn test_heatmap_ignores_binding() {
        let table = make_table();
        let binding = RoleBinding::new().x("nope");
        let resolved = resolve_binding(&table, PlotKind::CorrelationHeatmap, &binding).unwrap();
        assert_eq!(resolved.x, None);
    }

    #[test]
    fn test_first_options() {
        let table = make_table();
        let binding = RoleBinding::first_options(&table, PlotKind::ViolinPlot);
        assert_eq!(binding.x.as_deref(), Some("value"));
        assert_eq!(binding.y.as_deref(), Some("category"));
        assert_eq!(binding.hue, None);
    }

    #[test]
    fn test_role_option_from_user() {
        let table = make_table();
        assert_eq!(RoleOption::from_user("NONE", &table), RoleOption::None);
        assert_eq!(
            RoleOption::from_user("value", &table),
            RoleOption::Column("value".into())
        );
    }
}
