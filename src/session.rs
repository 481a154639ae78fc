//! The single active session: one loaded table plus the current plot
//! selection, advanced through `NoSelection -> RoleBindingPending ->
//! RoleBindingComplete -> Rendered`.
//!
//! A fresh upload creates a new `Session`; nothing is carried over.

use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};

use crate::data::Table;
use crate::error::{BindingError, FormatError};
use crate::export::{export_png, Download};
use crate::ir::Chart;
use crate::kind::{PlotKind, Role};
use crate::loader::load_path;
use crate::resolve::{
    check_role, eligible, eligible_columns, resolve_binding, ResolvedBinding, RoleBinding,
    RoleOption,
};
use crate::runtime::render_chart;
use crate::RenderOptions;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    NoSelection,
    RoleBindingPending {
        kind: PlotKind,
        binding: RoleBinding,
    },
    RoleBindingComplete {
        binding: RoleBinding,
        resolved: ResolvedBinding,
    },
    Rendered {
        binding: RoleBinding,
        resolved: ResolvedBinding,
        chart: Chart,
        download: Download,
    },
}

impl SessionState {
    pub fn kind(&self) -> Option<PlotKind> {
        match self {
            SessionState::NoSelection => None,
            SessionState::RoleBindingPending { kind, .. } => Some(*kind),
            SessionState::RoleBindingComplete { resolved, .. }
            | SessionState::Rendered { resolved, .. } => Some(resolved.kind),
        }
    }

    pub fn binding(&self) -> Option<&RoleBinding> {
        match self {
            SessionState::NoSelection => None,
            SessionState::RoleBindingPending { binding, .. }
            | SessionState::RoleBindingComplete { binding, .. }
            | SessionState::Rendered { binding, .. } => Some(binding),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::NoSelection => "NoSelection",
            SessionState::RoleBindingPending { .. } => "RoleBindingPending",
            SessionState::RoleBindingComplete { .. } => "RoleBindingComplete",
            SessionState::Rendered { .. } => "Rendered",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    table: Table,
    state: SessionState,
}

impl Session {
    pub fn new(table: Table) -> Self {
        info!(
            rows = table.n_rows(),
            columns = table.n_columns(),
            "session started"
        );
        Session {
            table,
            state: SessionState::NoSelection,
        }
    }

    /// Start a session from a file on disk.
    pub fn open(path: &Path) -> Result<Self, FormatError> {
        Ok(Self::new(load_path(path)?))
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn kind(&self) -> Option<PlotKind> {
        self.state.kind()
    }

    /// Select a plot kind, discarding every earlier role choice.
    ///
    /// `None` leaves the session with no selection.
    pub fn select_kind(&mut self, kind: Option<PlotKind>) {
        self.state = SessionState::NoSelection;
        if let Some(kind) = kind {
            self.advance(kind, RoleBinding::default());
        }
    }

    /// Option list for one role of the selected kind.
    pub fn options(&self, role: Role) -> Result<Vec<RoleOption>, BindingError> {
        let kind = self.kind().ok_or(BindingError::NoPlotSelected)?;
        Ok(eligible(&self.table, kind, role))
    }

    /// Bind one role. An invalid choice is rejected and leaves the state as it was.
    ///
    /// The correlation heatmap takes no roles, so any choice is accepted and ignored.
    pub fn bind(&mut self, role: Role, option: RoleOption) -> Result<(), BindingError> {
        let kind = self.kind().ok_or(BindingError::NoPlotSelected)?;
        if kind == PlotKind::CorrelationHeatmap {
            debug!(%kind, %role, "role ignored");
            return Ok(());
        }
        check_role(&self.table, kind, role, &option)?;

        let mut binding = self.state.binding().cloned().unwrap_or_default();
        binding.set(role, option);
        self.advance(kind, binding);
        Ok(())
    }

    /// Bind the first eligible column to every required role still unbound,
    /// the way a fresh dropdown preselects its first entry.
    pub fn fill_defaults(&mut self) -> Result<(), BindingError> {
        let kind = self.kind().ok_or(BindingError::NoPlotSelected)?;
        let mut binding = self.state.binding().cloned().unwrap_or_default();
        for (role, spec) in kind.roles() {
            if spec.optional || binding.get(role).is_some() {
                continue;
            }
            if let Some(first) = eligible_columns(&self.table, kind, role).first() {
                binding.set(role, RoleOption::Column(first.to_string()));
            }
        }
        self.advance(kind, binding);
        Ok(())
    }

    /// Required roles of the selected kind that are still unbound.
    pub fn missing_roles(&self) -> Vec<Role> {
        match &self.state {
            SessionState::RoleBindingPending { kind, binding } => kind
                .roles()
                .into_iter()
                .filter(|(role, spec)| !spec.optional && binding.get(*role).is_none())
                .map(|(role, _)| role)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Render the current binding and keep the chart and its PNG.
    pub fn render(&mut self, options: &RenderOptions) -> Result<()> {
        let (binding, resolved) = match &self.state {
            SessionState::NoSelection => return Err(BindingError::NoPlotSelected.into()),
            SessionState::RoleBindingPending { kind, binding } => {
                let resolved = resolve_binding(&self.table, *kind, binding)?;
                (binding.clone(), resolved)
            }
            SessionState::RoleBindingComplete { binding, resolved }
            | SessionState::Rendered {
                binding, resolved, ..
            } => (binding.clone(), resolved.clone()),
        };

        let chart = render_chart(&self.table, &resolved)?;
        let download = export_png(&chart, options)?;
        self.state = SessionState::Rendered {
            binding,
            resolved,
            chart,
            download,
        };
        Ok(())
    }

    pub fn chart(&self) -> Option<&Chart> {
        match &self.state {
            SessionState::Rendered { chart, .. } => Some(chart),
            _ => None,
        }
    }

    pub fn download(&self) -> Option<&Download> {
        match &self.state {
            SessionState::Rendered { download, .. } => Some(download),
            _ => None,
        }
    }

    fn advance(&mut self, kind: PlotKind, binding: RoleBinding) {
        self.state = match resolve_binding(&self.table, kind, &binding) {
            Ok(resolved) => SessionState::RoleBindingComplete { binding, resolved },
            Err(reason) => {
                debug!(%kind, %reason, "binding pending");
                SessionState::RoleBindingPending { kind, binding }
            }
        };
        debug!(%kind, state = self.state.name(), "selection updated");
    }
}
