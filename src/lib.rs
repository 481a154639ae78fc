// Library exports for plotselect

pub mod data;
pub mod error;
pub mod export;
pub mod graph;
pub mod kind;
pub mod loader;
pub mod palette;
pub mod resolve;
pub mod runtime;
pub mod session;

// Rendering pipeline: chart -> scales -> scene graph -> canvas
pub mod compiler;
pub mod ir;
pub mod scale;
pub mod transform;

pub use data::{Column, ColumnData, ColumnTag, Table};
pub use error::{BindingError, FormatError};
pub use export::{export_png, Download};
pub use ir::Chart;
pub use kind::{PlotKind, Role};
pub use loader::{load_bytes, load_path, DataFormat};
pub use resolve::{eligible, RoleBinding, RoleOption};
pub use session::{Session, SessionState};

use serde::Deserialize;

/// Raster and typography settings for exported charts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_title_font_size")]
    pub title_font_size: u32,
    #[serde(default = "default_label_font_size")]
    pub label_font_size: u32,
    #[serde(default = "default_font_family")]
    pub font_family: String,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_title_font_size() -> u32 { 20 }
fn default_label_font_size() -> u32 { 14 }
fn default_font_family() -> String { "sans-serif".to_string() }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title_font_size: default_title_font_size(),
            label_font_size: default_label_font_size(),
            font_family: default_font_family(),
        }
    }
}

impl RenderOptions {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.width == 0 || self.height == 0 {
            anyhow::bail!(
                "Image size must be positive (width: {}, height: {})",
                self.width,
                self.height
            );
        }
        if self.title_font_size == 0 || self.label_font_size == 0 {
            anyhow::bail!("Font sizes must be positive");
        }
        Ok(())
    }
}
