//! Chart to downloadable PNG.

use anyhow::{Context, Result};
use tracing::info;

use crate::compiler::compile_chart;
use crate::graph::render_scene;
use crate::ir::Chart;
use crate::scale::build_scales;
use crate::RenderOptions;

pub const DOWNLOAD_FILE_NAME: &str = "plot.png";
pub const MIME_TYPE: &str = "image/png";

/// An exported image offered as a file download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Rasterise a chart and encode it as PNG.
///
/// Fails only for invalid options or a malformed chart, such as group
/// vectors that do not line up with their categories.
pub fn export_png(chart: &Chart, options: &RenderOptions) -> Result<Download> {
    options.validate()?;
    let scales = build_scales(chart);
    let scene = compile_chart(chart, &scales, options).context("Failed to compile chart")?;
    let bytes = render_scene(&scene, options).context("Failed to render chart")?;
    info!(
        title = %chart.title,
        width = options.width,
        height = options.height,
        bytes = bytes.len(),
        "chart exported"
    );
    Ok(Download {
        file_name: DOWNLOAD_FILE_NAME.to_string(),
        mime: MIME_TYPE.to_string(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BarChart, BarGroup, ChartBody};
    use crate::kind::PlotKind;

    fn bar_chart(values: Vec<Option<f64>>) -> Chart {
        Chart {
            kind: PlotKind::Barplot,
            title: "Barplot of value per category".into(),
            x_label: Some("category".into()),
            y_label: Some("value".into()),
            body: ChartBody::Bars(BarChart {
                categories: vec!["A".into(), "B".into()],
                groups: vec![BarGroup { key: None, values }],
            }),
        }
    }

    #[test]
    fn test_export_png_metadata() {
        let download = export_png(&bar_chart(vec![Some(2.0), Some(2.0)]), &RenderOptions::default())
            .unwrap();
        assert_eq!(download.file_name, "plot.png");
        assert_eq!(download.mime, "image/png");
        assert_eq!(&download.bytes[0..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[test]
    fn test_export_rejects_malformed_chart() {
        assert!(export_png(&bar_chart(vec![Some(1.0)]), &RenderOptions::default()).is_err());
    }

    #[test]
    fn test_export_rejects_zero_size() {
        let options = RenderOptions {
            width: 0,
            ..RenderOptions::default()
        };
        assert!(export_png(&bar_chart(vec![Some(1.0), None]), &options).is_err());
    }
}
