use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle, TextStyle};
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::data::format_datetime;
use crate::ir::{AxisKind, DrawCommand, Scale, ScaleKind, SceneGraph};
use crate::RenderOptions;

type LabelFormatter = Box<dyn Fn(&f64) -> String>;

/// Canvas that rasterises a scene graph into an RGB buffer
pub struct Canvas {
    buffer: Vec<u8>,
    width: u32,
    height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            anyhow::bail!("Cannot create canvas of size {}x{}", width, height);
        }
        let buffer = vec![0u8; width as usize * height as usize * 3];
        Ok(Canvas {
            buffer,
            width,
            height,
        })
    }

    /// Execute every drawing command of the scene
    pub fn draw_scene(&mut self, scene: &SceneGraph, options: &RenderOptions) -> Result<()> {
        if (scene.width, scene.height) != (self.width, self.height) {
            anyhow::bail!(
                "Scene size {}x{} does not match canvas size {}x{}",
                scene.width,
                scene.height,
                self.width,
                self.height
            );
        }

        let root = BitMapBackend::with_buffer(&mut self.buffer, (self.width, self.height))
            .into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        let family = options.font_family.as_str();
        let title_font = FontDesc::new(
            FontFamily::from(family),
            options.title_font_size as f64,
            FontStyle::Normal,
        );
        let label_font = FontDesc::new(
            FontFamily::from(family),
            options.label_font_size as f64,
            FontStyle::Normal,
        );

        let (x0, x1) = scene.x_scale.domain;
        let (y0, y1) = scene.y_scale.domain;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(&scene.title, title_font)
            .x_label_area_size(45)
            .y_label_area_size(70)
            .build_cartesian_2d(x0..x1, y0..y1)
            .context("Failed to build chart")?;

        let x_fmt = label_formatter(&scene.x_scale);
        let y_fmt = label_formatter(&scene.y_scale);
        {
            let mut mesh = chart.configure_mesh();
            mesh.axis_desc_style(label_font.clone());
            if let Some(n) = category_count(&scene.x_scale) {
                mesh.x_labels(n).disable_x_mesh();
            }
            if let Some(n) = category_count(&scene.y_scale) {
                mesh.y_labels(n).disable_y_mesh();
            }
            if let Some(f) = &x_fmt {
                mesh.x_label_formatter(f.as_ref());
            }
            if let Some(f) = &y_fmt {
                mesh.y_label_formatter(f.as_ref());
            }
            if let Some(desc) = &scene.x_label {
                mesh.x_desc(desc);
            }
            if let Some(desc) = &scene.y_label {
                mesh.y_desc(desc);
            }
            mesh.draw().context("Failed to draw mesh")?;
        }

        let mut has_legend = false;
        for command in &scene.commands {
            match command {
                DrawCommand::DrawLine {
                    points,
                    style,
                    legend,
                } => {
                    let color = style.color;
                    let anno = chart
                        .draw_series(LineSeries::new(
                            points.iter().copied(),
                            color.mix(style.alpha).stroke_width(style.width),
                        ))
                        .context("Failed to draw line series")?;
                    if let Some(name) = legend {
                        has_legend = true;
                        anno.label(name.as_str()).legend(move |(x, y)| {
                            PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                        });
                    }
                }
                DrawCommand::DrawPoint {
                    points,
                    style,
                    legend,
                } => {
                    let color = style.color;
                    let size = style.size as i32;
                    let fill = color.mix(style.alpha).filled();
                    let anno = chart
                        .draw_series(points.iter().map(|&p| Circle::new(p, size, fill)))
                        .context("Failed to draw point series")?;
                    if let Some(name) = legend {
                        has_legend = true;
                        anno.label(name.as_str())
                            .legend(move |(x, y)| Circle::new((x + 10, y), size, color.filled()));
                    }
                }
                DrawCommand::DrawRect {
                    tl,
                    br,
                    style,
                    legend,
                } => {
                    let color = style.color;
                    let anno = chart
                        .draw_series(std::iter::once(Rectangle::new(
                            [*tl, *br],
                            color.mix(style.alpha).filled(),
                        )))
                        .context("Failed to draw rectangle")?;
                    if let Some(name) = legend {
                        has_legend = true;
                        anno.label(name.as_str()).legend(move |(x, y)| {
                            Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
                        });
                    }
                    if let Some(border) = style.border {
                        chart
                            .draw_series(std::iter::once(Rectangle::new(
                                [*tl, *br],
                                border.stroke_width(1),
                            )))
                            .context("Failed to draw rectangle border")?;
                    }
                }
                DrawCommand::DrawPolygon {
                    points,
                    style,
                    legend,
                } => {
                    let color = style.color;
                    let anno = chart
                        .draw_series(std::iter::once(Polygon::new(
                            points.clone(),
                            color.mix(style.alpha).filled(),
                        )))
                        .context("Failed to draw polygon")?;
                    if let Some(name) = legend {
                        has_legend = true;
                        anno.label(name.as_str()).legend(move |(x, y)| {
                            Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
                        });
                    }
                    if let (Some(border), Some(first)) = (style.border, points.first()) {
                        let mut outline = points.clone();
                        outline.push(*first);
                        chart
                            .draw_series(std::iter::once(PathElement::new(
                                outline,
                                border.stroke_width(1),
                            )))
                            .context("Failed to draw polygon outline")?;
                    }
                }
                DrawCommand::DrawText { pos, text, color } => {
                    let text_style = TextStyle::from(label_font.clone())
                        .color(color)
                        .pos(Pos::new(HPos::Center, VPos::Center));
                    chart
                        .draw_series(std::iter::once(Text::new(text.clone(), *pos, text_style)))
                        .context("Failed to draw text")?;
                }
            }
        }

        if has_legend {
            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .position(SeriesLabelPosition::UpperRight)
                .draw()
                .context("Failed to draw legend")?;
        }

        root.present().context("Failed to present drawing")?;

        Ok(())
    }

    /// Finalize and encode the canvas as PNG
    pub fn render(self) -> Result<Vec<u8>> {
        let mut png_bytes = Vec::new();
        {
            let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
            encoder
                .write_image(
                    &self.buffer,
                    self.width,
                    self.height,
                    image::ColorType::Rgb8,
                )
                .context("Failed to encode PNG")?;
        }

        Ok(png_bytes)
    }
}

fn category_count(scale: &Scale) -> Option<usize> {
    match &scale.kind {
        ScaleKind::Categorical(categories) => Some(categories.len().max(1)),
        ScaleKind::Continuous(_) => None,
    }
}

/// Tick labels for axes that are not plain numbers.
fn label_formatter(scale: &Scale) -> Option<LabelFormatter> {
    match &scale.kind {
        ScaleKind::Categorical(categories) => {
            let categories = categories.clone();
            Some(Box::new(move |v: &f64| {
                let idx = v.round();
                if (v - idx).abs() > 1e-6 || idx < 0.0 {
                    return String::new();
                }
                categories.get(idx as usize).cloned().unwrap_or_default()
            }))
        }
        ScaleKind::Continuous(AxisKind::Temporal) => Some(Box::new(|v: &f64| {
            chrono::DateTime::from_timestamp(v.round() as i64, 0)
                .map(|t| format_datetime(&t.naive_utc()))
                .unwrap_or_default()
        })),
        ScaleKind::Continuous(AxisKind::Numeric) => None,
    }
}

/// Rasterise a scene graph to PNG bytes
pub fn render_scene(scene: &SceneGraph, options: &RenderOptions) -> Result<Vec<u8>> {
    let mut canvas = Canvas::new(scene.width, scene.height)?;
    canvas.draw_scene(scene, options)?;
    canvas.render()
}
