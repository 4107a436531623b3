pub mod fonts;
pub mod layout;

use crate::config::{Config, ConfigError};
use crate::snapshot::StatusSnapshot;
use fonts::{FontQuality, FontSet};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use layout::{Element, Palette, ReportLayout};
use std::io::Cursor;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("некорректный размер холста {width}x{height}")]
    Canvas { width: u32, height: u32 },
    #[error("не удалось закодировать PNG: {0}")]
    Encode(#[from] image::ImageError),
}

pub struct Renderer {
    fonts: FontSet,
    palette: Palette,
    title: String,
    footer: String,
}

impl Renderer {
    pub fn new(fonts: FontSet, palette: Palette, title: impl Into<String>, footer: impl Into<String>) -> Self {
        Self {
            fonts,
            palette,
            title: title.into(),
            footer: footer.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let palette = Palette {
            accent: Rgb(cfg.report.accent_rgb()?),
            ..Palette::default()
        };
        Ok(Self::new(
            FontSet::probe(&cfg.fonts),
            palette,
            cfg.report.title.clone(),
            cfg.report.footer.clone(),
        ))
    }

    pub fn font_quality(&self) -> FontQuality {
        self.fonts.quality()
    }

    pub fn layout(&self, snapshot: &StatusSnapshot) -> ReportLayout {
        layout::plan(snapshot, &self.fonts, self.palette, &self.title, &self.footer)
    }

    /// Composes the report and returns it PNG-encoded. No bytes are returned
    /// unless every step succeeds.
    pub fn render(&self, snapshot: &StatusSnapshot) -> Result<Vec<u8>, RenderError> {
        let started = Instant::now();
        let layout = self.layout(snapshot);
        let canvas = self.paint(&layout)?;
        let png = encode_png(&canvas)?;
        debug!(
            width = layout.width,
            height = layout.height,
            bytes = png.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "изображение отрисовано"
        );
        Ok(png)
    }

    pub fn paint(&self, layout: &ReportLayout) -> Result<RgbImage, RenderError> {
        if layout.width == 0 || layout.height == 0 {
            return Err(RenderError::Canvas {
                width: layout.width,
                height: layout.height,
            });
        }
        let mut canvas = RgbImage::from_pixel(layout.width, layout.height, self.palette.background);
        for element in &layout.elements {
            match element {
                Element::Rect {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => {
                    draw_filled_rect_mut(&mut canvas, Rect::at(*x, *y).of_size(*width, *height), *color);
                }
                Element::Text {
                    text,
                    x,
                    y,
                    role,
                    color,
                } => {
                    self.fonts.draw(&mut canvas, *role, text, *x, *y, *color);
                }
            }
        }
        Ok(canvas)
    }
}

fn encode_png(canvas: &RgbImage) -> Result<Vec<u8>, RenderError> {
    let mut buf = Cursor::new(Vec::new());
    canvas.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::DiskInfo;
    use layout::TRACK_HEIGHT;

    fn renderer() -> Renderer {
        Renderer::new(FontSet::degraded(), Palette::default(), "墨狐-Bot 状态", "footer")
    }

    fn accent_run(canvas: &RgbImage, track_x: i32, y: i32) -> u32 {
        let row = (y + TRACK_HEIGHT as i32 - 1) as u32;
        (track_x as u32..track_x as u32 + layout::TRACK_WIDTH)
            .filter(|x| *canvas.get_pixel(*x, row) == Palette::default().accent)
            .count() as u32
    }

    #[test]
    fn output_is_png_of_layout_size() {
        let png = renderer().render(&StatusSnapshot::preview()).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1000, 650));
    }

    #[test]
    fn rendering_is_deterministic() {
        let r = renderer();
        let snapshot = StatusSnapshot::preview();
        let first = r.render(&snapshot).unwrap();
        let second = r.render(&snapshot).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn canvas_grows_with_extra_disks() {
        let mut snapshot = StatusSnapshot::preview();
        snapshot.disks.push(DiskInfo::new("E:", 5.0, 100.0, 5.0));
        let png = renderer().render(&snapshot).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.height(), 695);
    }

    #[test]
    fn painted_fill_matches_geometry() {
        let r = renderer();
        let layout = r.layout(&StatusSnapshot::preview());
        let canvas = r.paint(&layout).unwrap();

        let widths: Vec<u32> = layout
            .bars
            .iter()
            .map(|b| accent_run(&canvas, b.track_x, b.y))
            .collect();
        // 42.5%, 60.2% (240.8px rounds to 241), 75.8%, 40.1%.
        assert_eq!(widths, [170, 241, 303, 160]);
    }

    #[test]
    fn zero_percent_paints_no_fill() {
        let r = renderer();
        let mut snapshot = StatusSnapshot::preview();
        snapshot.cpu_percent = 0.0;
        let layout = r.layout(&snapshot);
        let canvas = r.paint(&layout).unwrap();
        let cpu = &layout.bars[0];
        assert_eq!(accent_run(&canvas, cpu.track_x, cpu.y), 0);
        let track = canvas.get_pixel(cpu.track_x as u32 + 5, (cpu.y + 20) as u32);
        assert_eq!(*track, Palette::default().track);
    }

    #[test]
    fn render_does_not_touch_snapshot() {
        let snapshot = StatusSnapshot::preview();
        let before = snapshot.clone();
        renderer().render(&snapshot).unwrap();
        assert_eq!(snapshot, before);
    }

    #[test]
    fn empty_canvas_is_rejected() {
        let r = renderer();
        let mut layout = r.layout(&StatusSnapshot::preview());
        layout.height = 0;
        assert!(matches!(r.paint(&layout), Err(RenderError::Canvas { .. })));
    }

    #[test]
    fn custom_accent_is_applied() {
        let mut cfg = Config::new("10001");
        cfg.fonts.candidates.clear();
        cfg.report.accent_color = "#FF0000".to_string();
        let r = Renderer::from_config(&cfg).unwrap();
        assert_eq!(r.font_quality(), FontQuality::Degraded);

        let layout = r.layout(&StatusSnapshot::preview());
        let canvas = r.paint(&layout).unwrap();
        let cpu = &layout.bars[0];
        let px = canvas.get_pixel(cpu.track_x as u32 + 1, (cpu.y + 21) as u32);
        assert_eq!(*px, Rgb([255, 0, 0]));
    }
}
