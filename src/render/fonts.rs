use ab_glyph::{FontVec, PxScale};
use font8x8::{UnicodeFonts, BASIC_FONTS, BLOCK_FONTS, BOX_FONTS, LATIN_FONTS};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::FontsConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontRole {
    Title,
    Body,
    Small,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontQuality {
    /// Scalable CJK-capable font.
    Rich,
    /// Built-in bitmap font without CJK glyphs.
    Degraded,
}

/// Everything the drawing primitives need from a font.
pub trait Typeface: Send + Sync {
    /// Width and height in pixels.
    fn measure(&self, role: FontRole, text: &str) -> (u32, u32);
    fn draw(&self, canvas: &mut RgbImage, role: FontRole, text: &str, x: i32, y: i32, color: Rgb<u8>);
}

pub struct FontSet {
    quality: FontQuality,
    face: Box<dyn Typeface>,
}

impl FontSet {
    /// Loads the first usable candidate; falls back to the bitmap font when
    /// none parses.
    pub fn probe(cfg: &FontsConfig) -> Self {
        for path in &cfg.candidates {
            match RichFonts::load(path, cfg) {
                Ok(fonts) => {
                    info!(path = %path.display(), "шрифт загружен");
                    return Self {
                        quality: FontQuality::Rich,
                        face: Box::new(fonts),
                    };
                }
                Err(reason) => {
                    debug!(path = %path.display(), reason = %reason, "шрифт недоступен");
                }
            }
        }
        warn!(
            candidates = cfg.candidates.len(),
            "CJK-шрифт не найден, используется встроенный растровый шрифт"
        );
        Self::degraded()
    }

    pub fn degraded() -> Self {
        Self {
            quality: FontQuality::Degraded,
            face: Box::new(BitmapFonts::default()),
        }
    }

    pub fn quality(&self) -> FontQuality {
        self.quality
    }

    pub fn measure(&self, role: FontRole, text: &str) -> (u32, u32) {
        self.face.measure(role, text)
    }

    pub fn draw(&self, canvas: &mut RgbImage, role: FontRole, text: &str, x: i32, y: i32, color: Rgb<u8>) {
        self.face.draw(canvas, role, text, x, y, color)
    }
}

pub struct RichFonts {
    font: FontVec,
    title: PxScale,
    body: PxScale,
    small: PxScale,
}

impl RichFonts {
    pub fn load(path: &Path, cfg: &FontsConfig) -> Result<Self, String> {
        let data = fs::read(path).map_err(|err| err.to_string())?;
        // Index 0 also covers single-face files; collections use their first face.
        let font = FontVec::try_from_vec_and_index(data, 0).map_err(|err| err.to_string())?;
        Ok(Self {
            font,
            title: PxScale::from(cfg.title_size),
            body: PxScale::from(cfg.body_size),
            small: PxScale::from(cfg.small_size),
        })
    }

    fn scale(&self, role: FontRole) -> PxScale {
        match role {
            FontRole::Title => self.title,
            FontRole::Body => self.body,
            FontRole::Small => self.small,
        }
    }
}

impl Typeface for RichFonts {
    fn measure(&self, role: FontRole, text: &str) -> (u32, u32) {
        text_size(self.scale(role), &self.font, text)
    }

    fn draw(&self, canvas: &mut RgbImage, role: FontRole, text: &str, x: i32, y: i32, color: Rgb<u8>) {
        draw_text_mut(canvas, color, x, y, self.scale(role), &self.font, text);
    }
}

const CELL: u32 = 8;

/// 8x8 bitmap glyphs blown up by an integer factor per role.
#[derive(Debug, Clone, Copy)]
pub struct BitmapFonts {
    title: u32,
    body: u32,
    small: u32,
}

impl Default for BitmapFonts {
    fn default() -> Self {
        Self {
            title: 3,
            body: 2,
            small: 2,
        }
    }
}

impl BitmapFonts {
    fn factor(&self, role: FontRole) -> u32 {
        match role {
            FontRole::Title => self.title,
            FontRole::Body => self.body,
            FontRole::Small => self.small,
        }
    }
}

fn glyph(ch: char) -> Option<[u8; 8]> {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BOX_FONTS.get(ch))
        .or_else(|| BLOCK_FONTS.get(ch))
}

impl Typeface for BitmapFonts {
    fn measure(&self, role: FontRole, text: &str) -> (u32, u32) {
        let side = CELL * self.factor(role);
        (text.chars().count() as u32 * side, side)
    }

    fn draw(&self, canvas: &mut RgbImage, role: FontRole, text: &str, x: i32, y: i32, color: Rgb<u8>) {
        let factor = self.factor(role) as i32;
        let side = CELL as i32 * factor;
        let (width, height) = (canvas.width() as i32, canvas.height() as i32);

        for (idx, ch) in text.chars().enumerate() {
            // Unknown glyphs still take up a cell.
            let Some(rows) = glyph(ch) else {
                continue;
            };
            let origin_x = x + idx as i32 * side;
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..CELL as i32 {
                    if bits & (1 << col) == 0 {
                        continue;
                    }
                    let px = origin_x + col * factor;
                    let py = y + row as i32 * factor;
                    for dy in 0..factor {
                        for dx in 0..factor {
                            let (cx, cy) = (px + dx, py + dy);
                            if (0..width).contains(&cx) && (0..height).contains(&cy) {
                                canvas.put_pixel(cx as u32, cy as u32, color);
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn cfg_with(candidates: Vec<PathBuf>) -> FontsConfig {
        FontsConfig {
            candidates,
            ..FontsConfig::default()
        }
    }

    #[test]
    fn missing_fonts_degrade_instead_of_failing() {
        let fonts = FontSet::probe(&cfg_with(vec![PathBuf::from("/no/such/font.ttc")]));
        assert_eq!(fonts.quality(), FontQuality::Degraded);
        assert_eq!(fonts.measure(FontRole::Body, "42.5%"), (80, 16));
    }

    #[test]
    fn unparsable_font_file_degrades() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not a font").unwrap();
        let fonts = FontSet::probe(&cfg_with(vec![file.path().to_path_buf()]));
        assert_eq!(fonts.quality(), FontQuality::Degraded);
    }

    #[test]
    fn bitmap_sizes_follow_role() {
        let fonts = BitmapFonts::default();
        assert_eq!(fonts.measure(FontRole::Title, "ab"), (48, 24));
        assert_eq!(fonts.measure(FontRole::Small, "abc"), (48, 16));
        assert_eq!(fonts.measure(FontRole::Body, "硬盘 (C:)"), (112, 16));
    }

    #[test]
    fn bitmap_draw_stays_inside_canvas() {
        let mut canvas = RgbImage::from_pixel(20, 10, Rgb([255, 255, 255]));
        let fonts = BitmapFonts::default();
        fonts.draw(&mut canvas, FontRole::Title, "HH", -5, -5, Rgb([0, 0, 0]));
        fonts.draw(&mut canvas, FontRole::Body, "H", 15, 5, Rgb([0, 0, 0]));
        assert!(canvas.pixels().any(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn bitmap_draws_known_glyphs_only() {
        let mut canvas = RgbImage::from_pixel(64, 16, Rgb([255, 255, 255]));
        BitmapFonts::default().draw(&mut canvas, FontRole::Body, "盘", 0, 0, Rgb([0, 0, 0]));
        assert!(canvas.pixels().all(|p| *p == Rgb([255, 255, 255])));

        BitmapFonts::default().draw(&mut canvas, FontRole::Body, "盘I", 0, 0, Rgb([0, 0, 0]));
        let (left, right): (Vec<_>, Vec<_>) = canvas
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == Rgb([0, 0, 0]))
            .partition(|(x, _, _)| *x < 16);
        assert!(left.is_empty());
        assert!(!right.is_empty());
    }
}
