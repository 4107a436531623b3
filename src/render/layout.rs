use image::Rgb;

use super::fonts::{FontRole, FontSet};
use crate::snapshot::StatusSnapshot;

pub const CANVAS_WIDTH: u32 = 1000;
pub const BASE_HEIGHT: u32 = 650;
pub const MARGIN_X: i32 = 50;
pub const TITLE_Y: i32 = 40;
pub const VALUE_OFFSET: i32 = 200;
pub const TRACK_WIDTH: u32 = 400;
pub const TRACK_HEIGHT: u32 = 22;
pub const BAR_ROW: i32 = 45;
pub const INFO_ROW: i32 = 40;
pub const AUX_GAP: i32 = 15;
pub const PERCENT_PADDING: f32 = 10.0;
pub const FOOTER_OFFSET: i32 = 40;
/// Disk rows that fit on the base canvas.
pub const BASE_DISK_ROWS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgb<u8>,
    pub primary: Rgb<u8>,
    pub secondary: Rgb<u8>,
    pub track: Rgb<u8>,
    pub accent: Rgb<u8>,
    pub on_accent: Rgb<u8>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgb([255, 255, 255]),
            primary: Rgb([0, 0, 0]),
            secondary: Rgb([50, 50, 50]),
            track: Rgb([230, 230, 230]),
            accent: Rgb([54, 123, 240]),
            on_accent: Rgb([255, 255, 255]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        text: String,
        x: i32,
        y: i32,
        role: FontRole,
        color: Rgb<u8>,
    },
    Rect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Rgb<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarGeometry {
    pub label: String,
    pub track_x: i32,
    pub y: i32,
    pub filled_width: f32,
    pub percent_text: String,
    pub percent_shown: bool,
}

/// Everything needed to paint one report, in painting order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub width: u32,
    pub height: u32,
    pub elements: Vec<Element>,
    pub bars: Vec<BarGeometry>,
}

pub fn canvas_height(disk_count: usize) -> u32 {
    let extra_rows = disk_count.saturating_sub(BASE_DISK_ROWS) as u32;
    BASE_HEIGHT + extra_rows * BAR_ROW as u32
}

pub fn filled_width(percentage: f64) -> f32 {
    if !percentage.is_finite() {
        return 0.0;
    }
    (TRACK_WIDTH as f64 * percentage.clamp(0.0, 100.0) / 100.0) as f32
}

pub fn disk_label(mountpoint: &str) -> String {
    let stripped: String = mountpoint.chars().filter(|c| !matches!(c, '/' | '\\')).collect();
    format!("硬盘 ({stripped})")
}

pub fn gb_pair(used_gb: f64, total_gb: f64) -> String {
    format!("{:.2}GB / {:.2}GB", used_gb, total_gb)
}

struct Planner<'a> {
    fonts: &'a FontSet,
    palette: Palette,
    elements: Vec<Element>,
    bars: Vec<BarGeometry>,
}

impl<'a> Planner<'a> {
    fn text(&mut self, text: impl Into<String>, x: i32, y: i32, role: FontRole, color: Rgb<u8>) {
        self.elements.push(Element::Text {
            text: text.into(),
            x,
            y,
            role,
            color,
        });
    }

    fn rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgb<u8>) {
        if width == 0 || height == 0 {
            return;
        }
        self.elements.push(Element::Rect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn info_line(&mut self, label: &str, value: &str, x: i32, y: i32) {
        self.text(format!("{label}:"), x, y, FontRole::Body, self.palette.secondary);
        self.text(value, x + VALUE_OFFSET, y, FontRole::Body, self.palette.primary);
    }

    fn progress_bar(&mut self, label: &str, percentage: f64, x: i32, y: i32, aux: Option<&str>) {
        let track_x = x + VALUE_OFFSET;
        let fill = filled_width(percentage);

        self.rect(track_x, y, TRACK_WIDTH, TRACK_HEIGHT, self.palette.track);
        self.rect(track_x, y, fill.round() as u32, TRACK_HEIGHT, self.palette.accent);
        self.text(format!("{label}:"), x, y + 2, FontRole::Body, self.palette.secondary);

        let percent_text = format!("{:.1}%", percentage);
        let (text_w, text_h) = self.fonts.measure(FontRole::Body, &percent_text);
        let percent_shown = fill - PERCENT_PADDING >= text_w as f32;
        if percent_shown {
            let text_x = track_x as f32 + (fill - text_w as f32) / 2.0;
            let text_y = y as f32 + (TRACK_HEIGHT as f32 - text_h as f32) / 2.0 - 2.0;
            self.text(
                percent_text.clone(),
                text_x.round() as i32,
                text_y.round() as i32,
                FontRole::Body,
                self.palette.on_accent,
            );
        }

        if let Some(aux) = aux {
            self.text(
                aux,
                track_x + TRACK_WIDTH as i32 + AUX_GAP,
                y + 2,
                FontRole::Body,
                self.palette.secondary,
            );
        }

        self.bars.push(BarGeometry {
            label: label.to_string(),
            track_x,
            y,
            filled_width: fill,
            percent_text,
            percent_shown,
        });
    }
}

/// Lays out the report top to bottom. Pure: same snapshot and fonts, same
/// layout.
pub fn plan(
    snapshot: &StatusSnapshot,
    fonts: &FontSet,
    palette: Palette,
    title: &str,
    footer: &str,
) -> ReportLayout {
    let width = CANVAS_WIDTH;
    let height = canvas_height(snapshot.disks.len());
    let mut p = Planner {
        fonts,
        palette,
        elements: Vec::new(),
        bars: Vec::new(),
    };
    let x = MARGIN_X;

    p.text(title, x, TITLE_Y, FontRole::Title, palette.primary);

    let mut y = 100;
    let os = format!("{} {}", snapshot.os_type, snapshot.os_version);
    p.info_line("操作系统", &os, x, y);
    y += BAR_ROW;
    p.progress_bar("CPU", snapshot.cpu_percent, x, y, None);
    y += BAR_ROW;
    let ram = gb_pair(snapshot.ram_used_gb, snapshot.ram_total_gb);
    p.progress_bar("内存", snapshot.ram_percent, x, y, Some(&ram));
    y += BAR_ROW;

    for disk in &snapshot.disks {
        let aux = gb_pair(disk.used_gb, disk.total_gb);
        p.progress_bar(&disk_label(&disk.mountpoint), disk.percent, x, y, Some(&aux));
        y += BAR_ROW;
    }

    p.info_line("在线时间", &snapshot.uptime, x, y);
    y += 15 + INFO_ROW;

    p.rect(x, y, width - 2 * x as u32, 2, palette.track);
    y += 30;

    p.info_line("运行版本", &snapshot.runtime_version, x, y);
    y += INFO_ROW;
    p.info_line("已加载组件", &snapshot.component_count.to_string(), x, y);
    y += INFO_ROW;
    p.info_line("总消息数 (24h)", &snapshot.total_messages_24h.to_string(), x, y);
    y += INFO_ROW;
    p.info_line("机器人消息 (24h)", &snapshot.bot_messages_24h.to_string(), x, y);

    p.text(
        footer,
        x,
        height as i32 - FOOTER_OFFSET,
        FontRole::Small,
        palette.secondary,
    );

    ReportLayout {
        width,
        height,
        elements: p.elements,
        bars: p.bars,
    }
}
