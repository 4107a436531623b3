use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub bot_identity: String,
    #[serde(default = "default_cpu_sample_window")]
    pub cpu_sample_window: String,
    #[serde(default)]
    pub fonts: FontsConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub app: AppConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FontsConfig {
    #[serde(default = "default_font_candidates")]
    pub candidates: Vec<PathBuf>,
    #[serde(default = "default_title_size")]
    pub title_size: f32,
    #[serde(default = "default_body_size")]
    pub body_size: f32,
    #[serde(default = "default_small_size")]
    pub small_size: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_footer")]
    pub footer: String,
    #[serde(default = "default_accent_color")]
    pub accent_color: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_runtime_version")]
    pub runtime_version: String,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub message_log: Option<PathBuf>,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            candidates: default_font_candidates(),
            title_size: default_title_size(),
            body_size: default_body_size(),
            small_size: default_small_size(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            footer: default_footer(),
            accent_color: default_accent_color(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            runtime_version: default_runtime_version(),
            components: Vec::new(),
            message_log: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("не удалось прочитать файл конфигурации {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("не удалось разобрать YAML в {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("ошибка валидации конфигурации: {0}")]
    Validation(String),
}

impl Config {
    pub fn new(bot_identity: impl Into<String>) -> Self {
        Self {
            bot_identity: bot_identity.into(),
            cpu_sample_window: default_cpu_sample_window(),
            fonts: FontsConfig::default(),
            report: ReportConfig::default(),
            app: AppConfig::default(),
        }
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_identity.trim().is_empty() {
            return Err(ConfigError::Validation(
                "поле bot_identity обязательно".to_string(),
            ));
        }

        let window = self.cpu_sample_window()?;
        if window < Duration::from_millis(100) || window > Duration::from_secs(10) {
            return Err(ConfigError::Validation(
                "cpu_sample_window должно быть в диапазоне 100ms..10s".to_string(),
            ));
        }

        validate_fonts(&self.fonts)?;
        validate_report(&self.report)?;

        Ok(())
    }

    pub fn cpu_sample_window(&self) -> Result<Duration, ConfigError> {
        humantime::parse_duration(self.cpu_sample_window.trim()).map_err(|err| {
            ConfigError::Validation(format!(
                "cpu_sample_window '{}' не является длительностью: {err}",
                self.cpu_sample_window
            ))
        })
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

impl ReportConfig {
    pub fn accent_rgb(&self) -> Result<[u8; 3], ConfigError> {
        parse_hex_color(&self.accent_color).ok_or_else(|| {
            ConfigError::Validation(format!(
                "report.accent_color '{}' должен быть в формате #RRGGBB",
                self.accent_color
            ))
        })
    }
}

fn validate_fonts(cfg: &FontsConfig) -> Result<(), ConfigError> {
    for (name, size) in [
        ("title_size", cfg.title_size),
        ("body_size", cfg.body_size),
        ("small_size", cfg.small_size),
    ] {
        if !size.is_finite() || size <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "fonts.{name} должно быть > 0"
            )));
        }
    }
    Ok(())
}

fn validate_report(cfg: &ReportConfig) -> Result<(), ConfigError> {
    if cfg.title.trim().is_empty() {
        return Err(ConfigError::Validation(
            "report.title не должен быть пустым".to_string(),
        ));
    }
    cfg.accent_rgb()?;
    Ok(())
}

fn parse_hex_color(input: &str) -> Option<[u8; 3]> {
    let hex = input.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

fn default_cpu_sample_window() -> String {
    "1s".to_string()
}

fn default_font_candidates() -> Vec<PathBuf> {
    [
        "msyh.ttc",
        "C:/Windows/Fonts/msyh.ttc",
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
        "/System/Library/Fonts/PingFang.ttc",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

const fn default_title_size() -> f32 {
    32.0
}

const fn default_body_size() -> f32 {
    18.0
}

const fn default_small_size() -> f32 {
    15.0
}

fn default_title() -> String {
    "墨狐-Bot 状态".to_string()
}

fn default_footer() -> String {
    "由 墨狐工作室 提供支持".to_string()
}

fn default_accent_color() -> String {
    "#367BF0".to_string()
}

fn default_runtime_version() -> String {
    format!("bot-status {}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn example_config_is_valid() {
        let cfg: Config = serde_yaml::from_str(Config::example_yaml()).expect("разбор примера");
        cfg.validate().expect("пример конфигурации должен быть валидным");
        assert_eq!(cfg.cpu_sample_window().unwrap(), Duration::from_secs(1));
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let cfg: Config = serde_yaml::from_str("bot_identity: \"10001\"\n").unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.fonts.title_size, 32.0);
        assert_eq!(cfg.fonts.body_size, 18.0);
        assert_eq!(cfg.fonts.small_size, 15.0);
        assert_eq!(cfg.report.accent_rgb().unwrap(), [54, 123, 240]);
        assert!(cfg.app.message_log.is_none());
    }

    #[test]
    fn rejects_empty_bot_identity() {
        let cfg = Config::new("  ");
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_bad_sample_window() {
        let mut cfg = Config::new("10001");
        cfg.cpu_sample_window = "soon".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));

        cfg.cpu_sample_window = "30s".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));

        cfg.cpu_sample_window = "500ms".to_string();
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_bad_accent_color() {
        let mut cfg = Config::new("10001");
        cfg.report.accent_color = "blue".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));

        cfg.report.accent_color = "#12345G".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_non_positive_font_size() {
        let mut cfg = Config::new("10001");
        cfg.fonts.body_size = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bot_identity: [unterminated").unwrap();
        let err = Config::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let missing = Config::load_from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }

    #[test]
    fn load_from_file_reads_app_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "bot_identity: \"42\"\napp:\n  runtime_version: \"3.11.4\"\n  components: [a, b, c]\n  message_log: /tmp/messages.jsonl"
        )
        .unwrap();
        let cfg = Config::load_from_file(file.path()).expect("загрузка конфигурации");
        assert_eq!(cfg.app.runtime_version, "3.11.4");
        assert_eq!(cfg.app.components.len(), 3);
        assert_eq!(
            cfg.app.message_log.as_deref(),
            Some(Path::new("/tmp/messages.jsonl"))
        );
    }
}
