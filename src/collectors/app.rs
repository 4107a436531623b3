use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

pub const MESSAGE_WINDOW_SECS: f64 = 24.0 * 60.0 * 60.0;

#[derive(Debug, Error)]
pub enum AppStatsError {
    #[error("не удалось прочитать журнал сообщений {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("некорректная запись журнала {path}, строка {line}: {source}")]
    Parse {
        path: String,
        line: usize,
        source: serde_json::Error,
    },
    #[error("ошибка источника данных приложения: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentHandle {
    pub name: String,
}

/// Inclusive `[start, end]` range in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn last_24h(now: f64) -> Self {
        Self {
            start: now - MESSAGE_WINDOW_SECS,
            end: now,
        }
    }

    pub fn contains(&self, ts: f64) -> bool {
        ts >= self.start && ts <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageRecord {
    #[serde(alias = "user_id")]
    pub sender_identity: String,
    #[serde(alias = "time")]
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageCounts {
    pub total: u64,
    pub from_bot: u64,
}

pub trait ComponentRegistry: Send + Sync {
    fn active_components(&self) -> Result<Vec<ComponentHandle>, AppStatsError>;
    fn runtime_version(&self) -> String;
}

/// Count-bearing view of the message log. Backends able to aggregate
/// server-side implement this directly.
pub trait MessageStore: Send + Sync {
    fn message_counts(
        &self,
        window: TimeWindow,
        bot_identity: &str,
    ) -> Result<MessageCounts, AppStatsError>;
}

/// Record-level access to the message log.
pub trait MessageSource: Send + Sync {
    fn messages_in_range(&self, start: f64, end: f64) -> Result<Vec<MessageRecord>, AppStatsError>;
}

/// Fetches every record in the window and tallies them locally. Cost grows
/// with message volume.
#[derive(Debug, Clone)]
pub struct ScanningStore<S> {
    source: S,
}

impl<S: MessageSource> ScanningStore<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: MessageSource> MessageStore for ScanningStore<S> {
    fn message_counts(
        &self,
        window: TimeWindow,
        bot_identity: &str,
    ) -> Result<MessageCounts, AppStatsError> {
        let records = self.source.messages_in_range(window.start, window.end)?;
        let counts = tally(&records, window, bot_identity);
        debug!(
            fetched = records.len(),
            total = counts.total,
            from_bot = counts.from_bot,
            "подсчёт сообщений за окно"
        );
        Ok(counts)
    }
}

pub fn tally(records: &[MessageRecord], window: TimeWindow, bot_identity: &str) -> MessageCounts {
    records
        .iter()
        .filter(|r| window.contains(r.timestamp))
        .fold(MessageCounts::default(), |mut acc, r| {
            acc.total += 1;
            if r.sender_identity == bot_identity {
                acc.from_bot += 1;
            }
            acc
        })
}

/// Registry with a fixed component list, for running outside a host
/// application.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    components: Vec<String>,
    runtime_version: String,
}

impl StaticRegistry {
    pub fn new(components: Vec<String>, runtime_version: impl Into<String>) -> Self {
        Self {
            components,
            runtime_version: runtime_version.into(),
        }
    }
}

impl ComponentRegistry for StaticRegistry {
    fn active_components(&self) -> Result<Vec<ComponentHandle>, AppStatsError> {
        Ok(self
            .components
            .iter()
            .map(|name| ComponentHandle { name: name.clone() })
            .collect())
    }

    fn runtime_version(&self) -> String {
        self.runtime_version.clone()
    }
}

/// Message log stored as one JSON object per line. With no path the log is
/// empty.
#[derive(Debug, Clone, Default)]
pub struct JsonLinesLog {
    path: Option<PathBuf>,
}

impl JsonLinesLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl MessageSource for JsonLinesLog {
    fn messages_in_range(&self, start: f64, end: f64) -> Result<Vec<MessageRecord>, AppStatsError> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        let path_display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| AppStatsError::Read {
            path: path_display.clone(),
            source,
        })?;

        let mut out = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: MessageRecord =
                serde_json::from_str(line).map_err(|source| AppStatsError::Parse {
                    path: path_display.clone(),
                    line: idx + 1,
                    source,
                })?;
            if record.timestamp >= start && record.timestamp <= end {
                out.push(record);
            }
        }
        Ok(out)
    }
}
