//! Host and bot status report rendered to a PNG dashboard.
//!
//! [`StatusReporter::generate_status_image`] collects a [`StatusSnapshot`]
//! and renders it. Collection blocks for the CPU sample window and for
//! however long the message store takes; callers needing a deadline wrap the
//! future in their own timeout.

pub mod collectors;
pub mod config;
pub mod render;
pub mod snapshot;

use collectors::app::{JsonLinesLog, ScanningStore, StaticRegistry};
use collectors::system::SysinfoHost;
use collectors::{AppStatsSource, CollectionError, Collector};
use config::{Config, ConfigError};
use render::{RenderError, Renderer};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub use snapshot::{DiskInfo, StatusSnapshot};

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("сбор состояния не удался: {0}")]
    Collect(#[from] CollectionError),
    #[error("отрисовка не удалась: {0}")]
    Render(#[from] RenderError),
}

pub struct StatusReporter {
    collector: Collector,
    renderer: Renderer,
}

impl StatusReporter {
    pub fn new(collector: Collector, renderer: Renderer) -> Self {
        Self {
            collector,
            renderer,
        }
    }

    /// Wires the sysinfo host, the configured component list and the
    /// JSON-lines message log.
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let apps = AppStatsSource::new(
            Arc::new(StaticRegistry::new(
                cfg.app.components.clone(),
                cfg.app.runtime_version.clone(),
            )),
            Arc::new(ScanningStore::new(JsonLinesLog::new(cfg.app.message_log.clone()))),
            cfg.bot_identity.clone(),
        );
        let collector = Collector::new(Arc::new(SysinfoHost), apps, cfg.cpu_sample_window()?);
        Ok(Self::new(collector, Renderer::from_config(cfg)?))
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub async fn generate_status_image(&self) -> Result<Vec<u8>, StatusError> {
        let snapshot = self.collector.collect().await?;
        let png = self.renderer.render(&snapshot)?;
        info!(bytes = png.len(), disks = snapshot.disks.len(), "изображение состояния готово");
        Ok(png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collectors::testing::{collector, message, FakeHost, NOW};
    use render::fonts::FontSet;
    use render::layout::Palette;

    fn reporter(host: FakeHost) -> StatusReporter {
        StatusReporter::new(
            collector(host, vec![message("bot", NOW)]),
            Renderer::new(FontSet::degraded(), Palette::default(), "title", "footer"),
        )
    }

    #[tokio::test]
    async fn generates_png_end_to_end() {
        let png = reporter(FakeHost::default())
            .generate_status_image()
            .await
            .expect("отчёт должен сформироваться");
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1000, 650));
    }

    #[tokio::test]
    async fn collection_failure_surfaces_without_image() {
        let host = FakeHost {
            boot_time: 0,
            ..FakeHost::default()
        };
        let err = reporter(host).generate_status_image().await.unwrap_err();
        assert!(matches!(err, StatusError::Collect(CollectionError::BootTime)));
    }

    #[test]
    fn wires_from_config() {
        let mut cfg = Config::new("10001");
        cfg.fonts.candidates.clear();
        let reporter = StatusReporter::from_config(&cfg).expect("сборка из конфигурации");
        assert_eq!(
            reporter.renderer().font_quality(),
            render::fonts::FontQuality::Degraded
        );
    }
}
