pub mod app;
pub mod system;

use crate::snapshot::{bytes_to_gb, percent, DiskInfo, StatusSnapshot};
use app::{AppStatsError, ComponentRegistry, MessageStore, TimeWindow};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use system::{HostProbe, Volume};
use thiserror::Error;
use tokio::task::{self, JoinError};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("не удалось измерить загрузку CPU: {0}")]
    Cpu(String),
    #[error("не удалось прочитать сведения о памяти: {0}")]
    Memory(String),
    #[error("не удалось определить время загрузки системы")]
    BootTime,
    #[error("не удалось получить статистику приложения: {0}")]
    AppStats(#[from] AppStatsError),
    #[error("задача сбора завершилась аварийно: {0}")]
    Task(#[from] JoinError),
}

/// Failure to read one volume. Recovered inside the collector.
#[derive(Debug, Error)]
#[error("том {mount} недоступен: {source}")]
pub struct DiskAccessError {
    pub mount: String,
    pub source: io::Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppStats {
    pub component_count: usize,
    pub runtime_version: String,
    pub total_messages_24h: u64,
    pub bot_messages_24h: u64,
}

/// Component registry, message store and bot identity, queried together as
/// one step.
#[derive(Clone)]
pub struct AppStatsSource {
    registry: Arc<dyn ComponentRegistry>,
    store: Arc<dyn MessageStore>,
    bot_identity: String,
}

impl AppStatsSource {
    pub fn new(
        registry: Arc<dyn ComponentRegistry>,
        store: Arc<dyn MessageStore>,
        bot_identity: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            store,
            bot_identity: bot_identity.into(),
        }
    }

    pub fn collect(&self, now_unix: f64) -> Result<AppStats, AppStatsError> {
        let component_count = self.registry.active_components()?.len();
        let counts = self
            .store
            .message_counts(TimeWindow::last_24h(now_unix), &self.bot_identity)?;
        Ok(AppStats {
            component_count,
            runtime_version: self.registry.runtime_version(),
            total_messages_24h: counts.total,
            bot_messages_24h: counts.from_bot,
        })
    }
}

struct HostReading {
    os_type: String,
    os_version: String,
    ram_percent: f64,
    ram_total_gb: f64,
    ram_used_gb: f64,
    disks: Vec<DiskInfo>,
    uptime: String,
}

#[derive(Clone)]
pub struct Collector {
    host: Arc<dyn HostProbe>,
    apps: AppStatsSource,
    cpu_window: Duration,
}

impl Collector {
    pub fn new(host: Arc<dyn HostProbe>, apps: AppStatsSource, cpu_window: Duration) -> Self {
        Self {
            host,
            apps,
            cpu_window,
        }
    }

    pub async fn collect(&self) -> Result<StatusSnapshot, CollectionError> {
        self.collect_at(now_unix()).await
    }

    /// Blocks for at least the CPU sample window. The CPU sample, host read
    /// and application query run side by side; the app query has no upper
    /// bound on latency.
    pub async fn collect_at(&self, now_unix: f64) -> Result<StatusSnapshot, CollectionError> {
        let started = Instant::now();

        let cpu_task = {
            let host = self.host.clone();
            let window = self.cpu_window;
            task::spawn_blocking(move || host.sample_cpu_percent(window))
        };
        let host_task = {
            let host = self.host.clone();
            task::spawn_blocking(move || read_host(host.as_ref(), now_unix))
        };
        let app_task = {
            let apps = self.apps.clone();
            task::spawn_blocking(move || apps.collect(now_unix))
        };

        let (cpu, host, app) = tokio::join!(cpu_task, host_task, app_task);
        let cpu_percent = cpu??;
        let host = host??;
        let app = app??;

        info!(
            disks = host.disks.len(),
            components = app.component_count,
            messages = app.total_messages_24h,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "снимок состояния собран"
        );

        Ok(StatusSnapshot {
            os_type: host.os_type,
            os_version: host.os_version,
            cpu_percent,
            ram_percent: host.ram_percent,
            ram_total_gb: host.ram_total_gb,
            ram_used_gb: host.ram_used_gb,
            disks: host.disks,
            uptime: host.uptime,
            component_count: app.component_count,
            runtime_version: app.runtime_version,
            total_messages_24h: app.total_messages_24h,
            bot_messages_24h: app.bot_messages_24h,
        })
    }
}

fn read_host(host: &dyn HostProbe, now_unix: f64) -> Result<HostReading, CollectionError> {
    let memory = host.memory()?;
    let boot_time = host.boot_time()?;
    let disks = collect_disks(host);
    let uptime_secs = (now_unix.max(0.0) as u64).saturating_sub(boot_time);

    Ok(HostReading {
        os_type: host.os_type(),
        os_version: host.os_version(),
        ram_percent: percent(memory.used_bytes as f64, memory.total_bytes as f64),
        ram_total_gb: bytes_to_gb(memory.total_bytes),
        ram_used_gb: bytes_to_gb(memory.used_bytes),
        disks,
        uptime: format_uptime(uptime_secs),
    })
}

fn collect_disks(host: &dyn HostProbe) -> Vec<DiskInfo> {
    let mut out = Vec::new();
    for volume in host.volumes() {
        match read_volume(host, &volume) {
            Ok(info) => out.push(info),
            Err(err) => match err.source.kind() {
                io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound => {
                    debug!(mount = %err.mount, error = %err.source, "том пропущен");
                }
                _ => {
                    warn!(mount = %err.mount, error = %err.source, "том пропущен");
                }
            },
        }
    }
    out
}

fn read_volume(host: &dyn HostProbe, volume: &Volume) -> Result<DiskInfo, DiskAccessError> {
    let mount = volume.mount_point.to_string_lossy().to_string();
    match host.volume_usage(volume) {
        Ok(usage) => Ok(DiskInfo {
            percent: percent(usage.used_bytes as f64, usage.total_bytes as f64),
            total_gb: bytes_to_gb(usage.total_bytes),
            used_gb: bytes_to_gb(usage.used_bytes),
            mountpoint: mount,
        }),
        Err(source) => Err(DiskAccessError { mount, source }),
    }
}

pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let mins = (secs % 3600) / 60;

    if days > 0 {
        format!("{}天 {}小时 {}分钟", days, hours, mins)
    } else if hours > 0 {
        format!("{}小时 {}分钟", hours, mins)
    } else {
        format!("{}分钟", mins)
    }
}

fn now_unix() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
