use std::fs;
use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use sysinfo::{CpuExt, DiskExt, System, SystemExt};
use tracing::debug;

use super::CollectionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

/// A mounted volume as seen at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub mount_point: PathBuf,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

/// Host OS accounting consumed by the collector.
pub trait HostProbe: Send + Sync {
    fn os_type(&self) -> String;
    fn os_version(&self) -> String;
    /// Blocks for `window` to average utilisation over it.
    fn sample_cpu_percent(&self, window: Duration) -> Result<f64, CollectionError>;
    fn memory(&self) -> Result<MemoryUsage, CollectionError>;
    fn volumes(&self) -> Vec<Volume>;
    fn volume_usage(&self, volume: &Volume) -> io::Result<VolumeUsage>;
    /// Unix seconds.
    fn boot_time(&self) -> Result<u64, CollectionError>;
}

/// `HostProbe` backed by `sysinfo`. Every call builds its own `System`, so
/// concurrent reports share nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoHost;

impl HostProbe for SysinfoHost {
    fn os_type(&self) -> String {
        let system = System::new();
        system
            .name()
            .unwrap_or_else(|| std::env::consts::OS.to_string())
    }

    fn os_version(&self) -> String {
        let system = System::new();
        system
            .os_version()
            .or_else(|| system.kernel_version())
            .unwrap_or_default()
    }

    fn sample_cpu_percent(&self, window: Duration) -> Result<f64, CollectionError> {
        let mut system = System::new();
        system.refresh_cpu();
        thread::sleep(window.max(System::MINIMUM_CPU_UPDATE_INTERVAL));
        system.refresh_cpu();

        if system.cpus().is_empty() {
            return Err(CollectionError::Cpu("список CPU пуст".to_string()));
        }
        let usage = system.global_cpu_info().cpu_usage() as f64;
        debug!(cpu_percent = usage, window_ms = window.as_millis() as u64, "замер CPU");
        Ok(usage)
    }

    fn memory(&self) -> Result<MemoryUsage, CollectionError> {
        let mut system = System::new();
        system.refresh_memory();
        let total_bytes = system.total_memory();
        if total_bytes == 0 {
            return Err(CollectionError::Memory(
                "объём памяти не определён".to_string(),
            ));
        }
        Ok(MemoryUsage {
            total_bytes,
            used_bytes: system.used_memory().min(total_bytes),
        })
    }

    fn volumes(&self) -> Vec<Volume> {
        let mut system = System::new();
        system.refresh_disks_list();
        system
            .disks()
            .iter()
            .map(|d| Volume {
                mount_point: d.mount_point().to_path_buf(),
                total_bytes: d.total_space(),
                available_bytes: d.available_space(),
            })
            .collect()
    }

    fn volume_usage(&self, volume: &Volume) -> io::Result<VolumeUsage> {
        fs::metadata(&volume.mount_point)?;
        if volume.total_bytes == 0 {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "том не готов (нулевой объём)",
            ));
        }
        Ok(VolumeUsage {
            total_bytes: volume.total_bytes,
            used_bytes: volume.total_bytes.saturating_sub(volume.available_bytes),
        })
    }

    fn boot_time(&self) -> Result<u64, CollectionError> {
        let system = System::new();
        match system.boot_time() {
            0 => Err(CollectionError::BootTime),
            ts => Ok(ts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unready_volume_reports_not_found() {
        let volume = Volume {
            mount_point: std::env::temp_dir(),
            total_bytes: 0,
            available_bytes: 0,
        };
        let err = SysinfoHost.volume_usage(&volume).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn vanished_mount_point_reports_os_error() {
        let volume = Volume {
            mount_point: PathBuf::from("/definitely/not/mounted/here"),
            total_bytes: 100,
            available_bytes: 40,
        };
        let err = SysinfoHost.volume_usage(&volume).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn used_space_is_total_minus_available() {
        let volume = Volume {
            mount_point: std::env::temp_dir(),
            total_bytes: 100,
            available_bytes: 40,
        };
        let usage = SysinfoHost.volume_usage(&volume).unwrap();
        assert_eq!(usage.used_bytes, 60);
        assert_eq!(usage.total_bytes, 100);
    }
}
