use serde::Serialize;

/// Point-in-time bundle of host and application metrics, built once per
/// report request and handed to the renderer by value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub os_type: String,
    pub os_version: String,
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub ram_total_gb: f64,
    pub ram_used_gb: f64,
    /// Discovery order; inaccessible volumes are absent.
    pub disks: Vec<DiskInfo>,
    pub uptime: String,
    pub component_count: usize,
    pub runtime_version: String,
    pub total_messages_24h: u64,
    pub bot_messages_24h: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskInfo {
    pub mountpoint: String,
    pub percent: f64,
    pub total_gb: f64,
    pub used_gb: f64,
}

impl DiskInfo {
    pub fn new(mountpoint: impl Into<String>, percent: f64, total_gb: f64, used_gb: f64) -> Self {
        Self {
            mountpoint: mountpoint.into(),
            percent,
            total_gb,
            used_gb,
        }
    }
}

impl StatusSnapshot {
    /// Fixed sample data used by `--preview` and the render tests.
    pub fn preview() -> Self {
        Self {
            os_type: "Windows".to_string(),
            os_version: "11".to_string(),
            cpu_percent: 42.5,
            ram_percent: 60.2,
            ram_total_gb: 31.9,
            ram_used_gb: 19.2,
            disks: vec![
                DiskInfo::new("C:", 75.8, 465.2, 352.8),
                DiskInfo::new("D:", 40.1, 1863.0, 747.1),
            ],
            uptime: "10天 2小时 15分钟".to_string(),
            component_count: 25,
            runtime_version: "3.11.4".to_string(),
            total_messages_24h: 12345,
            bot_messages_24h: 5432,
        }
    }
}

pub fn bytes_to_gb(bytes: u64) -> f64 {
    (bytes as f64) / 1024.0 / 1024.0 / 1024.0
}

pub fn percent(used: f64, total: f64) -> f64 {
    if total <= 0.0 {
        0.0
    } else {
        (used / total) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gigabytes_use_binary_units() {
        assert_eq!(bytes_to_gb(1024 * 1024 * 1024), 1.0);
        assert_eq!(bytes_to_gb(0), 0.0);
    }

    #[test]
    fn percent_of_empty_total_is_zero() {
        assert_eq!(percent(5.0, 0.0), 0.0);
        assert_eq!(percent(1.0, 4.0), 25.0);
    }

    #[test]
    fn snapshot_serializes_field_names() {
        let json = serde_json::to_string(&StatusSnapshot::preview()).unwrap();
        assert!(json.contains("\"cpu_percent\":42.5"));
        assert!(json.contains("\"mountpoint\":\"C:\""));
        assert!(json.contains("\"bot_messages_24h\":5432"));
    }
}
