//! Telemetry for the machine the relay runs on, read through `sysinfo`.
//!
//! Each sample is one JSON object grouped by source:
//!
//! ```text
//! {"cpu":{"usage":12.5,"cores":[10.0,15.0],"temp":null,"core_count":2},
//!  "ram":{"used":5120.0,"total":16384.0,"percent":31.3,"available":11264.0},
//!  "disk":{"used":120.4,"total":476.9,"usage_percent":25.2},
//!  "network":{"upload_speed":3.1,"download_speed":42.7},
//!  "system":{"uptime":86400}}
//! ```
//!
//! Memory is in MB, disk space in GB, network rates in KB/s.  Network rates
//! are deltas since the previous sample, so the first sample reports zero.
//! CPU temperature is not read and is always `null`.

use std::time::Instant;

use serde_json::{json, Value};
use sysinfo::{Disks, Networks, System};

use crate::application::StatsSource;

const MB: f64 = 1024.0 * 1024.0;
const GB: f64 = MB * 1024.0;

pub struct SystemStats {
    system: System,
    networks: Networks,
    disks: Disks,
    last_sample: Instant,
}

impl SystemStats {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self {
            system,
            networks: Networks::new_with_refreshed_list(),
            disks: Disks::new_with_refreshed_list(),
            last_sample: Instant::now(),
        }
    }

    fn cpu(&mut self) -> Value {
        self.system.refresh_cpu_usage();
        let cores: Vec<f64> = self
            .system
            .cpus()
            .iter()
            .map(|cpu| round1(f64::from(cpu.cpu_usage())))
            .collect();
        json!({
            "usage": round1(f64::from(self.system.global_cpu_usage())),
            "core_count": cores.len(),
            "cores": cores,
            "temp": Value::Null,
        })
    }

    fn ram(&mut self) -> Value {
        self.system.refresh_memory();
        let total = self.system.total_memory() as f64;
        let used = self.system.used_memory() as f64;
        json!({
            "used": (used / MB).round(),
            "total": (total / MB).round(),
            "percent": percent(used, total),
            "available": (self.system.available_memory() as f64 / MB).round(),
        })
    }

    /// The system drive, or the first disk listed.
    fn disk(&mut self) -> Value {
        self.disks.refresh();
        let list = self.disks.list();
        let disk = list
            .iter()
            .find(|d| {
                let mount = d.mount_point();
                mount == std::path::Path::new("/") || mount == std::path::Path::new("C:\\")
            })
            .or_else(|| list.first());
        match disk {
            Some(disk) => {
                let total = disk.total_space() as f64;
                let used = total - disk.available_space() as f64;
                json!({
                    "used": round1(used / GB),
                    "total": round1(total / GB),
                    "usage_percent": percent(used, total),
                })
            }
            None => json!({ "used": 0.0, "total": 0.0, "usage_percent": 0.0 }),
        }
    }

    fn network(&mut self, elapsed_secs: f64) -> Value {
        self.networks.refresh();
        let (sent, received) = self
            .networks
            .list()
            .values()
            .fold((0u64, 0u64), |(tx, rx), data| {
                (tx + data.transmitted(), rx + data.received())
            });
        let rate = |bytes: u64| {
            if elapsed_secs > 0.0 {
                round1(bytes as f64 / elapsed_secs / 1024.0)
            } else {
                0.0
            }
        };
        json!({
            "upload_speed": rate(sent),
            "download_speed": rate(received),
        })
    }
}

impl Default for SystemStats {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsSource for SystemStats {
    fn sample(&mut self) -> Value {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_sample).as_secs_f64();
        self.last_sample = now;
        json!({
            "cpu": self.cpu(),
            "ram": self.ram(),
            "disk": self.disk(),
            "network": self.network(elapsed),
            "system": { "uptime": System::uptime() },
        })
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        round1(part / whole * 100.0)
    } else {
        0.0
    }
}
