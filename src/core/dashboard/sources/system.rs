use std::path::Path;

use parking_lot::Mutex;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, RefreshKind, System};

use crate::core::dashboard::history::History;
use crate::core::dashboard::{DataSource, MetricPayload, SystemHealth};
use crate::error::Result;

struct SystemState {
    system: System,
    disks: Disks,
    cpu_history: History<f32>,
    ram_history: History<f32>,
}

/// CPU, memory, root disk, load and uptime, with CPU/RAM history.
pub struct SystemHealthSource {
    state: Mutex<SystemState>,
}

impl SystemHealthSource {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());

        Self {
            state: Mutex::new(SystemState {
                system: System::new_with_specifics(refresh_kind),
                disks: Disks::new_with_refreshed_list(),
                cpu_history: History::new(),
                ram_history: History::new(),
            }),
        }
    }
}

impl Default for SystemHealthSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSource for SystemHealthSource {
    fn fetch(&self) -> Result<MetricPayload> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        state.system.refresh_cpu_usage();
        state.system.refresh_memory_specifics(MemoryRefreshKind::nothing().with_ram());
        state.disks.refresh(true);

        let cpu_percent = state.system.global_cpu_usage();
        let total = state.system.total_memory();
        let used = state.system.used_memory();
        let ram_percent = percent(used, total);

        let (disk_percent, disk_free_bytes) = root_disk_usage(
            state
                .disks
                .iter()
                .map(|d| (d.mount_point(), d.total_space(), d.available_space())),
        );

        state.cpu_history.push(cpu_percent);
        state.ram_history.push(ram_percent);

        let load = System::load_average();

        Ok(MetricPayload::SystemHealth(SystemHealth {
            cpu_percent,
            ram_percent,
            ram_used_bytes: used,
            ram_total_bytes: total,
            disk_percent,
            disk_free_bytes,
            load_average: (load.one, load.five, load.fifteen),
            uptime_secs: System::uptime(),
            cpu_history: state.cpu_history.to_vec(),
            ram_history: state.ram_history.to_vec(),
        }))
    }
}

fn percent(used: u64, total: u64) -> f32 {
    if total > 0 {
        (used as f32 / total as f32) * 100.0
    } else {
        0.0
    }
}

/// Usage of the `/` mount, or of the first disk when there is none.
fn root_disk_usage<'a>(disks: impl Iterator<Item = (&'a Path, u64, u64)>) -> (f32, u64) {
    let mut first = None;
    for (mount, total, available) in disks {
        if mount == Path::new("/") {
            first = Some((total, available));
            break;
        }
        first.get_or_insert((total, available));
    }

    match first {
        Some((total, available)) => (percent(total.saturating_sub(available), total), available),
        None => (0.0, 0),
    }
}
