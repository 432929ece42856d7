use parking_lot::Mutex;
use sysinfo::{MemoryRefreshKind, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

use super::truncate_chars;
use crate::core::dashboard::{DataSource, MetricPayload, ProcessInfo};
use crate::error::Result;

pub const TOP_PROCESSES: usize = 8;

const MAX_NAME_CHARS: usize = 20;
const MIN_MEMORY_PERCENT: f32 = 1.0;

/// Busiest processes by CPU. CPU figures need two samples, so the first
/// fetch after startup mostly reports memory-heavy processes.
pub struct ProcessesSource {
    system: Mutex<System>,
}

impl ProcessesSource {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_memory(MemoryRefreshKind::nothing().with_ram())
            .with_processes(ProcessRefreshKind::nothing().with_cpu().with_memory());

        Self {
            system: Mutex::new(System::new_with_specifics(refresh_kind)),
        }
    }
}

impl Default for ProcessesSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSource for ProcessesSource {
    fn fetch(&self) -> Result<MetricPayload> {
        let mut system = self.system.lock();
        system.refresh_memory_specifics(MemoryRefreshKind::nothing().with_ram());
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );

        let total_memory = system.total_memory();
        let candidates = system.processes().values().map(|proc| {
            let mem = proc.memory();
            ProcessInfo {
                pid: proc.pid().as_u32(),
                name: proc.name().to_string_lossy().to_string(),
                cpu_percent: proc.cpu_usage(),
                memory_percent: if total_memory > 0 {
                    (mem as f32 / total_memory as f32) * 100.0
                } else {
                    0.0
                },
            }
        });

        Ok(MetricPayload::Processes(top_processes(candidates, TOP_PROCESSES)))
    }
}

/// Keep active processes (any CPU, or more than 1% of RAM), busiest first.
pub fn top_processes(
    processes: impl IntoIterator<Item = ProcessInfo>,
    limit: usize,
) -> Vec<ProcessInfo> {
    let mut active: Vec<ProcessInfo> = processes
        .into_iter()
        .filter(|p| p.cpu_percent > 0.0 || p.memory_percent > MIN_MEMORY_PERCENT)
        .map(|mut p| {
            p.name = truncate_chars(&p.name, MAX_NAME_CHARS);
            p
        })
        .collect();

    active.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
    active.truncate(limit);
    active
}
