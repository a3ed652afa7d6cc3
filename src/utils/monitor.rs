use std::time::{Duration, Instant};

#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// 單一階段（extract / transform / load）的耗時與記憶體
#[derive(Debug, Clone)]
pub struct PhaseStats {
    pub phase: String,
    pub elapsed: Duration,
    pub memory_mb: Option<u64>,
}

#[cfg(feature = "cli")]
pub struct PhaseMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    phase_start: Mutex<Instant>,
    started: Instant,
    peak_memory_mb: Mutex<u64>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl PhaseMonitor {
    pub fn new(enabled: bool) -> Self {
        let pid = if enabled {
            sysinfo::get_current_pid().ok()
        } else {
            None
        };

        Self {
            system: Mutex::new(System::new()),
            pid,
            phase_start: Mutex::new(Instant::now()),
            started: Instant::now(),
            peak_memory_mb: Mutex::new(0),
            enabled,
        }
    }

    fn current_memory_mb(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        let memory_mb = system.process(pid)?.memory() / 1024 / 1024;

        let mut peak = self.peak_memory_mb.lock().ok()?;
        if memory_mb > *peak {
            *peak = memory_mb;
        }
        Some(memory_mb)
    }

    /// 結束目前階段並開始計時下一階段
    pub fn finish_phase(&self, phase: &str) -> Option<PhaseStats> {
        if !self.enabled {
            return None;
        }

        let mut start = self.phase_start.lock().ok()?;
        let elapsed = start.elapsed();
        *start = Instant::now();
        drop(start);

        let stats = PhaseStats {
            phase: phase.to_string(),
            elapsed,
            memory_mb: self.current_memory_mb(),
        };

        match stats.memory_mb {
            Some(mb) => tracing::info!("📊 {} - {:?}, Memory: {}MB", phase, elapsed, mb),
            None => tracing::info!("📊 {} - {:?}", phase, elapsed),
        }
        Some(stats)
    }

    pub fn log_final_stats(&self) {
        if !self.enabled {
            return;
        }
        let peak = self.peak_memory_mb.lock().map(|p| *p).unwrap_or(0);
        tracing::info!(
            "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
            self.started.elapsed(),
            peak
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl Default for PhaseMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 沒有 sysinfo 時只記錄時間
#[cfg(not(feature = "cli"))]
pub struct PhaseMonitor {
    phase_start: std::sync::Mutex<Instant>,
    started: Instant,
    enabled: bool,
}

#[cfg(not(feature = "cli"))]
impl PhaseMonitor {
    pub fn new(enabled: bool) -> Self {
        Self {
            phase_start: std::sync::Mutex::new(Instant::now()),
            started: Instant::now(),
            enabled,
        }
    }

    pub fn finish_phase(&self, phase: &str) -> Option<PhaseStats> {
        if !self.enabled {
            return None;
        }
        let mut start = self.phase_start.lock().ok()?;
        let elapsed = start.elapsed();
        *start = Instant::now();
        tracing::info!("📊 {} - {:?}", phase, elapsed);
        Some(PhaseStats {
            phase: phase.to_string(),
            elapsed,
            memory_mb: None,
        })
    }

    pub fn log_final_stats(&self) {
        if self.enabled {
            tracing::info!("📊 Final Stats - Total Time: {:?}", self.started.elapsed());
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_reports_nothing() {
        let monitor = PhaseMonitor::new(false);
        assert!(!monitor.is_enabled());
        assert!(monitor.finish_phase("extract").is_none());
    }

    #[test]
    fn test_enabled_monitor_records_phase() {
        let monitor = PhaseMonitor::new(true);
        let stats = monitor.finish_phase("transform").expect("stats when enabled");
        assert_eq!(stats.phase, "transform");
    }
}
