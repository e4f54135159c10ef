//! Host resource scan policy.
//!
//! Samples memory, aggregate CPU, disk mounts and running processes from
//! `/proc` and `statvfs`, translates each sample against its configured
//! threshold, and feeds the determinations to the report engine. A sampler
//! failure never aborts the scan; the affected target is faulted with a
//! reason describing the inability to obtain stats.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use watchdog_client::{ensure_valid, Reporter, Result, WatchdogError};

use crate::engine::{Health, ReportEngine};
use crate::normalize_prefix;
use crate::units::REASON_NO_STATS;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Parse the `MemAvailable` line of `/proc/meminfo`, in bytes.
fn parse_meminfo_available(text: &str) -> Option<u64> {
    let line = text.lines().find(|l| l.starts_with("MemAvailable:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}

/// Available memory in bytes.
pub fn sample_memory() -> io::Result<u64> {
    let text = std::fs::read_to_string("/proc/meminfo")?;
    parse_meminfo_available(&text)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "no MemAvailable in /proc/meminfo"))
}

/// Aggregate CPU time counters from the `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    busy: u64,
    total: u64,
}

fn parse_cpu_times(text: &str) -> Option<CpuTimes> {
    let line = text.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map_while(|f| f.parse().ok())
        .collect();
    if fields.len() < 4 {
        return None;
    }
    let total: u64 = fields.iter().sum();
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Some(CpuTimes {
        busy: total - idle,
        total,
    })
}

fn utilization_between(prev: CpuTimes, current: CpuTimes) -> f64 {
    let total = current.total.saturating_sub(prev.total);
    if total == 0 {
        return 0.0;
    }
    let busy = current.busy.saturating_sub(prev.busy);
    busy as f64 / total as f64 * 100.0
}

/// Aggregate CPU utilization between successive samples. The first sample
/// measures utilization since boot.
#[derive(Default)]
pub struct CpuSampler {
    prev: Option<CpuTimes>,
}

impl CpuSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Utilization percentage since the previous call.
    pub fn utilization(&mut self) -> io::Result<f64> {
        let text = std::fs::read_to_string("/proc/stat")?;
        let current = parse_cpu_times(&text)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "no cpu line in /proc/stat"))?;
        let prev = self.prev.replace(current).unwrap_or_default();
        Ok(utilization_between(prev, current))
    }
}

/// Free bytes available to unprivileged users on the filesystem at `path`.
#[cfg(unix)]
pub fn sample_disk_free(path: &Path) -> io::Result<u64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let path_cstr = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"))?;
    unsafe {
        let mut stat: libc::statvfs = std::mem::zeroed();
        if libc::statvfs(path_cstr.as_ptr(), &mut stat) == 0 {
            Ok(stat.f_bavail as u64 * stat.f_frsize as u64)
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

#[cfg(not(unix))]
pub fn sample_disk_free(_path: &Path) -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "disk sampling requires a unix host",
    ))
}

/// Names of currently running executables, from `/proc/<pid>/comm`.
pub fn sample_processes() -> io::Result<HashSet<String>> {
    let mut names = HashSet::new();
    for entry in std::fs::read_dir("/proc")? {
        let entry = entry?;
        if !entry.file_name().to_string_lossy().bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        // Processes can exit between readdir and the comm read.
        if let Ok(comm) = std::fs::read_to_string(entry.path().join("comm")) {
            names.insert(comm.trim_end().to_string());
        }
    }
    Ok(names)
}

/// A watched filesystem, from a `dir:name:min_mb` spec.
#[derive(Debug)]
pub struct DiskWatch {
    pub dir: PathBuf,
    pub name: String,
    pub min_mb: f64,
}

impl DiskWatch {
    pub fn parse(spec: &str) -> Result<Self> {
        let parts: Vec<&str> = spec.splitn(3, ':').collect();
        let &[dir, name, min_mb] = parts.as_slice() else {
            return Err(WatchdogError::config(format!(
                "disk spec {spec:?} must be dir:name:min_mb"
            )));
        };
        ensure_valid(name)?;
        let min_mb: f64 = min_mb.parse().map_err(|_| {
            WatchdogError::config(format!("disk spec {spec:?}: {min_mb:?} is not a number"))
        })?;
        Ok(DiskWatch {
            dir: PathBuf::from(dir),
            name: name.to_string(),
            min_mb,
        })
    }
}

/// A watched process, from an `exe[:display]` spec.
pub struct ProcWatch {
    pub exe: String,
    pub display: String,
}

impl ProcWatch {
    pub fn parse(spec: &str) -> Result<Self> {
        let (exe, display) = match spec.split_once(':') {
            Some((exe, display)) => (exe.to_string(), display.to_string()),
            None => (spec.to_string(), spec.to_string()),
        };
        ensure_valid(&display)?;
        Ok(ProcWatch { exe, display })
    }
}

fn mb_reason(bytes: u64) -> (f64, String) {
    let mb = bytes as f64 / BYTES_PER_MB;
    (mb, format!("{mb:.2} MB available"))
}

fn memory_health(sample: io::Result<u64>, min_mb: f64) -> Health {
    match sample {
        Ok(bytes) => {
            let (mb, reason) = mb_reason(bytes);
            if mb > min_mb {
                Health::Healthy
            } else {
                Health::Faulted(reason)
            }
        }
        Err(_) => Health::Faulted(REASON_NO_STATS.to_string()),
    }
}

fn cpu_health(sample: io::Result<f64>, max_percent: f64) -> Health {
    match sample {
        Ok(percent) => {
            if percent < max_percent {
                Health::Healthy
            } else {
                Health::Faulted(format!("{percent:.2} % CPU usage"))
            }
        }
        Err(_) => Health::Faulted(REASON_NO_STATS.to_string()),
    }
}

fn disk_health(sample: io::Result<u64>, min_mb: f64) -> Health {
    match sample {
        Ok(bytes) => {
            let (mb, reason) = mb_reason(bytes);
            if mb > min_mb {
                Health::Healthy
            } else {
                Health::Faulted(reason)
            }
        }
        Err(_) => Health::Faulted(REASON_NO_STATS.to_string()),
    }
}

fn proc_health(running: Option<&HashSet<String>>, exe: &str) -> Health {
    match running {
        Some(names) if names.contains(exe) => Health::Healthy,
        Some(_) => Health::Faulted("not running".to_string()),
        None => Health::Faulted(REASON_NO_STATS.to_string()),
    }
}

/// Scan policy over the host's memory, CPU, disks and processes.
pub struct ResourceMonitor {
    prefix: String,
    min_mem_mb: f64,
    max_cpu_percent: f64,
    disks: Vec<DiskWatch>,
    procs: Vec<ProcWatch>,
    cpu: CpuSampler,
}

impl ResourceMonitor {
    pub fn new(
        prefix: &str,
        min_mem_mb: f64,
        max_cpu_percent: f64,
        disk_specs: &[String],
        proc_specs: &[String],
    ) -> Result<Self> {
        let prefix = normalize_prefix(prefix)?;
        let disks = disk_specs
            .iter()
            .map(|s| DiskWatch::parse(s))
            .collect::<Result<Vec<_>>>()?;
        let procs = proc_specs
            .iter()
            .map(|s| ProcWatch::parse(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(ResourceMonitor {
            prefix,
            min_mem_mb,
            max_cpu_percent,
            disks,
            procs,
            cpu: CpuSampler::new(),
        })
    }

    /// Run one scan over every watched resource.
    pub async fn scan<R: Reporter>(&mut self, engine: &mut ReportEngine<R>) {
        let memory = memory_health(sample_memory(), self.min_mem_mb);
        engine
            .observe(&format!("{}memory", self.prefix), memory)
            .await;

        let cpu = cpu_health(self.cpu.utilization(), self.max_cpu_percent);
        engine.observe(&format!("{}cpu", self.prefix), cpu).await;

        for disk in &self.disks {
            let health = disk_health(sample_disk_free(&disk.dir), disk.min_mb);
            engine
                .observe(&format!("{}disk.{}", self.prefix, disk.name), health)
                .await;
        }

        if !self.procs.is_empty() {
            let running = sample_processes().ok();
            for proc in &self.procs {
                let health = proc_health(running.as_ref(), &proc.exe);
                engine
                    .observe(&format!("{}ps.{}", self.prefix, proc.display), health)
                    .await;
            }
        }
    }
}
