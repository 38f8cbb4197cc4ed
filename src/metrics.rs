//! System metrics consumed by the readiness check.
//!
//! [`MetricsSource`] is the seam between the evaluator and the operating
//! system. Production uses [`SystemMetrics`] (memory via `sysinfo`, disk via
//! `statvfs`); tests plug in fixed readings.
//!
//! Both reads are blocking syscalls. [`Sampler`] runs them on tokio's
//! blocking pool, concurrently, each bounded by a deadline. A read that
//! misses the deadline comes back as [`MetricReadError::Timeout`] and keeps
//! running in the background; until it returns, further reads of the same
//! metric fail fast with [`MetricReadError::InProgress`] instead of taking
//! another pool thread. A hung disk therefore holds at most one thread and
//! cannot starve the memory read.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sysinfo::System;

/// Why a metric could not be read. Never fatal: the evaluator turns it into
/// an `error` check.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MetricReadError {
    #[error("{0}")]
    Unavailable(String),

    #[error("no filesystem at {0}")]
    MountNotFound(String),

    #[error("read timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("previous read still in progress")]
    InProgress,

    #[error("metric reader failed: {0}")]
    Join(String),
}

/// Source of utilisation percentages, as of the moment of the call.
pub trait MetricsSource: Send + Sync + 'static {
    /// Percentage of physical memory in use, `0.0..=100.0`.
    fn memory_percent(&self) -> Result<f64, MetricReadError>;

    /// Percentage of the filesystem holding `mount` that is in use.
    fn disk_percent(&self, mount: &Path) -> Result<f64, MetricReadError>;
}

/// Reads live values from the host. Holds no state; every call takes a
/// fresh snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemMetrics;

impl MetricsSource for SystemMetrics {
    fn memory_percent(&self) -> Result<f64, MetricReadError> {
        let mut sys = System::new();
        sys.refresh_memory();

        let total = sys.total_memory();
        if total == 0 {
            return Err(MetricReadError::Unavailable(
                "total memory reported as zero".to_owned(),
            ));
        }
        Ok(sys.used_memory() as f64 / total as f64 * 100.0)
    }

    #[cfg(unix)]
    fn disk_percent(&self, mount: &Path) -> Result<f64, MetricReadError> {
        use nix::errno::Errno;
        use nix::sys::statvfs::statvfs;

        let stat = statvfs(mount).map_err(|e| match e {
            Errno::ENOENT => MetricReadError::MountNotFound(mount.display().to_string()),
            other => MetricReadError::Unavailable(format!("statvfs {}: {other}", mount.display())),
        })?;

        let frsize = stat.fragment_size() as u64;
        disk_usage_percent(
            stat.blocks() as u64 * frsize,
            stat.blocks_free() as u64 * frsize,
            stat.blocks_available() as u64 * frsize,
        )
        .ok_or_else(|| {
            MetricReadError::Unavailable(format!("filesystem at {} reports zero capacity", mount.display()))
        })
    }

    #[cfg(not(unix))]
    fn disk_percent(&self, mount: &Path) -> Result<f64, MetricReadError> {
        Err(MetricReadError::Unavailable(format!(
            "disk usage not supported on this platform ({})",
            mount.display()
        )))
    }
}

/// Usage the way `df` reports it: blocks reserved for root count as neither
/// used nor available. `None` when there is nothing to divide by.
fn disk_usage_percent(total: u64, free: u64, available: u64) -> Option<f64> {
    let used = total.saturating_sub(free);
    let denominator = used + available;
    if denominator == 0 {
        return None;
    }
    Some(used as f64 / denominator as f64 * 100.0)
}

/// One memory reading and one disk reading, taken concurrently.
pub struct Sample {
    pub memory: Result<f64, MetricReadError>,
    pub disk: Result<f64, MetricReadError>,
}

/// Takes bounded samples from a [`MetricsSource`], never more than one
/// outstanding read per metric.
pub struct Sampler<M> {
    source: Arc<M>,
    mount: PathBuf,
    deadline: Duration,
    memory_busy: Arc<AtomicBool>,
    disk_busy: Arc<AtomicBool>,
}

impl<M: MetricsSource> Sampler<M> {
    pub fn new(source: M, mount: PathBuf, deadline: Duration) -> Self {
        Self {
            source: Arc::new(source),
            mount,
            deadline,
            memory_busy: Arc::default(),
            disk_busy: Arc::default(),
        }
    }

    pub async fn sample(&self) -> Sample {
        let memory_source = Arc::clone(&self.source);
        let disk_source = Arc::clone(&self.source);
        let mount = self.mount.clone();

        let (memory, disk) = tokio::join!(
            read_bounded(&self.memory_busy, self.deadline, move || memory_source.memory_percent()),
            read_bounded(&self.disk_busy, self.deadline, move || disk_source.disk_percent(&mount)),
        );
        Sample { memory, disk }
    }
}

/// Marks a metric as being read; cleared when the blocking read returns,
/// panics included.
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(busy: &Arc<AtomicBool>) -> Option<Self> {
        if busy.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self(Arc::clone(busy)))
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn read_bounded<F>(busy: &Arc<AtomicBool>, deadline: Duration, read: F) -> Result<f64, MetricReadError>
where
    F: FnOnce() -> Result<f64, MetricReadError> + Send + 'static,
{
    let Some(in_flight) = InFlight::acquire(busy) else {
        return Err(MetricReadError::InProgress);
    };

    let task = tokio::task::spawn_blocking(move || {
        let _in_flight = in_flight;
        read()
    });

    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(reading)) => reading,
        Ok(Err(join_err)) => Err(MetricReadError::Join(join_err.to_string())),
        Err(_elapsed) => Err(MetricReadError::Timeout {
            after_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow;

    impl MetricsSource for Slow {
        fn memory_percent(&self) -> Result<f64, MetricReadError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(10.0)
        }

        fn disk_percent(&self, _mount: &Path) -> Result<f64, MetricReadError> {
            Ok(20.0)
        }
    }

    struct Broken;

    impl MetricsSource for Broken {
        fn memory_percent(&self) -> Result<f64, MetricReadError> {
            panic!("sensor exploded");
        }

        fn disk_percent(&self, mount: &Path) -> Result<f64, MetricReadError> {
            Err(MetricReadError::MountNotFound(mount.display().to_string()))
        }
    }

    /// Disk read blocks for `disk_delay`; memory answers immediately.
    struct StuckDisk {
        disk_delay: Duration,
    }

    impl MetricsSource for StuckDisk {
        fn memory_percent(&self) -> Result<f64, MetricReadError> {
            Ok(10.0)
        }

        fn disk_percent(&self, _mount: &Path) -> Result<f64, MetricReadError> {
            std::thread::sleep(self.disk_delay);
            Ok(30.0)
        }
    }

    fn sampler<M: MetricsSource>(source: M, deadline: Duration) -> Sampler<M> {
        Sampler::new(source, PathBuf::from("/"), deadline)
    }

    #[test]
    fn disk_usage_excludes_reserved_blocks() {
        // 100 blocks, 50 free, 30 of those available to unprivileged users.
        assert_eq!(disk_usage_percent(100, 50, 30), Some(62.5));
        assert_eq!(disk_usage_percent(100, 100, 100), Some(0.0));
        assert_eq!(disk_usage_percent(100, 0, 0), Some(100.0));
        assert_eq!(disk_usage_percent(0, 0, 0), None);
    }

    #[test]
    fn error_messages_are_human_readable() {
        assert_eq!(
            MetricReadError::MountNotFound("/data".into()).to_string(),
            "no filesystem at /data"
        );
        assert_eq!(
            MetricReadError::Timeout { after_ms: 2000 }.to_string(),
            "read timed out after 2000ms"
        );
        assert_eq!(MetricReadError::InProgress.to_string(), "previous read still in progress");
    }

    #[tokio::test]
    async fn slow_read_times_out_without_blocking_the_other() {
        let sample = sampler(Slow, Duration::from_millis(50)).sample().await;

        assert_eq!(sample.memory, Err(MetricReadError::Timeout { after_ms: 50 }));
        assert_eq!(sample.disk, Ok(20.0));
    }

    #[tokio::test]
    async fn panicking_reader_becomes_a_read_error() {
        let sampler = Sampler::new(Broken, PathBuf::from("/data"), Duration::from_secs(1));
        let sample = sampler.sample().await;

        assert!(matches!(sample.memory, Err(MetricReadError::Join(_))));
        assert_eq!(sample.disk, Err(MetricReadError::MountNotFound("/data".into())));

        // The panic released the in-flight mark.
        assert!(matches!(sampler.sample().await.memory, Err(MetricReadError::Join(_))));
    }

    #[tokio::test]
    async fn outstanding_read_is_not_duplicated() {
        let sampler = sampler(StuckDisk { disk_delay: Duration::from_millis(200) }, Duration::from_millis(20));

        let first = sampler.sample().await;
        assert_eq!(first.disk, Err(MetricReadError::Timeout { after_ms: 20 }));

        let second = sampler.sample().await;
        assert_eq!(second.disk, Err(MetricReadError::InProgress));
        assert_eq!(second.memory, Ok(10.0));

        tokio::time::sleep(Duration::from_millis(400)).await;
        let third = sampler.sample().await;
        assert_eq!(third.disk, Err(MetricReadError::Timeout { after_ms: 20 }));
    }

    #[test]
    fn hung_disk_cannot_exhaust_the_blocking_pool() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(2)
            .enable_time()
            .build()
            .unwrap();

        let sampler = sampler(StuckDisk { disk_delay: Duration::from_secs(3600) }, Duration::from_millis(50));

        runtime.block_on(async {
            for round in 0..8 {
                let sample = sampler.sample().await;
                assert_eq!(sample.memory, Ok(10.0), "round {round}");
                assert!(sample.disk.is_err(), "round {round}");
                if round > 0 {
                    assert_eq!(sample.disk, Err(MetricReadError::InProgress), "round {round}");
                }
            }
        });

        // The stuck read never returns; do not wait for it.
        runtime.shutdown_background();
    }

    #[test]
    fn system_memory_is_a_percentage() {
        if let Ok(p) = SystemMetrics.memory_percent() {
            assert!((0.0..=100.0).contains(&p), "got {p}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn system_disk_reads_root_and_rejects_missing_paths() {
        if let Ok(p) = SystemMetrics.disk_percent(Path::new("/")) {
            assert!((0.0..=100.0).contains(&p), "got {p}");
        }
        assert!(matches!(
            SystemMetrics.disk_percent(Path::new("/definitely/not/mounted/here")),
            Err(MetricReadError::MountNotFound(_))
        ));
    }
}
