pub const MAX_WORKERS: usize = 256;

/// Upper bound for the result channel; tokio rejects capacities past its permit limit
pub const MAX_QUEUE_CAPACITY: usize = 1 << 16;

pub const WORKERS_ENV: &str = "TRIAGE_WORKERS";

/// Folder scans are dominated by small file reads, so oversubscribe the CPUs a little.
pub fn default_worker_count() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus * 2).clamp(1, MAX_WORKERS)
}

pub fn parse_worker_count(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .map_or_else(|| clamp_workers(default_value), clamp_workers)
}

pub fn clamp_workers(workers: usize) -> usize {
    workers.clamp(1, MAX_WORKERS)
}

pub fn clamp_queue_capacity(capacity: usize) -> usize {
    capacity.clamp(1, MAX_QUEUE_CAPACITY)
}

/// Worker count from `TRIAGE_WORKERS`, falling back to [`default_worker_count`]
pub fn worker_count_from_env() -> usize {
    let raw = std::env::var(WORKERS_ENV).ok();
    parse_worker_count(raw.as_deref(), default_worker_count())
}
