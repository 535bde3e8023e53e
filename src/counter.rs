use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use memchr::memchr_iter;
use tracing::{debug, warn};

use crate::config::CounterConfig;
use crate::error::{Error, Result};
use crate::matrix::BitMatrix;
use crate::parse::{parse_ipv4, trim_cr};
use crate::reader::{BufferPool, ChunkReader};

/// Longest prefix of a rejected line that gets logged.
const LOGGED_LINE_MAX: usize = 64;

/// Counters collected over one run.
#[derive(Default)]
pub(crate) struct RunStats {
    chunks: AtomicU64,
    bytes: AtomicU64,
    lines: AtomicU64,
    invalid_lines: AtomicU64,
}

impl RunStats {
    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            chunks: self.chunks.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            lines: self.lines.load(Ordering::Relaxed),
            invalid_lines: self.invalid_lines.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub chunks: u64,
    pub bytes: u64,
    pub lines: u64,
    pub invalid_lines: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct CountReport {
    pub unique: u64,
    pub stats: StatsSnapshot,
    pub elapsed: Duration,
}

/// State of a single counting run: the address bitset and the run's
/// statistics. Dropping it releases the bitset.
pub struct Counter {
    config: CounterConfig,
    matrix: BitMatrix,
    stats: RunStats,
    #[cfg(test)]
    line_hook: Option<Box<dyn Fn(&[u8]) + Send + Sync>>,
}

impl Counter {
    pub fn new(config: CounterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            matrix: BitMatrix::new(),
            stats: RunStats::default(),
            #[cfg(test)]
            line_hook: None,
        })
    }

    /// Runs `hook` on every line a worker picks up, before parsing.
    #[cfg(test)]
    fn with_line_hook(mut self, hook: impl Fn(&[u8]) + Send + Sync + 'static) -> Self {
        self.line_hook = Some(Box::new(hook));
        self
    }

    pub fn matrix(&self) -> &BitMatrix {
        &self.matrix
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Feeds every line of `input` through the worker pool and returns the
    /// number of distinct addresses seen by this counter so far.
    ///
    /// The calling thread reads; `config.workers` scoped threads parse.
    ///
    /// The bitset and statistics belong to the `Counter`, not to the call:
    /// feeding a second input keeps counting into the same set. Build a new
    /// `Counter` for an independent run.
    pub fn count_reader<R: Read>(&self, input: R) -> Result<u64> {
        let pool = BufferPool::new(
            self.config.block_size,
            self.config.effective_pool_capacity(),
        );
        let (tx, rx) = crossbeam_channel::bounded::<Vec<u8>>(self.config.queue_capacity);

        thread::scope(|s| {
            let mut handles = Vec::with_capacity(self.config.workers);
            for worker_idx in 0..self.config.workers {
                let rx = rx.clone();
                let pool = pool.clone();
                let handle = thread::Builder::new()
                    .name(format!("ipv4-worker-{worker_idx}"))
                    .spawn_scoped(s, move || self.worker(rx, pool));
                match handle {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        // Workers already running exit once `tx` drops.
                        return Err(Error::Spawn(e));
                    }
                }
            }
            drop(rx);

            let mut reader = ChunkReader::new(input, self.config.block_size, pool.clone());
            let read_result = loop {
                match reader.next_chunk() {
                    Ok(Some(chunk)) => {
                        self.stats.chunks.fetch_add(1, Ordering::Relaxed);
                        self.stats.bytes.fetch_add(chunk.len() as u64, Ordering::Relaxed);
                        if tx.send(chunk).is_err() {
                            // Every worker is gone; the join below reports why.
                            break Ok(());
                        }
                    }
                    Ok(None) => break Ok(()),
                    Err(e) => {
                        debug!("aborting run: {e}");
                        break Err(Error::Read(e));
                    }
                }
            };
            drop(tx);

            let mut panicked = false;
            for handle in handles {
                panicked |= handle.join().is_err();
            }

            read_result?;
            if panicked {
                return Err(Error::WorkerPanicked);
            }
            Ok(self.matrix.unique())
        })
    }

    fn worker(&self, rx: Receiver<Vec<u8>>, pool: BufferPool) {
        #[cfg(feature = "max_thread_priority")]
        if let Err(e) =
            thread_priority::set_current_thread_priority(thread_priority::ThreadPriority::Max)
        {
            warn!("failed to raise worker priority: {e:?}");
        }

        for chunk in rx.iter() {
            self.process_chunk(&chunk);
            pool.put(chunk);
        }
    }

    fn process_chunk(&self, chunk: &[u8]) {
        let mut lines = 0;
        let mut invalid = 0;
        let mut start = 0;

        let mut handle = |line: &[u8]| {
            lines += 1;
            let line = trim_cr(line);
            #[cfg(test)]
            if let Some(hook) = &self.line_hook {
                hook(line);
            }
            match parse_ipv4(line) {
                Ok(address) => {
                    self.matrix.test_and_set(address);
                }
                Err(e) => {
                    invalid += 1;
                    warn!(
                        line = %String::from_utf8_lossy(log_prefix(line)),
                        len = line.len(),
                        "invalid or non-IPv4 address, skipping: {e}"
                    );
                }
            }
        };

        for newline in memchr_iter(b'\n', chunk) {
            handle(&chunk[start..newline]);
            start = newline + 1;
        }
        if start < chunk.len() {
            handle(&chunk[start..]);
        }

        self.stats.lines.fetch_add(lines, Ordering::Relaxed);
        self.stats.invalid_lines.fetch_add(invalid, Ordering::Relaxed);
    }
}

#[inline]
fn log_prefix(line: &[u8]) -> &[u8] {
    &line[..line.len().min(LOGGED_LINE_MAX)]
}

/// Counts distinct IPv4 addresses in the file at `path` with the default
/// configuration.
pub fn count_unique_ipv4(path: impl AsRef<Path>) -> Result<u64> {
    count_unique_ipv4_with(path, &CounterConfig::default()).map(|report| report.unique)
}

pub fn count_unique_ipv4_with(path: impl AsRef<Path>, config: &CounterConfig) -> Result<CountReport> {
    let path = path.as_ref();
    let start = Instant::now();

    let file = File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let counter = Counter::new(config.clone())?;
    debug!(
        path = %path.display(),
        workers = config.workers,
        block_size = config.block_size,
        "counting unique addresses"
    );

    let unique = counter.count_reader(file)?;
    let report = CountReport {
        unique,
        stats: counter.stats(),
        elapsed: start.elapsed(),
    };
    debug!(
        unique,
        lines = report.stats.lines,
        invalid = report.stats.invalid_lines,
        elapsed = ?report.elapsed,
        "run finished"
    );
    Ok(report)
}
