//! Asynchronous File Reading
//!
//! Scene loading never blocks on disk. Reads are enqueued, completed by a
//! background facility and reaped one at a time by polling from the frame
//! loop. Reaping is FIFO: a read that finishes early is held back until
//! every read enqueued before it has been reaped.
//!
//! - [`AsyncFileReader`]: worker threads reading from the file system
//! - [`MemoryReader`]: in-memory files completing after a set number of polls

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use rustc_hash::FxHashMap;

use crate::errors::{Result, ThirtyError};
use crate::settings::SceneSettings;

/// Ticket identifying one enqueued read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReadId(pub u64);

/// A finished read handed back by [`AsyncReader::poll`].
#[derive(Debug)]
pub struct CompletedRead {
    pub id: ReadId,
    pub path: PathBuf,
    pub bytes: std::io::Result<Vec<u8>>,
}

/// Outcome of one poll.
#[derive(Debug)]
pub enum ReadPoll {
    /// Nothing enqueued
    Idle,
    /// Reads are outstanding but the oldest has not finished
    Pending,
    Completed(CompletedRead),
}

/// Collaborator used by the scene loader to fetch files.
pub trait AsyncReader {
    fn enqueue_read(&mut self, path: &Path) -> Result<ReadId>;

    /// Non-blocking; reaps at most one completed read.
    fn poll(&mut self) -> Result<ReadPoll>;

    /// Bytes delivered by the reads reaped so far.
    fn total_size(&self) -> u64;

    /// Reads enqueued but not yet reaped.
    fn in_flight(&self) -> usize;
}

/// FIFO bookkeeping shared by the readers.
#[derive(Debug, Default)]
struct ReapQueue {
    next_id: u64,
    order: VecDeque<ReadId>,
    finished: FxHashMap<ReadId, CompletedRead>,
    total_size: u64,
}

impl ReapQueue {
    fn issue(&mut self) -> ReadId {
        let id = ReadId(self.next_id);
        self.next_id += 1;
        self.order.push_back(id);
        id
    }

    fn finish(&mut self, read: CompletedRead) {
        self.finished.insert(read.id, read);
    }

    fn reap(&mut self) -> ReadPoll {
        let Some(head) = self.order.front().copied() else {
            return ReadPoll::Idle;
        };
        match self.finished.remove(&head) {
            Some(read) => {
                self.order.pop_front();
                if let Ok(bytes) = &read.bytes {
                    self.total_size += bytes.len() as u64;
                }
                log::debug!(
                    "reaped {} ({} bytes)",
                    read.path.display(),
                    read.bytes.as_ref().map_or(0, Vec::len)
                );
                ReadPoll::Completed(read)
            }
            None => ReadPoll::Pending,
        }
    }
}

// ============================================================================
// Thread-backed reader
// ============================================================================

struct Job {
    id: ReadId,
    path: PathBuf,
}

/// Reads files on a pool of worker threads.
///
/// Relative paths are resolved against the root directory given at
/// construction.
pub struct AsyncFileReader {
    root: PathBuf,
    jobs: Option<flume::Sender<Job>>,
    results: flume::Receiver<CompletedRead>,
    workers: Vec<JoinHandle<()>>,
    queue: ReapQueue,
}

impl AsyncFileReader {
    pub fn new(root: impl AsRef<Path>, workers: usize) -> Result<Self> {
        let (job_tx, job_rx) = flume::unbounded::<Job>();
        let (result_tx, result_rx) = flume::unbounded::<CompletedRead>();

        let handles = (0..workers.max(1))
            .map(|i| {
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                std::thread::Builder::new()
                    .name(format!("thirty-io-{i}"))
                    .spawn(move || {
                        while let Ok(job) = jobs.recv() {
                            let bytes = std::fs::read(&job.path);
                            let done = CompletedRead {
                                id: job.id,
                                path: job.path,
                                bytes,
                            };
                            if results.send(done).is_err() {
                                break;
                            }
                        }
                    })
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        Ok(Self {
            root: root.as_ref().to_path_buf(),
            jobs: Some(job_tx),
            results: result_rx,
            workers: handles,
            queue: ReapQueue::default(),
        })
    }

    /// Reader rooted at the settings' asset directory.
    pub fn from_settings(settings: &SceneSettings) -> Result<Self> {
        Self::new(&settings.assets_root, settings.io_workers)
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AsyncReader for AsyncFileReader {
    fn enqueue_read(&mut self, path: &Path) -> Result<ReadId> {
        let jobs = self.jobs.as_ref().ok_or(ThirtyError::ReaderDisconnected)?;
        let id = self.queue.issue();
        let path = self.root.join(path);
        log::debug!("enqueued read of {}", path.display());
        jobs.send(Job { id, path })
            .map_err(|_| ThirtyError::ReaderDisconnected)?;
        Ok(id)
    }

    fn poll(&mut self) -> Result<ReadPoll> {
        loop {
            match self.results.try_recv() {
                Ok(read) => self.queue.finish(read),
                Err(flume::TryRecvError::Empty) => break,
                Err(flume::TryRecvError::Disconnected) => {
                    if self.queue.finished.is_empty() && !self.queue.order.is_empty() {
                        return Err(ThirtyError::ReaderDisconnected);
                    }
                    break;
                }
            }
        }
        Ok(self.queue.reap())
    }

    fn total_size(&self) -> u64 {
        self.queue.total_size
    }

    fn in_flight(&self) -> usize {
        self.queue.order.len()
    }
}

impl Drop for AsyncFileReader {
    fn drop(&mut self) {
        self.jobs.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl std::fmt::Debug for AsyncFileReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFileReader")
            .field("root", &self.root)
            .field("workers", &self.workers.len())
            .field("in_flight", &self.queue.order.len())
            .finish()
    }
}

// ============================================================================
// In-memory reader
// ============================================================================

/// Serves reads from an in-memory file table.
///
/// Each read completes once it has been polled `latency` times, which lets
/// callers exercise deferred loading deterministically. Unknown paths
/// complete with `NotFound`.
#[derive(Debug, Default)]
pub struct MemoryReader {
    files: FxHashMap<PathBuf, Vec<u8>>,
    latency: u32,
    pending: VecDeque<(ReadId, PathBuf, u32)>,
    queue: ReapQueue,
}

impl MemoryReader {
    #[must_use]
    pub fn new(latency: u32) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.files.insert(path.into(), bytes);
    }
}

impl AsyncReader for MemoryReader {
    fn enqueue_read(&mut self, path: &Path) -> Result<ReadId> {
        let id = self.queue.issue();
        self.pending.push_back((id, path.to_path_buf(), self.latency));
        Ok(id)
    }

    fn poll(&mut self) -> Result<ReadPoll> {
        let mut still_pending = VecDeque::with_capacity(self.pending.len());
        while let Some((id, path, remaining)) = self.pending.pop_front() {
            if remaining > 0 {
                still_pending.push_back((id, path, remaining - 1));
                continue;
            }
            let bytes = self.files.get(&path).cloned().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, path.display().to_string())
            });
            self.queue.finish(CompletedRead { id, path, bytes });
        }
        self.pending = still_pending;
        Ok(self.queue.reap())
    }

    fn total_size(&self) -> u64 {
        self.queue.total_size
    }

    fn in_flight(&self) -> usize {
        self.queue.order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reader_latency() {
        let mut r = MemoryReader::new(1);
        r.insert("a.bin", vec![1, 2, 3]);
        let id = r.enqueue_read(Path::new("a.bin")).unwrap();
        assert!(matches!(r.poll().unwrap(), ReadPoll::Pending));
        match r.poll().unwrap() {
            ReadPoll::Completed(read) => {
                assert_eq!(read.id, id);
                assert_eq!(read.bytes.unwrap(), vec![1, 2, 3]);
            }
            other => panic!("expected a completed read, got {other:?}"),
        }
        assert_eq!(r.total_size(), 3);
        assert!(matches!(r.poll().unwrap(), ReadPoll::Idle));
    }

    #[test]
    fn test_reap_order_is_fifo() {
        let mut r = MemoryReader::new(0);
        r.insert("a", vec![0; 4]);
        r.insert("b", vec![0; 8]);
        let a = r.enqueue_read(Path::new("a")).unwrap();
        let b = r.enqueue_read(Path::new("b")).unwrap();
        let mut seen = Vec::new();
        while let ReadPoll::Completed(read) = r.poll().unwrap() {
            seen.push(read.id);
        }
        assert_eq!(seen, vec![a, b]);
        assert_eq!(r.total_size(), 12);
    }

    #[test]
    fn test_missing_file_reports_not_found() {
        let mut r = MemoryReader::new(0);
        r.enqueue_read(Path::new("nope")).unwrap();
        let ReadPoll::Completed(read) = r.poll().unwrap() else {
            panic!("read should complete");
        };
        assert_eq!(read.bytes.unwrap_err().kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_file_reader_reads_from_disk() {
        let dir = std::env::temp_dir().join(format!("thirty-io-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("x.txt"), b"hello").unwrap();

        let mut r = AsyncFileReader::new(&dir, 2).unwrap();
        r.enqueue_read(Path::new("x.txt")).unwrap();
        let read = loop {
            if let ReadPoll::Completed(read) = r.poll().unwrap() {
                break read;
            }
            std::thread::yield_now();
        };
        assert_eq!(read.bytes.unwrap(), b"hello");
        assert_eq!(r.total_size(), 5);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
