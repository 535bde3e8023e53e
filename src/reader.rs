use std::io::{self, BufRead, BufReader, Read};

use crossbeam_channel::{Receiver, Sender};
use tracing::trace;

/// Extra room reserved past the block for the tail of the last line.
const LINE_SLACK: usize = 64;

/// Buffer used only while looking for the end of a block's last line.
/// Block reads larger than this go straight into the chunk.
const TAIL_BUF_SIZE: usize = 8 * 1024;

/// Free-list of chunk buffers shared by the reader and the workers.
///
/// Holds at most `capacity` idle buffers; anything returned past that is
/// dropped.
#[derive(Clone)]
pub struct BufferPool {
    free_tx: Sender<Vec<u8>>,
    free_rx: Receiver<Vec<u8>>,
    buffer_len: usize,
}

impl BufferPool {
    pub fn new(buffer_len: usize, capacity: usize) -> Self {
        let (free_tx, free_rx) = crossbeam_channel::bounded(capacity.max(1));
        Self {
            free_tx,
            free_rx,
            buffer_len,
        }
    }

    pub fn get(&self) -> Vec<u8> {
        self.free_rx
            .try_recv()
            .unwrap_or_else(|_| Vec::with_capacity(self.buffer_len + LINE_SLACK))
    }

    pub fn put(&self, mut buf: Vec<u8>) {
        buf.clear();
        _ = self.free_tx.try_send(buf);
    }

    pub fn idle(&self) -> usize {
        self.free_rx.len()
    }
}

/// Splits a byte stream into line-aligned chunks of at least `block_size`
/// bytes.
pub struct ChunkReader<R> {
    reader: BufReader<R>,
    pool: BufferPool,
    block_size: usize,
    done: bool,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(inner: R, block_size: usize, pool: BufferPool) -> Self {
        Self {
            reader: BufReader::with_capacity(TAIL_BUF_SIZE, inner),
            pool,
            block_size,
            done: false,
        }
    }

    /// Reads the next chunk.
    ///
    /// Returns `Ok(None)` once the stream is exhausted. After an error the
    /// reader must not be polled again.
    pub fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.done {
            return Ok(None);
        }

        let mut buf = self.pool.get();
        let filled = (&mut self.reader)
            .take(self.block_size as u64)
            .read_to_end(&mut buf)?;

        if filled < self.block_size {
            self.done = true;
            if filled == 0 {
                self.pool.put(buf);
                return Ok(None);
            }
        } else if buf.last() != Some(&b'\n') {
            let tail = self.reader.read_until(b'\n', &mut buf)?;
            if tail == 0 {
                self.done = true;
            }
        }

        trace!(len = buf.len(), "chunk read");
        Ok(Some(buf))
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(chunk) => chunk.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
