//! Counts distinct IPv4 addresses in large newline-delimited files.
//!
//! The file is streamed in line-aligned chunks over a bounded queue to a
//! pool of worker threads. Each worker parses its lines and marks them in a
//! 2^32-bit matrix sharded by first octet, so memory stays at a fixed
//! 512 MiB plus the in-flight chunks no matter how large the input is.

pub mod config;
pub mod counter;
pub mod error;
pub mod matrix;
pub mod parse;
pub mod reader;

pub use config::CounterConfig;
pub use counter::{count_unique_ipv4, count_unique_ipv4_with, CountReport, Counter, StatsSnapshot};
pub use error::{Error, Result};
pub use matrix::BitMatrix;
pub use parse::{parse_ipv4, ParseError};
pub use reader::{BufferPool, ChunkReader};
