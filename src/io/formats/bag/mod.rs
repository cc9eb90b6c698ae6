// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! BAG format implementation.
//!
//! - [`parser`]: record-level parsing of the memory-mapped file
//! - [`reader`]: sequential record stream over selected connections
//! - [`writer`]: chunked writer with optional compression

// Parser utilities
pub mod parser;

// Sequential reader implementation
pub mod reader;

// Writer implementation
pub mod writer;

// Re-exports
pub use parser::{BagChunkInfo, BagHeader, BagParser, IndexEntry};
pub use reader::{BagMessageIter, BagReader};
pub use writer::{BagMessage, BagWriter, Compression};
