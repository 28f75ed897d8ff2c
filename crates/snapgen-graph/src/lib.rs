//! # snapgen-graph
//!
//! Pure graph data structures over snapshot bundler metadata.
//!
//! This crate turns the metadata document emitted by the snapshot bundler into
//! a dependency graph and answers the ordering questions the snapshot doctor
//! asks while healing a bundle. It performs no I/O.
//!
//! ## Overview
//!
//! - **[`Metadata`]**: serde model of the bundler's metadata file (inputs,
//!   outputs and the flagged entry point)
//! - **[`ModuleGraph`]**: modules keyed by [`ModuleKey`], each with its ordered
//!   imports and byte size
//! - **[`CircularImports`]**: direct two-node cycles (A imports B, B imports A)
//! - **Ordering**: leaves, stage candidates and leafness sorting
//!
//! ## Quick Start
//!
//! ```rust
//! use snapgen_graph::{CircularImports, Metadata, ModuleGraph};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metadata = Metadata::from_json(r#"{
//!     "inputs": {
//!         "lib/a.js": { "bytes": 10, "imports": [] },
//!         "lib/b.js": { "bytes": 20, "imports": [{ "path": "lib/a.js" }] }
//!     }
//! }"#)?;
//!
//! let graph = ModuleGraph::from_metadata(&metadata)?;
//! let circulars = CircularImports::detect(&graph);
//!
//! assert_eq!(graph.leaves().len(), 1);
//! assert_eq!(graph.sort_by_leafness(&circulars).len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Limitations
//!
//! Circularity is detected by direct pairwise inspection only. Longer cycles
//! (A -> B -> C -> A) are not exempted from staging.

pub mod circular;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod module_key;
mod ordering;
pub mod statistics;

pub use circular::CircularImports;
pub use error::{GraphError, Result};
pub use graph::{ModuleGraph, ModuleNode};
pub use metadata::{FileInfo, ImportRecord, InputEntry, Metadata, OutputEntry, OutputInput};
pub use module_key::ModuleKey;
pub use statistics::GraphStatistics;
