//! # mbtk-rs: Markov blanket discovery in Rust
//!
//! **`mbtk-rs`** finds the Markov blanket of a target variable: the minimal
//! set of variables that renders the target conditionally independent of all
//! the others. It works either on a dataset of categorical observations or on
//! a known causal graph used as ground truth.
//!
//! ## Key Features
//!
//! - **Interchangeable CI tests**: every backend implements [`CiTest`][crate::ci::CiTest].
//!   The G-test comes in three flavours (per-query counting, a count index, a
//!   joint entropy cache) that agree on every query; d-separation answers exactly from a graph.
//! - **Degrees of freedom**: unadjusted, structural (counting observed values
//!   only), and a structural variant caching pairwise DoF per variable set across queries.
//! - **Persistence**: count index, entropy cache, DoF cache and result logs
//!   are saved as JSON under advisory file locks and reloaded across runs.
//! - **IPC-MB**: [`AlgorithmIpcmb`][crate::ipcmb::AlgorithmIpcmb] drives any
//!   backend and treats "not enough samples" as a value, never as a failure.
//!
//! ## Basic Usage
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use mbtk_rs::ci::CiTestKind;
//! use mbtk_rs::graph::DirectedGraph;
//! use mbtk_rs::ipcmb::AlgorithmIpcmb;
//! use mbtk_rs::params::Parameters;
//!
//! // 0 -> 1 <- 4, 1 -> 2 -> 5, 1 -> 3 -> 5
//! let graph = DirectedGraph::from_edges([(0, 1), (4, 1), (1, 2), (1, 3), (2, 5), (3, 5)]);
//! let params = Parameters::new(3, CiTestKind::DSeparation).with_source_bayesian_network(Rc::new(graph));
//!
//! let mut ipcmb = AlgorithmIpcmb::new(&params, None)?;
//! assert_eq!(ipcmb.discover_mb()?, vec![1, 2, 5]);
//! # Ok::<(), mbtk_rs::error::Error>(())
//! ```
//!
//! ## Core Components
//!
//! - **[`ci`]**: CI test backends and the per-query [`CiTestResult`][crate::ci::CiTestResult] log.
//! - **[`dof`]**: degrees-of-freedom calculators.
//! - **[`pmf`]**, **[`infotheory`]**: the probability and entropy primitives behind the G-test.
//! - **[`ipcmb`]**: the search itself.

pub mod ci;
pub mod count_index;
pub mod dataset;
pub mod dof;
pub mod entropy_cache;
pub mod error;
pub mod graph;
pub mod infotheory;
pub mod ipcmb;
pub mod key;
pub mod params;
pub mod persist;
pub mod pmf;
pub mod setcache;
pub mod stats;
pub mod types;
pub mod utils;
pub mod variable;
