//! Optimizer core for the Sable intermediate language.
//!
//! The centerpiece is the [`DataFlowAnalyzer`], a single depth-first walk
//! that tracks what each variable currently holds and which values sit in
//! which storage slots. It gives up knowledge whenever control flow,
//! aliasing or side effects could make it unsound:
//!
//! - **Branches** (`if`, `switch`): storage knowledge is intersected with the
//!   pre-branch state; values of names assigned in a branch are dropped
//! - **Loops**: names assigned anywhere in the loop are dropped before and
//!   after it, storage is dropped if the loop might invalidate it
//! - **Functions**: analyzed with no inherited knowledge and leak none back
//! - **Unknown calls**: treated as non-movable and storage-invalidating
//!
//! # Architecture
//!
//! ```text
//! Dialect ──► MovableChecker / InvalidationChecker / TerminationFinder
//!                              │
//!             Simplifier ──► KnowledgeBase
//!                              │
//!                      DataFlowAnalyzer ──► DataFlowHooks (Rematerialiser, LoadResolver)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sable_dialect::EvmDialect;
//! use sable_opt::{run_pass, LoadResolver, Rematerialiser};
//!
//! let dialect = EvmDialect::new();
//! let mut passes = (Rematerialiser::new(), LoadResolver::new());
//! run_pass(&mut passes, &dialect, &mut block)?;
//! ```

mod data_flow;
mod error;
mod invertible_map;
mod knowledge_base;
pub mod name_collector;
mod passes;
pub mod semantics;
pub mod simplify;
pub mod walker;

pub use data_flow::{AnalyzerConfig, DataFlowAnalyzer, DataFlowHooks, Knowledge, NoHooks};
pub use error::{OptResult, OptimizerError};
pub use invertible_map::BidirectionalMap;
pub use knowledge_base::{KnowledgeBase, ValueMap};
pub use passes::{run_pass, LoadResolver, Rematerialiser};
pub use semantics::{ControlFlow, InvalidationChecker, MovableChecker, TerminationFinder};
pub use simplify::{SimplificationRule, SimplificationRules, SimplifyLimits};
