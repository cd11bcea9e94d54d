//! qwave Compiler - source to schedule
//!
//! This crate lowers parsed qwave programs into an IR graph, annotates every
//! node with its resource constraints, runs the optimization passes and
//! orders the result for execution.

pub mod annotator;
pub mod builder;
pub mod compiler;
pub mod error;
pub mod optimizer;
pub mod scheduler;

// Re-export main types
pub use annotator::{check_monotonicity, Annotator};
pub use builder::IrBuilder;
pub use compiler::{CompileOptions, CompileResult, Compiler};
pub use error::{CompileError, Result};
pub use optimizer::{Capabilities, Optimizer, Pass, PassContext, PassId};
pub use scheduler::{schedule, Schedule, ScheduleStep};
