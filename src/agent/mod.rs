//! Agent Module
//!
//! The context object a scheduled cycle runs against.

mod cycle;

pub use cycle::{Agent, CycleHolds};
