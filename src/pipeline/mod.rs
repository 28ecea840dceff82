//! Prefill -> inference workflow.
//!
//! [`machine`] holds the pure state machine; [`driver`] performs the effects
//! it asks for against a [`DashboardApi`](crate::api::DashboardApi).

pub mod driver;
pub mod machine;

pub use driver::{perform, run};
pub use machine::{Effect, Event, Pipeline, PipelineState, Step};
