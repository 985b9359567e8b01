#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Work orders, their task queues and the concrete work targets.
//!
//! A [`WorkOrder`] owns its [`Task`]s exclusively. Tasks move through the
//! pending, assigned and completed lists of the order's [`TaskQueue`]; the
//! only writer of a task's agent binding is the task's own transition
//! methods. Orders live in an [`OrderBook`] that hands out identifiers.

mod order;
mod queue;
mod targets;
mod task;

pub use order::{OrderBook, WorkOrder};
pub use queue::{TaskQueue, WorkContext};
pub use targets::{ConstructionSite, DemolishStructure, HarvestNode, MiningCell};
pub use task::Task;
