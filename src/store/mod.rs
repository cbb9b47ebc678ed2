//! Backing store seam
//!
//! The query builder produces plans; something else runs them. That
//! something implements [`BackingStore`]. Failures it reports are passed
//! through to callers unchanged.
//!
//! [`MemoryStore`] is a reference implementation over in-memory records,
//! applying stages in plan order. It exists for tests and demos and makes no
//! attempt at being a storage engine.

mod eval;
mod memory;

pub use memory::MemoryStore;

use std::sync::Arc;

use crate::errors::StoreResult;
use crate::planner::QueryPlan;
use crate::record::Instance;

/// Executes compiled query plans
pub trait BackingStore {
    /// Runs the plan and returns matching records in plan order
    fn execute(&self, plan: &QueryPlan) -> StoreResult<Vec<Arc<Instance>>>;

    /// Number of records the plan yields
    fn count(&self, plan: &QueryPlan) -> StoreResult<u64> {
        Ok(self.execute(plan)?.len() as u64)
    }
}
