//! Constraint solver boundary.
//!
//! The packing core only needs a narrow capability set from a solver:
//! boolean and bounded integer variables, linear (in)equalities over sums of
//! variables, a linear objective to minimize, and a solve call bounded by a
//! wall-clock budget. [`CpSolver`] is that seam; any constraint or integer
//! programming backend can sit behind it.
//!
//! [`SimpleCpSolver`] is the bundled backend: an exact branch-and-bound
//! search sized for the models the packer produces.
//!
//! # Reference
//! - Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming", Ch. 3-4

mod model;
mod simple;

pub use model::{Constraint, CpModel, LinearExpr, VarId, VarKind, Variable};
pub use simple::SimpleCpSolver;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default solver time budget (ms).
pub const DEFAULT_TIME_LIMIT_MS: u64 = 60_000;

/// Solver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Wall-clock budget in milliseconds (0 = unlimited).
    pub time_limit_ms: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: DEFAULT_TIME_LIMIT_MS,
        }
    }
}

impl SolverConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time limit in milliseconds.
    pub fn with_time_limit(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    /// Deadline for a solve started at `start`.
    pub fn deadline(&self, start: Instant) -> Option<Instant> {
        (self.time_limit_ms > 0).then(|| start + Duration::from_millis(self.time_limit_ms))
    }
}

/// Outcome of a solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// A solution was found and proven optimal (or any solution, without objective).
    Optimal,
    /// A solution was found but the budget ran out before proving optimality.
    Feasible,
    /// No assignment satisfies the constraints.
    Infeasible,
    /// The model is malformed.
    ModelInvalid,
    /// The budget ran out before any solution was found.
    Unknown,
}

/// Result of a solve call.
#[derive(Debug, Clone, PartialEq)]
pub struct CpSolution {
    /// Solve status.
    pub status: SolveStatus,
    /// Variable values indexed by [`VarId::index`]; empty without a solution.
    pub values: Vec<i64>,
    /// Objective value of the returned assignment.
    pub objective_value: Option<i64>,
    /// Wall-clock time spent (ms).
    pub elapsed_ms: u64,
    /// Search nodes explored.
    pub nodes: u64,
}

impl CpSolution {
    /// A result carrying no assignment.
    pub fn without_solution(status: SolveStatus, elapsed_ms: u64, nodes: u64) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value: None,
            elapsed_ms,
            nodes,
        }
    }

    /// Whether an assignment is available.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, SolveStatus::Optimal | SolveStatus::Feasible)
    }

    /// Value of a variable, if a solution exists.
    pub fn value(&self, var: VarId) -> Option<i64> {
        self.values.get(var.index()).copied()
    }

    /// Whether a boolean variable is true in the solution.
    pub fn bool_value(&self, var: VarId) -> bool {
        self.value(var) == Some(1)
    }
}

/// A constraint solver backend.
pub trait CpSolver {
    /// Solves the model within the configured budget.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution;
}

impl<S: CpSolver + ?Sized> CpSolver for &S {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        (**self).solve(model, config)
    }
}
