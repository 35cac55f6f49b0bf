//! Adapters that hand a [`Model`] to a MILP backend and translate the outcome back.
//!
//! Every adapter maps its backend's result onto the same [`Status`] values, so the models and
//! the sweeps never look at solver specific codes.

use derive_more::Display;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    models::milp::{Assignment, Model},
};

#[cfg(feature = "gurobi")]
pub mod gurobi;
pub mod microlp;

pub use self::microlp::MicroLp;

/// Outcome of a single solve
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Optimal,
    Infeasible,
    Unbounded,
    SolverUnavailable,
    Timeout,
}

/// What a solver returns: the status, and the variable values when the status is optimal
#[derive(Debug, Clone)]
pub struct Solved {
    pub status: Status,
    pub assignment: Option<Assignment>,
    /// Backend diagnostics, if any
    pub message: Option<String>,
}

impl Solved {
    pub fn optimal(assignment: Assignment) -> Solved {
        Solved {
            status: Status::Optimal,
            assignment: Some(assignment),
            message: None,
        }
    }

    pub fn failed(status: Status, message: impl Into<String>) -> Solved {
        Solved {
            status,
            assignment: None,
            message: Some(message.into()),
        }
    }

    /// The assignment of an optimal solve, or the error matching the status
    pub fn into_result(self) -> Result<Assignment> {
        let message = self.message.unwrap_or_default();
        match (self.status, self.assignment) {
            (Status::Optimal, Some(assignment)) => Ok(assignment),
            (Status::Optimal, None) => Err(Error::SolverUnavailable(format!(
                "optimal status without values {message}"
            ))),
            (Status::Infeasible, _) => Err(Error::Infeasible),
            (Status::Unbounded, _) => Err(Error::Unbounded),
            (Status::Timeout, _) => Err(Error::Timeout),
            (Status::SolverUnavailable, _) => Err(Error::SolverUnavailable(message)),
        }
    }
}

/// A MILP backend. Implementations must be safe to share between the workers of a sweep,
/// each call to [`Solver::solve`] being independent of all others.
pub trait Solver: Send + Sync {
    fn name(&self) -> &str;

    fn solve(&self, model: &Model) -> Solved;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Pure Rust branch and bound through `good_lp`
    MicroLp,
    /// Gurobi, when compiled with the `gurobi` feature
    Gurobi,
}

impl Default for SolverKind {
    fn default() -> Self {
        SolverKind::MicroLp
    }
}

/// Which backend to use and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub kind: SolverKind,
    /// Wall clock limit per solve in seconds
    pub time_limit: Option<f64>,
    /// Threads each solve may use
    pub threads: Option<usize>,
    /// Let the backend print its log
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            kind: SolverKind::MicroLp,
            time_limit: None,
            threads: None,
            verbose: false,
        }
    }
}

impl SolverConfig {
    pub fn build(&self) -> Result<Box<dyn Solver>> {
        if let Some(limit) = self.time_limit {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(Error::config(format!("invalid time limit {limit}")));
            }
        }
        if self.threads == Some(0) {
            return Err(Error::config("at least one solver thread is needed"));
        }

        info!("using solver {:?}", self.kind);
        match self.kind {
            SolverKind::MicroLp => Ok(Box::new(MicroLp::new(self.clone()))),
            #[cfg(feature = "gurobi")]
            SolverKind::Gurobi => Ok(Box::new(gurobi::Gurobi::new(self.clone()))),
            #[cfg(not(feature = "gurobi"))]
            SolverKind::Gurobi => Err(Error::SolverUnavailable(
                "built without the gurobi feature".to_string(),
            )),
        }
    }
}
