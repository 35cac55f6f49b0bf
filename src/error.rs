use derive_more::Display;

/// Errors surfaced while building, solving or sweeping a model.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum Error {
    /// Missing or malformed parameter, rule, scenario value or cost matrix.
    #[display(fmt = "configuration error: {}", _0)]
    Configuration(String),
    /// The adapter could not reach or execute its underlying solver.
    #[display(fmt = "solver unavailable: {}", _0)]
    SolverUnavailable(String),
    /// The solver proved that no feasible assignment exists.
    #[display(fmt = "model is infeasible")]
    Infeasible,
    /// The objective is unbounded, which means the formulation is broken.
    #[display(fmt = "model is unbounded")]
    Unbounded,
    /// The solver stopped at its time limit without proving optimality.
    #[display(fmt = "solver timed out")]
    Timeout,
}

impl std::error::Error for Error {}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Whether a sweep must stop when a single run fails with this error.
    /// Infeasible and timed-out runs are recorded as empty rows instead.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Infeasible | Error::Timeout)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_infeasible_and_timed_out_runs_are_recoverable() {
        assert!(!Error::Infeasible.is_fatal());
        assert!(!Error::Timeout.is_fatal());
        assert!(Error::Unbounded.is_fatal());
        assert!(Error::config("bad").is_fatal());
        assert!(Error::SolverUnavailable("no license".into()).is_fatal());
    }
}
