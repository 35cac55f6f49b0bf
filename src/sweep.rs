//! Repeated solves of the allocation model under varying budgets or zone multipliers.
//!
//! Every iteration builds its own model from its own [`Scenario`], so iterations are
//! independent and are spread over a fixed number of worker threads. Rows always come back
//! in iteration order, whatever order the workers finish in.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    mpsc,
};

use float_ord::FloatOrd;
use log::{debug, info, trace, warn};
use serde::Serialize;

use crate::{
    error::{Error, Result},
    models::allocation::{AllocationResult, AllocationSolver, Parameters, Sets},
    problem::{Cost, ReliefProblem, Scenario},
    solver::{Solver, Status},
    utils::EPSILON,
};

/// Relative changes, in percent, applied to one zone multiplier at a time
pub const PERTURBATIONS: [i32; 7] = [-30, -20, -10, 0, 10, 20, 30];

/// One budget level of a Pareto scan. Cost and objective are `None` unless the run was optimal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoPoint {
    pub budget: Cost,
    pub status: Status,
    pub cost: Option<Cost>,
    pub objective: Option<f64>,
}

/// One (zone, perturbation) run of a sensitivity scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityRow {
    pub zone: String,
    pub change_percent: i32,
    pub status: Status,
    pub objective: Option<f64>,
    pub cost: Option<Cost>,
}

/// Drives many allocation solves over one problem with one solver
pub struct SweepRunner<'a> {
    problem: &'a ReliefProblem,
    solver: &'a dyn Solver,
    workers: usize,
}

impl<'a> SweepRunner<'a> {
    pub fn new(
        problem: &'a ReliefProblem,
        solver: &'a dyn Solver,
        workers: usize,
    ) -> Result<SweepRunner<'a>> {
        if workers == 0 {
            return Err(Error::config("a sweep needs at least one worker"));
        }
        Ok(SweepRunner {
            problem,
            solver,
            workers,
        })
    }

    /// Solves the allocation model once for every budget, which must be given in ascending order.
    pub fn pareto_scan(&self, baseline: &Scenario, budgets: &[Cost]) -> Result<Vec<ParetoPoint>> {
        if let Some(b) = budgets.iter().find(|b| !b.is_finite()) {
            return Err(Error::config(format!("budget {b} is not finite")));
        }
        if let Some(w) = budgets.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::config(format!(
                "budgets must be strictly ascending, found {} before {}",
                w[0], w[1]
            )));
        }
        self.validate(baseline)?;

        info!(
            "pareto scan over {} budgets with {} workers",
            budgets.len(),
            self.workers
        );
        let scenarios: Vec<Scenario> = budgets.iter().map(|b| baseline.with_budget(*b)).collect();

        let points = self.dispatch(&scenarios, |scenario| {
            let (status, result) = self.allocate(scenario)?;
            Ok(ParetoPoint {
                budget: scenario.budget(),
                status,
                cost: result.as_ref().map(|r| r.cost()),
                objective: result.as_ref().map(|r| r.objective()),
            })
        })?;

        for i in monotonicity_breaks(&points) {
            warn!(
                "objective drops from {:?} to {:?} when the budget grows from {} to {}",
                points[i - 1].objective,
                points[i].objective,
                points[i - 1].budget,
                points[i].budget
            );
        }
        Ok(points)
    }

    /// Solves the allocation model once for every zone and every entry of [`PERTURBATIONS`],
    /// scaling only that zone's multiplier. Rows are ordered by zone as listed in the problem,
    /// then by perturbation.
    pub fn sensitivity_scan(&self, baseline: &Scenario) -> Result<Vec<SensitivityRow>> {
        self.validate(baseline)?;

        let mut jobs = Vec::with_capacity(self.problem.zones().len() * PERTURBATIONS.len());
        for zone in self.problem.zones() {
            for percent in PERTURBATIONS {
                let factor = 1.0 + percent as f64 / 100.0;
                let scenario = baseline.with_zone_scaled(&zone.name, factor)?;
                jobs.push((zone.name.clone(), percent, scenario));
            }
        }

        info!(
            "sensitivity scan over {} runs with {} workers",
            jobs.len(),
            self.workers
        );
        self.dispatch(&jobs, |(zone, percent, scenario)| {
            let (status, result) = self.allocate(scenario)?;
            Ok(SensitivityRow {
                zone: zone.clone(),
                change_percent: *percent,
                status,
                objective: result.as_ref().map(|r| r.objective()),
                cost: result.as_ref().map(|r| r.cost()),
            })
        })
    }

    /// Catches configuration errors once, before any worker is started
    fn validate(&self, scenario: &Scenario) -> Result<()> {
        let sets = Sets::new(self.problem)?;
        Parameters::new(self.problem, &sets, scenario)?;
        Ok(())
    }

    /// A single run. Infeasible and timed out runs are not errors here, they become empty rows.
    fn allocate(&self, scenario: &Scenario) -> Result<(Status, Option<AllocationResult>)> {
        match AllocationSolver::solve(self.problem, scenario, self.solver) {
            Ok(result) => Ok((Status::Optimal, Some(result))),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("allocation with budget {}: {}", scenario.budget(), e);
                let status = match e {
                    Error::Timeout => Status::Timeout,
                    _ => Status::Infeasible,
                };
                Ok((status, None))
            }
        }
    }

    /// Runs `run` on every job using at most `self.workers` threads.
    /// The first error, by job order, aborts the remaining jobs and is returned.
    fn dispatch<J, T, F>(&self, jobs: &[J], run: F) -> Result<Vec<T>>
    where
        J: Sync,
        T: Send,
        F: Fn(&J) -> Result<T> + Sync,
    {
        let next = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel::<(usize, Result<T>)>();

        std::thread::scope(|s| {
            for worker in 0..self.workers.min(jobs.len()) {
                let tx = tx.clone();
                let (next, abort, run) = (&next, &abort, &run);
                s.spawn(move || {
                    trace!("sweep worker {} started", worker);
                    while !abort.load(Ordering::SeqCst) {
                        let i = next.fetch_add(1, Ordering::SeqCst);
                        let job = match jobs.get(i) {
                            Some(job) => job,
                            None => break,
                        };
                        let result = run(job);
                        if result.is_err() {
                            abort.store(true, Ordering::SeqCst);
                        }
                        if tx.send((i, result)).is_err() {
                            break;
                        }
                    }
                    trace!("sweep worker {} done", worker);
                });
            }
        });
        drop(tx);

        let mut results: Vec<(usize, Result<T>)> = rx.into_iter().collect();
        results.sort_by_key(|(i, _)| *i);
        debug!("sweep collected {} of {} runs", results.len(), jobs.len());

        results.into_iter().map(|(_, result)| result).collect()
    }
}

/// Indices `i` where the objective at `points[i]` is below the one at `points[i - 1]`.
/// Rows without an objective are skipped.
pub fn monotonicity_breaks(points: &[ParetoPoint]) -> Vec<usize> {
    points
        .windows(2)
        .enumerate()
        .filter_map(|(i, w)| match (w[0].objective, w[1].objective) {
            (Some(before), Some(after)) if after < before - EPSILON * before.abs().max(1.0) => {
                Some(i + 1)
            }
            _ => None,
        })
        .collect()
}

/// The non-dominated points among the optimal runs: no other point has a lower or equal cost
/// and a strictly higher objective. Sorted by cost.
pub fn pareto_frontier(points: &[ParetoPoint]) -> Vec<ParetoPoint> {
    let mut solved: Vec<&ParetoPoint> = points
        .iter()
        .filter(|p| p.cost.is_some() && p.objective.is_some())
        .collect();
    solved.sort_by_key(|p| {
        (
            FloatOrd(p.cost.unwrap_or(f64::INFINITY)),
            FloatOrd(-p.objective.unwrap_or(f64::NEG_INFINITY)),
        )
    });

    let mut frontier: Vec<ParetoPoint> = Vec::new();
    for point in solved {
        let objective = point.objective.unwrap_or(f64::NEG_INFINITY);
        match frontier.last().and_then(|p| p.objective) {
            Some(best) if objective <= best => continue,
            _ => frontier.push(point.clone()),
        }
    }
    frontier
}
