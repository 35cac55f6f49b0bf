use good_lp::{
    solvers::microlp::microlp, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use log::{debug, trace, warn};
use typed_index_collections::TiVec;

use super::{SolverConfig, Solved, Solver, Status};
use crate::models::milp::{Assignment, Cmp, LinExpr, Model, Sense, Var, VarType};

/// Branch and bound in pure Rust through `good_lp`'s microlp backend.
/// Needs no native library, but has no notion of a time limit or threads.
#[derive(Debug, Clone)]
pub struct MicroLp {
    config: SolverConfig,
}

impl MicroLp {
    pub fn new(config: SolverConfig) -> MicroLp {
        if config.time_limit.is_some() || config.threads.is_some() {
            warn!("microlp ignores time limits and thread counts");
        }
        MicroLp { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

impl Default for MicroLp {
    fn default() -> Self {
        MicroLp::new(SolverConfig::default())
    }
}

fn expression(expr: &LinExpr, vars: &TiVec<Var, Variable>) -> Expression {
    let mut out = Expression::with_capacity(expr.terms().len());
    for (var, coeff) in expr.terms() {
        out.add_mul(*coeff, vars[*var]);
    }
    out
}

impl Solver for MicroLp {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&self, model: &Model) -> Solved {
        debug!(
            "solving {} with {} variables and {} constraints",
            model.name(),
            model.vars().len(),
            model.constrs().len()
        );

        let mut problem = ProblemVariables::new();
        let vars: TiVec<Var, Variable> = model
            .vars()
            .iter()
            .map(|def| {
                let mut definition = match def.vtype {
                    VarType::Continuous => variable(),
                    VarType::Integer => variable().integer(),
                    VarType::Binary => variable().binary(),
                };
                if def.lb.is_finite() {
                    definition = definition.min(def.lb);
                }
                if def.ub.is_finite() {
                    definition = definition.max(def.ub);
                }
                problem.add(definition.name(&def.name))
            })
            .collect();

        let objective = expression(model.objective(), &vars);
        let mut unsolved = match model.sense() {
            Sense::Maximize => problem.maximise(objective),
            Sense::Minimize => problem.minimise(objective),
        }
        .using(microlp);

        for constr in model.constrs() {
            // a constraint without variables is either trivially true or proves infeasibility
            if constr.expr.terms().is_empty() {
                if !constr.satisfied(&TiVec::<Var, f64>::new(), 1e-9) {
                    return Solved::failed(
                        Status::Infeasible,
                        format!("constraint {} cannot hold", constr.name),
                    );
                }
                continue;
            }
            let lhs = expression(&constr.expr, &vars);
            let c = match constr.cmp {
                Cmp::Le => lhs.leq(constr.rhs),
                Cmp::Ge => lhs.geq(constr.rhs),
                Cmp::Eq => lhs.eq(constr.rhs),
            };
            unsolved = unsolved.with(c);
        }

        match unsolved.solve() {
            Ok(solution) => {
                let values: TiVec<Var, f64> = vars.iter().map(|v| solution.value(*v)).collect();
                trace!("{} solved to optimality", model.name());
                Solved::optimal(Assignment::new(values))
            }
            Err(ResolutionError::Infeasible) => {
                Solved::failed(Status::Infeasible, "microlp proved infeasibility")
            }
            Err(ResolutionError::Unbounded) => {
                Solved::failed(Status::Unbounded, "microlp found an unbounded ray")
            }
            Err(e) => {
                warn!("microlp failed on {}: {}", model.name(), e);
                Solved::failed(Status::SolverUnavailable, e.to_string())
            }
        }
    }
}
