//! Gurobi through the `grb` bindings. Only built with the `gurobi` feature, and needs a
//! licensed Gurobi installation at run time.

use grb::prelude::*;
use log::{debug, trace, warn};
use typed_index_collections::TiVec;

use super::{SolverConfig, Solved, Solver, Status as SolveStatus};
use crate::models::milp::{self, Assignment, Cmp, Sense, VarType};

#[derive(Debug, Clone)]
pub struct Gurobi {
    config: SolverConfig,
}

impl Gurobi {
    pub fn new(config: SolverConfig) -> Gurobi {
        Gurobi { config }
    }

    fn expression(expr: &milp::LinExpr, vars: &TiVec<milp::Var, Var>) -> grb::expr::LinExpr {
        let mut out = grb::expr::LinExpr::new();
        for (var, coeff) in expr.terms() {
            out.add_term(*coeff, vars[*var]);
        }
        out
    }

    /// Translates and optimizes the model. Only errors raised by Gurobi itself end up here.
    fn optimize(&self, model: &milp::Model) -> grb::Result<Solved> {
        let mut m = Model::new(model.name())?;
        m.set_param(param::OutputFlag, if self.config.verbose { 1 } else { 0 })?;
        if let Some(threads) = self.config.threads {
            m.set_param(param::Threads, threads as i32)?;
        }
        if let Some(limit) = self.config.time_limit {
            m.set_param(param::TimeLimit, limit)?;
        }

        let mut vars: TiVec<milp::Var, Var> = TiVec::with_capacity(model.vars().len());
        for def in model.vars() {
            let vtype = match def.vtype {
                VarType::Continuous => grb::VarType::Continuous,
                VarType::Integer => grb::VarType::Integer,
                VarType::Binary => grb::VarType::Binary,
            };
            vars.push(m.add_var(
                &def.name,
                vtype,
                0.0,
                def.lb,
                def.ub,
                std::iter::empty(),
            )?);
        }

        for constr in model.constrs() {
            let lhs = Gurobi::expression(&constr.expr, &vars);
            let rhs = constr.rhs;
            let c = match constr.cmp {
                Cmp::Le => c!(lhs <= rhs),
                Cmp::Ge => c!(lhs >= rhs),
                Cmp::Eq => c!(lhs == rhs),
            };
            m.add_constr(&constr.name, c)?;
        }

        let sense = match model.sense() {
            Sense::Maximize => grb::ModelSense::Maximize,
            Sense::Minimize => grb::ModelSense::Minimize,
        };
        m.set_objective(Gurobi::expression(model.objective(), &vars), sense)?;

        m.optimize()?;
        let status = m.status()?;
        trace!("gurobi finished {} with {:?}", model.name(), status);

        let solved = match status {
            Status::Optimal => {
                let values = vars
                    .iter()
                    .map(|v| m.get_obj_attr(attr::X, v))
                    .collect::<grb::Result<TiVec<milp::Var, f64>>>()?;
                Solved::optimal(Assignment::new(values))
            }
            Status::Infeasible => Solved::failed(SolveStatus::Infeasible, "gurobi: infeasible"),
            Status::Unbounded | Status::InfOrUnbd => {
                Solved::failed(SolveStatus::Unbounded, format!("gurobi: {:?}", status))
            }
            Status::TimeLimit => Solved::failed(SolveStatus::Timeout, "gurobi: time limit reached"),
            other => Solved::failed(
                SolveStatus::SolverUnavailable,
                format!("gurobi stopped with status {:?}", other),
            ),
        };
        Ok(solved)
    }
}

impl Solver for Gurobi {
    fn name(&self) -> &str {
        "gurobi"
    }

    fn solve(&self, model: &milp::Model) -> Solved {
        debug!("solving {} with gurobi", model.name());
        match self.optimize(model) {
            Ok(solved) => solved,
            Err(e) => {
                warn!("gurobi failed on {}: {}", model.name(), e);
                Solved::failed(SolveStatus::SolverUnavailable, e.to_string())
            }
        }
    }
}
