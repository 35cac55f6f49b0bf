use std::collections::BTreeMap;

use super::results::RoutingResult;
use super::sets_and_parameters::{CityIndex, Parameters, Sets, VehicleIndex, DEPOT};
use crate::{
    error::Result,
    models::{
        milp::{LinExpr, LinSum, Model, Sense, Var, VarType},
        utils::keyed_vars,
    },
    parse::CostMatrix,
    solver::Solver,
};
use derive_more::Constructor;
use itertools::iproduct;
use log::{debug, info};

#[derive(Constructor)]
pub struct Variables {
    /// 1 if vehicle k travels directly from city i to city j, keyed by `(i, j, k)`
    pub x: BTreeMap<(CityIndex, CityIndex, VehicleIndex), Var>,
    /// position of city i in the tour of vehicle k, keyed by `(i, k)`. Only defined off the depot
    pub u: BTreeMap<(CityIndex, VehicleIndex), Var>,
}

pub struct RoutingSolver {}

#[allow(non_snake_case)]
impl RoutingSolver {
    /// builds the mTSP model with MTZ subtour elimination
    pub fn build(sets: &Sets, parameters: &Parameters) -> Result<(Model, Variables)> {
        info!(
            "Building routing model for {} cities and {} vehicles",
            sets.N.len(),
            sets.K.len()
        );

        let mut model = Model::new("mtsp");

        let N = &sets.N;
        let C = &sets.C;
        let K = &sets.K;
        let n = parameters.n as f64;

        //*************CREATE VARIABLES*************//

        let x = keyed_vars(
            iproduct!(sets.arcs(), K).map(|((i, j), k)| (i, j, *k)),
            &mut model,
            VarType::Binary,
            &(0.0..1.0),
            |(i, j, k)| format!("x_{}_{}_{}", **i, **j, **k),
        );

        let u = keyed_vars(
            iproduct!(C, K).map(|(i, k)| (*i, *k)),
            &mut model,
            VarType::Integer,
            &(1.0..n - 1.0),
            |(i, k)| format!("u_{}_{}", **i, **k),
        );

        // ******************** ADD CONSTRAINTS ********************

        // every city is entered exactly once, by some vehicle
        for j in C {
            let lhs = iproduct!(N, K)
                .filter(|(i, _)| *i != j)
                .map(|(i, k)| x[&(*i, *j, *k)])
                .lin_sum();
            model.add_constr(&format!("visit_once_{}", **j), lhs.eq(1.0));
        }

        // every vehicle leaves the depot exactly once
        for k in K {
            let lhs = C.iter().map(|j| x[&(DEPOT, *j, *k)]).lin_sum();
            model.add_constr(&format!("leave_depot_{}", **k), lhs.eq(1.0));
        }

        // and returns to it exactly once
        for k in K {
            let lhs = C.iter().map(|i| x[&(*i, DEPOT, *k)]).lin_sum();
            model.add_constr(&format!("return_depot_{}", **k), lhs.eq(1.0));
        }

        // a vehicle that enters a city also leaves it
        for (j, k) in iproduct!(C, K) {
            let inflow = N
                .iter()
                .filter(|i| *i != j)
                .map(|i| x[&(*i, *j, *k)])
                .lin_sum();
            let outflow = N
                .iter()
                .filter(|i| *i != j)
                .map(|i| x[&(*j, *i, *k)])
                .lin_sum();
            model.add_constr(&format!("flow_{}_{}", **j, **k), inflow.eq(outflow));
        }

        // MTZ: u_i - u_j + n x_ijk <= n - 1 for every pair of cities off the depot
        for (k, i, j) in iproduct!(K, C, C) {
            if i == j {
                continue;
            }
            let lhs = LinExpr::from(u[&(*i, *k)]) - u[&(*j, *k)] + n * x[&(*i, *j, *k)];
            model.add_constr(
                &format!("mtz_{}_{}_{}", **i, **j, **k),
                lhs.leq(n - 1.0),
            );
        }

        // set objective which is the total travel cost
        let distance = x
            .iter()
            .map(|((i, j, _), var)| parameters.cost(*i, *j) * *var)
            .lin_sum();
        model.set_objective(distance, Sense::Minimize);

        info!(
            "Successfully built routing model with {} variables and {} constraints",
            model.vars().len(),
            model.constrs().len()
        );
        Ok((model, Variables::new(x, u)))
    }

    /// Builds, solves and extracts the routes of `vehicles` vehicles over `matrix`
    pub fn solve(
        matrix: &CostMatrix,
        vehicles: usize,
        solver: &dyn Solver,
    ) -> Result<RoutingResult> {
        let sets = Sets::new(matrix, vehicles)?;
        let parameters = Parameters::new(matrix);
        let (model, variables) = RoutingSolver::build(&sets, &parameters)?;

        let assignment = solver.solve(&model).into_result()?;
        debug!("{} solved {}", solver.name(), model.name());

        Ok(RoutingResult::new(
            &sets,
            &parameters,
            &variables,
            &model,
            &assignment,
        ))
    }
}
