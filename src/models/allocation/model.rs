use super::results::AllocationResult;
use super::sets_and_parameters::{Parameters, Sets};
use crate::{
    error::Result,
    models::{
        milp::{LinExpr, LinSum, Model, Sense, Var},
        utils::AddVars,
    },
    problem::{ReliefProblem, Scenario},
    solver::Solver,
};
use derive_more::Constructor;
use itertools::iproduct;
use log::{debug, info};

#[derive(Constructor)]
pub struct Variables {
    /// units of resource r shipped by carrier a to zone z on flight v, `x[a][r][z][v]`
    pub x: Vec<Vec<Vec<Vec<Var>>>>,
    /// 1 if carrier a is used at all
    pub u: Vec<Var>,
    /// 1 if carrier a flies to zone z on flight v, `y[a][v][z]`
    pub y: Vec<Vec<Vec<Var>>>,
    /// one indicator per disjoint rule d, `w[d][a][z][v]`.
    /// 1 allows the first resource of the pair, 0 allows the second.
    pub w: Vec<Vec<Vec<Vec<Var>>>>,
}

pub struct AllocationSolver {}

#[allow(non_snake_case)]
impl AllocationSolver {
    /// builds the relief allocation model
    pub fn build(sets: &Sets, parameters: &Parameters) -> Result<(Model, Variables)> {
        info!(
            "Building allocation model with budget {}",
            parameters.budget
        );

        let mut model = Model::new("relief_allocation");

        // assign som variables to save some space later
        let R = &sets.R;
        let A = &sets.A;
        let Z = &sets.Z;
        let V = &sets.V;

        //*************CREATE VARIABLES*************//

        // units shipped of each resource
        let x = (A.len(), R.len(), Z.len(), V.len()).int(&mut model, "x");

        // carrier activation
        let u = A.len().binary(&mut model, "u");

        // zone assignment of every flight
        let y = (A.len(), V.len(), Z.len()).binary(&mut model, "y");

        // which side of each disjoint pair a flight may carry
        let w = (parameters.disjoint.len(), A.len(), Z.len(), V.len()).binary(&mut model, "w");

        // ******************** ADD CONSTRAINTS ********************

        // excluded resources are never shipped with the excluded carrier
        for (r, a) in &parameters.exclusions {
            for (z, v) in iproduct!(Z, V) {
                model.add_constr(
                    &format!("exclusion_{}_{}_{}_{}", **r, **a, **z, **v),
                    LinExpr::from(x[**a][**r][**z][**v]).eq(0.0),
                );
            }
        }

        // at most one resource of a disjoint pair on each (carrier, zone, flight)
        for (d, (first, second)) in parameters.disjoint.iter().enumerate() {
            for (a, z, v) in iproduct!(A, Z, V) {
                let ind = w[d][**a][**z][**v];
                let m_first = parameters.resource_trip_bound(*a, *first);
                let m_second = parameters.resource_trip_bound(*a, *second);
                model.add_constr(
                    &format!("disjoint_first_{}_{}_{}_{}", d, **a, **z, **v),
                    LinExpr::from(x[**a][**first][**z][**v]).leq(m_first * ind),
                );
                model.add_constr(
                    &format!("disjoint_second_{}_{}_{}_{}", d, **a, **z, **v),
                    LinExpr::from(x[**a][**second][**z][**v])
                        .leq(LinExpr::from(m_second) - m_second * ind),
                );
            }
        }

        // every flight of a carrier serves at most one zone
        for (a, v) in iproduct!(A, V) {
            let lhs = Z.iter().map(|z| y[**a][**v][**z]).lin_sum();
            model.add_constr(&format!("flight_exclusivity_{}_{}", **a, **v), lhs.leq(1.0));
        }

        // weight and volume capacity of every flight
        for (a, z, v) in iproduct!(A, Z, V) {
            let weight = R
                .iter()
                .map(|r| parameters.weight[*r] * x[**a][**r][**z][**v])
                .lin_sum();
            model.add_constr(
                &format!("weight_{}_{}_{}", **a, **z, **v),
                weight.leq(parameters.W[*a]),
            );

            let volume = R
                .iter()
                .map(|r| parameters.volume[*r] * x[**a][**r][**z][**v])
                .lin_sum();
            model.add_constr(
                &format!("volume_{}_{}_{}", **a, **z, **v),
                volume.leq(parameters.U[*a]),
            );
        }

        // global availability of every resource
        for r in R {
            let lhs = iproduct!(A, Z, V)
                .map(|(a, z, v)| x[**a][**r][**z][**v])
                .lin_sum();
            model.add_constr(
                &format!("availability_{}", **r),
                lhs.leq(parameters.availability[*r]),
            );
        }

        // minimum weight of every resource delivered to every zone
        for (r, z) in iproduct!(R, Z) {
            let lhs = iproduct!(A, V)
                .map(|(a, v)| parameters.weight[*r] * x[**a][**r][**z][**v])
                .lin_sum();
            model.add_constr(
                &format!("demand_{}_{}", **r, **z),
                lhs.geq(parameters.D[*z][*r]),
            );
        }

        // fixed plus variable cost stays within the budget
        let fixed = A.iter().map(|a| parameters.C_fixed[*a] * u[**a]).lin_sum();
        let variable = iproduct!(A, V, Z)
            .map(|(a, v, z)| parameters.trip_cost(*a, *z) * y[**a][**v][**z])
            .lin_sum();
        model.add_constr("budget", (fixed + variable).leq(parameters.budget));

        // nothing is shipped by an inactive carrier
        for a in A {
            let big_m = parameters.carrier_bound(*a, V.len());
            let lhs = iproduct!(R, Z, V)
                .map(|(r, z, v)| x[**a][**r][**z][**v])
                .lin_sum();
            model.add_constr(&format!("activation_{}", **a), lhs.leq(big_m * u[**a]));
        }

        // nothing is shipped on a flight that is not assigned to the zone
        for (a, v, z) in iproduct!(A, V, Z) {
            let big_m = parameters.trip_bound(*a);
            let lhs = R.iter().map(|r| x[**a][**r][**z][**v]).lin_sum();
            model.add_constr(
                &format!("assignment_{}_{}_{}", **a, **v, **z),
                lhs.leq(big_m * y[**a][**v][**z]),
            );
        }

        // set objective which is the weighted impact of everything shipped
        let impact = iproduct!(A, R, Z, V)
            .map(|(a, r, z, v)| {
                parameters.impact[*r] * parameters.multiplier[*z] * x[**a][**r][**z][**v]
            })
            .lin_sum();
        model.set_objective(impact, Sense::Maximize);

        info!(
            "Successfully built allocation model with {} variables and {} constraints",
            model.vars().len(),
            model.constrs().len()
        );
        Ok((model, Variables::new(x, u, y, w)))
    }

    /// Builds, solves and extracts a single allocation run
    pub fn solve(
        problem: &ReliefProblem,
        scenario: &Scenario,
        solver: &dyn Solver,
    ) -> Result<AllocationResult> {
        let sets = Sets::new(problem)?;
        let parameters = Parameters::new(problem, &sets, scenario)?;
        let (model, variables) = AllocationSolver::build(&sets, &parameters)?;

        let assignment = solver.solve(&model).into_result()?;
        debug!("{} solved {}", solver.name(), model.name());

        Ok(AllocationResult::new(
            problem,
            &sets,
            &parameters,
            &variables,
            &model,
            &assignment,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::problem::{Carrier, Disjoint, Exclusion, Resource, Rules, Zone};

    fn problem() -> ReliefProblem {
        let resource = |name: &str, weight: f64| Resource {
            name: name.into(),
            impact: 10.0,
            weight,
            volume: 1.0,
            availability: 5.0,
        };
        let carrier = |id| Carrier {
            id,
            weight_capacity: 10.0,
            volume_capacity: 10.0,
            fixed_cost: 1.0,
            variable_cost: 0.5,
        };
        let zone = |name: &str| Zone {
            name: name.into(),
            distance: 2.0,
            population: 1,
            demand: BTreeMap::from([("a".to_string(), 1.0), ("b".to_string(), 0.0)]),
        };
        let rules = Rules {
            exclusions: vec![Exclusion {
                resource: "b".into(),
                carrier: 2,
            }],
            disjoint: vec![Disjoint {
                first: "a".into(),
                second: "b".into(),
            }],
        };
        ReliefProblem::new(
            vec![resource("a", 1.0), resource("b", 2.0)],
            vec![carrier(1), carrier(2)],
            vec![zone("N"), zone("S")],
            2,
            rules,
        )
    }

    fn build() -> (Model, Variables) {
        let problem = problem();
        let sets = Sets::new(&problem).unwrap();
        let scenario = Scenario::new([("N", 1.0), ("S", 2.0)], 4.0);
        let parameters = Parameters::new(&problem, &sets, &scenario).unwrap();
        AllocationSolver::build(&sets, &parameters).unwrap()
    }

    #[test]
    fn variable_families_have_the_expected_shape() {
        let (model, vars) = build();
        // 2 carriers, 2 resources, 2 zones, 2 flights
        assert_eq!(vars.x.len(), 2);
        assert_eq!(vars.x[0].len(), 2);
        assert_eq!(vars.x[0][0].len(), 2);
        assert_eq!(vars.x[0][0][0].len(), 2);
        assert_eq!(vars.u.len(), 2);
        assert_eq!(vars.y[1][1].len(), 2);
        assert_eq!(vars.w.len(), 1);
        assert_eq!(model.vars().len(), 16 + 2 + 8 + 8);
        assert_eq!(model.sense(), Sense::Maximize);
    }

    #[test]
    fn every_constraint_family_is_present() {
        let (model, _) = build();
        for name in [
            "exclusion_1_1_0_0",
            "disjoint_first_0_0_1_1",
            "disjoint_second_0_1_0_1",
            "flight_exclusivity_1_0",
            "weight_0_1_1",
            "volume_1_0_0",
            "availability_1",
            "demand_0_1",
            "budget",
            "activation_0",
            "assignment_1_1_0",
        ] {
            assert!(model.constr(name).is_some(), "missing constraint {name}");
        }
        // the excluded resource sits on the second carrier only
        assert!(model.constr("exclusion_1_0_0_0").is_none());
    }

    #[test]
    fn big_m_values_are_computed_from_the_data() {
        let (model, vars) = build();
        // trip bound: 10 units by weight of the lighter resource, 10 available in total
        let c = model.constr("assignment_0_0_0").unwrap();
        assert!(c.expr.terms().contains(&(vars.y[0][0][0], -10.0)));
        // two flights of at most ten units, capped by the ten units available
        let c = model.constr("activation_1").unwrap();
        assert!(c.expr.terms().contains(&(vars.u[1], -10.0)));
        // resource b: 5 available, 10 / 2 = 5 by weight
        let c = model.constr("disjoint_second_0_0_0_0").unwrap();
        assert!(c.expr.terms().contains(&(vars.w[0][0][0][0], 5.0)));
        assert_eq!(c.rhs, 5.0);
    }

    #[test]
    fn budget_links_activation_and_assignment() {
        let (model, vars) = build();
        let c = model.constr("budget").unwrap();
        assert_eq!(c.rhs, 4.0);
        assert!(c.expr.terms().contains(&(vars.u[0], 1.0)));
        // 0.5 per unit distance, 2 units away
        assert!(c.expr.terms().contains(&(vars.y[1][0][1], 1.0)));
    }

    #[test]
    fn objective_weights_impact_by_zone_multiplier() {
        let (model, vars) = build();
        let terms = model.objective().terms();
        assert!(terms.contains(&(vars.x[0][0][0][1], 10.0)));
        assert!(terms.contains(&(vars.x[1][1][1][0], 20.0)));
    }
}
