use std::collections::{BTreeSet, HashSet};

use derive_more::{Deref, From, Into};
use log::trace;
use serde::Serialize;
use typed_index_collections::TiVec;

use crate::{
    error::{Error, Result},
    problem::{ReliefProblem, Scenario},
};

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash, Serialize)]
pub struct ResourceIndex(usize);

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash, Serialize)]
pub struct CarrierIndex(usize);

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash, Serialize)]
pub struct ZoneIndex(usize);

/// Zero based flight slot. Flight `v` is reported as `v + 1`.
#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash, Serialize)]
pub struct FlightIndex(usize);

/// Sets for the allocation model
#[derive(Debug)]
#[allow(non_snake_case)]
pub struct Sets {
    /// Set of resources
    pub R: Vec<ResourceIndex>,
    /// Set of carriers (aircraft)
    pub A: Vec<CarrierIndex>,
    /// Set of zones
    pub Z: Vec<ZoneIndex>,
    /// Set of flights each carrier may fly
    pub V: Vec<FlightIndex>,
}

impl Sets {
    pub fn new(problem: &ReliefProblem) -> Result<Sets> {
        if problem.resources().is_empty() {
            return Err(Error::config("no resources"));
        }
        if problem.carriers().is_empty() {
            return Err(Error::config("no carriers"));
        }
        if problem.zones().is_empty() {
            return Err(Error::config("no zones"));
        }
        if problem.flights() == 0 {
            return Err(Error::config("each carrier needs at least one flight"));
        }

        Ok(Sets {
            R: (0..problem.resources().len()).map(ResourceIndex).collect(),
            A: (0..problem.carriers().len()).map(CarrierIndex).collect(),
            Z: (0..problem.zones().len()).map(ZoneIndex).collect(),
            V: (0..problem.flights()).map(FlightIndex).collect(),
        })
    }
}

/// Parameters for the allocation model
#[allow(non_snake_case)]
#[derive(Debug, Clone)]
pub struct Parameters {
    /// Impact value of one unit of resource r
    pub impact: TiVec<ResourceIndex, f64>,
    /// Weight of one unit of resource r
    pub weight: TiVec<ResourceIndex, f64>,
    /// Volume of one unit of resource r
    pub volume: TiVec<ResourceIndex, f64>,
    /// Units of resource r available in total
    pub availability: TiVec<ResourceIndex, f64>,
    /// Weight capacity of carrier a on a single flight
    pub W: TiVec<CarrierIndex, f64>,
    /// Volume capacity of carrier a on a single flight
    pub U: TiVec<CarrierIndex, f64>,
    /// Fixed cost of using carrier a
    pub C_fixed: TiVec<CarrierIndex, f64>,
    /// Cost per unit distance of carrier a
    pub C_var: TiVec<CarrierIndex, f64>,
    /// Distance from the origin to zone z
    pub distance: TiVec<ZoneIndex, f64>,
    /// Minimum weight of resource r delivered to zone z, `D[z][r]`
    pub D: TiVec<ZoneIndex, TiVec<ResourceIndex, f64>>,
    /// Impact multiplier of zone z
    pub multiplier: TiVec<ZoneIndex, f64>,
    /// Upper limit on fixed plus variable cost
    pub budget: f64,
    /// Resources that may not be shipped with the given carrier
    pub exclusions: Vec<(ResourceIndex, CarrierIndex)>,
    /// Pairs of resources that may not share a (carrier, zone, flight)
    pub disjoint: Vec<(ResourceIndex, ResourceIndex)>,
}

fn check(ok: bool, msg: impl FnOnce() -> String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::Configuration(msg()))
    }
}

fn non_negative(value: f64, what: impl FnOnce() -> String) -> Result<()> {
    check(value.is_finite() && value >= 0.0, || {
        format!("{} must be finite and non-negative, got {value}", what())
    })
}

#[allow(non_snake_case)]
impl Parameters {
    /// Validates `problem` and `scenario` and collects the model parameters.
    /// Every lookup by name happens here, so a missing key never reaches the model builder.
    pub fn new(problem: &ReliefProblem, sets: &Sets, scenario: &Scenario) -> Result<Parameters> {
        let resources = problem.resources();
        let carriers = problem.carriers();
        let zones = problem.zones();

        let mut names = HashSet::new();
        for r in resources {
            check(names.insert(r.name.as_str()), || {
                format!("duplicate resource {}", r.name)
            })?;
            non_negative(r.impact, || format!("impact of {}", r.name))?;
            non_negative(r.availability, || format!("availability of {}", r.name))?;
            check(r.weight.is_finite() && r.weight > 0.0, || {
                format!("weight of {} must be positive", r.name)
            })?;
            check(r.volume.is_finite() && r.volume > 0.0, || {
                format!("volume of {} must be positive", r.name)
            })?;
        }

        let mut ids = HashSet::new();
        for c in carriers {
            check(ids.insert(c.id), || format!("duplicate carrier {}", c.id))?;
            non_negative(c.weight_capacity, || format!("weight capacity of {}", c.id))?;
            non_negative(c.volume_capacity, || format!("volume capacity of {}", c.id))?;
            non_negative(c.fixed_cost, || format!("fixed cost of {}", c.id))?;
            non_negative(c.variable_cost, || format!("variable cost of {}", c.id))?;
        }

        let mut zone_names = HashSet::new();
        for z in zones {
            check(zone_names.insert(z.name.as_str()), || {
                format!("duplicate zone {}", z.name)
            })?;
            non_negative(z.distance, || format!("distance of {}", z.name))?;
            for key in z.demand.keys() {
                check(names.contains(key.as_str()), || {
                    format!("zone {} demands unknown resource {key}", z.name)
                })?;
            }
        }

        let mut multiplier = TiVec::with_capacity(zones.len());
        for z in zones {
            let m = scenario
                .multiplier(&z.name)
                .ok_or_else(|| Error::config(format!("no multiplier for zone {}", z.name)))?;
            non_negative(m, || format!("multiplier of {}", z.name))?;
            multiplier.push(m);
        }
        for key in scenario.multipliers().keys() {
            check(zone_names.contains(key.as_str()), || {
                format!("multiplier given for unknown zone {key}")
            })?;
        }
        check(scenario.budget().is_finite(), || {
            format!("budget must be finite, got {}", scenario.budget())
        })?;

        let mut D: TiVec<ZoneIndex, TiVec<ResourceIndex, f64>> = TiVec::with_capacity(zones.len());
        for (z, zone) in zones.iter().enumerate() {
            let mut row = TiVec::with_capacity(resources.len());
            for r in resources {
                let demand = *zone.demand.get(&r.name).ok_or_else(|| {
                    Error::config(format!("zone {} has no demand for {}", zone.name, r.name))
                })?;
                non_negative(demand, || format!("demand of {} for {}", zone.name, r.name))?;
                let scale = if scenario.scale_demand() {
                    multiplier[ZoneIndex(z)]
                } else {
                    1.0
                };
                row.push(demand * scale);
            }
            D.push(row);
        }

        let resource = |name: &str| {
            problem
                .resource_position(name)
                .map(ResourceIndex)
                .ok_or_else(|| Error::config(format!("rule names unknown resource {name}")))
        };

        let mut exclusions = Vec::new();
        for e in &problem.rules().exclusions {
            let r = resource(&e.resource)?;
            let a = problem
                .carrier_position(e.carrier)
                .map(CarrierIndex)
                .ok_or_else(|| {
                    Error::config(format!("rule names unknown carrier {}", e.carrier))
                })?;
            exclusions.push((r, a));
        }

        let mut disjoint = Vec::new();
        let mut seen = BTreeSet::new();
        for d in &problem.rules().disjoint {
            let (first, second) = (resource(&d.first)?, resource(&d.second)?);
            check(first != second, || {
                format!("resource {} cannot be disjoint with itself", d.first)
            })?;
            if seen.insert((first.min(second), first.max(second))) {
                disjoint.push((first, second));
            }
        }

        trace!(
            "allocation parameters: {} resources, {} carriers, {} zones, {} flights",
            sets.R.len(),
            sets.A.len(),
            sets.Z.len(),
            sets.V.len()
        );

        Ok(Parameters {
            impact: resources.iter().map(|r| r.impact).collect(),
            weight: resources.iter().map(|r| r.weight).collect(),
            volume: resources.iter().map(|r| r.volume).collect(),
            availability: resources.iter().map(|r| r.availability).collect(),
            W: carriers.iter().map(|c| c.weight_capacity).collect(),
            U: carriers.iter().map(|c| c.volume_capacity).collect(),
            C_fixed: carriers.iter().map(|c| c.fixed_cost).collect(),
            C_var: carriers.iter().map(|c| c.variable_cost).collect(),
            distance: zones.iter().map(|z| z.distance).collect(),
            D,
            multiplier,
            budget: scenario.budget(),
            exclusions,
            disjoint,
        })
    }

    /// Units of all resources available in total
    pub fn total_availability(&self) -> f64 {
        self.availability.iter().sum()
    }

    /// Cost of sending carrier `a` to zone `z` on one flight
    pub fn trip_cost(&self, a: CarrierIndex, z: ZoneIndex) -> f64 {
        self.C_var[a] * self.distance[z]
    }

    /// Upper bound on the units of `r` carrier `a` can take on a single flight
    pub fn resource_trip_bound(&self, a: CarrierIndex, r: ResourceIndex) -> f64 {
        let by_weight = (self.W[a] / self.weight[r]).floor();
        let by_volume = (self.U[a] / self.volume[r]).floor();
        self.availability[r].floor().min(by_weight).min(by_volume)
    }

    /// Upper bound on the total units carrier `a` can take on a single flight.
    /// Every unit weighs at least the lightest resource and takes at least the smallest volume.
    pub fn trip_bound(&self, a: CarrierIndex) -> f64 {
        let lightest = self.weight.iter().copied().fold(f64::INFINITY, f64::min);
        let smallest = self.volume.iter().copied().fold(f64::INFINITY, f64::min);
        self.total_availability()
            .floor()
            .min((self.W[a] / lightest).floor())
            .min((self.U[a] / smallest).floor())
    }

    /// Upper bound on the total units carrier `a` can ship over all its flights
    pub fn carrier_bound(&self, a: CarrierIndex, flights: usize) -> f64 {
        self.total_availability()
            .floor()
            .min(flights as f64 * self.trip_bound(a))
    }
}
