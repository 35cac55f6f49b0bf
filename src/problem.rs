use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The type used for shipped quantities
pub type Quantity = f64;
/// The type used for distance
pub type Distance = f64;
/// The typs used for cost.
pub type Cost = f64;

/// A kind of relief good.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique name of the resource
    pub name: String,
    /// Impact value of a single shipped unit
    pub impact: f64,
    /// Weight of one unit
    pub weight: f64,
    /// Volume of one unit
    pub volume: f64,
    /// Units available in total, across all carriers, zones and flights
    pub availability: Quantity,
}

/// An aircraft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carrier {
    pub id: u32,
    /// Maximum weight carried on a single flight
    pub weight_capacity: f64,
    /// Maximum volume carried on a single flight
    pub volume_capacity: f64,
    /// Cost paid once if the carrier is used at all
    pub fixed_cost: Cost,
    /// Cost per unit of distance flown
    pub variable_cost: Cost,
}

/// A zone that receives aid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    /// Distance from the origin
    pub distance: Distance,
    pub population: u64,
    /// Minimum weight of every resource the zone must receive, keyed by resource name
    pub demand: BTreeMap<String, f64>,
}

/// Forbids shipping `resource` with carrier `carrier`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub resource: String,
    pub carrier: u32,
}

/// Two resources that may never share a (carrier, zone, flight)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disjoint {
    pub first: String,
    pub second: String,
}

/// Hard, instance specific shipping rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rules {
    #[serde(default)]
    pub exclusions: Vec<Exclusion>,
    #[serde(default)]
    pub disjoint: Vec<Disjoint>,
}

/// Immutable data describing a relief allocation instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliefProblem {
    resources: Vec<Resource>,
    carriers: Vec<Carrier>,
    zones: Vec<Zone>,
    /// Number of round trips each carrier may fly
    flights: usize,
    #[serde(default)]
    rules: Rules,
}

impl ReliefProblem {
    pub fn new(
        resources: Vec<Resource>,
        carriers: Vec<Carrier>,
        zones: Vec<Zone>,
        flights: usize,
        rules: Rules,
    ) -> ReliefProblem {
        ReliefProblem {
            resources,
            carriers,
            zones,
            flights,
            rules,
        }
    }

    pub fn from_json(json: &str) -> Result<ReliefProblem> {
        serde_json::from_str(json).map_err(|e| Error::config(format!("relief problem: {e}")))
    }

    pub fn read(path: impl AsRef<Path>) -> Result<ReliefProblem> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))
    }

    /// The resources, ordered by index
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// The carriers, ordered by index
    pub fn carriers(&self) -> &[Carrier] {
        &self.carriers
    }

    /// The zones, ordered by index
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Number of flights available to each carrier
    pub fn flights(&self) -> usize {
        self.flights
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn resource_position(&self, name: &str) -> Option<usize> {
        self.resources.iter().position(|r| r.name == name)
    }

    pub fn carrier_position(&self, id: u32) -> Option<usize> {
        self.carriers.iter().position(|c| c.id == id)
    }

    pub fn zone_position(&self, name: &str) -> Option<usize> {
        self.zones.iter().position(|z| z.name == name)
    }
}

/// The scalar knobs of a single allocation solve.
///
/// A scenario is a value: the `with_*` methods return modified copies and never touch `self`,
/// so every run of a sweep owns its own multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Impact multiplier of each zone, keyed by zone name
    multipliers: BTreeMap<String, f64>,
    /// Upper limit on the realized cost
    budget: Cost,
    /// Whether the demand floor of a zone is scaled by its multiplier
    #[serde(default)]
    scale_demand: bool,
}

impl Scenario {
    pub fn new<S: Into<String>>(
        multipliers: impl IntoIterator<Item = (S, f64)>,
        budget: Cost,
    ) -> Scenario {
        Scenario {
            multipliers: multipliers
                .into_iter()
                .map(|(zone, m)| (zone.into(), m))
                .collect(),
            budget,
            scale_demand: false,
        }
    }

    pub fn multipliers(&self) -> &BTreeMap<String, f64> {
        &self.multipliers
    }

    pub fn multiplier(&self, zone: &str) -> Option<f64> {
        self.multipliers.get(zone).copied()
    }

    pub fn budget(&self) -> Cost {
        self.budget
    }

    pub fn scale_demand(&self) -> bool {
        self.scale_demand
    }

    pub fn with_budget(&self, budget: Cost) -> Scenario {
        Scenario {
            budget,
            ..self.clone()
        }
    }

    pub fn with_scaled_demand(&self, scale_demand: bool) -> Scenario {
        Scenario {
            scale_demand,
            ..self.clone()
        }
    }

    /// A copy where only the multiplier of `zone` is multiplied by `factor`
    pub fn with_zone_scaled(&self, zone: &str, factor: f64) -> Result<Scenario> {
        let mut multipliers = self.multipliers.clone();
        match multipliers.get_mut(zone) {
            Some(m) => *m *= factor,
            None => return Err(Error::config(format!("no multiplier for zone {zone}"))),
        }
        Ok(Scenario {
            multipliers,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_a_zone_leaves_the_original_untouched() {
        let base = Scenario::new([("A", 1.2), ("B", 1.5)], 5000.0);
        let scaled = base.with_zone_scaled("A", 0.7).unwrap();

        assert_eq!(base.multiplier("A"), Some(1.2));
        assert!((scaled.multiplier("A").unwrap() - 0.84).abs() < 1e-12);
        assert_eq!(scaled.multiplier("B"), Some(1.5));
        assert_eq!(base.with_zone_scaled("A", 1.0).unwrap(), base);
    }

    #[test]
    fn scaling_an_unknown_zone_fails() {
        let base = Scenario::new([("A", 1.0)], 10.0);
        assert!(matches!(
            base.with_zone_scaled("Z", 2.0),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn problem_parses_from_json() {
        let json = r#"{
            "resources": [{"name": "water", "impact": 60, "weight": 6, "volume": 4, "availability": 15}],
            "carriers": [{"id": 1, "weight_capacity": 40, "volume_capacity": 35, "fixed_cost": 15, "variable_cost": 0.02}],
            "zones": [{"name": "A", "distance": 800, "population": 50, "demand": {"water": 6}}],
            "flights": 2
        }"#;
        let problem = ReliefProblem::from_json(json).unwrap();
        assert_eq!(problem.flights(), 2);
        assert_eq!(problem.resources()[0].name, "water");
        assert_eq!(problem.carrier_position(1), Some(0));
        assert!(problem.rules().exclusions.is_empty());
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        assert!(matches!(
            ReliefProblem::from_json(r#"{"resources": []}"#),
            Err(Error::Configuration(_))
        ));
    }
}
