use derive_more::{Deref, From, Into};
use log::warn;
use serde::Serialize;

use crate::{
    error::{Error, Result},
    parse::CostMatrix,
};

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash, Serialize)]
pub struct CityIndex(usize);

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash, Serialize)]
pub struct VehicleIndex(usize);

/// Every vehicle starts and ends its tour here
pub const DEPOT: CityIndex = CityIndex(0);

/// Sets for the routing model
#[derive(Debug)]
#[allow(non_snake_case)]
pub struct Sets {
    /// Set of cities, depot included
    pub N: Vec<CityIndex>,
    /// Set of cities that must be visited, i.e. all but the depot
    pub C: Vec<CityIndex>,
    /// Set of vehicles
    pub K: Vec<VehicleIndex>,
}

impl Sets {
    pub fn new(matrix: &CostMatrix, vehicles: usize) -> Result<Sets> {
        let n = matrix.cities();
        if vehicles == 0 {
            return Err(Error::config("at least one vehicle is needed"));
        }
        if n < 2 {
            return Err(Error::config("at least one city besides the depot is needed"));
        }
        // every vehicle leaves the depot towards its own city, the model is left to report it
        if vehicles > n - 1 {
            warn!(
                "{} vehicles cannot share {} cities, the routing model is infeasible",
                vehicles,
                n - 1
            );
        }

        Ok(Sets {
            N: (0..n).map(CityIndex).collect(),
            C: (1..n).map(CityIndex).collect(),
            K: (0..vehicles).map(VehicleIndex).collect(),
        })
    }

    /// All arcs (i, j) with i != j, in ascending order
    pub fn arcs(&self) -> impl Iterator<Item = (CityIndex, CityIndex)> + '_ {
        self.N
            .iter()
            .flat_map(move |i| self.N.iter().map(move |j| (*i, *j)))
            .filter(|(i, j)| i != j)
    }
}

/// Parameters for the routing model
#[derive(Debug, Clone)]
pub struct Parameters {
    /// Travel cost of every arc
    pub cost: CostMatrix,
    /// Number of cities, depot included
    pub n: usize,
}

impl Parameters {
    pub fn new(matrix: &CostMatrix) -> Parameters {
        Parameters {
            cost: matrix.clone(),
            n: matrix.cities(),
        }
    }

    pub fn cost(&self, i: CityIndex, j: CityIndex) -> f64 {
        self.cost.cost(*i, *j) as f64
    }
}
