//! Reading travel cost matrices from disk.
//!
//! A cost matrix file holds comma separated integers. The first row lists the city ids in the
//! order used by the columns (and rows) of the matrix, every following row holds the costs from
//! one city to all others.

use std::{path::Path, str::FromStr};

use log::debug;
use ndarray::Array2;

use crate::error::{Error, Result};

/// Name of the cost matrix file for `cities` cities generated with the given spread,
/// e.g. `cost_matrix_10_nodes_1.5_spread.csv`. Integral spreads keep their `.0`.
pub fn cost_matrix_file_name(cities: usize, spread: f64) -> String {
    format!("cost_matrix_{}_nodes_{:?}_spread.csv", cities, spread)
}

/// Square matrix of non-negative travel costs between cities `0..n`, city 0 being the depot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostMatrix {
    costs: Array2<u64>,
}

impl CostMatrix {
    pub fn new(costs: Array2<u64>) -> Result<CostMatrix> {
        let (rows, cols) = costs.dim();
        if rows == 0 {
            return Err(Error::config("cost matrix is empty"));
        }
        if rows != cols {
            return Err(Error::config(format!(
                "cost matrix must be square, got {rows}x{cols}"
            )));
        }
        Ok(CostMatrix { costs })
    }

    pub fn from_rows(rows: Vec<Vec<u64>>) -> Result<CostMatrix> {
        let n = rows.len();
        if let Some(row) = rows.iter().find(|row| row.len() != n) {
            return Err(Error::config(format!(
                "cost matrix must be square, found a row of {} entries in a matrix of {n} rows",
                row.len()
            )));
        }
        let flat = rows.into_iter().flatten().collect();
        let costs = Array2::from_shape_vec((n, n), flat)
            .map_err(|e| Error::config(format!("cost matrix: {e}")))?;
        CostMatrix::new(costs)
    }

    /// Reads the cost matrix from a file in the format described in the module documentation
    pub fn read(path: impl AsRef<Path>) -> Result<CostMatrix> {
        let path = path.as_ref();
        debug!("reading cost matrix from {}", path.display());
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        text.parse()
    }

    /// Number of cities, depot included
    pub fn cities(&self) -> usize {
        self.costs.nrows()
    }

    pub fn cost(&self, from: usize, to: usize) -> u64 {
        self.costs[[from, to]]
    }

    pub fn costs(&self) -> &Array2<u64> {
        &self.costs
    }
}

fn parse_row(line: &str, number: usize) -> Result<Vec<i64>> {
    line.split(',')
        .map(|field| {
            field.trim().parse::<i64>().map_err(|e| {
                Error::config(format!("line {number}: cannot parse {:?}: {e}", field.trim()))
            })
        })
        .collect()
}

impl FromStr for CostMatrix {
    type Err = Error;

    fn from_str(s: &str) -> Result<CostMatrix> {
        let mut lines = s
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let (number, header) = lines
            .next()
            .ok_or_else(|| Error::config("cost matrix file is empty"))?;
        let ids = parse_row(header, number)?;
        let n = ids.len();

        // position in the file of every city id
        let mut position = vec![None; n];
        for (p, id) in ids.iter().enumerate() {
            let slot = match usize::try_from(*id).ok().filter(|i| *i < n) {
                Some(i) => &mut position[i],
                None => {
                    return Err(Error::config(format!(
                        "city ids must be 0..{n}, found {id}"
                    )))
                }
            };
            if slot.replace(p).is_some() {
                return Err(Error::config(format!("city id {id} appears twice")));
            }
        }

        let mut rows = Vec::with_capacity(n);
        for (number, line) in lines {
            let row = parse_row(line, number)?;
            if row.len() != n {
                return Err(Error::config(format!(
                    "line {number}: expected {n} costs, found {}",
                    row.len()
                )));
            }
            let row = row
                .into_iter()
                .map(|c| {
                    u64::try_from(c).map_err(|_| {
                        Error::config(format!("line {number}: negative cost {c}"))
                    })
                })
                .collect::<Result<Vec<u64>>>()?;
            rows.push(row);
        }
        if rows.len() != n {
            return Err(Error::config(format!(
                "expected {n} rows of costs, found {}",
                rows.len()
            )));
        }

        let position = position
            .into_iter()
            .collect::<Option<Vec<usize>>>()
            .ok_or_else(|| Error::config("city ids must cover 0..n"))?;

        // reorder so that row and column i belong to city id i
        let costs = Array2::from_shape_fn((n, n), |(i, j)| rows[position[i]][position[j]]);
        CostMatrix::new(costs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_follow_the_generator_convention() {
        assert_eq!(
            cost_matrix_file_name(10, 1.5),
            "cost_matrix_10_nodes_1.5_spread.csv"
        );
        assert_eq!(
            cost_matrix_file_name(20, 2.0),
            "cost_matrix_20_nodes_2.0_spread.csv"
        );
    }

    #[test]
    fn parses_and_reorders_by_city_id() {
        let text = "1,0,2\n0,5,7\n4,0,9\n8,6,0\n";
        let m: CostMatrix = text.parse().unwrap();
        assert_eq!(m.cities(), 3);
        // row 1 of the file is city 1, column 2 of the file is city 2
        assert_eq!(m.cost(1, 2), 7);
        assert_eq!(m.cost(1, 0), 5);
        assert_eq!(m.cost(0, 1), 4);
        assert_eq!(m.cost(2, 0), 6);
        assert_eq!(m.cost(0, 0), 0);
    }

    #[test]
    fn tolerates_whitespace_and_blank_lines() {
        let text = " 0, 1 \n\n0, 3\n 2 ,0\n\n";
        let m: CostMatrix = text.parse().unwrap();
        assert_eq!(m.cost(0, 1), 3);
        assert_eq!(m.cost(1, 0), 2);
    }

    #[test]
    fn malformed_files_are_configuration_errors() {
        for text in [
            "",
            "0,1\n0,1\n",
            "0,1\n0,1\n1\n",
            "0,1\n0,-1\n1,0\n",
            "0,0\n0,1\n1,0\n",
            "0,2\n0,1\n1,0\n",
            "0,x\n0,1\n1,0\n",
        ] {
            assert!(
                matches!(text.parse::<CostMatrix>(), Err(Error::Configuration(_))),
                "accepted {text:?}"
            );
        }
    }

    #[test]
    fn rejects_non_square_rows() {
        assert!(CostMatrix::from_rows(vec![vec![0, 1], vec![1]]).is_err());
        assert!(CostMatrix::from_rows(vec![]).is_err());
        assert_eq!(CostMatrix::from_rows(vec![vec![0]]).unwrap().cities(), 1);
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        assert!(matches!(
            CostMatrix::read("does/not/exist.csv"),
            Err(Error::Configuration(_))
        ));
    }
}
