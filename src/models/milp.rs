//! A small, solver-agnostic representation of a mixed-integer linear program.
//!
//! Models are built once per solve and handed to a [`crate::solver::Solver`],
//! which translates them into whatever its backend understands. Variables are
//! stored in an arena and referred to by a copyable [`Var`] handle.

use std::{
    collections::BTreeMap,
    ops::{Add, AddAssign, Index, Mul, Sub},
};

use derive_more::{Deref, From, Into};
use typed_index_collections::{TiSlice, TiVec};

/// Handle to a variable of a [`Model`].
#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash)]
pub struct Var(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Continuous,
    Integer,
    Binary,
}

/// Declaration of a single variable
#[derive(Debug, Clone)]
pub struct VarDef {
    pub name: String,
    pub vtype: VarType,
    /// Lower bound, may be `f64::NEG_INFINITY`
    pub lb: f64,
    /// Upper bound, may be `f64::INFINITY`
    pub ub: f64,
}

/// A linear expression `sum(coeff * var) + constant`.
#[derive(Debug, Clone, Default)]
pub struct LinExpr {
    terms: Vec<(Var, f64)>,
    constant: f64,
}

impl LinExpr {
    pub fn new() -> LinExpr {
        LinExpr::default()
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn terms(&self) -> &[(Var, f64)] {
        &self.terms
    }

    /// Merges repeated variables and drops zero coefficients. Terms come out sorted by variable.
    pub fn compact(self) -> LinExpr {
        let mut merged = BTreeMap::new();
        for (var, coeff) in self.terms {
            *merged.entry(var).or_insert(0.0) += coeff;
        }
        LinExpr {
            terms: merged.into_iter().filter(|(_, c)| *c != 0.0).collect(),
            constant: self.constant,
        }
    }

    /// The value of the expression under `values`
    pub fn evaluate(&self, values: &TiSlice<Var, f64>) -> f64 {
        self.terms
            .iter()
            .map(|(var, coeff)| coeff * values[*var])
            .sum::<f64>()
            + self.constant
    }

    pub fn leq(self, rhs: impl Into<LinExpr>) -> ConstrExpr {
        ConstrExpr::new(self, Cmp::Le, rhs.into())
    }

    pub fn geq(self, rhs: impl Into<LinExpr>) -> ConstrExpr {
        ConstrExpr::new(self, Cmp::Ge, rhs.into())
    }

    pub fn eq(self, rhs: impl Into<LinExpr>) -> ConstrExpr {
        ConstrExpr::new(self, Cmp::Eq, rhs.into())
    }
}

impl From<Var> for LinExpr {
    fn from(var: Var) -> Self {
        LinExpr {
            terms: vec![(var, 1.0)],
            constant: 0.0,
        }
    }
}

impl From<&Var> for LinExpr {
    fn from(var: &Var) -> Self {
        LinExpr::from(*var)
    }
}

impl From<f64> for LinExpr {
    fn from(constant: f64) -> Self {
        LinExpr {
            terms: Vec::new(),
            constant,
        }
    }
}

impl<T: Into<LinExpr>> AddAssign<T> for LinExpr {
    fn add_assign(&mut self, rhs: T) {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
    }
}

impl<T: Into<LinExpr>> Add<T> for LinExpr {
    type Output = LinExpr;

    fn add(mut self, rhs: T) -> LinExpr {
        self += rhs;
        self
    }
}

impl<T: Into<LinExpr>> Sub<T> for LinExpr {
    type Output = LinExpr;

    fn sub(self, rhs: T) -> LinExpr {
        let rhs: LinExpr = rhs.into();
        self + rhs * -1.0
    }
}

impl Mul<f64> for LinExpr {
    type Output = LinExpr;

    fn mul(self, rhs: f64) -> LinExpr {
        LinExpr {
            terms: self.terms.into_iter().map(|(v, c)| (v, c * rhs)).collect(),
            constant: self.constant * rhs,
        }
    }
}

impl Mul<Var> for f64 {
    type Output = LinExpr;

    fn mul(self, rhs: Var) -> LinExpr {
        LinExpr {
            terms: vec![(rhs, self)],
            constant: 0.0,
        }
    }
}

impl<T: Into<LinExpr>> Add<T> for Var {
    type Output = LinExpr;

    fn add(self, rhs: T) -> LinExpr {
        LinExpr::from(self) + rhs
    }
}

impl<T: Into<LinExpr>> Sub<T> for Var {
    type Output = LinExpr;

    fn sub(self, rhs: T) -> LinExpr {
        LinExpr::from(self) - rhs
    }
}

/// Sum of anything convertible to a linear expression
pub trait LinSum {
    fn lin_sum(self) -> LinExpr;
}

impl<I, T> LinSum for I
where
    I: Iterator<Item = T>,
    T: Into<LinExpr>,
{
    fn lin_sum(self) -> LinExpr {
        self.fold(LinExpr::new(), |acc, e| acc + e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Le,
    Ge,
    Eq,
}

/// A constraint `lhs cmp rhs` before it is named and added to a model
#[derive(Debug, Clone)]
pub struct ConstrExpr {
    lhs: LinExpr,
    cmp: Cmp,
    rhs: LinExpr,
}

impl ConstrExpr {
    fn new(lhs: LinExpr, cmp: Cmp, rhs: LinExpr) -> ConstrExpr {
        ConstrExpr { lhs, cmp, rhs }
    }
}

/// A named constraint in normal form: all variables on the left, a constant on the right.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub name: String,
    pub expr: LinExpr,
    pub cmp: Cmp,
    pub rhs: f64,
}

impl Constraint {
    /// Whether the constraint holds under `values` within an absolute tolerance
    pub fn satisfied(&self, values: &TiSlice<Var, f64>, tol: f64) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.cmp {
            Cmp::Le => lhs <= self.rhs + tol,
            Cmp::Ge => lhs >= self.rhs - tol,
            Cmp::Eq => (lhs - self.rhs).abs() <= tol,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    vars: TiVec<Var, VarDef>,
    constrs: Vec<Constraint>,
    objective: LinExpr,
    sense: Sense,
}

impl Model {
    pub fn new(name: &str) -> Model {
        Model {
            name: name.to_string(),
            vars: TiVec::new(),
            constrs: Vec::new(),
            objective: LinExpr::new(),
            sense: Sense::Minimize,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_var(&mut self, name: &str, vtype: VarType, lb: f64, ub: f64) -> Var {
        let (lb, ub) = match vtype {
            VarType::Binary => (lb.max(0.0), ub.min(1.0)),
            _ => (lb, ub),
        };
        self.vars.push_and_get_key(VarDef {
            name: name.to_string(),
            vtype,
            lb,
            ub,
        })
    }

    pub fn add_constr(&mut self, name: &str, constr: ConstrExpr) {
        let ConstrExpr { lhs, cmp, rhs } = constr;
        let expr = (lhs - rhs).compact();
        let rhs = -expr.constant();
        let expr = LinExpr {
            terms: expr.terms,
            constant: 0.0,
        };
        self.constrs.push(Constraint {
            name: name.to_string(),
            expr,
            cmp,
            rhs,
        });
    }

    pub fn set_objective(&mut self, expr: impl Into<LinExpr>, sense: Sense) {
        self.objective = expr.into().compact();
        self.sense = sense;
    }

    pub fn vars(&self) -> &TiSlice<Var, VarDef> {
        &self.vars
    }

    pub fn var(&self, var: Var) -> &VarDef {
        &self.vars[var]
    }

    pub fn constrs(&self) -> &[Constraint] {
        &self.constrs
    }

    pub fn constr(&self, name: &str) -> Option<&Constraint> {
        self.constrs.iter().find(|c| c.name == name)
    }

    pub fn objective(&self) -> &LinExpr {
        &self.objective
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// Names of the bounds, integrality requirements and constraints violated by `values`.
    pub fn violations(&self, values: &TiSlice<Var, f64>, tol: f64) -> Vec<String> {
        let mut out = Vec::new();
        for (var, def) in self.vars.iter_enumerated() {
            let x = values[var];
            if x < def.lb - tol || x > def.ub + tol {
                out.push(format!("bound:{}", def.name));
            }
            if def.vtype != VarType::Continuous && (x - x.round()).abs() > tol {
                out.push(format!("integrality:{}", def.name));
            }
        }
        out.extend(
            self.constrs
                .iter()
                .filter(|c| !c.satisfied(values, tol))
                .map(|c| c.name.clone()),
        );
        out
    }

    pub fn is_feasible(&self, values: &TiSlice<Var, f64>, tol: f64) -> bool {
        self.violations(values, tol).is_empty()
    }
}

/// Classification of a solved 0/1 variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Indicator {
    Off,
    On,
    /// Not within tolerance of either 0 or 1
    Ambiguous(f64),
}

/// Values assigned to every variable of a model by a solver.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    values: TiVec<Var, f64>,
}

impl Assignment {
    /// Values are given in variable order
    pub fn new(values: TiVec<Var, f64>) -> Assignment {
        Assignment { values }
    }

    pub fn value(&self, var: Var) -> f64 {
        self.values[var]
    }

    pub fn values(&self) -> &TiSlice<Var, f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn evaluate(&self, expr: &LinExpr) -> f64 {
        expr.evaluate(&self.values)
    }

    /// Classifies a binary variable with tolerance `eps`
    pub fn indicator(&self, var: Var, eps: f64) -> Indicator {
        let x = self.values[var];
        if x.abs() <= eps {
            Indicator::Off
        } else if (x - 1.0).abs() <= eps {
            Indicator::On
        } else {
            Indicator::Ambiguous(x)
        }
    }
}

impl Index<Var> for Assignment {
    type Output = f64;

    fn index(&self, var: Var) -> &f64 {
        &self.values[var]
    }
}
