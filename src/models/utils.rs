use std::{collections::BTreeMap, ops::Range};

use super::milp::{Assignment, Model, Var, VarType};

pub trait AddVars {
    type Out;

    /// Create a variable with a closure
    fn vars_with<F: FnMut(Self) -> Var>(&self, func: F) -> Self::Out
    where
        Self: Sized;

    /// Create a variable for any type
    fn vars(&self, model: &mut Model, base_name: &str, vtype: VarType, bounds: &Range<f64>)
        -> Self::Out;

    /// Binary variables
    fn binary(&self, model: &mut Model, base_name: &str) -> Self::Out {
        self.vars(model, base_name, VarType::Binary, &(0.0..1.0))
    }

    /// A continuous non-negative variable
    fn cont(&self, model: &mut Model, base_name: &str) -> Self::Out {
        self.vars(model, base_name, VarType::Continuous, &(0.0..f64::INFINITY))
    }

    /// A non-negative integer variable
    fn int(&self, model: &mut Model, base_name: &str) -> Self::Out {
        self.vars(model, base_name, VarType::Integer, &(0.0..f64::INFINITY))
    }
}

impl AddVars for usize {
    type Out = Vec<Var>;

    fn vars_with<F: FnMut(Self) -> Var>(&self, func: F) -> Self::Out
    where
        Self: Sized,
    {
        (0..*self).map(func).collect()
    }

    fn vars(
        &self,
        model: &mut Model,
        base_name: &str,
        vtype: VarType,
        bounds: &Range<f64>,
    ) -> Self::Out {
        self.vars_with(|i| {
            model.add_var(
                &format!("{}_{}", base_name, i),
                vtype,
                bounds.start,
                bounds.end,
            )
        })
    }
}

impl AddVars for (usize, usize) {
    type Out = Vec<<usize as AddVars>::Out>;

    fn vars(
        &self,
        model: &mut Model,
        base_name: &str,
        vtype: VarType,
        bounds: &Range<f64>,
    ) -> Self::Out {
        (0..self.0)
            .map(|i| {
                self.1
                    .vars(model, &format!("{}_{}", base_name, i), vtype, bounds)
            })
            .collect()
    }

    fn vars_with<F: FnMut(Self) -> Var>(&self, mut func: F) -> Self::Out
    where
        Self: Sized,
    {
        let mut out = Vec::with_capacity(self.0);
        for i in 0..self.0 {
            out.push(self.1.vars_with(|j| func((i, j))));
        }
        out
    }
}

impl AddVars for (usize, usize, usize) {
    type Out = Vec<<(usize, usize) as AddVars>::Out>;

    fn vars(
        &self,
        model: &mut Model,
        base_name: &str,
        vtype: VarType,
        bounds: &Range<f64>,
    ) -> Self::Out {
        (0..self.0)
            .map(|i| {
                (self.1, self.2).vars(model, &format!("{}_{}", base_name, i), vtype, bounds)
            })
            .collect()
    }

    fn vars_with<F: FnMut(Self) -> Var>(&self, mut func: F) -> Self::Out
    where
        Self: Sized,
    {
        let mut out = Vec::with_capacity(self.0);
        for i in 0..self.0 {
            out.push((self.1, self.2).vars_with(|(j, k)| func((i, j, k))));
        }
        out
    }
}

impl AddVars for (usize, usize, usize, usize) {
    type Out = Vec<<(usize, usize, usize) as AddVars>::Out>;

    fn vars(
        &self,
        model: &mut Model,
        base_name: &str,
        vtype: VarType,
        bounds: &Range<f64>,
    ) -> Self::Out {
        (0..self.0)
            .map(|i| {
                (self.1, self.2, self.3).vars(
                    model,
                    &format!("{}_{}", base_name, i),
                    vtype,
                    bounds,
                )
            })
            .collect()
    }

    fn vars_with<F: FnMut(Self) -> Var>(&self, mut func: F) -> Self::Out
    where
        Self: Sized,
    {
        let mut out = Vec::with_capacity(self.0);
        for i in 0..self.0 {
            out.push((self.1, self.2, self.3).vars_with(|(j, k, l)| func((i, j, k, l))));
        }
        out
    }
}

/// Variables for a sparse index set, keyed by the index itself and named by `name`.
/// Iteration over the result follows the ordering of `K`.
pub fn keyed_vars<K, I, F>(
    indices: I,
    model: &mut Model,
    vtype: VarType,
    bounds: &Range<f64>,
    name: F,
) -> BTreeMap<K, Var>
where
    K: Ord,
    I: IntoIterator<Item = K>,
    F: Fn(&K) -> String,
{
    indices
        .into_iter()
        .map(|k| {
            let var = model.add_var(&name(&k), vtype, bounds.start, bounds.end);
            (k, var)
        })
        .collect()
}

/// Trait that converts model variables to the values assigned by a solver
pub trait ConvertVars {
    type Out;
    fn convert(&self, assignment: &Assignment) -> Self::Out;
}

impl<T: ConvertVars> ConvertVars for Vec<T> {
    type Out = Vec<T::Out>;

    fn convert(&self, assignment: &Assignment) -> Self::Out {
        self.iter().map(|e| e.convert(assignment)).collect()
    }
}

impl<K: Ord + Clone> ConvertVars for BTreeMap<K, Var> {
    type Out = BTreeMap<K, f64>;

    fn convert(&self, assignment: &Assignment) -> Self::Out {
        self.iter()
            .map(|(k, var)| (k.clone(), assignment.value(*var)))
            .collect()
    }
}

impl ConvertVars for Var {
    type Out = f64;

    fn convert(&self, assignment: &Assignment) -> Self::Out {
        assignment.value(*self)
    }
}
