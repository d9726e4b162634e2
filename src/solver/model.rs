//! Declarative constraint model.
//!
//! A `CpModel` holds integer and boolean variables, exactly-one constraints,
//! bounded linear constraints, and an optional linear objective to minimize.
//! All coefficients are integers.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Handle to a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Position of the variable in the model.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Kind of a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Domain {0, 1}.
    Bool,
    /// Bounded integer domain.
    Int,
}

/// A model variable.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Name for diagnostics.
    pub name: String,
    /// Variable kind.
    pub kind: VarKind,
    /// Lower bound (inclusive).
    pub lo: i64,
    /// Upper bound (inclusive).
    pub hi: i64,
}

/// A linear expression Σ coefᵢ·varᵢ + constant.
///
/// Terms on the same variable are merged and zero coefficients dropped, so
/// `occ(v) - occ(w)` cancels variables common to both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpr {
    terms: BTreeMap<VarId, i64>,
    constant: i64,
}

impl LinearExpr {
    /// The zero expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// A constant expression.
    pub fn constant(value: i64) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: value,
        }
    }

    /// Sum of variables with coefficient 1.
    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        vars.into_iter().map(|v| (v, 1)).collect()
    }

    /// Adds `coef · var`.
    pub fn add_term(&mut self, var: VarId, coef: i64) {
        let entry = self.terms.entry(var).or_insert(0);
        *entry += coef;
        if *entry == 0 {
            self.terms.remove(&var);
        }
    }

    /// Adds a constant.
    pub fn add_constant(&mut self, value: i64) {
        self.constant += value;
    }

    /// Builder form of [`add_term`](Self::add_term).
    pub fn with_term(mut self, var: VarId, coef: i64) -> Self {
        self.add_term(var, coef);
        self
    }

    /// Non-zero terms in variable order.
    pub fn terms(&self) -> impl Iterator<Item = (VarId, i64)> + '_ {
        self.terms.iter().map(|(v, c)| (*v, *c))
    }

    /// Constant part.
    pub fn constant_value(&self) -> i64 {
        self.constant
    }

    /// Number of non-zero terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the expression has no variable terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether any term has a positive coefficient.
    pub fn has_positive_term(&self) -> bool {
        self.terms.values().any(|c| *c > 0)
    }

    /// Evaluates the expression against a full assignment.
    pub fn evaluate(&self, values: &[i64]) -> i64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values[v.0])
            .sum::<i64>()
            + self.constant
    }
}

impl FromIterator<(VarId, i64)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (VarId, i64)>>(iter: I) -> Self {
        let mut expr = LinearExpr::new();
        for (var, coef) in iter {
            expr.add_term(var, coef);
        }
        expr
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, other: LinearExpr) -> LinearExpr {
        for (var, coef) in other.terms {
            self.add_term(var, coef);
        }
        self.constant += other.constant;
        self
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(mut self) -> LinearExpr {
        for coef in self.terms.values_mut() {
            *coef = -*coef;
        }
        self.constant = -self.constant;
        self
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;

    fn sub(self, other: LinearExpr) -> LinearExpr {
        self + (-other)
    }
}

/// A model constraint.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Exactly one of the boolean variables is true.
    ExactlyOne(Vec<VarId>),
    /// lo ≤ expr ≤ hi. `i64::MIN` / `i64::MAX` leave a side open.
    Linear { expr: LinearExpr, lo: i64, hi: i64 },
}

/// A constraint model with an optional minimization objective.
#[derive(Debug, Clone, Default)]
pub struct CpModel {
    name: String,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: Option<LinearExpr>,
}

impl CpModel {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates a boolean variable.
    pub fn new_bool_var(&mut self, name: impl Into<String>) -> VarId {
        self.push_var(name.into(), VarKind::Bool, 0, 1)
    }

    /// Creates an integer variable with domain [lo, hi].
    pub fn new_int_var(&mut self, lo: i64, hi: i64, name: impl Into<String>) -> VarId {
        self.push_var(name.into(), VarKind::Int, lo, hi)
    }

    fn push_var(&mut self, name: String, kind: VarKind, lo: i64, hi: i64) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(Variable { name, kind, lo, hi });
        id
    }

    /// Requires exactly one of `vars` to be true.
    pub fn add_exactly_one(&mut self, vars: impl IntoIterator<Item = VarId>) {
        self.constraints
            .push(Constraint::ExactlyOne(vars.into_iter().collect()));
    }

    /// Requires lo ≤ expr ≤ hi.
    pub fn add_linear(&mut self, expr: LinearExpr, lo: i64, hi: i64) {
        self.constraints.push(Constraint::Linear { expr, lo, hi });
    }

    /// Requires lhs ≤ rhs.
    pub fn add_le(&mut self, lhs: LinearExpr, rhs: LinearExpr) {
        self.add_linear(lhs - rhs, i64::MIN, 0);
    }

    /// Requires expr = value.
    pub fn add_eq(&mut self, expr: LinearExpr, value: i64) {
        self.add_linear(expr, value, value);
    }

    /// Sets the expression to minimize.
    pub fn minimize(&mut self, expr: LinearExpr) {
        self.objective = Some(expr);
    }

    /// All variables, indexed by [`VarId::index`].
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Looks up a variable.
    pub fn variable(&self, id: VarId) -> Option<&Variable> {
        self.variables.get(id.0)
    }

    /// All constraints.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The objective, if set.
    pub fn objective(&self) -> Option<&LinearExpr> {
        self.objective.as_ref()
    }

    /// Whether an objective is set.
    pub fn has_objective(&self) -> bool {
        self.objective.is_some()
    }

    /// Number of variables.
    pub fn var_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Checks the model is well formed.
    ///
    /// Detects empty domains, out-of-range variable references, exactly-one
    /// constraints over non-boolean variables, and empty linear ranges.
    pub fn validate(&self) -> Result<(), String> {
        for (i, var) in self.variables.iter().enumerate() {
            if var.lo > var.hi {
                return Err(format!("variable '{}' (v{}) has an empty domain", var.name, i));
            }
            if var.kind == VarKind::Bool && (var.lo < 0 || var.hi > 1) {
                return Err(format!("boolean variable '{}' has domain outside [0, 1]", var.name));
            }
        }

        for (i, constraint) in self.constraints.iter().enumerate() {
            match constraint {
                Constraint::ExactlyOne(vars) => {
                    for var in vars {
                        match self.variable(*var) {
                            None => return Err(format!("constraint {i} references unknown {var}")),
                            Some(v) if v.kind != VarKind::Bool => {
                                return Err(format!(
                                    "exactly-one constraint {i} uses integer variable '{}'",
                                    v.name
                                ))
                            }
                            Some(_) => {}
                        }
                    }
                }
                Constraint::Linear { expr, lo, hi } => {
                    if lo > hi {
                        return Err(format!("linear constraint {i} has empty range [{lo}, {hi}]"));
                    }
                    self.check_refs(expr, &format!("constraint {i}"))?;
                }
            }
        }

        if let Some(objective) = &self.objective {
            self.check_refs(objective, "objective")?;
        }

        Ok(())
    }

    fn check_refs(&self, expr: &LinearExpr, context: &str) -> Result<(), String> {
        match expr.terms().find(|(v, _)| v.0 >= self.variables.len()) {
            Some((var, _)) => Err(format!("{context} references unknown {var}")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_merges_terms() {
        let mut model = CpModel::new("t");
        let a = model.new_bool_var("a");
        let b = model.new_bool_var("b");
        let c = model.new_bool_var("c");

        let lhs = LinearExpr::sum([a, b]);
        let rhs = LinearExpr::sum([b, c]);
        let diff = lhs - rhs;
        let terms: Vec<(VarId, i64)> = diff.terms().collect();
        assert_eq!(terms, vec![(a, 1), (c, -1)]);
        assert!(diff.has_positive_term());
        assert!(!(LinearExpr::new() - LinearExpr::sum([a])).has_positive_term());
    }

    #[test]
    fn test_expr_evaluate() {
        let expr = LinearExpr::constant(3)
            .with_term(VarId(0), 2)
            .with_term(VarId(1), -1);
        assert_eq!(expr.evaluate(&[4, 5]), 3 + 8 - 5);
        assert_eq!(expr.len(), 2);
    }

    #[test]
    fn test_model_counts() {
        let mut model = CpModel::new("packing");
        let a = model.new_bool_var("a");
        let b = model.new_bool_var("b");
        let d = model.new_int_var(0, 10, "depth");
        model.add_exactly_one([a, b]);
        model.add_eq(LinearExpr::new().with_term(d, 1).with_term(a, -3), 0);
        model.minimize(LinearExpr::sum([d]));

        assert_eq!(model.name(), "packing");
        assert_eq!(model.var_count(), 3);
        assert_eq!(model.constraint_count(), 2);
        assert!(model.has_objective());
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_malformed() {
        let mut model = CpModel::new("bad");
        model.new_int_var(5, 1, "empty");
        assert!(model.validate().unwrap_err().contains("empty domain"));

        let mut model = CpModel::new("bad");
        let d = model.new_int_var(0, 3, "d");
        model.add_exactly_one([d]);
        assert!(model.validate().unwrap_err().contains("integer variable"));

        let mut model = CpModel::new("bad");
        model.add_eq(LinearExpr::sum([VarId(7)]), 1);
        assert!(model.validate().unwrap_err().contains("unknown v7"));

        let mut model = CpModel::new("bad");
        let a = model.new_bool_var("a");
        model.add_linear(LinearExpr::sum([a]), 2, 1);
        assert!(model.validate().is_err());
    }
}
