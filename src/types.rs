//! Type-safe wrappers for decision-diagram variables, literals and orderings.
//!
//! The symbolic front-end talks about row, column and nondeterminism variables
//! of the decision diagram that encodes a transition relation. These newtypes
//! keep variable ids, literals and positions within an ordering apart.
use std::fmt;

/// A decision-diagram variable identifier (1-indexed).
///
/// # Invariants
///
/// - Variable IDs must be >= 1 (0 is reserved for terminals)
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    /// Creates a new variable with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if `id == 0`. Variables must be 1-indexed.
    pub fn new(id: u32) -> Self {
        assert_ne!(id, 0, "Variable IDs must be >= 1");
        Var(id)
    }

    /// Returns the raw variable ID as a `u32`.
    pub fn id(self) -> u32 {
        self.0
    }

    /// Positive literal of this variable.
    pub fn pos(self) -> Lit {
        Lit::new(self, true)
    }

    /// Negative literal of this variable.
    pub fn neg(self) -> Lit {
        Lit::new(self, false)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl From<Var> for u32 {
    fn from(var: Var) -> Self {
        var.0
    }
}

/// A literal: a variable together with the value it is fixed to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Lit {
    var: Var,
    positive: bool,
}

impl Lit {
    pub fn new(var: Var, positive: bool) -> Self {
        Lit { var, positive }
    }

    /// Creates a literal from a signed DIMACS-style integer.
    ///
    /// # Panics
    ///
    /// Panics if `lit == 0`.
    pub fn from_dimacs(lit: i32) -> Self {
        assert_ne!(lit, 0, "Literal must be non-zero");
        Lit::new(Var::new(lit.unsigned_abs()), lit > 0)
    }

    pub fn var(self) -> Var {
        self.var
    }

    pub fn is_positive(self) -> bool {
        self.positive
    }

    pub fn to_dimacs(self) -> i32 {
        let v = self.var.id() as i32;
        if self.positive {
            v
        } else {
            -v
        }
    }
}

impl From<i32> for Lit {
    fn from(lit: i32) -> Self {
        Lit::from_dimacs(lit)
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.positive {
            write!(f, "{}", self.var)
        } else {
            write!(f, "~{}", self.var)
        }
    }
}

/// An ordered sequence of variables encoding one integer-valued component
/// (source state, destination state, or nondeterministic choice).
///
/// The first variable is the most significant bit.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct VarOrder(Vec<Var>);

impl VarOrder {
    pub fn new(vars: impl IntoIterator<Item = Var>) -> Self {
        VarOrder(vars.into_iter().collect())
    }

    /// Creates an ordering over the given raw variable ids.
    pub fn from_ids(ids: impl IntoIterator<Item = u32>) -> Self {
        Self::new(ids.into_iter().map(Var::new))
    }

    pub fn vars(&self) -> &[Var] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of `var` within this ordering, if present.
    pub fn position(&self, var: Var) -> Option<usize> {
        self.0.iter().position(|&v| v == var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_creation() {
        let v1 = Var::new(1);
        let v2 = Var::new(2);
        assert_eq!(v1.id(), 1);
        assert_eq!(v2.id(), 2);
        assert!(v1 < v2);
    }

    #[test]
    #[should_panic(expected = "Variable IDs must be >= 1")]
    fn test_var_zero_panics() {
        Var::new(0);
    }

    #[test]
    fn test_lit_dimacs() {
        let lit = Lit::from_dimacs(-3);
        assert_eq!(lit.var(), Var::new(3));
        assert!(!lit.is_positive());
        assert_eq!(lit.to_dimacs(), -3);
        assert_eq!(Lit::from(4), Var::new(4).pos());
        assert_eq!(lit.to_string(), "~x3");
    }

    #[test]
    fn test_var_order() {
        let order = VarOrder::from_ids([1, 3, 5]);
        assert_eq!(order.len(), 3);
        assert_eq!(order.position(Var::new(3)), Some(1));
        assert_eq!(order.position(Var::new(2)), None);
    }
}
