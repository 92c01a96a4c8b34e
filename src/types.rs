//! Identifiers for variables and sets of variables.
//!
//! Columns of a dataset (and nodes of a causal graph) are addressed by a plain
//! [`VarId`]. Conditioning sets are [`VarSet`]s: sorted, duplicate-free sets of
//! ids which behave like frozen sets, so they can key caches regardless of the
//! order in which the ids were supplied.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A column index in a dataset, or a node in a causal graph.
pub type VarId = usize;

/// A categorical code observed for a variable.
pub type Value = u32;

/// The value taken by every instance of the universal variable Ω.
pub const OMEGA_VALUE: Value = 1;

/// Identity of a [`Variable`][crate::variable::Variable].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum VarLabel {
    /// A column of the dataset.
    Column(VarId),
    /// A variable not backed by a dataset column.
    Unnamed,
    /// The universal, always-true variable Ω.
    Omega,
}

impl VarLabel {
    pub fn id(self) -> Option<VarId> {
        match self {
            VarLabel::Column(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for VarLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarLabel::Column(id) => write!(f, "{}", id),
            VarLabel::Unnamed => write!(f, "unnamed"),
            VarLabel::Omega => write!(f, "Ω"),
        }
    }
}

/// A frozen set of variable ids.
///
/// # Invariants
///
/// - The ids are kept sorted in ascending order
/// - No id appears twice
#[derive(Debug, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<VarId>", into = "Vec<VarId>")]
pub struct VarSet(Vec<VarId>);

impl VarSet {
    pub fn new() -> Self {
        VarSet(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: VarId) -> bool {
        self.0.binary_search(&id).is_ok()
    }

    /// Inserts `id`, returning `false` if it was already present.
    pub fn insert(&mut self, id: VarId) -> bool {
        match self.0.binary_search(&id) {
            Ok(_) => false,
            Err(pos) => {
                self.0.insert(pos, id);
                true
            }
        }
    }

    /// Removes `id`, returning `false` if it was absent.
    pub fn remove(&mut self, id: VarId) -> bool {
        match self.0.binary_search(&id) {
            Ok(pos) => {
                self.0.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Returns a copy of this set with `id` added.
    pub fn with(&self, id: VarId) -> Self {
        let mut set = self.clone();
        set.insert(id);
        set
    }

    /// Returns a copy of this set with `id` removed.
    pub fn without(&self, id: VarId) -> Self {
        let mut set = self.clone();
        set.remove(id);
        set
    }

    pub fn union(&self, other: &VarSet) -> Self {
        self.iter().chain(other.iter()).collect()
    }

    pub fn difference(&self, other: &VarSet) -> Self {
        self.iter().filter(|&id| !other.contains(id)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = VarId> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[VarId] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<VarId> {
        self.0.clone()
    }
}

impl FromIterator<VarId> for VarSet {
    fn from_iter<I: IntoIterator<Item = VarId>>(iter: I) -> Self {
        let mut ids: Vec<VarId> = iter.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        VarSet(ids)
    }
}

impl From<Vec<VarId>> for VarSet {
    fn from(ids: Vec<VarId>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<&[VarId]> for VarSet {
    fn from(ids: &[VarId]) -> Self {
        ids.iter().copied().collect()
    }
}

impl<const N: usize> From<[VarId; N]> for VarSet {
    fn from(ids: [VarId; N]) -> Self {
        ids.into_iter().collect()
    }
}

impl From<VarSet> for Vec<VarId> {
    fn from(set: VarSet) -> Self {
        set.0
    }
}

impl<'a> IntoIterator for &'a VarSet {
    type Item = VarId;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, VarId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().copied()
    }
}

impl fmt::Display for VarSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", id)?;
        }
        write!(f, "}}")
    }
}

/// Printable representation of a CI-test argument, as stored in results.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum VarRepr {
    Id(VarId),
    Set(VarSet),
    Omega,
    Unnamed,
}

impl VarRepr {
    /// Representation of a conditioning set: Ω when empty.
    pub fn of_set(set: &VarSet) -> Self {
        if set.is_empty() {
            VarRepr::Omega
        } else {
            VarRepr::Set(set.clone())
        }
    }
}

impl From<VarLabel> for VarRepr {
    fn from(label: VarLabel) -> Self {
        match label {
            VarLabel::Column(id) => VarRepr::Id(id),
            VarLabel::Unnamed => VarRepr::Unnamed,
            VarLabel::Omega => VarRepr::Omega,
        }
    }
}

impl fmt::Display for VarRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Width and alignment flags are honoured, results are rendered in columns.
        let s = match self {
            VarRepr::Id(id) => id.to_string(),
            VarRepr::Set(set) => set.to_string(),
            VarRepr::Omega => "Ω".to_string(),
            VarRepr::Unnamed => "unnamed".to_string(),
        };
        f.pad(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varset_is_sorted_and_deduplicated() {
        let set = VarSet::from([5, 1, 3, 1]);
        assert_eq!(set.as_slice(), &[1, 3, 5]);
        assert_eq!(set.len(), 3);
        assert!(set.contains(3));
        assert!(!set.contains(2));
    }

    #[test]
    fn test_varset_order_independent_key() {
        let a = VarSet::from([2, 0, 7]);
        let b = VarSet::from(vec![7, 2, 0]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_varset_insert_remove() {
        let mut set = VarSet::new();
        assert!(set.insert(4));
        assert!(!set.insert(4));
        assert!(set.insert(1));
        assert_eq!(set.as_slice(), &[1, 4]);
        assert!(set.remove(4));
        assert!(!set.remove(4));
        assert_eq!(set.with(9).without(1).as_slice(), &[9]);
    }

    #[test]
    fn test_varset_set_algebra() {
        let a = VarSet::from([1, 2, 3]);
        let b = VarSet::from([3, 4]);
        assert_eq!(a.union(&b).as_slice(), &[1, 2, 3, 4]);
        assert_eq!(a.difference(&b).as_slice(), &[1, 2]);
    }

    #[test]
    fn test_varset_serde_normalizes() {
        let set: VarSet = serde_json::from_str("[3, 1, 3]").unwrap();
        assert_eq!(set.as_slice(), &[1, 3]);
        assert_eq!(serde_json::to_string(&set).unwrap(), "[1,3]");
    }

    #[test]
    fn test_repr_display() {
        assert_eq!(VarRepr::Id(4).to_string(), "4");
        assert_eq!(VarRepr::of_set(&VarSet::new()).to_string(), "Ω");
        assert_eq!(VarRepr::of_set(&VarSet::from([2, 1])).to_string(), "{1, 2}");
        assert_eq!(format!("{:>4}", VarRepr::Id(7)), "   7");
        assert_eq!(VarRepr::from(VarLabel::Unnamed).to_string(), "unnamed");
    }
}
