//! Pairwise travel cost matrix.

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::Objective;
use crate::error::{PlannerError, Result};
use crate::stop::StopId;

/// Travel cost of one directed leg.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TravelCost {
    /// Meters.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
}

impl TravelCost {
    pub const ZERO: TravelCost = TravelCost {
        distance: 0.0,
        duration: 0.0,
    };

    pub fn new(distance: f64, duration: f64) -> Self {
        Self { distance, duration }
    }

    /// The component the optimizer minimizes.
    pub fn value(&self, objective: Objective) -> f64 {
        match objective {
            Objective::Distance => self.distance,
            Objective::Duration => self.duration,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.distance.is_finite()
            && self.duration.is_finite()
            && self.distance >= 0.0
            && self.duration >= 0.0
    }
}

/// Directed cost matrix over the stops of a run.
///
/// Entries for (a, b) and (b, a) are stored independently. The diagonal is
/// always zero; every other entry starts out missing.
#[derive(Debug, Clone)]
pub struct CostMatrix {
    ids: Vec<StopId>,
    index: FxHashMap<StopId, usize>,
    entries: Vec<Option<TravelCost>>,
}

impl CostMatrix {
    pub fn new(ids: Vec<StopId>) -> Self {
        let n = ids.len();
        let index = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut entries = vec![None; n * n];
        for i in 0..n {
            entries[i * n + i] = Some(TravelCost::ZERO);
        }

        Self { ids, index, entries }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[StopId] {
        &self.ids
    }

    pub fn index_of(&self, id: &StopId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Stores the cost of `from -> to`. Returns false when either id is unknown.
    pub fn insert(&mut self, from: &StopId, to: &StopId, cost: TravelCost) -> bool {
        match (self.index_of(from), self.index_of(to)) {
            (Some(i), Some(j)) => {
                self.set(i, j, cost);
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, from: &StopId, to: &StopId) -> Option<TravelCost> {
        let (i, j) = (self.index_of(from)?, self.index_of(to)?);
        let n = self.len();
        self.entries[i * n + j].take()
    }

    pub fn get(&self, from: &StopId, to: &StopId) -> Option<TravelCost> {
        let (i, j) = (self.index_of(from)?, self.index_of(to)?);
        self.get_at(i, j)
    }

    /// Cost of `from -> to`, failing when the entry is absent.
    pub fn cost(&self, from: &StopId, to: &StopId) -> Result<TravelCost> {
        self.get(from, to)
            .ok_or_else(|| PlannerError::IncompleteMatrix {
                from: from.clone(),
                to: to.clone(),
            })
    }

    /// Ordered pairs of distinct stops that have no entry yet.
    pub fn missing_pairs(&self) -> Vec<(StopId, StopId)> {
        let n = self.len();
        let mut missing = Vec::new();
        for i in 0..n {
            for j in 0..n {
                if i != j && self.entries[i * n + j].is_none() {
                    missing.push((self.ids[i].clone(), self.ids[j].clone()));
                }
            }
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(Option::is_some)
    }

    pub(crate) fn get_at(&self, i: usize, j: usize) -> Option<TravelCost> {
        self.entries[i * self.len() + j]
    }

    pub(crate) fn set(&mut self, i: usize, j: usize, cost: TravelCost) {
        let n = self.len();
        self.entries[i * n + j] = Some(cost);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<StopId> {
        names.iter().map(|name| StopId::from(*name)).collect()
    }

    #[test]
    fn test_new_matrix_has_zero_diagonal_and_nothing_else() {
        let matrix = CostMatrix::new(ids(&["d", "a", "b"]));
        for id in matrix.ids() {
            assert_eq!(matrix.get(id, id), Some(TravelCost::ZERO));
        }
        assert_eq!(matrix.missing_pairs().len(), 6);
        assert!(!matrix.is_complete());
    }

    #[test]
    fn test_directed_entries_are_independent() {
        let mut matrix = CostMatrix::new(ids(&["a", "b"]));
        let (a, b) = (StopId::from("a"), StopId::from("b"));

        assert!(matrix.insert(&a, &b, TravelCost::new(100.0, 10.0)));
        assert!(matrix.get(&b, &a).is_none());
        assert!(matrix.insert(&b, &a, TravelCost::new(250.0, 40.0)));

        assert_eq!(matrix.cost(&a, &b).unwrap().distance, 100.0);
        assert_eq!(matrix.cost(&b, &a).unwrap().distance, 250.0);
        assert!(matrix.is_complete());
    }

    #[test]
    fn test_missing_entry_is_incomplete_matrix_error() {
        let matrix = CostMatrix::new(ids(&["a", "b"]));
        let err = matrix.cost(&"a".into(), &"b".into()).unwrap_err();
        assert!(matches!(err, PlannerError::IncompleteMatrix { .. }));
    }

    #[test]
    fn test_unknown_id_is_rejected() {
        let mut matrix = CostMatrix::new(ids(&["a", "b"]));
        assert!(!matrix.insert(&"a".into(), &"z".into(), TravelCost::ZERO));
        assert!(matrix.get(&"z".into(), &"a".into()).is_none());
    }

    #[test]
    fn test_objective_value() {
        let cost = TravelCost::new(1200.0, 95.0);
        assert_eq!(cost.value(Objective::Distance), 1200.0);
        assert_eq!(cost.value(Objective::Duration), 95.0);
        assert!(cost.is_valid());
        assert!(!TravelCost::new(-1.0, 0.0).is_valid());
        assert!(!TravelCost::new(f64::INFINITY, 0.0).is_valid());
    }
}
