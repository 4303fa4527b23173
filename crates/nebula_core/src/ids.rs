//! Entity identifiers.
//!
//! Identifiers are dense opaque integers. [`INVALID_ID`] is reserved and
//! never names an entity.

use std::collections::HashMap;

/// Entity identifier shared by every entity table.
pub type Id = u64;

/// Reserved sentinel for "no entity".
pub const INVALID_ID: Id = 0;

/// Keys of an entity table in ascending order.
///
/// Entity tables are hashed, so any traversal whose order can reach an
/// output must go through this first.
#[must_use]
pub fn sorted_ids<V>(map: &HashMap<Id, V>) -> Vec<Id> {
    let mut ids: Vec<Id> = map.keys().copied().collect();
    ids.sort_unstable();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_ids_ignores_insertion_order() {
        let mut a = HashMap::new();
        let mut b = HashMap::new();
        for id in [5, 1, 9, 3] {
            a.insert(id, ());
        }
        for id in [3, 9, 1, 5] {
            b.insert(id, ());
        }
        assert_eq!(sorted_ids(&a), vec![1, 3, 5, 9]);
        assert_eq!(sorted_ids(&a), sorted_ids(&b));
    }
}
