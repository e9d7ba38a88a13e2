//! Ordered, duplicate-free container of school ids.

use std::collections::BTreeSet;

use shoal_types::SchoolId;

/// The materialized members of a view.
///
/// Keeps insertion order (the canonical population order) and rejects
/// duplicates in logarithmic time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Members {
    order: Vec<SchoolId>,
    seen: BTreeSet<SchoolId>,
}

impl Members {
    /// Create an empty container.
    pub const fn new() -> Self {
        Self {
            order: Vec::new(),
            seen: BTreeSet::new(),
        }
    }

    /// Append `id` unless already present. Returns whether it was added.
    pub fn insert(&mut self, id: SchoolId) -> bool {
        if self.seen.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    /// Whether `id` is a member.
    pub fn contains(&self, id: SchoolId) -> bool {
        self.seen.contains(&id)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether there are no members.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Members in order.
    pub fn as_slice(&self) -> &[SchoolId] {
        &self.order
    }

    /// Iterate over members in order.
    pub fn iter(&self) -> impl Iterator<Item = SchoolId> + '_ {
        self.order.iter().copied()
    }

    /// Remove every member.
    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }

    /// Members of `self` followed by the members of `other` not already
    /// present, preserving both orders.
    pub fn union(&self, other: &Self) -> Self {
        let mut pooled = self.clone();
        pooled.extend(other.iter());
        pooled
    }

    /// Whether every member of `self` is a member of `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.seen.is_subset(&other.seen)
    }
}

impl Extend<SchoolId> for Members {
    fn extend<I: IntoIterator<Item = SchoolId>>(&mut self, iter: I) {
        for id in iter {
            self.insert(id);
        }
    }
}

impl FromIterator<SchoolId> for Members {
    fn from_iter<I: IntoIterator<Item = SchoolId>>(iter: I) -> Self {
        let mut members = Self::new();
        members.extend(iter);
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_rejected_and_order_kept() {
        let a = SchoolId::new();
        let b = SchoolId::new();
        let mut members = Members::new();
        assert!(members.insert(b));
        assert!(members.insert(a));
        assert!(!members.insert(b));
        assert_eq!(members.as_slice(), &[b, a]);
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn union_keeps_left_order_then_new_right_members() {
        let ids: Vec<SchoolId> = (0..4).map(|_| SchoolId::new()).collect();
        let left: Members = ids.iter().take(3).copied().collect();
        let right: Members = ids.iter().skip(1).rev().copied().collect();

        let pooled = left.union(&right);
        let expected: Vec<SchoolId> = ids.iter().take(3).copied().chain(ids.last().copied()).collect();
        assert_eq!(pooled.as_slice(), expected.as_slice());
        assert!(left.is_subset(&pooled));
        assert!(right.is_subset(&pooled));
    }

    #[test]
    fn clear_empties_both_indexes() {
        let id = SchoolId::new();
        let mut members: Members = core::iter::once(id).collect();
        members.clear();
        assert!(members.is_empty());
        assert!(!members.contains(id));
        assert!(members.insert(id));
    }
}
