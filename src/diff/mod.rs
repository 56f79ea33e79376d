//! Entity diff engine.
//!
//! Computes the `add` / `chg` / `rem` change-set between two snapshots of the
//! same registry object, so that an update command carries only what moved.
//!
//! # Rules
//!
//! | Field kind    | add           | rem           | chg                          |
//! |---------------|---------------|---------------|------------------------------|
//! | multi-valued  | `new \ old`   | `old \ new`   | never                        |
//! | scalar        | never         | never         | `new` when `old != new`      |
//!
//! Set difference is unordered and uses each member's normalized [`Member::key`],
//! so composite members (a nameserver with glue) compare on every attribute.
//! A group that ends up empty is reported as absent by
//! [`ChangeSet::add_clause`] and friends, and the codec omits it.
//!
//! ```rust,ignore
//! use epp::diff::diff;
//!
//! let changes = diff(&old_domain, &new_domain);
//! if let Some(add) = changes.add_clause() {
//!     println!("adding {} statuses", add.statuses.len());
//! }
//! ```

mod entity;

pub use entity::{ContactChangeSet, ContactChg, ContactMembers, DomainChangeSet, DomainChg, DomainMembers};

use std::collections::HashSet;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::model::NameServer;

/// A member of a multi-valued field.
pub trait Member: Clone {
    /// Normalized equality key.
    type Key: Eq + Hash;

    /// Key used for set membership.
    fn key(&self) -> Self::Key;
}

impl Member for String {
    type Key = String;

    fn key(&self) -> String {
        self.clone()
    }
}

impl Member for NameServer {
    type Key = (String, Vec<String>, Vec<String>);

    fn key(&self) -> Self::Key {
        let mut ipv4 = self.ipv4.clone();
        ipv4.sort();
        ipv4.dedup();
        let mut ipv6: Vec<String> = self.ipv6.iter().map(|a| a.to_lowercase()).collect();
        ipv6.sort();
        ipv6.dedup();
        (self.name.trim_end_matches('.').to_lowercase(), ipv4, ipv6)
    }
}

/// Set difference in both directions: `(new \ old, old \ new)`.
///
/// `add` keeps the order of `new`, `rem` the order of `old`. Duplicate keys
/// collapse to their first occurrence.
pub fn diff_members<T: Member>(old: &[T], new: &[T]) -> (Vec<T>, Vec<T>) {
    let old_keys: HashSet<T::Key> = old.iter().map(Member::key).collect();
    let new_keys: HashSet<T::Key> = new.iter().map(Member::key).collect();
    (only_in(new, &old_keys), only_in(old, &new_keys))
}

fn only_in<T: Member>(items: &[T], exclude: &HashSet<T::Key>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| {
            let key = item.key();
            !exclude.contains(&key) && seen.insert(key)
        })
        .cloned()
        .collect()
}

/// `Some(new)` when the scalar changed, including to or from absent.
pub fn diff_scalar<T: PartialEq + Clone>(old: &T, new: &T) -> Option<T> {
    (old != new).then(|| new.clone())
}

/// A group of an update that may be omitted.
pub trait Clause {
    /// Nothing to send for this group.
    fn is_empty(&self) -> bool;
}

/// Partial update derived from two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet<M, C> {
    /// Members to add
    pub add: M,
    /// Scalars to change
    pub chg: C,
    /// Members to remove
    pub rem: M,
}

impl<M: Clause, C: Clause> ChangeSet<M, C> {
    /// No group carries anything.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.chg.is_empty() && self.rem.is_empty()
    }

    /// The `add` group, unless empty.
    pub fn add_clause(&self) -> Option<&M> {
        (!self.add.is_empty()).then_some(&self.add)
    }

    /// The `chg` group, unless empty.
    pub fn chg_clause(&self) -> Option<&C> {
        (!self.chg.is_empty()).then_some(&self.chg)
    }

    /// The `rem` group, unless empty.
    pub fn rem_clause(&self) -> Option<&M> {
        (!self.rem.is_empty()).then_some(&self.rem)
    }
}

/// Objects that can be diffed into a [`ChangeSet`].
pub trait Diffable {
    /// Multi-valued fields.
    type Members: Clause;
    /// Scalar fields.
    type Chg: Clause;

    /// Compute the change-set turning `old` into `new`.
    fn diff(old: &Self, new: &Self) -> ChangeSet<Self::Members, Self::Chg>;
}

/// Compute the change-set turning `old` into `new`.
pub fn diff<T: Diffable>(old: &T, new: &T) -> ChangeSet<T::Members, T::Chg> {
    T::diff(old, new)
}
