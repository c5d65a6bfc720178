use crate::{
    clause_db::ClauseId,
    Literal,
};
use alloc::vec::Vec;
use bounded::BoundedArray;

/// A registered watcher of a single literal with a blocker literal.
///
/// When the blocker is already satisfied the watched clause cannot be unit
/// and does not need to be resolved from the store.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Watcher {
    pub clause: ClauseId,
    pub blocker: Literal,
}

/// The watch lists of all literals.
///
/// A clause watches its first two literals; the watcher entry is keyed by
/// the negation of the watched literal so that assigning that key literal
/// wakes the clause.
#[derive(Debug, Default, Clone)]
pub(crate) struct WatchLists {
    lists: BoundedArray<Literal, Vec<Watcher>>,
}

impl WatchLists {
    /// Registers the given number of additional variables.
    pub fn register_new_variables(&mut self, new_variables: usize) {
        let total = self.lists.len() + 2 * new_variables;
        self.lists.resize_with(total, Vec::new);
    }

    /// Returns an exclusive reference to the watcher list of the literal.
    pub fn list_mut(&mut self, literal: Literal) -> &mut Vec<Watcher> {
        self.lists
            .get_mut(literal)
            .expect("encountered unexpected unregistered literal")
    }

    /// Starts watching the first two literals of the given clause.
    pub fn watch_clause(&mut self, clause: ClauseId, first: Literal, second: Literal) {
        self.list_mut(!first).push(Watcher {
            clause,
            blocker: second,
        });
        self.list_mut(!second).push(Watcher {
            clause,
            blocker: first,
        });
    }

    /// Stops watching the first two literals of the given clause.
    pub fn unwatch_clause(&mut self, clause: ClauseId, first: Literal, second: Literal) {
        for watched in [first, second] {
            self.list_mut(!watched)
                .retain(|watcher| watcher.clause != clause);
        }
    }
}
