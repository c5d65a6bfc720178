mod learning;
mod model;
mod trail;
mod watch_list;

pub use self::model::{
    LastModel,
    Model,
    ModelError,
};
pub(crate) use self::{
    learning::{
        ConflictAnalyzer,
        LearntClause,
    },
    watch_list::Watcher,
};
use self::{
    trail::Trail,
    watch_list::WatchLists,
};
use crate::{
    clause_db::{
        ClauseId,
        ClauseStore,
    },
    decider::Decider,
    Literal,
    Variable,
};
use bounded::{
    BoundedArray,
    BoundedMap,
};
use core::mem;

/// Decision level and implying clause of an assigned variable.
#[derive(Debug, Default, Copy, Clone)]
pub(crate) struct VarData {
    level: u32,
    reason: Option<ClauseId>,
}

/// Everything related to variable assignment.
///
/// Combines the partial assignment, the trail with its decision levels, the
/// per-variable implication records and the 2-watched-literal lists.
#[derive(Debug, Default, Clone)]
pub(crate) struct Assignment {
    values: BoundedMap<Variable, bool>,
    var_data: BoundedArray<Variable, VarData>,
    trail: Trail,
    watches: WatchLists,
}

impl Assignment {
    /// Registers the given number of additional variables.
    pub fn register_new_variables(&mut self, new_variables: usize) {
        let total = self.values.capacity() + new_variables;
        self.values.resize_capacity(total);
        self.var_data.resize_with(total, VarData::default);
        self.trail.register_new_variables(new_variables);
        self.watches.register_new_variables(new_variables);
    }

    /// Returns the partial assignment of all variables.
    pub fn variable_values(&self) -> &BoundedMap<Variable, bool> {
        &self.values
    }

    /// Returns the value of the given literal under the current assignment.
    ///
    /// Returns `None` if the literal's variable is unassigned.
    pub fn value_of(&self, literal: Literal) -> Option<bool> {
        self.values
            .get(literal.variable())
            .expect("encountered unexpected unregistered variable")
            .map(|&value| value == literal.is_positive())
    }

    /// Returns the current decision level.
    pub fn decision_level(&self) -> u32 {
        self.trail.decision_level()
    }

    /// Opens a new decision level.
    pub fn new_decision_level(&mut self) {
        self.trail.new_decision_level();
    }

    /// Returns the current length of the trail.
    pub fn trail_len(&self) -> usize {
        self.trail.len()
    }

    /// Returns the literal at the given trail position.
    pub fn trail_lit(&self, position: usize) -> Literal {
        self.trail.lit(position)
    }

    /// Returns the trail position at which the given decision level starts.
    pub fn level_start(&self, level: u32) -> usize {
        self.trail.level_start(level)
    }

    /// Returns the decision level at which the variable was assigned.
    pub fn level_of(&self, variable: Variable) -> u32 {
        self.var_data
            .get(variable)
            .expect("encountered unexpected unregistered variable")
            .level
    }

    /// Returns the clause that implied the variable's assignment if any.
    pub fn reason_of(&self, variable: Variable) -> Option<ClauseId> {
        self.var_data
            .get(variable)
            .expect("encountered unexpected unregistered variable")
            .reason
    }

    /// Drops the reason record of the given variable.
    ///
    /// Used when the implying clause is removed while the assignment stays.
    pub fn clear_reason(&mut self, variable: Variable) {
        self.var_data
            .get_mut(variable)
            .expect("encountered unexpected unregistered variable")
            .reason = None;
    }

    /// Asserts the literal as a decision or implication.
    ///
    /// The literal's variable must be unassigned. This only places the
    /// literal on the trail; propagation is a separate step.
    pub fn enqueue(&mut self, literal: Literal, reason: Option<ClauseId>) {
        debug_assert!(self.value_of(literal).is_none());
        let variable = literal.variable();
        self.values
            .insert(variable, literal.is_positive())
            .expect("encountered unexpected unregistered variable");
        self.var_data
            .update(
                variable,
                VarData {
                    level: self.trail.decision_level(),
                    reason,
                },
            )
            .expect("encountered unexpected unregistered variable");
        self.trail.push(literal);
    }

    /// Starts watching the first two literals of the given clause.
    pub fn watch_clause(&mut self, clause: ClauseId, first: Literal, second: Literal) {
        self.watches.watch_clause(clause, first, second);
    }

    /// Stops watching the first two literals of the given clause.
    pub fn unwatch_clause(&mut self, clause: ClauseId, first: Literal, second: Literal) {
        self.watches.unwatch_clause(clause, first, second);
    }

    /// Propagates all enqueued literals.
    ///
    /// Returns the conflicting clause if propagation found one. In that case
    /// the propagation queue is abandoned; the caller is expected to resolve
    /// the conflict or unwind.
    pub fn propagate(
        &mut self,
        store: &mut ClauseStore,
        propagations: &mut u64,
    ) -> Option<ClauseId> {
        while let Some(literal) = self.trail.pop_enqueued() {
            *propagations += 1;
            if let Some(conflicting) = self.propagate_literal(literal, store) {
                self.trail.mark_all_propagated();
                return Some(conflicting)
            }
        }
        None
    }

    /// Propagates a single literal that just became satisfied.
    fn propagate_literal(
        &mut self,
        literal: Literal,
        store: &mut ClauseStore,
    ) -> Option<ClauseId> {
        let false_lit = !literal;
        let mut conflicting = None;
        // The list is taken out so that replacement watches can be pushed
        // onto other lists while this one is traversed.
        let mut watchers = mem::take(self.watches.list_mut(literal));
        let mut read = 0;
        let mut write = 0;
        while read < watchers.len() {
            let watcher = watchers[read];
            read += 1;
            if self.value_of(watcher.blocker) == Some(true) {
                watchers[write] = watcher;
                write += 1;
                continue
            }
            let lits = store.get_mut(watcher.clause).lits_mut();
            if lits[0] == false_lit {
                lits.swap(0, 1);
            }
            debug_assert_eq!(lits[1], false_lit);
            let first = lits[0];
            if first != watcher.blocker && self.value_of(first) == Some(true) {
                watchers[write] = Watcher {
                    clause: watcher.clause,
                    blocker: first,
                };
                write += 1;
                continue
            }
            // Look for a replacement watch among the remaining literals.
            let replacement = (2..lits.len())
                .find(|&index| self.value_of(lits[index]) != Some(false));
            match replacement {
                Some(index) => {
                    lits.swap(1, index);
                    let new_watched = lits[1];
                    self.watches.list_mut(!new_watched).push(Watcher {
                        clause: watcher.clause,
                        blocker: first,
                    });
                }
                None => {
                    // The clause is unit or conflicting under the assignment.
                    watchers[write] = watcher;
                    write += 1;
                    match self.value_of(first) {
                        Some(false) => {
                            conflicting = Some(watcher.clause);
                            while read < watchers.len() {
                                watchers[write] = watchers[read];
                                write += 1;
                                read += 1;
                            }
                        }
                        Some(true) => (),
                        None => self.enqueue(first, Some(watcher.clause)),
                    }
                }
            }
        }
        watchers.truncate(write);
        *self.watches.list_mut(literal) = watchers;
        conflicting
    }

    /// Unwinds all assignments strictly above the given decision level.
    ///
    /// Unassigned variables are handed back to the decider together with
    /// their last phase.
    pub fn cancel_until(&mut self, level: u32, decider: &mut Decider) {
        if self.decision_level() <= level {
            return
        }
        let Self {
            values,
            var_data,
            trail,
            ..
        } = self;
        trail.pop_to_level(level, |popped| {
            let variable = popped.variable();
            values
                .take(variable)
                .expect("encountered unexpected unregistered variable");
            var_data
                .get_mut(variable)
                .expect("encountered unexpected unregistered variable")
                .reason = None;
            decider.on_unassign(variable, popped.sign());
        });
    }
}
