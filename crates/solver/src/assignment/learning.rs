use super::Assignment;
use crate::{
    clause_db::{
        ClauseId,
        ClauseStore,
    },
    decider::Decider,
    Literal,
    Variable,
};
use alloc::vec::Vec;
use bounded::BoundedBitmap;

/// A clause learned from a conflict.
///
/// The asserting literal is at the first position; the literal of the
/// backtrack level (if any) is at the second.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct LearntClause {
    pub literals: Vec<Literal>,
    pub backtrack_level: u32,
}

/// First-UIP conflict analysis.
///
/// The stamp bitmap and the scratch buffer are kept across conflicts so
/// that analyzing a conflict does not allocate in the common case.
#[derive(Debug, Default, Clone)]
pub(crate) struct ConflictAnalyzer {
    /// Stamped variables: either resolution work on the current decision
    /// level or variables that already occur in the result.
    seen: BoundedBitmap<Variable>,
    /// Stamped variables to unstamp before the next analysis.
    to_clear: Vec<Variable>,
    /// Result literals assigned below the current decision level.
    below_current: Vec<Literal>,
}

impl ConflictAnalyzer {
    /// Registers the given number of additional variables.
    pub fn register_new_variables(&mut self, new_variables: usize) {
        let total = self.seen.len() + new_variables;
        self.seen.resize_to_len(total);
    }

    fn is_stamped(&self, variable: Variable) -> bool {
        self.seen
            .get(variable)
            .expect("encountered unexpected unregistered variable")
    }

    fn stamp(&mut self, variable: Variable) {
        self.seen
            .set(variable, true)
            .expect("encountered unexpected unregistered variable");
        self.to_clear.push(variable);
    }

    fn unstamp_all(&mut self) {
        for variable in self.to_clear.drain(..) {
            self.seen
                .set(variable, false)
                .expect("encountered unexpected unregistered variable");
        }
    }

    /// Computes the first-UIP clause for the given conflicting clause.
    ///
    /// Resolves the conflicting clause with reason clauses along the trail
    /// of the current decision level until a single literal of that level
    /// remains. Every variable taking part in the resolution gets its
    /// activity bumped.
    pub fn analyze(
        &mut self,
        assignment: &Assignment,
        store: &ClauseStore,
        decider: &mut Decider,
        conflicting: ClauseId,
    ) -> LearntClause {
        debug_assert!(assignment.decision_level() > 0);
        self.below_current.clear();
        let current_level = assignment.decision_level();
        let mut unresolved = 0usize;
        let mut position = assignment.trail_len();
        let mut clause = conflicting;
        let mut first_iteration = true;
        let asserting = loop {
            let skip = usize::from(!first_iteration);
            first_iteration = false;
            for &literal in &store.get(clause).lits()[skip..] {
                let variable = literal.variable();
                if self.is_stamped(variable) || assignment.level_of(variable) == 0 {
                    continue
                }
                self.stamp(variable);
                decider.bump(variable);
                if assignment.level_of(variable) >= current_level {
                    unresolved += 1;
                } else {
                    self.below_current.push(literal);
                }
            }
            // Walk the trail back to the next stamped literal.
            let resolve_at = loop {
                position -= 1;
                let literal = assignment.trail_lit(position);
                if self.is_stamped(literal.variable()) {
                    break literal
                }
            };
            self.seen
                .set(resolve_at.variable(), false)
                .expect("encountered unexpected unregistered variable");
            unresolved -= 1;
            if unresolved == 0 {
                break !resolve_at
            }
            clause = assignment
                .reason_of(resolve_at.variable())
                .expect("reached a decision literal before the first UIP");
        };
        let mut literals = Vec::with_capacity(self.below_current.len() + 1);
        literals.push(asserting);
        literals.extend(self.below_current.iter().copied());
        // Put a literal of the backtrack level at the second position.
        let backtrack_level = match literals.len() {
            1 => 0,
            _ => {
                let mut deepest = 1;
                for index in 2..literals.len() {
                    let level = assignment.level_of(literals[index].variable());
                    if level > assignment.level_of(literals[deepest].variable()) {
                        deepest = index;
                    }
                }
                literals.swap(1, deepest);
                assignment.level_of(literals[1].variable())
            }
        };
        self.unstamp_all();
        LearntClause {
            literals,
            backtrack_level,
        }
    }

    /// Computes the subset of negated assumptions responsible for a failed
    /// assumption.
    ///
    /// `failed` is the negation of the assumption found false; the returned
    /// literals form an implied clause over negated assumptions.
    pub fn analyze_final(
        &mut self,
        assignment: &Assignment,
        store: &ClauseStore,
        failed: Literal,
    ) -> Vec<Literal> {
        let mut conflict = alloc::vec![failed];
        if assignment.decision_level() == 0 {
            return conflict
        }
        self.stamp(failed.variable());
        let root_end = assignment.level_start(1);
        for position in (root_end..assignment.trail_len()).rev() {
            let literal = assignment.trail_lit(position);
            let variable = literal.variable();
            if !self.is_stamped(variable) {
                continue
            }
            match assignment.reason_of(variable) {
                None => conflict.push(!literal),
                Some(reason) => {
                    for &reason_lit in &store.get(reason).lits()[1..] {
                        let reason_var = reason_lit.variable();
                        if assignment.level_of(reason_var) > 0 {
                            self.stamp(reason_var);
                        }
                    }
                }
            }
        }
        self.unstamp_all();
        conflict
    }
}
