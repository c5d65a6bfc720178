use crate::{
    assignment::{
        Assignment,
        ConflictAnalyzer,
        LastModel,
        Model,
    },
    clause_db::{
        Clause,
        ClauseId,
        ClauseStore,
    },
    decider::Decider,
    Literal,
    Sign,
    Variable,
};
use alloc::vec::Vec;
use bounded::Index as _;
use core::mem;

/// The outcome of a (possibly budgeted) search.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// A satisfying assignment was found.
    Sat,
    /// Unsatisfiability was established.
    Unsat,
    /// The search was inconclusive within its budget.
    Undef,
}

impl Verdict {
    /// Returns `true` if a satisfying assignment was found.
    pub fn is_sat(self) -> bool {
        matches!(self, Self::Sat)
    }

    /// Returns `true` if unsatisfiability was established.
    pub fn is_unsat(self) -> bool {
        matches!(self, Self::Unsat)
    }

    /// Returns `true` if the search was inconclusive.
    pub fn is_undef(self) -> bool {
        matches!(self, Self::Undef)
    }
}

/// The outcome of adding a clause at the root level.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AddedClause {
    /// The clause was stored; it occupies the given slot of the problem
    /// clause list.
    Attached(usize),
    /// The clause reduced to a unit and was asserted at the root level.
    Unit(Literal),
    /// The clause is already satisfied or tautological and was dropped.
    Satisfied,
    /// The clause made the instance inconsistent.
    Conflicting,
}

/// Search and propagation counters.
#[derive(Debug, Default, Clone)]
pub struct SolverStats {
    pub decisions: u64,
    pub conflicts: u64,
    pub propagations: u64,
    pub restarts: u64,
}

/// The conflict budget of the first restart.
const RESTART_FIRST: u64 = 100;
/// The base of the Luby restart schedule.
const RESTART_INC: f64 = 2.0;

/// A conflict-driven clause-learning kernel.
///
/// Exposes the primitives the cubifying layer builds on: budgeted search
/// under assumptions with a final conflict set, root-level clause addition
/// and removal, simplification with relocation reporting, and scoped
/// decision level handling.
#[derive(Debug)]
pub struct Solver {
    store: ClauseStore,
    /// The problem clauses. The position of a clause in this list is its
    /// transient index; it changes on removal and simplification.
    clauses: Vec<ClauseId>,
    learnts: Vec<ClauseId>,
    assignment: Assignment,
    decider: Decider,
    analyzer: ConflictAnalyzer,
    last_model: LastModel,
    assumptions: Vec<Literal>,
    /// After a failed search under assumptions: an implied clause over
    /// negated assumptions. Empty after a root-level conflict.
    final_conflict: Vec<Literal>,
    len_variables: usize,
    /// Once `false` the instance is known to be unsatisfiable.
    ok: bool,
    stats: SolverStats,
    rng: fastrand::Rng,
    conflict_budget: Option<u64>,
    propagation_budget: Option<u64>,
    interrupted: bool,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            store: ClauseStore::default(),
            clauses: Vec::new(),
            learnts: Vec::new(),
            assignment: Assignment::default(),
            decider: Decider::default(),
            analyzer: ConflictAnalyzer::default(),
            last_model: LastModel::default(),
            assumptions: Vec::new(),
            final_conflict: Vec::new(),
            len_variables: 0,
            ok: true,
            stats: SolverStats::default(),
            rng: fastrand::Rng::with_seed(0),
            conflict_budget: None,
            propagation_budget: None,
            interrupted: false,
        }
    }
}

impl Solver {
    /// Creates an empty solver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-seeds the solver's random source.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = fastrand::Rng::with_seed(seed);
    }

    /// Returns the number of registered variables.
    pub fn len_variables(&self) -> usize {
        self.len_variables
    }

    /// Returns the number of problem clauses.
    pub fn len_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// Returns `false` if the instance is known to be unsatisfiable.
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Returns the search and propagation counters.
    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    /// Returns the most recently extracted model.
    ///
    /// Only meaningful after a satisfiable solve.
    pub fn model(&self) -> &Model {
        self.last_model.get()
    }

    /// Returns the final conflict of the last failed search under
    /// assumptions: an implied clause over negated assumptions.
    ///
    /// Empty if the instance itself was found unsatisfiable.
    pub fn final_conflict(&self) -> &[Literal] {
        &self.final_conflict
    }

    /// Registers the given amount of additional variables.
    pub fn register_variables(&mut self, additional: usize) {
        self.assignment.register_new_variables(additional);
        self.decider.register_new_variables(additional);
        self.analyzer.register_new_variables(additional);
        self.len_variables += additional;
    }

    /// Registers a new variable and returns its positive literal.
    pub fn new_literal(&mut self) -> Literal {
        let index = self.len_variables;
        self.register_variables(1);
        Variable::from_index(index).into_literal(Sign::Pos)
    }

    /// Returns the value of the given literal under the current assignment.
    pub fn value(&self, literal: Literal) -> Option<bool> {
        self.assignment.value_of(literal)
    }

    /// Returns the current decision level.
    pub fn decision_level(&self) -> u32 {
        self.assignment.decision_level()
    }

    /// Returns the current length of the trail.
    pub(crate) fn trail_len(&self) -> usize {
        self.assignment.trail_len()
    }

    /// Opens a new decision level.
    pub(crate) fn new_decision_level(&mut self) {
        self.assignment.new_decision_level();
    }

    /// Asserts an unassigned literal as a decision.
    pub(crate) fn enqueue_decision(&mut self, literal: Literal) {
        self.assignment.enqueue(literal, None);
    }

    /// Propagates all enqueued literals; returns the conflicting clause if
    /// propagation found one.
    pub(crate) fn propagate(&mut self) -> Option<ClauseId> {
        self.assignment
            .propagate(&mut self.store, &mut self.stats.propagations)
    }

    /// Undoes all assignments strictly above the given decision level.
    pub(crate) fn cancel_until(&mut self, level: u32) {
        self.assignment.cancel_until(level, &mut self.decider);
    }

    /// Returns the literals of the problem clause at the given slot.
    pub(crate) fn problem_clause(&self, slot: usize) -> &[Literal] {
        self.store.get(self.clauses[slot]).lits()
    }

    /// Pushes a literal onto the assumption stack.
    pub(crate) fn push_assumption(&mut self, assumption: Literal) {
        self.assumptions.push(assumption);
    }

    /// Clears the assumption stack.
    pub(crate) fn clear_assumptions(&mut self) {
        self.assumptions.clear();
    }

    /// Returns a random value below the given bound.
    pub(crate) fn irand(&mut self, bound: usize) -> usize {
        self.rng.usize(..bound)
    }

    /// Adds a problem clause at the root level.
    ///
    /// The literals are deduplicated; tautologies and clauses satisfied at
    /// the root level are dropped, root-level falsified literals are
    /// removed. A resulting unit is asserted and propagated immediately.
    pub fn add_clause<I>(&mut self, literals: I) -> AddedClause
    where
        I: IntoIterator<Item = Literal>,
    {
        debug_assert_eq!(self.decision_level(), 0);
        if !self.ok {
            return AddedClause::Conflicting
        }
        let mut literals: Vec<Literal> = literals.into_iter().collect();
        literals.sort_unstable();
        literals.dedup();
        let tautological = literals
            .windows(2)
            .any(|pair| pair[0].variable() == pair[1].variable());
        if tautological {
            return AddedClause::Satisfied
        }
        if literals
            .iter()
            .any(|&literal| self.value(literal) == Some(true))
        {
            return AddedClause::Satisfied
        }
        literals.retain(|&literal| self.value(literal).is_none());
        match literals.len() {
            0 => {
                self.ok = false;
                AddedClause::Conflicting
            }
            1 => {
                let unit = literals[0];
                self.assignment.enqueue(unit, None);
                if self.propagate().is_some() {
                    self.ok = false;
                    return AddedClause::Conflicting
                }
                AddedClause::Unit(unit)
            }
            _ => {
                let id = self.store.alloc(Clause::new(literals, false));
                self.attach_clause(id);
                let slot = self.clauses.len();
                self.clauses.push(id);
                AddedClause::Attached(slot)
            }
        }
    }

    /// Removes the problem clause at the given slot.
    ///
    /// The last problem clause takes over the freed slot; all other slots
    /// are unaffected.
    pub(crate) fn remove_problem_clause(&mut self, slot: usize) {
        let id = self.clauses.swap_remove(slot);
        self.detach_and_free(id);
    }

    fn attach_clause(&mut self, id: ClauseId) {
        let lits = self.store.get(id).lits();
        let (first, second) = (lits[0], lits[1]);
        self.assignment.watch_clause(id, first, second);
    }

    fn detach_and_free(&mut self, id: ClauseId) {
        let lits = self.store.get(id).lits();
        let (first, second) = (lits[0], lits[1]);
        self.assignment.unwatch_clause(id, first, second);
        // A removed clause may be the recorded reason of a root-level
        // implication; the assignment stays, the reason link must not.
        if self.value(first) == Some(true)
            && self.assignment.reason_of(first.variable()) == Some(id)
        {
            self.assignment.clear_reason(first.variable());
        }
        self.store.free(id);
    }

    fn clause_satisfied(&self, id: ClauseId) -> bool {
        self.store
            .get(id)
            .into_iter()
            .any(|literal| self.value(literal) == Some(true))
    }

    /// Attaches a learnt clause and asserts its first literal.
    fn learn_clause(&mut self, literals: Vec<Literal>) {
        if literals.len() == 1 {
            self.assignment.enqueue(literals[0], None);
            return
        }
        let asserted = literals[0];
        let id = self.store.alloc(Clause::new(literals, true));
        self.attach_clause(id);
        self.learnts.push(id);
        self.assignment.enqueue(asserted, Some(id));
    }

    /// Returns `true` while the solver may keep working.
    pub fn within_budget(&self) -> bool {
        if self.interrupted {
            return false
        }
        let conflicts_left = self
            .conflict_budget
            .map_or(true, |budget| self.stats.conflicts < budget);
        let propagations_left = self
            .propagation_budget
            .map_or(true, |budget| self.stats.propagations < budget);
        conflicts_left && propagations_left
    }

    /// Bounds the total number of conflicts of this solver.
    pub fn set_conflict_budget(&mut self, budget: Option<u64>) {
        self.conflict_budget = budget;
    }

    /// Bounds the total number of propagations of this solver.
    pub fn set_propagation_budget(&mut self, budget: Option<u64>) {
        self.propagation_budget = budget;
    }

    /// Asks the solver to stop at the next budget check.
    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    /// Clears a previous interrupt request.
    pub fn clear_interrupt(&mut self) {
        self.interrupted = false;
    }

    /// Searches for a model or a conflict within the given conflict budget.
    ///
    /// Respects the assumption stack: assumptions are asserted as pseudo
    /// decisions in order. When an assumption is found false the final
    /// conflict is computed and `Unsat` is returned with `ok` left intact.
    pub(crate) fn search(&mut self, nof_conflicts: u64) -> Verdict {
        debug_assert!(self.ok);
        let mut conflicts_here = 0u64;
        loop {
            if let Some(conflicting) = self.propagate() {
                self.stats.conflicts += 1;
                conflicts_here += 1;
                if self.decision_level() == 0 {
                    self.ok = false;
                    self.final_conflict.clear();
                    return Verdict::Unsat
                }
                let learnt = self.analyzer.analyze(
                    &self.assignment,
                    &self.store,
                    &mut self.decider,
                    conflicting,
                );
                self.cancel_until(learnt.backtrack_level);
                self.learn_clause(learnt.literals);
                self.decider.decay();
                continue
            }
            if conflicts_here >= nof_conflicts || !self.within_budget() {
                self.cancel_until(0);
                return Verdict::Undef
            }
            let mut next_decision = None;
            while (self.decision_level() as usize) < self.assumptions.len() {
                let assumption = self.assumptions[self.decision_level() as usize];
                match self.value(assumption) {
                    Some(true) => {
                        // Already satisfied: open a placeholder level so
                        // that levels and assumption indices stay aligned.
                        self.new_decision_level();
                    }
                    Some(false) => {
                        self.final_conflict = self.analyzer.analyze_final(
                            &self.assignment,
                            &self.store,
                            !assumption,
                        );
                        return Verdict::Unsat
                    }
                    None => {
                        next_decision = Some(assumption);
                        break
                    }
                }
            }
            let decision = match next_decision {
                Some(assumption) => assumption,
                None => {
                    let next_variable = self
                        .decider
                        .next_unassigned(self.assignment.variable_values());
                    match next_variable {
                        None => {
                            self.last_model
                                .update(self.assignment.variable_values())
                                .expect(
                                    "all variables are assigned when no decision is left",
                                );
                            return Verdict::Sat
                        }
                        Some(variable) => {
                            variable.into_literal(self.decider.saved_phase(variable))
                        }
                    }
                }
            };
            self.stats.decisions += 1;
            self.new_decision_level();
            self.enqueue_decision(decision);
        }
    }

    /// Simplifies the clause database at the root level.
    ///
    /// Removes clauses satisfied at the root level. Problem clauses are
    /// compacted in order; `on_move` is called with `(old_slot, new_slot)`
    /// for every retained clause. Returns `false` if the instance is or
    /// became inconsistent, in which case no moves have been reported.
    pub(crate) fn simplify_with<F>(&mut self, mut on_move: F) -> bool
    where
        F: FnMut(usize, usize),
    {
        debug_assert_eq!(self.decision_level(), 0);
        if !self.ok {
            return false
        }
        if self.propagate().is_some() {
            self.ok = false;
            return false
        }
        let learnts = mem::take(&mut self.learnts);
        let mut kept_learnts = Vec::with_capacity(learnts.len());
        for id in learnts {
            if self.clause_satisfied(id) {
                self.detach_and_free(id);
            } else {
                kept_learnts.push(id);
            }
        }
        self.learnts = kept_learnts;
        let clauses = mem::take(&mut self.clauses);
        let mut kept = Vec::with_capacity(clauses.len());
        for (old_slot, id) in clauses.into_iter().enumerate() {
            if self.clause_satisfied(id) {
                self.detach_and_free(id);
            } else {
                on_move(old_slot, kept.len());
                kept.push(id);
            }
        }
        self.clauses = kept;
        true
    }

    /// Solves the instance with plain restarted CDCL search.
    ///
    /// This is the baseline procedure without cubification.
    pub fn solve(&mut self) -> Verdict {
        if !self.ok {
            self.final_conflict.clear();
            return Verdict::Unsat
        }
        let mut status = Verdict::Undef;
        let mut restarts = 0u64;
        while status.is_undef() {
            let budget = restart_budget(restarts);
            status = self.search(budget);
            restarts += 1;
            if status.is_undef() {
                self.stats.restarts += 1;
                if !self.within_budget() {
                    break
                }
            }
        }
        self.cancel_until(0);
        status
    }

    /// Returns the conflict budget of the given restart index.
    pub(crate) fn restart_conflict_budget(&self, restarts: u64) -> u64 {
        restart_budget(restarts)
    }

    /// Bumps the restart counter.
    pub(crate) fn note_restart(&mut self) {
        self.stats.restarts += 1;
    }
}

/// Returns the conflict budget of the given restart index under the Luby
/// schedule.
fn restart_budget(restarts: u64) -> u64 {
    let budget = RESTART_INC.powi(luby(restarts) as i32) * RESTART_FIRST as f64;
    budget as u64
}

/// Returns the exponent of the `x`-th element of the Luby sequence.
fn luby(mut x: u64) -> u32 {
    let mut size = 1u64;
    let mut seq = 0u32;
    while size < x + 1 {
        seq += 1;
        size = 2 * size + 1;
    }
    while size - 1 != x {
        size = (size - 1) >> 1;
        seq -= 1;
        x %= size;
    }
    seq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luby_prefix_matches_the_sequence() {
        let exponents: Vec<u32> = (0u64..15).map(luby).collect();
        assert_eq!(exponents, [0, 0, 1, 0, 0, 1, 2, 0, 0, 1, 0, 0, 1, 2, 3]);
    }

    #[test]
    fn conflicting_units_make_the_instance_unsat() {
        let mut solver = Solver::new();
        let a = solver.new_literal();
        assert_eq!(solver.add_clause([a]), AddedClause::Unit(a));
        assert_eq!(solver.add_clause([!a]), AddedClause::Conflicting);
        assert!(!solver.is_ok());
        assert_eq!(solver.solve(), Verdict::Unsat);
    }

    #[test]
    fn tautological_clause_is_dropped() {
        let mut solver = Solver::new();
        let a = solver.new_literal();
        let b = solver.new_literal();
        assert_eq!(solver.add_clause([a, !a, b]), AddedClause::Satisfied);
        assert_eq!(solver.len_clauses(), 0);
    }

    #[test]
    fn search_under_failing_assumptions_reports_a_final_conflict() {
        let mut solver = Solver::new();
        let a = solver.new_literal();
        let b = solver.new_literal();
        solver.add_clause([!a, b]);
        solver.push_assumption(a);
        solver.push_assumption(!b);
        let status = solver.search(u64::MAX);
        assert_eq!(status, Verdict::Unsat);
        assert!(solver.is_ok());
        assert!(!solver.final_conflict().is_empty());
        // The final conflict is a clause over negated assumptions.
        for &literal in solver.final_conflict() {
            assert!([!a, b].contains(&literal));
        }
        solver.cancel_until(0);
        solver.clear_assumptions();
        assert_eq!(solver.solve(), Verdict::Sat);
    }

    #[test]
    fn simplify_reports_compaction_moves() {
        let mut solver = Solver::new();
        let a = solver.new_literal();
        let b = solver.new_literal();
        let c = solver.new_literal();
        solver.add_clause([a, b]);
        solver.add_clause([b, c]);
        solver.add_clause([!a, c]);
        solver.add_clause([b, !c]);
        // Asserting b satisfies the clauses at slots 0, 1 and 3.
        solver.add_clause([b]);
        let mut moves = Vec::new();
        assert!(solver.simplify_with(|old, new| moves.push((old, new))));
        assert_eq!(moves, [(2, 0)]);
        assert_eq!(solver.len_clauses(), 1);
    }
}
