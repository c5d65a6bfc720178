mod path;

use self::path::{
    plan_path,
    walk_path,
    PathPlan,
};
use crate::{
    bimap::{
        Bimap,
        PersistentId,
    },
    builder::SolverBuilder,
    cube_queue::CubeQueue,
    cube_set::CubeSet,
    solver::{
        AddedClause,
        Solver,
        Verdict,
    },
    Cube,
    Error,
    Literal,
    Model,
};
use alloc::vec::Vec;
use bounded::BoundedArray;
use cnf_parser::{
    Error as CnfError,
    Input,
};
use core::{
    fmt,
    fmt::Display,
};
use log::debug;
use std::time::{
    Duration,
    Instant,
};

/// Configuration of the cubifying layer.
#[derive(Debug, Clone)]
pub struct CubifyConfig {
    /// Multiplier on the propagations of the preceding search step that
    /// budgets each cubification phase.
    pub k_c: f64,
    /// Density threshold: cube-biased search only runs while the best
    /// queued score is at least `k_t` times the all-time mean score.
    pub k_t: f64,
    /// Clauses whose reduced root cube is larger than this are not
    /// cubified.
    pub max_cubifiable_size: usize,
    /// Run cube-biased search in every step instead of only once the
    /// cubification work list has drained.
    pub always_search_cube: bool,
    /// Capacity of the cube queue.
    pub cube_budget: usize,
    /// Seed of the kernel's random source.
    pub seed: u64,
}

impl Default for CubifyConfig {
    fn default() -> Self {
        Self {
            k_c: 2.0,
            k_t: 10.0,
            max_cubifiable_size: 6,
            always_search_cube: false,
            cube_budget: 1_000_000,
            seed: 0,
        }
    }
}

/// Counters and per-phase wall-clock totals of the interleaved solve.
#[derive(Debug, Default, Clone)]
pub struct CubifyStats {
    /// How many clauses have been cubified.
    pub cubifications: u64,
    /// How many cubes have been refuted.
    pub cube_refutations: u64,
    pub time_search: Duration,
    pub time_cubify: Duration,
    pub time_cube_search: Duration,
    pub time_simplify: Duration,
    /// Which part of the last step produced the verdict.
    pub exit_point: u8,
}

impl Display for CubifyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = (self.time_search + self.time_cubify + self.time_cube_search)
            .as_secs_f64();
        let percent = |duration: Duration| {
            match total > 0.0 {
                true => 100.0 * duration.as_secs_f64() / total,
                false => 0.0,
            }
        };
        writeln!(
            f,
            "| Search:       {:12.2} s ({:5.2} %)",
            self.time_search.as_secs_f64(),
            percent(self.time_search),
        )?;
        writeln!(
            f,
            "| Cubification: {:12.2} s ({:5.2} %)",
            self.time_cubify.as_secs_f64(),
            percent(self.time_cubify),
        )?;
        writeln!(
            f,
            "| Search(cube): {:12.2} s ({:5.2} %)",
            self.time_cube_search.as_secs_f64(),
            percent(self.time_cube_search),
        )?;
        writeln!(
            f,
            "| End simplify: {:12.2} s ({:5.2} %)",
            self.time_simplify.as_secs_f64(),
            percent(self.time_simplify),
        )?;
        writeln!(f, "| Exit:         {:12}", self.exit_point)?;
        writeln!(f, "cubifications         : {}", self.cubifications)?;
        writeln!(f, "cube refutations      : {}", self.cube_refutations)
    }
}

/// A CDCL solver with an interleaved cubifying search layer.
///
/// Each solver round under the restart schedule runs four phases: plain
/// search, cubification of enqueued problem clauses, search under the
/// highest-scoring queued cube, and root-level simplification. Refuted
/// cubes feed back into the clause database as shorter clauses that subsume
/// their parents.
#[derive(Debug)]
pub struct CubifyingSolver {
    solver: Solver,
    config: CubifyConfig,
    /// Scored implicant cubes awaiting cube-biased search.
    queue: CubeQueue,
    /// Negations of the clauses this layer has added, exact-match only.
    clause_cubes: CubeSet,
    /// Persistent clause identity against the shifting clause slots.
    bimap: Bimap,
    /// Persistent ids of clauses awaiting cubification.
    cubify_list: Vec<PersistentId>,
    /// Last observed propagation cost per packed literal.
    literal_difficulty: BoundedArray<Literal, f64>,
    stats: CubifyStats,
    bootstrapped: bool,
}

impl CubifyingSolver {
    /// Wraps the given kernel in a cubifying layer.
    pub fn new(mut solver: Solver, config: CubifyConfig) -> Self {
        solver.set_seed(config.seed);
        let queue = CubeQueue::new(config.cube_budget);
        Self {
            solver,
            config,
            queue,
            clause_cubes: CubeSet::default(),
            bimap: Bimap::default(),
            cubify_list: Vec::new(),
            literal_difficulty: BoundedArray::default(),
            stats: CubifyStats::default(),
            bootstrapped: false,
        }
    }

    /// Reads a DIMACS instance and wraps it in a cubifying layer.
    pub fn from_cnf<I>(input: &mut I, config: CubifyConfig) -> Result<Self, CnfError<Error>>
    where
        I: Input,
    {
        let mut builder = SolverBuilder::default();
        cnf_parser::parse_cnf(input, &mut builder)?;
        Ok(Self::new(builder.finalize(), config))
    }

    /// Returns the wrapped kernel.
    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    /// Returns the counters and phase timings of the interleaved solve.
    pub fn stats(&self) -> &CubifyStats {
        &self.stats
    }

    /// Returns the all-time mean cube score.
    pub fn mean_score(&self) -> f64 {
        self.queue.mean_score()
    }

    /// Returns the most recently extracted model.
    ///
    /// Only meaningful after a satisfiable solve.
    pub fn model(&self) -> &Model {
        self.solver.model()
    }

    /// Asks the solve to stop at the next budget check.
    pub fn interrupt(&mut self) {
        self.solver.interrupt();
    }

    /// Solves the instance with the interleaved procedure.
    pub fn solve(&mut self) -> Verdict {
        if !self.solver.is_ok() {
            return Verdict::Unsat
        }
        self.bootstrap();
        let mut status = Verdict::Undef;
        let mut restarts = 0u64;
        while status.is_undef() {
            let budget = self.solver.restart_conflict_budget(restarts);
            debug!("restart {} with conflict budget {}", restarts, budget);
            status = self.step(budget);
            restarts += 1;
            if status.is_undef() {
                self.solver.note_restart();
                if !self.solver.within_budget() {
                    break
                }
            }
        }
        self.solver.cancel_until(0);
        self.solver.clear_assumptions();
        status
    }

    /// Enqueues every problem clause for cubification.
    pub(crate) fn bootstrap(&mut self) {
        debug_assert_eq!(self.solver.decision_level(), 0);
        if self.bootstrapped {
            return
        }
        self.bootstrapped = true;
        self.literal_difficulty
            .resize_with(2 * self.solver.len_variables(), || f64::INFINITY);
        self.cubify_list.reserve(self.solver.len_clauses());
        for slot in 0..self.solver.len_clauses() {
            let id = self.bimap.add(slot);
            self.cubify_list.push(id);
        }
    }

    /// Runs one four-phase solver round under the given conflict budget.
    fn step(&mut self, conflict_budget: u64) -> Verdict {
        // Plain search from the top.
        let search_start = Instant::now();
        let propagations_before = self.solver.stats().propagations;
        let mut status = self.solver.search(conflict_budget);
        self.stats.time_search += search_start.elapsed();

        // Cubification, budgeted by the propagations the search used.
        let cubify_start = Instant::now();
        if status.is_undef() {
            let searched = self.solver.stats().propagations - propagations_before;
            let budget = (self.config.k_c * searched as f64) as u64;
            let limit = self.solver.stats().propagations + budget;
            while self.solver.stats().propagations < limit {
                if !self.solver.within_budget() || !self.can_cubify() {
                    break
                }
                self.stats.cubifications += 1;
                status = self.cubify_one();
                if !status.is_undef() {
                    self.stats.exit_point = 1;
                    break
                }
            }
        }
        self.stats.time_cubify += cubify_start.elapsed();

        // Search under the densest queued cubes with the remaining budget.
        let cube_search_start = Instant::now();
        if status.is_undef() && (!self.can_cubify() || self.config.always_search_cube) {
            let conflicts_limit = self.solver.stats().conflicts + conflict_budget;
            while self.solver.stats().conflicts < conflicts_limit {
                if !self.solver.within_budget() {
                    break
                }
                let picked = match self.pick_cube() {
                    Some(cube) => cube,
                    None => break,
                };
                debug_assert!(!picked.is_empty());
                let remaining = conflicts_limit - self.solver.stats().conflicts;
                status = self.search_cube_branch(&picked, remaining);
                match status {
                    Verdict::Sat => {
                        self.stats.exit_point = 2;
                        break
                    }
                    Verdict::Unsat => {
                        self.stats.cube_refutations += 1;
                        if self.solver.final_conflict().is_empty() {
                            self.stats.exit_point = 4;
                            break
                        }
                        let reduced =
                            Cube::inverted_clause(self.solver.final_conflict());
                        debug_assert!(reduced.subset_of(&picked));
                        status = self.refute_cube(&picked, &reduced);
                        if status.is_unsat() {
                            self.stats.exit_point = 3;
                            break
                        }
                    }
                    Verdict::Undef => (),
                }
            }
        }
        self.stats.time_cube_search += cube_search_start.elapsed();

        // Root-level simplification.
        let simplify_start = Instant::now();
        if status.is_undef() && !self.simplify() {
            self.stats.exit_point = 5;
            status = Verdict::Unsat;
        }
        self.stats.time_simplify += simplify_start.elapsed();
        status
    }

    /// Searches under the given cube as assumptions.
    ///
    /// On anything but `Sat` the assumptions are popped and the state is
    /// unwound to the root level; on `Sat` the state is left for model
    /// extraction.
    pub(crate) fn search_cube_branch(&mut self, cube: &Cube, budget: u64) -> Verdict {
        debug_assert_eq!(self.solver.decision_level(), 0);
        for literal in cube {
            self.solver.push_assumption(literal);
        }
        let status = self.solver.search(budget);
        if status.is_sat() {
            return Verdict::Sat
        }
        self.solver.cancel_until(0);
        self.solver.clear_assumptions();
        status
    }

    /// Picks a queued cube for cube-biased search, if one is dense enough.
    pub(crate) fn pick_cube(&mut self) -> Option<Cube> {
        if self.queue.is_empty() {
            return None
        }
        if self.queue.best_score() < self.config.k_t * self.queue.mean_score() {
            return None
        }
        let random = self.solver.irand(1_000_000);
        self.queue.peek_best(random).cloned()
    }

    /// Handles the refutation of a searched cube.
    ///
    /// The queued base cube is removed and its recorded parent clauses are
    /// dropped: they are subsumed by the negation of the reduced cube,
    /// which is learned as a new clause and enqueued for cubification.
    pub(crate) fn refute_cube(&mut self, base: &Cube, reduced: &Cube) -> Verdict {
        if self.queue.contains(base) {
            let parents: Vec<PersistentId> = self.queue.parents(base).to_vec();
            self.queue.pop(base);
            for parent in parents {
                if let Some(slot) = self.bimap.fw(parent) {
                    self.drop_clause(slot);
                }
            }
        }
        if !self.clause_cubes.contains(reduced) {
            debug!("refuted cube {}; learning its negation", reduced);
            if let Some(id) = self.add_negation_clause(reduced) {
                self.cubify_list.push(id);
            }
            self.clause_cubes.insert(reduced);
        }
        match self.solver.is_ok() {
            true => Verdict::Undef,
            false => Verdict::Unsat,
        }
    }

    /// Adds the negation of the cube as a problem clause and registers its
    /// persistent id.
    ///
    /// Returns `None` if no clause slot was created (the negation reduced
    /// to a unit, was already satisfied, or closed the instance).
    fn add_negation_clause(&mut self, cube: &Cube) -> Option<PersistentId> {
        match self.solver.add_clause(cube.invert()) {
            AddedClause::Attached(slot) => Some(self.bimap.add(slot)),
            AddedClause::Unit(_)
            | AddedClause::Satisfied
            | AddedClause::Conflicting => None,
        }
    }

    /// Removes the problem clause at the given slot, keeping the bimap in
    /// step with the swap-removal of the clause list.
    pub(crate) fn drop_clause(&mut self, slot: usize) {
        let last = self.solver.len_clauses() - 1;
        if slot != last {
            self.bimap.swap(slot, last);
        }
        self.bimap.drop(last);
        self.solver.remove_problem_clause(slot);
    }

    /// Drops the clause in favour of the negation of its reduced root cube.
    fn prune_clause(&mut self, slot: usize, root: &Cube) -> Verdict {
        self.drop_clause(slot);
        if !self.clause_cubes.contains(root) {
            self.add_negation_clause(root);
        }
        match self.solver.is_ok() {
            true => Verdict::Undef,
            false => Verdict::Unsat,
        }
    }

    /// Returns `true` if the cubification work list holds a live clause.
    pub(crate) fn can_cubify(&self) -> bool {
        self.cubify_list
            .iter()
            .any(|&id| self.bimap.fw(id).is_some())
    }

    /// Pops work list entries until a live clause is found and cubifies it.
    pub(crate) fn cubify_one(&mut self) -> Verdict {
        while let Some(id) = self.cubify_list.pop() {
            if let Some(slot) = self.bimap.fw(id) {
                return self.cubify(slot)
            }
        }
        Verdict::Undef
    }

    /// Cubifies the problem clause at the given slot.
    ///
    /// Scores all one-literal-dropped subcubes of the clause's root cube.
    /// A conflicting subcube strengthens the clause database: the clause is
    /// dropped in favour of the subcube's negation.
    pub(crate) fn cubify(&mut self, slot: usize) -> Verdict {
        debug_assert!(self.solver.is_ok());
        debug_assert_eq!(self.solver.decision_level(), 0);
        let clause_len = self.solver.problem_clause(slot).len();
        let mut root = Cube::new();
        for index in 0..clause_len {
            let literal = self.solver.problem_clause(slot)[index];
            match self.solver.value(literal) {
                // A satisfied clause has nothing to contribute.
                Some(true) => return Verdict::Undef,
                // A falsified literal need not be assumed.
                Some(false) => (),
                None => root.push(!literal),
            }
        }
        if root.len() > self.config.max_cubifiable_size {
            if root.len() < clause_len {
                return self.prune_clause(slot, &root)
            }
            return Verdict::Undef
        }
        if root.is_empty() {
            return match self.solver.is_ok() {
                true => Verdict::Undef,
                false => Verdict::Unsat,
            }
        }
        if root.len() == 1 {
            let unit_root = root.clone();
            return self.refute_cube(&unit_root, &root)
        }
        let post = self.cubify_internal(slot, &root);
        if post.is_empty() {
            // The clause is subsumed by another problem clause.
            self.drop_clause(slot);
            return match self.solver.is_ok() {
                true => Verdict::Undef,
                false => Verdict::Unsat,
            }
        }
        debug_assert!(post.subset_of(&root));
        if post.len() < root.len() {
            debug!("strengthening clause at slot {} to {} literals", slot, post.len());
            self.drop_clause(slot);
            if post.len() == 1 {
                self.solver.add_clause([!post.get(0)]);
            } else if !self.clause_cubes.contains(&post) {
                if let Some(id) = self.add_negation_clause(&post) {
                    self.cubify_list.push(id);
                }
                self.clause_cubes.insert(&post);
            }
        }
        match self.solver.is_ok() {
            true => Verdict::Undef,
            false => Verdict::Unsat,
        }
    }

    /// Probes all one-literal-dropped subcubes of the root cube along a
    /// planned path.
    fn cubify_internal(&mut self, slot: usize, root: &Cube) -> Cube {
        let parent = self.bimap.bw(slot);
        let plan = plan_path(
            root,
            parent,
            &mut self.queue,
            &self.clause_cubes,
            &self.literal_difficulty,
        );
        match plan {
            PathPlan::Subsumed => Cube::new(),
            PathPlan::Ops(ops) => {
                walk_path(
                    &mut self.solver,
                    &mut self.queue,
                    &mut self.literal_difficulty,
                    root,
                    parent,
                    &ops,
                )
            }
        }
    }

    /// Simplifies the clause database, keeping the bimap in step with the
    /// compaction of the problem clause list.
    fn simplify(&mut self) -> bool {
        let Self { solver, bimap, .. } = self;
        if !solver.simplify_with(|old_slot, new_slot| bimap.will_move(old_slot, new_slot)) {
            return false
        }
        bimap.flip_buffer();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Variable;
    use bounded::Index as _;

    fn single_literal_cube(index: usize) -> Cube {
        [Variable::from_index(index).into_literal(crate::Sign::Pos)]
            .into_iter()
            .collect()
    }

    #[test]
    fn pick_cube_respects_the_density_gate() {
        let mut solver = Solver::new();
        solver.register_variables(32);
        let mut cubifying = CubifyingSolver::new(solver, CubifyConfig::default());
        let parent = cubifying.bimap.add(0);
        // Five pushes with mean 1.0 and best 5.0: below the threshold of
        // k_t * mean = 10.0, so no cube qualifies.
        cubifying.queue.push(single_literal_cube(0), 5.0, parent);
        for index in 1..5 {
            cubifying.queue.push(single_literal_cube(index), 0.0, parent);
        }
        assert_eq!(cubifying.queue.mean_score(), 1.0);
        assert_eq!(cubifying.queue.best_score(), 5.0);
        assert_eq!(cubifying.pick_cube(), None);
        // Raising the best score to 12.0 while keeping the mean at 1.0
        // opens the gate.
        cubifying.queue.push(single_literal_cube(5), 12.0, parent);
        for index in 6..17 {
            cubifying.queue.push(single_literal_cube(index), 0.0, parent);
        }
        assert_eq!(cubifying.queue.mean_score(), 1.0);
        assert_eq!(cubifying.queue.best_score(), 12.0);
        assert_eq!(cubifying.pick_cube(), Some(single_literal_cube(5)));
    }
}
