use crate::{
    bimap::PersistentId,
    cube_queue::CubeQueue,
    cube_set::CubeSet,
    solver::Solver,
    Cube,
    Literal,
};
use alloc::vec::Vec;
use bounded::BoundedArray;
use core::cmp::Reverse;
use ordered_float::OrderedFloat;

/// A single step of a planned subcube walk.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum PathOp {
    /// Open a decision level and assume the literal.
    Push(Literal),
    /// Unwind one decision level.
    Pop,
}

/// The outcome of planning a subcube walk.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PathPlan {
    /// A planned prefix is already a recorded clause negation: the clause
    /// under cubification is subsumed.
    Subsumed,
    /// The operations visiting every not-yet-scored subcube.
    Ops(Vec<PathOp>),
}

/// Plans the walk over all one-literal-dropped subcubes of the root cube.
///
/// The literals are reordered so that subcubes already queued are never
/// visited: their drop literals form the stable prefix shared by every
/// visit, and only their parent lists are extended. The remaining literals
/// are ordered by descending propagation difficulty so that the costliest
/// assumptions stay on the shared prefix for as long as possible.
///
/// Aborts with [`PathPlan::Subsumed`] as soon as a planned prefix is found
/// in the clause negation set.
pub(crate) fn plan_path(
    root: &Cube,
    parent: PersistentId,
    queue: &mut CubeQueue,
    clause_cubes: &CubeSet,
    difficulty: &BoundedArray<Literal, f64>,
) -> PathPlan {
    let mut skipped = Vec::new();
    let mut remainder = Vec::new();
    for literal in root {
        let terminal = root.without(literal);
        if queue.contains(&terminal) {
            queue.add_parent(&terminal, parent);
            skipped.push(literal);
        } else {
            remainder.push(literal);
        }
    }
    remainder.sort_by_key(|&literal| {
        let cost = *difficulty
            .get(literal)
            .expect("encountered unexpected unregistered literal");
        Reverse(OrderedFloat(cost))
    });
    let skip_count = skipped.len();
    let order: Vec<Literal> = skipped.into_iter().chain(remainder).collect();
    let mut ops = Vec::new();
    let mut stack: Vec<Literal> = Vec::new();
    let mut prefix = Cube::new();
    for skip in (skip_count..order.len()).rev() {
        let sequence: Vec<Literal> = order[..skip]
            .iter()
            .chain(&order[skip + 1..])
            .copied()
            .collect();
        let shared = stack
            .iter()
            .zip(&sequence)
            .take_while(|(on_stack, planned)| on_stack == planned)
            .count();
        for _ in shared..stack.len() {
            ops.push(PathOp::Pop);
            let popped = stack.pop().expect("the shared prefix fits the stack");
            prefix.remove(popped);
        }
        for &literal in &sequence[shared..] {
            stack.push(literal);
            prefix.push(literal);
            ops.push(PathOp::Push(literal));
            if clause_cubes.contains(&prefix) {
                return PathPlan::Subsumed
            }
        }
    }
    PathPlan::Ops(ops)
}

/// Replays a planned walk at the root level, scoring every freshly assumed
/// prefix cube by the unit propagations it provokes.
///
/// Returns the conflicting subcube as soon as a pushed literal is already
/// falsified or propagation runs into a conflict; returns the root cube
/// when the walk completes (or is cut short by the budget) without finding
/// one. Always unwinds back to the level it started on.
pub(crate) fn walk_path(
    solver: &mut Solver,
    queue: &mut CubeQueue,
    difficulty: &mut BoundedArray<Literal, f64>,
    root: &Cube,
    parent: PersistentId,
    ops: &[PathOp],
) -> Cube {
    debug_assert_eq!(solver.decision_level(), 0);
    let trail0 = solver.trail_len();
    let mut cube = Cube::new();
    let mut stack: Vec<(Literal, bool)> = Vec::new();
    let outcome = 'walk: {
        for op in ops {
            if !solver.within_budget() {
                break 'walk root.clone()
            }
            match *op {
                PathOp::Push(literal) => {
                    solver.new_decision_level();
                    match solver.value(literal) {
                        Some(true) => {
                            // Already implied: occupies a level but does not
                            // belong to the assumed cube.
                            stack.push((literal, false));
                        }
                        Some(false) => {
                            let mut conflict = cube.clone();
                            conflict.push(literal);
                            break 'walk conflict
                        }
                        None => {
                            cube.push(literal);
                            stack.push((literal, true));
                            let propagations_before = solver.stats().propagations;
                            solver.enqueue_decision(literal);
                            let conflicting = solver.propagate().is_some();
                            let cost =
                                (solver.stats().propagations - propagations_before) as f64;
                            if conflicting {
                                break 'walk cube.clone()
                            }
                            if cube.len() == 1 {
                                difficulty
                                    .update(literal, cost)
                                    .expect("encountered unexpected unregistered literal");
                            }
                            let score =
                                (solver.trail_len() - trail0) as f64 / cube.len() as f64;
                            if score > 1.0 {
                                queue.push(cube.clone(), score, parent);
                            }
                        }
                    }
                }
                PathOp::Pop => {
                    let level = solver.decision_level();
                    solver.cancel_until(level - 1);
                    let (literal, assumed) =
                        stack.pop().expect("popped an empty walk stack");
                    if assumed {
                        cube.remove(literal);
                    }
                }
            }
        }
        root.clone()
    };
    solver.cancel_until(0);
    outcome
}
