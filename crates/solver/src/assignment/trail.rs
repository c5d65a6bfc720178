use crate::Literal;
use alloc::vec::Vec;
use bounded::BoundedStack;

/// The sequence of assigned literals with decision level limits.
///
/// Also doubles as the propagation queue: literals between the propagation
/// head and the top of the trail are assigned but not yet propagated.
#[derive(Debug, Default, Clone)]
pub(crate) struct Trail {
    propagate_head: usize,
    assignments: BoundedStack<Literal>,
    limits: Vec<usize>,
}

impl Trail {
    /// Registers the given number of additional variables.
    pub fn register_new_variables(&mut self, new_variables: usize) {
        let total = self.assignments.capacity() + new_variables;
        self.assignments.resize_capacity(total);
    }

    /// Returns the number of assigned literals.
    #[inline]
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Returns the literal at the given trail position.
    pub fn lit(&self, position: usize) -> Literal {
        *self
            .assignments
            .get(position)
            .expect("encountered unexpected out of bounds trail position")
    }

    /// Returns the current decision level.
    #[inline]
    pub fn decision_level(&self) -> u32 {
        self.limits.len() as u32
    }

    /// Opens a new decision level.
    pub fn new_decision_level(&mut self) {
        self.limits.push(self.assignments.len());
    }

    /// Returns the trail position at which the given decision level starts.
    ///
    /// # Panics
    ///
    /// If the level is zero or above the current decision level.
    pub fn level_start(&self, level: u32) -> usize {
        self.limits[level as usize - 1]
    }

    /// Pushes a newly assigned literal to the trail.
    pub fn push(&mut self, literal: Literal) {
        self.assignments.push(literal);
    }

    /// Returns the next literal of the propagation queue if any.
    pub fn pop_enqueued(&mut self) -> Option<Literal> {
        if self.propagate_head == self.assignments.len() {
            return None
        }
        let popped = self.assignments[self.propagate_head];
        self.propagate_head += 1;
        Some(popped)
    }

    /// Marks all trail literals as propagated.
    ///
    /// Used to abandon the propagation queue after a conflict.
    pub fn mark_all_propagated(&mut self) {
        self.propagate_head = self.assignments.len();
    }

    /// Pops all literals assigned above the given decision level.
    ///
    /// The observer is called once per popped literal, from the top of the
    /// trail downwards.
    pub fn pop_to_level<F>(&mut self, level: u32, observer: F)
    where
        F: FnMut(&Literal),
    {
        debug_assert!(level < self.decision_level());
        let new_len = self.limits[level as usize];
        self.assignments.pop_to(new_len, observer);
        self.limits.truncate(level as usize);
        self.propagate_head = new_len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn lit(value: i32) -> Literal {
        Literal::from_dimacs(value)
    }

    #[test]
    fn pop_to_level_unwinds_in_assignment_order() {
        let mut trail = Trail::default();
        trail.register_new_variables(4);
        trail.push(lit(1));
        trail.new_decision_level();
        trail.push(lit(2));
        trail.push(lit(3));
        trail.new_decision_level();
        trail.push(lit(4));
        assert_eq!(trail.decision_level(), 2);
        let mut popped = Vec::new();
        trail.pop_to_level(0, |literal| popped.push(*literal));
        assert_eq!(popped, [lit(4), lit(3), lit(2)]);
        assert_eq!(trail.decision_level(), 0);
        assert_eq!(trail.len(), 1);
    }

    #[test]
    fn propagation_queue_drains_in_order() {
        let mut trail = Trail::default();
        trail.register_new_variables(2);
        trail.push(lit(1));
        trail.push(lit(2));
        assert_eq!(trail.pop_enqueued(), Some(lit(1)));
        assert_eq!(trail.pop_enqueued(), Some(lit(2)));
        assert_eq!(trail.pop_enqueued(), None);
    }
}
