use crate::{
    Sign,
    Variable,
};
use bounded::{
    BoundedArray,
    BoundedHeap,
    BoundedMap,
    Index as _,
};
use ordered_float::OrderedFloat;

/// Multiplicative activity decay applied after every conflict.
const ACTIVITY_DECAY: f64 = 0.95;
/// Activities beyond this bound trigger a rescale of all activities.
const RESCALE_BOUND: f64 = 1e100;
/// The factor applied to all activities upon a rescale.
const RESCALE_FACTOR: f64 = 1e-100;

/// The branching heuristic.
///
/// Variables are picked by descending activity; activities of variables
/// taking part in conflicts are bumped and all activities decay
/// geometrically over time. The polarity of the last assignment is saved
/// and reused for the next decision on the same variable.
#[derive(Debug, Clone)]
pub(crate) struct Decider {
    len_variables: usize,
    activities: BoundedHeap<Variable, OrderedFloat<f64>>,
    polarity: BoundedArray<Variable, Sign>,
    activity_inc: f64,
}

impl Default for Decider {
    fn default() -> Self {
        Self {
            len_variables: 0,
            activities: BoundedHeap::default(),
            polarity: BoundedArray::default(),
            activity_inc: 1.0,
        }
    }
}

impl Decider {
    /// Registers the given amount of new variables.
    pub fn register_new_variables(&mut self, new_variables: usize) {
        let total = self.len_variables + new_variables;
        self.activities.resize_capacity(total);
        self.polarity.resize_with(total, || Sign::Neg);
        for index in self.len_variables..total {
            self.activities
                .restore(Variable::from_index(index))
                .expect("the heap was just resized to fit the variable");
        }
        self.len_variables = total;
    }

    /// Bumps the activity of the given variable.
    pub fn bump(&mut self, variable: Variable) {
        let increment = self.activity_inc;
        let new_activity = self
            .activities
            .increase_weight(variable, |activity| {
                OrderedFloat(activity.into_inner() + increment)
            })
            .expect("encountered unexpected unregistered variable");
        if new_activity.into_inner() > RESCALE_BOUND {
            self.activities
                .update_weights(|activity| {
                    OrderedFloat(activity.into_inner() * RESCALE_FACTOR)
                });
            self.activity_inc *= RESCALE_FACTOR;
        }
    }

    /// Decays all activities relative to future bumps.
    pub fn decay(&mut self) {
        self.activity_inc /= ACTIVITY_DECAY;
    }

    /// Returns the unassigned variable with the highest activity if any.
    ///
    /// Popped variables re-enter the queue when they are unassigned.
    pub fn next_unassigned(
        &mut self,
        values: &BoundedMap<Variable, bool>,
    ) -> Option<Variable> {
        loop {
            let (variable, _activity) = self.activities.pop()?;
            let unassigned = values
                .get(variable)
                .expect("encountered unexpected unregistered variable")
                .is_none();
            if unassigned {
                return Some(variable)
            }
        }
    }

    /// Returns the saved phase of the given variable.
    pub fn saved_phase(&self, variable: Variable) -> Sign {
        *self
            .polarity
            .get(variable)
            .expect("encountered unexpected unregistered variable")
    }

    /// Restores an unassigned variable into the queue and saves its phase.
    pub fn on_unassign(&mut self, variable: Variable, phase: Sign) {
        self.polarity
            .update(variable, phase)
            .expect("encountered unexpected unregistered variable");
        self.activities
            .restore(variable)
            .expect("encountered unexpected unregistered variable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bumped_variable_is_picked_first() {
        let mut decider = Decider::default();
        let mut values = BoundedMap::default();
        decider.register_new_variables(3);
        values.resize_capacity(3);
        let bumped = Variable::from_index(1);
        decider.bump(bumped);
        assert_eq!(decider.next_unassigned(&values), Some(bumped));
    }

    #[test]
    fn assigned_variables_are_skipped() {
        let mut decider = Decider::default();
        let mut values = BoundedMap::default();
        decider.register_new_variables(2);
        values.resize_capacity(2);
        let assigned = Variable::from_index(0);
        let unassigned = Variable::from_index(1);
        decider.bump(assigned);
        values.insert(assigned, true).unwrap();
        assert_eq!(decider.next_unassigned(&values), Some(unassigned));
        assert_eq!(decider.next_unassigned(&values), None);
    }

    #[test]
    fn phase_is_saved_on_unassign() {
        let mut decider = Decider::default();
        decider.register_new_variables(1);
        let variable = Variable::from_index(0);
        assert_eq!(decider.saved_phase(variable), Sign::Neg);
        decider.on_unassign(variable, Sign::Pos);
        assert_eq!(decider.saved_phase(variable), Sign::Pos);
    }
}
