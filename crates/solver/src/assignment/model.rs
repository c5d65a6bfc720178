use crate::{
    Literal,
    Sign,
    Variable,
};
use bounded::{
    BoundedArray,
    BoundedMap,
    Index as _,
};
use core::{
    fmt,
    fmt::Display,
};

/// Errors that may be encountered when extracting a model.
#[derive(Debug, PartialEq, Eq)]
pub enum ModelError {
    /// The assignment still contains unassigned variables.
    IndeterminateAssignment,
}

/// The satisfying assignment of a solved instance.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Model {
    assignment: BoundedArray<Variable, bool>,
}

impl Model {
    /// Updates the model from the given complete assignment.
    ///
    /// # Errors
    ///
    /// If the given assignment is not complete.
    pub(crate) fn update(
        &mut self,
        values: &BoundedMap<Variable, bool>,
    ) -> Result<(), ModelError> {
        if values.len() != values.capacity() {
            return Err(ModelError::IndeterminateAssignment)
        }
        if self.assignment.len() < values.capacity() {
            self.assignment.resize_with(values.capacity(), || false);
        }
        for (variable, &value) in values {
            self.assignment
                .update(variable, value)
                .expect("encountered unexpected out of bounds variable");
        }
        Ok(())
    }

    /// Returns the value of the given variable.
    pub fn value(&self, variable: Variable) -> Option<bool> {
        self.assignment.get(variable).copied()
    }

    /// Returns `true` if the given literal is satisfied under this model.
    pub fn is_satisfied(&self, literal: Literal) -> Option<bool> {
        self.value(literal.variable())
            .map(|value| value == literal.is_positive())
    }

    /// Returns `true` if every given clause has a satisfied literal.
    pub fn satisfies_all<'a, I>(&self, clauses: I) -> bool
    where
        I: IntoIterator<Item = &'a [Literal]>,
    {
        clauses.into_iter().all(|clause| {
            clause
                .iter()
                .any(|&literal| self.is_satisfied(literal) == Some(true))
        })
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, value) in self.assignment.iter().enumerate() {
            let variable = Variable::from_index(index);
            let sign = if *value { Sign::Pos } else { Sign::Neg };
            write!(f, "{} ", variable.into_literal(sign))?;
        }
        Ok(())
    }
}

/// Stores the most recently extracted model.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LastModel {
    last_model: Model,
}

impl LastModel {
    /// Updates the model given the current complete assignment.
    ///
    /// # Errors
    ///
    /// If the given assignment is not complete.
    pub(crate) fn update(
        &mut self,
        values: &BoundedMap<Variable, bool>,
    ) -> Result<(), ModelError> {
        self.last_model.update(values)
    }

    /// Returns the most recently extracted model.
    pub fn get(&self) -> &Model {
        &self.last_model
    }
}
