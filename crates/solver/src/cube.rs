use crate::Literal;
use alloc::vec::Vec;
use core::{
    fmt,
    fmt::Display,
    hash::{
        Hash,
        Hasher,
    },
    iter,
    slice,
};

/// A conjunction of literals; dually, the negation of a clause.
///
/// The literals are kept sorted by the literal order and no variable occurs
/// twice. Equal literal sets therefore have equal representations, so
/// equality, ordering and hashing are structural.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cube {
    literals: Vec<Literal>,
}

impl Cube {
    /// Creates an empty cube.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the cube whose conjunction is the negation of the clause.
    pub fn inverted_clause(clause: &[Literal]) -> Self {
        clause.iter().map(|&literal| !literal).collect()
    }

    /// Returns the number of literals of the cube.
    #[inline]
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    /// Returns `true` if the cube has no literals.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Returns the literal at the given position.
    pub fn get(&self, position: usize) -> Literal {
        self.literals[position]
    }

    /// Returns the literals of the cube in sorted order.
    pub fn lits(&self) -> &[Literal] {
        &self.literals
    }

    /// Inserts the literal, keeping the sorted order.
    ///
    /// Pushing a literal that is already contained is a no-op.
    pub fn push(&mut self, literal: Literal) {
        match self.literals.binary_search(&literal) {
            Ok(_) => (),
            Err(position) => {
                debug_assert!(
                    !self.literals.iter().any(|other| {
                        other.variable() == literal.variable()
                    }),
                    "pushed both polarities of a variable into a cube",
                );
                self.literals.insert(position, literal);
            }
        }
    }

    /// Removes the literal if it is contained.
    pub fn remove(&mut self, literal: Literal) {
        if let Ok(position) = self.literals.binary_search(&literal) {
            self.literals.remove(position);
        }
    }

    /// Returns `true` if the literal is contained in the cube.
    pub fn contains(&self, literal: Literal) -> bool {
        self.literals.binary_search(&literal).is_ok()
    }

    /// Returns the cube without the given literal.
    pub fn without(&self, literal: Literal) -> Self {
        let mut smaller = self.clone();
        smaller.remove(literal);
        smaller
    }

    /// Returns `true` if every literal of `self` is contained in `other`.
    pub fn subset_of(&self, other: &Self) -> bool {
        self.literals
            .iter()
            .all(|&literal| other.contains(literal))
    }

    /// Returns `true` if `other` is a prefix of `self`.
    pub fn starts_with(&self, other: &Self) -> bool {
        self.literals.starts_with(&other.literals)
    }

    /// Returns the clause that is the negation of the cube.
    pub fn invert(&self) -> Vec<Literal> {
        self.literals.iter().map(|&literal| !literal).collect()
    }
}

impl Hash for Cube {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut digest = 0u64;
        for literal in &self.literals {
            digest = digest.rotate_left(27) ^ literal.index() as u64;
        }
        state.write_u64(digest);
    }
}

impl FromIterator<Literal> for Cube {
    fn from_iter<I: IntoIterator<Item = Literal>>(literals: I) -> Self {
        let mut cube = Self::new();
        for literal in literals {
            cube.push(literal);
        }
        cube
    }
}

impl<'a> IntoIterator for &'a Cube {
    type Item = Literal;
    type IntoIter = iter::Copied<slice::Iter<'a, Literal>>;

    fn into_iter(self) -> Self::IntoIter {
        self.literals.iter().copied()
    }
}

impl Display for Cube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        let mut literals = self.into_iter();
        if let Some(first) = literals.next() {
            write!(f, "{}", first)?;
            for rest in literals {
                write!(f, ", {}", rest)?;
            }
        }
        write!(f, "}}")
    }
}
