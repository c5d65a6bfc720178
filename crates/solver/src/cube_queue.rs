use crate::{
    bimap::PersistentId,
    Cube,
};
use alloc::{
    collections::BTreeMap,
    vec::Vec,
};
use hashbrown::HashMap;
use ordered_float::OrderedFloat;

/// Score and parent clauses of a queued cube.
#[derive(Debug)]
struct QueueEntry {
    score: f64,
    parents: Vec<PersistentId>,
}

/// A bounded queue of scored cubes.
///
/// Keeps two agreeing indices: an ordered map from score to the cubes of
/// that score, and a hash map from cube to its score and parent clauses.
/// Pushing a fresh cube beyond the budget evicts a lowest-scoring entry.
/// The mean score is computed over every cube ever pushed (each distinct
/// cube once), not over the current content.
#[derive(Debug)]
pub struct CubeQueue {
    budget: usize,
    sum_score: f64,
    num_seen: f64,
    by_score: BTreeMap<OrderedFloat<f64>, Vec<Cube>>,
    by_cube: HashMap<Cube, QueueEntry>,
}

impl CubeQueue {
    /// Creates a queue holding at most `budget` cubes.
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            sum_score: 0.0,
            num_seen: 0.0,
            by_score: BTreeMap::new(),
            by_cube: HashMap::new(),
        }
    }

    /// Returns the number of cubes in the queue.
    pub fn len(&self) -> usize {
        self.by_cube.len()
    }

    /// Returns `true` if the queue holds no cubes.
    pub fn is_empty(&self) -> bool {
        self.by_cube.is_empty()
    }

    /// Returns `true` if the given cube is queued.
    pub fn contains(&self, cube: &Cube) -> bool {
        self.by_cube.contains_key(cube)
    }

    /// Registers the cube with the given score and parent clause.
    ///
    /// A fresh cube enters both indices and the all-time mean; when the
    /// budget is exceeded a lowest-scoring entry is evicted (possibly the
    /// cube just pushed). Re-pushing a queued cube only extends its parent
    /// list; neither score nor mean change.
    pub fn push(&mut self, cube: Cube, score: f64, parent: PersistentId) {
        if self.contains(&cube) {
            self.add_parent(&cube, parent);
            return
        }
        self.by_score
            .entry(OrderedFloat(score))
            .or_default()
            .push(cube.clone());
        self.by_cube.insert(
            cube,
            QueueEntry {
                score,
                parents: alloc::vec![parent],
            },
        );
        self.sum_score += score;
        self.num_seen += 1.0;
        while self.len() > self.budget {
            let worst = self
                .peek_worst()
                .expect("an over-budget queue is never empty")
                .clone();
            self.pop(&worst);
        }
    }

    /// Removes the cube from the queue.
    ///
    /// The all-time mean is unaffected.
    ///
    /// # Panics
    ///
    /// If the cube is not queued.
    pub fn pop(&mut self, cube: &Cube) {
        let entry = self
            .by_cube
            .remove(cube)
            .expect("tried to pop a cube that is not queued");
        let score = OrderedFloat(entry.score);
        let bucket = self
            .by_score
            .get_mut(&score)
            .expect("the score indices disagree on a queued cube");
        if bucket.len() == 1 {
            self.by_score.remove(&score);
        } else {
            let position = bucket
                .iter()
                .position(|queued| queued == cube)
                .expect("the score indices disagree on a queued cube");
            bucket.remove(position);
        }
    }

    /// Returns a cube of the highest score, tie-broken by the given random
    /// value.
    pub fn peek_best(&self, random: usize) -> Option<&Cube> {
        let (_score, bucket) = self.by_score.iter().next_back()?;
        Some(&bucket[random % bucket.len()])
    }

    /// Returns a cube of the lowest score.
    pub fn peek_worst(&self) -> Option<&Cube> {
        let (_score, bucket) = self.by_score.iter().next()?;
        bucket.first()
    }

    /// Returns the highest score in the queue, or zero if it is empty.
    pub fn best_score(&self) -> f64 {
        self.by_score
            .keys()
            .next_back()
            .map_or(0.0, |score| score.into_inner())
    }

    /// Returns the mean score over every cube ever pushed.
    pub fn mean_score(&self) -> f64 {
        if self.num_seen == 0.0 {
            return 0.0
        }
        self.sum_score / self.num_seen
    }

    /// Appends the parent clause to the cube's parent list unless it is
    /// recorded already.
    ///
    /// # Panics
    ///
    /// If the cube is not queued.
    pub fn add_parent(&mut self, cube: &Cube, parent: PersistentId) {
        let parents = &mut self
            .by_cube
            .get_mut(cube)
            .expect("tried to extend the parents of a cube that is not queued")
            .parents;
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }

    /// Returns the parent clauses of the given cube.
    ///
    /// # Panics
    ///
    /// If the cube is not queued.
    pub fn parents(&self, cube: &Cube) -> &[PersistentId] {
        &self
            .by_cube
            .get(cube)
            .expect("tried to read the parents of a cube that is not queued")
            .parents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Bimap,
        Literal,
    };

    fn cube(lits: &[i32]) -> Cube {
        lits.iter().copied().map(Literal::from_dimacs).collect()
    }

    fn parent_ids(amount: usize) -> Vec<PersistentId> {
        let mut bimap = Bimap::default();
        (0..amount).map(|slot| bimap.add(slot)).collect()
    }

    #[test]
    fn eviction_keeps_the_best_cubes() {
        let parents = parent_ids(1);
        let mut queue = CubeQueue::new(3);
        queue.push(cube(&[1]), 1.0, parents[0]);
        queue.push(cube(&[2]), 2.0, parents[0]);
        queue.push(cube(&[3]), 3.0, parents[0]);
        queue.push(cube(&[4]), 0.5, parents[0]);
        assert_eq!(queue.len(), 3);
        assert!(queue.contains(&cube(&[1])));
        assert!(queue.contains(&cube(&[2])));
        assert!(queue.contains(&cube(&[3])));
        assert!(!queue.contains(&cube(&[4])));
        assert_eq!(queue.mean_score(), (1.0 + 2.0 + 3.0 + 0.5) / 4.0);
    }

    #[test]
    fn eviction_under_increasing_scores_drops_the_lowest() {
        let parents = parent_ids(1);
        let budget = 4;
        let mut queue = CubeQueue::new(budget);
        for value in 1..=8 {
            queue.push(cube(&[value]), value as f64, parents[0]);
        }
        assert_eq!(queue.len(), budget);
        for value in 1..=4 {
            assert!(!queue.contains(&cube(&[value])));
        }
        for value in 5..=8 {
            assert!(queue.contains(&cube(&[value])));
        }
        assert_eq!(queue.mean_score(), (1..=8).sum::<i32>() as f64 / 8.0);
        assert_eq!(queue.best_score(), 8.0);
    }

    #[test]
    fn pop_does_not_change_the_mean() {
        let parents = parent_ids(1);
        let mut queue = CubeQueue::new(10);
        queue.push(cube(&[1]), 2.0, parents[0]);
        queue.push(cube(&[2]), 4.0, parents[0]);
        queue.pop(&cube(&[2]));
        assert_eq!(queue.mean_score(), 3.0);
        assert_eq!(queue.best_score(), 2.0);
    }

    #[test]
    fn repush_extends_parents_without_rescoring() {
        let parents = parent_ids(3);
        let mut queue = CubeQueue::new(10);
        let target = cube(&[1, 2]);
        queue.push(target.clone(), 2.0, parents[0]);
        queue.push(target.clone(), 9.0, parents[1]);
        queue.push(target.clone(), 9.0, parents[1]);
        assert_eq!(queue.parents(&target), &parents[..2]);
        assert_eq!(queue.best_score(), 2.0);
        assert_eq!(queue.mean_score(), 2.0);
    }

    #[test]
    fn peek_best_tiebreaks_by_the_random_value() {
        let parents = parent_ids(1);
        let mut queue = CubeQueue::new(10);
        queue.push(cube(&[1]), 5.0, parents[0]);
        queue.push(cube(&[2]), 5.0, parents[0]);
        queue.push(cube(&[3]), 1.0, parents[0]);
        let first = queue.peek_best(0).unwrap().clone();
        let second = queue.peek_best(1).unwrap().clone();
        assert_ne!(first, second);
        assert_ne!(first, cube(&[3]));
        assert_ne!(second, cube(&[3]));
    }
}
