use crate::{
    CubifyConfig,
    CubifyingSolver,
    Cube,
    Literal,
    Solver,
    Verdict,
};

fn kernel_from(clauses: &[Vec<Literal>], num_variables: usize) -> Solver {
    let mut solver = Solver::new();
    solver.register_variables(num_variables);
    for clause in clauses {
        solver.add_clause(clause.iter().copied());
    }
    solver
}

fn interleaved_from(
    clauses: &[Vec<Literal>],
    num_variables: usize,
    config: CubifyConfig,
) -> CubifyingSolver {
    CubifyingSolver::new(kernel_from(clauses, num_variables), config)
}

fn lit(value: i32) -> Literal {
    Literal::from_dimacs(value)
}

fn clauses(lits: &[&[i32]]) -> Vec<Vec<Literal>> {
    lits.iter()
        .map(|clause| clause.iter().copied().map(Literal::from_dimacs).collect())
        .collect()
}

/// Solves the instance both with the baseline kernel and the interleaved
/// procedure and checks that the verdicts agree. Returns the verdict.
fn verdicts_agree(
    clauses: &[Vec<Literal>],
    num_variables: usize,
    config: CubifyConfig,
) -> Verdict {
    let baseline = kernel_from(clauses, num_variables).solve();
    let mut interleaved = interleaved_from(clauses, num_variables, config);
    let status = interleaved.solve();
    assert_eq!(status, baseline);
    if status.is_sat() {
        let model = interleaved.model();
        assert!(model.satisfies_all(clauses.iter().map(Vec::as_slice)));
    }
    status
}

#[test]
fn tautological_instance_is_sat() {
    let formula = clauses(&[&[1, -1]]);
    let status = verdicts_agree(&formula, 1, CubifyConfig::default());
    assert!(status.is_sat());
}

#[test]
fn contradictory_units_are_unsat() {
    let formula = clauses(&[&[1], &[-1]]);
    let status = verdicts_agree(&formula, 1, CubifyConfig::default());
    assert!(status.is_unsat());
}

/// Four pigeons do not fit into three holes.
fn pigeonhole_php3() -> (Vec<Vec<Literal>>, usize) {
    const PIGEONS: usize = 4;
    const HOLES: usize = 3;
    let var = |pigeon: usize, hole: usize| (pigeon * HOLES + hole + 1) as i32;
    let mut formula = Vec::new();
    for pigeon in 0..PIGEONS {
        formula.push(
            (0..HOLES)
                .map(|hole| lit(var(pigeon, hole)))
                .collect::<Vec<_>>(),
        );
    }
    for hole in 0..HOLES {
        for first in 0..PIGEONS {
            for second in first + 1..PIGEONS {
                formula
                    .push(vec![lit(-var(first, hole)), lit(-var(second, hole))]);
            }
        }
    }
    (formula, PIGEONS * HOLES)
}

#[test]
fn pigeonhole_php3_is_unsat() {
    let (formula, num_variables) = pigeonhole_php3();
    let status = verdicts_agree(&formula, num_variables, CubifyConfig::default());
    assert!(status.is_unsat());
}

#[test]
fn pigeonhole_php3_with_eager_cube_search_is_unsat() {
    let (formula, num_variables) = pigeonhole_php3();
    let config = CubifyConfig {
        always_search_cube: true,
        k_t: 1.0,
        ..CubifyConfig::default()
    };
    let status = verdicts_agree(&formula, num_variables, config);
    assert!(status.is_unsat());
}

/// A small deterministic pseudo random sequence.
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state >> 33
    }
}

/// A random 3-SAT instance at clause/variable ratio 4.2.
fn random_3sat(seed: u64, num_variables: usize) -> Vec<Vec<Literal>> {
    let num_clauses = num_variables * 42 / 10;
    let mut lcg = Lcg::new(seed);
    let mut formula = Vec::with_capacity(num_clauses);
    while formula.len() < num_clauses {
        let mut variables = Vec::with_capacity(3);
        while variables.len() < 3 {
            let variable = (lcg.next() % num_variables as u64) as i32 + 1;
            if !variables.contains(&variable) {
                variables.push(variable);
            }
        }
        let clause: Vec<Literal> = variables
            .into_iter()
            .map(|variable| {
                let sign = if lcg.next() % 2 == 0 { 1 } else { -1 };
                lit(sign * variable)
            })
            .collect();
        formula.push(clause);
    }
    formula
}

#[test]
fn random_3sat_matches_the_baseline() {
    for seed in [1, 2, 3] {
        let formula = random_3sat(seed, 40);
        verdicts_agree(&formula, 40, CubifyConfig::default());
    }
}

#[test]
fn random_3sat_with_eager_cube_search_matches_the_baseline() {
    let formula = random_3sat(7, 40);
    let config = CubifyConfig {
        always_search_cube: true,
        k_t: 2.0,
        k_c: 4.0,
        ..CubifyConfig::default()
    };
    verdicts_agree(&formula, 40, config);
}

#[test]
fn cubifying_discovers_the_conflicting_subcube() {
    // Cubifying (1 v 2 v 3) must find that assuming the negations of
    // literals 2 and 3 propagates into a conflict, strengthening the
    // clause to (2 v 3).
    let formula = clauses(&[&[1, 2, 3], &[-1, 2], &[-1, 3], &[-2, -3]]);
    let mut interleaved = interleaved_from(&formula, 3, CubifyConfig::default());
    interleaved.bootstrap();
    let status = interleaved.cubify(0);
    assert!(status.is_undef());
    assert_eq!(interleaved.solver().len_clauses(), 4);
    let strengthened = (0..interleaved.solver().len_clauses())
        .any(|slot| interleaved.solver().problem_clause(slot) == [lit(2), lit(3)]);
    assert!(strengthened, "expected the strengthened clause (2 v 3)");
    // The strengthened clause is a consequence of the original formula.
    let mut checker = kernel_from(&formula, 3);
    checker.push_assumption(lit(-2));
    checker.push_assumption(lit(-3));
    assert_eq!(checker.search(u64::MAX), Verdict::Unsat);
    // The full instance agrees with the baseline verdict.
    verdicts_agree(&formula, 3, CubifyConfig::default());
}

#[test]
fn refuting_a_cube_learns_its_reduction() {
    let formula = clauses(&[&[-1, 2], &[-1, -2], &[3, 4]]);
    let mut interleaved = interleaved_from(&formula, 4, CubifyConfig::default());
    interleaved.bootstrap();
    let cube: Cube = [lit(1), lit(3)].into_iter().collect();
    let status = interleaved.search_cube_branch(&cube, u64::MAX);
    assert!(status.is_unsat());
    let reduced = Cube::inverted_clause(interleaved.solver().final_conflict());
    assert!(reduced.subset_of(&cube));
    assert!(interleaved.refute_cube(&cube, &reduced).is_undef());
    // The negation of the reduced cube now holds at the root level.
    assert_eq!(interleaved.solver().value(lit(-1)), Some(true));
    assert!(interleaved.solve().is_sat());
}

#[test]
fn model_found_under_an_assumed_cube_satisfies_every_clause() {
    let formula = clauses(&[
        &[1, 2],
        &[-1, 3],
        &[-2, -3, 4],
        &[-4, 5],
        &[2, -5],
        &[3, 4, -6],
    ]);
    let config = CubifyConfig {
        always_search_cube: true,
        k_t: 0.5,
        ..CubifyConfig::default()
    };
    let status = verdicts_agree(&formula, 6, config);
    assert!(status.is_sat());
}

#[test]
fn from_cnf_solves_dimacs_input() {
    let mut interleaved = CubifyingSolver::from_cnf(
        &mut &br"
        p cnf 2 4
        1 2 0
        -1 -2 0
        1 -2 0
        -1 2 0
    "[..],
        CubifyConfig::default(),
    )
    .unwrap();
    assert!(interleaved.solve().is_unsat());

    let mut interleaved = CubifyingSolver::from_cnf(
        &mut &br"
        p cnf 3 2
        1 -2 0
        2 3 0
    "[..],
        CubifyConfig::default(),
    )
    .unwrap();
    assert!(interleaved.solve().is_sat());
}

#[test]
fn interrupted_solve_is_inconclusive() {
    let formula = random_3sat(11, 40);
    let mut interleaved = interleaved_from(&formula, 40, CubifyConfig::default());
    interleaved.interrupt();
    assert!(interleaved.solve().is_undef());
}
