use criterion::{
    black_box,
    criterion_group,
    criterion_main,
    Criterion,
};
use cubisat::{
    CubifyConfig,
    CubifyingSolver,
    Literal,
    Solver,
};

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
                Literal::from_dimacs(sign * variable)
            })
            .collect();
        formula.push(clause);
    }
    formula
}

fn kernel_from(clauses: &[Vec<Literal>], num_variables: usize) -> Solver {
    let mut solver = Solver::new();
    solver.register_variables(num_variables);
    for clause in clauses {
        solver.add_clause(clause.iter().copied());
    }
    solver
}

fn bench_solve(c: &mut Criterion) {
    let formula = random_3sat(42, 60);
    c.bench_function("baseline 3-SAT n=60", |b| {
        b.iter(|| {
            let mut solver = kernel_from(black_box(&formula), 60);
            black_box(solver.solve())
        })
    });
    c.bench_function("cubifying 3-SAT n=60", |b| {
        b.iter(|| {
            let kernel = kernel_from(black_box(&formula), 60);
            let mut solver = CubifyingSolver::new(kernel, CubifyConfig::default());
            black_box(solver.solve())
        })
    });
}

criterion_group!(benches, bench_solve);
criterion_main!(benches);
