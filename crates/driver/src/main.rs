use cubisat::{
    CubifyConfig,
    CubifyingSolver,
    Verdict,
};
use std::{
    fs,
    path::PathBuf,
    process,
};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
struct Opt {
    /// Input .cnf file in DIMACS format.
    #[structopt(name = "input .cnf file", parse(from_os_str))]
    input: PathBuf,

    /// Multiplier on search propagations budgeting each cubification phase.
    #[structopt(long = "k-c", default_value = "2.0")]
    k_c: f64,

    /// Density threshold gating cube-biased search.
    #[structopt(long = "k-t", default_value = "10.0")]
    k_t: f64,

    /// Maximum cubifiable root cube size.
    #[structopt(long = "max-cubify", default_value = "6")]
    max_cubify: usize,

    /// Search inside cubes before cubification has completed.
    #[structopt(long = "always-search-cube")]
    always_search_cube: bool,

    /// Capacity of the cube queue.
    #[structopt(long = "cube-budget", default_value = "1000000")]
    cube_budget: usize,

    /// Seed of the solver's random source.
    #[structopt(long = "seed", default_value = "0")]
    seed: u64,

    /// Print the step statistics table after solving.
    #[structopt(long = "stats")]
    stats: bool,
}

fn main() {
    env_logger::init();
    let opt = Opt::from_args();
    let config = CubifyConfig {
        k_c: opt.k_c,
        k_t: opt.k_t,
        max_cubifiable_size: opt.max_cubify,
        always_search_cube: opt.always_search_cube,
        cube_budget: opt.cube_budget,
        seed: opt.seed,
    };
    let cnf_contents =
        fs::read(&opt.input).expect("couldn't read provided input .cnf file");
    let mut solver = CubifyingSolver::from_cnf(&mut &cnf_contents[..], config)
        .expect("couldn't properly decode provided input .cnf file");
    let result = solver.solve();
    if opt.stats {
        print!("{}", solver.stats());
        println!("final mean score      : {:.6}", solver.mean_score());
    }
    match result {
        Verdict::Sat => {
            println!("s SATISFIABLE");
            println!("v {}0", solver.model());
        }
        Verdict::Unsat => {
            println!("s UNSATISFIABLE");
            process::exit(20);
        }
        Verdict::Undef => {
            println!("s UNKNOWN");
        }
    }
}
