//! Free plane wave on a periodic grid, checked against the lattice dispersion.
//!
//! The wavefunction is stamped every `stride` iterations; afterwards the
//! snapshot series is read back and its energy and momentum compared with the
//! values expected for a plane wave of wavenumber `2π / dim`.

use std::{
    f64::consts::TAU,
    fs,
    path::PathBuf,
};
use anyhow::Context;
use num_complex::Complex64 as C64;
use trotter2d::{
    comm::ThreadComm,
    expect::{ self, BatchConfig, Expectations },
    io,
    EvolutionConfig,
    Hamiltonian,
    KernelType,
    Lattice,
    LatticeConfig,
    Solver,
    State,
};

#[derive(Clone, Debug)]
struct RunConfig {
    dim: usize,
    delta_t: f64,
    iterations: usize,
    /// Iterations between stamps.
    stride: usize,
    kernel: KernelType,
    mass: f64,
    procs: usize,
    outdir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dim: 64,
            delta_t: 0.1,
            iterations: 1000,
            stride: 50,
            kernel: KernelType::Cpu,
            mass: 1.0,
            procs: 2,
            outdir: PathBuf::from("Free_particle_RE"),
        }
    }
}

fn run_rank(config: &RunConfig, comm: &ThreadComm) -> anyhow::Result<()> {
    let lattice_config
        = LatticeConfig::default()
        .with_dims(config.dim, config.dim)
        .with_periods(true, true);
    let lattice = Lattice::new(&lattice_config, comm)?;
    let k = TAU / config.dim as f64;
    let amp = 1.0 / config.dim as f64;
    let mut state
        = State::from_fn(&lattice, |m, _, lat| C64::cis(k * m as f64 * lat.delta_x) * amp);
    let hamiltonian = Hamiltonian::free(&lattice, config.mass);
    let evolution
        = EvolutionConfig::default()
        .with_delta_t(config.delta_t)
        .with_kernel(config.kernel);
    let mut solver = Solver::new(&lattice, comm, &state, &hamiltonian, &evolution)?;
    let mut iteration: usize = 0;
    while iteration < config.iterations {
        io::stamp(&lattice, comm, &state, iteration, &config.outdir)?;
        solver.evolve(config.stride)?;
        solver.store(&mut state)?;
        iteration += config.stride;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = RunConfig::default();
    fs::create_dir_all(&config.outdir)
        .with_context(|| format!("creating {}", config.outdir.display()))?;

    let results = ThreadComm::run(config.procs, |comm| run_rank(&config, &comm))?;
    for (rank, res) in results.into_iter().enumerate() {
        res.with_context(|| format!("rank {}", rank))?;
    }

    let k = TAU / config.dim as f64;
    let batch = BatchConfig {
        dim: config.dim,
        iterations: config.iterations,
        stride: config.stride,
        mass: config.mass,
        delta_x: 1.0,
        delta_y: 1.0,
        dirname: config.outdir.clone(),
        potential: None,
    };
    let expectations = Expectations {
        expected_e: (1.0 - k.cos()) / config.mass,
        expected_px: k.sin(),
        expected_py: 0.0,
        threshold_e: 3.0,
        threshold_p: 2.0,
    };
    if let Some(report) = expect::expect_values(&batch, &expectations)? {
        print!("{}", report);
        println!("series written to {}", report.path.display());
    }
    Ok(())
}
