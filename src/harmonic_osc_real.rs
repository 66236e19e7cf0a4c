//! Real-time evolution of a displaced state in a 2D harmonic trap.
//!
//! The initial state is a superposition of the ground and first excited states
//! along x, so its density sloshes back and forth at the trap frequency.
//! Observables are logged to `file_info.txt` after every block of iterations,
//! and phase, density and momentum density are stamped periodically.

use std::{
    f64::consts::PI,
    fs,
    path::{ Path, PathBuf },
    time::Instant,
};
use anyhow::Context;
use log::info;
use num_complex::Complex64 as C64;
use trotter2d::{
    comm::{ Communicator, ThreadComm },
    io::{ self, ObservableLog },
    observables,
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
    /// Physical length of the grid's edge.
    edge_length: f64,
    /// Points along each edge.
    dim: usize,
    delta_t: f64,
    /// Iterations between observable evaluations.
    iterations: usize,
    kernel: &'static str,
    /// Number of observable evaluations.
    snapshots: usize,
    /// Evaluations between stamps of phase and density.
    snap_per_stamp: usize,
    coupling_const: f64,
    mass: f64,
    omega: f64,
    rot_coord: (f64, f64),
    /// Trap frequencies along x and y.
    trap: (f64, f64),
    procs: usize,
    outdir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            edge_length: 14.14,
            dim: 256,
            delta_t: 1e-4,
            iterations: 1000,
            kernel: "parallel",
            snapshots: 20,
            snap_per_stamp: 5,
            coupling_const: 0.0,
            mass: 1.0,
            omega: 0.0,
            rot_coord: (320.0, 320.0),
            trap: (1.0, 1.0),
            procs: 4,
            outdir: PathBuf::from("Harmonic_osc_RE"),
        }
    }
}

fn gauss_ini_state(m: usize, n: usize, lattice: &Lattice) -> C64 {
    let (x, y) = lattice.centered(m, n);
    let w = 1.0;
    let psi = (0.5 * w / PI).sqrt()
        * (-(x * x + y * y) * 0.5 * w).exp()
        * (1.0 + (2.0 * w).sqrt() * x);
    C64::from(psi)
}

fn stamp_all<C>(
    lattice: &Lattice,
    comm: &C,
    state: &State,
    iteration: usize,
    outdir: &Path,
) -> anyhow::Result<()>
where C: Communicator
{
    io::stamp_real(lattice, comm, &state.get_phase(), iteration, outdir, "phase")?;
    io::stamp_real(
        lattice, comm, &state.get_particle_density(), iteration, outdir, "density")?;
    if let Some(psi) = state.gather(lattice, comm)? {
        let path = io::stamp_path(outdir, iteration, "momentum");
        io::write_matrix(&path, &observables::momentum_density(&psi))
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn log_observables<C>(
    lattice: &Lattice,
    comm: &C,
    state: &State,
    hamiltonian: &Hamiltonian,
    iteration: usize,
    log: Option<&mut ObservableLog>,
) -> anyhow::Result<()>
where C: Communicator
{
    let norm2 = state.calculate_squared_norm(lattice, comm)?;
    let total = observables::calculate_total_energy(
        lattice, comm, state, hamiltonian, norm2)?;
    let kinetic = observables::calculate_kinetic_energy(
        lattice, comm, state, hamiltonian, norm2)?;
    let centre = (
        (lattice.global_dim_x / 2) as f64,
        (lattice.global_dim_y / 2) as f64,
    );
    let position = observables::calculate_mean_position(
        lattice, comm, state, centre, norm2)?;
    let momentum = observables::calculate_mean_momentum(lattice, comm, state, norm2)?;
    if let Some(log) = log {
        log.record(iteration, norm2, total, kinetic, &position, &momentum)?;
        info!("iteration {}: E = {}, <X> = {}", iteration, total, position.x);
    }
    Ok(())
}

// everything one rank does; returns the time spent evolving
fn run_rank(config: &RunConfig, comm: &ThreadComm) -> anyhow::Result<u128> {
    let lattice_config
        = LatticeConfig::default()
        .with_dims(config.dim, config.dim)
        .with_edge_length(config.edge_length)
        .with_omega(config.omega);
    let lattice = Lattice::new(&lattice_config, comm)?;
    let (wx, wy) = config.trap;
    let hamiltonian = Hamiltonian::new(
        &lattice,
        config.mass,
        config.coupling_const,
        |m, n, lat| {
            let (x, y) = lat.centered(m, n);
            0.5 * (wx * wx * x * x + wy * wy * y * y)
        },
        config.omega,
        config.rot_coord,
    );
    let mut state = State::from_fn(&lattice, gauss_ini_state);
    let norm2 = state.calculate_squared_norm(&lattice, comm)?;
    let evolution
        = EvolutionConfig::default()
        .with_delta_t(config.delta_t)
        .with_kernel(config.kernel.parse::<KernelType>()?)
        .with_norm_squared(norm2);

    let mut log
        = if comm.rank() == 0 {
            Some(ObservableLog::create(config.outdir.join("file_info.txt"))?)
        } else {
            None
        };
    log_observables(&lattice, comm, &state, &hamiltonian, 0, log.as_mut())?;
    stamp_all(&lattice, comm, &state, 0, &config.outdir)?;

    let mut solver = Solver::new(&lattice, comm, &state, &hamiltonian, &evolution)?;
    let mut elapsed: u128 = 0;
    for count_snap in 1..=config.snapshots {
        let start = Instant::now();
        solver.evolve(config.iterations)?;
        elapsed += start.elapsed().as_micros();
        solver.store(&mut state)?;

        let iteration = count_snap * config.iterations;
        log_observables(&lattice, comm, &state, &hamiltonian, iteration, log.as_mut())?;
        if count_snap % config.snap_per_stamp == 0 {
            stamp_all(&lattice, comm, &state, iteration, &config.outdir)?;
        }
    }
    Ok(elapsed)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = RunConfig::default();
    let outdir
        = if config.snapshots > 0 && fs::create_dir_all(&config.outdir).is_ok() {
            config.outdir.clone()
        } else {
            PathBuf::from(".")
        };
    let config = RunConfig { outdir, ..config };

    let times = ThreadComm::run(config.procs, |comm| run_rank(&config, &comm))?;
    let mut tot_time: u128 = 0;
    for (rank, res) in times.into_iter().enumerate() {
        let t = res.with_context(|| format!("rank {}", rank))?;
        if rank == 0 { tot_time = t; }
    }
    println!(
        "TROTTER {}x{} kernel:{} np:{} time:{} usec",
        config.dim, config.dim, config.kernel, config.procs, tot_time,
    );
    Ok(())
}
