use std::f64::consts::{ PI, TAU };
use num_complex::Complex64 as C64;
use trotter2d::{
    comm::SingleRank,
    error::{ GeometryError, KernelError, TrotterError },
    kernel::Axis,
    observables,
    trotter,
    Coefficients,
    EvolutionConfig,
    Hamiltonian,
    KernelType,
    Lattice,
    LatticeConfig,
    Solver,
    State,
};

fn kernels() -> Vec<KernelType> {
    if cfg!(feature = "parallel") {
        vec![KernelType::Cpu, KernelType::Parallel]
    } else {
        vec![KernelType::Cpu]
    }
}

fn harmonic(lattice: &Lattice, coupling: f64, omega: f64) -> Hamiltonian {
    let centre = (
        (lattice.global_dim_x / 2) as f64,
        (lattice.global_dim_y / 2) as f64,
    );
    Hamiltonian::new(
        lattice,
        1.0,
        coupling,
        |m, n, lat| {
            let (x, y) = lat.centered(m, n);
            0.5 * (x * x + y * y)
        },
        omega,
        centre,
    )
}

fn gaussian(w: f64, shift: f64) -> impl Fn(usize, usize, &Lattice) -> C64 {
    move |m, n, lat: &Lattice| {
        let (x, y) = lat.centered(m, n);
        let x = x - shift;
        C64::from((w / PI).sqrt() * (-(x * x + y * y) * 0.5 * w).exp())
    }
}

#[test]
fn free_particle_norm_is_conserved() {
    let comm = SingleRank::new();
    let config = LatticeConfig::default().with_dims(32, 32).with_periods(true, true);
    let lattice = Lattice::new(&config, &comm).unwrap();
    let k = TAU / 32.0;
    let state = State::from_fn(&lattice, |m, n, _| {
        C64::cis(k * m as f64 + 2.0 * k * n as f64) / 32.0
    });
    let hamiltonian = Hamiltonian::free(&lattice, 1.0);
    let norm0 = state.calculate_squared_norm(&lattice, &comm).unwrap();
    for kernel in kernels() {
        let evolution
            = EvolutionConfig::default().with_delta_t(0.1).with_kernel(kernel);
        let mut solver
            = Solver::new(&lattice, &comm, &state, &hamiltonian, &evolution).unwrap();
        solver.evolve(200).unwrap();
        let norm = solver.squared_norm().unwrap();
        assert!((norm - norm0).abs() / norm0 < 1e-6, "{}: {} vs {}", kernel, norm, norm0);
    }
}

#[test]
fn imaginary_time_relaxes_to_ground_state() {
    let comm = SingleRank::new();
    let config
        = LatticeConfig::default()
        .with_dims(32, 32)
        .with_edge_length(10.0);
    let lattice = Lattice::new(&config, &comm).unwrap();
    let hamiltonian = harmonic(&lattice, 0.0, 0.0);
    let mut state = State::from_fn(&lattice, gaussian(0.5, 0.0));
    let norm2 = state.calculate_squared_norm(&lattice, &comm).unwrap();
    let evolution
        = EvolutionConfig::default()
        .with_delta_t(5e-3)
        .with_imag_time(true)
        .with_norm_squared(norm2);
    let mut solver
        = Solver::new(&lattice, &comm, &state, &hamiltonian, &evolution).unwrap();

    let e0 = observables::calculate_total_energy(
        &lattice, &comm, &state, &hamiltonian, norm2).unwrap();
    let mut energy = e0;
    for _ in 0..20 {
        solver.evolve(100).unwrap();
        solver.store(&mut state).unwrap();
        let n = state.calculate_squared_norm(&lattice, &comm).unwrap();
        assert!((n - norm2).abs() < 1e-9);
        let e = observables::calculate_total_energy(
            &lattice, &comm, &state, &hamiltonian, norm2).unwrap();
        assert!(e <= energy + 1e-4, "energy went up: {} -> {}", energy, e);
        energy = e;
    }
    assert!(e0 - energy > 0.1);
    assert!((energy - 1.0).abs() < 0.02, "ground state energy {}", energy);
}

#[test]
fn real_time_energy_stays_bounded() {
    let comm = SingleRank::new();
    let config
        = LatticeConfig::default()
        .with_dims(48, 48)
        .with_edge_length(14.0);
    let lattice = Lattice::new(&config, &comm).unwrap();
    let hamiltonian = harmonic(&lattice, 0.0, 0.0);
    let mut state = State::from_fn(&lattice, gaussian(1.0, 1.0));
    let norm2 = state.calculate_squared_norm(&lattice, &comm).unwrap();
    let e0 = observables::calculate_total_energy(
        &lattice, &comm, &state, &hamiltonian, norm2).unwrap();
    let evolution
        = EvolutionConfig::default()
        .with_delta_t(1e-3)
        .with_norm_squared(norm2);
    let mut solver
        = Solver::new(&lattice, &comm, &state, &hamiltonian, &evolution).unwrap();
    for _ in 0..5 {
        solver.evolve(100).unwrap();
        solver.store(&mut state).unwrap();
        let e = observables::calculate_total_energy(
            &lattice, &comm, &state, &hamiltonian, norm2).unwrap();
        assert!((e - e0).abs() / e0 < 1e-2, "{} vs {}", e, e0);
    }
    // the displaced packet moves back towards the centre
    let centre = ((lattice.global_dim_x / 2) as f64, (lattice.global_dim_y / 2) as f64);
    let pos = observables::calculate_mean_position(
        &lattice, &comm, &state, centre, norm2).unwrap();
    assert!(pos.x < 1.0);
}

#[test]
fn kernels_agree() {
    if !cfg!(feature = "parallel") { return; }
    let comm = SingleRank::new();
    let config
        = LatticeConfig::default()
        .with_dims(31, 22)
        .with_spacing(0.4, 0.4)
        .with_omega(0.3);
    let lattice = Lattice::new(&config, &comm).unwrap();
    let hamiltonian = harmonic(&lattice, 0.5, 0.3);
    let state = State::from_fn(&lattice, gaussian(1.0, 0.7));
    let run = |kernel: KernelType| -> State {
        let evolution
            = EvolutionConfig::default().with_delta_t(5e-3).with_kernel(kernel);
        let mut solver
            = Solver::new(&lattice, &comm, &state, &hamiltonian, &evolution).unwrap();
        solver.evolve(20).unwrap();
        let mut out = State::new(&lattice);
        solver.store(&mut out).unwrap();
        out
    };
    let cpu = run(KernelType::Cpu);
    let par = run(KernelType::Parallel);
    let diff
        = cpu.re.iter().zip(par.re.iter())
        .chain(cpu.im.iter().zip(par.im.iter()))
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    assert!(diff < 1e-12, "max difference {}", diff);
}

#[test]
fn trotter_function_matches_solver() {
    let comm = SingleRank::new();
    let config = LatticeConfig::default().with_dims(24, 24).with_spacing(0.5, 0.5);
    let lattice = Lattice::new(&config, &comm).unwrap();
    let hamiltonian = harmonic(&lattice, 0.0, 0.0);
    let initial = State::from_fn(&lattice, gaussian(1.0, 0.5));
    let delta_t = 1e-2;

    let mut a = initial.clone();
    let coeff = Coefficients::real_time(delta_t, 1.0, 0.5, 0.5);
    let exp_potential = hamiltonian.exp_potential(delta_t, false);
    trotter(
        &lattice, &comm, &mut a, &hamiltonian, coeff.h_a, coeff.h_b,
        &exp_potential, delta_t, 10, "cpu", 1.0, false,
    ).unwrap();

    let evolution = EvolutionConfig::default().with_delta_t(delta_t);
    let mut solver
        = Solver::new(&lattice, &comm, &initial, &hamiltonian, &evolution).unwrap();
    solver.evolve(10).unwrap();
    let mut b = State::new(&lattice);
    solver.store(&mut b).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, initial);
}

// a packet with mean momentum 1 drifts at the lattice group velocity
// sin(dx) / dx, averaged over its momentum spread; with spacings that differ
// between x and y each axis has to use its own spacing
#[test]
fn free_packet_drift_on_rectangular_cells() {
    let comm = SingleRank::new();
    let (delta_t, steps) = (1e-3, 500);
    for (dx, dy) in [(0.3, 0.6), (0.6, 0.3)] {
        let config = LatticeConfig::default().with_dims(48, 48).with_spacing(dx, dy);
        let lattice = Lattice::new(&config, &comm).unwrap();
        let hamiltonian = Hamiltonian::free(&lattice, 1.0);
        let packet = gaussian(1.0, 0.0);
        let initial = State::from_fn(&lattice, |m, n, lat| {
            let (x, _) = lat.centered(m, n);
            packet(m, n, lat) * C64::cis(x)
        });
        let norm2 = initial.calculate_squared_norm(&lattice, &comm).unwrap();
        let centre = (24.0, 24.0);
        let start = observables::calculate_mean_position(
            &lattice, &comm, &initial, centre, norm2).unwrap();
        assert!(start.x.abs() < 1e-12 && start.y.abs() < 1e-12);

        let expected = delta_t * steps as f64 * dx.sin() * (-dx * dx / 4.0).exp() / dx;
        for kernel in kernels() {
            let evolution
                = EvolutionConfig::default()
                .with_delta_t(delta_t)
                .with_kernel(kernel)
                .with_norm_squared(norm2);
            let mut solver
                = Solver::new(&lattice, &comm, &initial, &hamiltonian, &evolution).unwrap();
            solver.evolve(steps).unwrap();
            let mut state = State::new(&lattice);
            solver.store(&mut state).unwrap();
            let pos = observables::calculate_mean_position(
                &lattice, &comm, &state, centre, norm2).unwrap();
            assert!(
                (pos.x - expected).abs() < 0.02,
                "{} on ({}, {}): <x> = {}, expected {}", kernel, dx, dy, pos.x, expected,
            );
            assert!(pos.y.abs() < 1e-3);
        }
    }
}

#[test]
fn trotter_function_rejects_rectangular_cells() {
    let comm = SingleRank::new();
    let config = LatticeConfig::default().with_dims(24, 24).with_spacing(0.3, 0.6);
    let lattice = Lattice::new(&config, &comm).unwrap();
    let hamiltonian = Hamiltonian::free(&lattice, 1.0);
    let mut state = State::from_fn(&lattice, gaussian(1.0, 0.0));
    let before = state.clone();
    let exp_potential = hamiltonian.exp_potential(1e-3, false);
    let coeff = Coefficients::real_time(1e-3, 1.0, 0.3, 0.3);
    let res = trotter(
        &lattice, &comm, &mut state, &hamiltonian, coeff.h_a, coeff.h_b,
        &exp_potential, 1e-3, 1, "cpu", 1.0, false,
    );
    assert!(matches!(
        res,
        Err(TrotterError::Geometry(GeometryError::Anisotropic(a, b))) if a == 0.3 && b == 0.6
    ));
    assert_eq!(state, before);
}

#[test]
fn rotation_needs_wide_halo() {
    let comm = SingleRank::new();
    let config = LatticeConfig::default().with_dims(32, 32).with_halo(4);
    let lattice = Lattice::new(&config, &comm).unwrap();
    let hamiltonian = harmonic(&lattice, 0.0, 0.5);
    let state = State::from_fn(&lattice, gaussian(1.0, 0.0));
    let res = Solver::new(
        &lattice, &comm, &state, &hamiltonian, &EvolutionConfig::default());
    assert!(matches!(
        res,
        Err(TrotterError::Kernel(KernelError::Halo { required: 8, got: 4, axis: Axis::X, .. }))
    ));
}

#[test]
fn unknown_kernel_name() {
    let comm = SingleRank::new();
    let lattice = Lattice::new(&LatticeConfig::default(), &comm).unwrap();
    let hamiltonian = Hamiltonian::free(&lattice, 1.0);
    let mut state = State::new(&lattice);
    let exp_potential = hamiltonian.exp_potential(1e-3, false);
    let res = trotter(
        &lattice, &comm, &mut state, &hamiltonian, 1.0, 0.0,
        &exp_potential, 1e-3, 1, "gpu", 1.0, false,
    );
    assert!(matches!(res, Err(TrotterError::Kernel(KernelError::Unknown(_)))));
}

#[test]
fn geometry_errors() {
    let comm = SingleRank::new();
    let odd = LatticeConfig::default().with_dims(33, 32).with_periods(true, false);
    assert!(matches!(
        Lattice::new(&odd, &comm),
        Err(GeometryError::OddPeriodic(Axis::X, 33))
    ));
    let empty = LatticeConfig::default().with_dims(0, 32);
    assert!(matches!(Lattice::new(&empty, &comm), Err(GeometryError::EmptyGrid(0, 32))));
    let grid = LatticeConfig::default().with_proc_grid(2, 1);
    assert!(matches!(Lattice::new(&grid, &comm), Err(GeometryError::ProcGrid(2, 1, 1))));
    // a periodic rank must own more than the halo
    let small = LatticeConfig::default().with_dims(4, 32).with_periods(true, true);
    assert!(matches!(
        Lattice::new(&small, &comm),
        Err(GeometryError::PartitionTooSmall { axis: Axis::X, .. })
    ));
}

#[test]
fn mismatched_state_shape() {
    let comm = SingleRank::new();
    let lattice = Lattice::new(&LatticeConfig::default(), &comm).unwrap();
    let other
        = Lattice::new(&LatticeConfig::default().with_dims(16, 16), &comm).unwrap();
    let hamiltonian = Hamiltonian::free(&lattice, 1.0);
    let state = State::new(&other);
    let res = Solver::new(
        &lattice, &comm, &state, &hamiltonian, &EvolutionConfig::default());
    assert!(matches!(res, Err(TrotterError::Shape(_))));
}
