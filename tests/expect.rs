use std::{
    f64::consts::TAU,
    fs,
    path::PathBuf,
};
use ndarray as nd;
use num_complex::Complex64 as C64;
use trotter2d::{
    comm::ThreadComm,
    error::{ ExpectError, ReadError },
    expect::{ expect_values, BatchConfig, Expectations, SERIES_HEADER },
    io::{ self, stamp_path, write_complex_matrix },
    EvolutionConfig,
    Hamiltonian,
    Lattice,
    LatticeConfig,
    Solver,
    State,
};

const DIM: usize = 24;

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join(format!("trotter2d-expect-{}-{}", std::process::id(), name));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn batch(dirname: PathBuf, iterations: usize, stride: usize) -> BatchConfig {
    BatchConfig {
        dim: DIM,
        iterations,
        stride,
        mass: 1.0,
        delta_x: 1.0,
        delta_y: 1.0,
        dirname,
        potential: None,
    }
}

// plane waves with wavenumbers scattered by about 1% around 2π / DIM
fn write_plane_waves(config: &BatchConfig) {
    let k0 = TAU / DIM as f64;
    for j in 0..config.num_snapshots() {
        let k = k0 * (1.0 + 0.01 * if j % 2 == 0 { 1.0 } else { -1.0 });
        let psi = nd::Array2::from_shape_fn((DIM, DIM), |(_, c)| C64::cis(k * c as f64));
        let path = stamp_path(&config.dirname, j * config.stride, "comp");
        write_complex_matrix(&path, &psi).unwrap();
    }
}

fn plane_wave_expectations() -> Expectations {
    plane_wave_expectations_for(DIM)
}

fn plane_wave_expectations_for(dim: usize) -> Expectations {
    let k = TAU / dim as f64;
    Expectations {
        expected_e: 1.0 - k.cos(),
        expected_px: k.sin(),
        expected_py: 0.0,
        threshold_e: 3.0,
        threshold_p: 2.0,
    }
}

#[test]
fn plane_wave_series_passes() {
    let dir = scratch("pass");
    // ceil(100 / 30) = 4 snapshots: 0, 30, 60, 90
    let config = batch(dir.clone(), 100, 30);
    assert_eq!(config.num_snapshots(), 4);
    write_plane_waves(&config);

    let report = expect_values(&config, &plane_wave_expectations()).unwrap().unwrap();
    assert_eq!(report.samples.len(), 4);
    assert_eq!(
        report.samples.iter().map(|s| s.iteration).collect::<Vec<_>>(),
        vec![0, 30, 60, 90],
    );
    assert!(report.passed(), "{}", report);
    assert!(report.energy.stddev > 0.0);
    assert!(report.py.mean.abs() < 1e-12);
    assert!(format!("{}", report).lines().all(|l| l.contains("-> OK")));

    assert_eq!(report.path, dir.join("exp_val_D24_I100_S30.dat"));
    let series = fs::read_to_string(&report.path).unwrap();
    let mut lines = series.lines();
    assert_eq!(lines.next(), Some(SERIES_HEADER));
    assert_eq!(lines.count(), 4);
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn wrong_expectation_fails() {
    let dir = scratch("fail");
    let config = batch(dir.clone(), 80, 20);
    write_plane_waves(&config);
    let expectations = Expectations {
        expected_px: -plane_wave_expectations().expected_px,
        ..plane_wave_expectations()
    };
    let report = expect_values(&config, &expectations).unwrap().unwrap();
    assert!(!report.passed());
    assert!(report.verdicts[0].passed);
    assert!(!report.verdicts[1].passed);
    assert!(report.verdicts[2].passed);
    assert!(format!("{}", report.verdicts[1])
        .starts_with("Momentum Px value is not the one theoretically expected"));
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_snapshot_aborts() {
    let dir = scratch("missing");
    let config = batch(dir.clone(), 80, 20);
    write_plane_waves(&config);
    fs::remove_file(stamp_path(&dir, 40, "comp")).unwrap();
    let res = expect_values(&config, &plane_wave_expectations());
    assert!(matches!(res, Err(ExpectError::Read(ReadError::Io { .. }))));
    assert!(!config.output_path().exists());
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn malformed_snapshot_aborts() {
    let dir = scratch("malformed");
    let config = batch(dir.clone(), 80, 20);
    write_plane_waves(&config);
    fs::write(stamp_path(&dir, 20, "comp"), "(1,0) (nan?,0)\n").unwrap();
    let res = expect_values(&config, &plane_wave_expectations());
    assert!(matches!(res, Err(ExpectError::Read(ReadError::Parse { line: 1, .. }))));
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn too_few_snapshots() {
    let config = batch(scratch("few"), 10, 20);
    assert_eq!(config.num_snapshots(), 1);
    let res = expect_values(&config, &plane_wave_expectations());
    assert!(matches!(res, Err(ExpectError::TooFewSnapshots(1))));
    fs::remove_dir_all(&config.dirname).ok();
}

// evolve a plane wave on two ranks, stamp it every 50 steps and check the
// stamped series against the lattice dispersion
#[test]
fn evolved_plane_wave_matches_dispersion() {
    const DIM: usize = 64;
    let dir = scratch("evolved");
    let (iterations, stride) = (1000, 50);
    let k = TAU / DIM as f64;
    let results = ThreadComm::run(2, |comm| {
        let config = LatticeConfig::default().with_dims(DIM, DIM).with_periods(true, true);
        let lattice = Lattice::new(&config, &comm).unwrap();
        let mut state
            = State::from_fn(&lattice, |m, _, _| C64::cis(k * m as f64) / DIM as f64);
        let hamiltonian = Hamiltonian::free(&lattice, 1.0);
        let evolution = EvolutionConfig::default().with_delta_t(0.1);
        let mut solver
            = Solver::new(&lattice, &comm, &state, &hamiltonian, &evolution).unwrap();
        let mut it = 0;
        while it < iterations {
            io::stamp(&lattice, &comm, &state, it, &dir).unwrap();
            solver.evolve(stride).unwrap();
            solver.store(&mut state).unwrap();
            it += stride;
        }
    });
    assert_eq!(results.unwrap().len(), 2);

    let config = BatchConfig {
        dim: DIM,
        iterations,
        stride,
        mass: 1.0,
        delta_x: 1.0,
        delta_y: 1.0,
        dirname: dir.clone(),
        potential: None,
    };
    let report = expect_values(&config, &plane_wave_expectations_for(DIM)).unwrap().unwrap();
    assert_eq!(report.samples.len(), 20);
    assert!(report.passed(), "{}", report);
    fs::remove_dir_all(&dir).ok();
}
