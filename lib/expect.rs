//! Batch analysis of a series of stored snapshots.
//!
//! Each snapshot `<iteration>-iter-comp.dat` is read back, its energy and
//! momentum are evaluated over the interior points, and the series is reduced
//! to a sample mean and standard deviation per quantity. A quantity passes when
//! its mean lies within `threshold` standard deviations of the expected value.

use std::{
    fmt,
    fs,
    io::{ BufWriter, Write },
    path::{ Path, PathBuf },
};
use log::info;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    error::ExpectError,
    io::{ read_complex_matrix, stamp_path },
};

/// Expected values and pass thresholds, in units of the sample standard
/// deviation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Expectations {
    pub expected_e: f64,
    pub expected_px: f64,
    pub expected_py: f64,
    pub threshold_e: f64,
    pub threshold_p: f64,
}

/// Observables of one snapshot.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SnapshotSample {
    pub iteration: usize,
    pub energy: f64,
    pub px: f64,
    pub py: f64,
    /// `px² + py²`
    pub p2: f64,
    /// `Σ |ψ|²` over the interior, without area element.
    pub norm: f64,
}

/// Energy and momentum of a global `(dim_y, dim_x)` wavefunction, summed over
/// the interior points `[1, dim - 2]` on both axes and divided by the interior
/// `Σ |ψ|²`.
pub fn snapshot_observables(
    iteration: usize,
    psi: &nd::Array2<C64>,
    potential: Option<&nd::Array2<f64>>,
    mass: f64,
    delta_x: f64,
    delta_y: f64,
) -> SnapshotSample
{
    let (h, w) = psi.dim();
    let cost_e = -1.0 / (2.0 * mass);
    let cost_p = C64::new(0.0, -0.5);
    let mut sum_e = C64::new(0.0, 0.0);
    let mut sum_px = C64::new(0.0, 0.0);
    let mut sum_py = C64::new(0.0, 0.0);
    let mut sum_psi = 0.0;
    for j in 1..h.saturating_sub(1) {
        for k in 1..w.saturating_sub(1) {
            let p = psi[[j, k]];
            let lap
                = (psi[[j, k + 1]] + psi[[j, k - 1]] - 2.0 * p) / (delta_x * delta_x)
                + (psi[[j + 1, k]] + psi[[j - 1, k]] - 2.0 * p) / (delta_y * delta_y);
            let v = potential.map(|v| v[[j, k]]).unwrap_or(0.0);
            sum_e += p.conj() * (cost_e * lap + p * v);
            sum_px += p.conj() * (psi[[j, k + 1]] - psi[[j, k - 1]]) / delta_x;
            sum_py += p.conj() * (psi[[j + 1, k]] - psi[[j - 1, k]]) / delta_y;
            sum_psi += p.norm_sqr();
        }
    }
    let energy = (sum_e / sum_psi).re;
    let px = (cost_p * sum_px / sum_psi).re;
    let py = (cost_p * sum_py / sum_psi).re;
    SnapshotSample { iteration, energy, px, py, p2: px * px + py * py, norm: sum_psi }
}

/// Sample mean and standard deviation (divisor `N - 1`).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SampleStats {
    pub mean: f64,
    pub stddev: f64,
}

impl SampleStats {
    /// Distance of the mean from `expected` in standard deviations.
    ///
    /// With zero spread this is `0` for an exact match and infinite otherwise.
    pub fn sigma(&self, expected: f64) -> f64 {
        let dev = (self.mean - expected).abs();
        if self.stddev > 0.0 {
            dev / self.stddev
        } else if dev == 0.0 {
            0.0
        } else {
            f64::INFINITY
        }
    }
}

/// Reduce a series to its sample statistics; `None` for fewer than two values.
pub fn sample_stats(values: &[f64]) -> Option<SampleStats> {
    let n = values.len();
    (n >= 2).then(|| {
        let mean = values.iter().sum::<f64>() / n as f64;
        let var
            = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / (n - 1) as f64;
        SampleStats { mean, stddev: var.sqrt() }
    })
}

/// Outcome of the comparison for one quantity.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Verdict {
    pub name: &'static str,
    pub sigma: f64,
    pub passed: bool,
}

impl Verdict {
    fn new(name: &'static str, stats: &SampleStats, expected: f64, threshold: f64)
        -> Self
    {
        let sigma = stats.sigma(expected);
        Self { name, sigma, passed: sigma < threshold }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed {
            write!(f, "{} -> OK\tsigma: {}", self.name, self.sigma)
        } else {
            write!(f, "{} value is not the one theoretically expected: sigma {}",
                self.name, self.sigma)
        }
    }
}

/// Result of [`expect_values`].
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub samples: Vec<SnapshotSample>,
    pub energy: SampleStats,
    pub px: SampleStats,
    pub py: SampleStats,
    /// Energy, Px, Py, in that order.
    pub verdicts: [Verdict; 3],
    /// Time-series file that was written.
    pub path: PathBuf,
}

impl Report {
    /// Return `true` if every quantity passed.
    pub fn passed(&self) -> bool { self.verdicts.iter().all(|v| v.passed) }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for v in self.verdicts.iter() {
            writeln!(f, "{}", v)?;
        }
        Ok(())
    }
}

/// Where to find a snapshot series and how to interpret it.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    /// Side length of the (square) snapshots.
    pub dim: usize,
    pub iterations: usize,
    /// Iterations between snapshots.
    pub stride: usize,
    pub mass: f64,
    pub delta_x: f64,
    pub delta_y: f64,
    pub dirname: PathBuf,
    /// Global `(dim, dim)` external potential, if any.
    pub potential: Option<nd::Array2<f64>>,
}

impl BatchConfig {
    /// Number of snapshots in the series, `ceil(iterations / stride)`.
    pub fn num_snapshots(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            (self.iterations + self.stride - 1) / self.stride
        }
    }

    /// Path of the time-series file.
    pub fn output_path(&self) -> PathBuf {
        self.dirname.join(format!(
            "exp_val_D{}_I{}_S{}.dat", self.dim, self.iterations, self.stride))
    }
}

/// Header of the time-series file.
pub const SERIES_HEADER: &str = "#time\tEnergy\t\tPx\tPy\tP**2\tnorm(psi(t))";

/// Analyze the snapshots `0, stride, 2 stride, ...` under `config.dirname`.
///
/// Writes the time series to [`BatchConfig::output_path`] and logs every
/// verdict. Returns `None` without touching any file if `stride` is zero. Any
/// missing or malformed snapshot aborts the whole analysis.
pub fn expect_values(config: &BatchConfig, expectations: &Expectations)
    -> Result<Option<Report>, ExpectError>
{
    if config.stride == 0 { return Ok(None); }
    let n = config.num_snapshots();
    if n < 2 { return Err(ExpectError::TooFewSnapshots(n)); }

    let samples: Vec<SnapshotSample>
        = (0..n)
        .map(|k| -> Result<SnapshotSample, ExpectError> {
            let iteration = k * config.stride;
            let path = stamp_path(&config.dirname, iteration, "comp");
            let psi = read_complex_matrix(&path, config.dim, config.dim)?;
            Ok(snapshot_observables(
                iteration,
                &psi,
                config.potential.as_ref(),
                config.mass,
                config.delta_x,
                config.delta_y,
            ))
        })
        .collect::<Result<_, _>>()?;

    let path = config.output_path();
    write_series(&path, &samples)
        .map_err(|source| ExpectError::Write { path: path.clone(), source })?;

    let stats = |f: fn(&SnapshotSample) -> f64| -> Result<SampleStats, ExpectError> {
        let values: Vec<f64> = samples.iter().map(f).collect();
        sample_stats(&values).ok_or(ExpectError::TooFewSnapshots(values.len()))
    };
    let energy = stats(|s| s.energy)?;
    let px = stats(|s| s.px)?;
    let py = stats(|s| s.py)?;
    let verdicts = [
        Verdict::new(
            "Energy", &energy, expectations.expected_e, expectations.threshold_e),
        Verdict::new(
            "Momentum Px", &px, expectations.expected_px, expectations.threshold_p),
        Verdict::new(
            "Momentum Py", &py, expectations.expected_py, expectations.threshold_p),
    ];
    verdicts.iter().for_each(|v| info!("{}", v));
    Ok(Some(Report { samples, energy, px, py, verdicts, path }))
}

fn write_series(path: &Path, samples: &[SnapshotSample]) -> std::io::Result<()> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    writeln!(out, "{}", SERIES_HEADER)?;
    for s in samples.iter() {
        writeln!(out, "{}\t{}\t{}\t{}\t{}\t{}",
            s.iteration, s.energy, s.px, s.py, s.p2, s.norm)?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_use_sample_variance() {
        let s = sample_stats(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(s.mean, 2.5);
        assert!((s.stddev - (5.0_f64 / 3.0).sqrt()).abs() < 1e-15);
        assert!(sample_stats(&[1.0]).is_none());
    }

    #[test]
    fn sigma_with_zero_spread() {
        let s = SampleStats { mean: 1.0, stddev: 0.0 };
        assert_eq!(s.sigma(1.0), 0.0);
        assert!(s.sigma(1.5).is_infinite());
    }

    #[test]
    fn verdict_messages() {
        let s = SampleStats { mean: 1.0, stddev: 0.5 };
        let ok = Verdict::new("Energy", &s, 1.2, 3.0);
        assert!(ok.passed);
        assert_eq!(format!("{}", ok).split('\t').next(), Some("Energy -> OK"));
        let bad = Verdict::new("Momentum Px", &s, 4.0, 2.0);
        assert!(!bad.passed);
        assert!(format!("{}", bad).starts_with("Momentum Px value is not"));
    }

    #[test]
    fn plane_wave_observables() {
        let dim = 32;
        let k = std::f64::consts::TAU / dim as f64;
        let psi = nd::Array2::from_shape_fn((dim, dim), |(_, c)| C64::cis(k * c as f64));
        let s = snapshot_observables(0, &psi, None, 1.0, 1.0, 1.0);
        assert!((s.energy - (1.0 - k.cos())).abs() < 1e-12);
        assert!((s.px - k.sin()).abs() < 1e-12);
        assert!(s.py.abs() < 1e-12);
        assert!((s.norm - ((dim - 2) * (dim - 2)) as f64).abs() < 1e-9);
    }

    #[test]
    fn zero_stride_is_a_no_op() {
        let config = BatchConfig {
            dim: 8,
            iterations: 100,
            stride: 0,
            mass: 1.0,
            delta_x: 1.0,
            delta_y: 1.0,
            dirname: PathBuf::from("/nonexistent"),
            potential: None,
        };
        let expectations = Expectations {
            expected_e: 0.0,
            expected_px: 0.0,
            expected_py: 0.0,
            threshold_e: 3.0,
            threshold_p: 2.0,
        };
        assert!(expect_values(&config, &expectations).unwrap().is_none());
    }
}
