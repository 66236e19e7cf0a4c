//! Run configuration.
//!
//! Geometry and evolution settings are passed explicitly; nothing is read from
//! process-wide constants.

use crate::{
    hamiltonian::KineticCoefficients,
    kernel::KernelType,
};

/// Geometry of the global grid and of its decomposition.
#[derive(Clone, Debug, PartialEq)]
pub struct LatticeConfig {
    /// Number of grid points along x.
    pub dim_x: usize,
    /// Number of grid points along y.
    pub dim_y: usize,
    /// Grid spacing along x.
    pub delta_x: f64,
    /// Grid spacing along y.
    pub delta_y: f64,
    /// Periodicity of the `[x, y]` axes; non-periodic axes reflect.
    pub periods: [bool; 2],
    /// Halo width on both axes. `None` selects the minimum required by the
    /// kernels for the given `omega`.
    pub halo: Option<usize>,
    /// Angular velocity of the rotating frame.
    pub omega: f64,
    /// Ranks along `[x, y]`. `None` picks a balanced grid for the number of
    /// ranks available.
    pub proc_grid: Option<[usize; 2]>,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            dim_x: 64,
            dim_y: 64,
            delta_x: 1.0,
            delta_y: 1.0,
            periods: [false, false],
            halo: None,
            omega: 0.0,
            proc_grid: None,
        }
    }
}

impl LatticeConfig {
    pub fn with_dims(mut self, dim_x: usize, dim_y: usize) -> Self {
        self.dim_x = dim_x;
        self.dim_y = dim_y;
        self
    }

    pub fn with_spacing(mut self, delta_x: f64, delta_y: f64) -> Self {
        self.delta_x = delta_x;
        self.delta_y = delta_y;
        self
    }

    /// Set the spacings so that the current dimensions span a square of side
    /// `length`.
    pub fn with_edge_length(mut self, length: f64) -> Self {
        self.delta_x = length / self.dim_x as f64;
        self.delta_y = length / self.dim_y as f64;
        self
    }

    pub fn with_periods(mut self, periodic_x: bool, periodic_y: bool) -> Self {
        self.periods = [periodic_x, periodic_y];
        self
    }

    pub fn with_halo(mut self, halo: usize) -> Self {
        self.halo = Some(halo);
        self
    }

    pub fn with_omega(mut self, omega: f64) -> Self {
        self.omega = omega;
        self
    }

    pub fn with_proc_grid(mut self, procs_x: usize, procs_y: usize) -> Self {
        self.proc_grid = Some([procs_x, procs_y]);
        self
    }
}

/// Settings for a [`Solver`][crate::trotter::Solver].
#[derive(Clone, Debug, PartialEq)]
pub struct EvolutionConfig {
    /// Time step.
    pub delta_t: f64,
    pub kernel: KernelType,
    /// Evolve in imaginary time, renormalizing after every step.
    pub imag_time: bool,
    /// Squared norm the state is held at in imaginary time.
    pub norm_squared: f64,
    /// Kinetic coefficients to use instead of the ones derived from the time
    /// step, mass and spacings.
    pub coefficients: Option<KineticCoefficients>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            delta_t: 1e-4,
            kernel: KernelType::Cpu,
            imag_time: false,
            norm_squared: 1.0,
            coefficients: None,
        }
    }
}

impl EvolutionConfig {
    pub fn with_delta_t(mut self, delta_t: f64) -> Self {
        self.delta_t = delta_t;
        self
    }

    pub fn with_kernel(mut self, kernel: KernelType) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_imag_time(mut self, imag_time: bool) -> Self {
        self.imag_time = imag_time;
        self
    }

    pub fn with_norm_squared(mut self, norm_squared: f64) -> Self {
        self.norm_squared = norm_squared;
        self
    }

    pub fn with_coefficients<K>(mut self, coefficients: K) -> Self
    where K: Into<KineticCoefficients>
    {
        self.coefficients = Some(coefficients.into());
        self
    }
}
