//! Kernel strategies that apply one Trotter step to a rank's sub-lattice.
//!
//! A step is a fixed sequence of [`Sweep`]s, each either a family of 2x2 pair
//! rotations along one axis or a pointwise potential multiplication. The pair
//! and point updates themselves live here so that every kernel performs the
//! exact same floating point operations; kernels differ only in memory layout
//! and in how they schedule the work.
//!
//! A pair whose partner falls outside the local array is left untouched. At a
//! non-periodic domain edge this is the reflecting boundary condition; next to
//! a halo it corrupts one more halo cell per sweep, which is why the halo must
//! be at least as wide as the number of sweeps along an axis
//! (see [`required_halo`]).

use std::str::FromStr;
use crate::{
    error::KernelError,
    hamiltonian::{ Coefficients, ExpPotential, Hamiltonian, KineticCoefficients },
    lattice::Lattice,
    state::State,
};

pub mod cpu;
#[cfg(feature = "parallel")]
pub mod parallel;

/// A lattice axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Columns; the second array index.
    X,
    /// Rows; the first array index.
    Y,
}

/// A single sub-step of a Trotter step.
///
/// The `usize` in the pair sweeps is the parity `p` of the global index pairs
/// `(2k + p, 2k + p + 1)` being rotated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Sweep {
    /// Kinetic hopping between neighbours along an axis.
    Kinetic(Axis, usize),
    /// Rotating-frame term along an axis.
    Rotation(Axis, usize),
    /// Exponentiated external potential and mean-field nonlinearity.
    Potential,
}

const STEP: &[Sweep] = &[
    Sweep::Kinetic(Axis::Y, 0),
    Sweep::Kinetic(Axis::X, 0),
    Sweep::Kinetic(Axis::Y, 1),
    Sweep::Kinetic(Axis::X, 1),
    Sweep::Potential,
    Sweep::Kinetic(Axis::X, 1),
    Sweep::Kinetic(Axis::Y, 1),
    Sweep::Kinetic(Axis::X, 0),
    Sweep::Kinetic(Axis::Y, 0),
];

const STEP_ROTATING: &[Sweep] = &[
    Sweep::Kinetic(Axis::Y, 0),
    Sweep::Kinetic(Axis::X, 0),
    Sweep::Kinetic(Axis::Y, 1),
    Sweep::Kinetic(Axis::X, 1),
    Sweep::Rotation(Axis::Y, 0),
    Sweep::Rotation(Axis::Y, 1),
    Sweep::Rotation(Axis::X, 0),
    Sweep::Rotation(Axis::X, 1),
    Sweep::Potential,
    Sweep::Rotation(Axis::X, 1),
    Sweep::Rotation(Axis::X, 0),
    Sweep::Rotation(Axis::Y, 1),
    Sweep::Rotation(Axis::Y, 0),
    Sweep::Kinetic(Axis::X, 1),
    Sweep::Kinetic(Axis::Y, 1),
    Sweep::Kinetic(Axis::X, 0),
    Sweep::Kinetic(Axis::Y, 0),
];

/// Sequence of sweeps making up one symmetric step.
pub fn schedule(rotating: bool) -> &'static [Sweep] {
    if rotating { STEP_ROTATING } else { STEP }
}

/// Minimum halo width needed for the inner region to stay exact over a step:
/// the number of pair sweeps along either axis.
pub fn required_halo(rotating: bool) -> usize {
    schedule(rotating).iter()
        .filter(|s| matches!(s, Sweep::Kinetic(Axis::Y, _) | Sweep::Rotation(Axis::Y, _)))
        .count()
}

/// Available kernel strategies.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KernelType {
    /// Reference kernel on row-major planes.
    Cpu,
    /// Quadrant-layout kernel with row-parallel sweeps.
    Parallel,
}

impl KernelType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Parallel => "parallel",
        }
    }

    /// Halo width this kernel needs; see [`required_halo`].
    pub fn required_halo(&self, rotating: bool) -> usize {
        required_halo(rotating)
    }

    /// Load `state` and `exp_potential` into a new kernel instance.
    pub fn build(
        self,
        state: &State,
        exp_potential: &ExpPotential,
        params: StepParams,
    ) -> Result<Box<dyn Kernel>, KernelError>
    {
        match self {
            Self::Cpu => Ok(Box::new(cpu::CpuKernel::new(state, exp_potential, params))),
            #[cfg(feature = "parallel")]
            Self::Parallel => Ok(Box::new(
                parallel::ParallelKernel::new(state, exp_potential, params))),
            #[cfg(not(feature = "parallel"))]
            Self::Parallel => Err(KernelError::Unavailable(self.name())),
        }
    }
}

impl Default for KernelType {
    fn default() -> Self { Self::Cpu }
}

impl FromStr for KernelType {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "parallel" | "accelerator" => Ok(Self::Parallel),
            _ => Err(KernelError::Unknown(s.to_string())),
        }
    }
}

impl std::fmt::Display for KernelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Position-dependent pair coefficients for the rotating-frame sweeps.
///
/// Entries are `(cos θ, sin θ)` in real time and `(cosh θ, sinh θ)` in
/// imaginary time.
#[derive(Clone, Debug, PartialEq)]
pub struct Rotation {
    /// Coefficients for Y pairs, one per local column.
    pub y_pairs: Vec<(f64, f64)>,
    /// Coefficients for X pairs, one per local row.
    pub x_pairs: Vec<(f64, f64)>,
}

impl Rotation {
    /// Tabulate the rotation angles for a half time step.
    ///
    /// Coordinates are measured from the rotation centre in physical units:
    /// Y pairs in column `x` rotate by `ω x τ / (2 δy)` and X pairs in row `y`
    /// by `-ω y τ / (2 δx)`, with `τ = δt / 2`.
    pub fn new(
        lattice: &Lattice,
        hamiltonian: &Hamiltonian,
        delta_t: f64,
        imag_time: bool,
    ) -> Self
    {
        let tau = delta_t / 2.0;
        let omega = hamiltonian.omega;
        let trig = |theta: f64| -> (f64, f64) {
            if imag_time {
                (theta.cosh(), theta.sinh())
            } else {
                (theta.cos(), theta.sin())
            }
        };
        let y_pairs: Vec<(f64, f64)>
            = (0..lattice.dim_x)
            .map(|c| {
                let x = (lattice.global_x(c) as f64 - hamiltonian.rot_coord_x)
                    * lattice.delta_x;
                trig(omega * x * tau / (2.0 * lattice.delta_y))
            })
            .collect();
        let x_pairs: Vec<(f64, f64)>
            = (0..lattice.dim_y)
            .map(|r| {
                let y = (lattice.global_y(r) as f64 - hamiltonian.rot_coord_y)
                    * lattice.delta_y;
                trig(-omega * y * tau / (2.0 * lattice.delta_x))
            })
            .collect();
        Self { y_pairs, x_pairs }
    }
}

/// Everything a kernel needs to know about a step besides the fields.
#[derive(Clone, Debug, PartialEq)]
pub struct StepParams {
    /// Kinetic pair coefficients per axis.
    pub kinetic: KineticCoefficients,
    /// Nonlinear coupling times the time step, `g δt`.
    pub coupling: f64,
    pub imag_time: bool,
    pub dim_x: usize,
    pub dim_y: usize,
    /// Parity of the global column index of local column 0.
    pub parity_x: usize,
    /// Parity of the global row index of local row 0.
    pub parity_y: usize,
    pub rotation: Option<Rotation>,
}

impl StepParams {
    pub fn new(
        lattice: &Lattice,
        hamiltonian: &Hamiltonian,
        kinetic: KineticCoefficients,
        delta_t: f64,
        imag_time: bool,
    ) -> Self
    {
        let rotation
            = (hamiltonian.omega != 0.0)
            .then(|| Rotation::new(lattice, hamiltonian, delta_t, imag_time));
        Self {
            kinetic,
            coupling: hamiltonian.coupling_const * delta_t,
            imag_time,
            dim_x: lattice.dim_x,
            dim_y: lattice.dim_y,
            parity_x: lattice.x.start.rem_euclid(2) as usize,
            parity_y: lattice.y.start.rem_euclid(2) as usize,
            rotation,
        }
    }

    /// Local index of the first pair member for a sweep of global parity
    /// `parity` along `axis`.
    /// Kinetic coefficients for pair sweeps along `axis`.
    pub fn kinetic(&self, axis: Axis) -> Coefficients {
        match axis {
            Axis::X => self.kinetic.x,
            Axis::Y => self.kinetic.y,
        }
    }

    pub fn first_pair(&self, axis: Axis, parity: usize) -> usize {
        match axis {
            Axis::X => (parity + self.parity_x) % 2,
            Axis::Y => (parity + self.parity_y) % 2,
        }
    }
}

/// Kinetic hopping on a pair with coefficients `(a, b)`: `ψa' = a ψa + i b ψb`
/// in real time, `ψa' = a ψa + b ψb` in imaginary time, symmetric in `a` and
/// `b`.
#[inline]
pub(crate) fn kinetic_pair(
    imag_time: bool,
    Coefficients { h_a: a, h_b: b }: Coefficients,
    re_a: &mut f64,
    im_a: &mut f64,
    re_b: &mut f64,
    im_b: &mut f64,
) {
    let (ra, ia, rb, ib) = (*re_a, *im_a, *re_b, *im_b);
    if imag_time {
        *re_a = a * ra + b * rb;
        *im_a = a * ia + b * ib;
        *re_b = a * rb + b * ra;
        *im_b = a * ib + b * ia;
    } else {
        *re_a = a * ra - b * ib;
        *im_a = a * ia + b * rb;
        *re_b = a * rb - b * ia;
        *im_b = a * ib + b * ra;
    }
}

/// Rotating-frame pair update with coefficients `(c, s)` from a [`Rotation`]
/// table.
#[inline]
pub(crate) fn rotation_pair(
    imag_time: bool,
    (c, s): (f64, f64),
    re_a: &mut f64,
    im_a: &mut f64,
    re_b: &mut f64,
    im_b: &mut f64,
) {
    let (ra, ia, rb, ib) = (*re_a, *im_a, *re_b, *im_b);
    if imag_time {
        *re_a = c * ra + s * ib;
        *im_a = c * ia - s * rb;
        *re_b = c * rb - s * ia;
        *im_b = c * ib + s * ra;
    } else {
        *re_a = c * ra + s * rb;
        *im_a = c * ia + s * ib;
        *re_b = c * rb - s * ra;
        *im_b = c * ib - s * ia;
    }
}

/// Multiply one point by the exponentiated potential `pr + i pi` and, if the
/// coupling is non-zero, by the mean-field factor.
#[inline]
pub(crate) fn potential_point(
    p: &StepParams,
    pot_re: f64,
    pot_im: f64,
    re: &mut f64,
    im: &mut f64,
) {
    let (mut fr, mut fi) = (pot_re, pot_im);
    if p.coupling != 0.0 {
        let density = *re * *re + *im * *im;
        if p.imag_time {
            let nl = (-p.coupling * density).exp();
            fr *= nl;
            fi *= nl;
        } else {
            let (sn, cs) = (-p.coupling * density).sin_cos();
            (fr, fi) = (fr * cs - fi * sn, fr * sn + fi * cs);
        }
    }
    let (r, i) = (*re, *im);
    *re = fr * r - fi * i;
    *im = fr * i + fi * r;
}

/// A kernel owns a rank's wavefunction in its preferred layout for the
/// duration of an evolution.
///
/// Sample accessors address the halo-inclusive local array: `(x, y)` is a
/// column/row offset and the buffers hold `height` rows `stride` values apart.
pub trait Kernel: Send {
    fn name(&self) -> &'static str;

    fn params(&self) -> &StepParams;

    /// Apply a single sweep.
    fn sweep(&mut self, sweep: Sweep);

    /// Apply every sweep of one step in order.
    fn run_step(&mut self) {
        let rotating = self.params().rotation.is_some();
        for &sweep in schedule(rotating) {
            self.sweep(sweep);
        }
    }

    /// Copy a rectangle of the wavefunction into packed buffers.
    #[allow(clippy::too_many_arguments)]
    fn get_sample(
        &self,
        dest_stride: usize,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        dest_re: &mut [f64],
        dest_im: &mut [f64],
    );

    /// Overwrite a rectangle of the wavefunction from packed buffers.
    #[allow(clippy::too_many_arguments)]
    fn set_sample(
        &mut self,
        src_stride: usize,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        src_re: &[f64],
        src_im: &[f64],
    );

    /// Multiply the whole wavefunction by a real factor.
    fn scale(&mut self, factor: f64);

    /// Sum of `|ψ|²` over a rectangle, without any measure factor.
    fn squared_sum(&self, x: usize, y: usize, width: usize, height: usize) -> f64 {
        let mut re = vec![0.0; width * height];
        let mut im = vec![0.0; width * height];
        self.get_sample(width, x, y, width, height, &mut re, &mut im);
        re.iter().zip(&im).map(|(r, i)| r * r + i * i).sum()
    }

    /// Copy the full local array back into `state`.
    fn store(&self, state: &mut State) {
        let (w, h) = (self.params().dim_x, self.params().dim_y);
        let mut re = vec![0.0; w * h];
        let mut im = vec![0.0; w * h];
        self.get_sample(w, 0, 0, w, h, &mut re, &mut im);
        state.re.iter_mut().zip(re).for_each(|(s, v)| { *s = v; });
        state.im.iter_mut().zip(im).for_each(|(s, v)| { *s = v; });
    }
}
