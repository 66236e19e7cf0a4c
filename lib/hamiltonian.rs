//! Physical parameters of the evolution and the quantities derived from them
//! for a fixed time step.

use ndarray as nd;
use crate::lattice::Lattice;

/// Single-particle (or mean-field) Hamiltonian
/// ```text
/// H = -∇²/2m + V(x, y) + g |ψ|² - Ω L_z
/// ```
/// with the external potential sampled over the local sub-lattice.
#[derive(Clone, Debug, PartialEq)]
pub struct Hamiltonian {
    pub mass: f64,
    /// Mean-field coupling `g`.
    pub coupling_const: f64,
    /// `V` over the local halo-inclusive array, shape `(dim_y, dim_x)`.
    pub potential: nd::Array2<f64>,
    /// Angular velocity of the rotating frame.
    pub omega: f64,
    /// Rotation centre along x, in grid units.
    pub rot_coord_x: f64,
    /// Rotation centre along y, in grid units.
    pub rot_coord_y: f64,
}

impl Hamiltonian {
    /// Sample `potential(m, n, lattice)` at the (wrapped) global column `m`
    /// and row `n` of every local point.
    pub fn new<F>(
        lattice: &Lattice,
        mass: f64,
        coupling_const: f64,
        mut potential: F,
        omega: f64,
        rot_coord: (f64, f64),
    ) -> Self
    where F: FnMut(usize, usize, &Lattice) -> f64
    {
        let potential
            = nd::Array2::from_shape_fn(
                (lattice.dim_y, lattice.dim_x),
                |(r, c)| potential(lattice.global_x(c), lattice.global_y(r), lattice),
            );
        Self {
            mass,
            coupling_const,
            potential,
            omega,
            rot_coord_x: rot_coord.0,
            rot_coord_y: rot_coord.1,
        }
    }

    /// A free particle of mass `mass`, without rotation.
    pub fn free(lattice: &Lattice, mass: f64) -> Self {
        Self::new(lattice, mass, 0.0, |_, _, _| 0.0, 0.0, (0.0, 0.0))
    }

    /// Tabulate the exponentiated potential for time step `delta_t`.
    pub fn exp_potential(&self, delta_t: f64, imag_time: bool) -> ExpPotential {
        initialize_exp_potential(self, delta_t, imag_time)
    }
}

/// Kinetic pair coefficients `(h_a, h_b)` of a single axis.
///
/// The constructors take the spacing product `δx δy` of a square cell; for one
/// axis of a general grid pass that axis' spacing twice, as
/// [`KineticCoefficients::new`] does.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Coefficients {
    pub h_a: f64,
    pub h_b: f64,
}

impl Coefficients {
    // rotation angle of one kinetic half step
    fn angle(delta_t: f64, mass: f64, delta_x: f64, delta_y: f64) -> f64 {
        (delta_t / 2.0) / (2.0 * mass * delta_x * delta_y)
    }

    /// `(cos θ, sin θ)` for real-time evolution, with
    /// `θ = (δt/2) / (2 m δx δy)`.
    pub fn real_time(delta_t: f64, mass: f64, delta_x: f64, delta_y: f64) -> Self {
        let theta = Self::angle(delta_t, mass, delta_x, delta_y);
        Self { h_a: theta.cos(), h_b: theta.sin() }
    }

    /// `(cosh θ, sinh θ)` for imaginary-time evolution, with `θ` as in
    /// [`Self::real_time`].
    pub fn imaginary_time(delta_t: f64, mass: f64, delta_x: f64, delta_y: f64)
        -> Self
    {
        let theta = Self::angle(delta_t, mass, delta_x, delta_y);
        Self { h_a: theta.cosh(), h_b: theta.sinh() }
    }

    /// Pick [`Self::real_time`] or [`Self::imaginary_time`].
    pub fn new(imag_time: bool, delta_t: f64, mass: f64, delta_x: f64, delta_y: f64)
        -> Self
    {
        if imag_time {
            Self::imaginary_time(delta_t, mass, delta_x, delta_y)
        } else {
            Self::real_time(delta_t, mass, delta_x, delta_y)
        }
    }
}

/// Kinetic coefficients for the pair sweeps along each axis.
///
/// Hopping along x couples points `δx` apart and along y points `δy` apart, so
/// on a grid with `δx != δy` the two axes rotate by different angles.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KineticCoefficients {
    /// Used by X pair sweeps; angle `(δt/2) / (2 m δx²)`.
    pub x: Coefficients,
    /// Used by Y pair sweeps; angle `(δt/2) / (2 m δy²)`.
    pub y: Coefficients,
}

impl KineticCoefficients {
    pub fn new(imag_time: bool, delta_t: f64, mass: f64, delta_x: f64, delta_y: f64)
        -> Self
    {
        Self {
            x: Coefficients::new(imag_time, delta_t, mass, delta_x, delta_x),
            y: Coefficients::new(imag_time, delta_t, mass, delta_y, delta_y),
        }
    }

    /// The same coefficients on both axes.
    pub fn uniform(coefficients: Coefficients) -> Self {
        Self { x: coefficients, y: coefficients }
    }
}

impl From<Coefficients> for KineticCoefficients {
    fn from(coefficients: Coefficients) -> Self { Self::uniform(coefficients) }
}

/// Per-point potential factor `exp(-i V δt)` (real time) or `exp(-V δt)`
/// (imaginary time), split into planes of shape `(dim_y, dim_x)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpPotential {
    pub re: nd::Array2<f64>,
    pub im: nd::Array2<f64>,
}

/// Tabulate the exponentiated potential of `hamiltonian` for one full step
/// `delta_t`.
///
/// The potential sits once at the centre of the symmetric step, so it is
/// exponentiated over the whole `δt`. This differs from schemes that tabulate
/// the factor for a half step `δt/2`; passing `δt/2` here reproduces those.
pub fn initialize_exp_potential(
    hamiltonian: &Hamiltonian,
    delta_t: f64,
    imag_time: bool,
) -> ExpPotential
{
    let v = &hamiltonian.potential;
    if imag_time {
        ExpPotential {
            re: v.mapv(|vk| (-vk * delta_t).exp()),
            im: nd::Array2::zeros(v.raw_dim()),
        }
    } else {
        ExpPotential {
            re: v.mapv(|vk| (vk * delta_t).cos()),
            im: v.mapv(|vk| -(vk * delta_t).sin()),
        }
    }
}
