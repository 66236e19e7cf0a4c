//! Domain-decomposed Trotter-Suzuki evolution.
//!
//! A [`Solver`] loads the local state into a [`Kernel`], then alternates kernel
//! steps with halo exchanges. In imaginary time the state is renormalized
//! after every step. All configuration checks happen when the solver is built;
//! once evolution starts the only possible failures are communication errors.

use log::{ debug, trace };
use crate::{
    comm::Communicator,
    config::EvolutionConfig,
    error::{ CommError, GeometryError, KernelError, ShapeError, TResult },
    hamiltonian::{
        Coefficients,
        ExpPotential,
        Hamiltonian,
        KineticCoefficients,
        initialize_exp_potential,
    },
    kernel::{ Axis, Kernel, KernelType, StepParams },
    lattice::Lattice,
    state::State,
};

/// Tags for halo strips, named by the direction the strip travels.
pub const TAG_TO_LEFT: u32 = 1;
pub const TAG_TO_RIGHT: u32 = 2;
pub const TAG_TO_DOWN: u32 = 3;
pub const TAG_TO_UP: u32 = 4;

/// Reusable evolution driver for one rank.
pub struct Solver<'a, C>
where C: Communicator + ?Sized
{
    lattice: &'a Lattice,
    comm: &'a C,
    kernel: Box<dyn Kernel>,
    imag_time: bool,
    norm_squared: f64,
}

impl<'a, C> Solver<'a, C>
where C: Communicator + ?Sized
{
    /// Set up a solver with coefficients and exponentiated potential derived
    /// from `hamiltonian` and `config`.
    pub fn new(
        lattice: &'a Lattice,
        comm: &'a C,
        state: &State,
        hamiltonian: &Hamiltonian,
        config: &EvolutionConfig,
    ) -> TResult<Self>
    {
        let kinetic
            = config.coefficients.unwrap_or_else(|| {
                KineticCoefficients::new(
                    config.imag_time,
                    config.delta_t,
                    hamiltonian.mass,
                    lattice.delta_x,
                    lattice.delta_y,
                )
            });
        let exp_potential
            = initialize_exp_potential(hamiltonian, config.delta_t, config.imag_time);
        Self::with_parts(
            lattice,
            comm,
            state,
            hamiltonian,
            kinetic,
            &exp_potential,
            config.delta_t,
            config.kernel,
            config.imag_time,
            config.norm_squared,
        )
    }

    /// Set up a solver from explicitly given per-axis kinetic coefficients and
    /// exponentiated potential.
    #[allow(clippy::too_many_arguments)]
    pub fn with_parts(
        lattice: &'a Lattice,
        comm: &'a C,
        state: &State,
        hamiltonian: &Hamiltonian,
        kinetic: KineticCoefficients,
        exp_potential: &ExpPotential,
        delta_t: f64,
        kernel: KernelType,
        imag_time: bool,
        norm_squared: f64,
    ) -> TResult<Self>
    {
        let shape = (lattice.dim_y, lattice.dim_x);
        ShapeError::check("state.re", shape, state.re.dim())?;
        ShapeError::check("state.im", shape, state.im.dim())?;
        ShapeError::check("potential", shape, hamiltonian.potential.dim())?;
        ShapeError::check("exp_potential.re", shape, exp_potential.re.dim())?;
        ShapeError::check("exp_potential.im", shape, exp_potential.im.dim())?;

        let rotating = hamiltonian.omega != 0.0;
        let required = kernel.required_halo(rotating);
        for axis in [Axis::X, Axis::Y] {
            let got = lattice.halo(axis);
            if got < required {
                return Err(KernelError::Halo {
                    kernel: kernel.name(), axis, required, got }.into());
            }
        }

        let params
            = StepParams::new(lattice, hamiltonian, kinetic, delta_t, imag_time);
        let kernel = kernel.build(state, exp_potential, params)?;
        debug!(
            "rank {}: {} kernel on {}x{} local array, imag_time = {}, rotating = {}",
            lattice.rank, kernel.name(), lattice.dim_x, lattice.dim_y,
            imag_time, rotating,
        );
        let mut new = Self { lattice, comm, kernel, imag_time, norm_squared };
        // halos of the initial state may be stale
        new.exchange_halos()?;
        Ok(new)
    }

    pub fn kernel_name(&self) -> &'static str { self.kernel.name() }

    /// Advance by `iterations` steps.
    pub fn evolve(&mut self, iterations: usize) -> TResult<()> {
        trace!("rank {}: evolving {} steps", self.lattice.rank, iterations);
        for _ in 0..iterations {
            self.kernel.run_step();
            self.exchange_halos()?;
            if self.imag_time { self.renormalize()?; }
        }
        Ok(())
    }

    /// Current squared norm, summed over all ranks.
    pub fn squared_norm(&self) -> TResult<f64> {
        let inner = self.lattice.inner();
        let local
            = self.kernel.squared_sum(inner.x, inner.y, inner.width, inner.height);
        let total = self.comm.all_reduce_sum(&[local])?;
        Ok(total[0] * self.lattice.delta_x * self.lattice.delta_y)
    }

    /// Copy the evolved wavefunction into `state`.
    pub fn store(&self, state: &mut State) -> TResult<()> {
        let shape = (self.lattice.dim_y, self.lattice.dim_x);
        ShapeError::check("state.re", shape, state.re.dim())?;
        ShapeError::check("state.im", shape, state.im.dim())?;
        self.kernel.store(state);
        Ok(())
    }

    fn renormalize(&mut self) -> TResult<()> {
        let current = self.squared_norm()?;
        if current > 0.0 {
            self.kernel.scale((self.norm_squared / current).sqrt());
        }
        Ok(())
    }

    // send `width` x `height` at (x0, y0) to `dest`, receive the same shape
    // from `source` into (x1, y1)
    #[allow(clippy::too_many_arguments)]
    fn exchange_strip(
        &mut self,
        dest: Option<usize>,
        (x0, y0): (usize, usize),
        source: Option<usize>,
        (x1, y1): (usize, usize),
        width: usize,
        height: usize,
        tag: u32,
    ) -> TResult<()>
    {
        let n = width * height;
        let mut data: Vec<f64> = Vec::new();
        if dest.is_some() {
            let mut re = vec![0.0; n];
            let mut im = vec![0.0; n];
            self.kernel.get_sample(width, x0, y0, width, height, &mut re, &mut im);
            data = re;
            data.append(&mut im);
        }
        if let Some(recv) = self.comm.sendrecv(dest, data, source, tag)? {
            let src = source.unwrap_or_default();
            if recv.len() != 2 * n {
                return Err(CommError::SizeMismatch {
                    source_rank: src, expected: 2 * n, got: recv.len() }.into());
            }
            let (re, im) = recv.split_at(n);
            self.kernel.set_sample(width, x1, y1, width, height, re, im);
        }
        Ok(())
    }

    /// Refresh every halo from the neighbouring ranks: X strips over the full
    /// local height first, then Y strips over the full local width so that
    /// corner values travel through both exchanges.
    pub fn exchange_halos(&mut self) -> TResult<()> {
        let lat = self.lattice;
        let nb = lat.neighbors;
        let (hx, hy) = (lat.halo_x, lat.halo_y);
        let (ix0, ix1) = (lat.x.local_inner_start(), lat.x.local_inner_end());
        let (iy0, iy1) = (lat.y.local_inner_start(), lat.y.local_inner_end());
        // offsets only matter on sides with a neighbour, where the inner region
        // is wider than the halo
        if hx > 0 {
            // my first inner columns become the left neighbour's upper halo
            self.exchange_strip(
                nb.left, (ix0, 0), nb.right, (ix1, 0), hx, lat.dim_y, TAG_TO_LEFT)?;
            // my last inner columns become the right neighbour's lower halo
            self.exchange_strip(
                nb.right, (ix1.saturating_sub(hx), 0),
                nb.left, (ix0.saturating_sub(hx), 0),
                hx, lat.dim_y, TAG_TO_RIGHT)?;
        }
        if hy > 0 {
            self.exchange_strip(
                nb.down, (0, iy0), nb.up, (0, iy1), lat.dim_x, hy, TAG_TO_DOWN)?;
            self.exchange_strip(
                nb.up, (0, iy1.saturating_sub(hy)),
                nb.down, (0, iy0.saturating_sub(hy)),
                lat.dim_x, hy, TAG_TO_UP)?;
        }
        Ok(())
    }
}

/// Evolve `state` in place by `iterations` Trotter steps.
///
/// `(h_a, h_b)` are used for the pair sweeps along both axes, which is only
/// consistent on a grid with `δx == δy`; other grids are rejected with
/// [`GeometryError::Anisotropic`] (use a [`Solver`], which derives separate
/// coefficients per axis). `kernel` names the kernel strategy (see
/// [`KernelType`]); `norm_squared` is the squared norm the state is held at in
/// imaginary time.
#[allow(clippy::too_many_arguments)]
pub fn trotter<C>(
    lattice: &Lattice,
    comm: &C,
    state: &mut State,
    hamiltonian: &Hamiltonian,
    h_a: f64,
    h_b: f64,
    exp_potential: &ExpPotential,
    delta_t: f64,
    iterations: usize,
    kernel: &str,
    norm_squared: f64,
    imag_time: bool,
) -> TResult<()>
where C: Communicator + ?Sized
{
    let kernel: KernelType = kernel.parse()?;
    (lattice.delta_x == lattice.delta_y).then_some(())
        .ok_or(GeometryError::Anisotropic(lattice.delta_x, lattice.delta_y))?;
    let mut solver = Solver::with_parts(
        lattice,
        comm,
        state,
        hamiltonian,
        Coefficients { h_a, h_b }.into(),
        exp_potential,
        delta_t,
        kernel,
        imag_time,
        norm_squared,
    )?;
    solver.evolve(iterations)?;
    solver.store(state)
}
