//! Expectation values of the evolving state.
//!
//! Every function sums over the inner region of the calling rank, with
//! derivatives taken by finite differences against the four nearest
//! neighbours, then reduces the partial sums over all ranks. Neighbours outside
//! the local array count as zero, which is the reflecting wall at a
//! non-periodic edge; elsewhere they fall in the halo, so halos must be current.
//! Results are multiplied by the area element `δx δy` and divided by the
//! caller's `norm_squared`, and are identical on every rank.

use std::f64::consts::TAU;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    comm::Communicator,
    error::CommError,
    hamiltonian::Hamiltonian,
    lattice::Lattice,
    state::State,
    utils::{ fft2, fft_freq, fft_shift2 },
    Arr2,
};

/// First and second moments along both axes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Moments {
    pub x: f64,
    /// `<(x - <x>)²>`
    pub var_x: f64,
    pub y: f64,
    /// `<(y - <y>)²>`
    pub var_y: f64,
}

// a point and its four nearest neighbours
#[derive(Copy, Clone, Debug)]
struct Stencil {
    // local row and column
    r: usize,
    c: usize,
    psi: C64,
    left: C64,
    right: C64,
    down: C64,
    up: C64,
}

impl Stencil {
    fn laplacian(&self, dx: f64, dy: f64) -> C64 {
        (self.right + self.left - 2.0 * self.psi) / (dx * dx)
            + (self.up + self.down - 2.0 * self.psi) / (dy * dy)
    }

    fn d_x(&self, dx: f64) -> C64 { (self.right - self.left) / (2.0 * dx) }

    fn d_y(&self, dy: f64) -> C64 { (self.up - self.down) / (2.0 * dy) }
}

// sum `f` over the inner region, then over all ranks
fn reduce_inner<C, F, const N: usize>(
    lattice: &Lattice,
    comm: &C,
    state: &State,
    f: F,
) -> Result<[f64; N], CommError>
where
    C: Communicator + ?Sized,
    F: Fn(&Stencil) -> [f64; N],
{
    let inner = lattice.inner();
    let (h, w) = (lattice.dim_y, lattice.dim_x);
    let at = |r: Option<usize>, c: Option<usize>| -> C64 {
        match (r, c) {
            (Some(r), Some(c)) if r < h && c < w => state.get(r, c),
            _ => C64::new(0.0, 0.0),
        }
    };
    let mut acc = [0.0; N];
    for r in inner.y..inner.y + inner.height {
        for c in inner.x..inner.x + inner.width {
            let st = Stencil {
                r,
                c,
                psi: state.get(r, c),
                left: at(Some(r), c.checked_sub(1)),
                right: at(Some(r), Some(c + 1)),
                down: at(r.checked_sub(1), Some(c)),
                up: at(Some(r + 1), Some(c)),
            };
            acc.iter_mut().zip(f(&st)).for_each(|(a, v)| { *a += v; });
        }
    }
    let total = comm.all_reduce_sum(&acc)?;
    let mut out = [0.0; N];
    out.iter_mut().zip(total).for_each(|(o, t)| { *o = t; });
    Ok(out)
}

/// `Σ |ψ|² δx δy` over all ranks.
pub fn calculate_squared_norm<C>(lattice: &Lattice, comm: &C, state: &State)
    -> Result<f64, CommError>
where C: Communicator + ?Sized
{
    state.calculate_squared_norm(lattice, comm)
}

/// `<-∇²/2m>` from the five-point Laplacian.
pub fn calculate_kinetic_energy<C>(
    lattice: &Lattice,
    comm: &C,
    state: &State,
    hamiltonian: &Hamiltonian,
    norm_squared: f64,
) -> Result<f64, CommError>
where C: Communicator + ?Sized
{
    let (dx, dy) = (lattice.delta_x, lattice.delta_y);
    let cost = -1.0 / (2.0 * hamiltonian.mass);
    let [kin] = reduce_inner(lattice, comm, state, |st| {
        [(st.psi.conj() * st.laplacian(dx, dy) * cost).re]
    })?;
    Ok(kin * dx * dy / norm_squared)
}

/// `<H>`, including the external potential, the mean-field energy
/// `(g/2) |ψ|⁴` and the rotating-frame term `-Ω L_z`.
pub fn calculate_total_energy<C>(
    lattice: &Lattice,
    comm: &C,
    state: &State,
    hamiltonian: &Hamiltonian,
    norm_squared: f64,
) -> Result<f64, CommError>
where C: Communicator + ?Sized
{
    let (dx, dy) = (lattice.delta_x, lattice.delta_y);
    let cost_kin = -1.0 / (2.0 * hamiltonian.mass);
    let g = hamiltonian.coupling_const;
    let omega = hamiltonian.omega;
    let [e] = reduce_inner(lattice, comm, state, |st| {
        let density = st.psi.norm_sqr();
        let mut h_psi = st.laplacian(dx, dy) * cost_kin
            + st.psi * hamiltonian.potential[[st.r, st.c]]
            + st.psi * (0.5 * g * density);
        if omega != 0.0 {
            let x = (lattice.global_x(st.c) as f64 - hamiltonian.rot_coord_x) * dx;
            let y = (lattice.global_y(st.r) as f64 - hamiltonian.rot_coord_y) * dy;
            // -Ω L_z = iΩ (x ∂y - y ∂x)
            h_psi += C64::i() * omega * (x * st.d_y(dy) - y * st.d_x(dx));
        }
        [(st.psi.conj() * h_psi).re]
    })?;
    Ok(e * dx * dy / norm_squared)
}

/// Position moments, with coordinates measured from `origin` (column, row)
/// in grid units.
pub fn calculate_mean_position<C>(
    lattice: &Lattice,
    comm: &C,
    state: &State,
    origin: (f64, f64),
    norm_squared: f64,
) -> Result<Moments, CommError>
where C: Communicator + ?Sized
{
    let (dx, dy) = (lattice.delta_x, lattice.delta_y);
    let [sx, sx2, sy, sy2] = reduce_inner(lattice, comm, state, |st| {
        let density = st.psi.norm_sqr();
        let x = (lattice.global_x(st.c) as f64 - origin.0) * dx;
        let y = (lattice.global_y(st.r) as f64 - origin.1) * dy;
        [x * density, x * x * density, y * density, y * y * density]
    })?;
    let w = dx * dy / norm_squared;
    let (x, y) = (sx * w, sy * w);
    Ok(Moments { x, var_x: sx2 * w - x * x, y, var_y: sy2 * w - y * y })
}

/// Momentum moments; first moments from the central difference, second
/// moments from the three-point second difference.
pub fn calculate_mean_momentum<C>(
    lattice: &Lattice,
    comm: &C,
    state: &State,
    norm_squared: f64,
) -> Result<Moments, CommError>
where C: Communicator + ?Sized
{
    let (dx, dy) = (lattice.delta_x, lattice.delta_y);
    let mi = C64::new(0.0, -1.0);
    let [px, px2, py, py2] = reduce_inner(lattice, comm, state, |st| {
        let conj = st.psi.conj();
        let d2x = (st.right + st.left - 2.0 * st.psi) / (dx * dx);
        let d2y = (st.up + st.down - 2.0 * st.psi) / (dy * dy);
        [
            (conj * mi * st.d_x(dx)).re,
            -(conj * d2x).re,
            (conj * mi * st.d_y(dy)).re,
            -(conj * d2y).re,
        ]
    })?;
    let w = dx * dy / norm_squared;
    let (x, y) = (px * w, py * w);
    Ok(Moments { x, var_x: px2 * w - x * x, y, var_y: py2 * w - y * y })
}

/// Momentum-space density `|ψ(k)|²` of a global wavefunction, with zero
/// momentum moved to the centre of the array and normalized so that it sums to
/// `Σ |ψ|²`.
pub fn momentum_density<S>(psi: &Arr2<S>) -> nd::Array2<f64>
where S: nd::Data<Elem = C64>
{
    let n = psi.len().max(1) as f64;
    let f = fft2(psi);
    fft_shift2(&f.mapv(|fk| fk.norm_sqr() / n))
}

/// Wavenumbers `(kx, ky)` matching the axes of [`momentum_density`] over the
/// global grid of `lattice`.
pub fn momentum_axes(lattice: &Lattice) -> (nd::Array1<f64>, nd::Array1<f64>) {
    let axis = |n: usize, d: f64| -> nd::Array1<f64> {
        let mut k = fft_freq(n, d).mapv(|f| TAU * f).to_vec();
        k.rotate_left((n + 1) / 2);
        nd::Array1::from(k)
    };
    (
        axis(lattice.global_dim_x, lattice.delta_x),
        axis(lattice.global_dim_y, lattice.delta_y),
    )
}
