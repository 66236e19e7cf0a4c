//! A rank's piece of the wavefunction.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    comm::Communicator,
    error::CommError,
    lattice::Lattice,
};

/// Real and imaginary planes of the wavefunction over the halo-inclusive local
/// array, shape `(dim_y, dim_x)`.
#[derive(Clone, Debug, PartialEq)]
pub struct State {
    pub re: nd::Array2<f64>,
    pub im: nd::Array2<f64>,
}

impl State {
    /// Create a zero state for `lattice`.
    pub fn new(lattice: &Lattice) -> Self {
        Self {
            re: nd::Array2::zeros((lattice.dim_y, lattice.dim_x)),
            im: nd::Array2::zeros((lattice.dim_y, lattice.dim_x)),
        }
    }

    /// Create a state with every point set by `f(m, n, lattice)`, where `m` is
    /// the (wrapped) global column and `n` the global row.
    pub fn from_fn<F>(lattice: &Lattice, f: F) -> Self
    where F: FnMut(usize, usize, &Lattice) -> C64
    {
        let mut new = Self::new(lattice);
        new.init_state(lattice, f);
        new
    }

    /// Overwrite every point with `f(m, n, lattice)`; see [`Self::from_fn`].
    pub fn init_state<F>(&mut self, lattice: &Lattice, mut f: F)
    where F: FnMut(usize, usize, &Lattice) -> C64
    {
        nd::Zip::indexed(&mut self.re).and(&mut self.im)
            .for_each(|(r, c), re, im| {
                let psi = f(lattice.global_x(c), lattice.global_y(r), lattice);
                *re = psi.re;
                *im = psi.im;
            });
    }

    /// `ψ` at local index `(r, c)`.
    pub fn get(&self, r: usize, c: usize) -> C64 {
        C64::new(self.re[[r, c]], self.im[[r, c]])
    }

    /// `Σ |ψ|² δx δy` over the inner regions of all ranks.
    pub fn calculate_squared_norm<C>(&self, lattice: &Lattice, comm: &C)
        -> Result<f64, CommError>
    where C: Communicator + ?Sized
    {
        let inner = lattice.inner();
        let s = nd::s![
            inner.y..inner.y + inner.height,
            inner.x..inner.x + inner.width,
        ];
        let local: f64
            = nd::Zip::from(self.re.slice(s)).and(self.im.slice(s))
            .fold(0.0, |acc, r, i| acc + r * r + i * i);
        let total = comm.all_reduce_sum(&[local])?;
        Ok(total[0] * lattice.delta_x * lattice.delta_y)
    }

    /// `|ψ|²` over the local array.
    pub fn get_particle_density(&self) -> nd::Array2<f64> {
        nd::Zip::from(&self.re).and(&self.im)
            .map_collect(|r, i| r * r + i * i)
    }

    /// `arg ψ` over the local array.
    pub fn get_phase(&self) -> nd::Array2<f64> {
        nd::Zip::from(&self.re).and(&self.im)
            .map_collect(|r, i| i.atan2(*r))
    }

    /// Multiply by a real factor.
    pub fn scale(&mut self, factor: f64) {
        self.re *= factor;
        self.im *= factor;
    }

    /// Rescale so that the squared norm equals `norm_squared`.
    pub fn normalize<C>(&mut self, lattice: &Lattice, comm: &C, norm_squared: f64)
        -> Result<(), CommError>
    where C: Communicator + ?Sized
    {
        let current = self.calculate_squared_norm(lattice, comm)?;
        if current > 0.0 { self.scale((norm_squared / current).sqrt()); }
        Ok(())
    }

    /// Assemble the global wavefunction on rank 0; `None` elsewhere.
    pub fn gather<C>(&self, lattice: &Lattice, comm: &C)
        -> Result<Option<nd::Array2<C64>>, CommError>
    where C: Communicator + ?Sized
    {
        let re = lattice.gather(comm, &self.re)?;
        let im = lattice.gather(comm, &self.im)?;
        Ok(re.zip(im).map(|(re, im)| {
            nd::Zip::from(&re).and(&im).map_collect(|r, i| C64::new(*r, *i))
        }))
    }
}
