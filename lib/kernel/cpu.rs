//! Reference kernel on row-major `ndarray` planes.

use ndarray::{ self as nd, Zip };
use crate::{
    hamiltonian::ExpPotential,
    kernel::{
        Axis,
        Kernel,
        StepParams,
        Sweep,
        kinetic_pair,
        potential_point,
        rotation_pair,
    },
    state::State,
};

/// Single-threaded kernel holding the wavefunction as `(dim_y, dim_x)` real and
/// imaginary planes.
#[derive(Clone, Debug)]
pub struct CpuKernel {
    params: StepParams,
    re: nd::Array2<f64>,
    im: nd::Array2<f64>,
    pot_re: nd::Array2<f64>,
    pot_im: nd::Array2<f64>,
}

impl CpuKernel {
    pub fn new(state: &State, exp_potential: &ExpPotential, params: StepParams)
        -> Self
    {
        Self {
            params,
            re: state.re.clone(),
            im: state.im.clone(),
            pot_re: exp_potential.re.clone(),
            pot_im: exp_potential.im.clone(),
        }
    }

    // pairs of rows (r, r + 1)
    fn sweep_rows<F>(&mut self, parity: usize, mut f: F)
    where F: FnMut(&StepParams, usize, &mut f64, &mut f64, &mut f64, &mut f64)
    {
        let dim_y = self.params.dim_y;
        let mut r = self.params.first_pair(Axis::Y, parity);
        while r + 1 < dim_y {
            let (re_a, re_b)
                = self.re.multi_slice_mut((nd::s![r, ..], nd::s![r + 1, ..]));
            let (im_a, im_b)
                = self.im.multi_slice_mut((nd::s![r, ..], nd::s![r + 1, ..]));
            let p = &self.params;
            Zip::indexed(re_a).and(im_a).and(re_b).and(im_b)
                .for_each(|c, ra, ia, rb, ib| f(p, c, ra, ia, rb, ib));
            r += 2;
        }
    }

    // pairs of columns (c, c + 1)
    fn sweep_cols<F>(&mut self, parity: usize, mut f: F)
    where F: FnMut(&StepParams, usize, &mut f64, &mut f64, &mut f64, &mut f64)
    {
        let dim_x = self.params.dim_x;
        let mut c = self.params.first_pair(Axis::X, parity);
        while c + 1 < dim_x {
            let (re_a, re_b)
                = self.re.multi_slice_mut((nd::s![.., c], nd::s![.., c + 1]));
            let (im_a, im_b)
                = self.im.multi_slice_mut((nd::s![.., c], nd::s![.., c + 1]));
            let p = &self.params;
            Zip::indexed(re_a).and(im_a).and(re_b).and(im_b)
                .for_each(|r, ra, ia, rb, ib| f(p, r, ra, ia, rb, ib));
            c += 2;
        }
    }
}

impl Kernel for CpuKernel {
    fn name(&self) -> &'static str { "cpu" }

    fn params(&self) -> &StepParams { &self.params }

    fn sweep(&mut self, sweep: Sweep) {
        match sweep {
            Sweep::Kinetic(Axis::Y, parity) => {
                let c = self.params.kinetic(Axis::Y);
                self.sweep_rows(parity, |p, _, ra, ia, rb, ib| {
                    kinetic_pair(p.imag_time, c, ra, ia, rb, ib)
                });
            },
            Sweep::Kinetic(Axis::X, parity) => {
                let c = self.params.kinetic(Axis::X);
                self.sweep_cols(parity, |p, _, ra, ia, rb, ib| {
                    kinetic_pair(p.imag_time, c, ra, ia, rb, ib)
                });
            },
            Sweep::Rotation(Axis::Y, parity) => {
                if self.params.rotation.is_none() { return; }
                // coefficients depend on the column
                self.sweep_rows(parity, |p, c, ra, ia, rb, ib| {
                    if let Some(rot) = p.rotation.as_ref() {
                        rotation_pair(p.imag_time, rot.y_pairs[c], ra, ia, rb, ib);
                    }
                });
            },
            Sweep::Rotation(Axis::X, parity) => {
                if self.params.rotation.is_none() { return; }
                // coefficients depend on the row
                self.sweep_cols(parity, |p, r, ra, ia, rb, ib| {
                    if let Some(rot) = p.rotation.as_ref() {
                        rotation_pair(p.imag_time, rot.x_pairs[r], ra, ia, rb, ib);
                    }
                });
            },
            Sweep::Potential => {
                let p = &self.params;
                Zip::from(&mut self.re)
                    .and(&mut self.im)
                    .and(&self.pot_re)
                    .and(&self.pot_im)
                    .for_each(|re, im, &pr, &pi| potential_point(p, pr, pi, re, im));
            },
        }
    }

    fn get_sample(
        &self,
        dest_stride: usize,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        dest_re: &mut [f64],
        dest_im: &mut [f64],
    ) {
        let src_re = self.re.slice(nd::s![y..y + height, x..x + width]);
        let src_im = self.im.slice(nd::s![y..y + height, x..x + width]);
        let rows = src_re.outer_iter().zip(src_im.outer_iter()).enumerate();
        for (j, (row_re, row_im)) in rows {
            let off = j * dest_stride;
            dest_re[off..off + width].iter_mut().zip(row_re)
                .for_each(|(d, s)| { *d = *s; });
            dest_im[off..off + width].iter_mut().zip(row_im)
                .for_each(|(d, s)| { *d = *s; });
        }
    }

    fn set_sample(
        &mut self,
        src_stride: usize,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        src_re: &[f64],
        src_im: &[f64],
    ) {
        let mut dest_re = self.re.slice_mut(nd::s![y..y + height, x..x + width]);
        let mut dest_im = self.im.slice_mut(nd::s![y..y + height, x..x + width]);
        let rows = dest_re.outer_iter_mut().zip(dest_im.outer_iter_mut()).enumerate();
        for (j, (mut row_re, mut row_im)) in rows {
            let off = j * src_stride;
            row_re.iter_mut().zip(&src_re[off..off + width])
                .for_each(|(d, s)| { *d = *s; });
            row_im.iter_mut().zip(&src_im[off..off + width])
                .for_each(|(d, s)| { *d = *s; });
        }
    }

    fn scale(&mut self, factor: f64) {
        self.re *= factor;
        self.im *= factor;
    }

    fn squared_sum(&self, x: usize, y: usize, width: usize, height: usize) -> f64 {
        let re = self.re.slice(nd::s![y..y + height, x..x + width]);
        let im = self.im.slice(nd::s![y..y + height, x..x + width]);
        Zip::from(&re).and(&im).fold(0.0, |acc, r, i| acc + r * r + i * i)
    }

    fn store(&self, state: &mut State) {
        state.re.assign(&self.re);
        state.im.assign(&self.im);
    }
}
