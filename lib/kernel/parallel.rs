//! Kernel on the four-quadrant even/odd layout, with the rows of every sweep
//! distributed over the rayon thread pool.
//!
//! Splitting by row and column parity turns every pair sweep into an
//! element-wise operation between two equally strided planes, so rows can be
//! processed independently and without any branching on parity in the inner
//! loops. See [`crate::reshape`] for the layout.

use log::debug;
use rayon::prelude::*;
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
    reshape::{
        Quadrants,
        QuadrantsMut,
        get_quadrant_sample_to_buffer,
        set_quadrant_sample,
    },
    state::State,
};

// [q00, q01, q10, q11]
type Planes = [Vec<f64>; 4];

fn quad(planes: &Planes) -> Quadrants<'_, f64> {
    Quadrants {
        q00: &planes[0],
        q01: &planes[1],
        q10: &planes[2],
        q11: &planes[3],
    }
}

fn quad_mut(planes: &mut Planes) -> QuadrantsMut<'_, f64> {
    let [q00, q01, q10, q11] = planes;
    QuadrantsMut { q00, q01, q10, q11 }
}

/// Kernel holding the wavefunction and the exponentiated potential in
/// quadrant storage.
#[derive(Clone, Debug)]
pub struct ParallelKernel {
    params: StepParams,
    // half width; quadrant stride
    hw: usize,
    re: Planes,
    im: Planes,
    pot_re: Planes,
    pot_im: Planes,
}

impl ParallelKernel {
    pub fn new(state: &State, exp_potential: &ExpPotential, params: StepParams)
        -> Self
    {
        let (w, h) = (params.dim_x, params.dim_y);
        let hw = (w + 1) / 2;
        let hh = (h + 1) / 2;
        let zeros = || -> Planes {
            [vec![0.0; hw * hh], vec![0.0; hw * hh], vec![0.0; hw * hh], vec![0.0; hw * hh]]
        };
        let mut new = Self {
            params,
            hw,
            re: zeros(),
            im: zeros(),
            pot_re: zeros(),
            pot_im: zeros(),
        };
        let state_re: Vec<f64> = state.re.iter().copied().collect();
        let state_im: Vec<f64> = state.im.iter().copied().collect();
        set_quadrant_sample(
            &mut quad_mut(&mut new.re),
            &mut quad_mut(&mut new.im),
            hw, w, 0, 0, w, h,
            &state_re, &state_im,
        );
        let pot_re: Vec<f64> = exp_potential.re.iter().copied().collect();
        let pot_im: Vec<f64> = exp_potential.im.iter().copied().collect();
        set_quadrant_sample(
            &mut quad_mut(&mut new.pot_re),
            &mut quad_mut(&mut new.pot_im),
            hw, w, 0, 0, w, h,
            &pot_re, &pot_im,
        );
        debug!(
            "parallel kernel: {}x{} in {}x{} quadrants on {} threads",
            w, h, hw, hh, rayon::current_num_threads(),
        );
        new
    }

    // number of real columns with parity `cp`
    fn cols(&self, cp: usize) -> usize { (self.params.dim_x + 1 - cp) / 2 }

    // pairs (c, c + 1) within every row; `f` receives the row index
    fn sweep_x<F>(&mut self, parity: usize, f: F)
    where F: Fn(&StepParams, usize, &mut f64, &mut f64, &mut f64, &mut f64) + Sync
    {
        let fp = self.params.first_pair(Axis::X, parity);
        let (hw, dim_y) = (self.hw, self.params.dim_y);
        // pairs (2i, 2i + 1) or (2i + 1, 2i + 2)
        let n_pairs = if fp == 0 { self.cols(1) } else { self.cols(0) - 1 };
        let [re00, re01, re10, re11] = &mut self.re;
        let [im00, im01, im10, im11] = &mut self.im;
        let p = &self.params;
        for (rp, re_e, re_o, im_e, im_o) in [
            (0, re00, re01, im00, im01),
            (1, re10, re11, im10, im11),
        ] {
            re_e.par_chunks_mut(hw)
                .zip(re_o.par_chunks_mut(hw))
                .zip(im_e.par_chunks_mut(hw).zip(im_o.par_chunks_mut(hw)))
                .enumerate()
                .filter(|(j, _)| 2 * j + rp < dim_y)
                .for_each(|(j, ((re_e, re_o), (im_e, im_o)))| {
                    let row = 2 * j + rp;
                    for i in 0..n_pairs {
                        if fp == 0 {
                            f(p, row, &mut re_e[i], &mut im_e[i], &mut re_o[i], &mut im_o[i]);
                        } else {
                            f(p, row, &mut re_o[i], &mut im_o[i], &mut re_e[i + 1], &mut im_e[i + 1]);
                        }
                    }
                });
        }
    }

    // pairs (r, r + 1) within every column; `f` receives the column index
    fn sweep_y<F>(&mut self, parity: usize, f: F)
    where F: Fn(&StepParams, usize, &mut f64, &mut f64, &mut f64, &mut f64) + Sync
    {
        let fp = self.params.first_pair(Axis::Y, parity);
        let (hw, dim_y) = (self.hw, self.params.dim_y);
        let n_cols = [self.cols(0), self.cols(1)];
        let [re00, re01, re10, re11] = &mut self.re;
        let [im00, im01, im10, im11] = &mut self.im;
        let p = &self.params;
        for (cp, re_0, re_1, im_0, im_1) in [
            (0, re00, re10, im00, im10),
            (1, re01, re11, im01, im11),
        ] {
            let n = n_cols[cp];
            // rows (2j, 2j + 1) pair q0 row j with q1 row j; rows
            // (2j + 1, 2j + 2) pair q1 row j with q0 row j + 1
            let (re_a, re_b, im_a, im_b): (&mut [f64], &mut [f64], &mut [f64], &mut [f64])
                = if fp == 0 {
                    (&mut re_0[..], &mut re_1[..], &mut im_0[..], &mut im_1[..])
                } else {
                    let re_0 = re_0.get_mut(hw..).unwrap_or_default();
                    let im_0 = im_0.get_mut(hw..).unwrap_or_default();
                    (&mut re_1[..], re_0, &mut im_1[..], im_0)
                };
            re_a.par_chunks_mut(hw)
                .zip(re_b.par_chunks_mut(hw))
                .zip(im_a.par_chunks_mut(hw).zip(im_b.par_chunks_mut(hw)))
                .enumerate()
                .filter(|(j, _)| 2 * j + fp + 1 < dim_y)
                .for_each(|(_, ((re_a, re_b), (im_a, im_b)))| {
                    for i in 0..n {
                        let col = 2 * i + cp;
                        f(p, col, &mut re_a[i], &mut im_a[i], &mut re_b[i], &mut im_b[i]);
                    }
                });
        }
    }

    fn sweep_potential(&mut self) {
        let p = &self.params;
        let hw = self.hw;
        let planes = self.re.iter_mut()
            .zip(self.im.iter_mut())
            .zip(self.pot_re.iter().zip(self.pot_im.iter()));
        for ((re, im), (pot_re, pot_im)) in planes {
            re.par_chunks_mut(hw)
                .zip(im.par_chunks_mut(hw))
                .zip(pot_re.par_chunks(hw).zip(pot_im.par_chunks(hw)))
                .for_each(|((re, im), (pot_re, pot_im))| {
                    re.iter_mut().zip(im.iter_mut())
                        .zip(pot_re.iter().zip(pot_im))
                        .for_each(|((re, im), (&pr, &pi))| {
                            potential_point(p, pr, pi, re, im)
                        });
                });
        }
    }
}

impl Kernel for ParallelKernel {
    fn name(&self) -> &'static str { "parallel" }

    fn params(&self) -> &StepParams { &self.params }

    fn sweep(&mut self, sweep: Sweep) {
        match sweep {
            Sweep::Kinetic(Axis::X, parity) => {
                let c = self.params.kinetic(Axis::X);
                self.sweep_x(parity, |p, _, ra, ia, rb, ib| {
                    kinetic_pair(p.imag_time, c, ra, ia, rb, ib)
                });
            },
            Sweep::Kinetic(Axis::Y, parity) => {
                let c = self.params.kinetic(Axis::Y);
                self.sweep_y(parity, |p, _, ra, ia, rb, ib| {
                    kinetic_pair(p.imag_time, c, ra, ia, rb, ib)
                });
            },
            Sweep::Rotation(Axis::X, parity) => {
                if self.params.rotation.is_none() { return; }
                self.sweep_x(parity, |p, row, ra, ia, rb, ib| {
                    if let Some(rot) = p.rotation.as_ref() {
                        rotation_pair(p.imag_time, rot.x_pairs[row], ra, ia, rb, ib);
                    }
                });
            },
            Sweep::Rotation(Axis::Y, parity) => {
                if self.params.rotation.is_none() { return; }
                self.sweep_y(parity, |p, col, ra, ia, rb, ib| {
                    if let Some(rot) = p.rotation.as_ref() {
                        rotation_pair(p.imag_time, rot.y_pairs[col], ra, ia, rb, ib);
                    }
                });
            },
            Sweep::Potential => { self.sweep_potential(); },
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
        get_quadrant_sample_to_buffer(
            &quad(&self.re), &quad(&self.im),
            self.hw, dest_stride, x, y, width, height,
            dest_re, dest_im,
        );
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
        set_quadrant_sample(
            &mut quad_mut(&mut self.re), &mut quad_mut(&mut self.im),
            self.hw, src_stride, x, y, width, height,
            src_re, src_im,
        );
    }

    fn scale(&mut self, factor: f64) {
        self.re.iter_mut().chain(self.im.iter_mut())
            .for_each(|plane| {
                plane.par_iter_mut().for_each(|v| { *v *= factor; });
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray as nd;
    use crate::hamiltonian::Coefficients;

    fn params(w: usize, h: usize) -> StepParams {
        StepParams {
            kinetic: Coefficients { h_a: 0.8, h_b: 0.6 }.into(),
            coupling: 0.0,
            imag_time: false,
            dim_x: w,
            dim_y: h,
            parity_x: 1,
            parity_y: 0,
            rotation: None,
        }
    }

    #[test]
    fn load_and_read_back() {
        let (w, h) = (7, 5);
        let re = nd::Array2::from_shape_fn((h, w), |(r, c)| (10 * r + c) as f64);
        let im = re.mapv(|v| -v);
        let state = State { re: re.clone(), im: im.clone() };
        let pot = ExpPotential {
            re: nd::Array2::ones((h, w)),
            im: nd::Array2::zeros((h, w)),
        };
        let kernel = ParallelKernel::new(&state, &pot, params(w, h));
        let mut out = State { re: nd::Array2::zeros((h, w)), im: nd::Array2::zeros((h, w)) };
        kernel.store(&mut out);
        assert_eq!(out.re, re);
        assert_eq!(out.im, im);
        assert_eq!(kernel.re[2].len(), 4 * 3);
        assert_eq!(kernel.squared_sum(0, 0, w, h), 2.0 * re.mapv(|v| v * v).sum());
    }
}
