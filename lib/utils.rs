//! Miscellaneous tools.

use ndarray::{ self as nd, concatenate };
use rustfft as fft;
use num_complex::Complex64 as C64;
use num_traits::Zero;
use crate::Arr2;

/// Factor `n` ranks into a `[x, y]` process grid that is as square as
/// possible, with the larger factor along x.
///
/// *Panics if `n` is zero*.
pub fn dims_create(n: usize) -> [usize; 2] {
    assert!(n > 0, "dims_create: no ranks");
    let py
        = (1..=n)
        .take_while(|d| d * d <= n)
        .filter(|d| n % d == 0)
        .last()
        .unwrap_or(1);
    [n / py, py]
}

/// Generate an array of frequency-space coordinates to accompany a FFT of `n`
/// points for sampling interval `dx`.
pub fn fft_freq(n: usize, dx: f64) -> nd::Array1<f64> {
    let split = (n + 1) / 2;
    let fp: nd::Array1<f64>
        = (0..split)
        .map(|k| k as f64 / (n as f64 * dx))
        .collect();
    let fm: nd::Array1<f64>
        = (1..n - split + 1).rev()
        .map(|k| -(k as f64) / (n as f64 * dx))
        .collect();
    concatenate!(nd::Axis(0), fp, fm)
}

// transform every lane along `axis` in place
fn fft_axis(x: &mut nd::Array2<C64>, axis: nd::Axis, plan: &mut fft::FftPlanner<f64>) {
    let n = x.len_of(axis);
    if n == 0 { return; }
    let fft_plan = plan.plan_fft_forward(n);
    let mut buf: Vec<C64> = vec![C64::zero(); n];
    for mut lane in x.lanes_mut(axis) {
        buf.iter_mut().zip(lane.iter()).for_each(|(b, l)| { *b = *l; });
        fft_plan.process(&mut buf);
        lane.iter_mut().zip(&buf).for_each(|(l, b)| { *l = *b; });
    }
}

/// Perform the two-dimensional, complex-valued FFT over both axes.
pub fn fft2<S>(x: &Arr2<S>) -> nd::Array2<C64>
where S: nd::Data<Elem = C64>
{
    let mut f = x.to_owned();
    let mut plan = fft::FftPlanner::new();
    fft_axis(&mut f, nd::Axis(1), &mut plan);
    fft_axis(&mut f, nd::Axis(0), &mut plan);
    f
}

/// Return a copy of `x` with indices shifted along `axis` to map super-Nyquist
/// frequency components to negative frequencies.
pub fn fft_shift_axis<S, A>(x: &Arr2<S>, axis: nd::Axis)
    -> nd::Array2<A>
where
    S: nd::Data<Elem = A>,
    A: Clone,
{
    let n = x.len_of(axis);
    let (p, m) = x.view().split_at(axis, (n + 1) / 2);
    concatenate!(axis, m, p)
}

/// Shift both axes; see [`fft_shift_axis`].
pub fn fft_shift2<S, A>(x: &Arr2<S>) -> nd::Array2<A>
where
    S: nd::Data<Elem = A>,
    A: Clone,
{
    fft_shift_axis(&fft_shift_axis(x, nd::Axis(0)), nd::Axis(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    #[test]
    fn dims_create_is_balanced() {
        assert_eq!(dims_create(1), [1, 1]);
        assert_eq!(dims_create(2), [2, 1]);
        assert_eq!(dims_create(4), [2, 2]);
        assert_eq!(dims_create(6), [3, 2]);
        assert_eq!(dims_create(7), [7, 1]);
        assert_eq!(dims_create(12), [4, 3]);
    }

    #[test]
    fn fft_freq_layout() {
        let f = fft_freq(4, 0.5);
        assert_eq!(f.to_vec(), vec![0.0, 0.5, -1.0, -0.5]);
        let f = fft_freq(5, 1.0);
        assert_eq!(f.to_vec(), vec![0.0, 0.2, 0.4, -0.4, -0.2]);
    }

    #[test]
    fn fft2_of_plane_wave_is_a_single_peak() {
        let (h, w) = (8, 16);
        let (ky, kx) = (3, 5);
        let x: nd::Array2<C64>
            = nd::Array2::from_shape_fn((h, w), |(r, c)| {
                let phase = TAU * (kx * c) as f64 / w as f64
                    + TAU * (ky * r) as f64 / h as f64;
                C64::cis(phase)
            });
        let f = fft2(&x);
        for ((r, c), v) in f.indexed_iter() {
            let expected = if (r, c) == (ky, kx) { (h * w) as f64 } else { 0.0 };
            assert!((v.norm() - expected).abs() < 1e-9, "({r}, {c}): {v}");
        }
    }

    #[test]
    fn shift_moves_zero_to_centre() {
        let x = nd::Array2::from_shape_fn((4, 5), |(r, c)| 10 * r + c);
        let s = fft_shift2(&x);
        assert_eq!(s[[2, 2]], 0);
        assert_eq!(s[[0, 0]], 23);
    }
}
