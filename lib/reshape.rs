//! Conversion between the four-quadrant even/odd layout used by the
//! [parallel kernel][crate::kernel] and contiguous row-major matrices.
//!
//! A plane of `height` rows and `width` columns is stored as four quadrants,
//! each a row-major array with a common stride:
//! ```text
//! q00: even rows, even columns    q01: even rows, odd columns
//! q10: odd rows,  even columns    q11: odd rows,  odd columns
//! ```
//! so that the element at `(row, col)` sits at index
//! `(row / 2) * stride + col / 2` of quadrant `(row % 2, col % 2)`. Pair updates
//! in the even/odd scheme then touch matching indices of two quadrants.
//!
//! Real and imaginary planes always move together: every function here takes
//! both so that a complex value can never be split across different positions.

/// Borrowed quadrants of one plane.
#[derive(Copy, Clone, Debug)]
pub struct Quadrants<'a, T> {
    pub q00: &'a [T],
    pub q01: &'a [T],
    pub q10: &'a [T],
    pub q11: &'a [T],
}

impl<'a, T> Quadrants<'a, T> {
    // (evens, odds) for a given global row
    fn row_pair(&self, row: usize, stride: usize) -> (&'a [T], &'a [T]) {
        let off = (row / 2) * stride;
        if row % 2 == 0 {
            (&self.q00[off..], &self.q01[off..])
        } else {
            (&self.q10[off..], &self.q11[off..])
        }
    }
}

/// Mutably borrowed quadrants of one plane.
#[derive(Debug)]
pub struct QuadrantsMut<'a, T> {
    pub q00: &'a mut [T],
    pub q01: &'a mut [T],
    pub q10: &'a mut [T],
    pub q11: &'a mut [T],
}

impl<'a, T> QuadrantsMut<'a, T> {
    fn row_pair_mut(&mut self, row: usize, stride: usize)
        -> (&mut [T], &mut [T])
    {
        let off = (row / 2) * stride;
        if row % 2 == 0 {
            (&mut self.q00[off..], &mut self.q01[off..])
        } else {
            (&mut self.q10[off..], &mut self.q11[off..])
        }
    }
}

/// Interleave a run of `width` values starting at column `x` from the half-rows
/// `evens` (even columns) and `odds` (odd columns), writing them at the true
/// column positions `dest[x..x + width]`.
///
/// *Panics if any of the slices is too short*.
pub fn merge_line<T: Copy>(
    evens: &[T],
    odds: &[T],
    x: usize,
    width: usize,
    dest: &mut [T],
) {
    merge_line_to_buffer(evens, odds, x, width, &mut dest[x..x + width]);
}

/// Like [`merge_line`], but pack the run densely into `dest[..width]`.
///
/// *Panics if any of the slices is too short*.
pub fn merge_line_to_buffer<T: Copy>(
    evens: &[T],
    odds: &[T],
    x: usize,
    width: usize,
    dest: &mut [T],
) {
    let end = x + width;
    let mut col = x;
    let mut k: usize = 0;
    if col % 2 == 1 && col < end {
        dest[k] = odds[col / 2];
        col += 1;
        k += 1;
    }
    while col + 1 < end {
        dest[k] = evens[col / 2];
        dest[k + 1] = odds[col / 2];
        col += 2;
        k += 2;
    }
    if col < end {
        dest[k] = evens[col / 2];
        col += 1;
        k += 1;
    }
    assert_eq!(col, end, "merge_line: wrote {k} of {width} values");
}

/// Inverse of [`merge_line_to_buffer`]: distribute `src[..width]`, which holds
/// columns `x..x + width`, into the half-rows `evens` and `odds`.
///
/// *Panics if any of the slices is too short*.
pub fn split_line<T: Copy>(
    src: &[T],
    x: usize,
    width: usize,
    evens: &mut [T],
    odds: &mut [T],
) {
    let end = x + width;
    let mut col = x;
    for &v in src[..width].iter() {
        if col % 2 == 0 { evens[col / 2] = v; } else { odds[col / 2] = v; }
        col += 1;
    }
    assert_eq!(col, end);
}

/// Reassemble the `width` x `height` region at `(x, y)` from quadrant storage,
/// writing each value at its true position `row * dest_stride + col` of
/// `dest_re` and `dest_im`.
///
/// *Panics if the destination cannot hold the region*.
#[allow(clippy::too_many_arguments)]
pub fn get_quadrant_sample<T: Copy>(
    re: &Quadrants<'_, T>,
    im: &Quadrants<'_, T>,
    src_stride: usize,
    dest_stride: usize,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    dest_re: &mut [T],
    dest_im: &mut [T],
) {
    let mut rows: usize = 0;
    for row in y..y + height {
        let (e, o) = re.row_pair(row, src_stride);
        merge_line(e, o, x, width, &mut dest_re[row * dest_stride..]);
        let (e, o) = im.row_pair(row, src_stride);
        merge_line(e, o, x, width, &mut dest_im[row * dest_stride..]);
        rows += 1;
    }
    assert_eq!(rows, height);
}

/// Like [`get_quadrant_sample`], but pack the region densely at the start of
/// the destination buffers, with rows `dest_stride` apart.
///
/// *Panics if the destination cannot hold the region*.
#[allow(clippy::too_many_arguments)]
pub fn get_quadrant_sample_to_buffer<T: Copy>(
    re: &Quadrants<'_, T>,
    im: &Quadrants<'_, T>,
    src_stride: usize,
    dest_stride: usize,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    dest_re: &mut [T],
    dest_im: &mut [T],
) {
    let mut buffer_y: usize = 0;
    for row in y..y + height {
        let (e, o) = re.row_pair(row, src_stride);
        merge_line_to_buffer(
            e, o, x, width, &mut dest_re[buffer_y * dest_stride..]);
        let (e, o) = im.row_pair(row, src_stride);
        merge_line_to_buffer(
            e, o, x, width, &mut dest_im[buffer_y * dest_stride..]);
        buffer_y += 1;
    }
    assert_eq!(buffer_y, height);
}

/// Inverse of [`get_quadrant_sample_to_buffer`]: scatter a densely packed
/// region (rows `src_stride` apart) into quadrant storage at `(x, y)`.
///
/// *Panics if the source does not hold the region*.
#[allow(clippy::too_many_arguments)]
pub fn set_quadrant_sample<T: Copy>(
    re: &mut QuadrantsMut<'_, T>,
    im: &mut QuadrantsMut<'_, T>,
    dest_stride: usize,
    src_stride: usize,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    src_re: &[T],
    src_im: &[T],
) {
    for (buffer_y, row) in (y..y + height).enumerate() {
        let (e, o) = re.row_pair_mut(row, dest_stride);
        split_line(&src_re[buffer_y * src_stride..], x, width, e, o);
        let (e, o) = im.row_pair_mut(row, dest_stride);
        split_line(&src_im[buffer_y * src_stride..], x, width, e, o);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn halves(n: usize) -> (Vec<i32>, Vec<i32>) {
        let evens = (0..n).step_by(2).map(|c| c as i32).collect();
        let odds = (1..n).step_by(2).map(|c| c as i32).collect();
        (evens, odds)
    }

    #[test]
    fn merge_line_restores_column_order() {
        let (evens, odds) = halves(11);
        for x in 0..6 {
            for width in 0..=(11 - x) {
                let mut buf = vec![-1; width];
                merge_line_to_buffer(&evens, &odds, x, width, &mut buf);
                let expected: Vec<i32> = (x..x + width).map(|c| c as i32).collect();
                assert_eq!(buf, expected, "x = {x}, width = {width}");

                let mut row = vec![-1; 11];
                merge_line(&evens, &odds, x, width, &mut row);
                assert!(row[..x].iter().all(|&v| v == -1));
                assert_eq!(&row[x..x + width], expected.as_slice());
                assert!(row[x + width..].iter().all(|&v| v == -1));
            }
        }
    }

    #[test]
    fn split_then_merge_round_trip() {
        let (evens, odds) = halves(9);
        for x in 0..5 {
            for width in 0..=(9 - x) {
                let mut line = vec![0; width];
                merge_line_to_buffer(&evens, &odds, x, width, &mut line);
                let mut e2 = vec![-1; evens.len()];
                let mut o2 = vec![-1; odds.len()];
                split_line(&line, x, width, &mut e2, &mut o2);
                for c in x..x + width {
                    if c % 2 == 0 {
                        assert_eq!(e2[c / 2], evens[c / 2]);
                    } else {
                        assert_eq!(o2[c / 2], odds[c / 2]);
                    }
                }
            }
        }
    }

    // build quadrants for a `h` x `w` plane whose value at (r, c) is 100 r + c
    fn quadrants(h: usize, w: usize, sign: i32) -> ([Vec<i32>; 4], usize) {
        let stride = (w + 1) / 2;
        let rows = (h + 1) / 2;
        let mut q = [
            vec![0; rows * stride],
            vec![0; rows * stride],
            vec![0; rows * stride],
            vec![0; rows * stride],
        ];
        for r in 0..h {
            for c in 0..w {
                let idx = (r / 2) * stride + c / 2;
                q[(r % 2) * 2 + c % 2][idx] = sign * (100 * r + c) as i32;
            }
        }
        (q, stride)
    }

    #[test]
    fn quadrant_sample_in_place_and_packed() {
        let (h, w) = (7, 9);
        let (qr, stride) = quadrants(h, w, 1);
        let (qi, _) = quadrants(h, w, -1);
        let re = Quadrants { q00: &qr[0], q01: &qr[1], q10: &qr[2], q11: &qr[3] };
        let im = Quadrants { q00: &qi[0], q01: &qi[1], q10: &qi[2], q11: &qi[3] };

        let (x, y, width, height) = (1, 3, 6, 4);
        let mut full_re = vec![0; h * w];
        let mut full_im = vec![0; h * w];
        get_quadrant_sample(
            &re, &im, stride, w, x, y, width, height, &mut full_re, &mut full_im);
        for r in 0..h {
            for c in 0..w {
                let inside = (y..y + height).contains(&r) && (x..x + width).contains(&c);
                let expected = if inside { (100 * r + c) as i32 } else { 0 };
                assert_eq!(full_re[r * w + c], expected);
                assert_eq!(full_im[r * w + c], -expected);
            }
        }

        let mut buf_re = vec![0; width * height];
        let mut buf_im = vec![0; width * height];
        get_quadrant_sample_to_buffer(
            &re, &im, stride, width, x, y, width, height, &mut buf_re, &mut buf_im);
        for (j, r) in (y..y + height).enumerate() {
            for (i, c) in (x..x + width).enumerate() {
                assert_eq!(buf_re[j * width + i], (100 * r + c) as i32);
                assert_eq!(buf_im[j * width + i], -((100 * r + c) as i32));
            }
        }
    }

    #[test]
    fn set_then_get_quadrant_sample() {
        let (h, w) = (5, 6);
        let stride = (w + 1) / 2;
        let rows = (h + 1) / 2;
        let mut qr: Vec<Vec<f64>> = (0..4).map(|_| vec![0.0; rows * stride]).collect();
        let mut qi: Vec<Vec<f64>> = (0..4).map(|_| vec![0.0; rows * stride]).collect();
        let src_re: Vec<f64> = (0..h * w).map(|k| k as f64).collect();
        let src_im: Vec<f64> = (0..h * w).map(|k| -(k as f64) / 2.0).collect();
        {
            let [r00, r01, r10, r11] = qr.as_mut_slice() else { unreachable!() };
            let [i00, i01, i10, i11] = qi.as_mut_slice() else { unreachable!() };
            let mut re = QuadrantsMut { q00: r00, q01: r01, q10: r10, q11: r11 };
            let mut im = QuadrantsMut { q00: i00, q01: i01, q10: i10, q11: i11 };
            set_quadrant_sample(
                &mut re, &mut im, stride, w, 0, 0, w, h, &src_re, &src_im);
        }
        let re = Quadrants { q00: &qr[0], q01: &qr[1], q10: &qr[2], q11: &qr[3] };
        let im = Quadrants { q00: &qi[0], q01: &qi[1], q10: &qi[2], q11: &qi[3] };
        let mut out_re = vec![0.0; h * w];
        let mut out_im = vec![0.0; h * w];
        get_quadrant_sample_to_buffer(
            &re, &im, stride, w, 0, 0, w, h, &mut out_re, &mut out_im);
        assert_eq!(out_re, src_re);
        assert_eq!(out_im, src_im);
    }
}
