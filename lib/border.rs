//! Partition geometry along a single axis.
//!
//! Every rank computes the ranges of every other rank from the same inputs, so
//! the functions here must stay pure: no communication is ever needed to agree
//! on who owns what.

/// Halo-extended and inner index ranges of one rank along one axis.
///
/// All ranges are half-open. On periodic axes `start` may be negative and `end`
/// may exceed the axis length; such indices wrap around the domain.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Borders {
    /// First index of the halo-extended range.
    pub start: isize,
    /// One past the last index of the halo-extended range.
    pub end: isize,
    /// First index owned by the rank.
    pub inner_start: isize,
    /// One past the last index owned by the rank.
    pub inner_end: isize,
}

impl Borders {
    /// Length of the halo-extended range.
    pub fn len(&self) -> usize { (self.end - self.start).max(0) as usize }

    /// Return `true` if the halo-extended range is empty.
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Number of points owned by the rank.
    pub fn inner_len(&self) -> usize {
        (self.inner_end - self.inner_start).max(0) as usize
    }

    /// Width of the halo below the inner range.
    pub fn lower_halo(&self) -> usize { (self.inner_start - self.start) as usize }

    /// Width of the halo above the inner range.
    pub fn upper_halo(&self) -> usize { (self.end - self.inner_end) as usize }

    /// Local index of the first owned point.
    pub fn local_inner_start(&self) -> usize { self.lower_halo() }

    /// Local index one past the last owned point.
    pub fn local_inner_end(&self) -> usize {
        (self.inner_end - self.start) as usize
    }
}

/// Compute the ranges owned by rank coordinate `coord` out of `num_ranks` along
/// an axis of `length` points with halos `halo` points wide.
///
/// Each rank owns `ceil(length / num_ranks)` points, so the last rank may own
/// fewer. With `halo == 0` this is a plain block partition.
///
/// *Panics if `num_ranks` is zero*.
pub fn calculate_borders(
    coord: usize,
    num_ranks: usize,
    length: usize,
    halo: usize,
    periodic: bool,
) -> Borders
{
    assert!(num_ranks > 0, "calculate_borders: no ranks on axis");
    let length = length as isize;
    let halo = halo as isize;
    let inner = length.div_euclid(num_ranks as isize)
        + (length.rem_euclid(num_ranks as isize) != 0) as isize;
    let inner_start = coord as isize * inner;
    let start
        = if periodic || coord != 0 { inner_start - halo } else { 0 };
    let mut end = inner_start + inner + halo;
    if end > length {
        end = if periodic { length + halo } else { length };
    }
    let inner_end
        = if periodic || end != length { end - halo } else { end };
    Borders { start, end, inner_start, inner_end }
}

/// Compute the ranges of every rank along an axis, in coordinate order.
pub fn axis_partition(num_ranks: usize, length: usize, halo: usize, periodic: bool)
    -> Vec<Borders>
{
    (0..num_ranks)
        .map(|coord| calculate_borders(coord, num_ranks, length, halo, periodic))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_rank_non_periodic_has_no_halo() {
        let b = calculate_borders(0, 1, 64, 4, false);
        assert_eq!(b, Borders { start: 0, end: 64, inner_start: 0, inner_end: 64 });
        assert_eq!(b.lower_halo(), 0);
        assert_eq!(b.upper_halo(), 0);
    }

    #[test]
    fn single_rank_periodic_wraps_both_sides() {
        let b = calculate_borders(0, 1, 64, 4, true);
        assert_eq!(b, Borders { start: -4, end: 68, inner_start: 0, inner_end: 64 });
        assert_eq!(b.len(), 72);
        assert_eq!(b.local_inner_start(), 4);
        assert_eq!(b.local_inner_end(), 68);
    }

    #[test]
    fn last_rank_owns_remainder() {
        // ceil(10 / 3) = 4 -> 4, 4, 2
        let parts = axis_partition(3, 10, 1, false);
        let owned: Vec<usize> = parts.iter().map(Borders::inner_len).collect();
        assert_eq!(owned, vec![4, 4, 2]);
        assert_eq!(parts[2].end, 10);
    }

    #[test]
    fn zero_halo_is_block_partition() {
        for periodic in [false, true] {
            let parts = axis_partition(4, 32, 0, periodic);
            for (coord, b) in parts.iter().enumerate() {
                assert_eq!(b.start, b.inner_start);
                assert_eq!(b.end, b.inner_end);
                assert_eq!(b.inner_start, 8 * coord as isize);
            }
        }
    }

    #[test]
    fn deterministic() {
        let a = calculate_borders(2, 5, 101, 3, true);
        let b = calculate_borders(2, 5, 101, 3, true);
        assert_eq!(a, b);
    }
}
