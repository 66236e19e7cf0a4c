use trotter2d::border::{ axis_partition, calculate_borders, Borders };

// configurations where every rank owns more than the halo
fn valid_cases() -> Vec<(usize, usize, usize)> {
    let mut cases = Vec::new();
    for num_ranks in 1..=5 {
        for length in [16, 17, 30, 64, 101] {
            for halo in [0, 1, 4, 8] {
                let parts = axis_partition(num_ranks, length, halo, false);
                if parts.iter().all(|b| b.inner_len() > halo) {
                    cases.push((num_ranks, length, halo));
                }
            }
        }
    }
    cases
}

#[test]
fn inner_ranges_tile_the_axis() {
    for (num_ranks, length, halo) in valid_cases() {
        for periodic in [false, true] {
            let parts = axis_partition(num_ranks, length, halo, periodic);
            let mut next: isize = 0;
            for b in parts.iter() {
                assert_eq!(b.inner_start, next, "{:?}", (num_ranks, length, halo));
                assert!(b.inner_end > b.inner_start);
                next = b.inner_end;
            }
            assert_eq!(next, length as isize);
        }
    }
}

#[test]
fn halos_only_where_neighbours_exist() {
    for (num_ranks, length, halo) in valid_cases() {
        let parts = axis_partition(num_ranks, length, halo, false);
        let last = parts.len() - 1;
        for (coord, b) in parts.iter().enumerate() {
            let lower = if coord == 0 { 0 } else { halo };
            let upper = if coord == last { 0 } else { halo };
            assert_eq!(b.lower_halo(), lower);
            assert_eq!(b.upper_halo(), upper);
            assert!(b.start >= 0 && b.end <= length as isize);
        }
    }
}

#[test]
fn periodic_halos_on_both_sides() {
    for (num_ranks, length, halo) in valid_cases() {
        let parts = axis_partition(num_ranks, length, halo, true);
        for b in parts.iter() {
            assert_eq!(b.lower_halo(), halo);
            assert_eq!(b.upper_halo(), halo);
            assert_eq!(b.len(), b.inner_len() + 2 * halo);
        }
        assert_eq!(parts[0].start, -(halo as isize));
        assert_eq!(parts[parts.len() - 1].end, (length + halo) as isize);
    }
}

#[test]
fn local_indices_match_halo_widths() {
    let b: Borders = calculate_borders(1, 3, 30, 4, false);
    assert_eq!(b, Borders { start: 6, end: 24, inner_start: 10, inner_end: 20 });
    assert_eq!(b.local_inner_start(), 4);
    assert_eq!(b.local_inner_end(), 14);
    assert_eq!(b.len(), 18);
}
