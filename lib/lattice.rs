//! Global grid geometry and its decomposition over a 2D process grid.

use log::debug;
use ndarray as nd;
use crate::{
    border::{ Borders, axis_partition },
    comm::Communicator,
    config::LatticeConfig,
    error::{ CommError, GeometryError },
    kernel::{ self, Axis },
    utils::dims_create,
    Arr2,
};

/// Tag used by [`Lattice::gather`].
pub const TAG_GATHER: u32 = 0xffff_0001;

/// An axis-aligned rectangle of local array indices.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// Ranks owning the neighbouring partitions, if any.
///
/// `down` is the neighbour at lower row indices, `up` at higher ones.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Neighbors {
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub down: Option<usize>,
    pub up: Option<usize>,
}

/// Geometry of the whole grid as seen from one rank.
///
/// Local arrays have shape `(dim_y, dim_x)` and cover the halo-extended ranges
/// `x` and `y`; local index `(r, c)` is the global point
/// `(y.start + r, x.start + c)`, wrapped on periodic axes.
#[derive(Clone, Debug, PartialEq)]
pub struct Lattice {
    pub global_dim_x: usize,
    pub global_dim_y: usize,
    pub delta_x: f64,
    pub delta_y: f64,
    /// Periodicity of `[x, y]`.
    pub periods: [bool; 2],
    pub halo_x: usize,
    pub halo_y: usize,
    /// Ranks along `[x, y]`.
    pub procs: [usize; 2],
    /// Position of this rank in the process grid, `[x, y]`.
    pub coords: [usize; 2],
    pub rank: usize,
    pub x: Borders,
    pub y: Borders,
    /// Local halo-inclusive width.
    pub dim_x: usize,
    /// Local halo-inclusive height.
    pub dim_y: usize,
    pub omega: f64,
    pub neighbors: Neighbors,
}

fn check_axis(
    axis: Axis,
    parts: &[Borders],
    length: usize,
    halo: usize,
    periodic: bool,
) -> Result<(), GeometryError>
{
    let shared = parts.len() > 1 || periodic;
    let mut prev_end: isize = 0;
    for (coord, b) in parts.iter().enumerate() {
        let inner = b.inner_len();
        if inner == 0 || (shared && inner <= halo) {
            return Err(GeometryError::PartitionTooSmall { axis, coord, inner, halo });
        }
        if b.inner_start != prev_end {
            return Err(GeometryError::Tiling {
                axis, coord, prev_end, start: b.inner_start });
        }
        prev_end = b.inner_end;
    }
    (prev_end == length as isize).then_some(())
        .ok_or(GeometryError::Tiling {
            axis, coord: parts.len(), prev_end, start: length as isize })
}

impl Lattice {
    /// Build the geometry for the calling rank.
    ///
    /// The halo defaults to the width required by the kernels, which depends
    /// on whether `config.omega` is non-zero.
    pub fn new<C>(config: &LatticeConfig, comm: &C) -> Result<Self, GeometryError>
    where C: Communicator + ?Sized
    {
        let LatticeConfig {
            dim_x: global_dim_x,
            dim_y: global_dim_y,
            delta_x,
            delta_y,
            periods,
            halo,
            omega,
            proc_grid,
        } = config.clone();
        (global_dim_x > 0 && global_dim_y > 0).then_some(())
            .ok_or(GeometryError::EmptyGrid(global_dim_x, global_dim_y))?;
        (delta_x > 0.0 && delta_y > 0.0).then_some(())
            .ok_or(GeometryError::BadSpacing(delta_x, delta_y))?;
        (!periods[0] || global_dim_x % 2 == 0).then_some(())
            .ok_or(GeometryError::OddPeriodic(Axis::X, global_dim_x))?;
        (!periods[1] || global_dim_y % 2 == 0).then_some(())
            .ok_or(GeometryError::OddPeriodic(Axis::Y, global_dim_y))?;

        let size = comm.size();
        let procs = proc_grid.unwrap_or_else(|| dims_create(size));
        (procs[0] * procs[1] == size).then_some(())
            .ok_or(GeometryError::ProcGrid(procs[0], procs[1], size))?;
        let halo = halo.unwrap_or_else(|| kernel::required_halo(omega != 0.0));

        let parts_x = axis_partition(procs[0], global_dim_x, halo, periods[0]);
        let parts_y = axis_partition(procs[1], global_dim_y, halo, periods[1]);
        check_axis(Axis::X, &parts_x, global_dim_x, halo, periods[0])?;
        check_axis(Axis::Y, &parts_y, global_dim_y, halo, periods[1])?;

        let rank = comm.rank();
        let coords = [rank % procs[0], rank / procs[0]];
        let x = parts_x[coords[0]];
        let y = parts_y[coords[1]];
        let at = |cx: usize, cy: usize| cy * procs[0] + cx;
        let step = |c: usize, n: usize, periodic: bool, fwd: bool| -> Option<usize> {
            match (fwd, c) {
                (false, 0) => periodic.then(|| n - 1),
                (false, c) => Some(c - 1),
                (true, c) if c + 1 == n => periodic.then_some(0),
                (true, c) => Some(c + 1),
            }
        };
        let neighbors = Neighbors {
            left: step(coords[0], procs[0], periods[0], false)
                .map(|cx| at(cx, coords[1])),
            right: step(coords[0], procs[0], periods[0], true)
                .map(|cx| at(cx, coords[1])),
            down: step(coords[1], procs[1], periods[1], false)
                .map(|cy| at(coords[0], cy)),
            up: step(coords[1], procs[1], periods[1], true)
                .map(|cy| at(coords[0], cy)),
        };
        debug!(
            "rank {} at {:?} of {:?}: x {:?}, y {:?}, halo {}",
            rank, coords, procs, x, y, halo,
        );
        Ok(Self {
            global_dim_x,
            global_dim_y,
            delta_x,
            delta_y,
            periods,
            halo_x: halo,
            halo_y: halo,
            procs,
            coords,
            rank,
            x,
            y,
            dim_x: x.len(),
            dim_y: y.len(),
            omega,
            neighbors,
        })
    }

    /// Halo width along an axis.
    pub fn halo(&self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.halo_x,
            Axis::Y => self.halo_y,
        }
    }

    /// Global column of local column `c`.
    pub fn global_x(&self, c: usize) -> usize {
        (self.x.start + c as isize).rem_euclid(self.global_dim_x as isize) as usize
    }

    /// Global row of local row `r`.
    pub fn global_y(&self, r: usize) -> usize {
        (self.y.start + r as isize).rem_euclid(self.global_dim_y as isize) as usize
    }

    /// Physical coordinates of global point `(m, n)` (column, row) measured
    /// from the centre of the grid.
    pub fn centered(&self, m: usize, n: usize) -> (f64, f64) {
        (
            (m as f64 - (self.global_dim_x / 2) as f64) * self.delta_x,
            (n as f64 - (self.global_dim_y / 2) as f64) * self.delta_y,
        )
    }

    /// Local rectangle owned by this rank.
    pub fn inner(&self) -> Rect {
        Rect {
            x: self.x.local_inner_start(),
            y: self.y.local_inner_start(),
            width: self.x.inner_len(),
            height: self.y.inner_len(),
        }
    }

    /// Local rectangle of the whole halo-inclusive array.
    pub fn full(&self) -> Rect {
        Rect { x: 0, y: 0, width: self.dim_x, height: self.dim_y }
    }

    /// Collect the inner regions of a local field from every rank into a
    /// global `(global_dim_y, global_dim_x)` array on rank 0.
    ///
    /// Returns `None` on every other rank.
    pub fn gather<C, S>(&self, comm: &C, field: &Arr2<S>)
        -> Result<Option<nd::Array2<f64>>, CommError>
    where
        C: Communicator + ?Sized,
        S: nd::Data<Elem = f64>,
    {
        let inner = self.inner();
        let block
            = field.slice(nd::s![
                inner.y..inner.y + inner.height,
                inner.x..inner.x + inner.width,
            ]);
        if comm.rank() != 0 {
            let mut msg: Vec<f64> = vec![
                self.x.inner_start as f64,
                self.y.inner_start as f64,
                inner.width as f64,
                inner.height as f64,
            ];
            msg.extend(block.iter().copied());
            comm.send(0, TAG_GATHER, msg)?;
            return Ok(None);
        }
        let mut global: nd::Array2<f64>
            = nd::Array2::zeros((self.global_dim_y, self.global_dim_x));
        let (x0, y0) = (self.x.inner_start as usize, self.y.inner_start as usize);
        global.slice_mut(nd::s![y0..y0 + inner.height, x0..x0 + inner.width])
            .assign(&block);
        for source in 1..comm.size() {
            let msg = comm.recv(source, TAG_GATHER)?;
            let [x0, y0, w, h]: [usize; 4] = match msg.get(..4) {
                Some(head) => [
                    head[0] as usize, head[1] as usize,
                    head[2] as usize, head[3] as usize,
                ],
                None => return Err(CommError::SizeMismatch {
                    source_rank: source, expected: 4, got: msg.len() }),
            };
            if msg.len() != 4 + w * h {
                return Err(CommError::SizeMismatch {
                    source_rank: source, expected: 4 + w * h, got: msg.len() });
            }
            global.slice_mut(nd::s![y0..y0 + h, x0..x0 + w])
                .iter_mut()
                .zip(&msg[4..])
                .for_each(|(g, v)| { *g = *v; });
        }
        Ok(Some(global))
    }
}
