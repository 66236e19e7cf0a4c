//! Collection of all error types.
//!
//! All errors derive [`thiserror::Error`], making them composable when allowed
//! and compatible with application code using [`anyhow`][anyhow].
//!
//! [anyhow]: https://crates.io/crates/anyhow

use std::path::PathBuf;
use thiserror::Error;
use crate::kernel::Axis;

/// Returned when a [`Lattice`][crate::lattice::Lattice] cannot be built from
/// the requested geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// Returned when a grid dimension is zero.
    #[error("grid dimensions must be non-zero; got {0}x{1}")]
    EmptyGrid(usize, usize),

    /// Returned when a grid spacing is not strictly positive.
    #[error("grid spacings must be greater than 0; got ({0}, {1})")]
    BadSpacing(f64, f64),

    /// Returned when a periodic axis has odd length, which breaks the even/odd
    /// pairing across the wrap.
    #[error("periodic axis {0:?} must have even length; got {1}")]
    OddPeriodic(Axis, usize),

    /// Returned when a single set of kinetic coefficients is applied to a grid
    /// with different spacings along x and y.
    #[error("scalar kinetic coefficients need equal spacings; got ({0}, {1})")]
    Anisotropic(f64, f64),

    /// Returned when an explicit process grid does not match the number of
    /// ranks.
    #[error("process grid {0}x{1} does not match {2} ranks")]
    ProcGrid(usize, usize, usize),

    /// Returned when a rank's inner region is not wider than the halo.
    #[error("rank {coord} on axis {axis:?} owns {inner} points, must own more than the halo width {halo}")]
    PartitionTooSmall { axis: Axis, coord: usize, inner: usize, halo: usize },

    /// Returned when inner regions of neighbouring ranks do not tile an axis.
    #[error("inner regions on axis {axis:?} do not tile at coordinate {coord}: {prev_end} != {start}")]
    Tiling { axis: Axis, coord: usize, prev_end: isize, start: isize },
}

/// Returned when a kernel strategy cannot be selected or set up.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Returned for kernel names that are not recognized.
    #[error("unknown kernel '{0}'")]
    Unknown(String),

    /// Returned when the kernel exists but was not compiled into this build.
    #[error("kernel '{0}' is not available in this build")]
    Unavailable(&'static str),

    /// Returned when the lattice halo is narrower than the kernel sweeps need.
    #[error("kernel '{kernel}' needs a halo of {required} on axis {axis:?}; lattice has {got}")]
    Halo { kernel: &'static str, axis: Axis, required: usize, got: usize },
}

/// Returned by a [`Communicator`][crate::comm::Communicator] when a message
/// cannot be delivered or received.
#[derive(Debug, Error)]
pub enum CommError {
    /// Returned when the peer at the given rank has gone away.
    #[error("rank {0} disconnected")]
    Disconnected(usize),

    /// Returned when a receive waited longer than the communicator allows.
    #[error("timed out waiting for rank {0} (tag {1})")]
    Timeout(usize, u32),

    /// Returned when a message does not have the expected length.
    #[error("message from rank {source_rank} has {got} values; expected {expected}")]
    SizeMismatch { source_rank: usize, expected: usize, got: usize },

    /// Returned when a rank thread panicked.
    #[error("rank {0} panicked")]
    Panicked(usize),
}

/// Returned when an array does not have the shape of the local sub-lattice.
#[derive(Debug, Error)]
#[error("{what} has shape {got:?}; expected {expected:?}")]
pub struct ShapeError {
    pub what: &'static str,
    pub expected: (usize, usize),
    pub got: (usize, usize),
}

impl ShapeError {
    pub(crate) fn check(
        what: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    ) -> Result<(), Self>
    {
        (expected == got).then_some(()).ok_or(Self { what, expected, got })
    }
}

/// Returned when a matrix file cannot be read back.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Underlying I/O failure.
    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    /// Returned for a token that is not a number or a `(re,im)` pair.
    #[error("{path}:{line}: malformed value '{token}'")]
    Parse { path: PathBuf, line: usize, token: String },

    /// Returned when the file holds fewer values than expected.
    #[error("{path}: expected {expected} values, found {got}")]
    Truncated { path: PathBuf, expected: usize, got: usize },
}

/// Returned from the batch snapshot analysis.
#[derive(Debug, Error)]
pub enum ExpectError {
    /// Returned when fewer than two snapshots are available, leaving the
    /// sample variance undefined.
    #[error("at least two snapshots are needed for a sample variance; got {0}")]
    TooFewSnapshots(usize),

    /// [`ReadError`]
    #[error("snapshot error: {0}")]
    Read(#[from] ReadError),

    /// Failure writing the time-series file.
    #[error("cannot write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

/// Returned from evolution and the distributed operations around it.
#[derive(Debug, Error)]
pub enum TrotterError {
    /// [`GeometryError`]
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// [`KernelError`]
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    /// [`CommError`]
    #[error("communication error: {0}")]
    Comm(#[from] CommError),

    /// [`ShapeError`]
    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),

    /// Failure writing an output file.
    #[error("cannot write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

pub type TResult<T> = Result<T, TrotterError>;
