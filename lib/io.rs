//! Plain-text matrix files.
//!
//! Matrices are written one row per line with a space after every value;
//! complex values are written as `(re,im)`. Stamps gather the inner regions of
//! all ranks and are written by rank 0 only.

use std::{
    fs,
    io::{ self, BufWriter, Write },
    path::{ Path, PathBuf },
};
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    comm::Communicator,
    error::{ ReadError, TResult, TrotterError },
    lattice::Lattice,
    observables::Moments,
    state::State,
    Arr2,
};

/// Write a real matrix.
pub fn write_matrix<P, S>(path: P, matrix: &Arr2<S>)
    -> io::Result<()>
where
    P: AsRef<Path>,
    S: nd::Data<Elem = f64>,
{
    let mut out = BufWriter::new(fs::File::create(path)?);
    for row in matrix.outer_iter() {
        for v in row.iter() {
            write!(out, "{} ", v)?;
        }
        writeln!(out)?;
    }
    out.flush()
}

/// Write a complex matrix as `(re,im)` tokens.
pub fn write_complex_matrix<P, S>(path: P, matrix: &Arr2<S>)
    -> io::Result<()>
where
    P: AsRef<Path>,
    S: nd::Data<Elem = C64>,
{
    let mut out = BufWriter::new(fs::File::create(path)?);
    for row in matrix.outer_iter() {
        for v in row.iter() {
            write!(out, "({},{}) ", v.re, v.im)?;
        }
        writeln!(out)?;
    }
    out.flush()
}

// accepts "(re,im)", "(re)" and bare numbers
fn parse_complex(token: &str) -> Option<C64> {
    let inner
        = token.strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(token);
    match inner.split_once(',') {
        Some((re, im)) => {
            Some(C64::new(re.trim().parse().ok()?, im.trim().parse().ok()?))
        },
        None => Some(C64::new(inner.trim().parse().ok()?, 0.0)),
    }
}

/// Read the first `height` rows of `width` complex values from a file.
///
/// Values are taken in order regardless of line breaks; anything after the
/// first `width * height` values is ignored.
pub fn read_complex_matrix<P>(path: P, width: usize, height: usize)
    -> Result<nd::Array2<C64>, ReadError>
where P: AsRef<Path>
{
    let path = path.as_ref();
    let text
        = fs::read_to_string(path)
        .map_err(|source| ReadError::Io { path: path.to_path_buf(), source })?;
    let expected = width * height;
    let mut values: Vec<C64> = Vec::with_capacity(expected);
    'lines: for (k, line) in text.lines().enumerate() {
        for token in line.split_whitespace() {
            if values.len() == expected { break 'lines; }
            let v = parse_complex(token)
                .ok_or_else(|| ReadError::Parse {
                    path: path.to_path_buf(),
                    line: k + 1,
                    token: token.to_string(),
                })?;
            values.push(v);
        }
    }
    if values.len() < expected {
        return Err(ReadError::Truncated {
            path: path.to_path_buf(), expected, got: values.len() });
    }
    nd::Array2::from_shape_vec((height, width), values)
        .map_err(|_| ReadError::Truncated {
            path: path.to_path_buf(), expected, got: expected })
}

/// Path of the stamp of `iteration` with a given suffix.
pub fn stamp_path<P>(dirname: P, iteration: usize, suffix: &str) -> PathBuf
where P: AsRef<Path>
{
    dirname.as_ref().join(format!("{}-iter-{}.dat", iteration, suffix))
}

/// Gather a real local field and write its global matrix as
/// `<iteration>-iter-<suffix>.dat` under `dirname`.
///
/// `field` must cover the full local array; only its inner region is used.
pub fn stamp_real<C, P>(
    lattice: &Lattice,
    comm: &C,
    field: &nd::Array2<f64>,
    iteration: usize,
    dirname: P,
    suffix: &str,
) -> TResult<()>
where
    C: Communicator + ?Sized,
    P: AsRef<Path>,
{
    if let Some(global) = lattice.gather(comm, field)? {
        let path = stamp_path(dirname, iteration, suffix);
        write_matrix(&path, &global)
            .map_err(|source| TrotterError::Write { path, source })?;
    }
    Ok(())
}

/// Gather the wavefunction and write it as `<iteration>-iter-comp.dat` under
/// `dirname`.
pub fn stamp<C, P>(
    lattice: &Lattice,
    comm: &C,
    state: &State,
    iteration: usize,
    dirname: P,
) -> TResult<()>
where
    C: Communicator + ?Sized,
    P: AsRef<Path>,
{
    if let Some(global) = state.gather(lattice, comm)? {
        let path = stamp_path(dirname, iteration, "comp");
        write_complex_matrix(&path, &global)
            .map_err(|source| TrotterError::Write { path, source })?;
    }
    Ok(())
}

/// Tab-separated log of observables over a run.
pub struct ObservableLog {
    path: PathBuf,
    out: BufWriter<fs::File>,
}

impl ObservableLog {
    pub const HEADER: &'static str
        = "iterations\tsquared norm\ttotal_energy\tkinetic_energy\t<X>\t<(X-<X>)^2>\t<Y>\t<(Y-<Y>)^2>\t<Px>\t<(Px-<Px>)^2>\t<Py>\t<(Py-<Py>)^2>";

    /// Create the file and write the header.
    pub fn create<P>(path: P) -> TResult<Self>
    where P: AsRef<Path>
    {
        let path = path.as_ref().to_path_buf();
        let file
            = fs::File::create(&path)
            .map_err(|source| TrotterError::Write { path: path.clone(), source })?;
        let mut new = Self { path, out: BufWriter::new(file) };
        new.line(format_args!("{}", Self::HEADER))?;
        Ok(new)
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) -> TResult<()> {
        writeln!(self.out, "{}", args)
            .and_then(|_| self.out.flush())
            .map_err(|source| TrotterError::Write { path: self.path.clone(), source })
    }

    /// Append one row.
    pub fn record(
        &mut self,
        iteration: usize,
        norm_squared: f64,
        total_energy: f64,
        kinetic_energy: f64,
        position: &Moments,
        momentum: &Moments,
    ) -> TResult<()>
    {
        self.line(format_args!(
            "{}\t\t{}\t\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            iteration, norm_squared, total_energy, kinetic_energy,
            position.x, position.var_x, position.y, position.var_y,
            momentum.x, momentum.var_x, momentum.y, momentum.var_y,
        ))
    }
}
