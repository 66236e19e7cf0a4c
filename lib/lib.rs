//! Provides a domain-decomposed solver for the two-dimensional, time-dependent
//! Schrödinger equation via the Trotter-Suzuki (split-step pair rotation)
//! scheme, for single particles and for the mean-field Gross-Pitaevskii
//! equation, optionally in a rotating frame.
//!
//! The global grid is cut into rectangular partitions, one per rank; every
//! partition is extended by halos that are refreshed from the neighbouring
//! ranks after each step. Ranks talk through a [`Communicator`][comm::Communicator];
//! [`comm::SingleRank`] runs everything in one partition and
//! [`comm::ThreadComm`] runs one partition per thread.
//!
//! Provides:
//! - Evolution in real and imaginary time ([`trotter`]) with selectable kernels
//!   ([`kernel`]): a reference CPU kernel and a rayon-parallel kernel on an
//!   even/odd quadrant layout ([`reshape`])
//! - Distributed expectation values: norm, energy, position and momentum
//!   moments, momentum-space density ([`observables`])
//! - Matrix output and snapshot stamping ([`io`]), and batch statistics over a
//!   stored snapshot series ([`expect`])
//!
//! See [`docs`] for theoretical background.

pub mod error;
pub mod border;
pub mod reshape;
pub mod config;
pub mod comm;
pub mod lattice;
pub mod state;
pub mod hamiltonian;
pub mod kernel;
pub mod trotter;
pub mod observables;
pub mod expect;
pub mod io;
pub mod utils;

pub mod docs;

pub use config::{ EvolutionConfig, LatticeConfig };
pub use error::{ TResult, TrotterError };
pub use hamiltonian::{ Coefficients, ExpPotential, Hamiltonian, KineticCoefficients };
pub use kernel::KernelType;
pub use lattice::Lattice;
pub use state::State;
pub use trotter::{ Solver, trotter };

/// A two-dimensional array with any storage.
pub type Arr2<S> = ndarray::ArrayBase<S, ndarray::Ix2>;
