//! Theoretical background.
//!
//! # Contents
//! - [Background](#background)
//! - [Pair decomposition](#pair-decomposition)
//! - [Rotating frame](#rotating-frame)
//! - [Imaginary time](#imaginary-time)
//! - [Domain decomposition](#domain-decomposition)
//!
//! # Background
//! We solve the time-dependent Schrödinger equation on a 2D grid in units where
//! *ħ* = 1,
//! ```text
//!   ∂ψ
//! i -- = H ψ,    H = -∇²/2m + V(x, y) + g |ψ|² - Ω L_z
//!   ∂t
//! ```
//! where *g* is the mean-field coupling of the Gross-Pitaevskii equation (zero
//! for a single particle) and Ω the angular velocity of a rotating frame. The
//! formal solution over a time step *δt* is ψ(*t* + *δt*) = exp(-*i* *H* *δt*)
//! ψ(*t*), which is approximated by the second-order Trotter-Suzuki splitting
//! ```text
//! exp(-i H δt) ≈ exp(-i K δt/2) exp(-i R δt/2) exp(-i P δt) exp(-i R δt/2) exp(-i K δt/2)
//! ```
//! with *K* the kinetic, *R* the rotating-frame and *P* the potential (plus
//! nonlinear) parts of *H*. The error per step is *O*(*δt*³). The potential
//! part is diagonal in position space and is applied as a pointwise phase.
//!
//! # Pair decomposition
//! With the second derivative discretized over nearest neighbours, the kinetic
//! operator along one axis couples only adjacent points. Splitting the
//! neighbour bonds into those starting on even indices, (0, 1), (2, 3), ..., and
//! those starting on odd indices, (1, 2), (3, 4), ..., gives two families of
//! non-overlapping 2x2 blocks
//! ```text
//!          1   ( 0  1 )
//! K_pair = ---- (      )
//!          2m δ² ( 1  0 )
//! ```
//! (up to a constant diagonal, which only contributes a global phase) whose
//! exponentials are exact:
//! ```text
//! ψa' = cos θ ψa + i sin θ ψb
//! ψb' = cos θ ψb + i sin θ ψa
//! ```
//! with *θ* = (*δt*/2) / (2 *m* *δx* *δy*). Each family is applied in a single
//! sweep over independent pairs; a full step applies, per axis, the even and
//! odd families before the potential and again in reverse order after it. The
//! pair updates are unitary, so the norm is conserved to rounding error.
//!
//! Pairs whose partner lies outside the grid are left untouched, which
//! makes non-periodic edges reflecting.
//!
//! # Rotating frame
//! The term -Ω *L_z* = *i* Ω (*x* ∂*y* - *y* ∂*x*) is first order in the
//! derivatives. With central differences it splits into the same pair
//! families, now with antisymmetric blocks, so that every pair undergoes a
//! real rotation
//! ```text
//! ψa' =  cos φ ψa + sin φ ψb
//! ψb' = -sin φ ψa + cos φ ψb
//! ```
//! by an angle that depends on position: *φ* = Ω *x* *τ* / (2 *δy*) for pairs
//! along y in column *x*, and *φ* = -Ω *y* *τ* / (2 *δx*) for pairs along x in
//! row *y*, with *τ* = *δt*/2 and coordinates measured from the rotation
//! centre.
//!
//! # Imaginary time
//! Taking *t* → -*i* *t* turns every phase into a damping factor: the kinetic
//! blocks become cosh/sinh mixings, the potential factor becomes exp(-*V*
//! *δt*). Components along excited states decay faster than the ground state,
//! so after renormalizing the state at every step it relaxes towards the
//! lowest-energy state compatible with its symmetry.
//!
//! # Domain decomposition
//! Each rank owns a rectangular block of the grid and stores it with halos of
//! width *h* on every side that has a neighbour. One pair sweep along an axis
//! corrupts at most one more cell inward from the edge of the local array
//! (its pair partner is missing), so after *n* sweeps along that axis the
//! outermost *n* cells are stale. Choosing *h* ≥ *n* keeps the owned block
//! exact, and the halo is then refreshed from the neighbours before the next
//! step. With the schedule above *n* = 4, or 8 in a rotating frame.
//!
//! Halos are exchanged first along x over the full local height and then along
//! y over the full local width, so corner cells are filled from the diagonal
//! neighbour in two hops.
