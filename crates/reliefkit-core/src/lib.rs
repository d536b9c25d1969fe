//! # ReliefKit Core
//!
//! Core buffers, error types and shared aliases for ReliefKit.
//! Every numeric stage of the relief pipeline exchanges [`HeightField`]
//! and [`PlanarMask`] values by move; nothing here holds global state.

pub mod error;
pub mod grid;
pub mod types;

pub use error::{ParameterError, ParameterResult, ReliefError, ReliefResult};
pub use grid::{Grid2D, HeightField, PlanarMask};
pub use types::{cancel_flag, is_cancelled, CancelFlag};
