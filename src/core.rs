//! Gesture pipeline core
//!
//! Everything here is synchronous and free of I/O. The manager feeds page
//! notifications in and carries out the work the state controller asks for.

pub mod context;
pub mod heuristics;
pub mod policy;
pub mod selection;
pub mod state;
