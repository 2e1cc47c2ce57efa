//! Combat bookkeeping shared by the simulation and its observers.

pub mod log;
