#![cfg_attr(not(test), no_std)]

//! Board-independent core of the clock/weather display: time model, display
//! layout, the cooperative scheduler and the network sync sequence.

pub mod clock;
pub mod config;
pub mod display;
pub mod input;
pub mod net;
pub mod scheduler;
pub mod sync;
pub mod weather;

#[cfg(test)]
mod testing;
