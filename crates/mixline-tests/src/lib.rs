//! Integration test crate for Mixline.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives the engine crates together the way a host would.

#[cfg(test)]
mod editing;

#[cfg(test)]
mod selection;

#[cfg(test)]
mod rendering;

#[cfg(test)]
mod navigation;
