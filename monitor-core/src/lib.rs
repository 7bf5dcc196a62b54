#![no_std]

// Shared logic for the bench monitor applications.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library and exposing the driver seams the other crates bind.

pub mod board;
pub mod charger;
pub mod console;
pub mod monitor;
pub mod sampler;
