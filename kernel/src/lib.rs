// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Chip-independent core of the ADC interface stack.
//!
//! This crate holds everything the interface layer shares with chip
//! adaptation layers and with clients: the hardware interface layer (HIL)
//! trait definitions, the standard [`ErrorCode`] enum, the cell types the
//! single-threaded event-driven execution model is built on, and the
//! intrusive list used to register statically-allocated per-client state.
//!
//! Nothing in this crate knows about a particular converter. Chip crates
//! implement [`hil::adc::Adc`] (and [`hil::time::Alarm`] for a time source);
//! the dispatcher in the capsules crate consumes those traits.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod errorcode;

#[macro_use]
pub mod debug;

pub mod collections;
pub mod hil;
pub mod utilities;

pub use crate::errorcode::ErrorCode;
