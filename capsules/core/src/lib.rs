// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Chip-independent interface layer for shared ADC units.
//!
//! The capsules in this crate sit between clients and a chip adaptation
//! layer: the [`arbiter`] serializes ownership of the one physical
//! converter across logical clients, and the [`virtualizers`] dispatch
//! typed read requests onto whatever conversion modes the hardware
//! natively offers, emulating the rest in software.

#![forbid(unsafe_code)]
#![no_std]

#[cfg(test)]
extern crate std;

pub mod arbiter;
pub mod virtualizers;
