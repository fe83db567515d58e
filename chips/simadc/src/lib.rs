// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Software-simulated adaptation layer.
//!
//! Implements the `kernel` ADC and alarm HILs entirely in software, with
//! conversion completion and alarm expiry triggered explicitly the way a
//! chip crate's interrupt handlers would be. Serves two purposes: it lets
//! the chip-independent layer be exercised end-to-end on a host, and it is
//! the reference for what an adaptation layer for real hardware has to
//! provide.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod adc;
pub mod alarm;
