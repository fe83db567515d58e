// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Interfaces for analog-to-digital converters.
//!
//! Two layers are defined here. [`Adc`] is the adaptation boundary: a
//! chip-specific driver exposes whatever native conversion shapes the
//! hardware has, advertised through [`Capabilities`], and the dispatcher
//! emulates the rest. [`Read`], [`ReadStream`] and [`ReadNow`] are the
//! chip-independent client interfaces; every platform presents the same
//! contract for them regardless of what the converter underneath can do.
//!
//! Configuration flows through [`AdcConfigure`], a pull: each client owns
//! its configuration and the dispatcher retrieves it immediately before
//! every hardware command, so nothing in the shared layer stores per-client
//! settings.
//!
//! All completion events in this module are split-phase and may be
//! delivered from interrupt context. A completion callback may run before
//! the call that triggered it has returned; callers must not assume an
//! ordering between the two.

use crate::ErrorCode;

/// Native conversion shapes a converter can run without software help.
///
/// Single-shot conversion is the baseline every chip provides and is not
/// listed. A flag set to `false` makes the corresponding [`Adc`] method
/// return `Err(ErrorCode::NOSUPPORT)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Hardware-timed repeated single conversions with a per-sample event.
    pub repeated_single: bool,
    /// One hardware-paced burst of conversions into a buffer.
    pub sequence: bool,
    /// Hardware-timed repeated conversions accumulated into a buffer with
    /// one event per filled buffer.
    pub repeated_sequence: bool,
}

impl Capabilities {
    /// A converter that can only take one sample at a time.
    pub const fn single_only() -> Capabilities {
        Capabilities {
            repeated_single: false,
            sequence: false,
            repeated_sequence: false,
        }
    }
}

/// Chip adaptation layer for one physical ADC unit.
///
/// Implementations are stateless between conversions apart from the
/// operation currently in flight, and accept a fresh configuration with
/// every start. The configuration is borrowed only for the duration of the
/// call; implementations must copy whatever they need out of it before
/// returning.
///
/// At most one conversion (of any shape) may be in flight; starting a
/// second one fails with `Err(ErrorCode::BUSY)`. A start that returns
/// `Err` produces no completion event.
pub trait Adc<'a> {
    /// Chip-specific conversion settings: channel selection, reference
    /// voltage, sample-hold timing, and whatever else the hardware wants.
    type Config;

    /// Type of a single conversion result. Upper-bounds the hardware
    /// resolution; the actual conversion may use fewer bits.
    type Word: Copy + 'static;

    /// Which native conversion shapes the hardware offers.
    fn capabilities(&self) -> Capabilities;

    /// Start a single conversion. Completion is signaled through
    /// [`Client::sample_ready`].
    fn sample(&self, config: &Self::Config) -> Result<(), ErrorCode>;

    /// Start hardware-timed repeated single conversions, one every
    /// `period` ticks, each signaled through [`Client::sample_ready`].
    /// Runs until [`Adc::stop`].
    fn sample_repeated(&self, config: &Self::Config, period: u32) -> Result<(), ErrorCode>;

    /// Start one burst of `count` conversions into `buffer` at the
    /// converter's own pace. The buffer is returned through
    /// [`Client::samples_ready`], or in the error tuple if the start is
    /// rejected.
    fn sample_sequence(
        &self,
        config: &Self::Config,
        buffer: &'static mut [Self::Word],
        count: usize,
    ) -> Result<(), (ErrorCode, &'static mut [Self::Word])>;

    /// Start hardware-timed conversions, one every `period` ticks,
    /// accumulated into `buffer`; [`Client::samples_ready`] fires once
    /// `count` samples have been collected. Runs until [`Adc::stop`].
    fn sample_repeated_sequence(
        &self,
        config: &Self::Config,
        period: u32,
        buffer: &'static mut [Self::Word],
        count: usize,
    ) -> Result<(), (ErrorCode, &'static mut [Self::Word])>;

    /// Stop a repeated conversion mode.
    fn stop(&self) -> Result<(), ErrorCode>;

    /// Number of significant bits in a conversion result.
    fn get_resolution_bits(&self) -> usize;

    /// Reference voltage in millivolts, if known.
    fn get_voltage_reference_mv(&self) -> Option<usize>;

    fn set_client(&self, client: &'a dyn Client<Self::Word>);
}

/// Completion events from an [`Adc`] implementation.
///
/// Invoked from interrupt context. Errors detected after a conversion was
/// accepted arrive here, in the status of the event.
pub trait Client<W> {
    /// One conversion finished ([`Adc::sample`], [`Adc::sample_repeated`]).
    fn sample_ready(&self, sample: Result<W, ErrorCode>);

    /// A buffered conversion finished or aborted
    /// ([`Adc::sample_sequence`], [`Adc::sample_repeated_sequence`]).
    /// `length` is the number of valid samples in `buffer`.
    fn samples_ready(
        &self,
        buffer: &'static mut [W],
        length: usize,
        status: Result<(), ErrorCode>,
    );
}

/// Per-client configuration provider.
///
/// The dispatcher pulls the configuration immediately before each sampling
/// attempt and consumes it within the pulling call. Implementations must
/// be callable from interrupt context (no blocking, no allocation), must
/// be side-effect free from the dispatcher's perspective, and must return
/// a semantically identical value on every call while the client's own
/// state is unchanged.
pub trait AdcConfigure<C> {
    fn configuration(&self) -> C;
}

/// Arbitrated single read.
pub trait Read<'a, W> {
    /// Request one conversion with this client's configuration. The
    /// request is queued for the shared converter; `Ok` means exactly one
    /// [`ReadClient::read_done`] will follow.
    ///
    /// A second call while one request is outstanding fails with
    /// `Err(ErrorCode::ALREADY)`.
    fn read(&self) -> Result<(), ErrorCode>;

    fn set_client(&self, client: &'a dyn ReadClient<W>);
}

/// Completion event for [`Read`] and [`ReadNow`].
pub trait ReadClient<W> {
    fn read_done(&self, sample: Result<W, ErrorCode>);
}

/// Arbitrated multi-sample read into a caller-supplied buffer.
pub trait ReadStream<'a, W> {
    /// Request `count` conversions spaced `period` ticks apart, delivered
    /// into `buffer` in acquisition order with one terminal
    /// [`ReadStreamClient::stream_done`]. A `period` of zero samples as
    /// fast as the converter allows.
    ///
    /// The observed spacing between consecutive sample starts is at least
    /// `period` ticks; it can be more on hardware where the dispatcher
    /// paces conversions in software.
    fn read_stream(
        &self,
        buffer: &'static mut [W],
        count: usize,
        period: u32,
    ) -> Result<(), (ErrorCode, &'static mut [W])>;

    fn set_stream_client(&self, client: &'a dyn ReadStreamClient<W>);
}

/// Completion event for [`ReadStream`].
pub trait ReadStreamClient<W> {
    /// `count` is the number of valid samples delivered to `buffer`; on an
    /// error status it may be less than requested.
    fn stream_done(&self, buffer: &'static mut [W], count: usize, status: Result<(), ErrorCode>);
}

/// Low-latency single read for a client that already holds the converter.
///
/// The caller must have acquired the paired
/// [`Resource`](crate::hil::resource::Resource) grant before calling
/// [`ReadNow::read_now`]; no arbitration happens on this path and the
/// grant is not released by the dispatcher.
pub trait ReadNow<'a, W> {
    /// Start one conversion immediately. `Ok` means sampling started and
    /// exactly one [`ReadClient::read_done`] will follow, possibly before
    /// this call returns on hardware that completes synchronously. `Err`
    /// means sampling was not started and no event will follow:
    /// `BUSY` if the caller does not hold the grant, otherwise the start
    /// failure reported by the hardware.
    fn read_now(&self) -> Result<(), ErrorCode>;

    fn set_read_now_client(&self, client: &'a dyn ReadClient<W>);
}
