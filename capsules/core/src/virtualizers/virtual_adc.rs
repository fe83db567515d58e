// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Virtualize one analog-to-digital converter among concurrent clients.
//!
//! [`MuxAdc`] owns the adaptation layer and routes its completion events;
//! each logical client is wired to an [`AdcUser`] device, which implements
//! the chip-independent [`Read`], [`ReadStream`] and [`ReadNow`]
//! interfaces plus [`Resource`] (delegated to the client's arbiter slot,
//! for the `ReadNow` pairing).
//!
//! Arbitrated requests go through the client's [`ArbiterSlot`]; on the
//! grant the device pulls the client's configuration, picks the narrowest
//! native conversion mode that satisfies the request, and starts the
//! hardware. A stream request on a converter with no native streaming
//! mode is emulated with one single conversion per alarm tick, so every
//! platform presents an identical `ReadStream` contract: samples land in
//! the client's buffer in acquisition order with consecutive starts
//! spaced at least `period` ticks apart.
//!
//! On the terminal event the device releases the arbiter first (the next
//! waiting client's conversion may start inside that call) and then
//! signals the typed completion event. Completion events may fire before
//! the call that triggered them returns; `ReadNow` in particular
//! completes synchronously on fast hardware.
//!
//! Aborting a request in flight is not supported: a client must let an
//! outstanding request finish before issuing another, and must not
//! release a grant while its own conversion is running.

use core::cell::Cell;

use kernel::collections::list::{List, ListLink, ListNode};
use kernel::hil::adc::{
    Adc, AdcConfigure, Capabilities, Client, Read, ReadClient, ReadNow, ReadStream,
    ReadStreamClient,
};
use kernel::hil::resource::{Resource, ResourceClient};
use kernel::hil::time::{Alarm, AlarmClient};
use kernel::utilities::cells::{OptionalCell, TakeCell};
use kernel::ErrorCode;

use crate::arbiter::ArbiterSlot;

/// Request progress of one device.
#[derive(Copy, Clone, PartialEq)]
enum State {
    Idle,
    /// Waiting on the arbiter for a single read.
    RequestingSingle,
    /// Waiting on the arbiter for a stream.
    RequestingStream,
    /// Granted, conversion not yet started.
    GrantedSingle,
    GrantedStream,
    /// `read_now()` validated, conversion about to start.
    ReadNowPending,
    SamplingSingle,
    SamplingStream,
    SamplingReadNow,
}

/// Conversion shape chosen for a stream at grant time.
#[derive(Copy, Clone, PartialEq)]
enum Mode {
    Single,
    NativeRepeated,
    NativeSequence,
    NativeRepeatedSequence,
    /// Software emulation: one single conversion per alarm tick.
    TimedSingles,
}

/// ADC mux. Holds the adaptation layer and the alarm that paces
/// software-emulated streams.
pub struct MuxAdc<'a, A: Adc<'a>, T: Alarm<'a>> {
    adc: &'a A,
    alarm: &'a T,
    devices: List<'a, AdcUser<'a, A, T>>,
    inflight: OptionalCell<&'a AdcUser<'a, A, T>>,
}

impl<'a, A: Adc<'a>, T: Alarm<'a>> MuxAdc<'a, A, T> {
    pub const fn new(adc: &'a A, alarm: &'a T) -> MuxAdc<'a, A, T> {
        MuxAdc {
            adc,
            alarm,
            devices: List::new(),
            inflight: OptionalCell::empty(),
        }
    }

    /// Hook the mux up as the adaptation layer's and the alarm's client.
    /// Must be called once, at wiring time.
    pub fn register(&'a self) {
        self.adc.set_client(self);
        self.alarm.set_client(self);
    }

    pub fn capabilities(&self) -> Capabilities {
        self.adc.capabilities()
    }

    pub fn get_resolution_bits(&self) -> usize {
        self.adc.get_resolution_bits()
    }

    pub fn get_voltage_reference_mv(&self) -> Option<usize> {
        self.adc.get_voltage_reference_mv()
    }

    /// Start the conversion of a freshly granted device, if any.
    fn do_next_op(&self) {
        if self.inflight.is_some() {
            return;
        }
        let mnode = self.devices.iter().find(|node| {
            matches!(
                node.state.get(),
                State::GrantedSingle | State::GrantedStream
            )
        });
        mnode.map(|node| match node.state.get() {
            State::GrantedSingle => {
                node.state.set(State::SamplingSingle);
                self.inflight.set(node);
                let config = node.config.configuration();
                if let Err(error) = self.adc.sample(&config) {
                    // the request was already accepted, so the failure is
                    // reported through the completion event
                    self.inflight.clear();
                    node.finish_single(Err(error));
                }
            }
            State::GrantedStream => node.start_stream(),
            _ => {}
        });
    }

    /// Issue the conversion for a validated `read_now()`. Returns the
    /// start status; on success the completion event may fire before this
    /// returns.
    fn start_pending_read_now(&self) -> Result<(), ErrorCode> {
        let mnode = self
            .devices
            .iter()
            .find(|node| node.state.get() == State::ReadNowPending);
        mnode.map_or(Err(ErrorCode::FAIL), |node| {
            node.state.set(State::SamplingReadNow);
            self.inflight.set(node);
            let config = node.config.configuration();
            match self.adc.sample(&config) {
                Ok(()) => Ok(()),
                Err(error) => {
                    // start rejected: no completion event will follow
                    self.inflight.clear();
                    node.state.set(State::Idle);
                    Err(error)
                }
            }
        })
    }
}

impl<'a, A: Adc<'a>, T: Alarm<'a>> Client<A::Word> for MuxAdc<'a, A, T> {
    fn sample_ready(&self, sample: Result<A::Word, ErrorCode>) {
        self.inflight.map(|node| node.handle_sample(sample));
    }

    fn samples_ready(
        &self,
        buffer: &'static mut [A::Word],
        length: usize,
        status: Result<(), ErrorCode>,
    ) {
        self.inflight
            .map(move |node| node.handle_samples(buffer, length, status));
    }
}

impl<'a, A: Adc<'a>, T: Alarm<'a>> AlarmClient for MuxAdc<'a, A, T> {
    fn fired(&self) {
        self.inflight.map(|node| node.handle_alarm());
    }
}

/// Virtual ADC device: one logical client's view of the shared converter.
///
/// Carries the client's pending request, its buffer, and the reference to
/// its configuration provider. The provider is pulled immediately before
/// every hardware command and never retained.
pub struct AdcUser<'a, A: Adc<'a>, T: Alarm<'a>> {
    mux: &'a MuxAdc<'a, A, T>,
    slot: &'a ArbiterSlot<'a>,
    config: &'a dyn AdcConfigure<A::Config>,
    next: ListLink<'a, AdcUser<'a, A, T>>,

    state: Cell<State>,
    mode: Cell<Mode>,
    buffer: TakeCell<'static, [A::Word]>,
    count: Cell<usize>,
    filled: Cell<usize>,
    period: Cell<u32>,
    /// The client itself asked for the grant (`ReadNow` preparation), so
    /// `granted()` is forwarded rather than consumed.
    resource_requested: Cell<bool>,

    read_client: OptionalCell<&'a dyn ReadClient<A::Word>>,
    stream_client: OptionalCell<&'a dyn ReadStreamClient<A::Word>>,
    read_now_client: OptionalCell<&'a dyn ReadClient<A::Word>>,
    resource_client: OptionalCell<&'a dyn ResourceClient>,
}

impl<'a, A: Adc<'a>, T: Alarm<'a>> AdcUser<'a, A, T> {
    pub fn new(
        mux: &'a MuxAdc<'a, A, T>,
        slot: &'a ArbiterSlot<'a>,
        config: &'a dyn AdcConfigure<A::Config>,
    ) -> AdcUser<'a, A, T> {
        AdcUser {
            mux,
            slot,
            config,
            next: ListLink::empty(),
            state: Cell::new(State::Idle),
            mode: Cell::new(Mode::Single),
            buffer: TakeCell::empty(),
            count: Cell::new(0),
            filled: Cell::new(0),
            period: Cell::new(0),
            resource_requested: Cell::new(false),
            read_client: OptionalCell::empty(),
            stream_client: OptionalCell::empty(),
            read_now_client: OptionalCell::empty(),
            resource_client: OptionalCell::empty(),
        }
    }

    /// Link this device into its mux and its arbiter slot. Must be called
    /// once, at wiring time, after `ArbiterSlot::register`.
    pub fn register(&'a self) {
        self.mux.devices.push_head(self);
        self.slot.set_resource_client(self);
    }

    pub fn get_resolution_bits(&self) -> usize {
        self.mux.get_resolution_bits()
    }

    pub fn get_voltage_reference_mv(&self) -> Option<usize> {
        self.mux.get_voltage_reference_mv()
    }

    /// Pick the narrowest native mode satisfying the granted stream
    /// request and start the hardware.
    fn start_stream(&'a self) {
        let capabilities = self.mux.adc.capabilities();
        let count = self.count.get();
        let period = self.period.get();
        let mode = if count <= 1 {
            Mode::Single
        } else if capabilities.repeated_single {
            Mode::NativeRepeated
        } else if period == 0 && capabilities.sequence {
            Mode::NativeSequence
        } else if capabilities.repeated_sequence {
            Mode::NativeRepeatedSequence
        } else {
            Mode::TimedSingles
        };
        self.mode.set(mode);
        self.state.set(State::SamplingStream);
        self.mux.inflight.set(self);

        let config = self.config.configuration();
        let result = match mode {
            Mode::Single | Mode::TimedSingles => self.mux.adc.sample(&config),
            Mode::NativeRepeated => self.mux.adc.sample_repeated(&config, period),
            Mode::NativeSequence => {
                self.buffer.take().map_or(Err(ErrorCode::FAIL), |buffer| {
                    self.mux
                        .adc
                        .sample_sequence(&config, buffer, count)
                        .map_err(|(error, buffer)| {
                            self.buffer.replace(buffer);
                            error
                        })
                })
            }
            Mode::NativeRepeatedSequence => {
                self.buffer.take().map_or(Err(ErrorCode::FAIL), |buffer| {
                    self.mux
                        .adc
                        .sample_repeated_sequence(&config, period, buffer, count)
                        .map_err(|(error, buffer)| {
                            self.buffer.replace(buffer);
                            error
                        })
                })
            }
        };
        if let Err(error) = result {
            self.mux.inflight.clear();
            self.finish_stream(Err(error));
        }
    }

    /// Issue the next software-paced conversion of an emulated stream.
    fn next_emulated_sample(&self) {
        let config = self.config.configuration();
        if let Err(error) = self.mux.adc.sample(&config) {
            self.mux.inflight.clear();
            self.finish_stream(Err(error));
        }
    }

    fn handle_sample(&self, sample: Result<A::Word, ErrorCode>) {
        match self.state.get() {
            State::SamplingSingle => {
                self.mux.inflight.clear();
                self.finish_single(sample);
            }
            State::SamplingReadNow => {
                self.mux.inflight.clear();
                self.state.set(State::Idle);
                self.read_now_client.map(|client| client.read_done(sample));
            }
            State::SamplingStream => match sample {
                Ok(value) => {
                    let filled = self.filled.get();
                    self.buffer.map(|buffer| {
                        if filled < buffer.len() {
                            buffer[filled] = value;
                        }
                    });
                    self.filled.set(filled + 1);
                    if filled + 1 >= self.count.get() {
                        if self.mode.get() == Mode::NativeRepeated {
                            let _ = self.mux.adc.stop();
                        }
                        self.mux.inflight.clear();
                        self.finish_stream(Ok(()));
                    } else if self.mode.get() == Mode::TimedSingles {
                        let period = self.period.get();
                        if period == 0 {
                            self.next_emulated_sample();
                        } else {
                            let now = self.mux.alarm.now();
                            self.mux.alarm.set_alarm(now.wrapping_add(period));
                        }
                    }
                }
                Err(error) => {
                    if self.mode.get() == Mode::NativeRepeated {
                        let _ = self.mux.adc.stop();
                    }
                    self.mux.inflight.clear();
                    self.finish_stream(Err(error));
                }
            },
            _ => {}
        }
    }

    fn handle_samples(
        &self,
        buffer: &'static mut [A::Word],
        length: usize,
        status: Result<(), ErrorCode>,
    ) {
        self.buffer.replace(buffer);
        if self.state.get() == State::SamplingStream {
            self.filled.set(length);
            if self.mode.get() == Mode::NativeRepeatedSequence {
                let _ = self.mux.adc.stop();
            }
            self.mux.inflight.clear();
            self.finish_stream(status);
        }
    }

    fn handle_alarm(&self) {
        if self.state.get() == State::SamplingStream && self.mode.get() == Mode::TimedSingles {
            self.next_emulated_sample();
        }
    }

    fn finish_single(&self, sample: Result<A::Word, ErrorCode>) {
        self.state.set(State::Idle);
        // Release first so the next waiting client's conversion can start;
        // our client is signaled afterwards and may immediately re-request.
        let _ = self.slot.release();
        self.read_client.map(|client| client.read_done(sample));
    }

    fn finish_stream(&self, status: Result<(), ErrorCode>) {
        self.state.set(State::Idle);
        let count = self.filled.get();
        let _ = self.slot.release();
        self.buffer.take().map(|buffer| {
            self.stream_client
                .map(move |client| client.stream_done(buffer, count, status));
        });
    }
}

impl<'a, A: Adc<'a>, T: Alarm<'a>> ListNode<'a, AdcUser<'a, A, T>> for AdcUser<'a, A, T> {
    fn next(&'a self) -> &'a ListLink<'a, AdcUser<'a, A, T>> {
        &self.next
    }
}

impl<'a, A: Adc<'a>, T: Alarm<'a>> ResourceClient for AdcUser<'a, A, T> {
    fn granted(&self) {
        match self.state.get() {
            State::RequestingSingle => {
                self.state.set(State::GrantedSingle);
                self.mux.do_next_op();
            }
            State::RequestingStream => {
                self.state.set(State::GrantedStream);
                self.mux.do_next_op();
            }
            _ => {
                // the client asked for the grant itself
                self.resource_requested.set(false);
                self.resource_client.map(|client| client.granted());
            }
        }
    }
}

impl<'a, A: Adc<'a>, T: Alarm<'a>> Read<'a, A::Word> for AdcUser<'a, A, T> {
    fn read(&self) -> Result<(), ErrorCode> {
        if self.state.get() != State::Idle {
            return Err(ErrorCode::ALREADY);
        }
        if self.resource_requested.get() || self.slot.is_owner() {
            // the client is using the converter through its own grant
            return Err(ErrorCode::BUSY);
        }
        self.state.set(State::RequestingSingle);
        let _ = self.slot.request();
        Ok(())
    }

    fn set_client(&self, client: &'a dyn ReadClient<A::Word>) {
        self.read_client.set(client);
    }
}

impl<'a, A: Adc<'a>, T: Alarm<'a>> ReadStream<'a, A::Word> for AdcUser<'a, A, T> {
    fn read_stream(
        &self,
        buffer: &'static mut [A::Word],
        count: usize,
        period: u32,
    ) -> Result<(), (ErrorCode, &'static mut [A::Word])> {
        if self.state.get() != State::Idle {
            return Err((ErrorCode::ALREADY, buffer));
        }
        if self.resource_requested.get() || self.slot.is_owner() {
            return Err((ErrorCode::BUSY, buffer));
        }
        if count == 0 || count > buffer.len() {
            return Err((ErrorCode::SIZE, buffer));
        }
        self.buffer.replace(buffer);
        self.count.set(count);
        self.filled.set(0);
        self.period.set(period);
        self.state.set(State::RequestingStream);
        let _ = self.slot.request();
        Ok(())
    }

    fn set_stream_client(&self, client: &'a dyn ReadStreamClient<A::Word>) {
        self.stream_client.set(client);
    }
}

impl<'a, A: Adc<'a>, T: Alarm<'a>> ReadNow<'a, A::Word> for AdcUser<'a, A, T> {
    fn read_now(&self) -> Result<(), ErrorCode> {
        if self.state.get() != State::Idle {
            return Err(ErrorCode::ALREADY);
        }
        if !self.slot.is_owner() {
            return Err(ErrorCode::BUSY);
        }
        if self.mux.inflight.is_some() {
            return Err(ErrorCode::BUSY);
        }
        self.state.set(State::ReadNowPending);
        self.mux.start_pending_read_now()
    }

    fn set_read_now_client(&self, client: &'a dyn ReadClient<A::Word>) {
        self.read_now_client.set(client);
    }
}

impl<'a, A: Adc<'a>, T: Alarm<'a>> Resource<'a> for AdcUser<'a, A, T> {
    fn request(&self) -> Result<(), ErrorCode> {
        if self.state.get() != State::Idle {
            return Err(ErrorCode::BUSY);
        }
        if self.resource_requested.get() || self.slot.is_owner() {
            return Err(ErrorCode::ALREADY);
        }
        self.resource_requested.set(true);
        let result = self.slot.request();
        if result.is_err() {
            self.resource_requested.set(false);
        }
        result
    }

    fn immediate_request(&'a self) -> Result<(), ErrorCode> {
        if self.state.get() != State::Idle {
            return Err(ErrorCode::BUSY);
        }
        self.slot.immediate_request()
    }

    fn release(&self) -> Result<(), ErrorCode> {
        if self.state.get() != State::Idle {
            // an operation started under this grant is still in flight
            return Err(ErrorCode::BUSY);
        }
        self.slot.release()
    }

    fn is_owner(&self) -> bool {
        self.slot.is_owner()
    }

    fn set_resource_client(&self, client: &'a dyn ResourceClient) {
        self.resource_client.set(client);
    }
}
