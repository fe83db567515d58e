// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Simulated analog-to-digital converter.
//!
//! One conversion of any shape may be in flight at a time, mirroring real
//! converter hardware. Which native modes the simulated chip claims is
//! chosen at construction, so the same driver can stand in for anything
//! from a bare single-shot converter to one with hardware-timed buffered
//! sampling.
//!
//! Nothing completes on its own: a test (or a simulation harness) calls
//! `complete_sample()` / `complete_sequence()` where a real chip would
//! take the conversion-complete interrupt. With `set_synchronous(true)`
//! single conversions complete within the `sample()` call itself, which
//! models converters fast enough to finish before the start call returns.

use core::cell::Cell;
use kernel::hil::adc::{Adc, Capabilities, Client};
use kernel::utilities::cells::{OptionalCell, TakeCell};
use kernel::ErrorCode;

pub const NUM_CHANNELS: u8 = 8;
pub const RESOLUTION_BITS: usize = 12;
pub const VOLTAGE_REFERENCE_MV: usize = 3300;

/// Reference voltage selection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reference {
    Internal,
    Vdd,
}

/// Conversion settings of the simulated converter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SimAdcConfig {
    pub channel: u8,
    pub reference: Reference,
    /// Sample-and-hold time in converter clock cycles.
    pub hold_cycles: u8,
}

impl SimAdcConfig {
    pub const fn channel(channel: u8) -> SimAdcConfig {
        SimAdcConfig {
            channel,
            reference: Reference::Vdd,
            hold_cycles: 4,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Op {
    Single,
    Repeated,
    Sequence,
    RepeatedSequence,
}

pub struct SimAdc<'a> {
    capabilities: Capabilities,
    client: OptionalCell<&'a dyn Client<u16>>,

    // conversion in flight
    active: Cell<bool>,
    op: OptionalCell<Op>,
    config: OptionalCell<SimAdcConfig>,
    period: Cell<u32>,
    buffer: TakeCell<'static, [u16]>,
    count: Cell<usize>,

    // sample generation and test knobs
    next_value: Cell<u16>,
    synchronous: Cell<bool>,
    start_error: OptionalCell<ErrorCode>,
    starts: Cell<usize>,
    stops: Cell<usize>,
}

impl<'a> SimAdc<'a> {
    pub fn new(capabilities: Capabilities) -> SimAdc<'a> {
        SimAdc {
            capabilities,
            client: OptionalCell::empty(),
            active: Cell::new(false),
            op: OptionalCell::empty(),
            config: OptionalCell::empty(),
            period: Cell::new(0),
            buffer: TakeCell::empty(),
            count: Cell::new(0),
            next_value: Cell::new(0),
            synchronous: Cell::new(false),
            start_error: OptionalCell::empty(),
            starts: Cell::new(0),
            stops: Cell::new(0),
        }
    }

    /// Complete single conversions inside the `sample()` call itself.
    pub fn set_synchronous(&self, on: bool) {
        self.synchronous.set(on);
    }

    /// Value the next completed conversion will produce; subsequent
    /// conversions count up from it, wrapping at the 12-bit range.
    pub fn set_next_value(&self, value: u16) {
        self.next_value.set(value & 0x0fff);
    }

    /// Reject the next start attempt with `error` instead of converting.
    pub fn fail_next_start(&self, error: ErrorCode) {
        self.start_error.set(error);
    }

    /// Settings the conversion in flight (or the last one) was started
    /// with.
    pub fn last_config(&self) -> Option<SimAdcConfig> {
        self.config.extract()
    }

    /// Period of the last hardware-timed start, in ticks.
    pub fn last_period(&self) -> u32 {
        self.period.get()
    }

    /// Number of accepted conversion starts.
    pub fn starts(&self) -> usize {
        self.starts.get()
    }

    /// Number of `stop()` calls that stopped a running mode.
    pub fn stops(&self) -> usize {
        self.stops.get()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    fn begin(&self, config: &SimAdcConfig, op: Op) -> Result<(), ErrorCode> {
        if let Some(error) = self.start_error.take() {
            return Err(error);
        }
        if self.active.get() {
            return Err(ErrorCode::BUSY);
        }
        if config.channel >= NUM_CHANNELS {
            return Err(ErrorCode::INVAL);
        }
        self.config.set(*config);
        self.op.set(op);
        self.active.set(true);
        self.starts.set(self.starts.get() + 1);
        Ok(())
    }

    fn produce(&self) -> u16 {
        let value = self.next_value.get();
        self.next_value.set(value.wrapping_add(1) & 0x0fff);
        value
    }

    /// Deliver the single conversion in flight, as the conversion-complete
    /// interrupt handler would.
    pub fn complete_sample(&self) {
        match self.op.extract() {
            Some(Op::Single) => {
                self.active.set(false);
                self.op.clear();
            }
            Some(Op::Repeated) => {
                // hardware keeps converting until stop()
            }
            _ => return,
        }
        let value = self.produce();
        self.client.map(|client| client.sample_ready(Ok(value)));
    }

    /// Abort the conversion in flight with a converter fault.
    pub fn fail_sample(&self, error: ErrorCode) {
        if !self.active.get() {
            return;
        }
        self.active.set(false);
        self.op.clear();
        self.client.map(|client| client.sample_ready(Err(error)));
    }

    /// Deliver the buffered conversion in flight: fill the buffer and
    /// raise the sequence-complete event.
    pub fn complete_sequence(&self) {
        let repeated = match self.op.extract() {
            Some(Op::Sequence) => false,
            Some(Op::RepeatedSequence) => true,
            _ => return,
        };
        if !repeated {
            self.active.set(false);
            self.op.clear();
        }
        let count = self.count.get();
        self.buffer.take().map(|buffer| {
            for slot in buffer.iter_mut().take(count) {
                *slot = self.produce();
            }
            self.client
                .map(move |client| client.samples_ready(buffer, count, Ok(())));
        });
    }

    /// Abort the buffered conversion in flight with a converter fault.
    pub fn fail_sequence(&self, error: ErrorCode) {
        if !self.active.get() {
            return;
        }
        self.active.set(false);
        self.op.clear();
        self.buffer.take().map(|buffer| {
            self.client
                .map(move |client| client.samples_ready(buffer, 0, Err(error)));
        });
    }
}

impl<'a> Adc<'a> for SimAdc<'a> {
    type Config = SimAdcConfig;
    type Word = u16;

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn sample(&self, config: &SimAdcConfig) -> Result<(), ErrorCode> {
        self.begin(config, Op::Single)?;
        if self.synchronous.get() {
            self.complete_sample();
        }
        Ok(())
    }

    fn sample_repeated(&self, config: &SimAdcConfig, period: u32) -> Result<(), ErrorCode> {
        if !self.capabilities.repeated_single {
            return Err(ErrorCode::NOSUPPORT);
        }
        self.begin(config, Op::Repeated)?;
        self.period.set(period);
        Ok(())
    }

    fn sample_sequence(
        &self,
        config: &SimAdcConfig,
        buffer: &'static mut [u16],
        count: usize,
    ) -> Result<(), (ErrorCode, &'static mut [u16])> {
        if !self.capabilities.sequence {
            return Err((ErrorCode::NOSUPPORT, buffer));
        }
        if count > buffer.len() {
            return Err((ErrorCode::SIZE, buffer));
        }
        if let Err(error) = self.begin(config, Op::Sequence) {
            return Err((error, buffer));
        }
        self.buffer.replace(buffer);
        self.count.set(count);
        Ok(())
    }

    fn sample_repeated_sequence(
        &self,
        config: &SimAdcConfig,
        period: u32,
        buffer: &'static mut [u16],
        count: usize,
    ) -> Result<(), (ErrorCode, &'static mut [u16])> {
        if !self.capabilities.repeated_sequence {
            return Err((ErrorCode::NOSUPPORT, buffer));
        }
        if count > buffer.len() {
            return Err((ErrorCode::SIZE, buffer));
        }
        if let Err(error) = self.begin(config, Op::RepeatedSequence) {
            return Err((error, buffer));
        }
        self.period.set(period);
        self.buffer.replace(buffer);
        self.count.set(count);
        Ok(())
    }

    fn stop(&self) -> Result<(), ErrorCode> {
        if !self.active.get() {
            // cannot stop sampling that isn't running
            return Err(ErrorCode::INVAL);
        }
        self.active.set(false);
        self.op.clear();
        self.stops.set(self.stops.get() + 1);
        Ok(())
    }

    fn get_resolution_bits(&self) -> usize {
        RESOLUTION_BITS
    }

    fn get_voltage_reference_mv(&self) -> Option<usize> {
        Some(VOLTAGE_REFERENCE_MV)
    }

    fn set_client(&self, client: &'a dyn Client<u16>) {
        self.client.set(client);
    }
}

#[cfg(test)]
mod test {
    use super::{Reference, SimAdc, SimAdcConfig, NUM_CHANNELS};
    use core::cell::Cell;
    use kernel::hil::adc::{Adc, Capabilities, Client};
    use kernel::ErrorCode;
    use std::boxed::Box;

    struct Recorder {
        samples: Cell<usize>,
        last: Cell<Option<Result<u16, ErrorCode>>>,
    }

    impl Client<u16> for Recorder {
        fn sample_ready(&self, sample: Result<u16, ErrorCode>) {
            self.samples.set(self.samples.get() + 1);
            self.last.set(Some(sample));
        }

        fn samples_ready(
            &self,
            _buffer: &'static mut [u16],
            _length: usize,
            _status: Result<(), ErrorCode>,
        ) {
        }
    }

    fn recorder() -> &'static Recorder {
        Box::leak(Box::new(Recorder {
            samples: Cell::new(0),
            last: Cell::new(None),
        }))
    }

    #[test]
    fn single_conversion_roundtrip() {
        let adc: &'static SimAdc<'static> =
            Box::leak(Box::new(SimAdc::new(Capabilities::single_only())));
        let client = recorder();
        adc.set_client(client);
        adc.set_next_value(0x123);

        let config = SimAdcConfig {
            channel: 2,
            reference: Reference::Internal,
            hold_cycles: 8,
        };
        assert_eq!(adc.sample(&config), Ok(()));
        assert!(adc.is_active());
        assert_eq!(adc.sample(&config), Err(ErrorCode::BUSY));

        adc.complete_sample();
        assert!(!adc.is_active());
        assert_eq!(client.last.get(), Some(Ok(0x123)));
        assert_eq!(adc.last_config(), Some(config));
    }

    #[test]
    fn bad_channel_rejected() {
        let adc: &'static SimAdc<'static> =
            Box::leak(Box::new(SimAdc::new(Capabilities::single_only())));
        let client = recorder();
        adc.set_client(client);

        let config = SimAdcConfig::channel(NUM_CHANNELS);
        assert_eq!(adc.sample(&config), Err(ErrorCode::INVAL));
        assert_eq!(adc.starts(), 0);
        assert_eq!(client.samples.get(), 0);
    }

    #[test]
    fn missing_modes_unsupported() {
        let adc: &'static SimAdc<'static> =
            Box::leak(Box::new(SimAdc::new(Capabilities::single_only())));
        let config = SimAdcConfig::channel(0);
        assert_eq!(adc.sample_repeated(&config, 10), Err(ErrorCode::NOSUPPORT));

        let buffer: &'static mut [u16] = Box::leak(Box::new([0u16; 4]));
        match adc.sample_sequence(&config, buffer, 4) {
            Err((ErrorCode::NOSUPPORT, _)) => (),
            _ => panic!("sequence start should be unsupported"),
        }
    }
}
