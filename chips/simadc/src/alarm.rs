// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Manually-stepped alarm.
//!
//! Keeps a software tick counter; `fire()` stands in for the timer
//! interrupt and jumps the counter to the armed alarm point before
//! delivering the event.

use core::cell::Cell;
use kernel::hil::time::{Alarm, AlarmClient, Freq32KHz, Time};
use kernel::utilities::cells::OptionalCell;
use kernel::ErrorCode;

pub struct SimAlarm<'a> {
    now: Cell<u32>,
    alarm: Cell<u32>,
    armed: Cell<bool>,
    client: OptionalCell<&'a dyn AlarmClient>,
}

impl<'a> SimAlarm<'a> {
    pub fn new() -> SimAlarm<'a> {
        SimAlarm {
            now: Cell::new(0),
            alarm: Cell::new(0),
            armed: Cell::new(false),
            client: OptionalCell::empty(),
        }
    }

    /// Advance the clock without reaching the alarm point.
    pub fn advance(&self, tics: u32) {
        self.now.set(self.now.get().wrapping_add(tics));
    }

    /// Ticks remaining until the armed alarm fires.
    pub fn pending_delay(&self) -> Option<u32> {
        if self.armed.get() {
            Some(self.alarm.get().wrapping_sub(self.now.get()))
        } else {
            None
        }
    }

    /// Jump the clock to the armed alarm point and deliver the event, as
    /// the timer interrupt handler would.
    pub fn fire(&self) {
        if self.armed.get() {
            self.now.set(self.alarm.get());
            self.armed.set(false);
            self.client.map(|client| client.fired());
        }
    }
}

impl Time for SimAlarm<'_> {
    type Frequency = Freq32KHz;

    fn now(&self) -> u32 {
        self.now.get()
    }

    fn max_tics(&self) -> u32 {
        u32::MAX
    }
}

impl<'a> Alarm<'a> for SimAlarm<'a> {
    fn set_alarm(&self, tics: u32) {
        self.alarm.set(tics);
        self.armed.set(true);
    }

    fn get_alarm(&self) -> u32 {
        self.alarm.get()
    }

    fn is_enabled(&self) -> bool {
        self.armed.get()
    }

    fn disable(&self) -> Result<(), ErrorCode> {
        self.armed.set(false);
        Ok(())
    }

    fn set_client(&self, client: &'a dyn AlarmClient) {
        self.client.set(client);
    }
}

#[cfg(test)]
mod test {
    use super::SimAlarm;
    use core::cell::Cell;
    use kernel::hil::time::{Alarm, AlarmClient, Time};
    use std::boxed::Box;

    struct Fired {
        count: Cell<usize>,
    }

    impl AlarmClient for Fired {
        fn fired(&self) {
            self.count.set(self.count.get() + 1);
        }
    }

    #[test]
    fn fires_at_set_point() {
        let alarm: &'static SimAlarm<'static> = Box::leak(Box::new(SimAlarm::new()));
        let client = Box::leak(Box::new(Fired {
            count: Cell::new(0),
        }));
        alarm.set_client(client);

        alarm.set_alarm(alarm.now().wrapping_add(25));
        assert_eq!(alarm.pending_delay(), Some(25));
        alarm.advance(5);
        assert_eq!(alarm.pending_delay(), Some(20));

        alarm.fire();
        assert_eq!(client.count.get(), 1);
        assert_eq!(alarm.now(), 25);
        assert!(!alarm.is_enabled());

        // a disarmed alarm stays quiet
        alarm.fire();
        assert_eq!(client.count.get(), 1);
    }
}
