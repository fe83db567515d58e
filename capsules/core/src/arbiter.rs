// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Round-robin arbitration of one shared hardware unit.
//!
//! Every logical client owns an [`ArbiterSlot`], statically allocated and
//! registered with the [`Arbiter`] at wiring time. Slots implement
//! [`Resource`]: clients (or the dispatcher on their behalf) request the
//! grant through their slot and get a `granted()` callback when ownership
//! passes to them.
//!
//! Fairness is round-robin over registration ids: when the holder
//! releases, the next grant goes to the waiting slot at the smallest
//! forward id distance from the previous grant. A slot is never granted
//! twice in a row while another slot is waiting.
//!
//! Grants may be delivered from within the call that made the resource
//! available (`request()` on an idle unit, or the previous holder's
//! `release()`); clients must not assume the callback and the triggering
//! call are ordered.

use core::cell::Cell;
use core::ptr;

use kernel::collections::list::{List, ListLink, ListNode};
use kernel::hil::resource::{Resource, ResourceClient};
use kernel::utilities::cells::OptionalCell;
use kernel::ErrorCode;

pub struct Arbiter<'a> {
    slots: List<'a, ArbiterSlot<'a>>,
    holder: OptionalCell<&'a ArbiterSlot<'a>>,
    last_granted: Cell<Option<usize>>,
    num_slots: Cell<usize>,
}

impl<'a> Arbiter<'a> {
    pub const fn new() -> Arbiter<'a> {
        Arbiter {
            slots: List::new(),
            holder: OptionalCell::empty(),
            last_granted: Cell::new(None),
            num_slots: Cell::new(0),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.holder.is_none()
    }

    fn holds(&self, slot: &ArbiterSlot<'a>) -> bool {
        self.holder.map_or(false, |holder| ptr::eq(holder, slot))
    }

    /// Pass ownership to the waiting slot whose id follows the previous
    /// grant at the smallest forward distance, if any slot is waiting.
    fn grant_next(&self) {
        if self.holder.is_some() {
            return;
        }
        let num = self.num_slots.get();
        if num == 0 {
            return;
        }
        let after = self.last_granted.get().map_or(0, |id| (id + 1) % num);

        let mut best: Option<(&'a ArbiterSlot<'a>, usize)> = None;
        for slot in self.slots.iter() {
            if slot.waiting.get() {
                let distance = (slot.id.get() + num - after) % num;
                if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                    best = Some((slot, distance));
                }
            }
        }

        if let Some((slot, _)) = best {
            slot.waiting.set(false);
            self.holder.set(slot);
            self.last_granted.set(Some(slot.id.get()));
            slot.client.map(|client| client.granted());
        }
    }
}

/// One client's handle on the arbitrated unit.
pub struct ArbiterSlot<'a> {
    arbiter: &'a Arbiter<'a>,
    next: ListLink<'a, ArbiterSlot<'a>>,
    id: Cell<usize>,
    waiting: Cell<bool>,
    client: OptionalCell<&'a dyn ResourceClient>,
}

impl<'a> ArbiterSlot<'a> {
    pub fn new(arbiter: &'a Arbiter<'a>) -> ArbiterSlot<'a> {
        ArbiterSlot {
            arbiter,
            next: ListLink::empty(),
            id: Cell::new(0),
            waiting: Cell::new(false),
            client: OptionalCell::empty(),
        }
    }

    /// Link this slot into its arbiter and assign its registration id.
    /// Must be called once, at wiring time.
    pub fn register(&'a self) {
        let id = self.arbiter.num_slots.get();
        self.id.set(id);
        self.arbiter.num_slots.set(id + 1);
        self.arbiter.slots.push_head(self);
    }

    pub fn id(&self) -> usize {
        self.id.get()
    }
}

impl<'a> ListNode<'a, ArbiterSlot<'a>> for ArbiterSlot<'a> {
    fn next(&'a self) -> &'a ListLink<'a, ArbiterSlot<'a>> {
        &self.next
    }
}

impl<'a> Resource<'a> for ArbiterSlot<'a> {
    fn request(&self) -> Result<(), ErrorCode> {
        if self.waiting.get() || self.arbiter.holds(self) {
            return Err(ErrorCode::ALREADY);
        }
        self.waiting.set(true);
        // May signal granted() before we return.
        self.arbiter.grant_next();
        Ok(())
    }

    fn immediate_request(&'a self) -> Result<(), ErrorCode> {
        if self.waiting.get() {
            return Err(ErrorCode::ALREADY);
        }
        if self.arbiter.holder.is_some() {
            return Err(ErrorCode::BUSY);
        }
        self.arbiter.holder.set(self);
        self.arbiter.last_granted.set(Some(self.id.get()));
        Ok(())
    }

    fn release(&self) -> Result<(), ErrorCode> {
        if !self.arbiter.holds(self) {
            kernel::debug!("arbiter: release by client {} without the grant", self.id.get());
            return Err(ErrorCode::RESERVE);
        }
        self.arbiter.holder.clear();
        self.arbiter.grant_next();
        Ok(())
    }

    fn is_owner(&self) -> bool {
        self.arbiter.holds(self)
    }

    fn set_resource_client(&self, client: &'a dyn ResourceClient) {
        self.client.set(client);
    }
}

#[cfg(test)]
mod test {
    use super::{Arbiter, ArbiterSlot};
    use core::cell::Cell;
    use kernel::hil::resource::{Resource, ResourceClient};
    use kernel::ErrorCode;
    use std::boxed::Box;
    use std::vec::Vec;

    struct GrantCounter {
        grants: Cell<usize>,
    }

    impl ResourceClient for GrantCounter {
        fn granted(&self) {
            self.grants.set(self.grants.get() + 1);
        }
    }

    fn fixture(
        num: usize,
    ) -> (
        &'static Arbiter<'static>,
        Vec<(&'static ArbiterSlot<'static>, &'static GrantCounter)>,
    ) {
        let arbiter: &'static Arbiter<'static> = Box::leak(Box::new(Arbiter::new()));
        let mut slots = Vec::new();
        for _ in 0..num {
            let slot: &'static ArbiterSlot<'static> =
                Box::leak(Box::new(ArbiterSlot::new(arbiter)));
            slot.register();
            let client: &'static GrantCounter = Box::leak(Box::new(GrantCounter {
                grants: Cell::new(0),
            }));
            slot.set_resource_client(client);
            slots.push((slot, client));
        }
        (arbiter, slots)
    }

    #[test]
    fn idle_request_grants_immediately() {
        let (arbiter, slots) = fixture(2);
        let (a, ca) = slots[0];

        assert!(arbiter.is_idle());
        assert_eq!(a.request(), Ok(()));
        assert_eq!(ca.grants.get(), 1);
        assert!(a.is_owner());
        assert!(!arbiter.is_idle());
    }

    #[test]
    fn request_while_queued_or_held_is_already() {
        let (_, slots) = fixture(2);
        let (a, _) = slots[0];
        let (b, _) = slots[1];

        assert_eq!(a.request(), Ok(()));
        assert_eq!(a.request(), Err(ErrorCode::ALREADY));
        assert_eq!(b.request(), Ok(()));
        assert_eq!(b.request(), Err(ErrorCode::ALREADY));
    }

    #[test]
    fn release_by_non_holder_is_reserve() {
        let (_, slots) = fixture(2);
        let (a, _) = slots[0];
        let (b, _) = slots[1];

        assert_eq!(b.release(), Err(ErrorCode::RESERVE));
        assert_eq!(a.request(), Ok(()));
        assert_eq!(b.release(), Err(ErrorCode::RESERVE));
        assert!(a.is_owner());
    }

    #[test]
    fn round_robin_hand_off() {
        let (_, slots) = fixture(3);
        let (a, ca) = slots[0];
        let (b, cb) = slots[1];
        let (c, cc) = slots[2];

        assert_eq!(a.request(), Ok(()));
        assert_eq!(b.request(), Ok(()));
        assert_eq!(c.request(), Ok(()));
        assert_eq!((ca.grants.get(), cb.grants.get(), cc.grants.get()), (1, 0, 0));

        assert_eq!(a.release(), Ok(()));
        assert!(b.is_owner());
        assert_eq!(b.release(), Ok(()));
        assert!(c.is_owner());
        assert_eq!(c.release(), Ok(()));
        assert_eq!((ca.grants.get(), cb.grants.get(), cc.grants.get()), (1, 1, 1));
    }

    #[test]
    fn no_second_consecutive_grant_while_others_wait() {
        let (_, slots) = fixture(3);
        let (a, ca) = slots[0];
        let (b, _) = slots[1];
        let (c, cc) = slots[2];

        // b holds; a requested before c, but the grant after b goes to c:
        // round-robin order, not arrival order.
        assert_eq!(b.request(), Ok(()));
        assert_eq!(a.request(), Ok(()));
        assert_eq!(c.request(), Ok(()));
        assert_eq!(b.release(), Ok(()));
        assert!(c.is_owner());
        assert_eq!(cc.grants.get(), 1);
        assert_eq!(ca.grants.get(), 0);

        assert_eq!(c.release(), Ok(()));
        assert!(a.is_owner());
        assert_eq!(ca.grants.get(), 1);
    }

    #[test]
    fn immediate_request_only_when_idle() {
        let (arbiter, slots) = fixture(2);
        let (a, ca) = slots[0];
        let (b, _) = slots[1];

        assert_eq!(a.immediate_request(), Ok(()));
        // immediate grants are synchronous, no granted() event
        assert_eq!(ca.grants.get(), 0);
        assert!(a.is_owner());
        assert_eq!(b.immediate_request(), Err(ErrorCode::BUSY));

        assert_eq!(a.release(), Ok(()));
        assert!(arbiter.is_idle());
        assert_eq!(b.immediate_request(), Ok(()));
    }
}
