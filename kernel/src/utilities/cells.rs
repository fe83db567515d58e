// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Cell types for sharing state in the single-threaded, event-driven
//! execution model.
//!
//! Components in this stack are wired together with shared (`&`)
//! references and updated from both normal and interrupt-like context of a
//! single thread of control, so interior mutability is the norm.
//! [`OptionalCell`] holds `Copy` values that may be absent (clients,
//! in-flight markers); [`TakeCell`] holds a mutable reference (typically a
//! `&'static mut` buffer) that exactly one holder at a time may move out
//! and operate on.

use core::cell::Cell;

/// A `Cell` that wraps an `Option`.
///
/// Keeps code that stores possibly-absent `Copy` values (clients, state
/// markers) from spelling out `Cell<Option<T>>` and its `get`/`set`
/// plumbing everywhere.
pub struct OptionalCell<T: Copy> {
    value: Cell<Option<T>>,
}

impl<T: Copy> OptionalCell<T> {
    /// Create an empty cell (contains just `None`).
    pub const fn empty() -> OptionalCell<T> {
        OptionalCell {
            value: Cell::new(None),
        }
    }

    /// Update the stored value.
    pub fn set(&self, val: T) {
        self.value.set(Some(val));
    }

    /// Reset the stored value to `None`.
    pub fn clear(&self) {
        self.value.set(None);
    }

    /// Check if the cell contains something.
    pub fn is_some(&self) -> bool {
        self.value.get().is_some()
    }

    /// Check if the cell is `None`.
    pub fn is_none(&self) -> bool {
        self.value.get().is_none()
    }

    /// Return the contained value, leaving `None` in its place.
    pub fn take(&self) -> Option<T> {
        self.value.take()
    }

    /// Return a copy of the contained `Option`.
    pub fn extract(&self) -> Option<T> {
        self.value.get()
    }

    /// Call `closure` with a copy of the value, if there is one.
    pub fn map<F, R>(&self, closure: F) -> Option<R>
    where
        F: FnOnce(T) -> R,
    {
        self.value.get().map(closure)
    }

    /// Call `closure` with a copy of the value, or return `default` if the
    /// cell is empty.
    pub fn map_or<F, R>(&self, default: R, closure: F) -> R
    where
        F: FnOnce(T) -> R,
    {
        self.value.get().map_or(default, closure)
    }
}

/// A shared reference to a mutable reference.
///
/// A `TakeCell` wraps a potential reference to mutable memory that may be
/// available at a given point. Rather than enforcing borrow rules at
/// compile time, `TakeCell` lets multiple components hold references to
/// it while ensuring only one at a time has access to the underlying
/// memory: holders either move the reference out or operate on a borrow
/// within a closure. Taking the value out of an empty `TakeCell` returns
/// `None`.
pub struct TakeCell<'a, T: ?Sized> {
    val: Cell<Option<&'a mut T>>,
}

impl<'a, T: ?Sized> TakeCell<'a, T> {
    pub const fn empty() -> TakeCell<'a, T> {
        TakeCell {
            val: Cell::new(None),
        }
    }

    /// Create a new `TakeCell` containing `value`.
    pub const fn new(value: &'a mut T) -> TakeCell<'a, T> {
        TakeCell {
            val: Cell::new(Some(value)),
        }
    }

    pub fn is_none(&self) -> bool {
        let inner = self.take();
        let result = inner.is_none();
        self.val.set(inner);
        result
    }

    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Take the mutable reference out, leaving `None` in its place.
    pub fn take(&self) -> Option<&'a mut T> {
        self.val.replace(None)
    }

    /// Store `val`, returning the previous contents if any.
    pub fn replace(&self, val: &'a mut T) -> Option<&'a mut T> {
        self.val.replace(Some(val))
    }

    /// Store the contents of `val`.
    pub fn put(&self, val: Option<&'a mut T>) {
        self.val.replace(val);
    }

    /// Let `closure` borrow the contents if-and-only-if the cell is not
    /// already taken. The cell holds the (possibly modified) memory again
    /// once the closure completes.
    pub fn map<F, R>(&self, closure: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let maybe_val = self.take();
        maybe_val.map(|mut val| {
            let res = closure(&mut val);
            self.replace(val);
            res
        })
    }
}

#[cfg(test)]
mod test {
    use super::{OptionalCell, TakeCell};

    #[test]
    fn optional_cell_set_take() {
        let cell: OptionalCell<usize> = OptionalCell::empty();
        assert!(cell.is_none());
        cell.set(7);
        assert!(cell.is_some());
        assert_eq!(cell.map(|v| v * 2), Some(14));
        assert_eq!(cell.take(), Some(7));
        assert!(cell.is_none());
        assert_eq!(cell.map_or(0, |v| v), 0);
    }

    #[test]
    fn take_cell_exclusive_access() {
        let mut mem = [0u16; 4];
        let cell = TakeCell::new(&mut mem[..]);
        assert!(cell.is_some());

        let x = &cell;
        let y = &cell;
        x.map(|buf| buf[1] = 9);

        let buf = y.take().unwrap();
        assert_eq!(buf[1], 9);
        assert!(x.take().is_none());
        y.replace(buf);
        assert!(cell.is_some());
    }
}
