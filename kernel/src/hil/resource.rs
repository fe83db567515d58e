// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Interface for arbitrated exclusive access to a shared hardware
//! resource.
//!
//! Each logical client holds its own handle implementing [`Resource`];
//! which physical unit a handle arbitrates for is decided at wiring time.
//! Grants are exclusive: between [`ResourceClient::granted`] and
//! [`Resource::release`] the holder owns the hardware.

use crate::ErrorCode;

pub trait Resource<'a> {
    /// Enqueue a request for exclusive ownership. Returns immediately;
    /// ownership is signaled through [`ResourceClient::granted`], which
    /// may fire before this call returns if the resource is idle.
    ///
    /// Fails with `Err(ErrorCode::ALREADY)` if this client is already
    /// waiting for, or already holds, the grant.
    fn request(&self) -> Result<(), ErrorCode>;

    /// Take ownership synchronously if the resource is idle; no
    /// [`ResourceClient::granted`] event follows. Fails with
    /// `Err(ErrorCode::BUSY)` if the resource is held.
    fn immediate_request(&'a self) -> Result<(), ErrorCode>;

    /// Relinquish ownership. Only the current holder may call this;
    /// anybody else gets `Err(ErrorCode::RESERVE)`.
    ///
    /// Releasing while an operation started under this grant is still in
    /// flight is unsupported; let the operation complete first.
    fn release(&self) -> Result<(), ErrorCode>;

    /// Whether this client currently holds the grant.
    fn is_owner(&self) -> bool;

    fn set_resource_client(&self, client: &'a dyn ResourceClient);
}

pub trait ResourceClient {
    /// Ownership of the resource has passed to this client.
    fn granted(&self);
}
