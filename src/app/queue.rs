//! Single-slot activation queue.
//!
//! Decouples HTTP request handling from hardware execution and enforces
//! at most one activation in flight.  The slot is claimed by a successful
//! [`try_enqueue`](ActivationQueue::try_enqueue) and stays claimed until
//! the [`Claim`] returned by [`dequeue`](ActivationQueue::dequeue) is
//! dropped, i.e. until execution finishes, not merely until the worker
//! picks the request up.
//!
//! ```text
//!  HTTP handlers ──try_enqueue──▶ [ slot ] ──dequeue──▶ Serializer
//!   (many, never block)                        (one, suspends)
//! ```
//!
//! Hand-off uses an `embassy-sync` channel of depth one; the atomic flag
//! covers the execution phase that the channel alone cannot see.

use core::ops::Deref;
use core::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::error;

use crate::config::PlantConfig;
use crate::drivers::registry::PlantId;

/// One accepted request to water a plant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRequest {
    pub plant: PlantId,
    pub name: String,
    /// How long pump and valve stay energized.
    pub hold: Duration,
}

impl ActivationRequest {
    pub fn new(plant: PlantId, config: &PlantConfig) -> Self {
        Self {
            plant,
            name: config.name.clone(),
            hold: config.hold(),
        }
    }
}

/// The slot was occupied; the request is handed back untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected(pub ActivationRequest);

/// Capacity-one, many-producer / one-consumer queue.
pub struct ActivationQueue {
    in_flight: AtomicBool,
    slot: Channel<CriticalSectionRawMutex, ActivationRequest, 1>,
}

impl ActivationQueue {
    pub const fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            slot: Channel::new(),
        }
    }

    /// Offer `request` without blocking.
    ///
    /// Accepted only when nothing is queued or executing.
    pub fn try_enqueue(&self, request: ActivationRequest) -> Result<(), Rejected> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Rejected(request));
        }

        // The flag is only cleared after the previous request was received,
        // so the channel is empty here.
        self.slot.try_send(request).map_err(|TrySendError::Full(request)| {
            error!("queue: slot claimed but channel full, dropping request");
            Rejected(request)
        })
    }

    /// Wait for the next request.  The slot stays claimed until the
    /// returned [`Claim`] is dropped.
    pub async fn dequeue(&self) -> Claim<'_> {
        let request = self.slot.receive().await;
        Claim {
            queue: self,
            request,
        }
    }

    /// Blocking form of [`dequeue`](Self::dequeue) for plain threads.
    pub fn dequeue_blocking(&self) -> Claim<'_> {
        futures_lite::future::block_on(self.dequeue())
    }

    /// True while a request is queued or executing.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Default for ActivationQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// A dequeued request.  Dropping it frees the slot.
pub struct Claim<'q> {
    queue: &'q ActivationQueue,
    request: ActivationRequest,
}

impl Deref for Claim<'_> {
    type Target = ActivationRequest;

    fn deref(&self) -> &ActivationRequest {
        &self.request
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.queue.in_flight.store(false, Ordering::Release);
    }
}
