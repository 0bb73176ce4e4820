// SPDX-License-Identifier: AGPL-3.0-or-later
// VecLab - Named Vector Data Engine
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Client Notification
//!
//! Each vector keeps a `ClientRegistry` of subscribers. Mutations call
//! `mark_changed`, which either notifies immediately, does nothing, or
//! schedules a single deferred notification on an `IdleScheduler`.
//!
//! ## Delivery
//!
//! ```text
//! mutate ──► mark_changed ──┬─ Never    : nothing
//!                           ├─ Always   : Dispatch (delivered after unlock)
//!                           └─ WhenIdle : schedule once ──► idle tick ──► Dispatch
//! ```
//!
//! A `Dispatch` is a snapshot of callbacks taken under the vector lock and
//! delivered after the lock is released, so a callback may freely read
//! the vector it observes.
//!
//! ## Destroy
//!
//! Destroying a vector sends `NotifyKind::Destroyed` once and detaches
//! every client. Detached clients are inert: they report no name and
//! never receive another notification.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Result, VectorError};
use crate::registry::{Vector, VectorHandle};

// ============================================================================
// Modes and Kinds
// ============================================================================

/// When clients hear about mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyMode {
    /// Never notify automatically
    Never,
    /// Notify synchronously after every mutation
    Always,
    /// Coalesce mutations into one deferred notification
    #[default]
    WhenIdle,
}

impl std::str::FromStr for NotifyMode {
    type Err = VectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "never" => Ok(NotifyMode::Never),
            "always" => Ok(NotifyMode::Always),
            "whenidle" => Ok(NotifyMode::WhenIdle),
            other => Err(VectorError::BadSpecification(other.to_string())),
        }
    }
}

/// What happened to the observed vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Updated,
    Destroyed,
}

pub type NotifyCallback = Arc<dyn Fn(NotifyKind) + Send + Sync>;

// ============================================================================
// Idle Scheduling
// ============================================================================

pub type IdleTask = Box<dyn FnOnce() + Send>;

/// Handle for a scheduled idle task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(pub u64);

/// Host hook for deferred work
pub trait IdleScheduler: Send + Sync {
    /// Run `task` once the current unit of work completes
    fn schedule(&self, task: IdleTask) -> TaskHandle;

    /// Drop a task that has not run yet. Returns false if it already ran.
    fn cancel(&self, handle: TaskHandle) -> bool;
}

/// In-process idle queue driven by `run_pending`
#[derive(Default)]
pub struct IdleQueue {
    next: AtomicU64,
    tasks: Mutex<BTreeMap<u64, IdleTask>>,
}

impl IdleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every task queued before this call; returns the number run.
    ///
    /// Tasks scheduled while draining wait for the next call.
    pub fn run_pending(&self) -> usize {
        let batch = std::mem::take(&mut *self.tasks.lock());
        let count = batch.len();
        for (_, task) in batch {
            task();
        }
        if count > 0 {
            trace!(count, "idle tasks ran");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl fmt::Debug for IdleQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdleQueue").field("queued", &self.len()).finish()
    }
}

impl IdleScheduler for IdleQueue {
    fn schedule(&self, task: IdleTask) -> TaskHandle {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        self.tasks.lock().insert(id, task);
        TaskHandle(id)
    }

    fn cancel(&self, handle: TaskHandle) -> bool {
        self.tasks.lock().remove(&handle.0).is_some()
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Callbacks collected under the vector lock, delivered after release
#[must_use = "a dispatch does nothing until delivered"]
pub struct Dispatch {
    kind: NotifyKind,
    callbacks: Vec<NotifyCallback>,
}

impl Dispatch {
    pub fn kind(&self) -> NotifyKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn deliver(self) {
        for callback in &self.callbacks {
            callback(self.kind);
        }
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("kind", &self.kind)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

// ============================================================================
// ClientRegistry
// ============================================================================

pub(crate) struct ClientSlot {
    id: u64,
    callback: RwLock<Option<NotifyCallback>>,
    owner: RwLock<Option<Weak<RwLock<Vector>>>>,
}

/// Subscribers and notification state of one vector
pub struct ClientRegistry {
    mode: NotifyMode,
    clients: BTreeMap<u64, Weak<ClientSlot>>,
    next_id: u64,
    updated: bool,
    destroyed: bool,
    pending: Option<TaskHandle>,
    scheduler: Arc<dyn IdleScheduler>,
}

impl ClientRegistry {
    pub fn new(mode: NotifyMode, scheduler: Arc<dyn IdleScheduler>) -> Self {
        Self {
            mode,
            clients: BTreeMap::new(),
            next_id: 0,
            updated: false,
            destroyed: false,
            pending: None,
            scheduler,
        }
    }

    pub fn mode(&self) -> NotifyMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: NotifyMode) {
        self.mode = mode;
    }

    /// Live subscribers
    pub fn len(&self) -> usize {
        self.clients.values().filter(|w| w.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True while a deferred notification is scheduled
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// True when changes happened since the last notification
    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub(crate) fn subscribe(
        &mut self,
        owner: Weak<RwLock<Vector>>,
        callback: Option<NotifyCallback>,
    ) -> Client {
        let id = self.next_id;
        self.next_id += 1;
        let slot = Arc::new(ClientSlot {
            id,
            callback: RwLock::new(callback),
            owner: RwLock::new(if self.destroyed { None } else { Some(owner) }),
        });
        self.clients.retain(|_, weak| weak.strong_count() > 0);
        self.clients.insert(id, Arc::downgrade(&slot));
        Client { slot }
    }

    pub fn unsubscribe(&mut self, id: u64) -> bool {
        self.clients.remove(&id).is_some()
    }

    /// Record a change. `deferred` builds the idle task that will call
    /// `fire_pending` and is only invoked when one needs scheduling.
    pub fn mark_changed<F>(&mut self, deferred: F) -> Option<Dispatch>
    where
        F: FnOnce() -> IdleTask,
    {
        match self.mode {
            NotifyMode::Never => None,
            NotifyMode::Always => {
                self.updated = true;
                Some(self.take_dispatch())
            }
            NotifyMode::WhenIdle => {
                self.updated = true;
                if self.pending.is_none() {
                    let handle = self.scheduler.schedule(deferred());
                    trace!(task = handle.0, "notification scheduled");
                    self.pending = Some(handle);
                }
                None
            }
        }
    }

    /// Drop a scheduled notification. Returns true if one was pending.
    pub fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                self.scheduler.cancel(handle);
                trace!(task = handle.0, "notification cancelled");
                true
            }
            None => false,
        }
    }

    /// Snapshot callbacks and clear the change flags
    pub fn take_dispatch(&mut self) -> Dispatch {
        let kind = if self.destroyed {
            NotifyKind::Destroyed
        } else {
            NotifyKind::Updated
        };
        self.updated = false;
        self.pending = None;

        self.clients.retain(|_, weak| weak.strong_count() > 0);
        let callbacks = self
            .clients
            .values()
            .filter_map(Weak::upgrade)
            .filter_map(|slot| slot.callback.read().clone())
            .collect();
        Dispatch { kind, callbacks }
    }

    /// Body of the deferred task; a no-op if the notification was
    /// cancelled or already delivered.
    pub fn fire_pending(&mut self) -> Option<Dispatch> {
        self.pending.take()?;
        Some(self.take_dispatch())
    }

    /// Final `Destroyed` dispatch; detaches every client
    pub fn destroy(&mut self) -> Dispatch {
        self.cancel_pending();
        self.destroyed = true;
        let dispatch = self.take_dispatch();
        for slot in self.clients.values().filter_map(Weak::upgrade) {
            *slot.owner.write() = None;
        }
        self.clients.clear();
        debug!(clients = dispatch.len(), "clients detached");
        dispatch
    }
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("mode", &self.mode)
            .field("clients", &self.len())
            .field("updated", &self.updated)
            .field("pending", &self.pending)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

// ============================================================================
// Client
// ============================================================================

/// Subscription token held by an observer.
///
/// Dropping the token ends the subscription.
pub struct Client {
    slot: Arc<ClientSlot>,
}

impl Client {
    pub fn id(&self) -> u64 {
        self.slot.id
    }

    /// Replace or clear the notification callback
    pub fn set_callback(&self, callback: Option<NotifyCallback>) {
        *self.slot.callback.write() = callback;
    }

    fn owner(&self) -> Option<VectorHandle> {
        let owner = self.slot.owner.read().clone()?;
        owner.upgrade().map(VectorHandle::from_arc)
    }

    /// The observed vector, unless it has been destroyed
    pub fn vector(&self) -> Result<VectorHandle> {
        self.owner()
            .ok_or_else(|| VectorError::NotFound("vector no longer exists".to_string()))
    }

    /// Qualified name of the observed vector; None when inert
    pub fn name(&self) -> Option<String> {
        self.owner().map(|v| v.name())
    }

    /// True while the observed vector has a deferred notification queued
    pub fn notify_pending(&self) -> bool {
        self.owner().is_some_and(|v| v.is_pending())
    }

    pub fn is_inert(&self) -> bool {
        self.owner().is_none()
    }

    /// Unsubscribe now instead of waiting for drop
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let Some(owner) = self.slot.owner.read().clone() else {
            return;
        };
        // A busy owner prunes the dead slot on its next subscribe or dispatch
        if let Some(vector) = owner.upgrade()
            && let Some(mut guard) = vector.try_write()
        {
            guard.clients_mut().unsubscribe(self.slot.id);
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.slot.id)
            .field("vector", &self.name())
            .finish()
    }
}
