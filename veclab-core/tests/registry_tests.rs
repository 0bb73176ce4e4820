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

//! Registry-level behavior: notification delivery, destruction and
//! duplication across vectors.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use proptest::prelude::*;
use veclab_core::{
    EngineConfig, IdleScheduler, IdleTask, NotifyKind, NotifyMode, Selection, TaskHandle,
    VectorError, VectorHandle, VectorRegistry,
};

/// Records every notification a client receives
struct Recorder {
    events: Arc<Mutex<Vec<NotifyKind>>>,
}

impl Recorder {
    fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn attach(&self, vector: &VectorHandle) -> veclab_core::Client {
        let events = self.events.clone();
        vector.subscribe(Some(Arc::new(move |kind: NotifyKind| {
            events.lock().push(kind);
        })))
    }

    fn events(&self) -> Vec<NotifyKind> {
        self.events.lock().clone()
    }
}

/// Host-side deferred task list drained explicitly by the test
#[derive(Default)]
struct HostScheduler {
    tasks: Mutex<Vec<(TaskHandle, IdleTask)>>,
    scheduled: AtomicUsize,
    cancelled: AtomicUsize,
}

impl HostScheduler {
    fn drain(&self) -> usize {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        let ran = tasks.len();
        for (_, task) in tasks {
            task();
        }
        ran
    }
}

impl IdleScheduler for HostScheduler {
    fn schedule(&self, task: IdleTask) -> TaskHandle {
        let handle = TaskHandle(self.scheduled.fetch_add(1, Ordering::SeqCst) as u64);
        self.tasks.lock().push((handle, task));
        handle
    }

    fn cancel(&self, handle: TaskHandle) -> bool {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|(h, _)| *h != handle);
        tasks.len() != before
    }
}

fn filled(registry: &VectorRegistry, name: &str, values: &[f64]) -> VectorHandle {
    let (vector, _) = registry.create(name).unwrap();
    vector.update(|store| store.copy_from(values)).unwrap();
    vector
}

#[test]
fn test_when_idle_coalesces_many_mutations() {
    let registry = VectorRegistry::default();
    let (v, _) = registry.create("v").unwrap();
    let recorder = Recorder::new();
    let _client = recorder.attach(&v);

    for i in 0..25 {
        v.update(|store| store.extend_from_slice(&[i as f64])).unwrap();
    }
    assert!(recorder.events().is_empty());

    registry.run_idle();
    assert_eq!(recorder.events(), vec![NotifyKind::Updated]);

    v.mark_changed();
    registry.run_idle();
    assert_eq!(recorder.events().len(), 2);
}

#[test]
fn test_always_mode_notifies_each_mutation() {
    let registry = VectorRegistry::new(EngineConfig::default().with_notify(NotifyMode::Always));
    let (v, _) = registry.create("v").unwrap();
    let recorder = Recorder::new();
    let _client = recorder.attach(&v);

    for _ in 0..3 {
        v.update(|store| store.extend_from_slice(&[1.0])).unwrap();
    }
    assert_eq!(recorder.events().len(), 3);
    assert_eq!(registry.run_idle(), 0);
}

#[test]
fn test_cancel_pending_suppresses_deferred_notification() {
    let registry = VectorRegistry::default();
    let (v, _) = registry.create("v").unwrap();
    let recorder = Recorder::new();
    let _client = recorder.attach(&v);

    v.mark_changed();
    assert!(v.is_pending());
    assert!(v.cancel_pending());
    registry.run_idle();
    assert!(recorder.events().is_empty());

    v.mark_changed();
    v.notify_now();
    registry.run_idle();
    assert_eq!(recorder.events(), vec![NotifyKind::Updated]);
}

#[test]
fn test_host_scheduler_receives_deferred_notifications() {
    let host = Arc::new(HostScheduler::default());
    let registry = VectorRegistry::with_scheduler(EngineConfig::default(), host.clone());
    let (v, _) = registry.create("v").unwrap();
    host.drain();
    let recorder = Recorder::new();
    let _client = recorder.attach(&v);
    let base = host.scheduled.load(Ordering::SeqCst);

    for i in 0..5 {
        v.update(|store| store.extend_from_slice(&[i as f64])).unwrap();
    }
    assert_eq!(host.scheduled.load(Ordering::SeqCst), base + 1);
    assert_eq!(registry.run_idle(), 0);
    assert!(recorder.events().is_empty());

    assert_eq!(host.drain(), 1);
    assert_eq!(recorder.events(), vec![NotifyKind::Updated]);

    v.mark_changed();
    assert!(v.cancel_pending());
    assert_eq!(host.cancelled.load(Ordering::SeqCst), 1);
    assert_eq!(host.drain(), 0);
    assert_eq!(recorder.events().len(), 1);
}

#[test]
fn test_callbacks_may_read_the_vector() {
    let registry = VectorRegistry::new(EngineConfig::default().with_notify(NotifyMode::Always));
    let (v, _) = registry.create("v").unwrap();
    let seen = Arc::new(AtomicUsize::new(0));
    let observed = v.clone();
    let length = seen.clone();
    let _client = v.subscribe(Some(Arc::new(move |_: NotifyKind| {
        length.store(observed.len(), Ordering::SeqCst);
    })));

    v.update(|store| store.copy_from(&[1.0, 2.0, 3.0])).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[test]
fn test_destroy_notifies_once_and_clears_clients() {
    let registry = VectorRegistry::default();
    let v = filled(&registry, "v", &[1.0, 2.0]);
    let first = Recorder::new();
    let second = Recorder::new();
    let a = first.attach(&v);
    let b = second.attach(&v);

    v.mark_changed();
    registry.destroy("v").unwrap();
    assert!(matches!(registry.destroy("v"), Err(VectorError::NotFound(_))));
    registry.run_idle();

    assert_eq!(first.events(), vec![NotifyKind::Destroyed]);
    assert_eq!(second.events(), vec![NotifyKind::Destroyed]);
    assert!(a.is_inert() && b.is_inert());
    assert!(!a.notify_pending());
}

#[test]
fn test_released_client_hears_nothing() {
    let registry = VectorRegistry::new(EngineConfig::default().with_notify(NotifyMode::Always));
    let (v, _) = registry.create("v").unwrap();
    let recorder = Recorder::new();
    let client = recorder.attach(&v);
    client.release();

    v.mark_changed();
    assert!(recorder.events().is_empty());
    assert_eq!(v.read().clients().len(), 0);
}

#[test]
fn test_client_by_name() {
    let registry = VectorRegistry::default();
    filled(&registry, "v", &[1.0]);
    let client = registry.alloc_client("v").unwrap();
    assert_eq!(client.name().as_deref(), Some("::v"));
    assert_eq!(client.vector().unwrap().values(), vec![1.0]);
    assert!(matches!(
        registry.alloc_client("missing"),
        Err(VectorError::NotFound(_))
    ));
}

#[test]
fn test_registry_drop_destroys_vectors() {
    let recorder = Recorder::new();
    let client = {
        let registry = VectorRegistry::default();
        let (v, _) = registry.create("v").unwrap();
        recorder.attach(&v)
    };
    assert_eq!(recorder.events(), vec![NotifyKind::Destroyed]);
    assert!(client.is_inert());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Copying through a temporary reproduces the source
    #[test]
    fn test_duplicate_round_trip(values in prop::collection::vec(-1e6f64..1e6, 0..200)) {
        let registry = VectorRegistry::default();
        let src = filled(&registry, "src", &values);
        let (tmp, _) = registry.create("tmp").unwrap();
        let (dest, _) = registry.create("dest").unwrap();

        registry.duplicate(&tmp, &Selection::full(src.clone())).unwrap();
        registry.duplicate(&dest, &Selection::full(tmp)).unwrap();
        prop_assert_eq!(dest.values(), values.clone());

        registry.duplicate(&src, &Selection::full(src.clone())).unwrap();
        prop_assert_eq!(src.values(), values);
    }
}
