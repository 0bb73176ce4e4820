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

//! Vector Registry
//!
//! Owns every named vector. A vector is shared as a `VectorHandle`
//! (`Arc<RwLock<Vector>>`) by the registry, its clients and any deferred
//! notification task.
//!
//! ## Name Forms
//!
//! | Form             | Meaning                                       |
//! |------------------|-----------------------------------------------|
//! | `x`              | `x` in the current namespace, then global     |
//! | `::ns::x`        | `x` in namespace `ns` only                    |
//! | `x(2:5)`         | lookup: selection window over positions 2..=5 |
//! | `x(10)`          | create: ten zeroed elements                   |
//! | `x(1:4)`         | create: offset 1, four elements               |
//! | `#auto`          | create: generated `vector<N>`                 |

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, trace};

use crate::config::EngineConfig;
use crate::error::{Result, VectorError};
use crate::index::{IndexEvaluator, IndexMode, IndexResolver, Reducer, SpecialIndexTable, Window};
use crate::name::{VectorName, is_vector_char, normalize_namespace};
use crate::notify::{
    Client, ClientRegistry, Dispatch, IdleQueue, IdleScheduler, NotifyCallback, NotifyMode,
};
use crate::store::VectorStore;

/// Name accepted by `create` to request a generated name
pub const AUTO_NAME: &str = "#auto";

// ============================================================================
// Vector
// ============================================================================

/// A named store plus its subscribers
pub struct Vector {
    name: VectorName,
    store: VectorStore,
    clients: ClientRegistry,
    this: Weak<RwLock<Vector>>,
    destroyed: bool,
}

impl Vector {
    pub fn name(&self) -> &VectorName {
        &self.name
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut VectorStore {
        &mut self.store
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub fn clients_mut(&mut self) -> &mut ClientRegistry {
        &mut self.clients
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Invalidate cached extrema and notify per the vector's mode.
    ///
    /// The returned dispatch must be delivered after the lock is dropped.
    pub fn mark_changed(&mut self) -> Option<Dispatch> {
        self.store.invalidate();
        let this = self.this.clone();
        self.clients.mark_changed(move || {
            Box::new(move || {
                if let Some(vector) = this.upgrade() {
                    let dispatch = vector.write().clients.fire_pending();
                    if let Some(dispatch) = dispatch {
                        dispatch.deliver();
                    }
                }
            })
        })
    }
}

impl fmt::Debug for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vector")
            .field("name", &self.name.qualified())
            .field("store", &self.store)
            .field("clients", &self.clients)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

// ============================================================================
// VectorHandle
// ============================================================================

/// Shared reference to a registered vector
#[derive(Clone)]
pub struct VectorHandle(Arc<RwLock<Vector>>);

impl VectorHandle {
    pub(crate) fn from_arc(inner: Arc<RwLock<Vector>>) -> Self {
        Self(inner)
    }

    fn build(name: VectorName, mode: NotifyMode, scheduler: Arc<dyn IdleScheduler>) -> Self {
        Self(Arc::new_cyclic(|this| {
            RwLock::new(Vector {
                name,
                store: VectorStore::new(),
                clients: ClientRegistry::new(mode, scheduler),
                this: this.clone(),
                destroyed: false,
            })
        }))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vector> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Vector> {
        self.0.write()
    }

    /// Read guard, or `None` while a writer holds the vector
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, Vector>> {
        self.0.try_read()
    }

    /// Qualified name
    pub fn name(&self) -> String {
        self.0.read().name.qualified()
    }

    pub fn len(&self) -> usize {
        self.0.read().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of `[0, length)`
    pub fn values(&self) -> Vec<f64> {
        self.0.read().store.values().to_vec()
    }

    /// Copy of the positions selected by `window`
    pub fn window_values(&self, window: Window) -> Vec<f64> {
        self.0.read().store.window(window).to_vec()
    }

    pub fn offset(&self) -> i64 {
        self.0.read().store.offset()
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.read().destroyed
    }

    pub fn ptr_eq(&self, other: &VectorHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Mutate the store, then mark the vector changed once.
    ///
    /// Nothing is marked when `f` fails.
    pub fn update<R>(&self, f: impl FnOnce(&mut VectorStore) -> Result<R>) -> Result<R> {
        let (value, dispatch) = {
            let mut vector = self.0.write();
            let value = f(&mut vector.store)?;
            (value, vector.mark_changed())
        };
        if let Some(dispatch) = dispatch {
            dispatch.deliver();
        }
        Ok(value)
    }

    /// Mark changed without touching the values
    pub fn mark_changed(&self) {
        let dispatch = self.0.write().mark_changed();
        if let Some(dispatch) = dispatch {
            dispatch.deliver();
        }
    }

    /// Cancel any deferred notification and notify immediately
    pub fn notify_now(&self) {
        let dispatch = {
            let mut vector = self.0.write();
            vector.clients.cancel_pending();
            vector.clients.take_dispatch()
        };
        dispatch.deliver();
    }

    pub fn cancel_pending(&self) -> bool {
        self.0.write().clients.cancel_pending()
    }

    pub fn is_pending(&self) -> bool {
        self.0.read().clients.is_pending()
    }

    pub fn notify_mode(&self) -> NotifyMode {
        self.0.read().clients.mode()
    }

    pub fn set_notify_mode(&self, mode: NotifyMode) {
        self.0.write().clients.set_mode(mode);
    }

    /// Register an observer
    pub fn subscribe(&self, callback: Option<NotifyCallback>) -> Client {
        let this = Arc::downgrade(&self.0);
        self.0.write().clients.subscribe(this, callback)
    }

    fn destroy(&self) {
        let dispatch = {
            let mut vector = self.0.write();
            if vector.destroyed {
                return;
            }
            vector.destroyed = true;
            vector.store.release();
            vector.clients.destroy()
        };
        dispatch.deliver();
    }
}

impl fmt::Debug for VectorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_read() {
            Some(vector) => f
                .debug_tuple("VectorHandle")
                .field(&vector.name.qualified())
                .finish(),
            None => f.write_str("VectorHandle(<locked>)"),
        }
    }
}

/// A vector together with the positions an operation acts on
#[derive(Debug, Clone)]
pub struct Selection {
    pub vector: VectorHandle,
    pub window: Window,
}

impl Selection {
    /// Whole-vector selection
    pub fn full(vector: VectorHandle) -> Self {
        let window = Window::full(vector.len());
        Self { vector, window }
    }

    /// Copy of the selected values
    pub fn values(&self) -> Vec<f64> {
        self.vector.window_values(self.window)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

// ============================================================================
// VectorRegistry
// ============================================================================

/// Size and offset requested by a `name(size)` or `name(first:last)` suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct CreateSpec {
    size: usize,
    offset: Option<i64>,
}

/// Table of named vectors
pub struct VectorRegistry {
    config: EngineConfig,
    vectors: RwLock<HashMap<String, VectorHandle>>,
    namespace: RwLock<String>,
    next_auto: AtomicUsize,
    specials: RwLock<SpecialIndexTable>,
    idle: Arc<IdleQueue>,
    scheduler: Arc<dyn IdleScheduler>,
    protected: RwLock<HashSet<String>>,
}

impl Default for VectorRegistry {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl VectorRegistry {
    /// Registry whose deferred notifications run on its own idle queue
    pub fn new(config: EngineConfig) -> Self {
        let idle = Arc::new(IdleQueue::new());
        let scheduler: Arc<dyn IdleScheduler> = idle.clone();
        Self::build(config, idle, scheduler)
    }

    /// Registry whose deferred notifications go to a host scheduler
    pub fn with_scheduler(config: EngineConfig, scheduler: Arc<dyn IdleScheduler>) -> Self {
        Self::build(config, Arc::new(IdleQueue::new()), scheduler)
    }

    fn build(
        config: EngineConfig,
        idle: Arc<IdleQueue>,
        scheduler: Arc<dyn IdleScheduler>,
    ) -> Self {
        Self {
            config,
            vectors: RwLock::new(HashMap::new()),
            namespace: RwLock::new(String::new()),
            next_auto: AtomicUsize::new(0),
            specials: RwLock::new(SpecialIndexTable::default()),
            idle,
            scheduler,
            protected: RwLock::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drain the built-in idle queue; returns the number of tasks run
    pub fn run_idle(&self) -> usize {
        self.idle.run_pending()
    }

    pub fn len(&self) -> usize {
        self.vectors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.read().is_empty()
    }

    // ------------------------------------------------------------------------
    // Special indices
    // ------------------------------------------------------------------------

    pub fn specials(&self) -> RwLockReadGuard<'_, SpecialIndexTable> {
        self.specials.read()
    }

    pub fn install_special(&self, name: &'static str, reducer: Reducer) {
        self.specials.write().install(name, reducer);
    }

    pub fn uninstall_special(&self, name: &str) -> bool {
        self.specials.write().uninstall(name)
    }

    // ------------------------------------------------------------------------
    // Namespaces
    // ------------------------------------------------------------------------

    /// Current namespace path; empty is global
    pub fn namespace(&self) -> String {
        self.namespace.read().clone()
    }

    pub fn set_namespace(&self, path: &str) -> Result<()> {
        let normalized = normalize_namespace(path)?;
        debug!(namespace = %normalized, "namespace changed");
        *self.namespace.write() = normalized;
        Ok(())
    }

    fn parse_name(&self, name: &str) -> Result<VectorName> {
        VectorName::parse(name, &self.namespace.read())
    }

    // ------------------------------------------------------------------------
    // Create / find / destroy
    // ------------------------------------------------------------------------

    /// Create a vector, or return the existing one with `is_new == false`.
    ///
    /// A `(size)` or `(first:last)` suffix sizes the vector; an existing
    /// vector is resized in place and its clients are notified.
    pub fn create(&self, spec: &str) -> Result<(VectorHandle, bool)> {
        let (name, create_spec) = split_create_spec(spec)?;
        let (vector, is_new) = self.create_named(name)?;

        if let Some(offset) = create_spec.offset {
            vector.write().store.set_offset(offset);
        }
        if create_spec.size > 0 {
            vector.write().store.change_length(create_spec.size)?;
        }
        if !is_new {
            vector.mark_changed();
        }
        Ok((vector, is_new))
    }

    fn create_named(&self, name: &str) -> Result<(VectorHandle, bool)> {
        let parsed = if name == AUTO_NAME {
            self.auto_name()?
        } else {
            self.parse_name(name)?
        };
        let key = parsed.qualified();

        let mut vectors = self.vectors.write();
        if let Some(existing) = vectors.get(&key) {
            return Ok((existing.clone(), false));
        }
        let vector = VectorHandle::build(
            parsed,
            self.config.default_notify,
            self.scheduler.clone(),
        );
        vectors.insert(key.clone(), vector.clone());
        info!(vector = %key, "vector created");
        Ok((vector, true))
    }

    fn auto_name(&self) -> Result<VectorName> {
        let vectors = self.vectors.read();
        loop {
            let id = self.next_auto.fetch_add(1, Ordering::Relaxed);
            let candidate = format!("{}{}", self.config.auto_name_prefix, id);
            let parsed = self.parse_name(&candidate)?;
            if !vectors.contains_key(&parsed.qualified()) {
                return Ok(parsed);
            }
        }
    }

    /// Find a vector by plain name (no range suffix)
    pub fn find(&self, name: &str) -> Option<VectorHandle> {
        let parsed = self.parse_name(name).ok()?;
        let vectors = self.vectors.read();
        if let Some(found) = vectors.get(&parsed.qualified()) {
            return Some(found.clone());
        }
        if parsed.is_explicit() || parsed.is_global() {
            return None;
        }
        vectors.get(&parsed.in_global().qualified()).cloned()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Resolve `name` or `name(range)` to a selection
    pub fn lookup(&self, text: &str) -> Result<Selection> {
        self.lookup_with(text, None)
    }

    /// `lookup` with a fallback evaluator for non-literal indices
    pub fn lookup_with(
        &self,
        text: &str,
        evaluator: Option<&dyn IndexEvaluator>,
    ) -> Result<Selection> {
        let (selection, consumed) = self.parse_element(text, evaluator)?;
        if consumed != text.len() {
            return Err(VectorError::TrailingChars(text.to_string()));
        }
        Ok(selection)
    }

    /// Scan a vector reference at the start of `text`.
    ///
    /// Returns the selection and the number of bytes consumed.
    pub fn parse_element(
        &self,
        text: &str,
        evaluator: Option<&dyn IndexEvaluator>,
    ) -> Result<(Selection, usize)> {
        let name_end = text
            .char_indices()
            .find(|(_, ch)| !is_vector_char(*ch))
            .map_or(text.len(), |(i, _)| i);
        let name = &text[..name_end];
        let vector = self
            .find(name)
            .ok_or_else(|| VectorError::NotFound(name.to_string()))?;

        if !text[name_end..].starts_with('(') {
            return Ok((Selection::full(vector), name_end));
        }

        let close = matching_paren(&text[name_end..])
            .ok_or_else(|| VectorError::TrailingChars(text.to_string()))?;
        let token = &text[name_end + 1..name_end + close];

        let window = {
            let specials = self.specials.read();
            let mut resolver = IndexResolver::new(&specials);
            if let Some(evaluator) = evaluator {
                resolver = resolver.with_evaluator(evaluator);
            }
            let guard = vector.read();
            resolver.resolve_window(guard.store(), token, IndexMode::RANGE)?
        };
        trace!(vector = name, first = window.first(), last = window.last(), "selection");
        Ok((Selection { vector, window }, name_end + close + 1))
    }

    /// Destroy a vector by name
    pub fn destroy(&self, name: &str) -> Result<()> {
        let vector = self
            .find(name)
            .ok_or_else(|| VectorError::NotFound(name.to_string()))?;
        self.destroy_handle(&vector)
    }

    /// Remove `vector` from the table and send its `Destroyed` notification.
    ///
    /// Fails if the vector was already destroyed or is pinned.
    pub fn destroy_handle(&self, vector: &VectorHandle) -> Result<()> {
        let key = vector.name();
        if self.protected.read().contains(&key) {
            return Err(VectorError::ProtectedEntity(key));
        }
        {
            let mut vectors = self.vectors.write();
            match vectors.get(&key) {
                Some(registered) if registered.ptr_eq(vector) => {
                    vectors.remove(&key);
                }
                _ => return Err(VectorError::NotFound(key)),
            }
        }
        vector.destroy();
        info!(vector = %key, "vector destroyed");
        Ok(())
    }

    /// Protect a vector from `destroy`
    pub fn pin(&self, name: &str) -> Result<()> {
        let vector = self
            .find(name)
            .ok_or_else(|| VectorError::NotFound(name.to_string()))?;
        self.protected.write().insert(vector.name());
        Ok(())
    }

    pub fn unpin(&self, name: &str) -> bool {
        match self.find(name) {
            Some(vector) => self.protected.write().remove(&vector.name()),
            None => false,
        }
    }

    /// Destroy every vector, pinned or not
    pub fn clear(&self) {
        let drained: Vec<(String, VectorHandle)> = self.vectors.write().drain().collect();
        self.protected.write().clear();
        let count = drained.len();
        for (_, vector) in drained {
            vector.destroy();
        }
        if count > 0 {
            info!(count, "registry cleared");
        }
    }

    // ------------------------------------------------------------------------
    // Enumeration
    // ------------------------------------------------------------------------

    /// Qualified names, optionally filtered by a glob pattern.
    ///
    /// A pattern matches either the qualified name or the bare tail.
    /// Order is unspecified.
    pub fn names(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let pattern = pattern
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| VectorError::BadPattern {
                    pattern: p.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let vectors = self.vectors.read();
        let names = vectors
            .iter()
            .filter(|(key, vector)| match &pattern {
                None => true,
                Some(p) => {
                    p.matches(key) || vector.try_read().is_some_and(|v| p.matches(v.name.tail()))
                }
            })
            .map(|(key, _)| key.clone())
            .collect();
        Ok(names)
    }

    // ------------------------------------------------------------------------
    // Copying and clients
    // ------------------------------------------------------------------------

    /// Replace `dest` with the selected values of `src`, including offset.
    ///
    /// The source values are staged before `dest` is locked, so `src` and
    /// `dest` may be the same vector.
    pub fn duplicate(&self, dest: &VectorHandle, src: &Selection) -> Result<()> {
        let (staged, offset) = {
            let guard = src.vector.read();
            (guard.store().window(src.window).to_vec(), guard.store().offset())
        };
        dest.update(|store| {
            store.copy_from(&staged)?;
            store.set_offset(offset);
            Ok(())
        })
    }

    /// Subscribe a new client to the vector called `name`
    pub fn alloc_client(&self, name: &str) -> Result<Client> {
        let vector = self
            .find(name)
            .ok_or_else(|| VectorError::NotFound(name.to_string()))?;
        Ok(vector.subscribe(None))
    }
}

impl Drop for VectorRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for VectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorRegistry")
            .field("vectors", &self.len())
            .field("namespace", &*self.namespace.read())
            .field("idle", &self.idle)
            .finish()
    }
}

/// Split `name(size)` / `name(first:last)` into name and sizing
fn split_create_spec(spec: &str) -> Result<(&str, CreateSpec)> {
    let bad = || VectorError::BadSpecification(spec.to_string());
    let (open, close) = (spec.find('('), spec.find(')'));
    let (open, close) = match (open, close) {
        (None, None) => return Ok((spec, CreateSpec::default())),
        (Some(open), Some(close)) if open < close => (open, close),
        _ => return Err(bad()),
    };
    if close + 1 != spec.len() {
        return Err(VectorError::TrailingChars(spec.to_string()));
    }

    let inner = &spec[open + 1..close];
    let parse = |s: &str| s.trim().parse::<i64>().map_err(|_| VectorError::BadIndex(s.to_string()));
    let create = match inner.split_once(':') {
        Some((first, last)) => {
            let first = parse(first)?;
            let size = if last.is_empty() {
                0
            } else {
                let last = parse(last)?;
                if first > last {
                    return Err(VectorError::InvalidRange(spec.to_string()));
                }
                usize::try_from(last - first + 1).map_err(|_| bad())?
            };
            CreateSpec {
                size,
                offset: Some(first),
            }
        }
        None => {
            let size = usize::try_from(parse(inner)?).map_err(|_| bad())?;
            CreateSpec { size, offset: None }
        }
    };
    Ok((&spec[..open], create))
}

/// Byte index of the parenthesis closing the one at `text[0]`
fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
