//! Open file views
//!
//! A view exists once its formatted source has been fetched. Concurrent
//! opens of the same file share a single fetch; every caller receives the
//! same handle, in the order they asked.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use uuid::Uuid;

use lookout_utils::{LookoutError, Result};

use crate::connection::SourceFetcher;
use crate::view::View;

/// Handle to an open file view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewHandle {
    id: Uuid,
    filepath: String,
}

impl ViewHandle {
    fn new(filepath: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            filepath: filepath.to_string(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn filepath(&self) -> &str {
        &self.filepath
    }
}

// ==================== Recent Files ====================

/// Most recently opened files, newest first
#[derive(Debug, Clone)]
pub struct RecentFiles {
    capacity: usize,
    paths: VecDeque<String>,
}

impl RecentFiles {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            paths: VecDeque::new(),
        }
    }

    /// Move a path to the front, dropping the oldest past capacity
    pub fn touch(&mut self, filepath: &str) {
        self.paths.retain(|p| p != filepath);
        self.paths.push_front(filepath.to_string());
        self.paths.truncate(self.capacity);
    }

    pub fn list(&self) -> Vec<String> {
        self.paths.iter().cloned().collect()
    }
}

// ==================== Registry ====================

type Waiter = oneshot::Sender<Result<ViewHandle>>;

struct Pending {
    generation: u64,
    waiters: Vec<Waiter>,
}

struct Inner {
    handles: HashMap<String, ViewHandle>,
    /// Open order, for listing
    order: Vec<String>,
    in_flight: HashMap<String, Pending>,
    active: Option<String>,
    recent: RecentFiles,
    /// Bumped by `clear`; fetches started under an older value are discarded
    generation: u64,
}

enum Attached {
    Ready(ViewHandle),
    Pending(oneshot::Receiver<Result<ViewHandle>>),
}

/// Filepath-keyed table of open views
#[derive(Clone)]
pub struct ViewRegistry {
    inner: Arc<Mutex<Inner>>,
    fetcher: Arc<dyn SourceFetcher>,
    view: Arc<dyn View>,
}

impl ViewRegistry {
    pub fn new(fetcher: Arc<dyn SourceFetcher>, view: Arc<dyn View>, recent_files: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                handles: HashMap::new(),
                order: Vec::new(),
                in_flight: HashMap::new(),
                active: None,
                recent: RecentFiles::new(recent_files),
                generation: 0,
            })),
            fetcher,
            view,
        }
    }

    /// Open a view for `filepath`, or join the open already under way.
    ///
    /// The request is registered when this is called, not when the returned
    /// future is first polled. Must be called within a tokio runtime.
    pub fn open(&self, filepath: &str) -> impl Future<Output = Result<ViewHandle>> + Send + 'static {
        let attached = self.attach(filepath);
        let filepath = filepath.to_string();
        async move {
            match attached {
                Attached::Ready(handle) => Ok(handle),
                Attached::Pending(rx) => rx.await.map_err(|_| LookoutError::ViewOpenFailed {
                    filepath,
                    reason: "open abandoned".into(),
                })?,
            }
        }
    }

    fn attach(&self, filepath: &str) -> Attached {
        let (tx, rx) = oneshot::channel();
        let generation = {
            let mut inner = self.inner.lock();
            if let Some(handle) = inner.handles.get(filepath) {
                return Attached::Ready(handle.clone());
            }
            if let Some(pending) = inner.in_flight.get_mut(filepath) {
                tracing::trace!(filepath, "Joining in-flight view open");
                pending.waiters.push(tx);
                return Attached::Pending(rx);
            }
            let generation = inner.generation;
            inner.in_flight.insert(
                filepath.to_string(),
                Pending {
                    generation,
                    waiters: vec![tx],
                },
            );
            generation
        };

        tracing::debug!(filepath, generation, "Fetching source for new view");
        let registry = self.clone();
        let filepath = filepath.to_string();
        tokio::spawn(async move {
            // A panicking fetch must still release the in-flight entry
            let fetch = {
                let fetcher = registry.fetcher.clone();
                let filepath = filepath.clone();
                tokio::spawn(async move { fetcher.fetch_source(&filepath).await })
            };
            let result = match fetch.await {
                Ok(result) => result,
                Err(e) => Err(LookoutError::internal(format!("source fetch task failed: {}", e))),
            };
            registry.complete(&filepath, generation, result);
        });

        Attached::Pending(rx)
    }

    /// Take the waiters of an open, unless it was abandoned by `clear`
    fn take_pending(inner: &mut Inner, filepath: &str, generation: u64) -> Option<Vec<Waiter>> {
        match inner.in_flight.get(filepath) {
            Some(pending) if pending.generation == generation => {
                inner.in_flight.remove(filepath).map(|pending| pending.waiters)
            }
            _ => None,
        }
    }

    fn complete(&self, filepath: &str, generation: u64, result: Result<String>) {
        match result {
            Ok(content) => {
                let handle = ViewHandle::new(filepath);
                let waiters = {
                    let mut inner = self.inner.lock();
                    let Some(waiters) = Self::take_pending(&mut inner, filepath, generation) else {
                        tracing::debug!(filepath, generation, "Discarding source fetched before a reset");
                        return;
                    };
                    inner.handles.insert(filepath.to_string(), handle.clone());
                    inner.order.push(filepath.to_string());
                    inner.active = Some(filepath.to_string());
                    inner.recent.touch(filepath);
                    waiters
                };
                self.view.open_view(filepath, &content);
                self.view.activate_view(filepath);

                for waiter in waiters {
                    let _ = waiter.send(Ok(handle.clone()));
                }
            }
            Err(e) => {
                let taken = Self::take_pending(&mut self.inner.lock(), filepath, generation);
                let Some(waiters) = taken else {
                    tracing::debug!(filepath, error = %e, "Ignoring failed open from before a reset");
                    return;
                };
                tracing::warn!(filepath, error = %e, "Failed to open view");
                let reason = e.to_string();

                self.view
                    .show_feedback(&format!("Could not open {}: {}", filepath, reason));
                for waiter in waiters {
                    let _ = waiter.send(Err(LookoutError::ViewOpenFailed {
                        filepath: filepath.to_string(),
                        reason: reason.clone(),
                    }));
                }
            }
        }
    }

    /// The handle for `filepath`, if its view is open
    pub fn has(&self, filepath: &str) -> Option<ViewHandle> {
        self.inner.lock().handles.get(filepath).cloned()
    }

    pub fn is_opening(&self, filepath: &str) -> bool {
        self.inner.lock().in_flight.contains_key(filepath)
    }

    /// Close the view for `filepath`.
    ///
    /// Returns false if nothing was closed. A path whose open is still in
    /// flight is left alone.
    pub fn close(&self, filepath: &str) -> bool {
        let was_active = {
            let mut inner = self.inner.lock();
            if inner.in_flight.contains_key(filepath) {
                tracing::debug!(filepath, "Ignoring close of a view still opening");
                return false;
            }
            if inner.handles.remove(filepath).is_none() {
                return false;
            }
            inner.order.retain(|p| p != filepath);

            let was_active = inner.active.as_deref() == Some(filepath);
            if was_active {
                inner.active = inner.order.first().cloned();
            }
            was_active
        };

        self.view.close_view(filepath);
        if was_active {
            self.view.activate_first_view();
        }
        true
    }

    /// Close every view and abandon the opens still in flight.
    ///
    /// Callers waiting on an abandoned open get `ViewOpenFailed`; its fetch
    /// result is discarded when it arrives. Recent files are kept.
    pub fn clear(&self) {
        let (closed, abandoned) = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.handles.clear();
            inner.active = None;
            let abandoned = inner.in_flight.drain().count();
            (std::mem::take(&mut inner.order), abandoned)
        };

        if abandoned > 0 {
            tracing::debug!(abandoned, "Abandoned in-flight view opens");
        }
        for filepath in &closed {
            self.view.close_view(filepath);
        }
    }

    /// Make an open view the active one
    pub fn activate(&self, filepath: &str) -> bool {
        {
            let mut inner = self.inner.lock();
            if !inner.handles.contains_key(filepath) {
                return false;
            }
            inner.active = Some(filepath.to_string());
        }
        self.view.activate_view(filepath);
        true
    }

    pub fn active(&self) -> Option<String> {
        self.inner.lock().active.clone()
    }

    /// Paths of open views, in the order they were opened
    pub fn open_paths(&self) -> Vec<String> {
        self.inner.lock().order.clone()
    }

    pub fn recent(&self) -> Vec<String> {
        self.inner.lock().recent.list()
    }

    /// Re-fetch the content of an open view.
    ///
    /// Returns false if the file has no view.
    pub async fn refresh(&self, filepath: &str) -> Result<bool> {
        if self.has(filepath).is_none() {
            return Ok(false);
        }

        match self.fetcher.fetch_source(filepath).await {
            Ok(content) => {
                // The view may have been closed while fetching
                if self.has(filepath).is_none() {
                    return Ok(false);
                }
                self.view.replace_content(filepath, &content);
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(filepath, error = %e, "Failed to refresh view");
                self.view
                    .show_feedback(&format!("Could not reload {}: {}", filepath, e));
                Err(e)
            }
        }
    }
}
