//! Shared crawl frontier
//!
//! The frontier is the only authority on what gets crawled. It owns:
//! - The visited map (URL -> depth of first visit), which only grows
//! - The queue of admitted tasks waiting for a worker
//! - The count of workers currently processing a task
//!
//! All three live behind one mutex so that "nothing pending and nobody
//! busy" (quiescence) is observed atomically. Idle workers park on a
//! [`Notify`] and are woken whenever that picture changes.

use crate::url::same_host;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use url::Url;

/// A unit of work: one URL at one depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: Url,
    pub depth: u32,
}

impl CrawlTask {
    pub fn new(url: Url, depth: u32) -> Self {
        Self { url, depth }
    }
}

/// Which hosts the frontier will admit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Follow links to any host
    Any,
    /// Only follow links on the same host as this URL
    SameHost(Url),
}

impl Scope {
    fn contains(&self, url: &Url) -> bool {
        match self {
            Scope::Any => true,
            Scope::SameHost(origin) => same_host(origin, url),
        }
    }
}

#[derive(Debug, Default)]
struct FrontierState {
    visited: HashMap<String, u32>,
    pending: VecDeque<CrawlTask>,
    in_flight: usize,
    closed: bool,
}

/// Thread-safe record of visited and queued URLs
#[derive(Debug)]
pub struct Frontier {
    max_depth: u32,
    scope: Scope,
    state: Mutex<FrontierState>,
    changed: Notify,
}

impl Frontier {
    /// Creates an empty frontier that admits any host
    pub fn new(max_depth: u32) -> Self {
        Self::with_scope(max_depth, Scope::Any)
    }

    /// Creates an empty frontier restricted to `scope`
    pub fn with_scope(max_depth: u32, scope: Scope) -> Self {
        Self {
            max_depth,
            scope,
            state: Mutex::new(FrontierState::default()),
            changed: Notify::new(),
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    // The critical sections below never panic midway, so a poisoned lock
    // still guards consistent state.
    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically checks and marks `url` as visited at `depth`
    ///
    /// Returns true exactly once per URL for the lifetime of the frontier;
    /// the caller that gets `true` owns dispatching it (see [`enqueue`]).
    /// URLs deeper than `max_depth` or outside the scope are rejected
    /// without being marked, since another path may reach them legitimately.
    ///
    /// [`enqueue`]: Frontier::enqueue
    pub fn admit(&self, url: &Url, depth: u32) -> bool {
        if depth > self.max_depth || !self.scope.contains(url) {
            return false;
        }

        let mut state = self.lock();
        if state.visited.contains_key(url.as_str()) {
            return false;
        }
        state.visited.insert(url.to_string(), depth);
        true
    }

    /// Marks a URL visited without queuing it or applying depth/scope rules
    ///
    /// Used when rehydrating from storage: anything already stored has been
    /// fetched and must never be fetched again. Returns false if the URL was
    /// already known, in which case its first depth is kept.
    pub fn mark_visited(&self, url: &str, depth: u32) -> bool {
        let mut state = self.lock();
        if state.visited.contains_key(url) {
            return false;
        }
        state.visited.insert(url.to_string(), depth);
        true
    }

    /// Queues an admitted task for dispatch and wakes idle workers
    pub fn enqueue(&self, task: CrawlTask) {
        {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            debug_assert!(state.visited.contains_key(task.url.as_str()));
            state.pending.push_back(task);
        }
        self.changed.notify_waiters();
    }

    /// Admits and queues in one call; returns whether the URL was new
    pub fn admit_and_enqueue(&self, url: Url, depth: u32) -> bool {
        if self.admit(&url, depth) {
            self.enqueue(CrawlTask::new(url, depth));
            true
        } else {
            false
        }
    }

    /// Waits for the next task
    ///
    /// Returns `None` once the frontier is quiescent (nothing pending and no
    /// claim outstanding) or has been closed. The returned [`Claim`] keeps
    /// the frontier from reporting quiescence until it is dropped.
    pub async fn next(&self) -> Option<Claim<'_>> {
        loop {
            // Register interest before inspecting state so a wakeup sent
            // between the check and the await is not lost
            let changed = self.changed.notified();

            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(task) = state.pending.pop_front() {
                    state.in_flight += 1;
                    return Some(Claim {
                        frontier: self,
                        task,
                    });
                }
                if state.in_flight == 0 {
                    drop(state);
                    // Release every other idle worker as well
                    self.changed.notify_waiters();
                    return None;
                }
            }

            changed.await;
        }
    }

    fn finish(&self) {
        {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.changed.notify_waiters();
    }

    /// Stops dispatching: pending tasks are dropped and `next` returns `None`
    ///
    /// The visited map is left untouched.
    pub fn close(&self) {
        {
            let mut state = self.lock();
            state.closed = true;
            state.pending.clear();
        }
        self.changed.notify_waiters();
    }

    /// Completes once [`close`](Frontier::close) has been called
    pub async fn closed(&self) {
        loop {
            let changed = self.changed.notified();
            if self.lock().closed {
                return;
            }
            changed.await;
        }
    }

    /// True if at least one admitted task is waiting for a worker
    pub fn has_pending(&self) -> bool {
        !self.lock().pending.is_empty()
    }

    /// True if nothing is pending and no worker holds a claim
    pub fn is_quiescent(&self) -> bool {
        let state = self.lock();
        state.closed || (state.pending.is_empty() && state.in_flight == 0)
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn visited_len(&self) -> usize {
        self.lock().visited.len()
    }

    /// Depth at which `url` was first visited
    pub fn depth_of(&self, url: &str) -> Option<u32> {
        self.lock().visited.get(url).copied()
    }
}

/// A dispatched task
///
/// While a claim is alive its worker counts as busy. Dropping it (including
/// on error, panic or task cancellation) marks the worker idle again.
#[derive(Debug)]
pub struct Claim<'a> {
    frontier: &'a Frontier,
    task: CrawlTask,
}

impl Claim<'_> {
    pub fn task(&self) -> &CrawlTask {
        &self.task
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.frontier.finish();
    }
}
