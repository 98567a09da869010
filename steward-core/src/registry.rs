//! Actual-state registry.
//!
//! Maps repository name → [`RepoHandle`]. Handles are created on first
//! reference and live for the life of the process.
//!
//! # Single-flight updates
//!
//! [`RepoHandle::update`] is the only way to change a repository's state. At
//! most one update runs per handle; a concurrent call returns
//! [`UpdateOutcome::Skipped`] immediately instead of waiting. The next poll
//! cycle submits the repository again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::types::ActualRepoState;

/// Result of [`RepoHandle::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The transition ran and its result was committed.
    Applied,
    /// Another transition was in flight; nothing ran.
    Skipped,
}

/// Mutable state of one repository.
#[derive(Debug)]
pub struct RepoHandle {
    name: String,
    busy: AtomicBool,
    state: Mutex<ActualRepoState>,
}

/// Clears the busy flag when the transition finishes, including on panic.
struct Gate<'a>(&'a AtomicBool);

impl Drop for Gate<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RepoHandle {
    pub fn new(name: impl Into<String>, state: ActualRepoState) -> Self {
        Self {
            name: name.into(),
            busy: AtomicBool::new(false),
            state: Mutex::new(state),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clone of the last committed state.
    pub fn snapshot(&self) -> ActualRepoState {
        self.lock_state().clone()
    }

    /// Whether a transition is running right now.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Runs `f` on the current state and commits its result, unless a
    /// transition is already running on this handle.
    pub fn update<F>(&self, f: F) -> UpdateOutcome
    where
        F: FnOnce(ActualRepoState) -> ActualRepoState,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return UpdateOutcome::Skipped;
        }
        let _gate = Gate(&self.busy);

        let next = f(self.snapshot());
        *self.lock_state() = next;
        UpdateOutcome::Applied
    }

    fn lock_state(&self) -> MutexGuard<'_, ActualRepoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// All repositories the controller has seen.
#[derive(Debug, Default)]
pub struct ActualStateRegistry {
    repos: RwLock<HashMap<String, Arc<RepoHandle>>>,
}

impl ActualStateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing handle for `name`, or a new absent one.
    pub fn get_or_create(&self, name: &str) -> Arc<RepoHandle> {
        if let Some(handle) = self.get(name) {
            return handle;
        }
        let mut repos = self.repos.write().unwrap_or_else(PoisonError::into_inner);
        repos
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RepoHandle::new(name, ActualRepoState::absent())))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<RepoHandle>> {
        self.repos
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Seeds the registry with known states. Existing handles are kept.
    pub fn preload<I>(&self, states: I) -> usize
    where
        I: IntoIterator<Item = (String, ActualRepoState)>,
    {
        let mut repos = self.repos.write().unwrap_or_else(PoisonError::into_inner);
        let mut added = 0;
        for (name, state) in states {
            if repos.contains_key(&name) {
                continue;
            }
            let handle = Arc::new(RepoHandle::new(name.clone(), state));
            repos.insert(name, handle);
            added += 1;
        }
        added
    }

    pub fn len(&self) -> usize {
        self.repos.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .repos
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
