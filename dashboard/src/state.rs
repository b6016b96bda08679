use chrono::{DateTime, Utc};
use gamepulse_core::{DashboardError, DashboardSnapshot, DataStatus, RefreshParameters};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Uninitialized,
    CheckingStatus,
    NotReady,
    Ready(ReadyPhase),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyPhase {
    Idle,
    Loading,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Uninitialized,
    CheckingStatus,
    Settled,
}

/// A snapshot as committed by one refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedSnapshot {
    pub data: Arc<DashboardSnapshot>,
    pub params: RefreshParameters,
    pub sequence: u64,
    pub committed_at: DateTime<Utc>,
}

/// Everything the rendering layer reads. Only the controller mutates it.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub(crate) lifecycle: Lifecycle,
    pub(crate) readiness: DataStatus,
    pub(crate) params: RefreshParameters,
    pub(crate) active_operations: usize,
    pub(crate) error: Option<DashboardError>,
    pub(crate) snapshot: Option<CommittedSnapshot>,
}

impl DashboardState {
    pub(crate) fn new(params: RefreshParameters) -> Self {
        Self {
            lifecycle: Lifecycle::Uninitialized,
            readiness: DataStatus::default(),
            params,
            active_operations: 0,
            error: None,
            snapshot: None,
        }
    }

    pub fn phase(&self) -> ControllerPhase {
        match self.lifecycle {
            Lifecycle::Uninitialized => ControllerPhase::Uninitialized,
            Lifecycle::CheckingStatus => ControllerPhase::CheckingStatus,
            Lifecycle::Settled if !self.readiness.is_ready() => ControllerPhase::NotReady,
            Lifecycle::Settled if self.is_loading() => ControllerPhase::Ready(ReadyPhase::Loading),
            Lifecycle::Settled if self.error.is_some() => ControllerPhase::Ready(ReadyPhase::Error),
            Lifecycle::Settled => ControllerPhase::Ready(ReadyPhase::Idle),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    pub fn is_loading(&self) -> bool {
        self.active_operations > 0
    }

    pub fn readiness(&self) -> &DataStatus {
        &self.readiness
    }

    pub fn params(&self) -> RefreshParameters {
        self.params
    }

    pub fn error(&self) -> Option<&DashboardError> {
        self.error.as_ref()
    }

    pub fn snapshot(&self) -> Option<&CommittedSnapshot> {
        self.snapshot.as_ref()
    }
}

/// Keeps the loading flag raised while alive.
///
/// Dropping the guard, including when the owning future is cancelled,
/// lowers it again. `finish` lowers it in the same publication as a commit.
pub(crate) struct LoadingGuard {
    state: Arc<watch::Sender<DashboardState>>,
    released: bool,
}

impl LoadingGuard {
    pub(crate) fn acquire(state: Arc<watch::Sender<DashboardState>>) -> Self {
        state.send_modify(|s| {
            s.active_operations += 1;
            s.error = None;
        });
        Self {
            state,
            released: false,
        }
    }

    pub(crate) fn finish<F>(mut self, commit: F)
    where
        F: FnOnce(&mut DashboardState),
    {
        self.released = true;
        self.state.send_modify(|s| {
            commit(s);
            s.active_operations = s.active_operations.saturating_sub(1);
        });
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if !self.released {
            self.state.send_modify(|s| {
                s.active_operations = s.active_operations.saturating_sub(1);
            });
        }
    }
}
