use gamepulse_core::{DataSource, DataStatus, LoadRequest, TimePeriod};

/// Inputs the controller reacts to, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    CheckStatus,
    Load(LoadRequest),
    Refresh,
    SetTimePeriod(TimePeriod),
    SetDataSource(DataSource),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotReady,
    UnsupportedSource,
    ShutDown,
    Unchanged,
}

/// How a refresh ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Committed,
    Skipped(SkipReason),
    /// A newer refresh started before this one could commit.
    Superseded,
    /// The controller shut down while this refresh was in flight.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The request named fewer than three files; nothing was sent.
    Skipped,
    /// The backend accepted the files. Carries the follow-up refresh result.
    Loaded(Result<RefreshOutcome, gamepulse_core::DashboardError>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Status(DataStatus),
    Load(LoadOutcome),
    Refresh(RefreshOutcome),
}
