use crate::events::{ControllerEvent, EventOutcome, LoadOutcome, RefreshOutcome, SkipReason};
use crate::state::{CommittedSnapshot, DashboardState, Lifecycle, LoadingGuard};
use chrono::Utc;
use gamepulse_client::api::{LOAD_DATA_ENDPOINT, STATUS_ENDPOINT};
use gamepulse_client::DashboardApi;
use gamepulse_core::{
    ApiError, CoreError, DashboardError, DashboardResource, DashboardSnapshot, DataSource,
    DataStatus, ErrorExt, GamePulseConfig, LoadRequest, RefreshParameters, TimePeriod,
};
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Default)]
struct RefreshSlot {
    latest: u64,
    token: Option<CancellationToken>,
}

/// A refresh that has been sequenced and marked as loading but has not
/// fetched anything yet.
pub(crate) struct RefreshTicket {
    sequence: u64,
    params: RefreshParameters,
    token: CancellationToken,
    guard: LoadingGuard,
}

enum Prepared {
    Done(Result<EventOutcome, DashboardError>),
    Refresh(RefreshTicket),
    Deferred(Deferred),
}

enum Deferred {
    CheckStatus,
    Load(LoadRequest),
}

type FetchFailures = Vec<(DashboardResource, CoreError)>;

/// Marks a `POST /load-data` as in flight until dropped.
struct PendingLoad<'a>(&'a AtomicUsize);

impl<'a> PendingLoad<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PendingLoad<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct DashboardController<A: DashboardApi> {
    api: Arc<A>,
    state: Arc<watch::Sender<DashboardState>>,
    slot: Mutex<RefreshSlot>,
    shutdown: CancellationToken,
    fetch_timeout: Duration,
    loads_in_flight: AtomicUsize,
    /// Bumped whenever a load changes readiness, so status responses
    /// requested earlier can be recognised as stale.
    readiness_epoch: AtomicU64,
}

impl<A: DashboardApi + 'static> DashboardController<A> {
    pub fn new(api: Arc<A>, params: RefreshParameters, fetch_timeout: Duration) -> Self {
        let (state, _) = watch::channel(DashboardState::new(params));
        Self {
            api,
            state: Arc::new(state),
            slot: Mutex::new(RefreshSlot::default()),
            shutdown: CancellationToken::new(),
            fetch_timeout,
            loads_in_flight: AtomicUsize::new(0),
            readiness_epoch: AtomicU64::new(0),
        }
    }

    pub fn from_config(api: Arc<A>, config: &GamePulseConfig) -> Self {
        let params = RefreshParameters {
            time_period: config.dashboard.time_period,
            data_source: config.dashboard.data_source,
        };
        Self::new(api, params, config.api.request_timeout())
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    /// A copy of the current state.
    pub fn state(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    pub async fn check_readiness(&self) -> Result<DataStatus, DashboardError> {
        self.observe_readiness().await.map(|(readiness, _)| readiness)
    }

    /// Queries `/status` and returns the readiness the controller now holds,
    /// plus whether this response was applied. A response that raced a data
    /// load is dropped, since the load already settled readiness.
    async fn observe_readiness(&self) -> Result<(DataStatus, bool), DashboardError> {
        self.state.send_if_modified(|s| {
            if s.lifecycle == Lifecycle::Uninitialized {
                s.lifecycle = Lifecycle::CheckingStatus;
                true
            } else {
                false
            }
        });
        let epoch = self.readiness_epoch.load(Ordering::SeqCst);

        match self.timed(STATUS_ENDPOINT, self.api.status()).await {
            Ok(status) => {
                info!(
                    posts = status.posts_loaded,
                    comments = status.comments_loaded,
                    analysis = status.analysis_loaded,
                    "Backend status received"
                );
                let mut applied = false;
                let mut readiness = DataStatus::default();
                self.state.send_modify(|s| {
                    s.lifecycle = Lifecycle::Settled;
                    applied = self.loads_in_flight.load(Ordering::SeqCst) == 0
                        && self.readiness_epoch.load(Ordering::SeqCst) == epoch;
                    if applied {
                        s.readiness = status;
                    }
                    if matches!(s.error, Some(DashboardError::Connectivity { .. })) {
                        s.error = None;
                    }
                    readiness = s.readiness.clone();
                });
                if !applied {
                    debug!("Status response overlapped a data load, keeping loaded readiness");
                }
                Ok((readiness, applied))
            }
            Err(cause) => {
                let error = DashboardError::connectivity(&cause);
                error.log_error();
                let surfaced = error.clone();
                self.state.send_modify(|s| {
                    s.lifecycle = Lifecycle::Settled;
                    s.error = Some(surfaced);
                });
                Err(error)
            }
        }
    }

    /// Re-checks readiness every `every` while the backend has no data.
    ///
    /// Stops as soon as the controller is ready. Refreshes once, and only
    /// when one of its own status checks saw the backend become ready; a
    /// refresh that then fails is not retried.
    pub async fn poll_until_ready(&self, every: Duration) -> Result<RefreshOutcome, DashboardError> {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            if self.is_ready() {
                debug!("Backend ready, status poll stopped");
                return Ok(RefreshOutcome::Skipped(SkipReason::Unchanged));
            }
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(RefreshOutcome::Skipped(SkipReason::ShutDown));
                }
                _ = ticker.tick() => {}
            }
            if self.is_ready() {
                continue;
            }

            if let Ok((readiness, true)) = self.observe_readiness().await {
                if readiness.is_ready() {
                    info!("Status poll found backend data");
                    return self.refresh_all().await;
                }
            }
        }
    }

    /// Checks readiness and, when the backend already holds data, fetches
    /// the first snapshot.
    pub async fn start(&self) -> Result<RefreshOutcome, DashboardError> {
        let status = self.check_readiness().await?;
        if status.is_ready() {
            self.refresh_all().await
        } else {
            info!("Backend has no data loaded yet");
            Ok(RefreshOutcome::Skipped(SkipReason::NotReady))
        }
    }

    pub async fn load_data(&self, request: &LoadRequest) -> Result<LoadOutcome, DashboardError> {
        if !request.is_complete() {
            debug!("Load request is missing a file path, nothing sent");
            return Ok(LoadOutcome::Skipped);
        }

        let pending = PendingLoad::start(&self.loads_in_flight);
        let guard = LoadingGuard::acquire(self.state.clone());
        info!(
            posts = %request.posts_file,
            comments = %request.comments_file,
            analysis = %request.analysis_file,
            "Loading source data"
        );

        match self.api.load_data(request).await {
            Ok(()) => {
                self.readiness_epoch.fetch_add(1, Ordering::SeqCst);
                self.state.send_modify(|s| {
                    s.lifecycle = Lifecycle::Settled;
                    s.readiness = DataStatus::fully_loaded();
                });
                let refreshed = self.refresh_all().await;
                drop(guard);
                drop(pending);
                Ok(LoadOutcome::Loaded(refreshed))
            }
            Err(cause) => {
                debug!(endpoint = LOAD_DATA_ENDPOINT, "Load request failed");
                let error = DashboardError::load_failed(&cause);
                error.log_error();
                let surfaced = error.clone();
                guard.finish(|s| s.error = Some(surfaced));
                Err(error)
            }
        }
    }

    /// Fetches all six views for the current parameters and commits them
    /// as one snapshot, or surfaces one error and keeps the old snapshot.
    pub async fn refresh_all(&self) -> Result<RefreshOutcome, DashboardError> {
        match self.begin_refresh() {
            Ok(ticket) => self.run_refresh(ticket).await,
            Err(reason) => Ok(RefreshOutcome::Skipped(reason)),
        }
    }

    pub async fn set_time_period(&self, period: TimePeriod) -> Result<RefreshOutcome, DashboardError> {
        if !self.apply_time_period(period) {
            return Ok(RefreshOutcome::Skipped(SkipReason::Unchanged));
        }
        self.refresh_all().await
    }

    pub async fn set_data_source(&self, source: DataSource) -> Result<RefreshOutcome, DashboardError> {
        if !self.apply_data_source(source)? {
            return Ok(RefreshOutcome::Skipped(SkipReason::Unchanged));
        }
        self.refresh_all().await
    }

    pub async fn handle(&self, event: ControllerEvent) -> Result<EventOutcome, DashboardError> {
        match self.prepare(event) {
            Prepared::Done(result) => result,
            Prepared::Refresh(ticket) => self.run_refresh(ticket).await.map(EventOutcome::Refresh),
            Prepared::Deferred(deferred) => self.run_deferred(deferred).await,
        }
    }

    /// Consumes events until the channel closes or the controller shuts down.
    ///
    /// Parameter changes and refresh sequencing are applied before the next
    /// event is read; network work runs on spawned tasks so a later event can
    /// supersede a refresh that is still in flight.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<ControllerEvent>) {
        info!("Dashboard controller event loop started");
        loop {
            let event = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            debug!(?event, "Controller event received");

            match self.prepare(event) {
                Prepared::Done(result) => log_outcome(&result),
                Prepared::Refresh(ticket) => {
                    let controller = Arc::clone(&self);
                    tokio::spawn(async move {
                        let result = controller.run_refresh(ticket).await;
                        log_outcome(&result.map(EventOutcome::Refresh));
                    });
                }
                Prepared::Deferred(deferred) => {
                    let controller = Arc::clone(&self);
                    tokio::spawn(async move {
                        let result = controller.run_deferred(deferred).await;
                        log_outcome(&result);
                    });
                }
            }
        }
        info!("Dashboard controller event loop stopped");
    }

    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Shutting down dashboard controller");
            self.shutdown.cancel();
        }
    }

    fn prepare(&self, event: ControllerEvent) -> Prepared {
        match event {
            ControllerEvent::CheckStatus => Prepared::Deferred(Deferred::CheckStatus),
            ControllerEvent::Load(request) => Prepared::Deferred(Deferred::Load(request)),
            ControllerEvent::Refresh => self.prepare_refresh(),
            ControllerEvent::SetTimePeriod(period) => {
                if self.apply_time_period(period) {
                    self.prepare_refresh()
                } else {
                    Prepared::Done(Ok(EventOutcome::Refresh(RefreshOutcome::Skipped(
                        SkipReason::Unchanged,
                    ))))
                }
            }
            ControllerEvent::SetDataSource(source) => match self.apply_data_source(source) {
                Ok(true) => self.prepare_refresh(),
                Ok(false) => Prepared::Done(Ok(EventOutcome::Refresh(RefreshOutcome::Skipped(
                    SkipReason::Unchanged,
                )))),
                Err(error) => Prepared::Done(Err(error)),
            },
        }
    }

    fn prepare_refresh(&self) -> Prepared {
        match self.begin_refresh() {
            Ok(ticket) => Prepared::Refresh(ticket),
            Err(reason) => Prepared::Done(Ok(EventOutcome::Refresh(RefreshOutcome::Skipped(reason)))),
        }
    }

    async fn run_deferred(&self, deferred: Deferred) -> Result<EventOutcome, DashboardError> {
        match deferred {
            Deferred::CheckStatus => self.check_readiness().await.map(EventOutcome::Status),
            Deferred::Load(request) => self.load_data(&request).await.map(EventOutcome::Load),
        }
    }

    fn apply_time_period(&self, period: TimePeriod) -> bool {
        let changed = self.state.send_if_modified(|s| {
            if s.params.time_period == period {
                false
            } else {
                s.params.time_period = period;
                true
            }
        });
        if changed {
            info!(time_period = %period, "Time period changed");
        }
        changed
    }

    fn apply_data_source(&self, source: DataSource) -> Result<bool, DashboardError> {
        if !source.is_supported() {
            let error = DashboardError::UnsupportedSource {
                data_source: source,
            };
            error.log_warn();
            return Err(error);
        }

        let changed = self.state.send_if_modified(|s| {
            if s.params.data_source == source {
                false
            } else {
                s.params.data_source = source;
                true
            }
        });
        if changed {
            info!(data_source = %source, "Data source changed");
        }
        Ok(changed)
    }

    fn is_ready(&self) -> bool {
        self.state.borrow().is_ready()
    }

    fn lock_slot(&self) -> MutexGuard<'_, RefreshSlot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sequences a new refresh and cancels the one before it.
    fn begin_refresh(&self) -> Result<RefreshTicket, SkipReason> {
        if self.shutdown.is_cancelled() {
            return Err(SkipReason::ShutDown);
        }

        let (ready, params) = {
            let state = self.state.borrow();
            (state.is_ready(), state.params())
        };
        if !ready {
            debug!("Refresh skipped, backend not ready");
            return Err(SkipReason::NotReady);
        }
        if !params.data_source.is_supported() {
            return Err(SkipReason::UnsupportedSource);
        }

        let mut slot = self.lock_slot();
        slot.latest += 1;
        let token = self.shutdown.child_token();
        if let Some(previous) = slot.token.replace(token.clone()) {
            previous.cancel();
        }
        let guard = LoadingGuard::acquire(self.state.clone());

        Ok(RefreshTicket {
            sequence: slot.latest,
            params,
            token,
            guard,
        })
    }

    async fn run_refresh(&self, ticket: RefreshTicket) -> Result<RefreshOutcome, DashboardError> {
        let RefreshTicket {
            sequence,
            params,
            token,
            guard,
        } = ticket;
        info!(
            sequence,
            time_period = %params.time_period,
            data_source = %params.data_source,
            "Refreshing dashboard"
        );

        let fetched = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(self.interrupted(sequence)),
            fetched = self.fetch_snapshot(params.time_period) => fetched,
        };

        self.commit(sequence, params, fetched, guard)
    }

    fn interrupted(&self, sequence: u64) -> RefreshOutcome {
        if self.shutdown.is_cancelled() {
            info!(sequence, "Refresh cancelled by shutdown");
            RefreshOutcome::Cancelled
        } else {
            debug!(sequence, "Refresh superseded");
            RefreshOutcome::Superseded
        }
    }

    fn commit(
        &self,
        sequence: u64,
        params: RefreshParameters,
        fetched: Result<DashboardSnapshot, FetchFailures>,
        guard: LoadingGuard,
    ) -> Result<RefreshOutcome, DashboardError> {
        let mut slot = self.lock_slot();
        if slot.latest != sequence || self.shutdown.is_cancelled() {
            drop(guard);
            return Ok(self.interrupted(sequence));
        }
        slot.token = None;

        match fetched {
            Ok(mut snapshot) => {
                if !snapshot.is_sentiment_ordered() {
                    warn!(sequence, "Sentiment series arrived out of order, sorting by timestamp");
                    snapshot.sentiment_series.sort_by_key(|point| point.timestamp);
                }
                let committed = CommittedSnapshot {
                    data: Arc::new(snapshot),
                    params,
                    sequence,
                    committed_at: Utc::now(),
                };
                guard.finish(|s| {
                    s.snapshot = Some(committed);
                    s.error = None;
                });
                info!(sequence, "Dashboard snapshot committed");
                Ok(RefreshOutcome::Committed)
            }
            Err(failures) => {
                for (resource, cause) in &failures {
                    warn!(sequence, resource = %resource, "Fetch failed: {}", cause);
                }
                let error = DashboardError::refresh_failed(&failures);
                error.log_error();
                let surfaced = error.clone();
                guard.finish(|s| s.error = Some(surfaced));
                Err(error)
            }
        }
    }

    async fn fetch_snapshot(&self, period: TimePeriod) -> Result<DashboardSnapshot, FetchFailures> {
        let api = self.api.as_ref();
        let (trending, sentiment, comments, themes, wordcloud, insights) = tokio::join!(
            self.fetch(DashboardResource::TrendingTopics, api.trending_topics()),
            self.fetch(
                DashboardResource::SentimentOverTime,
                api.sentiment_over_time(period)
            ),
            self.fetch(DashboardResource::TopComments, api.top_comments()),
            self.fetch(DashboardResource::ThemeDistribution, api.theme_distribution()),
            self.fetch(DashboardResource::Wordcloud, api.wordcloud()),
            self.fetch(DashboardResource::DeveloperInsights, api.developer_insights()),
        );

        let mut failures = FetchFailures::new();
        let snapshot = DashboardSnapshot {
            trending_topics: settle(DashboardResource::TrendingTopics, trending, &mut failures),
            sentiment_series: settle(DashboardResource::SentimentOverTime, sentiment, &mut failures),
            top_comments: settle(DashboardResource::TopComments, comments, &mut failures),
            theme_distribution: settle(DashboardResource::ThemeDistribution, themes, &mut failures),
            wordcloud: settle(DashboardResource::Wordcloud, wordcloud, &mut failures),
            developer_insights: settle(DashboardResource::DeveloperInsights, insights, &mut failures),
        };

        if failures.is_empty() {
            Ok(snapshot)
        } else {
            Err(failures)
        }
    }

    async fn fetch<T, F>(&self, resource: DashboardResource, request: F) -> Result<T, CoreError>
    where
        F: Future<Output = Result<T, CoreError>>,
    {
        self.timed(resource.endpoint(), request).await
    }

    async fn timed<T, F>(&self, endpoint: &str, request: F) -> Result<T, CoreError>
    where
        F: Future<Output = Result<T, CoreError>>,
    {
        match tokio::time::timeout(self.fetch_timeout, request).await {
            Ok(result) => result,
            Err(_) => {
                debug!(endpoint, timeout = ?self.fetch_timeout, "Request deadline expired");
                Err(ApiError::RequestTimeout {
                    endpoint: endpoint.to_string(),
                }
                .into())
            }
        }
    }
}

fn settle<T: Default>(
    resource: DashboardResource,
    result: Result<T, CoreError>,
    failures: &mut FetchFailures,
) -> T {
    result.unwrap_or_else(|error| {
        failures.push((resource, error));
        T::default()
    })
}

fn log_outcome(result: &Result<EventOutcome, DashboardError>) {
    match result {
        Ok(outcome) => debug!(?outcome, "Controller event handled"),
        Err(error) => warn!("Controller event failed: {}", error.user_friendly_message()),
    }
}

impl<A: DashboardApi> Drop for DashboardController<A> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
