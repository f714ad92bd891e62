//! Per-family fetch controller.
//!
//! A [`FetchController`] owns one family's filter and state. Every
//! [`FetchController::apply`] cancels the request before it, issues a new
//! one under a fresh [`RequestId`] and returns immediately; the response is
//! applied from a spawned task only if its id is still the live one.
//! Cancellation drops the in-flight future, but correctness never depends
//! on it: a response that races past its cancellation is still rejected by
//! the id check.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use geostats_stats_models::ViewMode;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{Family, FetchError, FetchFailure, StatsSource};

/// Monotonically increasing id of one issued request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// The id following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Raw counter value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a family's data.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "lowercase")]
pub enum FetchStatus {
    /// Nothing requested, or the last request was cancelled.
    #[default]
    Idle,
    /// A request is in flight.
    Loading,
    /// The last request succeeded.
    Ready,
    /// The last request failed; `data` still holds the last good dataset.
    Error,
}

/// Snapshot of one family's state.
#[derive(Debug, Clone, Default)]
pub struct FetchState<D> {
    /// Lifecycle status.
    pub status: FetchStatus,
    /// Last successfully fetched dataset.
    pub data: D,
    /// Failure of the last request, when `status` is [`FetchStatus::Error`].
    pub error: Option<FetchFailure>,
    /// Id of the most recently issued request.
    pub request_id: RequestId,
}

/// What happened to a response handed to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Resolution {
    /// The response was live and its data is now current.
    Applied,
    /// The response was live and its error is now current.
    Failed,
    /// A newer request superseded this one; the response was discarded.
    Stale,
    /// The response only reported a cancellation; nothing surfaced.
    Cancelled,
}

/// Anything a view-mode switch can cancel.
pub trait Cancellable: Send + Sync {
    /// The view mode this belongs to.
    fn view_mode(&self) -> ViewMode;

    /// Cancels any in-flight work.
    fn cancel(&self);
}

struct Inner<Filter> {
    filter: Filter,
    request_id: RequestId,
    in_flight: Option<CancellationToken>,
}

struct Shared<F: Family> {
    family: F,
    source: Arc<dyn StatsSource>,
    runtime: Handle,
    inner: Mutex<Inner<F::Filter>>,
    state: watch::Sender<FetchState<F::Data>>,
}

impl<F: Family> Shared<F> {
    fn lock(&self) -> MutexGuard<'_, Inner<F::Filter>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, request_id: RequestId, result: Result<F::Data, FetchError>) -> Resolution {
        let mode = self.family.view_mode();
        let mut inner = self.lock();

        if inner.request_id != request_id {
            log::trace!("{mode} request {request_id} superseded, discarding response");
            return Resolution::Stale;
        }
        let Some(token) = inner.in_flight.take() else {
            log::trace!("{mode} request {request_id} already resolved, discarding response");
            return Resolution::Stale;
        };
        token.cancel();

        match result {
            Ok(data) => {
                log::debug!("{mode} request {request_id} applied");
                self.state.send_modify(|state| {
                    state.status = FetchStatus::Ready;
                    state.data = data;
                    state.error = None;
                });
                Resolution::Applied
            }
            Err(error) if error.is_cancelled() => {
                log::trace!("{mode} request {request_id} reported cancellation");
                self.state.send_modify(|state| state.status = FetchStatus::Idle);
                Resolution::Cancelled
            }
            Err(error) => {
                log::warn!("{mode} request {request_id} failed: {error}");
                let failure = FetchFailure::from(&error);
                self.state.send_modify(|state| {
                    state.status = FetchStatus::Error;
                    state.error = Some(failure);
                });
                Resolution::Failed
            }
        }
    }
}

/// Fetch controller of one statistic family.
///
/// Cloning is cheap and clones share state.
pub struct FetchController<F: Family> {
    shared: Arc<Shared<F>>,
}

impl<F: Family> Clone for FetchController<F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F: Family> fmt::Debug for FetchController<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("FetchController")
            .field("view_mode", &self.shared.family.view_mode())
            .field("filter", &inner.filter)
            .field("request_id", &inner.request_id)
            .field("status", &self.shared.state.borrow().status)
            .finish_non_exhaustive()
    }
}

impl<F: Family> FetchController<F> {
    /// Creates an idle controller spawning its requests on the current
    /// tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn new(family: F, source: Arc<dyn StatsSource>, filter: F::Filter) -> Self {
        Self::with_runtime(family, source, filter, Handle::current())
    }

    /// Creates an idle controller spawning its requests on `runtime`.
    #[must_use]
    pub fn with_runtime(
        family: F,
        source: Arc<dyn StatsSource>,
        filter: F::Filter,
        runtime: Handle,
    ) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            shared: Arc::new(Shared {
                family,
                source,
                runtime,
                inner: Mutex::new(Inner {
                    filter,
                    request_id: RequestId::default(),
                    in_flight: None,
                }),
                state,
            }),
        }
    }

    /// The family this controller fetches.
    #[must_use]
    pub fn family(&self) -> &F {
        &self.shared.family
    }

    /// The current filter.
    #[must_use]
    pub fn filter(&self) -> F::Filter {
        self.shared.lock().filter.clone()
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> FetchState<F::Data> {
        self.shared.state.borrow().clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FetchState<F::Data>> {
        self.shared.state.subscribe()
    }

    /// Waits until no request is in flight and returns the state then.
    pub async fn settled(&self) -> FetchState<F::Data> {
        let mut receiver = self.subscribe();
        let settled = match receiver
            .wait_for(|state| state.status != FetchStatus::Loading)
            .await
        {
            Ok(state) => Some(state.clone()),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.state())
    }

    /// Replaces the filter and fetches it, superseding any in-flight
    /// request. Last good data stays visible while loading.
    pub fn apply(&self, filter: F::Filter) -> RequestId {
        self.apply_and_clear(filter, |_| {})
    }

    /// Like [`Self::apply`], but first lets `clear` drop the parts of the
    /// current data the new filter invalidates.
    pub fn apply_and_clear(
        &self,
        filter: F::Filter,
        clear: impl FnOnce(&mut F::Data),
    ) -> RequestId {
        let (request_id, token) = {
            let mut inner = self.shared.lock();
            if let Some(previous) = inner.in_flight.take() {
                previous.cancel();
            }
            let request_id = inner.request_id.next();
            let token = CancellationToken::new();
            inner.request_id = request_id;
            inner.filter = filter.clone();
            inner.in_flight = Some(token.clone());
            self.shared.state.send_modify(|state| {
                clear(&mut state.data);
                state.status = FetchStatus::Loading;
                state.error = None;
                state.request_id = request_id;
            });
            (request_id, token)
        };

        log::debug!(
            "{} request {request_id}: {filter:?}",
            self.shared.family.view_mode()
        );
        self.issue(filter, request_id, token);
        request_id
    }

    /// Re-fetches the current filter.
    pub fn refresh(&self) -> RequestId {
        let filter = self.filter();
        self.apply(filter)
    }

    /// Replaces the filter without fetching. Any in-flight request is
    /// invalidated and the status drops to idle, so the next activation
    /// knows to refresh.
    pub fn stage(&self, filter: F::Filter) {
        self.stage_and_clear(filter, |_| {});
    }

    /// Like [`Self::stage`], but first lets `clear` drop the parts of the
    /// current data the staged filter invalidates.
    pub fn stage_and_clear(&self, filter: F::Filter, clear: impl FnOnce(&mut F::Data)) {
        let mut inner = self.shared.lock();
        if let Some(previous) = inner.in_flight.take() {
            previous.cancel();
        }
        let request_id = inner.request_id.next();
        inner.request_id = request_id;
        inner.filter = filter;
        self.shared.state.send_modify(|state| {
            clear(&mut state.data);
            state.status = FetchStatus::Idle;
            state.error = None;
            state.request_id = request_id;
        });
    }

    /// Hands a response to the controller. The spawned request task calls
    /// this; it is public so transports that resolve elsewhere can too.
    pub fn on_resolve(
        &self,
        request_id: RequestId,
        result: Result<F::Data, FetchError>,
    ) -> Resolution {
        self.shared.resolve(request_id, result)
    }

    fn issue(&self, filter: F::Filter, request_id: RequestId, token: CancellationToken) {
        let shared = Arc::clone(&self.shared);
        self.shared.runtime.spawn(async move {
            let result = tokio::select! {
                biased;
                () = token.cancelled() => {
                    log::trace!(
                        "{} request {request_id} cancelled in flight",
                        shared.family.view_mode()
                    );
                    return;
                }
                result = shared.family.fetch(shared.source.as_ref(), &filter) => result,
            };
            shared.resolve(request_id, result);
        });
    }
}

impl<F: Family> Cancellable for FetchController<F> {
    fn view_mode(&self) -> ViewMode {
        self.shared.family.view_mode()
    }

    /// Cancels the in-flight request, if any. A loading controller drops to
    /// idle; any other status is kept.
    fn cancel(&self) {
        let mut inner = self.shared.lock();
        let request_id = inner.request_id.next();
        inner.request_id = request_id;
        let was_loading = inner.in_flight.take().is_some_and(|token| {
            token.cancel();
            true
        });
        self.shared.state.send_modify(|state| {
            state.request_id = request_id;
            if was_loading {
                state.status = FetchStatus::Idle;
            }
        });
        if was_loading {
            log::debug!(
                "{} request cancelled, now {request_id}",
                self.shared.family.view_mode()
            );
        }
    }
}
