//! Scripted [`StatsSource`] for tests.
//!
//! Every call is recorded. Endpoints configured with
//! [`ScriptedSource::respond_with`] answer immediately; every other call
//! parks until the test resolves it through [`ScriptedSource::take`], so
//! the order in which responses arrive is entirely under test control.

use std::sync::{Mutex, PoisonError};

use geostats_stats_models::{AdminCode, CrimeFilter, IndicatorFilter, StatRow};
use strum_macros::Display;
use tokio::sync::{Notify, oneshot};

use crate::{FetchError, StatsSource};

/// Which endpoint a call hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Endpoint {
    /// [`StatsSource::crime_by_year`]
    CrimeByYear,
    /// [`StatsSource::crime_by_department`]
    CrimeByDepartment,
    /// [`StatsSource::crime_by_month`]
    CrimeByMonth,
    /// [`StatsSource::crime_by_municipality`]
    CrimeByMunicipality,
    /// [`StatsSource::fundamental_indicator`]
    Fundamental,
    /// [`StatsSource::primary_indicator`]
    Primary,
}

/// What a call asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    /// Endpoint hit.
    pub endpoint: Endpoint,
    /// Crime filter, for crime endpoints.
    pub crime: Option<CrimeFilter>,
    /// Indicator filter, for indicator endpoints.
    pub indicator: Option<IndicatorFilter>,
    /// Year argument of [`StatsSource::crime_by_month`].
    pub year: Option<i32>,
    /// Department argument of [`StatsSource::crime_by_municipality`].
    pub department: Option<AdminCode>,
}

type Reply = Result<Vec<StatRow>, FetchError>;

/// A parked call waiting for the test to answer it.
pub struct Pending {
    /// The call being answered.
    pub call: CallRecord,
    sender: oneshot::Sender<Reply>,
}

impl Pending {
    /// Answers the call with `rows`. Returns `false` if the caller already
    /// gave up (its future was dropped).
    pub fn resolve(self, rows: Vec<StatRow>) -> bool {
        self.sender.send(Ok(rows)).is_ok()
    }

    /// Answers the call with `error`.
    pub fn fail(self, error: FetchError) -> bool {
        self.sender.send(Err(error)).is_ok()
    }
}

#[derive(Default)]
struct Script {
    calls: Vec<CallRecord>,
    pending: Vec<Pending>,
    immediate: Vec<(Endpoint, Vec<StatRow>)>,
}

/// A [`StatsSource`] driven by the test.
#[derive(Default)]
pub struct ScriptedSource {
    script: Mutex<Script>,
    notify: Notify,
}

impl ScriptedSource {
    /// Creates a source where every call parks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every future call to `endpoint` answer `rows` immediately.
    pub fn respond_with(&self, endpoint: Endpoint, rows: Vec<StatRow>) {
        let mut script = self.lock();
        script.immediate.retain(|(e, _)| *e != endpoint);
        script.immediate.push((endpoint, rows));
    }

    /// Every call made so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<CallRecord> {
        self.lock().calls.clone()
    }

    /// Takes the oldest parked call to `endpoint`.
    #[must_use]
    pub fn take(&self, endpoint: Endpoint) -> Option<Pending> {
        let mut script = self.lock();
        let index = script
            .pending
            .iter()
            .position(|p| p.call.endpoint == endpoint)?;
        Some(script.pending.remove(index))
    }

    /// Waits until at least `count` calls have been made.
    pub async fn wait_for_calls(&self, count: usize) {
        loop {
            let notified = self.notify.notified();
            if self.lock().calls.len() >= count {
                return;
            }
            notified.await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn call(&self, call: CallRecord) -> Reply {
        let receiver = {
            let mut script = self.lock();
            script.calls.push(call.clone());
            let immediate = script
                .immediate
                .iter()
                .find(|(e, _)| *e == call.endpoint)
                .map(|(_, rows)| rows.clone());
            if let Some(rows) = immediate {
                drop(script);
                self.notify.notify_waiters();
                return Ok(rows);
            }
            let (sender, receiver) = oneshot::channel();
            script.pending.push(Pending { call, sender });
            receiver
        };
        self.notify.notify_waiters();
        receiver.await.unwrap_or(Err(FetchError::Cancelled))
    }
}

const fn record(endpoint: Endpoint) -> CallRecord {
    CallRecord {
        endpoint,
        crime: None,
        indicator: None,
        year: None,
        department: None,
    }
}

#[async_trait::async_trait]
impl StatsSource for ScriptedSource {
    async fn crime_by_year(&self, filter: &CrimeFilter) -> Reply {
        self.call(CallRecord {
            crime: Some(filter.clone()),
            ..record(Endpoint::CrimeByYear)
        })
        .await
    }

    async fn crime_by_department(&self, filter: &CrimeFilter) -> Reply {
        self.call(CallRecord {
            crime: Some(filter.clone()),
            ..record(Endpoint::CrimeByDepartment)
        })
        .await
    }

    async fn crime_by_month(&self, filter: &CrimeFilter, year: i32) -> Reply {
        self.call(CallRecord {
            crime: Some(filter.clone()),
            year: Some(year),
            ..record(Endpoint::CrimeByMonth)
        })
        .await
    }

    async fn crime_by_municipality(&self, filter: &CrimeFilter, department: AdminCode) -> Reply {
        self.call(CallRecord {
            crime: Some(filter.clone()),
            department: Some(department),
            ..record(Endpoint::CrimeByMunicipality)
        })
        .await
    }

    async fn fundamental_indicator(&self, filter: &IndicatorFilter) -> Reply {
        self.call(CallRecord {
            indicator: Some(filter.clone()),
            ..record(Endpoint::Fundamental)
        })
        .await
    }

    async fn primary_indicator(&self, filter: &IndicatorFilter) -> Reply {
        self.call(CallRecord {
            indicator: Some(filter.clone()),
            ..record(Endpoint::Primary)
        })
        .await
    }
}

/// A row with a code and total, no breakdown.
#[must_use]
pub fn row(code: &str, total: f64) -> StatRow {
    StatRow {
        code: Some(code.into()),
        label: None,
        total,
        breakdown: Vec::new(),
    }
}
