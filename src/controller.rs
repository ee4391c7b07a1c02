//! Dashboard controller. A newer task of the same kind cancels the older one,
//! and cancelled tasks never write their results.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::{AnalyticsSource, ApiError};
use crate::models::DashboardSnapshot;
use crate::state::{DashboardState, RenderMode, StateEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    Initialize,
    Fetch,
}

struct Inner {
    state: DashboardState,
    initialize_token: Option<CancellationToken>,
    fetch_token: Option<CancellationToken>,
}

impl Inner {
    fn apply(&mut self, event: StateEvent) {
        let current = std::mem::take(&mut self.state);
        self.state = current.apply(event);
    }

    fn slot(&mut self, kind: TaskKind) -> &mut Option<CancellationToken> {
        match kind {
            TaskKind::Initialize => &mut self.initialize_token,
            TaskKind::Fetch => &mut self.fetch_token,
        }
    }
}

struct Shared {
    source: Arc<dyn AnalyticsSource>,
    inner: Mutex<Inner>,
    root: CancellationToken,
}

impl Shared {
    fn begin(self: &Arc<Self>, kind: TaskKind) -> Ticket {
        let token = self.root.child_token();
        let mut inner = self.inner.lock();
        if let Some(previous) = inner.slot(kind).replace(token.clone()) {
            if !previous.is_cancelled() {
                debug!(?kind, "superseding outstanding task");
            }
            previous.cancel();
        }
        inner.apply(StateEvent::RequestStarted);
        Ticket {
            shared: Arc::clone(self),
            token,
            kind,
        }
    }

    /// Applies `event` unless the ticket has been superseded or unmounted.
    fn commit(&self, ticket: &Ticket, event: StateEvent) -> bool {
        let mut inner = self.inner.lock();
        if ticket.token.is_cancelled() {
            debug!(kind = ?ticket.kind, "discarding result of superseded task");
            return false;
        }
        inner.apply(event);
        true
    }
}

/// Marks one request as in flight for as long as it lives.
struct Ticket {
    shared: Arc<Shared>,
    token: CancellationToken,
    kind: TaskKind,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.shared.inner.lock().apply(StateEvent::RequestSettled);
    }
}

pub struct Dashboard {
    shared: Arc<Shared>,
}

impl Dashboard {
    /// Creates the view state and starts the initial fetch.
    ///
    /// Must be called from within a tokio runtime. The returned state already
    /// counts the initial fetch as outstanding, so the first render is the
    /// loading view.
    pub fn mount(source: Arc<dyn AnalyticsSource>) -> (Self, JoinHandle<()>) {
        let dashboard = Self {
            shared: Arc::new(Shared {
                source,
                inner: Mutex::new(Inner {
                    state: DashboardState::default(),
                    initialize_token: None,
                    fetch_token: None,
                }),
                root: CancellationToken::new(),
            }),
        };
        let initial = dashboard.fetch_all_data();
        (dashboard, initial)
    }

    /// Seeds sample data on the backend, then fetches everything once.
    pub fn initialize_data(&self) -> JoinHandle<()> {
        let ticket = self.shared.begin(TaskKind::Initialize);
        tokio::spawn(run_initialize(Arc::clone(&self.shared), ticket))
    }

    /// Fetches the five collections concurrently and applies them as one unit.
    pub fn fetch_all_data(&self) -> JoinHandle<()> {
        let ticket = self.shared.begin(TaskKind::Fetch);
        tokio::spawn(run_fetch(Arc::clone(&self.shared), ticket))
    }

    pub fn state(&self) -> DashboardState {
        self.shared.inner.lock().state.clone()
    }

    pub fn render_mode(&self) -> RenderMode {
        self.shared.inner.lock().state.render_mode()
    }

    /// Cancels every outstanding task. Their results are dropped.
    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.shared.root.cancel();
    }
}

async fn run_initialize(shared: Arc<Shared>, ticket: Ticket) {
    let result = tokio::select! {
        _ = ticket.token.cancelled() => {
            debug!("initialize cancelled before it settled");
            return;
        }
        result = shared.source.initialize_data() => result,
    };

    match result {
        Ok(()) => {
            if !shared.commit(&ticket, StateEvent::InitializeSucceeded) {
                return;
            }
            info!("sample data initialized");
            // The initialize ticket stays alive across the fetch.
            let fetch = shared.begin(TaskKind::Fetch);
            run_fetch(Arc::clone(&shared), fetch).await;
        }
        Err(err) => {
            error!(error = %err, "error initializing data");
            shared.commit(&ticket, StateEvent::InitializeFailed);
        }
    }
}

async fn run_fetch(shared: Arc<Shared>, ticket: Ticket) {
    let result = tokio::select! {
        _ = ticket.token.cancelled() => {
            debug!("fetch cancelled before it settled");
            return;
        }
        result = fetch_snapshot(shared.source.as_ref()) => result,
    };

    match result {
        Ok(snapshot) => {
            let students = snapshot.stats.total_students;
            let courses = snapshot.course_analytics.len();
            if shared.commit(&ticket, StateEvent::FetchSucceeded(snapshot)) {
                info!(students, courses, "dashboard data refreshed");
            }
        }
        Err(err) => {
            error!(error = %err, endpoint = err.endpoint(), "error fetching data");
            if shared.commit(&ticket, StateEvent::FetchFailed)
                && shared.inner.lock().state.stats().is_some()
            {
                warn!("keeping previously loaded dashboard data");
            }
        }
    }
}

/// Issues the five reads together. The first failure fails the whole batch.
pub async fn fetch_snapshot(source: &dyn AnalyticsSource) -> Result<DashboardSnapshot, ApiError> {
    let (stats, student_performance, course_analytics, enrollment_trends, completion_by_category) = tokio::try_join!(
        source.dashboard_stats(),
        source.student_performance(),
        source.course_analytics(),
        source.enrollment_trends(),
        source.completion_by_category(),
    )?;

    Ok(DashboardSnapshot {
        stats,
        student_performance,
        course_analytics,
        enrollment_trends,
        completion_by_category,
        fetched_at: Utc::now(),
    })
}
