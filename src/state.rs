//! Dashboard view state. Every change goes through [`DashboardState::apply`].

use crate::models::{
    CategoryCompletion, CourseAnalytic, DashboardSnapshot, DashboardStats, EnrollmentTrendPoint,
    StudentPerformance,
};

/// User-facing failure. Transport, timeout and status errors all collapse
/// into one of these two messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DashboardError {
    #[error("Failed to initialize sample data")]
    Initialize,
    #[error("Failed to fetch dashboard data")]
    Fetch,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    /// A request was issued.
    RequestStarted,
    /// A request settled, whatever the outcome.
    RequestSettled,
    InitializeSucceeded,
    InitializeFailed,
    FetchSucceeded(DashboardSnapshot),
    FetchFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Loading,
    Onboarding,
    Dashboard,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    in_flight: usize,
    error: Option<DashboardError>,
    data_initialized: bool,
    snapshot: Option<DashboardSnapshot>,
}

impl DashboardState {
    pub fn apply(mut self, event: StateEvent) -> Self {
        match event {
            StateEvent::RequestStarted => self.in_flight += 1,
            StateEvent::RequestSettled => self.in_flight = self.in_flight.saturating_sub(1),
            StateEvent::InitializeSucceeded => self.data_initialized = true,
            StateEvent::InitializeFailed => self.error = Some(DashboardError::Initialize),
            StateEvent::FetchSucceeded(snapshot) => {
                self.snapshot = Some(snapshot);
                self.error = None;
            }
            StateEvent::FetchFailed => self.error = Some(DashboardError::Fetch),
        }
        self
    }

    pub fn loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn error(&self) -> Option<DashboardError> {
        self.error
    }

    pub fn data_initialized(&self) -> bool {
        self.data_initialized
    }

    pub fn snapshot(&self) -> Option<&DashboardSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn stats(&self) -> Option<&DashboardStats> {
        self.snapshot.as_ref().map(|s| &s.stats)
    }

    pub fn student_performance(&self) -> &[StudentPerformance] {
        self.snapshot
            .as_ref()
            .map(|s| s.student_performance.as_slice())
            .unwrap_or_default()
    }

    pub fn course_analytics(&self) -> &[CourseAnalytic] {
        self.snapshot
            .as_ref()
            .map(|s| s.course_analytics.as_slice())
            .unwrap_or_default()
    }

    pub fn enrollment_trends(&self) -> &[EnrollmentTrendPoint] {
        self.snapshot
            .as_ref()
            .map(|s| s.enrollment_trends.as_slice())
            .unwrap_or_default()
    }

    pub fn completion_by_category(&self) -> &[CategoryCompletion] {
        self.snapshot
            .as_ref()
            .map(|s| s.completion_by_category.as_slice())
            .unwrap_or_default()
    }

    pub fn render_mode(&self) -> RenderMode {
        if self.loading() && !self.data_initialized {
            RenderMode::Loading
        } else if self.error.is_some() && self.stats().is_none() {
            RenderMode::Onboarding
        } else {
            RenderMode::Dashboard
        }
    }
}
