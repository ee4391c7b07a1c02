use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_students: u64,
    pub total_courses: u64,
    pub active_students: u64,
    pub completion_rate: f64,
    #[serde(default)]
    pub total_enrollments: u64,
    #[serde(default)]
    pub average_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentPerformance {
    #[serde(default)]
    pub student_id: Option<String>,
    pub student_name: String,
    #[serde(default)]
    pub courses_enrolled: u32,
    pub courses_completed: u32,
    pub average_score: f64,
    #[serde(default)]
    pub total_study_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseAnalytic {
    pub course_id: String,
    pub course_title: String,
    pub total_enrollments: u64,
    pub completed_enrollments: u64,
    pub completion_rate: f64,
    pub average_score: f64,
    pub average_duration_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentTrendPoint {
    pub month: String,
    pub enrollments: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCompletion {
    pub category: String,
    pub completion_rate: f64,
}

/// One refresh cycle's worth of dashboard data.
///
/// The five collections are only ever produced together by a successful
/// fetch, so holding them in one value keeps a view from mixing cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub stats: DashboardStats,
    pub student_performance: Vec<StudentPerformance>,
    pub course_analytics: Vec<CourseAnalytic>,
    pub enrollment_trends: Vec<EnrollmentTrendPoint>,
    pub completion_by_category: Vec<CategoryCompletion>,
    pub fetched_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_accept_minimal_payload() {
        let stats: DashboardStats = serde_json::from_str(
            r#"{"total_students":1200,"total_courses":8,"active_students":950,"completion_rate":0}"#,
        )
        .unwrap();
        assert_eq!(stats.total_students, 1200);
        assert_eq!(stats.completion_rate, 0.0);
        assert_eq!(stats.total_enrollments, 0);
    }

    #[test]
    fn student_performance_keeps_backend_extras() {
        let json = r#"{
            "student_id": "3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2",
            "student_name": "Avery Lee",
            "courses_enrolled": 4,
            "courses_completed": 3,
            "average_score": 88.4,
            "total_study_hours": 41.5
        }"#;
        let student: StudentPerformance = serde_json::from_str(json).unwrap();
        assert_eq!(student.courses_enrolled, 4);
        assert!(student.student_id.is_some());
        assert!((student.total_study_hours - 41.5).abs() < f64::EPSILON);
    }

    #[test]
    fn ids_are_opaque_strings() {
        let json = r#"[{
            "course_id": "course-101",
            "course_title": "Intro to Data Science",
            "total_enrollments": 20,
            "completed_enrollments": 5,
            "completion_rate": 25.0,
            "average_score": 74.0,
            "average_duration_hours": 30.0
        }]"#;
        let courses: Vec<CourseAnalytic> = serde_json::from_str(json).unwrap();
        assert_eq!(courses[0].course_id, "course-101");

        let student: StudentPerformance = serde_json::from_str(
            r#"{"student_id":"64b7f0c2e1a9","student_name":"Jules Moreno","courses_completed":1,"average_score":70.0}"#,
        )
        .unwrap();
        assert_eq!(student.student_id.as_deref(), Some("64b7f0c2e1a9"));
    }

    #[test]
    fn course_analytic_rejects_missing_fields() {
        let json = r#"{"course_id":"0c22f1f1-9184-4fd4-9b21-28c68a6a89dc","course_title":"Rust"}"#;
        assert!(serde_json::from_str::<CourseAnalytic>(json).is_err());
    }
}
