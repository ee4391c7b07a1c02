use std::fmt::Write;
use std::path::Path;

use anyhow::Context;

use crate::models::{CategoryCompletion, CourseAnalytic, EnrollmentTrendPoint, StudentPerformance};
use crate::state::{DashboardState, RenderMode};

const BAR_WIDTH: usize = 40;

pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut output = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            output.push(',');
        }
        output.push(digit);
    }
    output
}

pub fn format_percent(value: f64) -> String {
    format!("{value}%")
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let filled = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(filled.clamp(1, BAR_WIDTH))
}

pub fn render(state: &DashboardState, top: usize) -> String {
    match state.render_mode() {
        RenderMode::Loading => render_loading(),
        RenderMode::Onboarding => render_onboarding(),
        RenderMode::Dashboard => render_dashboard(state, top),
    }
}

pub fn render_loading() -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Loading Dashboard");
    let _ = writeln!(output, "Setting up your LMS analytics...");
    output
}

pub fn render_onboarding() -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Welcome to LMS Analytics");
    let _ = writeln!(
        output,
        "Initialize sample data to get started with the dashboard"
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "Run `lms-dashboard initialize` to seed sample data.");
    output
}

pub fn render_dashboard(state: &DashboardState, top: usize) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# LMS Analytics Dashboard");
    let _ = writeln!(
        output,
        "Comprehensive learning management system analytics"
    );
    if let Some(snapshot) = state.snapshot() {
        let _ = writeln!(
            output,
            "Last updated {}",
            snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    if let Some(stats) = state.stats() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Overview");
        let _ = writeln!(output, "- Total Students: {}", format_count(stats.total_students));
        let _ = writeln!(output, "- Total Courses: {}", format_count(stats.total_courses));
        let _ = writeln!(output, "- Active Students: {}", format_count(stats.active_students));
        let _ = writeln!(
            output,
            "- Completion Rate: {}",
            format_percent(stats.completion_rate)
        );
        if stats.total_enrollments > 0 {
            let _ = writeln!(
                output,
                "- Total Enrollments: {} (average score {})",
                format_count(stats.total_enrollments),
                format_percent(stats.average_score)
            );
        }
    }

    write_enrollment_trends(&mut output, state.enrollment_trends());
    write_category_completion(&mut output, state.completion_by_category());
    write_student_performance(&mut output, state.student_performance(), top);
    write_course_analytics(&mut output, state.course_analytics(), top);

    output
}

fn write_enrollment_trends(output: &mut String, trends: &[EnrollmentTrendPoint]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Enrollment Trends");

    if trends.is_empty() {
        let _ = writeln!(output, "No enrollment data available.");
        return;
    }

    let max = trends.iter().map(|p| p.enrollments).max().unwrap_or(0) as f64;
    for point in trends {
        let _ = writeln!(
            output,
            "{:<10} {:>8} {}",
            point.month,
            format_count(point.enrollments),
            bar(point.enrollments as f64, max)
        );
    }
}

fn write_category_completion(output: &mut String, categories: &[CategoryCompletion]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Completion by Category");

    if categories.is_empty() {
        let _ = writeln!(output, "No category data available.");
        return;
    }

    for entry in categories {
        let _ = writeln!(
            output,
            "{:<20} {:>7} {}",
            entry.category,
            format_percent(entry.completion_rate),
            bar(entry.completion_rate, 100.0)
        );
    }
}

fn write_student_performance(output: &mut String, students: &[StudentPerformance], top: usize) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Student Performance");

    if students.is_empty() {
        let _ = writeln!(output, "No student performance data available.");
        return;
    }

    for (rank, student) in students.iter().take(top).enumerate() {
        let _ = writeln!(
            output,
            "{}. {}: {} completed courses, average score {}",
            rank + 1,
            student.student_name,
            student.courses_completed,
            format_percent(student.average_score)
        );
    }
}

fn write_course_analytics(output: &mut String, courses: &[CourseAnalytic], top: usize) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Course Analytics");

    if courses.is_empty() {
        let _ = writeln!(output, "No course data available.");
        return;
    }

    let _ = writeln!(
        output,
        "| Course | Enrollments | Completed | Completion Rate | Avg Score | Avg Duration |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|");
    for course in courses.iter().take(top) {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {:.1}h |",
            course.course_title,
            format_count(course.total_enrollments),
            format_count(course.completed_enrollments),
            format_percent(course.completion_rate),
            format_percent(course.average_score),
            course.average_duration_hours
        );
    }
}

pub fn export_course_csv(courses: &[CourseAnalytic], path: &Path) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for course in courses {
        writer.serialize(course)?;
    }
    writer.flush()?;
    Ok(courses.len())
}
