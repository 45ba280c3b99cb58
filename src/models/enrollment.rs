use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::schedule::{entry_id, ScheduleEntry, Weekday};

/// One chosen section-subject pairing in a finalize request. A skipped
/// subject is simply absent from the list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionChoice {
    pub course_code: String,
    pub year_level: i32,
    pub section_block: String,
    pub subject_code: String,
}

impl SectionChoice {
    pub fn entry_id(&self) -> String {
        entry_id(
            &self.course_code,
            self.year_level,
            &self.section_block,
            &self.subject_code,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingEnrollment {
    pub student_id: String,
    pub student_name: String,
    pub email: String,
    pub course_code: String,
    pub year_level: i32,
    pub requested_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEnrollmentRequest {
    pub student_id: String,
    pub student_name: String,
    pub email: String,
    pub course_code: String,
    pub year_level: i32,
}

/// Denormalized per-student copy of the schedule fields at enrollment time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SubjectAssignment {
    pub student_id: String,
    pub entry_id: String,
    pub subject_code: String,
    pub subject_title: String,
    pub section_name: String,
    pub teacher_name: String,
    pub day: Weekday,
    pub start_time: String,
    pub end_time: String,
    pub room_or_link: Option<String>,
    pub assigned_at: String,
}

impl SubjectAssignment {
    pub fn from_entry(student_id: &str, entry: &ScheduleEntry) -> Self {
        Self {
            student_id: student_id.to_string(),
            entry_id: entry.id.clone(),
            subject_code: entry.subject_code.clone(),
            subject_title: entry.subject_title.clone(),
            section_name: entry.section_name.clone(),
            teacher_name: entry.teacher_name.clone(),
            day: entry.day,
            start_time: entry.start_time.clone(),
            end_time: entry.end_time.clone(),
            room_or_link: entry.room_or_link.clone(),
            assigned_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
