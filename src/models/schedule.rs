use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

/// One scheduled class meeting, keyed by
/// `{course_code}-{year_level}-{section_block}-{subject_code}`.
///
/// `enrolled_count` is owned by the enrollment finalizer: schedule edits
/// replace every other field but never touch the counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ScheduleEntry {
    pub id: String,
    pub subject_code: String,
    pub subject_title: String,
    pub course_code: String,
    pub year_level: i32,
    pub section_name: String,
    pub teacher_id: String,
    pub teacher_name: String,
    pub day: Weekday,
    pub start_time: String,
    pub end_time: String,
    pub room_or_link: Option<String>,
    pub max_capacity: i32,
    pub enrolled_count: i32,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewScheduleRequest {
    pub subject_code: String,
    pub subject_title: String,
    pub course_code: String,
    pub year_level: i32,
    pub section_block: String,
    pub teacher_id: String,
    pub teacher_name: String,
    pub day: Weekday,
    pub start_time: String,
    pub end_time: String,
    pub room_or_link: Option<String>,
    pub max_capacity: i32,
}

pub fn section_name(course_code: &str, year_level: i32, section_block: &str) -> String {
    format!("{course_code}-{year_level}-{section_block}")
}

pub fn entry_id(course_code: &str, year_level: i32, section_block: &str, subject_code: &str) -> String {
    format!("{course_code}-{year_level}-{section_block}-{subject_code}")
}

/// Wall-clock `HH:MM`, minute precision.
pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

impl NewScheduleRequest {
    /// Validates the request and builds the entry to persist. A fresh entry
    /// starts with `enrolled_count` 0; on replace the stored counter wins.
    pub fn into_entry(self) -> Result<ScheduleEntry, AppError> {
        for (field, value) in [
            ("subject_code", &self.subject_code),
            ("course_code", &self.course_code),
            ("section_block", &self.section_block),
            ("teacher_id", &self.teacher_id),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{field} must not be empty")));
            }
        }
        if self.year_level < 1 {
            return Err(AppError::Validation("year_level must be at least 1".to_string()));
        }
        if self.max_capacity < 0 {
            return Err(AppError::Validation("max_capacity must not be negative".to_string()));
        }
        let start = parse_hhmm(&self.start_time)
            .ok_or_else(|| AppError::Validation(format!("invalid start_time: {}", self.start_time)))?;
        let end = parse_hhmm(&self.end_time)
            .ok_or_else(|| AppError::Validation(format!("invalid end_time: {}", self.end_time)))?;
        if start >= end {
            return Err(AppError::Validation(format!(
                "start_time {} must be before end_time {}",
                self.start_time, self.end_time
            )));
        }

        Ok(ScheduleEntry {
            id: entry_id(
                &self.course_code,
                self.year_level,
                &self.section_block,
                &self.subject_code,
            ),
            subject_code: self.subject_code,
            subject_title: self.subject_title,
            course_code: self.course_code.clone(),
            year_level: self.year_level,
            section_name: section_name(&self.course_code, self.year_level, &self.section_block),
            teacher_id: self.teacher_id,
            teacher_name: self.teacher_name,
            day: self.day,
            start_time: self.start_time,
            end_time: self.end_time,
            room_or_link: self.room_or_link,
            max_capacity: self.max_capacity,
            enrolled_count: 0,
            updated_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NewScheduleRequest {
        NewScheduleRequest {
            subject_code: "IT101".to_string(),
            subject_title: "Intro to Computing".to_string(),
            course_code: "BSIT".to_string(),
            year_level: 1,
            section_block: "A".to_string(),
            teacher_id: "T1".to_string(),
            teacher_name: "A. Reyes".to_string(),
            day: Weekday::Mon,
            start_time: "08:00".to_string(),
            end_time: "10:00".to_string(),
            room_or_link: Some("Room 204".to_string()),
            max_capacity: 50,
        }
    }

    #[test]
    fn builds_composite_id_and_section_name() {
        let entry = request().into_entry().expect("valid request");
        assert_eq!(entry.id, "BSIT-1-A-IT101");
        assert_eq!(entry.section_name, "BSIT-1-A");
        assert_eq!(entry.enrolled_count, 0);
    }

    #[test]
    fn rejects_inverted_time_range() {
        let mut req = request();
        req.start_time = "10:00".to_string();
        req.end_time = "08:00".to_string();
        assert!(matches!(req.into_entry(), Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_equal_start_and_end() {
        let mut req = request();
        req.end_time = req.start_time.clone();
        assert!(matches!(req.into_entry(), Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_unparseable_time() {
        let mut req = request();
        req.start_time = "8am".to_string();
        assert!(matches!(req.into_entry(), Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_blank_section_block() {
        let mut req = request();
        req.section_block = "  ".to_string();
        assert!(matches!(req.into_entry(), Err(AppError::Validation(_))));
    }
}
