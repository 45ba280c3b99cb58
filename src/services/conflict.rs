use chrono::NaiveTime;
use serde::Serialize;

use crate::models::{parse_hhmm, ScheduleEntry};

/// Outcome of checking a proposed meeting against the already-saved entries
/// in its section and its teacher's load. A conflict is a normal value here,
/// not an error; the persisting path decides what to do with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictResult {
    NoConflict,
    /// The section already meets during the proposed interval.
    SectionOverlap { with: ScheduleEntry },
    /// The teacher already teaches elsewhere during the proposed interval.
    TeacherOverlap { with: ScheduleEntry },
}

impl ConflictResult {
    pub fn is_conflict(&self) -> bool {
        !matches!(self, ConflictResult::NoConflict)
    }
}

/// Checks a proposed entry against its section scope and its teacher scope.
///
/// Pure over the supplied slices; the caller fetches both scopes and, on the
/// persisting path, re-runs this inside the same transaction as the write.
/// The section check runs first and wins when both would collide. Empty
/// scopes mean no conflict.
pub fn check_conflict(
    proposed: &ScheduleEntry,
    section_scope: &[ScheduleEntry],
    teacher_scope: &[ScheduleEntry],
) -> ConflictResult {
    if let Some(hit) = section_scope.iter().find(|existing| overlaps(proposed, existing)) {
        return ConflictResult::SectionOverlap { with: hit.clone() };
    }

    if let Some(hit) = teacher_scope
        .iter()
        .filter(|existing| existing.teacher_id == proposed.teacher_id)
        .find(|existing| overlaps(proposed, existing))
    {
        return ConflictResult::TeacherOverlap { with: hit.clone() };
    }

    ConflictResult::NoConflict
}

/// Half-open interval intersection on the same day: back-to-back meetings
/// (one ends exactly when the next starts) do not overlap.
fn overlaps(a: &ScheduleEntry, b: &ScheduleEntry) -> bool {
    if a.day != b.day {
        return false;
    }
    match (interval(a), interval(b)) {
        (Some((a_start, a_end)), Some((b_start, b_end))) => a_start < b_end && b_start < a_end,
        // Times are validated on write; a row that no longer parses cannot
        // be compared and is skipped.
        _ => false,
    }
}

fn interval(entry: &ScheduleEntry) -> Option<(NaiveTime, NaiveTime)> {
    Some((parse_hhmm(&entry.start_time)?, parse_hhmm(&entry.end_time)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Weekday;

    fn entry(day: Weekday, start: &str, end: &str, section: &str, teacher: &str) -> ScheduleEntry {
        ScheduleEntry {
            id: format!("{section}-{start}"),
            subject_code: "IT101".to_string(),
            subject_title: "Intro to Computing".to_string(),
            course_code: "BSIT".to_string(),
            year_level: 1,
            section_name: section.to_string(),
            teacher_id: teacher.to_string(),
            teacher_name: teacher.to_string(),
            day,
            start_time: start.to_string(),
            end_time: end.to_string(),
            room_or_link: None,
            max_capacity: 50,
            enrolled_count: 0,
            updated_at: "2026-06-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn identical_interval_same_section_conflicts() {
        let existing = entry(Weekday::Mon, "08:00", "10:00", "BSIT-1-A", "T1");
        let proposed = entry(Weekday::Mon, "08:00", "10:00", "BSIT-1-A", "T2");

        let result = check_conflict(&proposed, &[existing.clone()], &[]);
        assert_eq!(result, ConflictResult::SectionOverlap { with: existing });
    }

    #[test]
    fn partial_overlap_same_section_conflicts() {
        let existing = entry(Weekday::Mon, "08:00", "10:00", "BSIT-1-A", "T1");
        let proposed = entry(Weekday::Mon, "09:00", "11:00", "BSIT-1-A", "T2");

        let result = check_conflict(&proposed, &[existing.clone()], &[]);
        assert_eq!(result, ConflictResult::SectionOverlap { with: existing });
    }

    #[test]
    fn back_to_back_does_not_conflict() {
        let existing = entry(Weekday::Mon, "08:00", "10:00", "BSIT-1-A", "T1");
        let proposed = entry(Weekday::Mon, "10:00", "12:00", "BSIT-1-A", "T1");

        let result = check_conflict(&proposed, &[existing.clone()], &[existing]);
        assert_eq!(result, ConflictResult::NoConflict);
    }

    #[test]
    fn different_days_never_conflict() {
        let existing = entry(Weekday::Mon, "08:00", "10:00", "BSIT-1-A", "T1");
        let proposed = entry(Weekday::Tue, "08:00", "10:00", "BSIT-1-A", "T1");

        let result = check_conflict(&proposed, &[existing.clone()], &[existing]);
        assert_eq!(result, ConflictResult::NoConflict);
    }

    #[test]
    fn teacher_overlap_is_section_independent() {
        let existing = entry(Weekday::Mon, "08:00", "10:00", "BSIT-1-A", "T1");
        let proposed = entry(Weekday::Mon, "09:00", "11:00", "BSIT-2-B", "T1");

        let result = check_conflict(&proposed, &[], &[existing.clone()]);
        assert_eq!(result, ConflictResult::TeacherOverlap { with: existing });
    }

    #[test]
    fn other_teachers_in_scope_are_ignored() {
        let existing = entry(Weekday::Mon, "08:00", "10:00", "BSIT-1-A", "T9");
        let proposed = entry(Weekday::Mon, "09:00", "11:00", "BSIT-2-B", "T1");

        let result = check_conflict(&proposed, &[], &[existing]);
        assert_eq!(result, ConflictResult::NoConflict);
    }

    #[test]
    fn section_overlap_takes_precedence_over_teacher_overlap() {
        let section_hit = entry(Weekday::Mon, "08:00", "10:00", "BSIT-1-A", "T2");
        let teacher_hit = entry(Weekday::Mon, "08:00", "10:00", "BSIT-2-B", "T1");
        let proposed = entry(Weekday::Mon, "09:00", "11:00", "BSIT-1-A", "T1");

        let result = check_conflict(&proposed, &[section_hit.clone()], &[teacher_hit]);
        assert_eq!(result, ConflictResult::SectionOverlap { with: section_hit });
    }

    #[test]
    fn empty_scopes_mean_no_conflict() {
        let proposed = entry(Weekday::Fri, "13:00", "15:00", "BSIT-1-A", "T1");
        assert_eq!(check_conflict(&proposed, &[], &[]), ConflictResult::NoConflict);
    }

    #[test]
    fn reports_first_colliding_entry_in_scope_order() {
        let first = entry(Weekday::Mon, "08:00", "09:30", "BSIT-1-A", "T2");
        let second = entry(Weekday::Mon, "09:00", "10:30", "BSIT-1-A", "T3");
        let proposed = entry(Weekday::Mon, "09:00", "11:00", "BSIT-1-A", "T1");

        let result = check_conflict(&proposed, &[first.clone(), second], &[]);
        assert_eq!(result, ConflictResult::SectionOverlap { with: first });
    }
}
