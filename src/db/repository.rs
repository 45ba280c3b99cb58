use sqlx::{Executor, Sqlite};

use crate::models::{PendingEnrollment, ScheduleEntry, SubjectAssignment};

const ENTRY_COLUMNS: &str = "id, subject_code, subject_title, course_code, year_level, \
     section_name, teacher_id, teacher_name, day, start_time, end_time, room_or_link, \
     max_capacity, enrolled_count, updated_at";

pub async fn fetch_entry<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    id: &str,
) -> Result<Option<ScheduleEntry>, sqlx::Error> {
    sqlx::query_as::<_, ScheduleEntry>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM schedule_entries WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_cohort_schedules<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    course_code: &str,
    year_level: i32,
) -> Result<Vec<ScheduleEntry>, sqlx::Error> {
    sqlx::query_as::<_, ScheduleEntry>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM schedule_entries \
         WHERE course_code = ? AND year_level = ? \
         ORDER BY section_name, day, start_time"
    ))
    .bind(course_code)
    .bind(year_level)
    .fetch_all(db)
    .await
}

pub async fn fetch_teacher_schedules<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    teacher_id: &str,
) -> Result<Vec<ScheduleEntry>, sqlx::Error> {
    sqlx::query_as::<_, ScheduleEntry>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM schedule_entries \
         WHERE teacher_id = ? \
         ORDER BY day, start_time"
    ))
    .bind(teacher_id)
    .fetch_all(db)
    .await
}

/// Entries sharing the proposed entry's section, excluding the proposal's
/// own id so a replace does not collide with the row it replaces.
pub async fn fetch_section_scope<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    section_name: &str,
    exclude_id: &str,
) -> Result<Vec<ScheduleEntry>, sqlx::Error> {
    sqlx::query_as::<_, ScheduleEntry>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM schedule_entries \
         WHERE section_name = ? AND id != ?"
    ))
    .bind(section_name)
    .bind(exclude_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_teacher_scope<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    teacher_id: &str,
    exclude_id: &str,
) -> Result<Vec<ScheduleEntry>, sqlx::Error> {
    sqlx::query_as::<_, ScheduleEntry>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM schedule_entries \
         WHERE teacher_id = ? AND id != ?"
    ))
    .bind(teacher_id)
    .bind(exclude_id)
    .fetch_all(db)
    .await
}

/// Create-or-replace keyed by the composite id. Every schedule field is
/// replaced; `enrolled_count` is not, that column belongs to the finalizer.
pub async fn upsert_entry<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    entry: &ScheduleEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO schedule_entries \
            (id, subject_code, subject_title, course_code, year_level, section_name, \
             teacher_id, teacher_name, day, start_time, end_time, room_or_link, \
             max_capacity, enrolled_count, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET \
            subject_code = excluded.subject_code, \
            subject_title = excluded.subject_title, \
            course_code = excluded.course_code, \
            year_level = excluded.year_level, \
            section_name = excluded.section_name, \
            teacher_id = excluded.teacher_id, \
            teacher_name = excluded.teacher_name, \
            day = excluded.day, \
            start_time = excluded.start_time, \
            end_time = excluded.end_time, \
            room_or_link = excluded.room_or_link, \
            max_capacity = excluded.max_capacity, \
            updated_at = excluded.updated_at",
    )
    .bind(&entry.id)
    .bind(&entry.subject_code)
    .bind(&entry.subject_title)
    .bind(&entry.course_code)
    .bind(entry.year_level)
    .bind(&entry.section_name)
    .bind(&entry.teacher_id)
    .bind(&entry.teacher_name)
    .bind(entry.day)
    .bind(&entry.start_time)
    .bind(&entry.end_time)
    .bind(&entry.room_or_link)
    .bind(entry.max_capacity)
    .bind(entry.enrolled_count)
    .bind(&entry.updated_at)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn increment_enrolled<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    id: &str,
) -> Result<(), sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query("UPDATE schedule_entries SET enrolled_count = enrolled_count + 1, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

/// Set-union semantics: adding a block that already exists is a no-op, so
/// concurrent admin edits never clobber each other's additions.
pub async fn add_section_block<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    course_code: &str,
    year_level: i32,
    block_name: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR IGNORE INTO section_blocks (course_code, year_level, block_name) VALUES (?, ?, ?)",
    )
    .bind(course_code)
    .bind(year_level)
    .bind(block_name)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn remove_section_block<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    course_code: &str,
    year_level: i32,
    block_name: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM section_blocks WHERE course_code = ? AND year_level = ? AND block_name = ?",
    )
    .bind(course_code)
    .bind(year_level)
    .bind(block_name)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn list_section_blocks<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    course_code: &str,
    year_level: i32,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT block_name FROM section_blocks \
         WHERE course_code = ? AND year_level = ? \
         ORDER BY block_name",
    )
    .bind(course_code)
    .bind(year_level)
    .fetch_all(db)
    .await
}

pub async fn insert_pending_enrollment<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    pending: &PendingEnrollment,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO pending_enrollments \
            (student_id, student_name, email, course_code, year_level, requested_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&pending.student_id)
    .bind(&pending.student_name)
    .bind(&pending.email)
    .bind(&pending.course_code)
    .bind(pending.year_level)
    .bind(&pending.requested_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn fetch_pending_enrollment<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    student_id: &str,
) -> Result<Option<PendingEnrollment>, sqlx::Error> {
    sqlx::query_as::<_, PendingEnrollment>(
        "SELECT student_id, student_name, email, course_code, year_level, requested_at \
         FROM pending_enrollments WHERE student_id = ?",
    )
    .bind(student_id)
    .fetch_optional(db)
    .await
}

pub async fn list_pending_enrollments<'e>(
    db: impl Executor<'e, Database = Sqlite>,
) -> Result<Vec<PendingEnrollment>, sqlx::Error> {
    sqlx::query_as::<_, PendingEnrollment>(
        "SELECT student_id, student_name, email, course_code, year_level, requested_at \
         FROM pending_enrollments ORDER BY requested_at",
    )
    .fetch_all(db)
    .await
}

pub async fn delete_pending_enrollment<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM pending_enrollments WHERE student_id = ?")
        .bind(student_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

/// Idempotent on the `(student_id, entry_id)` key so a finalize replay can
/// re-run the assignment batch without tripping over rows it already wrote.
pub async fn insert_assignment<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    assignment: &SubjectAssignment,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR IGNORE INTO subject_assignments \
            (student_id, entry_id, subject_code, subject_title, section_name, \
             teacher_name, day, start_time, end_time, room_or_link, assigned_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&assignment.student_id)
    .bind(&assignment.entry_id)
    .bind(&assignment.subject_code)
    .bind(&assignment.subject_title)
    .bind(&assignment.section_name)
    .bind(&assignment.teacher_name)
    .bind(assignment.day)
    .bind(&assignment.start_time)
    .bind(&assignment.end_time)
    .bind(&assignment.room_or_link)
    .bind(&assignment.assigned_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn fetch_assignments<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    student_id: &str,
) -> Result<Vec<SubjectAssignment>, sqlx::Error> {
    sqlx::query_as::<_, SubjectAssignment>(
        "SELECT student_id, entry_id, subject_code, subject_title, section_name, \
                teacher_name, day, start_time, end_time, room_or_link, assigned_at \
         FROM subject_assignments WHERE student_id = ? \
         ORDER BY day, start_time",
    )
    .bind(student_id)
    .fetch_all(db)
    .await
}

pub async fn receipt_exists<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    receipt_key: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<String> =
        sqlx::query_scalar("SELECT receipt_key FROM enrollment_receipts WHERE receipt_key = ?")
            .bind(receipt_key)
            .fetch_optional(db)
            .await?;
    Ok(found.is_some())
}

pub async fn insert_receipt<'e>(
    db: impl Executor<'e, Database = Sqlite>,
    receipt_key: &str,
    student_id: &str,
    entry_ids: &[String],
) -> Result<(), sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO enrollment_receipts (receipt_key, student_id, entry_ids, created_at) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(receipt_key)
    .bind(student_id)
    .bind(entry_ids.join(","))
    .bind(now)
    .execute(db)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewScheduleRequest, Weekday};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    // One connection keeps the :memory: database shared across the pool.
    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    fn entry(subject_code: &str, block: &str) -> ScheduleEntry {
        NewScheduleRequest {
            subject_code: subject_code.to_string(),
            subject_title: format!("{subject_code} lecture"),
            course_code: "BSIT".to_string(),
            year_level: 1,
            section_block: block.to_string(),
            teacher_id: "T1".to_string(),
            teacher_name: "A. Reyes".to_string(),
            day: Weekday::Mon,
            start_time: "08:00".to_string(),
            end_time: "10:00".to_string(),
            room_or_link: None,
            max_capacity: 40,
        }
        .into_entry()
        .expect("valid entry")
    }

    #[tokio::test]
    async fn test_upsert_preserves_enrolled_count() {
        let pool = setup_test_db().await;

        let first = entry("IT101", "A");
        upsert_entry(&pool, &first).await.expect("insert");
        increment_enrolled(&pool, &first.id).await.expect("increment");

        let mut replacement = first.clone();
        replacement.room_or_link = Some("Room 305".to_string());
        replacement.max_capacity = 45;
        upsert_entry(&pool, &replacement).await.expect("replace");

        let stored = fetch_entry(&pool, &first.id)
            .await
            .expect("fetch")
            .expect("entry exists");
        assert_eq!(stored.room_or_link.as_deref(), Some("Room 305"));
        assert_eq!(stored.max_capacity, 45);
        assert_eq!(stored.enrolled_count, 1);
    }

    #[tokio::test]
    async fn test_section_scope_excludes_own_id() {
        let pool = setup_test_db().await;

        let a = entry("IT101", "A");
        let b = entry("IT102", "A");
        upsert_entry(&pool, &a).await.expect("insert a");
        upsert_entry(&pool, &b).await.expect("insert b");

        let scope = fetch_section_scope(&pool, &a.section_name, &a.id)
            .await
            .expect("scope");
        assert_eq!(scope.len(), 1);
        assert_eq!(scope[0].id, b.id);
    }

    #[tokio::test]
    async fn test_add_section_block_is_idempotent() {
        let pool = setup_test_db().await;

        add_section_block(&pool, "BSIT", 1, "A").await.expect("add");
        add_section_block(&pool, "BSIT", 1, "A").await.expect("re-add");
        add_section_block(&pool, "BSIT", 1, "B").await.expect("add b");

        let blocks = list_section_blocks(&pool, "BSIT", 1).await.expect("list");
        assert_eq!(blocks, vec!["A".to_string(), "B".to_string()]);

        assert!(remove_section_block(&pool, "BSIT", 1, "A").await.expect("remove"));
        assert!(!remove_section_block(&pool, "BSIT", 1, "A").await.expect("remove again"));
    }

    #[tokio::test]
    async fn test_assignment_insert_is_idempotent() {
        let pool = setup_test_db().await;

        let e = entry("IT101", "A");
        upsert_entry(&pool, &e).await.expect("insert");

        let assignment = SubjectAssignment::from_entry("S-2024-001", &e);
        insert_assignment(&pool, &assignment).await.expect("insert");
        insert_assignment(&pool, &assignment).await.expect("re-insert");

        let stored = fetch_assignments(&pool, "S-2024-001").await.expect("fetch");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].entry_id, e.id);
    }
}
