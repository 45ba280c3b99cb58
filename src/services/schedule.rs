use sqlx::SqlitePool;
use tracing::info;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{NewScheduleRequest, ScheduleEntry};
use crate::services::conflict::{check_conflict, ConflictResult};

pub struct ScheduleService {
    db: SqlitePool,
}

impl ScheduleService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Advisory pre-check over current data. Two operators can both pass
    /// this and race; the persisting path re-validates, this one is for
    /// showing the operator a collision before they hit save.
    pub async fn check(&self, req: NewScheduleRequest) -> Result<ConflictResult, AppError> {
        let proposed = req.into_entry()?;
        let section_scope =
            repository::fetch_section_scope(&self.db, &proposed.section_name, &proposed.id).await?;
        let teacher_scope =
            repository::fetch_teacher_scope(&self.db, &proposed.teacher_id, &proposed.id).await?;
        Ok(check_conflict(&proposed, &section_scope, &teacher_scope))
    }

    /// Validates, then re-reads both scopes and re-runs the conflict check
    /// inside the same transaction as the upsert, so two racing operators
    /// cannot both persist overlapping entries.
    pub async fn create(&self, req: NewScheduleRequest) -> Result<ScheduleEntry, AppError> {
        let proposed = req.into_entry()?;

        let mut tx = self.db.begin().await?;

        let section_scope =
            repository::fetch_section_scope(&mut *tx, &proposed.section_name, &proposed.id).await?;
        let teacher_scope =
            repository::fetch_teacher_scope(&mut *tx, &proposed.teacher_id, &proposed.id).await?;

        let result = check_conflict(&proposed, &section_scope, &teacher_scope);
        if result.is_conflict() {
            // Dropping the transaction rolls back; nothing was written yet.
            return Err(AppError::ScheduleConflict(Box::new(result)));
        }

        repository::upsert_entry(&mut *tx, &proposed).await?;
        // Re-read so a replace reports the preserved enrolled_count.
        let stored = repository::fetch_entry(&mut *tx, &proposed.id)
            .await?
            .ok_or(AppError::NotFound)?;

        tx.commit().await?;

        info!(
            "saved schedule entry {} ({} {}-{})",
            stored.id, stored.section_name, stored.start_time, stored.end_time
        );
        Ok(stored)
    }
}
