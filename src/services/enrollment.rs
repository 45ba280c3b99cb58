use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::repository;
use crate::error::AppError;
use crate::models::{PendingEnrollment, SectionChoice, SubjectAssignment};

pub struct EnrollmentService {
    db: SqlitePool,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentOutcome {
    pub student_id: String,
    pub email: String,
    /// True when this finalize matched an existing receipt and performed no
    /// new capacity increments, only the follow-up writes.
    pub replayed: bool,
    pub assignments: Vec<SubjectAssignment>,
}

impl EnrollmentService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Finalizes one student's enrollment into the chosen sections.
    ///
    /// Capacity is gated and incremented inside a single transaction: every
    /// chosen entry is re-read under the transaction, a full section aborts
    /// the whole attempt with no increments applied, and the receipt row is
    /// written atomically with the increments so a retried finalize never
    /// double-counts. The assignment records and pending-record cleanup are
    /// a best-effort follow-up; if they fail, the increments stand and the
    /// caller retries, replaying through the receipt.
    pub async fn finalize(
        &self,
        student_id: &str,
        choices: &[SectionChoice],
    ) -> Result<EnrollmentOutcome, AppError> {
        if choices.is_empty() {
            return Err(AppError::Validation(
                "at least one section choice is required".to_string(),
            ));
        }

        let mut entry_ids: Vec<String> = choices.iter().map(SectionChoice::entry_id).collect();
        entry_ids.sort();
        if entry_ids.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(AppError::Validation(
                "duplicate section choice in request".to_string(),
            ));
        }

        let pending = repository::fetch_pending_enrollment(&self.db, student_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let key = receipt_key(student_id, &entry_ids);

        let mut tx = self.db.begin().await.map_err(tx_aborted)?;

        let replayed = repository::receipt_exists(&mut *tx, &key)
            .await
            .map_err(tx_aborted)?;

        if replayed {
            info!("finalize replay for student {student_id}, skipping increments");
            drop(tx);
        } else {
            for id in &entry_ids {
                let entry = repository::fetch_entry(&mut *tx, id)
                    .await
                    .map_err(tx_aborted)?
                    .ok_or_else(|| {
                        AppError::Validation(format!("no schedule entry for choice {id}"))
                    })?;

                if entry.enrolled_count >= entry.max_capacity {
                    // Dropping the transaction rolls back: earlier choices in
                    // this request keep their original counts.
                    return Err(AppError::CapacityExceeded {
                        section: entry.section_name,
                    });
                }
            }

            for id in &entry_ids {
                repository::increment_enrolled(&mut *tx, id)
                    .await
                    .map_err(tx_aborted)?;
            }
            repository::insert_receipt(&mut *tx, &key, student_id, &entry_ids)
                .await
                .map_err(tx_aborted)?;

            tx.commit().await.map_err(tx_aborted)?;
            info!(
                "enrolled student {student_id} into {} section(s)",
                entry_ids.len()
            );
        }

        let mut assignments = Vec::with_capacity(entry_ids.len());
        for id in &entry_ids {
            let entry = repository::fetch_entry(&self.db, id)
                .await
                .map_err(partial_write)?
                .ok_or_else(|| {
                    AppError::PartialWrite(format!("entry {id} disappeared after enrollment"))
                })?;
            let assignment = SubjectAssignment::from_entry(student_id, &entry);
            repository::insert_assignment(&self.db, &assignment)
                .await
                .map_err(partial_write)?;
            assignments.push(assignment);
        }
        repository::delete_pending_enrollment(&self.db, student_id)
            .await
            .map_err(partial_write)?;

        if replayed {
            warn!("finalize replay completed follow-up writes for student {student_id}");
        }

        Ok(EnrollmentOutcome {
            student_id: student_id.to_string(),
            email: pending.email,
            replayed,
            assignments,
        })
    }

    /// Operator rejection: drops the pending record and hands back its
    /// contact details for the rejection notice. No counters are touched.
    pub async fn reject(&self, student_id: &str) -> Result<PendingEnrollment, AppError> {
        let pending = repository::fetch_pending_enrollment(&self.db, student_id)
            .await?
            .ok_or(AppError::NotFound)?;
        repository::delete_pending_enrollment(&self.db, student_id).await?;
        info!("rejected pending enrollment for student {student_id}");
        Ok(pending)
    }
}

/// Digest of the student plus the sorted chosen entry ids. Two finalize
/// attempts with the same choice set map to the same receipt.
fn receipt_key(student_id: &str, entry_ids: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(student_id.as_bytes());
    for id in entry_ids {
        hasher.update(b"\n");
        hasher.update(id.as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn tx_aborted(err: sqlx::Error) -> AppError {
    AppError::TransactionAborted(err.to_string())
}

fn partial_write(err: sqlx::Error) -> AppError {
    AppError::PartialWrite(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_key_ignores_choice_order() {
        let a = ["BSIT-1-A-IT101".to_string(), "BSIT-1-A-IT102".to_string()];
        let mut b = a.clone();
        b.reverse();
        b.sort();
        assert_eq!(receipt_key("S-1", &a), receipt_key("S-1", &b));
    }

    #[test]
    fn receipt_key_differs_per_student() {
        let ids = ["BSIT-1-A-IT101".to_string()];
        assert_ne!(receipt_key("S-1", &ids), receipt_key("S-2", &ids));
    }
}
