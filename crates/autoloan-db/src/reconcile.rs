//! Staging reconciliation.
//!
//! A file is staged before its row is committed and promoted afterwards. If the
//! process dies in between, the staging area holds either a file whose row was
//! committed (promote it) or one whose row never made it (drop it).
//!
//! Must not run while requests are being served, since an in-flight upload
//! looks exactly like an orphan.

use sqlx::PgPool;
use tracing::{info, warn};

use autoloan_core::{AppError, AttachmentStorage};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub promoted: Vec<String>,
    pub discarded: Vec<String>,
}

pub async fn reconcile_staging(
    pool: &PgPool,
    storage: &dyn AttachmentStorage,
) -> Result<ReconcileReport, AppError> {
    let mut report = ReconcileReport::default();

    let staged = storage.staged().await?;
    if staged.is_empty() {
        return Ok(report);
    }

    let referenced: Vec<String> =
        sqlx::query_scalar::<_, String>("SELECT file FROM loan_applications WHERE file = ANY($1)")
            .bind(&staged)
            .fetch_all(pool)
            .await?;

    for name in staged {
        if referenced.contains(&name) {
            storage.promote(&name).await?;
            report.promoted.push(name);
        } else {
            storage.discard(&name).await?;
            report.discarded.push(name);
        }
    }

    if !report.discarded.is_empty() {
        warn!(count = report.discarded.len(), "Discarded orphaned staged attachments");
    }
    info!(
        promoted = report.promoted.len(),
        discarded = report.discarded.len(),
        "Staging area reconciled"
    );

    Ok(report)
}
