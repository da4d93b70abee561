use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use autoloan_core::{AppError, AttachmentStorage};
use autoloan_models::{
    ApplicationFields, LoanApplication, LoanApplicationForm, LoanApplicationPatch, LoanStatus,
};

use crate::attachments::UploadedFile;
use crate::cleanup::CleanupQueue;
use crate::metrics::{track_application_created, track_status_change};
use crate::middleware::auth::AuthUser;

const APPLICATION_COLUMNS: &str = "id, user_id, user_name, loan_type, submission_date, income, \
     model, purchase_price, loan_status, address, file, created_at, updated_at";

fn application_not_found() -> AppError {
    AppError::not_found(anyhow!("Loan application not found"))
}

/// Drops a staged upload after the request failed. Never masks the original error.
async fn discard_staged(storage: &dyn AttachmentStorage, name: &str) {
    if let Err(e) = storage.discard(name).await {
        warn!(file = %name, error = %e, "Failed to discard staged attachment");
    }
}

pub struct LoanApplicationService;

impl LoanApplicationService {
    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "loan_applications"))]
    pub async fn list_all(db: &PgPool) -> Result<Vec<LoanApplication>, AppError> {
        let applications = sqlx::query_as::<_, LoanApplication>(&format!(
            "SELECT {} FROM loan_applications ORDER BY submission_date DESC",
            APPLICATION_COLUMNS
        ))
        .fetch_all(db)
        .await?;
        Ok(applications)
    }

    #[instrument(skip(db), fields(user.id = %user_id, db.operation = "SELECT", db.table = "loan_applications"))]
    pub async fn list_by_applicant(
        db: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<LoanApplication>, AppError> {
        let applications = sqlx::query_as::<_, LoanApplication>(&format!(
            "SELECT {} FROM loan_applications WHERE user_id = $1 ORDER BY submission_date DESC",
            APPLICATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(applications)
    }

    #[instrument(skip(db), fields(application.id = %id))]
    pub async fn find(db: &PgPool, id: Uuid) -> Result<Option<LoanApplication>, AppError> {
        let application = sqlx::query_as::<_, LoanApplication>(&format!(
            "SELECT {} FROM loan_applications WHERE id = $1",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(application)
    }

    /// Stages the attachment, inserts the row, then promotes the attachment.
    ///
    /// A failed insert discards the staged file; a failed promotion deletes the
    /// row again so no application ever points at a missing attachment.
    #[instrument(skip(db, storage, form, file), fields(user.id = %user_id, file = %file.name))]
    pub async fn create(
        db: &PgPool,
        storage: &dyn AttachmentStorage,
        user_id: Uuid,
        form: LoanApplicationForm,
        file: UploadedFile,
    ) -> Result<LoanApplication, AppError> {
        let fields = LoanApplicationForm {
            file: Some(file.name.clone()),
            ..form
        }
        .into_fields()?;

        let user_name = sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(AppError::authentication_failed)?;

        storage.stage(&file.name, &file.bytes).await?;

        let inserted = Self::insert(db, user_id, &user_name, &fields).await;
        let application = match inserted {
            Ok(application) => application,
            Err(e) => {
                discard_staged(storage, &file.name).await;
                return Err(e);
            }
        };

        if let Err(e) = storage.promote(&file.name).await {
            error!(application.id = %application.id, error = %e, "Attachment promotion failed; removing application");
            if let Err(e) = sqlx::query("DELETE FROM loan_applications WHERE id = $1")
                .bind(application.id)
                .execute(db)
                .await
            {
                error!(application.id = %application.id, error = %e, "Failed to remove application after promotion failure");
            }
            discard_staged(storage, &file.name).await;
            return Err(AppError::internal(anyhow!("Failed to store attachment")));
        }

        track_application_created();
        info!(application.id = %application.id, "Loan application submitted");
        Ok(application)
    }

    async fn insert(
        db: &PgPool,
        user_id: Uuid,
        user_name: &str,
        fields: &ApplicationFields,
    ) -> Result<LoanApplication, AppError> {
        let application = sqlx::query_as::<_, LoanApplication>(&format!(
            "INSERT INTO loan_applications
                (user_id, user_name, loan_type, income, model, purchase_price, loan_status, address, file)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {}",
            APPLICATION_COLUMNS
        ))
        .bind(user_id)
        .bind(user_name)
        .bind(&fields.loan_type)
        .bind(fields.income)
        .bind(fields.model)
        .bind(fields.purchase_price)
        .bind(i16::from(LoanStatus::Pending))
        .bind(&fields.address)
        .bind(&fields.file)
        .fetch_one(db)
        .await?;
        Ok(application)
    }

    /// Writes `status` whatever the current state is.
    #[instrument(skip(db), fields(application.id = %id, status = %status, db.operation = "UPDATE"))]
    pub async fn force_status(
        db: &PgPool,
        id: Uuid,
        status: LoanStatus,
    ) -> Result<LoanApplication, AppError> {
        let application = sqlx::query_as::<_, LoanApplication>(&format!(
            "UPDATE loan_applications SET
                loan_status = $2,
                updated_at = CASE WHEN loan_status = $2 THEN updated_at ELSE NOW() END
             WHERE id = $1
             RETURNING {}",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .bind(i16::from(status))
        .fetch_optional(db)
        .await?
        .ok_or_else(application_not_found)?;

        track_status_change("force", status.as_str());
        info!(application.id = %id, status = %status, "Loan status set");
        Ok(application)
    }

    /// Moves the application from `from` to `to` along a lifecycle edge.
    ///
    /// The write only happens if the stored status still equals `from`.
    #[instrument(skip(db), fields(application.id = %id, from = %from, to = %to, db.operation = "UPDATE"))]
    pub async fn transition(
        db: &PgPool,
        id: Uuid,
        from: LoanStatus,
        to: LoanStatus,
    ) -> Result<LoanApplication, AppError> {
        from.transition(to)?;

        let updated = sqlx::query_as::<_, LoanApplication>(&format!(
            "UPDATE loan_applications SET loan_status = $3, updated_at = NOW()
             WHERE id = $1 AND loan_status = $2
             RETURNING {}",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .bind(i16::from(from))
        .bind(i16::from(to))
        .fetch_optional(db)
        .await?;

        if let Some(application) = updated {
            track_status_change("transition", to.as_str());
            info!(application.id = %id, from = %from, to = %to, "Loan status transitioned");
            return Ok(application);
        }

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM loan_applications WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(db)
        .await?;

        if !exists {
            return Err(application_not_found());
        }

        warn!(application.id = %id, from = %from, "Stale status transition");
        Err(AppError::conflict(anyhow!(
            "Loan application status has changed; reload and try again"
        )))
    }

    /// Applies an applicant's edit, optionally replacing the attachment.
    ///
    /// The row is locked while the merged record is validated and written. A new
    /// attachment is promoted after commit and the old one is queued for removal.
    #[instrument(skip(db, storage, cleanup, patch, new_file), fields(application.id = %id, user.id = %owner_id))]
    pub async fn update_fields(
        db: &PgPool,
        storage: &dyn AttachmentStorage,
        cleanup: &CleanupQueue,
        id: Uuid,
        owner_id: Uuid,
        patch: LoanApplicationPatch,
        new_file: Option<UploadedFile>,
    ) -> Result<LoanApplication, AppError> {
        if let Some(file) = &new_file {
            storage.stage(&file.name, &file.bytes).await?;
        }
        let new_name = new_file.map(|f| f.name);

        let result = Self::write_fields(db, id, owner_id, patch, new_name.as_deref()).await;
        let (application, previous_file) = match result {
            Ok(written) => written,
            Err(e) => {
                if let Some(name) = &new_name {
                    discard_staged(storage, name).await;
                }
                return Err(e);
            }
        };

        let Some(new_name) = new_name else {
            info!(application.id = %id, "Loan application updated");
            return Ok(application);
        };

        if let Err(e) = storage.promote(&new_name).await {
            error!(application.id = %id, error = %e, "Attachment promotion failed; restoring previous file");
            if let Err(e) = sqlx::query(
                "UPDATE loan_applications SET file = $3, updated_at = NOW() WHERE id = $1 AND file = $2",
            )
            .bind(id)
            .bind(&new_name)
            .bind(&previous_file)
            .execute(db)
            .await
            {
                error!(application.id = %id, error = %e, "Failed to restore previous attachment reference");
            }
            discard_staged(storage, &new_name).await;
            return Err(AppError::internal(anyhow!("Failed to store attachment")));
        }

        // An edit or delete that committed between our commit and the promotion
        // may already have queued `new_name` while it was still staged.
        Self::release_if_superseded(db, cleanup, id, &new_name).await;

        if previous_file != new_name {
            cleanup.enqueue(previous_file);
        }

        info!(application.id = %id, file = %new_name, "Loan application updated with new attachment");
        Ok(application)
    }

    /// Queues `file` for removal unless the row still references it.
    async fn release_if_superseded(db: &PgPool, cleanup: &CleanupQueue, id: Uuid, file: &str) {
        let current = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM loan_applications WHERE id = $1 AND file = $2)",
        )
        .bind(id)
        .bind(file)
        .fetch_one(db)
        .await;

        match current {
            Ok(true) => {}
            Ok(false) => {
                warn!(application.id = %id, file = %file, "Attachment superseded before promotion; queueing removal");
                cleanup.enqueue(file);
            }
            Err(e) => {
                warn!(application.id = %id, file = %file, error = %e, "Could not confirm attachment is still referenced");
            }
        }
    }

    /// Returns the updated row and the file it referenced before the update.
    async fn write_fields(
        db: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        patch: LoanApplicationPatch,
        new_file: Option<&str>,
    ) -> Result<(LoanApplication, String), AppError> {
        let mut tx = db.begin().await?;

        let current = sqlx::query_as::<_, LoanApplication>(&format!(
            "SELECT {} FROM loan_applications WHERE id = $1 FOR UPDATE",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(application_not_found)?;

        if current.user_id != owner_id {
            return Err(AppError::access_denied());
        }

        let mut form = LoanApplicationForm::from_existing(&current).apply(patch);
        if let Some(name) = new_file {
            form.file = Some(name.to_string());
        }
        let fields = form.into_fields()?;

        let updated = sqlx::query_as::<_, LoanApplication>(&format!(
            "UPDATE loan_applications SET
                loan_type = $2,
                income = $3,
                model = $4,
                purchase_price = $5,
                address = $6,
                file = $7,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .bind(&fields.loan_type)
        .bind(fields.income)
        .bind(fields.model)
        .bind(fields.purchase_price)
        .bind(&fields.address)
        .bind(&fields.file)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((updated, current.file))
    }

    /// Deletes the row, then queues its attachment for removal.
    #[instrument(skip(db, cleanup, actor), fields(application.id = %id, db.operation = "DELETE"))]
    pub async fn delete(
        db: &PgPool,
        cleanup: &CleanupQueue,
        id: Uuid,
        actor: &AuthUser,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let (owner_id, file) = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT user_id, file FROM loan_applications WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(application_not_found)?;

        if !actor.can_access(owner_id) {
            return Err(AppError::access_denied());
        }

        sqlx::query("DELETE FROM loan_applications WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        cleanup.enqueue(file);
        info!(application.id = %id, "Loan application deleted");
        Ok(())
    }
}
