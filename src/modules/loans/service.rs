use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use autoloan_core::AppError;
use autoloan_models::{CreateLoanDto, Loan, UpdateLoanDto};

const LOAN_COLUMNS: &str =
    "id, loan_type, description, interest_rate, maximum_amount, created_at, updated_at";

fn loan_not_found() -> AppError {
    AppError::not_found(anyhow!("Loan not found"))
}

pub struct LoanService;

impl LoanService {
    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "loans"))]
    pub async fn list_loans(db: &PgPool) -> Result<Vec<Loan>, AppError> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans ORDER BY created_at DESC",
            LOAN_COLUMNS
        ))
        .fetch_all(db)
        .await?;
        Ok(loans)
    }

    #[instrument(skip(db), fields(loan.id = %id, db.operation = "SELECT", db.table = "loans"))]
    pub async fn get_loan(db: &PgPool, id: Uuid) -> Result<Loan, AppError> {
        sqlx::query_as::<_, Loan>(&format!("SELECT {} FROM loans WHERE id = $1", LOAN_COLUMNS))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(loan_not_found)
    }

    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "loans"))]
    pub async fn create_loan(db: &PgPool, dto: CreateLoanDto) -> Result<Loan, AppError> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            "INSERT INTO loans (loan_type, description, interest_rate, maximum_amount)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            LOAN_COLUMNS
        ))
        .bind(dto.loan_type.as_deref())
        .bind(dto.description.as_deref())
        .bind(dto.interest_rate)
        .bind(dto.maximum_amount)
        .fetch_one(db)
        .await?;

        info!(loan.id = %loan.id, "Loan product created");
        Ok(loan)
    }

    #[instrument(skip(db, dto), fields(loan.id = %id, db.operation = "UPDATE", db.table = "loans"))]
    pub async fn update_loan(db: &PgPool, id: Uuid, dto: UpdateLoanDto) -> Result<Loan, AppError> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            "UPDATE loans SET
                loan_type = COALESCE($2, loan_type),
                description = COALESCE($3, description),
                interest_rate = COALESCE($4, interest_rate),
                maximum_amount = COALESCE($5, maximum_amount),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            LOAN_COLUMNS
        ))
        .bind(id)
        .bind(dto.loan_type.as_deref())
        .bind(dto.description.as_deref())
        .bind(dto.interest_rate)
        .bind(dto.maximum_amount)
        .fetch_optional(db)
        .await?
        .ok_or_else(loan_not_found)?;

        info!(loan.id = %loan.id, "Loan product updated");
        Ok(loan)
    }

    #[instrument(skip(db), fields(loan.id = %id, db.operation = "DELETE", db.table = "loans"))]
    pub async fn delete_loan(db: &PgPool, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(loan_not_found());
        }

        info!(loan.id = %id, "Loan product deleted");
        Ok(())
    }
}
