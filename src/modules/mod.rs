//! Feature modules.
//!
//! Each follows the same layout: `controller.rs` (HTTP handlers),
//! `service.rs` (database and storage work) and `router.rs` (route table).

pub mod auth;
pub mod loan_applications;
pub mod loans;
pub mod uploads;

use anyhow::anyhow;
use uuid::Uuid;

use autoloan_core::AppError;

/// Parses a record id from the path.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::bad_request(anyhow!("Invalid id: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert_eq!(parse_id("42").unwrap_err().message(), "Invalid id: 42");
    }
}
