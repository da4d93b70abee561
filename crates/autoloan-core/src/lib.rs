//! # AutoLoan Core
//!
//! Core types, errors, and utilities for the AutoLoan API.
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`normalize`]: Maps validation and storage-layer failures to user-facing messages
//! - [`password`]: Password hashing and verification
//! - [`file_storage`]: Staged attachment storage
//! - [`upload_policy`]: Attachment type, size and naming rules
//!
//! # Example
//!
//! ```ignore
//! use autoloan_core::errors::AppError;
//! use autoloan_core::password::{hash_password, verify_password};
//!
//! let error = AppError::not_found(anyhow::anyhow!("Loan not found"));
//! let hash = hash_password("secure_password")?;
//! ```

pub mod errors;
pub mod file_storage;
pub mod normalize;
pub mod password;
pub mod upload_policy;

pub use errors::{AppError, MessageResponse};
pub use file_storage::{AttachmentStorage, LocalAttachmentStorage, StorageError};
pub use normalize::{FieldOrder, trim_field, validate_in_order};
pub use password::{hash_password, verify_password};
pub use upload_policy::{UploadPolicy, UploadRejection};
