//! # AutoLoan Models
//!
//! Domain models and request/response DTOs.
//!
//! - [`users`]: accounts, signup/login/password-reset payloads
//! - [`loans`]: loan products managed by admins
//! - [`loan_applications`]: applications, their status lifecycle and form validation
//!
//! Every payload type implements [`autoloan_core::FieldOrder`] so that the
//! first reported validation failure follows the order fields are declared in.

pub mod loan_applications;
pub mod loans;
pub mod users;

pub use autoloan_auth::UserRole;

pub use loan_applications::{
    ApplicationFields, InvalidStatus, InvalidTransition, LoanApplication, LoanApplicationForm,
    LoanApplicationPatch, LoanStatus, StatusUpdateDto, TransitionDto,
};
pub use loans::{CreateLoanDto, Loan, UpdateLoanDto};
pub use users::{
    ForgotPasswordDto, ForgotPasswordResponse, LoginDto, LoginResponse, ResetPasswordDto,
    SignupDto, User, UserCredentials,
};
