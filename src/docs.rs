use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use autoloan_core::MessageResponse;
use autoloan_models::{
    CreateLoanDto, ForgotPasswordDto, ForgotPasswordResponse, Loan, LoanApplication,
    LoanApplicationPatch, LoginDto, LoginResponse, ResetPasswordDto, SignupDto,
    StatusUpdateDto, TransitionDto, UpdateLoanDto, User,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::signup,
        crate::modules::auth::controller::forgot_password,
        crate::modules::auth::controller::reset_password,
        crate::modules::loans::controller::list_loans,
        crate::modules::loans::controller::get_loan,
        crate::modules::loans::controller::create_loan,
        crate::modules::loans::controller::update_loan,
        crate::modules::loans::controller::delete_loan,
        crate::modules::loan_applications::controller::list_applications,
        crate::modules::loan_applications::controller::list_my_applications,
        crate::modules::loan_applications::controller::get_application,
        crate::modules::loan_applications::controller::create_application,
        crate::modules::loan_applications::controller::update_application,
        crate::modules::loan_applications::controller::set_status,
        crate::modules::loan_applications::controller::transition_status,
        crate::modules::loan_applications::controller::delete_application,
        crate::modules::uploads::controller::serve_upload,
    ),
    components(
        schemas(
            MessageResponse,
            User,
            SignupDto,
            LoginDto,
            LoginResponse,
            ForgotPasswordDto,
            ForgotPasswordResponse,
            ResetPasswordDto,
            Loan,
            CreateLoanDto,
            UpdateLoanDto,
            LoanApplication,
            LoanApplicationPatch,
            StatusUpdateDto,
            TransitionDto,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Signup, login and password reset"),
        (name = "Loans", description = "Loan products"),
        (name = "Loan Applications", description = "Vehicle loan applications and their status"),
        (name = "Uploads", description = "Application attachments")
    ),
    info(
        title = "AutoLoan API",
        version = "0.1.0",
        description = "Vehicle loan portal: applicants submit applications with supporting documents, admins review them.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/login",
            "/signup",
            "/loans/{id}",
            "/loanApplication",
            "/loanApplication/{id}/status",
            "/loanApplication/{id}/transition",
            "/uploads/{filename}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
