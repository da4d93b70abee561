//! Accounts and the signup, login and password-reset payloads.

use std::sync::LazyLock;

use autoloan_auth::UserRole;
use autoloan_core::{FieldOrder, trim_field};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

static MOBILE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("valid mobile regex"));

static ROLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)\s*(admin|applicant|user)\s*$").expect("valid role regex")
});

/// An account as exposed by the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    #[serde(rename = "userName")]
    pub username: String,
    pub email: String,
    pub mobile: String,
    #[sqlx(try_from = "String")]
    #[schema(value_type = String, example = "applicant")]
    pub role: UserRole,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Row used for password checks during login.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub username: String,
    pub password: String,
    #[sqlx(try_from = "String")]
    pub role: UserRole,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SignupDto {
    #[serde(rename = "userName")]
    #[validate(
        required(message = "Username is required"),
        length(min = 1, message = "Username is required")
    )]
    pub user_name: Option<String>,

    #[validate(
        required(message = "Email is required"),
        length(max = 254, message = "Email must be at most 254 characters"),
        regex(path = *EMAIL_PATTERN, message = "Please enter a valid email address")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "Mobile number is required"),
        regex(path = *MOBILE_PATTERN, message = "Mobile number must be 10 digits")
    )]
    pub mobile: Option<String>,

    #[validate(
        required(message = "Password is required"),
        length(min = 6, message = "Password must be at least 6 characters long")
    )]
    pub password: Option<String>,

    #[validate(
        required(message = "Role is required"),
        regex(path = *ROLE_PATTERN, message = "Role must be either admin or applicant")
    )]
    #[schema(example = "applicant")]
    pub role: Option<String>,
}

impl FieldOrder for SignupDto {
    const FIELD_ORDER: &'static [&'static str] =
        &["user_name", "email", "mobile", "password", "role"];

    fn trim_fields(&mut self) {
        trim_field(&mut self.user_name);
        trim_field(&mut self.email);
        trim_field(&mut self.mobile);
    }
}

impl SignupDto {
    pub fn role(&self) -> Option<UserRole> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginDto {
    #[validate(required(message = "Email is required"))]
    pub email: Option<String>,

    #[validate(required(message = "Password is required"))]
    pub password: Option<String>,
}

impl FieldOrder for LoginDto {
    const FIELD_ORDER: &'static [&'static str] = &["email", "password"];
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    #[serde(rename = "userName")]
    pub user_name: String,
    #[schema(value_type = String, example = "applicant")]
    pub role: UserRole,
    pub token: String,
    pub id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordDto {
    #[validate(required(message = "Email is required"))]
    pub email: Option<String>,
}

impl FieldOrder for ForgotPasswordDto {
    const FIELD_ORDER: &'static [&'static str] = &["email"];
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ForgotPasswordResponse {
    pub message: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordDto {
    #[validate(required(message = "Email and new password are required"))]
    pub email: Option<String>,

    #[serde(rename = "newPassword")]
    #[validate(
        required(message = "Email and new password are required"),
        length(min = 6, message = "Password must be at least 6 characters long")
    )]
    pub new_password: Option<String>,
}

impl FieldOrder for ResetPasswordDto {
    const FIELD_ORDER: &'static [&'static str] = &["email", "new_password"];
}

/// Emails are compared and stored trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoloan_core::validate_in_order;

    fn valid_signup() -> SignupDto {
        SignupDto {
            user_name: Some("jdoe".to_string()),
            email: Some("jdoe@example.com".to_string()),
            mobile: Some("9876543210".to_string()),
            password: Some("secret1".to_string()),
            role: Some("applicant".to_string()),
        }
    }

    #[test]
    fn test_valid_signup_passes() {
        assert!(validate_in_order(&valid_signup()).is_ok());
    }

    #[test]
    fn test_signup_reports_first_field_in_order() {
        let dto = SignupDto {
            email: Some("not-an-email".to_string()),
            mobile: Some("123".to_string()),
            ..valid_signup()
        };
        let err = validate_in_order(&dto).unwrap_err();
        assert_eq!(err.message(), "Please enter a valid email address");

        let dto = SignupDto {
            mobile: Some("123".to_string()),
            password: Some("123".to_string()),
            ..valid_signup()
        };
        let err = validate_in_order(&dto).unwrap_err();
        assert_eq!(err.message(), "Mobile number must be 10 digits");
    }

    #[test]
    fn test_signup_missing_username() {
        let dto = SignupDto {
            user_name: None,
            ..valid_signup()
        };
        let err = validate_in_order(&dto).unwrap_err();
        assert_eq!(err.message(), "Username is required");
    }

    #[test]
    fn test_signup_blank_username_after_trim() {
        let mut dto = SignupDto {
            user_name: Some("   ".to_string()),
            mobile: Some(" 9876543210 ".to_string()),
            ..valid_signup()
        };
        dto.trim_fields();
        assert_eq!(dto.mobile.as_deref(), Some("9876543210"));
        let err = validate_in_order(&dto).unwrap_err();
        assert_eq!(err.message(), "Username is required");
    }

    #[test]
    fn test_signup_short_password() {
        let dto = SignupDto {
            password: Some("12345".to_string()),
            ..valid_signup()
        };
        let err = validate_in_order(&dto).unwrap_err();
        assert_eq!(err.message(), "Password must be at least 6 characters long");
    }

    #[test]
    fn test_signup_role_parsing() {
        let dto = SignupDto {
            role: Some("user".to_string()),
            ..valid_signup()
        };
        assert!(validate_in_order(&dto).is_ok());
        assert_eq!(dto.role(), Some(UserRole::Applicant));

        let dto = SignupDto {
            role: Some("superuser".to_string()),
            ..valid_signup()
        };
        let err = validate_in_order(&dto).unwrap_err();
        assert_eq!(err.message(), "Role must be either admin or applicant");
    }

    #[test]
    fn test_signup_deserializes_camel_case() {
        let dto: SignupDto = serde_json::from_str(
            r#"{"userName":"jdoe","email":"a@b.co","mobile":"0123456789","password":"secret1","role":"admin"}"#,
        )
        .unwrap();
        assert_eq!(dto.user_name.as_deref(), Some("jdoe"));
        assert_eq!(dto.role(), Some(UserRole::Admin));
    }

    #[test]
    fn test_reset_password_messages() {
        let dto = ResetPasswordDto {
            email: Some("a@b.co".to_string()),
            new_password: None,
        };
        assert_eq!(
            validate_in_order(&dto).unwrap_err().message(),
            "Email and new password are required"
        );

        let dto = ResetPasswordDto {
            email: Some("a@b.co".to_string()),
            new_password: Some("abc".to_string()),
        };
        assert_eq!(
            validate_in_order(&dto).unwrap_err().message(),
            "Password must be at least 6 characters long"
        );
    }

    #[test]
    fn test_login_response_shape() {
        let id = Uuid::new_v4();
        let response = LoginResponse {
            user_name: "jdoe".to_string(),
            role: UserRole::Applicant,
            token: "t".to_string(),
            id,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["userName"], "jdoe");
        assert_eq!(json["role"], "applicant");
        assert_eq!(json["id"], id.to_string());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  JDoe@Example.COM "), "jdoe@example.com");
    }
}
