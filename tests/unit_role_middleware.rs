use autoloan::autoloan_auth::{Claims, UserRole};
use autoloan::middleware::auth::AuthUser;
use autoloan::middleware::role::authorize_roles;
use axum::http::StatusCode;
use uuid::Uuid;

fn create_test_auth_user(role: UserRole, user_id: Uuid) -> AuthUser {
    AuthUser(Claims {
        sub: user_id.to_string(),
        role,
        iat: 1234567890,
        exp: 9999999999,
    })
}

#[test]
fn test_authorize_roles_exact_match() {
    let admin = create_test_auth_user(UserRole::Admin, Uuid::new_v4());
    assert!(authorize_roles(&admin, &[UserRole::Admin]).is_ok());

    let applicant = create_test_auth_user(UserRole::Applicant, Uuid::new_v4());
    assert!(authorize_roles(&applicant, &[UserRole::Applicant]).is_ok());
}

#[test]
fn test_authorize_roles_any_of() {
    for role in UserRole::ALL {
        let user = create_test_auth_user(role, Uuid::new_v4());
        assert!(authorize_roles(&user, &UserRole::ALL).is_ok());
    }
}

#[test]
fn test_authorize_roles_no_match() {
    let applicant = create_test_auth_user(UserRole::Applicant, Uuid::new_v4());
    let err = authorize_roles(&applicant, &[UserRole::Admin]).unwrap_err();
    assert_eq!(err.status, StatusCode::FORBIDDEN);
    assert_eq!(err.message(), "Access denied: Insufficient permissions");

    let admin = create_test_auth_user(UserRole::Admin, Uuid::new_v4());
    assert!(authorize_roles(&admin, &[UserRole::Applicant]).is_err());
}

#[test]
fn test_owner_can_access_own_record() {
    let owner = Uuid::new_v4();
    let applicant = create_test_auth_user(UserRole::Applicant, owner);

    assert!(applicant.can_access(owner));
    assert!(!applicant.can_access(Uuid::new_v4()));
}

#[test]
fn test_admin_can_access_any_record() {
    let admin = create_test_auth_user(UserRole::Admin, Uuid::new_v4());
    assert!(admin.can_access(Uuid::new_v4()));
}

#[test]
fn test_user_id_from_claims() {
    let id = Uuid::new_v4();
    let user = create_test_auth_user(UserRole::Applicant, id);
    assert_eq!(user.user_id().unwrap(), id);
    assert_eq!(user.role(), UserRole::Applicant);
    assert!(!user.is_admin());
}
