use super::*;

#[test]
fn http_status_mapping() {
    assert_eq!(AppError::user("bad_input", "oops").http_status(), 400);
    assert_eq!(AppError::not_found("not_found", "missing").http_status(), 404);
    assert_eq!(AppError::auth("auth", "no").http_status(), 401);
    assert_eq!(AppError::forbidden("disabled", "blocked").http_status(), 403);
    assert_eq!(AppError::rate_limited("rate", "slow down").http_status(), 429);
    assert_eq!(AppError::internal("internal", "panic").http_status(), 500);
}

#[test]
fn json_body_carries_message() {
    let v = AppError::auth("invalid_credentials", "invalid credentials").to_json();
    assert_eq!(v["message"], "invalid credentials");
    assert_eq!(v["code"], "invalid_credentials");
}

#[test]
fn auth_status_classification() {
    assert_eq!(AuthError::from_status(401, "invalid credentials"), AuthError::InvalidCredentials("invalid credentials".into()));
    assert_eq!(AuthError::from_status(401, "Account disabled"), AuthError::AccountDisabled("Account disabled".into()));
    assert_eq!(AuthError::from_status(403, "x"), AuthError::AccountDisabled("x".into()));
    assert_eq!(AuthError::from_status(404, "no user"), AuthError::NotFound("no user".into()));
    assert_eq!(AuthError::from_status(400, "missing field"), AuthError::BadRequest("missing field".into()));
    assert_eq!(AuthError::from_status(429, "slow"), AuthError::RateLimited("slow".into()));
    assert_eq!(AuthError::from_status(503, "down"), AuthError::Server { status: 503, message: "down".into() });
}

#[test]
fn malformed_requests_are_not_credential_failures() {
    // a 400 mentioning "invalid" is still a malformed request
    assert_eq!(AuthError::from_status(400, "invalid email format"), AuthError::BadRequest("invalid email format".into()));
    for status in [405, 409, 422] {
        assert_eq!(AuthError::from_status(status, "nope"), AuthError::BadRequest("nope".into()));
    }
    assert_eq!(AuthError::from_status(500, "boom"), AuthError::Server { status: 500, message: "boom".into() });
    assert!(AuthError::from_status(400, "invalid email format").user_message().starts_with("Please fill in"));
}

#[test]
fn invalid_credentials_message_is_form_friendly() {
    let e = AuthError::from_status(401, "invalid password");
    assert!(e.user_message().starts_with("Invalid student ID or password"));
}
