use super::*;
use axum::http::Request;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::env;

const SECRET: &str = "supersecretjwtsecretforunittesting123";
const USER_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

fn set_env_vars() {
    unsafe {
        env::set_var("JWT_USER_SECRET", SECRET);
    }
}

fn token_with(secret: &str, sub: &str, exp: usize) -> String {
    let claims = UserClaims {
        sub: sub.to_string(),
        email: Some("test@example.com".to_string()),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn parts_with_header(value: Option<&str>) -> Parts {
    let mut builder = Request::builder().uri("/api/subscription/stripe/fetch");
    if let Some(value) = value {
        builder = builder.header(axum::http::header::AUTHORIZATION, value);
    }
    let (parts, _) = builder.body(()).unwrap().into_parts();
    parts
}

#[test]
fn test_validate_user_jwt_success() {
    let token = token_with(SECRET, USER_ID, 9999999999);

    let claims = validate_user_jwt(&token, SECRET).expect("Valid token should pass");
    assert_eq!(claims.sub, USER_ID);
    assert_eq!(claims.email.as_deref(), Some("test@example.com"));
}

#[test]
fn test_validate_user_jwt_expired() {
    let token = token_with(SECRET, USER_ID, 1);

    assert!(validate_user_jwt(&token, SECRET).is_err());
}

#[test]
fn test_validate_user_jwt_invalid_signature() {
    let token = token_with("wrongsecret", USER_ID, 9999999999);

    assert!(validate_user_jwt(&token, SECRET).is_err());
}

#[tokio::test]
async fn test_extractor_resolves_user_id() {
    set_env_vars();
    let header = format!("Bearer {}", token_with(SECRET, USER_ID, 9999999999));
    let mut parts = parts_with_header(Some(&header));

    let auth = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(auth.user_id, Uuid::parse_str(USER_ID).unwrap());
}

#[tokio::test]
async fn test_extractor_rejects_missing_or_malformed_header() {
    set_env_vars();

    let mut parts = parts_with_header(None);
    let err = AuthUser::from_request_parts(&mut parts, &()).await.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);

    let mut parts = parts_with_header(Some("Token abc"));
    assert!(AuthUser::from_request_parts(&mut parts, &()).await.is_err());
}

#[tokio::test]
async fn test_extractor_rejects_non_uuid_subject() {
    set_env_vars();
    let header = format!("Bearer {}", token_with(SECRET, "not-a-uuid", 9999999999));
    let mut parts = parts_with_header(Some(&header));

    assert!(AuthUser::from_request_parts(&mut parts, &()).await.is_err());
}
