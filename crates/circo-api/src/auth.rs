//! Bearer-token gate.
//!
//! The configuration holds only the SHA-256 (hex) of the token; requests
//! present the token itself.

use std::sync::Arc;

use axum::{
  Router,
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::{self, Next},
  response::Response,
};
use sha2::{Digest, Sha256};

use crate::error::ApiError;

/// SHA-256 (hex) of `token`, as stored in configuration.
pub fn hash_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// Check the `Authorization: Bearer <token>` header against `expected_sha256`.
pub fn verify_token(headers: &HeaderMap, expected_sha256: &str) -> Result<(), ApiError> {
  let token = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or(ApiError::Unauthorized)?;

  if !hash_token(token).eq_ignore_ascii_case(expected_sha256.trim()) {
    return Err(ApiError::Unauthorized);
  }
  Ok(())
}

async fn check(
  State(expected): State<Arc<str>>,
  req: Request,
  next: Next,
) -> Result<Response, ApiError> {
  verify_token(req.headers(), &expected)?;
  Ok(next.run(req).await)
}

/// Wrap every route of `router` in the token check.
pub fn require_token(router: Router, token_sha256: &str) -> Router {
  let expected: Arc<str> = Arc::from(token_sha256);
  router.layer(middleware::from_fn_with_state(expected, check))
}
