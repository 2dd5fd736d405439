use actix_web::{http::StatusCode, web, FromRequest, HttpResponse, ResponseError};
use futures_util::future::LocalBoxFuture;
use thiserror::Error;

use super::validator::{TokenValidator, VerifiedUser};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authorization token is missing")]
    MissingToken,
    #[error("{0}")]
    InvalidToken(String),
    #[error("Admin privileges required")]
    AdminRequired,
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AuthError::AdminRequired => StatusCode::FORBIDDEN,
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

// Extractor for any authenticated caller
pub struct AuthenticatedUser(pub VerifiedUser);

// Extractor for callers in the admin group; composes on top of
// AuthenticatedUser so the 401 paths always run first
pub struct AdminUser(pub VerifiedUser);

impl FromRequest for AuthenticatedUser {
    type Error = AuthError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &actix_web::HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let validator: &web::Data<TokenValidator> = req.app_data().unwrap();

            let header = req
                .headers()
                .get("Authorization")
                .ok_or(AuthError::MissingToken)?;

            let raw = header
                .to_str()
                .map_err(|_| AuthError::InvalidToken("Malformed Authorization header".to_string()))?;

            // Scheme prefix is optional; a bare token is accepted too
            let token = match raw.split_once(' ') {
                Some((_scheme, token)) => token.trim(),
                None => raw.trim(),
            };

            let verified = validator
                .validate(token)
                .await
                .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

            Ok(AuthenticatedUser(verified))
        })
    }
}

impl FromRequest for AdminUser {
    type Error = AuthError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &actix_web::HttpRequest, payload: &mut actix_web::dev::Payload) -> Self::Future {
        let auth = AuthenticatedUser::from_request(req, payload);

        Box::pin(async move {
            let AuthenticatedUser(user) = auth.await?;

            if user.groups.iter().any(|group| group == "admin") {
                Ok(AdminUser(user))
            } else {
                Err(AuthError::AdminRequired)
            }
        })
    }
}
