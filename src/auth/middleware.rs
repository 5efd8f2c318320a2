// Authentication middleware for protected routes

use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{header, request::Parts, Request},
    middleware::Next,
    response::Response,
};

use crate::auth::{error::AuthError, models::Role, token::TokenService};
use tracing::warn;

/// Authenticated user extractor for protected routes
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

impl AuthenticatedUser {
    /// True when the user may edit the given course (owner or admin)
    pub fn can_manage_course(&self, instructor_id: i32) -> bool {
        self.user_id == instructor_id || self.role == Role::Admin
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| AuthError::TokenGenerationError("JWT_SECRET not configured".to_string()))?;

        let token_service = TokenService::new(jwt_secret);
        let claims = token_service.validate_access_token(token)?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// Authorization middleware that requires a specific role.
/// Admin satisfies every requirement.
#[derive(Debug, Clone)]
pub struct RequireRole {
    required_role: Role,
}

impl RequireRole {
    pub fn new(required_role: Role) -> Self {
        Self { required_role }
    }

    /// Middleware that requires Admin role
    pub fn admin() -> Self {
        Self::new(Role::Admin)
    }

    /// Middleware that requires Instructor role (or admin)
    pub fn instructor() -> Self {
        Self::new(Role::Instructor)
    }

    fn satisfies(&self, actual: Role) -> bool {
        actual == Role::Admin || actual == self.required_role
    }

    /// Middleware function that validates role-based access
    pub async fn middleware(
        self,
        request: Request<Body>,
        next: Next,
    ) -> Result<Response, AuthError> {
        let endpoint = request.uri().path().to_string();

        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .ok_or_else(|| {
                warn!(
                    "Missing Authorization header in request to protected endpoint: {}",
                    endpoint
                );
                AuthError::MissingToken
            })?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| AuthError::TokenGenerationError("JWT_SECRET not configured".to_string()))?;

        let token_service = TokenService::new(jwt_secret);
        let claims = token_service.validate_access_token(token)?;

        if !self.satisfies(claims.role) {
            return Err(AuthError::InsufficientPermissions {
                required: self.required_role,
                actual: claims.role,
            });
        }

        Ok(next.run(request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_satisfies_everything() {
        assert!(RequireRole::instructor().satisfies(Role::Admin));
        assert!(RequireRole::admin().satisfies(Role::Admin));
    }

    #[test]
    fn student_cannot_pass_instructor_gate() {
        assert!(!RequireRole::instructor().satisfies(Role::Student));
    }

    #[test]
    fn course_management_authorization() {
        let owner = AuthenticatedUser {
            user_id: 7,
            email: "i@example.com".to_string(),
            role: Role::Instructor,
        };
        let admin = AuthenticatedUser {
            user_id: 1,
            email: "a@example.com".to_string(),
            role: Role::Admin,
        };
        let other = AuthenticatedUser {
            user_id: 8,
            email: "o@example.com".to_string(),
            role: Role::Instructor,
        };
        assert!(owner.can_manage_course(7));
        assert!(admin.can_manage_course(7));
        assert!(!other.can_manage_course(7));
    }
}
