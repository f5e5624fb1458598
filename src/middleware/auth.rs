use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use uuid::Uuid;

use crate::{
    error::AppError,
    jwt::JwtKeys,
    models::Role,
    state::AppState,
};

/// Identity taken from a verified bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

/// An [`AuthUser`] whose role is `Admin`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    match user.role {
        Role::Admin => Ok(()),
        Role::Customer => Err(AppError::Forbidden),
    }
}

/// Validates an `Authorization` header value and extracts the caller.
pub fn authenticate(header_value: Option<&str>, keys: &JwtKeys) -> Result<AuthUser, AppError> {
    let auth_str = header_value
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;

    let claims = keys.verify(token)?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

    Ok(AuthUser {
        user_id,
        role: claims.role,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = match parts.headers.get(header::AUTHORIZATION) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?,
            ),
            None => None,
        };
        authenticate(header_value, &state.jwt)
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        ensure_admin(&user)?;
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new("middleware-secret", 24)
    }

    #[test]
    fn accepts_valid_bearer_token() {
        let keys = keys();
        let user_id = Uuid::new_v4();
        let header = format!("Bearer {}", keys.issue(user_id, Role::Customer).unwrap());

        let user = authenticate(Some(&header), &keys).unwrap();

        assert_eq!(user.user_id, user_id);
        assert_eq!(user.role, Role::Customer);
    }

    #[test]
    fn missing_or_malformed_header_is_unauthorized() {
        let keys = keys();
        for header in [None, Some("Token abc"), Some("Bearer "), Some("Bearer not-a-jwt")] {
            let err = authenticate(header, &keys).unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(_)), "{header:?}");
        }
    }

    #[test]
    fn admin_gate_rejects_customers() {
        let customer = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Customer,
        };
        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert!(matches!(ensure_admin(&customer), Err(AppError::Forbidden)));
        assert!(ensure_admin(&admin).is_ok());
    }
}
