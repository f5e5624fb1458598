use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;

use crate::{
    dto::auth::{LoginRequest, LoginResponse, RegisterRequest, UserResponse},
    error::{AppError, AppResult},
    jwt::JwtKeys,
    store::{NewUser, UserRepository},
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register_user<S>(store: &S, payload: RegisterRequest) -> AppResult<UserResponse>
where
    S: UserRepository + ?Sized,
{
    let RegisterRequest {
        name,
        email,
        password,
        role,
    } = payload;

    let name = name.trim().to_string();
    let email = normalize_email(&email);
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("a valid email is required".into()));
    }
    if password.is_empty() {
        return Err(AppError::BadRequest("password is required".into()));
    }

    let password_hash = hash_password(&password)?;

    // uniqueness is enforced by the store, which reports Conflict
    let user = store
        .insert_user(NewUser {
            name,
            email,
            password_hash,
            role: role.unwrap_or_default(),
        })
        .await?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "user registered");
    Ok(user.into())
}

pub async fn login_user<S>(
    store: &S,
    jwt: &JwtKeys,
    payload: LoginRequest,
) -> AppResult<LoginResponse>
where
    S: UserRepository + ?Sized,
{
    let LoginRequest { email, password } = payload;
    let user = store.find_user_by_email(&normalize_email(&email)).await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into())),
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    let argon2 = Argon2::default();
    if argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let token = jwt.issue(user.id, user.role)?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(LoginResponse {
        user: user.into(),
        token,
    })
}
