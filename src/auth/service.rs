// Authentication service - business logic layer

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::achievements::{AchievementEngine, AchievementTrigger};
use crate::auth::{
    error::AuthError,
    models::{AuthResponse, Role, User, UserResponse},
    password::PasswordService,
    repository::{TokenRepository, UserRepository},
    token::TokenService,
};

/// Calendar-day login streak rule: same day leaves the streak alone,
/// the next day extends it, any gap resets it to 1.
pub fn next_login_streak(
    last_login_at: Option<DateTime<Utc>>,
    current_streak: i32,
    now: DateTime<Utc>,
) -> i32 {
    let today = now.date_naive();
    match last_login_at {
        None => 1,
        Some(last) => {
            let last_day = last.date_naive();
            if last_day == today {
                current_streak.max(1)
            } else if last_day + Duration::days(1) == today {
                current_streak + 1
            } else {
                1
            }
        }
    }
}

/// Authentication service coordinating all auth operations
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    token_repo: TokenRepository,
    token_service_secret: String,
    achievements: AchievementEngine,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        token_repo: TokenRepository,
        jwt_secret: String,
        achievements: AchievementEngine,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            token_service_secret: jwt_secret,
            achievements,
        }
    }

    fn token_service(&self) -> TokenService {
        TokenService::new(self.token_service_secret.clone())
    }

    /// Register a new user.
    /// Admin accounts cannot be self-registered.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: Option<&str>,
    ) -> Result<AuthResponse, AuthError> {
        PasswordService::validate_password_strength(password)?;

        let role = match role {
            None => Role::Student,
            Some(r) => match Role::from_str(r) {
                Ok(Role::Admin) => {
                    return Err(AuthError::InvalidRole(
                        "Cannot self-register as admin".to_string(),
                    ))
                }
                Ok(role) => role,
                Err(msg) => return Err(AuthError::InvalidRole(msg)),
            },
        };

        let password_hash = PasswordService::hash_password(password)?;
        let user = self
            .user_repo
            .create_user(email, &password_hash, full_name, role)
            .await?;

        tracing::info!("Registered new {} account for user {}", role, user.id);
        self.issue_tokens(user, Vec::new()).await
    }

    /// Login a user.
    ///
    /// Updates the login streak based on the calendar-day delta, then runs
    /// the streak achievement checks. Achievement evaluation can never fail
    /// the login; its errors are logged and swallowed by the engine.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !PasswordService::verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let streak = next_login_streak(user.last_login_at, user.login_streak, now);
        self.user_repo.record_login(user.id, streak, now).await?;

        let granted = self
            .achievements
            .evaluate(AchievementTrigger::Login {
                user_id: user.id,
                streak,
            })
            .await;

        tracing::debug!(
            "User {} logged in, streak {} (day {})",
            user.id,
            streak,
            now.ordinal()
        );

        let user = User {
            login_streak: streak,
            last_login_at: Some(now),
            ..user
        };
        self.issue_tokens(user, granted.into_iter().map(Into::into).collect())
            .await
    }

    /// Exchange a valid refresh token for a new token pair (rotation)
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<AuthResponse, AuthError> {
        let claims = self.token_service().validate_refresh_token(refresh_token)?;

        // The token must also still be stored; rotation invalidates old ones
        self.token_repo
            .find_valid_token(refresh_token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        self.token_repo.delete_token(refresh_token).await?;
        self.issue_tokens(user, Vec::new()).await
    }

    /// Get current user information
    pub async fn get_current_user(&self, user_id: i32) -> Result<UserResponse, AuthError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        Ok(user.into())
    }

    async fn issue_tokens(
        &self,
        user: User,
        new_achievements: Vec<crate::achievements::AchievementResponse>,
    ) -> Result<AuthResponse, AuthError> {
        let (access_token, refresh_token) =
            self.token_service()
                .generate_token_pair(user.id, &user.email, user.role)?;

        let expires_at = Utc::now() + Duration::days(7);
        self.token_repo
            .store_token(user.id, &refresh_token, expires_at)
            .await?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            user: user.into(),
            new_achievements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn first_login_starts_streak() {
        assert_eq!(next_login_streak(None, 0, at(2024, 3, 1, 9)), 1);
    }

    #[test]
    fn same_day_login_keeps_streak() {
        let last = at(2024, 3, 1, 8);
        assert_eq!(next_login_streak(Some(last), 4, at(2024, 3, 1, 22)), 4);
    }

    #[test]
    fn next_day_login_extends_streak() {
        let last = at(2024, 3, 1, 23);
        assert_eq!(next_login_streak(Some(last), 4, at(2024, 3, 2, 0)), 5);
    }

    #[test]
    fn gap_resets_streak() {
        let last = at(2024, 3, 1, 9);
        assert_eq!(next_login_streak(Some(last), 10, at(2024, 3, 3, 9)), 1);
    }

    #[test]
    fn month_boundary_counts_as_consecutive() {
        let last = at(2024, 2, 29, 12);
        assert_eq!(next_login_streak(Some(last), 2, at(2024, 3, 1, 12)), 3);
    }

    #[test]
    fn stale_zero_streak_normalizes_to_one_on_same_day() {
        let last = at(2024, 3, 1, 8);
        assert_eq!(next_login_streak(Some(last), 0, at(2024, 3, 1, 9)), 1);
    }
}
