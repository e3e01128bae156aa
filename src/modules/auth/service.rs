use sqlx::PgPool;
use tracing::{instrument, warn};
use uuid::Uuid;

use supernova_auth::{create_access_token, create_refresh_token, verify_refresh_token};
use supernova_config::JwtConfig;
use supernova_core::{AppError, verify_password};
use supernova_observability::{
    track_jwt_issued, track_user_login_failure, track_user_login_success,
};

use crate::modules::users::model::{USER_COLUMNS, User, UserCredentials};
use crate::utils::auth_helpers::normalize_email;

use super::model::{LoginRequest, LoginResponse};

const INVALID_CREDENTIALS: &str = "Incorrect email or password";
const INACTIVE_ACCOUNT: &str = "User account is not active";

pub struct AuthService;

impl AuthService {
    #[instrument(skip(db, dto, jwt_config), fields(db.operation = "SELECT", db.table = "users"))]
    pub async fn login(
        db: &PgPool,
        dto: LoginRequest,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        let email = normalize_email(&dto.email);

        let credentials = sqlx::query_as::<_, UserCredentials>(&format!(
            "SELECT {}, password FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(&email)
        .fetch_optional(db)
        .await?;

        let Some(credentials) = credentials else {
            track_user_login_failure("unknown_email");
            warn!(user.email = %email, "Login attempt for unknown email");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        };

        if !verify_password(&dto.password, &credentials.password)? {
            track_user_login_failure("invalid_password");
            warn!(user.id = %credentials.user.id, "Login attempt with wrong password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        if !credentials.user.is_active {
            track_user_login_failure("inactive_account");
            return Err(AppError::unauthorized(INACTIVE_ACCOUNT));
        }

        track_user_login_success(credentials.user.role.as_str());
        Self::issue_tokens(credentials.user, jwt_config)
    }

    /// Verifies the refresh token and re-reads the user so that role,
    /// school and activation changes take effect on the next pair.
    #[instrument(skip(db, refresh_token, jwt_config), fields(db.operation = "SELECT", db.table = "users"))]
    pub async fn refresh(
        db: &PgPool,
        refresh_token: &str,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        let claims = verify_refresh_token(refresh_token, jwt_config)?;

        let user = Self::find_user(db, claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("User not found"))?;

        if !user.is_active {
            return Err(AppError::unauthorized(INACTIVE_ACCOUNT));
        }

        Self::issue_tokens(user, jwt_config)
    }

    async fn find_user(db: &PgPool, user_id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    fn issue_tokens(user: User, jwt_config: &JwtConfig) -> Result<LoginResponse, AppError> {
        let access_token =
            create_access_token(user.id, &user.email, user.role, user.school_id, jwt_config)?;
        let refresh_token = create_refresh_token(user.id, &user.email, jwt_config)?;
        track_jwt_issued();

        Ok(LoginResponse {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: jwt_config.access_token_expiry,
            user,
        })
    }
}
