//! Token service.
//!
//! Issues and verifies HS256 JWTs. Access tokens are stateless; refresh
//! tokens carry a `jti` recorded in the `refresh_token` table so they can be
//! revoked on rotation.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use lookbook_common::{AppError, AppResult, IdGenerator, config::AuthConfig};
use lookbook_db::{
    entities::{refresh_token, user},
    repositories::{RefreshTokenRepository, UserRepository},
};
use sea_orm::{ConnectionTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::user::verify_password;

const ACCESS: &str = "access";
const REFRESH: &str = "refresh";

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    /// Token type: `access` or `refresh`.
    pub typ: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Token service for authentication.
#[derive(Clone)]
pub struct TokenService {
    user_repo: UserRepository,
    refresh_repo: RefreshTokenRepository,
    id_gen: IdGenerator,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    /// Create a new token service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        refresh_repo: RefreshTokenRepository,
        config: &AuthConfig,
    ) -> Self {
        Self {
            user_repo,
            refresh_repo,
            id_gen: IdGenerator::new(),
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl: Duration::seconds(config.access_token_ttl_secs),
            refresh_ttl: Duration::seconds(config.refresh_token_ttl_secs),
        }
    }

    /// Exchange credentials for a token pair.
    pub async fn obtain(&self, username: &str, password: &str) -> AppResult<TokenPair> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash)? {
            debug!(username = %username, "Rejected login with wrong password");
            return Err(AppError::Unauthorized);
        }

        if !user.is_active {
            return Err(AppError::Forbidden("Account is deactivated".to_string()));
        }

        let pair = self.issue_pair(self.refresh_repo.db(), &user.id).await?;
        info!(user_id = %user.id, "Issued token pair");
        Ok(pair)
    }

    /// Rotate a refresh token: the presented token is revoked and a new pair issued.
    pub async fn refresh(&self, token: &str) -> AppResult<TokenPair> {
        let claims = self.decode(token, REFRESH)?;
        let jti = claims.jti.ok_or(AppError::Unauthorized)?;

        let txn = self
            .refresh_repo
            .db()
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let record = RefreshTokenRepository::find_by_id_with(&txn, &jti)
            .await?
            .filter(|r| !r.is_revoked() && r.user_id == claims.sub)
            .ok_or(AppError::Unauthorized)?;

        UserRepository::find_by_id_with(&txn, &record.user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let user_id = record.user_id.clone();
        let mut active: refresh_token::ActiveModel = record.into();
        active.revoked_at = Set(Some(Utc::now().into()));
        RefreshTokenRepository::update_with(&txn, active).await?;

        let pair = self.issue_pair(&txn, &user_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        debug!(user_id = %user_id, "Rotated refresh token");
        Ok(pair)
    }

    /// Resolve an access token to its account. Deactivated accounts still resolve.
    pub async fn authenticate(&self, token: &str) -> AppResult<user::Model> {
        let claims = self.decode(token, ACCESS)?;
        self.user_repo
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    fn decode(&self, token: &str, expected_typ: &str) -> AppResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                debug!(error = %e, "Rejected token");
                AppError::Unauthorized
            })?;

        if data.claims.typ != expected_typ {
            return Err(AppError::Unauthorized);
        }
        Ok(data.claims)
    }

    fn sign(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    async fn issue_pair<C: ConnectionTrait>(&self, conn: &C, user_id: &str) -> AppResult<TokenPair> {
        let now = Utc::now();

        let access = self.sign(&Claims {
            sub: user_id.to_string(),
            typ: ACCESS.to_string(),
            jti: None,
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        })?;

        let jti = self.id_gen.generate_token();
        let expires_at = now + self.refresh_ttl;
        let refresh = self.sign(&Claims {
            sub: user_id.to_string(),
            typ: REFRESH.to_string(),
            jti: Some(jti.clone()),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        })?;

        RefreshTokenRepository::create_with(
            conn,
            refresh_token::ActiveModel {
                id: Set(jti),
                user_id: Set(user_id.to_string()),
                expires_at: Set(expires_at.into()),
                revoked_at: Set(None),
                created_at: Set(now.into()),
            },
        )
        .await?;

        Ok(TokenPair { access, refresh })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::policy::test_support;
    use crate::services::user::hash_password;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 604_800,
            setup_admin_token: None,
        }
    }

    fn create_test_service(user_db: DatabaseConnection, token_db: DatabaseConnection) -> TokenService {
        TokenService::new(
            UserRepository::new(Arc::new(user_db)),
            RefreshTokenRepository::new(Arc::new(token_db)),
            &auth_config(),
        )
    }

    fn token_record(jti: &str, user_id: &str) -> refresh_token::Model {
        let now = Utc::now();
        refresh_token::Model {
            id: jti.to_string(),
            user_id: user_id.to_string(),
            expires_at: (now + Duration::days(7)).into(),
            revoked_at: None,
            created_at: now.into(),
        }
    }

    fn with_password(mut user: user::Model, password: &str) -> user::Model {
        user.password_hash = hash_password(password).unwrap();
        user
    }

    #[tokio::test]
    async fn test_obtain_and_authenticate() {
        let alice = with_password(test_support::user("alice"), "hunter2hunter2");
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[alice.clone()]])
            .append_query_results([[alice]])
            .into_connection();
        let token_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[token_record("jti", "alice")]])
            .into_connection();
        let service = create_test_service(user_db, token_db);

        let pair = service.obtain("alice", "hunter2hunter2").await.unwrap();
        let user = service.authenticate(&pair.access).await.unwrap();
        assert_eq!(user.id, "alice");
    }

    #[tokio::test]
    async fn test_obtain_wrong_password() {
        let alice = with_password(test_support::user("alice"), "hunter2hunter2");
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[alice]])
            .into_connection();
        let token_db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = create_test_service(user_db, token_db);

        let result = service.obtain("alice", "wrong-password").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_obtain_deactivated() {
        let alice = with_password(test_support::inactive("alice"), "hunter2hunter2");
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[alice]])
            .into_connection();
        let token_db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = create_test_service(user_db, token_db);

        let result = service.obtain("alice", "hunter2hunter2").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let now = Utc::now();
        let refresh = service
            .sign(&Claims {
                sub: "alice".to_string(),
                typ: REFRESH.to_string(),
                jti: Some("jti".to_string()),
                iat: now.timestamp(),
                exp: (now + Duration::hours(1)).timestamp(),
            })
            .unwrap();

        assert!(matches!(
            service.authenticate(&refresh).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let past = Utc::now() - Duration::hours(2);
        let access = service
            .sign(&Claims {
                sub: "alice".to_string(),
                typ: ACCESS.to_string(),
                jti: None,
                iat: past.timestamp(),
                exp: (past + Duration::minutes(1)).timestamp(),
            })
            .unwrap();

        assert!(matches!(
            service.authenticate(&access).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_refresh_revoked_token_rejected() {
        let now = Utc::now();
        let mut revoked = token_record("jti-1", "alice");
        revoked.revoked_at = Some(now.into());

        let token_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[revoked]])
            .into_connection();
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            token_db,
        );

        let refresh = service
            .sign(&Claims {
                sub: "alice".to_string(),
                typ: REFRESH.to_string(),
                jti: Some("jti-1".to_string()),
                iat: now.timestamp(),
                exp: (now + Duration::hours(1)).timestamp(),
            })
            .unwrap();

        assert!(matches!(
            service.refresh(&refresh).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates() {
        let now = Utc::now();
        let mut revoked = token_record("jti-1", "alice");
        revoked.revoked_at = Some(now.into());

        // The transaction runs on the token connection, so the user lookup is queued there too.
        let token_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[token_record("jti-1", "alice")]])
            .append_query_results([[test_support::user("alice")]])
            .append_query_results([[revoked]])
            .append_query_results([[token_record("jti-2", "alice")]])
            .into_connection();
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            token_db,
        );

        let refresh = service
            .sign(&Claims {
                sub: "alice".to_string(),
                typ: REFRESH.to_string(),
                jti: Some("jti-1".to_string()),
                iat: now.timestamp(),
                exp: (now + Duration::hours(1)).timestamp(),
            })
            .unwrap();

        let pair = service.refresh(&refresh).await.unwrap();
        assert_ne!(pair.refresh, refresh);
    }
}
