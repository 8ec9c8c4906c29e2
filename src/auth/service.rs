//! Authentication service
//!
//! Email/password accounts with bcrypt hashes and signed session tokens.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::jwt::{generate_token, verify_token, JwtError};
use super::password::{hash_password, verify_password};
use super::AuthError;
use crate::models::{
    Account, AccountResponse, Actor, AuthResponse, LoginRequest, Role, SignupRequest,
    UpdateProfileRequest,
};
use crate::store::{AccountStore, StoreError};

/// Authentication service
pub struct AuthService {
    accounts: Arc<dyn AccountStore>,
    jwt_secret: String,
    jwt_ttl_seconds: i64,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        jwt_secret: String,
        jwt_ttl_seconds: i64,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            accounts,
            jwt_secret,
            jwt_ttl_seconds,
            bcrypt_cost,
        }
    }

    /// Register a customer or mechanic account
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthResponse, AuthError> {
        check(&request)?;
        if request.role == Role::Admin {
            return Err(AuthError::Validation {
                field: "role".to_string(),
                message: "must be customer or mechanic".to_string(),
            });
        }

        let email = normalize_email(&request.email);
        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let account = Account {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            email,
            phone: request.phone,
            role: request.role,
            password_hash: hash_password(&request.password, self.bcrypt_cost).await?,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.accounts.insert(&account).await.map_err(email_conflict)?;

        tracing::info!(account = %account.id, role = account.role.as_str(), "Account created");
        self.session_for(account)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&request.email);
        let account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&request.password, &account.password_hash).await? {
            tracing::debug!(account = %account.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        self.session_for(account)
    }

    pub async fn me(&self, account_id: Uuid) -> Result<AccountResponse, AuthError> {
        Ok(self.account(account_id).await?.into())
    }

    /// Update contact details or the password. Role and id never change.
    pub async fn update_profile(
        &self,
        account_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<AccountResponse, AuthError> {
        check(&request)?;
        let mut account = self.account(account_id).await?;

        if let Some(name) = request.name {
            account.name = name.trim().to_string();
        }
        if let Some(phone) = request.phone {
            account.phone = Some(phone);
        }
        if let Some(email) = request.email {
            let email = normalize_email(&email);
            if email != account.email {
                if self.accounts.find_by_email(&email).await?.is_some() {
                    return Err(AuthError::EmailTaken);
                }
                account.email = email;
            }
        }
        if let Some(password) = request.password {
            account.password_hash = hash_password(&password, self.bcrypt_cost).await?;
        }
        account.updated_at = Some(Utc::now());

        self.accounts.update(&account).await.map_err(email_conflict)?;
        Ok(account.into())
    }

    /// Create the configured admin account if it does not exist yet
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        if let Some(existing) = self.accounts.find_by_email(&email).await? {
            if existing.role != Role::Admin {
                tracing::warn!(email = %email, "Admin email belongs to a non-admin account");
            }
            return Ok(());
        }

        let account = Account {
            id: Uuid::new_v4(),
            name: "Administrator".to_string(),
            email,
            phone: None,
            role: Role::Admin,
            password_hash: hash_password(password, self.bcrypt_cost).await?,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.accounts.insert(&account).await.map_err(email_conflict)?;
        tracing::info!(account = %account.id, "Admin account bootstrapped");
        Ok(())
    }

    /// Decode a bearer token into the caller's identity
    pub fn verify_token(&self, token: &str) -> Result<Actor, JwtError> {
        verify_token(token, &self.jwt_secret)?.actor()
    }

    async fn account(&self, account_id: Uuid) -> Result<Account, AuthError> {
        self.accounts
            .get(account_id)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    fn session_for(&self, account: Account) -> Result<AuthResponse, AuthError> {
        let token = generate_token(&account, &self.jwt_secret, self.jwt_ttl_seconds)?;
        Ok(AuthResponse {
            user: account.into(),
            token,
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_conflict(err: StoreError) -> AuthError {
    match err {
        StoreError::Duplicate(_) => AuthError::EmailTaken,
        other => AuthError::Store(other),
    }
}

/// First failing field of a DTO
fn check<T: Validate>(request: &T) -> Result<(), AuthError> {
    request.validate().map_err(|errors| {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);
        match fields.first() {
            Some((field, errs)) => AuthError::Validation {
                field: field.to_string(),
                message: errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "is invalid".to_string()),
            },
            None => AuthError::Validation {
                field: "request".to_string(),
                message: errors.to_string(),
            },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryAccountStore;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(MemoryAccountStore::default()),
            "test-secret".to_string(),
            3600,
            4,
        )
    }

    fn signup(email: &str, role: Role) -> SignupRequest {
        SignupRequest {
            name: "Siti".to_string(),
            email: email.to_string(),
            phone: Some("081234567890".to_string()),
            password: "rahasia123".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let service = service();
        let created = service
            .signup(signup("Siti@Example.com", Role::Mechanic))
            .await
            .unwrap();
        assert_eq!(created.user.email, "siti@example.com");
        assert_eq!(created.user.role, Role::Mechanic);

        let actor = service.verify_token(&created.token).unwrap();
        assert_eq!(actor, Actor::new(created.user.id, Role::Mechanic));

        let session = service
            .login(LoginRequest {
                email: "siti@example.com".to_string(),
                password: "rahasia123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.user.id, created.user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let service = service();
        service.signup(signup("a@example.com", Role::Customer)).await.unwrap();
        let err = service
            .signup(signup("A@example.com", Role::Customer))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn test_admin_cannot_self_register() {
        let err = service()
            .signup(signup("root@example.com", Role::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation { ref field, .. } if field == "role"));
    }

    #[tokio::test]
    async fn test_short_password_is_rejected() {
        let mut request = signup("b@example.com", Role::Customer);
        request.password = "short".to_string();
        let err = service().signup(request).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation { ref field, .. } if field == "password"));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email() {
        let service = service();
        service.signup(signup("c@example.com", Role::Customer)).await.unwrap();

        let wrong = service
            .login(LoginRequest {
                email: "c@example.com".to_string(),
                password: "not-the-password".to_string(),
            })
            .await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

        let unknown = service
            .login(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "rahasia123".to_string(),
            })
            .await;
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let service = service();
        let created = service.signup(signup("d@example.com", Role::Customer)).await.unwrap();
        service.signup(signup("taken@example.com", Role::Customer)).await.unwrap();

        let updated = service
            .update_profile(
                created.user.id,
                UpdateProfileRequest {
                    name: Some("Siti Rahma".to_string()),
                    password: Some("baru-sekali".to_string()),
                    ..UpdateProfileRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Siti Rahma");
        assert_eq!(updated.role, Role::Customer);

        assert!(service
            .login(LoginRequest {
                email: "d@example.com".to_string(),
                password: "baru-sekali".to_string(),
            })
            .await
            .is_ok());

        let err = service
            .update_profile(
                created.user.id,
                UpdateProfileRequest {
                    email: Some("taken@example.com".to_string()),
                    ..UpdateProfileRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let service = service();
        service.ensure_admin("admin@example.com", "admin-pass").await.unwrap();
        service.ensure_admin("admin@example.com", "admin-pass").await.unwrap();

        let session = service
            .login(LoginRequest {
                email: "admin@example.com".to_string(),
                password: "admin-pass".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.user.role, Role::Admin);
    }
}
