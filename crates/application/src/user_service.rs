//! 用户服务
//!
//! 登录即按用户名 upsert：首次出现创建用户，再次登录刷新语言偏好。

use std::sync::Arc;

use domain::{LanguageCode, User, UserId, Username};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::repository::UserRepository;

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn login(
        &self,
        username: &str,
        preferred_language: &str,
    ) -> Result<User, ApplicationError> {
        let username = Username::parse(username)?;
        let language = LanguageCode::parse(preferred_language)?;

        if let Some(mut user) = self
            .deps
            .user_repository
            .find_by_username(username.as_str())
            .await?
        {
            if user.preferred_language != language {
                // 语言偏好刷新尽力而为，失败不挡登录
                if let Err(err) = self
                    .deps
                    .user_repository
                    .update_language(user.id, &language)
                    .await
                {
                    tracing::warn!(error = %err, user_id = %user.id, "failed to persist language update");
                }
                user.update_language(language);
            }
            tracing::info!(user_id = %user.id, username = %user.username, "user logged in");
            return Ok(user);
        }

        let user = User::new(
            UserId::from(Uuid::new_v4()),
            username,
            language,
            self.deps.clock.now(),
        );
        let user = self.deps.user_repository.create(user).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "user created");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::repository::memory::MemoryUserRepository;

    const REGISTERED_AT: domain::Timestamp = time::macros::datetime!(2025-06-01 08:00:00 UTC);

    fn service() -> UserService {
        UserService::new(UserServiceDependencies {
            user_repository: Arc::new(MemoryUserRepository::new()),
            clock: Arc::new(FixedClock(REGISTERED_AT)),
        })
    }

    #[tokio::test]
    async fn test_login_creates_then_reuses_user() {
        let service = service();

        let first = service.login("alice", "en").await.unwrap();
        let second = service.login("alice", "en").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, REGISTERED_AT);
    }

    #[tokio::test]
    async fn test_login_refreshes_language() {
        let service = service();

        let first = service.login("alice", "en").await.unwrap();
        let second = service.login("alice", "fr").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.preferred_language.as_str(), "fr");
    }

    #[tokio::test]
    async fn test_login_rejects_invalid_username() {
        let service = service();
        assert!(service.login("  ", "en").await.is_err());
        assert!(service.login("bad!name", "en").await.is_err());
    }
}
