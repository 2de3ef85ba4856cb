use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

use crate::core::identity::{IdentityError, IdentityProvider};
use crate::core::marketplace::{Actor, Profile};
use crate::core::store::Entities;

/// The subset of the hosted auth service's access-token claims we rely on.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: Uuid,
}

/// Validates HS256 access tokens and looks the caller's role up in the
/// profiles collection. Roles in the token itself are ignored; the stored
/// profile is the source of truth.
pub struct JwtIdentityProvider {
    key: DecodingKey,
    validation: Validation,
    entities: Entities,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str, audience: &str, entities: Entities) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            entities,
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn session_subject(&self, token: &str) -> Result<Uuid, IdentityError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))?;
        Ok(data.claims.sub)
    }

    async fn current_actor(&self, token: &str) -> Result<Option<Actor>, IdentityError> {
        let subject = self.session_subject(token).await?;
        let profile: Option<Profile> = self.entities.get(subject).await?;
        Ok(profile.map(|p| Actor::new(p.id, p.role)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::marketplace::{AccountStatus, Role};
    use crate::infra::store::InMemoryEntityStore;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;
    use std::sync::Arc;

    const SECRET: &str = "test-secret";

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        aud: String,
        exp: i64,
    }

    fn token(sub: Uuid, aud: &str, secret: &str, exp_offset: i64) -> String {
        let claims = TestClaims {
            sub: sub.to_string(),
            aud: aud.to_string(),
            exp: Utc::now().timestamp() + exp_offset,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    async fn provider_with_admin() -> (JwtIdentityProvider, Uuid) {
        let entities = Entities::new(Arc::new(InMemoryEntityStore::new()));
        let id = Uuid::new_v4();
        entities
            .create(&Profile {
                id,
                name: "Rita".to_string(),
                contact: None,
                role: Role::Admin,
                is_approved: true,
                status: AccountStatus::Active,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        (JwtIdentityProvider::new(SECRET, "authenticated", entities), id)
    }

    #[tokio::test]
    async fn test_valid_token_resolves_stored_role() {
        let (provider, id) = provider_with_admin().await;

        let actor = provider
            .current_actor(&token(id, "authenticated", SECRET, 3600))
            .await
            .unwrap();
        assert_eq!(actor, Some(Actor::new(id, Role::Admin)));

        let anonymous = provider
            .current_actor(&token(Uuid::new_v4(), "authenticated", SECRET, 3600))
            .await
            .unwrap();
        assert_eq!(anonymous, None);

        let newcomer = Uuid::new_v4();
        let subject = provider
            .session_subject(&token(newcomer, "authenticated", SECRET, 3600))
            .await
            .unwrap();
        assert_eq!(subject, newcomer);
    }

    #[tokio::test]
    async fn test_bad_tokens_are_rejected() {
        let (provider, id) = provider_with_admin().await;

        for bad in [
            token(id, "authenticated", "other-secret", 3600),
            token(id, "anon", SECRET, 3600),
            token(id, "authenticated", SECRET, -3600),
            "not-a-jwt".to_string(),
        ] {
            assert!(matches!(
                provider.current_actor(&bad).await,
                Err(IdentityError::InvalidToken(_))
            ));
        }
    }
}
