use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tracing::debug;
use uuid::Uuid;

use crate::codec::TokenCodec;
use crate::cookies::cookie_value;
use crate::error::{AuthError, AuthResult};
use crate::roles::Role;
use crate::store::{AccountRecord, AccountStore};

/// Per-request identity context, recomputed from scratch on every request.
///
/// Uses the re-validated strategy: the token's subject is looked up in the
/// credential store on every request, so the role here is the live one and
/// tokens for deleted accounts stop working immediately. Downstream
/// handlers treat this as ground truth for the current request only.
#[derive(Debug, Clone)]
pub struct Identity {
    pub account: AccountRecord,
}

impl Identity {
    pub fn id(&self) -> Uuid {
        self.account.id
    }

    pub fn role(&self) -> Role {
        self.account.role
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    Arc<TokenCodec>: FromRef<S>,
    Arc<dyn AccountStore>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let codec = Arc::<TokenCodec>::from_ref(state);
        let store = Arc::<dyn AccountStore>::from_ref(state);

        let token = locate_token(&parts.headers, &codec.config().cookie_name)?;
        let claims = codec.verify(&token)?;

        let account = store
            .find_by_id(claims.subject)
            .await?
            .ok_or(AuthError::AccountGone)?;

        debug!(account_id = %account.id, role = %account.role, "request authenticated");
        Ok(Self { account })
    }
}

/// Locate the session token: the session cookie wins, the Authorization
/// bearer header is the fallback.
fn locate_token(headers: &HeaderMap, cookie_name: &str) -> AuthResult<String> {
    if let Some(token) = cookie_value(headers, cookie_name) {
        return Ok(token);
    }

    match headers.get(AUTHORIZATION) {
        Some(value) => parse_bearer(value),
        None => Err(AuthError::MissingCredentials),
    }
}

fn parse_bearer(value: &axum::http::HeaderValue) -> AuthResult<String> {
    let raw = value
        .to_str()
        .map_err(|_| AuthError::InvalidAuthorization)?
        .trim();

    let token = raw
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthorization)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidAuthorization);
    }

    Ok(token.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use axum::http::header::COOKIE;
    use axum::http::{HeaderValue, Request};
    use chrono::Utc;

    use crate::store::MemoryAccountStore;

    #[derive(Clone)]
    struct TestState {
        codec: Arc<TokenCodec>,
        store: Arc<dyn AccountStore>,
    }

    impl FromRef<TestState> for Arc<TokenCodec> {
        fn from_ref(state: &TestState) -> Self {
            state.codec.clone()
        }
    }

    impl FromRef<TestState> for Arc<dyn AccountStore> {
        fn from_ref(state: &TestState) -> Self {
            state.store.clone()
        }
    }

    fn state_with(store: MemoryAccountStore) -> TestState {
        let codec = TokenCodec::new(SessionConfig::new("extractor-secret", "nexus-storefront"));
        TestState {
            codec: Arc::new(codec),
            store: Arc::new(store),
        }
    }

    fn seed(store: &MemoryAccountStore, role: Role) -> AccountRecord {
        let account = AccountRecord {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            role,
            created_at: Utc::now(),
        };
        store.insert(account.clone());
        account
    }

    fn parts(build: impl FnOnce(axum::http::request::Builder) -> axum::http::request::Builder) -> Parts {
        let request = build(Request::builder().uri("/")).body(()).unwrap();
        request.into_parts().0
    }

    #[tokio::test]
    async fn authenticates_via_session_cookie() {
        let store = MemoryAccountStore::new();
        let account = seed(&store, Role::Seller);
        let state = state_with(store);
        let token = state.codec.issue(account.id, account.role).unwrap().token;

        let mut parts = parts(|b| {
            b.header(
                COOKIE,
                HeaderValue::from_str(&format!("nexus_session={token}")).unwrap(),
            )
        });
        let identity = Identity::from_request_parts(&mut parts, &state)
            .await
            .expect("cookie auth");
        assert_eq!(identity.id(), account.id);
        assert_eq!(identity.role(), Role::Seller);
    }

    #[tokio::test]
    async fn falls_back_to_bearer_header() {
        let store = MemoryAccountStore::new();
        let account = seed(&store, Role::Customer);
        let state = state_with(store);
        let token = state.codec.issue(account.id, account.role).unwrap().token;

        let mut parts = parts(|b| {
            b.header(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
            )
        });
        let identity = Identity::from_request_parts(&mut parts, &state)
            .await
            .expect("bearer auth");
        assert_eq!(identity.id(), account.id);
    }

    #[tokio::test]
    async fn cookie_takes_precedence_over_bearer() {
        let store = MemoryAccountStore::new();
        let cookie_account = seed(&store, Role::Customer);
        let bearer_account = seed(&store, Role::Seller);
        let state = state_with(store);
        let cookie_token = state
            .codec
            .issue(cookie_account.id, cookie_account.role)
            .unwrap()
            .token;
        let bearer_token = state
            .codec
            .issue(bearer_account.id, bearer_account.role)
            .unwrap()
            .token;

        let mut parts = parts(|b| {
            b.header(
                COOKIE,
                HeaderValue::from_str(&format!("nexus_session={cookie_token}")).unwrap(),
            )
            .header(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {bearer_token}")).unwrap(),
            )
        });
        let identity = Identity::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(identity.id(), cookie_account.id);
    }

    #[tokio::test]
    async fn missing_credentials_are_rejected() {
        let state = state_with(MemoryAccountStore::new());
        let mut parts = parts(|b| b);
        let err = Identity::from_request_parts(&mut parts, &state)
            .await
            .expect_err("no credentials");
        assert!(matches!(err, AuthError::MissingCredentials));
    }

    #[tokio::test]
    async fn wrong_authorization_scheme_is_rejected() {
        let state = state_with(MemoryAccountStore::new());
        let mut parts = parts(|b| b.header(AUTHORIZATION, HeaderValue::from_static("Basic abc")));
        let err = Identity::from_request_parts(&mut parts, &state)
            .await
            .expect_err("wrong scheme");
        assert!(matches!(err, AuthError::InvalidAuthorization));
    }

    #[tokio::test]
    async fn deleted_account_invalidates_token() {
        let store = MemoryAccountStore::new();
        let account = seed(&store, Role::Seller);
        let state = state_with(store.clone());
        let token = state.codec.issue(account.id, account.role).unwrap().token;

        store.remove(account.id);

        let mut parts = parts(|b| {
            b.header(
                COOKIE,
                HeaderValue::from_str(&format!("nexus_session={token}")).unwrap(),
            )
        });
        let err = Identity::from_request_parts(&mut parts, &state)
            .await
            .expect_err("account gone");
        assert!(matches!(err, AuthError::AccountGone));
    }

    #[tokio::test]
    async fn live_role_wins_over_token_role() {
        // A demotion takes effect on the next request even though the token
        // still carries the old role.
        let store = MemoryAccountStore::new();
        let mut account = seed(&store, Role::Seller);
        let state = state_with(store.clone());
        let token = state.codec.issue(account.id, Role::Seller).unwrap().token;

        account.role = Role::Customer;
        store.insert(account.clone());

        let mut parts = parts(|b| {
            b.header(
                COOKIE,
                HeaderValue::from_str(&format!("nexus_session={token}")).unwrap(),
            )
        });
        let identity = Identity::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(identity.role(), Role::Customer);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let state = state_with(MemoryAccountStore::new());
        let mut parts = parts(|b| {
            b.header(
                COOKIE,
                HeaderValue::from_static("nexus_session=not.a.token"),
            )
        });
        let err = Identity::from_request_parts(&mut parts, &state)
            .await
            .expect_err("garbage");
        assert!(matches!(err, AuthError::Verification(_)));
    }
}
