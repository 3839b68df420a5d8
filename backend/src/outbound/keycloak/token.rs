//! Access token verification against the realm signing keys.
//!
//! Keys are fetched from the realm JWKS endpoint and cached by key id. A token
//! signed with an unknown key id triggers a refresh so rotated keys are
//! picked up without a restart, but at most one refresh runs at a time and
//! refreshes are spaced by a minimum interval. Forged key ids therefore cost
//! one JWKS fetch per interval, not one per request.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::debug;

use crate::domain::AuthId;
use crate::domain::ports::IdentityProviderError;

/// Signature algorithms accepted for realm access tokens.
pub(super) const ACCEPTED_ALGORITHMS: [Algorithm; 3] =
    [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

#[derive(Debug, Deserialize)]
struct AccessTokenClaims {
    sub: String,
}

/// Signing key of a token, as named by its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct TokenKey {
    pub(super) kid: String,
    pub(super) algorithm: Algorithm,
}

/// Read the key id and algorithm from the token header without verifying it.
pub(super) fn token_key(token: &str) -> Result<TokenKey, IdentityProviderError> {
    let header = decode_header(token)
        .map_err(|err| IdentityProviderError::invalid_token(err.to_string()))?;
    if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
        return Err(IdentityProviderError::invalid_token(format!(
            "unsupported signing algorithm {:?}",
            header.alg
        )));
    }
    let kid = header
        .kid
        .ok_or_else(|| IdentityProviderError::invalid_token("token has no key id"))?;
    Ok(TokenKey {
        kid,
        algorithm: header.alg,
    })
}

/// Seconds past `exp` a token is still accepted. Zero: an expired token is
/// reported as expired as soon as its `exp` passes.
pub(super) const EXPIRY_LEEWAY_SECS: u64 = 0;

/// Validation for realm tokens: signature, expiry, and issuer. Audience is
/// not checked because Keycloak issues account-audience tokens to clients.
pub(super) fn realm_validation(algorithm: Algorithm, issuer: &str) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.set_issuer(&[issuer]);
    validation.validate_aud = false;
    validation.leeway = EXPIRY_LEEWAY_SECS;
    validation
}

/// Verify `token` with `key` and return its subject.
pub(super) fn verify_subject(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<AuthId, IdentityProviderError> {
    let data = decode::<AccessTokenClaims>(token, key, validation).map_err(|err| {
        match err.kind() {
            ErrorKind::ExpiredSignature => IdentityProviderError::token_expired(),
            _ => IdentityProviderError::invalid_token(err.to_string()),
        }
    })?;
    AuthId::new(data.claims.sub)
        .map_err(|err| IdentityProviderError::invalid_token(format!("subject: {err}")))
}

/// Decoding keys indexed by key id. Keys without an id or with unsupported
/// parameters are skipped.
pub(super) fn index_keys(jwks: &JwkSet) -> HashMap<String, DecodingKey> {
    jwks.keys
        .iter()
        .filter_map(|jwk| {
            let kid = jwk.common.key_id.clone()?;
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => Some((kid, key)),
                Err(err) => {
                    debug!(kid, error = %err, "skipping unusable signing key");
                    None
                }
            }
        })
        .collect()
}

/// Cached realm signing keys plus the refresh gate.
pub(super) struct SigningKeyCache {
    keys: RwLock<HashMap<String, DecodingKey>>,
    last_refresh: Mutex<Option<Instant>>,
    min_refresh_interval: Duration,
}

/// Exclusive right to refresh the cache, held for the whole fetch.
pub(super) struct RefreshPermit<'a> {
    last_refresh: MutexGuard<'a, Option<Instant>>,
}

impl RefreshPermit<'_> {
    /// Record the attempt. Called before fetching so a failing endpoint is
    /// throttled too.
    pub(super) fn mark_started(&mut self, now: Instant) {
        *self.last_refresh = Some(now);
    }
}

impl SigningKeyCache {
    pub(super) fn new(min_refresh_interval: Duration) -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            last_refresh: Mutex::new(None),
            min_refresh_interval,
        }
    }

    pub(super) async fn get(&self, kid: &str) -> Option<DecodingKey> {
        self.keys.read().await.get(kid).cloned()
    }

    pub(super) async fn replace(&self, keys: HashMap<String, DecodingKey>) {
        *self.keys.write().await = keys;
    }

    /// Wait for any running refresh, then grant a permit if the last attempt
    /// is older than the minimum interval.
    ///
    /// Callers must look the key up again after acquiring the permit or
    /// receiving `None`: a refresh that ran while they waited may have loaded
    /// it.
    pub(super) async fn refresh_permit(&self, now: Instant) -> Option<RefreshPermit<'_>> {
        let last_refresh = self.last_refresh.lock().await;
        let due = last_refresh
            .is_none_or(|at| now.saturating_duration_since(at) >= self.min_refresh_interval);
        due.then_some(RefreshPermit { last_refresh })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use rstest::rstest;
    use serde::Serialize;
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &[u8] = b"realm-test-secret";
    const ISSUER: &str = "http://keycloak.test/realms/wallet";

    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        iss: &'a str,
        exp: u64,
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock after epoch")
            .as_secs()
    }

    fn sign(header: &Header, sub: &str, iss: &str, exp: u64) -> String {
        encode(
            header,
            &Claims { sub, iss, exp },
            &EncodingKey::from_secret(SECRET),
        )
        .expect("token encodes")
    }

    fn hmac_validation() -> Validation {
        realm_validation(Algorithm::HS256, ISSUER)
    }

    #[rstest]
    fn valid_token_yields_subject() {
        let token = sign(&Header::new(Algorithm::HS256), "kc-1", ISSUER, now() + 300);
        let auth_id = verify_subject(&token, &DecodingKey::from_secret(SECRET), &hmac_validation())
            .expect("token verifies");
        assert_eq!(auth_id.as_str(), "kc-1");
    }

    #[rstest]
    fn expired_token_is_reported_as_expired() {
        let token = sign(&Header::new(Algorithm::HS256), "kc-1", ISSUER, now() - 3_600);
        let err = verify_subject(&token, &DecodingKey::from_secret(SECRET), &hmac_validation())
            .expect_err("token expired an hour ago");
        assert_eq!(err, IdentityProviderError::token_expired());
    }

    #[rstest]
    #[case::wrong_key(b"another-secret".as_slice(), ISSUER)]
    #[case::wrong_issuer(SECRET, "http://elsewhere.test/realms/wallet")]
    fn mismatched_tokens_are_invalid(#[case] key: &[u8], #[case] issuer: &str) {
        let token = sign(&Header::new(Algorithm::HS256), "kc-1", issuer, now() + 300);
        let err = verify_subject(&token, &DecodingKey::from_secret(key), &hmac_validation())
            .expect_err("verification fails");
        assert!(matches!(err, IdentityProviderError::InvalidToken { .. }));
    }

    #[rstest]
    fn blank_subject_is_invalid() {
        let token = sign(&Header::new(Algorithm::HS256), " ", ISSUER, now() + 300);
        let err = verify_subject(&token, &DecodingKey::from_secret(SECRET), &hmac_validation())
            .expect_err("subject is blank");
        assert!(matches!(err, IdentityProviderError::InvalidToken { .. }));
    }

    #[rstest]
    fn header_must_name_an_accepted_algorithm() {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("k1".to_owned());
        let token = sign(&header, "kc-1", ISSUER, now() + 300);
        let err = token_key(&token).expect_err("hmac is not accepted for realm tokens");
        assert!(matches!(err, IdentityProviderError::InvalidToken { .. }));
    }

    #[rstest]
    #[case("not-a-jwt")]
    #[case("")]
    fn malformed_tokens_are_invalid(#[case] token: &str) {
        assert!(matches!(
            token_key(token),
            Err(IdentityProviderError::InvalidToken { .. })
        ));
    }

    #[rstest]
    fn keys_without_id_are_skipped() {
        let jwks: JwkSet = serde_json::from_value(serde_json::json!({
            "keys": [{
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "n": "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw",
                "e": "AQAB"
            }]
        }))
        .expect("valid jwks");
        assert!(index_keys(&jwks).is_empty());
    }

    #[rstest]
    fn recently_expired_token_gets_no_grace() {
        let token = sign(&Header::new(Algorithm::HS256), "kc-1", ISSUER, now() - 5);
        let err = verify_subject(&token, &DecodingKey::from_secret(SECRET), &hmac_validation())
            .expect_err("token expired five seconds ago");
        assert_eq!(err, IdentityProviderError::token_expired());
    }

    #[rstest]
    #[tokio::test]
    async fn refresh_is_spaced_by_the_minimum_interval() {
        let cache = SigningKeyCache::new(Duration::from_secs(30));
        let start = Instant::now();

        let mut permit = cache.refresh_permit(start).await.expect("first refresh allowed");
        permit.mark_started(start);
        drop(permit);

        assert!(cache.refresh_permit(start + Duration::from_secs(29)).await.is_none());
        assert!(cache.refresh_permit(start + Duration::from_secs(30)).await.is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn unused_permit_does_not_start_the_cooldown() {
        let cache = SigningKeyCache::new(Duration::from_secs(30));
        let start = Instant::now();

        drop(cache.refresh_permit(start).await);

        assert!(cache.refresh_permit(start).await.is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn cache_replaces_keys() {
        let cache = SigningKeyCache::new(Duration::ZERO);
        assert!(cache.get("k1").await.is_none());

        let mut keys = HashMap::new();
        keys.insert("k1".to_owned(), DecodingKey::from_secret(SECRET));
        cache.replace(keys).await;

        assert!(cache.get("k1").await.is_some());
        assert!(cache.get("k2").await.is_none());
    }
}
