use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, warn};

use crate::auth::{
    dto::{PublicUser, RegisterRequest},
    error::RegisterError,
    password::CredentialHasher,
    repo::{StoreError, UniqueField, UserStore},
    repo_types::NewUser,
    slug::{slugify, with_suffix, SuffixSource},
};

/// Registration input after presence checks and normalisation.
pub(crate) struct ValidRegistration {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Rejects missing or empty fields. Email is trimmed and lower-cased; name and
/// password are kept exactly as sent.
pub(crate) fn validate(req: RegisterRequest) -> Result<ValidRegistration, RegisterError> {
    let email = req
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());
    let name = req
        .name
        .filter(|n| !n.is_empty());
    let password = req.password.filter(|p| !p.is_empty());

    match (email, password, name) {
        (Some(email), Some(password), Some(name)) => Ok(ValidRegistration {
            email,
            password,
            name,
        }),
        _ => Err(RegisterError::missing_fields()),
    }
}

/// Picks the slug for `name`: the derived candidate if free, otherwise the
/// candidate with one random suffix. The suffixed slug is not re-checked.
pub(crate) async fn resolve_slug(
    store: &dyn UserStore,
    suffixes: &dyn SuffixSource,
    name: &str,
) -> Result<String, StoreError> {
    let candidate = slugify(name);
    if store.find_by_slug(&candidate).await?.is_none() {
        return Ok(candidate);
    }
    let slug = with_suffix(&candidate, suffixes.next_suffix());
    debug!(%candidate, %slug, "slug taken, appended suffix");
    Ok(slug)
}

/// Hashes on the blocking pool; argon2 is CPU bound.
async fn hash_credential(
    hasher: Arc<dyn CredentialHasher>,
    password: String,
) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .context("hashing task panicked")?
}

fn store_failure(err: StoreError) -> RegisterError {
    match err {
        // Lost a race with a concurrent registration of the same email.
        StoreError::Duplicate(UniqueField::Email) => RegisterError::Conflict,
        StoreError::Duplicate(field) => {
            RegisterError::Internal(anyhow::anyhow!("{field} collided on insert"))
        }
        StoreError::Backend(e) => RegisterError::Internal(e),
    }
}

/// Registers a new user and returns its public projection.
pub async fn register_user(
    store: &dyn UserStore,
    hasher: Arc<dyn CredentialHasher>,
    suffixes: &dyn SuffixSource,
    req: RegisterRequest,
) -> Result<PublicUser, RegisterError> {
    let input = validate(req)?;

    if store
        .find_by_email(&input.email)
        .await
        .map_err(store_failure)?
        .is_some()
    {
        warn!(email = %input.email, "email already registered");
        return Err(RegisterError::Conflict);
    }

    let slug = resolve_slug(store, suffixes, &input.name)
        .await
        .map_err(store_failure)?;

    let password_hash = hash_credential(hasher, input.password)
        .await
        .context("hash password")?;

    let user = store
        .create(NewUser {
            email: input.email,
            password_hash,
            name: input.name,
            slug,
        })
        .await
        .map_err(store_failure)?;

    Ok(user.into())
}
