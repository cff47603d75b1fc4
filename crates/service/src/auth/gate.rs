use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use configs::BackendConfig;
use models::profile::{ProfilePatch, UserProfile};

use super::domain::{Access, AccessLevel, Credentials, CurrentUser, RegisterInput};
use super::errors::AuthError;
use crate::backend::{AccountApi, BackendError, DocumentStore, ID_UNIQUE};

/// Caches the signed-in identity and answers privilege and routing questions.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use configs::BackendConfig;
/// use service::auth::{domain::{Credentials, RegisterInput}, SessionGate};
/// use service::backend::MemoryBackend;
///
/// let gate = SessionGate::new(Arc::new(MemoryBackend::new()), &BackendConfig::default());
/// let input = RegisterInput { name: "Asha".into(), email: "asha@grocer.in".into(), password: "Secret123".into() };
/// let user = tokio_test::block_on(gate.register(input)).unwrap();
/// assert_eq!(gate.current_user(), Some(user));
/// tokio_test::block_on(gate.logout()).unwrap();
/// assert!(gate.current_user().is_none());
/// ```
pub struct SessionGate<B> {
    backend: Arc<B>,
    users_collection: String,
    current: ArcSwapOption<CurrentUser>,
}

impl<B: AccountApi + DocumentStore> SessionGate<B> {
    pub fn new(backend: Arc<B>, cfg: &BackendConfig) -> Self {
        Self { backend, users_collection: cfg.user_collection_id.clone(), current: ArcSwapOption::empty() }
    }

    pub fn current_user(&self) -> Option<CurrentUser> { self.current.load_full().map(|u| (*u).clone()) }

    pub fn is_authenticated(&self) -> bool { self.current.load().is_some() }

    fn remember(&self, user: Option<CurrentUser>) { self.current.store(user.map(Arc::new)); }

    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AuthError> {
        match self.backend.get_document(&self.users_collection, user_id).await {
            Ok(raw) => serde_json::from_value(raw)
                .map(Some)
                .map_err(|e| AuthError::Backend(format!("malformed profile: {e}"))),
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Account merged with its profile. A missing profile leaves the role unset.
    async fn load_identity(&self) -> Result<CurrentUser, AuthError> {
        let account = self.backend.get_account().await?;
        let user = match self.load_profile(&account.id).await? {
            Some(profile) => CurrentUser::from_profile(account.id, profile),
            None => {
                debug!(user_id = %account.id, "profile_missing");
                CurrentUser { id: account.id, email: account.email, name: account.name, role: None }
            }
        };
        Ok(user)
    }

    /// Restore the cache from an existing backend session.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Option<CurrentUser>, AuthError> {
        match self.load_identity().await {
            Ok(user) => {
                self.remember(Some(user.clone()));
                Ok(Some(user))
            }
            Err(AuthError::Unauthorized) => {
                self.remember(None);
                Ok(None)
            }
            Err(e) => {
                self.remember(None);
                Err(e)
            }
        }
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: Credentials) -> Result<CurrentUser, AuthError> {
        credentials.validate()?;
        let session = self.backend.create_email_session(credentials.email.trim(), &credentials.password).await?;
        let user = self.load_identity().await?;
        self.remember(Some(user.clone()));
        info!(user_id = %session.user_id, "user_logged_in");
        Ok(user)
    }

    /// Ends the backend session. An already expired session still clears the cache.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AuthError> {
        let result = self.backend.delete_current_session().await;
        self.remember(None);
        match result {
            Ok(()) => {
                info!("user_logged_out");
                Ok(())
            }
            Err(BackendError::Unauthorized(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// `true` only when the user's profile carries the admin role. Any
    /// failure reads as not privileged.
    pub async fn is_privileged(&self, user_id: &str) -> bool {
        match self.load_profile(user_id).await {
            Ok(profile) => profile.is_some_and(|p| p.is_admin()),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "privilege_check_failed");
                false
            }
        }
    }

    async fn create_with_profile(&self, input: &RegisterInput, profile: UserProfile) -> Result<String, AuthError> {
        input.validate()?;
        let account = self
            .backend
            .create_account(ID_UNIQUE, input.email.trim(), &input.password, input.name.trim())
            .await?;
        let body = serde_json::to_value(&profile).map_err(|e| AuthError::Backend(e.to_string()))?;
        self.backend.create_document(&self.users_collection, &account.id, body).await?;
        Ok(account.id)
    }

    /// Create the account and its profile, then sign in.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<CurrentUser, AuthError> {
        let profile = UserProfile::new(input.name.clone(), input.email.clone());
        let user_id = self.create_with_profile(&input, profile).await?;
        info!(user_id = %user_id, "user_registered");
        self.login(input.credentials()).await
    }

    /// Create an account whose profile carries the admin role. Does not sign in.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register_admin(&self, input: RegisterInput) -> Result<CurrentUser, AuthError> {
        let profile = UserProfile::admin(input.name.clone(), input.email.clone());
        let user_id = self.create_with_profile(&input, profile.clone()).await?;
        info!(user_id = %user_id, "admin_registered");
        Ok(CurrentUser::from_profile(user_id, profile))
    }

    /// Write the changed profile fields and merge them into the cached identity.
    #[instrument(skip(self, patch))]
    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<CurrentUser, AuthError> {
        patch.validate()?;
        let mut user = self.current_user().ok_or(AuthError::Unauthorized)?;
        let body = serde_json::to_value(&patch).map_err(|e| AuthError::Backend(e.to_string()))?;
        if body.as_object().is_some_and(|m| !m.is_empty()) {
            let raw: Value = self.backend.update_document(&self.users_collection, &user.id, body).await?;
            let profile: UserProfile =
                serde_json::from_value(raw).map_err(|e| AuthError::Backend(format!("malformed profile: {e}")))?;
            user.name = profile.name;
            user.email = profile.email;
            self.remember(Some(user.clone()));
        }
        Ok(user)
    }

    /// Routing decision for a view at `level`, from the cached identity.
    pub fn guard(&self, level: AccessLevel) -> Access { Access::decide(level, self.current_user()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn gate() -> (Arc<MemoryBackend>, SessionGate<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let gate = SessionGate::new(backend.clone(), &BackendConfig::default());
        (backend, gate)
    }

    fn input(email: &str) -> RegisterInput {
        RegisterInput { name: "Asha".into(), email: email.into(), password: "Secret123".into() }
    }

    #[tokio::test]
    async fn register_logs_in_with_plain_role() {
        let (_, gate) = gate();
        let user = gate.register(input("asha@grocer.in")).await.unwrap();
        assert_eq!(user.email, "asha@grocer.in");
        assert!(!user.is_admin());
        assert!(!gate.is_privileged(&user.id).await);
        assert_eq!(gate.guard(AccessLevel::Admin), Access::RedirectHome);
        assert_eq!(gate.guard(AccessLevel::Authenticated), Access::Granted(Some(user)));
    }

    #[tokio::test]
    async fn admin_login_grants_admin_views() {
        let (_, gate) = gate();
        let admin = gate.register_admin(input("ops@grocer.in")).await.unwrap();
        assert!(gate.current_user().is_none());
        assert!(gate.is_privileged(&admin.id).await);

        let user = gate.login(Credentials::new("ops@grocer.in", "Secret123")).await.unwrap();
        assert!(user.is_admin());
        assert!(matches!(gate.guard(AccessLevel::Admin), Access::Granted(Some(_))));
    }

    #[tokio::test]
    async fn bad_credentials_and_duplicates_are_rejected() {
        let (_, gate) = gate();
        gate.register(input("asha@grocer.in")).await.unwrap();
        assert_eq!(gate.register(input("asha@grocer.in")).await.unwrap_err(), AuthError::Conflict);

        gate.logout().await.unwrap();
        let err = gate.login(Credentials::new("asha@grocer.in", "wrong-pass")).await.unwrap_err();
        assert_eq!(err.code(), 1004);
        assert!(gate.current_user().is_none());
        assert_eq!(gate.guard(AccessLevel::Admin).redirect_path(), Some("/admin/login"));
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_backend() {
        let (backend, gate) = gate();
        let err = gate.login(Credentials::new("not-an-email", "x")).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert!(!gate.is_privileged("unknown").await);
        assert_eq!(backend.document_count("users").await, 0);
    }

    #[tokio::test]
    async fn refresh_restores_existing_session() {
        let (backend, gate) = gate();
        assert_eq!(gate.refresh().await.unwrap(), None);

        gate.register(input("asha@grocer.in")).await.unwrap();
        let fresh = SessionGate::new(backend.clone(), &BackendConfig::default());
        let restored = fresh.refresh().await.unwrap().unwrap();
        assert_eq!(restored.email, "asha@grocer.in");
        assert!(fresh.is_authenticated());
    }

    #[tokio::test]
    async fn profile_updates_merge_into_cache() {
        let (_, gate) = gate();
        assert_eq!(gate.update_profile(ProfilePatch::default()).await.unwrap_err(), AuthError::Unauthorized);

        gate.register(input("asha@grocer.in")).await.unwrap();
        let patch = ProfilePatch { name: Some("Asha K".into()), email: None };
        let user = gate.update_profile(patch).await.unwrap();
        assert_eq!(user.name, "Asha K");
        assert_eq!(gate.current_user().unwrap().name, "Asha K");
    }
}
