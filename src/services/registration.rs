//! Account registration and self-service account management
//!
//! Each operation authorizes first, then normalizes input, then hands the
//! finished record to the `UserRepository`. Nothing is written when
//! authorization or validation fails.
//!
//! Accounts whose reset token is exactly [`FIRST_USE_TOKEN`] are in
//! first-use mode: their next update may also set the username, skips the
//! current-password check and completes setup.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::db::repositories::UserRepository;
use crate::models::{FormFields, Session, User, UserRole, FIRST_USE_TOKEN};
use crate::policy::{self, registration as registration_policy, PolicyError};
use crate::services::account_settings::{
    normalize_file_list, normalize_pagination, normalize_renderer, normalize_tag_cloud,
};
use crate::services::languages::{self, LanguageOption};
use crate::services::password::{generate_password, hash_password, verify_password};
use crate::services::settings::{SettingsService, SettingsServiceError};
use crate::services::user::{UserService, UserServiceError};
use crate::services::validation::{
    validate_confirmation, validate_email, validate_password, validate_username, ValidationErrors,
};

/// Username of the account created on an empty database
pub const INITIAL_ADMIN_USERNAME: &str = "admin";
const INITIAL_ADMIN_EMAIL: &str = "admin@localhost.localdomain";

/// Where the browser goes after each flow
pub mod paths {
    pub const ROOT: &str = "/";
    pub const EDIT: &str = "/users/edit";
    pub const SIGN_UP: &str = "/users/sign_up";
}

/// Flash notices, as translation keys
pub mod notices {
    pub const SIGNED_UP: &str = "devise.registrations.signed_up";
    pub const AWAITING_APPROVAL: &str = "devise.registrations.signed_up_but_not_approved";
    pub const UPDATED: &str = "devise.registrations.updated";
    pub const SETUP_COMPLETE: &str = "devise.registrations.update.setup_complete";
    pub const DESTROYED: &str = "devise.registrations.destroyed";
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Forbidden(#[from] PolicyError),

    #[error("Validation failed: {0}")]
    Invalid(ValidationErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<ValidationErrors> for RegistrationError {
    fn from(errors: ValidationErrors) -> Self {
        RegistrationError::Invalid(errors)
    }
}

impl From<SettingsServiceError> for RegistrationError {
    fn from(e: SettingsServiceError) -> Self {
        RegistrationError::InternalError(anyhow::anyhow!(e))
    }
}

impl From<UserServiceError> for RegistrationError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::InternalError(e) => RegistrationError::InternalError(e),
            other => RegistrationError::InternalError(anyhow::anyhow!(other)),
        }
    }
}

/// Sign-up fields. Anything else in the submission is dropped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub password_confirmation: Option<String>,
    pub username: String,
}

/// Account update fields. Unknown fields (role, approval, ...) are dropped
/// at deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountUpdate {
    pub email: Option<String>,
    /// Only honored in first-use mode
    pub username: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    pub current_password: Option<String>,
    pub interface_language: Option<String>,
    pub sensitive_content_handling: Option<String>,
    pub pagination_settings: Option<FormFields>,
    pub tag_cloud_settings: Option<FormFields>,
    pub file_list_settings: Option<FormFields>,
    pub renderer_settings: Option<FormFields>,
    pub problem_settings: Option<HashMap<String, String>>,
}

impl AccountUpdate {
    fn new_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// Whether this submission touches credentials and so needs the
    /// current password: a different email, or a non-empty new password.
    pub fn requires_current_password(&self, account: &User) -> bool {
        let email_changed = self
            .email
            .as_deref()
            .is_some_and(|email| email != account.email);
        email_changed || self.new_password().is_some()
    }
}

/// The sign-up form
#[derive(Debug, Clone, Serialize)]
pub struct SignUpForm {
    pub site_name: String,
    /// New accounts wait for an administrator before they can sign in
    pub approval_required: bool,
}

/// Result of a successful sign-up
#[derive(Debug)]
pub enum SignUpOutcome {
    SignedIn { user: User, session: Session },
    AwaitingApproval { user: User },
}

/// Which account form to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountView {
    Edit,
    FirstUse,
}

impl AccountView {
    pub fn for_account(account: &User) -> Self {
        if account.is_first_use() {
            AccountView::FirstUse
        } else {
            AccountView::Edit
        }
    }
}

/// Data behind the account form
#[derive(Debug, Clone, Serialize)]
pub struct EditView {
    pub view: AccountView,
    pub user: User,
    pub languages: Vec<LanguageOption>,
}

/// Result of a successful account update
#[derive(Debug)]
pub struct UpdateOutcome {
    pub user: User,
    /// A fresh session, when the update re-established one
    pub session: Option<Session>,
    pub redirect_to: &'static str,
    pub notice: &'static str,
}

pub struct RegistrationService {
    user_repo: Arc<dyn UserRepository>,
    users: Arc<UserService>,
    settings: Arc<SettingsService>,
}

impl RegistrationService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        users: Arc<UserService>,
        settings: Arc<SettingsService>,
    ) -> Self {
        Self {
            user_repo,
            users,
            settings,
        }
    }

    /// Describe the sign-up form.
    pub async fn new_form(&self, current: Option<&User>) -> Result<SignUpForm, RegistrationError> {
        let site = self.settings.get_site_settings().await?;
        policy::authorize(registration_policy::create(current, &site))?;
        Ok(SignUpForm {
            site_name: site.site_name,
            approval_required: site.approve_signups,
        })
    }

    /// Create an account.
    ///
    /// When sign-ups need approval the account is stored unapproved and no
    /// session is created.
    pub async fn sign_up(
        &self,
        current: Option<&User>,
        input: SignUpInput,
    ) -> Result<SignUpOutcome, RegistrationError> {
        let site = self.settings.get_site_settings().await?;
        policy::authorize(registration_policy::create(current, &site))?;

        let mut errors = ValidationErrors::new();
        errors.check("username", validate_username(&input.username));
        errors.check("email", validate_email(&input.email));
        errors.check("password", validate_password(&input.password));
        errors.check(
            "password_confirmation",
            validate_confirmation(&input.password, input.password_confirmation.as_deref()),
        );
        self.check_unique(&mut errors, None, Some(&input.username), Some(&input.email))
            .await?;
        errors.into_result()?;

        let password_hash = hash_password(&input.password)?;
        let mut account = User::new(input.username, input.email, password_hash, UserRole::Member);
        account.approved = !site.approve_signups;

        let user = self
            .user_repo
            .create(&account)
            .await
            .context("Failed to create account")?;
        tracing::info!(user_id = user.id, username = %user.username, "Account created");

        if !user.approved {
            tracing::info!(user_id = user.id, "Account awaiting approval");
            return Ok(SignUpOutcome::AwaitingApproval { user });
        }

        let session = self.users.sign_in(&user).await?;
        Ok(SignUpOutcome::SignedIn { user, session })
    }

    /// The account form for the signed-in account.
    pub fn edit(&self, current: &User) -> Result<EditView, RegistrationError> {
        policy::authorize(registration_policy::manage(Some(current), current))?;
        Ok(EditView {
            view: AccountView::for_account(current),
            user: current.clone(),
            languages: languages::language_options(),
        })
    }

    /// Update the signed-in account.
    pub async fn update(
        &self,
        current: &User,
        mut input: AccountUpdate,
    ) -> Result<UpdateOutcome, RegistrationError> {
        policy::authorize(registration_policy::manage(Some(current), current))?;

        if current.is_first_use() {
            return self.complete_first_use(current, input).await;
        }

        input.username = None;
        let password_changed = input.new_password().is_some();
        let user = self.apply_update(current, input).await?;

        // A password change invalidates other sessions; keep this one alive.
        let session = if password_changed {
            self.users.logout_everywhere(user.id).await?;
            Some(self.users.sign_in(&user).await?)
        } else {
            None
        };

        Ok(UpdateOutcome {
            user,
            session,
            redirect_to: paths::EDIT,
            notice: notices::UPDATED,
        })
    }

    /// Normalize the settings groups and apply an update, re-checking the
    /// current password only when credentials change.
    ///
    /// Without the re-check, email and password fields are ignored even if
    /// submitted.
    pub async fn apply_update(
        &self,
        account: &User,
        input: AccountUpdate,
    ) -> Result<User, RegistrationError> {
        let mut user = account.clone();
        let mut errors = ValidationErrors::new();

        assign_profile(&mut user, &input, &mut errors);

        if input.requires_current_password(account) {
            match input.current_password.as_deref().filter(|p| !p.is_empty()) {
                None => errors.add("current_password", "can't be blank"),
                Some(current_password) => {
                    if !verify_password(current_password, &account.password_hash)? {
                        errors.add("current_password", "is invalid");
                    }
                }
            }
            self.assign_credentials(&mut user, &input, &mut errors)
                .await?;
        }

        errors.into_result()?;

        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update account")?;
        tracing::info!(user_id = updated.id, "Account updated");
        Ok(updated)
    }

    /// Apply a first-use submission: every permitted field including the
    /// username, no password re-check, and the reset token cleared.
    async fn complete_first_use(
        &self,
        account: &User,
        input: AccountUpdate,
    ) -> Result<UpdateOutcome, RegistrationError> {
        let mut user = account.clone();
        let mut errors = ValidationErrors::new();

        assign_profile(&mut user, &input, &mut errors);
        self.assign_credentials(&mut user, &input, &mut errors)
            .await?;
        if let Some(username) = input.username.as_deref() {
            if username != account.username {
                errors.check("username", validate_username(username));
                self.check_unique(&mut errors, Some(account.id), Some(username), None)
                    .await?;
                user.username = username.to_string();
            }
        }
        user.reset_password_token = None;

        errors.into_result()?;

        let user = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to complete account setup")?;
        let session = self.users.sign_in(&user).await?;
        tracing::info!(user_id = user.id, "First-use setup complete");

        Ok(UpdateOutcome {
            user,
            session: Some(session),
            redirect_to: paths::ROOT,
            notice: notices::SETUP_COMPLETE,
        })
    }

    /// Delete the signed-in account and all its sessions.
    pub async fn destroy(&self, current: &User) -> Result<(), RegistrationError> {
        policy::authorize(registration_policy::manage(Some(current), current))?;

        self.users.logout_everywhere(current.id).await?;
        self.user_repo
            .delete(current.id)
            .await
            .context("Failed to delete account")?;
        tracing::info!(user_id = current.id, "Account deleted");
        Ok(())
    }

    /// Authorize abandoning an in-progress external sign-in. The caller
    /// discards the pending state.
    pub fn cancel(&self, current: Option<&User>) -> Result<&'static str, RegistrationError> {
        policy::authorize(registration_policy::cancel(current))?;
        Ok(paths::SIGN_UP)
    }

    /// Create the administrator on an empty database.
    ///
    /// The account starts in first-use mode; the generated password is
    /// returned so it can be shown once.
    pub async fn ensure_initial_admin(&self) -> Result<Option<(User, String)>, RegistrationError> {
        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;
        if count > 0 {
            return Ok(None);
        }

        let password = generate_password(24);
        let mut admin = User::new(
            INITIAL_ADMIN_USERNAME.to_string(),
            INITIAL_ADMIN_EMAIL.to_string(),
            hash_password(&password)?,
            UserRole::Administrator,
        );
        admin.reset_password_token = Some(FIRST_USE_TOKEN.to_string());

        let admin = self
            .user_repo
            .create(&admin)
            .await
            .context("Failed to create initial administrator")?;
        Ok(Some((admin, password)))
    }

    /// Email change and new password, validated.
    async fn assign_credentials(
        &self,
        user: &mut User,
        input: &AccountUpdate,
        errors: &mut ValidationErrors,
    ) -> Result<(), RegistrationError> {
        if let Some(email) = input.email.as_deref() {
            if email != user.email {
                errors.check("email", validate_email(email));
                self.check_unique(errors, Some(user.id), None, Some(email))
                    .await?;
                user.email = email.to_string();
            }
        }

        if let Some(password) = input.new_password() {
            errors.check("password", validate_password(password));
            errors.check(
                "password_confirmation",
                validate_confirmation(password, input.password_confirmation.as_deref()),
            );
            user.password_hash = hash_password(password)?;
        }
        Ok(())
    }

    async fn check_unique(
        &self,
        errors: &mut ValidationErrors,
        own_id: Option<i64>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), RegistrationError> {
        let taken_by_other = |found: Option<User>| found.is_some_and(|u| Some(u.id) != own_id);

        if let Some(username) = username {
            let found = self
                .user_repo
                .get_by_username(username)
                .await
                .context("Failed to check username")?;
            if taken_by_other(found) {
                errors.add("username", "has already been taken");
            }
        }
        if let Some(email) = email {
            let found = self
                .user_repo
                .get_by_email(email)
                .await
                .context("Failed to check email")?;
            if taken_by_other(found) {
                errors.add("email", "has already been taken");
            }
        }
        Ok(())
    }
}

/// Non-credential fields: language, content handling and settings.
///
/// The four settings groups are always replaced by their normalized form,
/// so an absent group clears the stored one. Other absent fields are left
/// as they are.
fn assign_profile(user: &mut User, input: &AccountUpdate, errors: &mut ValidationErrors) {
    if let Some(language) = input.interface_language.as_deref() {
        if language.is_empty() {
            user.interface_language = None;
        } else if languages::is_available(language) {
            user.interface_language = Some(language.to_string());
        } else {
            errors.add("interface_language", "is not included in the list");
        }
    }
    if let Some(handling) = &input.sensitive_content_handling {
        user.sensitive_content_handling = Some(handling.clone());
    }
    if let Some(problems) = &input.problem_settings {
        user.problem_settings = Some(problems.clone());
    }

    user.pagination_settings = normalize_pagination(input.pagination_settings.as_ref());
    user.tag_cloud_settings = normalize_tag_cloud(input.tag_cloud_settings.as_ref());
    user.file_list_settings = normalize_file_list(input.file_list_settings.as_ref());
    user.renderer_settings = normalize_renderer(input.renderer_settings.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxSessionRepository, SqlxSettingsRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::PaginationSettings;
    use crate::services::settings::SiteSettings;
    use crate::services::user::LoginInput;

    struct Fixture {
        users: Arc<dyn UserRepository>,
        sessions: Arc<UserService>,
        settings: Arc<SettingsService>,
        service: RegistrationService,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let users = SqlxUserRepository::boxed(pool.clone());
        let user_service = Arc::new(UserService::new(
            users.clone(),
            SqlxSessionRepository::boxed(pool.clone()),
        ));
        let settings = Arc::new(SettingsService::new(SqlxSettingsRepository::boxed(pool)));
        Fixture {
            service: RegistrationService::new(users.clone(), user_service.clone(), settings.clone()),
            users,
            sessions: user_service,
            settings,
        }
    }

    impl Fixture {
        async fn open_registration(&self, approve_signups: bool) {
            self.settings
                .update_site_settings(&SiteSettings {
                    registration_enabled: true,
                    approve_signups,
                    ..SiteSettings::default()
                })
                .await
                .unwrap();
        }

        async fn account(&self, token: Option<&str>) -> User {
            let mut user = User::new(
                "maker".to_string(),
                "maker@example.com".to_string(),
                hash_password("password123").unwrap(),
                UserRole::Member,
            );
            user.reset_password_token = token.map(str::to_string);
            self.users.create(&user).await.unwrap()
        }

        async fn reload(&self, id: i64) -> User {
            self.users.get_by_id(id).await.unwrap().unwrap()
        }
    }

    fn sign_up_input(username: &str, email: &str) -> SignUpInput {
        SignUpInput {
            email: email.to_string(),
            password: "password123".to_string(),
            password_confirmation: Some("password123".to_string()),
            username: username.to_string(),
        }
    }

    fn fields(pairs: &[(&str, &str)]) -> FormFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_sign_up_forbidden_when_closed() {
        let fx = setup().await;
        let result = fx
            .service
            .sign_up(None, sign_up_input("newbie", "newbie@example.com"))
            .await;
        assert!(matches!(result, Err(RegistrationError::Forbidden(_))));
        assert_eq!(fx.users.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sign_up_forbidden_when_signed_in() {
        let fx = setup().await;
        fx.open_registration(false).await;
        let me = fx.account(None).await;

        let result = fx
            .service
            .sign_up(Some(&me), sign_up_input("newbie", "newbie@example.com"))
            .await;
        assert!(matches!(result, Err(RegistrationError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_sign_up_with_approval_leaves_account_unapproved() {
        let fx = setup().await;
        fx.open_registration(true).await;
        assert!(fx.service.new_form(None).await.unwrap().approval_required);

        let outcome = fx
            .service
            .sign_up(None, sign_up_input("newbie", "newbie@example.com"))
            .await
            .unwrap();

        let SignUpOutcome::AwaitingApproval { user } = outcome else {
            panic!("expected account to await approval");
        };
        let stored = fx.reload(user.id).await;
        assert!(!stored.approved);
        assert_eq!(stored.role, UserRole::Member);
    }

    #[tokio::test]
    async fn test_sign_up_with_approval_never_stores_approved_account() {
        let fx = setup().await;
        fx.open_registration(true).await;

        fx.service
            .sign_up(None, sign_up_input("newbie", "newbie@example.com"))
            .await
            .unwrap();

        let stored = fx.users.get_by_username("newbie").await.unwrap().unwrap();
        assert!(!stored.approved);
        assert!(!stored.is_active_for_authentication());

        let login = fx
            .sessions
            .login(LoginInput {
                login: "newbie".to_string(),
                password: "password123".to_string(),
            })
            .await;
        assert!(matches!(login, Err(UserServiceError::NotApproved)));
    }

    #[tokio::test]
    async fn test_sign_up_without_approval_signs_in() {
        let fx = setup().await;
        fx.open_registration(false).await;

        let outcome = fx
            .service
            .sign_up(None, sign_up_input("newbie", "newbie@example.com"))
            .await
            .unwrap();
        assert!(matches!(outcome, SignUpOutcome::SignedIn { ref user, ref session } if session.user_id == user.id));
    }

    #[tokio::test]
    async fn test_sign_up_validation_errors() {
        let fx = setup().await;
        fx.open_registration(false).await;
        fx.account(None).await;

        let mut input = sign_up_input("maker", "bad-email");
        input.password_confirmation = Some("different".to_string());
        let Err(RegistrationError::Invalid(errors)) = fx.service.sign_up(None, input).await else {
            panic!("expected validation errors");
        };
        assert!(errors.get("username").is_some());
        assert!(errors.get("email").is_some());
        assert!(errors.get("password_confirmation").is_some());
        assert_eq!(fx.users.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_edit_view_detects_first_use() {
        let fx = setup().await;
        let normal = fx.account(None).await;
        let view = fx.service.edit(&normal).unwrap();
        assert_eq!(view.view, AccountView::Edit);
        assert_eq!(view.languages[0].label, "Autodetect");

        let mut lookalike = normal.clone();
        lookalike.reset_password_token = Some("first_used".to_string());
        assert_eq!(fx.service.edit(&lookalike).unwrap().view, AccountView::Edit);

        let mut first_use = normal;
        first_use.reset_password_token = Some(FIRST_USE_TOKEN.to_string());
        assert_eq!(fx.service.edit(&first_use).unwrap().view, AccountView::FirstUse);
    }

    #[tokio::test]
    async fn test_update_settings_without_password() {
        let fx = setup().await;
        let me = fx.account(None).await;

        let outcome = fx
            .service
            .update(
                &me,
                AccountUpdate {
                    email: Some(me.email.clone()),
                    password: Some(String::new()),
                    pagination_settings: Some(fields(&[("models", "1"), ("per_page", "24")])),
                    interface_language: Some("de".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.redirect_to, paths::EDIT);
        assert!(outcome.session.is_none());
        let stored = fx.reload(me.id).await;
        assert_eq!(
            stored.pagination_settings,
            Some(PaginationSettings {
                models: true,
                creators: false,
                collections: false,
                per_page: 24,
            })
        );
        assert_eq!(stored.interface_language.as_deref(), Some("de"));
        assert!(stored.renderer_settings.is_none());
    }

    #[tokio::test]
    async fn test_update_ignores_username_outside_first_use() {
        let fx = setup().await;
        let me = fx.account(None).await;

        fx.service
            .update(
                &me,
                AccountUpdate {
                    username: Some("renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(fx.reload(me.id).await.username, "maker");
    }

    #[tokio::test]
    async fn test_new_password_requires_current_password() {
        let fx = setup().await;
        let me = fx.account(None).await;

        let attempt = |current: Option<&str>| AccountUpdate {
            password: Some("newpassword1".to_string()),
            password_confirmation: Some("newpassword1".to_string()),
            current_password: current.map(str::to_string),
            ..Default::default()
        };

        let Err(RegistrationError::Invalid(errors)) = fx.service.update(&me, attempt(None)).await
        else {
            panic!("expected validation errors");
        };
        assert!(errors.get("current_password").is_some());

        assert!(matches!(
            fx.service.update(&me, attempt(Some("wrong-password"))).await,
            Err(RegistrationError::Invalid(_))
        ));
        let stored = fx.reload(me.id).await;
        assert!(verify_password("password123", &stored.password_hash).unwrap());

        let outcome = fx
            .service
            .update(&me, attempt(Some("password123")))
            .await
            .unwrap();
        assert!(outcome.session.is_some());
        let stored = fx.reload(me.id).await;
        assert!(verify_password("newpassword1", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_email_change_requires_current_password() {
        let fx = setup().await;
        let me = fx.account(None).await;

        let result = fx
            .service
            .apply_update(
                &me,
                AccountUpdate {
                    email: Some("new@example.com".to_string()),
                    current_password: Some("wrong-password".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(RegistrationError::Invalid(_))));
        assert_eq!(fx.reload(me.id).await.email, "maker@example.com");

        let updated = fx
            .service
            .apply_update(
                &me,
                AccountUpdate {
                    email: Some("new@example.com".to_string()),
                    current_password: Some("password123".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email, "new@example.com");
    }

    #[tokio::test]
    async fn test_without_check_credential_fields_are_ignored() {
        let fx = setup().await;
        let me = fx.account(None).await;

        fx.service
            .apply_update(
                &me,
                AccountUpdate {
                    email: Some(me.email.clone()),
                    password: Some(String::new()),
                    password_confirmation: Some("something".to_string()),
                    current_password: Some("garbage".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = fx.reload(me.id).await;
        assert!(verify_password("password123", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_first_use_update_completes_setup() {
        let fx = setup().await;
        let me = fx.account(Some(FIRST_USE_TOKEN)).await;

        let outcome = fx
            .service
            .update(
                &me,
                AccountUpdate {
                    username: Some("owner".to_string()),
                    email: Some("owner@example.com".to_string()),
                    password: Some("chosenpass".to_string()),
                    password_confirmation: Some("chosenpass".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.redirect_to, paths::ROOT);
        assert_eq!(outcome.notice, notices::SETUP_COMPLETE);
        assert!(outcome.session.is_some());

        let stored = fx.reload(me.id).await;
        assert!(!stored.is_first_use());
        assert!(stored.reset_password_token.is_none());
        assert_eq!(stored.username, "owner");
        assert_eq!(stored.email, "owner@example.com");
        assert!(verify_password("chosenpass", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_first_use_failure_keeps_token() {
        let fx = setup().await;
        let me = fx.account(Some(FIRST_USE_TOKEN)).await;

        let result = fx
            .service
            .update(
                &me,
                AccountUpdate {
                    username: Some("x".to_string()),
                    password: Some("chosenpass".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(RegistrationError::Invalid(_))));
        let stored = fx.reload(me.id).await;
        assert!(stored.is_first_use());
        assert_eq!(stored.username, "maker");
        assert!(verify_password("password123", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_destroy_removes_account() {
        let fx = setup().await;
        let me = fx.account(None).await;

        fx.service.destroy(&me).await.unwrap();
        assert!(fx.users.get_by_id(me.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_redirects_to_sign_up() {
        let fx = setup().await;
        assert_eq!(fx.service.cancel(None).unwrap(), paths::SIGN_UP);
    }

    #[tokio::test]
    async fn test_initial_admin_only_on_empty_database() {
        let fx = setup().await;

        let (admin, password) = fx.service.ensure_initial_admin().await.unwrap().unwrap();
        assert_eq!(admin.username, INITIAL_ADMIN_USERNAME);
        assert!(admin.is_first_use());
        assert!(admin.is_administrator());
        assert!(verify_password(&password, &fx.reload(admin.id).await.password_hash).unwrap());

        assert!(fx.service.ensure_initial_admin().await.unwrap().is_none());
    }

    #[test]
    fn test_requires_current_password() {
        let account = User::new(
            "maker".to_string(),
            "maker@example.com".to_string(),
            "hash".to_string(),
            UserRole::Member,
        );
        let update = |email: Option<&str>, password: Option<&str>| AccountUpdate {
            email: email.map(str::to_string),
            password: password.map(str::to_string),
            ..Default::default()
        };

        assert!(!update(None, None).requires_current_password(&account));
        assert!(!update(Some("maker@example.com"), Some("")).requires_current_password(&account));
        assert!(update(Some("other@example.com"), None).requires_current_password(&account));
        assert!(update(None, Some("newpassword")).requires_current_password(&account));
    }
}
