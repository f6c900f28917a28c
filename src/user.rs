use super::error::{Error, Result};
use super::store::{Collection, Record};
use super::types::{Role, TimeStamp};
use super::utils::{password_digest, token_digest};
use chrono::Utc;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    #[n(0)]
    Active,
    #[n(1)]
    Inactive,
    #[n(2)]
    Banned,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct User {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub username: String,
    #[n(2)]
    pub password_digest: String, // sha256 hex, plaintext never stored
    #[n(3)]
    pub full_name: String,
    #[n(4)]
    pub email: String,
    #[n(5)]
    pub role: Role,
    #[n(6)]
    pub status: UserStatus,
    #[n(7)]
    pub created_at: TimeStamp<Utc>,
    #[n(8)]
    pub refresh_token_digest: Option<String>, // current session only
}

impl Record for User {
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> &str {
        &self.id
    }
}

impl User {
    pub fn verify_password(&self, password: &str) -> bool {
        self.password_digest == password_digest(password)
    }

    /// True when `token` is the refresh token of the live session.
    pub fn holds_refresh_token(&self, token: &str) -> bool {
        self.refresh_token_digest.as_deref() == Some(token_digest(token).as_str())
    }

    /// Merge a patch that has already passed authorization and validation.
    /// Banning a user ends their session.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(name) = patch.full_name {
            self.full_name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(password) = patch.password {
            self.password_digest = password_digest(&password);
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(status) = patch.status {
            self.status = status;
            if status == UserStatus::Banned {
                self.refresh_token_digest = None;
            }
        }
    }
}

/// Profile or account change. `role` and `status` are admin-only.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

impl UserPatch {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }
    pub fn set_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
    pub fn set_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
    pub fn set_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
    pub fn set_status(mut self, status: UserStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn touches_privileges(&self) -> bool {
        self.role.is_some() || self.status.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && !self.touches_privileges()
    }

    pub fn validate(&self) -> Result<()> {
        if self.password.as_deref().is_some_and(str::is_empty) {
            return Err(Error::InvalidRange("password must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

impl NewUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            full_name: String::new(),
            email: String::new(),
            role,
        }
    }
    pub fn set_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = name.into();
        self
    }
    pub fn set_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::InvalidRange("username must not be empty".into()));
        }
        if self.password.is_empty() {
            return Err(Error::InvalidRange("password must not be empty".into()));
        }
        Ok(())
    }

    pub fn into_user(self, id: String) -> User {
        User {
            id,
            username: self.username.trim().to_string(),
            password_digest: password_digest(&self.password),
            full_name: self.full_name,
            email: self.email,
            role: self.role,
            status: UserStatus::Active,
            created_at: TimeStamp::new(),
            refresh_token_digest: None,
        }
    }
}
