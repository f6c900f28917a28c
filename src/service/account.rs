use crate::error::{Error, ForbiddenReason, Result};
use crate::guard::{AccessRequest, Guard};
use crate::identity::Identity;
use crate::lock::EntityLocks;
use crate::store::{Collection, RecordStore};
use crate::types::Actor;
use crate::user::{NewUser, User, UserPatch, UserStatus};
use crate::utils::{self, USER_HRP};
use std::sync::Arc;

/// Tokens handed out by a login or a refresh.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

pub struct AccountService<S> {
    store: Arc<S>,
    locks: Arc<EntityLocks>,
    guard: Guard,
}

impl<S: RecordStore> AccountService<S> {
    pub fn new(store: Arc<S>, locks: Arc<EntityLocks>) -> Self {
        Self {
            store,
            locks,
            guard: Guard::new(),
        }
    }

    pub fn register_user(&self, new_user: NewUser) -> Result<User> {
        new_user.validate()?;

        // usernames are unique, so registration is serialised per name
        let username = new_user.username.trim().to_string();
        let _entity = self.locks.lock(Collection::Users, &username);
        if self.find_by_username(&username)?.is_some() {
            return Err(Error::InvalidRange(format!("username '{username}' is taken")));
        }

        let user = new_user.into_user(utils::new_id(USER_HRP)?);
        self.store.put(&user)?;

        tracing::info!(user = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    /// Check a username/password pair and open a session. Any earlier
    /// refresh token of the same user stops working.
    pub fn login(&self, identity: &Identity, username: &str, password: &str) -> Result<Session> {
        let user_id = self
            .find_by_username(username.trim())?
            .filter(|user| user.verify_password(password))
            .map(|user| user.id)
            .ok_or_else(|| Error::InvalidCredential("invalid username or password".into()))?;

        let _entity = self.locks.lock(Collection::Users, &user_id);
        let user: User = self.store.get(&user_id)?;
        if user.status == UserStatus::Banned {
            tracing::warn!(user = %user.id, "banned user attempted to log in");
            return Err(Error::Forbidden(ForbiddenReason::AccountBanned));
        }

        let session = self.open_session(identity, user)?;
        tracing::info!(user = %session.user.id, "user logged in");
        Ok(session)
    }

    /// Trade the current refresh token for a new pair. The presented token is
    /// rotated out and cannot be used again.
    pub fn refresh(&self, identity: &Identity, refresh_token: &str) -> Result<Session> {
        let claimed = identity.verify_refresh(refresh_token)?;

        let _entity = self.locks.lock(Collection::Users, &claimed.id);
        let user = self
            .store
            .find::<User>(&claimed.id)?
            .filter(|user| user.holds_refresh_token(refresh_token))
            .ok_or_else(|| Error::InvalidCredential("refresh token revoked or superseded".into()))?;
        if user.status == UserStatus::Banned {
            return Err(Error::Forbidden(ForbiddenReason::AccountBanned));
        }

        let session = self.open_session(identity, user)?;
        tracing::info!(user = %session.user.id, "session refreshed");
        Ok(session)
    }

    /// Revoke the session behind `refresh_token`. Missing, invalid or stale
    /// tokens are accepted and change nothing.
    pub fn logout(&self, identity: &Identity, refresh_token: Option<&str>) -> Result<()> {
        let Some(token) = refresh_token else {
            return Ok(());
        };
        let claimed = match identity.verify_refresh(token) {
            Ok(actor) => actor,
            Err(e) => {
                tracing::debug!(error = %e, "logout with unusable refresh token");
                return Ok(());
            }
        };

        let _entity = self.locks.lock(Collection::Users, &claimed.id);
        if let Some(mut user) = self.store.find::<User>(&claimed.id)? {
            if user.holds_refresh_token(token) {
                user.refresh_token_digest = None;
                self.store.put(&user)?;
                tracing::info!(user = %user.id, "user logged out");
            }
        }
        Ok(())
    }

    /// Edit a user. Users may change their own profile and password; role and
    /// status changes are reserved to admins.
    pub fn update_user(&self, actor: &Actor, user_id: &str, patch: UserPatch) -> Result<User> {
        let _entity = self.locks.lock(Collection::Users, user_id);
        let mut user: User = self.store.get(user_id)?;

        self.guard.evaluate(
            actor,
            AccessRequest::UpdateUser {
                user: &user,
                patch: &patch,
            },
        )?;
        if patch.is_empty() {
            return Err(Error::InvalidRange("user patch contains no changes".into()));
        }
        patch.validate()?;

        user.apply(patch);
        self.store.put(&user)?;

        tracing::info!(user = %user.id, actor = %actor.id, status = ?user.status, "user updated");
        Ok(user)
    }

    pub fn set_user_status(&self, actor: &Actor, user_id: &str, status: UserStatus) -> Result<User> {
        self.update_user(actor, user_id, UserPatch::new().set_status(status))
    }

    pub fn get_user(&self, user_id: &str) -> Result<User> {
        self.store.get(user_id)
    }

    /// A user record as seen by `actor`: their own, or anyone's for admins.
    pub fn view_user(&self, actor: &Actor, user_id: &str) -> Result<User> {
        let user = self.get_user(user_id)?;
        self.guard.evaluate(actor, AccessRequest::ViewUser { user: &user })?;
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut users = self.store.list::<User>()?;
        users.sort_by_key(|user| user.created_at.to_datetime_utc());
        Ok(users)
    }

    // caller holds the user's entity lock
    fn open_session(&self, identity: &Identity, mut user: User) -> Result<Session> {
        let actor = Actor::new(user.id.clone(), user.role);
        let access_token = identity.issue(&actor, Some(&user.username))?;
        let refresh_token = identity.issue_refresh(&actor)?;

        user.refresh_token_digest = Some(utils::token_digest(&refresh_token));
        self.store.put(&user)?;

        Ok(Session {
            access_token,
            refresh_token,
            user,
        })
    }

    fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .store
            .list::<User>()?
            .into_iter()
            .find(|user| user.username == username))
    }
}
