//! HTTP-shaped entry points
//!
//! Each call takes wire-level inputs (raw `Authorization` header, status names
//! as strings) and answers with either the record or an [`ApiError`] carrying
//! the status code and machine readable kind a transport would send back.
use super::booking::{Booking, BookingStatus, NewBooking, PaymentStatus};
use super::config::Config;
use super::error::{Error, Result};
use super::hotel::{Hotel, HotelPatch, NewHotel};
use super::identity::Identity;
use super::service::{Marketplace, Session};
use super::store::{RecordStore, SledStore};
use super::types::Actor;
use super::user::{User, UserPatch};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub status: u16,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub message: String,
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = e.status();
        if status >= 500 {
            tracing::error!(error = %e, "request failed");
        } else {
            tracing::debug!(error = %e, status, "request refused");
        }

        Self {
            status,
            kind: e.kind(),
            reason: e.forbidden_reason().map(|reason| reason.as_str()),
            message: e.to_string(),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

impl From<Session> for LoginResponse {
    fn from(session: Session) -> Self {
        Self {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            user: session.user,
        }
    }
}

pub struct Api<S> {
    market: Marketplace<S>,
    identity: Identity,
}

impl Api<SledStore> {
    /// Open the sled database named in `config` and wire every engine to it.
    pub fn open(config: &Config) -> Result<Self> {
        let store = SledStore::open(&config.data_dir)?.with_flush_on_write(config.flush_on_write);
        let identity = Identity::new(config.jwt_secret.as_bytes(), config.access_token_ttl_secs)
            .with_refresh_ttl(config.refresh_token_ttl_secs);
        Ok(Self::new(Marketplace::new(Arc::new(store)), identity))
    }
}

impl<S: RecordStore> Api<S> {
    pub fn new(market: Marketplace<S>, identity: Identity) -> Self {
        Self { market, identity }
    }

    pub fn marketplace(&self) -> &Marketplace<S> {
        &self.market
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    fn caller(&self, authorization: Option<&str>) -> Result<Actor> {
        self.identity.resolve(authorization)
    }

    pub fn post_login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        let session = self.market.accounts.login(&self.identity, username, password)?;
        Ok(session.into())
    }

    pub fn post_refresh(&self, refresh_token: &str) -> ApiResult<LoginResponse> {
        let session = self.market.accounts.refresh(&self.identity, refresh_token)?;
        Ok(session.into())
    }

    /// Always succeeds for unknown or stale tokens.
    pub fn post_logout(&self, refresh_token: Option<&str>) -> ApiResult<()> {
        Ok(self.market.accounts.logout(&self.identity, refresh_token)?)
    }

    pub fn get_user(&self, user_id: &str, authorization: Option<&str>) -> ApiResult<User> {
        let actor = self.caller(authorization)?;
        Ok(self.market.accounts.view_user(&actor, user_id)?)
    }

    pub fn patch_user(
        &self,
        user_id: &str,
        patch: UserPatch,
        authorization: Option<&str>,
    ) -> ApiResult<User> {
        let actor = self.caller(authorization)?;
        Ok(self.market.accounts.update_user(&actor, user_id, patch)?)
    }

    pub fn post_hotel(&self, new_hotel: NewHotel, authorization: Option<&str>) -> ApiResult<Hotel> {
        let actor = self.caller(authorization)?;
        Ok(self.market.hotels.create_hotel(&actor, new_hotel)?)
    }

    pub fn get_hotel(&self, hotel_id: &str) -> ApiResult<Hotel> {
        Ok(self.market.hotels.get_hotel(hotel_id)?)
    }

    pub fn patch_hotel(
        &self,
        hotel_id: &str,
        patch: HotelPatch,
        authorization: Option<&str>,
    ) -> ApiResult<Hotel> {
        let actor = self.caller(authorization)?;
        Ok(self.market.hotels.update_hotel(&actor, hotel_id, patch)?)
    }

    pub fn post_booking(&self, request: NewBooking) -> ApiResult<Booking> {
        Ok(self.market.bookings.create_booking(request)?)
    }

    pub fn get_booking(&self, booking_id: &str) -> ApiResult<Booking> {
        Ok(self.market.bookings.get_booking(booking_id)?)
    }

    pub fn patch_booking_status(
        &self,
        booking_id: &str,
        new_status: &str,
        authorization: Option<&str>,
    ) -> ApiResult<Booking> {
        let actor = self.caller(authorization)?;
        let new_status: BookingStatus = new_status.parse()?;
        Ok(self
            .market
            .bookings
            .update_booking_status(&actor, booking_id, new_status)?)
    }

    pub fn patch_booking_payment(
        &self,
        booking_id: &str,
        new_payment_status: &str,
        authorization: Option<&str>,
    ) -> ApiResult<Booking> {
        let actor = self.caller(authorization)?;
        let new_payment_status: PaymentStatus = new_payment_status.parse()?;
        Ok(self
            .market
            .bookings
            .update_booking_payment(&actor, booking_id, new_payment_status)?)
    }

    /// Self-service cancellation; the credential is optional.
    pub fn patch_booking_cancel(
        &self,
        booking_id: &str,
        requested_status: &str,
        authorization: Option<&str>,
    ) -> ApiResult<Booking> {
        let actor = match authorization {
            Some(_) => Some(self.caller(authorization)?),
            None => None,
        };
        let requested: BookingStatus = requested_status.parse()?;
        Ok(self
            .market
            .bookings
            .cancel_booking(actor.as_ref(), booking_id, requested)?)
    }
}
