//! Booking lifecycle operations
use crate::booking::{Booking, BookingFilter, BookingStatus, NewBooking, PaymentStatus};
use crate::error::{Error, ForbiddenReason, Result};
use crate::guard::{AccessRequest, Guard};
use crate::hotel::Hotel;
use crate::lock::EntityLocks;
use crate::room::RoomCatalog;
use crate::store::{Collection, RecordStore};
use crate::types::{Actor, Role};
use crate::utils::{self, BOOKING_HRP};
use std::collections::HashSet;
use std::sync::Arc;

pub struct BookingService<S> {
    store: Arc<S>,
    locks: Arc<EntityLocks>,
    guard: Guard,
}

impl<S: RecordStore> BookingService<S> {
    pub fn new(store: Arc<S>, locks: Arc<EntityLocks>) -> Self {
        Self {
            store,
            locks,
            guard: Guard::new(),
        }
    }

    /// Price and persist a new `pending` booking.
    pub fn create_booking(&self, request: NewBooking) -> Result<Booking> {
        request.validate()?;

        let hotel: Hotel = self.store.get(&request.hotel_id)?;
        let room_type = self.store.room_type(&request.room_type_id)?;
        if room_type.hotel_id != hotel.id {
            return Err(Error::InvalidRange(format!(
                "room type {} does not belong to hotel {}",
                room_type.id, hotel.id
            )));
        }

        let nights = request.nights();
        let booking = request.into_booking(utils::new_id(BOOKING_HRP)?, room_type.base_price)?;
        self.store.put(&booking)?;

        tracing::info!(
            booking = %booking.id,
            customer = %booking.customer_id,
            hotel = %booking.hotel_id,
            nights,
            total = booking.total_price,
            payment = %booking.payment_status,
            "booking created"
        );
        Ok(booking)
    }

    /// Move a booking to `new_status`.
    ///
    /// Admins may operate any booking and providers the bookings of their own
    /// hotels. A client may only cancel their own `pending` booking.
    pub fn update_booking_status(
        &self,
        actor: &Actor,
        booking_id: &str,
        new_status: BookingStatus,
    ) -> Result<Booking> {
        let _entity = self.locks.lock(Collection::Bookings, booking_id);
        let mut booking: Booking = self.store.get(booking_id)?;

        if actor.role == Role::Client {
            if new_status != BookingStatus::Cancelled {
                tracing::warn!(actor = %actor.id, booking = booking_id, to = %new_status, "client status change refused");
                return Err(Error::Forbidden(ForbiddenReason::InsufficientRole));
            }
            self.guard
                .evaluate(actor, AccessRequest::CancelOwnBooking { booking: &booking })?;
        } else {
            self.authorize_operator(actor, &booking)?;
        }

        if !booking.status.can_transition_to(new_status) {
            return Err(Error::InvalidState(format!(
                "booking cannot move from {} to {}",
                booking.status, new_status
            )));
        }

        let previous = booking.status;
        booking.status = new_status;
        self.store.put(&booking)?;

        tracing::info!(
            booking = %booking.id,
            actor = %actor.id,
            from = %previous,
            to = %new_status,
            "booking status updated"
        );
        Ok(booking)
    }

    /// Move a booking's payment status. Hotel side only.
    pub fn update_booking_payment(
        &self,
        actor: &Actor,
        booking_id: &str,
        new_payment_status: PaymentStatus,
    ) -> Result<Booking> {
        let _entity = self.locks.lock(Collection::Bookings, booking_id);
        let mut booking: Booking = self.store.get(booking_id)?;

        self.authorize_operator(actor, &booking)?;

        if !booking.payment_status.can_transition_to(new_payment_status) {
            return Err(Error::InvalidTransition(format!(
                "payment cannot move from {} to {}",
                booking.payment_status, new_payment_status
            )));
        }
        if new_payment_status == PaymentStatus::Paid
            && !matches!(
                booking.status,
                BookingStatus::Confirmed | BookingStatus::Completed
            )
        {
            return Err(Error::InvalidState(format!(
                "payment can only be confirmed for confirmed bookings, booking is {}",
                booking.status
            )));
        }

        let previous = booking.payment_status;
        booking.payment_status = new_payment_status;
        self.store.put(&booking)?;

        tracing::info!(
            booking = %booking.id,
            actor = %actor.id,
            from = %previous,
            to = %new_payment_status,
            "booking payment updated"
        );
        Ok(booking)
    }

    /// Self-service cancellation. Without an actor the call is treated as an
    /// anonymous request from the booking's customer.
    pub fn cancel_booking(
        &self,
        actor: Option<&Actor>,
        booking_id: &str,
        requested: BookingStatus,
    ) -> Result<Booking> {
        if requested != BookingStatus::Cancelled {
            return Err(Error::InvalidRange(format!(
                "only cancellation is allowed here, got {requested}"
            )));
        }

        let _entity = self.locks.lock(Collection::Bookings, booking_id);
        let mut booking: Booking = self.store.get(booking_id)?;

        match actor {
            Some(actor) if actor.role == Role::Client => {
                self.guard
                    .evaluate(actor, AccessRequest::CancelOwnBooking { booking: &booking })?;
            }
            Some(actor) => self.authorize_operator(actor, &booking)?,
            None => tracing::warn!(booking = booking_id, "anonymous cancellation request"),
        }

        if booking.status != BookingStatus::Pending {
            return Err(Error::InvalidState(format!(
                "only pending bookings can be cancelled, booking is {}",
                booking.status
            )));
        }

        booking.status = BookingStatus::Cancelled;
        self.store.put(&booking)?;

        tracing::info!(
            booking = %booking.id,
            actor = actor.map(|a| a.id.as_str()).unwrap_or("anonymous"),
            "booking cancelled"
        );
        Ok(booking)
    }

    pub fn get_booking(&self, booking_id: &str) -> Result<Booking> {
        self.store.get(booking_id)
    }

    pub fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>> {
        let owned_hotels: Option<HashSet<String>> = match &filter.provider_id {
            Some(provider) => Some(
                self.store
                    .list::<Hotel>()?
                    .into_iter()
                    .filter(|hotel| &hotel.owner_id == provider)
                    .map(|hotel| hotel.id)
                    .collect(),
            ),
            None => None,
        };

        let mut bookings: Vec<Booking> = self
            .store
            .list::<Booking>()?
            .into_iter()
            .filter(|booking| filter.matches(booking))
            .filter(|booking| {
                owned_hotels
                    .as_ref()
                    .is_none_or(|hotels| hotels.contains(&booking.hotel_id))
            })
            .collect();
        bookings.sort_by_key(|booking| booking.created_at.to_datetime_utc());
        Ok(bookings)
    }

    fn authorize_operator(&self, actor: &Actor, booking: &Booking) -> Result<()> {
        let hotel: Option<Hotel> = match actor.role {
            Role::Provider => self.store.find(&booking.hotel_id)?,
            Role::Admin | Role::Client => None,
        };
        self.guard.evaluate(
            actor,
            AccessRequest::OperateBooking {
                booking,
                hotel: hotel.as_ref(),
            },
        )
    }
}
