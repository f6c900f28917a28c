//! Central authorization policy
//!
//! Every engine asks the guard before mutating anything. A request names the
//! entity in its current state together with the change the actor wants; the
//! guard answers with `Ok(())` or the precise reason for refusal.
use super::booking::{Booking, BookingStatus};
use super::error::{Error, ForbiddenReason, Result};
use super::hotel::{Hotel, HotelPatch, HotelStatus};
use super::types::{Actor, Role};
use super::user::{User, UserPatch};

#[derive(Debug, Clone, Copy)]
pub enum AccessRequest<'a> {
    CreateHotel,
    UpdateHotel {
        hotel: &'a Hotel,
        patch: &'a HotelPatch,
    },
    ManageRoomTypes {
        hotel: &'a Hotel,
    },
    /// Status or payment changes made by the hotel side.
    OperateBooking {
        booking: &'a Booking,
        hotel: Option<&'a Hotel>,
    },
    CancelOwnBooking {
        booking: &'a Booking,
    },
    /// Profile edits by the user themself; role and status changes by admins.
    UpdateUser {
        user: &'a User,
        patch: &'a UserPatch,
    },
    ViewUser {
        user: &'a User,
    },
}

impl AccessRequest<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            AccessRequest::CreateHotel => "create-hotel",
            AccessRequest::UpdateHotel { .. } => "update-hotel",
            AccessRequest::ManageRoomTypes { .. } => "manage-room-types",
            AccessRequest::OperateBooking { .. } => "operate-booking",
            AccessRequest::CancelOwnBooking { .. } => "cancel-own-booking",
            AccessRequest::UpdateUser { .. } => "update-user",
            AccessRequest::ViewUser { .. } => "view-user",
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Guard;

impl Guard {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, actor: &Actor, request: AccessRequest<'_>) -> Result<()> {
        let outcome = match request {
            AccessRequest::CreateHotel => require_role(actor, &[Role::Provider]),
            AccessRequest::UpdateHotel { hotel, patch } => hotel_update(actor, hotel, patch),
            AccessRequest::ManageRoomTypes { hotel } => room_types(actor, hotel),
            AccessRequest::OperateBooking { booking, hotel } => operate_booking(actor, booking, hotel),
            AccessRequest::CancelOwnBooking { booking } => cancel_own_booking(actor, booking),
            AccessRequest::UpdateUser { user, patch } => user_update(actor, user, patch),
            AccessRequest::ViewUser { user } => self_or_admin(actor, user),
        };

        if let Err(e) = &outcome {
            tracing::warn!(
                actor = %actor.id,
                role = %actor.role,
                request = request.name(),
                error = %e,
                "access denied"
            );
        }
        outcome
    }
}

fn forbidden(reason: ForbiddenReason) -> Result<()> {
    Err(Error::Forbidden(reason))
}

fn require_role(actor: &Actor, allowed: &[Role]) -> Result<()> {
    if !allowed.contains(&actor.role) {
        return forbidden(ForbiddenReason::InsufficientRole);
    }
    Ok(())
}

fn hotel_update(actor: &Actor, hotel: &Hotel, patch: &HotelPatch) -> Result<()> {
    match actor.role {
        Role::Provider => provider_hotel_update(actor, hotel, patch)?,
        Role::Admin => admin_hotel_update(hotel, patch)?,
        Role::Client => return forbidden(ForbiddenReason::InsufficientRole),
    }

    // a status move has to follow an edge of the table, self-loops included
    match patch.status {
        Some(next) if !hotel.status.can_transition_to(next) => Err(Error::InvalidState(format!(
            "hotel cannot move from {} to {next}",
            hotel.status
        ))),
        _ => Ok(()),
    }
}

fn provider_hotel_update(actor: &Actor, hotel: &Hotel, patch: &HotelPatch) -> Result<()> {
    if hotel.owner_id != actor.id {
        return forbidden(ForbiddenReason::NotOwner);
    }

    let wants_moderation = patch.rejection_reason.is_some()
        || patch
            .status
            .is_some_and(|next| !matches!(next, HotelStatus::Draft | HotelStatus::Submitted));
    if wants_moderation {
        return forbidden(ForbiddenReason::OnlyAdminMayApproveReject);
    }

    let permitted = match (hotel.status, patch.status) {
        (HotelStatus::Draft, None | Some(HotelStatus::Draft | HotelStatus::Submitted)) => true,
        (HotelStatus::Submitted, Some(HotelStatus::Draft)) => true,
        _ => false,
    };
    if !permitted {
        return forbidden(ForbiddenReason::ProviderEditWindowClosed);
    }
    Ok(())
}

fn admin_hotel_update(hotel: &Hotel, patch: &HotelPatch) -> Result<()> {
    if hotel.status != HotelStatus::Submitted {
        return forbidden(ForbiddenReason::AdminOnlySubmitted);
    }
    match patch.status {
        Some(next) if !next.is_moderation_outcome() => Err(Error::InvalidState(format!(
            "admins may only move a SUBMITTED hotel to APPROVED or REJECTED, not {next}"
        ))),
        _ => Ok(()),
    }
}

fn room_types(actor: &Actor, hotel: &Hotel) -> Result<()> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Provider if hotel.owner_id == actor.id => Ok(()),
        Role::Provider => forbidden(ForbiddenReason::NotOwner),
        Role::Client => forbidden(ForbiddenReason::InsufficientRole),
    }
}

fn operate_booking(actor: &Actor, booking: &Booking, hotel: Option<&Hotel>) -> Result<()> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Provider => match hotel {
            Some(hotel) if hotel.id == booking.hotel_id && hotel.owner_id == actor.id => Ok(()),
            _ => forbidden(ForbiddenReason::NotHotelOwner),
        },
        Role::Client => forbidden(ForbiddenReason::InsufficientRole),
    }
}

fn user_update(actor: &Actor, user: &User, patch: &UserPatch) -> Result<()> {
    if patch.touches_privileges() {
        return require_role(actor, &[Role::Admin]);
    }
    self_or_admin(actor, user)
}

fn self_or_admin(actor: &Actor, user: &User) -> Result<()> {
    if actor.role == Role::Admin || actor.id == user.id {
        return Ok(());
    }
    forbidden(ForbiddenReason::NotOwner)
}

fn cancel_own_booking(actor: &Actor, booking: &Booking) -> Result<()> {
    require_role(actor, &[Role::Client])?;
    if booking.customer_id != actor.id {
        return forbidden(ForbiddenReason::NotOwner);
    }
    if booking.status != BookingStatus::Pending {
        return Err(Error::InvalidState(format!(
            "only pending bookings can be cancelled, booking is {}",
            booking.status
        )));
    }
    Ok(())
}
