//! Hotel lifecycle operations
use crate::error::{Error, Result};
use crate::guard::{AccessRequest, Guard};
use crate::hotel::{Hotel, HotelFilter, HotelPatch, HotelStatus, NewHotel};
use crate::lock::EntityLocks;
use crate::room::RoomType;
use crate::store::{Collection, RecordStore};
use crate::types::Actor;
use crate::utils::{self, HOTEL_HRP, ROOM_HRP};
use std::sync::Arc;

pub struct HotelService<S> {
    store: Arc<S>,
    locks: Arc<EntityLocks>,
    guard: Guard,
}

impl<S: RecordStore> HotelService<S> {
    pub fn new(store: Arc<S>, locks: Arc<EntityLocks>) -> Self {
        Self {
            store,
            locks,
            guard: Guard::new(),
        }
    }

    /// Register a new listing in `DRAFT`, owned by the calling provider.
    pub fn create_hotel(&self, actor: &Actor, new_hotel: NewHotel) -> Result<Hotel> {
        self.guard.evaluate(actor, AccessRequest::CreateHotel)?;
        new_hotel.validate()?;

        let hotel = new_hotel.into_hotel(utils::new_id(HOTEL_HRP)?, actor.id.clone());
        self.store.put(&hotel)?;

        tracing::info!(hotel = %hotel.id, owner = %hotel.owner_id, "hotel created");
        Ok(hotel)
    }

    /// Apply `patch` to a hotel on behalf of `actor`.
    ///
    /// The whole read-check-write runs under the hotel's entity lock and the
    /// record is only returned once the store write has succeeded.
    pub fn update_hotel(&self, actor: &Actor, hotel_id: &str, patch: HotelPatch) -> Result<Hotel> {
        let _entity = self.locks.lock(Collection::Hotels, hotel_id);
        let mut hotel: Hotel = self.store.get(hotel_id)?;

        self.guard.evaluate(
            actor,
            AccessRequest::UpdateHotel {
                hotel: &hotel,
                patch: &patch,
            },
        )?;
        if patch.is_empty() {
            return Err(Error::InvalidRange("hotel patch contains no changes".into()));
        }
        patch.validate()?;

        let previous = hotel.status;
        hotel.apply(patch);
        self.store.put(&hotel)?;

        tracing::info!(
            hotel = %hotel.id,
            actor = %actor.id,
            role = %actor.role,
            from = %previous,
            to = %hotel.status,
            "hotel updated"
        );
        Ok(hotel)
    }

    pub fn submit_hotel(&self, actor: &Actor, hotel_id: &str) -> Result<Hotel> {
        self.update_hotel(actor, hotel_id, HotelPatch::status(HotelStatus::Submitted))
    }

    pub fn revoke_hotel(&self, actor: &Actor, hotel_id: &str) -> Result<Hotel> {
        self.update_hotel(actor, hotel_id, HotelPatch::status(HotelStatus::Draft))
    }

    pub fn approve_hotel(&self, actor: &Actor, hotel_id: &str) -> Result<Hotel> {
        self.update_hotel(actor, hotel_id, HotelPatch::status(HotelStatus::Approved))
    }

    pub fn reject_hotel(&self, actor: &Actor, hotel_id: &str, reason: Option<String>) -> Result<Hotel> {
        let mut patch = HotelPatch::status(HotelStatus::Rejected);
        patch.rejection_reason = reason;
        self.update_hotel(actor, hotel_id, patch)
    }

    pub fn get_hotel(&self, hotel_id: &str) -> Result<Hotel> {
        self.store.get(hotel_id)
    }

    pub fn list_hotels(&self, filter: &HotelFilter) -> Result<Vec<Hotel>> {
        let mut hotels: Vec<Hotel> = self
            .store
            .list::<Hotel>()?
            .into_iter()
            .filter(|hotel| filter.matches(hotel))
            .collect();
        hotels.sort_by_key(|hotel| hotel.created_at.to_datetime_utc());
        Ok(hotels)
    }

    /// Add a priced room type to a hotel. Owner or admin only.
    pub fn add_room_type(
        &self,
        actor: &Actor,
        hotel_id: &str,
        name: &str,
        capacity: u32,
        base_price: u64,
    ) -> Result<RoomType> {
        let hotel: Hotel = self.store.get(hotel_id)?;
        self.guard
            .evaluate(actor, AccessRequest::ManageRoomTypes { hotel: &hotel })?;

        let room_type = RoomType {
            id: utils::new_id(ROOM_HRP)?,
            hotel_id: hotel.id,
            name: name.trim().to_string(),
            capacity,
            base_price,
        };
        room_type.validate()?;
        self.store.put(&room_type)?;

        tracing::info!(hotel = %room_type.hotel_id, room_type = %room_type.id, "room type added");
        Ok(room_type)
    }

    pub fn room_types(&self, hotel_id: &str) -> Result<Vec<RoomType>> {
        Ok(self
            .store
            .list::<RoomType>()?
            .into_iter()
            .filter(|room_type| room_type.hotel_id == hotel_id)
            .collect())
    }
}
