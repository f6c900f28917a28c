//! Room types and the nightly price lookup used when pricing a booking
use super::error::{Error, Result};
use super::store::{Collection, Record, RecordStore};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct RoomType {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub hotel_id: String,
    #[n(2)]
    pub name: String,
    #[n(3)]
    pub capacity: u32,
    #[n(4)]
    pub base_price: u64, // per night, minor units
}

impl Record for RoomType {
    const COLLECTION: Collection = Collection::RoomTypes;

    fn id(&self) -> &str {
        &self.id
    }
}

impl RoomType {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidRange("room type name must not be empty".into()));
        }
        if self.capacity == 0 {
            return Err(Error::InvalidRange("room capacity must be at least 1".into()));
        }
        Ok(())
    }
}

pub trait RoomCatalog {
    fn room_type(&self, room_type_id: &str) -> Result<RoomType>;
}

impl<S: RecordStore> RoomCatalog for S {
    fn room_type(&self, room_type_id: &str) -> Result<RoomType> {
        self.get::<RoomType>(room_type_id)
    }
}
