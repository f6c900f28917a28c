//! Hotel listings and their moderation state machine
use super::error::{Error, Result};
use super::store::{Collection, Record};
use super::types::TimeStamp;
use chrono::Utc;
use std::fmt;
use std::str::FromStr;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotelStatus {
    #[n(0)]
    Draft,
    #[n(1)]
    Submitted,
    #[n(2)]
    Approved,
    #[n(3)]
    Rejected,
    // declared by the listing schema, never entered or left by any transition
    #[n(4)]
    Pending,
}

pub const ALL_HOTEL_STATUSES: [HotelStatus; 5] = [
    HotelStatus::Draft,
    HotelStatus::Submitted,
    HotelStatus::Approved,
    HotelStatus::Rejected,
    HotelStatus::Pending,
];

impl HotelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HotelStatus::Draft => "DRAFT",
            HotelStatus::Submitted => "SUBMITTED",
            HotelStatus::Approved => "APPROVED",
            HotelStatus::Rejected => "REJECTED",
            HotelStatus::Pending => "PENDING",
        }
    }

    /// Statuses reachable in one step, regardless of who asks.
    pub fn successors(&self) -> &'static [HotelStatus] {
        match self {
            HotelStatus::Draft => &[HotelStatus::Submitted],
            HotelStatus::Submitted => &[
                HotelStatus::Draft,
                HotelStatus::Approved,
                HotelStatus::Rejected,
            ],
            HotelStatus::Approved | HotelStatus::Rejected | HotelStatus::Pending => &[],
        }
    }

    pub fn can_transition_to(&self, next: HotelStatus) -> bool {
        self.successors().contains(&next)
    }

    /// Outcomes only an admin may decide.
    pub fn is_moderation_outcome(&self) -> bool {
        matches!(self, HotelStatus::Approved | HotelStatus::Rejected)
    }
}

impl fmt::Display for HotelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HotelStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ALL_HOTEL_STATUSES
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::InvalidRange(format!("unknown hotel status '{s}'")))
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Hotel {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub owner_id: String, // provider who created the listing, never rewritten
    #[n(2)]
    pub status: HotelStatus,
    #[n(3)]
    pub name: String,
    #[n(4)]
    pub address: String,
    #[n(5)]
    pub description: String,
    #[n(6)]
    pub amenities: Vec<String>,
    #[n(7)]
    pub star_rating: u8,
    #[n(8)]
    pub images: Vec<String>,
    #[n(9)]
    pub total_rooms: u32,
    #[n(10)]
    pub rejection_reason: Option<String>,
    #[n(11)]
    pub created_at: TimeStamp<Utc>,
}

impl Record for Hotel {
    const COLLECTION: Collection = Collection::Hotels;

    fn id(&self) -> &str {
        &self.id
    }
}

fn dedup_amenities(amenities: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(amenities.len());
    for amenity in amenities {
        let amenity = amenity.trim().to_string();
        if !amenity.is_empty() && !seen.contains(&amenity) {
            seen.push(amenity);
        }
    }
    seen
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidRange("hotel name must not be empty".into()));
    }
    Ok(())
}

fn validate_star_rating(rating: u8) -> Result<()> {
    if !(1..=5).contains(&rating) {
        return Err(Error::InvalidRange(format!(
            "star rating must be between 1 and 5, got {rating}"
        )));
    }
    Ok(())
}

/// A listing as submitted by a provider, before it gets an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHotel {
    name: String,
    address: String,
    description: String,
    amenities: Vec<String>,
    star_rating: u8,
    images: Vec<String>,
    total_rooms: u32,
}

impl NewHotel {
    pub fn new(name: impl Into<String>, address: impl Into<String>, star_rating: u8) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            description: String::new(),
            amenities: vec![],
            star_rating,
            images: vec![],
            total_rooms: 0,
        }
    }
    pub fn set_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
    pub fn set_amenities(mut self, amenities: Vec<String>) -> Self {
        self.amenities = amenities;
        self
    }
    pub fn set_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }
    pub fn set_total_rooms(mut self, rooms: u32) -> Self {
        self.total_rooms = rooms;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_star_rating(self.star_rating)
    }

    /// Every listing starts out as a `DRAFT` owned by its creator.
    pub fn into_hotel(self, id: String, owner_id: String) -> Hotel {
        Hotel {
            id,
            owner_id,
            status: HotelStatus::Draft,
            name: self.name,
            address: self.address,
            description: self.description,
            amenities: dedup_amenities(self.amenities),
            star_rating: self.star_rating,
            images: self.images,
            total_rooms: self.total_rooms,
            rejection_reason: None,
            created_at: TimeStamp::new(),
        }
    }
}

/// Partial update of a listing. Unset fields are left untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HotelPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub star_rating: Option<u8>,
    pub images: Option<Vec<String>>,
    pub total_rooms: Option<u32>,
    pub status: Option<HotelStatus>,
    pub rejection_reason: Option<String>,
}

impl HotelPatch {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn status(status: HotelStatus) -> Self {
        Self::new().set_status(status)
    }
    pub fn set_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
    pub fn set_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
    pub fn set_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
    pub fn set_amenities(mut self, amenities: Vec<String>) -> Self {
        self.amenities = Some(amenities);
        self
    }
    pub fn set_star_rating(mut self, rating: u8) -> Self {
        self.star_rating = Some(rating);
        self
    }
    pub fn set_images(mut self, images: Vec<String>) -> Self {
        self.images = Some(images);
        self
    }
    pub fn set_total_rooms(mut self, rooms: u32) -> Self {
        self.total_rooms = Some(rooms);
        self
    }
    pub fn set_status(mut self, status: HotelStatus) -> Self {
        self.status = Some(status);
        self
    }
    pub fn set_rejection_reason(mut self, reason: impl Into<String>) -> Self {
        self.rejection_reason = Some(reason.into());
        self
    }

    /// True when the patch touches anything besides the moderation fields.
    pub fn has_field_edits(&self) -> bool {
        self.name.is_some()
            || self.address.is_some()
            || self.description.is_some()
            || self.amenities.is_some()
            || self.star_rating.is_some()
            || self.images.is_some()
            || self.total_rooms.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_field_edits() && self.status.is_none() && self.rejection_reason.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(rating) = self.star_rating {
            validate_star_rating(rating)?;
        }
        if self.rejection_reason.is_some() && self.status != Some(HotelStatus::Rejected) {
            return Err(Error::InvalidRange(
                "a rejection reason is only accepted together with status REJECTED".into(),
            ));
        }
        Ok(())
    }
}

impl Hotel {
    /// Merge a patch that has already passed authorization and validation.
    pub fn apply(&mut self, patch: HotelPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(address) = patch.address {
            self.address = address;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(amenities) = patch.amenities {
            self.amenities = dedup_amenities(amenities);
        }
        if let Some(rating) = patch.star_rating {
            self.star_rating = rating;
        }
        if let Some(images) = patch.images {
            self.images = images;
        }
        if let Some(rooms) = patch.total_rooms {
            self.total_rooms = rooms;
        }
        if let Some(status) = patch.status {
            self.status = status;
            self.rejection_reason = match status {
                HotelStatus::Rejected => patch.rejection_reason,
                _ => None,
            };
        }
    }
}

/// Listing query. Unset fields match everything.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HotelFilter {
    pub owner_id: Option<String>,
    pub status: Option<HotelStatus>,
}

impl HotelFilter {
    pub fn matches(&self, hotel: &Hotel) -> bool {
        self.owner_id.as_ref().is_none_or(|owner| &hotel.owner_id == owner)
            && self.status.is_none_or(|status| hotel.status == status)
    }
}
