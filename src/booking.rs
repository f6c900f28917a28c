//! Bookings, their reservation status and their payment status
use super::error::{Error, Result};
use super::store::{Collection, Record};
use super::types::TimeStamp;
use chrono::Utc;
use std::fmt;
use std::str::FromStr;

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Confirmed,
    #[n(2)]
    Cancelled,
    #[n(3)]
    Completed,
    #[n(4)]
    NoShow,
}

pub const ALL_BOOKING_STATUSES: [BookingStatus; 5] = [
    BookingStatus::Pending,
    BookingStatus::Confirmed,
    BookingStatus::Cancelled,
    BookingStatus::Completed,
    BookingStatus::NoShow,
];

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::NoShow => "no-show",
        }
    }

    pub fn successors(&self) -> &'static [BookingStatus] {
        match self {
            BookingStatus::Pending => &[BookingStatus::Confirmed, BookingStatus::Cancelled],
            BookingStatus::Confirmed => &[BookingStatus::Completed, BookingStatus::NoShow],
            BookingStatus::Cancelled | BookingStatus::Completed | BookingStatus::NoShow => &[],
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        self.successors().contains(&next)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ALL_BOOKING_STATUSES
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::InvalidRange(format!("unknown booking status '{s}'")))
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Paid,
    #[n(2)]
    Refunded,
    #[n(3)]
    Failed,
}

pub const ALL_PAYMENT_STATUSES: [PaymentStatus; 4] = [
    PaymentStatus::Pending,
    PaymentStatus::Paid,
    PaymentStatus::Refunded,
    PaymentStatus::Failed,
];

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn successors(&self) -> &'static [PaymentStatus] {
        match self {
            PaymentStatus::Pending => &[PaymentStatus::Paid],
            PaymentStatus::Paid => &[PaymentStatus::Refunded],
            PaymentStatus::Refunded | PaymentStatus::Failed => &[],
        }
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        self.successors().contains(&next)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ALL_PAYMENT_STATUSES
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::InvalidRange(format!("unknown payment status '{s}'")))
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    #[n(0)]
    Cash,
    #[n(1)]
    Vnpay,
}

impl PaymentMethod {
    /// Cash is settled at the desk; online payments are collected at checkout.
    pub fn initial_payment_status(&self) -> PaymentStatus {
        match self {
            PaymentMethod::Cash => PaymentStatus::Pending,
            PaymentMethod::Vnpay => PaymentStatus::Paid,
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "vnpay" => Ok(PaymentMethod::Vnpay),
            other => Err(Error::InvalidRange(format!("unknown payment method '{other}'"))),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub customer_id: String,
    #[n(2)]
    pub hotel_id: String, // looked up, not owned
    #[n(3)]
    pub room_type_id: String,
    #[n(4)]
    pub room_ids: Vec<String>,
    #[n(5)]
    pub check_in: TimeStamp<Utc>,
    #[n(6)]
    pub check_out: TimeStamp<Utc>,
    #[n(7)]
    pub adults: u32,
    #[n(8)]
    pub children: u32,
    #[n(9)]
    pub total_price: u64, // minor units, fixed at creation
    #[n(10)]
    pub payment_method: PaymentMethod,
    #[n(11)]
    pub status: BookingStatus,
    #[n(12)]
    pub payment_status: PaymentStatus,
    #[n(13)]
    pub special_requests: Option<String>,
    #[n(14)]
    pub created_at: TimeStamp<Utc>,
}

impl Record for Booking {
    const COLLECTION: Collection = Collection::Bookings;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Whole nights between two instants, rounding a partial day up. Zero when
/// `check_out` is not after `check_in`.
pub fn stay_nights(check_in: &TimeStamp<Utc>, check_out: &TimeStamp<Utc>) -> u64 {
    let millis = check_out.since(check_in).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    millis.unsigned_abs().div_ceil(DAY_MILLIS.unsigned_abs())
}

pub fn quote_total(nights: u64, base_price: u64) -> Result<u64> {
    nights
        .checked_mul(base_price)
        .ok_or_else(|| Error::InvalidRange("total price overflows".into()))
}

/// A reservation request from a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub customer_id: String,
    pub hotel_id: String,
    pub room_type_id: String,
    pub check_in: TimeStamp<Utc>,
    pub check_out: TimeStamp<Utc>,
    pub adults: u32,
    pub children: u32,
    pub payment_method: PaymentMethod,
    pub room_ids: Vec<String>,
    pub special_requests: Option<String>,
}

impl NewBooking {
    pub fn new(
        customer_id: impl Into<String>,
        hotel_id: impl Into<String>,
        room_type_id: impl Into<String>,
        check_in: TimeStamp<Utc>,
        check_out: TimeStamp<Utc>,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            hotel_id: hotel_id.into(),
            room_type_id: room_type_id.into(),
            check_in,
            check_out,
            adults: 1,
            children: 0,
            payment_method,
            room_ids: vec![],
            special_requests: None,
        }
    }
    pub fn set_guests(mut self, adults: u32, children: u32) -> Self {
        self.adults = adults;
        self.children = children;
        self
    }
    pub fn set_room_ids(mut self, room_ids: Vec<String>) -> Self {
        self.room_ids = room_ids;
        self
    }
    pub fn set_special_requests(mut self, requests: impl Into<String>) -> Self {
        self.special_requests = Some(requests.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.check_in.is_encodable() || !self.check_out.is_encodable() {
            return Err(Error::InvalidRange(
                "stay dates must fall between 1677 and 2262".into(),
            ));
        }
        if self.check_out.to_datetime_utc() <= self.check_in.to_datetime_utc() {
            return Err(Error::InvalidRange(
                "check-out must be strictly after check-in".into(),
            ));
        }
        if self.adults == 0 {
            return Err(Error::InvalidRange("at least one adult is required".into()));
        }
        if self.customer_id.trim().is_empty() {
            return Err(Error::InvalidRange("customer id is required".into()));
        }
        Ok(())
    }

    pub fn nights(&self) -> u64 {
        stay_nights(&self.check_in, &self.check_out)
    }

    /// Freeze the request into a `pending` booking priced at `base_price` per night.
    pub fn into_booking(self, id: String, base_price: u64) -> Result<Booking> {
        let total_price = quote_total(self.nights(), base_price)?;
        let payment_status = self.payment_method.initial_payment_status();

        Ok(Booking {
            id,
            customer_id: self.customer_id,
            hotel_id: self.hotel_id,
            room_type_id: self.room_type_id,
            room_ids: self.room_ids,
            check_in: self.check_in,
            check_out: self.check_out,
            adults: self.adults,
            children: self.children,
            total_price,
            payment_method: self.payment_method,
            status: BookingStatus::Pending,
            payment_status,
            special_requests: self.special_requests,
            created_at: TimeStamp::new(),
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BookingFilter {
    /// Only bookings for hotels owned by this provider.
    pub provider_id: Option<String>,
    pub customer_id: Option<String>,
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.customer_id
            .as_ref()
            .is_none_or(|customer| &booking.customer_id == customer)
            && self.status.is_none_or(|status| booking.status == status)
    }
}
