use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    /// Returns `None` for an impossible calendar date.
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    pub fn since(&self, earlier: &TimeStamp<Utc>) -> Duration {
        self.0 - earlier.0
    }
    /// False outside the range the nanosecond wire encoding can hold
    /// (roughly 1677 to 2262).
    pub fn is_encodable(&self) -> bool {
        self.0.timestamp_nanos_opt().is_some()
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    #[n(0)]
    Client,
    #[n(1)]
    Provider,
    #[n(2)]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Provider => "provider",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "provider" => Ok(Role::Provider),
            "admin" => Ok(Role::Admin),
            other => Err(Error::InvalidCredential(format!("unknown role '{other}'"))),
        }
    }
}

/// The resolved caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
    pub fn client(id: impl Into<String>) -> Self {
        Self::new(id, Role::Client)
    }
    pub fn provider(id: impl Into<String>) -> Self {
        Self::new(id, Role::Provider)
    }
    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, Role::Admin)
    }
}
