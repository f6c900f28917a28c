//! Service layer API for the marketplace workflows
mod account;
mod booking;
mod hotel;

pub use account::{AccountService, Session};
pub use booking::BookingService;
pub use hotel::HotelService;

use crate::lock::EntityLocks;
use crate::store::RecordStore;
use std::sync::Arc;

/// All engines wired to one store and one lock table.
pub struct Marketplace<S> {
    pub hotels: HotelService<S>,
    pub bookings: BookingService<S>,
    pub accounts: AccountService<S>,
}

impl<S: RecordStore> Marketplace<S> {
    pub fn new(store: Arc<S>) -> Self {
        let locks = Arc::new(EntityLocks::new());
        Self {
            hotels: HotelService::new(Arc::clone(&store), Arc::clone(&locks)),
            bookings: BookingService::new(Arc::clone(&store), Arc::clone(&locks)),
            accounts: AccountService::new(store, locks),
        }
    }
}
