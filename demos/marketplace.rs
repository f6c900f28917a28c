//! Walk a listing from draft to approval and take one booking through payment.
//!
//! Run with an optional YAML config path:
//!
//! ```text
//! cargo run --example marketplace -- hotel.yaml
//! ```
//!
//! Without one the defaults apply, with the database placed in a temp dir.
use anyhow::Context;
use hotel_approval::{
    api::{Api, ApiResult},
    booking::{NewBooking, PaymentMethod},
    config::Config,
    hotel::{HotelPatch, HotelStatus, NewHotel},
    identity::bearer,
    telemetry,
    types::{Role, TimeStamp},
    user::{NewUser, UserPatch},
};
use std::path::PathBuf;

fn ok<T>(result: ApiResult<T>) -> anyhow::Result<T> {
    result.map_err(|e| anyhow::anyhow!("{} {}: {}", e.status, e.kind, e.message))
}

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let mut config = Config::load(config_path.as_deref())?;
    telemetry::init(&config.log_filter)?;

    let scratch = tempfile::tempdir()?;
    if config_path.is_none() {
        config.data_dir = scratch.path().join("marketplace.db");
    }
    let api = Api::open(&config).context("failed to open the marketplace store")?;

    let accounts = &api.marketplace().accounts;
    accounts.register_user(NewUser::new("lan", "lotus-owner", Role::Provider).set_full_name("Lan Nguyen"))?;
    accounts.register_user(NewUser::new("root", "moderator", Role::Admin))?;
    let guest = accounts.register_user(NewUser::new("hoa", "traveller", Role::Client))?;

    let provider = bearer(&ok(api.post_login("lan", "lotus-owner"))?.access_token);
    let admin = bearer(&ok(api.post_login("root", "moderator"))?.access_token);

    let hotel = ok(api.post_hotel(
        NewHotel::new("Lotus", "12 Hang Bac, Hanoi", 3)
            .set_amenities(vec!["wifi".into(), "breakfast".into()])
            .set_total_rooms(12),
        Some(&provider),
    ))?;
    ok(api.patch_hotel(&hotel.id, HotelPatch::status(HotelStatus::Submitted), Some(&provider)))?;
    let hotel = ok(api.patch_hotel(&hotel.id, HotelPatch::status(HotelStatus::Approved), Some(&admin)))?;
    println!("{} is {}", hotel.name, hotel.status);

    let owner = api.identity().resolve(Some(&provider))?;
    let room_type = api
        .marketplace()
        .hotels
        .add_room_type(&owner, &hotel.id, "Deluxe Double", 2, 800_000)?;

    let check_in = TimeStamp::new_with(2025, 8, 10, 14, 0, 0).context("bad check-in")?;
    let check_out = TimeStamp::new_with(2025, 8, 12, 12, 0, 0).context("bad check-out")?;
    let booking = ok(api.post_booking(
        NewBooking::new(&guest.id, &hotel.id, &room_type.id, check_in, check_out, PaymentMethod::Cash)
            .set_guests(2, 0),
    ))?;
    println!("booking {} quoted at {}", booking.id, booking.total_price);

    ok(api.patch_booking_status(&booking.id, "confirmed", Some(&provider)))?;
    let booking = ok(api.patch_booking_payment(&booking.id, "paid", Some(&provider)))?;
    println!("booking {} is {} and {}", booking.id, booking.status, booking.payment_status);

    let session = ok(api.post_login("hoa", "traveller"))?;
    let session = ok(api.post_refresh(&session.refresh_token))?;
    ok(api.patch_user(
        &guest.id,
        UserPatch::new().set_full_name("Pham Hoa"),
        Some(&bearer(&session.access_token)),
    ))?;
    ok(api.post_logout(Some(&session.refresh_token)))?;
    println!("{} signed out", session.user.username);

    Ok(())
}
