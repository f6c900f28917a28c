use hotel_approval::{
    api::{Api, ApiError, ApiResult},
    booking::{BookingFilter, BookingStatus, NewBooking, PaymentMethod, PaymentStatus},
    config::Config,
    hotel::{HotelFilter, HotelPatch, HotelStatus, NewHotel},
    identity::bearer,
    store::SledStore,
    types::{Role, TimeStamp},
    user::{NewUser, UserPatch, UserStatus},
};
use tempfile::{TempDir, tempdir};

fn ok<T>(result: ApiResult<T>) -> anyhow::Result<T> {
    result.map_err(|e| anyhow::anyhow!("{} {}: {}", e.status, e.kind, e.message))
}

struct Session {
    api: Api<SledStore>,
    provider: String,
    other_provider: String,
    admin: String,
    client: String,
    client_id: String,
    _dir: TempDir,
}

fn session() -> anyhow::Result<Session> {
    let dir = tempdir()?;
    let config = Config {
        data_dir: dir.path().join("smoke.db"),
        jwt_secret: "smoke_secret".into(),
        ..Config::default()
    };
    let api = Api::open(&config)?;

    let accounts = &api.marketplace().accounts;
    for (username, role) in [
        ("lan", Role::Provider),
        ("minh", Role::Provider),
        ("root", Role::Admin),
        ("hoa", Role::Client),
    ] {
        accounts.register_user(NewUser::new(username, "correct horse", role))?;
    }

    let token = |username: &str| -> anyhow::Result<String> {
        Ok(bearer(&ok(api.post_login(username, "correct horse"))?.access_token))
    };
    let provider = token("lan")?;
    let other_provider = token("minh")?;
    let admin = token("root")?;
    let login = ok(api.post_login("hoa", "correct horse"))?;
    let client = bearer(&login.access_token);

    Ok(Session {
        provider,
        other_provider,
        admin,
        client,
        client_id: login.user.id,
        api,
        _dir: dir,
    })
}

fn assert_refused(result: ApiResult<impl std::fmt::Debug>, status: u16, kind: &str) -> ApiError {
    let err = result.expect_err("call should have been refused");
    assert_eq!((err.status, err.kind), (status, kind), "{}", err.message);
    err
}

#[test]
fn login_rejects_wrong_password_and_banned_accounts() -> anyhow::Result<()> {
    let s = session()?;

    assert_refused(s.api.post_login("hoa", "wrong"), 401, "invalid-credential");
    assert_refused(s.api.post_login("nobody", "correct horse"), 401, "invalid-credential");

    let accounts = &s.api.marketplace().accounts;
    let admin = s.api.identity().resolve(Some(&s.admin))?;
    accounts.set_user_status(&admin, &s.client_id, UserStatus::Banned)?;

    let err = assert_refused(s.api.post_login("hoa", "correct horse"), 403, "forbidden");
    assert_eq!(err.reason, Some("account-banned"));

    Ok(())
}

#[test]
fn refresh_rotates_the_session() -> anyhow::Result<()> {
    let s = session()?;
    let login = ok(s.api.post_login("hoa", "correct horse"))?;

    let renewed = ok(s.api.post_refresh(&login.refresh_token))?;
    assert_eq!(renewed.user.id, s.client_id);
    assert_ne!(renewed.refresh_token, login.refresh_token);
    assert_eq!(
        s.api.identity().resolve(Some(&bearer(&renewed.access_token)))?.id,
        s.client_id
    );

    // the rotated-out token is dead, the new one still works once
    assert_refused(s.api.post_refresh(&login.refresh_token), 401, "invalid-credential");
    ok(s.api.post_refresh(&renewed.refresh_token))?;
    assert_refused(s.api.post_refresh(&renewed.refresh_token), 401, "invalid-credential");

    // a second login supersedes the first session's refresh token
    let first = ok(s.api.post_login("lan", "correct horse"))?;
    let second = ok(s.api.post_login("lan", "correct horse"))?;
    assert_refused(s.api.post_refresh(&first.refresh_token), 401, "invalid-credential");
    ok(s.api.post_refresh(&second.refresh_token))?;

    Ok(())
}

#[test]
fn refresh_and_access_tokens_do_not_mix() -> anyhow::Result<()> {
    let s = session()?;
    let login = ok(s.api.post_login("lan", "correct horse"))?;

    assert_refused(
        s.api.post_hotel(NewHotel::new("Lotus", "12 Hang Bac", 3), Some(&bearer(&login.refresh_token))),
        401,
        "invalid-credential",
    );
    assert_refused(s.api.post_refresh(&login.access_token), 401, "invalid-credential");
    assert_refused(s.api.post_refresh("not.a.token"), 401, "invalid-credential");

    Ok(())
}

#[test]
fn logout_revokes_the_refresh_token() -> anyhow::Result<()> {
    let s = session()?;
    let login = ok(s.api.post_login("hoa", "correct horse"))?;

    ok(s.api.post_logout(Some(&login.refresh_token)))?;
    assert_refused(s.api.post_refresh(&login.refresh_token), 401, "invalid-credential");
    let stored = s.api.marketplace().accounts.get_user(&s.client_id)?;
    assert_eq!(stored.refresh_token_digest, None);

    // repeated, missing and garbage tokens are all fine
    ok(s.api.post_logout(Some(&login.refresh_token)))?;
    ok(s.api.post_logout(None))?;
    ok(s.api.post_logout(Some("not.a.token")))?;

    // logging out an old session leaves the newer one alone
    let old = ok(s.api.post_login("hoa", "correct horse"))?;
    let current = ok(s.api.post_login("hoa", "correct horse"))?;
    ok(s.api.post_logout(Some(&old.refresh_token)))?;
    ok(s.api.post_refresh(&current.refresh_token))?;

    Ok(())
}

#[test]
fn banning_ends_the_session() -> anyhow::Result<()> {
    let s = session()?;
    let login = ok(s.api.post_login("hoa", "correct horse"))?;

    let banned = ok(s.api.patch_user(
        &s.client_id,
        UserPatch::new().set_status(UserStatus::Banned),
        Some(&s.admin),
    ))?;
    assert_eq!(banned.status, UserStatus::Banned);
    assert_eq!(banned.refresh_token_digest, None);
    assert_refused(s.api.post_refresh(&login.refresh_token), 401, "invalid-credential");

    Ok(())
}

#[test]
fn users_edit_their_own_profile() -> anyhow::Result<()> {
    let s = session()?;

    let updated = ok(s.api.patch_user(
        &s.client_id,
        UserPatch::new().set_full_name("Pham Hoa").set_password("battery staple"),
        Some(&s.client),
    ))?;
    assert_eq!(updated.full_name, "Pham Hoa");
    assert_eq!(ok(s.api.get_user(&s.client_id, Some(&s.client)))?.full_name, "Pham Hoa");

    assert_refused(s.api.post_login("hoa", "correct horse"), 401, "invalid-credential");
    ok(s.api.post_login("hoa", "battery staple"))?;

    let err = assert_refused(
        s.api.patch_user(&s.client_id, UserPatch::new().set_email("x@example.com"), Some(&s.provider)),
        403,
        "forbidden",
    );
    assert_eq!(err.reason, Some("not-owner"));

    let err = assert_refused(
        s.api.patch_user(&s.client_id, UserPatch::new().set_role(Role::Admin), Some(&s.client)),
        403,
        "forbidden",
    );
    assert_eq!(err.reason, Some("insufficient-role"));

    assert_refused(
        s.api.patch_user(&s.client_id, UserPatch::new(), Some(&s.client)),
        400,
        "invalid-range",
    );
    assert_refused(
        s.api.patch_user(&s.client_id, UserPatch::new().set_password(""), Some(&s.client)),
        400,
        "invalid-range",
    );
    assert_refused(
        s.api.patch_user("user_missing", UserPatch::new().set_full_name("x"), Some(&s.admin)),
        404,
        "not-found",
    );

    let promoted = ok(s.api.patch_user(
        &s.client_id,
        UserPatch::new().set_role(Role::Provider),
        Some(&s.admin),
    ))?;
    assert_eq!(promoted.role, Role::Provider);

    Ok(())
}

#[test]
fn user_records_are_visible_to_self_and_admins() -> anyhow::Result<()> {
    let s = session()?;

    assert_eq!(ok(s.api.get_user(&s.client_id, Some(&s.client)))?.username, "hoa");
    assert_eq!(ok(s.api.get_user(&s.client_id, Some(&s.admin)))?.username, "hoa");

    let err = assert_refused(s.api.get_user(&s.client_id, Some(&s.provider)), 403, "forbidden");
    assert_eq!(err.reason, Some("not-owner"));
    assert_refused(s.api.get_user(&s.client_id, None), 401, "unauthenticated");
    assert_refused(s.api.get_user("user_missing", Some(&s.admin)), 404, "not-found");

    Ok(())
}

#[test]
fn usernames_are_unique() -> anyhow::Result<()> {
    let s = session()?;
    let err = s
        .api
        .marketplace()
        .accounts
        .register_user(NewUser::new("lan", "another", Role::Client))
        .unwrap_err();
    assert_eq!(err.status(), 400);
    assert_eq!(s.api.marketplace().accounts.list_users()?.len(), 4);
    Ok(())
}

#[test]
fn hotel_endpoints_need_a_valid_bearer() -> anyhow::Result<()> {
    let s = session()?;
    let new_hotel = || NewHotel::new("Lotus", "12 Hang Bac", 3);

    assert_refused(s.api.post_hotel(new_hotel(), None), 401, "unauthenticated");
    assert_refused(s.api.post_hotel(new_hotel(), Some("Basic abc")), 401, "unauthenticated");
    assert_refused(
        s.api.post_hotel(new_hotel(), Some("Bearer not.a.token")),
        401,
        "invalid-credential",
    );

    // a token signed with another key is no better than garbage
    let foreign = hotel_approval::identity::Identity::new(b"other_secret", 900);
    let forged = foreign.issue(&hotel_approval::types::Actor::admin("a1"), None)?;
    assert_refused(
        s.api.post_hotel(new_hotel(), Some(&bearer(&forged))),
        401,
        "invalid-credential",
    );

    let err = assert_refused(s.api.post_hotel(new_hotel(), Some(&s.client)), 403, "forbidden");
    assert_eq!(err.reason, Some("insufficient-role"));

    let hotel = ok(s.api.post_hotel(new_hotel(), Some(&s.provider)))?;
    assert_eq!(hotel.status, HotelStatus::Draft);
    assert!(hotel.id.starts_with("hotel_"));

    Ok(())
}

#[test]
fn moderation_through_the_api() -> anyhow::Result<()> {
    let s = session()?;
    let hotel = ok(s.api.post_hotel(
        NewHotel::new("Lotus", "12 Hang Bac", 3).set_amenities(vec!["wifi".into(), "wifi".into()]),
        Some(&s.provider),
    ))?;
    assert_eq!(hotel.amenities, vec!["wifi".to_string()]);

    let err = assert_refused(
        s.api.patch_hotel(&hotel.id, HotelPatch::status(HotelStatus::Submitted), Some(&s.other_provider)),
        403,
        "forbidden",
    );
    assert_eq!(err.reason, Some("not-owner"));

    let err = assert_refused(
        s.api.patch_hotel(&hotel.id, HotelPatch::status(HotelStatus::Approved), Some(&s.provider)),
        403,
        "forbidden",
    );
    assert_eq!(err.reason, Some("only-admin-may-approve-reject"));

    ok(s.api.patch_hotel(&hotel.id, HotelPatch::status(HotelStatus::Submitted), Some(&s.provider)))?;

    assert_refused(
        s.api.patch_hotel(&hotel.id, HotelPatch::status(HotelStatus::Draft), Some(&s.admin)),
        400,
        "invalid-state",
    );

    let hotel = ok(s.api.patch_hotel(&hotel.id, HotelPatch::status(HotelStatus::Approved), Some(&s.admin)))?;
    assert_eq!(hotel.status, HotelStatus::Approved);
    assert_eq!(ok(s.api.get_hotel(&hotel.id))?.status, HotelStatus::Approved);

    assert_refused(s.api.get_hotel("hotel_missing"), 404, "not-found");

    Ok(())
}

#[test]
fn booking_endpoints() -> anyhow::Result<()> {
    let s = session()?;
    let market = s.api.marketplace();
    let hotel = ok(s.api.post_hotel(NewHotel::new("Lotus", "12 Hang Bac", 3), Some(&s.provider)))?;
    let provider = s.api.identity().resolve(Some(&s.provider))?;
    let room_type = market
        .hotels
        .add_room_type(&provider, &hotel.id, "Twin", 2, 450_000)?;

    let check_in = TimeStamp::new_with(2025, 12, 30, 14, 0, 0).expect("valid date");
    let check_out = TimeStamp::new_with(2026, 1, 2, 12, 0, 0).expect("valid date");
    let booking = ok(s.api.post_booking(NewBooking::new(
        &s.client_id,
        &hotel.id,
        &room_type.id,
        check_in,
        check_out,
        PaymentMethod::Cash,
    )))?;
    // 2 days 22 hours round up to three nights
    assert_eq!(booking.total_price, 3 * 450_000);

    assert_refused(
        s.api.patch_booking_status(&booking.id, "CONFIRMED", Some(&s.provider)),
        400,
        "invalid-range",
    );
    let err = assert_refused(
        s.api.patch_booking_status(&booking.id, "confirmed", Some(&s.other_provider)),
        403,
        "forbidden",
    );
    assert_eq!(err.reason, Some("not-hotel-owner"));

    let booking = ok(s.api.patch_booking_status(&booking.id, "confirmed", Some(&s.provider)))?;
    assert_eq!(booking.status, BookingStatus::Confirmed);

    let booking = ok(s.api.patch_booking_payment(&booking.id, "paid", Some(&s.admin)))?;
    assert_eq!(booking.payment_status, PaymentStatus::Paid);
    assert_refused(
        s.api.patch_booking_payment(&booking.id, "paid", Some(&s.admin)),
        400,
        "invalid-transition",
    );

    assert_refused(
        s.api.patch_booking_cancel(&booking.id, "cancelled", Some(&s.client)),
        400,
        "invalid-state",
    );
    assert_eq!(ok(s.api.get_booking(&booking.id))?.status, BookingStatus::Confirmed);

    // beyond what the nanosecond timestamp encoding can hold
    let far_in = TimeStamp::new_with(2300, 1, 1, 14, 0, 0).expect("valid date");
    let far_out = TimeStamp::new_with(2300, 1, 3, 12, 0, 0).expect("valid date");
    assert_refused(
        s.api.post_booking(NewBooking::new(
            &s.client_id,
            &hotel.id,
            &room_type.id,
            far_in,
            far_out,
            PaymentMethod::Cash,
        )),
        400,
        "invalid-range",
    );

    Ok(())
}

#[test]
fn listings_filter_by_owner_and_status() -> anyhow::Result<()> {
    let s = session()?;
    let market = s.api.marketplace();
    let first = ok(s.api.post_hotel(NewHotel::new("Lotus", "12 Hang Bac", 3), Some(&s.provider)))?;
    ok(s.api.post_hotel(NewHotel::new("Lotus II", "14 Hang Bac", 4), Some(&s.provider)))?;
    let theirs = ok(s.api.post_hotel(NewHotel::new("Mekong", "1 Ben Ninh Kieu", 2), Some(&s.other_provider)))?;
    ok(s.api.patch_hotel(&first.id, HotelPatch::status(HotelStatus::Submitted), Some(&s.provider)))?;

    let provider = s.api.identity().resolve(Some(&s.provider))?;
    let owned = market.hotels.list_hotels(&HotelFilter {
        owner_id: Some(provider.id.clone()),
        ..HotelFilter::default()
    })?;
    assert_eq!(owned.len(), 2);
    assert!(owned.iter().all(|hotel| hotel.owner_id == provider.id));

    let submitted = market.hotels.list_hotels(&HotelFilter {
        status: Some(HotelStatus::Submitted),
        ..HotelFilter::default()
    })?;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].id, first.id);

    let other = s.api.identity().resolve(Some(&s.other_provider))?;
    let room_type = market.hotels.add_room_type(&other, &theirs.id, "Suite", 3, 1_000_000)?;
    let check_in = TimeStamp::new_with(2025, 10, 1, 14, 0, 0).expect("valid date");
    let check_out = TimeStamp::new_with(2025, 10, 2, 12, 0, 0).expect("valid date");
    ok(s.api.post_booking(NewBooking::new(
        &s.client_id,
        &theirs.id,
        &room_type.id,
        check_in,
        check_out,
        PaymentMethod::Vnpay,
    )))?;

    let for_provider = market.bookings.list_bookings(&BookingFilter {
        provider_id: Some(provider.id.clone()),
        ..BookingFilter::default()
    })?;
    assert!(for_provider.is_empty());

    let for_other = market.bookings.list_bookings(&BookingFilter {
        provider_id: Some(other.id.clone()),
        ..BookingFilter::default()
    })?;
    assert_eq!(for_other.len(), 1);
    assert_eq!(for_other[0].payment_status, PaymentStatus::Paid);

    Ok(())
}
