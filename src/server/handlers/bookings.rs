use axum::extract::{Extension, Json, Path};
use axum::http::HeaderMap;
use uuid::Uuid;

use crate::api::{CreateBookingParams, DynAPI, OfferParams, SelectDriverParams};
use crate::entities::{Booking, Offer};
use crate::error::Error;
use crate::server::handlers::authenticate;

pub async fn create(
    Extension(api): Extension<DynAPI>,
    headers: HeaderMap,
    Json(params): Json<CreateBookingParams>,
) -> Result<Json<Booking>, Error> {
    let user = authenticate(&api, &headers).await?;
    let booking = api.create_booking(user, params).await?;

    Ok(booking.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let user = authenticate(&api, &headers).await?;
    let booking = api.find_booking(user, id).await?;

    Ok(booking.into())
}

pub async fn available(
    Extension(api): Extension<DynAPI>,
    headers: HeaderMap,
) -> Result<Json<Vec<Booking>>, Error> {
    let user = authenticate(&api, &headers).await?;
    let bookings = api.available_bookings(user).await?;

    Ok(bookings.into())
}

pub async fn offers(
    Extension(api): Extension<DynAPI>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Offer>>, Error> {
    let user = authenticate(&api, &headers).await?;
    let offers = api.list_offers(user, id).await?;

    Ok(offers.into())
}

pub async fn offer(
    Extension(api): Extension<DynAPI>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(params): Json<OfferParams>,
) -> Result<Json<Offer>, Error> {
    let user = authenticate(&api, &headers).await?;
    let offer = api.submit_offer(user, id, params).await?;

    Ok(offer.into())
}

pub async fn select_driver(
    Extension(api): Extension<DynAPI>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(params): Json<SelectDriverParams>,
) -> Result<Json<Booking>, Error> {
    let user = authenticate(&api, &headers).await?;
    let booking = api.select_driver(user, id, params.driver_id).await?;

    Ok(booking.into())
}

pub async fn cancel(
    Extension(api): Extension<DynAPI>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let user = authenticate(&api, &headers).await?;
    let booking = api.cancel_booking(user, id).await?;

    Ok(booking.into())
}

pub async fn complete(
    Extension(api): Extension<DynAPI>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let user = authenticate(&api, &headers).await?;
    let booking = api.complete_booking(user, id).await?;

    Ok(booking.into())
}
