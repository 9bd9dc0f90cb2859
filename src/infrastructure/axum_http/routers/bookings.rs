use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    application::usercases::{
        availability::AvailabilityUseCase, bookings::BookingUseCase, refunds::RefundUseCase,
    },
    config::config_model::DotEnvyConfig,
    domain::value_objects::bookings::{
        AvailabilityQueryModel, InsertBookingModel, RejectBookingModel,
    },
    infrastructure::{
        axum_http::error_responses::error_response,
        events::TracingEventSink,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{
                bookings::BookingPostgres, payments::PaymentPostgres, refunds::RefundPostgres,
                rooms::RoomPostgres,
            },
        },
    },
    payments::midtrans_client::MidtransClient,
};

pub type SharedBookingUseCase = BookingUseCase<
    RoomPostgres,
    BookingPostgres,
    PaymentPostgres,
    RefundPostgres,
    MidtransClient,
    TracingEventSink,
>;

/// Wires the concrete repository/gateway stack into one booking use case.
/// Shared by the HTTP routers and the background completion loop.
pub fn build_usecase(
    db_pool: Arc<PgPoolSquad>,
    config: &DotEnvyConfig,
) -> Result<Arc<SharedBookingUseCase>> {
    let gateway = Arc::new(MidtransClient::new(
        config.midtrans.server_key.clone(),
        config.midtrans.snap_base_url.clone(),
        config.midtrans.api_base_url.clone(),
        Duration::from_secs(config.midtrans.timeout_secs),
    )?);
    let event_sink = Arc::new(TracingEventSink);

    let booking_repo = Arc::new(BookingPostgres::new(Arc::clone(&db_pool)));
    let availability = Arc::new(AvailabilityUseCase::new(Arc::clone(&booking_repo)));
    let refunds = Arc::new(RefundUseCase::new(
        Arc::new(RefundPostgres::new(Arc::clone(&db_pool))),
        Arc::clone(&gateway),
        Arc::clone(&event_sink),
    ));

    Ok(Arc::new(BookingUseCase::new(
        Arc::new(RoomPostgres::new(Arc::clone(&db_pool))),
        booking_repo,
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool))),
        availability,
        refunds,
        gateway,
        event_sink,
        config.midtrans.gateway_fee_minor,
    )))
}

pub fn routes(db_pool: Arc<PgPoolSquad>, config: &DotEnvyConfig) -> Result<Router> {
    let bookings_usecase = build_usecase(db_pool, config)?;

    Ok(Router::new()
        .route("/", post(create_booking))
        .route("/availability", get(get_availability))
        .route("/:id/approve", post(approve_booking))
        .route("/:id/reject", post(reject_booking))
        .with_state(bookings_usecase))
}

/// The authenticated actor identity is supplied by the upstream auth
/// collaborator as a header; this core does not manage sessions.
fn actor_id(headers: &HeaderMap) -> Result<Uuid, Response> {
    headers
        .get("x-actor-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Unauthorized"))
}

pub async fn create_booking(
    State(bookings_usecase): State<Arc<SharedBookingUseCase>>,
    headers: HeaderMap,
    Json(mut insert_booking_model): Json<InsertBookingModel>,
) -> impl IntoResponse {
    let actor_id = match actor_id(&headers) {
        Ok(actor_id) => actor_id,
        Err(response) => return response,
    };
    insert_booking_model.requester_id = Some(actor_id);

    match bookings_usecase.create_booking(insert_booking_model).await {
        Ok(booking) => (StatusCode::CREATED, Json(booking)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn get_availability(
    State(bookings_usecase): State<Arc<SharedBookingUseCase>>,
    Query(query): Query<AvailabilityQueryModel>,
) -> impl IntoResponse {
    match bookings_usecase.get_availability(query).await {
        Ok(availability) => (StatusCode::OK, Json(availability)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn approve_booking(
    State(bookings_usecase): State<Arc<SharedBookingUseCase>>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let actor_id = match actor_id(&headers) {
        Ok(actor_id) => actor_id,
        Err(response) => return response,
    };

    match bookings_usecase.approve(booking_id, actor_id).await {
        Ok(booking) => (StatusCode::OK, Json(booking)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn reject_booking(
    State(bookings_usecase): State<Arc<SharedBookingUseCase>>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
    Json(reject_booking_model): Json<RejectBookingModel>,
) -> impl IntoResponse {
    let actor_id = match actor_id(&headers) {
        Ok(actor_id) => actor_id,
        Err(response) => return response,
    };

    match bookings_usecase
        .reject(booking_id, actor_id, &reject_booking_model.reason)
        .await
    {
        Ok(booking) => (StatusCode::OK, Json(booking)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}
