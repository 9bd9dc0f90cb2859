use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde_json::json;

use crate::{
    application::usercases::{payment_webhook::PaymentWebhookUseCase, refunds::RefundUseCase},
    config::config_model::DotEnvyConfig,
    domain::value_objects::gateway_notifications::GatewayNotification,
    infrastructure::{
        axum_http::error_responses::error_response,
        events::TracingEventSink,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{payments::PaymentPostgres, refunds::RefundPostgres},
        },
    },
    payments::midtrans_client::MidtransClient,
};

pub type SharedWebhookUseCase =
    PaymentWebhookUseCase<PaymentPostgres, RefundPostgres, MidtransClient, TracingEventSink>;

pub fn routes(db_pool: Arc<PgPoolSquad>, config: &DotEnvyConfig) -> Result<Router> {
    let gateway = Arc::new(MidtransClient::new(
        config.midtrans.server_key.clone(),
        config.midtrans.snap_base_url.clone(),
        config.midtrans.api_base_url.clone(),
        Duration::from_secs(config.midtrans.timeout_secs),
    )?);
    let event_sink = Arc::new(TracingEventSink);

    let refunds = Arc::new(RefundUseCase::new(
        Arc::new(RefundPostgres::new(Arc::clone(&db_pool))),
        Arc::clone(&gateway),
        Arc::clone(&event_sink),
    ));
    let webhook_usecase = Arc::new(PaymentWebhookUseCase::new(
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool))),
        refunds,
        gateway,
        event_sink,
    ));

    Ok(Router::new()
        .route("/midtrans", post(handle_midtrans_notification))
        .with_state(webhook_usecase))
}

pub async fn handle_midtrans_notification(
    State(webhook_usecase): State<Arc<SharedWebhookUseCase>>,
    Json(notification): Json<GatewayNotification>,
) -> impl IntoResponse {
    match webhook_usecase.handle_notification(notification).await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ok"}))).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}
