use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tracing::{error, info};

use crate::{
    application::usercases::bookings::BookingUseCase,
    domain::repositories::{
        bookings::BookingRepository, event_sink::EventSink, payments::PaymentRepository,
        refunds::RefundRepository, rooms::RoomRepository,
    },
    payments::PaymentGateway,
};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically completes approved bookings whose rental window has elapsed.
/// Failures are logged and the loop keeps going.
pub async fn run_completion_loop<R, B, P, F, G, E>(
    bookings_usecase: Arc<BookingUseCase<R, B, P, F, G, E>>,
) -> Result<()>
where
    R: RoomRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    F: RefundRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    E: EventSink + Send + Sync + 'static,
{
    loop {
        match bookings_usecase.complete_elapsed().await {
            Ok(0) => {}
            Ok(completed) => {
                info!(completed, "completion loop: bookings completed");
            }
            Err(e) => {
                error!("Error while completing elapsed bookings: {}", e);
            }
        }

        tokio::time::sleep(SWEEP_INTERVAL).await;
    }
}
