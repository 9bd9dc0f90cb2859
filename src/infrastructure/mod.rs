pub mod axum_http;
pub mod events;
pub mod postgres;
