pub mod application;
pub mod background;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod observability;
pub mod payments;
