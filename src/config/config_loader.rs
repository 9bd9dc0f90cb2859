use anyhow::Result;

use crate::config::stage::Stage;

use super::config_model::{Database, DotEnvyConfig, Midtrans, Server};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let midtrans = Midtrans {
        server_key: std::env::var("MIDTRANS_SERVER_KEY").expect("MIDTRANS_SERVER_KEY is invalid"),
        snap_base_url: std::env::var("MIDTRANS_SNAP_BASE_URL")
            .unwrap_or_else(|_| "https://app.sandbox.midtrans.com".to_string()),
        api_base_url: std::env::var("MIDTRANS_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.sandbox.midtrans.com".to_string()),
        timeout_secs: std::env::var("MIDTRANS_TIMEOUT")
            .unwrap_or_else(|_| "30".to_string())
            .parse()?,
        gateway_fee_minor: std::env::var("MIDTRANS_GATEWAY_FEE_MINOR")
            .unwrap_or_else(|_| "0".to_string())
            .parse()?,
    };

    Ok(DotEnvyConfig {
        server,
        database,
        midtrans,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or("".to_string());
    Stage::try_from(stage_str.as_str()).unwrap_or_default()
}
