#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub midtrans: Midtrans,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Midtrans {
    pub server_key: String,
    pub snap_base_url: String,
    pub api_base_url: String,
    pub timeout_secs: u64,
    pub gateway_fee_minor: i64,
}
