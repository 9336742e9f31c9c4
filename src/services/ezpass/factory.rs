/// Factory: build `EzpassClient` from application `Config`.
use crate::config::Config;
use crate::services::ezpass::{ClientConfig, EzpassClient};

pub fn build_ezpass_client(config: &Config) -> Result<EzpassClient, reqwest::Error> {
    let client_config =
        ClientConfig::new(config.ezpass_url.as_str()).with_timeout(config.ezpass_timeout);
    EzpassClient::new(client_config)
}
