use anyhow::Result;
use chrono::NaiveDate;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use service_core::config::Config as CommonConfig;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub common: CommonConfig,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub transfer: TransferConfig,
    pub reporting: ReportingConfig,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Deserialize, Clone, Debug)]
pub struct TransferConfig {
    pub api_base_url: String,
    pub api_key: Secret<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ReportingConfig {
    /// Platform operational start date. Requested analytics ranges never
    /// begin earlier; handlers clamp the lower bound to this date.
    pub min_report_date: NaiveDate,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let port = env::var("PAYOUT_SERVICE_PORT")
            .unwrap_or_else(|_| "8084".to_string())
            .parse()?;

        let db_url = env::var("PAYOUT_DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("PAYOUT_DATABASE_URL must be set"))?;
        let max_connections = env::var("PAYOUT_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "16".to_string())
            .parse()?;
        let min_connections = env::var("PAYOUT_DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()?;

        let transfer_url = env::var("TRANSFER_API_URL").unwrap_or_default();
        let transfer_key = env::var("TRANSFER_API_KEY").unwrap_or_default();

        let min_report_date = NaiveDate::parse_from_str(
            &env::var("REPORTING_MIN_DATE").unwrap_or_else(|_| "2023-09-01".to_string()),
            "%Y-%m-%d",
        )?;

        Ok(Self {
            common: CommonConfig { port },
            service_name: "payout-service".to_string(),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: DatabaseConfig {
                url: Secret::new(db_url),
                max_connections,
                min_connections,
            },
            transfer: TransferConfig {
                api_base_url: transfer_url,
                api_key: Secret::new(transfer_key),
            },
            reporting: ReportingConfig { min_report_date },
        })
    }
}
