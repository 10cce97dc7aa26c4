//! Common utilities shared across demos.

#![allow(dead_code)]

use fastwire::prelude::*;
use std::env;

/// Default server port.
pub const DEFAULT_PORT: u16 = 9144;

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Demo configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl DemoConfig {
    /// Loads the configuration from `FASTWIRE_HOST` / `FASTWIRE_PORT`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            host: env::var("FASTWIRE_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("FASTWIRE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
        }
    }

    /// Returns the `host:port` address string.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Initializes tracing with `RUST_LOG` filtering, `info` by default.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// The template set both demo peers agree on out of band.
#[must_use]
pub fn market_data_templates() -> TemplateRegistry {
    let mut registry = TemplateRegistry::new();
    registry.register(Template::new(
        1,
        "Quote",
        vec![
            Field::new("Symbol", FieldType::Ascii).with_operator(Operator::Copy),
            Field::new("BidPx", FieldType::Decimal).with_operator(Operator::Delta),
            Field::new("AskPx", FieldType::Decimal).with_operator(Operator::Delta),
            Field::new("BidQty", FieldType::UInt32),
            Field::new("AskQty", FieldType::UInt32),
        ],
    ));
    registry.register(Template::new(
        2,
        "Heartbeat",
        vec![Field::new("Seq", FieldType::UInt32).with_operator(Operator::Increment)],
    ));
    registry
}
