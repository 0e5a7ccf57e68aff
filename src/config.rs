use std::env;

/// Environment variables checked for the research API credential, in
/// priority order. The first non-blank value wins.
pub const API_KEY_SOURCES: [&str; 3] = ["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub model: String,
    pub thinking_budget: u32,
    pub api_key: Option<String>,
    pub api_key_source: Option<&'static str>,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let credential = resolve_api_key(|name| env::var(name).ok());
        let (api_key_source, api_key) = match credential {
            Some((source, key)) => (Some(source), Some(key)),
            None => (None, None),
        };

        Self {
            port: env::var("APP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("APP_PORT must be a number"),
            environment: env::var("SERVICE_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            model: env::var("RESEARCH_MODEL").unwrap_or_else(|_| "gemini-3-pro-preview".to_string()),
            thinking_budget: env::var("THINKING_BUDGET")
                .unwrap_or_else(|_| "2048".to_string())
                .parse()
                .expect("THINKING_BUDGET must be a number"),
            api_key,
            api_key_source,
            otel_service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "tradeflow-research".to_string()),
            otel_exporter_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Walk the named credential sources in order and return the first
/// non-blank value together with the source it came from. Takes the lookup
/// as a closure so the order is testable without touching the process
/// environment.
pub fn resolve_api_key<F>(lookup: F) -> Option<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    API_KEY_SOURCES.iter().find_map(|name| {
        lookup(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(|value| (*name, value))
    })
}
