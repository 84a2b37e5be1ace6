use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_SLOT_GRANULARITY_MINUTES: u32 = 5;
pub const DEFAULT_MAX_RULE_DEPTH: usize = 20;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub clinic_timezone: String,
    pub slot_granularity_minutes: u32,
    pub max_rule_depth: usize,
    pub api_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            clinic_timezone: env::var("CLINIC_TIMEZONE")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_TIMEZONE not set, using UTC");
                    "UTC".to_string()
                }),
            slot_granularity_minutes: parse_or_default(
                "SLOT_GRANULARITY_MINUTES",
                DEFAULT_SLOT_GRANULARITY_MINUTES,
            ),
            max_rule_depth: parse_or_default("MAX_RULE_DEPTH", DEFAULT_MAX_RULE_DEPTH),
            api_port: parse_or_default("API_PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    /// Configuration pointing at an explicit Supabase instance, everything else defaulted.
    pub fn for_supabase(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            supabase_url: url.into(),
            supabase_anon_key: anon_key.into(),
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            clinic_timezone: "UTC".to_string(),
            slot_granularity_minutes: DEFAULT_SLOT_GRANULARITY_MINUTES,
            max_rule_depth: DEFAULT_MAX_RULE_DEPTH,
            api_port: 3000,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
