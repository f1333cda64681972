use std::env;

use chrono::Duration;
use log::*;
use points_ledger_engine::tier::TierLadder;

const DEFAULT_PLG_HOST: &str = "127.0.0.1";
const DEFAULT_PLG_PORT: u16 = 8370;
/// Earned points live for a year unless the caller says otherwise.
const DEFAULT_EARN_TTL_DAYS: i64 = 365;
/// One sweep per day.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 86_400;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The tier ladder, loaded once at startup. Changing thresholds means restarting; the
    /// ladder is passed around as an immutable snapshot and never mutated in place.
    pub tier_ladder: TierLadder,
    /// TTL applied to earn entries that do not carry their own.
    pub default_earn_ttl_days: i64,
    /// How often the background expiry sweep runs.
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PLG_HOST.to_string(),
            port: DEFAULT_PLG_PORT,
            database_url: String::default(),
            tier_ladder: TierLadder::default_ladder(),
            default_earn_ttl_days: DEFAULT_EARN_TTL_DAYS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PLG_HOST").ok().unwrap_or_else(|| DEFAULT_PLG_HOST.into());
        let port = env::var("PLG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for PLG_PORT. {e} Using the default, {DEFAULT_PLG_PORT}, instead.");
                    DEFAULT_PLG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PLG_PORT);
        let database_url = env::var("PLG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ PLG_DATABASE_URL is not set. Please set it to the URL for the points ledger database.");
            String::default()
        });
        let tier_ladder = match env::var("PLG_TIER_LADDER") {
            Ok(s) => s.parse::<TierLadder>().unwrap_or_else(|e| {
                warn!("🪛️ PLG_TIER_LADDER is not a valid ladder ({e}). Using the default ladder instead.");
                TierLadder::default_ladder()
            }),
            Err(_) => {
                info!("🪛️ PLG_TIER_LADDER is not set. Using the default ladder.");
                TierLadder::default_ladder()
            },
        };
        let default_earn_ttl_days = env::var("PLG_EARN_TTL_DAYS")
            .map_err(|_| {
                info!("🪛️ PLG_EARN_TTL_DAYS is not set. Using the default value of {DEFAULT_EARN_TTL_DAYS} days.")
            })
            .and_then(|s| {
                s.parse::<i64>().map_err(|e| warn!("🪛️ Invalid configuration value for PLG_EARN_TTL_DAYS. {e}"))
            })
            .ok()
            .filter(|d| {
                let ok = *d > 0;
                if !ok {
                    warn!("🪛️ PLG_EARN_TTL_DAYS must be positive. Using the default.");
                }
                ok
            })
            .unwrap_or(DEFAULT_EARN_TTL_DAYS);
        let sweep_interval_secs = env::var("PLG_SWEEP_INTERVAL_SECS")
            .map_err(|_| {
                info!(
                    "🪛️ PLG_SWEEP_INTERVAL_SECS is not set. Using the default value of {DEFAULT_SWEEP_INTERVAL_SECS} \
                     seconds."
                )
            })
            .and_then(|s| {
                s.parse::<u64>().map_err(|e| warn!("🪛️ Invalid configuration value for PLG_SWEEP_INTERVAL_SECS. {e}"))
            })
            .ok()
            .filter(|d| {
                let ok = *d > 0;
                if !ok {
                    warn!("🪛️ PLG_SWEEP_INTERVAL_SECS must be positive. Using the default.");
                }
                ok
            })
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);
        Self { host, port, database_url, tier_ladder, default_earn_ttl_days, sweep_interval_secs }
    }

    pub fn default_earn_ttl(&self) -> Duration {
        Duration::days(self.default_earn_ttl_days)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }
}
