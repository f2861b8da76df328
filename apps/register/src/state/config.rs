//! # Configuration State
//!
//! Register configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Command-line flags (`--db`)
//! 2. Environment variables (`APOTHECA_*`)
//! 3. Defaults (this file)
//!
//! Store details printed on receipts (name, address, phone) and the
//! auto-print flag live in the persisted `settings` row instead, so admins
//! can change them without restarting the register.
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Register configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Database file override. `None` uses the platform data directory.
    pub db_path: Option<PathBuf>,

    /// Store name used until the settings row is read
    pub store_name: String,

    /// Currency code (ISO 4217)
    pub currency_code: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Number of decimal places for currency
    pub currency_decimals: u8,

    /// Seconds between low-stock checks
    pub low_stock_poll_secs: u64,

    /// Receipt width in characters (typically 32, 42 or 48)
    pub receipt_width: usize,
}

impl Default for ConfigState {
    /// ## Default Values
    /// - Store: "Apotheca Pharmacy"
    /// - Currency: PKR (Rs)
    /// - Low-stock poll: every 60 seconds
    /// - Receipt: 42 columns
    fn default() -> Self {
        ConfigState {
            db_path: None,
            store_name: "Apotheca Pharmacy".to_string(),
            currency_code: "PKR".to_string(),
            currency_symbol: "Rs ".to_string(),
            currency_decimals: 2,
            low_stock_poll_secs: 60,
            receipt_width: 42,
        }
    }
}

impl ConfigState {
    /// Creates a new ConfigState from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `APOTHECA_DB_PATH`: Database file
    /// - `APOTHECA_STORE_NAME`: Store name
    /// - `APOTHECA_CURRENCY`: Currency code; also picks the symbol
    /// - `APOTHECA_LOW_STOCK_POLL_SECS`: Low-stock poll interval
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ConfigState::default();

        if let Some(path) = lookup("APOTHECA_DB_PATH").filter(|p| !p.trim().is_empty()) {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Some(store_name) = lookup("APOTHECA_STORE_NAME").filter(|s| !s.trim().is_empty()) {
            config.store_name = store_name.trim().to_string();
        }

        if let Some(code) = lookup("APOTHECA_CURRENCY") {
            let code = code.trim().to_uppercase();
            if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
                config.currency_symbol = currency_symbol(&code);
                config.currency_code = code;
            } else {
                tracing::warn!(value = %code, "Ignoring invalid APOTHECA_CURRENCY");
            }
        }

        if let Some(secs) = lookup("APOTHECA_LOW_STOCK_POLL_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.low_stock_poll_secs = secs,
                _ => tracing::warn!(value = %secs, "Ignoring invalid APOTHECA_LOW_STOCK_POLL_SECS"),
            }
        }

        config
    }

    pub fn low_stock_poll_interval(&self) -> Duration {
        Duration::from_secs(self.low_stock_poll_secs)
    }

    /// Formats a cent amount as a currency string.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = ConfigState::default();
    /// assert_eq!(config.format_currency(1234), "Rs 12.34");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        let divisor = 10_i64.pow(self.currency_decimals as u32);
        let whole = cents / divisor;
        let frac = (cents % divisor).abs();

        format!(
            "{}{}{}",
            if cents < 0 { "-" } else { "" },
            self.currency_symbol,
            if self.currency_decimals > 0 {
                format!(
                    "{}.{:0width$}",
                    whole.abs(),
                    frac,
                    width = self.currency_decimals as usize
                )
            } else {
                whole.abs().to_string()
            }
        )
    }
}

fn currency_symbol(code: &str) -> String {
    let symbol = match code {
        "PKR" | "INR" | "LKR" | "NPR" => "Rs ",
        "USD" | "CAD" | "AUD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        _ => return format!("{code} "),
    };
    symbol.to_string()
}
