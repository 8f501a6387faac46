//! # Engine Configuration
//!
//! Pricing rates, the order creation strategy and the business day offset.
//!
//! ## Creation Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TRANSACTIONAL (default)              COMPENSATING                      │
//! │  ───────────────────────              ────────────                      │
//! │  BEGIN                                reserve stock   (autocommit)      │
//! │    reserve stock                      next sequence   (autocommit)      │
//! │    next sequence                      insert order    (autocommit)      │
//! │    insert order                       occupy table    (autocommit)      │
//! │    occupy table                                                         │
//! │  COMMIT / ROLLBACK                    on failure: run compensations in  │
//! │                                       reverse (restore stock, delete    │
//! │                                       order)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both modes give the same stock guarantee: a failed creation leaves every
//! product's stock where it started.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use tavola_core::money::Rate;
use tavola_core::order::{business_day, PricingRates};

// =============================================================================
// Creation Mode
// =============================================================================

/// How order creation groups its writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreationMode {
    /// One database transaction; failure rolls everything back.
    #[default]
    Transactional,

    /// Autocommit statements with an explicit compensation stack. For stores
    /// that cannot hold a transaction across the whole pipeline.
    Compensating,
}

impl fmt::Display for CreationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreationMode::Transactional => write!(f, "transactional"),
            CreationMode::Compensating => write!(f, "compensating"),
        }
    }
}

impl FromStr for CreationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transactional" | "tx" => Ok(CreationMode::Transactional),
            "compensating" | "saga" => Ok(CreationMode::Compensating),
            _ => Err(format!("Invalid creation mode: {}", s)),
        }
    }
}

// =============================================================================
// Engine Config
// =============================================================================

/// Engine settings.
///
/// ## Example
/// ```rust
/// use tavola_core::money::Rate;
/// use tavola_orders::{CreationMode, EngineConfig};
///
/// let config = EngineConfig::new()
///     .tax_rate(Rate::from_bps(1100))
///     .creation_mode(CreationMode::Compensating)
///     .business_utc_offset_minutes(7 * 60);
/// assert_eq!(config.rates.tax.bps(), 1100);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub rates: PricingRates,
    pub creation_mode: CreationMode,
    /// Offset of the branch's local day from UTC, in minutes.
    pub business_utc_offset_minutes: i32,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rates(mut self, rates: PricingRates) -> Self {
        self.rates = rates;
        self
    }

    pub fn tax_rate(mut self, rate: Rate) -> Self {
        self.rates.tax = rate;
        self
    }

    pub fn service_charge_rate(mut self, rate: Rate) -> Self {
        self.rates.service_charge = rate;
        self
    }

    pub fn creation_mode(mut self, mode: CreationMode) -> Self {
        self.creation_mode = mode;
        self
    }

    pub fn business_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.business_utc_offset_minutes = minutes;
        self
    }

    /// Business day `at` falls in.
    pub fn business_day(&self, at: DateTime<Utc>) -> NaiveDate {
        business_day(at, self.business_utc_offset_minutes)
    }

    /// UTC instant at which business day `day` starts.
    pub fn day_start(&self, day: NaiveDate) -> DateTime<Utc> {
        let local_midnight = Utc.from_utc_datetime(&day.and_time(NaiveTime::default()));
        local_midnight - Duration::minutes(i64::from(self.business_utc_offset_minutes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_mode_parse() {
        assert_eq!(
            "compensating".parse::<CreationMode>().unwrap(),
            CreationMode::Compensating
        );
        assert_eq!(
            "TRANSACTIONAL".parse::<CreationMode>().unwrap(),
            CreationMode::Transactional
        );
        assert!("eventual".parse::<CreationMode>().is_err());
        assert_eq!(CreationMode::default().to_string(), "transactional");
    }

    #[test]
    fn test_day_start_honours_offset() {
        let config = EngineConfig::new().business_utc_offset_minutes(7 * 60);
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        // Local midnight at UTC+7 is 17:00 UTC the previous day
        assert_eq!(
            config.day_start(day),
            Utc.with_ymd_and_hms(2025, 3, 9, 17, 0, 0).unwrap()
        );
        assert_eq!(config.business_day(config.day_start(day)), day);
    }
}
