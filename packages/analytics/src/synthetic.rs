use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};
use rand::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::ProviderError;
use crate::types::ObservedSeries;

/// Supplies the raw observed daily sales series for a dealer. The analysis
/// core only depends on this seam, so a remote data source and the demo
/// generator below are interchangeable.
pub trait ObservedSeriesProvider: Send + Sync {
    fn fetch(
        &self,
        dealer_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ObservedSeries, ProviderError>;
}

/// Shape of one dealer's fabricated sales history.
#[derive(Debug, Clone)]
pub struct SyntheticProfile {
    /// Average units sold per weekday.
    pub base_daily_sales: f64,
    /// Extra units on Saturday/Sunday (half of it on Friday).
    pub weekend_boost: f64,
    /// Uniform day-to-day noise amplitude.
    pub noise_amplitude: f64,
    /// Date the dealer integrated the product; drives the fabricated lift.
    pub integration_date: NaiveDate,
    /// Steady-state extra units per day once the lift has ramped up.
    pub lift_daily_sales: f64,
}

/// Deterministic demo-data generator. Every run for the same seed, dealer,
/// and window produces an identical series, so scenario tests stay
/// reproducible.
pub struct SyntheticSalesProvider {
    seed: u64,
    profiles: HashMap<i64, SyntheticProfile>,
}

impl SyntheticSalesProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            profiles: HashMap::new(),
        }
    }

    pub fn with_dealer(mut self, dealer_id: i64, profile: SyntheticProfile) -> Self {
        self.profiles.insert(dealer_id, profile);
        self
    }

    pub fn has_dealer(&self, dealer_id: i64) -> bool {
        self.profiles.contains_key(&dealer_id)
    }
}

impl ObservedSeriesProvider for SyntheticSalesProvider {
    fn fetch(
        &self,
        dealer_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ObservedSeries, ProviderError> {
        let profile = self
            .profiles
            .get(&dealer_id)
            .ok_or(ProviderError::UnknownDealer(dealer_id))?;

        if end < start {
            return Err(ProviderError::Fetch(format!(
                "window end {end} precedes start {start}"
            )));
        }

        let mut rng =
            ChaCha8Rng::seed_from_u64(self.seed ^ (dealer_id as u64).wrapping_mul(0x9E3779B97F4A7C15));

        let days = (end - start).num_days() as usize + 1;
        let mut points = Vec::with_capacity(days);
        let mut date = start;
        for _ in 0..days {
            let mut value = profile.base_daily_sales;
            value += match date.weekday() {
                Weekday::Sat | Weekday::Sun => profile.weekend_boost,
                Weekday::Fri => profile.weekend_boost / 2.0,
                _ => 0.0,
            };
            value += rng.gen_range(-profile.noise_amplitude..=profile.noise_amplitude);

            if date >= profile.integration_date {
                // Adoption effect ramps up with a saturating curve.
                let since = (date - profile.integration_date).num_days() as f64;
                value += profile.lift_daily_sales * (1.0 - (-since / 15.0).exp());
            }

            points.push((date, value.max(0.0).round()));
            date = date.succ_opt().ok_or_else(|| {
                ProviderError::Fetch(format!("date overflow after {date}"))
            })?;
        }

        ObservedSeries::new(points).map_err(|err| ProviderError::Fetch(err.to_string()))
    }
}
