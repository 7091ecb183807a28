//! Offer assessment: price a new group contract against historical
//! benchmarks and estimate the probability of closing the sale.
//!
//! Pricing rules:
//! - valid range: offered lives within 15% of the benchmark lives
//! - true cost per life = claims per life / target loss ratio
//! - target price = true cost + 5%
//! - expected loss ratio = claims per life / target price
//!
//! Probability rules:
//! - base = 0.6 × logistic output + (0.4 × similarity score) × adjustment
//! - × 1.05 when the expected loss ratio is within target
//! - × (1 − variance) when the price exceeds the per-life budget
//!
//! When the requested package is over budget, the next lower tier is priced
//! from every region's rows, then Basic if that is still over budget.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    catalog::PackageTier,
    historical::{Benchmark, HistoricalDataset, HistoricalRecord},
};

const VALID_RANGE_TOLERANCE: f64 = 0.15;
const CONTINGENCY: f64 = 1.05;
const WITHIN_TARGET_BONUS: f64 = 1.05;

#[derive(Debug, Error, PartialEq)]
pub enum OfferError {
    #[error("No historical data available. Please ensure the spreadsheet is properly loaded.")]
    NoHistoricalData,
    #[error("Invalid offer input: {0}")]
    InvalidInput(String),
    #[error(
        "No historical data for {region}/{package} combination.\nAvailable regions: {}\nAvailable packages: {}",
        .regions.join(", "),
        .packages.join(", ")
    )]
    NoMatchingHistory {
        region: String,
        package: String,
        regions: Vec<String>,
        packages: Vec<String>,
    },
    #[error("Historical rows for {region}/{package} have no earned exposure")]
    NoExposure { region: String, package: String },
}

/// A per-life claims figure, or the agent's "I don't know".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClaimsInput {
    Known(f64),
    #[default]
    Unknown,
}

impl ClaimsInput {
    /// Anything that is not a number, including "I don't know", is unknown.
    pub fn parse(text: &str) -> Self {
        let normalized = text.trim().to_lowercase().replace('\u{2019}', "'");
        if normalized == "i don't know" {
            return ClaimsInput::Unknown;
        }
        match normalized.replace(',', "").parse::<f64>() {
            Ok(value) if value.is_finite() => ClaimsInput::Known(value),
            _ => ClaimsInput::Unknown,
        }
    }
}

impl Serialize for ClaimsInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ClaimsInput::Known(value) => serializer.serialize_f64(*value),
            ClaimsInput::Unknown => serializer.serialize_str("I don't know"),
        }
    }
}

impl<'de> Deserialize<'de> for ClaimsInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawClaims {
            Number(f64),
            Text(String),
            Missing(()),
        }

        Ok(match RawClaims::deserialize(deserializer)? {
            RawClaims::Number(value) if value.is_finite() => ClaimsInput::Known(value),
            RawClaims::Number(_) | RawClaims::Missing(()) => ClaimsInput::Unknown,
            RawClaims::Text(text) => ClaimsInput::parse(&text),
        })
    }
}

fn default_logistic_output() -> f64 {
    0.65
}

fn default_similarity_score() -> f64 {
    0.75
}

fn default_adjustment() -> f64 {
    1.1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferRequest {
    pub region: String,
    pub lives: u32,
    pub budget_per_life: f64,
    pub target_lr: f64,
    pub package: String,
    #[serde(default)]
    pub historical_claims_per_life: ClaimsInput,
    #[serde(default = "default_logistic_output")]
    pub logistic_output: f64,
    #[serde(default = "default_similarity_score")]
    pub similarity_score: f64,
    #[serde(default = "default_adjustment")]
    pub adjustment: f64,
}

impl OfferRequest {
    pub fn new(region: &str, lives: u32, budget_per_life: f64, target_lr: f64, package: &str) -> Self {
        Self {
            region: region.to_string(),
            lives,
            budget_per_life,
            target_lr,
            package: package.to_string(),
            historical_claims_per_life: ClaimsInput::Unknown,
            logistic_output: default_logistic_output(),
            similarity_score: default_similarity_score(),
            adjustment: default_adjustment(),
        }
    }

    pub fn with_claims(mut self, claims: ClaimsInput) -> Self {
        self.historical_claims_per_life = claims;
        self
    }

    fn validate(&self) -> Result<(), OfferError> {
        if self.lives == 0 {
            return Err(OfferError::InvalidInput("lives must be greater than zero".into()));
        }
        if self.target_lr.is_nan() || self.target_lr <= 0.0 {
            return Err(OfferError::InvalidInput("target loss ratio must be greater than zero".into()));
        }
        if self.budget_per_life.is_nan() || self.budget_per_life < 0.0 {
            return Err(OfferError::InvalidInput("budget per life cannot be negative".into()));
        }
        if let ClaimsInput::Known(claims) = self.historical_claims_per_life {
            if claims < 0.0 {
                return Err(OfferError::InvalidInput(
                    "historical claims per life cannot be negative".into(),
                ));
            }
        }
        Ok(())
    }

    fn base_probability(&self) -> f64 {
        0.6 * self.logistic_output + (0.4 * self.similarity_score) * self.adjustment
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn round2<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 2))
}

fn round4<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 4))
}

/// Price and probability for one package option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageQuote {
    pub name: String,
    #[serde(serialize_with = "round2")]
    pub price_per_life: f64,
    pub fits_budget: bool,
    #[serde(serialize_with = "round4")]
    pub expected_lr: f64,
    #[serde(serialize_with = "round4")]
    pub sale_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferAssessment {
    #[serde(serialize_with = "round2")]
    pub benchmark_lives: f64,
    pub valid_range: bool,
    #[serde(serialize_with = "round4")]
    pub avg_loss_ratio: f64,
    #[serde(serialize_with = "round2")]
    pub avg_premium: f64,
    #[serde(serialize_with = "round2")]
    pub avg_claims_per_life: f64,
    pub offered_lives: u32,
    pub budget_per_life: f64,
    #[serde(serialize_with = "round2")]
    pub offered_budget: f64,
    #[serde(serialize_with = "round2")]
    pub target_price: f64,
    #[serde(serialize_with = "round2")]
    pub true_cost_per_life: f64,
    #[serde(serialize_with = "round4")]
    pub expected_lr: f64,
    pub target_lr: f64,
    pub recommend_downgrade: bool,
    #[serde(serialize_with = "round4")]
    pub final_probability: f64,
    pub used_claims_fallback: bool,
    /// Requested package first, then any cheaper alternatives.
    pub packages: Vec<PackageQuote>,
}

struct Pricing {
    true_cost: f64,
    target_price: f64,
    expected_lr: f64,
}

fn price(claims_per_life: f64, target_lr: f64) -> Pricing {
    let true_cost = claims_per_life / target_lr;
    let target_price = true_cost * CONTINGENCY;
    let expected_lr = if target_price > 0.0 {
        claims_per_life / target_price
    } else {
        0.0
    };
    Pricing {
        true_cost,
        target_price,
        expected_lr,
    }
}

/// The Basic fallback is quoted without the over-budget penalty.
fn sale_probability(request: &OfferRequest, pricing: &Pricing, penalize_over_budget: bool) -> f64 {
    let mut probability = request.base_probability();
    if pricing.expected_lr <= request.target_lr {
        probability *= WITHIN_TARGET_BONUS;
    }
    if penalize_over_budget && pricing.target_price > request.budget_per_life {
        let variance =
            (pricing.target_price - request.budget_per_life) / request.budget_per_life.max(1e-9);
        probability *= (1.0 - variance).max(0.0);
    }
    probability
}

/// Price `tier` from the rows of every region. `None` when no usable rows exist.
fn quote_tier(
    dataset: &HistoricalDataset,
    tier: PackageTier,
    request: &OfferRequest,
    penalize_over_budget: bool,
) -> Option<PackageQuote> {
    let rows = dataset.with_package(tier.name());
    let benchmark = Benchmark::from_records(&rows)?;
    let pricing = price(benchmark.claims_per_life, request.target_lr);
    Some(PackageQuote {
        name: tier.name().to_string(),
        price_per_life: pricing.target_price,
        fits_budget: pricing.target_price <= request.budget_per_life,
        expected_lr: pricing.expected_lr,
        sale_probability: sale_probability(request, &pricing, penalize_over_budget),
    })
}

#[instrument(skip(dataset), fields(region = %request.region, package = %request.package, lives = request.lives))]
pub fn assess_offer(dataset: &HistoricalDataset, request: &OfferRequest) -> Result<OfferAssessment, OfferError> {
    if dataset.is_empty() {
        return Err(OfferError::NoHistoricalData);
    }
    request.validate()?;

    let rows: Vec<&HistoricalRecord> = dataset.matching(&request.region, &request.package);
    if rows.is_empty() {
        return Err(OfferError::NoMatchingHistory {
            region: request.region.clone(),
            package: request.package.clone(),
            regions: dataset.regions(),
            packages: dataset.packages(),
        });
    }
    let benchmark = Benchmark::from_records(&rows).ok_or_else(|| OfferError::NoExposure {
        region: request.region.clone(),
        package: request.package.clone(),
    })?;

    let lives = f64::from(request.lives);
    let offered_budget = lives * request.budget_per_life;
    let valid_range = (lives - benchmark.lives).abs() / benchmark.lives <= VALID_RANGE_TOLERANCE;

    let (claims_per_life, used_claims_fallback) = match request.historical_claims_per_life {
        ClaimsInput::Known(claims) => (claims, false),
        ClaimsInput::Unknown => (benchmark.claims_per_life, true),
    };

    let pricing = price(claims_per_life, request.target_lr);
    let probability = sale_probability(request, &pricing, true);
    let over_budget = pricing.target_price > request.budget_per_life;

    debug!(
        target_price = pricing.target_price,
        budget_per_life = request.budget_per_life,
        over_budget,
        "Priced requested package"
    );

    let mut packages = vec![PackageQuote {
        name: request.package.clone(),
        price_per_life: pricing.target_price,
        fits_budget: !over_budget,
        expected_lr: pricing.expected_lr,
        sale_probability: probability,
    }];

    if over_budget {
        let lower = PackageTier::parse(&request.package).and_then(PackageTier::next_lower);
        if let Some(alternative) = lower.and_then(|tier| quote_tier(dataset, tier, request, true).map(|q| (tier, q))) {
            let (tier, quote) = alternative;
            let still_over = !quote.fits_budget;
            debug!(package = %tier, price = quote.price_per_life, "Priced alternative package");
            packages.push(quote);

            if still_over && tier != PackageTier::Basic {
                if let Some(basic) = quote_tier(dataset, PackageTier::Basic, request, false) {
                    debug!(price = basic.price_per_life, "Priced Basic fallback");
                    packages.push(basic);
                }
            }
        }
    }

    Ok(OfferAssessment {
        benchmark_lives: benchmark.lives,
        valid_range,
        avg_loss_ratio: benchmark.loss_ratio,
        avg_premium: benchmark.premium,
        avg_claims_per_life: benchmark.claims_per_life,
        offered_lives: request.lives,
        budget_per_life: request.budget_per_life,
        offered_budget,
        target_price: pricing.target_price,
        true_cost_per_life: pricing.true_cost,
        expected_lr: pricing.expected_lr,
        target_lr: request.target_lr,
        recommend_downgrade: over_budget,
        final_probability: probability,
        used_claims_fallback,
        packages,
    })
}

/// `1234567.891` → `1,234,567.89`
fn money(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((&formatted, "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}

fn tick(ok: bool) -> &'static str {
    if ok { "✅" } else { "❌" }
}

impl OfferAssessment {
    /// The comparison table and evaluation notes shown to the sales agent.
    pub fn report(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_report(&mut out);
        out
    }

    fn write_report(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "--- 📊 Package Comparison Table ---")?;
        writeln!(
            out,
            "{:<15} {:<15} {:<15} {:<15} {:<15}",
            "Package", "Price/Life", "Fits Budget", "Exp. LR", "Sale Prob."
        )?;
        writeln!(out, "{}", "-".repeat(75))?;
        for quote in &self.packages {
            writeln!(
                out,
                "{:<15} {:<15} {:<15} {:<15} {:.1}%",
                quote.name,
                format!("{} SAR", money(quote.price_per_life)),
                tick(quote.fits_budget),
                format!("{:.1}%", quote.expected_lr * 100.0),
                quote.sale_probability * 100.0
            )?;
        }

        writeln!(out)?;
        writeln!(out, "--- 📈 Additional Information ---")?;
        writeln!(out, "• Benchmark Lives: {:.0}", self.benchmark_lives)?;
        writeln!(
            out,
            "• Valid Range (±15%): {}",
            if self.valid_range { "✅ Yes" } else { "❌ No" }
        )?;
        writeln!(out, "• Avg Loss Ratio: {:.2}", self.avg_loss_ratio)?;
        writeln!(out, "• Avg Premium per Life: {:.2} SAR", self.avg_premium)?;
        writeln!(out, "• Avg Claims per Life: {:.2} SAR", self.avg_claims_per_life)?;

        writeln!(out)?;
        writeln!(out, "--- 💡 Offer Evaluation ---")?;
        writeln!(out, "• Lives Offered: {}", self.offered_lives)?;
        writeln!(out, "• Budget per Life: {:.2} SAR", self.budget_per_life)?;
        writeln!(out, "• Offered Budget: {} SAR", money(self.offered_budget))?;
        writeln!(out, "• Target Price (+5%): {:.2} SAR", self.target_price)?;
        writeln!(out, "• True Cost per Life (Claims ÷ Target LR): {:.2} SAR", self.true_cost_per_life)?;
        if self.budget_per_life < self.avg_premium {
            writeln!(out, "⚠️ Budget per life is below historical average.")?;
        }
        if self.used_claims_fallback {
            writeln!(out, "ℹ️ Claims per life not provided, using the historical average.")?;
        }
        writeln!(out, "• Expected LR (Claims ÷ Price): {:.2}", self.expected_lr)?;
        if self.expected_lr > self.target_lr {
            writeln!(out, "❌ Expected LR exceeds Target LR, risk of unprofitable contract.")?;
        } else {
            writeln!(out, "✅ Expected LR is within acceptable target range.")?;
        }
        if self.recommend_downgrade {
            writeln!(out, "📉 Target price exceeds budget, recommend **downgrading package**.")?;
        }

        writeln!(out)?;
        writeln!(out, "--- 🧠 Sales Forecast ---")?;
        writeln!(
            out,
            "• Final Sale Probability: {:.2}% (after adjustments)",
            self.final_probability * 100.0
        )?;
        Ok(())
    }
}
