use crate::error::Result;
use crate::resolver::ConfigResolver;
use crate::schema::{FeeConfig, Platform, ServiceFeeBase, TaxCalculationBase};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Intermediate amounts of the settlement pipeline, in the same minor units as the base amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub platform_fee_amount: f64,
    pub discounted_amount: f64,
    /// Zero when the configuration carries no service fee.
    pub service_fee_amount: f64,
    /// Zero when the price is already tax-inclusive.
    pub tax_amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calculation {
    /// Settlement amount in minor units, unrounded.
    pub final_amount: f64,
    /// `final_amount / base_amount`; `None` for a zero base amount.
    pub coefficient: Option<f64>,
    pub breakdown: FeeBreakdown,
}

/// Converts a list price into a settlement amount in five stages:
/// platform fee, discount, service fee, tax and final coefficient.
///
/// Every stage is linear in the base amount, so the coefficient depends on
/// the configuration's rates alone.
pub struct CoefficientCalculator<'a> {
    config: &'a FeeConfig,
}

impl<'a> CoefficientCalculator<'a> {
    pub fn new(config: &'a FeeConfig) -> Self {
        Self { config }
    }

    pub fn calculate(&self, base_amount: u64) -> Result<Calculation> {
        self.config.validate()?;

        let base = base_amount as f64;
        let platform_fee_amount = self.platform_fee(base);
        let discounted_amount = self.discounted(base, platform_fee_amount);
        let service_fee_amount = self.service_fee(base, platform_fee_amount, discounted_amount);
        let tax_amount = self.tax(discounted_amount, service_fee_amount);

        let final_amount = discounted_amount + service_fee_amount + tax_amount;
        let coefficient = if base_amount == 0 {
            None
        } else {
            Some(final_amount / base)
        };

        debug!(
            "{}: base {} -> platform fee {}, discounted {}, service fee {}, tax {}, final {}",
            self.config.version(),
            base_amount,
            platform_fee_amount,
            discounted_amount,
            service_fee_amount,
            tax_amount,
            final_amount
        );

        Ok(Calculation {
            final_amount,
            coefficient,
            breakdown: FeeBreakdown {
                platform_fee_amount,
                discounted_amount,
                service_fee_amount,
                tax_amount,
            },
        })
    }

    /// The coefficient of this configuration, independent of any particular price.
    pub fn unit_coefficient(&self) -> Result<f64> {
        // A unit base is exact in f64 and never zero.
        let calculation = self.calculate(1)?;
        Ok(calculation.final_amount)
    }

    fn platform_fee(&self, base: f64) -> f64 {
        base * self.config.platform_fee_rate
    }

    fn discounted(&self, base: f64, platform_fee: f64) -> f64 {
        if self.config.includes_platform_fee {
            (base + platform_fee) * self.config.discount_rate
        } else {
            base * self.config.discount_rate + platform_fee
        }
    }

    fn service_fee(&self, base: f64, platform_fee: f64, discounted: f64) -> f64 {
        if self.config.service_fee_rate == 0.0 {
            return 0.0;
        }

        let fee_base = match self.config.service_fee_base {
            ServiceFeeBase::BeforeDiscount => base + platform_fee,
            ServiceFeeBase::AfterDiscount => discounted,
        };
        self.config.service_fee_rate * fee_base
    }

    fn tax(&self, discounted: f64, service_fee: f64) -> f64 {
        if self.config.includes_tax {
            return 0.0;
        }

        let taxable = match self.config.tax_calculation_base {
            TaxCalculationBase::IncludeServiceFee => discounted + service_fee,
            TaxCalculationBase::ExcludeServiceFee => discounted,
        };
        self.config.tax_rate * taxable
    }
}

pub fn calculate(base_amount: u64, config: &FeeConfig) -> Result<Calculation> {
    CoefficientCalculator::new(config).calculate(base_amount)
}

/// Projects the settlement amount of a future list price from a known coefficient.
pub fn project_settlement(list_price: u64, coefficient: f64) -> f64 {
    list_price as f64 * coefficient
}

/// The coefficient each platform's configuration yields on `as_of`, for quoting.
/// Platforms whose configuration cannot be resolved carry the error message instead.
pub fn coefficient_table(
    resolver: &ConfigResolver,
    as_of: NaiveDate,
) -> BTreeMap<Platform, std::result::Result<f64, String>> {
    resolver
        .platforms()
        .map(|platform| {
            let coefficient = resolver
                .resolve(platform, as_of)
                .and_then(|config| CoefficientCalculator::new(config).unit_coefficient())
                .map_err(|e| e.to_string());
            (platform, coefficient)
        })
        .collect()
}
