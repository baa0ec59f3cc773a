use crate::calculator::{CoefficientCalculator, FeeBreakdown};
use crate::error::Result;
use crate::resolver::ConfigResolver;
use crate::schema::{Collaboration, ConfigVersion};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Finance of one collaboration. Amounts are in minor units and unrounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceResult {
    pub revenue: f64,
    pub coefficient: Option<f64>,
    pub breakdown: FeeBreakdown,
    /// The configuration version this result was computed with.
    pub config_version: ConfigVersion,
    /// The quoted amount this result was computed from.
    pub base_amount: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationFailure {
    pub collaboration_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEvaluation {
    pub results: Vec<(String, FinanceResult)>,
    pub failures: Vec<EvaluationFailure>,
}

pub struct CollaborationFinanceEvaluator<'a> {
    resolver: &'a ConfigResolver,
}

impl<'a> CollaborationFinanceEvaluator<'a> {
    pub fn new(resolver: &'a ConfigResolver) -> Self {
        Self { resolver }
    }

    /// Resolves the configuration in force on the collaboration's order date
    /// and runs the quoted amount through the calculator.
    pub fn evaluate(&self, collaboration: &Collaboration) -> Result<FinanceResult> {
        self.evaluate_with_cache(collaboration, None)
    }

    /// Like [`evaluate`](Self::evaluate), reusing `cached` when it is still current.
    ///
    /// A cached result is current only if it was computed from the record's
    /// present quoted amount with the configuration version that resolves for
    /// the record today. Anything else is discarded and recomputed, so a stale
    /// cache can cost time but never change the figures. Callers remain
    /// responsible for dropping caches they know to be invalid.
    pub fn evaluate_with_cache(
        &self,
        collaboration: &Collaboration,
        cached: Option<&FinanceResult>,
    ) -> Result<FinanceResult> {
        let config = self
            .resolver
            .resolve(collaboration.platform, collaboration.order_date)?;
        let version = config.version();

        if let Some(cached) = cached {
            if cached.config_version == version && cached.base_amount == collaboration.quoted_amount
            {
                debug!("Reusing cached finance for collaboration {}", collaboration.id);
                return Ok(cached.clone());
            }
            warn!(
                "Discarding stale cached finance for collaboration {} (cached {} on {}, current {} on {})",
                collaboration.id,
                cached.config_version,
                cached.base_amount,
                version,
                collaboration.quoted_amount
            );
        }

        let calculation = CoefficientCalculator::new(config).calculate(collaboration.quoted_amount)?;

        Ok(FinanceResult {
            revenue: calculation.final_amount,
            coefficient: calculation.coefficient,
            breakdown: calculation.breakdown,
            config_version: version,
            base_amount: collaboration.quoted_amount,
        })
    }

    /// Evaluates every collaboration, isolating failures per record.
    pub fn evaluate_all(&self, collaborations: &[Collaboration]) -> BatchEvaluation {
        let mut batch = BatchEvaluation::default();

        for collaboration in collaborations {
            match self.evaluate(collaboration) {
                Ok(result) => batch.results.push((collaboration.id.clone(), result)),
                Err(e) => {
                    warn!("Finance undefined for collaboration {}: {}", collaboration.id, e);
                    batch.failures.push(EvaluationFailure {
                        collaboration_id: collaboration.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        batch
    }
}

pub fn evaluate(collaboration: &Collaboration, resolver: &ConfigResolver) -> Result<FinanceResult> {
    CollaborationFinanceEvaluator::new(resolver).evaluate(collaboration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SettlementError;
    use crate::schema::{
        CollaborationStatus, FeeConfig, Platform, ServiceFeeBase, TaxCalculationBase,
    };
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config(discount_rate: f64, valid_from: NaiveDate, valid_to: Option<NaiveDate>) -> FeeConfig {
        FeeConfig {
            platform: Platform::Xiaohongshu,
            discount_rate,
            platform_fee_rate: 0.1,
            service_fee_rate: 0.0,
            includes_platform_fee: true,
            service_fee_base: ServiceFeeBase::AfterDiscount,
            includes_tax: true,
            tax_calculation_base: TaxCalculationBase::ExcludeServiceFee,
            tax_rate: 0.06,
            valid_from,
            valid_to,
        }
    }

    fn resolver() -> ConfigResolver {
        ConfigResolver::new(vec![
            config(0.8, date(2024, 1, 1), Some(date(2024, 6, 30))),
            config(0.5, date(2024, 7, 1), None),
        ])
        .unwrap()
    }

    fn collaboration(id: &str, platform: Platform, order_date: NaiveDate) -> Collaboration {
        Collaboration {
            id: id.to_string(),
            talent_name: Some("Talent".to_string()),
            platform,
            quoted_amount: 200_000,
            status: CollaborationStatus::Scheduled,
            order_date,
            daily_stats: vec![],
            cached_finance: None,
        }
    }

    #[test]
    fn test_evaluate_uses_order_date_config() {
        let resolver = resolver();

        let early = evaluate(&collaboration("a", Platform::Xiaohongshu, date(2024, 3, 1)), &resolver)
            .unwrap();
        assert!((early.revenue - 176_000.0).abs() < 1e-6);
        assert_eq!(early.config_version.valid_from, date(2024, 1, 1));

        let late = evaluate(&collaboration("b", Platform::Xiaohongshu, date(2024, 7, 1)), &resolver)
            .unwrap();
        assert!((late.revenue - 110_000.0).abs() < 1e-6);
        assert!((late.coefficient.unwrap() - 0.55).abs() < 1e-12);
        assert_eq!(late.base_amount, 200_000);
    }

    #[test]
    fn test_missing_config_is_an_error_not_zero() {
        let resolver = resolver();
        let result = evaluate(&collaboration("x", Platform::Douyin, date(2024, 3, 1)), &resolver);
        assert!(matches!(result, Err(SettlementError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_current_cache_is_reused() {
        let resolver = resolver();
        let evaluator = CollaborationFinanceEvaluator::new(&resolver);
        let collab = collaboration("a", Platform::Xiaohongshu, date(2024, 3, 1));

        let mut cached = evaluator.evaluate(&collab).unwrap();
        // Marker value to prove the cache was returned verbatim.
        cached.revenue = 1.0;

        let result = evaluator.evaluate_with_cache(&collab, Some(&cached)).unwrap();
        assert_eq!(result.revenue, 1.0);
    }

    #[test]
    fn test_stale_cache_is_recomputed() {
        let resolver = resolver();
        let evaluator = CollaborationFinanceEvaluator::new(&resolver);
        let mut collab = collaboration("a", Platform::Xiaohongshu, date(2024, 3, 1));

        let cached = evaluator.evaluate(&collab).unwrap();

        // Price changed after caching.
        collab.quoted_amount = 100_000;
        let result = evaluator.evaluate_with_cache(&collab, Some(&cached)).unwrap();
        assert!((result.revenue - 88_000.0).abs() < 1e-6);

        // Order moved into a newer configuration version.
        collab.quoted_amount = 200_000;
        collab.order_date = date(2024, 8, 1);
        let result = evaluator.evaluate_with_cache(&collab, Some(&cached)).unwrap();
        assert!((result.revenue - 110_000.0).abs() < 1e-6);
        assert_eq!(result.config_version.valid_from, date(2024, 7, 1));
    }

    #[test]
    fn test_cache_cannot_mask_missing_config() {
        let resolver = resolver();
        let evaluator = CollaborationFinanceEvaluator::new(&resolver);
        let collab = collaboration("a", Platform::Xiaohongshu, date(2024, 3, 1));
        let cached = evaluator.evaluate(&collab).unwrap();

        let mut moved = collab.clone();
        moved.order_date = date(2023, 6, 1);
        assert!(evaluator.evaluate_with_cache(&moved, Some(&cached)).is_err());
    }

    #[test]
    fn test_evaluate_all_isolates_failures() {
        let resolver = resolver();
        let evaluator = CollaborationFinanceEvaluator::new(&resolver);
        let collaborations = vec![
            collaboration("ok-1", Platform::Xiaohongshu, date(2024, 2, 1)),
            collaboration("missing", Platform::Weibo, date(2024, 2, 1)),
            collaboration("ok-2", Platform::Xiaohongshu, date(2024, 9, 1)),
        ];

        let batch = evaluator.evaluate_all(&collaborations);
        assert_eq!(batch.results.len(), 2);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].collaboration_id, "missing");
        assert!(batch.failures[0].reason.contains("weibo"));
    }
}
