//! # Settlement Coefficient
//!
//! A library for turning a talent's published list price (刊例价) into the amount
//! actually settled on a platform, and for rolling those settlements up into
//! project and portfolio statistics.
//!
//! ## Core Concepts
//!
//! - **Fee Configuration**: Per-platform, time-bounded rate versions (discount, platform fee,
//!   service fee, tax) with closed-enum policies for how each stage is based
//! - **Payment Coefficient**: Settlement amount divided by list price; a property of the
//!   configuration alone, reusable to project any future price
//! - **Collaboration**: A booked talent order with a quoted amount, status and daily view stats
//! - **Entered Amount**: Revenue of the collaborations whose data has been entered on the most
//!   recent snapshot day, used for progress and CPM
//! - **Minor Units**: Every amount is carried in cents; conversion to yuan happens only when
//!   rendering (see [`utils`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use settlement_coefficient::*;
//! use chrono::NaiveDate;
//!
//! let resolver = ConfigResolver::new(vec![FeeConfig {
//!     platform: Platform::Douyin,
//!     discount_rate: 0.7,
//!     platform_fee_rate: 0.05,
//!     service_fee_rate: 0.03,
//!     includes_platform_fee: true,
//!     service_fee_base: ServiceFeeBase::AfterDiscount,
//!     includes_tax: false,
//!     tax_calculation_base: TaxCalculationBase::IncludeServiceFee,
//!     tax_rate: 0.06,
//!     valid_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     valid_to: None,
//! }])
//! .unwrap();
//!
//! let config = resolver
//!     .resolve(Platform::Douyin, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
//!     .unwrap();
//! let result = calculate(100_000, config).unwrap();
//! assert_eq!(format_coefficient(result.coefficient), "0.8025");
//! ```

pub mod aggregation;
pub mod calculator;
pub mod error;
pub mod evaluator;
pub mod resolver;
pub mod schema;
pub mod utils;

pub use aggregation::{
    aggregate, aggregate_portfolio, AggregationEngine, AggregationOptions, PortfolioStatistics,
    ProjectStatistics,
};
pub use calculator::{
    calculate, coefficient_table, project_settlement, Calculation, CoefficientCalculator,
    FeeBreakdown,
};
pub use error::{Result, SettlementError};
pub use evaluator::{
    evaluate, BatchEvaluation, CollaborationFinanceEvaluator, EvaluationFailure, FinanceResult,
};
pub use resolver::{resolve_config, ConfigResolver};
pub use schema::*;
pub use utils::*;

use log::{debug, info};

pub struct SettlementProcessor;

impl SettlementProcessor {
    pub fn process(configs: Vec<FeeConfig>, projects: &[Project]) -> Result<PortfolioStatistics> {
        info!(
            "Processing settlement statistics for {} projects",
            projects.len()
        );
        debug!(
            "Configuration set contains {} fee configuration versions",
            configs.len()
        );

        let resolver = ConfigResolver::new(configs)?;
        let portfolio = AggregationEngine::new(&resolver).aggregate_portfolio(projects)?;

        let failures: usize = portfolio.projects.values().map(|p| p.failures.len()).sum();
        if failures > 0 {
            info!(
                "{} collaborations have undefined finance and were left out of the amounts",
                failures
            );
        }

        Ok(portfolio)
    }

    pub fn process_with_verification(
        configs: Vec<FeeConfig>,
        projects: &[Project],
        tolerance: f64,
    ) -> Result<PortfolioStatistics> {
        let portfolio = Self::process(configs, projects)?;

        for stats in portfolio.projects.values() {
            stats.verify(tolerance)?;
        }

        Ok(portfolio)
    }
}

pub fn process_project(configs: Vec<FeeConfig>, project: &Project) -> Result<ProjectStatistics> {
    let resolver = ConfigResolver::new(configs)?;
    Ok(AggregationEngine::new(&resolver).aggregate_project(project))
}

pub fn process_portfolio(
    configs: Vec<FeeConfig>,
    projects: &[Project],
) -> Result<PortfolioStatistics> {
    SettlementProcessor::process(configs, projects)
}
