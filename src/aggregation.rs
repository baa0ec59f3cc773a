use crate::error::{Result, SettlementError};
use crate::evaluator::{CollaborationFinanceEvaluator, EvaluationFailure, FinanceResult};
use crate::resolver::ConfigResolver;
use crate::schema::{Collaboration, CollaborationStatus, Project};
use crate::utils::{cpm, percentage};
use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct AggregationOptions {
    /// Statuses that count toward finance figures.
    pub valid_statuses: BTreeSet<CollaborationStatus>,
    /// Consult each record's `cached_finance` (subject to the evaluator's staleness checks).
    pub use_cached: bool,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            valid_statuses: [CollaborationStatus::Scheduled, CollaborationStatus::Published]
                .into_iter()
                .collect(),
            use_cached: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatistics {
    /// Revenue of every finance-valid collaboration, minor units.
    pub total_amount: f64,
    /// Revenue of the collaborations with data on `latest_data_date`, minor units.
    pub entered_amount: f64,
    /// Views recorded on `latest_data_date` by the entered collaborations.
    pub total_views: u64,
    /// Major units per thousand views, two decimals.
    #[serde(rename = "avgCPM")]
    pub avg_cpm: f64,
    pub latest_data_date: Option<NaiveDate>,
    pub valid_count: usize,
    pub entered_count: usize,
    /// Entered collaborations as a percentage of valid ones.
    pub entry_progress: f64,
    /// Entered amount as a percentage of total amount.
    pub amount_progress: f64,
    /// Valid collaborations whose finance is undefined; excluded from amounts and views.
    pub failures: Vec<EvaluationFailure>,
}

impl ProjectStatistics {
    /// Checks the invariants every aggregate must satisfy.
    pub fn verify(&self, tolerance: f64) -> Result<()> {
        if self.total_amount < 0.0 || self.entered_amount < 0.0 {
            return Err(SettlementError::ConsistencyViolation(format!(
                "negative amounts: total {} entered {}",
                self.total_amount, self.entered_amount
            )));
        }

        if self.entered_amount - self.total_amount > tolerance {
            return Err(SettlementError::ConsistencyViolation(format!(
                "entered amount {} exceeds total amount {}",
                self.entered_amount, self.total_amount
            )));
        }

        if self.entered_count > self.valid_count {
            return Err(SettlementError::ConsistencyViolation(format!(
                "entered count {} exceeds valid count {}",
                self.entered_count, self.valid_count
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioStatistics {
    pub total_amount: f64,
    /// Sum of each project's entered amount against that project's own latest data date,
    /// so it is not tied to the portfolio-wide `latest_data_date`.
    pub entered_amount: f64,
    /// Sum of each project's views on its own latest data date.
    pub total_views: u64,
    /// Recomputed from portfolio sums, never an average of project CPMs.
    #[serde(rename = "avgCPM")]
    pub avg_cpm: f64,
    pub latest_data_date: Option<NaiveDate>,
    pub valid_count: usize,
    pub entered_count: usize,
    pub entry_progress: f64,
    pub amount_progress: f64,
    pub projects: BTreeMap<String, ProjectStatistics>,
}

// Running totals for a single pass. Entered totals track the latest date seen so far
// and restart whenever a later date turns up.
#[derive(Default)]
struct Accumulator {
    total_amount: f64,
    entered_amount: f64,
    total_views: u64,
    latest_data_date: Option<NaiveDate>,
    valid_count: usize,
    entered_count: usize,
    failures: Vec<EvaluationFailure>,
}

impl Accumulator {
    fn add(&mut self, collaboration: &Collaboration, finance: Option<&FinanceResult>) {
        self.valid_count += 1;
        if let Some(finance) = finance {
            self.total_amount += finance.revenue;
        }

        let Some(own_latest) = collaboration.latest_stat_date() else {
            return;
        };

        match self.latest_data_date {
            Some(current) if own_latest < current => return,
            Some(current) if own_latest == current => {}
            _ => {
                self.latest_data_date = Some(own_latest);
                self.entered_amount = 0.0;
                self.total_views = 0;
                self.entered_count = 0;
            }
        }

        self.entered_count += 1;
        if let (Some(finance), Some(stat)) = (finance, collaboration.stat_on(own_latest)) {
            self.entered_amount += finance.revenue;
            self.total_views += stat.total_views;
        }
    }

    fn finish(self) -> ProjectStatistics {
        ProjectStatistics {
            total_amount: self.total_amount,
            entered_amount: self.entered_amount,
            total_views: self.total_views,
            avg_cpm: cpm(self.entered_amount, self.total_views),
            latest_data_date: self.latest_data_date,
            valid_count: self.valid_count,
            entered_count: self.entered_count,
            entry_progress: percentage(self.entered_count as f64, self.valid_count as f64),
            amount_progress: percentage(self.entered_amount, self.total_amount),
            failures: self.failures,
        }
    }
}

pub struct AggregationEngine<'a> {
    evaluator: CollaborationFinanceEvaluator<'a>,
    options: AggregationOptions,
}

impl<'a> AggregationEngine<'a> {
    pub fn new(resolver: &'a ConfigResolver) -> Self {
        Self::with_options(resolver, AggregationOptions::default())
    }

    pub fn with_options(resolver: &'a ConfigResolver, options: AggregationOptions) -> Self {
        Self {
            evaluator: CollaborationFinanceEvaluator::new(resolver),
            options,
        }
    }

    pub fn aggregate(&self, collaborations: &[Collaboration]) -> ProjectStatistics {
        let mut acc = Accumulator::default();

        for collaboration in collaborations
            .iter()
            .filter(|c| self.options.valid_statuses.contains(&c.status))
        {
            let cached = if self.options.use_cached {
                collaboration.cached_finance.as_ref()
            } else {
                None
            };

            match self.evaluator.evaluate_with_cache(collaboration, cached) {
                Ok(finance) => acc.add(collaboration, Some(&finance)),
                Err(e) => {
                    warn!("Finance undefined for collaboration {}: {}", collaboration.id, e);
                    acc.failures.push(EvaluationFailure {
                        collaboration_id: collaboration.id.clone(),
                        reason: e.to_string(),
                    });
                    acc.add(collaboration, None);
                }
            }
        }

        let stats = acc.finish();
        debug!(
            "Aggregated {} valid collaborations: total {}, entered {}, views {}, {} failures",
            stats.valid_count,
            stats.total_amount,
            stats.entered_amount,
            stats.total_views,
            stats.failures.len()
        );
        stats
    }

    pub fn aggregate_project(&self, project: &Project) -> ProjectStatistics {
        self.aggregate(&project.collaborations)
    }

    /// Fails with `DuplicateProject` when two projects share an id.
    pub fn aggregate_portfolio(&self, projects: &[Project]) -> Result<PortfolioStatistics> {
        let mut stats = BTreeMap::new();
        for project in projects {
            if stats.contains_key(&project.id) {
                return Err(SettlementError::DuplicateProject(project.id.clone()));
            }
            stats.insert(project.id.clone(), self.aggregate_project(project));
        }
        Ok(aggregate_portfolio(stats))
    }
}

pub fn aggregate(collaborations: &[Collaboration], resolver: &ConfigResolver) -> ProjectStatistics {
    AggregationEngine::new(resolver).aggregate(collaborations)
}

/// Rolls project statistics up into portfolio totals.
pub fn aggregate_portfolio(projects: BTreeMap<String, ProjectStatistics>) -> PortfolioStatistics {
    let mut portfolio = PortfolioStatistics::default();

    for stats in projects.values() {
        portfolio.total_amount += stats.total_amount;
        portfolio.entered_amount += stats.entered_amount;
        portfolio.total_views += stats.total_views;
        portfolio.valid_count += stats.valid_count;
        portfolio.entered_count += stats.entered_count;
        portfolio.latest_data_date = portfolio.latest_data_date.max(stats.latest_data_date);
    }

    portfolio.avg_cpm = cpm(portfolio.entered_amount, portfolio.total_views);
    portfolio.entry_progress =
        percentage(portfolio.entered_count as f64, portfolio.valid_count as f64);
    portfolio.amount_progress = percentage(portfolio.entered_amount, portfolio.total_amount);
    portfolio.projects = projects;
    portfolio
}
