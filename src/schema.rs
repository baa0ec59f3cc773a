use crate::error::{Result, SettlementError};
use crate::evaluator::FinanceResult;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_TAX_RATE: f64 = 0.06;

fn default_tax_rate() -> f64 {
    DEFAULT_TAX_RATE
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[schemars(description = "Douyin (抖音) short-video platform")]
    Douyin,

    #[schemars(description = "Xiaohongshu (小红书) lifestyle notes platform")]
    Xiaohongshu,

    #[schemars(description = "Kuaishou (快手) short-video platform")]
    Kuaishou,

    #[schemars(description = "Bilibili (B站) video community")]
    Bilibili,

    #[schemars(description = "Weibo (微博) microblogging platform")]
    Weibo,

    #[schemars(description = "WeChat Channels (视频号)")]
    WechatChannels,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Douyin,
        Platform::Xiaohongshu,
        Platform::Kuaishou,
        Platform::Bilibili,
        Platform::Weibo,
        Platform::WechatChannels,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Platform::Douyin => "douyin",
            Platform::Xiaohongshu => "xiaohongshu",
            Platform::Kuaishou => "kuaishou",
            Platform::Bilibili => "bilibili",
            Platform::Weibo => "weibo",
            Platform::WechatChannels => "wechat_channels",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Platform {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase();
        Platform::ALL
            .iter()
            .copied()
            .find(|p| p.key() == key)
            .ok_or_else(|| SettlementError::UnknownPlatform(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ServiceFeeBase {
    #[schemars(description = "Service fee is charged on list price plus platform fee, before any discount")]
    BeforeDiscount,

    #[schemars(description = "Service fee is charged on the discounted amount")]
    AfterDiscount,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum TaxCalculationBase {
    #[schemars(description = "Tax is computed on the discounted amount alone")]
    ExcludeServiceFee,

    #[schemars(description = "Tax is computed on the discounted amount plus the service fee")]
    IncludeServiceFee,
}

/// Identifies one immutable version of a platform's fee configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ConfigVersion {
    pub platform: Platform,
    pub valid_from: NaiveDate,
}

impl fmt::Display for ConfigVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.platform, self.valid_from)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeeConfig {
    #[schemars(description = "Platform this configuration version applies to")]
    pub platform: Platform,

    #[schemars(description = "Negotiated discount as a fraction of the price it applies to (0.7 means pay 70%)")]
    pub discount_rate: f64,

    #[schemars(description = "Platform surcharge as a fraction of list price, charged on top of list price")]
    pub platform_fee_rate: f64,

    #[schemars(description = "Agency service fee rate. 0 means no service fee.")]
    pub service_fee_rate: f64,

    #[schemars(
        description = "If true the discount applies to list price plus platform fee. If false the discount applies to list price only and the platform fee is added undiscounted."
    )]
    pub includes_platform_fee: bool,

    #[schemars(description = "Which intermediate amount the service fee rate is applied to")]
    pub service_fee_base: ServiceFeeBase,

    #[schemars(description = "Whether the discounted price already embeds value-added tax")]
    pub includes_tax: bool,

    #[schemars(description = "Whether tax is computed with or without the service fee")]
    pub tax_calculation_base: TaxCalculationBase,

    #[serde(default = "default_tax_rate")]
    #[schemars(description = "Value-added tax rate. Defaults to 0.06.")]
    pub tax_rate: f64,

    #[schemars(description = "First day (inclusive) this version applies, YYYY-MM-DD")]
    pub valid_from: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Last day (inclusive) this version applies, YYYY-MM-DD. Absent means open-ended.")]
    pub valid_to: Option<NaiveDate>,
}

impl FeeConfig {
    pub fn version(&self) -> ConfigVersion {
        ConfigVersion {
            platform: self.platform,
            valid_from: self.valid_from,
        }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && self.valid_to.map_or(true, |end| date <= end)
    }

    /// Checks every rate is a finite fraction in [0, 1] and the validity window is ordered.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("discountRate", self.discount_rate),
            ("platformFeeRate", self.platform_fee_rate),
            ("serviceFeeRate", self.service_fee_rate),
            ("taxRate", self.tax_rate),
        ];

        for (field, value) in rates {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(SettlementError::InvalidRate {
                    platform: self.platform.to_string(),
                    field,
                    value,
                });
            }
        }

        if let Some(valid_to) = self.valid_to {
            if valid_to < self.valid_from {
                return Err(SettlementError::InvalidDateRange {
                    platform: self.platform.to_string(),
                    valid_from: self.valid_from,
                    valid_to,
                });
            }
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Vec<FeeConfig>)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationStatus {
    Pending,
    Confirmed,
    Scheduled,
    Published,
    Cancelled,
}

impl FromStr for CollaborationStatus {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "scheduled" => Ok(Self::Scheduled),
            "published" => Ok(Self::Published),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(SettlementError::UnknownStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub date: NaiveDate,
    pub total_views: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub shares: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaboration {
    pub id: String,
    #[serde(default)]
    pub talent_name: Option<String>,
    pub platform: Platform,
    /// List price in minor units (cents).
    pub quoted_amount: u64,
    pub status: CollaborationStatus,
    /// The date the quoted price was locked; fee configuration is resolved against this date.
    pub order_date: NaiveDate,
    #[serde(default)]
    pub daily_stats: Vec<DailyStat>,
    /// Previously computed finance, only consulted when the caller opts into caching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_finance: Option<FinanceResult>,
}

impl Collaboration {
    /// Appends a stat, replacing any existing entry for the same date.
    pub fn record_daily_stat(&mut self, stat: DailyStat) {
        self.daily_stats.retain(|s| s.date != stat.date);
        self.daily_stats.push(stat);
    }

    /// The last-written stat for `date`.
    pub fn stat_on(&self, date: NaiveDate) -> Option<&DailyStat> {
        self.daily_stats.iter().rev().find(|s| s.date == date)
    }

    pub fn latest_stat_date(&self) -> Option<NaiveDate> {
        self.daily_stats.iter().map(|s| s.date).max()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub collaborations: Vec<Collaboration>,
}
