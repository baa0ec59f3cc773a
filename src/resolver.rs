use crate::error::{Result, SettlementError};
use crate::schema::{FeeConfig, Platform};
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

/// Time-versioned fee configurations, validated so that at most one version
/// per platform covers any given date.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    configs: BTreeMap<Platform, Vec<FeeConfig>>,
}

impl ConfigResolver {
    pub fn new(configs: Vec<FeeConfig>) -> Result<Self> {
        let mut by_platform: BTreeMap<Platform, Vec<FeeConfig>> = BTreeMap::new();

        for config in configs {
            config.validate()?;
            by_platform.entry(config.platform).or_default().push(config);
        }

        for versions in by_platform.values_mut() {
            versions.sort_by_key(|c| c.valid_from);
            validate_non_overlapping(versions)?;
        }

        debug!(
            "Loaded fee configurations for {} platforms ({} versions)",
            by_platform.len(),
            by_platform.values().map(Vec::len).sum::<usize>()
        );

        Ok(Self {
            configs: by_platform,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let configs: Vec<FeeConfig> = serde_json::from_str(json)?;
        Self::new(configs)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn resolve(&self, platform: Platform, as_of: NaiveDate) -> Result<&FeeConfig> {
        let versions = self
            .configs
            .get(&platform)
            .map(Vec::as_slice)
            .unwrap_or_default();
        resolve_config(versions, platform, as_of)
    }

    /// Parses a platform key before resolving, for callers holding raw identifiers.
    pub fn resolve_key(&self, platform_key: &str, as_of: NaiveDate) -> Result<&FeeConfig> {
        let platform = platform_key.parse::<Platform>()?;
        self.resolve(platform, as_of)
    }

    pub fn versions(&self, platform: Platform) -> &[FeeConfig] {
        self.configs
            .get(&platform)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.configs.keys().copied()
    }
}

/// Selects the single version of `platform` whose inclusive window covers `as_of`.
pub fn resolve_config(
    configs: &[FeeConfig],
    platform: Platform,
    as_of: NaiveDate,
) -> Result<&FeeConfig> {
    let matches: Vec<&FeeConfig> = configs
        .iter()
        .filter(|c| c.platform == platform && c.covers(as_of))
        .collect();

    match matches.as_slice() {
        [config] => {
            debug!("Resolved {} on {} to version {}", platform, as_of, config.version());
            Ok(config)
        }
        [] => Err(SettlementError::ConfigNotFound {
            platform: platform.to_string(),
            date: as_of,
        }),
        _ => Err(SettlementError::AmbiguousConfig {
            platform: platform.to_string(),
            date: as_of,
            count: matches.len(),
        }),
    }
}

// Expects `versions` sorted by valid_from and belonging to one platform.
fn validate_non_overlapping(versions: &[FeeConfig]) -> Result<()> {
    for pair in versions.windows(2) {
        let (earlier, later) = (&pair[0], &pair[1]);
        let overlaps = match earlier.valid_to {
            None => true,
            Some(end) => end >= later.valid_from,
        };

        if overlaps {
            return Err(SettlementError::OverlappingConfigs {
                platform: earlier.platform.to_string(),
                first: earlier.valid_from,
                second: later.valid_from,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ServiceFeeBase, TaxCalculationBase};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn version(
        platform: Platform,
        discount_rate: f64,
        valid_from: NaiveDate,
        valid_to: Option<NaiveDate>,
    ) -> FeeConfig {
        FeeConfig {
            platform,
            discount_rate,
            platform_fee_rate: 0.05,
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

    fn half_year_resolver() -> ConfigResolver {
        ConfigResolver::new(vec![
            version(
                Platform::Douyin,
                0.9,
                date(2024, 6, 1),
                Some(date(2024, 11, 30)),
            ),
            version(
                Platform::Douyin,
                0.8,
                date(2024, 1, 1),
                Some(date(2024, 5, 31)),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_boundary_date_selects_later_version() {
        let resolver = half_year_resolver();

        let config = resolver.resolve(Platform::Douyin, date(2024, 6, 1)).unwrap();
        assert_eq!(config.discount_rate, 0.9);

        let config = resolver.resolve(Platform::Douyin, date(2024, 5, 31)).unwrap();
        assert_eq!(config.discount_rate, 0.8);
    }

    #[test]
    fn test_date_outside_all_windows_is_not_found() {
        let resolver = half_year_resolver();

        for as_of in [date(2023, 12, 31), date(2024, 12, 1)] {
            match resolver.resolve(Platform::Douyin, as_of) {
                Err(SettlementError::ConfigNotFound { platform, date }) => {
                    assert_eq!(platform, "douyin");
                    assert_eq!(date, as_of);
                }
                other => panic!("expected ConfigNotFound, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_platform_without_configs_is_not_found() {
        let resolver = half_year_resolver();
        assert!(matches!(
            resolver.resolve(Platform::Weibo, date(2024, 3, 1)),
            Err(SettlementError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn test_open_ended_version() {
        let resolver = ConfigResolver::new(vec![
            version(Platform::Bilibili, 0.8, date(2023, 1, 1), Some(date(2023, 12, 31))),
            version(Platform::Bilibili, 0.85, date(2024, 1, 1), None),
        ])
        .unwrap();

        let config = resolver.resolve(Platform::Bilibili, date(2031, 7, 4)).unwrap();
        assert_eq!(config.discount_rate, 0.85);
    }

    #[test]
    fn test_overlapping_versions_are_rejected() {
        let result = ConfigResolver::new(vec![
            version(Platform::Douyin, 0.8, date(2024, 1, 1), Some(date(2024, 6, 1))),
            version(Platform::Douyin, 0.9, date(2024, 6, 1), None),
        ]);
        assert!(matches!(
            result,
            Err(SettlementError::OverlappingConfigs { .. })
        ));

        let result = ConfigResolver::new(vec![
            version(Platform::Douyin, 0.8, date(2024, 1, 1), None),
            version(Platform::Douyin, 0.9, date(2025, 1, 1), None),
        ]);
        assert!(matches!(
            result,
            Err(SettlementError::OverlappingConfigs { .. })
        ));
    }

    #[test]
    fn test_same_window_on_different_platforms_is_allowed() {
        let resolver = ConfigResolver::new(vec![
            version(Platform::Douyin, 0.8, date(2024, 1, 1), None),
            version(Platform::Kuaishou, 0.75, date(2024, 1, 1), None),
        ])
        .unwrap();

        assert_eq!(resolver.platforms().count(), 2);
        assert_eq!(
            resolver
                .resolve(Platform::Kuaishou, date(2024, 2, 1))
                .unwrap()
                .discount_rate,
            0.75
        );
    }

    #[test]
    fn test_invalid_rate_rejects_whole_set() {
        let mut bad = version(Platform::Weibo, 0.8, date(2024, 1, 1), None);
        bad.platform_fee_rate = -0.05;

        let result = ConfigResolver::new(vec![
            version(Platform::Douyin, 0.8, date(2024, 1, 1), None),
            bad,
        ]);
        assert!(matches!(result, Err(SettlementError::InvalidRate { .. })));
    }

    #[test]
    fn test_resolve_config_reports_ambiguity() {
        let configs = vec![
            version(Platform::Douyin, 0.8, date(2024, 1, 1), None),
            version(Platform::Douyin, 0.9, date(2024, 3, 1), None),
        ];

        match resolve_config(&configs, Platform::Douyin, date(2024, 4, 1)) {
            Err(SettlementError::AmbiguousConfig { count, .. }) => assert_eq!(count, 2),
            other => panic!("expected AmbiguousConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_key_and_json_loading() {
        let json = r#"[
            {
                "platform": "kuaishou",
                "discountRate": 0.75,
                "platformFeeRate": 0.05,
                "serviceFeeRate": 0.02,
                "includesPlatformFee": false,
                "serviceFeeBase": "afterDiscount",
                "includesTax": false,
                "taxCalculationBase": "includeServiceFee",
                "validFrom": "2024-01-01",
                "validTo": "2024-12-31"
            }
        ]"#;

        let resolver = ConfigResolver::from_json_str(json).unwrap();
        let config = resolver.resolve_key("Kuaishou", date(2024, 8, 8)).unwrap();
        assert_eq!(config.service_fee_rate, 0.02);

        assert!(matches!(
            resolver.resolve_key("tiktok", date(2024, 8, 8)),
            Err(SettlementError::UnknownPlatform(_))
        ));
        assert!(matches!(
            ConfigResolver::from_json_str("not json"),
            Err(SettlementError::SerializationError(_))
        ));
    }
}
