use chrono::NaiveDate;
use settlement_coefficient::{
    aggregate, coefficient_table, format_coefficient, format_major_units, Collaboration,
    CollaborationFinanceEvaluator, CollaborationStatus, ConfigResolver, DailyStat, FeeConfig,
    Platform, ServiceFeeBase, TaxCalculationBase,
};

fn main() {
    let configs = vec![
        FeeConfig {
            platform: Platform::Douyin,
            discount_rate: 0.7,
            platform_fee_rate: 0.05,
            service_fee_rate: 0.03,
            includes_platform_fee: true,
            service_fee_base: ServiceFeeBase::AfterDiscount,
            includes_tax: false,
            tax_calculation_base: TaxCalculationBase::IncludeServiceFee,
            tax_rate: 0.06,
            valid_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            valid_to: None,
        },
        FeeConfig {
            platform: Platform::Xiaohongshu,
            discount_rate: 0.85,
            platform_fee_rate: 0.1,
            service_fee_rate: 0.0,
            includes_platform_fee: false,
            service_fee_base: ServiceFeeBase::BeforeDiscount,
            includes_tax: true,
            tax_calculation_base: TaxCalculationBase::ExcludeServiceFee,
            tax_rate: 0.06,
            valid_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            valid_to: None,
        },
    ];

    let resolver = ConfigResolver::new(configs).expect("valid configuration set");

    let snapshot = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap();
    let collaborations = vec![
        Collaboration {
            id: "order-001".to_string(),
            talent_name: Some("Talent A".to_string()),
            platform: Platform::Douyin,
            quoted_amount: 5_000_000,
            status: CollaborationStatus::Published,
            order_date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            daily_stats: vec![DailyStat {
                date: snapshot,
                total_views: 1_250_000,
                likes: 42_000,
                comments: 3_100,
                shares: 900,
            }],
            cached_finance: None,
        },
        Collaboration {
            id: "order-002".to_string(),
            talent_name: Some("Talent B".to_string()),
            platform: Platform::Xiaohongshu,
            quoted_amount: 1_800_000,
            status: CollaborationStatus::Scheduled,
            order_date: NaiveDate::from_ymd_opt(2024, 9, 10).unwrap(),
            daily_stats: vec![],
            cached_finance: None,
        },
        Collaboration {
            id: "order-003".to_string(),
            talent_name: Some("Talent C".to_string()),
            platform: Platform::Weibo,
            quoted_amount: 900_000,
            status: CollaborationStatus::Published,
            order_date: NaiveDate::from_ymd_opt(2024, 9, 12).unwrap(),
            daily_stats: vec![],
            cached_finance: None,
        },
    ];

    println!("Platform coefficients on {}:", snapshot);
    for (platform, coefficient) in coefficient_table(&resolver, snapshot) {
        println!(
            "  {:<16} {}",
            platform,
            format_coefficient(coefficient.ok())
        );
    }

    println!("\nCollaborations:");
    let evaluator = CollaborationFinanceEvaluator::new(&resolver);
    for collaboration in &collaborations {
        let finance = evaluator.evaluate(collaboration).ok();
        println!(
            "  {:<10} list {:>12}  settlement {:>12}  coefficient {}",
            collaboration.id,
            format_major_units(Some(collaboration.quoted_amount as f64)),
            format_major_units(finance.as_ref().map(|f| f.revenue)),
            format_coefficient(finance.as_ref().and_then(|f| f.coefficient)),
        );
    }

    let stats = aggregate(&collaborations, &resolver);
    println!("\nProject statistics:");
    println!("  Total amount:    {}", format_major_units(Some(stats.total_amount)));
    println!("  Entered amount:  {}", format_major_units(Some(stats.entered_amount)));
    println!("  Total views:     {}", stats.total_views);
    println!("  Average CPM:     {:.2}", stats.avg_cpm);
    println!("  Entry progress:  {:.2}%", stats.entry_progress);
    for failure in &stats.failures {
        println!("  Undefined: {} ({})", failure.collaboration_id, failure.reason);
    }
}
