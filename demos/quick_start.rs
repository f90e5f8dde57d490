/// quick start - price a weekly loan and inspect it
use lending_engine_rs::calculator::LoanMetrics;
use lending_engine_rs::{weekly_installment, Loan, Money, Rate};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // what would $5,000 at 5% over a year cost each week?
    let installment = weekly_installment(Money::from_major(5_000), Rate::from_percentage(5), 52)?;
    println!("weekly installment: {}", installment);

    // a loan we made, with the first two weeks paid
    let loan = Loan::builder()
        .id("quick-start")
        .principal(Money::from_major(5_000))
        .rate(Rate::from_percentage(5))
        .term_weeks(52)
        .owned()
        .payment(1, installment)
        .payment(2, installment)
        .build()?;

    let metrics = LoanMetrics::compute(&loan)?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    Ok(())
}
