/// dashboard - ingest a document-store snapshot and build the charts
use lending_engine_rs::chrono::{Duration, TimeZone, Utc};
use lending_engine_rs::{EngineConfig, LendingEngine, SafeTimeProvider, TimeSource};

const SNAPSHOT: &str = r#"{
    "req-101": { "principalAmount": 2500, "interestRate": 6, "termWeeks": 26,
                 "lenderId": "me", "borrowerId": "sam",
                 "startDate": "2024-01-01T00:00:00Z",
                 "paymentsMade": [ { "weekNumber": 1, "amount": 97.42 }, { "weekNumber": 2, "amount": 97.42 } ] },
    "req-102": { "principalAmount": "1200", "interestRate": "0", "termWeeks": "12",
                 "lenderId": "kim", "borrowerId": "me",
                 "startDate": { "seconds": 1704067200, "nanoseconds": 0 } },
    "req-103": { "principalAmount": null, "interestRate": 4, "termWeeks": 10,
                 "lenderId": "me", "borrowerId": "lee" }
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let mut engine = LendingEngine::new(EngineConfig::dashboard())?;
    let ingest = engine.ingest(SNAPSHOT, Some("me"))?;
    println!("accepted {} loans, quarantined {}", ingest.loans.len(), ingest.quarantined.len());
    for record in &ingest.quarantined {
        println!("  quarantined #{} ({:?}): {}", record.index, record.loan_id, record.reason);
    }

    let summary = engine.summary(&ingest.loans)?;
    println!("\n=== summary ===\n{}", summary.to_json_pretty()?);

    println!("\n=== weekly cash flow ===");
    for point in engine.weekly_series(&ingest.loans)? {
        println!(
            "week {:>2}: in {:>8} out {:>8} net {:>8}",
            point.week, point.projected_incoming, point.projected_payouts, point.net
        );
    }

    println!("\n=== cumulative ===");
    if let Some(last) = engine.cumulative_series(&ingest.loans)?.last() {
        println!(
            "through week {}: in {} out {} net {}",
            last.week, last.cumulative_incoming, last.cumulative_payouts, last.cumulative_net
        );
    }

    // five weeks on, who is behind?
    controller.advance(Duration::weeks(5));
    println!("\n=== progress ===");
    for loan in &ingest.loans {
        let progress = engine.progress(loan, &time)?;
        println!(
            "{}: {} weeks elapsed, missed {:?}, next due week {:?}",
            loan.id, progress.weeks_elapsed, progress.missed_weeks, progress.next_due_week
        );
    }

    for warning in engine.take_warnings() {
        println!("warning: {}", serde_json::to_string(&warning)?);
    }

    Ok(())
}
