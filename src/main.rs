use stress_test::{stress_test_contention, stress_test_editing, stress_test_scaling};
use tracing_subscriber::EnvFilter;
pub mod stress_test;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async_main());
    Ok(())
}

async fn async_main() {
    tracing::info!(started = %chrono::Local::now().to_rfc3339(), "stress run starting");

    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            ASYNC EDITING STRESS TESTS                       ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    // Test 1: few writers, short runs
    let stats = stress_test_editing(4, 100).await;
    stats.print();

    // Test 2: more writers, longer runs
    let stats = stress_test_editing(16, 250).await;
    stats.print();

    // Test 3: writers outwaiting a short lock timeout
    let stats = stress_test_contention(12).await;
    stats.print();

    // Test 4: scaling analysis
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║          SCALING ANALYSIS (Editor batches)                  ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    stress_test_scaling(16, 4).await;

    tracing::info!(finished = %chrono::Local::now().to_rfc3339(), "stress run finished");
    println!("\n✓ All stress tests completed successfully!");
}
