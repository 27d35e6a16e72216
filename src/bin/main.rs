use financial_bodyguard::gemini::GeminiClient;
use financial_bodyguard::patterns::TrajectoryLibrary;
use financial_bodyguard::Orchestrator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("Financial Bodyguard starting");

    let trajectory_path = std::env::var("FRAUD_TRAJECTORIES_PATH").ok().map(PathBuf::from);
    let trajectories = TrajectoryLibrary::load_or_default(trajectory_path.as_deref());

    let mut orchestrator = Orchestrator::with_trajectories(trajectories);
    if let Some(gemini) = GeminiClient::from_env() {
        info!("Gemini enrichment enabled");
        orchestrator = orchestrator.with_gemini(Arc::new(gemini));
    }

    let samples: [(&str, Option<u32>); 3] = [
        (
            "Congratulations! You have won Rs 50,000. Just accept the UPI collect request to receive your prize. Hurry!",
            Some(67),
        ),
        (
            "This is CBI calling. A warrant is issued for your arrest. Stay on this video call, do not disconnect, and pay the fine now.",
            Some(42),
        ),
        (
            "Loan offer: floating interest at 18% p.a., foreclosure charge of 4%, processing fee of Rs 5,999 on your emi plan.",
            None,
        ),
    ];

    for (content, age) in samples {
        let verdict = orchestrator.analyze_async(content, age).await?;

        println!("\n=== ANALYSIS ===");
        println!("Content:      {}", content);
        println!("Threat level: {} (risk {:.2})", verdict.threat_level, verdict.risk_score);
        if let Some(primary) = &verdict.primary_threat {
            println!("Primary:      {}", primary);
        }
        if let Some(trajectory) = &verdict.matched_trajectory {
            println!("Trajectory:   {}", trajectory.name);
        }
        println!("Summary:      {}", verdict.summary);
        println!("Hindi:        {}", verdict.hindi_summary);
        println!("Actions:");
        for (i, rec) in verdict.recommendations.iter().enumerate() {
            println!("  {}: {}", i + 1, rec);
        }
        if verdict.emergency_action {
            println!("EMERGENCY: block and report now (helpline 1930)");
        }
    }

    let stats = orchestrator.stats();
    println!(
        "\nAnalyses: {} | Threats: {} | Critical: {}",
        stats.total_analyses, stats.threats_detected, stats.critical_blocks
    );

    Ok(())
}
