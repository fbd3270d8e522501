use anyhow::{Context, Result};
use team_probe::{run_probe, HostBackend, ProbeConfig};
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

const REPORT_ENV: &str = "TEAM_PROBE_REPORT";

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;

    let config = ProbeConfig::from_env().context("failed to load probe configuration")?;
    let report = match run_probe(&config, &HostBackend::new()).await {
        Ok(report) => report,
        Err(e) => {
            if e.is_correctness_failure() {
                error!("Correctness defect detected ({}): {}", e.category(), e);
            } else {
                error!("Probe could not run ({}): {}", e.category(), e);
            }
            return Err(e).context("team probe failed");
        }
    };

    match std::env::var(REPORT_ENV).as_deref() {
        Ok("json") => println!("{}", report.to_json()?),
        _ => println!("PASS"),
    }
    Ok(())
}
