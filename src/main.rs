use clap::Parser;
use news_analyst::cli::{Cli, Session};
use news_analyst::config::Settings;
use news_analyst::error::Error;
use news_analyst::pipeline::build_pipeline;
use std::process::ExitCode;
use tokio::io::{BufReader, stdin, stdout};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_analyst starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.output_dir, ?args.topic, ?args.preset, "Parsed CLI arguments");

    let mut settings = match Settings::load(args.config.as_deref()).await {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Failed to load settings");
            return ExitCode::FAILURE;
        }
    };
    args.apply_to(&mut settings);

    let pipeline = match build_pipeline(&settings, args.openai_api_key.clone()) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(error = %e, "Failed to build pipeline");
            return ExitCode::FAILURE;
        }
    };

    let code = match &args.topic {
        Some(topic) => match pipeline.run(topic, args.limits()).await {
            Ok(report) => {
                println!("{}", report.outcome);
                ExitCode::SUCCESS
            }
            Err(e @ Error::Render(_)) => {
                error!(%topic, error = %e, "Run failed");
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
            Err(e) => {
                warn!(%topic, error = %e, "Run ended with an error");
                eprintln!("Error: {e}");
                ExitCode::SUCCESS
            }
        },
        None => {
            let mut session = Session::new(BufReader::new(stdin()), stdout());
            match session.run(&pipeline).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!(error = %e, "Interactive session failed");
                    ExitCode::FAILURE
                }
            }
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        elapsed_secs = elapsed.as_secs_f64(),
        elapsed_human = %format!("{:.2?}", elapsed),
        "Execution complete"
    );
    code
}
