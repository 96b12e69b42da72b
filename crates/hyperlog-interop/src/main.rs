use std::process::ExitCode;

use clap::Parser;
use hyperlog_interop::{Cli, Command, Step, StepOutcome, run_all, run_step};
use hyperlog_logging::{LogSubscriberBuilder, LoggingConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logging = LogSubscriberBuilder::new();
    if cli.pretty {
        logging = logging.with_config(LoggingConfig::development());
    }
    let _guard = logging.with_level(&cli.log_level).init();

    match execute(cli.command).await {
        Ok(outcomes) => {
            for outcome in outcomes {
                match serde_json::to_string(&outcome) {
                    Ok(line) => println!("{line}"),
                    Err(e) => {
                        eprintln!("Error: failed to encode outcome: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Command) -> anyhow::Result<Vec<StepOutcome>> {
    let (step, dir) = match command {
        Command::Step1 { dir } => (Step::One, dir),
        Command::Step2 { dir } => (Step::Two, dir),
        Command::Step3 { dir } => (Step::Three, dir),
        Command::Run { dir } => return run_all(&dir).await,
    };
    Ok(vec![run_step(step, &dir).await?])
}
