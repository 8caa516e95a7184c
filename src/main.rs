use clap::Parser;
use quack::cli::Cli;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(cli.tracing_level().into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if quack::cli::run(&cli) {
        std::process::ExitCode::SUCCESS
    } else {
        std::process::ExitCode::FAILURE
    }
}
