use clap::Parser;
use gmail_tidy::cli::Cli;
use gmail_tidy::output::Output;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let output = Output::new(cli.json);
    init_tracing(cli.verbose, &output);

    if let Err(err) = gmail_tidy::run(cli, output).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise each `-v` raises this crate's level by one.
fn init_tracing(verbose: u8, output: &Output) {
    let default_directives = match verbose {
        0 => "gmail_tidy=info,warn",
        1 => "gmail_tidy=debug,info",
        _ => "gmail_tidy=trace,debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(output.progress().log_writer())
        .with_target(false)
        .init();
}
