use github_app_token_cli::{initialize_logging, parse_args, report_parse_error, run};
use tracing::debug;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version land here too, with exit code 0
            report_parse_error(&e, clap::Error::print, &mut std::io::stderr());
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = initialize_logging(&cli) {
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = run(cli, &mut stdout).await {
        let exit_code = e.exit_code();
        debug!(exit_code, error = ?e, "Token generation failed");
        eprintln!("{}", e);
        std::process::exit(exit_code);
    }
}
