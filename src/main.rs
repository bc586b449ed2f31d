use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use remitx::cli::compare::CompareArgs;
use remitx::core::QuoteScope;
use remitx::core::log::init_logging;
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Compare what the recipient gets across providers
    Compare {
        /// Amount to send, in the send currency
        #[arg(short, long, default_value = "100")]
        amount: Decimal,

        #[arg(long, default_value = "USD")]
        send_currency: String,

        #[arg(long, default_value = "MAD")]
        receive_currency: String,

        /// ISO 3166-1 alpha-2 code
        #[arg(long, default_value = "US")]
        send_country: String,

        /// ISO 3166-1 alpha-2 code
        #[arg(long, default_value = "MA")]
        receive_country: String,

        /// Quote scope for multi-option providers: best or per-category
        #[arg(long)]
        scope: Option<QuoteScope>,

        /// Group results into bank deposit and cash pickup
        #[arg(long)]
        by_category: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

impl From<Commands> for remitx::AppCommand {
    fn from(cmd: Commands) -> remitx::AppCommand {
        match cmd {
            Commands::Setup => remitx::AppCommand::Setup,
            Commands::Compare {
                amount,
                send_currency,
                receive_currency,
                send_country,
                receive_country,
                scope,
                by_category,
                json,
            } => remitx::AppCommand::Compare(CompareArgs {
                amount,
                send_currency,
                receive_currency,
                send_country,
                receive_country,
                scope,
                by_category,
                json,
            }),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(cmd) => remitx::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
