use clap::{
    Parser,
    ValueEnum,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use solquiz::{
    deployment::{
        DEPLOYMENTS_ROOT,
        Network,
        default_artifact_path,
    },
    trivia::OPEN_TRIVIA_URL,
    wallets,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    sync::OnceLock,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod client;
mod ui;

const LOG_FILE: &str = "solquiz.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(
    name = "solquiz",
    about = "Terminal client for the SolQuiz quiz contract",
    version
)]
struct Args {
    /// Network the wallet starts on
    #[arg(long, value_enum, default_value = "sandbox")]
    network: NetworkArg,

    /// Deployment artifact to record the sandbox contract in
    #[arg(long)]
    artifact: Option<PathBuf>,

    /// Keystore directory (defaults to ~/.ethereum/keystore)
    #[arg(long)]
    keystore_dir: Option<String>,

    /// Keystore wallet to unlock before the UI starts
    #[arg(long)]
    wallet: Option<String>,

    /// Number of generated development accounts when no keystore is used
    #[arg(long, default_value_t = 3)]
    dev_accounts: usize,

    /// Start without any wallet provider
    #[arg(long, conflicts_with_all = ["keystore_dir", "wallet"])]
    no_wallet: bool,

    /// Quizzes generated into the sandbox on launch
    #[arg(long, default_value_t = 8)]
    seed_quizzes: usize,

    /// Trivia provider endpoint for bulk imports
    #[arg(long, default_value = OPEN_TRIVIA_URL)]
    trivia_url: String,

    /// Directory for the daily log file
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, ValueEnum)]
enum NetworkArg {
    Sandbox,
    Sepolia,
}

impl From<NetworkArg> for Network {
    fn from(arg: NetworkArg) -> Self {
        match arg {
            NetworkArg::Sandbox => Network::Sandbox,
            NetworkArg::Sepolia => Network::Sepolia,
        }
    }
}

/// Logs go to a daily file; the terminal belongs to the UI.
fn init_tracing(log_dir: &Path) {
    let file_appender = rolling::daily(log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let initialized = fmt()
        .with_env_filter(env_filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .try_init()
        .is_ok();
    if initialized {
        let _ = LOG_GUARD.set(guard);
    }
}

fn app_config(args: Args) -> Result<client::AppConfig> {
    let wallet = if args.no_wallet {
        client::WalletConfig::Disabled
    } else if args.keystore_dir.is_some() || args.wallet.is_some() {
        let dir = wallets::resolve_keystore_dir(args.keystore_dir.as_deref())
            .wrap_err("resolving keystore directory")?;
        client::WalletConfig::Keystore {
            dir,
            unlock: args.wallet,
        }
    } else {
        client::WalletConfig::Development {
            count: args.dev_accounts,
        }
    };
    Ok(client::AppConfig {
        network: args.network.into(),
        artifact_path: args.artifact.unwrap_or_else(default_artifact_path),
        wallet,
        seed_quizzes: args.seed_quizzes,
        trivia_url: args.trivia_url,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let log_dir = args
        .log_dir
        .clone()
        .unwrap_or_else(|| Path::new(DEPLOYMENTS_ROOT).join("logs"));
    init_tracing(&log_dir);
    tracing::info!("starting solquiz client");
    let config = app_config(args)?;
    client::run_app(config).await
}
