use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";
const VERBOSE_FILTER: &str = "warn,codepad_cli=debug,codepad_project=debug,codepad_core=debug";

/// 安裝輸出至 stderr 的日誌訂閱者。 / Installs a stderr `fmt` subscriber.
///
/// `--verbose` wins over `RUST_LOG`; without either only warnings are shown.
pub fn init(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(false),
    );

    // A second initialisation (tests driving `run` twice) keeps the first subscriber.
    let _ = subscriber.try_init();
}
