use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod version;

/// Command line options available through the `rbpkg` CLI.
#[derive(Debug, Parser)]
#[command(name = "rbpkg", author, about, long_about = None, version = version::version_string())]
struct Opt {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Command,

    /// Displays debug output.
    #[arg(short, long, global = true)]
    debug: bool,

    /// Simulates all operations: resolves and prints the plan without
    /// asserting that any execution collaborator is present.
    #[arg(long, global = true)]
    dry_run: bool,
}

/// Commands supported by `rbpkg`.
#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Resolves and prints an install plan for a bundle.
    Install(commands::install::Opt),
    /// Re-resolves a bundle against its current channel.
    Upgrade(commands::upgrade::Opt),
}

/// Entry point of the `rbpkg` CLI.
fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();
    init_logging(opt.debug);

    let loader_config = config::LoaderConfig::from_env()?;
    tracing::debug!(?loader_config, "resolved loader configuration");

    let result = match opt.command {
        Command::Install(install_opt) => commands::install::run(install_opt, opt.dry_run),
        Command::Upgrade(upgrade_opt) => commands::upgrade::run(upgrade_opt, opt.dry_run),
    };

    if let Err(err) = result {
        if let Some(rbpkg_err) = err.downcast_ref::<rbpkg_errors::RbpkgError>() {
            eprintln!("[{}] {rbpkg_err}", rbpkg_err.kind_label());
        } else {
            eprintln!("[Error] {err}");
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Sets up a `tracing-subscriber` `fmt` subscriber driven by `RUST_LOG`,
/// with `--debug` lowering the default level to `DEBUG`.
fn init_logging(debug: bool) {
    let default_filter = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_filter.into())
        .from_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();
}
