//! `rbpkg install <bundle>`: resolves and prints an install plan, never
//! executing it.

use rbpkg_resolver::InstallDepsMode;

/// Resolves and prints an install plan for a bundle, without executing it.
#[derive(Debug, clap::Args)]
pub struct Opt {
    /// The bundle to install.
    pub bundle: String,

    /// Restrict rule selection to this package type (python, rpm, deb, source).
    #[arg(long = "package-type")]
    pub package_type: Option<String>,

    /// The channel to install from (defaults to the bundle's current channel).
    #[arg(long)]
    pub channel: Option<String>,

    /// How deep to expand the dependency closure.
    #[arg(long, value_enum, default_value_t = InstallDepsModeArg::Required)]
    pub install_deps_mode: InstallDepsModeArg,
}

/// `clap`-facing mirror of [`rbpkg_resolver::InstallDepsMode`]; kept
/// separate so the resolver crate doesn't need a `clap` dependency just
/// to be selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InstallDepsModeArg {
    /// Only `required` dependencies.
    Required,
    /// `required` and `recommended` dependencies.
    Recommended,
    /// `required`, `recommended`, and `optional` dependencies.
    All,
}

impl From<InstallDepsModeArg> for InstallDepsMode {
    fn from(arg: InstallDepsModeArg) -> Self {
        match arg {
            InstallDepsModeArg::Required => InstallDepsMode::Required,
            InstallDepsModeArg::Recommended => InstallDepsMode::Recommended,
            InstallDepsModeArg::All => InstallDepsMode::All,
        }
    }
}

pub fn run(opt: Opt, dry_run: bool) -> anyhow::Result<()> {
    let repository = rbpkg_repo::get_repository();

    let package_type = opt
        .package_type
        .as_deref()
        .map(super::parse_package_type)
        .transpose()?;

    let selection = super::select_bundle(&repository, &opt.bundle, opt.channel.as_deref())?;
    let plan = super::resolve_plan(
        repository,
        selection,
        package_type,
        opt.install_deps_mode.into(),
    )?;

    super::print_plan(&plan, dry_run);
    Ok(())
}
