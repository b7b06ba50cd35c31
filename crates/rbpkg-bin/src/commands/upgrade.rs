//! `rbpkg upgrade <bundle>`: re-resolves a bundle against its current
//! channel, ignoring any channel it may previously have been installed
//! from (this crate has no installed-state tracking of its own — see
//! the purpose/scope Non-goals).

use rbpkg_resolver::InstallDepsMode;

use crate::commands::install::InstallDepsModeArg;

/// Re-resolves a bundle against its current channel.
#[derive(Debug, clap::Args)]
pub struct Opt {
    /// The bundle to upgrade.
    pub bundle: String,

    /// Restrict rule selection to this package type (python, rpm, deb, source).
    #[arg(long = "package-type")]
    pub package_type: Option<String>,

    /// How deep to expand the dependency closure.
    #[arg(long, value_enum, default_value_t = InstallDepsModeArg::Required)]
    pub install_deps_mode: InstallDepsModeArg,
}

pub fn run(opt: Opt, dry_run: bool) -> anyhow::Result<()> {
    let repository = rbpkg_repo::get_repository();

    let package_type = opt
        .package_type
        .as_deref()
        .map(super::parse_package_type)
        .transpose()?;

    let selection = super::select_bundle(&repository, &opt.bundle, None)?;
    let plan = super::resolve_plan(
        repository,
        selection,
        package_type,
        InstallDepsMode::from(opt.install_deps_mode),
    )?;

    super::print_plan(&plan, dry_run);
    Ok(())
}
