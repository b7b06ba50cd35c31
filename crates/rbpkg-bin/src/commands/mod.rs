//! Subcommand implementations: `install` and `upgrade`.

pub mod install;
pub mod upgrade;

use std::rc::Rc;

use rbpkg_errors::{PackageInstallError, RbpkgError};
use rbpkg_repo::{Channel, PackageRepository, PackageType, Release};
use rbpkg_resolver::{BundleInfo, InstallDepsMode, PackageSelection, PendingInstall};

/// Parses a `--package-type` value the way `rbpkg_repo::PackageType`'s
/// wire format spells it (`python`, `rpm`, `deb`, `source`).
pub fn parse_package_type(value: &str) -> Result<PackageType, RbpkgError> {
    match value.to_ascii_lowercase().as_str() {
        "python" => Ok(PackageType::Python),
        "rpm" => Ok(PackageType::Rpm),
        "deb" => Ok(PackageType::Deb),
        "source" => Ok(PackageType::Source),
        other => Err(PackageInstallError::new(format!(
            "\"{other}\" is not a recognized package type; expected one of: python, rpm, deb, source."
        ))
        .into()),
    }
}

/// Looks up `bundle_name` in the repository and resolves a
/// [`PackageSelection`] for its latest visible release on `channel_name`
/// (or, when `channel_name` is `None`, on the bundle's current channel).
pub fn select_bundle(
    repository: &Rc<PackageRepository>,
    bundle_name: &str,
    channel_name: Option<&str>,
) -> Result<PackageSelection, RbpkgError> {
    let bundle = repository.lookup_package_bundle(bundle_name)?;
    let loader = rbpkg_loader::get_data_loader()?;

    let (resolved_channel_name, channel_type, release) = {
        let mut bundle_mut = bundle.borrow_mut();

        let channel: &mut Channel = match channel_name {
            Some(name) => bundle_mut.get_channel(&*loader, name)?.ok_or_else(|| {
                PackageInstallError::new(format!(
                    "Bundle \"{bundle_name}\" has no channel named \"{name}\"."
                ))
            })?,
            None => bundle_mut.current_channel(&*loader)?.ok_or_else(|| {
                PackageInstallError::new(format!(
                    "Bundle \"{bundle_name}\" has no current channel; pass --channel explicitly."
                ))
            })?,
        };

        let release: Release = channel
            .latest_release(&*loader)?
            .cloned()
            .ok_or_else(|| {
                PackageInstallError::new(format!(
                    "Channel \"{}\" of bundle \"{bundle_name}\" has no releases.",
                    channel.name
                ))
            })?;

        (channel.name.clone(), channel.channel_type, release)
    };

    Ok(PackageSelection {
        bundle_name: bundle_name.to_string(),
        bundle,
        channel_name: resolved_channel_name,
        channel_type,
        release,
    })
}

/// Resolves a complete install plan for one requested bundle.
pub fn resolve_plan(
    repository: Rc<PackageRepository>,
    selection: PackageSelection,
    package_type_hint: Option<PackageType>,
    install_deps_mode: InstallDepsMode,
) -> Result<Vec<BundleInfo>, RbpkgError> {
    let mut engine = PendingInstall::new(repository, install_deps_mode);
    engine.add_package(selection, package_type_hint)?;
    engine.resolve_dependencies()?;
    Ok(engine.get_install_order().into_iter().cloned().collect())
}

/// Renders a resolved plan the way the CLI prints it for both `install`
/// and `upgrade`: one numbered line per record, dependencies first.
pub fn print_plan(plan: &[BundleInfo], dry_run: bool) {
    if dry_run {
        println!("(dry run) would install the following packages, in order:");
    } else {
        println!("Install plan:");
    }

    for (i, info) in plan.iter().enumerate() {
        println!(
            "  {}. {} {} ({}: {})",
            i + 1,
            info.bundle_name,
            info.release.version,
            info.package_type,
            info.rules.package_name,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbpkg_repo::PackageType;
    use rbpkg_testing::FixtureRepository;

    #[test]
    fn parse_package_type_accepts_known_names_case_insensitively() {
        assert_eq!(parse_package_type("RPM").unwrap(), PackageType::Rpm);
        assert_eq!(parse_package_type("python").unwrap(), PackageType::Python);
    }

    #[test]
    fn parse_package_type_rejects_unknown_names() {
        assert!(parse_package_type("nuget").is_err());
    }

    #[test]
    fn select_bundle_falls_back_to_current_channel_when_unspecified() {
        let fixture = FixtureRepository::builder()
            .bundle("widget", |b| {
                b.channel("1.x", |c| {
                    c.release("1.0").rule(|r| r.package_type(PackageType::Rpm))
                })
            })
            .build();
        let repo = fixture.install_as_global_repository();

        let selection = select_bundle(&repo, "widget", None).unwrap();
        assert_eq!(selection.channel_name, "1.x");
        assert_eq!(selection.release.version, "1.0");
    }

    #[test]
    fn select_bundle_errors_on_unknown_channel() {
        let fixture = FixtureRepository::builder()
            .bundle("widget", |b| {
                b.channel("1.x", |c| {
                    c.release("1.0").rule(|r| r.package_type(PackageType::Rpm))
                })
            })
            .build();
        let repo = fixture.install_as_global_repository();

        let err = select_bundle(&repo, "widget", Some("2.x")).unwrap_err();
        assert!(err.to_string().contains("no channel named"));
    }

    #[test]
    fn resolve_plan_expands_required_dependencies() {
        let fixture = FixtureRepository::builder()
            .bundle("widget", |b| {
                b.channel("1.x", |c| {
                    c.release("1.0")
                        .rule(|r| r.package_type(PackageType::Rpm).required(["gadget>=1.0"]))
                })
            })
            .bundle("gadget", |b| {
                b.channel("1.x", |c| {
                    c.release("1.0").rule(|r| r.package_type(PackageType::Rpm))
                })
            })
            .build();
        let repo = fixture.install_as_global_repository();

        let selection = select_bundle(&repo, "widget", None).unwrap();
        let plan = resolve_plan(repo.clone(), selection, None, InstallDepsMode::Required).unwrap();

        let names: Vec<&str> = plan.iter().map(|info| info.bundle_name.as_str()).collect();
        assert_eq!(names, vec!["gadget", "widget"]);
    }
}
