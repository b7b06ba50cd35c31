//! The resolution engine: [`PendingInstall`] accepts user-requested
//! packages, expands their dependency closure under a policy, detects
//! version conflicts, and produces a topologically ordered install plan.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rbpkg_errors::{DependencyConflictError, PackageInstallError, RbpkgError};
use rbpkg_repo::{Bundle, Channel, ChannelType, PackageRepository, PackageRules, PackageType, Release};

use crate::graph::DependencyGraph;

/// How deep to follow a package's dependency lists when expanding the
/// closure. Ordered: each level is a superset of the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum InstallDepsMode {
    /// Only `required` dependencies.
    #[default]
    Required,
    /// `required` and `recommended` dependencies.
    Recommended,
    /// `required`, `recommended`, and `optional` dependencies.
    All,
}

/// Everything needed to add one user-requested bundle to a
/// [`PendingInstall`], gathered by the caller from the repository model.
///
/// Because back-references are lookup-only in this crate's model (see the
/// repository model's ownership notes), the channel this release lives on
/// is named and typed here rather than reachable by walking a parent
/// pointer from `release`.
pub struct PackageSelection {
    /// The bundle's unique name.
    pub bundle_name: String,
    /// The bundle itself, already looked up through the repository
    /// facade.
    pub bundle: Rc<RefCell<Bundle>>,
    /// The name of the channel `release` was selected from.
    pub channel_name: String,
    /// The stability tier of that channel, used to apply the
    /// channel-type firewall to this package's own dependencies.
    pub channel_type: ChannelType,
    /// The release being requested.
    pub release: Release,
}

/// One resolved entry in an install plan: a bundle, the release and
/// channel chosen for it, and the package rule that will perform the
/// install.
#[derive(Debug, Clone)]
pub struct BundleInfo {
    /// The bundle's unique name.
    pub bundle_name: String,
    /// The name of the channel `release` was selected from.
    pub channel_name: String,
    /// The stability tier of that channel.
    pub channel_type: ChannelType,
    /// The release chosen for this bundle.
    pub release: Release,
    /// The kind of artifact that will be installed.
    pub package_type: PackageType,
    /// The full rule selected for this release (dependency lists,
    /// command lists, `install_flags`, etc.).
    pub rules: PackageRules,
}

/// The resolution engine.
///
/// Single-threaded cooperative, like the rest of this workspace: a
/// `PendingInstall` must not be shared across threads, and
/// [`PendingInstall::resolve_dependencies`] is the only operation that
/// mutates more than the receiver's own bookkeeping (it may perform
/// `DataLoader` I/O while expanding the dependency closure).
pub struct PendingInstall {
    repository: Rc<PackageRepository>,
    install_deps_mode: InstallDepsMode,
    bundle_infos: Vec<BundleInfo>,
    bundle_infos_map: HashMap<String, usize>,
    dep_graph: DependencyGraph<String>,
}

impl PendingInstall {
    /// Construct an engine backed by `repository`, expanding dependencies
    /// to `install_deps_mode`.
    pub fn new(repository: Rc<PackageRepository>, install_deps_mode: InstallDepsMode) -> Self {
        Self {
            repository,
            install_deps_mode,
            bundle_infos: Vec::new(),
            bundle_infos_map: HashMap::new(),
            dep_graph: DependencyGraph::new(),
        }
    }

    /// The records accepted so far, in the order they were added
    /// (user-requested packages first, then whatever
    /// [`Self::resolve_dependencies`] pulled in).
    pub fn bundle_infos(&self) -> &[BundleInfo] {
        &self.bundle_infos
    }

    /// Whether a bundle with this name has already been accepted.
    pub fn contains(&self, bundle_name: &str) -> bool {
        self.bundle_infos_map.contains_key(bundle_name)
    }

    /// Accepts a user-requested package.
    ///
    /// Looks up the applicable package rules for `selection.release`'s
    /// version. If `package_type_hint` is given, the first rule whose
    /// `package_type` matches it is used; otherwise the first applicable
    /// rule is used. Seeds the dependency graph with a vertex for this
    /// bundle name (with no edges yet) so it is guaranteed to appear in
    /// [`Self::get_install_order`] even if nothing else ends up depending
    /// on it.
    ///
    /// # Errors
    ///
    /// Returns [`rbpkg_errors::PackageInstallError`] when no rule applies
    /// to this host, or none matches `package_type_hint`.
    pub fn add_package(
        &mut self,
        selection: PackageSelection,
        package_type_hint: Option<PackageType>,
    ) -> Result<(), RbpkgError> {
        if self.bundle_infos_map.contains_key(&selection.bundle_name) {
            return Err(PackageInstallError::new(format!(
                "\"{}\" has already been added to this install.",
                selection.bundle_name
            ))
            .into());
        }

        let rules = select_rule(
            &self.repository,
            &selection.bundle,
            &selection.bundle_name,
            &selection.channel_name,
            &selection.release.version,
            package_type_hint,
        )?;

        self.insert_record(BundleInfo {
            bundle_name: selection.bundle_name,
            channel_name: selection.channel_name,
            channel_type: selection.channel_type,
            release: selection.release,
            package_type: rules.package_type,
            rules,
        });
        Ok(())
    }

    fn insert_record(&mut self, info: BundleInfo) {
        let name = info.bundle_name.clone();
        self.dep_graph.add(name.clone(), []);
        self.bundle_infos_map.insert(name, self.bundle_infos.len());
        self.bundle_infos.push(info);
    }

    /// Expands the dependency closure of every currently-accepted record.
    ///
    /// Runs to a fixed point: each round only (re-)processes records
    /// added in the previous round, since a bundle name can be accepted
    /// at most once and its dependency lists never change. All-or-nothing:
    /// on any failure the engine's state (accepted records, name index,
    /// and dependency graph) is restored to exactly what it was before
    /// this call, so the engine remains usable.
    ///
    /// # Errors
    ///
    /// Returns [`rbpkg_errors::PackageLookupError`] if a dependency names
    /// a bundle the repository doesn't have, [`rbpkg_errors::PackageInstallError`]
    /// if a dependency has no applicable rule, or
    /// [`rbpkg_errors::DependencyConflictError`] if two accepted packages
    /// require incompatible versions of a third.
    pub fn resolve_dependencies(&mut self) -> Result<(), RbpkgError> {
        let snapshot_infos = self.bundle_infos.clone();
        let snapshot_map = self.bundle_infos_map.clone();
        let snapshot_graph = self.dep_graph.clone();

        match self.resolve_dependencies_inner() {
            Ok(()) => Ok(()),
            Err(err) => {
                self.bundle_infos = snapshot_infos;
                self.bundle_infos_map = snapshot_map;
                self.dep_graph = snapshot_graph;
                Err(err)
            }
        }
    }

    fn resolve_dependencies_inner(&mut self) -> Result<(), RbpkgError> {
        let mut worklist: Vec<String> = self
            .bundle_infos
            .iter()
            .map(|info| info.bundle_name.clone())
            .collect();

        while !worklist.is_empty() {
            let mut newly_added = Vec::new();

            for parent_name in &worklist {
                let parent_idx = self.bundle_infos_map[parent_name];
                let parent = self.bundle_infos[parent_idx].clone();

                let mut channel_types = vec![ChannelType::Release];
                if parent.channel_type == ChannelType::Prerelease {
                    channel_types.push(ChannelType::Prerelease);
                }

                for spec in dependency_specs(&parent.rules, self.install_deps_mode) {
                    if let Some(newly) =
                        self.resolve_one_dependency(&parent.bundle_name, spec, &channel_types)?
                    {
                        newly_added.push(newly);
                    }
                }
            }

            worklist = newly_added;
        }

        Ok(())
    }

    /// Resolves a single dependency spec for `parent_name`, returning the
    /// name of a newly-created record (if any) so the fixed-point loop
    /// knows to process it next round.
    fn resolve_one_dependency(
        &mut self,
        parent_name: &str,
        spec: &str,
        channel_types: &[ChannelType],
    ) -> Result<Option<String>, RbpkgError> {
        let (dep_name, specifier) = rbpkg_matcher::split_dependency_spec(spec);

        if let Some(&existing_idx) = self.bundle_infos_map.get(dep_name) {
            let existing_version = self.bundle_infos[existing_idx].release.version.clone();
            if !rbpkg_matcher::matches_version_range(&existing_version, specifier, None) {
                return Err(DependencyConflictError::new(format!(
                    "\"{parent_name}\" requires \"{dep_name}{specifier}\", but \"{existing_version}\" \
                     is already accepted for another dependent."
                ))
                .into());
            }
            self.dep_graph.add(parent_name.to_string(), [dep_name.to_string()]);
            return Ok(None);
        }

        let dep_bundle = self.repository.lookup_package_bundle(dep_name)?;
        let loader = rbpkg_loader::get_data_loader()?;
        let resolved = dep_bundle
            .borrow_mut()
            .get_latest_release_for_version_range(&*loader, specifier, channel_types)?;

        let rules = select_rule(
            &self.repository,
            &dep_bundle,
            dep_name,
            &resolved.channel_name,
            &resolved.release.version,
            None,
        )?;

        self.dep_graph.add(parent_name.to_string(), [dep_name.to_string()]);
        self.insert_record(BundleInfo {
            bundle_name: dep_name.to_string(),
            channel_name: resolved.channel_name,
            channel_type: resolved.channel_type,
            release: resolved.release,
            package_type: rules.package_type,
            rules,
        });

        Ok(Some(dep_name.to_string()))
    }

    /// Projects the dependency graph's topological order through the
    /// accepted records: dependencies before dependents. Must be called
    /// after [`Self::resolve_dependencies`]. Every accepted record
    /// appears, including ones nothing else depends on, since
    /// [`Self::add_package`] seeds a vertex for each of them.
    pub fn get_install_order(&self) -> Vec<&BundleInfo> {
        self.dep_graph
            .iter_sorted()
            .into_iter()
            .filter_map(|name| self.bundle_infos_map.get(&name).map(|&idx| &self.bundle_infos[idx]))
            .collect()
    }
}

/// Collects the dependency specs applicable under `mode`, in manifest
/// order: `required` always, `recommended` added at `Recommended` and
/// above, `optional` added only at `All`.
fn dependency_specs(rules: &PackageRules, mode: InstallDepsMode) -> Vec<&str> {
    let mut specs: Vec<&str> = rules.required.iter().map(String::as_str).collect();
    if mode >= InstallDepsMode::Recommended {
        specs.extend(rules.recommended.iter().map(String::as_str));
    }
    if mode >= InstallDepsMode::All {
        specs.extend(rules.optional.iter().map(String::as_str));
    }
    specs
}

/// Selects the package rule to use for `bundle_name` at `version`:
/// the first rule whose `package_type` matches `package_type_hint`, or
/// (with no hint) simply the first applicable rule.
fn select_rule(
    repository: &PackageRepository,
    bundle: &Rc<RefCell<Bundle>>,
    bundle_name: &str,
    channel_name: &str,
    version: &str,
    package_type_hint: Option<PackageType>,
) -> Result<PackageRules, RbpkgError> {
    let _ = repository;
    let loader = rbpkg_loader::get_data_loader()?;
    let mut bundle_mut = bundle.borrow_mut();
    let channel: &mut Channel = bundle_mut
        .get_channel(&*loader, channel_name)?
        .ok_or_else(|| {
            PackageInstallError::new(format!(
                "Bundle \"{bundle_name}\" has no channel named \"{channel_name}\"."
            ))
        })?;

    let all_rules = channel.get_all_rules_for_version(&*loader, version, true)?;
    if all_rules.is_empty() {
        return Err(PackageInstallError::new(format!(
            "\"{bundle_name}\" {version} is not available on this system."
        ))
        .into());
    }

    let chosen = match package_type_hint {
        Some(hint) => all_rules.iter().find(|rule| rule.package_type == hint),
        None => all_rules.first(),
    };

    match chosen {
        Some(rule) => Ok((*rule).clone()),
        None => {
            let available: Vec<String> = all_rules
                .iter()
                .map(|rule| rule.package_type.to_string())
                .collect();
            Err(PackageInstallError::new(format!(
                "\"{bundle_name}\" {version} has no rule for package type \"{}\"; available: {}.",
                package_type_hint.expect("hint is Some in this branch"),
                available.join(", ")
            ))
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbpkg_testing::FixtureRepository;

    fn nested_deps_fixture() -> FixtureRepository {
        FixtureRepository::builder()
            .bundle("MyPackage", |b| {
                b.channel("1.x", |c| {
                    c.release("1.0")
                        .rule(|r| r.package_type(PackageType::Rpm).required(["DepPackage1>=1.0"]))
                })
            })
            .bundle("DepPackage1", |b| {
                b.channel("1.x", |c| {
                    c.release("1.0")
                        .rule(|r| r.package_type(PackageType::Rpm).required(["DepPackage2>=1.5"]))
                })
            })
            .bundle("DepPackage2", |b| {
                b.channel("1.x", |c| {
                    c.release("1.5").rule(|r| r.package_type(PackageType::Rpm))
                })
            })
            .build()
    }

    #[test]
    fn s4_nested_dependencies_resolve_in_order() {
        let fixture = nested_deps_fixture();
        let repo = fixture.install_as_global_repository();

        let mut engine = PendingInstall::new(repo.clone(), InstallDepsMode::Required);
        let selection = fixture.select(&repo, "MyPackage", "1.x", "1.0");
        engine.add_package(selection, None).unwrap();
        engine.resolve_dependencies().unwrap();

        let names: Vec<&str> = engine
            .get_install_order()
            .iter()
            .map(|info| info.bundle_name.as_str())
            .collect();
        assert_eq!(names, vec!["DepPackage2", "DepPackage1", "MyPackage"]);
    }

    fn conflicting_deps_fixture() -> FixtureRepository {
        FixtureRepository::builder()
            .bundle("MyPackage", |b| {
                b.channel("1.x", |c| {
                    c.release("1.0").rule(|r| {
                        r.package_type(PackageType::Rpm)
                            .required(["DepPackage1>=1.0", "DepPackage2>=1.0,<1.5"])
                    })
                })
            })
            .bundle("DepPackage1", |b| {
                b.channel("1.x", |c| {
                    c.release("1.0")
                        .rule(|r| r.package_type(PackageType::Rpm).required(["DepPackage2>=1.5"]))
                })
            })
            .bundle("DepPackage2", |b| {
                b.channel("1.x", |c| {
                    c.release("1.0")
                        .rule(|r| r.package_type(PackageType::Rpm))
                        .release("1.5")
                        .rule(|r| r.package_type(PackageType::Rpm))
                })
            })
            .build()
    }

    #[test]
    fn s5_version_conflict_restores_state_atomically() {
        let fixture = conflicting_deps_fixture();
        let repo = fixture.install_as_global_repository();

        let mut engine = PendingInstall::new(repo.clone(), InstallDepsMode::Required);
        let selection = fixture.select(&repo, "MyPackage", "1.x", "1.0");
        engine.add_package(selection, None).unwrap();

        let err = engine.resolve_dependencies().unwrap_err();
        assert!(matches!(err, RbpkgError::DependencyConflict(_)));

        assert_eq!(engine.bundle_infos().len(), 1);
        assert_eq!(engine.bundle_infos()[0].bundle_name, "MyPackage");
        assert!(engine.contains("MyPackage"));
        assert!(!engine.contains("DepPackage1"));
    }

    fn channel_firewall_fixture() -> FixtureRepository {
        FixtureRepository::builder()
            .bundle("Consumer", |b| {
                b.channel("stable", |c| {
                    c.release("1.0")
                        .rule(|r| r.package_type(PackageType::Rpm).required(["DepPackage1>=1.0"]))
                })
                .channel_with(
                    "nightly",
                    ChannelType::Prerelease,
                    |c| {
                        c.release("1.0")
                            .rule(|r| r.package_type(PackageType::Rpm).required(["DepPackage1>=1.0"]))
                    },
                )
            })
            .bundle("DepPackage1", |b| {
                b.channel("1.x", |c| {
                    c.release("1.5").rule(|r| r.package_type(PackageType::Rpm))
                })
                .channel_with("2.x", ChannelType::Prerelease, |c| {
                    c.release("2.0").rule(|r| r.package_type(PackageType::Rpm))
                })
            })
            .build()
    }

    #[test]
    fn s6_stable_parent_only_sees_release_channels() {
        let fixture = channel_firewall_fixture();
        let repo = fixture.install_as_global_repository();

        let mut engine = PendingInstall::new(repo.clone(), InstallDepsMode::Required);
        engine
            .add_package(fixture.select(&repo, "Consumer", "stable", "1.0"), None)
            .unwrap();
        engine.resolve_dependencies().unwrap();

        let dep = engine
            .bundle_infos()
            .iter()
            .find(|info| info.bundle_name == "DepPackage1")
            .unwrap();
        assert_eq!(dep.release.version, "1.5");
    }

    #[test]
    fn s6_prerelease_parent_admits_prerelease_channels() {
        let fixture = channel_firewall_fixture();
        let repo = fixture.install_as_global_repository();

        let mut engine = PendingInstall::new(repo.clone(), InstallDepsMode::Required);
        engine
            .add_package(fixture.select(&repo, "Consumer", "nightly", "1.0"), None)
            .unwrap();
        engine.resolve_dependencies().unwrap();

        let dep = engine
            .bundle_infos()
            .iter()
            .find(|info| info.bundle_name == "DepPackage1")
            .unwrap();
        assert_eq!(dep.release.version, "2.0");
    }

    #[test]
    fn install_deps_mode_required_never_pulls_recommended_or_optional() {
        let fixture = FixtureRepository::builder()
            .bundle("App", |b| {
                b.channel("1.x", |c| {
                    c.release("1.0").rule(|r| {
                        r.package_type(PackageType::Rpm)
                            .recommended(["Nice>=1.0"])
                            .optional(["Extra>=1.0"])
                    })
                })
            })
            .bundle("Nice", |b| {
                b.channel("1.x", |c| c.release("1.0").rule(|r| r.package_type(PackageType::Rpm)))
            })
            .bundle("Extra", |b| {
                b.channel("1.x", |c| c.release("1.0").rule(|r| r.package_type(PackageType::Rpm)))
            })
            .build();
        let repo = fixture.install_as_global_repository();

        let mut engine = PendingInstall::new(repo.clone(), InstallDepsMode::Required);
        engine
            .add_package(fixture.select(&repo, "App", "1.x", "1.0"), None)
            .unwrap();
        engine.resolve_dependencies().unwrap();

        assert_eq!(engine.bundle_infos().len(), 1);
        assert!(!engine.contains("Nice"));
        assert!(!engine.contains("Extra"));
    }

    #[test]
    fn install_deps_mode_all_pulls_optional_too() {
        let fixture = FixtureRepository::builder()
            .bundle("App", |b| {
                b.channel("1.x", |c| {
                    c.release("1.0").rule(|r| {
                        r.package_type(PackageType::Rpm)
                            .recommended(["Nice>=1.0"])
                            .optional(["Extra>=1.0"])
                    })
                })
            })
            .bundle("Nice", |b| {
                b.channel("1.x", |c| c.release("1.0").rule(|r| r.package_type(PackageType::Rpm)))
            })
            .bundle("Extra", |b| {
                b.channel("1.x", |c| c.release("1.0").rule(|r| r.package_type(PackageType::Rpm)))
            })
            .build();
        let repo = fixture.install_as_global_repository();

        let mut engine = PendingInstall::new(repo.clone(), InstallDepsMode::All);
        engine
            .add_package(fixture.select(&repo, "App", "1.x", "1.0"), None)
            .unwrap();
        engine.resolve_dependencies().unwrap();

        assert!(engine.contains("Nice"));
        assert!(engine.contains("Extra"));
    }

    #[test]
    fn add_package_rejects_package_type_with_no_matching_rule() {
        let fixture = FixtureRepository::builder()
            .bundle("App", |b| {
                b.channel("1.x", |c| {
                    c.release("1.0").rule(|r| r.package_type(PackageType::Rpm))
                })
            })
            .build();
        let repo = fixture.install_as_global_repository();

        let mut engine = PendingInstall::new(repo.clone(), InstallDepsMode::Required);
        let err = engine
            .add_package(
                fixture.select(&repo, "App", "1.x", "1.0"),
                Some(PackageType::Deb),
            )
            .unwrap_err();
        assert!(matches!(err, RbpkgError::PackageInstall(_)));
    }

    #[test]
    fn add_package_twice_for_the_same_bundle_is_rejected() {
        let fixture = FixtureRepository::builder()
            .bundle("App", |b| {
                b.channel("1.x", |c| {
                    c.release("1.0").rule(|r| r.package_type(PackageType::Rpm))
                })
            })
            .build();
        let repo = fixture.install_as_global_repository();

        let mut engine = PendingInstall::new(repo.clone(), InstallDepsMode::Required);
        engine
            .add_package(fixture.select(&repo, "App", "1.x", "1.0"), None)
            .unwrap();
        let err = engine
            .add_package(fixture.select(&repo, "App", "1.x", "1.0"), None)
            .unwrap_err();
        assert!(matches!(err, RbpkgError::PackageInstall(_)));
    }
}
