//! A small builder DSL for constructing an in-memory package repository,
//! plus the RAII guards that install it as the process-wide repository
//! and data loader for the duration of a test.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard, OnceLock};

use chrono::Utc;
use rbpkg_repo::{Bundle, Channel, ChannelType, PackageRepository, PackageType, Release};
use rbpkg_resolver::PackageSelection;

fn global_loader_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Builds the JSON documents for an in-memory package repository, one
/// bundle and channel at a time.
///
/// ```
/// use rbpkg_testing::FixtureRepository;
/// use rbpkg_repo::PackageType;
///
/// let fixture = FixtureRepository::builder()
///     .bundle("widget", |b| {
///         b.channel("1.x", |c| {
///             c.release("1.0").rule(|r| r.package_type(PackageType::Rpm))
///         })
///     })
///     .build();
/// let repo = fixture.install_as_global_repository();
/// let selected = fixture.select(&repo, "widget", "1.x", "1.0");
/// assert_eq!(selected.release.version, "1.0");
/// ```
#[derive(Default)]
pub struct FixtureRepositoryBuilder {
    bundles: Vec<BuiltBundle>,
}

impl FixtureRepositoryBuilder {
    /// Adds a bundle built up by `f`.
    pub fn bundle(mut self, name: &str, f: impl FnOnce(BundleBuilder) -> BundleBuilder) -> Self {
        let built = f(BundleBuilder::new(name)).finish();
        self.bundles.push(built);
        self
    }

    /// Finalizes the fixture, rendering every bundle/channel manifest into
    /// the path → document mapping an [`rbpkg_loader::InMemoryDataLoader`]
    /// expects.
    pub fn build(self) -> FixtureRepository {
        let now = Utc::now();
        let mut documents = HashMap::new();

        let index_entries: Vec<serde_json::Value> = self
            .bundles
            .iter()
            .map(|bundle| {
                serde_json::json!({
                    "name": bundle.name,
                    "manifest_file": format!("{}/index.json", bundle.name),
                    "created_timestamp": now,
                    "last_updated_timestamp": now,
                    "current_version": serde_json::Value::Null,
                    "package_names": {},
                })
            })
            .collect();

        documents.insert(
            "packages/index.json".to_string(),
            serde_json::json!({
                "format_version": "1.0",
                "last_updated_timestamp": now,
                "bundles": index_entries,
            }),
        );

        for bundle in &self.bundles {
            let channel_entries: Vec<serde_json::Value> = bundle
                .channels
                .iter()
                .map(|channel| {
                    serde_json::json!({
                        "name": channel.name,
                        "manifest_file": format!("{}.json", channel.name),
                        "created_timestamp": now,
                        "last_updated_timestamp": now,
                        "latest_version": channel.releases.first().map(|r| r.version.clone()),
                        "current": channel.current,
                        "visible": true,
                        "channel_type": channel_type_label(channel.channel_type),
                    })
                })
                .collect();

            documents.insert(
                format!("packages/{}/index.json", bundle.name),
                serde_json::json!({
                    "format_version": "1.0",
                    "name": bundle.name,
                    "created_timestamp": now,
                    "last_updated_timestamp": now,
                    "description": [format!("a fixture bundle named {}", bundle.name)],
                    "current_version": serde_json::Value::Null,
                    "package_names": {},
                    "channel_aliases": {},
                    "channels": channel_entries,
                }),
            );

            for channel in &bundle.channels {
                let releases: Vec<serde_json::Value> = channel
                    .releases
                    .iter()
                    .map(|release| {
                        serde_json::json!({
                            "version": release.version,
                            "type": release_type_label(release.release_type),
                            "visible": release.visible,
                        })
                    })
                    .collect();

                documents.insert(
                    format!("packages/{}/{}.json", bundle.name, channel.name),
                    serde_json::json!({
                        "format_version": "1.0",
                        "releases": releases,
                        "package_rules": channel.rules,
                    }),
                );
            }
        }

        FixtureRepository { documents }
    }
}

fn channel_type_label(channel_type: ChannelType) -> &'static str {
    match channel_type {
        ChannelType::Release => "release",
        ChannelType::Prerelease => "prerelease",
    }
}

fn release_type_label(release_type: rbpkg_repo::ReleaseType) -> &'static str {
    use rbpkg_repo::ReleaseType;
    match release_type {
        ReleaseType::Alpha => "alpha",
        ReleaseType::Beta => "beta",
        ReleaseType::Rc => "rc",
        ReleaseType::Stable => "stable",
    }
}

struct BuiltBundle {
    name: String,
    channels: Vec<BuiltChannel>,
}

struct BuiltChannel {
    name: String,
    channel_type: ChannelType,
    current: bool,
    releases: Vec<Release>,
    rules: Vec<rbpkg_repo::PackageRules>,
}

/// Accumulates channels for one bundle under construction. See
/// [`FixtureRepositoryBuilder::bundle`].
pub struct BundleBuilder {
    name: String,
    channels: Vec<BuiltChannel>,
}

impl BundleBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            channels: Vec::new(),
        }
    }

    /// Adds a `release`-type channel built up by `f`.
    pub fn channel(self, name: &str, f: impl FnOnce(ChannelBuilder) -> ChannelBuilder) -> Self {
        self.channel_with(name, ChannelType::Release, f)
    }

    /// Adds a channel of the given stability tier, built up by `f`.
    pub fn channel_with(
        mut self,
        name: &str,
        channel_type: ChannelType,
        f: impl FnOnce(ChannelBuilder) -> ChannelBuilder,
    ) -> Self {
        let is_first = self.channels.is_empty();
        let built = f(ChannelBuilder::new(name, channel_type, self.name.clone())).finish(is_first);
        self.channels.push(built);
        self
    }

    fn finish(self) -> BuiltBundle {
        BuiltBundle {
            name: self.name,
            channels: self.channels,
        }
    }
}

/// Accumulates releases and rules for one channel under construction. See
/// [`BundleBuilder::channel`].
pub struct ChannelBuilder {
    name: String,
    channel_type: ChannelType,
    default_package_name: String,
    releases: Vec<Release>,
    rules: Vec<rbpkg_repo::PackageRules>,
}

impl ChannelBuilder {
    fn new(name: &str, channel_type: ChannelType, default_package_name: String) -> Self {
        Self {
            name: name.to_string(),
            channel_type,
            default_package_name,
            releases: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Declares a release at `version`, returning a builder whose
    /// [`ReleaseBuilder::rule`] attaches the release's install rule and
    /// returns to this channel.
    pub fn release(self, version: &str) -> ReleaseBuilder {
        ReleaseBuilder {
            channel: self,
            version: version.to_string(),
            release_type: rbpkg_repo::ReleaseType::Stable,
            visible: true,
        }
    }

    fn finish(self, current: bool) -> BuiltChannel {
        BuiltChannel {
            name: self.name,
            channel_type: self.channel_type,
            current,
            releases: self.releases,
            rules: self.rules,
        }
    }
}

/// A release declared with [`ChannelBuilder::release`], awaiting the rule
/// that makes it installable.
pub struct ReleaseBuilder {
    channel: ChannelBuilder,
    version: String,
    release_type: rbpkg_repo::ReleaseType,
    visible: bool,
}

impl ReleaseBuilder {
    /// Marks this release as a non-stable maturity tier (default
    /// [`rbpkg_repo::ReleaseType::Stable`]).
    pub fn release_type(mut self, release_type: rbpkg_repo::ReleaseType) -> Self {
        self.release_type = release_type;
        self
    }

    /// Marks this release as hidden from selection (default visible).
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Attaches the install rule for this release (built up by `f`,
    /// starting from a rule whose `version_range` is this release's exact
    /// version) and returns to the owning channel so further releases and
    /// rules can be added.
    pub fn rule(mut self, f: impl FnOnce(RuleBuilder) -> RuleBuilder) -> ChannelBuilder {
        self.channel.releases.push(Release {
            version: self.version.clone(),
            release_type: self.release_type,
            visible: self.visible,
            release_notes_url: None,
        });
        let rule = f(RuleBuilder::new(
            self.version,
            self.channel.default_package_name.clone(),
        ))
        .build();
        self.channel.rules.push(rule);
        self.channel
    }
}

/// Builds one [`rbpkg_repo::PackageRules`] entry. See
/// [`ReleaseBuilder::rule`].
pub struct RuleBuilder {
    version_range: String,
    systems: Vec<String>,
    package_type: PackageType,
    package_name: String,
    required: Vec<String>,
    recommended: Vec<String>,
    optional: Vec<String>,
}

impl RuleBuilder {
    fn new(version_range: String, default_package_name: String) -> Self {
        Self {
            version_range,
            systems: vec!["*".to_string()],
            package_type: PackageType::Rpm,
            package_name: default_package_name,
            required: Vec::new(),
            recommended: Vec::new(),
            optional: Vec::new(),
        }
    }

    /// Sets the kind of artifact this rule installs (default
    /// [`PackageType::Rpm`]).
    pub fn package_type(mut self, package_type: PackageType) -> Self {
        self.package_type = package_type;
        self
    }

    /// Overrides the package name (defaults to the owning bundle's name).
    pub fn package_name(mut self, package_name: &str) -> Self {
        self.package_name = package_name.to_string();
        self
    }

    /// Restricts this rule to the given system-selector expressions
    /// (default `["*"]`, matching any host).
    pub fn systems<I, S>(mut self, systems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.systems = systems.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the dependency specs that are always installed alongside this
    /// package.
    pub fn required<I, S>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required = specs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the dependency specs installed under `RECOMMENDED`/`ALL`.
    pub fn recommended<I, S>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recommended = specs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the dependency specs installed only under `ALL`.
    pub fn optional<I, S>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional = specs.into_iter().map(Into::into).collect();
        self
    }

    fn build(self) -> rbpkg_repo::PackageRules {
        rbpkg_repo::PackageRules {
            version_range: self.version_range,
            systems: self.systems,
            package_type: self.package_type,
            package_name: self.package_name,
            required: self.required,
            recommended: self.recommended,
            optional: self.optional,
            replaces: Vec::new(),
            pre_install_commands: Vec::new(),
            install_commands: Vec::new(),
            post_install_commands: Vec::new(),
            uninstall_commands: Vec::new(),
            install_flags: Vec::new(),
        }
    }
}

/// A fully-built in-memory repository, ready to be installed as the
/// process-wide data loader for a test via
/// [`FixtureRepository::install_as_global_repository`].
pub struct FixtureRepository {
    documents: HashMap<String, serde_json::Value>,
}

impl FixtureRepository {
    /// Starts building a fixture repository.
    pub fn builder() -> FixtureRepositoryBuilder {
        FixtureRepositoryBuilder::default()
    }

    /// Installs this fixture's documents as the process-wide data loader
    /// and returns a fresh [`PackageRepository`] backed by them.
    ///
    /// The returned guard holds a lock serializing access to the
    /// process-wide loader slot across concurrently-running tests in the
    /// same test binary; dropping it clears the loader again.
    pub fn install_as_global_repository(&self) -> InstalledRepository {
        let guard = global_loader_lock()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let loader = rbpkg_loader::InMemoryDataLoader::new(self.documents.clone());
        rbpkg_loader::set_data_loader(Some(std::sync::Arc::new(loader)));

        InstalledRepository {
            _guard: guard,
            repository: Rc::new(PackageRepository::new()),
        }
    }

    /// Looks up `bundle_name`/`channel_name`/`version` through `repository`
    /// (which must have been obtained from
    /// [`Self::install_as_global_repository`] on this same fixture) and
    /// returns a [`PackageSelection`] ready to hand to
    /// `rbpkg_resolver::PendingInstall::add_package`.
    ///
    /// # Panics
    ///
    /// Panics (via `expect`) if the bundle, channel, or release doesn't
    /// exist — this is a test-fixture convenience, not a production API.
    pub fn select(
        &self,
        repository: &PackageRepository,
        bundle_name: &str,
        channel_name: &str,
        version: &str,
    ) -> PackageSelection {
        let loader =
            rbpkg_loader::get_data_loader().expect("fixture loader should be installed");
        let bundle: Rc<RefCell<Bundle>> = repository
            .lookup_package_bundle(bundle_name)
            .unwrap_or_else(|e| panic!("fixture bundle \"{bundle_name}\" should exist: {e}"));

        let (channel_type, release) = {
            let mut bundle_mut = bundle.borrow_mut();
            let channel: &mut Channel = bundle_mut
                .get_channel(&*loader, channel_name)
                .unwrap_or_else(|e| panic!("loading channel \"{channel_name}\" failed: {e}"))
                .unwrap_or_else(|| panic!("fixture channel \"{channel_name}\" should exist"));

            let release = channel
                .releases(&*loader)
                .unwrap_or_else(|e| panic!("loading releases failed: {e}"))
                .iter()
                .find(|r| r.version == version)
                .unwrap_or_else(|| panic!("fixture release \"{version}\" should exist"))
                .clone();

            (channel.channel_type, release)
        };

        PackageSelection {
            bundle_name: bundle_name.to_string(),
            bundle,
            channel_name: channel_name.to_string(),
            channel_type,
            release,
        }
    }
}

/// A [`PackageRepository`] backed by a fixture's documents, holding the
/// lock that serializes access to the process-wide data loader slot for
/// as long as it's alive.
pub struct InstalledRepository {
    _guard: MutexGuard<'static, ()>,
    repository: Rc<PackageRepository>,
}

impl Deref for InstalledRepository {
    type Target = Rc<PackageRepository>;

    fn deref(&self) -> &Rc<PackageRepository> {
        &self.repository
    }
}

impl Drop for InstalledRepository {
    fn drop(&mut self) {
        rbpkg_loader::set_data_loader(None);
    }
}
