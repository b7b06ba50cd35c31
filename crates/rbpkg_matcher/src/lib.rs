#![deny(missing_docs)]
//! Two pure predicates used throughout the rest of the workspace: does a
//! version satisfy a version-range expression, and does the running host
//! satisfy a list of system-selector expressions.
//!
//! Host identity (which distribution, which OS version) is the one piece
//! of global, side-effectful state either predicate needs. [`host`]
//! isolates that behind a cached detector and a settable override so the
//! rest of this crate, and everything built on it, stays unit-testable on
//! a single machine regardless of which platform the tests actually run
//! on.

mod host;
mod linux;
mod osx;
mod win;

use std::str::FromStr;

use pep440_rs::{Version, VersionSpecifiers};
use tracing::trace;

pub use host::{detect_host_info, host_info_override, set_host_info_override, HostInfo};

/// Returns `true` if `expr` matches `version`.
///
/// `expr` is either the literal `"*"`, which matches any version, or a
/// string of the shape `NAME<specifier>` where `<specifier>` is a
/// comma-separated list of clauses using the operators `==, !=, <, <=, >,
/// >=, ~=, ===`. The `NAME` prefix is optional: a bare specifier with no
/// name (e.g. `">=1.0,<=2.0"` or `"1.0"`) matches regardless of `name`.
///
/// When `name` is supplied and `expr` does carry a `NAME` prefix, the two
/// must be equal (case-insensitively) or this returns `false`.
///
/// Version ordering follows PEP 440 (pre-release, post-release, numeric
/// comparison), via [`pep440_rs`].
pub fn matches_version_range(version: &str, expr: &str, name: Option<&str>) -> bool {
    if expr == "*" {
        return true;
    }

    let (expr_name, specifier_text) = split_expr(expr);

    if let Some(expected) = name {
        match expr_name {
            Some(actual) if actual.eq_ignore_ascii_case(expected) => {}
            Some(_) => return false,
            None => {}
        }
    }

    if specifier_text.is_empty() {
        // A bare name with no specifier matches any version of that name.
        return true;
    }

    let Ok(version) = Version::from_str(version) else {
        trace!(version, "failed to parse version as PEP 440");
        return false;
    };

    let specifiers = match parse_specifiers(specifier_text) {
        Some(specifiers) => specifiers,
        None => {
            trace!(expr, "failed to parse version-range expression");
            return false;
        }
    };

    specifiers.contains(&version)
}

/// Returns `true` if `systems` matches the current host.
///
/// Each entry is a system expression of the shape `NAME<specifier>` (or
/// bare `NAME`, or `"*"`), matched via [`matches_version_range`] with the
/// host's name passed as `name`. Returns `true` as soon as any entry
/// matches; an empty list never matches.
pub fn matches_current_system<S: AsRef<str>>(systems: &[S]) -> bool {
    let host = host_info_override().unwrap_or_else(detect_host_info);
    systems.iter().any(|system| {
        system.as_ref() == "*"
            || matches_version_range(&host.version, system.as_ref(), Some(&host.name))
    })
}

/// Splits a dependency spec of the shape `NAME<specifier>` into its name
/// and specifier text.
///
/// Unlike a version-range or system-selector expression, a dependency spec
/// always carries a name; a spec with no parseable name prefix (malformed
/// input) falls back to treating the whole string as the name with an
/// empty specifier.
pub fn split_dependency_spec(spec: &str) -> (&str, &str) {
    match split_expr(spec) {
        (Some(name), specifier) => (name, specifier),
        (None, _) => (spec, ""),
    }
}

/// Splits a matcher expression into an optional leading `NAME` and the
/// remaining specifier text.
///
/// A leading alphabetic/underscore character starts a name, which runs up
/// to the first comparison-operator character. Anything else (a leading
/// digit, a leading operator, or an empty string) has no name: the whole
/// expression is specifier text.
fn split_expr(expr: &str) -> (Option<&str>, &str) {
    let starts_with_name = expr
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');

    if !starts_with_name {
        return (None, expr);
    }

    match expr.find(['=', '!', '<', '>', '~']) {
        Some(pos) => (Some(&expr[..pos]), &expr[pos..]),
        None => (Some(expr), ""),
    }
}

/// Parses specifier text into a [`VersionSpecifiers`].
///
/// Text with no leading comparison operator (e.g. `"1.0"`) is treated as
/// an exact-match shorthand for `"==1.0"`.
fn parse_specifiers(specifier_text: &str) -> Option<VersionSpecifiers> {
    let starts_with_operator = specifier_text
        .starts_with(['=', '!', '<', '>', '~']);

    if starts_with_operator {
        VersionSpecifiers::from_str(specifier_text).ok()
    } else {
        VersionSpecifiers::from_str(&format!("=={specifier_text}")).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_anything() {
        assert!(matches_version_range("9.9.9", "*", None));
        assert!(matches_version_range("0.0.1", "*", Some("whatever")));
    }

    #[test]
    fn bare_specifier_has_no_name_constraint() {
        assert!(matches_version_range("1.5", ">=1.0,<=2.0", None));
        assert!(!matches_version_range("2.5", ">=1.0,<=2.0", None));
    }

    #[test]
    fn bare_exact_version_shorthand() {
        assert!(matches_version_range("1.0", "1.0", None));
        assert!(!matches_version_range("1.1", "1.0", None));
    }

    #[test]
    fn name_prefixed_expr_checks_name() {
        assert!(matches_version_range(
            "18.04",
            "ubuntu>=18.04",
            Some("ubuntu")
        ));
        assert!(matches_version_range(
            "18.04",
            "Ubuntu>=18.04",
            Some("ubuntu")
        ));
        assert!(!matches_version_range(
            "18.04",
            "ubuntu>=18.04",
            Some("fedora")
        ));
    }

    #[test]
    fn name_only_expr_matches_any_version_of_that_name() {
        assert!(matches_version_range("anything", "ubuntu", Some("ubuntu")));
    }

    #[test]
    fn split_dependency_spec_separates_name_and_specifier() {
        assert_eq!(
            split_dependency_spec("widget>=1.0,<2.0"),
            ("widget", ">=1.0,<2.0")
        );
        assert_eq!(split_dependency_spec("widget"), ("widget", ""));
    }

    #[test]
    fn current_system_matches_star_without_detecting_host() {
        assert!(matches_current_system(&["*"]));
    }

    // Both assertions share one override install/clear since
    // `HostInfo` override state is process-wide and tests run
    // concurrently by default.
    #[test]
    fn current_system_uses_override() {
        let _guard = host::override_test_lock()
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());

        set_host_info_override(Some(HostInfo::new("ubuntu", "20.04")));

        assert!(matches_current_system(&["ubuntu>=18.04"]));
        assert!(!matches_current_system(&["fedora>=30"]));
        assert!(!matches_current_system(&["ubuntu>=22.04"]));
        let systems: &[&str] = &[];
        assert!(!matches_current_system(systems));

        set_host_info_override(None);
    }
}
