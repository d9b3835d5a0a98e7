//! User-facing app classification.
//!
//! Both the event path and the aggregate path run every package through the
//! same filter so that their totals stay comparable.

use crate::source::PackageMetadata;
use crate::types::AppId;

/// Namespaces owned by the OS itself. Packages under them are noise unless
/// allow-listed.
const SYSTEM_NAMESPACES: &[&str] = &["android.", "com.android.", "com.google.android."];

/// Dotted name segments that mark a secondary process or component of a
/// package rather than the package itself.
const COMPONENT_SEGMENTS: &[&str] = &["service", "provider", "remote", "background"];

/// System-flagged packages that are nonetheless user-facing.
const ALLOWED_SYSTEM_APPS: &[&str] = &[
    // Browsers
    "com.android.chrome",
    "com.chrome.beta",
    "com.chrome.dev",
    "org.mozilla.firefox",
    // Google apps
    "com.google.android.youtube",
    "com.google.android.gm",
    "com.google.android.apps.maps",
    "com.google.android.apps.photos",
    "com.google.android.apps.drive",
    "com.android.vending",
    // Communication
    "com.whatsapp",
    "com.facebook.orca",
    "com.instagram.android",
    "com.facebook.katana",
    "com.twitter.android",
    // Entertainment
    "com.spotify.music",
    "com.netflix.mediaclient",
    "com.zhiliaoapp.musically",
    // Utilities
    "com.android.settings",
    "com.android.calculator2",
    "com.android.calendar",
    "com.android.deskclock",
    "com.android.camera2",
    "com.google.android.apps.wellbeing",
];

/// Returns true if `app_id` is on the user-facing system app allow-list.
pub fn is_allow_listed(app_id: &str) -> bool {
    ALLOWED_SYSTEM_APPS.contains(&app_id)
}

/// Returns true if `app_id` names a secondary process or component.
fn is_component_process(app_id: &str) -> bool {
    if app_id.contains(':') {
        return true;
    }
    app_id
        .split('.')
        .skip(1)
        .any(|segment| COMPONENT_SEGMENTS.contains(&segment))
}

/// Returns true if `app_id` sits in an OS-internal namespace.
fn is_system_namespace(app_id: &str) -> bool {
    app_id == "android"
        || SYSTEM_NAMESPACES
            .iter()
            .any(|prefix| app_id.starts_with(prefix))
}

/// Decides whether a package is a real user-facing app.
///
/// Rules, first match wins:
/// 1. Secondary processes and components are rejected.
/// 2. OS-internal namespaces are rejected unless allow-listed.
/// 3. Launchable, non-system packages are accepted.
/// 4. Launchable system packages are accepted only if allow-listed.
/// 5. Everything else is rejected.
pub fn is_tracked_app(app_id: &str, has_launcher_entry: bool, is_system_package: bool) -> bool {
    if is_component_process(app_id) {
        return false;
    }
    if is_system_namespace(app_id) && !is_allow_listed(app_id) {
        return false;
    }
    match (has_launcher_entry, is_system_package) {
        (true, false) => true,
        (true, true) => is_allow_listed(app_id),
        (false, _) => false,
    }
}

/// Applies [`is_tracked_app`] using installed-package facts.
#[derive(Debug, Clone, Copy)]
pub struct AppFilter<M> {
    packages: M,
}

impl<M: PackageMetadata> AppFilter<M> {
    pub const fn new(packages: M) -> Self {
        Self { packages }
    }

    /// Returns true if usage of `app` should be counted.
    pub fn is_tracked(&self, app: &AppId) -> bool {
        let app_id = app.as_str();
        let tracked = is_tracked_app(
            app_id,
            self.packages.has_launcher_entry(app),
            self.packages.is_system_package(app),
        );
        if !tracked {
            tracing::trace!(app = app_id, "package filtered out");
        }
        tracked
    }
}
