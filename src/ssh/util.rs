//! Path helpers for SSH settings.

use camino::Utf8PathBuf;

/// Resolves a leading `~/` against `HOME`.
///
/// Paths without the prefix, or a `HOME` that is unset or not UTF-8, are
/// returned as given.
///
/// # Examples
///
/// ```
/// # use labstack::ssh::expand_tilde;
/// let home = std::env::var("HOME").expect("HOME should be set");
/// assert_eq!(expand_tilde("~/.labstack/keys"), format!("{home}/.labstack/keys"));
/// assert_eq!(expand_tilde("/var/lib/labstack"), "/var/lib/labstack");
/// ```
#[must_use]
pub fn expand_tilde(path: &str) -> Utf8PathBuf {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(relative), Ok(home)) => Utf8PathBuf::from(home).join(relative),
        _ => Utf8PathBuf::from(path),
    }
}
