//! Archive configuration.

use crate::format::Zip64Policy;

/// Options fixed when a [`ZipArchive`](crate::ZipArchive) is opened.
///
/// # Example
///
/// ```rust,no_run
/// use zipsplice::{ArchiveOptions, Zip64Policy, ZipArchive};
///
/// let options = ArchiveOptions::new().zip64_policy(Zip64Policy::Forbid);
/// let archive = ZipArchive::open_with_options("legacy.zip", options)?;
/// # Ok::<(), zipsplice::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct ArchiveOptions {
    /// Whether Zip64 structures may be read and written.
    pub zip64_policy: Zip64Policy,
}

impl ArchiveOptions {
    /// Creates options with defaults: Zip64 allowed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the Zip64 policy.
    ///
    /// With [`Zip64Policy::Forbid`], opening a Zip64 archive, adding an entry
    /// that needs Zip64 fields and closing an archive that needs a Zip64
    /// footer all fail.
    pub fn zip64_policy(mut self, policy: Zip64Policy) -> Self {
        self.zip64_policy = policy;
        self
    }
}
