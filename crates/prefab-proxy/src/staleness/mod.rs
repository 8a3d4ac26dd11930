//! Mtime-based staleness detection for templates.
//!
//! A template's version is the last-modification time of its backing content.
//! Queries are pure: nothing here touches proxy state.

use crate::api::TemplateResolver;
use crate::types::{TemplateId, TemplateVersion};
use std::path::Path;
use std::time::SystemTime;

/// Result of a staleness query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Staleness {
    pub changed: bool,
    /// Current version; `None` for a missing or unresolvable template.
    pub version: Option<TemplateVersion>,
}

impl Staleness {
    const NO_TEMPLATE: Self = Self {
        changed: false,
        version: None,
    };
}

pub struct TemplateStaleness;

impl TemplateStaleness {
    /// Current version of `template`, if it resolves and has a readable mtime.
    pub fn current_version<R: TemplateResolver + ?Sized>(
        resolver: &R,
        template: Option<TemplateId>,
    ) -> Option<TemplateVersion> {
        let info = resolver.resolve(template?)?;
        info.modified.map(TemplateVersion)
    }

    /// Compare the template's current version against `last_observed`.
    ///
    /// A null or unresolvable template is "no template": never changed.
    pub fn has_changed<R: TemplateResolver + ?Sized>(
        resolver: &R,
        template: Option<TemplateId>,
        last_observed: Option<TemplateVersion>,
    ) -> Staleness {
        let Some(version) = Self::current_version(resolver, template) else {
            return Staleness::NO_TEMPLATE;
        };
        Staleness {
            changed: last_observed != Some(version),
            version: Some(version),
        }
    }
}

/// Get the modification time of a file
///
/// Returns `None` if the file doesn't exist or mtime cannot be read
pub fn mtime_of(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}
