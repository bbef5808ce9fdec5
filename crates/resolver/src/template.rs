//! Reply template rendering.
//!
//! Templates carry a fixed set of named placeholders filled from the org
//! profile. Unresolved placeholders are left verbatim — a typo in a
//! template degrades visibly instead of erroring.

use balas_core::profile::OrgProfile;

/// Substitute the org-profile placeholders into a template.
pub fn render(template: &str, profile: &OrgProfile) -> String {
    template
        .replace("{companyName}", &profile.company_name)
        .replace("{business}", &profile.business)
        .replace("{phone}", &profile.phone)
        .replace("{email}", &profile.email)
        .replace("{address}", &profile.address)
        .replace("{operationalHours}", &profile.operational_hours)
}
