//! Organization profile — the fields substituted into reply templates and
//! AI instruction profiles.

use serde::{Deserialize, Serialize};

/// Organization identity presented to counterparties.
///
/// Stored in `bot-config.json`; the default carries the original
/// placeholder values so a fresh install renders visibly-unconfigured
/// templates instead of empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgProfile {
    pub company_name: String,
    pub business: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub operational_hours: String,
}

impl Default for OrgProfile {
    fn default() -> Self {
        Self {
            company_name: "[NAMA PERUSAHAAN]".into(),
            business: "[BIDANG USAHA]".into(),
            phone: "[+62xxx]".into(),
            email: "[email@perusahaan.com]".into(),
            address: "[Alamat Lengkap]".into(),
            operational_hours: "Senin-Jumat 08:00-17:00".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_has_placeholders() {
        let profile = OrgProfile::default();
        assert!(profile.company_name.starts_with('['));
        assert!(profile.phone.contains("+62"));
    }

    #[test]
    fn wire_format_is_camel_case() {
        let json = serde_json::to_value(OrgProfile::default()).unwrap();
        assert!(json.get("companyName").is_some());
        assert!(json.get("operationalHours").is_some());
        assert!(json.get("company_name").is_none());
    }
}
