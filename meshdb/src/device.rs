//! Device records as returned by the control plane, plus what the local
//! status command adds when run from inside the tailnet.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Indexable;

/// Attribute marking a device that offers itself as an exit node.
pub const EXIT_ATTR: &str = "+exit";
/// Attribute marking a device that does not.
pub const NO_EXIT_ATTR: &str = "-exit";

const TAG_LABEL: &str = "tag:";

/// A device on the tailnet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub node_key: String,
    /// Fully qualified DNS name, e.g. `blade.tail372c.ts.net`.
    pub name: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub client_version: String,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub authorized: bool,
    #[serde(default)]
    pub update_available: bool,
    #[serde(default)]
    pub key_expiry_disabled: bool,
    #[serde(default)]
    pub blocks_incoming_connections: bool,
    #[serde(default, with = "lenient_time")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default, with = "lenient_time")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, with = "lenient_time")]
    pub expires: Option<DateTime<Utc>>,
    /// Joined from the local status command; absent outside the tailnet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enriched_info: Option<EnrichedInfo>,
}

/// Extra per-device state only the local node knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedInfo {
    #[serde(default)]
    pub dns_name: String,
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub has_exit_node_option: bool,
}

impl Device {
    /// Name up to the first dot: `blade.tail372c.ts.net` -> `blade`.
    pub fn short_name(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }

    /// Client version up to the first dash: `1.56.1-t1234-gabc` -> `1.56.1`.
    pub fn version(&self) -> &str {
        self.client_version
            .split('-')
            .next()
            .unwrap_or(&self.client_version)
    }

    /// Tags without their `tag:` label.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .map(|t| t.strip_prefix(TAG_LABEL).unwrap_or(t))
    }

    pub fn is_exit_node(&self) -> bool {
        self.enriched_info
            .as_ref()
            .is_some_and(|e| e.has_exit_node_option)
    }

    pub fn is_online(&self) -> bool {
        self.enriched_info.as_ref().is_some_and(|e| e.online)
    }

    /// Flatten into the lower-cased set a filter expression is evaluated
    /// against.
    pub fn attributes(&self) -> HashSet<String> {
        let mut attrs: HashSet<String> = self.tags().map(str::to_lowercase).collect();

        attrs.insert(self.user.to_lowercase());
        attrs.insert(self.os.to_lowercase());
        attrs.insert(self.version().to_lowercase());
        attrs.extend(self.addresses.iter().cloned());

        let exit = if self.is_exit_node() {
            EXIT_ATTR
        } else {
            NO_EXIT_ATTR
        };
        attrs.insert(exit.to_string());

        attrs
    }
}

impl Indexable for Device {
    fn key(&self) -> &str {
        &self.name
    }
}

/// Timestamps from the API are RFC 3339 but may be empty or missing.
mod lenient_time {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|ts| ts.with_timezone(&Utc))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> Device {
        Device {
            name: "blade.tail372c.ts.net".to_string(),
            user: "User@Gmail.com".to_string(),
            os: "Linux".to_string(),
            client_version: "1.56.1-t0a1b2c3-gdeadbeef".to_string(),
            addresses: vec!["100.64.0.1".to_string(), "fd7a:115c:a1e0::1".to_string()],
            tags: vec!["tag:Web".to_string(), "tag:prod".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_short_name_and_version() {
        let dev = device();
        assert_eq!(dev.short_name(), "blade");
        assert_eq!(dev.version(), "1.56.1");
        assert_eq!(dev.key(), "blade.tail372c.ts.net");
    }

    #[test]
    fn test_attributes() {
        let attrs = device().attributes();
        let mut sorted: Vec<&str> = attrs.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        assert_eq!(
            sorted,
            vec![
                "-exit",
                "1.56.1",
                "100.64.0.1",
                "fd7a:115c:a1e0::1",
                "linux",
                "prod",
                "user@gmail.com",
                "web",
            ]
        );
    }

    #[test]
    fn test_exit_marker_from_enrichment() {
        let mut dev = device();
        dev.enriched_info = Some(EnrichedInfo {
            has_exit_node_option: true,
            ..Default::default()
        });
        let attrs = dev.attributes();
        assert!(attrs.contains(EXIT_ATTR));
        assert!(!attrs.contains(NO_EXIT_ATTR));
    }

    #[test]
    fn test_deserialize_api_record() {
        let json = r#"{
            "addresses": ["100.101.102.103"],
            "authorized": true,
            "clientVersion": "1.60.0-t123",
            "hostname": "blade",
            "id": "1234",
            "lastSeen": "2024-01-02T03:04:05Z",
            "expires": "",
            "name": "blade.tail372c.ts.net",
            "nodeKey": "nodekey:abc",
            "os": "linux",
            "tags": ["tag:server"],
            "user": "someone@example.com"
        }"#;
        let dev: Device = serde_json::from_str(json).unwrap();
        assert_eq!(dev.node_key, "nodekey:abc");
        assert!(dev.authorized);
        assert!(dev.last_seen.is_some());
        assert!(dev.expires.is_none());
        assert!(dev.enriched_info.is_none());

        // Survives a round trip through the index encoding.
        let encoded = serde_json::to_string(&dev).unwrap();
        let decoded: Device = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, dev);
    }
}
