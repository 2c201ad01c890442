//! Event and container types as the Docker Engine API serialises them.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// `null` and missing are the same thing for the daemon's collections.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One record of the `/events` stream, before enrichment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    /// Image the container was created from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Unix timestamp in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
}

impl RawEvent {
    pub fn enrich(self, container: Container) -> Event {
        Event {
            id: self.id,
            status: self.status,
            from: self.from,
            time: self.time,
            container,
        }
    }
}

/// A lifecycle event together with the container it refers to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    pub container: Container,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Container {
    #[serde(alias = "ID")]
    pub id: String,
    pub name: String,
    pub image: String,
    pub config: Option<Config>,
    pub network_settings: Option<NetworkSettings>,
}

impl Container {
    /// The first label of the container hostname.
    pub fn host_id(&self) -> Option<&str> {
        let hostname = self.config.as_ref()?.hostname.as_str();
        Some(
            hostname
                .split_once('.')
                .map_or(hostname, |(label, _)| label),
        )
    }

    pub fn ip(&self) -> Option<&str> {
        self.network_settings
            .as_ref()
            .map(|settings| settings.ip_address.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Config {
    pub hostname: String,
    /// `KEY=VALUE` assignments in declaration order.
    #[serde(deserialize_with = "null_as_default")]
    pub env: Vec<String>,
}

impl Config {
    /// Value of the first `key=...` assignment in `env`.
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.iter().find_map(|assignment| {
            let (name, value) = assignment.split_once('=')?;
            (name == key).then_some(value)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct NetworkSettings {
    #[serde(rename = "IPAddress")]
    pub ip_address: String,
    /// Legacy mapping: container port spec -> protocol detail -> host binding.
    #[serde(deserialize_with = "null_as_default")]
    pub port_mapping: HashMap<String, HashMap<String, String>>,
    /// Container port spec (`80/tcp`) -> host bindings, `None` when exposed
    /// but not published.
    #[serde(deserialize_with = "null_as_default")]
    pub ports: HashMap<String, Option<Vec<PortBinding>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortBinding {
    #[serde(rename = "HostIp")]
    pub host_ip: String,
    #[serde(rename = "HostPort")]
    pub host_port: String,
}
