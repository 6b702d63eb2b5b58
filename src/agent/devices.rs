// Device catalog: periodically refreshed lookup table mapping device id
// to its human-readable name, used to render action results into speech.
// Modeled on the Python `DeviceCatalog.refresh` reference.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: String,
}

#[derive(Debug, Deserialize)]
struct DeviceListResponse {
    #[serde(default)]
    items: Vec<DeviceRecord>,
}

pub struct DeviceCatalog {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
    by_id: HashMap<String, DeviceRecord>,
}

impl DeviceCatalog {
    pub fn new(base_url: String, api_key: Option<String>, timeout_s: u64) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_s))
            .build()
            .context("failed to build device catalog http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
            by_id: HashMap::new(),
        })
    }

    pub fn refresh(&mut self) -> anyhow::Result<()> {
        let url = format!("{}/devices", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request.send().context("device catalog request failed")?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("device catalog request returned status {}", status);
        }

        let parsed: DeviceListResponse = response
            .json()
            .context("failed to parse device catalog response")?;

        let mut by_id = HashMap::new();
        for record in parsed.items {
            if record.id.is_empty() {
                continue;
            }
            by_id.insert(record.id.clone(), record);
        }

        tracing::debug!(count = by_id.len(), "devices.refreshed");
        self.by_id = by_id;
        Ok(())
    }

    pub fn name_for(&self, device_id: &str) -> String {
        self.by_id
            .get(device_id)
            .map(|d| d.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| device_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_for_unknown_device_falls_back_to_id() {
        let catalog = DeviceCatalog {
            base_url: "http://example.invalid".to_string(),
            api_key: None,
            client: reqwest::blocking::Client::new(),
            by_id: HashMap::new(),
        };
        assert_eq!(catalog.name_for("dev-1"), "dev-1");
    }

    #[test]
    fn test_name_for_known_device_uses_catalog_name() {
        let mut by_id = HashMap::new();
        by_id.insert(
            "dev-1".to_string(),
            DeviceRecord {
                id: "dev-1".to_string(),
                name: "客厅灯".to_string(),
                device_type: "light".to_string(),
            },
        );
        let catalog = DeviceCatalog {
            base_url: "http://example.invalid".to_string(),
            api_key: None,
            client: reqwest::blocking::Client::new(),
            by_id,
        };
        assert_eq!(catalog.name_for("dev-1"), "客厅灯");
    }

    #[test]
    fn test_deserialize_device_list_skips_empty_ids() {
        let json = r#"{"items": [{"id": "", "name": "ghost"}, {"id": "d2", "name": "台灯"}]}"#;
        let parsed: DeviceListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.items[1].id, "d2");
    }
}
