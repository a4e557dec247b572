//! Thin RESTCONF client for the NSO device-management API.
//!
//! Every operation is gated by the `NSO_ENABLED` flag and fails with
//! [`NsoError::Disabled`] when NSO is switched off for this deployment.

use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};
use url::form_urlencoded;

use crate::config::ExternalServiceSettings;
use crate::external::{ApiError, ApiRequest, ApiTransport, HttpTransport};

pub const SERVICES_ROOT_PATH: &str = "tailf-ncs:services";
pub const DEVICES_ROOT_PATH: &str = "tailf-ncs:devices";

const RESTCONF_DATA_ROOT: &str = "restconf/data";
const YANG_DATA_JSON: &str = "application/yang-data+json";
const NODE_INFO_FIELDS: &str =
    "name;address;port;description;authgroup;platform;state;device-type;service-list";

#[derive(Debug, Error)]
pub enum NsoError {
    #[error("NSO disabled")]
    Disabled,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("invalid NSO response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// RESTCONF `content` selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datastore {
    Config,
    NonConfig,
}

impl Datastore {
    pub fn as_str(&self) -> &'static str {
        match self {
            Datastore::Config => "config",
            Datastore::NonConfig => "nonconfig",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NsoClient {
    transport: HttpTransport,
    enabled: bool,
}

impl NsoClient {
    pub fn new(transport: HttpTransport, enabled: bool) -> Self {
        Self { transport, enabled }
    }

    /// HTTPS client for the configured NSO host
    pub fn from_settings(settings: &ExternalServiceSettings) -> Result<Self, NsoError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!settings.nso_ssl_verify)
            .build()
            .map_err(ApiError::from)?;

        let base_url = format!("https://{}:{}", settings.nso_host, settings.nso_port);
        let transport = HttpTransport::new(http, base_url)
            .with_basic_auth(&settings.nso_user, &settings.nso_pass)
            .with_default_header("Accept", YANG_DATA_JSON)
            .with_default_header("Content-Type", YANG_DATA_JSON);

        Ok(Self::new(transport, settings.nso_enabled))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn ensure_enabled(&self) -> Result<(), NsoError> {
        if self.enabled {
            Ok(())
        } else {
            Err(NsoError::Disabled)
        }
    }

    fn data_request<P: AsRef<str>>(method: Method, path: &[P]) -> ApiRequest {
        let segments: Vec<&str> = path.iter().map(AsRef::as_ref).collect();
        ApiRequest::new(method, format!("{RESTCONF_DATA_ROOT}/{}", segments.join("/")))
    }

    /// Deploy a service to NSO
    pub async fn create<P: AsRef<str>>(&self, path: &[P], payload: &Value) -> Result<bool, NsoError> {
        self.ensure_enabled()?;
        debug!(payload = %payload, "NSO payload");

        let request = Self::data_request(Method::POST, path).with_json_body(payload.clone());
        self.transport.call_api(&request).await?;
        Ok(true)
    }

    /// Create or replace the data at `path` with the updated service parameters
    pub async fn update<P: AsRef<str>>(&self, path: &[P], payload: &Value) -> Result<bool, NsoError> {
        self.ensure_enabled()?;

        let request = Self::data_request(Method::PUT, path).with_json_body(payload.clone());
        self.transport.call_api(&request).await?;
        Ok(true)
    }

    pub async fn get<P: AsRef<str>>(
        &self,
        path: &[P],
        datastore: Option<Datastore>,
        params: &[(&str, String)],
    ) -> Result<Value, NsoError> {
        self.ensure_enabled()?;

        let mut request = Self::data_request(Method::GET, path);
        if let Some(datastore) = datastore {
            request = request.with_query_param("content", datastore.as_str());
        }
        for (name, value) in params {
            request = request.with_query_param(*name, value);
        }

        let response = self.transport.call_api(&request).await?;
        Ok(response.json()?)
    }

    /// Remove a path (usually a service) from the network
    pub async fn delete<P: AsRef<str>>(&self, path: &[P]) -> Result<bool, NsoError> {
        self.ensure_enabled()?;

        let request = Self::data_request(Method::DELETE, path);
        self.transport.call_api(&request).await?;
        Ok(true)
    }

    /// Invoke an action; returns the `<module>:output` member of the reply when present
    pub async fn call_operation<P: AsRef<str>>(
        &self,
        path: &[P],
        data: Option<Value>,
    ) -> Result<Value, NsoError> {
        self.ensure_enabled()?;

        let input = data.unwrap_or_else(|| json!({}));
        let request = Self::data_request(Method::POST, path).with_json_body(json!({ "input": input }));
        let response = self.transport.call_api(&request).await?;
        let body: Value = response.json()?;

        Ok(unwrap_operation_output(body))
    }

    pub async fn get_all_services(&self) -> Result<Value, NsoError> {
        let services = self
            .get(&[SERVICES_ROOT_PATH], Some(Datastore::Config), &[])
            .await?;
        Ok(services
            .get(SERVICES_ROOT_PATH)
            .cloned()
            .unwrap_or_else(|| json!({})))
    }

    pub async fn get_service(&self, service_type: &str, service_id: &str) -> Result<Value, NsoError> {
        self.get(
            &create_service_path(service_type, service_id),
            Some(Datastore::Config),
            &[],
        )
        .await
    }

    /// Query a device by name with a curated field selection
    pub async fn get_node_info(&self, node_name: &str) -> Result<Value, NsoError> {
        // Selecting everything makes NSO fail on invalid config payloads
        self.get(
            &create_node_path(node_name),
            None,
            &[
                ("depth", "3".to_string()),
                ("fields", NODE_INFO_FIELDS.to_string()),
            ],
        )
        .await
    }

    pub async fn set_node_unlocked(&self, node_name: &str) -> Result<(), NsoError> {
        let mut path = create_node_path(node_name);
        path.extend(["state".to_string(), "admin-state".to_string()]);

        self.update(&path, &json!({ "admin-state": "unlocked" }))
            .await?;
        Ok(())
    }

    /// Whether NSO considers the device configuration in sync
    pub async fn is_in_sync(&self, device_name: &str) -> Result<bool, NsoError> {
        let mut path = create_node_path(device_name);
        path.push("check-sync".to_string());

        let response = self.call_operation(&path, None).await?;
        let result = response.get("result").and_then(Value::as_str).unwrap_or_default();

        if result == "error" {
            let info = response
                .get("info")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            error!(device = %device_name, message = %info, "Could not check sync status.");
            return Err(NsoError::Api(ApiError::Status {
                status: StatusCode::BAD_REQUEST,
                reason: info,
                body: response.to_string(),
            }));
        }

        Ok(result == "in-sync")
    }
}

fn unwrap_operation_output(body: Value) -> Value {
    if let Value::Object(map) = &body {
        if let Some((_, output)) = map.iter().find(|(key, _)| key.ends_with(":output") || *key == "output") {
            return output.clone();
        }
    }
    body
}

pub fn create_node_path(node_name: &str) -> Vec<String> {
    vec![DEVICES_ROOT_PATH.to_string(), format!("device={node_name}")]
}

pub fn create_service_path(service_type: &str, service_id: &str) -> Vec<String> {
    let encoded_service_id: String = form_urlencoded::byte_serialize(service_id.as_bytes()).collect();
    vec![
        SERVICES_ROOT_PATH.to_string(),
        format!("{service_type}=\"{encoded_service_id}\""),
    ]
}

/// Recursively drop empty arrays, objects and strings
pub fn remove_empty_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter_map(|(key, value)| {
                    let cleaned = remove_empty_values(value);
                    (!is_empty_value(&cleaned)).then(|| (key.clone(), cleaned))
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(remove_empty_values)
                .filter(|cleaned| !is_empty_value(cleaned))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
