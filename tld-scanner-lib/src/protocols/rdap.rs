//! RDAP (Registration Data Access Protocol) lookups.
//!
//! RDAP answers with structured JSON. The registrant organization comes from
//! the vCard of the entity carrying the `registrant` role.

use crate::error::ScanError;
use crate::protocols::registry::{extract_tld, get_rdap_endpoint};
use crate::types::DomainRecord;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// HTTP client for RDAP registries.
#[derive(Clone)]
pub struct RdapClient {
    http_client: reqwest::Client,
    /// Whether to consult the IANA bootstrap registry for unknown TLDs
    use_bootstrap: bool,
}

impl RdapClient {
    /// Create a client whose requests give up after `timeout`.
    pub fn with_config(timeout: Duration, use_bootstrap: bool) -> Result<Self, ScanError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tld-scanner/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ScanError::network_with_source("Failed to create RDAP HTTP client", e.to_string())
            })?;

        Ok(Self {
            http_client,
            use_bootstrap,
        })
    }

    /// Fetch and parse the registration record for `domain`.
    ///
    /// # Errors
    ///
    /// - [`ScanError::NoData`] when the registry answers 404
    /// - [`ScanError::BootstrapError`] when no RDAP endpoint is known for the TLD
    /// - [`ScanError::RdapError`] for transport failures and other HTTP statuses
    pub async fn query(&self, domain: &str) -> Result<DomainRecord, ScanError> {
        let tld = extract_tld(domain)?;
        let endpoint = get_rdap_endpoint(&tld, self.use_bootstrap).await?;
        let url = format!("{}{}", endpoint, domain);

        debug!(domain, url = %url, "Sending RDAP request");

        let response = self
            .http_client
            .get(&url)
            .header("Accept", "application/rdap+json, application/json")
            .send()
            .await
            .map_err(|e| ScanError::rdap(domain, format!("Request failed: {}", e)))?;

        match response.status() {
            StatusCode::OK => {
                let json = response
                    .json::<Value>()
                    .await
                    .map_err(|e| ScanError::rdap(domain, format!("Failed to parse JSON: {}", e)))?;
                Ok(extract_record(domain, &json))
            }
            StatusCode::NOT_FOUND => Err(ScanError::no_data(domain)),
            code => Err(ScanError::rdap_with_status(
                domain,
                format!("RDAP server returned {}", code),
                code.as_u16(),
            )),
        }
    }
}

/// Build a [`DomainRecord`] from an RDAP domain object.
pub fn extract_record(domain: &str, json: &Value) -> DomainRecord {
    let mut record = DomainRecord::new(domain);

    for entity in array(json, "entities") {
        if has_role(entity, "registrant") && record.organization.is_empty() {
            if let Some(org) = vcard_value(entity, "org").or_else(|| vcard_value(entity, "fn")) {
                record.organization = org;
            }
        }
        if has_role(entity, "registrar") && record.registrar.is_empty() {
            if let Some(name) = vcard_value(entity, "fn").or_else(|| entity_identifier(entity)) {
                record.registrar = name;
            }
        }
    }

    for event in array(json, "events") {
        let action = event.get("eventAction").and_then(Value::as_str);
        let date = event.get("eventDate").and_then(Value::as_str);
        match (action, date) {
            (Some("registration"), Some(date)) => record.created_date = date.to_string(),
            (Some("expiration"), Some(date)) => record.expiry_date = date.to_string(),
            _ => {}
        }
    }

    record.status = array(json, "status")
        .filter_map(Value::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    record.name_servers = array(json, "nameservers")
        .filter_map(|ns| ns.get("ldhName").and_then(Value::as_str))
        .map(|name| name.to_lowercase())
        .collect();

    record
}

fn array<'a>(json: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    json.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn has_role(entity: &Value, role: &str) -> bool {
    array(entity, "roles").any(|r| r.as_str() == Some(role))
}

/// First non-empty value of a vCard property, e.g. `["org", {}, "text", "Acme"]`.
///
/// Structured values (`org` may list organizational units) yield their first
/// component.
fn vcard_value(entity: &Value, property: &str) -> Option<String> {
    let items = entity
        .get("vcardArray")
        .and_then(Value::as_array)
        .and_then(|v| v.get(1))
        .and_then(Value::as_array)?;

    items
        .iter()
        .filter_map(Value::as_array)
        .filter(|item| item.first().and_then(Value::as_str) == Some(property))
        .filter_map(|item| match item.get(3)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Array(parts) => parts.first()?.as_str().map(|s| s.trim().to_string()),
            _ => None,
        })
        .find(|s| !s.is_empty())
}

/// Registrar name fallback: public ID, then handle, then name.
fn entity_identifier(entity: &Value) -> Option<String> {
    array(entity, "publicIds")
        .find_map(|id| id.get("identifier").and_then(Value::as_str))
        .or_else(|| entity.get("handle").and_then(Value::as_str))
        .or_else(|| entity.get("name").and_then(Value::as_str))
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "ldhName": "EXAMPLE.COM",
            "entities": [
                {
                    "roles": ["registrar"],
                    "vcardArray": ["vcard", [["version", {}, "text", "4.0"], ["fn", {}, "text", "Example Registrar, Inc."]]],
                    "entities": [{"roles": ["abuse"]}]
                },
                {
                    "roles": ["registrant"],
                    "vcardArray": ["vcard", [
                        ["fn", {}, "text", "Jane Doe"],
                        ["org", {}, "text", "Example Corp"]
                    ]]
                }
            ],
            "events": [
                {"eventAction": "registration", "eventDate": "1995-08-14T04:00:00Z"},
                {"eventAction": "expiration", "eventDate": "2030-08-13T04:00:00Z"},
                {"eventAction": "last changed", "eventDate": "2024-08-14T07:01:34Z"}
            ],
            "status": ["client delete prohibited", "client transfer prohibited"],
            "nameservers": [{"ldhName": "A.IANA-SERVERS.NET"}, {"ldhName": "B.IANA-SERVERS.NET"}]
        })
    }

    #[test]
    fn test_extract_record() {
        let record = extract_record("example.com", &sample());
        assert_eq!(record.domain, "example.com");
        assert_eq!(record.organization, "Example Corp");
        assert_eq!(record.registrar, "Example Registrar, Inc.");
        assert_eq!(record.created_date, "1995-08-14T04:00:00Z");
        assert_eq!(record.expiry_date, "2030-08-13T04:00:00Z");
        assert_eq!(
            record.status,
            "client delete prohibited, client transfer prohibited"
        );
        assert_eq!(
            record.name_servers,
            vec!["a.iana-servers.net", "b.iana-servers.net"]
        );
        assert!(record.error.is_none());
    }

    #[test]
    fn test_registrant_falls_back_to_fn() {
        let json = json!({
            "entities": [{
                "roles": ["registrant", "administrative"],
                "vcardArray": ["vcard", [["fn", {}, "text", "Acme Holdings"]]]
            }]
        });
        assert_eq!(extract_record("acme.io", &json).organization, "Acme Holdings");
    }

    #[test]
    fn test_structured_org_value() {
        let json = json!({
            "entities": [{
                "roles": ["registrant"],
                "vcardArray": ["vcard", [["org", {}, "text", ["Acme Inc", "Legal"]]]]
            }]
        });
        assert_eq!(extract_record("acme.io", &json).organization, "Acme Inc");
    }

    #[test]
    fn test_missing_sections_leave_fields_empty() {
        let record = extract_record("bare.net", &json!({}));
        assert!(record.organization.is_empty());
        assert!(record.registrar.is_empty());
        assert!(record.status.is_empty());
        assert!(record.name_servers.is_empty());
    }

    #[test]
    fn test_registrar_identifier_fallback() {
        let json = json!({
            "entities": [{
                "roles": ["registrar"],
                "publicIds": [{"type": "IANA Registrar ID", "identifier": "292"}]
            }]
        });
        assert_eq!(extract_record("a.com", &json).registrar, "292");
    }

    #[test]
    fn test_thin_registry_answer_has_no_organization() {
        // .com/.net registries publish the registrar and a link to its RDAP service
        let json = json!({
            "entities": [{
                "roles": ["registrar"],
                "vcardArray": ["vcard", [["fn", {}, "text", "MarkMonitor Inc."]]]
            }],
            "links": [{
                "rel": "related",
                "href": "https://rdap.markmonitor.com/rdap/domain/GOOGLE.COM",
                "type": "application/rdap+json"
            }]
        });
        let record = extract_record("google.com", &json);
        assert_eq!(record.registrar, "MarkMonitor Inc.");
        assert!(record.organization.is_empty());
        assert!(record.error.is_none());
    }
}
