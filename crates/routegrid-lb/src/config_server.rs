//! HTTP client for zone config servers.
//!
//! Queries `GET http://{config_server}/loadbalancers/v1/` and decodes:
//!
//! ```json
//! {"loadBalancers": [{"tenant": "t1", "application": "app1", "instance": "default",
//!   "cluster": "default", "hostname": "lb-1.elb.example.com",
//!   "dnsZone": "Z1", "rotations": ["r1"]}]}
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use routegrid_core::config::ZoneConfig;
use routegrid_core::{
    ApplicationId, ClusterId, CoreError, DnsZone, HostName, LoadBalancer, RotationName, ZoneId,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{SourceError, SourceResult};
use crate::source::LoadBalancerSource;

const LOAD_BALANCERS_PATH: &str = "/loadbalancers/v1/";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadBalancerList {
    #[serde(default)]
    load_balancers: Vec<LoadBalancerEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadBalancerEntry {
    tenant: String,
    application: String,
    #[serde(default = "default_instance")]
    instance: String,
    cluster: String,
    hostname: String,
    #[serde(default)]
    dns_zone: Option<String>,
    #[serde(default)]
    rotations: Vec<String>,
}

fn default_instance() -> String {
    ApplicationId::DEFAULT_INSTANCE.to_string()
}

impl TryFrom<LoadBalancerEntry> for LoadBalancer {
    type Error = CoreError;

    fn try_from(entry: LoadBalancerEntry) -> Result<Self, Self::Error> {
        Ok(LoadBalancer {
            application: ApplicationId::try_new(entry.tenant, entry.application, entry.instance)?,
            cluster: ClusterId::new(entry.cluster),
            hostname: HostName::new(entry.hostname),
            dns_zone: entry.dns_zone.map(DnsZone::new),
            rotations: entry.rotations.into_iter().map(RotationName::new).collect(),
        })
    }
}

/// Decode a config-server load balancer listing, preserving its order.
///
/// Entries with an invalid application id are dropped with a warning.
pub fn decode_load_balancers(body: &[u8]) -> SourceResult<Vec<LoadBalancer>> {
    let list: LoadBalancerList =
        serde_json::from_slice(body).map_err(|e| SourceError::Decode(e.to_string()))?;
    let mut load_balancers = Vec::with_capacity(list.load_balancers.len());
    for entry in list.load_balancers {
        let hostname = entry.hostname.clone();
        match LoadBalancer::try_from(entry) {
            Ok(load_balancer) => load_balancers.push(load_balancer),
            Err(e) => warn!(%hostname, error = %e, "ignoring load balancer with invalid application"),
        }
    }
    Ok(load_balancers)
}

/// Queries each zone's config server over HTTP/1.
pub struct ConfigServerClient {
    servers: BTreeMap<ZoneId, String>,
    timeout: Duration,
}

impl ConfigServerClient {
    pub fn new(servers: BTreeMap<ZoneId, String>, timeout: Duration) -> Self {
        Self { servers, timeout }
    }

    /// Client for every configured zone that names a config server.
    pub fn from_config(zones: &[ZoneConfig], timeout: Duration) -> Self {
        let servers = zones
            .iter()
            .filter_map(|zone| {
                zone.config_server
                    .as_ref()
                    .map(|address| (zone.id.clone(), address.clone()))
            })
            .collect();
        Self::new(servers, timeout)
    }

    async fn fetch(&self, address: &str) -> SourceResult<Bytes> {
        let uri = format!("http://{address}{LOAD_BALANCERS_PATH}");

        let stream = tokio::net::TcpStream::connect(address)
            .await
            .map_err(|e| SourceError::Connect {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| SourceError::Connect {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "config server connection closed");
            }
        });

        let request = http::Request::builder()
            .method("GET")
            .uri(&uri)
            .header("host", address)
            .header("accept", "application/json")
            .header("user-agent", "routegrid/0.1")
            .body(Empty::<Bytes>::new())
            .map_err(|e| SourceError::Request {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| SourceError::Request {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SourceError::Status {
                address: address.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| SourceError::Request {
                address: address.to_string(),
                reason: e.to_string(),
            })?;
        Ok(body.to_bytes())
    }
}

#[async_trait]
impl LoadBalancerSource for ConfigServerClient {
    async fn load_balancers(&self, zone: &ZoneId) -> SourceResult<Vec<LoadBalancer>> {
        let address = self
            .servers
            .get(zone)
            .ok_or_else(|| SourceError::UnknownZone(zone.clone()))?;

        let body = tokio::time::timeout(self.timeout, self.fetch(address))
            .await
            .map_err(|_| SourceError::Timeout {
                address: address.clone(),
            })??;

        let load_balancers = decode_load_balancers(&body)?;
        debug!(%zone, count = load_balancers.len(), "load balancers fetched");
        Ok(load_balancers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const BODY: &str = r#"{"loadBalancers":[
        {"tenant":"t1","application":"app1","instance":"default","cluster":"default",
         "hostname":"lb-1.example.com","dnsZone":"Z1","rotations":["r1"]},
        {"tenant":"t1","application":"app2","cluster":"c2","hostname":"lb-2.example.com"}
    ]}"#;

    /// Serve one canned HTTP response and return the listening address.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        address
    }

    fn client_for(zone: &ZoneId, address: String) -> ConfigServerClient {
        ConfigServerClient::new(
            [(zone.clone(), address)].into_iter().collect(),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn decodes_listing() {
        let lbs = decode_load_balancers(BODY.as_bytes()).unwrap();
        assert_eq!(lbs.len(), 2);
        assert_eq!(lbs[0].application, ApplicationId::new("t1", "app1", "default"));
        assert_eq!(lbs[0].dns_zone, Some(DnsZone::from("Z1")));
        assert!(lbs[0].rotations.contains(&RotationName::from("r1")));
        assert_eq!(lbs[1].application.instance(), "default");
        assert!(lbs[1].dns_zone.is_none());
        assert!(lbs[1].rotations.is_empty());
    }

    #[test]
    fn drops_entries_with_invalid_application() {
        let body = r#"{"loadBalancers":[
            {"tenant":"t1","application":"bad","instance":"","cluster":"c1","hostname":"lb-bad"},
            {"tenant":"t1","application":"a:b","cluster":"c1","hostname":"lb-colon"},
            {"tenant":"t1","application":"good","cluster":"c1","hostname":"lb-good"}
        ]}"#;

        let lbs = decode_load_balancers(body.as_bytes()).unwrap();
        assert_eq!(lbs.len(), 1);
        assert_eq!(lbs[0].hostname, HostName::from("lb-good"));
    }

    #[test]
    fn rejects_malformed_listing() {
        assert!(matches!(
            decode_load_balancers(b"{\"loadBalancers\": [{}]}"),
            Err(SourceError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn fetches_from_config_server() {
        let zone = ZoneId::new("prod", "z1");
        let address = serve_once("200 OK", BODY).await;

        let lbs = client_for(&zone, address).load_balancers(&zone).await.unwrap();
        assert_eq!(lbs.len(), 2);
        assert_eq!(lbs[0].hostname, HostName::from("lb-1.example.com"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let zone = ZoneId::new("prod", "z1");
        let address = serve_once("503 Service Unavailable", "{}").await;

        let err = client_for(&zone, address).load_balancers(&zone).await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn unknown_zone_is_an_error() {
        let client = ConfigServerClient::new(BTreeMap::new(), Duration::from_secs(1));
        let zone = ZoneId::new("prod", "z9");
        assert!(matches!(
            client.load_balancers(&zone).await,
            Err(SourceError::UnknownZone(_))
        ));
    }

    #[tokio::test]
    async fn connection_refused_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let zone = ZoneId::new("prod", "z1");
        let err = client_for(&zone, address).load_balancers(&zone).await.unwrap_err();
        assert!(matches!(err, SourceError::Connect { .. }));
    }
}
