// ─── Server List ───
// The char/list endpoint returns the public game servers alongside the
// (empty, for anonymous requests) character list.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use quick_xml::de::from_str;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::downloader::HttpTransport;
use crate::core::endpoints::Endpoints;
use crate::core::error::ResxResult;

/// A game server that can be connected to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Server {
    pub name: String,
    /// Hostnames are not supported, only IPv4 literals.
    pub address: Ipv4Addr,
}

#[derive(Debug, Deserialize, Default)]
struct CharListDocument {
    #[serde(default, rename = "Servers")]
    servers: Option<ServerEntries>,
}

#[derive(Debug, Deserialize, Default)]
struct ServerEntries {
    #[serde(default, rename = "Server")]
    items: Vec<ServerEntry>,
}

#[derive(Debug, Deserialize)]
struct ServerEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "DNS")]
    dns: String,
}

/// Parse a char list document into servers keyed by name.
pub fn parse_server_list(xml: &str) -> ResxResult<BTreeMap<String, Server>> {
    let doc: CharListDocument = from_str(xml)?;

    let servers = doc
        .servers
        .map(|s| s.items)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| match entry.dns.trim().parse::<Ipv4Addr>() {
            Ok(address) => Some((
                entry.name.clone(),
                Server {
                    name: entry.name,
                    address,
                },
            )),
            Err(_) => {
                debug!("Skipping server {} with non-IPv4 address {}", entry.name, entry.dns);
                None
            }
        })
        .collect();

    Ok(servers)
}

pub struct ServerDirectory {
    transport: HttpTransport,
    endpoints: Endpoints,
}

impl ServerDirectory {
    pub fn new(transport: HttpTransport, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// Download the current server list.
    pub async fn fetch(&self) -> ResxResult<BTreeMap<String, Server>> {
        // Cache buster; the endpoint ignores its value.
        let guid = uuid::Uuid::new_v4().simple().to_string();
        let body = self.transport.get(&self.endpoints.char_list_url(&guid)).await?;
        let servers = parse_server_list(&String::from_utf8_lossy(&body))?;
        info!("Fetched {} servers", servers.len());
        Ok(servers)
    }
}
