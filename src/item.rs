//! Serializable bulb references and their resolution into live handles.

use std::net::IpAddr;

use futures::stream::{self, StreamExt};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::bulb::Bulb;
use crate::connector::{BulbConnector, ScanPolicy};
use crate::mac::MacAddress;

fn default_port() -> u16 {
    Bulb::DEFAULT_PORT
}

/// The saved identity of a bulb: hardware address, last known network address
/// and a display name.
///
/// An item can be stored while its bulb is offline and resolved into a live
/// [`Bulb`] later. The resolved handle lives only in memory.
///
/// Two items are equal when their identity fields match; the attached handle
/// is ignored.
///
/// # Example
///
/// ```
/// use wiz_profiles::BulbItem;
///
/// let item: BulbItem = serde_json::from_str(
///     r#"{"mac":"a8bb50d2e4f1","addr":"192.168.1.20","name":"Desk"}"#,
/// ).unwrap();
/// assert_eq!(item.port(), 38899);
/// assert!(item.bulb().is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulbItem {
    mac: MacAddress,
    addr: IpAddr,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    name: String,
    #[serde(skip)]
    bulb: Option<Bulb>,
}

impl PartialEq for BulbItem {
    fn eq(&self, other: &Self) -> bool {
        self.mac == other.mac
            && self.addr == other.addr
            && self.port == other.port
            && self.name == other.name
    }
}

impl BulbItem {
    pub fn new(mac: MacAddress, addr: IpAddr, port: u16, name: &str) -> Self {
        BulbItem {
            mac,
            addr,
            port,
            name: String::from(name),
            bulb: None,
        }
    }

    /// Capture the identity of a live bulb, keeping the handle attached.
    ///
    /// Returns `None` if the bulb has not reported its MAC address yet.
    pub fn from_bulb(bulb: &Bulb) -> Option<Self> {
        let mac = *bulb.mac()?;
        Some(BulbItem {
            mac,
            addr: bulb.ip(),
            port: bulb.port(),
            name: bulb.name().unwrap_or_default().to_string(),
            bulb: Some(bulb.clone()),
        })
    }

    pub fn mac(&self) -> &MacAddress {
        &self.mac
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = String::from(name);
    }

    /// The live handle attached by the last successful resolution.
    pub fn bulb(&self) -> Option<&Bulb> {
        self.bulb.as_ref()
    }

    pub fn bulb_mut(&mut self) -> Option<&mut Bulb> {
        self.bulb.as_mut()
    }

    pub(crate) fn set_bulb(&mut self, bulb: Option<Bulb>) {
        self.bulb = bulb;
    }

    /// Resolve this item into a live, freshly queried bulb.
    ///
    /// Prefers a handle the connector already knows for this MAC (scanning if
    /// `policy` allows), otherwise connects straight to the saved address.
    /// A bulb that cannot be refreshed yields `None`; this never fails.
    pub async fn resolve<C: BulbConnector>(&self, connector: &C, policy: ScanPolicy) -> Option<Bulb> {
        let mut bulb = match connector.find_connected(&self.mac, policy).await {
            Some(bulb) => bulb,
            None => {
                debug!("{} not connected, trying {}:{}", self.mac, self.addr, self.port);
                connector.connect_direct(self.addr, self.port)
            }
        };

        // Connectors may cache the handle they refresh.
        if bulb.name().is_none() && !self.name.is_empty() {
            bulb.set_name(Some(&self.name));
        }

        match connector.refresh_state(bulb).await {
            Ok(bulb) => Some(bulb),
            Err(e) => {
                warn!("could not reach {} ({}:{}): {}", self.mac, self.addr, self.port, e);
                None
            }
        }
    }

    /// Resolve and keep the handle on this item.
    ///
    /// A failed resolution clears any previously attached handle.
    pub async fn attach<C: BulbConnector>(&mut self, connector: &C, policy: ScanPolicy) -> Option<&Bulb> {
        let bulb = self.resolve(connector, policy).await;
        self.set_bulb(bulb);
        self.bulb.as_ref()
    }

    /// Resolve every item, at most `concurrency` at a time.
    ///
    /// The output has one slot per input, in input order. Entries are
    /// independent: one unreachable bulb only leaves its own slot empty.
    pub async fn resolve_all<C: BulbConnector>(
        items: &[BulbItem],
        connector: &C,
        policy: ScanPolicy,
        concurrency: usize,
    ) -> Vec<Option<Bulb>> {
        stream::iter(items)
            .map(|item| item.resolve(connector, policy))
            .buffered(concurrency.max(1))
            .collect::<Vec<_>>()
            .await
    }
}
