//! Turning hardware addresses into live bulb handles.

use std::collections::HashMap;
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use log::{debug, warn};

use crate::bulb::Bulb;
use crate::discovery::{self, DiscoveredBulb};
use crate::errors::Error;
use crate::mac::MacAddress;
use crate::runtime::Mutex;

type Result<T> = std::result::Result<T, Error>;

/// What to do when a bulb is not already known by hardware address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanPolicy {
    /// Accept only an already-known handle; a miss is final and nothing is
    /// sent on the network.
    #[default]
    CacheOnly,
    /// Scan the network for the bulb on a miss.
    Scan,
    /// Always scan, replacing any known handle.
    Rescan,
}

/// The transport and discovery operations bulb resolution needs.
///
/// [`BulbRegistry`] is the UDP implementation; anything that can find bulbs by
/// hardware address can stand in for it.
pub trait BulbConnector: Send + Sync {
    /// A live handle already associated with `mac`, searching the network
    /// when `policy` allows it.
    fn find_connected(
        &self,
        mac: &MacAddress,
        policy: ScanPolicy,
    ) -> impl Future<Output = Option<Bulb>> + Send;

    /// An unconnected handle for a known address, without confirming which
    /// device answers there.
    fn connect_direct(&self, ip: IpAddr, port: u16) -> Bulb {
        Bulb::with_port(ip, port)
    }

    /// Fetch the bulb's current state.
    fn refresh_state(&self, bulb: Bulb) -> impl Future<Output = Result<Bulb>> + Send;
}

/// A cache of connected bulbs keyed by hardware address, backed by UDP
/// discovery.
///
/// Holds at most one handle per MAC address.
///
/// # Example
///
/// ```
/// use wiz_profiles::{Bulb, BulbRegistry, MacAddress};
///
/// # futures::executor::block_on(async {
/// let registry = BulbRegistry::new();
/// let mac: MacAddress = "a8bb50d2e4f1".parse().unwrap();
/// registry.insert(Bulb::new("192.168.1.20".parse().unwrap()).with_mac(mac)).await.unwrap();
/// assert!(registry.get(&mac).await.is_some());
/// # });
/// ```
pub struct BulbRegistry {
    bulbs: Mutex<HashMap<MacAddress, Bulb>>,
    scan_timeout: Duration,
}

impl Default for BulbRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BulbRegistry {
    pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(3);

    pub fn new() -> Self {
        BulbRegistry {
            bulbs: Mutex::new(HashMap::new()),
            scan_timeout: Self::DEFAULT_SCAN_TIMEOUT,
        }
    }

    pub fn with_scan_timeout(mut self, scan_timeout: Duration) -> Self {
        self.scan_timeout = scan_timeout;
        self
    }

    pub async fn get(&self, mac: &MacAddress) -> Option<Bulb> {
        self.bulbs.lock().await.get(mac).cloned()
    }

    /// Remember `bulb` under its MAC, replacing any previous handle.
    pub async fn insert(&self, bulb: Bulb) -> Result<Option<Bulb>> {
        let mac = *bulb.mac().ok_or(Error::MissingMac)?;
        Ok(self.bulbs.lock().await.insert(mac, bulb))
    }

    pub async fn remove(&self, mac: &MacAddress) -> Option<Bulb> {
        self.bulbs.lock().await.remove(mac)
    }

    pub async fn len(&self) -> usize {
        self.bulbs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bulbs.lock().await.is_empty()
    }

    /// Discover every bulb on the network and remember them.
    pub async fn scan(&self) -> Result<Vec<Bulb>> {
        let found = discovery::discover_bulbs(self.scan_timeout).await?;
        let mut bulbs = self.bulbs.lock().await;
        Ok(found
            .into_iter()
            .map(|d| Self::remember(&mut bulbs, d))
            .collect())
    }

    async fn scan_for(&self, mac: &MacAddress) -> Option<Bulb> {
        match discovery::find_bulb(mac, self.scan_timeout).await {
            Ok(Some(found)) => Some(Self::remember(&mut *self.bulbs.lock().await, found)),
            Ok(None) => {
                debug!("{mac} did not answer the scan");
                None
            }
            Err(e) => {
                warn!("scan for {mac} failed: {e}");
                None
            }
        }
    }

    // A rediscovered bulb keeps its name and last state; only the address moves.
    fn remember(bulbs: &mut HashMap<MacAddress, Bulb>, found: DiscoveredBulb) -> Bulb {
        let mac = found.mac;
        let fresh = found.into_bulb();
        let bulb = match bulbs.remove(&mac) {
            Some(old) if old.ip() == fresh.ip() => old,
            Some(old) => {
                let mut moved = fresh;
                moved.set_name(old.name());
                if let Some(pilot) = old.pilot() {
                    moved.update_pilot(pilot);
                }
                moved
            }
            None => fresh,
        };
        bulbs.insert(mac, bulb.clone());
        bulb
    }
}

impl BulbConnector for BulbRegistry {
    async fn find_connected(&self, mac: &MacAddress, policy: ScanPolicy) -> Option<Bulb> {
        match policy {
            ScanPolicy::CacheOnly => self.get(mac).await,
            ScanPolicy::Scan => match self.get(mac).await {
                Some(bulb) => Some(bulb),
                None => self.scan_for(mac).await,
            },
            ScanPolicy::Rescan => self.scan_for(mac).await,
        }
    }

    async fn refresh_state(&self, mut bulb: Bulb) -> Result<Bulb> {
        bulb.get_pilot().await?;
        if let Some(mac) = bulb.mac().copied() {
            self.bulbs.lock().await.insert(mac, bulb.clone());
        }
        Ok(bulb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(s: &str) -> MacAddress {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_cache_only_miss_is_final() {
        let registry = BulbRegistry::new();
        assert!(
            registry
                .find_connected(&mac("a8bb50d2e4f1"), ScanPolicy::CacheOnly)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_cached_handle_is_returned() {
        let registry = BulbRegistry::new();
        let bulb = Bulb::new("10.0.0.7".parse().unwrap()).with_mac(mac("a8bb50d2e4f1"));
        assert!(registry.insert(bulb).await.unwrap().is_none());

        for policy in [ScanPolicy::CacheOnly, ScanPolicy::Scan] {
            let found = registry
                .find_connected(&mac("A8:BB:50:D2:E4:F1"), policy)
                .await
                .unwrap();
            assert_eq!(found.ip(), "10.0.0.7".parse::<IpAddr>().unwrap());
        }
    }

    #[tokio::test]
    async fn test_one_handle_per_mac() {
        let registry = BulbRegistry::new();
        let m = mac("a8bb50d2e4f1");
        registry
            .insert(Bulb::new("10.0.0.7".parse().unwrap()).with_mac(m))
            .await
            .unwrap();
        let old = registry
            .insert(Bulb::new("10.0.0.8".parse().unwrap()).with_mac(m))
            .await
            .unwrap();
        assert_eq!(old.unwrap().ip(), "10.0.0.7".parse::<IpAddr>().unwrap());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_insert_requires_mac() {
        let registry = BulbRegistry::new();
        let err = registry
            .insert(Bulb::new("10.0.0.7".parse().unwrap()))
            .await
            .unwrap_err();
        assert_eq!(err, Error::MissingMac);
        assert!(registry.is_empty().await);
    }

    #[test]
    fn test_remember_moves_address_and_keeps_name() {
        let m = mac("a8bb50d2e4f1");
        let mut bulbs = HashMap::new();
        let mut old = Bulb::new("10.0.0.7".parse().unwrap()).with_mac(m);
        old.set_name(Some("Desk"));
        bulbs.insert(m, old);

        let moved = BulbRegistry::remember(
            &mut bulbs,
            DiscoveredBulb {
                ip: "10.0.0.9".parse().unwrap(),
                mac: m,
            },
        );
        assert_eq!(moved.ip(), "10.0.0.9".parse::<IpAddr>().unwrap());
        assert_eq!(moved.name(), Some("Desk"));
        assert_eq!(bulbs.len(), 1);
    }
}
