//! Test doubles shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;

use crate::bulb::Bulb;
use crate::connector::{BulbConnector, ScanPolicy};
use crate::errors::Error;
use crate::mac::MacAddress;
use crate::runtime;
use crate::state::PilotState;

/// A connector that never touches the network.
///
/// `connected` bulbs are found under any policy, `scannable` ones only when the
/// policy allows a scan, refreshing a bulb whose address is in `failing`
/// times out, and refreshing one in `slow` takes that long.
#[derive(Default)]
pub(crate) struct FakeConnector {
    pub connected: HashMap<MacAddress, Bulb>,
    pub scannable: HashMap<MacAddress, Bulb>,
    pub failing: HashSet<IpAddr>,
    pub slow: HashMap<IpAddr, Duration>,
    /// Addresses in the order their refresh started.
    pub refreshed: Mutex<Vec<IpAddr>>,
    /// Addresses in the order their refresh finished.
    pub finished: Mutex<Vec<IpAddr>>,
    /// Names the handles carried when handed over for refresh.
    pub names: Mutex<Vec<Option<String>>>,
}

impl FakeConnector {
    pub fn connect(mut self, bulb: Bulb) -> Self {
        let mac = *bulb.mac().expect("connected bulbs need a mac");
        self.connected.insert(mac, bulb);
        self
    }

    pub fn reachable_by_scan(mut self, bulb: Bulb) -> Self {
        let mac = *bulb.mac().expect("scannable bulbs need a mac");
        self.scannable.insert(mac, bulb);
        self
    }

    pub fn fail(mut self, ip: &str) -> Self {
        self.failing.insert(ip.parse().unwrap());
        self
    }

    pub fn delay(mut self, ip: &str, delay: Duration) -> Self {
        self.slow.insert(ip.parse().unwrap(), delay);
        self
    }

    pub fn refreshed(&self) -> Vec<IpAddr> {
        self.refreshed.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<IpAddr> {
        self.finished.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<Option<String>> {
        self.names.lock().unwrap().clone()
    }
}

impl BulbConnector for FakeConnector {
    async fn find_connected(&self, mac: &MacAddress, policy: ScanPolicy) -> Option<Bulb> {
        match policy {
            ScanPolicy::CacheOnly => self.connected.get(mac).cloned(),
            ScanPolicy::Scan => self
                .connected
                .get(mac)
                .or_else(|| self.scannable.get(mac))
                .cloned(),
            ScanPolicy::Rescan => self.scannable.get(mac).cloned(),
        }
    }

    async fn refresh_state(&self, mut bulb: Bulb) -> Result<Bulb, Error> {
        self.refreshed.lock().unwrap().push(bulb.ip());
        self.names.lock().unwrap().push(bulb.name().map(String::from));
        if let Some(delay) = self.slow.get(&bulb.ip()) {
            runtime::sleep(*delay).await;
        }
        self.finished.lock().unwrap().push(bulb.ip());
        if self.failing.contains(&bulb.ip()) {
            return Err(Error::socket(
                "receive",
                std::io::Error::new(std::io::ErrorKind::TimedOut, "receive timeout"),
            ));
        }
        bulb.update_pilot(&PilotState {
            emitting: Some(true),
            ..Default::default()
        });
        Ok(bulb)
    }
}

pub(crate) fn mac(s: &str) -> MacAddress {
    s.parse().unwrap()
}
