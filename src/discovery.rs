//! Device discovery via UDP broadcast.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use log::debug;
use serde_json::json;

use crate::bulb::Bulb;
use crate::errors::Error;
use crate::mac::MacAddress;
use crate::message::{Request, Response};
use crate::method::KnownMethod;
use crate::runtime::{self, AsyncUdpSocket, Instant, UdpSocket};

type Result<T> = std::result::Result<T, Error>;

const BROADCAST: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), Bulb::DEFAULT_PORT);

/// A Wiz bulb that answered a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredBulb {
    /// IP address of the discovered bulb
    pub ip: IpAddr,
    /// MAC address of the discovered bulb
    pub mac: MacAddress,
}

impl DiscoveredBulb {
    /// Convert this discovered bulb into a [`Bulb`] handle with a known MAC.
    pub fn into_bulb(self) -> Bulb {
        Bulb::new(self.ip).with_mac(self.mac)
    }
}

/// Discover Wiz bulbs on the local network using UDP broadcast.
///
/// Sends a `registration` broadcast and collects replies until
/// `discovery_timeout` elapses.
///
/// # Examples
///
/// ```ignore
/// use std::time::Duration;
/// use wiz_profiles::discover_bulbs;
///
/// let bulbs = discover_bulbs(Duration::from_secs(5)).await?;
/// for bulb in bulbs {
///     println!("  {} - {}", bulb.ip, bulb.mac);
/// }
/// ```
pub async fn discover_bulbs(discovery_timeout: Duration) -> Result<Vec<DiscoveredBulb>> {
    let found = scan(discovery_timeout, |_| false).await?;
    Ok(found.into_values().collect())
}

/// Scan for a single bulb by hardware address.
///
/// Returns as soon as `mac` answers, or `None` once the timeout elapses.
pub async fn find_bulb(mac: &MacAddress, timeout: Duration) -> Result<Option<DiscoveredBulb>> {
    let mut found = scan(timeout, |bulb| bulb.mac == *mac).await?;
    Ok(found.remove(mac))
}

async fn scan<F>(timeout: Duration, done: F) -> Result<HashMap<MacAddress, DiscoveredBulb>>
where
    F: Fn(&DiscoveredBulb) -> bool,
{
    let socket = UdpSocket::bind(runtime::unspecified_for(&BROADCAST.ip()))
        .await
        .map_err(|e| Error::socket("bind", e))?;

    socket
        .set_broadcast(true)
        .map_err(|e| Error::socket("set_broadcast", e))?;

    let msg = Request::new(KnownMethod::Registration)
        .with_params(json!({
            "phoneMac": "AAAAAAAAAAAA",
            "register": false,
            "phoneIp": "1.2.3.4",
            "id": "1"
        }))
        .to_bytes()?;

    socket
        .send_to(&msg, BROADCAST)
        .await
        .map_err(|e| Error::socket("send_to", e))?;

    let mut discovered = HashMap::new();
    let start = Instant::now();
    let mut buffer = [0u8; 4096];
    let recv_timeout = Duration::from_millis(500);

    while start.elapsed() < timeout {
        let Ok(Ok((size, addr))) = runtime::timeout(recv_timeout, socket.recv_from(&mut buffer)).await
        else {
            continue;
        };

        let Some(mac) = Response::from_slice(&buffer[..size])
            .ok()
            .and_then(|resp| resp.mac())
        else {
            continue;
        };

        let bulb = DiscoveredBulb { ip: addr.ip(), mac };
        debug!("scan reply from {} ({})", bulb.ip, bulb.mac);
        let finished = done(&bulb);
        discovered.insert(mac, bulb);
        if finished {
            break;
        }
    }

    Ok(discovered)
}
