//! Listener for messages bulbs send on their own: `syncPilot` state pushes
//! and `firstBeat` heartbeats.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::bulb::Bulb;
use crate::discovery::DiscoveredBulb;
use crate::errors::Error;
use crate::mac::MacAddress;
use crate::message::{InboundMessage, Request};
use crate::method::KnownMethod;
use crate::state::PilotState;

type Result<T> = std::result::Result<T, Error>;

pub const LISTEN_PORT: u16 = 38900;

pub type StateCallback = Box<dyn Fn(&MacAddress, &PilotState) + Send + 'static>;
pub type DiscoveryCallback = Box<dyn Fn(DiscoveredBulb) + Send + 'static>;

/// Diagnostics for the push manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushDiagnostics {
    pub running: bool,
    pub subscription_count: usize,
    pub time_since_last_push: Option<f64>,
    pub last_error: Option<String>,
}

/// What the listener does with one inbound datagram.
#[derive(Debug, PartialEq)]
enum Dispatch {
    Sync(MacAddress, PilotState),
    Heartbeat(DiscoveredBulb),
    Ignore,
}

fn classify(buf: &[u8], source: IpAddr) -> Dispatch {
    let Ok(msg) = InboundMessage::from_slice(buf) else {
        return Dispatch::Ignore;
    };
    let Some(mac) = msg.mac() else {
        debug!("push without mac from {source}: {}", msg.method);
        return Dispatch::Ignore;
    };

    match msg.method.known() {
        Some(KnownMethod::SyncPilot) => match serde_json::from_value(msg.params) {
            Ok(state) => Dispatch::Sync(mac, state),
            Err(e) => {
                debug!("bad syncPilot params from {mac}: {e}");
                Dispatch::Ignore
            }
        },
        Some(KnownMethod::FirstBeat) => Dispatch::Heartbeat(DiscoveredBulb { ip: source, mac }),
        _ => {
            debug!("ignoring {} pushed by {mac}", msg.method);
            Dispatch::Ignore
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Receives pushes from registered bulbs on port 38900.
pub struct PushManager {
    running: Arc<AtomicBool>,
    subscriptions: Arc<Mutex<HashMap<MacAddress, StateCallback>>>,
    discovery_callback: Arc<Mutex<Option<DiscoveryCallback>>>,
    listener_thread: Mutex<Option<JoinHandle<()>>>,
    last_push: Arc<Mutex<Option<Instant>>>,
    last_error: Arc<Mutex<Option<String>>>,
    register_msg: Mutex<Option<Request>>,
}

impl Default for PushManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PushManager {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            discovery_callback: Arc::new(Mutex::new(None)),
            listener_thread: Mutex::new(None),
            last_push: Arc::new(Mutex::new(None)),
            last_error: Arc::new(Mutex::new(None)),
            register_msg: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn diagnostics(&self) -> PushDiagnostics {
        PushDiagnostics {
            running: self.is_running(),
            subscription_count: lock(&self.subscriptions).len(),
            time_since_last_push: lock(&self.last_push).map(|t| t.elapsed().as_secs_f64()),
            last_error: lock(&self.last_error).clone(),
        }
    }

    /// Call `callback` with every state pushed by `mac`.
    pub fn subscribe<F: Fn(&MacAddress, &PilotState) + Send + 'static>(&self, mac: MacAddress, callback: F) {
        lock(&self.subscriptions).insert(mac, Box::new(callback));
    }

    pub fn unsubscribe(&self, mac: &MacAddress) {
        lock(&self.subscriptions).remove(mac);
    }

    /// Call `callback` whenever a bulb announces itself with `firstBeat`.
    pub fn set_discovery_callback<F: Fn(DiscoveredBulb) + Send + 'static>(&self, callback: F) {
        *lock(&self.discovery_callback) = Some(Box::new(callback));
    }

    /// Start listening. `local_ip` is the address bulbs will push to.
    pub fn start(&self, local_ip: IpAddr) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        let socket = UdpSocket::bind(SocketAddr::new(crate::runtime::unspecified_for(&local_ip).ip(), LISTEN_PORT))
            .map_err(|e| Error::socket("bind push socket", e))?;
        socket
            .set_read_timeout(Some(Duration::from_millis(500)))
            .map_err(|e| Error::socket("set_read_timeout", e))?;

        *lock(&self.register_msg) = Some(Request::new(KnownMethod::Registration).with_params(json!({
            "phoneIp": local_ip.to_string(),
            "register": true,
            "phoneMac": generate_mac().to_string().to_lowercase(),
        })));

        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let subscriptions = Arc::clone(&self.subscriptions);
        let discovery_callback = Arc::clone(&self.discovery_callback);
        let last_push = Arc::clone(&self.last_push);
        let last_error = Arc::clone(&self.last_error);

        let handle = thread::spawn(move || {
            let mut buffer = [0u8; 4096];

            while running.load(Ordering::SeqCst) {
                match socket.recv_from(&mut buffer) {
                    Ok((size, addr)) => {
                        *lock(&last_push) = Some(Instant::now());

                        match classify(&buffer[..size], addr.ip()) {
                            Dispatch::Sync(mac, state) => {
                                if let Some(cb) = lock(&subscriptions).get(&mac) {
                                    cb(&mac, &state);
                                }
                            }
                            Dispatch::Heartbeat(bulb) => {
                                if let Some(cb) = lock(&discovery_callback).as_ref() {
                                    cb(bulb);
                                }
                            }
                            Dispatch::Ignore => {}
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                    Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(e) => {
                        *lock(&last_error) = Some(e.to_string());
                        error!("push socket error: {}", e);
                    }
                }
            }
        });

        *lock(&self.listener_thread) = Some(handle);
        Ok(())
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(h) = lock(&self.listener_thread).take() {
            let _ = h.join();
        }
    }

    pub fn registration_message(&self) -> Option<Value> {
        lock(&self.register_msg)
            .as_ref()
            .and_then(|req| serde_json::to_value(req).ok())
    }

    /// Ask a bulb to push its state changes to this listener.
    ///
    /// Requires [`PushManager::start`] to have been called.
    pub fn register_bulb(&self, bulb_ip: IpAddr) -> Result<()> {
        let msg = lock(&self.register_msg)
            .as_ref()
            .ok_or(Error::UnspecifiedTarget)?
            .to_bytes()?;
        let socket = UdpSocket::bind(crate::runtime::unspecified_for(&bulb_ip))
            .map_err(|e| Error::socket("bind", e))?;
        socket
            .set_write_timeout(Some(Duration::from_secs(2)))
            .map_err(|e| Error::socket("set_write_timeout", e))?;
        socket
            .send_to(&msg, SocketAddr::new(bulb_ip, Bulb::DEFAULT_PORT))
            .map_err(|e| Error::socket("send_to", e))?;
        Ok(())
    }
}

impl Drop for PushManager {
    fn drop(&mut self) {
        self.stop();
    }
}

fn generate_mac() -> MacAddress {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let bytes = seed.to_be_bytes();
    let mut octets = [0u8; 6];
    octets.copy_from_slice(&bytes[bytes.len() - 6..]);
    MacAddress::new(octets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> IpAddr {
        "192.168.1.20".parse().unwrap()
    }

    #[test]
    fn test_push_manager_new() {
        let manager = PushManager::new();
        assert!(!manager.is_running());
        assert!(manager.registration_message().is_none());
        assert_eq!(
            manager.register_bulb(source()).unwrap_err(),
            Error::UnspecifiedTarget
        );
    }

    #[test]
    fn test_subscribe_unsubscribe() {
        let manager = PushManager::new();
        let mac: MacAddress = "AABBCCDDEEFF".parse().unwrap();
        manager.subscribe(mac, |_, _| {});
        assert_eq!(manager.diagnostics().subscription_count, 1);
        manager.unsubscribe(&"aa:bb:cc:dd:ee:ff".parse().unwrap());
        assert_eq!(manager.diagnostics().subscription_count, 0);
    }

    #[test]
    fn test_classify_sync_pilot() {
        let msg = br#"{"method":"syncPilot","env":"pro","params":{"mac":"a8bb50d2e4f1","src":"udp","state":true,"dimming":60}}"#;
        match classify(msg, source()) {
            Dispatch::Sync(mac, state) => {
                assert_eq!(mac.to_string(), "A8BB50D2E4F1");
                assert!(state.is_on());
                assert_eq!(state.dimming, Some(60));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classify_first_beat_any_case() {
        let msg = br#"{"method":"FIRSTBEAT","params":{"mac":"a8bb50d2e4f1"}}"#;
        assert_eq!(
            classify(msg, source()),
            Dispatch::Heartbeat(DiscoveredBulb {
                ip: source(),
                mac: "a8bb50d2e4f1".parse().unwrap()
            })
        );
    }

    #[test]
    fn test_classify_ignores_outbound_and_noise() {
        let outbound = br#"{"method":"setPilot","params":{"mac":"a8bb50d2e4f1","state":true}}"#;
        assert_eq!(classify(outbound, source()), Dispatch::Ignore);
        assert_eq!(classify(b"test", source()), Dispatch::Ignore);
        assert_eq!(
            classify(br#"{"method":"syncPilot","params":{}}"#, source()),
            Dispatch::Ignore
        );
    }

    #[test]
    fn test_generate_mac() {
        let mac = generate_mac().to_string();
        assert_eq!(mac.len(), 12);
        assert!(mac.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
