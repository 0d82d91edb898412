//! Live bulb handles.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use log::debug;
use serde_json::{Value, json};

use crate::errors::Error;
use crate::mac::MacAddress;
use crate::message::{Request, Response};
use crate::method::{KnownMethod, Method};
use crate::runtime::{self, AsyncUdpSocket, UdpSocket};
use crate::state::{PilotState, SystemConfig};

type Result<T> = std::result::Result<T, Error>;

/// A connected, queryable Wiz bulb.
///
/// A `Bulb` talks to a physical device over UDP. It remembers the last pilot
/// state it fetched and learns its hardware address from the first reply
/// that carries one.
///
/// # Example
///
/// ```
/// use std::net::IpAddr;
/// use wiz_profiles::Bulb;
///
/// let bulb = Bulb::new("192.168.1.100".parse::<IpAddr>().unwrap());
/// assert_eq!(bulb.port(), Bulb::DEFAULT_PORT);
/// assert!(bulb.mac().is_none());
/// assert!(bulb.pilot().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Bulb {
    ip: IpAddr,
    port: u16,
    mac: Option<MacAddress>,
    name: Option<String>,
    pilot: Option<PilotState>,
}

impl Bulb {
    pub const DEFAULT_PORT: u16 = 38899;
    const TIMEOUT_MS: u64 = 1000;
    const MAX_RETRIES: u32 = 3;
    const RETRY_DELAYS_MS: [u64; 3] = [750, 1500, 3000];

    pub fn new(ip: IpAddr) -> Self {
        Self::with_port(ip, Self::DEFAULT_PORT)
    }

    /// A handle for `ip:port` that has not talked to the device yet.
    pub fn with_port(ip: IpAddr, port: u16) -> Self {
        Bulb {
            ip,
            port,
            mac: None,
            name: None,
            pilot: None,
        }
    }

    pub fn with_mac(mut self, mac: MacAddress) -> Self {
        self.mac = Some(mac);
        self
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    pub fn mac(&self) -> Option<&MacAddress> {
        self.mac.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = name.map(String::from);
    }

    /// The last known pilot state.
    pub fn pilot(&self) -> Option<&PilotState> {
        self.pilot.as_ref()
    }

    /// Fold a pilot state (fetched or pushed) into this handle.
    pub fn update_pilot(&mut self, state: &PilotState) {
        if self.mac.is_none() {
            self.mac = state.mac;
        }
        match &mut self.pilot {
            Some(current) => current.merge(state),
            None => self.pilot = Some(state.clone()),
        }
    }

    /// Fetches the current pilot state from the bulb and remembers it.
    pub async fn get_pilot(&mut self) -> Result<&PilotState> {
        let result = self.send(KnownMethod::GetPilot, None).await?;
        let state: PilotState = serde_json::from_value(result).map_err(Error::JsonLoad)?;
        if self.mac.is_none() {
            self.mac = state.mac;
        }
        Ok(self.pilot.insert(state))
    }

    /// Sends a `setPilot` with raw parameters.
    pub async fn set_pilot(&self, params: Value) -> Result<()> {
        let result = self.send(KnownMethod::SetPilot, Some(params)).await?;
        debug!("setPilot on {}: {:?}", self.addr(), result);
        Ok(())
    }

    pub async fn get_system_config(&self) -> Result<SystemConfig> {
        let result = self.send(KnownMethod::GetSystemConfig, None).await?;
        serde_json::from_value(result).map_err(Error::JsonLoad)
    }

    /// Briefly shifts brightness by `delta` for `duration`.
    pub async fn pulse(&self, delta: i8, duration: Duration) -> Result<()> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.send(
            KnownMethod::Pulse,
            Some(json!({"delta": delta, "duration": millis})),
        )
        .await?;
        Ok(())
    }

    /// Sends any outbound method and returns its `result` object.
    ///
    /// Inbound-only methods are refused before touching the network.
    pub async fn send(&self, method: impl Into<Method>, params: Option<Value>) -> Result<Value> {
        let method = method.into();
        if method.inbound_only() {
            return Err(Error::InboundOnly(method.to_string()));
        }

        let mut request = Request::new(method);
        request.params = params;
        let response = self.send_request(&request).await?;
        response.into_result()
    }

    async fn send_request(&self, request: &Request) -> Result<Response> {
        let bytes = request.to_bytes()?;
        let mut last_error = None;

        for attempt in 0..=Self::MAX_RETRIES {
            match self.send_udp(&bytes).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    debug!(
                        "{} to {} failed (attempt {}): {}",
                        request.method,
                        self.addr(),
                        attempt + 1,
                        e
                    );
                    last_error = Some(e);
                    if attempt < Self::MAX_RETRIES {
                        let delay_idx = (attempt as usize).min(Self::RETRY_DELAYS_MS.len() - 1);
                        runtime::sleep(Duration::from_millis(Self::RETRY_DELAYS_MS[delay_idx]))
                            .await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::socket(
                "send",
                std::io::Error::new(std::io::ErrorKind::Other, "no attempt made"),
            )
        }))
    }

    async fn send_udp(&self, msg: &[u8]) -> Result<Response> {
        let socket = UdpSocket::bind(runtime::unspecified_for(&self.ip))
            .await
            .map_err(|e| Error::socket("bind", e))?;

        socket
            .connect(self.addr())
            .await
            .map_err(|e| Error::socket("connect", e))?;

        socket
            .send(msg)
            .await
            .map_err(|e| Error::socket("send", e))?;

        let mut buffer = [0u8; 4096];

        let bytes = runtime::timeout(
            Duration::from_millis(Self::TIMEOUT_MS),
            socket.recv(&mut buffer),
        )
        .await
        .map_err(|_| {
            Error::socket(
                "receive",
                std::io::Error::new(std::io::ErrorKind::TimedOut, "receive timeout"),
            )
        })?
        .map_err(|e| Error::socket("receive", e))?;

        Response::from_slice(&buffer[..bytes])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulb() -> Bulb {
        Bulb::new("127.0.0.1".parse().unwrap())
    }

    #[tokio::test]
    async fn test_refuses_inbound_only_methods() {
        let bulb = bulb();
        for method in [KnownMethod::SyncPilot, KnownMethod::FirstBeat] {
            let err = bulb.send(method, None).await.unwrap_err();
            assert_eq!(err, Error::InboundOnly(method.name().to_string()));
        }
        let custom = Method::new("deviceTelemetry", false, true);
        assert!(matches!(
            bulb.send(custom, None).await,
            Err(Error::InboundOnly(name)) if name == "deviceTelemetry"
        ));
    }

    #[test]
    fn test_update_pilot_learns_mac() {
        let mac: MacAddress = "a8bb50d2e4f1".parse().unwrap();
        let mut bulb = bulb();
        bulb.update_pilot(&PilotState {
            mac: Some(mac),
            emitting: Some(true),
            ..Default::default()
        });
        assert_eq!(bulb.mac(), Some(&mac));

        bulb.update_pilot(&PilotState {
            dimming: Some(30),
            ..Default::default()
        });
        let pilot = bulb.pilot().unwrap();
        assert!(pilot.is_on());
        assert_eq!(pilot.dimming, Some(30));
    }

    #[test]
    fn test_known_mac_is_not_overwritten() {
        let mac: MacAddress = "a8bb50d2e4f1".parse().unwrap();
        let other: MacAddress = "000000000001".parse().unwrap();
        let mut bulb = bulb().with_mac(mac);
        bulb.update_pilot(&PilotState {
            mac: Some(other),
            ..Default::default()
        });
        assert_eq!(bulb.mac(), Some(&mac));
    }
}
