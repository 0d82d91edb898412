//! Bulb state ("pilot") and system configuration payloads.

use serde::{Deserialize, Serialize};

use crate::mac::MacAddress;

/// The operating state of a bulb as reported by `getPilot` or pushed with
/// `syncPilot`.
///
/// Every field is optional: pushes only carry what changed, and different
/// bulb classes report different subsets.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PilotState {
    pub mac: Option<MacAddress>,
    pub rssi: Option<i32>,
    /// Origin of the last change (`udp`, `hb`, `wfa`, ...).
    pub src: Option<String>,
    #[serde(rename = "state")]
    pub emitting: Option<bool>,
    pub scene_id: Option<u16>,
    pub speed: Option<u8>,
    pub temp: Option<u16>,
    pub dimming: Option<u8>,
    #[serde(rename = "r")]
    pub red: Option<u8>,
    #[serde(rename = "g")]
    pub green: Option<u8>,
    #[serde(rename = "b")]
    pub blue: Option<u8>,
    #[serde(rename = "c")]
    pub cool: Option<u8>,
    #[serde(rename = "w")]
    pub warm: Option<u8>,
}

impl PilotState {
    /// Whether the bulb is emitting light. Unknown counts as off.
    pub fn is_on(&self) -> bool {
        self.emitting.unwrap_or(false)
    }

    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        match (self.red, self.green, self.blue) {
            (Some(r), Some(g), Some(b)) => Some((r, g, b)),
            _ => None,
        }
    }

    /// Overlay the fields present in `other`.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiz_profiles::PilotState;
    ///
    /// let mut state = PilotState { emitting: Some(true), dimming: Some(40), ..Default::default() };
    /// state.merge(&PilotState { dimming: Some(80), ..Default::default() });
    /// assert!(state.is_on());
    /// assert_eq!(state.dimming, Some(80));
    /// ```
    pub fn merge(&mut self, other: &Self) {
        fn take<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if src.is_some() {
                dst.clone_from(src);
            }
        }

        take(&mut self.mac, &other.mac);
        take(&mut self.rssi, &other.rssi);
        take(&mut self.src, &other.src);
        take(&mut self.emitting, &other.emitting);
        take(&mut self.scene_id, &other.scene_id);
        take(&mut self.speed, &other.speed);
        take(&mut self.temp, &other.temp);
        take(&mut self.dimming, &other.dimming);
        take(&mut self.red, &other.red);
        take(&mut self.green, &other.green);
        take(&mut self.blue, &other.blue);
        take(&mut self.cool, &other.cool);
        take(&mut self.warm, &other.warm);
    }
}

/// System configuration of a Wiz bulb (`getSystemConfig`).
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfig {
    pub mac: MacAddress,
    #[serde(default)]
    pub home_id: Option<u64>,
    #[serde(default)]
    pub room_id: Option<u64>,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub fw_version: Option<String>,
    #[serde(default)]
    pub group_id: Option<u64>,
    #[serde(default)]
    pub type_id: Option<u32>,
    #[serde(default)]
    pub ping: Option<u32>,
}
