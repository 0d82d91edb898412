//! Named collections of bulbs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bulb::Bulb;
use crate::connector::{BulbConnector, ScanPolicy};
use crate::item::BulbItem;
use crate::mac::MacAddress;
use crate::state::PilotState;

/// A named, ordered collection of bulb references.
///
/// Order is preserved through save and load. Entries are expected to have
/// distinct MAC addresses; [`Profile::add_bulb`] keeps that true, but a
/// document loaded from disk is taken as-is.
///
/// # Example
///
/// ```
/// use wiz_profiles::{BulbItem, Profile};
///
/// let mut profile = Profile::new("Living Room");
/// let mac = "a8bb50d2e4f1".parse().unwrap();
/// profile.add_bulb(BulbItem::new(mac, "192.168.1.20".parse().unwrap(), 38899, "Corner Lamp"));
/// assert_eq!(profile.bulbs().len(), 1);
/// assert_eq!(profile.find(&mac).unwrap().name(), "Corner Lamp");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    #[serde(default)]
    name: String,
    #[serde(default)]
    bulbs: Vec<BulbItem>,
}

impl Profile {
    pub fn new(name: &str) -> Self {
        Profile {
            id: Uuid::new_v4(),
            name: String::from(name),
            bulbs: Vec::new(),
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = String::from(name);
    }

    pub fn bulbs(&self) -> &[BulbItem] {
        &self.bulbs
    }

    pub fn bulbs_mut(&mut self) -> &mut [BulbItem] {
        &mut self.bulbs
    }

    pub(crate) fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    pub(crate) fn replace_bulbs(&mut self, bulbs: Vec<BulbItem>) {
        self.bulbs = bulbs;
    }

    /// Add an entry, replacing (in place) any entry with the same MAC.
    ///
    /// Returns the replaced entry.
    pub fn add_bulb(&mut self, item: BulbItem) -> Option<BulbItem> {
        match self.bulbs.iter_mut().find(|b| b.mac() == item.mac()) {
            Some(existing) => Some(std::mem::replace(existing, item)),
            None => {
                self.bulbs.push(item);
                None
            }
        }
    }

    pub fn remove_bulb(&mut self, mac: &MacAddress) -> Option<BulbItem> {
        let idx = self.bulbs.iter().position(|b| b.mac() == mac)?;
        Some(self.bulbs.remove(idx))
    }

    pub fn find(&self, mac: &MacAddress) -> Option<&BulbItem> {
        self.bulbs.iter().find(|b| b.mac() == mac)
    }

    pub fn find_mut(&mut self, mac: &MacAddress) -> Option<&mut BulbItem> {
        self.bulbs.iter_mut().find(|b| b.mac() == mac)
    }

    /// Handles attached by the last resolution, skipping unresolved entries.
    pub fn live_bulbs(&self) -> impl Iterator<Item = &Bulb> {
        self.bulbs.iter().filter_map(BulbItem::bulb)
    }

    /// Resolve every entry and attach the resulting handles.
    ///
    /// Returns how many entries ended up with a live handle.
    pub async fn resolve_all<C: BulbConnector>(
        &mut self,
        connector: &C,
        policy: ScanPolicy,
        concurrency: usize,
    ) -> usize {
        let resolved = BulbItem::resolve_all(&self.bulbs, connector, policy, concurrency).await;
        for (item, bulb) in self.bulbs.iter_mut().zip(resolved) {
            item.set_bulb(bulb);
        }
        self.live_bulbs().count()
    }

    /// Apply a pushed state update to the matching live handle.
    ///
    /// Returns `true` if an attached bulb was updated.
    pub fn process_sync(&mut self, mac: &MacAddress, state: &PilotState) -> bool {
        match self.find_mut(mac).and_then(BulbItem::bulb_mut) {
            Some(bulb) => {
                bulb.update_pilot(state);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeConnector, mac};

    fn item(m: &str, ip: &str, name: &str) -> BulbItem {
        BulbItem::new(mac(m), ip.parse().unwrap(), Bulb::DEFAULT_PORT, name)
    }

    #[test]
    fn test_add_replaces_same_mac_in_place() {
        let mut profile = Profile::new("test");
        profile.add_bulb(item("000000000001", "10.0.0.1", "a"));
        profile.add_bulb(item("000000000002", "10.0.0.2", "b"));
        let old = profile.add_bulb(item("000000000001", "10.0.0.9", "c"));

        assert_eq!(old.unwrap().name(), "a");
        let names: Vec<&str> = profile.bulbs().iter().map(BulbItem::name).collect();
        assert_eq!(names, ["c", "b"]);
    }

    #[test]
    fn test_remove_and_find() {
        let mut profile = Profile::new("test");
        profile.add_bulb(item("000000000001", "10.0.0.1", "a"));
        assert!(profile.find(&mac("000000000001")).is_some());
        assert!(profile.remove_bulb(&mac("000000000001")).is_some());
        assert!(profile.remove_bulb(&mac("000000000001")).is_none());
        assert!(profile.bulbs().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_all_attaches_handles() {
        let mut profile = Profile::new("test");
        profile.add_bulb(item("000000000001", "10.0.0.1", "a"));
        profile.add_bulb(item("000000000002", "10.0.0.2", "b"));
        profile.add_bulb(item("000000000003", "10.0.0.3", "c"));
        let connector = FakeConnector::default().fail("10.0.0.2");

        let live = profile.resolve_all(&connector, ScanPolicy::CacheOnly, 4).await;
        assert_eq!(live, 2);
        assert!(profile.bulbs()[0].bulb().is_some());
        assert!(profile.bulbs()[1].bulb().is_none());
        assert!(profile.bulbs()[2].bulb().is_some());
    }

    #[tokio::test]
    async fn test_process_sync_updates_live_bulb() {
        let mut profile = Profile::new("test");
        profile.add_bulb(item("000000000001", "10.0.0.1", "a"));
        profile.add_bulb(item("000000000002", "10.0.0.2", "b"));
        profile
            .resolve_all(&FakeConnector::default().fail("10.0.0.2"), ScanPolicy::CacheOnly, 1)
            .await;

        let off = PilotState {
            emitting: Some(false),
            ..Default::default()
        };
        assert!(profile.process_sync(&mac("000000000001"), &off));
        assert!(!profile.process_sync(&mac("000000000002"), &off));
        assert!(!profile.process_sync(&mac("000000000003"), &off));

        let bulb = profile.bulbs()[0].bulb().unwrap();
        assert!(!bulb.pilot().unwrap().is_on());
    }

    #[test]
    fn test_missing_id_is_generated() {
        let profile: Profile = serde_json::from_str(r#"{"name":"Bedroom"}"#).unwrap();
        assert_eq!(profile.name(), "Bedroom");
        assert!(profile.bulbs().is_empty());
        assert!(!profile.id().is_nil());
    }
}
