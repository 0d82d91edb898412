//! # wiz_profiles
//!
//! Saved collections of Philips Wiz bulbs, resolved lazily into live handles.
//!
//! A [`Profile`] is a named, ordered list of [`BulbItem`]s: the MAC address,
//! last known IP address and display name of each bulb. Profiles are stored as
//! JSON documents by a [`ProfileStore`]. Loading a profile reconnects to every
//! bulb at once (with bounded parallelism) through a [`BulbConnector`]; bulbs
//! that do not answer are simply left without a handle.
//!
//! Requests sent to bulbs are named by a [`Method`], which knows whether it
//! changes device state and whether it is only ever sent *by* a bulb.
//!
//! ## Quick Start
//!
//! ```no_run
//! use wiz_profiles::{BulbRegistry, Profile, ProfileStore, ScanPolicy, StoreOptions};
//!
//! async fn living_room() -> Result<(), wiz_profiles::Error> {
//!     let registry = BulbRegistry::new();
//!     let store = ProfileStore::new("living-room.wizj").with_options(StoreOptions {
//!         scan: ScanPolicy::Scan,
//!         ..Default::default()
//!     });
//!
//!     let profile: Profile = store.load(&registry).await?;
//!     for bulb in profile.live_bulbs() {
//!         bulb.set_pilot(serde_json::json!({"state": true, "dimming": 40})).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Communication
//!
//! Bulbs answer requests over UDP on port 38899 and push state changes to port
//! 38900 once registered through [`push::PushManager`].
//!
//! ## Runtime Selection
//!
//! This library is runtime-agnostic. Select your preferred runtime using feature flags:
//!
//! ```toml
//! [dependencies]
//! wiz-profiles = { version = "0.1", default-features = false, features = ["runtime-smol"] }
//! ```
//!
//! ## Feature Flags
//!
//! - `runtime-tokio` (default): Use the tokio async runtime
//! - `runtime-async-std`: Use the async-std runtime
//! - `runtime-smol`: Use the smol runtime

mod bulb;
mod connector;
mod discovery;
mod errors;
mod item;
mod mac;
mod message;
mod method;
mod profile;
pub mod push;
pub mod runtime;
mod state;
mod store;
#[cfg(test)]
mod testing;

// Re-export public API
pub use bulb::Bulb;
pub use connector::{BulbConnector, BulbRegistry, ScanPolicy};
pub use discovery::{DiscoveredBulb, discover_bulbs, find_bulb};
pub use errors::Error;
pub use item::BulbItem;
pub use mac::MacAddress;
pub use message::{DeviceError, InboundMessage, Request, Response};
pub use method::{KnownMethod, Method, MethodAsWire};
pub use profile::Profile;
pub use state::{PilotState, SystemConfig};
pub use store::{ProfileStore, StoreOptions};
