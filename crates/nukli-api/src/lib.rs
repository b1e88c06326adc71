// nukli-api: Async Rust client for the Nuki bridge HTTP API

pub mod auth;
pub mod bridge;
pub mod discovery;
pub mod error;
pub mod event;
pub mod model;
pub mod transport;

pub use auth::Encryption;
pub use bridge::{BridgeClient, BridgeConfig};
pub use discovery::{Discovery, DiscoveryConfig};
pub use error::{Error, RequestInfo};
pub use event::ClientEvent;
pub use model::{
    BridgeIdentity, CallbackSubscription, DeviceType, DiscoveredBridge, DoorSensorState,
    LockAction, LockState, OpenerAction, OpenerMode, OpenerState,
};
