// SignalK stream client, unit normalization and equipment discovery

mod client;
pub mod convert;
pub mod discovery;
pub mod snapshot;
pub mod store;

pub use client::{ClientEvent, SignalKClient, SignalKConfig, POSITION_PATH};
pub use discovery::{Discovered, Discovery, Features, TankType};
pub use snapshot::{BatteryReading, EngineReading, Position, Readings, Snapshot, TankReading};
pub use store::ValueStore;
