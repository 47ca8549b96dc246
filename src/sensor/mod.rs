//! Sensor Module
//!
//! Reads the environmental sensors and the host identity into one
//! best-effort snapshot per cycle.

mod identity;
mod reader;
mod sense_hat;
mod simulated;
pub mod traits;

pub use identity::ProcIdentity;
pub use reader::SensorReader;
pub use sense_hat::IioSensors;
pub use simulated::{SimulatedIdentity, SimulatedSensors};
pub use traits::{EnvironmentSensors, HostIdentity};
