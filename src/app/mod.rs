//! Application core: the cycle logic, zero direct I/O.
//!
//! The system manager and the actuator executor consume the two control
//! queues.  All interaction with hardware happens through the **port
//! traits** defined in [`ports`], keeping this layer testable without
//! real peripherals.

pub mod executor;
pub mod manager;
pub mod ports;
