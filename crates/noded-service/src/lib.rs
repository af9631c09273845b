//! # noded-service
//!
//! In-memory representation of a managed service: the data model, the
//! wholesale YAML loader and the pure rendering of a service into systemd
//! unit text.
//!
//! A service set is loaded as a unit and never partially updated; the
//! Manager replaces its whole service list on each online cycle.

pub mod loader;
pub mod model;
pub mod unit;

pub use loader::load_services_from_file;
pub use model::{Endpoint, HealthCheckKind, HealthCheckSpec, Service};
pub use unit::render_unit;
