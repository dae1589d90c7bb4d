mod clock;
mod dbus;
mod location_label;
mod reporter;
mod sink;

pub use clock::{BootClock, Clock};
pub use dbus::EventRecorder;
pub use location_label::watch_location_label;
pub use reporter::EventReporter;
pub use sink::{MetricsSink, SinkError};
