mod countdown;
mod interval;

pub use countdown::{CountdownTimer, TickOutcome};
pub use interval::IntervalSpec;
