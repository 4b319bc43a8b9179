pub mod interval;
pub mod thread_row;

pub use interval::{FRAME_COLLECTOR, Interval, Row, first_reaching};
pub use thread_row::ThreadRow;
