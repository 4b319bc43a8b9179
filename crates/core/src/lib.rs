//! Data structuring and query engine for a live, zoomable timeline of
//! nested timing intervals.
//!
//! Raw per-thread frame events go in through [`Timeline::new_data`]; they
//! are decoded into depth-indexed interval rows, laid out across threads,
//! and drawn through a caller-provided [`Renderer`](frame_timeline_protocol::Renderer).

pub mod config;
pub mod decoder;
pub mod format;
pub mod guide_bars;
pub mod index;
pub mod model;
pub mod registry;
pub mod source;
pub mod state;
pub mod timeline;
pub mod viewport;

pub use config::{ConfigError, TimelineConfig};
pub use decoder::{DecodedBar, DecodedFrame, IntervalDecoder};
pub use format::{TimeUnit, format_time};
pub use guide_bars::{GuideBarPlanner, nice_interval};
pub use hit_test::HitTester;
pub use index::ThreadRowIndex;
pub use model::{FRAME_COLLECTOR, Interval, Row, ThreadRow};
pub use registry::{TimelineHandle, TimelineRegistry};
pub use source::{CollectorDef, EventSource, MemorySource};
pub use state::{GraphState, StateError, TimelineState};
pub use timeline::Timeline;
pub use viewport::{HeldKeys, Key, ViewWindow, ViewportController};
