pub mod commands;
pub mod frame_data;
pub mod guide;

pub use commands::{CommandRecorder, NullRenderer, RenderCommand, Renderer};
pub use frame_data::{EventKind, FrameData, FrameEvent};
pub use guide::{GuideBar, GuideBarStyle};
