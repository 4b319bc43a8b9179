use serde::{Deserialize, Serialize};

use crate::guide::GuideBarStyle;

/// Drawing hooks the timeline calls while redrawing.
///
/// Every method defaults to a no-op so a host only implements what it
/// can paint. Coordinates are in pixels relative to the timeline's left
/// edge; rows are global row indices (thread offset + depth).
pub trait Renderer {
    /// Wipe the whole timeline region.
    fn clear(&mut self) {}

    /// Called before a batch of draw calls.
    fn begin(&mut self) {}

    fn draw_bar(
        &mut self,
        _row: usize,
        _from_x: i32,
        _to_x: i32,
        _collector_index: usize,
        _label: &str,
    ) {
    }

    /// Draw a vertical gridline across all rows.
    fn draw_guide_bar(&mut self, _x: i32, _style: GuideBarStyle) {}

    /// Draw the horizontal separator below a thread's rows.
    fn draw_separator(&mut self, _row: usize) {}

    /// Called after a batch of draw calls.
    fn end(&mut self) {}
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn clear(&mut self) {
        (**self).clear();
    }

    fn begin(&mut self) {
        (**self).begin();
    }

    fn draw_bar(&mut self, row: usize, from_x: i32, to_x: i32, collector_index: usize, label: &str) {
        (**self).draw_bar(row, from_x, to_x, collector_index, label);
    }

    fn draw_guide_bar(&mut self, x: i32, style: GuideBarStyle) {
        (**self).draw_guide_bar(x, style);
    }

    fn draw_separator(&mut self, row: usize) {
        (**self).draw_separator(row);
    }

    fn end(&mut self) {
        (**self).end();
    }
}

/// Renderer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {}

/// A single, stateless render instruction, as recorded by
/// [`CommandRecorder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderCommand {
    Clear,
    Begin,
    DrawBar {
        row: usize,
        from_x: i32,
        to_x: i32,
        collector_index: usize,
        label: String,
    },
    DrawGuideBar {
        x: i32,
        style: GuideBarStyle,
    },
    DrawSeparator {
        row: usize,
    },
    End,
}

/// Records every hook call as a [`RenderCommand`], so a host on the other
/// side of a process or WASM boundary can replay it.
#[derive(Debug, Clone, Default)]
pub struct CommandRecorder {
    pub commands: Vec<RenderCommand>,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the recorded commands, leaving the recorder empty.
    pub fn take(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Recorded bars as `(row, from_x, to_x, collector_index)`.
    pub fn bars(&self) -> impl Iterator<Item = (usize, i32, i32, usize)> + '_ {
        self.commands.iter().filter_map(|c| match c {
            RenderCommand::DrawBar {
                row,
                from_x,
                to_x,
                collector_index,
                ..
            } => Some((*row, *from_x, *to_x, *collector_index)),
            _ => None,
        })
    }
}

impl Renderer for CommandRecorder {
    fn clear(&mut self) {
        self.commands.push(RenderCommand::Clear);
    }

    fn begin(&mut self) {
        self.commands.push(RenderCommand::Begin);
    }

    fn draw_bar(&mut self, row: usize, from_x: i32, to_x: i32, collector_index: usize, label: &str) {
        self.commands.push(RenderCommand::DrawBar {
            row,
            from_x,
            to_x,
            collector_index,
            label: label.to_string(),
        });
    }

    fn draw_guide_bar(&mut self, x: i32, style: GuideBarStyle) {
        self.commands.push(RenderCommand::DrawGuideBar { x, style });
    }

    fn draw_separator(&mut self, row: usize) {
        self.commands.push(RenderCommand::DrawSeparator { row });
    }

    fn end(&mut self) {
        self.commands.push(RenderCommand::End);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_renderer_accepts_everything() {
        let mut r = NullRenderer;
        r.clear();
        r.begin();
        r.draw_bar(0, 0, 10, 1, "x");
        r.draw_guide_bar(5, GuideBarStyle::Frame);
        r.draw_separator(1);
        r.end();
    }

    #[test]
    fn recorder_keeps_call_order() {
        let mut rec = CommandRecorder::new();
        rec.begin();
        rec.draw_bar(2, 4, 9, 3, "Cull");
        rec.draw_separator(3);
        rec.end();

        assert_eq!(rec.commands.len(), 4);
        assert_eq!(rec.commands[0], RenderCommand::Begin);
        assert_eq!(rec.bars().collect::<Vec<_>>(), vec![(2, 4, 9, 3)]);
        assert_eq!(rec.commands[3], RenderCommand::End);
    }

    #[test]
    fn recorder_through_mut_ref() {
        fn paint(mut r: impl Renderer) {
            r.draw_guide_bar(12, GuideBarStyle::Normal);
        }
        let mut rec = CommandRecorder::new();
        paint(&mut rec);
        assert_eq!(
            rec.take(),
            vec![RenderCommand::DrawGuideBar {
                x: 12,
                style: GuideBarStyle::Normal
            }]
        );
        assert!(rec.commands.is_empty());
    }

    #[test]
    fn commands_serialize() {
        let cmd = RenderCommand::DrawSeparator { row: 4 };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#"{"DrawSeparator":{"row":4}}"#);
    }
}
