//! Point lights, light lists and the light list manager

mod list;
mod manager;
mod source;

pub use list::LightList;
pub use manager::{LightListMode, LightManager};
pub use source::{LightId, LightSettings, LightSource};

use glam::Vec2;
use thiserror::Error;

use crate::coords::Viewport;

/// Authored scale of the light marker billboard relative to its icon size.
///
/// Used both for drawing the marker and for hit-testing it.
pub const MARKER_SCALE: f32 = 0.3;

/// Error for light list operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LightError {
    /// Every light list keeps at least one light
    #[error("cannot remove the last light of a list")]
    CannotRemoveLast,
    /// The id is not in any list reachable in the current mode
    #[error("unknown light {0}")]
    UnknownLight(LightId),
    /// Per-layer mode with no current layer
    #[error("no active light list: per-layer lights need a current layer")]
    NoActiveList,
}

/// Device-space half extents of a light marker for the given icon and viewport.
pub fn marker_half_extents(icon_size: (u32, u32), viewport: Viewport) -> Option<Vec2> {
    if viewport.is_empty() {
        return None;
    }
    let size = viewport.size();
    Some(Vec2::new(icon_size.0 as f32 / size.x, icon_size.1 as f32 / size.y) * MARKER_SCALE)
}
