use serde::{Deserialize, Serialize};

use crate::scene::{Location, Range};
use crate::CustomizeError;

/// Pixel size of a container (render surface, decoded video, ...).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainerBox {
    pub width: f64,
    pub height: f64,
}

impl ContainerBox {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn is_usable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Relative `[0, 1]` location to pixels. `None` for an empty container.
pub fn to_absolute(location: &Location, container: ContainerBox) -> Option<Location> {
    if !container.is_usable() {
        return None;
    }
    Some(Location {
        x0: location.x0 * container.width,
        y0: location.y0 * container.height,
        x1: location.x1 * container.width,
        y1: location.y1 * container.height,
    })
}

/// Pixels to a relative `[0, 1]` location. `None` for an empty container.
pub fn to_relative(location: &Location, container: ContainerBox) -> Option<Location> {
    if !container.is_usable() {
        return None;
    }
    Some(Location {
        x0: location.x0 / container.width,
        y0: location.y0 / container.height,
        x1: location.x1 / container.width,
        y1: location.y1 / container.height,
    })
}

/// Drag handles around an element, named by compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl std::str::FromStr for ResizeHandle {
    type Err = CustomizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "n" => Self::N,
            "ne" => Self::Ne,
            "e" => Self::E,
            "se" => Self::Se,
            "s" => Self::S,
            "sw" => Self::Sw,
            "w" => Self::W,
            "nw" => Self::Nw,
            other => {
                return Err(CustomizeError::validation(format!(
                    "unknown resize handle `{other}`"
                )))
            }
        })
    }
}

/// Moves the edges grabbed by `handle`. `delta` is anchor minus cursor, so
/// edges move by `-delta`.
pub fn resize(absolute: &Location, handle: ResizeHandle, delta: Point) -> Location {
    let mut out = *absolute;
    let (dx, dy) = (delta.x, delta.y);
    match handle {
        ResizeHandle::N => out.y0 -= dy,
        ResizeHandle::Ne => {
            out.x1 -= dx;
            out.y0 -= dy;
        }
        ResizeHandle::E => out.x1 -= dx,
        ResizeHandle::Se => {
            out.x1 -= dx;
            out.y1 -= dy;
        }
        ResizeHandle::S => out.y1 -= dy,
        ResizeHandle::Sw => {
            out.x0 -= dx;
            out.y1 -= dy;
        }
        ResizeHandle::W => out.x0 -= dx,
        ResizeHandle::Nw => {
            out.x0 -= dx;
            out.y0 -= dy;
        }
    }
    out
}

/// Translates all four coordinates by `-delta`.
pub fn translate(absolute: &Location, delta: Point) -> Location {
    Location {
        x0: absolute.x0 - delta.x,
        y0: absolute.y0 - delta.y,
        x1: absolute.x1 - delta.x,
        y1: absolute.y1 - delta.y,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Reposition,
    Resize(ResizeHandle),
}

/// One pointer drag on one element.
///
/// Each [`DragSession::step`] applies the delta since the previous step and
/// re-anchors at the current cursor, so rounding never accumulates over a
/// long drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    instance_id: String,
    kind: DragKind,
    anchor: Point,
}

impl DragSession {
    pub fn begin(instance_id: impl Into<String>, kind: DragKind, cursor: Point) -> Self {
        Self {
            instance_id: instance_id.into(),
            kind,
            anchor: cursor,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn kind(&self) -> DragKind {
        self.kind
    }

    pub fn anchor(&self) -> Point {
        self.anchor
    }

    /// New relative location for the element currently at `current`.
    pub fn step(
        &mut self,
        cursor: Point,
        current: &Location,
        container: ContainerBox,
    ) -> Option<Location> {
        let absolute = to_absolute(current, container)?;
        let delta = Point::new(self.anchor.x - cursor.x, self.anchor.y - cursor.y);
        let moved = match self.kind {
            DragKind::Reposition => translate(&absolute, delta),
            DragKind::Resize(handle) => resize(&absolute, handle, delta),
        };
        self.anchor = cursor;
        to_relative(&moved, container)
    }
}

/// Largest box of the given aspect ratio that fits into `parent`.
pub fn fit_aspect_ratio(parent: ContainerBox, aspect_ratio: f64) -> ContainerBox {
    if parent.aspect_ratio() < aspect_ratio {
        ContainerBox::new(parent.width, parent.width / aspect_ratio)
    } else {
        ContainerBox::new(parent.height * aspect_ratio, parent.height)
    }
}

/// Font size in pixels for a percentage into `range`. Ranges are expressed for
/// a surface `base_width` pixels wide and scale with the actual width.
pub fn font_size_px(range: Range, percentage: f64, surface_width: f64, base_width: f64) -> f64 {
    range.absolute(percentage) * (surface_width / base_width)
}

/// Relative rectangle of the source video to pixels of the decoded stream.
pub fn source_video_rect(relative: &Location, resolution: ContainerBox) -> Location {
    Location {
        x0: relative.x0 * resolution.width,
        y0: relative.y0 * resolution.height,
        x1: relative.x1 * resolution.width,
        y1: relative.y1 * resolution.height,
    }
}
