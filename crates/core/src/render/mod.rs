use serde::{Deserialize, Serialize};

use crate::geometry::{self, ContainerBox};
use crate::timeline::ManifestationScheduler;
use crate::{AttributeKind, ElementKind, Location, StreamConfig};

/// One element as it should be drawn on the render surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderItem {
    pub instance_id: String,
    pub kind: ElementKind,
    /// Pixel rectangle on the surface.
    pub rect: Location,
    pub z_index: u32,
    pub opacity: f64,
    /// Pixel font size for elements carrying text.
    pub font_size_px: Option<f64>,
    pub visible: bool,
    /// Relative crop of the source video, for elements showing part of it.
    pub source: Option<Location>,
}

impl RenderItem {
    /// Crop rectangle in pixels of a decoded stream of `resolution`.
    pub fn source_pixels(&self, resolution: ContainerBox) -> Option<Location> {
        self.source
            .as_ref()
            .map(|source| geometry::source_video_rect(source, resolution))
    }
}

/// Draw list for `config` on a surface of `surface` pixels, back to front.
///
/// Disabled elements and audio-only kinds are left out. Visibility comes from
/// `scheduler`; an empty surface yields an empty plan.
pub fn render_plan(
    config: &StreamConfig,
    surface: ContainerBox,
    base_width_px: f64,
    scheduler: &ManifestationScheduler,
) -> Vec<RenderItem> {
    let mut items: Vec<RenderItem> = config
        .elements
        .iter()
        .filter(|element| element.config.is_enabled && !element.identifier.is_invisible())
        .filter_map(|element| {
            let rect = geometry::to_absolute(&element.config.location, surface)?;
            let font_size_px = element.font_size_range().map(|range| {
                geometry::font_size_px(range, element.config.font_size, surface.width, base_width_px)
            });
            let source = element
                .attribute(AttributeKind::VideoSource)
                .and_then(|attribute| attribute.resources.video_stream);

            Some(RenderItem {
                instance_id: element.instance_id.clone(),
                kind: element.identifier,
                rect,
                z_index: element.config.layer,
                opacity: element.config.opacity,
                font_size_px,
                visible: scheduler.is_visible(&element.instance_id),
                source,
            })
        })
        .collect();

    items.sort_by_key(|item| item.z_index);
    items
}
