//! Core library for the stream overlay player.
//!
//! A streamer publishes a canonical scene configuration; each viewer may layer
//! a personal override on top of it. The modules below merge the two, apply
//! and reset viewer edits, plan audio routing for the effective scene, convert
//! element geometry for drag editing and decide when elements are shown.

pub mod audio;
pub mod config;
pub mod customize;
pub mod error;
pub mod fetch;
pub mod geometry;
pub mod mapping;
pub mod persistence;
pub mod render;
pub mod reset;
pub mod scene;
pub mod session;
pub mod store;
pub mod timeline;

pub use audio::{AudioGraph, AudioRouter, MasterVolume, RecordedGraph};
pub use config::{AppConfig, EditingConfig, PlayerConfig};
pub use customize::{batch_customize, customize, Commit};
pub use error::{CustomizeError, CustomizeResult, CustomizeStatus, OverlayError, Result};
pub use fetch::{config_url, ConfigFetcher, FileFetcher};
pub use geometry::{ContainerBox, DragKind, DragSession, Point, ResizeHandle};
pub use mapping::{channel_mapping, ChannelMapping};
pub use persistence::{JsonFileStore, MemoryStore, ViewerStore};
pub use render::{render_plan, RenderItem};
pub use reset::reset_element;
pub use scene::{
    Attribute, AttributeKind, ConfigProperty, ElementKind, Location, Manifestation,
    PropertyValue, Range, StreamConfig, StreamElement, StreamElementConfig,
};
pub use session::{PlayerSession, StreamEvent};
pub use store::{merge, ConfigStore, MergeMode};
pub use timeline::{ManifestationScheduler, PlaybackClock};

#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
