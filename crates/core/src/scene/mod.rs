//! Stream configuration data model.
//!
//! Field names and nesting follow the JSON documents produced by the
//! broadcaster tooling (`{"elements": [...]}`), so every type here derives
//! `Serialize`/`Deserialize` with explicit camelCase renames.

use serde::{Deserialize, Serialize};

use crate::CustomizeError;

/// The overall configuration of a stream: every overlaid element.
///
/// Element order carries no meaning; z-order lives in
/// [`StreamElementConfig::layer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub elements: Vec<StreamElement>,
}

impl StreamConfig {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn element(&self, instance_id: &str) -> Option<&StreamElement> {
        self.elements.iter().find(|e| e.instance_id == instance_id)
    }

    pub fn element_mut(&mut self, instance_id: &str) -> Option<&mut StreamElement> {
        self.elements.iter_mut().find(|e| e.instance_id == instance_id)
    }
}

/// Returns an owned copy of the element so callers cannot mutate the live
/// configuration by accident.
pub fn element(config: Option<&StreamConfig>, instance_id: &str) -> Option<StreamElement> {
    config?.element(instance_id).cloned()
}

/// Closed set of element kinds a broadcaster can place in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    DigitalCapturedContent,
    StreamerRepresentation,
    ChatOverlay,
    InformationAboutTheStreamedContent,
    CurrentlyPlayingMusic,
    BackgroundMusic,
    TheStreamersVoice,
}

impl ElementKind {
    /// Audio-only kinds that never produce anything on the render surface.
    pub fn is_invisible(self) -> bool {
        matches!(self, Self::BackgroundMusic | Self::TheStreamersVoice)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamElement {
    pub identifier: ElementKind,
    pub title: String,
    pub instance_id: String,
    pub config: StreamElementConfig,
    pub customizable_properties: Vec<ConfigProperty>,
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifestations: Option<ManifestationRanges>,
}

impl StreamElement {
    /// First attribute of the requested kind, if any.
    pub fn attribute(&self, kind: AttributeKind) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.identifier == kind)
    }

    /// Source channels claimed through the element's `audio_source` attribute.
    pub fn audio_channels(&self) -> Option<&[usize]> {
        self.attribute(AttributeKind::AudioSource)?
            .resources
            .audio_stream
            .as_ref()
            .map(|stream| stream.channels.as_slice())
    }

    pub fn text(&self) -> Option<&str> {
        self.attribute(AttributeKind::TextSource)?
            .resources
            .text
            .as_deref()
    }

    pub fn font_size_range(&self) -> Option<Range> {
        self.attribute(AttributeKind::TextSource)?
            .resources
            .font_size_range
    }

    pub fn is_customizable(&self, property: ConfigProperty) -> bool {
        self.customizable_properties.contains(&property)
    }
}

/// Rectangle in coordinates relative to its container, `(x0, y0)` top left
/// and `(x1, y1)` bottom right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Location {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// Time-windowed visibility policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Manifestation {
    Continuous,
    OnEvent,
    OnInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamElementConfig {
    pub location: Location,
    pub layer: u32,
    pub is_enabled: bool,
    pub volume: f64,
    pub is_volume_muted: bool,
    pub opacity: f64,
    /// Percentage into the element's font size range.
    pub font_size: f64,
    pub manifestation: Manifestation,
    /// Percentage into the element's interval range.
    pub interval: f64,
    /// Percentage into the element's duration range.
    pub duration: f64,
}

impl StreamElementConfig {
    pub fn get(&self, property: ConfigProperty) -> PropertyValue {
        match property {
            ConfigProperty::Location => PropertyValue::Location(self.location),
            ConfigProperty::Layer => PropertyValue::Layer(self.layer),
            ConfigProperty::IsEnabled => PropertyValue::Flag(self.is_enabled),
            ConfigProperty::Volume => PropertyValue::Number(self.volume),
            ConfigProperty::IsVolumeMuted => PropertyValue::Flag(self.is_volume_muted),
            ConfigProperty::Opacity => PropertyValue::Number(self.opacity),
            ConfigProperty::FontSize => PropertyValue::Number(self.font_size),
            ConfigProperty::Manifestation => PropertyValue::Manifestation(self.manifestation),
            ConfigProperty::Interval => PropertyValue::Number(self.interval),
            ConfigProperty::Duration => PropertyValue::Number(self.duration),
        }
    }

    /// Replaces exactly one property. Values are stored as given; percentages
    /// are not clamped.
    pub fn set(&mut self, property: ConfigProperty, value: PropertyValue) -> Result<(), CustomizeError> {
        match (property, value) {
            (ConfigProperty::Location, PropertyValue::Location(location)) => self.location = location,
            (ConfigProperty::Layer, PropertyValue::Layer(layer)) => self.layer = layer,
            (ConfigProperty::IsEnabled, PropertyValue::Flag(flag)) => self.is_enabled = flag,
            (ConfigProperty::IsVolumeMuted, PropertyValue::Flag(flag)) => self.is_volume_muted = flag,
            (ConfigProperty::Volume, PropertyValue::Number(n)) => self.volume = n,
            (ConfigProperty::Opacity, PropertyValue::Number(n)) => self.opacity = n,
            (ConfigProperty::FontSize, PropertyValue::Number(n)) => self.font_size = n,
            (ConfigProperty::Interval, PropertyValue::Number(n)) => self.interval = n,
            (ConfigProperty::Duration, PropertyValue::Number(n)) => self.duration = n,
            (ConfigProperty::Manifestation, PropertyValue::Manifestation(m)) => self.manifestation = m,
            (property, value) => return Err(mismatch(property, &value)),
        }
        Ok(())
    }
}

fn mismatch(property: ConfigProperty, value: &PropertyValue) -> CustomizeError {
    CustomizeError::validation(format!(
        "value {value:?} cannot be assigned to `{}`",
        property.key()
    ))
}

/// Names of the customizable fields of [`StreamElementConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigProperty {
    Location,
    Layer,
    IsEnabled,
    Volume,
    IsVolumeMuted,
    Opacity,
    FontSize,
    Manifestation,
    Interval,
    Duration,
}

impl ConfigProperty {
    pub const ALL: [ConfigProperty; 10] = [
        Self::Location,
        Self::Layer,
        Self::IsEnabled,
        Self::Volume,
        Self::IsVolumeMuted,
        Self::Opacity,
        Self::FontSize,
        Self::Manifestation,
        Self::Interval,
        Self::Duration,
    ];

    /// Wire name of the property.
    pub fn key(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Layer => "layer",
            Self::IsEnabled => "isEnabled",
            Self::Volume => "volume",
            Self::IsVolumeMuted => "isVolumeMuted",
            Self::Opacity => "opacity",
            Self::FontSize => "fontSize",
            Self::Manifestation => "manifestation",
            Self::Interval => "interval",
            Self::Duration => "duration",
        }
    }

    /// Label shown to viewers in element settings.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::IsEnabled => "Is Visible",
            Self::IsVolumeMuted => "Is Volume Muted",
            Self::Layer => "Order",
            Self::Location => "Location",
            Self::Volume => "Volume",
            Self::Opacity => "Opacity",
            Self::FontSize => "Text Size",
            Self::Manifestation => "Show Element",
            Self::Interval => "Every",
            Self::Duration => "For",
        }
    }
}

impl std::str::FromStr for ConfigProperty {
    type Err = CustomizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.key() == s)
            .ok_or_else(|| CustomizeError::validation(format!("unknown property `{s}`")))
    }
}

/// A value for one [`ConfigProperty`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Location(Location),
    Flag(bool),
    Layer(u32),
    Number(f64),
    Manifestation(Manifestation),
}

impl PropertyValue {
    /// Parses a JSON literal into the value type expected by `property`.
    pub fn parse(property: ConfigProperty, raw: &str) -> Result<Self, CustomizeError> {
        let invalid =
            |err: serde_json::Error| CustomizeError::validation(format!("`{raw}`: {err}"));
        let value = match property {
            ConfigProperty::Location => Self::Location(serde_json::from_str(raw).map_err(invalid)?),
            ConfigProperty::Layer => Self::Layer(serde_json::from_str(raw).map_err(invalid)?),
            ConfigProperty::IsEnabled | ConfigProperty::IsVolumeMuted => {
                Self::Flag(serde_json::from_str(raw).map_err(invalid)?)
            }
            ConfigProperty::Manifestation => {
                Self::Manifestation(serde_json::from_str(raw).map_err(invalid)?)
            }
            ConfigProperty::Volume
            | ConfigProperty::Opacity
            | ConfigProperty::FontSize
            | ConfigProperty::Interval
            | ConfigProperty::Duration => Self::Number(serde_json::from_str(raw).map_err(invalid)?),
        };
        Ok(value)
    }
}

/// Closed numeric range used to interpret percentage-based fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub from: f64,
    pub to: f64,
}

impl Range {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    /// Maps a percentage in `[0, 1]` into the range.
    pub fn absolute(&self, percentage: f64) -> f64 {
        self.from + (self.to - self.from) * percentage
    }

    /// Inverse of [`Range::absolute`].
    pub fn percentage(&self, absolute: f64) -> f64 {
        (absolute - self.from) / (self.to - self.from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    VideoSource,
    AudioSource,
    TextSource,
}

/// Typed capability record attached to an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub identifier: AttributeKind,
    /// Increments by one for each attribute of the same kind on an element.
    #[serde(default)]
    pub instance_number: u32,
    pub resources: AttributeResources,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeResources {
    /// Area of the source video, relative to the source resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_stream: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_stream: Option<AudioStream>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size_range: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStream {
    /// Source channels, numbered left to right.
    pub channels: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestationRanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_event: Option<OnEventRanges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_interval: Option<OnIntervalRanges>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnEventRanges {
    pub duration_range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnIntervalRanges {
    pub interval_range: Range,
    pub duration_range: Range,
}
