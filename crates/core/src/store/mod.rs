use serde::{Deserialize, Serialize};

use crate::{
    customize, reset, ConfigProperty, CustomizeError, CustomizeResult, PropertyValue,
    StreamConfig, StreamElement,
};

/// How the viewer override is combined with the canonical configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Replace each matching element's `config` with the viewer's.
    #[default]
    Merge,
    /// Use the viewer configuration verbatim.
    Overwrite,
}

/// Layers `viewer` on top of `canonical`. Neither input is modified.
///
/// A missing side yields the other one. In [`MergeMode::Merge`] elements are
/// matched by `instanceId` and the whole `config` object is replaced; elements
/// present on only one side are never added or removed.
pub fn merge(
    canonical: Option<&StreamConfig>,
    viewer: Option<&StreamConfig>,
    mode: MergeMode,
) -> Option<StreamConfig> {
    let Some(canonical) = canonical else {
        return viewer.cloned();
    };
    let Some(viewer) = viewer else {
        return Some(canonical.clone());
    };

    match mode {
        MergeMode::Overwrite => Some(viewer.clone()),
        MergeMode::Merge => {
            let mut merged = canonical.clone();
            for element in &viewer.elements {
                if let Some(target) = merged.element_mut(&element.instance_id) {
                    target.config = element.config.clone();
                }
            }
            Some(merged)
        }
    }
}

/// Whether the element's settings differ from the broadcaster's.
///
/// `None` when the element is missing from either configuration.
pub fn has_element_been_customized(
    effective: Option<&StreamConfig>,
    canonical: Option<&StreamConfig>,
    instance_id: &str,
) -> Option<bool> {
    let current = effective?.element(instance_id)?;
    let baseline = canonical?.element(instance_id)?;
    Some(current.config != baseline.config)
}

/// Owns the canonical and viewer configurations and the effective snapshot
/// derived from them.
///
/// Every edit goes through the engines in [`crate::customize`] and
/// [`crate::reset`] against the effective snapshot; a successful edit replaces
/// the viewer override wholesale and hands it back to the caller for
/// persistence.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    canonical: Option<StreamConfig>,
    viewer: Option<StreamConfig>,
    effective: Option<StreamConfig>,
    use_customization: bool,
    mode: MergeMode,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    pub fn new() -> Self {
        Self {
            canonical: None,
            viewer: None,
            effective: None,
            use_customization: true,
            mode: MergeMode::Merge,
        }
    }

    pub fn with_mode(mut self, mode: MergeMode) -> Self {
        self.mode = mode;
        self.recompute();
        self
    }

    pub fn canonical(&self) -> Option<&StreamConfig> {
        self.canonical.as_ref()
    }

    pub fn viewer(&self) -> Option<&StreamConfig> {
        self.viewer.as_ref()
    }

    pub fn effective(&self) -> Option<&StreamConfig> {
        self.effective.as_ref()
    }

    pub fn uses_customization(&self) -> bool {
        self.use_customization
    }

    /// Replaces the canonical configuration wholesale. The last call wins, no
    /// matter how stale the data is.
    pub fn set_canonical(&mut self, canonical: Option<StreamConfig>) {
        tracing::info!(
            elements = canonical.as_ref().map(|c| c.elements.len()),
            "canonical configuration replaced"
        );
        self.canonical = canonical;
        self.recompute();
    }

    pub fn set_viewer(&mut self, viewer: Option<StreamConfig>) {
        self.viewer = viewer;
        self.recompute();
    }

    /// When disabled the effective configuration is the canonical one; the
    /// viewer override is kept untouched.
    pub fn set_use_customization(&mut self, enabled: bool) {
        self.use_customization = enabled;
        self.recompute();
    }

    pub fn element(&self, instance_id: &str) -> Option<StreamElement> {
        crate::scene::element(self.effective(), instance_id)
    }

    pub fn has_element_been_customized(&self, instance_id: &str) -> Option<bool> {
        has_element_been_customized(self.effective(), self.canonical(), instance_id)
    }

    /// Applies one property change. On success the new viewer override is
    /// returned alongside the result so it can be persisted.
    pub fn customize(
        &mut self,
        instance_id: &str,
        property: ConfigProperty,
        value: PropertyValue,
    ) -> (CustomizeResult, Option<StreamConfig>) {
        if let Err(err) = self.ensure_customizing() {
            return (Err(err), None);
        }
        let mut committed = None;
        let result = customize::customize(
            self.effective.as_ref(),
            Some(&mut |config: StreamConfig| committed = Some(config)),
            instance_id,
            property,
            value,
        );
        self.accept(result, committed)
    }

    pub fn batch_customize(
        &mut self,
        instance_ids: &[&str],
        properties: &[ConfigProperty],
        values: &[PropertyValue],
    ) -> (CustomizeResult, Option<StreamConfig>) {
        if let Err(err) = self.ensure_customizing() {
            return (Err(err), None);
        }
        let mut committed = None;
        let result = customize::batch_customize(
            self.effective.as_ref(),
            Some(&mut |config: StreamConfig| committed = Some(config)),
            instance_ids,
            properties,
            values,
        );
        self.accept(result, committed)
    }

    pub fn reset_element(&mut self, instance_id: &str) -> (CustomizeResult, Option<StreamConfig>) {
        if let Err(err) = self.ensure_customizing() {
            return (Err(err), None);
        }
        let mut committed = None;
        let result = reset::reset_element(
            self.effective.as_ref(),
            Some(&mut |config: StreamConfig| committed = Some(config)),
            self.canonical.as_ref(),
            instance_id,
        );
        self.accept(result, committed)
    }

    /// Edits are rejected while customization is disabled so the preserved
    /// override is never rebuilt from the canonical configuration.
    pub fn ensure_customizing(&self) -> CustomizeResult {
        if self.use_customization {
            Ok(())
        } else {
            Err(CustomizeError::Precondition("isUsingCustomization"))
        }
    }

    fn accept(
        &mut self,
        result: CustomizeResult,
        committed: Option<StreamConfig>,
    ) -> (CustomizeResult, Option<StreamConfig>) {
        match committed {
            Some(config) => {
                self.viewer = Some(config);
                self.recompute();
                (result, self.viewer.clone())
            }
            None => (result, None),
        }
    }

    fn recompute(&mut self) {
        self.effective = if self.use_customization {
            merge(self.canonical.as_ref(), self.viewer.as_ref(), self.mode)
        } else {
            self.canonical.clone()
        };
    }
}
