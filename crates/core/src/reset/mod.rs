use crate::customize::Commit;
use crate::{CustomizeError, CustomizeResult, StreamConfig};

/// Reverts every setting of one element to the broadcaster's baseline.
///
/// If the revert moves the element to a different layer, every element's layer
/// is restored from the baseline as well, which also throws away layer edits
/// the viewer made on other elements. Partial reverts could otherwise leave
/// two elements on the same layer.
pub fn reset_element(
    config: Option<&StreamConfig>,
    commit: Option<Commit<'_>>,
    baseline: Option<&StreamConfig>,
    instance_id: &str,
) -> CustomizeResult {
    let config = config.ok_or(CustomizeError::Precondition("currentConfig"))?;
    let commit = commit.ok_or(CustomizeError::Precondition("streamConfigUpdateFn"))?;
    let baseline = baseline.ok_or(CustomizeError::Precondition("streamConfigFromStreamer"))?;

    let mut updated = config.clone();
    let element = updated
        .element_mut(instance_id)
        .ok_or_else(|| CustomizeError::not_found(instance_id))?;
    let reverted = baseline
        .element(instance_id)
        .ok_or_else(|| CustomizeError::not_found(instance_id))?
        .config
        .clone();

    let layer_before = element.config.layer;
    let layer_changed = layer_before != reverted.layer;
    element.config = reverted;

    if layer_changed {
        tracing::debug!(instance_id, layer_before, "restoring baseline layers");
        for element in &mut updated.elements {
            if let Some(original) = baseline.element(&element.instance_id) {
                element.config.layer = original.config.layer;
            }
        }
    }

    commit(updated);
    Ok(())
}
