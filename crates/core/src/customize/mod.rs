use crate::{ConfigProperty, CustomizeError, CustomizeResult, PropertyValue, StreamConfig};

/// Receives the fully updated configuration after a successful edit.
pub type Commit<'a> = &'a mut dyn FnMut(StreamConfig);

/// Replaces one property of one element.
pub fn customize(
    config: Option<&StreamConfig>,
    commit: Option<Commit<'_>>,
    instance_id: &str,
    property: ConfigProperty,
    value: PropertyValue,
) -> CustomizeResult {
    let config = config.ok_or(CustomizeError::Precondition("currentConfig"))?;
    let commit = commit.ok_or(CustomizeError::Precondition("stateUpdateFn"))?;

    let mut updated = config.clone();
    let element = updated
        .element_mut(instance_id)
        .ok_or_else(|| CustomizeError::not_found(instance_id))?;
    element.config.set(property, value)?;

    tracing::debug!(instance_id, property = property.key(), "customized element");
    commit(updated);
    Ok(())
}

/// Applies `(instance_ids[i], properties[i], values[i])` for every `i` as one
/// atomic edit.
///
/// Every id is resolved before anything is applied. Edits land on one private
/// clone, so a single bad entry aborts the whole batch without a commit.
pub fn batch_customize(
    config: Option<&StreamConfig>,
    commit: Option<Commit<'_>>,
    instance_ids: &[&str],
    properties: &[ConfigProperty],
    values: &[PropertyValue],
) -> CustomizeResult {
    if instance_ids.is_empty() {
        return Err(CustomizeError::validation(
            "At least one instanceID of an element to customize must be specified.",
        ));
    }
    if properties.is_empty() {
        return Err(CustomizeError::validation(
            "At least one propertyName to customize must be specified.",
        ));
    }
    if values.is_empty() {
        return Err(CustomizeError::validation(
            "At least one new value resulting from the customization must be specified.",
        ));
    }
    if instance_ids.len() != properties.len() || instance_ids.len() != values.len() {
        return Err(CustomizeError::validation(
            "A newValue must be specified for exactly one element to customize. \
             The same is true for the propertyNames.",
        ));
    }

    let config = config.ok_or(CustomizeError::Precondition("currentConfig"))?;
    let commit = commit.ok_or(CustomizeError::Precondition("stateUpdateFn"))?;

    let indices = instance_ids
        .iter()
        .map(|id| {
            config
                .elements
                .iter()
                .position(|e| e.instance_id == *id)
                .ok_or_else(|| CustomizeError::not_found(*id))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut updated = config.clone();
    for ((&index, &property), value) in indices.iter().zip(properties).zip(values) {
        updated.elements[index].config.set(property, value.clone())?;
    }

    tracing::debug!(edits = indices.len(), "batch customized elements");
    commit(updated);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::fixtures;
    use crate::Location;

    #[derive(Default)]
    struct Recorder {
        commits: Vec<StreamConfig>,
    }

    impl Recorder {
        fn sink(&mut self) -> impl FnMut(StreamConfig) + '_ {
            move |config: StreamConfig| self.commits.push(config)
        }
    }

    #[test]
    fn customize_replaces_exactly_one_property() {
        let config = fixtures::scene();
        let mut recorder = Recorder::default();
        let location = Location::new(0.1, 0.1, 0.3, 0.3);

        let result = customize(
            Some(&config),
            Some(&mut recorder.sink()),
            "camera",
            ConfigProperty::Location,
            PropertyValue::Location(location),
        );

        assert!(result.is_ok());
        assert_eq!(recorder.commits.len(), 1);
        let committed = &recorder.commits[0];
        let mut expected = config.element("camera").unwrap().config.clone();
        expected.location = location;
        assert_eq!(committed.element("camera").unwrap().config, expected);
        assert_eq!(committed.element("game"), config.element("game"));
        assert_eq!(config, fixtures::scene());
    }

    #[test]
    fn customize_unknown_element_never_commits() {
        let config = fixtures::scene();
        let mut recorder = Recorder::default();

        let result = customize(
            Some(&config),
            Some(&mut recorder.sink()),
            "nope",
            ConfigProperty::Volume,
            PropertyValue::Number(0.1),
        );

        assert_eq!(result, Err(CustomizeError::not_found("nope")));
        assert!(recorder.commits.is_empty());
    }

    #[test]
    fn customize_checks_preconditions() {
        let config = fixtures::scene();
        let mut recorder = Recorder::default();

        let missing_config = customize(
            None,
            Some(&mut recorder.sink()),
            "game",
            ConfigProperty::IsEnabled,
            PropertyValue::Flag(false),
        );
        assert!(matches!(missing_config, Err(CustomizeError::Precondition(_))));

        let missing_commit = customize(
            Some(&config),
            None,
            "game",
            ConfigProperty::IsEnabled,
            PropertyValue::Flag(false),
        );
        assert!(matches!(missing_commit, Err(CustomizeError::Precondition(_))));
        assert!(recorder.commits.is_empty());
    }

    #[test]
    fn customize_stores_unclamped_percentages() {
        let config = fixtures::scene();
        let mut recorder = Recorder::default();

        customize(
            Some(&config),
            Some(&mut recorder.sink()),
            "music",
            ConfigProperty::FontSize,
            PropertyValue::Number(1.7),
        )
        .unwrap();

        assert_eq!(recorder.commits[0].element("music").unwrap().config.font_size, 1.7);
    }

    #[test]
    fn batch_commits_once_with_every_edit() {
        let config = fixtures::scene();
        let mut recorder = Recorder::default();

        let result = batch_customize(
            Some(&config),
            Some(&mut recorder.sink()),
            &["game", "camera", "game"],
            &[ConfigProperty::Layer, ConfigProperty::Layer, ConfigProperty::Opacity],
            &[
                PropertyValue::Layer(1),
                PropertyValue::Layer(0),
                PropertyValue::Number(0.25),
            ],
        );

        assert!(result.is_ok());
        assert_eq!(recorder.commits.len(), 1);
        let committed = &recorder.commits[0];
        assert_eq!(committed.element("game").unwrap().config.layer, 1);
        assert_eq!(committed.element("game").unwrap().config.opacity, 0.25);
        assert_eq!(committed.element("camera").unwrap().config.layer, 0);
    }

    #[test]
    fn batch_with_one_unknown_id_commits_nothing() {
        let config = fixtures::scene();
        let mut recorder = Recorder::default();

        let result = batch_customize(
            Some(&config),
            Some(&mut recorder.sink()),
            &["game", "missing", "camera"],
            &[ConfigProperty::Opacity; 3],
            &[
                PropertyValue::Number(0.1),
                PropertyValue::Number(0.2),
                PropertyValue::Number(0.3),
            ],
        );

        assert_eq!(result, Err(CustomizeError::not_found("missing")));
        assert!(recorder.commits.is_empty());
    }

    #[test]
    fn batch_rejects_empty_or_uneven_arrays() {
        let config = fixtures::scene();
        let mut recorder = Recorder::default();

        let empty = batch_customize(Some(&config), Some(&mut recorder.sink()), &[], &[], &[]);
        assert!(matches!(empty, Err(CustomizeError::Validation(_))));

        let uneven = batch_customize(
            Some(&config),
            Some(&mut recorder.sink()),
            &["game", "camera"],
            &[ConfigProperty::Opacity, ConfigProperty::Opacity],
            &[PropertyValue::Number(0.5)],
        );
        assert!(matches!(uneven, Err(CustomizeError::Validation(_))));
        assert!(recorder.commits.is_empty());
    }

    #[test]
    fn batch_validation_runs_before_preconditions() {
        let result = batch_customize(None, None, &["game"], &[], &[]);
        assert!(matches!(result, Err(CustomizeError::Validation(_))));

        let result = batch_customize(
            None,
            None,
            &["game"],
            &[ConfigProperty::Opacity],
            &[PropertyValue::Number(0.5)],
        );
        assert!(matches!(result, Err(CustomizeError::Precondition(_))));
    }

    #[test]
    fn batch_with_mistyped_value_commits_nothing() {
        let config = fixtures::scene();
        let mut recorder = Recorder::default();

        let result = batch_customize(
            Some(&config),
            Some(&mut recorder.sink()),
            &["game", "camera"],
            &[ConfigProperty::Opacity, ConfigProperty::IsEnabled],
            &[PropertyValue::Number(0.5), PropertyValue::Number(1.0)],
        );

        assert!(matches!(result, Err(CustomizeError::Validation(_))));
        assert!(recorder.commits.is_empty());
    }
}
