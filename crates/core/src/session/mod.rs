use serde::{Deserialize, Serialize};

use crate::audio::{AudioGraph, AudioRouter, MasterVolume};
use crate::config::AppConfig;
use crate::fetch::{self, ConfigFetcher};
use crate::geometry::{self, ContainerBox, DragKind, DragSession, Point};
use crate::persistence::ViewerStore;
use crate::render::{self, RenderItem};
use crate::timeline::{ManifestationScheduler, PlaybackClock};
use crate::{
    ConfigProperty, ConfigStore, CustomizeError, CustomizeResult, OverlayError, PropertyValue,
    Result, StreamConfig, StreamElement,
};

/// Notifications pushed by the streaming backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamEvent {
    /// The streamer published a new canonical configuration.
    UpdatedStreamerConfig,
}

pub struct PlayerSession<F, S, G> {
    settings: AppConfig,
    fetcher: F,
    viewer_store: S,
    store: ConfigStore,
    router: AudioRouter<G>,
    scheduler: ManifestationScheduler,
    clock: PlaybackClock,
    surface: ContainerBox,
    scene_url: Option<String>,
    drag: Option<DragSession>,
}

impl<F, S, G> PlayerSession<F, S, G>
where
    F: ConfigFetcher,
    S: ViewerStore,
    G: AudioGraph,
{
    pub fn new(settings: AppConfig, fetcher: F, viewer_store: S, graph: G) -> Self {
        let mut store = ConfigStore::new();
        store.set_use_customization(settings.use_customization);
        let scheduler = ManifestationScheduler::new(settings.player.tick_seconds);
        let surface = ContainerBox::new(
            settings.player.base_width_px,
            settings.player.base_width_px / settings.player.aspect_ratio,
        );

        Self {
            settings,
            fetcher,
            viewer_store,
            store,
            router: AudioRouter::new(graph),
            scheduler,
            clock: PlaybackClock::default(),
            surface,
            scene_url: None,
            drag: None,
        }
    }

    pub fn settings(&self) -> &AppConfig {
        &self.settings
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn effective(&self) -> Option<&StreamConfig> {
        self.store.effective()
    }

    pub fn router(&self) -> &AudioRouter<G> {
        &self.router
    }

    pub fn scheduler(&self) -> &ManifestationScheduler {
        &self.scheduler
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn surface(&self) -> ContainerBox {
        self.surface
    }

    pub fn scene_url(&self) -> Option<&str> {
        self.scene_url.as_deref()
    }

    /// Loads the canonical configuration of `scene` and the viewer override
    /// previously saved for it.
    pub fn open_scene(&mut self, scene: &str) -> Result<()> {
        let url = fetch::config_url(self.settings.config_server_url.as_deref(), scene)
            .ok_or_else(|| OverlayError::msg("no config server configured"))?;

        // The override is in place even when the fetch fails, so a later
        // refetch merges against it.
        self.drag = None;
        self.store.set_viewer(self.viewer_store.load(&url));
        self.store.set_canonical(None);
        self.scene_url = Some(url.clone());

        let canonical = self.fetcher.fetch(&url)?;
        tracing::info!(%url, "opened scene");
        self.store.set_canonical(Some(canonical));
        self.refresh();
        Ok(())
    }

    pub fn handle_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::UpdatedStreamerConfig => self.refetch(),
        }
    }

    /// Fetches the canonical configuration again. A failed fetch keeps the
    /// current one.
    fn refetch(&mut self) {
        let Some(url) = self.scene_url.clone() else {
            tracing::debug!("ignoring config update, no scene open");
            return;
        };
        match self.fetcher.fetch(&url) {
            Ok(canonical) => {
                self.store.set_canonical(Some(canonical));
                self.refresh();
            }
            Err(err) => tracing::warn!(%url, %err, "keeping current streamer configuration"),
        }
    }

    pub fn set_use_customization(&mut self, enabled: bool) {
        if !enabled {
            self.drag = None;
        }
        self.store.set_use_customization(enabled);
        self.refresh();
    }

    pub fn element(&self, instance_id: &str) -> Option<StreamElement> {
        self.store.element(instance_id)
    }

    pub fn has_element_been_customized(&self, instance_id: &str) -> Option<bool> {
        self.store.has_element_been_customized(instance_id)
    }

    pub fn customize(
        &mut self,
        instance_id: &str,
        property: ConfigProperty,
        value: PropertyValue,
    ) -> CustomizeResult {
        let (result, viewer) = self.store.customize(instance_id, property, value);
        self.after_edit(viewer);
        result
    }

    pub fn batch_customize(
        &mut self,
        instance_ids: &[&str],
        properties: &[ConfigProperty],
        values: &[PropertyValue],
    ) -> CustomizeResult {
        let (result, viewer) = self.store.batch_customize(instance_ids, properties, values);
        self.after_edit(viewer);
        result
    }

    pub fn reset_element(&mut self, instance_id: &str) -> CustomizeResult {
        let (result, viewer) = self.store.reset_element(instance_id);
        self.after_edit(viewer);
        result
    }

    fn after_edit(&mut self, viewer: Option<StreamConfig>) {
        let Some(viewer) = viewer else {
            return;
        };
        if let Some(url) = self.scene_url.as_deref() {
            self.viewer_store.save(url, Some(&viewer));
        }
        self.refresh();
    }

    /// Fits the render surface into `parent` at the configured aspect ratio.
    pub fn resize_viewport(&mut self, parent: ContainerBox) {
        self.surface = geometry::fit_aspect_ratio(parent, self.settings.player.aspect_ratio);
    }

    /// Starts dragging `instance_id` with the pointer at `cursor`.
    pub fn begin_drag(&mut self, instance_id: &str, kind: DragKind, cursor: Point) -> CustomizeResult {
        self.store.ensure_customizing()?;
        match kind {
            DragKind::Reposition if !self.settings.editing.allow_reposition => {
                return Err(CustomizeError::Precondition("allowReposition"));
            }
            DragKind::Resize(_) if !self.settings.editing.allow_resize => {
                return Err(CustomizeError::Precondition("allowResize"));
            }
            _ => {}
        }
        if self.store.element(instance_id).is_none() {
            return Err(CustomizeError::not_found(instance_id));
        }

        tracing::debug!(instance_id, ?kind, "drag started");
        self.drag = Some(DragSession::begin(instance_id, kind, cursor));
        Ok(())
    }

    /// Moves the pointer of the active drag to `cursor` and commits the new
    /// location.
    pub fn drag_to(&mut self, cursor: Point) -> CustomizeResult {
        let surface = self.surface;
        let Some(drag) = self.drag.as_mut() else {
            return Err(CustomizeError::Precondition("dragSession"));
        };
        let instance_id = drag.instance_id().to_string();
        let current = self
            .store
            .effective()
            .and_then(|config| config.element(&instance_id))
            .map(|element| element.config.location)
            .ok_or_else(|| CustomizeError::not_found(instance_id.as_str()))?;
        let location = drag
            .step(cursor, &current, surface)
            .ok_or_else(|| CustomizeError::validation("render surface has no area"))?;

        self.customize(&instance_id, ConfigProperty::Location, PropertyValue::Location(location))
    }

    pub fn end_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            tracing::debug!(instance_id = drag.instance_id(), "drag finished");
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn set_master_volume(&mut self, master: MasterVolume) {
        self.router.set_master_volume(master);
    }

    /// Advances playback by `delta` seconds and fires due timers.
    pub fn advance(&mut self, delta: f64) {
        self.clock.advance(delta);
        self.scheduler.tick(self.clock.now());
    }

    pub fn render(&self) -> Vec<RenderItem> {
        match self.store.effective() {
            Some(config) => render::render_plan(
                config,
                self.surface,
                self.settings.player.base_width_px,
                &self.scheduler,
            ),
            None => Vec::new(),
        }
    }

    fn refresh(&mut self) {
        let Some(config) = self.store.effective() else {
            return;
        };
        self.router.apply(config);
        self.scheduler.sync(config, self.clock.now());
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::audio::RecordedGraph;
    use crate::geometry::ResizeHandle;
    use crate::persistence::MemoryStore;
    use crate::scene::fixtures;
    use crate::Location;

    const SERVER: &str = "https://configs.example";

    /// Serves configs from memory; a missing entry is a fetch failure.
    #[derive(Default)]
    struct StubFetcher {
        configs: RefCell<HashMap<String, StreamConfig>>,
    }

    impl StubFetcher {
        fn publish(&self, scene: &str, config: StreamConfig) {
            let url = fetch::config_url(Some(SERVER), scene).unwrap();
            self.configs.borrow_mut().insert(url, config);
        }

        fn withdraw(&self, scene: &str) {
            let url = fetch::config_url(Some(SERVER), scene).unwrap();
            self.configs.borrow_mut().remove(&url);
        }
    }

    impl ConfigFetcher for StubFetcher {
        fn fetch(&self, url: &str) -> Result<StreamConfig> {
            self.configs
                .borrow()
                .get(url)
                .cloned()
                .ok_or_else(|| OverlayError::Fetch {
                    url: url.to_string(),
                    reason: "not published".into(),
                })
        }
    }

    fn settings() -> AppConfig {
        AppConfig {
            config_server_url: Some(SERVER.into()),
            ..AppConfig::default()
        }
    }

    fn open<'a>(
        fetcher: &'a StubFetcher,
        viewer: &'a MemoryStore,
        settings: AppConfig,
    ) -> PlayerSession<&'a StubFetcher, &'a MemoryStore, RecordedGraph> {
        fetcher.publish("main", fixtures::scene());
        let mut session = PlayerSession::new(settings, fetcher, viewer, RecordedGraph::default());
        session.open_scene("main").unwrap();
        session
    }

    #[test]
    fn opening_a_scene_wires_every_consumer() {
        let (fetcher, viewer) = (StubFetcher::default(), MemoryStore::new());
        let session = open(&fetcher, &viewer, settings());

        assert_eq!(session.scene_url(), Some("https://configs.example/main.json"));
        assert_eq!(session.effective(), Some(&fixtures::scene()));
        assert_eq!(session.router().graph().rebuilds, 1);
        assert!(session.scheduler().is_mounted("music"));
        assert_eq!(session.render().len(), 3);
    }

    #[test]
    fn opening_without_server_fails() {
        let (fetcher, viewer) = (StubFetcher::default(), MemoryStore::new());
        let mut session =
            PlayerSession::new(AppConfig::default(), &fetcher, &viewer, RecordedGraph::default());
        assert!(session.open_scene("main").is_err());
        assert!(session.effective().is_none());
        assert!(session.render().is_empty());
    }

    #[test]
    fn successful_edits_are_persisted_under_the_scene_url() {
        let (fetcher, viewer) = (StubFetcher::default(), MemoryStore::new());
        let mut session = open(&fetcher, &viewer, settings());

        session
            .customize("voice", ConfigProperty::IsVolumeMuted, PropertyValue::Flag(true))
            .unwrap();

        let saved = viewer.load("https://configs.example/main.json").unwrap();
        assert!(saved.element("voice").unwrap().config.is_volume_muted);
        assert_eq!(session.router().graph().input_gains[0], 0.0);
        assert_eq!(session.has_element_been_customized("voice"), Some(true));
    }

    #[test]
    fn failed_edits_change_nothing() {
        let (fetcher, viewer) = (StubFetcher::default(), MemoryStore::new());
        let mut session = open(&fetcher, &viewer, settings());

        let err = session
            .customize("ghost", ConfigProperty::Opacity, PropertyValue::Number(0.1))
            .unwrap_err();
        assert_eq!(err, CustomizeError::not_found("ghost"));
        assert!(viewer.is_empty());
    }

    #[test]
    fn saved_override_is_restored_on_open() {
        let (fetcher, viewer) = (StubFetcher::default(), MemoryStore::new());
        {
            let mut session = open(&fetcher, &viewer, settings());
            session
                .customize("camera", ConfigProperty::Opacity, PropertyValue::Number(0.3))
                .unwrap();
        }

        let session = open(&fetcher, &viewer, settings());
        assert_eq!(session.element("camera").unwrap().config.opacity, 0.3);
    }

    #[test]
    fn streamer_update_refetches_and_keeps_viewer_edits() {
        let (fetcher, viewer) = (StubFetcher::default(), MemoryStore::new());
        let mut session = open(&fetcher, &viewer, settings());
        session
            .customize("camera", ConfigProperty::Opacity, PropertyValue::Number(0.3))
            .unwrap();

        let mut updated = fixtures::scene();
        updated.elements.retain(|e| e.instance_id != "game");
        fetcher.publish("main", updated);
        session.handle_event(StreamEvent::UpdatedStreamerConfig);

        let effective = session.effective().unwrap();
        assert!(effective.element("game").is_none());
        assert_eq!(effective.element("camera").unwrap().config.opacity, 0.3);
    }

    #[test]
    fn failed_refetch_keeps_current_canonical() {
        let (fetcher, viewer) = (StubFetcher::default(), MemoryStore::new());
        let mut session = open(&fetcher, &viewer, settings());

        fetcher.withdraw("main");
        session.handle_event(StreamEvent::UpdatedStreamerConfig);
        assert_eq!(session.store().canonical(), Some(&fixtures::scene()));
    }

    #[test]
    fn failed_open_keeps_saved_override_for_the_next_update() {
        let (fetcher, viewer) = (StubFetcher::default(), MemoryStore::new());
        let url = fetch::config_url(Some(SERVER), "main").unwrap();
        let mut saved = fixtures::scene();
        saved.element_mut("camera").unwrap().config.opacity = 0.3;
        viewer.save(&url, Some(&saved));

        let mut session = PlayerSession::new(settings(), &fetcher, &viewer, RecordedGraph::default());
        assert!(session.open_scene("main").is_err());
        assert_eq!(session.scene_url(), Some(url.as_str()));
        assert_eq!(session.store().viewer(), Some(&saved));
        assert!(session.store().canonical().is_none());

        fetcher.publish("main", fixtures::scene());
        session.handle_event(StreamEvent::UpdatedStreamerConfig);
        let effective = session.effective().unwrap();
        assert_eq!(effective.element("camera").unwrap().config.opacity, 0.3);
        assert_eq!(session.router().graph().rebuilds, 1);
    }

    #[test]
    fn disabling_customization_blocks_edits_and_shows_canonical() {
        let (fetcher, viewer) = (StubFetcher::default(), MemoryStore::new());
        let mut session = open(&fetcher, &viewer, settings());
        session
            .customize("camera", ConfigProperty::Opacity, PropertyValue::Number(0.3))
            .unwrap();

        session.set_use_customization(false);
        assert_eq!(session.element("camera").unwrap().config.opacity, 1.0);
        assert_eq!(
            session.reset_element("camera"),
            Err(CustomizeError::Precondition("isUsingCustomization"))
        );

        session.set_use_customization(true);
        assert_eq!(session.element("camera").unwrap().config.opacity, 0.3);
    }

    #[test]
    fn drag_moves_element_on_the_surface() {
        let (fetcher, viewer) = (StubFetcher::default(), MemoryStore::new());
        let mut session = open(&fetcher, &viewer, settings());
        session.resize_viewport(ContainerBox::new(1280.0, 1000.0));
        assert_eq!(session.surface(), ContainerBox::new(1280.0, 720.0));

        session
            .begin_drag("game", DragKind::Resize(ResizeHandle::Se), Point::new(1280.0, 720.0))
            .unwrap();
        session.drag_to(Point::new(640.0, 360.0)).unwrap();
        session.end_drag();

        let location = session.element("game").unwrap().config.location;
        assert_eq!(location, Location::new(0.0, 0.0, 0.5, 0.5));
        assert!(!session.is_dragging());
        assert_eq!(session.drag_to(Point::new(0.0, 0.0)), Err(CustomizeError::Precondition("dragSession")));
    }

    #[test]
    fn vendor_switches_gate_geometry_editing() {
        let (fetcher, viewer) = (StubFetcher::default(), MemoryStore::new());
        let mut settings = settings();
        settings.editing.allow_resize = false;
        let mut session = open(&fetcher, &viewer, settings);

        assert_eq!(
            session.begin_drag("game", DragKind::Resize(ResizeHandle::N), Point::default()),
            Err(CustomizeError::Precondition("allowResize"))
        );
        assert!(session.begin_drag("game", DragKind::Reposition, Point::default()).is_ok());
        assert_eq!(
            session.begin_drag("ghost", DragKind::Reposition, Point::default()),
            Err(CustomizeError::not_found("ghost"))
        );
    }

    #[test]
    fn clock_drives_manifestation_visibility() {
        let (fetcher, viewer) = (StubFetcher::default(), MemoryStore::new());
        let mut session = open(&fetcher, &viewer, settings());

        session.advance(7.0);
        let music = |s: &PlayerSession<_, _, _>| {
            s.render().into_iter().find(|i| i.instance_id == "music").unwrap().visible
        };
        assert!(!music(&session));
        session.advance(9.0);
        assert!(music(&session));
    }

    #[test]
    fn master_volume_reaches_the_graph() {
        let (fetcher, viewer) = (StubFetcher::default(), MemoryStore::new());
        let mut session = open(&fetcher, &viewer, settings());

        session.set_master_volume(MasterVolume {
            volume: 0.25,
            muted: false,
        });
        assert_eq!(session.router().graph().output_gain, 0.25);
    }
}
