use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ElementKind, Manifestation, StreamConfig, StreamElement};

/// Default re-evaluation period in seconds.
pub const DEFAULT_TICK_SECONDS: f64 = 1.0;

/// Manually advanced clock driving the scheduler.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    pub time_seconds: f64,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    pub fn advance(&mut self, delta: f64) {
        self.time_seconds = (self.time_seconds + delta).max(0.0);
    }

    pub fn now(&self) -> f64 {
        self.time_seconds
    }
}

/// What drives an element's visibility, in absolute seconds.
#[derive(Debug, Clone, PartialEq)]
enum Plan {
    Continuous,
    Interval { interval: f64, duration: f64 },
    Event { duration: f64, tracked: String },
    /// Required ranges or tracked value are missing; the element stays
    /// visible.
    Unresolved,
}

impl Plan {
    fn for_element(element: &StreamElement) -> Self {
        let Some(ranges) = element.manifestations.as_ref() else {
            return Self::Unresolved;
        };
        let config = &element.config;
        match config.manifestation {
            Manifestation::Continuous => Self::Continuous,
            Manifestation::OnInterval => match ranges.on_interval.as_ref() {
                Some(r) => Self::Interval {
                    interval: r.interval_range.absolute(config.interval),
                    duration: r.duration_range.absolute(config.duration),
                },
                None => Self::Unresolved,
            },
            Manifestation::OnEvent => {
                match (ranges.on_event.as_ref(), tracked_value(element)) {
                    (Some(r), Some(tracked)) => Self::Event {
                        duration: r.duration_range.absolute(config.duration),
                        tracked: tracked.to_string(),
                    },
                    _ => Self::Unresolved,
                }
            }
        }
    }
}

/// Value whose change triggers an `onEvent` element.
pub fn tracked_value(element: &StreamElement) -> Option<&str> {
    match element.identifier {
        ElementKind::CurrentlyPlayingMusic | ElementKind::InformationAboutTheStreamedContent => {
            element.text()
        }
        ElementKind::DigitalCapturedContent
        | ElementKind::StreamerRepresentation
        | ElementKind::ChatOverlay
        | ElementKind::BackgroundMusic
        | ElementKind::TheStreamersVoice => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Timer {
    id: u64,
    next_tick: f64,
}

#[derive(Debug, Clone)]
struct ElementSchedule {
    plan: Plan,
    mounted_at: f64,
    visible: bool,
    timer: Option<Timer>,
    /// Last tracked value whose display window has fully elapsed.
    seen: Option<String>,
    /// Tracked value currently on display and when its window opened.
    window: Option<(String, f64)>,
}

/// Per-element visibility state machines.
#[derive(Debug)]
pub struct ManifestationScheduler {
    tick_seconds: f64,
    schedules: HashMap<String, ElementSchedule>,
    next_timer_id: u64,
}

impl Default for ManifestationScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_SECONDS)
    }
}

impl ManifestationScheduler {
    /// Non-positive periods fall back to [`DEFAULT_TICK_SECONDS`].
    pub fn new(tick_seconds: f64) -> Self {
        let tick_seconds = if tick_seconds > 0.0 {
            tick_seconds
        } else {
            DEFAULT_TICK_SECONDS
        };
        Self {
            tick_seconds,
            schedules: HashMap::new(),
            next_timer_id: 0,
        }
    }

    /// Mounts new elements, reconfigures changed ones and unmounts elements
    /// that disappeared from `config`.
    pub fn sync(&mut self, config: &StreamConfig, now: f64) {
        self.schedules
            .retain(|id, _| config.element(id).is_some_and(|e| e.manifestations.is_some()));

        for element in &config.elements {
            if element.manifestations.is_none() {
                continue;
            }
            self.mount(element, now);
        }
    }

    /// Starts tracking `element`, or updates its schedule if already mounted.
    pub fn mount(&mut self, element: &StreamElement, now: f64) {
        let plan = Plan::for_element(element);
        let id = element.instance_id.clone();

        match self.schedules.get(&id) {
            Some(schedule) if schedule.plan == plan => return,
            Some(_) => {}
            None => {
                tracing::debug!(instance_id = %id, "mounting manifestation schedule");
                self.schedules.insert(
                    id.clone(),
                    ElementSchedule {
                        plan: Plan::Unresolved,
                        mounted_at: now,
                        visible: true,
                        timer: None,
                        seen: None,
                        window: None,
                    },
                );
            }
        }

        let timer_id = self.next_timer_id;
        let tick = self.tick_seconds;
        let Some(schedule) = self.schedules.get_mut(&id) else {
            return;
        };
        schedule.timer = None;
        schedule.plan = plan;

        let needs_timer = match &schedule.plan {
            Plan::Continuous | Plan::Unresolved => {
                schedule.visible = true;
                false
            }
            Plan::Interval { .. } => true,
            Plan::Event { tracked, .. } => {
                if schedule.seen.as_deref() == Some(tracked.as_str()) {
                    schedule.visible = false;
                    schedule.window = None;
                    false
                } else {
                    if !matches!(&schedule.window, Some((shown, _)) if shown == tracked) {
                        schedule.window = Some((tracked.clone(), now));
                    }
                    true
                }
            }
        };

        if needs_timer {
            schedule.timer = Some(Timer {
                id: timer_id,
                next_tick: now + tick,
            });
            self.next_timer_id += 1;
        }
    }

    /// Cancels any timer and forgets the element.
    pub fn unmount(&mut self, instance_id: &str) {
        if self.schedules.remove(instance_id).is_some() {
            tracing::debug!(instance_id, "unmounted manifestation schedule");
        }
    }

    /// Fires every timer that is due at `now`.
    pub fn tick(&mut self, now: f64) {
        if !now.is_finite() {
            tracing::warn!(now, "ignoring tick at a non-finite time");
            return;
        }
        let period = self.tick_seconds;
        for schedule in self.schedules.values_mut() {
            let Some(timer) = schedule.timer.as_mut() else {
                continue;
            };
            if now < timer.next_tick {
                continue;
            }
            // Missed periods collapse into one firing.
            let missed = ((now - timer.next_tick) / period).floor();
            timer.next_tick += (missed + 1.0) * period;
            if timer.next_tick <= now {
                timer.next_tick = now + period;
            }
            evaluate(schedule, now);
        }
    }

    /// Unscheduled elements are always visible.
    pub fn is_visible(&self, instance_id: &str) -> bool {
        self.schedules
            .get(instance_id)
            .map_or(true, |schedule| schedule.visible)
    }

    pub fn is_mounted(&self, instance_id: &str) -> bool {
        self.schedules.contains_key(instance_id)
    }

    pub fn active_timers(&self) -> usize {
        self.schedules.values().filter(|s| s.timer.is_some()).count()
    }

    /// Identifier of the element's running timer, if any.
    pub fn timer_id(&self, instance_id: &str) -> Option<u64> {
        self.schedules.get(instance_id)?.timer.map(|t| t.id)
    }
}

fn evaluate(schedule: &mut ElementSchedule, now: f64) {
    match &schedule.plan {
        Plan::Continuous | Plan::Unresolved => schedule.visible = true,
        Plan::Interval { interval, duration } => {
            let cycle = interval + duration;
            let elapsed = now - schedule.mounted_at;
            schedule.visible = cycle > 0.0 && elapsed.rem_euclid(cycle) < *duration;
        }
        Plan::Event { duration, tracked } => {
            let start = schedule.window.as_ref().map_or(now, |(_, start)| *start);
            if now - start < *duration {
                schedule.visible = true;
            } else {
                schedule.visible = false;
                schedule.seen = Some(tracked.clone());
                schedule.window = None;
                schedule.timer = None;
            }
        }
    }
}

/// Viewer-facing description of each manifestation mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestationLabels {
    pub continuous: String,
    pub on_event: String,
    pub on_interval: String,
}

/// Labels for the element's manifestation picker, or `None` for kinds that
/// do not offer one.
pub fn manifestation_labels(element: &StreamElement) -> Option<ManifestationLabels> {
    match element.identifier {
        ElementKind::CurrentlyPlayingMusic => {
            let ranges = element.manifestations.as_ref()?;
            let on_event = ranges.on_event.as_ref()?;
            let on_interval = ranges.on_interval.as_ref()?;
            let config = &element.config;

            Some(ManifestationLabels {
                continuous: "Always".to_string(),
                on_event: format!(
                    "When Song Changes for {} Seconds",
                    on_event.duration_range.absolute(config.duration).round()
                ),
                on_interval: format!(
                    "Every {} Seconds for {} Seconds",
                    on_interval.interval_range.absolute(config.interval).round(),
                    on_interval.duration_range.absolute(config.duration).round()
                ),
            })
        }
        ElementKind::DigitalCapturedContent
        | ElementKind::StreamerRepresentation
        | ElementKind::ChatOverlay
        | ElementKind::InformationAboutTheStreamedContent
        | ElementKind::BackgroundMusic
        | ElementKind::TheStreamersVoice => None,
    }
}
