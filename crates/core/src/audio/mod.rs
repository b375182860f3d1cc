use crate::mapping::{self, ChannelMapping, CHANNELS};
use crate::StreamConfig;

/// Audio graph backend: splitter, per-channel input gains and output gains.
///
/// Implementations own the actual nodes; the router only tells them what to
/// wire and how loud each stage is.
pub trait AudioGraph {
    /// Tears down the current wiring and connects inputs to outputs as
    /// described by `mapping`.
    fn rebuild(&mut self, mapping: &ChannelMapping);

    fn set_input_gain(&mut self, channel: usize, gain: f64);

    fn set_output_gain(&mut self, gain: f64);
}

/// Master volume applied on every output channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasterVolume {
    pub volume: f64,
    pub muted: bool,
}

impl Default for MasterVolume {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
        }
    }
}

impl MasterVolume {
    pub fn gain(&self) -> f64 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }
}

/// Keeps an [`AudioGraph`] in sync with the effective configuration.
#[derive(Debug)]
pub struct AudioRouter<G> {
    graph: G,
    mapping: Option<ChannelMapping>,
    master: MasterVolume,
}

impl<G: AudioGraph> AudioRouter<G> {
    pub fn new(graph: G) -> Self {
        Self {
            graph,
            mapping: None,
            master: MasterVolume::default(),
        }
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn mapping(&self) -> Option<&ChannelMapping> {
        self.mapping.as_ref()
    }

    pub fn master(&self) -> MasterVolume {
        self.master
    }

    /// Re-plans routing for `config`. The graph is only rebuilt when the
    /// mapping differs by value from the previous one; returns whether it was.
    pub fn apply(&mut self, config: &StreamConfig) -> bool {
        let mapping = mapping::channel_mapping(config);
        let rebuilt = self.mapping.as_ref() != Some(&mapping);

        if rebuilt {
            tracing::info!(?mapping, "rebuilding audio graph");
            self.graph.rebuild(&mapping);
            self.graph.set_output_gain(self.master.gain());
            self.mapping = Some(mapping);
        }

        for (channel, gain) in mapping::input_gains(config).into_iter().enumerate() {
            if let Some(gain) = gain {
                self.graph.set_input_gain(channel, gain);
            }
        }
        rebuilt
    }

    pub fn set_master_volume(&mut self, master: MasterVolume) {
        self.master = master;
        self.graph.set_output_gain(master.gain());
    }
}

/// In-memory graph that records the wiring it was asked to build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedGraph {
    pub rebuilds: usize,
    pub connections: Vec<(usize, usize)>,
    pub input_gains: [f64; CHANNELS],
    pub output_gain: f64,
}

impl AudioGraph for RecordedGraph {
    fn rebuild(&mut self, mapping: &ChannelMapping) {
        self.rebuilds += 1;
        self.connections = mapping.connections();
        self.input_gains = [1.0; CHANNELS];
    }

    fn set_input_gain(&mut self, channel: usize, gain: f64) {
        if let Some(slot) = self.input_gains.get_mut(channel) {
            *slot = gain;
        }
    }

    fn set_output_gain(&mut self, gain: f64) {
        self.output_gain = gain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::fixtures;

    #[test]
    fn rebuilds_only_when_mapping_changes() {
        let mut router = AudioRouter::new(RecordedGraph::default());
        let mut config = fixtures::scene();

        assert!(router.apply(&config));
        assert_eq!(router.graph().rebuilds, 1);

        config.element_mut("voice").unwrap().config.volume = 0.2;
        assert!(!router.apply(&config));
        assert_eq!(router.graph().rebuilds, 1);
        assert_eq!(router.graph().input_gains[0], 0.2);

        config.element_mut("bgm").unwrap().attributes.clear();
        assert!(router.apply(&config));
        assert_eq!(router.graph().rebuilds, 2);
        assert_eq!(router.graph().connections, vec![(0, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn master_volume_drives_output_gain() {
        let mut router = AudioRouter::new(RecordedGraph::default());
        router.apply(&fixtures::scene());
        assert_eq!(router.graph().output_gain, 1.0);

        router.set_master_volume(MasterVolume {
            volume: 0.5,
            muted: false,
        });
        assert_eq!(router.graph().output_gain, 0.5);

        router.set_master_volume(MasterVolume {
            volume: 0.5,
            muted: true,
        });
        assert_eq!(router.graph().output_gain, 0.0);
    }
}
