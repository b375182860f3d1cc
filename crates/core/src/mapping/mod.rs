use serde::{Deserialize, Serialize};

use crate::StreamConfig;

/// Number of physical input and output channels supported.
pub const CHANNELS: usize = 2;

/// For every input channel, the output channels it feeds. `None` means no
/// element claims the channel and it passes straight through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMapping(pub [Option<Vec<usize>>; CHANNELS]);

impl ChannelMapping {
    pub fn get(&self, input: usize) -> Option<&[usize]> {
        self.0.get(input)?.as_deref()
    }

    pub fn is_passthrough(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Expands the mapping into `(input, output)` edges for an audio graph.
    pub fn connections(&self) -> Vec<(usize, usize)> {
        let mut edges = Vec::new();
        for (input, outputs) in self.0.iter().enumerate() {
            match outputs {
                Some(outputs) => edges.extend(outputs.iter().map(|&output| (input, output))),
                None => edges.push((input, input)),
            }
        }
        edges
    }
}

/// Computes the channel mapping for `config`.
pub fn channel_mapping(config: &StreamConfig) -> ChannelMapping {
    let claims: Vec<&[usize]> = config
        .elements
        .iter()
        .filter_map(|element| element.audio_channels())
        .collect();

    let mut mapping = ChannelMapping::default();
    for (input, slot) in mapping.0.iter_mut().enumerate() {
        let mut claimants = claims.iter().filter(|claim| claim.contains(&input)).peekable();
        if claimants.peek().is_none() {
            continue;
        }

        let part_of_stereo = claimants.any(|claim| claim.len() > 1);
        *slot = Some(if part_of_stereo {
            vec![input]
        } else {
            (0..CHANNELS).collect()
        });
    }
    mapping
}

/// Gain to apply on each input channel, taken from the element claiming it
/// (`0.0` when muted). With several claimants the last element wins. `None`
/// leaves the channel's gain as it is.
pub fn input_gains(config: &StreamConfig) -> [Option<f64>; CHANNELS] {
    let mut gains = [None; CHANNELS];
    for element in &config.elements {
        let Some(channels) = element.audio_channels() else {
            continue;
        };
        let volume = if element.config.is_volume_muted {
            0.0
        } else {
            element.config.volume
        };
        for &channel in channels {
            if let Some(gain) = gains.get_mut(channel) {
                *gain = Some(volume);
            }
        }
    }
    gains
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{fixtures, AudioStream};

    fn with_claims(claims: &[(&str, &[usize])]) -> StreamConfig {
        let mut config = fixtures::scene();
        for element in &mut config.elements {
            element
                .attributes
                .retain(|a| a.identifier != crate::AttributeKind::AudioSource);
        }
        for (id, channels) in claims {
            let element = config.element_mut(id).unwrap();
            element.attributes.push(crate::Attribute {
                identifier: crate::AttributeKind::AudioSource,
                instance_number: 0,
                resources: crate::scene::AttributeResources {
                    audio_stream: Some(AudioStream {
                        channels: channels.to_vec(),
                    }),
                    ..Default::default()
                },
            });
        }
        config
    }

    #[test]
    fn stereo_claimant_keeps_channels_separate() {
        let config = with_claims(&[("voice", &[0]), ("bgm", &[0, 1])]);
        let mapping = channel_mapping(&config);
        assert_eq!(mapping, ChannelMapping([Some(vec![0]), Some(vec![1])]));
    }

    #[test]
    fn mono_claim_is_duplicated_and_free_channel_passes_through() {
        let config = with_claims(&[("voice", &[0])]);
        let mapping = channel_mapping(&config);
        assert_eq!(mapping, ChannelMapping([Some(vec![0, 1]), None]));
        assert_eq!(mapping.connections(), vec![(0, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn two_mono_sources_are_each_duplicated() {
        let mapping = channel_mapping(&fixtures::scene());
        assert_eq!(mapping.get(0), Some(&[0, 1][..]));
        assert_eq!(mapping.get(1), Some(&[0, 1][..]));
    }

    #[test]
    fn no_claims_means_passthrough() {
        let mapping = channel_mapping(&with_claims(&[]));
        assert!(mapping.is_passthrough());
        assert_eq!(mapping.connections(), vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn mapping_compares_by_value() {
        let a = channel_mapping(&fixtures::scene());
        let b = channel_mapping(&fixtures::scene());
        assert_eq!(a, b);
    }

    #[test]
    fn gains_follow_volume_and_mute() {
        let mut config = fixtures::scene();
        config.element_mut("bgm").unwrap().config.is_volume_muted = true;

        assert_eq!(input_gains(&config), [Some(0.9), Some(0.0)]);
    }

    #[test]
    fn gains_ignore_channels_beyond_stereo() {
        let config = with_claims(&[("voice", &[0, 5])]);
        assert_eq!(input_gains(&config), [Some(0.9), None]);
    }
}
