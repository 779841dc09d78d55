use crate::config::TrackingConfig;
use crate::interface::HazardDetection;
use std::collections::{BTreeMap, HashSet};

/// A persistent identity, remembered by its last center.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub track_id: u64,
    pub center: (f32, f32),
    /// Frames since the track was last matched.
    pub age: u32,
}

/// Greedy nearest-center tracker with bounded age.
pub struct IdentityTracker {
    config: TrackingConfig,
    tracks: BTreeMap<u64, Track>,
    next_id: u64,
}

impl IdentityTracker {
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            tracks: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn live_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Stamps `track_id` on every detection. Input order is match priority, so
    /// callers pass detections nearest first.
    pub fn assign(&mut self, detections: &mut [HazardDetection]) {
        let mut used: HashSet<u64> = HashSet::with_capacity(detections.len());

        for det in detections.iter_mut() {
            let (cx, cy) = det.bbox.center();
            let best = self
                .tracks
                .values()
                .filter(|track| !used.contains(&track.track_id))
                .map(|track| {
                    let delta = (cx - track.center.0).abs() + (cy - track.center.1).abs();
                    (track.track_id, delta)
                })
                .min_by(|a, b| a.1.total_cmp(&b.1));

            let track_id = match best {
                Some((id, delta)) if delta <= self.config.match_tolerance_px => {
                    if let Some(track) = self.tracks.get_mut(&id) {
                        track.center = (cx, cy);
                        track.age = 0;
                    }
                    id
                }
                _ => {
                    let id = self.next_id;
                    self.next_id += 1;
                    self.tracks.insert(
                        id,
                        Track {
                            track_id: id,
                            center: (cx, cy),
                            age: 0,
                        },
                    );
                    id
                }
            };

            used.insert(track_id);
            det.track_id = Some(track_id);
        }

        self.age_tracks(&used);
    }

    fn age_tracks(&mut self, touched: &HashSet<u64>) {
        let max_age = self.config.max_age_frames;
        for track in self.tracks.values_mut() {
            if !touched.contains(&track.track_id) {
                track.age += 1;
            }
        }
        self.tracks.retain(|_, track| track.age <= max_age);
    }
}
