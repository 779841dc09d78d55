use crate::config::GuidanceConfig;
use crate::processing::LaneScores;
use crate::prelude::Lane;

/// Picks the lane to step toward, away from the active hazard's side.
pub struct LaneGuidance {
    config: GuidanceConfig,
}

impl LaneGuidance {
    pub fn new(config: GuidanceConfig) -> Self {
        Self { config }
    }

    pub fn preference_order(hazard_direction: Lane) -> [Lane; 3] {
        match hazard_direction {
            Lane::Left => [Lane::Right, Lane::Center, Lane::Left],
            Lane::Right => [Lane::Left, Lane::Center, Lane::Right],
            Lane::Center => [Lane::Left, Lane::Right, Lane::Center],
        }
    }

    /// Returns the chosen lane and its spoken phrase.
    ///
    /// The first lane in preference order that is open enough wins. If every
    /// lane is blocked, the most open one wins and earlier lanes win ties.
    pub fn choose(&self, hazard_direction: Lane, scores: &LaneScores) -> (Lane, String) {
        let order = Self::preference_order(hazard_direction);
        let lane = order
            .iter()
            .copied()
            .find(|lane| scores.get(*lane) >= self.config.min_open_score)
            .unwrap_or_else(|| {
                order.iter().copied().fold(order[0], |best, lane| {
                    if scores.get(lane) > scores.get(best) {
                        lane
                    } else {
                        best
                    }
                })
            });
        let phrase = format!("move {} {}", self.config.move_word, lane);
        (lane, phrase)
    }
}
