use crate::config::Settings;

/// One labelled score range, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct RankBand {
    pub low: u32,
    pub high: u32,
    pub label: String,
}

impl RankBand {
    pub fn new(low: u32, high: u32, label: impl Into<String>) -> Self {
        Self {
            low,
            high,
            label: label.into(),
        }
    }

    pub fn contains(&self, score: u32) -> bool {
        self.low <= score && score <= self.high
    }
}

/// Ordered bands mapping a final score to a title.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct RankTable {
    bands: Vec<RankBand>,
}

impl Default for RankTable {
    fn default() -> Self {
        Self::new(vec![
            RankBand::new(0, 30, "Aprendiz Terra"),
            RankBand::new(31, 80, "Asesor Jr."),
            RankBand::new(81, 120, "Asesor Senior."),
            RankBand::new(121, u32::MAX, "Maestro Terra"),
        ])
    }
}

impl RankTable {
    pub fn new(bands: Vec<RankBand>) -> Self {
        Self { bands }
    }

    pub fn bands(&self) -> &[RankBand] {
        &self.bands
    }

    /// Label of the first band containing `score`, or of the last band when
    /// none does.
    pub fn rank_for(&self, score: u32) -> &str {
        self.bands
            .iter()
            .find(|band| band.contains(score))
            .or_else(|| self.bands.last())
            .map(|band| band.label.as_str())
            .unwrap_or("")
    }

    /// Whether `label` is the highest title in the table.
    pub fn is_top(&self, label: &str) -> bool {
        self.bands
            .last()
            .map(|band| band.label.trim().eq_ignore_ascii_case(label.trim()))
            .unwrap_or(false)
    }
}

/// Points awarded for one answer.
///
/// Correct answers earn `points_correct`, plus `speed_bonus` when the answer
/// came no later than `time_limit - speed_bonus_threshold` seconds in.
pub fn points_for(is_correct: bool, time_taken_secs: f64, settings: &Settings) -> u32 {
    if !is_correct {
        return 0;
    }

    let mut points = settings.points_correct;
    if time_taken_secs <= f64::from(settings.speed_bonus_deadline()) {
        points = points.saturating_add(settings.speed_bonus);
    }
    points
}

pub fn max_possible_score(question_count: usize, settings: &Settings) -> u64 {
    let per_question = settings.points_correct.saturating_add(settings.speed_bonus);
    (question_count as u64).saturating_mul(u64::from(per_question))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_answers_never_score() {
        let settings = Settings::default();

        for time_taken in [0.0, 5.0, 20.0, 29.9, 30.0, 120.0] {
            assert_eq!(points_for(false, time_taken, &settings), 0);
        }
    }

    #[test]
    fn speed_bonus_ends_at_twenty_seconds() {
        let settings = Settings::default();

        assert_eq!(points_for(true, 0.0, &settings), 15);
        assert_eq!(points_for(true, 5.0, &settings), 15);
        assert_eq!(points_for(true, 20.0, &settings), 15);
        assert_eq!(points_for(true, 20.5, &settings), 10);
        assert_eq!(points_for(true, 21.0, &settings), 10);
        assert_eq!(points_for(true, 30.0, &settings), 10);
    }

    #[test]
    fn every_score_maps_to_exactly_one_band() {
        let table = RankTable::default();

        for score in (0..=2_000).chain([u32::MAX - 1, u32::MAX]) {
            let matching = table
                .bands()
                .iter()
                .filter(|band| band.contains(score))
                .count();
            assert_eq!(matching, 1, "score {score} should fall in exactly one band");
        }
    }

    #[test]
    fn band_edges_pick_expected_labels() {
        let table = RankTable::default();

        assert_eq!(table.rank_for(0), "Aprendiz Terra");
        assert_eq!(table.rank_for(15), "Aprendiz Terra");
        assert_eq!(table.rank_for(30), "Aprendiz Terra");
        assert_eq!(table.rank_for(31), "Asesor Jr.");
        assert_eq!(table.rank_for(80), "Asesor Jr.");
        assert_eq!(table.rank_for(81), "Asesor Senior.");
        assert_eq!(table.rank_for(120), "Asesor Senior.");
        assert_eq!(table.rank_for(121), "Maestro Terra");
        assert_eq!(table.rank_for(50_000), "Maestro Terra");
    }

    #[test]
    fn unmatched_score_falls_back_to_last_band() {
        let table = RankTable::new(vec![
            RankBand::new(10, 20, "Low"),
            RankBand::new(21, 30, "High"),
        ]);

        assert_eq!(table.rank_for(5), "High");
        assert_eq!(table.rank_for(99), "High");
    }

    #[test]
    fn top_label_is_recognised() {
        let table = RankTable::default();

        assert!(table.is_top("Maestro Terra"));
        assert!(table.is_top(" maestro terra "));
        assert!(!table.is_top("Asesor Jr."));
    }

    #[test]
    fn max_score_counts_bonus_for_every_question() {
        assert_eq!(max_possible_score(12, &Settings::default()), 180);
    }

    #[test]
    fn oversized_config_values_saturate() {
        let settings = Settings {
            points_correct: u32::MAX,
            speed_bonus: 5,
            ..Settings::default()
        };

        assert_eq!(points_for(true, 0.0, &settings), u32::MAX);
        assert_eq!(max_possible_score(2, &settings), 2 * u64::from(u32::MAX));
    }
}
