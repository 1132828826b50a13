use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::config::{AffordabilityBands, EngineConfig, SourceWeights};
use crate::market_trends::InvestmentScores;
use crate::patterns::PatternSet;
use crate::score_map::ScoreMap;
use crate::spending::{SpendingProfile, SpendingProfiles};
use crate::tables::{ClubDirectory, MarketValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffordabilityBand {
    /// Value above `mean + k * std`: the club rarely pays this much.
    Penalized,
    Neutral,
    /// Value below the club's mean fee.
    Bonus,
}

impl AffordabilityBand {
    pub fn classify(value: f64, profile: &SpendingProfile, bands: &AffordabilityBands) -> Self {
        if value > profile.upper_limit(bands.std_multiplier) {
            AffordabilityBand::Penalized
        } else if value < profile.mean {
            AffordabilityBand::Bonus
        } else {
            AffordabilityBand::Neutral
        }
    }

    pub fn multiplier(self, bands: &AffordabilityBands) -> f64 {
        match self {
            AffordabilityBand::Penalized => bands.over_limit_multiplier,
            AffordabilityBand::Neutral => 1.0,
            AffordabilityBand::Bonus => bands.under_mean_multiplier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDestination {
    pub club_name: String,
    pub club_id: Option<u32>,
    pub score: f64,
}

/// Ranked destinations. Serialises as a JSON object keyed by club name, in
/// rank order: `{ "Club": { "score": .., "club_id": .. } }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedDestinations(pub Vec<RankedDestination>);

impl RankedDestinations {
    pub fn iter(&self) -> impl Iterator<Item = &RankedDestination> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, club_name: &str) -> Option<&RankedDestination> {
        self.0.iter().find(|d| d.club_name == club_name)
    }

    pub fn total(&self) -> f64 {
        self.0.iter().map(|d| d.score).sum()
    }
}

impl Serialize for RankedDestinations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Entry {
            score: f64,
            club_id: Option<u32>,
        }

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for d in &self.0 {
            map.serialize_entry(
                &d.club_name,
                &Entry {
                    score: d.score,
                    club_id: d.club_id,
                },
            )?;
        }
        map.end()
    }
}

/// Step 1: weighted additive merge of the three pattern sources.
pub fn accumulate(patterns: &PatternSet, weights: &SourceWeights) -> ScoreMap {
    let mut map = ScoreMap::new();
    for (club, p) in patterns.recent_outgoing.iter() {
        map.add(club, p * weights.recent_outgoing);
    }
    for (club, p) in patterns
        .transitions
        .destinations_from(&patterns.current_club_name)
    {
        map.add(club, p * weights.club_transitions);
    }
    for (club, p) in patterns.nationality.iter() {
        map.add(club, p * weights.nationality);
    }
    map
}

/// Step 2: `score *= 1 + investment / 10` for clubs whose league has a score.
pub fn apply_league_multiplier(
    map: &mut ScoreMap,
    clubs: &ClubDirectory,
    investment: &InvestmentScores,
) {
    for club in map.clubs() {
        let league = investment.lookup(clubs.league_for_name(&club));
        map.scale(&club, league.multiplier());
    }
}

/// Step 3: three-band step adjustment against each club's fee history.
/// Skipped entirely when the market value is unknown.
pub fn apply_affordability(
    map: &mut ScoreMap,
    market_value: MarketValue,
    spending: &SpendingProfiles,
    bands: &AffordabilityBands,
) {
    let Some(value) = market_value.known() else {
        return;
    };
    for club in map.clubs() {
        if let Some(profile) = spending.get(&club) {
            let band = AffordabilityBand::classify(value, profile, bands);
            map.scale(&club, band.multiplier(bands));
        }
    }
}

/// Step 4: percentage points of the total, empty when the total is zero.
pub fn normalize(map: &ScoreMap) -> Vec<(String, f64)> {
    map.normalized().unwrap_or_default()
}

/// Step 5: highest scores first, ties by club name, rounded to 2 decimals.
pub fn select_top(
    mut normalized: Vec<(String, f64)>,
    k: usize,
    clubs: &ClubDirectory,
) -> RankedDestinations {
    normalized.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    RankedDestinations(
        normalized
            .into_iter()
            .take(k)
            .map(|(club_name, score)| RankedDestination {
                club_id: clubs.id_for_name(&club_name),
                score: round2(score.clamp(0.0, 100.0)),
                club_name,
            })
            .collect(),
    )
}

pub struct DestinationInputs<'a> {
    pub patterns: &'a PatternSet,
    pub clubs: &'a ClubDirectory,
    pub investment: &'a InvestmentScores,
    pub spending: &'a SpendingProfiles,
    pub market_value: MarketValue,
}

/// Merges the pattern distributions into one [`ScoreMap`], boosts clubs by
/// their league's investment score, adjusts for whether the club has paid
/// fees of the player's size, then normalises to percentage points and keeps
/// the top K.
pub fn score_destinations(inputs: &DestinationInputs<'_>, cfg: &EngineConfig) -> RankedDestinations {
    let mut map = accumulate(inputs.patterns, &cfg.weights);
    apply_league_multiplier(&mut map, inputs.clubs, inputs.investment);
    apply_affordability(&mut map, inputs.market_value, inputs.spending, &cfg.affordability);
    select_top(normalize(&map), cfg.top_k, inputs.clubs)
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
