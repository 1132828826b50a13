use std::collections::{HashMap, HashSet};

use crate::tables::{Player, TransferRecord};

/// Empirical distribution over destination club names, ordered by count
/// descending then name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    entries: Vec<(String, f64)>,
}

impl Distribution {
    fn from_counts(counts: HashMap<&str, usize>) -> Self {
        let total: usize = counts.values().sum();
        if total == 0 {
            return Self::default();
        }
        let mut counted: Vec<(&str, usize)> = counts.into_iter().collect();
        counted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let entries = counted
            .into_iter()
            .map(|(club, n)| (club.to_string(), n as f64 / total as f64))
            .collect();
        Self { entries }
    }

    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, p)| (k.into(), p)).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(club, p)| (club.as_str(), *p))
    }

    pub fn get(&self, club: &str) -> Option<f64> {
        self.entries.iter().find(|(c, _)| c == club).map(|(_, p)| *p)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Share of each directed (source, destination) pair among all moves that
/// touch one club.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionPattern {
    pairs: Vec<(String, String, f64)>,
}

impl TransitionPattern {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String, f64)>,
    {
        Self {
            pairs: pairs.into_iter().collect(),
        }
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.pairs
            .iter()
            .map(|(from, to, p)| (from.as_str(), to.as_str(), *p))
    }

    /// Destinations reached from `source`, by name.
    pub fn destinations_from<'a>(
        &'a self,
        source: &'a str,
    ) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.pairs
            .iter()
            .filter(move |(from, _, _)| from == source)
            .map(|(_, to, p)| (to.as_str(), *p))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// The three historical signals for one player.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    pub current_club_name: String,
    pub recent_outgoing: Distribution,
    pub transitions: TransitionPattern,
    pub nationality: Distribution,
}

/// Where players leaving `club_id` have gone.
pub fn recent_outgoing(transfers: &[TransferRecord], club_id: Option<u32>) -> Distribution {
    let Some(club_id) = club_id else {
        return Distribution::default();
    };
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in transfers {
        if t.from_club_id == Some(club_id) && !t.to_club_name.is_empty() {
            *counts.entry(t.to_club_name.as_str()).or_default() += 1;
        }
    }
    Distribution::from_counts(counts)
}

pub fn club_transitions(transfers: &[TransferRecord], club_id: Option<u32>) -> TransitionPattern {
    let Some(club_id) = club_id else {
        return TransitionPattern::default();
    };
    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for t in transfers {
        if t.from_club_id != Some(club_id) && t.to_club_id != Some(club_id) {
            continue;
        }
        if t.from_club_name.is_empty() || t.to_club_name.is_empty() {
            continue;
        }
        *counts
            .entry((t.from_club_name.as_str(), t.to_club_name.as_str()))
            .or_default() += 1;
    }

    let total: usize = counts.values().sum();
    if total == 0 {
        return TransitionPattern::default();
    }
    let mut pairs: Vec<((&str, &str), usize)> = counts.into_iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    TransitionPattern {
        pairs: pairs
            .into_iter()
            .map(|((from, to), n)| (from.to_string(), to.to_string(), n as f64 / total as f64))
            .collect(),
    }
}

/// Player ids sharing `nationality`, the subject included.
pub fn nationality_cohort(players: &[Player], nationality: Option<&str>) -> HashSet<u32> {
    let Some(nationality) = nationality else {
        return HashSet::new();
    };
    players
        .iter()
        .filter(|p| p.nationality.as_deref() == Some(nationality))
        .map(|p| p.player_id)
        .collect()
}

/// Where players from the cohort have moved to.
pub fn nationality_affinity(transfers: &[TransferRecord], cohort: &HashSet<u32>) -> Distribution {
    if cohort.is_empty() {
        return Distribution::default();
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in transfers {
        if cohort.contains(&t.player_id) && !t.to_club_name.is_empty() {
            *counts.entry(t.to_club_name.as_str()).or_default() += 1;
        }
    }
    Distribution::from_counts(counts)
}

pub fn extract_patterns(players: &[Player], transfers: &[TransferRecord], player: &Player) -> PatternSet {
    let cohort = nationality_cohort(players, player.nationality.as_deref());
    PatternSet {
        current_club_name: player.current_club_name.clone(),
        recent_outgoing: recent_outgoing(transfers, player.current_club_id),
        transitions: club_transitions(transfers, player.current_club_id),
        nationality: nationality_affinity(transfers, &cohort),
    }
}
