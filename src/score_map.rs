use std::collections::HashMap;

/// Destination club name -> accumulated non-negative score.
///
/// Keys keep first-insertion order. Adding to an existing key merges
/// additively; nothing is ever overwritten.
#[derive(Debug, Clone, Default)]
pub struct ScoreMap {
    entries: Vec<(String, f64)>,
    index: HashMap<String, usize>,
}

impl ScoreMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Additive merge. Negative or non-finite amounts contribute nothing but
    /// still register the key.
    pub fn add(&mut self, club: &str, amount: f64) {
        let amount = sanitize(amount);
        match self.index.get(club) {
            Some(&idx) => self.entries[idx].1 += amount,
            None => {
                self.index.insert(club.to_string(), self.entries.len());
                self.entries.push((club.to_string(), amount));
            }
        }
    }

    /// Multiplies one club's score. Factors below zero or non-finite collapse
    /// the score to zero instead of flipping its sign.
    pub fn scale(&mut self, club: &str, factor: f64) {
        if let Some(&idx) = self.index.get(club) {
            let entry = &mut self.entries[idx].1;
            *entry = sanitize(*entry * sanitize(factor));
        }
    }

    pub fn get(&self, club: &str) -> Option<f64> {
        self.index.get(club).map(|&idx| self.entries[idx].1)
    }

    pub fn clubs(&self) -> Vec<String> {
        self.entries.iter().map(|(club, _)| club.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(club, score)| (club.as_str(), *score))
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, score)| score).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scores as percentage points of the total. `None` when the total is
    /// zero or not finite.
    pub fn normalized(&self) -> Option<Vec<(String, f64)>> {
        let total = self.total();
        if !total.is_finite() || total <= 0.0 {
            return None;
        }
        Some(
            self.entries
                .iter()
                .map(|(club, score)| (club.clone(), score / total * 100.0))
                .collect(),
        )
    }
}

fn sanitize(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::ScoreMap;

    #[test]
    fn collisions_are_additive() {
        let mut map = ScoreMap::new();
        map.add("Benfica", 0.25);
        map.add("Ajax", 0.1);
        map.add("Benfica", 0.5);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("Benfica"), Some(0.75));
        assert_eq!(map.clubs(), vec!["Benfica".to_string(), "Ajax".to_string()]);
    }

    #[test]
    fn scores_never_go_negative() {
        let mut map = ScoreMap::new();
        map.add("Ajax", -1.0);
        map.add("PSV", f64::NAN);
        map.add("AZ", 2.0);
        map.scale("AZ", -3.0);
        assert_eq!(map.get("Ajax"), Some(0.0));
        assert_eq!(map.get("PSV"), Some(0.0));
        assert_eq!(map.get("AZ"), Some(0.0));
        assert!(map.normalized().is_none());
    }

    #[test]
    fn normalized_sums_to_one_hundred() {
        let mut map = ScoreMap::new();
        map.add("Alpha", 0.5);
        map.add("Beta", 0.3);
        let norm = map.normalized().unwrap();
        assert!((norm[0].1 - 62.5).abs() < 1e-9);
        assert!((norm[1].1 - 37.5).abs() < 1e-9);
        let sum: f64 = norm.iter().map(|(_, s)| s).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn scaling_unknown_key_is_a_no_op() {
        let mut map = ScoreMap::new();
        map.scale("Ghost", 2.0);
        assert!(map.is_empty());
    }
}
