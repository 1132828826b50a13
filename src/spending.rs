use std::collections::HashMap;

use crate::tables::TransferRecord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpendingProfile {
    pub mean: f64,
    pub std_dev: f64,
    pub transfers: usize,
}

impl SpendingProfile {
    pub fn upper_limit(&self, std_multiplier: f64) -> f64 {
        self.mean + std_multiplier * self.std_dev
    }
}

/// Fees received per destination club name. Unknown fees count as zero, so a
/// club that mostly signs free agents ends up with a low mean.
#[derive(Debug, Clone, Default)]
pub struct SpendingProfiles {
    by_club: HashMap<String, SpendingProfile>,
}

impl SpendingProfiles {
    pub fn compute(transfers: &[TransferRecord]) -> Self {
        let mut fees: HashMap<&str, Vec<f64>> = HashMap::new();
        for t in transfers {
            if t.to_club_name.is_empty() {
                continue;
            }
            fees.entry(t.to_club_name.as_str())
                .or_default()
                .push(t.fee_or_zero());
        }

        let by_club = fees
            .into_iter()
            .map(|(club, values)| (club.to_string(), profile_of(&values)))
            .collect();
        Self { by_club }
    }

    pub fn insert(&mut self, club: impl Into<String>, profile: SpendingProfile) {
        self.by_club.insert(club.into(), profile);
    }

    pub fn get(&self, club: &str) -> Option<&SpendingProfile> {
        self.by_club.get(club)
    }

    pub fn len(&self) -> usize {
        self.by_club.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_club.is_empty()
    }
}

// Sample standard deviation; a single observation has none, reported as 0.
fn profile_of(values: &[f64]) -> SpendingProfile {
    let n = values.len();
    if n == 0 {
        return SpendingProfile {
            mean: 0.0,
            std_dev: 0.0,
            transfers: 0,
        };
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let std_dev = if n > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };
    SpendingProfile {
        mean,
        std_dev,
        transfers: n,
    }
}
