//! Traffic types and the player-facing traffic configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrafficType {
    Static,
    Read,
    Write,
    Search,
    Upload,
    Malicious,
}

impl TrafficType {
    /// Canonical order. Weighted selection accumulates in this order,
    /// so it must never change.
    pub const ALL: [TrafficType; 6] = [
        Self::Static,
        Self::Read,
        Self::Write,
        Self::Search,
        Self::Upload,
        Self::Malicious,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Static    => "static",
            Self::Read      => "read",
            Self::Write     => "write",
            Self::Search    => "search",
            Self::Upload    => "upload",
            Self::Malicious => "malicious",
        }
    }
}

/// One number per traffic type: percentages in aggregate mode,
/// requests/sec in granular mode.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct TrafficMix {
    #[serde(rename = "static")]
    pub static_assets: f64,
    pub read: f64,
    pub write: f64,
    pub search: f64,
    pub upload: f64,
    pub malicious: f64,
}

impl TrafficMix {
    pub const fn new(
        static_assets: f64,
        read: f64,
        write: f64,
        search: f64,
        upload: f64,
        malicious: f64,
    ) -> Self {
        Self { static_assets, read, write, search, upload, malicious }
    }

    pub fn get(&self, t: TrafficType) -> f64 {
        match t {
            TrafficType::Static    => self.static_assets,
            TrafficType::Read      => self.read,
            TrafficType::Write     => self.write,
            TrafficType::Search    => self.search,
            TrafficType::Upload    => self.upload,
            TrafficType::Malicious => self.malicious,
        }
    }

    pub fn total(&self) -> f64 {
        TrafficType::ALL.iter().map(|t| self.get(*t)).sum()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrafficMode {
    Aggregate,
    Granular,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrafficConfig {
    pub mode: TrafficMode,
    /// Requests/sec across all gateways (aggregate mode).
    pub total_rate: f64,
    /// Percent per type (aggregate mode). Not required to sum to 100.
    pub distribution: TrafficMix,
    /// Requests/sec per type (granular mode).
    pub granular_rates: TrafficMix,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            mode: TrafficMode::Aggregate,
            total_rate: 5.0,
            distribution: TrafficMix::new(30.0, 25.0, 10.0, 10.0, 5.0, 20.0),
            granular_rates: TrafficMix::new(2.0, 2.0, 1.0, 1.0, 0.5, 1.0),
        }
    }
}

impl TrafficConfig {
    pub fn aggregate(total_rate: f64, distribution: TrafficMix) -> Self {
        Self {
            mode: TrafficMode::Aggregate,
            total_rate,
            distribution,
            ..Self::default()
        }
    }

    pub fn granular(rates: TrafficMix) -> Self {
        Self {
            mode: TrafficMode::Granular,
            granular_rates: rates,
            ..Self::default()
        }
    }

    /// Merge a partial update; absent fields keep their value.
    pub fn apply(&mut self, patch: &TrafficPatch) {
        if let Some(mode) = patch.mode {
            self.mode = mode;
        }
        if let Some(rate) = patch.total_rate {
            self.total_rate = rate.max(0.0);
        }
        if let Some(dist) = patch.distribution {
            self.distribution = dist;
        }
        if let Some(rates) = patch.granular_rates {
            self.granular_rates = rates;
        }
    }
}

/// Partial traffic update, as issued by the player or a scenario script.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct TrafficPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<TrafficMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<TrafficMix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granular_rates: Option<TrafficMix>,
}

impl TrafficPatch {
    pub fn rate(total_rate: f64) -> Self {
        Self { total_rate: Some(total_rate), ..Self::default() }
    }

    pub fn rate_and_mix(total_rate: f64, distribution: TrafficMix) -> Self {
        Self {
            total_rate: Some(total_rate),
            distribution: Some(distribution),
            ..Self::default()
        }
    }

    /// First field holding a negative or non-finite number, as
    /// `(name, value)`. A patch with one is refused whole.
    pub fn invalid_field(&self) -> Option<(&'static str, f64)> {
        if let Some(rate) = self.total_rate {
            if !rate.is_finite() || rate < 0.0 {
                return Some(("total_rate", rate));
            }
        }
        for mix in [self.distribution, self.granular_rates].into_iter().flatten() {
            for t in TrafficType::ALL {
                let value = mix.get(t);
                if !value.is_finite() || value < 0.0 {
                    return Some((t.label(), value));
                }
            }
        }
        None
    }
}

/// Cumulative weighted selection over the canonical type order.
///
/// `roll` is a draw in [0, 100). The first type whose running total
/// exceeds the roll wins. When the distribution sums to less than the
/// roll the request falls back to `Read`.
pub fn pick_weighted(distribution: &TrafficMix, roll: f64) -> TrafficType {
    let mut cumulative = 0.0;
    for t in TrafficType::ALL {
        cumulative += distribution.get(t);
        if roll < cumulative {
            return t;
        }
    }
    TrafficType::Read
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_pick_walks_canonical_order() {
        let mix = TrafficMix::new(30.0, 25.0, 10.0, 10.0, 5.0, 20.0);
        assert_eq!(pick_weighted(&mix, 0.0), TrafficType::Static);
        assert_eq!(pick_weighted(&mix, 29.9), TrafficType::Static);
        assert_eq!(pick_weighted(&mix, 30.0), TrafficType::Read);
        assert_eq!(pick_weighted(&mix, 79.9), TrafficType::Upload);
        assert_eq!(pick_weighted(&mix, 99.9), TrafficType::Malicious);
    }

    #[test]
    fn undersaturated_mix_falls_back_to_read() {
        let mix = TrafficMix::new(10.0, 0.0, 0.0, 0.0, 0.0, 10.0);
        assert_eq!(pick_weighted(&mix, 50.0), TrafficType::Read);
    }

    #[test]
    fn oversaturated_mix_starves_later_types() {
        let mix = TrafficMix::new(100.0, 0.0, 0.0, 0.0, 0.0, 50.0);
        assert_eq!(pick_weighted(&mix, 99.0), TrafficType::Static);
    }

    #[test]
    fn patch_keeps_unset_fields() {
        let mut cfg = TrafficConfig::default();
        let before = cfg.distribution;
        cfg.apply(&TrafficPatch::rate(100.0));
        assert_eq!(cfg.total_rate, 100.0);
        assert_eq!(cfg.distribution, before);
    }
}
