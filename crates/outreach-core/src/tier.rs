use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Severity classification of an attendance record, most to least severe.
/// The set is closed: template content per tier is user-editable, tier
/// identity is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Significantly,
    Moderately,
    Slightly,
    OnTrack,
}

impl Tier {
    pub fn all() -> &'static [Tier] {
        &[
            Tier::Significantly,
            Tier::Moderately,
            Tier::Slightly,
            Tier::OnTrack,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Significantly => "significantly",
            Tier::Moderately => "moderately",
            Tier::Slightly => "slightly",
            Tier::OnTrack => "on_track",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = crate::error::OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "significantly" => Ok(Tier::Significantly),
            "moderately" => Ok(Tier::Moderately),
            "slightly" => Ok(Tier::Slightly),
            "on_track" => Ok(Tier::OnTrack),
            _ => Err(crate::error::OutreachError::InvalidTier(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Map the two governing metrics to a tier. Pure and total; rules are
/// evaluated in order and the first match wins.
///
/// Note the asymmetric boundary: `significantly` needs days absent
/// *strictly* greater than 30, so (30, 30) lands in `moderately`.
pub fn classify(hours_behind: u32, days_absent: u32) -> Tier {
    if hours_behind >= 30 && days_absent > 30 {
        Tier::Significantly
    } else if hours_behind >= 15 {
        Tier::Moderately
    } else if hours_behind > 10 {
        Tier::Slightly
    } else {
        Tier::OnTrack
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_boundary_table() {
        let cases = [
            (30, 31, Tier::Significantly),
            (30, 30, Tier::Moderately),
            (29, 100, Tier::Moderately),
            (15, 0, Tier::Moderately),
            (14, 0, Tier::Slightly),
            (11, 0, Tier::Slightly),
            (10, 0, Tier::OnTrack),
            (0, 0, Tier::OnTrack),
        ];
        for (hours, days, expected) in cases {
            assert_eq!(classify(hours, days), expected, "({hours}, {days})");
        }
    }

    #[test]
    fn classify_is_deterministic() {
        for hours in 0..60 {
            for days in 0..60 {
                assert_eq!(classify(hours, days), classify(hours, days));
            }
        }
    }

    #[test]
    fn tier_roundtrip() {
        use std::str::FromStr;
        for tier in Tier::all() {
            assert_eq!(Tier::from_str(tier.as_str()).unwrap(), *tier);
        }
    }

    #[test]
    fn tier_rejects_unknown_token() {
        assert!("severely".parse::<Tier>().is_err());
        assert!("".parse::<Tier>().is_err());
    }

    #[test]
    fn tier_serde_tokens() {
        assert_eq!(
            serde_json::to_string(&Tier::OnTrack).unwrap(),
            "\"on_track\""
        );
        assert_eq!(
            serde_json::from_str::<Tier>("\"significantly\"").unwrap(),
            Tier::Significantly
        );
    }
}
