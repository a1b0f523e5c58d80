//! Sponsor tiers by the size of the sponsorship.

use std::fmt::Display;

/// Sponsorships of at least this many rupees are Gold.
pub const GOLD_THRESHOLD: f64 = 200_000.0;
/// Sponsorships of at least this many rupees are Silver.
pub const SILVER_THRESHOLD: f64 = 50_000.0;

/// The tier of a sponsor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SponsorTier {
    Gold,
    Silver,
    Bronze,
}

impl SponsorTier {
    /// Classify a sponsorship amount in rupees.
    ///
    /// An amount that is not a number, e.g. NaN, is Bronze.
    pub fn from_amount(amount: f64) -> Self {
        if amount >= GOLD_THRESHOLD {
            SponsorTier::Gold
        } else if amount >= SILVER_THRESHOLD {
            SponsorTier::Silver
        } else {
            SponsorTier::Bronze
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SponsorTier::Gold => "Gold",
            SponsorTier::Silver => "Silver",
            SponsorTier::Bronze => "Bronze",
        }
    }

    /// Tailwind classes for the tier's badge.
    pub fn badge_class(&self) -> &'static str {
        match self {
            SponsorTier::Gold => "bg-yellow-500 text-black",
            SponsorTier::Silver => "bg-slate-300 text-slate-900",
            SponsorTier::Bronze => "bg-amber-700 text-white",
        }
    }
}

impl Display for SponsorTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
