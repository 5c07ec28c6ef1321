//! Rebalance schedules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::date::Date;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Rebalance {
    /// Every trading day
    #[default]
    Daily,
    /// First trading day of each Monday-based week
    Weekly,
    /// First trading day of each calendar month
    Monthly,
}

impl Rebalance {
    /// Whether trading day `current` opens a new period after trading day `previous`.
    pub fn is_new_period(self, previous: Date, current: Date) -> bool {
        match self {
            Self::Daily => current != previous,
            Self::Weekly => current.week_key() != previous.week_key(),
            Self::Monthly => current.month_key() != previous.month_key(),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Rebalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
