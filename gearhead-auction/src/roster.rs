//! Rival roster data and item interest.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::item::AuctionItem;
use crate::numbers::share_of;
use crate::rival::{RivalEntry, RivalId, RivalMood};

const DEFAULT_ROSTER_DATA: &str = include_str!("../assets/data/rivals.json");

/// Baseline interest every invited rival brings to the room.
const BASE_INTEREST: f32 = 0.3;
/// Share of interest driven by matching favorite tags.
const TAG_INTEREST_SPAN: f32 = 0.5;
/// Bonus for cars at or above the rival's condition floor.
const CONDITION_BONUS: f32 = 0.2;
/// Penalty for cars below the rival's condition floor.
const CONDITION_PENALTY: f32 = 0.25;

/// Static description of a rival bidder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RivalProfile {
    /// Filled from the roster key when loaded.
    #[serde(default, skip_serializing)]
    pub id: RivalId,
    pub name: String,
    #[serde(default)]
    pub mood: RivalMood,
    pub wallet: i64,
    #[serde(default)]
    pub favorite_tags: Vec<String>,
    /// Minimum condition the rival considers worth chasing.
    #[serde(default)]
    pub condition_floor: u8,
}

impl RivalProfile {
    /// Preference match for `item` in `0.0..=1.0`.
    #[must_use]
    pub fn interest_in(&self, item: &AuctionItem) -> f32 {
        let tag_share = if self.favorite_tags.is_empty() {
            0.5
        } else {
            let matches = self
                .favorite_tags
                .iter()
                .filter(|tag| item.has_tag(tag))
                .count();
            share_of(matches, self.favorite_tags.len())
        };
        let condition = if item.condition >= self.condition_floor {
            CONDITION_BONUS
        } else {
            -CONDITION_PENALTY
        };
        (BASE_INTEREST + tag_share * TAG_INTEREST_SPAN + condition).clamp(0.0, 1.0)
    }

    #[must_use]
    pub fn entry_for(&self, item: &AuctionItem) -> RivalEntry {
        RivalEntry {
            rival_id: self.id.clone(),
            interest: self.interest_in(item),
            mood: self.mood,
            wallet: self.wallet,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error("rival roster is empty")]
    Empty,
    #[error("rival {0} is not on the roster")]
    UnknownRival(RivalId),
    #[error("rival {id} has a negative wallet ({wallet})")]
    NegativeWallet { id: RivalId, wallet: i64 },
    #[error("rival {id} condition floor {floor} exceeds 100")]
    ConditionFloor { id: RivalId, floor: u8 },
}

/// All known rivals keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RivalRoster {
    rivals: BTreeMap<RivalId, RivalProfile>,
}

impl RivalRoster {
    /// Parse a roster document keyed by rival id.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut roster: Self = serde_json::from_str(json)?;
        for (id, profile) in &mut roster.rivals {
            profile.id = id.clone();
        }
        Ok(roster)
    }

    /// Load the embedded roster, or an empty one if it fails to parse.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_ROSTER_DATA).unwrap_or_default()
    }

    /// # Errors
    ///
    /// Returns `RosterError` for an empty roster or out-of-range profile data.
    pub fn validate(&self) -> Result<(), RosterError> {
        if self.rivals.is_empty() {
            return Err(RosterError::Empty);
        }
        for profile in self.rivals.values() {
            if profile.wallet < 0 {
                return Err(RosterError::NegativeWallet {
                    id: profile.id.clone(),
                    wallet: profile.wallet,
                });
            }
            if profile.condition_floor > 100 {
                return Err(RosterError::ConditionFloor {
                    id: profile.id.clone(),
                    floor: profile.condition_floor,
                });
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, mut profile: RivalProfile) {
        profile.id = RivalId::new(profile.id.as_str());
        self.rivals.insert(profile.id.clone(), profile);
    }

    #[must_use]
    pub fn get(&self, id: &RivalId) -> Option<&RivalProfile> {
        self.rivals.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &RivalId> {
        self.rivals.keys()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &RivalProfile> {
        self.rivals.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rivals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rivals.is_empty()
    }

    /// Construction entries for the invited rivals, in invitation order.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::UnknownRival` for an id not on the roster.
    pub fn entries_for(
        &self,
        invited: &[RivalId],
        item: &AuctionItem,
    ) -> Result<Vec<RivalEntry>, RosterError> {
        invited
            .iter()
            .map(|id| {
                self.get(id)
                    .map(|profile| profile.entry_for(item))
                    .ok_or_else(|| RosterError::UnknownRival(id.clone()))
            })
            .collect()
    }
}
