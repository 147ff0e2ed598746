//! Centralized balance and tuning constants for the auction engine.
//!
//! These values seed the serde defaults in [`crate::config`]. Data files may
//! override them, but every default lives here so a balance change shows up
//! in one reviewable diff.

// Logging --------------------------------------------------------------------
pub(crate) const LOG_TARGET: &str = "gearhead_auction";

// Pricing --------------------------------------------------------------------
pub(crate) const DEFAULT_OPENING_RATIO: f32 = 0.75;
pub(crate) const DEFAULT_BID_INCREMENT: i64 = 500;
pub(crate) const DEFAULT_POWER_BID_INCREMENT: i64 = 1_500;
pub(crate) const DEFAULT_RIVAL_ONLY_CAP_RATIO: f32 = 1.05;
pub(crate) const DEFAULT_BID_HISTORY_WINDOW: usize = 10;

// Pressure -------------------------------------------------------------------
pub(crate) const DEFAULT_OUTBID_PATIENCE_COST: i32 = 5;
pub(crate) const DEFAULT_POWER_BID_PATIENCE_COST: i32 = 15;
pub(crate) const DEFAULT_STALL_PATIENCE_COST: i32 = 20;
pub(crate) const DEFAULT_KICK_TIRES_BUDGET_PCT: f32 = 0.12;

// Skill gates ----------------------------------------------------------------
pub(crate) const DEFAULT_KICK_TIRES_MIN_SKILL: u8 = 2;
pub(crate) const DEFAULT_STALL_MIN_SKILL: u8 = 2;

// Rival seeding --------------------------------------------------------------
pub(crate) const PATIENCE_MAX: i32 = 100;
pub(crate) const DEFAULT_BUDGET_FLOOR_RATIO: f32 = 0.8;
pub(crate) const DEFAULT_BUDGET_INTEREST_SPAN: f32 = 0.5;
pub(crate) const DEFAULT_PATIENCE_INTEREST_BONUS: f32 = 20.0;
pub(crate) const DEFAULT_EAGER_INTEREST: f32 = 0.7;
pub(crate) const DEFAULT_EAGER_PATIENCE: i32 = 50;
pub(crate) const DEFAULT_CAUTION_MARGIN: f32 = 0.9;
pub(crate) const DEFAULT_WILLINGNESS_INTEREST_WEIGHT: f32 = 0.5;
pub(crate) const DEFAULT_WILLINGNESS_PATIENCE_WEIGHT: f32 = 0.5;
pub(crate) const DEFAULT_MIN_WILLINGNESS: f32 = 0.05;

// Pacing ---------------------------------------------------------------------
pub(crate) const DEFAULT_RIVAL_THINK_MS: u64 = 900;
pub(crate) const DEFAULT_RIVAL_STAGGER_MS: u64 = 450;
pub(crate) const DEFAULT_RIVAL_ONLY_TURN_MS: u64 = 700;

// Scheduler ------------------------------------------------------------------
/// Hard stop for rival-only loops; patience decay ends real auctions far sooner.
pub const RIVAL_ONLY_MAX_TURNS: u32 = 200;
