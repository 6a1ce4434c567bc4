//! Ensemble methods module
//!
//! Soft voting over the three base learners. The vote is written once against
//! `&dyn Predictor` so any member mix can be combined.

mod voting;

pub use voting::{soft_vote, SoftVotingEnsemble};
