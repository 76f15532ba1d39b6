//! Hand-gesture interaction engine.
//!
//! Turns pose-model hand landmarks into grab, hover and two-hand
//! scale/rotate interactions with a single virtual object.
//!
//! Provides:
//! - `hand`: landmark validation, normalization, gesture classification
//! - `interaction`: state machine, object transform, proximity, watchdog
//! - `feed`: pose batches in, replay recordings, scripted scenario
//! - `config`: s-expression configuration
//! - `state`: per-frame pipeline over one explicit context object
//! - `backend`: calloop frame loop

pub mod backend;
pub mod config;
pub mod feed;
pub mod hand;
pub mod interaction;
pub mod state;
