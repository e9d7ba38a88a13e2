//! Configuration, step clock, step cycle, and runner for the Shoal
//! simulation.
//!
//! Each step removes dead schools, refreshes the root views, runs the
//! population processes in order, fills the output histograms, and
//! advances the clock.
//!
//! # Modules
//!
//! - [`clock`] -- Step counter with year and step-in-year derivation.
//! - [`config`] -- Configuration loading from `shoal-config.yaml` into
//!   strongly-typed structs, plus the flat parameter table.
//! - [`process`] -- The [`Process`] trait and the built-in processes.
//! - [`step`] -- The per-step cycle ([`run_step`]).
//! - [`runner`] -- The bounded simulation loop ([`run_simulation`]).
//!
//! [`Process`]: process::Process
//! [`run_step`]: step::run_step
//! [`run_simulation`]: runner::run_simulation

pub mod clock;
pub mod config;
pub mod process;
pub mod runner;
pub mod step;
