#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Soldering tip temperature control (hardware-agnostic).
//!
//! All hardware interactions go through `tipctl_traits::{TipSensor, Heater,
//! Watchdog}`; user limits come from a `SettingsStore`.
//!
//! ## Architecture
//!
//! - **History**: one-second rolling window of errors (`history`)
//! - **Controller**: P term from the tip thermal mass plus averaged error
//!   (`controller`)
//! - **Runaway**: sticky fault when heating fails to move the tip (`runaway`)
//! - **Safety chain**: keep-awake floor, cutoffs, power and supply ceilings,
//!   optional slew limit (`safety`)
//! - **Loop**: tick wait with fail-safe timeout, warm-up, watchdog feed
//!   (`ControlLoopCore`)
//!
//! ## Units
//!
//! Temperatures are whole °C in `i32`, errors saturate to `i16`, and powers
//! are tenths of a watt (x10W) in `i32`.

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod core;
pub mod error;
pub mod fixed_point;
pub mod history;
pub mod hw_error;
pub mod runaway;
pub mod runner;
pub mod safety;
pub mod sampler;
pub mod shared;
pub mod status;
pub mod tick;
pub mod util;

pub use builder::{
    ControlLoop, ControlLoopBuilder, ControlLoopG, LoopParts, Missing, Set, build_control_loop,
};
pub use config::{ControlCfg, KeepAwakeCfg, OutputCfg, RunawayCfg, Timeouts};
pub use controller::{PowerComputation, PowerController};
pub use crate::core::ControlLoopCore;
pub use error::{AbortReason, BuildError, ControlError, Result};
pub use history::ErrorHistory;
pub use runaway::{RunawayState, ThermalRunawayDetector};
pub use safety::{ChainInputs, OutputSafetyChain, PulseWindow, SafetyLimits};
pub use shared::{ControlHandle, LiveSettings};
pub use status::{CycleOutcome, CycleReport, LoopStats};
pub use tick::{TickNotifier, TickWait, TickWaiter, tick_channel};
