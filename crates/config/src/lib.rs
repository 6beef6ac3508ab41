// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet configuration loading.
//!
//! A fleet is described by a root YAML file that may reference agent files
//! and sub-fleet files. Loading composes the whole tree into an immutable
//! [`ResolvedConfig`]: defaults merged outer-to-inner, environment
//! variables interpolated, names validated, cycles rejected.

mod diff;
mod env;
mod error;
mod loader;
mod merge;
mod raw;

pub use diff::{compute_config_changes, ConfigChanges, ModifiedAgent};
pub use env::interpolate_value;
pub use error::{ConfigError, ConfigurationError};
pub use loader::{load, LoadOptions, ResolvedConfig, RetentionPolicy, FLEET_FILE_NAMES};
