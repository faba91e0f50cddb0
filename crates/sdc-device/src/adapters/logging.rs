// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! The injected logger interface (spec.md S5: "Logging is via an injected
//! logger interface"). The library itself always logs through the `log`
//! facade (`log::debug!`/`info!`/`warn!`/`error!`, matching the teacher's
//! use of `log` throughout `crates/hdds/src/engine`); `DeviceLogger` lets an
//! integrator additionally tee records to their own sink (e.g. a per-device
//! audit log) without the core crate depending on a concrete backend.

/// Severity levels, ordered the same way `log::Level` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// An injected logging sink. Call sites go through `DeviceLogger::log`
/// alongside the `log` facade, not instead of it — see module docs.
pub trait DeviceLogger: Send + Sync {
    fn log(&self, level: LogLevel, target: &str, message: &str);
}

/// Default `DeviceLogger` that simply re-emits through the `log` facade, so
/// an integrator who does not care about a second sink gets ordinary
/// `env_logger`/`log`-compatible output for free.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeLogger;

impl DeviceLogger for FacadeLogger {
    fn log(&self, level: LogLevel, target: &str, message: &str) {
        match level {
            LogLevel::Debug => log::debug!(target: "sdc_device", "[{target}] {message}"),
            LogLevel::Info => log::info!(target: "sdc_device", "[{target}] {message}"),
            LogLevel::Warn => log::warn!(target: "sdc_device", "[{target}] {message}"),
            LogLevel::Error => log::error!(target: "sdc_device", "[{target}] {message}"),
        }
    }
}
