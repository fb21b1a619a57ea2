// Process-wide pipeline with an explicit init / get_or_init / update / close lifecycle

use crate::config::LogConfig;
use crate::error::{Result, StreamlogError};
use crate::logs::entry::{Extra, LogLevel, RequestContext};
use crate::logs::manager::LoggerManager;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

enum Global {
    Uninitialized,
    Active(Arc<LoggerManager>),
    /// Closed explicitly; only `init` brings the pipeline back
    Closed,
}

static GLOBAL: RwLock<Global> = RwLock::new(Global::Uninitialized);

fn global_mut() -> RwLockWriteGuard<'static, Global> {
    GLOBAL.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn current() -> Option<Arc<LoggerManager>> {
    let global = GLOBAL.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    match &*global {
        Global::Active(manager) => Some(manager.clone()),
        _ => None,
    }
}

/// Install a new process-wide manager, closing any previous one
pub fn init(config: LogConfig) -> Arc<LoggerManager> {
    let manager = Arc::new(LoggerManager::new(config));
    let previous = std::mem::replace(&mut *global_mut(), Global::Active(manager.clone()));
    if let Global::Active(old) = previous {
        let _ = old.close();
    }
    manager
}

/// The active manager, created with the default configuration on first use.
///
/// Returns `None` after [`close`] until [`init`] is called again.
pub fn get_or_init() -> Option<Arc<LoggerManager>> {
    if let Some(manager) = current() {
        return Some(manager);
    }

    let mut global = global_mut();
    if let Global::Uninitialized = *global {
        *global = Global::Active(Arc::new(LoggerManager::new(LogConfig::default())));
    }
    match &*global {
        Global::Active(manager) => Some(manager.clone()),
        _ => None,
    }
}

/// Rebuild the active pipeline from `config`, or initialize it if none exists
pub fn update_config(config: LogConfig) -> Result<()> {
    let mut global = global_mut();
    if let Global::Uninitialized = *global {
        *global = Global::Active(Arc::new(LoggerManager::new(config)));
        return Ok(());
    }
    match &*global {
        Global::Active(manager) => manager.update_config(config),
        _ => Err(StreamlogError::ManagerClosed),
    }
}

/// Close the process-wide pipeline, draining any queued entries
pub fn close() -> Result<()> {
    let previous = std::mem::replace(&mut *global_mut(), Global::Closed);
    match previous {
        Global::Active(manager) => manager.close(),
        _ => Ok(()),
    }
}

pub fn log_access(ctx: &RequestContext) {
    if let Some(logger) = get_or_init().and_then(|m| m.access_logger()) {
        logger.log_access(ctx);
    }
}

pub fn log_media(ctx: &RequestContext, username: Option<&str>, file_size: u64) {
    if let Some(logger) = get_or_init().and_then(|m| m.media_logger()) {
        logger.log_media(ctx, username, file_size);
    }
}

pub fn log_error(ctx: &RequestContext, err: Option<&dyn std::error::Error>, message: &str) {
    if let Some(logger) = get_or_init().and_then(|m| m.error_logger()) {
        logger.log_error(ctx, err, message);
    }
}

pub fn log_system(level: LogLevel, message: &str, extra: Extra) {
    if let Some(logger) = get_or_init().and_then(|m| m.system_logger()) {
        logger.log_system(level, message, extra);
    }
}

pub fn log_info(message: &str, extra: Option<Extra>) {
    log_system(LogLevel::Info, message, extra.unwrap_or_default());
}

pub fn log_warn(message: &str, extra: Option<Extra>) {
    log_system(LogLevel::Warn, message, extra.unwrap_or_default());
}

pub fn log_debug(message: &str, extra: Option<Extra>) {
    log_system(LogLevel::Debug, message, extra.unwrap_or_default());
}

pub fn log_system_error(message: &str, extra: Option<Extra>) {
    log_system(LogLevel::Error, message, extra.unwrap_or_default());
}
