// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains helpers for running a control loop with real-time priority.
use std::fs;
use std::io;

use tracing::info;

use crate::exception::{ControllerException, ControllerResult};

/// Used to decide whether to enforce realtime mode for a control loop thread.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RealtimeConfig {
    Enforce,
    Ignore,
}

/// Flag exposed by PREEMPT_RT kernels.
static REALTIME_FLAG: &str = "/sys/kernel/realtime";

fn is_realtime_flag_set(flag: &str) -> bool {
    flag.trim() == "1"
}

/// Determines whether the running kernel is a PREEMPT_RT kernel.
pub fn has_realtime_kernel() -> bool {
    fs::read_to_string(REALTIME_FLAG)
        .map(|flag| is_realtime_flag_set(&flag))
        .unwrap_or(false)
}

fn realtime_error(action: &str, error: io::Error) -> ControllerException {
    ControllerException::RealTimeException {
        message: format!(
            "Unable to {}: {}. Check the rtprio and memlock limits in \
             /etc/security/limits.conf.",
            action, error
        ),
    }
}

/// Runs the calling thread with SCHED_FIFO one below the maximum priority and locks all
/// current and future pages of the process in memory.
///
/// # Errors
/// * RealTimeException if the scheduler or the memory lock cannot be set. The user
/// running the control loop needs entries like these in /etc/security/limits.conf:
/// ```text
///lbr              -       rtprio          99
///lbr              -       memlock         unlimited
/// ```
pub fn enable_realtime_scheduling() -> ControllerResult<()> {
    // SAFETY: plain libc calls on the calling thread, `param` outlives the call
    unsafe {
        let max_priority = libc::sched_get_priority_max(libc::SCHED_FIFO);
        if max_priority == -1 {
            return Err(realtime_error(
                "query the SCHED_FIFO priority range",
                io::Error::last_os_error(),
            ));
        }
        let param = libc::sched_param {
            sched_priority: max_priority - 1,
        };
        let result = libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param);
        if result != 0 {
            return Err(realtime_error(
                "switch to SCHED_FIFO",
                io::Error::from_raw_os_error(result),
            ));
        }
        if libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) != 0 {
            return Err(realtime_error(
                "lock the control loop memory",
                io::Error::last_os_error(),
            ));
        }
        info!(priority = max_priority - 1, "Realtime scheduling enabled.");
    }
    Ok(())
}

/// Applies a [`RealtimeConfig`](`RealtimeConfig`) to the calling thread.
/// # Errors
/// * RealTimeException if `config` is [`Enforce`](`RealtimeConfig::Enforce`) and the
/// kernel is not a realtime kernel or realtime scheduling cannot be enabled.
pub fn apply_realtime_config(config: RealtimeConfig) -> ControllerResult<()> {
    match config {
        RealtimeConfig::Ignore => Ok(()),
        RealtimeConfig::Enforce if has_realtime_kernel() => enable_realtime_scheduling(),
        RealtimeConfig::Enforce => Err(ControllerException::RealTimeException {
            message: "Running kernel does not have realtime capabilities.".to_string(),
        }),
    }
}
