//! CPU placement for the round-loop thread.
//!
//! The judging window spin-polls every player's press log, so the round
//! thread is the only latency-critical thread in the process. With enough
//! cores it is pinned to the last available one, away from core 0 where the
//! OS and input callbacks tend to run.
//!
//! Uses `num_cpus` for physical/logical core counts and `core_affinity` for
//! pinning.

use core_affinity::CoreId;
use serde::{Deserialize, Serialize};

/// CPU topology detected at runtime.
#[derive(Debug, Clone)]
pub struct CpuTopology {
    /// Total logical cores (including SMT siblings).
    pub logical_cores: usize,
    /// Total physical cores.
    pub physical_cores: usize,
    /// Core IDs available for pinning.
    pub available_cores: Vec<usize>,
}

impl CpuTopology {
    #[must_use]
    pub fn detect() -> Self {
        let logical_cores = num_cpus::get();
        let physical_cores = num_cpus::get_physical();

        let available_cores = core_affinity::get_core_ids()
            .map(|ids| ids.into_iter().map(|id| id.id).collect())
            .unwrap_or_else(|| (0..logical_cores).collect());

        Self {
            logical_cores,
            physical_cores,
            available_cores,
        }
    }

    /// Core for the round thread, or `None` to leave it to the OS.
    ///
    /// A single physical core is shared with everything else anyway, so
    /// pinning only happens with two or more.
    #[must_use]
    pub fn select_round_core(&self) -> Option<usize> {
        if self.physical_cores < 2 || self.available_cores.len() < 2 {
            return None;
        }
        self.available_cores.last().copied()
    }
}

/// Pinning behavior for the round thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuConfig {
    /// Detect topology and pin when it helps.
    #[default]
    Auto,
    /// Pin to the given core.
    Pinned(usize),
    /// Never pin.
    Disabled,
}

impl CpuConfig {
    /// Resolves to a concrete core, `None` meaning unpinned.
    #[must_use]
    pub fn resolve(&self) -> Option<usize> {
        match *self {
            Self::Auto => CpuTopology::detect().select_round_core(),
            Self::Pinned(core) => Some(core),
            Self::Disabled => None,
        }
    }
}

/// Pins the current thread to `core_id`.
///
/// Returns `false` if the core does not exist or the OS refuses.
pub fn pin_to_core(core_id: usize) -> bool {
    core_affinity::set_for_current(CoreId { id: core_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology_detection_returns_valid_counts() {
        let topo = CpuTopology::detect();

        assert!(topo.logical_cores > 0, "should have at least 1 logical core");
        assert!(topo.physical_cores > 0, "should have at least 1 physical core");
        assert!(!topo.available_cores.is_empty(), "should have available cores");
    }

    #[test]
    fn auto_core_is_available() {
        let topo = CpuTopology::detect();

        if let Some(core) = topo.select_round_core() {
            assert!(topo.available_cores.contains(&core));
            assert!(topo.physical_cores >= 2);
        }
    }

    #[test]
    fn single_core_is_never_pinned() {
        let topo = CpuTopology {
            logical_cores: 2,
            physical_cores: 1,
            available_cores: vec![0, 1],
        };
        assert_eq!(topo.select_round_core(), None);
    }

    #[test]
    fn multi_core_pins_last_core() {
        let topo = CpuTopology {
            logical_cores: 8,
            physical_cores: 4,
            available_cores: (0..8).collect(),
        };
        assert_eq!(topo.select_round_core(), Some(7));
    }

    #[test]
    fn cpu_config_disabled_and_pinned() {
        assert_eq!(CpuConfig::Disabled.resolve(), None);
        assert_eq!(CpuConfig::Pinned(5).resolve(), Some(5));
    }
}
