use std::fmt;

use crate::pool::PoolUsage;

/// Snapshot of pool usage and budget, for capacity planning and UIs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SceneStats {
    pub blocks: PoolUsage,
    pub contacts: PoolUsage,
    pub impacts: PoolUsage,
    pub active_resonators: PoolUsage,
    /// Summed over all surfaces.
    pub contact_gens: PoolUsage,
    /// Summed over all surfaces.
    pub impact_gens: PoolUsage,
    pub time_cost: f32,
    pub max_time_cost: f32,
    pub limiter_gain: f32,
    pub ticks: u64,
}

impl SceneStats {
    /// Spent share of the time-cost budget, 0..=1.
    pub fn budget_load(&self) -> f32 {
        if self.max_time_cost > 0.0 {
            (self.time_cost / self.max_time_cost).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

pub(crate) fn sum_usage(usages: impl Iterator<Item = PoolUsage>) -> PoolUsage {
    usages.fold(PoolUsage::default(), |acc, u| PoolUsage {
        active: acc.active + u.active,
        peak: acc.peak + u.peak,
        capacity: acc.capacity + u.capacity,
    })
}

impl fmt::Display for SceneStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = |f: &mut fmt::Formatter<'_>, name: &str, u: PoolUsage| {
            writeln!(f, "{name:<12} {:>4} / {:<4} peak {}", u.active, u.capacity, u.peak)
        };
        row(f, "resonators", self.active_resonators)?;
        row(f, "contacts", self.contacts)?;
        row(f, "impacts", self.impacts)?;
        row(f, "contact gen", self.contact_gens)?;
        row(f, "impact gen", self.impact_gens)?;
        row(f, "blocks", self.blocks)?;
        write!(
            f,
            "time cost    {:.0} / {:.0}  limiter {:.2}",
            self.time_cost, self.max_time_cost, self.limiter_gain
        )
    }
}
