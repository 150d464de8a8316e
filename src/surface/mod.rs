//! Surface materials and the per-event generators they hand out.
//!
//! A [`Surface`] is shared configuration ([`SurfaceParams`] + one [`Fun`])
//! plus two fixed pools of generators. Contacts and impacts borrow a
//! generator per side for their lifetime and give it back on release.

pub mod contact_gen;
pub mod fun;
pub mod impact_gen;
pub mod params;

use std::sync::Arc;

use log::debug;

pub use contact_gen::ContactGen;
pub use fun::{Fun, FunState};
pub use impact_gen::{ImpactGen, ImpactSamples};
pub use params::{effective_hardness, SurfaceParams};

use crate::config::EngineContext;
use crate::error::{Result, SynthError};
use crate::pool::{Handle, ObjectPool, PoolUsage};

#[derive(Debug)]
pub struct Surface {
    name: String,
    params: SurfaceParams,
    fun: Fun,
    samples: ImpactSamples,
    contact_gens: ObjectPool<ContactGen>,
    impact_gens: ObjectPool<ImpactGen>,
}

impl Surface {
    pub fn new(
        name: impl Into<String>,
        params: SurfaceParams,
        fun: Fun,
        ctx: &EngineContext,
        contact_gens: usize,
        impact_gens: usize,
        seed: u64,
    ) -> Result<Self> {
        params.validate()?;
        let name = name.into();

        let contact_gens =
            ObjectPool::with_capacity(contact_gens, |h| ContactGen::new(gen_seed(seed, 0, h)))?;
        let impact_gens =
            ObjectPool::with_capacity(impact_gens, |h| ImpactGen::new(gen_seed(seed, 1, h), ctx))?;

        debug!(
            "surface '{}' ({} fun): {} contact gens, {} impact gens",
            name,
            fun.name(),
            contact_gens.capacity(),
            impact_gens.capacity()
        );

        Ok(Self {
            name,
            params,
            fun,
            samples: ImpactSamples::default(),
            contact_gens,
            impact_gens,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &SurfaceParams {
        &self.params
    }

    pub fn set_params(&mut self, params: SurfaceParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn fun(&self) -> &Fun {
        &self.fun
    }

    /// Register a recorded impact (mono, engine sample rate). Surfaces with
    /// samples play them instead of the synthetic pulse.
    pub fn add_impact_sample(&mut self, samples: impl Into<Arc<[f32]>>) -> Result<()> {
        let samples = samples.into();
        if samples.is_empty() {
            return Err(SynthError::Configuration(format!(
                "empty impact sample for surface '{}'",
                self.name
            )));
        }
        self.samples.push(samples);
        Ok(())
    }

    pub fn impact_sample_count(&self) -> usize {
        self.samples.len()
    }

    /// A reset contact generator, or `None` if the pool is exhausted.
    pub fn new_contact_gen(&mut self) -> Option<Handle> {
        let handle = self.contact_gens.acquire()?;
        if let Some(gen) = self.contact_gens.get_mut(handle) {
            gen.reset();
        }
        Some(handle)
    }

    pub fn delete_contact_gen(&mut self, handle: Handle) -> Result<()> {
        self.contact_gens.release(handle)
    }

    pub fn new_impact_gen(&mut self) -> Option<Handle> {
        let handle = self.impact_gens.acquire()?;
        if let Some(gen) = self.impact_gens.get_mut(handle) {
            gen.reset();
        }
        Some(handle)
    }

    pub fn delete_impact_gen(&mut self, handle: Handle) -> Result<()> {
        self.impact_gens.release(handle)
    }

    pub fn contact_gen(&self, handle: Handle) -> Option<&ContactGen> {
        self.contact_gens.get(handle)
    }

    pub fn contact_gen_mut(&mut self, handle: Handle) -> Option<&mut ContactGen> {
        self.contact_gens.get_mut(handle)
    }

    pub fn impact_gen(&self, handle: Handle) -> Option<&ImpactGen> {
        self.impact_gens.get(handle)
    }

    pub fn impact_gen_mut(&mut self, handle: Handle) -> Option<&mut ImpactGen> {
        self.impact_gens.get_mut(handle)
    }

    /// Refresh a contact generator's inputs and report whether it should be
    /// ticked this block.
    pub fn update_contact_gen(
        &mut self,
        handle: Handle,
        contact_speed: f32,
        slip_speed: f32,
        force: f32,
    ) -> bool {
        match self.contact_gens.get_mut(handle) {
            Some(gen) => {
                gen.set_dynamics(contact_speed, slip_speed, force);
                gen.is_active(&self.params)
            }
            None => false,
        }
    }

    /// Tick a contact generator into `out`. Returns `Some(true)` if it went
    /// quiet, `None` for an inactive handle.
    pub fn tick_contact_gen(
        &mut self,
        handle: Handle,
        ctx: &EngineContext,
        out: &mut [f32],
    ) -> Option<bool> {
        let gen = self.contact_gens.get_mut(handle)?;
        Some(gen.tick(&self.fun, &self.params, ctx, out))
    }

    /// Tick an impact generator into `out`. Returns `Some(true)` once quiet.
    pub fn tick_impact_gen(
        &mut self,
        handle: Handle,
        ctx: &EngineContext,
        out: &mut [f32],
    ) -> Option<bool> {
        let gen = self.impact_gens.get_mut(handle)?;
        Some(gen.tick(&self.fun, &self.params, &mut self.samples, ctx, out))
    }

    pub fn release_all(&mut self) {
        self.contact_gens.release_all();
        self.impact_gens.release_all();
    }

    pub fn contact_gen_usage(&self) -> PoolUsage {
        self.contact_gens.usage()
    }

    pub fn impact_gen_usage(&self) -> PoolUsage {
        self.impact_gens.usage()
    }
}

fn gen_seed(seed: u64, kind: u64, handle: Handle) -> u64 {
    seed ^ (kind << 32) ^ (handle.index() as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
}
