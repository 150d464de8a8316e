//! The scene: registered bodies plus the per-block tick that mixes every live
//! contact and impact into resonator inputs, and every sounding resonator into
//! the output.

pub mod body;
pub mod contact;
pub mod impact;
pub mod message;
pub mod stats;

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace, warn};
#[cfg(feature = "rtrb")]
use rtrb::{Consumer, RingBuffer};

pub use body::{Body, BodyId, BodyPair, BodyParams, ResId, SurfaceId};
pub use contact::{Contact, ContactData, GenRef};
pub use impact::{Impact, ImpactData};
#[cfg(feature = "rtrb")]
pub use message::SceneCommands;
pub use message::{CommandReceiver, SceneCommand};
pub use stats::SceneStats;

use crate::config::{EngineConfig, EngineContext};
use crate::dsp::block::{self, Block, BlockPool};
use crate::dsp::limiter::Limiter;
use crate::error::{Result, SynthError};
use crate::pool::{Handle, ObjectList, ObjectPool};
use crate::res::{ModalData, ModalRes};
use crate::surface::{effective_hardness, Fun, Surface, SurfaceParams};

/// Receives each active resonator's block instead of the scene output.
pub type ResonatorCallback = Box<dyn FnMut(ResId, &[f32]) + Send>;

/*
Scene Tick
==========

One call renders one block. Nothing in here allocates or blocks.

  0. drain queued commands
  1. every active resonator: zero its input, forget last block's contacts
  2. contacts: tick each side's generator, fade it if it went quiet or the
     contact is going away, mix into
        - the output        (exciting body's direct gain)
        - own resonator     (unity,      damped by the other body)
        - other resonator   (cross gain, damped by the exciting body)
     then release contacts flagged for deletion
  3. impacts: the same mix without damping; a side is dropped once its
     generator is quiet, the impact once both sides are gone
  4. active resonators: ring into a scratch block; a resonator that is quiet
     and not in contact fades this block out and is deactivated, refunding
     its time cost. The block goes to the callback if one is set, otherwise
     into the output.
  5. limiter


Admission
---------

A resonator enters the active set the first time something excites it, if
its time cost still fits under `max_time_cost` and a block for its input is
free. Otherwise that excitation is dropped for this block and tried again
next block. Active resonators are never preempted.
*/

#[derive(Debug, Clone, Copy, Default)]
struct ResSlot {
    input: Option<Handle>,
    registry: Option<Handle>,
    cost: f32,
}

pub struct Scene {
    ctx: EngineContext,
    config: EngineConfig,

    bodies: Vec<Body>,
    surfaces: Vec<Surface>,
    resonators: Vec<ModalRes>,
    res_slots: Vec<ResSlot>,

    blocks: BlockPool,
    contacts: ObjectPool<Contact>,
    impacts: ObjectPool<Impact>,
    active: ObjectList<ResId>,
    pairs: HashMap<BodyPair, Handle>,

    scratch: Block,
    res_out: Block,
    limiter: Limiter,
    time_cost: f32,
    callback: Option<ResonatorCallback>,
    ticks: u64,

    #[cfg(feature = "rtrb")]
    commands: Option<Consumer<SceneCommand>>,
}

impl Scene {
    /// Validate the configuration and size every pool.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let ctx = config.context();
        let caps = config.capacities;

        let scene = Self {
            ctx,
            bodies: Vec::new(),
            surfaces: Vec::new(),
            resonators: Vec::new(),
            res_slots: Vec::new(),
            blocks: BlockPool::with_blocks(caps.blocks, ctx.block_size)?,
            contacts: ObjectPool::with_capacity(caps.contacts, |_| Contact::default())?,
            impacts: ObjectPool::with_capacity(caps.impacts, |_| Impact::default())?,
            active: ObjectList::with_capacity(caps.active_resonators)?,
            pairs: HashMap::with_capacity(caps.contacts),
            scratch: Block::from_context(&ctx),
            res_out: Block::from_context(&ctx),
            limiter: Limiter::new(&config.limiter, &ctx),
            time_cost: 0.0,
            callback: None,
            ticks: 0,
            #[cfg(feature = "rtrb")]
            commands: None,
            config,
        };

        debug!(
            "scene: {} Hz, {} frames, {:?}, limiter latency {}",
            ctx.sample_rate,
            ctx.block_size,
            caps,
            scene.limiter.latency()
        );
        Ok(scene)
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Output delay added by the limiter, in samples.
    pub fn latency(&self) -> usize {
        self.limiter.latency()
    }

    // ---- registration -------------------------------------------------

    pub fn add_surface(
        &mut self,
        name: impl Into<String>,
        params: SurfaceParams,
        fun: Fun,
    ) -> Result<SurfaceId> {
        let id = SurfaceId::from_index(self.surfaces.len());
        let caps = self.config.capacities;
        let seed = self.config.seed ^ ((id.index() as u64 + 1) << 40);
        let surface = Surface::new(
            name,
            params,
            fun,
            &self.ctx,
            caps.contact_gens,
            caps.impact_gens,
            seed,
        )?;
        self.surfaces.push(surface);
        Ok(id)
    }

    pub fn add_resonator(&mut self, data: Arc<ModalData>) -> ResId {
        let id = ResId::from_index(self.resonators.len());
        let res = ModalRes::with_data(self.ctx, data);
        debug!(
            "{id}: {} modes ({} below nyquist)",
            res.n_modes(),
            res.n_enabled_modes()
        );
        self.resonators.push(res);
        self.res_slots.push(ResSlot::default());
        id
    }

    pub fn add_body(
        &mut self,
        res: Option<ResId>,
        surface: Option<SurfaceId>,
        params: BodyParams,
    ) -> Result<BodyId> {
        if let Some(res) = res {
            if res.index() >= self.resonators.len() {
                return Err(SynthError::UnknownResonator(res.raw()));
            }
        }
        if let Some(surface) = surface {
            if surface.index() >= self.surfaces.len() {
                return Err(SynthError::UnknownSurface(surface.raw()));
            }
        }
        let id = BodyId::from_index(self.bodies.len());
        self.bodies.push(Body::new(res, surface, params));
        Ok(id)
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id.index())
    }

    /// A disabled body neither gets generators on new events nor excites
    /// anything from events already running.
    pub fn set_body_enabled(&mut self, id: BodyId, enabled: bool) -> Result<()> {
        let body = self
            .bodies
            .get_mut(id.index())
            .ok_or(SynthError::UnknownBody(id.raw()))?;
        body.enabled = enabled;
        Ok(())
    }

    pub fn set_body_params(&mut self, id: BodyId, params: BodyParams) -> Result<()> {
        let body = self
            .bodies
            .get_mut(id.index())
            .ok_or(SynthError::UnknownBody(id.raw()))?;
        body.params = params;
        Ok(())
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(id.index())
    }

    pub fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut Surface> {
        self.surfaces.get_mut(id.index())
    }

    pub fn resonator(&self, id: ResId) -> Option<&ModalRes> {
        self.resonators.get(id.index())
    }

    /// For aux scales, quiet level, damping limit and time cost.
    pub fn resonator_mut(&mut self, id: ResId) -> Option<&mut ModalRes> {
        self.resonators.get_mut(id.index())
    }

    pub fn is_resonator_active(&self, id: ResId) -> bool {
        self.res_slots
            .get(id.index())
            .is_some_and(|slot| slot.registry.is_some())
    }

    pub fn n_active_resonators(&self) -> usize {
        self.active.len()
    }

    /// Force a resonator to count as quiet at its next check.
    pub fn make_quiet(&mut self, id: ResId) -> Result<()> {
        let res = self
            .resonators
            .get_mut(id.index())
            .ok_or(SynthError::UnknownResonator(id.raw()))?;
        res.make_quiet();
        Ok(())
    }

    /// Put a resonator in the active set ahead of any excitation. `false`
    /// when the budget, block pool or active set has no room. An active
    /// resonator that is quiet and untouched leaves again at its next tick.
    pub fn activate_resonator(&mut self, id: ResId) -> Result<bool> {
        if id.index() >= self.resonators.len() {
            return Err(SynthError::UnknownResonator(id.raw()));
        }
        Ok(self.ensure_active(id))
    }

    /// Take a resonator out of the active set now, refunding its cost and
    /// clearing its state. A no-op for an inactive resonator.
    pub fn deactivate_resonator(&mut self, id: ResId) -> Result<()> {
        let registry = self
            .res_slots
            .get(id.index())
            .ok_or(SynthError::UnknownResonator(id.raw()))?
            .registry;
        if let Some(registry) = registry {
            self.deactivate(registry, id);
        }
        Ok(())
    }

    pub fn set_max_time_cost(&mut self, cost: f32) {
        self.config.max_time_cost = cost.max(0.0);
    }

    /// Time cost of the currently active resonators.
    pub fn time_cost(&self) -> f32 {
        self.time_cost
    }

    pub fn set_resonator_callback(&mut self, callback: impl FnMut(ResId, &[f32]) + Send + 'static) {
        self.callback = Some(Box::new(callback));
    }

    pub fn clear_resonator_callback(&mut self) {
        self.callback = None;
    }

    /// Open the command queue. Any previous queue is dropped.
    #[cfg(feature = "rtrb")]
    pub fn command_queue(&mut self) -> SceneCommands {
        let (tx, rx) = RingBuffer::new(self.config.command_queue_size);
        self.commands = Some(rx);
        SceneCommands::new(tx)
    }

    // ---- contacts -----------------------------------------------------

    /// Start a contact between two bodies. `None` when the contact pool is
    /// exhausted; a side that cannot get a generator stays silent.
    pub fn create_contact(&mut self, body1: BodyId, body2: BodyId) -> Option<Handle> {
        let Some(handle) = self.contacts.acquire() else {
            trace!("contact {body1}/{body2} dropped: pool exhausted");
            return None;
        };
        let gens = [
            self.acquire_contact_gen(body1),
            self.acquire_contact_gen(body2),
        ];
        if let Some(contact) = self.contacts.get_mut(handle) {
            contact.reset();
            contact.bodies = [Some(body1), Some(body2)];
            contact.gens = gens;
        }
        Some(handle)
    }

    pub fn contact(&self, handle: Handle) -> Option<&Contact> {
        self.contacts.get(handle)
    }

    /// Per physics step input. Marks the contact ready and used.
    pub fn set_contact_data(&mut self, handle: Handle, data: ContactData) -> Result<()> {
        let contact = self.contacts.try_get_mut(handle)?;
        contact.data = data;
        contact.ready = true;
        contact.used = true;
        Ok(())
    }

    /// Play one more faded block, then release.
    pub fn fade_and_delete_contact(&mut self, handle: Handle) -> Result<()> {
        self.contacts.try_get_mut(handle)?.fade_and_delete = true;
        Ok(())
    }

    /// Release immediately, without a fade.
    pub fn delete_contact(&mut self, handle: Handle) -> Result<()> {
        self.release_contact(handle)
    }

    pub fn set_all_unused(&mut self) {
        let mut next = self.contacts.first();
        while let Some(handle) = next {
            if let Some(contact) = self.contacts.get_mut(handle) {
                contact.used = false;
            }
            next = self.contacts.next();
        }
    }

    /// Flag every contact not marked used since `set_all_unused` for deletion.
    pub fn delete_unused(&mut self) {
        let mut next = self.contacts.first();
        while let Some(handle) = next {
            if let Some(contact) = self.contacts.get_mut(handle) {
                if !contact.used {
                    contact.fade_and_delete = true;
                }
            }
            next = self.contacts.next();
        }
    }

    /// The pair is touching this physics step: create its contact or reuse
    /// the running one, and set its data.
    pub fn touch(&mut self, body1: BodyId, body2: BodyId, data: ContactData) -> Option<Handle> {
        let key = BodyPair::new(body1, body2);
        let existing = self
            .pairs
            .get(&key)
            .copied()
            .filter(|&h| self.contacts.is_active(h));

        let handle = match existing {
            Some(handle) => handle,
            None => {
                let handle = self.create_contact(body1, body2)?;
                self.pairs.insert(key, handle);
                handle
            }
        };

        if let Some(contact) = self.contacts.get_mut(handle) {
            // stored data follows the order the contact was created with
            contact.data = if contact.bodies[0] == Some(body1) {
                data
            } else {
                data.swapped()
            };
            contact.ready = true;
            contact.used = true;
            contact.fade_and_delete = false;
        }
        Some(handle)
    }

    /// Close a physics step: pairs not touched since the previous step fade
    /// out, and every contact starts the next step unused.
    pub fn end_physics_step(&mut self) {
        self.delete_unused();
        self.set_all_unused();
    }

    fn acquire_contact_gen(&mut self, body: BodyId) -> Option<GenRef> {
        let surface_id = self.usable_surface(body)?;
        let surface = self.surfaces.get_mut(surface_id.index())?;
        match surface.new_contact_gen() {
            Some(handle) => Some(GenRef {
                surface: surface_id,
                handle,
            }),
            None => {
                trace!("surface '{}' out of contact generators", surface.name());
                None
            }
        }
    }

    fn release_contact(&mut self, handle: Handle) -> Result<()> {
        let contact = *self
            .contacts
            .get(handle)
            .ok_or(SynthError::InactiveHandle(handle))?;

        for gen in contact.gens.into_iter().flatten() {
            if let Some(surface) = self.surfaces.get_mut(gen.surface.index()) {
                if let Err(e) = surface.delete_contact_gen(gen.handle) {
                    warn!("contact {handle}: {e}");
                }
            }
        }
        if let [Some(a), Some(b)] = contact.bodies {
            let key = BodyPair::new(a, b);
            if self.pairs.get(&key) == Some(&handle) {
                self.pairs.remove(&key);
            }
        }
        self.contacts.release(handle)
    }

    // ---- impacts ------------------------------------------------------

    pub fn create_impact(&mut self, body1: BodyId, body2: BodyId) -> Option<Handle> {
        let Some(handle) = self.impacts.acquire() else {
            trace!("impact {body1}/{body2} dropped: pool exhausted");
            return None;
        };
        let gens = [
            self.acquire_impact_gen(body1),
            self.acquire_impact_gen(body2),
        ];
        if let Some(impact) = self.impacts.get_mut(handle) {
            impact.reset();
            impact.bodies = [Some(body1), Some(body2)];
            impact.gens = gens;
        }
        Some(handle)
    }

    pub fn impact(&self, handle: Handle) -> Option<&Impact> {
        self.impacts.get(handle)
    }

    /// Arm an impact. Only the first call has an effect; later calls return
    /// `Ok(false)`.
    pub fn set_impact_data(&mut self, handle: Handle, data: ImpactData) -> Result<bool> {
        let impact = *self
            .impacts
            .get(handle)
            .ok_or(SynthError::InactiveHandle(handle))?;
        if impact.ready {
            warn!("impact {handle} already armed");
            return Ok(false);
        }

        for side in 0..2 {
            let Some(gen) = impact.gens[side] else {
                continue;
            };
            let other = impact.bodies[1 - side]
                .and_then(|b| self.bodies.get(b.index()))
                .and_then(|b| b.surface)
                .and_then(|s| self.surfaces.get(s.index()));
            let Some(own) = self.surfaces.get(gen.surface.index()) else {
                continue;
            };
            let hardness = effective_hardness(own.params(), other.map(Surface::params), data.impulse);

            if let Some(g) = self
                .surfaces
                .get_mut(gen.surface.index())
                .and_then(|s| s.impact_gen_mut(gen.handle))
            {
                g.set_dynamics(data.impulse, data.rel_tangent_speed, hardness);
            }
        }

        let impact = self.impacts.try_get_mut(handle)?;
        impact.data = data;
        impact.ready = true;
        Ok(true)
    }

    /// Create and arm an impact in one go.
    pub fn trigger_impact(&mut self, body1: BodyId, body2: BodyId, data: ImpactData) -> Option<Handle> {
        let handle = self.create_impact(body1, body2)?;
        match self.set_impact_data(handle, data) {
            Ok(_) => Some(handle),
            Err(e) => {
                warn!("impact {body1}/{body2}: {e}");
                None
            }
        }
    }

    /// Release an impact before it finished on its own.
    pub fn delete_impact(&mut self, handle: Handle) -> Result<()> {
        let impact = *self
            .impacts
            .get(handle)
            .ok_or(SynthError::InactiveHandle(handle))?;
        for gen in impact.gens.into_iter().flatten() {
            self.release_impact_gen(gen);
        }
        self.impacts.release(handle)
    }

    fn acquire_impact_gen(&mut self, body: BodyId) -> Option<GenRef> {
        let surface_id = self.usable_surface(body)?;
        let surface = self.surfaces.get_mut(surface_id.index())?;
        match surface.new_impact_gen() {
            Some(handle) => Some(GenRef {
                surface: surface_id,
                handle,
            }),
            None => {
                trace!("surface '{}' out of impact generators", surface.name());
                None
            }
        }
    }

    fn release_impact_gen(&mut self, gen: GenRef) {
        if let Some(surface) = self.surfaces.get_mut(gen.surface.index()) {
            if let Err(e) = surface.delete_impact_gen(gen.handle) {
                warn!("impact generator: {e}");
            }
        }
    }

    /// Surface of an enabled, known body.
    fn usable_surface(&self, body: BodyId) -> Option<SurfaceId> {
        let Some(b) = self.bodies.get(body.index()) else {
            warn!("unknown {body}");
            return None;
        };
        if !b.enabled {
            return None;
        }
        b.surface
    }

    // ---- tick ---------------------------------------------------------

    /// Render one block into `out`, which must be exactly `block_size` long.
    pub fn tick(&mut self, out: &mut [f32]) {
        #[cfg(feature = "rtrb")]
        self.drain_commands();

        out.fill(0.0);
        if out.len() != self.ctx.block_size {
            warn!(
                "tick with {} frames, scene block size is {}",
                out.len(),
                self.ctx.block_size
            );
            return;
        }

        let mut scratch = std::mem::take(&mut self.scratch);
        let mut res_out = std::mem::take(&mut self.res_out);

        self.begin_block();
        self.tick_contacts(&mut scratch, out);
        self.tick_impacts(&mut scratch, out);
        self.tick_resonators(&mut res_out, out);
        self.limiter.render(out);

        self.scratch = scratch;
        self.res_out = res_out;
        self.ticks += 1;
    }

    /// Apply one queued mutation. `tick` does this for everything queued
    /// through [`command_queue`](Self::command_queue).
    pub fn apply(&mut self, command: SceneCommand) {
        match command {
            SceneCommand::Touch { body1, body2, data } => {
                if self.touch(body1, body2, data).is_none() {
                    trace!("touch {body1}/{body2} dropped");
                }
            }
            SceneCommand::EndPhysicsStep => self.end_physics_step(),
            SceneCommand::Impact { body1, body2, data } => {
                if self.trigger_impact(body1, body2, data).is_none() {
                    trace!("impact {body1}/{body2} dropped");
                }
            }
            SceneCommand::SetBodyEnabled { body, enabled } => {
                if let Err(e) = self.set_body_enabled(body, enabled) {
                    warn!("{e}");
                }
            }
            SceneCommand::MakeQuiet(res) => {
                if let Err(e) = self.make_quiet(res) {
                    warn!("{e}");
                }
            }
        }
    }

    #[cfg(feature = "rtrb")]
    fn drain_commands(&mut self) {
        let Some(mut rx) = self.commands.take() else {
            return;
        };
        while let Some(command) = CommandReceiver::pop(&mut rx) {
            self.apply(command);
        }
        self.commands = Some(rx);
    }

    fn begin_block(&mut self) {
        for (_, id) in self.active.iter() {
            let idx = id.index();
            if let Some(res) = self.resonators.get_mut(idx) {
                res.begin_block();
            }
            let input = self.res_slots.get(idx).and_then(|slot| slot.input);
            if let Some(block) = input.and_then(|h| self.blocks.get_mut(h)) {
                block.zero();
            }
        }
    }

    fn tick_contacts(&mut self, scratch: &mut Block, out: &mut [f32]) {
        let mut next = self.contacts.first();
        while let Some(handle) = next {
            if let Some(contact) = self.contacts.get(handle).copied() {
                if contact.ready {
                    for side in 0..2 {
                        self.tick_contact_side(&contact, side, scratch, out);
                    }
                }
                if contact.fade_and_delete {
                    if let Err(e) = self.release_contact(handle) {
                        warn!("contact {handle}: {e}");
                    }
                }
            }
            next = self.contacts.next();
        }
    }

    fn tick_contact_side(
        &mut self,
        contact: &Contact,
        side: usize,
        scratch: &mut Block,
        out: &mut [f32],
    ) {
        let (Some(gen), Some(body)) = (contact.gens[side], contact.bodies[side]) else {
            return;
        };
        let Some(body) = self.bodies.get(body.index()).copied().filter(|b| b.enabled) else {
            return;
        };
        let Some(surface) = self.surfaces.get_mut(gen.surface.index()) else {
            return;
        };

        let (contact_speed, slip_speed, force) = contact.data.side(side);
        if !surface.update_contact_gen(gen.handle, contact_speed, slip_speed, force) {
            return;
        }
        let Some(went_quiet) = surface.tick_contact_gen(gen.handle, &self.ctx, scratch) else {
            return;
        };
        if went_quiet || contact.fade_and_delete {
            scratch.fadeout();
        }

        let other = self.other_body(contact.bodies[1 - side]);
        self.route(&body, other.as_ref(), scratch, out, true);
    }

    fn tick_impacts(&mut self, scratch: &mut Block, out: &mut [f32]) {
        let mut next = self.impacts.first();
        while let Some(handle) = next {
            if let Some(impact) = self.impacts.get(handle).copied() {
                if impact.ready {
                    let mut gens = impact.gens;
                    for (side, slot) in gens.iter_mut().enumerate() {
                        let Some(gen) = *slot else {
                            continue;
                        };
                        if self.tick_impact_side(&impact, side, gen, scratch, out) {
                            self.release_impact_gen(gen);
                            *slot = None;
                        }
                    }

                    if gens.iter().all(Option::is_none) {
                        if let Err(e) = self.impacts.release(handle) {
                            warn!("impact {handle}: {e}");
                        }
                    } else if let Some(impact) = self.impacts.get_mut(handle) {
                        impact.gens = gens;
                    }
                }
            }
            next = self.impacts.next();
        }
    }

    /// Returns `true` when this side is finished.
    fn tick_impact_side(
        &mut self,
        impact: &Impact,
        side: usize,
        gen: GenRef,
        scratch: &mut Block,
        out: &mut [f32],
    ) -> bool {
        let body = impact.bodies[side].and_then(|b| self.bodies.get(b.index()).copied());
        let Some(body) = body.filter(|b| b.enabled) else {
            return true;
        };
        let Some(surface) = self.surfaces.get_mut(gen.surface.index()) else {
            return true;
        };
        let Some(quiet) = surface.tick_impact_gen(gen.handle, &self.ctx, scratch) else {
            return true;
        };

        let other = self.other_body(impact.bodies[1 - side]);
        self.route(&body, other.as_ref(), scratch, out, false);
        quiet
    }

    fn other_body(&self, id: Option<BodyId>) -> Option<Body> {
        id.and_then(|b| self.bodies.get(b.index()).copied())
            .filter(|b| b.enabled)
    }

    fn route(
        &mut self,
        body: &Body,
        other: Option<&Body>,
        signal: &[f32],
        out: &mut [f32],
        contact: bool,
    ) {
        block::add_with_multiply(out, signal, body.params.direct_gain);

        if let Some(res) = body.res {
            let damping = contact.then(|| other.map_or(1.0, |o| o.params.contact_damping));
            self.excite(res, signal, 1.0, damping);
        }
        if let Some(other_res) = other.and_then(|o| o.res) {
            if Some(other_res) != body.res {
                let damping = contact.then_some(body.params.contact_damping);
                self.excite(other_res, signal, body.params.cross_gain, damping);
            }
        }
    }

    fn excite(&mut self, res: ResId, signal: &[f32], gain: f32, damping: Option<f32>) {
        let idx = res.index();
        let excited = gain != 0.0 && signal.iter().any(|&s| s != 0.0);
        if excited && !self.ensure_active(res) {
            return;
        }
        let Some(slot) = self.res_slots.get(idx).copied() else {
            return;
        };
        if slot.registry.is_none() {
            return;
        }

        if let Some(input) = slot.input.and_then(|h| self.blocks.get_mut(h)) {
            input.add_with_multiply(signal, gain);
        }
        if let Some(factor) = damping {
            if let Some(r) = self.resonators.get_mut(idx) {
                r.add_contact_damping(factor);
            }
        }
    }

    /// Bring a resonator into the active set if the budget allows.
    fn ensure_active(&mut self, id: ResId) -> bool {
        let idx = id.index();
        let Some(slot) = self.res_slots.get(idx).copied() else {
            return false;
        };
        if slot.registry.is_some() {
            return true;
        }
        let Some(cost) = self.resonators.get(idx).map(ModalRes::time_cost) else {
            return false;
        };

        if self.time_cost + cost > self.config.max_time_cost {
            trace!(
                "{id} deferred: cost {cost} over budget ({}/{})",
                self.time_cost,
                self.config.max_time_cost
            );
            return false;
        }
        let Some(input) = self.blocks.acquire() else {
            trace!("{id} deferred: no free block");
            return false;
        };
        let Some(registry) = self.active.add(id) else {
            trace!("{id} deferred: active set full");
            if let Err(e) = self.blocks.release(input) {
                warn!("{e}");
            }
            return false;
        };

        if let Some(block) = self.blocks.get_mut(input) {
            block.zero();
        }
        if let Some(res) = self.resonators.get_mut(idx) {
            res.activate();
            res.begin_block();
        }
        self.res_slots[idx] = ResSlot {
            input: Some(input),
            registry: Some(registry),
            cost,
        };
        self.time_cost += cost;
        trace!("{id} active, time cost {}", self.time_cost);
        true
    }

    fn tick_resonators(&mut self, res_out: &mut Block, out: &mut [f32]) {
        let mut next = self.active.first();
        while let Some((registry, id)) = next {
            let idx = id.index();
            let input = self
                .res_slots
                .get(idx)
                .and_then(|slot| slot.input)
                .and_then(|h| self.blocks.get(h));

            let quiet = match (self.resonators.get_mut(idx), input) {
                (Some(res), Some(input)) => {
                    res.tick(input.as_slice(), res_out);
                    !res.is_in_contact() && res.is_quiet()
                }
                _ => {
                    res_out.zero();
                    true
                }
            };

            if quiet {
                res_out.fadeout();
            }
            match self.callback.as_mut() {
                Some(callback) => callback(id, res_out.as_slice()),
                None => block::add_with_multiply(out, res_out, 1.0),
            }
            if quiet {
                self.deactivate(registry, id);
            }
            next = self.active.next();
        }
    }

    fn deactivate(&mut self, registry: Handle, id: ResId) {
        if let Err(e) = self.active.remove(registry) {
            warn!("{id}: {e}");
        }
        let idx = id.index();
        if let Some(slot) = self.res_slots.get_mut(idx) {
            if let Some(input) = slot.input.take() {
                if let Err(e) = self.blocks.release(input) {
                    warn!("{id}: {e}");
                }
            }
            self.time_cost = (self.time_cost - slot.cost).max(0.0);
            *slot = ResSlot::default();
        }
        if let Some(res) = self.resonators.get_mut(idx) {
            res.deactivate();
        }
        trace!("{id} quiet, time cost {}", self.time_cost);
    }

    // ---- lifecycle ----------------------------------------------------

    /// Release every contact, impact and generator and silence every
    /// resonator. Registered bodies, surfaces and resonators stay.
    pub fn shutdown(&mut self) {
        let mut next = self.contacts.first();
        while let Some(handle) = next {
            if let Err(e) = self.release_contact(handle) {
                warn!("contact {handle}: {e}");
            }
            next = self.contacts.next();
        }

        let mut next = self.impacts.first();
        while let Some(handle) = next {
            if let Err(e) = self.delete_impact(handle) {
                warn!("impact {handle}: {e}");
            }
            next = self.impacts.next();
        }

        let mut next = self.active.first();
        while let Some((registry, id)) = next {
            self.deactivate(registry, id);
            next = self.active.next();
        }

        for surface in &mut self.surfaces {
            surface.release_all();
        }
        self.pairs.clear();
        self.time_cost = 0.0;
        self.limiter.reset();
        debug!("scene shut down after {} ticks", self.ticks);
    }

    pub fn stats(&self) -> SceneStats {
        SceneStats {
            blocks: self.blocks.usage(),
            contacts: self.contacts.usage(),
            impacts: self.impacts.usage(),
            active_resonators: self.active.usage(),
            contact_gens: stats::sum_usage(self.surfaces.iter().map(Surface::contact_gen_usage)),
            impact_gens: stats::sum_usage(self.surfaces.iter().map(Surface::impact_gen_usage)),
            time_cost: self.time_cost,
            max_time_cost: self.config.max_time_cost,
            limiter_gain: self.limiter.gain(),
            ticks: self.ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LimiterConfig, PoolCapacities};
    use crate::res::Mode;

    const BLOCK: usize = 64;

    fn config() -> EngineConfig {
        EngineConfig::new()
            .block_size(BLOCK)
            .limiter(LimiterConfig::disabled())
            .capacities(PoolCapacities {
                blocks: 8,
                contacts: 4,
                impacts: 4,
                contact_gens: 4,
                impact_gens: 4,
                active_resonators: 8,
            })
    }

    fn modes() -> Arc<ModalData> {
        Arc::new(
            ModalData::new(vec![
                Mode::new(440.0, 8.0, 0.5),
                Mode::new(1_230.0, 12.0, 0.3),
            ])
            .unwrap(),
        )
    }

    struct Fixture {
        scene: Scene,
        a: BodyId,
        b: BodyId,
        res_a: ResId,
    }

    fn fixture() -> Fixture {
        let mut scene = Scene::new(config()).unwrap();
        let surface = scene
            .add_surface("wood", SurfaceParams::default(), Fun::white())
            .unwrap();
        let res_a = scene.add_resonator(modes());
        let res_b = scene.add_resonator(modes());
        let a = scene
            .add_body(Some(res_a), Some(surface), BodyParams::default())
            .unwrap();
        let b = scene
            .add_body(Some(res_b), Some(surface), BodyParams::default())
            .unwrap();
        Fixture { scene, a, b, res_a }
    }

    fn sliding() -> ContactData {
        ContactData {
            speed_contact_rel_body1: 0.5,
            speed_contact_rel_body2: 0.5,
            speed_body1_rel_body2: 0.5,
            contact_force: 5.0,
        }
    }

    #[test]
    fn scene_moves_to_the_audio_thread() {
        fn assert_send<T: Send>() {}
        assert_send::<Scene>();
    }

    #[test]
    fn add_body_rejects_unknown_parts() {
        let mut scene = Scene::new(config()).unwrap();
        assert!(matches!(
            scene.add_body(Some(ResId::from_index(3)), None, BodyParams::default()),
            Err(SynthError::UnknownResonator(3))
        ));
        assert!(matches!(
            scene.add_body(None, Some(SurfaceId::from_index(0)), BodyParams::default()),
            Err(SynthError::UnknownSurface(0))
        ));
    }

    #[test]
    fn contact_without_surface_runs_degraded() {
        let mut f = fixture();
        let bare = f.scene.add_body(None, None, BodyParams::default()).unwrap();
        let h = f.scene.create_contact(f.a, bare).unwrap();
        let contact = f.scene.contact(h).unwrap();
        assert!(contact.gens()[0].is_some());
        assert!(contact.gens()[1].is_none());
    }

    #[test]
    fn contact_waits_for_data() {
        let mut f = fixture();
        let h = f.scene.create_contact(f.a, f.b).unwrap();
        let mut out = vec![0.0; BLOCK];
        f.scene.tick(&mut out);
        assert_eq!(f.scene.n_active_resonators(), 0, "not ready, nothing excited");

        f.scene.set_contact_data(h, sliding()).unwrap();
        f.scene.tick(&mut out);
        assert_eq!(f.scene.n_active_resonators(), 2);
    }

    #[test]
    fn fade_and_delete_releases_contact_and_gens() {
        let mut f = fixture();
        let h = f.scene.create_contact(f.a, f.b).unwrap();
        f.scene.set_contact_data(h, sliding()).unwrap();
        let mut out = vec![0.0; BLOCK];
        f.scene.tick(&mut out);

        f.scene.fade_and_delete_contact(h).unwrap();
        f.scene.tick(&mut out);
        let stats = f.scene.stats();
        assert_eq!(stats.contacts.active, 0);
        assert_eq!(stats.contact_gens.active, 0);
        assert!(f.scene.contact(h).is_none());
    }

    #[test]
    fn touch_diffs_pairs_per_step() {
        let mut f = fixture();
        let first = f.scene.touch(f.a, f.b, sliding()).unwrap();
        let again = f.scene.touch(f.b, f.a, sliding()).unwrap();
        assert_eq!(first, again, "unordered pair maps to one contact");
        f.scene.end_physics_step();

        let mut out = vec![0.0; BLOCK];
        f.scene.tick(&mut out);
        assert_eq!(f.scene.stats().contacts.active, 1);

        // next step: the pair is no longer touching
        f.scene.end_physics_step();
        assert!(f.scene.contact(first).unwrap().is_fading());
        f.scene.tick(&mut out);
        assert_eq!(f.scene.stats().contacts.active, 0);

        let fresh = f.scene.touch(f.a, f.b, sliding()).unwrap();
        assert!(f.scene.contact(fresh).unwrap().is_ready());
    }

    #[test]
    fn disabled_body_gets_no_generator() {
        let mut f = fixture();
        f.scene.set_body_enabled(f.b, false).unwrap();
        let h = f.scene.create_contact(f.a, f.b).unwrap();
        assert!(f.scene.contact(h).unwrap().gens()[1].is_none());
        assert!(matches!(
            f.scene.set_body_enabled(BodyId::from_index(42), true),
            Err(SynthError::UnknownBody(42))
        ));
    }

    #[test]
    fn second_impact_data_is_ignored() {
        let mut f = fixture();
        let h = f.scene.create_impact(f.a, f.b).unwrap();
        let data = ImpactData {
            impulse: 1.0,
            ..Default::default()
        };
        assert!(f.scene.set_impact_data(h, data).unwrap());
        assert!(!f.scene.set_impact_data(h, data).unwrap());
    }

    #[test]
    fn callback_receives_resonator_blocks() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let mut f = fixture();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        f.scene.set_resonator_callback(move |_, samples| {
            assert_eq!(samples.len(), BLOCK);
            seen.fetch_add(1, Ordering::Relaxed);
        });

        f.scene.trigger_impact(f.a, f.b, ImpactData {
            impulse: 1.0,
            ..Default::default()
        });
        let mut out = vec![0.0; BLOCK];
        f.scene.tick(&mut out);

        assert_eq!(calls.load(Ordering::Relaxed), 2);
        assert!(out.iter().all(|&s| s == 0.0), "routed away from the output");
    }

    #[test]
    fn make_quiet_deactivates_resonator() {
        let mut f = fixture();
        f.scene.trigger_impact(f.a, f.b, ImpactData {
            impulse: 1.0,
            ..Default::default()
        });
        let mut out = vec![0.0; BLOCK];
        f.scene.tick(&mut out);
        assert!(f.scene.is_resonator_active(f.res_a));

        f.scene.make_quiet(f.res_a).unwrap();
        f.scene.tick(&mut out);
        assert!(!f.scene.is_resonator_active(f.res_a));
        assert_eq!(f.scene.n_active_resonators(), 1);
    }

    #[test]
    fn touch_in_reverse_order_keeps_each_side_speed() {
        let mut f = fixture();
        let data = ContactData {
            speed_contact_rel_body1: 1.0,
            speed_contact_rel_body2: 9.0,
            speed_body1_rel_body2: 0.25,
            contact_force: 5.0,
        };
        let h = f.scene.touch(f.a, f.b, data).unwrap();
        f.scene.touch(f.b, f.a, data.swapped()).unwrap();

        let stored = *f.scene.contact(h).unwrap().data();
        assert_eq!(stored, data);
        assert_eq!(stored.side(0).0, 1.0, "contact speed over a");
        assert_eq!(stored.side(1).0, 9.0, "contact speed over b");
    }

    #[test]
    fn resonators_activate_and_deactivate_on_request() {
        let mut f = fixture();
        assert!(f.scene.activate_resonator(f.res_a).unwrap());
        assert!(f.scene.is_resonator_active(f.res_a));
        assert!(f.scene.resonator(f.res_a).unwrap().is_active());
        assert_eq!(f.scene.time_cost(), 2.0);
        assert_eq!(f.scene.stats().blocks.active, 1);

        // already active: no second charge
        assert!(f.scene.activate_resonator(f.res_a).unwrap());
        assert_eq!(f.scene.time_cost(), 2.0);

        f.scene.deactivate_resonator(f.res_a).unwrap();
        assert!(!f.scene.is_resonator_active(f.res_a));
        assert!(!f.scene.resonator(f.res_a).unwrap().is_active());
        assert_eq!(f.scene.time_cost(), 0.0);
        assert_eq!(f.scene.stats().blocks.active, 0);
        assert_eq!(f.scene.n_active_resonators(), 0);

        f.scene.deactivate_resonator(f.res_a).unwrap();
        assert!(matches!(
            f.scene.activate_resonator(ResId::from_index(9)),
            Err(SynthError::UnknownResonator(9))
        ));
        assert!(f.scene.deactivate_resonator(ResId::from_index(9)).is_err());
    }

    #[test]
    fn deactivating_a_ringing_resonator_silences_it() {
        let mut f = fixture();
        f.scene.trigger_impact(f.a, f.b, ImpactData {
            impulse: 1.0,
            ..Default::default()
        });
        let mut out = vec![0.0; BLOCK];
        f.scene.tick(&mut out);
        assert_eq!(f.scene.time_cost(), 4.0);

        f.scene.deactivate_resonator(f.res_a).unwrap();
        assert_eq!(f.scene.time_cost(), 2.0);
        assert_eq!(f.scene.resonator(f.res_a).unwrap().level(), 0.0);
        f.scene.tick(&mut out);
        assert!(!f.scene.is_resonator_active(f.res_a));
    }

    #[test]
    fn activation_respects_the_budget() {
        let mut f = fixture();
        f.scene.set_max_time_cost(3.0);
        assert!(f.scene.activate_resonator(f.res_a).unwrap());
        let res_b = f.scene.body(f.b).unwrap().res.unwrap();
        assert!(!f.scene.activate_resonator(res_b).unwrap());
        assert_eq!(f.scene.n_active_resonators(), 1);
    }

    #[test]
    fn silent_excitation_admits_nothing() {
        let mut f = fixture();
        f.scene.trigger_impact(f.a, f.b, ImpactData {
            impulse: 0.0,
            ..Default::default()
        });
        let mut out = vec![0.0; BLOCK];
        f.scene.tick(&mut out);
        assert_eq!(f.scene.n_active_resonators(), 0);
        assert_eq!(f.scene.time_cost(), 0.0);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn shutdown_returns_everything() {
        let mut f = fixture();
        f.scene.touch(f.a, f.b, sliding());
        f.scene.trigger_impact(f.a, f.b, ImpactData {
            impulse: 1.0,
            rel_tangent_speed: 3.0,
            ..Default::default()
        });
        let mut out = vec![0.0; BLOCK];
        f.scene.tick(&mut out);
        f.scene.shutdown();

        let stats = f.scene.stats();
        assert_eq!(stats.contacts.active, 0);
        assert_eq!(stats.impacts.active, 0);
        assert_eq!(stats.active_resonators.active, 0);
        assert_eq!(stats.blocks.active, 0);
        assert_eq!(stats.contact_gens.active, 0);
        assert_eq!(stats.impact_gens.active, 0);
        assert_eq!(stats.time_cost, 0.0);
    }

    #[test]
    fn wrong_block_length_renders_silence() {
        let mut f = fixture();
        f.scene.touch(f.a, f.b, sliding());
        let mut out = vec![1.0; BLOCK / 2];
        f.scene.tick(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn commands_apply_at_next_tick() {
        let mut f = fixture();
        let mut tx = f.scene.command_queue();
        tx.touch(f.a, f.b, sliding()).unwrap();
        tx.end_physics_step().unwrap();
        assert_eq!(f.scene.stats().contacts.active, 0, "nothing before the tick");

        let mut out = vec![0.0; BLOCK];
        f.scene.tick(&mut out);
        assert_eq!(f.scene.stats().contacts.active, 1);

        tx.set_body_enabled(f.b, false).unwrap();
        f.scene.tick(&mut out);
        assert!(!f.scene.body(f.b).unwrap().enabled);
    }
}
