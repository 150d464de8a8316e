#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer, PushError};

use crate::scene::body::{BodyId, ResId};
use crate::scene::contact::ContactData;
use crate::scene::impact::ImpactData;

/// Mutations a non-audio thread can queue for the next tick.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SceneCommand {
    /// The pair is touching during the current physics step.
    Touch {
        body1: BodyId,
        body2: BodyId,
        data: ContactData,
    },
    /// Fade out every contact not touched since the last step ended.
    EndPhysicsStep,
    Impact {
        body1: BodyId,
        body2: BodyId,
        data: ImpactData,
    },
    SetBodyEnabled {
        body: BodyId,
        enabled: bool,
    },
    MakeQuiet(ResId),
}

pub trait CommandReceiver {
    fn pop(&mut self) -> Option<SceneCommand>;
}

#[cfg(feature = "rtrb")]
impl CommandReceiver for Consumer<SceneCommand> {
    fn pop(&mut self) -> Option<SceneCommand> {
        Consumer::pop(self).ok()
    }
}

/// Sending half of a scene's command queue.
#[cfg(feature = "rtrb")]
pub struct SceneCommands {
    tx: Producer<SceneCommand>,
}

#[cfg(feature = "rtrb")]
impl SceneCommands {
    pub(crate) fn new(tx: Producer<SceneCommand>) -> Self {
        Self { tx }
    }

    /// Queue a command. A full queue hands it back.
    pub fn send(&mut self, command: SceneCommand) -> Result<(), SceneCommand> {
        self.tx.push(command).map_err(|PushError::Full(c)| c)
    }

    pub fn touch(&mut self, body1: BodyId, body2: BodyId, data: ContactData) -> Result<(), SceneCommand> {
        self.send(SceneCommand::Touch { body1, body2, data })
    }

    pub fn end_physics_step(&mut self) -> Result<(), SceneCommand> {
        self.send(SceneCommand::EndPhysicsStep)
    }

    pub fn impact(&mut self, body1: BodyId, body2: BodyId, data: ImpactData) -> Result<(), SceneCommand> {
        self.send(SceneCommand::Impact { body1, body2, data })
    }

    pub fn set_body_enabled(&mut self, body: BodyId, enabled: bool) -> Result<(), SceneCommand> {
        self.send(SceneCommand::SetBodyEnabled { body, enabled })
    }

    pub fn make_quiet(&mut self, res: ResId) -> Result<(), SceneCommand> {
        self.send(SceneCommand::MakeQuiet(res))
    }

    /// Free slots left in the queue.
    pub fn slots(&self) -> usize {
        self.tx.slots()
    }
}
