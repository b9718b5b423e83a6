//! Processing stages and the chain that runs them in order.

use tracing::trace;

use crate::chunk::Chunk;
use crate::error::CodecError;

/// One step of a codec pipeline.
///
/// A stage accepts chunks through [`process`](Stage::process) and hands
/// out results through [`pull`](Stage::pull), in the order they became
/// ready. The two sides are deliberately decoupled: a stage may buffer
/// any amount of input before producing anything, and one input may
/// produce several outputs. `is_empty` answers whether a pull could
/// yield something right now.
pub trait Stage: Send {
    /// Feeds one chunk into the stage.
    fn process(&mut self, chunk: Chunk) -> Result<(), CodecError>;

    /// True when the stage has no output ready.
    fn is_empty(&self) -> bool;

    /// Takes the next ready chunk, `None` when there is none.
    fn pull(&mut self) -> Result<Option<Chunk>, CodecError>;

    /// Drops buffered data and returns to the freshly-built state.
    fn reset(&mut self);
}

impl<S: Stage + ?Sized> Stage for Box<S> {
    fn process(&mut self, chunk: Chunk) -> Result<(), CodecError> {
        (**self).process(chunk)
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn pull(&mut self) -> Result<Option<Chunk>, CodecError> {
        (**self).pull()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

struct NamedStage {
    name: &'static str,
    stage: Box<dyn Stage>,
}

/// An ordered chain of stages that is itself a stage.
///
/// Input enters the first stage; [`pull`](Stage::pull) moves buffered
/// chunks forward stage by stage until the last one yields. A pipeline
/// with no stages passes chunks through untouched, holding at most the
/// one chunk that was last processed.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<NamedStage>,
    bypass: Option<Chunk>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline::default()
    }

    /// Appends a stage at the output end of the chain.
    pub fn add_back(&mut self, name: &'static str, stage: impl Stage + 'static) {
        self.stages.push(NamedStage {
            name,
            stage: Box::new(stage),
        });
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }
}

impl Stage for Pipeline {
    fn process(&mut self, chunk: Chunk) -> Result<(), CodecError> {
        match self.stages.first_mut() {
            Some(head) => head.stage.process(chunk),
            None => {
                self.bypass = Some(chunk);
                Ok(())
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.bypass.is_none() && self.stages.iter().all(|s| s.stage.is_empty())
    }

    fn pull(&mut self) -> Result<Option<Chunk>, CodecError> {
        if let Some(chunk) = self.bypass.take() {
            return Ok(Some(chunk));
        }
        if self.stages.is_empty() {
            return Ok(None);
        }
        loop {
            let last = self.stages.len() - 1;
            if !self.stages[last].stage.is_empty() {
                if let Some(chunk) = self.stages[last].stage.pull()? {
                    return Ok(Some(chunk));
                }
            }

            // Move the rightmost ready chunk one stage forward.
            let mut moved = false;
            for i in (0..last).rev() {
                if self.stages[i].stage.is_empty() {
                    continue;
                }
                if let Some(chunk) = self.stages[i].stage.pull()? {
                    trace!(
                        from = self.stages[i].name,
                        to = self.stages[i + 1].name,
                        size = chunk.len(),
                        "chunk forwarded"
                    );
                    self.stages[i + 1].stage.process(chunk)?;
                    moved = true;
                    break;
                }
            }
            if !moved {
                return Ok(None);
            }
        }
    }

    fn reset(&mut self) {
        self.bypass = None;
        for s in &mut self.stages {
            s.stage.reset();
        }
    }
}
