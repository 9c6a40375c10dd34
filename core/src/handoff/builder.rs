use super::context::{
    FontDescriptor, GraphicsDescriptor, HandoffContext, RuntimeServicesHandle,
};
use super::BootEnvironment;
use crate::error::Result;

/// Collects the handoff resources while boot services are still available.
///
/// [`finish`](Self::finish) takes the memory map snapshot and ends boot
/// services in one step. It consumes the builder, so boot services can only
/// be relinquished once.
#[derive(Debug)]
pub struct HandoffBuilder {
    runtime_services: RuntimeServicesHandle,
    graphics: GraphicsDescriptor,
    font: FontDescriptor,
}

impl HandoffBuilder {
    /// Query the graphics descriptor and the runtime services handle.
    pub fn new<E>(env: &mut E) -> Self
    where
        E: BootEnvironment + ?Sized,
    {
        let graphics = env.graphics();
        let runtime_services = env.runtime_services();
        Self {
            runtime_services,
            graphics,
            font: FontDescriptor::none(),
        }
    }

    pub fn with_font(mut self, font: FontDescriptor) -> Self {
        self.font = font;
        self
    }

    pub fn graphics(&self) -> &GraphicsDescriptor {
        &self.graphics
    }

    /// Snapshot the memory map and relinquish boot services.
    ///
    /// Nothing may allocate or log between the two calls: either can change
    /// the memory map and invalidate the snapshot's key. A failed relinquish
    /// is returned as is and never retried.
    pub fn finish<E>(self, env: &mut E) -> Result<HandoffContext>
    where
        E: BootEnvironment + ?Sized,
    {
        let snapshot = env.get_memory_map()?;
        env.relinquish(snapshot.key)?;

        Ok(HandoffContext {
            runtime_services: self.runtime_services,
            memory: snapshot.info,
            graphics: self.graphics,
            font: self.font,
        })
    }
}
