use crate::gfx::{ProgramHandle, RenderBackend, VertexLayout};

use super::{ProgramError, ShaderPolicy, ShaderSources, ShaderStage};

/// Compiles and links a shader program.
///
/// Call order against the backend is fixed: compile vertex, compile
/// fragment, link, release both stages. Stage objects are released on every
/// path, including failures.
#[derive(Debug, Copy, Clone, Default)]
pub struct ProgramBuilder {
    policy: ShaderPolicy,
}

impl ProgramBuilder {
    pub fn new(policy: ShaderPolicy) -> Self {
        Self { policy }
    }

    /// Builds a program that draws geometry laid out as `layout`.
    ///
    /// Under [`ShaderPolicy::Strict`] the first compile or link failure is
    /// returned and the program is released. Under
    /// [`ShaderPolicy::Lenient`] failures are logged and the program handle
    /// is returned anyway.
    pub fn build<B>(
        &self,
        backend: &mut B,
        sources: &ShaderSources,
        layout: &VertexLayout,
    ) -> Result<ProgramHandle, ProgramError>
    where
        B: RenderBackend + ?Sized,
    {
        let vertex = backend.compile_stage(&sources.vertex);
        let fragment = backend.compile_stage(&sources.fragment);

        let vertex_status = backend.stage_status(vertex);
        let fragment_status = backend.stage_status(fragment);

        let program = backend.link_program(vertex, fragment, layout);

        backend.release_stage(vertex);
        backend.release_stage(fragment);

        let link_status = backend.program_status(program);

        let compile_error = |stage: ShaderStage, log: String| {
            let path = match stage {
                ShaderStage::Vertex => sources.vertex.path.clone(),
                ShaderStage::Fragment => sources.fragment.path.clone(),
            };
            ProgramError::Compile { stage, path, log }
        };

        let first_error = vertex_status
            .map_err(|log| compile_error(ShaderStage::Vertex, log))
            .and(fragment_status.map_err(|log| compile_error(ShaderStage::Fragment, log)))
            .and(link_status.map_err(|log| ProgramError::Link { log }));

        match (first_error, self.policy) {
            (Ok(()), _) => {
                log::info!(
                    "shader program linked ({}, {})",
                    sources.vertex.path.display(),
                    sources.fragment.path.display()
                );
                Ok(program)
            }
            (Err(e), ShaderPolicy::Strict) => {
                backend.release_program(program);
                Err(e)
            }
            (Err(e), ShaderPolicy::Lenient) => {
                log::warn!("continuing with an unusable shader program: {e}");
                Ok(program)
            }
        }
    }
}
