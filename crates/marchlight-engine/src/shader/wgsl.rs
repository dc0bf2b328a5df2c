//! WGSL front end: parse + validate with `naga`, then check the stage
//! interface the render pipeline expects.
//!
//! Pipeline resource interface (group 0):
//! - binding 0: uniform block, at most `FrameUniforms` bytes, both stages
//! - binding 1: `texture_3d<u32>`, fragment stage only
//! - binding 2: `sampler`, fragment stage only
//!
//! Color target: one float render target at `@location(0)`.

use std::fmt;

use naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};
use naga::{
    AddressSpace, Binding, Handle, ImageClass, ImageDimension, Interpolation, Module, Sampling,
    ScalarKind, Type, TypeInner,
};

use crate::frame::FrameUniforms;
use crate::gfx::{AttributeFormat, VertexLayout};

use super::ShaderStage;

pub const UNIFORM_BINDING: u32 = 0;
pub const VOLUME_BINDING: u32 = 1;
pub const SAMPLER_BINDING: u32 = 2;

/// Parses and validates one stage. `Err` carries a rendered diagnostic.
pub fn compile(stage: ShaderStage, text: &str) -> Result<Module, String> {
    let module = naga::front::wgsl::parse_str(text).map_err(|e| e.emit_to_string(text))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| e.emit_to_string(text))?;

    check_resources(&module).map_err(|e| format!("{stage} stage: {e}"))?;
    check_vertex_visibility(&module, &info).map_err(|e| format!("{stage} stage: {e}"))?;

    Ok(module)
}

/// Checks that two compiled stages form a drawable program for `layout`.
///
/// Every mismatch wgpu would reject at pipeline creation is reported here:
/// attribute types, interstage types and interpolation, and the color output.
pub fn check_link(vertex: &Module, fragment: &Module, layout: &VertexLayout) -> Result<(), String> {
    let vs = entry_point(vertex, ShaderStage::Vertex)?;
    let fs = entry_point(fragment, ShaderStage::Fragment)?;

    for input in inputs(vertex, vs) {
        let location = input.location;
        let Some(attr) = layout.attributes.iter().find(|a| a.location == location) else {
            return Err(format!(
                "vertex input @location({location}) is not provided by the vertex layout"
            ));
        };
        let provided = attribute_type(attr.format);
        if input.ty != Some(provided) {
            return Err(format!(
                "vertex input @location({location}) is {}; the layout provides {:?} ({provided})",
                describe(input.ty),
                attr.format
            ));
        }
    }

    let produced = outputs(vertex, vs);
    for input in inputs(fragment, fs) {
        let location = input.location;
        let Some(out) = produced.iter().find(|o| o.location == location) else {
            return Err(format!(
                "fragment input @location({location}) is not written by the vertex stage"
            ));
        };
        if out.ty != input.ty {
            return Err(format!(
                "fragment input @location({location}) is {} but the vertex stage writes {}",
                describe(input.ty),
                describe(out.ty)
            ));
        }
        if (out.interpolation, out.sampling) != (input.interpolation, input.sampling) {
            return Err(format!(
                "@location({location}) interpolation differs between stages ({:?} vs {:?})",
                out.interpolation, input.interpolation
            ));
        }
    }

    let colors = outputs(fragment, fs);
    if let Some(extra) = colors.iter().find(|o| o.location != 0) {
        return Err(format!(
            "fragment output @location({}) has no render target; only @location(0) is drawn",
            extra.location
        ));
    }
    match colors.first() {
        None => return Err("fragment stage does not write @location(0)".to_string()),
        Some(color) if color.ty.map(|t| t.kind) != Some(ScalarKind::Float) => {
            return Err(format!(
                "fragment output @location(0) is {}; the render target takes floats",
                describe(color.ty)
            ));
        }
        Some(_) => {}
    }

    Ok(())
}

/// Scalar or vector type of one user-defined stage input or output.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct IoType {
    kind: ScalarKind,
    width: u8,
    components: u8,
}

impl fmt::Display for IoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            ScalarKind::Float => "f",
            ScalarKind::Sint => "i",
            ScalarKind::Uint => "u",
            other => return write!(f, "{other:?}x{}", self.components),
        };
        let bits = u32::from(self.width) * 8;
        match self.components {
            1 => write!(f, "{prefix}{bits}"),
            n => write!(f, "vec{n}<{prefix}{bits}>"),
        }
    }
}

fn describe(ty: Option<IoType>) -> String {
    ty.map_or_else(|| "a non-numeric type".to_string(), |t| t.to_string())
}

#[derive(Debug, Copy, Clone)]
struct IoSlot {
    location: u32,
    ty: Option<IoType>,
    interpolation: Option<Interpolation>,
    sampling: Option<Sampling>,
}

fn attribute_type(format: AttributeFormat) -> IoType {
    match format {
        AttributeFormat::Float32x2 => IoType { kind: ScalarKind::Float, width: 4, components: 2 },
    }
}

fn io_type(module: &Module, ty: Handle<Type>) -> Option<IoType> {
    match &module.types[ty].inner {
        TypeInner::Scalar(s) => Some(IoType { kind: s.kind, width: s.width, components: 1 }),
        TypeInner::Vector { size, scalar } => Some(IoType {
            kind: scalar.kind,
            width: scalar.width,
            components: *size as u8,
        }),
        _ => None,
    }
}

fn entry_point(module: &Module, stage: ShaderStage) -> Result<&naga::EntryPoint, String> {
    let want = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    module
        .entry_points
        .iter()
        .find(|ep| ep.stage == want && ep.name == stage.entry_point())
        .ok_or_else(|| format!("missing {stage} entry point `{}`", stage.entry_point()))
}

fn inputs(module: &Module, ep: &naga::EntryPoint) -> Vec<IoSlot> {
    let mut out = Vec::new();
    for arg in &ep.function.arguments {
        collect_slots(module, arg.binding.as_ref(), arg.ty, &mut out);
    }
    out
}

fn outputs(module: &Module, ep: &naga::EntryPoint) -> Vec<IoSlot> {
    let mut out = Vec::new();
    if let Some(result) = &ep.function.result {
        collect_slots(module, result.binding.as_ref(), result.ty, &mut out);
    }
    out
}

fn collect_slots(
    module: &Module,
    binding: Option<&Binding>,
    ty: Handle<Type>,
    out: &mut Vec<IoSlot>,
) {
    match binding {
        Some(Binding::Location { location, interpolation, sampling, .. }) => out.push(IoSlot {
            location: *location,
            ty: io_type(module, ty),
            interpolation: *interpolation,
            sampling: *sampling,
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            // IO structs carry bindings on their members.
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for m in members {
                    collect_slots(module, m.binding.as_ref(), m.ty, out);
                }
            }
        }
    }
}

/// The vertex stage sees only the uniform block.
fn check_vertex_visibility(module: &Module, info: &ModuleInfo) -> Result<(), String> {
    for (index, ep) in module.entry_points.iter().enumerate() {
        if ep.stage != naga::ShaderStage::Vertex {
            continue;
        }
        let used = info.get_entry_point(index);
        for (handle, var) in module.global_variables.iter() {
            let Some(rb) = &var.binding else { continue };
            if rb.binding != UNIFORM_BINDING && !used[handle].is_empty() {
                return Err(format!(
                    "`{}` reads @binding({}), which is visible to the fragment stage only",
                    ep.name, rb.binding
                ));
            }
        }
    }
    Ok(())
}

fn check_resources(module: &Module) -> Result<(), String> {
    for (_, var) in module.global_variables.iter() {
        let Some(rb) = &var.binding else { continue };
        let name = var.name.as_deref().unwrap_or("<unnamed>");

        if rb.group != 0 {
            return Err(format!("`{name}` uses @group({}); only group 0 is bound", rb.group));
        }

        let inner = &module.types[var.ty].inner;
        match rb.binding {
            UNIFORM_BINDING => {
                if var.space != AddressSpace::Uniform {
                    return Err(format!("`{name}` at @binding(0) must be var<uniform>"));
                }
                let size = inner.size(module.to_ctx()) as usize;
                if size > std::mem::size_of::<FrameUniforms>() {
                    return Err(format!(
                        "uniform block `{name}` is {size} bytes; at most {} are written per frame",
                        std::mem::size_of::<FrameUniforms>()
                    ));
                }
            }
            VOLUME_BINDING => match inner {
                TypeInner::Image {
                    dim: ImageDimension::D3,
                    arrayed: false,
                    class: ImageClass::Sampled { kind: ScalarKind::Uint, multi: false },
                } => {}
                _ => return Err(format!("`{name}` at @binding(1) must be texture_3d<u32>")),
            },
            SAMPLER_BINDING => match inner {
                TypeInner::Sampler { comparison: false } => {}
                _ => return Err(format!("`{name}` at @binding(2) must be a sampler")),
            },
            other => return Err(format!("`{name}` uses unbound @binding({other})")),
        }
    }
    Ok(())
}
