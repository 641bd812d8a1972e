//! WGSL front end shared by every device implementation.
//!
//! `compile` parses and validates one stage with naga and reflects its interface;
//! `link` checks that two stages fit together and merges their uniform blocks.
//! Devices keep the resulting `LinkedProgram` to answer attribute/uniform lookups.

use naga::{Binding, TypeInner};

use super::{AttributeLocation, ProgramHandle, SetupError, ShaderStage, UniformKind, UniformLocation};

/// Scalar or vector type crossing a stage boundary.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct IoType {
    pub components: u8,
    pub scalar: naga::Scalar,
}

/// One `@location` input or output of an entry point.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StageVariable {
    pub name: String,
    pub location: u32,
    pub ty: Option<IoType>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UniformMember {
    pub name: String,
    pub offset: u32,
    pub kind: Option<UniformKind>,
}

/// A `var<uniform>` binding.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UniformBlock {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub size: u32,
    pub members: Vec<UniformMember>,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledStage {
    pub stage: ShaderStage,
    pub entry_point: Option<String>,
    pub inputs: Vec<StageVariable>,
    pub outputs: Vec<StageVariable>,
    pub uniforms: Vec<UniformBlock>,
}

#[derive(Debug, Clone)]
pub(crate) struct LinkedProgram {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub attributes: Vec<StageVariable>,
    /// Sorted by `(group, binding)`; groups are contiguous from 0.
    pub blocks: Vec<UniformBlock>,
}

pub(crate) fn compile(stage: ShaderStage, source: &str) -> Result<CompiledStage, SetupError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| SetupError::ShaderCompile {
        stage,
        log: e.emit_to_string(source),
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| SetupError::ShaderCompile {
            stage,
            log: e.emit_to_string(source),
        })?;

    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage.to_naga());

    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    if let Some(ep) = entry {
        for arg in &ep.function.arguments {
            collect_io(&module, arg.ty, arg.binding.as_ref(), arg.name.as_deref(), &mut inputs);
        }
        if let Some(result) = &ep.function.result {
            collect_io(&module, result.ty, result.binding.as_ref(), None, &mut outputs);
        }
    }

    Ok(CompiledStage {
        stage,
        entry_point: entry.map(|ep| ep.name.clone()),
        inputs,
        outputs,
        uniforms: collect_uniforms(&module),
    })
}

pub(crate) fn link(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<LinkedProgram, SetupError> {
    let mut problems = Vec::new();

    if vertex.stage != ShaderStage::Vertex {
        problems.push(format!("shader attached as vertex stage was compiled as {}", vertex.stage));
    }
    if fragment.stage != ShaderStage::Fragment {
        problems.push(format!(
            "shader attached as fragment stage was compiled as {}",
            fragment.stage
        ));
    }
    if vertex.entry_point.is_none() {
        problems.push("vertex stage has no @vertex entry point".to_owned());
    }
    if fragment.entry_point.is_none() {
        problems.push("fragment stage has no @fragment entry point".to_owned());
    }

    for input in &fragment.inputs {
        match vertex.outputs.iter().find(|o| o.location == input.location) {
            None => problems.push(format!(
                "fragment input `{}` at location {} is not written by the vertex stage",
                input.name, input.location
            )),
            Some(output) if output.ty != input.ty => problems.push(format!(
                "fragment input `{}` at location {} does not match the vertex output type",
                input.name, input.location
            )),
            Some(_) => {}
        }
    }

    let mut blocks: Vec<UniformBlock> = Vec::new();
    for block in vertex.uniforms.iter().chain(&fragment.uniforms) {
        match blocks
            .iter()
            .find(|b| b.group == block.group && b.binding == block.binding)
        {
            Some(existing) if existing != block => problems.push(format!(
                "uniform block at group {} binding {} is declared differently by the two stages",
                block.group, block.binding
            )),
            Some(_) => {}
            None => blocks.push(block.clone()),
        }
    }
    blocks.sort_by_key(|b| (b.group, b.binding));

    let mut groups: Vec<u32> = blocks.iter().map(|b| b.group).collect();
    groups.dedup();
    if groups.iter().enumerate().any(|(i, g)| *g != i as u32) {
        problems.push(format!("uniform groups must be contiguous from 0, found {groups:?}"));
    }

    if !problems.is_empty() {
        return Err(SetupError::ShaderLink {
            log: problems.join("\n"),
        });
    }

    Ok(LinkedProgram {
        vertex_entry: vertex.entry_point.clone().unwrap_or_default(),
        fragment_entry: fragment.entry_point.clone().unwrap_or_default(),
        attributes: vertex.inputs.clone(),
        blocks,
    })
}

impl LinkedProgram {
    pub(crate) fn attribute(&self, name: &str) -> Option<AttributeLocation> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| AttributeLocation(a.location))
    }

    pub(crate) fn uniform(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.blocks.iter().enumerate().find_map(|(index, block)| {
            let member = block.members.iter().find(|m| m.name == name)?;
            Some(UniformLocation {
                program,
                block: index as u32,
                offset: member.offset,
                kind: member.kind?,
            })
        })
    }

    /// Number of bind groups the program uses.
    pub(crate) fn group_count(&self) -> u32 {
        self.blocks.last().map_or(0, |b| b.group + 1)
    }
}

fn collect_io(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&Binding>,
    name: Option<&str>,
    out: &mut Vec<StageVariable>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(StageVariable {
            name: name.unwrap_or_default().to_owned(),
            location: *location,
            ty: io_type(&module.types[ty].inner),
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for m in members {
                    collect_io(module, m.ty, m.binding.as_ref(), m.name.as_deref(), out);
                }
            }
        }
    }
}

fn io_type(inner: &TypeInner) -> Option<IoType> {
    match *inner {
        TypeInner::Scalar(scalar) => Some(IoType { components: 1, scalar }),
        TypeInner::Vector { size, scalar } => Some(IoType {
            components: size as u8,
            scalar,
        }),
        _ => None,
    }
}

fn uniform_kind(inner: &TypeInner) -> Option<UniformKind> {
    match *inner {
        TypeInner::Scalar(s) if s == naga::Scalar::F32 => Some(UniformKind::Float),
        TypeInner::Vector {
            size: naga::VectorSize::Bi,
            scalar,
        } if scalar == naga::Scalar::F32 => Some(UniformKind::Vec2),
        _ => None,
    }
}

fn collect_uniforms(module: &naga::Module) -> Vec<UniformBlock> {
    let mut blocks = Vec::new();

    for (_, var) in module.global_variables.iter() {
        if var.space != naga::AddressSpace::Uniform {
            continue;
        }
        // The validator rejects uniform globals without a binding.
        let Some(rb) = &var.binding else { continue };
        let name = var.name.clone().unwrap_or_default();

        let (size, members) = match &module.types[var.ty].inner {
            TypeInner::Struct { members, span } => (
                *span,
                members
                    .iter()
                    .map(|m| UniformMember {
                        name: m.name.clone().unwrap_or_default(),
                        offset: m.offset,
                        kind: uniform_kind(&module.types[m.ty].inner),
                    })
                    .collect(),
            ),
            other => (
                other.size(module.to_ctx()),
                vec![UniformMember {
                    name: name.clone(),
                    offset: 0,
                    kind: uniform_kind(other),
                }],
            ),
        };

        blocks.push(UniformBlock {
            name,
            group: rb.group,
            binding: rb.binding,
            size,
            members,
        });
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = r#"
struct Frame {
    canvas_size: vec2<f32>,
}

@group(0) @binding(0) var<uniform> frame: Frame;

struct Params {
    offset: vec2<f32>,
    scale: f32,
}

@group(1) @binding(0) var<uniform> params: Params;

struct In {
    @location(0) pos: vec2<f32>,
    @location(3) tint: vec4<f32>,
}

struct Out {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec3<f32>,
}

@vertex
fn vs_main(input: In) -> Out {
    var out: Out;
    out.clip = vec4<f32>((input.pos * params.scale + params.offset) / frame.canvas_size, 0.0, 1.0);
    out.color = input.tint.rgb;
    return out;
}
"#;

    const FS: &str = r#"
@fragment
fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 1.0);
}
"#;

    fn linked() -> LinkedProgram {
        let vs = compile(ShaderStage::Vertex, VS).unwrap();
        let fs = compile(ShaderStage::Fragment, FS).unwrap();
        link(&vs, &fs).unwrap()
    }

    // ── compile ───────────────────────────────────────────────────────────

    #[test]
    fn compile_reflects_struct_inputs() {
        let vs = compile(ShaderStage::Vertex, VS).unwrap();
        assert_eq!(vs.entry_point.as_deref(), Some("vs_main"));
        let names: Vec<_> = vs.inputs.iter().map(|i| (i.name.as_str(), i.location)).collect();
        assert_eq!(names, vec![("pos", 0), ("tint", 3)]);
        assert_eq!(vs.outputs.len(), 1);
    }

    #[test]
    fn compile_reflects_argument_inputs() {
        let fs = compile(ShaderStage::Fragment, FS).unwrap();
        assert_eq!(fs.inputs[0].name, "color");
        assert_eq!(fs.inputs[0].ty.map(|t| t.components), Some(3));
    }

    #[test]
    fn parse_error_is_reported_with_stage() {
        let err = compile(ShaderStage::Fragment, "@fragment fn broken( {").unwrap_err();
        match err {
            SetupError::ShaderCompile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn validation_error_is_a_compile_error() {
        let src = "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return undefined_name; }";
        assert!(matches!(
            compile(ShaderStage::Vertex, src),
            Err(SetupError::ShaderCompile { stage: ShaderStage::Vertex, .. })
        ));
    }

    #[test]
    fn uniform_members_carry_offsets_and_kinds() {
        let vs = compile(ShaderStage::Vertex, VS).unwrap();
        let params = vs.uniforms.iter().find(|b| b.name == "params").unwrap();
        assert_eq!(params.group, 1);
        assert!(params.size >= 12);
        assert_eq!(params.members[0].offset, 0);
        assert_eq!(params.members[0].kind, Some(UniformKind::Vec2));
        assert_eq!(params.members[1].offset, 8);
        assert_eq!(params.members[1].kind, Some(UniformKind::Float));
    }

    // ── link ──────────────────────────────────────────────────────────────

    #[test]
    fn link_resolves_attributes_and_uniforms() {
        let program = linked();
        assert_eq!(program.attribute("tint"), Some(AttributeLocation(3)));
        assert_eq!(program.attribute("missing"), None);

        let scale = program.uniform(ProgramHandle(7), "scale").unwrap();
        assert_eq!(scale.block, 1);
        assert_eq!(scale.offset, 8);
        assert_eq!(scale.kind, UniformKind::Float);
        assert_eq!(scale.program, ProgramHandle(7));
        assert_eq!(program.group_count(), 2);
    }

    #[test]
    fn link_rejects_unwritten_fragment_input() {
        let fs = compile(
            ShaderStage::Fragment,
            "@fragment fn fs_main(@location(2) c: vec3<f32>) -> @location(0) vec4<f32> { return vec4<f32>(c, 1.0); }",
        )
        .unwrap();
        let vs = compile(ShaderStage::Vertex, VS).unwrap();
        match link(&vs, &fs) {
            Err(SetupError::ShaderLink { log }) => assert!(log.contains("location 2")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn link_rejects_missing_entry_point() {
        let vs = compile(ShaderStage::Vertex, FS).unwrap();
        let fs = compile(ShaderStage::Fragment, FS).unwrap();
        match link(&vs, &fs) {
            Err(SetupError::ShaderLink { log }) => assert!(log.contains("@vertex")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn link_rejects_gapped_groups() {
        let vs_src = VS.replace("@group(1)", "@group(2)");
        let vs = compile(ShaderStage::Vertex, &vs_src).unwrap();
        let fs = compile(ShaderStage::Fragment, FS).unwrap();
        assert!(matches!(link(&vs, &fs), Err(SetupError::ShaderLink { .. })));
    }
}
