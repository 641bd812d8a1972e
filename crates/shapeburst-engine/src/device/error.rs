use std::fmt;

/// Programmable pipeline stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

/// Failure while creating GPU resources.
///
/// All variants are fatal for the run: setup reports the error and stops, it never
/// continues with a partially initialized scene.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SetupError {
    /// The device could not create a buffer, vertex layout or program object.
    #[error("failed to allocate {resource}: {reason}")]
    ResourceAllocation { resource: String, reason: String },

    /// A shader stage failed to compile. `log` is the compiler diagnostic, verbatim.
    #[error("failed to compile {stage} shader - {log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    /// The compiled stages could not be linked into a program.
    #[error("failed to link shader program - {log}")]
    ShaderLink { log: String },

    /// An attribute or uniform the host expects is not exposed by the program.
    #[error("failed to get {interface} locations ({report})")]
    ResourceBinding {
        interface: &'static str,
        report: String,
    },
}

impl SetupError {
    pub(crate) fn allocation(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        SetupError::ResourceAllocation {
            resource: resource.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_message_names_stage_and_log() {
        let err = SetupError::ShaderCompile {
            stage: ShaderStage::Fragment,
            log: "expected `;`".into(),
        };
        assert_eq!(err.to_string(), "failed to compile fragment shader - expected `;`");
    }

    #[test]
    fn binding_error_message_carries_report() {
        let err = SetupError::ResourceBinding {
            interface: "uniform",
            report: "canvas_size=false, shape_size=true".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to get uniform locations (canvas_size=false, shape_size=true)"
        );
    }
}
