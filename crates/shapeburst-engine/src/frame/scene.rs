use crate::binding::{VariantTable, VertexFormatBinding};
use crate::device::{RenderDevice, SetupError};
use crate::diagnostics::Diagnostics;
use crate::geometry::{GeometryStore, ShapeCatalog};
use crate::paint::Color;
use crate::particles::ParticleConfig;
use crate::pipeline::{ShaderSources, ShapeProgram};

/// Background of every frame.
pub const DEFAULT_CLEAR_COLOR: Color = Color::opaque(0.08, 0.08, 0.08);

/// Everything needed to set up and run a shape scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    pub particles: ParticleConfig,
    pub catalog: ShapeCatalog,
    pub shaders: ShaderSources,
    pub clear_color: Color,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            particles: ParticleConfig::default(),
            catalog: ShapeCatalog::default(),
            shaders: ShaderSources::default(),
            clear_color: DEFAULT_CLEAR_COLOR,
        }
    }
}

/// Device resources of a shape scene, immutable after setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeScene {
    geometry: GeometryStore,
    program: ShapeProgram,
    variants: VariantTable,
}

impl ShapeScene {
    /// Uploads geometry, builds the program and binds every variant.
    ///
    /// Setup stops at the first failing step; the formatted error is sent to
    /// `diagnostics` once and returned.
    pub fn build<D: RenderDevice + ?Sized>(
        device: &mut D,
        config: &SceneConfig,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<Self, SetupError> {
        match Self::try_build(device, config) {
            Ok(scene) => {
                let names: Vec<&str> = scene.variants.iter().map(|(_, v)| v.name.as_str()).collect();
                log::info!(
                    "shape scene ready: \"{}\" in variants [{}]",
                    scene.geometry.geometry_name(),
                    names.join(", ")
                );
                Ok(scene)
            }
            Err(err) => {
                diagnostics.report(&err.to_string());
                Err(err)
            }
        }
    }

    fn try_build<D: RenderDevice + ?Sized>(device: &mut D, config: &SceneConfig) -> Result<Self, SetupError> {
        let geometry = GeometryStore::upload(device, &config.catalog)?;
        let program = ShapeProgram::build(device, &config.shaders)?;
        let variants = VertexFormatBinding::bind_variants(device, &geometry, &program)?;

        Ok(Self {
            geometry,
            program,
            variants,
        })
    }

    pub fn geometry(&self) -> &GeometryStore {
        &self.geometry
    }

    pub fn program(&self) -> &ShapeProgram {
        &self.program
    }

    pub fn variants(&self) -> &VariantTable {
        &self.variants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::SurfaceSize;
    use crate::device::{HeadlessDevice, ShaderStage};
    use crate::diagnostics::CollectDiagnostics;

    #[test]
    fn default_scene_builds_without_reports() {
        let mut device = HeadlessDevice::new(SurfaceSize::new(800, 600));
        let mut diagnostics = CollectDiagnostics::new();

        let scene = ShapeScene::build(&mut device, &SceneConfig::default(), &mut diagnostics).unwrap();

        assert!(diagnostics.is_empty());
        assert_eq!(scene.variants().len(), 2);
        assert_eq!(scene.geometry().palettes().len(), 2);
    }

    #[test]
    fn allocation_failure_is_reported_once() {
        let mut device = HeadlessDevice::new(SurfaceSize::new(800, 600)).with_buffer_budget(1);
        let mut diagnostics = CollectDiagnostics::new();

        let err = ShapeScene::build(&mut device, &SceneConfig::default(), &mut diagnostics).unwrap_err();

        assert_eq!(diagnostics.messages(), [err.to_string()]);
        assert!(diagnostics.messages()[0].contains("rgb colors=false"));
    }

    #[test]
    fn compile_failure_aborts_before_binding() {
        let mut device = HeadlessDevice::new(SurfaceSize::new(800, 600));
        let mut diagnostics = CollectDiagnostics::new();
        let config = SceneConfig {
            shaders: ShaderSources::new("fn broken(", ShaderSources::default().fragment),
            ..SceneConfig::default()
        };

        let err = ShapeScene::build(&mut device, &config, &mut diagnostics).unwrap_err();

        assert!(matches!(
            err,
            SetupError::ShaderCompile {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
        assert_eq!(device.layout_count(), 0);
        assert!(diagnostics.messages()[0].starts_with("failed to compile vertex shader - "));
    }
}
