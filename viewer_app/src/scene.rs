//! Demo scene: a row of textured models over a floor, circled by colored lights

use std::path::Path;
use std::sync::Arc;

use rust_renderer::assets::{AssetError, ImageData, MeshData, ObjLoader};
use rust_renderer::core::AssetConfig;
use rust_renderer::ecs::components::{PointLightComponent, RendererComponent, TransformComponent};
use rust_renderer::ecs::spawn::{create_game_object, create_point_light};
use rust_renderer::ecs::{Entity, EntityManager};
use rust_renderer::foundation::math::{constants::TAU, Vec3};
use rust_renderer::render::vulkan::{CommandPool, Model, Texture, VulkanContext};

use crate::ViewerError;

/// Light colors, one light per entry
pub const LIGHT_COLORS: [[f32; 3]; 6] = [
    [1.0, 0.1, 0.1],
    [0.1, 0.1, 1.0],
    [0.1, 1.0, 0.1],
    [1.0, 1.0, 0.1],
    [0.1, 1.0, 1.0],
    [1.0, 1.0, 1.0],
];

const LIGHT_INTENSITY: f32 = 0.2;
const LIGHT_RADIUS: f32 = 0.1;
const LIGHT_HEIGHT: f32 = -1.0;
const LIGHT_ORBIT_RADIUS: f32 = 1.5;
/// Radians per second
const LIGHT_ORBIT_SPEED: f32 = 0.5;

const MODEL_SCALE: f32 = 0.5;
const MODEL_SPACING: f32 = 1.0;
const FLOOR_HEIGHT: f32 = 0.5;
const FLOOR_SCALE: f32 = 3.0;

/// GPU resources shared by the scene's renderables
pub struct SceneResources {
    /// One per configured model, in row order
    pub models: Vec<Arc<Model>>,
    /// Floor mesh, if configured
    pub floor: Option<Arc<Model>>,
    /// Diffuse map shared by every renderable
    pub diffuse_map: Arc<Texture>,
}

impl SceneResources {
    /// Load and upload every configured asset
    ///
    /// A file that fails to load or parse is an error. Only an empty model
    /// list or an unset texture falls back to a unit cube or a white texel.
    pub fn load(context: &VulkanContext, command_pool: &CommandPool, assets: &AssetConfig) -> Result<Self, ViewerError> {
        let meshes = if assets.models.is_empty() {
            log::info!("No models configured, using a unit cube");
            vec![MeshData::cube()]
        } else {
            assets
                .models
                .iter()
                .map(|name| load_mesh(&assets.assets_dir.join(name)))
                .collect::<Result<Vec<_>, _>>()?
        };
        let models = meshes
            .iter()
            .map(|mesh| Model::new(context, command_pool, mesh).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        let floor = match &assets.floor {
            Some(name) => {
                let mesh = load_mesh(&assets.assets_dir.join(name))?;
                Some(Arc::new(Model::new(context, command_pool, &mesh)?))
            }
            None => None,
        };

        let diffuse_map = match &assets.diffuse_texture {
            Some(name) => {
                let image = ImageData::from_file(assets.assets_dir.join(name))?;
                Texture::from_image_data(context, command_pool, &image)?
            }
            None => Texture::solid_color(context, command_pool, [255; 4])?,
        };

        Ok(Self {
            models,
            floor,
            diffuse_map: Arc::new(diffuse_map),
        })
    }
}

/// Load an OBJ file, wrapping parse failures as asset errors
pub fn load_mesh(path: &Path) -> Result<MeshData, AssetError> {
    Ok(ObjLoader::load_obj(path)?)
}

/// Place the models in a row along X, resting on the floor
pub fn spawn_models(scene: &mut EntityManager, resources: &SceneResources) -> Vec<Entity> {
    #[allow(clippy::cast_precision_loss)]
    let center = (resources.models.len().saturating_sub(1)) as f32 * 0.5;

    let mut entities: Vec<Entity> = resources
        .models
        .iter()
        .enumerate()
        .map(|(i, model)| {
            #[allow(clippy::cast_precision_loss)]
            let x = (i as f32 - center) * MODEL_SPACING;
            let entity = create_game_object(scene, "model");
            let transform = scene.get_component_mut::<TransformComponent>(entity);
            transform.translation = Vec3::new(x, FLOOR_HEIGHT - 0.5 * MODEL_SCALE, 0.0);
            transform.scale = Vec3::repeat(MODEL_SCALE);
            scene.insert_component(entity, RendererComponent::new(Arc::clone(model), Arc::clone(&resources.diffuse_map)));
            entity
        })
        .collect();

    if let Some(floor) = &resources.floor {
        let entity = create_game_object(scene, "floor");
        let transform = scene.get_component_mut::<TransformComponent>(entity);
        transform.translation = Vec3::new(0.0, FLOOR_HEIGHT, 0.0);
        transform.scale = Vec3::new(FLOOR_SCALE, 1.0, FLOOR_SCALE);
        scene.insert_component(entity, RendererComponent::new(Arc::clone(floor), Arc::clone(&resources.diffuse_map)));
        entities.push(entity);
    }

    log::info!("Spawned {} renderables", entities.len());
    entities
}

/// Spread up to `max_lights` lights evenly on a circle above the models
pub fn spawn_lights(scene: &mut EntityManager, max_lights: usize) -> Vec<Entity> {
    let count = LIGHT_COLORS.len().min(max_lights);
    (0..count)
        .map(|i| {
            let [r, g, b] = LIGHT_COLORS[i];
            let entity = create_point_light(scene, LIGHT_INTENSITY, LIGHT_RADIUS, Vec3::new(r, g, b));
            #[allow(clippy::cast_precision_loss)]
            let angle = i as f32 * TAU / count as f32;
            scene.get_component_mut::<TransformComponent>(entity).translation =
                orbit_position(angle, LIGHT_ORBIT_RADIUS, LIGHT_HEIGHT);
            entity
        })
        .collect()
}

/// Advance every light around the vertical axis by `frame_time` seconds
pub fn orbit_lights(scene: &mut EntityManager, frame_time: f32) {
    let step = LIGHT_ORBIT_SPEED * frame_time;
    let (sin, cos) = step.sin_cos();
    let lights: Vec<Entity> = scene.entities::<PointLightComponent>().iter().copied().collect();
    for entity in lights {
        let translation = &mut scene.get_component_mut::<TransformComponent>(entity).translation;
        let (x, z) = (translation.x, translation.z);
        translation.x = x * cos - z * sin;
        translation.z = x * sin + z * cos;
    }
}

fn orbit_position(angle: f32, radius: f32, height: f32) -> Vec3 {
    Vec3::new(radius * angle.cos(), height, radius * angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rust_renderer::assets::ObjError;
    use rust_renderer::core::ComponentCapacities;
    use rust_renderer::ecs::spawn::register_scene_components;

    const EPSILON: f32 = 1e-5;

    fn empty_scene() -> EntityManager {
        let mut scene = EntityManager::new(64);
        register_scene_components(&mut scene, &ComponentCapacities::default());
        scene
    }

    #[test]
    fn test_light_count_capped() {
        let mut scene = empty_scene();
        assert_eq!(spawn_lights(&mut scene, 4).len(), 4);
        assert_eq!(scene.entities::<PointLightComponent>().len(), 4);

        let mut scene = empty_scene();
        assert_eq!(spawn_lights(&mut scene, 10).len(), LIGHT_COLORS.len());
    }

    #[test]
    fn test_orbit_preserves_radius_and_height() {
        let mut scene = empty_scene();
        let lights = spawn_lights(&mut scene, 10);
        for _ in 0..10 {
            orbit_lights(&mut scene, 0.016);
        }
        for light in lights {
            let t = scene.get_component::<TransformComponent>(light).translation;
            assert_relative_eq!(t.x.hypot(t.z), LIGHT_ORBIT_RADIUS, epsilon = EPSILON);
            assert_relative_eq!(t.y, LIGHT_HEIGHT, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_orbit_quarter_turn() {
        let mut scene = empty_scene();
        let light = spawn_lights(&mut scene, 1)[0];
        orbit_lights(&mut scene, std::f32::consts::FRAC_PI_2 / LIGHT_ORBIT_SPEED);
        let t = scene.get_component::<TransformComponent>(light).translation;
        assert_relative_eq!(t.x, 0.0, epsilon = EPSILON);
        assert_relative_eq!(t.z, LIGHT_ORBIT_RADIUS, epsilon = EPSILON);
    }

    #[test]
    fn test_missing_mesh_is_an_error() {
        let err = load_mesh(Path::new("does/not/exist.obj")).unwrap_err();
        assert!(matches!(err, AssetError::Parse(ObjError::Io(_))));
    }

    #[test]
    fn test_malformed_mesh_is_an_error() {
        let path = std::env::temp_dir().join(format!("viewer_bad_mesh_{}.obj", std::process::id()));
        std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n").unwrap();
        let result = load_mesh(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(AssetError::Parse(_))));
    }

    #[test]
    fn test_missing_texture_is_an_error() {
        let err = ImageData::from_file("does/not/exist.png").unwrap_err();
        assert!(matches!(err, AssetError::LoadFailed(_)));
    }

    #[test]
    fn test_bundled_meshes_load() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../resources/models");
        for name in ["cube.obj", "pyramid.obj", "quad.obj"] {
            assert!(load_mesh(&dir.join(name)).is_ok(), "{name} failed to load");
        }
    }
}
