//! Scene viewer
//!
//! Draws a row of textured models over a floor while six point lights orbit
//! above them. Reads `viewer.toml` from the working directory when present.

mod scene;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use ash::vk;
use glfw::{Action, Key, WindowEvent};
use thiserror::Error;

use rust_renderer::assets::AssetError;
use rust_renderer::config::{Config, ConfigError};
use rust_renderer::core::ApplicationConfig;
use rust_renderer::ecs::spawn::register_scene_components;
use rust_renderer::ecs::EntityManager;
use rust_renderer::foundation::logging;
use rust_renderer::foundation::math::utils::deg_to_rad;
use rust_renderer::foundation::math::Vec3;
use rust_renderer::render::vulkan::{
    object_alignment, DescriptorPool, DescriptorPoolBuilder, DescriptorSetLayout, DescriptorSetLayoutBuilder,
    DescriptorWriter, HostBuffer, VulkanContext, VulkanError, VulkanPresenter, VulkanResult, Window,
};
use rust_renderer::render::{
    Camera, FrameDescriptorPools, FrameInfo, FrameOrchestrator, GlobalUbo, ObjectManager, ObjectRecord,
    PointLightSystem, SurfaceWindow, TexturedRenderSystem,
};

use scene::SceneResources;

const CONFIG_PATH: &str = "viewer.toml";
const FIELD_OF_VIEW_DEGREES: f32 = 50.0;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 100.0;
/// Clamp for long stalls such as window drags
const MAX_FRAME_TIME: f32 = 0.1;

#[derive(Error, Debug)]
enum ViewerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Renderer error: {0}")]
    Vulkan(#[from] VulkanError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
}

struct ViewerApp {
    point_light_system: PointLightSystem,
    textured_system: TexturedRenderSystem,
    frame_pools: FrameDescriptorPools<DescriptorPool>,
    global_sets: Vec<vk::DescriptorSet>,
    _global_pool: DescriptorPool,
    _global_set_layout: DescriptorSetLayout,
    objects: ObjectManager<HostBuffer>,
    ubo_buffers: Vec<HostBuffer>,
    scene: EntityManager,
    camera: Camera,
    orchestrator: FrameOrchestrator<VulkanPresenter>,
    max_lights: usize,
    _context: Arc<VulkanContext>,
    window: Window,
}

impl ViewerApp {
    fn new(config: &ApplicationConfig) -> Result<Self, ViewerError> {
        let renderer = &config.renderer;
        let frames = renderer.max_frames_in_flight;

        let mut window = Window::new(&config.window.title, config.window.width, config.window.height)
            .map_err(VulkanError::from)?;
        let context = Arc::new(VulkanContext::new(
            &mut window,
            &renderer.application_name,
            renderer.enable_validation,
        )?);
        let device = context.device().clone();

        let presenter = VulkanPresenter::new(Arc::clone(&context), window.extent(), frames, renderer.clear_color)?;
        let render_pass = presenter.render_pass().handle();

        let global_set_layout = DescriptorSetLayoutBuilder::new()
            .add_binding(0, vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::ALL_GRAPHICS)
            .build(&device)?;
        let global_pool = DescriptorPoolBuilder::new()
            .max_sets(count_u32(frames))
            .add_pool_size(vk::DescriptorType::UNIFORM_BUFFER, count_u32(frames))
            .build(&device)?;

        let ubo_buffers = (0..frames)
            .map(|_| HostBuffer::uniform::<GlobalUbo>(&context))
            .collect::<VulkanResult<Vec<_>>>()?;
        let global_sets = ubo_buffers
            .iter()
            .map(|buffer| {
                DescriptorWriter::new(&global_set_layout)
                    .write_buffer(0, buffer.descriptor_info())
                    .build(&global_pool)
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        let renderables = count_u32(config.components.renderer);
        let frame_pools = (0..frames)
            .map(|_| {
                DescriptorPoolBuilder::new()
                    .max_sets(renderables)
                    .add_pool_size(vk::DescriptorType::UNIFORM_BUFFER, renderables)
                    .add_pool_size(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, renderables)
                    .build(&device)
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        let alignment = object_alignment(context.physical_device().limits());
        let object_buffers = (0..frames)
            .map(|_| {
                HostBuffer::new(
                    &context,
                    std::mem::size_of::<ObjectRecord>() as vk::DeviceSize,
                    renderer.max_entities,
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    alignment,
                )
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        let textured_system =
            TexturedRenderSystem::new(device.clone(), render_pass, global_set_layout.handle(), &config.shaders)?;
        let point_light_system =
            PointLightSystem::new(device, render_pass, global_set_layout.handle(), &config.shaders)?;

        let mut scene = EntityManager::new(renderer.max_entities);
        register_scene_components(&mut scene, &config.components);
        {
            let resources = SceneResources::load(&context, presenter.command_pool(), &config.assets)?;
            scene::spawn_models(&mut scene, &resources);
        }
        let lights = scene::spawn_lights(&mut scene, renderer.max_lights);
        log::info!("Spawned {} point lights", lights.len());

        let mut camera = Camera::new();
        camera.set_view_target(Vec3::new(0.0, -1.5, -3.0), Vec3::new(0.0, 0.25, 0.0), Vec3::new(0.0, -1.0, 0.0));

        Ok(Self {
            point_light_system,
            textured_system,
            frame_pools: FrameDescriptorPools::new(frame_pools),
            global_sets,
            _global_pool: global_pool,
            _global_set_layout: global_set_layout,
            objects: ObjectManager::new(object_buffers, renderer.max_entities),
            ubo_buffers,
            scene,
            camera,
            orchestrator: FrameOrchestrator::new(presenter, frames),
            max_lights: renderer.max_lights,
            _context: context,
            window,
        })
    }

    fn run(&mut self) -> VulkanResult<()> {
        let mut last_frame = Instant::now();

        while !self.window.should_close() {
            for event in self.window.poll_events() {
                if let WindowEvent::Key(Key::Escape, _, Action::Press, _) = event {
                    self.window.set_should_close(true);
                }
            }

            let now = Instant::now();
            let frame_time = now.duration_since(last_frame).as_secs_f32().min(MAX_FRAME_TIME);
            last_frame = now;

            scene::orbit_lights(&mut self.scene, frame_time);
            self.draw_frame(frame_time)?;
        }

        self.orchestrator.wait_idle()
    }

    fn draw_frame(&mut self, frame_time: f32) -> VulkanResult<()> {
        let Some(command_buffer) = self.orchestrator.begin_frame(&mut self.window)? else {
            return Ok(());
        };
        let frame_index = self.orchestrator.frame_index();

        self.camera.set_perspective_projection(
            deg_to_rad(FIELD_OF_VIEW_DEGREES),
            self.orchestrator.aspect_ratio(),
            NEAR_PLANE,
            FAR_PLANE,
        );

        let mut ubo = GlobalUbo::default();
        ubo.set_camera(self.camera.projection(), self.camera.view(), self.camera.inverse_view());
        PointLightSystem::update(&self.scene, &mut ubo, self.max_lights);
        self.ubo_buffers[frame_index].write_value(&ubo)?;
        self.objects.update_buffer(frame_index, &self.scene)?;

        let frame_descriptor_pool = self.frame_pools.begin_frame(frame_index)?;
        let frame_info = FrameInfo {
            frame_index,
            frame_time,
            command_buffer,
            camera: &self.camera,
            global_descriptor_set: self.global_sets[frame_index],
            frame_descriptor_pool,
            entity_manager: &self.scene,
        };

        self.orchestrator.begin_render_pass(command_buffer);
        self.textured_system.render(&frame_info, &self.objects)?;
        self.point_light_system.render(&frame_info);
        self.orchestrator.end_render_pass(command_buffer);

        self.orchestrator.end_frame(&mut self.window)
    }
}

impl Drop for ViewerApp {
    fn drop(&mut self) {
        if let Err(e) = self.orchestrator.wait_idle() {
            log::error!("Failed to wait for device idle on shutdown: {e}");
        }
    }
}

fn count_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn load_config() -> Result<ApplicationConfig, ConfigError> {
    if !Path::new(CONFIG_PATH).exists() {
        log::info!("{CONFIG_PATH} not found, using default configuration");
        return Ok(ApplicationConfig::default());
    }
    let config = ApplicationConfig::load_from_file(CONFIG_PATH)?;
    log::info!("Loaded configuration from {CONFIG_PATH}");
    Ok(config)
}

fn run_viewer() -> Result<(), ViewerError> {
    let config = load_config()?;
    config.validate()?;

    let mut app = ViewerApp::new(&config)?;
    app.run()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    log::info!("Starting viewer");

    if let Err(e) = run_viewer() {
        log::error!("Viewer stopped: {e}");
        return Err(e.into());
    }

    log::info!("Viewer finished");
    Ok(())
}
