//! # Render Manager
//!
//! Owns every GPU-side object of the render core and issues the fixed
//! per-frame draw order:
//!
//! 1. Scene instances of the active mode
//! 2. Skybox, with relaxed depth comparison
//! 3. Particle spawners, weather included
//! 4. UI widgets and text of the active mode
//! 5. Mode overlay
//!
//! A missing resource skips the item that needs it and nothing else; no
//! pass can stop a later one from running.

use crate::assets::AssetLoader;
use crate::config::{EngineConfig, ShaderNames, ViewportConfig};
use crate::foundation::math::{euler_rotation_matrices, strip_translation, Mat4, Vec2, Vec3, Vec4};
use crate::foundation::time::Stopwatch;
use crate::particles::{ParticleModel, ParticleSpawner, ParticleSpawnerConfig};
use crate::render::device::{
    BufferHandle, BufferUsage, DepthFunc, GraphicsDevice, ProgramHandle, TextureHandle, TextureTarget,
    UniformValue, VertexArrayHandle,
};
use crate::render::environment::{Environment, Weather};
use crate::render::lighting::{FrameContext, Light};
use crate::render::primitives::{unit_quad, VertexLayout, SKYBOX_VERTEX_COUNT, SKYBOX_VERTICES};
use crate::render::resources::{
    FontData, MeshDrawDescriptor, ResourceCache, ResourceError, TEXTURE_SAMPLER_UNIFORM,
};
use crate::render::stats::FrameStats;
use crate::render::{PerMode, RenderMode, RenderResult};
use crate::scene::{InstanceArena, InstanceHandle, InstanceMaterial, RenderableInstance};
use crate::ui::{UiTree, WidgetId, WidgetNode, WidgetPayload};
use slotmap::{new_key_type, SlotMap};
use std::collections::HashMap;

new_key_type! {
    /// Handle to a particle spawner owned by the manager
    pub struct SpawnerHandle;
}

/// Indices in the shared unit quad
const QUAD_INDEX_COUNT: u32 = 6;

/// Bytes per mirrored particle (`vec4` position + age)
const PARTICLE_STRIDE: usize = 4 * std::mem::size_of::<f32>();

/// Floats per glyph instance: screen rect then atlas rect
const GLYPH_FLOATS: usize = 8;

/// GPU copy of a spawner's live particles
#[derive(Debug, Clone, Copy)]
struct MirrorBuffer {
    buffer: BufferHandle,
    /// Particles written by the last upload; only these are drawn
    uploaded: u32,
}

#[derive(Debug)]
struct SpawnerSlot {
    spawner: ParticleSpawner,
    gpu: MirrorBuffer,
}

#[derive(Debug, Clone, Copy)]
struct TextBuffer {
    buffer: BufferHandle,
    /// Glyphs the buffer can hold
    capacity: usize,
}

struct ParticleBatch {
    model: ParticleModel,
    buffer: BufferHandle,
    count: u32,
}

/// Frame composer for the map, battle and menu screens
///
/// Resources are registered through the `load_*` methods, scene content
/// through instances, spawners and the per-mode UI trees. Each frame the
/// caller runs [`update`](Self::update) then [`draw_frame`](Self::draw_frame).
pub struct RenderManager {
    device: Box<dyn GraphicsDevice>,
    config: EngineConfig,
    cache: ResourceCache,
    instances: InstanceArena,
    ui: PerMode<UiTree>,
    spawners: SlotMap<SpawnerHandle, SpawnerSlot>,
    environment: Environment,
    weather_gpu: Option<MirrorBuffer>,
    text_buffers: HashMap<(RenderMode, WidgetId), TextBuffer>,
    quad_vao: VertexArrayHandle,
    glyph_vao: VertexArrayHandle,
    skybox_vao: VertexArrayHandle,
    zero_offsets: BufferHandle,
    mode: RenderMode,
}

impl RenderManager {
    /// Create a manager drawing through `device`
    ///
    /// Every program named by `config` is built from `<name>.vert` and
    /// `<name>.frag`, then the shared quad, skybox cube and zero offset
    /// buffer are uploaded.
    pub fn new(
        mut device: Box<dyn GraphicsDevice>,
        loader: &dyn AssetLoader,
        config: EngineConfig,
    ) -> RenderResult<Self> {
        config.validate()?;

        let mut cache = ResourceCache::new();
        let shaders = &config.shaders;
        let ui_program = create_named_program(&mut cache, device.as_mut(), loader, &shaders.ui)?;
        let text_program = create_named_program(&mut cache, device.as_mut(), loader, &shaders.text)?;
        let skybox_program = create_named_program(&mut cache, device.as_mut(), loader, &shaders.skybox)?;
        create_named_program(&mut cache, device.as_mut(), loader, &shaders.scene)?;
        for mode in RenderMode::ALL {
            create_named_program(&mut cache, device.as_mut(), loader, &config.modes.get(mode).scene_shader)?;
        }

        let (vertices, indices) = unit_quad();
        let standard = VertexLayout::standard();
        let quad_vao =
            device.create_vertex_array(ui_program, &standard, bytemuck::cast_slice(&vertices), &indices)?;
        let glyph_vao =
            device.create_vertex_array(text_program, &standard, bytemuck::cast_slice(&vertices), &indices)?;
        let skybox_vao = device.create_vertex_array(
            skybox_program,
            &VertexLayout::position_only(),
            bytemuck::cast_slice(&SKYBOX_VERTICES),
            &[],
        )?;
        let zero_offsets = device.create_buffer(bytemuck::cast_slice(&[0.0f32; 4]), BufferUsage::Static)?;

        let ViewportConfig { width, height } = config.viewport;
        let new_tree = || UiTree::new(width as f32, height as f32);
        let ui = PerMode::new(new_tree(), new_tree(), new_tree());

        log::info!("Render manager ready ({}x{})", width, height);

        Ok(Self {
            device,
            environment: Environment::new(&config.fog),
            config,
            cache,
            instances: InstanceArena::new(),
            ui,
            spawners: SlotMap::with_key(),
            weather_gpu: None,
            text_buffers: HashMap::new(),
            quad_vao,
            glyph_vao,
            skybox_vao,
            zero_offsets,
            mode: RenderMode::default(),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The resource cache, for lookups
    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// The graphics device
    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    /// The graphics device, mutably
    pub fn device_mut(&mut self) -> &mut dyn GraphicsDevice {
        self.device.as_mut()
    }

    // Resources

    /// Build a program from `<name>.vert` and `<name>.frag`
    pub fn create_program(&mut self, loader: &dyn AssetLoader, name: &str) -> RenderResult<ProgramHandle> {
        Ok(create_named_program(&mut self.cache, self.device.as_mut(), loader, name)?)
    }

    /// Load a mesh for a program
    pub fn load_mesh(
        &mut self,
        loader: &dyn AssetLoader,
        file: &str,
        program: &str,
    ) -> RenderResult<&MeshDrawDescriptor> {
        Ok(self.cache.load_mesh(self.device.as_mut(), loader, file, program)?)
    }

    /// Load a 2D texture
    pub fn load_texture(&mut self, loader: &dyn AssetLoader, file: &str) -> RenderResult<TextureHandle> {
        Ok(self.cache.load_texture(self.device.as_mut(), loader, file)?)
    }

    /// Load a sprite sheet of `cols` x `rows` sprites
    pub fn load_sprite_sheet(
        &mut self,
        loader: &dyn AssetLoader,
        file: &str,
        cols: u32,
        rows: u32,
        symmetrical: bool,
    ) -> RenderResult<TextureHandle> {
        Ok(self
            .cache
            .load_sprite_sheet(self.device.as_mut(), loader, file, cols, rows, symmetrical)?)
    }

    /// Load a cubemap from six faces (+X, -X, +Y, -Y, +Z, -Z)
    pub fn load_cubemap(
        &mut self,
        loader: &dyn AssetLoader,
        name: &str,
        faces: [&str; 6],
    ) -> RenderResult<TextureHandle> {
        Ok(self.cache.load_cubemap(self.device.as_mut(), loader, name, faces)?)
    }

    /// Load a font atlas
    pub fn load_font(&mut self, loader: &dyn AssetLoader, name: &str, glyph_size: u32) -> RenderResult<&FontData> {
        Ok(self.cache.load_font(self.device.as_mut(), loader, name, glyph_size)?)
    }

    // Scene

    /// Register an instance and list it in `mode`
    pub fn create_instance(&mut self, mode: RenderMode, instance: RenderableInstance) -> InstanceHandle {
        self.instances.add(mode, instance)
    }

    /// Also list an instance in `mode`
    pub fn show_instance(&mut self, mode: RenderMode, handle: InstanceHandle) -> bool {
        self.instances.show_in(mode, handle)
    }

    /// Stop listing an instance in `mode`
    pub fn hide_instance(&mut self, mode: RenderMode, handle: InstanceHandle) {
        self.instances.hide_in(mode, handle);
    }

    /// Remove an instance from every mode
    pub fn remove_instance(&mut self, handle: InstanceHandle) -> Option<RenderableInstance> {
        self.instances.remove(handle)
    }

    /// Mutable access for per-frame game logic
    pub fn instance_mut(&mut self, handle: InstanceHandle) -> Option<&mut RenderableInstance> {
        self.instances.get_mut(handle)
    }

    /// All instances
    pub fn instances(&self) -> &InstanceArena {
        &self.instances
    }

    // Particles

    /// Create a spawner and its GPU mirror buffer
    pub fn add_spawner(&mut self, config: ParticleSpawnerConfig) -> RenderResult<SpawnerHandle> {
        let spawner = ParticleSpawner::new(config);
        let gpu = allocate_mirror(self.device.as_mut(), spawner.capacity())?;
        log::debug!("Added particle spawner ({} slots)", spawner.capacity());
        Ok(self.spawners.insert(SpawnerSlot { spawner, gpu }))
    }

    /// Destroy a spawner and free its buffer
    pub fn remove_spawner(&mut self, handle: SpawnerHandle) -> Option<ParticleSpawner> {
        let slot = self.spawners.remove(handle)?;
        self.device.delete_buffer(slot.gpu.buffer);
        Some(slot.spawner)
    }

    /// Look up a spawner
    pub fn spawner(&self, handle: SpawnerHandle) -> Option<&ParticleSpawner> {
        self.spawners.get(handle).map(|slot| &slot.spawner)
    }

    /// Mutable spawner; changes reach the GPU on the next [`update`](Self::update)
    pub fn spawner_mut(&mut self, handle: SpawnerHandle) -> Option<&mut ParticleSpawner> {
        self.spawners.get_mut(handle).map(|slot| &mut slot.spawner)
    }

    // Environment

    /// Switch weather, swapping the weather spawner's GPU buffer as needed
    ///
    /// The incoming spawner's buffer is allocated first; if that fails the
    /// weather is left unchanged.
    pub fn set_weather(&mut self, weather: Weather) -> RenderResult<()> {
        let incoming = match self.environment.incoming_spawner(weather) {
            Some(config) => Some(allocate_mirror(self.device.as_mut(), config.capacity)?),
            None => None,
        };

        if self.environment.set_weather(weather).is_some() {
            if let Some(gpu) = self.weather_gpu.take() {
                self.device.delete_buffer(gpu.buffer);
            }
        }
        if incoming.is_some() {
            self.weather_gpu = incoming;
        }
        Ok(())
    }

    /// Select the skybox cubemap; `None` turns the skybox off
    pub fn set_skybox(&mut self, cubemap: Option<&str>) {
        self.environment.set_skybox(cubemap.map(str::to_string));
    }

    /// Weather, fog and skybox state
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    // Modes and UI

    /// Swap the instance and UI sets drawn; nothing is unloaded
    pub fn change_render_mode(&mut self, mode: RenderMode) {
        if mode != self.mode {
            log::info!("Render mode {} -> {}", self.mode, mode);
            self.mode = mode;
        }
    }

    /// Active mode
    pub fn render_mode(&self) -> RenderMode {
        self.mode
    }

    /// UI tree of a mode
    pub fn ui(&self, mode: RenderMode) -> &UiTree {
        self.ui.get(mode)
    }

    /// Mutable UI tree of a mode
    pub fn ui_mut(&mut self, mode: RenderMode) -> &mut UiTree {
        self.ui.get_mut(mode)
    }

    /// Resize the viewport; every UI tree is re-laid out on its next draw
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {}x{}", width, height);
            return;
        }
        self.config.viewport = ViewportConfig { width, height };
        for tree in self.ui.iter_mut() {
            tree.resize(width as f32, height as f32);
        }
    }

    // Frame

    /// Advance spawners and scrolling materials by `dt`, then mirror live
    /// particles to the GPU
    pub fn update(&mut self, dt: f32, player_position: Vec3) {
        self.instances.advance_animations(dt);

        for slot in self.spawners.values_mut() {
            slot.spawner.update(dt, Some(player_position));
            mirror_to_gpu(self.device.as_mut(), &slot.spawner, &mut slot.gpu);
        }

        if let (Some(spawner), Some(gpu)) = (self.environment.weather_spawner_mut(), self.weather_gpu.as_mut()) {
            spawner.update(dt, Some(player_position));
            mirror_to_gpu(self.device.as_mut(), spawner, gpu);
        }
    }

    /// Draw one frame of the active mode
    pub fn draw_frame(&mut self, frame: &FrameContext) -> FrameStats {
        let stopwatch = Stopwatch::start_new();
        let mut stats = FrameStats::default();
        let settings = self.config.modes.get(self.mode).clone();

        self.draw_scene(frame, &settings.scene_shader, &mut stats);
        if settings.draw_skybox {
            self.draw_skybox(frame, &mut stats);
        }
        if settings.draw_particles {
            self.draw_particles(frame, &mut stats);
        }
        self.draw_ui(&mut stats);
        if let Some(overlay) = settings.overlay_texture.as_deref() {
            self.draw_overlay(overlay, &mut stats);
        }

        stats.elapsed = stopwatch.elapsed();
        stats.over_budget = stopwatch.elapsed_ms() > self.config.frame_budget_ms;
        if stats.over_budget {
            log::warn!(
                "{} frame took {:.2}ms (budget {:.2}ms)",
                self.mode,
                stopwatch.elapsed_ms(),
                self.config.frame_budget_ms
            );
        }
        stats
    }

    /// Delete every GPU object the manager and its cache own
    pub fn shutdown(&mut self) {
        let device = self.device.as_mut();
        for (_, slot) in self.spawners.drain() {
            device.delete_buffer(slot.gpu.buffer);
        }
        if let Some(gpu) = self.weather_gpu.take() {
            device.delete_buffer(gpu.buffer);
        }
        for (_, text) in self.text_buffers.drain() {
            device.delete_buffer(text.buffer);
        }
        device.delete_vertex_array(self.quad_vao);
        device.delete_vertex_array(self.glyph_vao);
        device.delete_vertex_array(self.skybox_vao);
        device.delete_buffer(self.zero_offsets);
        self.cache.shutdown(device);
        log::info!("Render manager shut down");
    }

    // Passes

    fn push(&mut self, name: &str, value: UniformValue) -> bool {
        self.cache.set_uniform(self.device.as_mut(), name, value)
    }

    fn viewport_size(&self) -> (f32, f32) {
        (self.config.viewport.width as f32, self.config.viewport.height as f32)
    }

    /// Bind a 3D program and push camera, light and fog state
    fn bind_world_program(&mut self, program: &str, frame: &FrameContext) -> bool {
        if let Err(e) = self.cache.use_program(self.device.as_mut(), program) {
            log::debug!("Skipping draws for program '{}': {}", program, e);
            return false;
        }

        self.push("view", UniformValue::Mat4(frame.view));
        self.push("projection", UniformValue::Mat4(frame.projection));
        self.push("playerPosition", UniformValue::Vec3(frame.player_position));

        self.push("numLights", UniformValue::Int(frame.lights.len() as i32));
        for (i, light) in frame.lights.iter().enumerate() {
            self.push(&Light::uniform_name(i, "position"), UniformValue::Vec4(light.position));
            self.push(&Light::uniform_name(i, "direction"), UniformValue::Vec4(light.direction));
            self.push(&Light::uniform_name(i, "diffuse"), UniformValue::Vec4(light.diffuse));
            self.push(&Light::uniform_name(i, "specular"), UniformValue::Vec4(light.specular));
            self.push(&Light::uniform_name(i, "params"), UniformValue::Vec4(light.params));
        }

        let fog = *self.environment.fog();
        self.push("fogDensity", UniformValue::Float(fog.density));
        self.push("fogGradient", UniformValue::Float(fog.gradient));
        self.push("fogColor", UniformValue::Vec3(fog.color));
        true
    }

    fn draw_scene(&mut self, frame: &FrameContext, scene_program: &str, stats: &mut FrameStats) {
        let handles = self.instances.handles(self.mode).to_vec();
        if handles.is_empty() {
            return;
        }

        let mut bound = self
            .bind_world_program(scene_program, frame)
            .then(|| scene_program.to_string());

        for handle in handles {
            let Some(instance) = self.instances.get(handle).cloned() else {
                continue;
            };

            if bound.as_deref() != Some(instance.program.as_str()) {
                if !self.bind_world_program(&instance.program, frame) {
                    bound = None;
                    stats.instances_skipped += 1;
                    continue;
                }
                bound = Some(instance.program.clone());
            }

            let Some(mesh) = self.cache.find_mesh(&instance.mesh, &instance.program).cloned() else {
                log::debug!("Mesh '{}' not loaded for '{}'", instance.mesh, instance.program);
                stats.instances_skipped += 1;
                continue;
            };

            match self.draw_instance(&instance, &mesh) {
                Some(draws) => {
                    stats.draw_calls += draws;
                    stats.instances_drawn += 1;
                }
                None => stats.instances_skipped += 1,
            }
        }
    }

    /// Push one instance's uniforms and draw every sub-mesh
    ///
    /// `None` when the instance's sprite sheet or sprite is missing.
    fn draw_instance(&mut self, instance: &RenderableInstance, mesh: &MeshDrawDescriptor) -> Option<usize> {
        let program = self.cache.find_program(&instance.program)?.handle;

        let scroll = match &instance.material {
            InstanceMaterial::Sprite { sheet, sprite_id } => {
                if !self.cache.setup_sprite_sheet(self.device.as_mut(), sheet, *sprite_id, 0) {
                    log::debug!("Sprite {} of '{}' unavailable for '{}'", sprite_id, sheet, instance.mesh);
                    return None;
                }
                None
            }
            InstanceMaterial::Animated(scroll) => {
                self.reset_sprite_uniforms();
                Some(*scroll)
            }
            InstanceMaterial::Mesh => {
                self.reset_sprite_uniforms();
                None
            }
        };
        self.push(
            "textureOffset",
            UniformValue::Vec2(scroll.map_or(Vec2::zeros(), |s| s.offset)),
        );
        if let Some(scroll) = scroll {
            self.push("animationTimer", UniformValue::Float(scroll.timer));
        }

        let [rotate_x, rotate_y, rotate_z] = euler_rotation_matrices(&instance.orientation);
        self.push("modelPosition", UniformValue::Mat4(Mat4::new_translation(&instance.position)));
        self.push("modelOrientationX", UniformValue::Mat4(rotate_x));
        self.push("modelOrientationY", UniformValue::Mat4(rotate_y));
        self.push("modelOrientationZ", UniformValue::Mat4(rotate_z));
        self.push("modelScale", UniformValue::Mat4(Mat4::new_nonuniform_scaling(&instance.scale)));
        self.push("useWholeColor", UniformValue::Bool(instance.whole_color.is_some()));
        if let Some(color) = instance.whole_color {
            self.push("wholeColor", UniformValue::Vec4(color));
        }

        let offsets = instance.instancing.map_or(self.zero_offsets, |i| i.offsets);
        self.device.bind_instance_offsets(program, offsets);

        let sprite = matches!(instance.material, InstanceMaterial::Sprite { .. });
        for sub in &mesh.sub_meshes {
            let texture = instance.texture_override.as_deref().or(sub.texture.as_deref());
            if let Some(texture) = texture.filter(|_| !sprite) {
                if !self.cache.setup_texture(self.device.as_mut(), texture, 0) {
                    log::debug!("Texture '{}' missing on '{}'", texture, instance.mesh);
                }
            }
            match instance.instancing {
                Some(instancing) => {
                    self.device
                        .draw_indexed_instanced(sub.vao, sub.index_count, instancing.count)
                }
                None => self.device.draw_indexed(sub.vao, sub.index_count),
            }
        }
        Some(mesh.sub_meshes.len())
    }

    /// Select the whole texture on programs that sample sprite cells
    fn reset_sprite_uniforms(&mut self) {
        self.push("spriteOffset", UniformValue::Vec2(Vec2::zeros()));
        self.push("spriteScale", UniformValue::Vec2(Vec2::new(1.0, 1.0)));
        self.push("isSymmetrical", UniformValue::Bool(false));
    }

    fn draw_skybox(&mut self, frame: &FrameContext, stats: &mut FrameStats) {
        let Some(skybox) = self.environment.skybox().map(str::to_string) else {
            return;
        };
        let program = self.config.shaders.skybox.clone();
        if self.cache.use_program(self.device.as_mut(), &program).is_err() {
            log::debug!("Skybox program '{}' missing", program);
            return;
        }
        if !self.cache.setup_cubemap(self.device.as_mut(), &skybox, 0) {
            return;
        }

        self.device.set_depth_func(DepthFunc::LessEqual);
        self.push("view", UniformValue::Mat4(strip_translation(&frame.view)));
        self.push("projection", UniformValue::Mat4(frame.projection));
        self.device.draw_arrays(self.skybox_vao, SKYBOX_VERTEX_COUNT);
        self.device.set_depth_func(DepthFunc::Less);

        stats.skybox_drawn = true;
        stats.draw_calls += 1;
    }

    fn draw_particles(&mut self, frame: &FrameContext, stats: &mut FrameStats) {
        let batch = |spawner: &ParticleSpawner, gpu: &MirrorBuffer| ParticleBatch {
            model: spawner.config().model.clone(),
            buffer: gpu.buffer,
            count: gpu.uploaded.min(spawner.live_count() as u32),
        };

        let mut batches: Vec<ParticleBatch> = self
            .spawners
            .values()
            .map(|slot| batch(&slot.spawner, &slot.gpu))
            .collect();
        if let (Some(spawner), Some(gpu)) = (self.environment.weather_spawner(), self.weather_gpu.as_ref()) {
            batches.push(batch(spawner, gpu));
        }

        for batch in batches.iter().filter(|b| b.count > 0) {
            let draws = self.draw_particle_batch(frame, batch);
            if draws > 0 {
                stats.particle_systems_drawn += 1;
                stats.particles_drawn += batch.count as usize;
                stats.draw_calls += draws;
            }
        }
    }

    fn draw_particle_batch(&mut self, frame: &FrameContext, batch: &ParticleBatch) -> usize {
        let model = &batch.model;
        if self.cache.use_program(self.device.as_mut(), &model.program).is_err() {
            log::debug!("Particle program '{}' missing", model.program);
            return 0;
        }
        let Some(program) = self.cache.find_program(&model.program).map(|p| p.handle) else {
            return 0;
        };
        let Some(mesh) = self.cache.find_mesh(&model.mesh, &model.program).cloned() else {
            log::debug!("Particle mesh '{}' not loaded for '{}'", model.mesh, model.program);
            return 0;
        };
        if !self.cache.setup_texture(self.device.as_mut(), &model.texture, 0) {
            return 0;
        }

        self.push("view", UniformValue::Mat4(frame.view));
        self.push("projection", UniformValue::Mat4(frame.projection));
        self.push("particleScale", UniformValue::Float(model.scale));
        self.device.bind_instance_offsets(program, batch.buffer);
        for sub in &mesh.sub_meshes {
            self.device.draw_indexed_instanced(sub.vao, sub.index_count, batch.count);
        }
        mesh.sub_meshes.len()
    }

    fn draw_ui(&mut self, stats: &mut FrameStats) {
        let mode = self.mode;
        let tree = self.ui.get_mut(mode);
        if tree.needs_resolve() {
            tree.resolve();
        }

        let (width, height) = self.viewport_size();
        let order = self.ui.get(mode).walk();
        for id in order {
            let tree = self.ui.get(mode);
            let (Some(payload), Some(rect)) = (tree.get(id).and_then(|n| n.payload.clone()), tree.layout(id)) else {
                continue;
            };
            let fractions = rect.to_viewport_fractions(width, height);

            let drawn = match payload {
                WidgetPayload::StaticImage { texture } => {
                    self.draw_textured_quad(fractions, |cache, device| cache.setup_texture(device, &texture, 0))
                }
                WidgetPayload::AnimatedSprite { sheet, sprite_id } => self.draw_textured_quad(fractions, |cache, device| {
                    cache.setup_sprite_sheet(device, &sheet, sprite_id, 0)
                }),
                WidgetPayload::Text(_) => match self.draw_text(mode, id) {
                    Some(glyphs) => {
                        stats.glyphs_drawn += glyphs;
                        if glyphs > 0 {
                            stats.draw_calls += 1;
                        }
                        stats.widgets_drawn += 1;
                        continue;
                    }
                    None => false,
                },
            };

            if drawn {
                stats.widgets_drawn += 1;
                stats.draw_calls += 1;
            } else {
                log::debug!("Skipping {} widget {:?}", mode, id);
                stats.widgets_skipped += 1;
            }
        }

        self.release_stale_text_buffers();
    }

    /// Draw the shared quad with the UI program over `fractions` of the viewport
    fn draw_textured_quad(
        &mut self,
        fractions: [f32; 4],
        bind: impl FnOnce(&mut ResourceCache, &mut dyn GraphicsDevice) -> bool,
    ) -> bool {
        let program = self.config.shaders.ui.clone();
        if self.cache.use_program(self.device.as_mut(), &program).is_err() {
            return false;
        }

        self.reset_sprite_uniforms();
        if !bind(&mut self.cache, self.device.as_mut()) {
            return false;
        }

        self.push("widgetRect", UniformValue::Vec4(Vec4::from(fractions)));
        self.device.draw_indexed(self.quad_vao, QUAD_INDEX_COUNT);
        true
    }

    /// Upload a text widget's glyphs and draw them in one instanced call
    ///
    /// Returns the glyph count, or `None` when the widget was skipped.
    fn draw_text(&mut self, mode: RenderMode, id: WidgetId) -> Option<usize> {
        let tree = self.ui.get(mode);
        let content = tree.get(id)?.text()?.clone();
        let Some(font) = self.cache.find_font(&content.font) else {
            log::debug!("Font '{}' not loaded", content.font);
            return None;
        };
        let atlas = font.texture;
        let quads = tree.text_quads(id, self.cache.fonts())?;
        if quads.is_empty() {
            return Some(0);
        }

        let program_name = self.config.shaders.text.clone();
        self.cache.use_program(self.device.as_mut(), &program_name).ok()?;
        let program = self.cache.find_program(&program_name)?.handle;

        let (width, height) = self.viewport_size();
        let mut data = Vec::with_capacity(quads.len() * GLYPH_FLOATS);
        for quad in &quads {
            data.extend_from_slice(&quad.to_floats(width, height));
        }
        let buffer = self.write_text_buffer(mode, id, &data)?;

        self.device.bind_texture(0, TextureTarget::Texture2D, atlas);
        self.push(TEXTURE_SAMPLER_UNIFORM, UniformValue::Int(0));
        self.push("textColor", UniformValue::Vec3(content.color));
        self.device.bind_instance_offsets(program, buffer);
        self.device
            .draw_indexed_instanced(self.glyph_vao, QUAD_INDEX_COUNT, quads.len() as u32);
        Some(quads.len())
    }

    /// Write glyph data into the widget's buffer, growing it when too small
    fn write_text_buffer(&mut self, mode: RenderMode, id: WidgetId, data: &[f32]) -> Option<BufferHandle> {
        let glyphs = data.len() / GLYPH_FLOATS;
        let bytes: &[u8] = bytemuck::cast_slice(data);

        if let Some(existing) = self.text_buffers.get(&(mode, id)).copied() {
            if existing.capacity >= glyphs {
                return match self.device.update_buffer(existing.buffer, 0, bytes) {
                    Ok(()) => Some(existing.buffer),
                    Err(e) => {
                        log::warn!("Glyph upload failed: {}", e);
                        None
                    }
                };
            }
            self.device.delete_buffer(existing.buffer);
            self.text_buffers.remove(&(mode, id));
        }

        match self.device.create_buffer(bytes, BufferUsage::Dynamic) {
            Ok(buffer) => {
                self.text_buffers.insert((mode, id), TextBuffer { buffer, capacity: glyphs });
                Some(buffer)
            }
            Err(e) => {
                log::warn!("Glyph buffer allocation failed: {}", e);
                None
            }
        }
    }

    /// Free glyph buffers of widgets that are gone, detached or no longer text, in every mode
    fn release_stale_text_buffers(&mut self) {
        let ui = &self.ui;
        let stale: Vec<_> = self
            .text_buffers
            .keys()
            .filter(|(mode, id)| {
                let tree = ui.get(*mode);
                tree.get(*id).and_then(WidgetNode::text).is_none() || tree.layout(*id).is_none()
            })
            .copied()
            .collect();
        for key in stale {
            if let Some(text) = self.text_buffers.remove(&key) {
                self.device.delete_buffer(text.buffer);
            }
        }
    }

    fn draw_overlay(&mut self, texture: &str, stats: &mut FrameStats) {
        let full_screen = [0.0, 0.0, 1.0, 1.0];
        if self.draw_textured_quad(full_screen, |cache, device| cache.setup_texture(device, texture, 0)) {
            stats.overlays_drawn += 1;
            stats.draw_calls += 1;
        } else {
            log::debug!("{} overlay '{}' not shown", self.mode, texture);
        }
    }
}

fn create_named_program(
    cache: &mut ResourceCache,
    device: &mut dyn GraphicsDevice,
    loader: &dyn AssetLoader,
    name: &str,
) -> Result<ProgramHandle, ResourceError> {
    cache.create_program(
        device,
        loader,
        name,
        &ShaderNames::vertex_file(name),
        &ShaderNames::fragment_file(name),
    )
}

fn allocate_mirror(device: &mut dyn GraphicsDevice, capacity: usize) -> RenderResult<MirrorBuffer> {
    let buffer = device.create_buffer(&vec![0u8; capacity * PARTICLE_STRIDE], BufferUsage::Dynamic)?;
    Ok(MirrorBuffer { buffer, uploaded: 0 })
}

/// Copy the live prefix of a spawner's mirror into its buffer
fn mirror_to_gpu(device: &mut dyn GraphicsDevice, spawner: &ParticleSpawner, gpu: &mut MirrorBuffer) {
    let mirror = spawner.gpu_mirror();
    gpu.uploaded = 0;
    if mirror.is_empty() {
        return;
    }
    match device.update_buffer(gpu.buffer, 0, bytemuck::cast_slice(mirror)) {
        Ok(()) => gpu.uploaded = mirror.len() as u32,
        Err(e) => log::warn!("Particle upload failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{FontMetrics, FontSource, ImageData, MemoryAssetLoader, MeshData};
    use crate::render::device::{DeviceCommand, RecordingDevice};
    use crate::render::resources::GlyphMetrics;
    use crate::render::RenderError;
    use crate::ui::{TextContent, WidgetBuilder};
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    const SKY_FACES: [&str; 6] = ["Sky.png"; 6];

    fn quad_mesh(texture: Option<&str>) -> MeshData {
        let (vertices, indices) = unit_quad();
        MeshData::single(vertices.to_vec(), indices.to_vec(), texture.map(str::to_string))
    }

    fn font_source() -> FontSource {
        let mut characters = BTreeMap::new();
        characters.insert(
            'A',
            GlyphMetrics {
                size: (20, 30),
                bearing: (1, 28),
                advance: 24,
            },
        );
        FontSource {
            atlas: ImageData::solid_color(10, 9, [255; 4]),
            metrics: FontMetrics { glyph_size: 48, characters },
        }
    }

    fn loader() -> MemoryAssetLoader {
        let white = ImageData::solid_color(2, 2, [255; 4]);
        MemoryAssetLoader::new()
            .with_program("scene")
            .with_program("skybox")
            .with_program("ui")
            .with_program("text")
            .with_program("particle")
            .with_mesh("Grass.obj", quad_mesh(Some("Grass.png")))
            .with_mesh("SpriteHolder.obj", quad_mesh(None))
            .with_image("Grass.png", white.clone())
            .with_image("Spark.png", white.clone())
            .with_image("Badge.png", white.clone())
            .with_image("Fade.png", white.clone())
            .with_image("Trainer.png", ImageData::solid_color(8, 4, [255; 4]))
            .with_image("Sky.png", white)
            .with_font("pokefont", font_source())
    }

    fn manager_with(config: EngineConfig, loader: &MemoryAssetLoader) -> RenderManager {
        let mut manager = RenderManager::new(Box::new(RecordingDevice::new()), loader, config).unwrap();
        manager.load_mesh(loader, "Grass.obj", "scene").unwrap();
        manager.load_texture(loader, "Grass.png").unwrap();
        manager
    }

    fn recording(manager: &RenderManager) -> &RecordingDevice {
        manager.device().as_any().downcast_ref::<RecordingDevice>().unwrap()
    }

    fn recording_mut(manager: &mut RenderManager) -> &mut RecordingDevice {
        manager.device_mut().as_any_mut().downcast_mut::<RecordingDevice>().unwrap()
    }

    fn spark_spawner() -> ParticleSpawnerConfig {
        ParticleSpawnerConfig {
            capacity: 8,
            model: ParticleModel {
                mesh: "SpriteHolder.obj".to_string(),
                program: "particle".to_string(),
                texture: "Spark.png".to_string(),
                scale: 0.5,
            },
            seed: Some(7),
            ..ParticleSpawnerConfig::default()
        }
    }

    fn grass() -> RenderableInstance {
        RenderableInstance::new("Grass.obj", "scene")
    }

    #[test]
    fn test_mode_round_trip_restores_map_set() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        let a = manager.create_instance(RenderMode::Map, grass());
        let b = manager.create_instance(RenderMode::Map, grass().with_position(Vec3::new(2.0, 0.0, 0.0)));
        manager.create_instance(RenderMode::Battle, grass());
        let label = manager
            .ui_mut(RenderMode::Map)
            .insert(WidgetBuilder::image("Badge.png").height_percent(0.2))
            .unwrap();
        manager.ui_mut(RenderMode::Map).add_root(label).unwrap();

        let before = manager.draw_frame(&FrameContext::default());

        manager.change_render_mode(RenderMode::Battle);
        let battle = manager.draw_frame(&FrameContext::default());
        assert_eq!(battle.instances_drawn, 1);
        assert_eq!(battle.widgets_drawn + battle.widgets_skipped, 0);

        manager.change_render_mode(RenderMode::Map);
        assert_eq!(manager.instances().handles(RenderMode::Map), &[a, b]);
        let after = manager.draw_frame(&FrameContext::default());
        assert_eq!(after.instances_drawn, 2);
        assert_eq!(after.widgets_drawn, before.widgets_drawn);
        assert_eq!(manager.ui(RenderMode::Map).len(), 1);
    }

    #[test]
    fn test_draw_order() {
        let loader = loader();
        let mut config = EngineConfig::default();
        config.modes.get_mut(RenderMode::Map).overlay_texture = Some("Fade.png".to_string());
        let mut manager = manager_with(config, &loader);

        manager.create_program(&loader, "particle").unwrap();
        manager.load_mesh(&loader, "SpriteHolder.obj", "particle").unwrap();
        manager.load_texture(&loader, "Spark.png").unwrap();
        manager.load_texture(&loader, "Badge.png").unwrap();
        manager.load_texture(&loader, "Fade.png").unwrap();
        manager.load_cubemap(&loader, "Sky", SKY_FACES).unwrap();
        manager.set_skybox(Some("Sky"));

        manager.create_instance(RenderMode::Map, grass());
        let sparks = manager.add_spawner(spark_spawner()).unwrap();
        manager.spawner_mut(sparks).unwrap().spawn_burst(3, None);
        manager.update(0.016, Vec3::zeros());
        let badge = manager
            .ui_mut(RenderMode::Map)
            .insert(WidgetBuilder::image("Badge.png").height_percent(0.2))
            .unwrap();
        manager.ui_mut(RenderMode::Map).add_root(badge).unwrap();

        let mesh_vao = manager.cache().find_mesh("Grass.obj", "scene").unwrap().sub_meshes[0].vao;
        recording_mut(&mut manager).clear_commands();
        let stats = manager.draw_frame(&FrameContext::default());

        let draws: Vec<DeviceCommand> = recording(&manager).draw_calls().cloned().collect();
        assert_eq!(draws.len(), 5);
        assert!(matches!(draws[0], DeviceCommand::DrawIndexed { vao, .. } if vao == mesh_vao));
        assert!(matches!(draws[1], DeviceCommand::DrawArrays { vertex_count: 36, .. }));
        assert!(matches!(draws[2], DeviceCommand::DrawIndexedInstanced { instance_count: 3, .. }));
        assert!(matches!(draws[3], DeviceCommand::DrawIndexed { vao, .. } if vao != mesh_vao));
        assert!(matches!(draws[4], DeviceCommand::DrawIndexed { vao, .. } if vao != mesh_vao));

        let commands = recording(&manager).commands();
        let position = |wanted: &DeviceCommand| commands.iter().position(|c| c == wanted).unwrap();
        let relaxed = position(&DeviceCommand::DepthFunc(DepthFunc::LessEqual));
        let strict = position(&DeviceCommand::DepthFunc(DepthFunc::Less));
        let skybox = commands
            .iter()
            .position(|c| matches!(c, DeviceCommand::DrawArrays { .. }))
            .unwrap();
        assert!(relaxed < skybox && skybox < strict);

        assert_eq!(stats.instances_drawn, 1);
        assert!(stats.skybox_drawn);
        assert_eq!(stats.particles_drawn, 3);
        assert_eq!(stats.widgets_drawn, 1);
        assert_eq!(stats.overlays_drawn, 1);
        assert_eq!(stats.draw_calls, 5);
    }

    #[test]
    fn test_skybox_view_has_no_translation() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        manager.load_cubemap(&loader, "Sky", SKY_FACES).unwrap();
        manager.set_skybox(Some("Sky"));

        let frame = FrameContext {
            view: Mat4::new_translation(&Vec3::new(5.0, -2.0, 9.0)),
            ..FrameContext::default()
        };
        manager.draw_frame(&frame);

        let views: Vec<_> = recording(&manager).uniform_values("view").cloned().collect();
        assert_eq!(views, vec![UniformValue::Mat4(strip_translation(&frame.view))]);
    }

    #[test]
    fn test_missing_resources_skip_only_that_item() {
        let loader = loader();
        let mut config = EngineConfig::default();
        config.modes.get_mut(RenderMode::Map).overlay_texture = Some("Missing.png".to_string());
        let mut manager = manager_with(config, &loader);

        manager.create_instance(RenderMode::Map, RenderableInstance::new("Boulder.obj", "scene"));
        manager.create_instance(RenderMode::Map, grass());
        manager.set_skybox(Some("NotLoaded"));
        let broken = manager
            .ui_mut(RenderMode::Map)
            .insert(WidgetBuilder::image("Missing.png").height_percent(0.3))
            .unwrap();
        manager.ui_mut(RenderMode::Map).add_root(broken).unwrap();

        let stats = manager.draw_frame(&FrameContext::default());
        assert_eq!(stats.instances_skipped, 1);
        assert_eq!(stats.instances_drawn, 1);
        assert!(!stats.skybox_drawn);
        assert_eq!(stats.widgets_skipped, 1);
        assert_eq!(stats.overlays_drawn, 0);
        assert_eq!(recording(&manager).draw_calls().count(), 1);
    }

    #[test]
    fn test_update_uploads_live_prefix() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        let sparks = manager.add_spawner(spark_spawner()).unwrap();
        manager.spawner_mut(sparks).unwrap().spawn_burst(3, None);

        manager.update(0.016, Vec3::zeros());

        let uploads: Vec<_> = recording(&manager)
            .commands()
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::UpdateBuffer { buffer, byte_offset, len } => Some((*buffer, *byte_offset, *len)),
                _ => None,
            })
            .collect();
        assert_eq!(uploads.len(), 1);
        let (buffer, offset, len) = uploads[0];
        assert_eq!((offset, len), (0, 3 * PARTICLE_STRIDE));

        let contents = recording(&manager).buffer_contents(buffer).unwrap();
        let mirror: &[u8] = bytemuck::cast_slice(manager.spawner(sparks).unwrap().gpu_mirror());
        assert_eq!(&contents[..len], mirror);
    }

    #[test]
    fn test_empty_spawner_is_not_uploaded_or_drawn() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        manager.create_program(&loader, "particle").unwrap();
        manager.load_mesh(&loader, "SpriteHolder.obj", "particle").unwrap();
        manager.load_texture(&loader, "Spark.png").unwrap();
        manager.add_spawner(spark_spawner()).unwrap();

        manager.update(0.016, Vec3::zeros());
        let stats = manager.draw_frame(&FrameContext::default());
        assert_eq!(stats.particle_systems_drawn, 0);
        assert!(!recording(&manager)
            .commands()
            .iter()
            .any(|c| matches!(c, DeviceCommand::UpdateBuffer { .. })));
    }

    #[test]
    fn test_text_widget_draws_one_instanced_call() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        manager.load_font(&loader, "pokefont", 48).unwrap();
        let label = manager
            .ui_mut(RenderMode::Map)
            .insert(
                WidgetBuilder::text(TextContent::new("pokefont", "AA"))
                    .height_percent(0.1)
                    .aspect_ratio(0.1),
            )
            .unwrap();
        manager.ui_mut(RenderMode::Map).add_root(label).unwrap();

        let stats = manager.draw_frame(&FrameContext::default());
        assert_eq!(stats.glyphs_drawn, 2);
        assert_eq!(stats.widgets_drawn, 1);

        let instanced: Vec<_> = recording(&manager)
            .draw_calls()
            .filter_map(|c| match c {
                DeviceCommand::DrawIndexedInstanced { instance_count, .. } => Some(*instance_count),
                _ => None,
            })
            .collect();
        assert_eq!(instanced, vec![2]);
    }

    #[test]
    fn test_removed_text_widget_frees_its_buffer() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        manager.load_font(&loader, "pokefont", 48).unwrap();
        let label = manager
            .ui_mut(RenderMode::Map)
            .insert(WidgetBuilder::text(TextContent::new("pokefont", "A")).aspect_ratio(0.1))
            .unwrap();
        manager.ui_mut(RenderMode::Map).add_root(label).unwrap();
        manager.draw_frame(&FrameContext::default());
        let live = recording(&manager).live_objects();

        manager.ui_mut(RenderMode::Map).remove(label).unwrap();
        manager.draw_frame(&FrameContext::default());
        assert_eq!(recording(&manager).live_objects(), live - 1);
    }

    #[test]
    fn test_detached_text_widget_frees_its_buffer() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        manager.load_font(&loader, "pokefont", 48).unwrap();
        let label = manager
            .ui_mut(RenderMode::Map)
            .insert(WidgetBuilder::text(TextContent::new("pokefont", "A")).aspect_ratio(0.1))
            .unwrap();
        manager.ui_mut(RenderMode::Map).add_root(label).unwrap();
        manager.draw_frame(&FrameContext::default());
        let live = recording(&manager).live_objects();

        manager.ui_mut(RenderMode::Map).detach(label).unwrap();
        manager.draw_frame(&FrameContext::default());
        assert_eq!(recording(&manager).live_objects(), live - 1);
        assert!(manager.ui(RenderMode::Map).get(label).is_some());
    }

    #[test]
    fn test_text_removed_from_inactive_mode_is_freed() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        manager.load_font(&loader, "pokefont", 48).unwrap();
        let label = manager
            .ui_mut(RenderMode::Map)
            .insert(WidgetBuilder::text(TextContent::new("pokefont", "A")).aspect_ratio(0.1))
            .unwrap();
        manager.ui_mut(RenderMode::Map).add_root(label).unwrap();
        manager.draw_frame(&FrameContext::default());
        let live = recording(&manager).live_objects();

        manager.change_render_mode(RenderMode::Battle);
        manager.ui_mut(RenderMode::Map).remove(label).unwrap();
        manager.draw_frame(&FrameContext::default());
        assert_eq!(recording(&manager).live_objects(), live - 1);
    }

    #[test]
    fn test_sprite_widget_pushes_sprite_rect() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        let sheet = manager.load_sprite_sheet(&loader, "Trainer.png", 4, 2, true).unwrap();
        let trainer = manager
            .ui_mut(RenderMode::Map)
            .insert(WidgetBuilder::sprite("Trainer.png", 5).height_percent(0.25))
            .unwrap();
        manager.ui_mut(RenderMode::Map).add_root(trainer).unwrap();

        let stats = manager.draw_frame(&FrameContext::default());
        assert_eq!(stats.widgets_drawn, 1);

        let device = recording(&manager);
        let offsets: Vec<_> = device.uniform_values("spriteOffset").cloned().collect();
        assert_eq!(offsets.last(), Some(&UniformValue::Vec2(Vec2::new(0.25, 0.5))));
        let scales: Vec<_> = device.uniform_values("spriteScale").cloned().collect();
        assert_eq!(scales.last(), Some(&UniformValue::Vec2(Vec2::new(0.25, 0.5))));
        assert_eq!(device.uniform_values("isSymmetrical").last(), Some(&UniformValue::Bool(true)));
        assert!(device.commands().contains(&DeviceCommand::BindTexture {
            unit: 0,
            target: TextureTarget::Texture2D,
            texture: sheet,
        }));
    }

    #[test]
    fn test_instanced_instance_binds_offsets() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        let offsets = manager
            .device_mut()
            .create_buffer(bytemuck::cast_slice(&[0.0f32; 16]), BufferUsage::Static)
            .unwrap();
        manager.create_instance(RenderMode::Map, grass().with_instancing(offsets, 4));
        manager.create_instance(RenderMode::Map, grass());

        let stats = manager.draw_frame(&FrameContext::default());
        assert_eq!(stats.instances_drawn, 2);

        let zero_offsets = manager.zero_offsets;
        let sequence: Vec<_> = recording(&manager)
            .commands()
            .iter()
            .filter(|c| c.is_draw() || matches!(c, DeviceCommand::BindInstanceOffsets(_)))
            .cloned()
            .collect();
        assert_eq!(sequence.len(), 4);
        assert_eq!(sequence[0], DeviceCommand::BindInstanceOffsets(offsets));
        assert!(matches!(sequence[1], DeviceCommand::DrawIndexedInstanced { instance_count: 4, .. }));
        assert_eq!(sequence[2], DeviceCommand::BindInstanceOffsets(zero_offsets));
        assert!(matches!(sequence[3], DeviceCommand::DrawIndexed { .. }));
    }

    #[test]
    fn test_whole_color_and_texture_override_uniforms() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        let badge = manager.load_texture(&loader, "Badge.png").unwrap();
        let grass_texture = manager.cache().find_texture("Grass.png").unwrap().handle;
        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        manager.create_instance(RenderMode::Map, grass().with_whole_color(red).with_texture("Badge.png"));

        manager.draw_frame(&FrameContext::default());
        let device = recording(&manager);
        let flags: Vec<_> = device.uniform_values("useWholeColor").cloned().collect();
        assert_eq!(flags, vec![UniformValue::Bool(true)]);
        let colors: Vec<_> = device.uniform_values("wholeColor").cloned().collect();
        assert_eq!(colors, vec![UniformValue::Vec4(red)]);

        let bound: Vec<_> = device
            .commands()
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::BindTexture { texture, .. } => Some(*texture),
                _ => None,
            })
            .collect();
        assert_eq!(bound, vec![badge]);
        assert!(!bound.contains(&grass_texture));
    }

    #[test]
    fn test_plain_instance_turns_whole_color_off() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        manager.create_instance(RenderMode::Map, grass());

        manager.draw_frame(&FrameContext::default());
        let device = recording(&manager);
        let flags: Vec<_> = device.uniform_values("useWholeColor").cloned().collect();
        assert_eq!(flags, vec![UniformValue::Bool(false)]);
        assert_eq!(device.uniform_values("wholeColor").count(), 0);
    }

    #[test]
    fn test_show_and_hide_instance_per_mode() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        let bush = manager.create_instance(RenderMode::Map, grass());

        assert!(manager.show_instance(RenderMode::Battle, bush));
        manager.change_render_mode(RenderMode::Battle);
        assert_eq!(manager.draw_frame(&FrameContext::default()).instances_drawn, 1);

        manager.hide_instance(RenderMode::Battle, bush);
        assert_eq!(manager.draw_frame(&FrameContext::default()).instances_drawn, 0);

        manager.change_render_mode(RenderMode::Map);
        assert_eq!(manager.draw_frame(&FrameContext::default()).instances_drawn, 1);

        manager.remove_instance(bush).unwrap();
        assert!(!manager.show_instance(RenderMode::Battle, bush));
        assert_eq!(manager.draw_frame(&FrameContext::default()).instances_drawn, 0);
    }

    #[test]
    fn test_sprite_instance_draws_sheet_cell() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        manager.load_mesh(&loader, "SpriteHolder.obj", "scene").unwrap();
        let sheet = manager.load_sprite_sheet(&loader, "Trainer.png", 4, 2, false).unwrap();
        let trainer = manager.create_instance(
            RenderMode::Map,
            RenderableInstance::new("SpriteHolder.obj", "scene").with_sprite("Trainer.png", 5),
        );
        manager.create_instance(
            RenderMode::Map,
            RenderableInstance::new("SpriteHolder.obj", "scene").with_sprite("Rival.png", 0),
        );

        let stats = manager.draw_frame(&FrameContext::default());
        assert_eq!(stats.instances_drawn, 1);
        assert_eq!(stats.instances_skipped, 1);
        {
            let device = recording(&manager);
            let offsets: Vec<_> = device.uniform_values("spriteOffset").cloned().collect();
            assert_eq!(offsets, vec![UniformValue::Vec2(Vec2::new(0.25, 0.5))]);
            assert!(device.commands().contains(&DeviceCommand::BindTexture {
                unit: 0,
                target: TextureTarget::Texture2D,
                texture: sheet,
            }));
            assert_eq!(device.draw_calls().count(), 1);
        }

        assert!(manager.instance_mut(trainer).unwrap().set_sprite_id(8));
        recording_mut(&mut manager).clear_commands();
        let stats = manager.draw_frame(&FrameContext::default());
        assert_eq!(stats.instances_skipped, 2);
    }

    #[test]
    fn test_animated_instance_pushes_scrolled_offset() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        let ocean = manager.create_instance(RenderMode::Map, grass().with_texture_scroll(Vec2::new(0.1, 0.0)));
        manager.create_instance(RenderMode::Map, grass());

        manager.update(0.5, Vec3::zeros());
        manager.update(0.5, Vec3::zeros());
        manager.draw_frame(&FrameContext::default());

        let device = recording(&manager);
        let offsets: Vec<_> = device.uniform_values("textureOffset").cloned().collect();
        assert_eq!(offsets.len(), 2);
        let UniformValue::Vec2(scrolled) = offsets[0] else {
            panic!("textureOffset is not a vec2");
        };
        assert_relative_eq!(scrolled.x, 0.1, epsilon = 1e-6);
        assert_eq!(offsets[1], UniformValue::Vec2(Vec2::zeros()));
        let timers: Vec<_> = device.uniform_values("animationTimer").cloned().collect();
        assert_eq!(timers, vec![UniformValue::Float(1.0)]);

        let InstanceMaterial::Animated(scroll) = &manager.instances().get(ocean).unwrap().material else {
            panic!("ocean lost its scroll");
        };
        assert_relative_eq!(scroll.timer, 1.0);
    }

    #[test]
    fn test_overlay_with_missing_texture_is_not_shown() {
        let loader = loader();
        let mut config = EngineConfig::default();
        config.modes.get_mut(RenderMode::Battle).overlay_texture = Some("BattleIntro.png".to_string());
        let mut manager = manager_with(config, &loader);
        manager.change_render_mode(RenderMode::Battle);

        let stats = manager.draw_frame(&FrameContext::default());
        assert_eq!(stats.overlays_drawn, 0);
        assert_eq!(recording(&manager).draw_calls().count(), 0);
    }

    #[test]
    fn test_weather_buffer_follows_spawner() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        let live = recording(&manager).live_objects();

        manager.set_weather(Weather::Snow).unwrap();
        assert_eq!(recording(&manager).live_objects(), live + 1);
        manager.update(0.06, Vec3::new(4.0, 0.0, 4.0));
        assert_eq!(manager.environment().weather_spawner().unwrap().live_count(), 1);

        manager.set_weather(Weather::Hail).unwrap();
        assert_eq!(recording(&manager).live_objects(), live + 1);

        manager.set_weather(Weather::None).unwrap();
        assert_eq!(recording(&manager).live_objects(), live);
        assert_relative_eq!(manager.environment().fog().density, 0.0);
    }

    #[test]
    fn test_failed_weather_allocation_keeps_weather() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        let live = recording(&manager).live_objects();

        recording_mut(&mut manager).refuse_buffers(true);
        assert!(manager.set_weather(Weather::Snow).is_err());
        assert_eq!(manager.environment().weather(), Weather::None);
        assert!(manager.environment().weather_spawner().is_none());
        assert_eq!(recording(&manager).live_objects(), live);

        recording_mut(&mut manager).refuse_buffers(false);
        manager.set_weather(Weather::Snow).unwrap();
        assert_eq!(manager.environment().weather(), Weather::Snow);
        assert_eq!(recording(&manager).live_objects(), live + 1);
    }

    #[test]
    fn test_fog_uniforms_follow_weather() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        manager.create_instance(RenderMode::Map, grass());
        manager.set_weather(Weather::Snow).unwrap();

        manager.draw_frame(&FrameContext::default());
        let density: Vec<_> = recording(&manager).uniform_values("fogDensity").cloned().collect();
        assert_eq!(density, vec![UniformValue::Float(0.057)]);
    }

    #[test]
    fn test_lights_are_pushed_per_index() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        manager.create_instance(RenderMode::Map, grass());
        let frame = FrameContext {
            lights: vec![
                Light::directional(Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 1.0)),
                Light::point(Vec3::new(0.0, 3.0, 0.0), Vec3::new(1.0, 0.5, 0.2)),
            ],
            ..FrameContext::default()
        };

        manager.draw_frame(&frame);
        let device = recording(&manager);
        assert_eq!(device.uniform_values("numLights").cloned().collect::<Vec<_>>(), vec![UniformValue::Int(2)]);
        assert_eq!(device.uniform_values("lights[1].diffuse").count(), 1);
    }

    #[test]
    fn test_resize_relayouts_ui() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        let panel = manager
            .ui_mut(RenderMode::Menu)
            .insert(WidgetBuilder::container().height_percent(0.5))
            .unwrap();
        manager.ui_mut(RenderMode::Menu).add_root(panel).unwrap();

        manager.resize(800, 400);
        manager.resize(0, 100);
        manager.change_render_mode(RenderMode::Menu);
        manager.draw_frame(&FrameContext::default());

        let layout = manager.ui(RenderMode::Menu).layout(panel).unwrap();
        assert_relative_eq!(layout.height, 200.0);
        assert_eq!(manager.config().viewport.width, 800);
    }

    #[test]
    fn test_new_rejects_bad_setup() {
        let loader = loader();
        let config = EngineConfig::default().with_viewport(0, 640);
        let result = RenderManager::new(Box::new(RecordingDevice::new()), &loader, config);
        assert!(matches!(result, Err(RenderError::Config(_))));

        let no_text = MemoryAssetLoader::new()
            .with_program("scene")
            .with_program("skybox")
            .with_program("ui");
        let result = RenderManager::new(Box::new(RecordingDevice::new()), &no_text, EngineConfig::default());
        assert!(matches!(result, Err(RenderError::Resource(_))));
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let loader = loader();
        let mut manager = manager_with(EngineConfig::default(), &loader);
        manager.load_font(&loader, "pokefont", 48).unwrap();
        manager.add_spawner(spark_spawner()).unwrap();
        manager.set_weather(Weather::Snow).unwrap();
        let label = manager
            .ui_mut(RenderMode::Map)
            .insert(WidgetBuilder::text(TextContent::new("pokefont", "A")).aspect_ratio(0.1))
            .unwrap();
        manager.ui_mut(RenderMode::Map).add_root(label).unwrap();
        manager.draw_frame(&FrameContext::default());

        manager.shutdown();
        assert_eq!(recording(&manager).live_objects(), 0);
        assert!(manager.cache().is_empty());
    }
}
