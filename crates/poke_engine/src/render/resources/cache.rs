use crate::assets::{AssetLoader, ImageData, MeshData};
use crate::render::device::{
    GraphicsDevice, ProgramHandle, TextureHandle, TextureTarget, UniformValue, VertexArrayHandle,
};
use crate::render::primitives::VertexLayout;
use crate::render::resources::{
    FontData, MeshDrawDescriptor, ResourceError, ResourceKind, ShaderProgram, SpriteSheet, SubMesh, Texture,
};
use std::collections::HashMap;

/// Sampler uniform every textured program reads unit 0 from
pub const TEXTURE_SAMPLER_UNIFORM: &str = "texture_00";

/// Name-keyed GPU resource store
///
/// Owns every program, mesh, texture, sprite sheet, cubemap and font the
/// render manager draws with. Nothing is evicted before [`shutdown`](Self::shutdown).
#[derive(Debug, Default)]
pub struct ResourceCache {
    programs: HashMap<String, ShaderProgram>,
    textures: HashMap<String, Texture>,
    sprite_sheets: HashMap<String, SpriteSheet>,
    cubemaps: HashMap<String, Texture>,
    fonts: HashMap<String, FontData>,
    current_program: Option<String>,
}

impl ResourceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    // Programs

    /// Compile and link a program from a vertex/fragment source pair
    ///
    /// Returns the existing handle if `name` was already created.
    pub fn create_program(
        &mut self,
        device: &mut dyn GraphicsDevice,
        loader: &dyn AssetLoader,
        name: &str,
        vertex_file: &str,
        fragment_file: &str,
    ) -> Result<ProgramHandle, ResourceError> {
        if let Some(program) = self.programs.get(name) {
            return Ok(program.handle);
        }

        let vertex_src = loader.load_shader_source(vertex_file)?;
        let fragment_src = loader.load_shader_source(fragment_file)?;

        let handle = device.create_program(&vertex_src, &fragment_src).map_err(|e| {
            log::warn!("Program '{}' failed to build: {}", name, e);
            ResourceError::from(e)
        })?;

        log::info!("Created program '{}' from {} + {}", name, vertex_file, fragment_file);
        self.programs.insert(name.to_string(), ShaderProgram::new(handle));
        Ok(handle)
    }

    /// Make a program current for subsequent [`set_uniform`](Self::set_uniform) calls
    pub fn use_program(&mut self, device: &mut dyn GraphicsDevice, name: &str) -> Result<(), ResourceError> {
        let program = self
            .programs
            .get(name)
            .ok_or_else(|| ResourceError::not_found(ResourceKind::Program, name))?;

        device.use_program(program.handle);
        self.current_program = Some(name.to_string());
        Ok(())
    }

    /// Name of the current program
    pub fn current_program(&self) -> Option<&str> {
        self.current_program.as_deref()
    }

    /// Look up a program
    pub fn find_program(&self, name: &str) -> Option<&ShaderProgram> {
        self.programs.get(name)
    }

    /// Set a uniform on the current program
    ///
    /// The location is queried from the device once per program and uniform
    /// name, then served from the cache. Returns `false` when no program is
    /// current or the uniform is inactive.
    pub fn set_uniform(&mut self, device: &mut dyn GraphicsDevice, name: &str, value: UniformValue) -> bool {
        let Some(current) = self.current_program.as_deref() else {
            return false;
        };
        let Some(program) = self.programs.get_mut(current) else {
            return false;
        };

        let location = match program.uniform_locations.get(name) {
            Some(location) => *location,
            None => {
                let location = device.uniform_location(program.handle, name);
                if location.is_none() {
                    log::debug!("Uniform '{}' is inactive in program '{}'", name, current);
                }
                program.uniform_locations.insert(name.to_string(), location);
                location
            }
        };

        match location {
            Some(location) => {
                device.set_uniform(location, &value);
                true
            }
            None => false,
        }
    }

    // Meshes

    /// Upload a mesh for a program
    ///
    /// Meshes are cached per program because the vertex attribute binding
    /// depends on it. The program must already exist.
    pub fn load_mesh(
        &mut self,
        device: &mut dyn GraphicsDevice,
        loader: &dyn AssetLoader,
        file: &str,
        program: &str,
    ) -> Result<&MeshDrawDescriptor, ResourceError> {
        let shader = self
            .programs
            .get_mut(program)
            .ok_or_else(|| ResourceError::not_found(ResourceKind::Program, program))?;

        if !shader.meshes.contains_key(file) {
            let data = loader.load_mesh(file)?;
            let descriptor = upload_mesh(device, shader.handle, file, &data)?;
            log::info!(
                "Loaded mesh '{}' for '{}' ({} sub-meshes)",
                file,
                program,
                descriptor.sub_meshes.len()
            );
            shader.meshes.insert(file.to_string(), descriptor);
        }

        shader
            .meshes
            .get(file)
            .ok_or_else(|| ResourceError::not_found(ResourceKind::Mesh, file))
    }

    /// Look up a mesh loaded for a program
    pub fn find_mesh(&self, file: &str, program: &str) -> Option<&MeshDrawDescriptor> {
        self.programs.get(program)?.meshes.get(file)
    }

    // Textures

    /// Upload a 2D texture
    pub fn load_texture(
        &mut self,
        device: &mut dyn GraphicsDevice,
        loader: &dyn AssetLoader,
        file: &str,
    ) -> Result<TextureHandle, ResourceError> {
        if let Some(texture) = self.textures.get(file) {
            return Ok(texture.handle);
        }

        let image = loader.load_image(file)?;
        let texture = upload_texture(device, file, &image)?;
        log::info!("Loaded texture '{}' ({}x{})", file, texture.width, texture.height);
        self.textures.insert(file.to_string(), texture);
        Ok(texture.handle)
    }

    /// Look up a 2D texture
    pub fn find_texture(&self, file: &str) -> Option<&Texture> {
        self.textures.get(file)
    }

    /// Upload a sprite sheet of `cols` x `rows` equally sized sprites
    pub fn load_sprite_sheet(
        &mut self,
        device: &mut dyn GraphicsDevice,
        loader: &dyn AssetLoader,
        file: &str,
        cols: u32,
        rows: u32,
        symmetrical: bool,
    ) -> Result<TextureHandle, ResourceError> {
        if let Some(sheet) = self.sprite_sheets.get(file) {
            return Ok(sheet.texture.handle);
        }
        if cols == 0 || rows == 0 {
            return Err(ResourceError::LoadFailed {
                name: file.to_string(),
                reason: format!("sprite grid {cols}x{rows} is empty"),
            });
        }

        let image = loader.load_image(file)?;
        let texture = upload_texture(device, file, &image)?;
        log::info!("Loaded sprite sheet '{}' ({}x{} sprites)", file, cols, rows);
        self.sprite_sheets.insert(
            file.to_string(),
            SpriteSheet {
                texture,
                cols,
                rows,
                symmetrical,
            },
        );
        Ok(texture.handle)
    }

    /// Look up a sprite sheet
    pub fn find_sprite_sheet(&self, file: &str) -> Option<&SpriteSheet> {
        self.sprite_sheets.get(file)
    }

    /// Upload a cubemap from six faces (+X, -X, +Y, -Y, +Z, -Z)
    pub fn load_cubemap(
        &mut self,
        device: &mut dyn GraphicsDevice,
        loader: &dyn AssetLoader,
        name: &str,
        faces: [&str; 6],
    ) -> Result<TextureHandle, ResourceError> {
        if let Some(cubemap) = self.cubemaps.get(name) {
            return Ok(cubemap.handle);
        }

        let mut images = Vec::with_capacity(6);
        for face in faces {
            images.push(loader.load_image(face)?);
        }
        let first = &images[0];
        if images.iter().any(|image| image.width != first.width || image.height != first.height) {
            return Err(ResourceError::LoadFailed {
                name: name.to_string(),
                reason: "cubemap faces differ in size".to_string(),
            });
        }
        let (width, height) = (first.width, first.height);

        let images: [ImageData; 6] = images.try_into().map_err(|_| ResourceError::LoadFailed {
            name: name.to_string(),
            reason: "cubemap needs six faces".to_string(),
        })?;
        let handle = device.create_cubemap(&images)?;

        log::info!("Loaded cubemap '{}' ({}x{} faces)", name, width, height);
        self.cubemaps.insert(
            name.to_string(),
            Texture {
                handle,
                target: TextureTarget::CubeMap,
                width,
                height,
            },
        );
        Ok(handle)
    }

    /// Look up a cubemap
    pub fn find_cubemap(&self, name: &str) -> Option<&Texture> {
        self.cubemaps.get(name)
    }

    // Fonts

    /// Upload a font atlas rendered at `glyph_size`
    ///
    /// Fonts are keyed by name; loading a name again returns the cached font
    /// whatever size it was loaded at.
    pub fn load_font(
        &mut self,
        device: &mut dyn GraphicsDevice,
        loader: &dyn AssetLoader,
        name: &str,
        glyph_size: u32,
    ) -> Result<&FontData, ResourceError> {
        if !self.fonts.contains_key(name) {
            if glyph_size == 0 {
                return Err(ResourceError::LoadFailed {
                    name: name.to_string(),
                    reason: "glyph size must be positive".to_string(),
                });
            }

            let source = loader.load_font(name, glyph_size)?;
            let texture = upload_texture(device, name, &source.atlas)?;
            log::info!(
                "Loaded font '{}' at {}px ({} characters)",
                name,
                glyph_size,
                source.metrics.characters.len()
            );
            self.fonts.insert(
                name.to_string(),
                FontData {
                    glyph_size,
                    texture: texture.handle,
                    characters: source.metrics.characters.into_iter().collect(),
                },
            );
        }

        self.fonts
            .get(name)
            .ok_or_else(|| ResourceError::not_found(ResourceKind::Font, name))
    }

    /// Look up a font
    pub fn find_font(&self, name: &str) -> Option<&FontData> {
        self.fonts.get(name)
    }

    /// All cached fonts, by name
    pub fn fonts(&self) -> &HashMap<String, FontData> {
        &self.fonts
    }

    // Binding helpers

    /// Bind a 2D texture to `unit` and point the sampler of the current program at it
    pub fn setup_texture(&mut self, device: &mut dyn GraphicsDevice, name: &str, unit: u32) -> bool {
        let Some(texture) = self.textures.get(name).copied() else {
            log::debug!("Texture '{}' not loaded", name);
            return false;
        };

        device.bind_texture(unit, TextureTarget::Texture2D, texture.handle);
        self.set_uniform(device, TEXTURE_SAMPLER_UNIFORM, UniformValue::Int(unit as i32));
        true
    }

    /// Bind a sprite sheet and select one sprite on the current program
    pub fn setup_sprite_sheet(
        &mut self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        sprite_id: u32,
        unit: u32,
    ) -> bool {
        let Some(sheet) = self.sprite_sheets.get(name).copied() else {
            log::debug!("Sprite sheet '{}' not loaded", name);
            return false;
        };
        let Some((offset, scale)) = sheet.sprite_rect(sprite_id) else {
            log::debug!("Sprite {} is outside sheet '{}'", sprite_id, name);
            return false;
        };

        device.bind_texture(unit, TextureTarget::Texture2D, sheet.texture.handle);
        self.set_uniform(device, TEXTURE_SAMPLER_UNIFORM, UniformValue::Int(unit as i32));
        self.set_uniform(device, "spriteOffset", UniformValue::Vec2(offset));
        self.set_uniform(device, "spriteScale", UniformValue::Vec2(scale));
        self.set_uniform(device, "isSymmetrical", UniformValue::Bool(sheet.symmetrical));
        true
    }

    /// Bind a cubemap to `unit` and point the `skybox` sampler at it
    pub fn setup_cubemap(&mut self, device: &mut dyn GraphicsDevice, name: &str, unit: u32) -> bool {
        let Some(cubemap) = self.cubemaps.get(name).copied() else {
            log::debug!("Cubemap '{}' not loaded", name);
            return false;
        };

        device.bind_texture(unit, TextureTarget::CubeMap, cubemap.handle);
        self.set_uniform(device, "skybox", UniformValue::Int(unit as i32));
        true
    }

    /// Delete every GPU object and forget all entries
    pub fn shutdown(&mut self, device: &mut dyn GraphicsDevice) {
        for (_, program) in self.programs.drain() {
            for mesh in program.meshes.values() {
                for sub in &mesh.sub_meshes {
                    device.delete_vertex_array(sub.vao);
                }
            }
            device.delete_program(program.handle);
        }

        let textures = self
            .textures
            .drain()
            .map(|(_, t)| t.handle)
            .chain(self.sprite_sheets.drain().map(|(_, s)| s.texture.handle))
            .chain(self.cubemaps.drain().map(|(_, c)| c.handle))
            .chain(self.fonts.drain().map(|(_, f)| f.texture));
        for texture in textures {
            device.delete_texture(texture);
        }

        self.current_program = None;
        log::info!("Resource cache shut down");
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
            && self.textures.is_empty()
            && self.sprite_sheets.is_empty()
            && self.cubemaps.is_empty()
            && self.fonts.is_empty()
    }
}

fn upload_texture(device: &mut dyn GraphicsDevice, name: &str, image: &ImageData) -> Result<Texture, ResourceError> {
    if image.width == 0 || image.height == 0 || image.data.len() != image.expected_len() {
        return Err(ResourceError::LoadFailed {
            name: name.to_string(),
            reason: format!("{}x{} image has {} bytes", image.width, image.height, image.data.len()),
        });
    }

    let handle = device.create_texture_2d(image)?;
    Ok(Texture {
        handle,
        target: TextureTarget::Texture2D,
        width: image.width,
        height: image.height,
    })
}

/// Upload every sub-mesh, releasing the ones already created if a later one fails
fn upload_mesh(
    device: &mut dyn GraphicsDevice,
    program: ProgramHandle,
    file: &str,
    data: &MeshData,
) -> Result<MeshDrawDescriptor, ResourceError> {
    let layout = VertexLayout::standard();
    let mut created: Vec<VertexArrayHandle> = Vec::with_capacity(data.sub_meshes.len());
    let mut sub_meshes = Vec::with_capacity(data.sub_meshes.len());

    for sub in &data.sub_meshes {
        let uploaded = u32::try_from(sub.indices.len())
            .map_err(|_| ResourceError::LoadFailed {
                name: file.to_string(),
                reason: "too many indices".to_string(),
            })
            .and_then(|index_count| {
                device
                    .create_vertex_array(program, &layout, bytemuck::cast_slice(&sub.vertices), &sub.indices)
                    .map(|vao| (vao, index_count))
                    .map_err(ResourceError::from)
            });

        match uploaded {
            Ok((vao, index_count)) => {
                created.push(vao);
                sub_meshes.push(SubMesh {
                    vao,
                    index_count,
                    texture: sub.texture_name.clone(),
                });
            }
            Err(e) => {
                for vao in created {
                    device.delete_vertex_array(vao);
                }
                return Err(e);
            }
        }
    }

    Ok(MeshDrawDescriptor { sub_meshes })
}
