//! Overworld demo
//!
//! Runs the render core headless: a map scene with snowfall and a HUD, a
//! battle scene with a transition overlay, and a short frame loop that
//! switches MAP -> BATTLE -> MAP while logging each frame's statistics.

use nalgebra::Point3;
use poke_engine::assets::{FontMetrics, FontSource};
use poke_engine::prelude::*;
use poke_engine::render::primitives::unit_quad;
use poke_engine::render::GlyphMetrics;
use std::collections::BTreeMap;

const FRAME_COUNT: u32 = 180;
const BATTLE_START: u32 = 60;
const BATTLE_END: u32 = 120;
const DT: f32 = 1.0 / 60.0;

const SKY_FACES: [&str; 6] = [
    "sky_right.png",
    "sky_left.png",
    "sky_top.png",
    "sky_bottom.png",
    "sky_front.png",
    "sky_back.png",
];

fn quad_mesh(texture: &str) -> MeshData {
    let (vertices, indices) = unit_quad();
    MeshData::single(vertices.to_vec(), indices.to_vec(), Some(texture.to_string()))
}

/// Monospace metrics for the printable ASCII range
fn demo_font() -> FontSource {
    let characters: BTreeMap<char, GlyphMetrics> = (' '..='~')
        .map(|ch| {
            let size = if ch == ' ' { (0, 0) } else { (20, 28) };
            (ch, GlyphMetrics { size, bearing: (2, 24), advance: 24 })
        })
        .collect();

    FontSource {
        atlas: ImageData::solid_color(240, 288, [255, 255, 255, 255]),
        metrics: FontMetrics { glyph_size: 32, characters },
    }
}

fn demo_assets() -> MemoryAssetLoader {
    let mut loader = MemoryAssetLoader::new();
    for program in ["scene", "skybox", "ui", "text", "snow"] {
        loader.insert_program(program, &format!("// {program} vertex"), &format!("// {program} fragment"));
    }

    loader.insert_mesh("Grass.obj", quad_mesh("Grass.png"));
    loader.insert_mesh("Arena.obj", quad_mesh("Arena.png"));
    loader.insert_mesh("SpriteHolder.obj", quad_mesh("SnowFlake3.png"));

    let textures = [
        ("Grass.png", [60, 170, 60, 255]),
        ("Ocean.png", [40, 90, 200, 255]),
        ("Arena.png", [200, 180, 120, 255]),
        ("SnowFlake3.png", [250, 250, 255, 255]),
        ("HealthBar.png", [40, 220, 40, 255]),
        ("BattleFlash.png", [255, 255, 255, 128]),
    ];
    for (name, color) in textures {
        loader.insert_image(name, ImageData::solid_color(8, 8, color));
    }
    for face in SKY_FACES {
        loader.insert_image(face, ImageData::solid_color(4, 4, [120, 170, 230, 255]));
    }

    loader.insert_image("Trainer.png", ImageData::solid_color(64, 32, [230, 60, 60, 255]));
    loader.insert_font("pokefont", demo_font());
    loader
}

/// Walk cycle cells on the trainer sheet, four columns by two rows
const WALK_CYCLE: [u32; 4] = [4, 5, 6, 7];

fn build_map_scene(renderer: &mut RenderManager) -> Result<InstanceHandle, RenderError> {
    for x in -2..=2 {
        for z in -2..=2 {
            let tile = RenderableInstance::new("Grass.obj", "scene")
                .with_position(Vec3::new(x as f32 * 2.0, 0.0, z as f32 * 2.0))
                .with_orientation(Vec3::new(-std::f32::consts::FRAC_PI_2, 0.0, 0.0))
                .with_uniform_scale(2.0);
            renderer.create_instance(RenderMode::Map, tile);
        }
    }

    let ocean = RenderableInstance::new("Grass.obj", "scene")
        .with_position(Vec3::new(0.0, -0.1, -8.0))
        .with_orientation(Vec3::new(-std::f32::consts::FRAC_PI_2, 0.0, 0.0))
        .with_uniform_scale(10.0)
        .with_texture("Ocean.png")
        .with_texture_scroll(Vec2::new(0.05, 0.02));
    renderer.create_instance(RenderMode::Map, ocean);

    let trainer = RenderableInstance::new("SpriteHolder.obj", "scene")
        .with_position(Vec3::new(0.0, 0.5, 0.0))
        .with_sprite("Trainer.png", WALK_CYCLE[0]);
    let trainer = renderer.create_instance(RenderMode::Map, trainer);

    let ui = renderer.ui_mut(RenderMode::Map);
    let hud = ui.insert(
        WidgetBuilder::container()
            .height_percent(0.15)
            .aspect_ratio(0.25)
            .anchor(Anchor::TopLeft),
    )?;
    ui.add_root(hud)?;
    let location = ui.insert(
        WidgetBuilder::text(TextContent::new("pokefont", "ROUTE 217").with_width_cutoff(0.9))
            .height_percent(0.5)
            .aspect_ratio(0.125)
            .anchor(Anchor::TopLeft),
    )?;
    ui.attach(hud, location)?;
    Ok(trainer)
}

fn build_battle_scene(renderer: &mut RenderManager) -> Result<(), RenderError> {
    let arena = RenderableInstance::new("Arena.obj", "scene").with_uniform_scale(10.0);
    renderer.create_instance(RenderMode::Battle, arena);

    let marker = RenderableInstance::new("Grass.obj", "scene")
        .with_position(Vec3::new(0.0, 0.5, -3.0))
        .with_whole_color(Vec4::new(0.9, 0.2, 0.2, 1.0));
    renderer.create_instance(RenderMode::Battle, marker);

    let ui = renderer.ui_mut(RenderMode::Battle);
    let health = ui.insert(
        WidgetBuilder::image("HealthBar.png")
            .height_percent(0.04)
            .aspect_ratio(0.1)
            .anchor(Anchor::BottomRight),
    )?;
    ui.add_root(health)?;
    Ok(())
}

fn frame_context(aspect: f32, player: Vec3) -> FrameContext {
    let eye = Point3::from(player + Vec3::new(0.0, 8.0, 10.0));
    let target = Point3::from(player);
    FrameContext {
        view: Mat4::look_at_rh(&eye, &target, &Vec3::y()),
        projection: Mat4::new_perspective(aspect, 45.0_f32.to_radians(), 0.1, 200.0),
        lights: vec![
            Light::directional(Vec3::new(-0.3, -1.0, -0.2), Vec3::new(1.0, 0.97, 0.9)),
            Light::point(player + Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.4, 0.4, 0.5)),
        ],
        player_position: player,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = EngineConfig::default();
    config.modes.get_mut(RenderMode::Battle).overlay_texture = Some("BattleFlash.png".to_string());
    init_logging(&config.logging);

    let assets = demo_assets();
    let aspect = config.viewport.width as f32 / config.viewport.height as f32;
    let mut renderer = RenderManager::new(Box::new(RecordingDevice::new()), &assets, config)?;

    for mesh in ["Grass.obj", "Arena.obj", "SpriteHolder.obj"] {
        renderer.load_mesh(&assets, mesh, "scene")?;
    }
    renderer.create_program(&assets, "snow")?;
    renderer.load_mesh(&assets, "SpriteHolder.obj", "snow")?;
    for texture in ["Grass.png", "Ocean.png", "Arena.png", "SnowFlake3.png", "HealthBar.png", "BattleFlash.png"] {
        renderer.load_texture(&assets, texture)?;
    }
    renderer.load_sprite_sheet(&assets, "Trainer.png", 4, 2, true)?;
    renderer.load_cubemap(&assets, "overworld_sky", SKY_FACES)?;
    renderer.load_font(&assets, "pokefont", 32)?;

    let trainer = build_map_scene(&mut renderer)?;
    build_battle_scene(&mut renderer)?;
    renderer.set_skybox(Some("overworld_sky"));
    renderer.set_weather(Weather::Snow)?;

    let mut player = Vec3::zeros();
    let mut timer = FrameTimer::new();
    for frame in 0..FRAME_COUNT {
        timer.tick();
        match frame {
            BATTLE_START => renderer.change_render_mode(RenderMode::Battle),
            BATTLE_END => renderer.change_render_mode(RenderMode::Map),
            _ => {}
        }

        if renderer.render_mode() == RenderMode::Map {
            player.x += DT;
            if let Some(sprite) = renderer.instance_mut(trainer) {
                sprite.position = player + Vec3::new(0.0, 0.5, 0.0);
                sprite.set_sprite_id(WALK_CYCLE[(frame as usize / 8) % WALK_CYCLE.len()]);
            }
        }
        renderer.update(DT, player);
        let stats = renderer.draw_frame(&frame_context(aspect, player));
        log::info!("[{} {:3}] {}", renderer.render_mode(), frame, stats);
    }

    renderer.set_weather(Weather::None)?;
    renderer.shutdown();
    log::info!(
        "Demo finished: {} frames, {:.1}ms of clamped frame time",
        timer.frame_count(),
        timer.total_time() * 1000.0
    );
    Ok(())
}
