// Demo: a procedurally generated map drawn through the tilemap resolver.
//
//   tilegrid [--config path.json] [--layered] [--headless out.png]
//
// Windowed controls: arrow keys pan, mouse wheel / +/- zoom, Tab switches the
// seam strategy, Escape quits. `--headless` renders once on the CPU instead.
use std::sync::Arc;

use glam::{UVec2, Vec2, Vec4};
use image::{Rgba, RgbaImage};
use log::{error, info};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use tilegrid::raster::{Framebuffer, MapQuad, rasterize};
use tilegrid::renderer::Renderer;
use tilegrid::{
    AtlasLayout, Camera, PlacementMap, RenderResources, Result, Sampler, SeamStrategy, TileAtlas,
    TilegridConfig,
};

const MAP_SIZE: u32 = 64;
const TILE_SIZE: u32 = 16;

// ── Demo content ─────────────────────────────────────────────────────────────

const PALETTE: [[u8; 4]; 6] = [
    [0x3A, 0x7D, 0x44, 0xFF], // grass
    [0x2B, 0x59, 0xC3, 0xFF], // water
    [0xC2, 0xB2, 0x80, 0xFF], // sand
    [0x82, 0x74, 0x66, 0xFF], // stone
    [0x6B, 0x44, 0x23, 0xFF], // dirt
    [0xE0, 0xE0, 0xE8, 0xFF], // snow
];

/// Solid tiles with a darker one-pixel border, so seams are easy to spot.
fn demo_tiles() -> Vec<RgbaImage> {
    PALETTE
        .iter()
        .map(|&fill| {
            let border = [fill[0] / 2, fill[1] / 2, fill[2] / 2, 0xFF];
            RgbaImage::from_fn(TILE_SIZE, TILE_SIZE, |x, y| {
                let edge = x == 0 || y == 0 || x == TILE_SIZE - 1 || y == TILE_SIZE - 1;
                Rgba(if edge { border } else { fill })
            })
        })
        .collect()
}

/// Concentric rings of terrain with a scattering of empty cells.
fn demo_placement(tile_count: u32) -> Result<PlacementMap> {
    let mut map = PlacementMap::new(MAP_SIZE, MAP_SIZE)?;
    let center = Vec2::splat(MAP_SIZE as f32 / 2.0);
    for y in 0..MAP_SIZE {
        for x in 0..MAP_SIZE {
            let d = (Vec2::new(x as f32, y as f32) - center).length();
            let hole = (x * 7 + y * 13) % 29 == 0;
            let id = if hole { 0 } else { (d as u32 / 4) % tile_count + 1 };
            map.set(UVec2::new(x, y), id as u16);
        }
    }
    Ok(map)
}

fn load_atlas(config: &TilegridConfig) -> Result<TileAtlas> {
    match &config.atlas_folder {
        Some(folder) => TileAtlas::load_folder(config.layout, folder),
        None => TileAtlas::from_tiles(config.layout, &demo_tiles()),
    }
}

// ── Headless ─────────────────────────────────────────────────────────────────

fn render_headless(config: &TilegridConfig, out: &str) -> Result<()> {
    let atlas = load_atlas(config)?;
    let placement = demo_placement(atlas.tile_count())?;
    let sampler = Sampler::new(config.sampler);
    let resources = RenderResources::new(&placement, &atlas, &sampler);
    let resolver = config.resolver();
    resolver.check(&resources)?;

    let (w, h) = (config.window.width, config.window.height);
    let mut camera = Camera::new(Vec2::ZERO, 0.75);
    camera.calc_aspect(w, h);

    let mut framebuffer = Framebuffer::new(w, h, Vec4::new(0.1, 0.2, 0.3, 1.0));
    let quad = MapQuad::centered(Vec2::splat(2.0));
    let stats = rasterize(resolver.as_ref(), &resources, &camera, &quad, &mut framebuffer);
    info!("headless: {} fragments written, {} discarded", stats.written, stats.discarded);

    framebuffer.save_png(out)?;
    info!("headless: wrote {out}");
    Ok(())
}

// ── App (winit ApplicationHandler) ──────────────────────────────────────────

struct App {
    config: TilegridConfig,
    camera: Camera,
    renderer: Option<Renderer>,
}

impl App {
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<Renderer> {
        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title(&self.config.window.title)
                        .with_inner_size(winit::dpi::PhysicalSize::new(
                            self.config.window.width,
                            self.config.window.height,
                        )),
                )
                .map_err(|e| tilegrid::TilegridError::Device(e.to_string()))?,
        );

        let atlas = load_atlas(&self.config)?;
        let placement = demo_placement(atlas.tile_count())?;
        let quad = MapQuad::centered(Vec2::splat(2.0));
        let mut renderer =
            pollster::block_on(Renderer::new(window, &self.config, &placement, &atlas, &quad))?;

        let (w, h) = renderer.size();
        self.camera.calc_aspect(w, h);
        renderer.update_camera(&self.camera);
        Ok(renderer)
    }

    fn handle_key(&mut self, code: KeyCode, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else { return };
        let step = self.camera.scale * 0.1;
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::ArrowLeft => self.camera.pan(Vec2::new(-step, 0.0)),
            KeyCode::ArrowRight => self.camera.pan(Vec2::new(step, 0.0)),
            KeyCode::ArrowUp => self.camera.pan(Vec2::new(0.0, step)),
            KeyCode::ArrowDown => self.camera.pan(Vec2::new(0.0, -step)),
            KeyCode::Equal | KeyCode::NumpadAdd => self.camera.zoom(0.8),
            KeyCode::Minus | KeyCode::NumpadSubtract => self.camera.zoom(1.25),
            KeyCode::Tab => {
                let next = match renderer.strategy() {
                    SeamStrategy::DerivativeSubstitution => SeamStrategy::PlainFiltered,
                    SeamStrategy::PlainFiltered => SeamStrategy::DerivativeSubstitution,
                };
                renderer.set_strategy(next);
            }
            _ => return,
        }
        renderer.update_camera(&self.camera);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(e) => {
                error!("failed to start renderer: {e}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = self.renderer.as_ref() {
            renderer.window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size);
                    self.camera.calc_aspect(size.width, size.height);
                    renderer.update_camera(&self.camera);
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => (pos.y / 100.0) as f32,
                };
                self.camera.zoom(0.9f32.powf(y));
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.update_camera(&self.camera);
                }
            }

            WindowEvent::KeyboardInput {
                event: KeyEvent {
                    physical_key: PhysicalKey::Code(code),
                    state: ElementState::Pressed,
                    ..
                },
                ..
            } => self.handle_key(code, event_loop),

            WindowEvent::RedrawRequested => {
                let Some(renderer) = self.renderer.as_mut() else { return };
                match renderer.render() {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = renderer.window.inner_size();
                        renderer.resize(size);
                    }
                    Err(e) => error!("render error: {e}"),
                }
            }

            _ => {}
        }
    }
}

// ── main ─────────────────────────────────────────────────────────────────────

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let flag_value = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };

    let mut config = match flag_value("--config") {
        Some(path) => TilegridConfig::load(path)?,
        None => TilegridConfig::default(),
    };
    if args.iter().any(|a| a == "--layered") {
        config.layout = AtlasLayout::Layered;
    }

    if let Some(out) = flag_value("--headless") {
        return render_headless(&config, &out);
    }

    let event_loop =
        EventLoop::new().map_err(|e| tilegrid::TilegridError::Device(e.to_string()))?;
    let mut app = App { config, camera: Camera::new(Vec2::ZERO, 0.75), renderer: None };
    event_loop
        .run_app(&mut app)
        .map_err(|e| tilegrid::TilegridError::Device(e.to_string()))?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run() {
        error!("{e}");
        std::process::exit(1);
    }
}
