use anyhow::{anyhow, Context, Result};
use catalog::EffectLibrary;
use engine::{EffectEngine, FrameRequest, InputKind};
use tracing::info;
use tracing_subscriber::EnvFilter;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use crate::cli::Args;

pub fn run(args: Args) -> Result<()> {
    initialise_tracing();

    let library = EffectLibrary::load(&args.assets);
    if args.list {
        for entry in library.entries() {
            println!("{:<24} {:<32} {:?}", entry.id, entry.name, entry.category);
        }
        return Ok(());
    }
    anyhow::ensure!(
        !library.is_empty(),
        "no effects found under {}",
        args.assets.display()
    );

    let effect_ids: Vec<String> = library.entries().iter().map(|e| e.id.clone()).collect();
    let mut selected = match &args.effect {
        Some(id) => effect_ids
            .iter()
            .position(|candidate| candidate == id)
            .ok_or_else(|| anyhow!("unknown effect '{id}'"))?,
        None => 0,
    };

    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let (width, height) = args.size;
    let window = WindowBuilder::new()
        .with_title("vjfx")
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .context("failed to create preview window")?;

    let mut engine = EffectEngine::new(&window, window.inner_size(), library)?;
    if let Some(path) = args.image.clone() {
        engine.request_input_frame(path);
    }
    info!(effect = %effect_ids[selected], "starting preview");

    let mut request = FrameRequest::new(effect_ids[selected].clone());
    let mut window_size = window.inner_size();
    window.request_redraw();

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);

            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                    WindowEvent::Resized(new_size) => {
                        window_size = new_size;
                        engine.resize(new_size);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        request.pointer = [
                            (position.x / window_size.width.max(1) as f64) as f32,
                            (position.y / window_size.height.max(1) as f64) as f32,
                        ];
                    }
                    WindowEvent::MouseInput { state, button, .. } => match button {
                        MouseButton::Left => {
                            request.pointer_down = state == ElementState::Pressed;
                            if request.pointer_down && request.pointer[0] >= 0.0 {
                                engine.add_interaction_point(request.pointer[0], request.pointer[1]);
                            }
                        }
                        MouseButton::Right if state == ElementState::Pressed => {
                            let [x, y] = request.pointer;
                            // Launch toward the canvas centre.
                            engine.fire_particle(x, y, (0.5 - x) * 0.8, (0.5 - y) * 0.8);
                        }
                        _ => {}
                    },
                    WindowEvent::KeyboardInput { event, .. }
                        if event.state == ElementState::Pressed =>
                    {
                        match event.logical_key {
                            Key::Named(NamedKey::Escape) => elwt.exit(),
                            Key::Named(NamedKey::Space) => {
                                selected = (selected + 1) % effect_ids.len();
                                request.effect_id = effect_ids[selected].clone();
                                info!(effect = %request.effect_id, "switched effect");
                            }
                            Key::Named(NamedKey::ArrowLeft) => request.pan_x -= 0.05,
                            Key::Named(NamedKey::ArrowRight) => request.pan_x += 0.05,
                            Key::Named(NamedKey::ArrowUp) => request.pan_y -= 0.05,
                            Key::Named(NamedKey::ArrowDown) => request.pan_y += 0.05,
                            Key::Character(ref c) if c.as_str() == "=" => {
                                request.zoom = (request.zoom * 1.1).min(16.0);
                            }
                            Key::Character(ref c) if c.as_str() == "-" => {
                                request.zoom = (request.zoom / 1.1).max(0.1);
                            }
                            Key::Character(ref c) if c.as_str() == "i" => {
                                engine.set_input_source(InputKind::Image);
                            }
                            Key::Character(ref c) if c.as_str() == "v" => {
                                engine.set_input_source(InputKind::Video);
                            }
                            _ => {}
                        }
                    }
                    WindowEvent::RedrawRequested => match engine.render(&request) {
                        Ok(()) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            engine.resize(window_size);
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            eprintln!("surface out of memory; exiting");
                            elwt.exit();
                        }
                        Err(other) => {
                            eprintln!("surface error: {other:?}; retrying next frame");
                        }
                    },
                    _ => {}
                },
                Event::AboutToWait => {
                    // Schedule the next frame once winit is about to wait again.
                    window.request_redraw();
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop error: {err}"))
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
