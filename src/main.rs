use clap::{Arg, ArgAction, Command};
use log::{error, info};
use winit::{
    event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

use split_image_viewer::app::{AppConfig, AppState};
use split_image_viewer::codec::{size_kb_label, CodecBridge, JpegCodec};

const DEFAULT_IMAGE: &str = "images/js-wa-900.jpg";
const DEFAULT_QUALITY: u8 = 5;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let matches = Command::new("split_image_viewer")
        .version("1.0")
        .about("Compares an image against a JPEG re-encode behind a draggable split line")
        .arg(
            Arg::new("image")
                .short('i')
                .long("image")
                .action(ArgAction::Set)
                .value_name("FILE")
                .help("Source image to compare")
                .default_value(DEFAULT_IMAGE),
        )
        .arg(
            Arg::new("quality")
                .short('q')
                .long("quality")
                .action(ArgAction::Set)
                .value_name("LEVEL")
                .help("Initial JPEG quality (1-100)")
                .default_value("5"),
        )
        .arg(
            Arg::new("window_size")
                .short('w')
                .long("window-size")
                .action(ArgAction::Set)
                .value_name("WIDTHxHEIGHT")
                .help("Window size in format WIDTHxHEIGHT (e.g. 1280x800)")
                .default_value("1280x800"),
        )
        .arg(
            Arg::new("transcode_out")
                .long("transcode-out")
                .action(ArgAction::Set)
                .value_name("FILE")
                .help("Headless mode: transcode once at the given quality, write the result, exit"),
        )
        .get_matches();

    let image_path = matches.get_one::<String>("image").unwrap().to_string();
    let quality: u8 = matches
        .get_one::<String>("quality")
        .unwrap()
        .parse()
        .unwrap_or(DEFAULT_QUALITY);

    if let Some(out_path) = matches.get_one::<String>("transcode_out") {
        return transcode_once(&image_path, quality, out_path);
    }

    let window_size = matches.get_one::<String>("window_size").unwrap();
    let (width, height) = parse_window_size(window_size)?;

    info!(
        "Starting split image viewer with image: {}, quality: {}, window size: {}x{}",
        image_path, quality, width, height
    );

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("Split Image Viewer")
        .with_inner_size(winit::dpi::LogicalSize::new(width, height))
        .build(&event_loop)?;

    let app_config = AppConfig {
        image_path,
        quality,
    };
    let mut app_state = pollster::block_on(AppState::new(&window, app_config))?;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        app_state.handle_event(&window, &event);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state: ElementState::Pressed,
                            virtual_keycode: Some(VirtualKeyCode::Escape),
                            ..
                        },
                    ..
                } => *control_flow = ControlFlow::Exit,
                _ => {}
            },
            Event::MainEventsCleared => {
                window.request_redraw();
            }
            Event::RedrawRequested(_) => {
                app_state.update();
                match app_state.render(&window) {
                    Ok(_) => {}
                    Err(e) => error!("Render error: {}", e),
                }
            }
            _ => {}
        }
    });
}

/// One-shot harness: re-encode the source at `quality` and write the result.
fn transcode_once(
    image_path: &str,
    quality: u8,
    out_path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read(image_path)?;
    let mut bridge = CodecBridge::new();
    bridge.install(Box::new(JpegCodec::new()));
    let out = bridge
        .transcode(&source, quality)
        .ok_or("codec module unavailable")?;
    std::fs::write(out_path, &out.bytes[..out.size.min(out.bytes.len())])?;
    info!(
        "transcoded {} at q{} -> {} ({} kB)",
        image_path,
        quality,
        out_path,
        size_kb_label(out.size)
    );
    Ok(())
}

fn parse_window_size(size: &str) -> Result<(f32, f32), String> {
    let parts: Vec<&str> = size.split('x').collect();
    if parts.len() != 2 {
        return Err("Invalid window size format. Use WIDTHxHEIGHT".to_string());
    }
    let width = parts[0].parse::<f32>().map_err(|_| "Invalid width")?;
    let height = parts[1].parse::<f32>().map_err(|_| "Invalid height")?;
    Ok((width, height))
}
