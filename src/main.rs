mod assets;
mod booth;
mod capture;
mod compose;
mod gallery;
mod segmentation;
mod ui;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use image::RgbImage;
use minifb::Key;

use assets::{AssetCatalog, AsyncImageLoader, StickerCache};
use booth::{scene_ready, Countdown, CountdownEvent, EditorState, Selection, TimerDelay};
use capture::{CaptureSource, WebcamCapture};
use compose::{Compositor, FittedImage, Scene};
use gallery::Gallery;
use segmentation::{Matte, ModelQuality, SegmentationWorker};
use ui::{PointerEvent, PreviewWindow};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Capture resolution width
    #[arg(long, default_value_t = 640)]
    capture_width: u32,

    /// Capture resolution height
    #[arg(long, default_value_t = 480)]
    capture_height: u32,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Path to the person-segmentation model (ONNX file)
    /// If not provided, runs in passthrough mode without virtual backgrounds
    #[arg(long)]
    model: Option<String>,

    /// Segmentation quality tier: "general" or "landscape"
    #[arg(long, default_value = "general")]
    model_quality: String,

    /// Directory holding backgrounds/, frames/ and stickers/
    #[arg(long, default_value = "assets")]
    assets_dir: PathBuf,

    /// Directory for saved photos
    #[arg(long, default_value = "gallery")]
    gallery_dir: PathBuf,

    /// Show the matte (grayscale silhouette) instead of the composite
    #[arg(long)]
    show_matte: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("Snapbooth starting");
    tracing::info!("Capture: {}x{}", args.capture_width, args.capture_height);
    tracing::info!("Target FPS: {}", args.fps);

    let catalog = match AssetCatalog::scan(&args.assets_dir) {
        Ok(catalog) => catalog,
        Err(e @ assets::AssetError::MissingRoot(_)) => {
            tracing::warn!("{e}; continuing with an empty catalog");
            AssetCatalog {
                backgrounds: Vec::new(),
                frames: Vec::new(),
                stickers: Vec::new(),
            }
        }
        Err(e) => return Err(e).context("Failed to scan assets directory"),
    };

    let mut gallery = Gallery::open(&args.gallery_dir).context("Failed to open gallery")?;
    for photo in gallery.photos() {
        tracing::debug!("Gallery photo {}", photo.path.display());
    }

    let mut capture = WebcamCapture::new(
        args.input_device,
        args.capture_width,
        args.capture_height,
        args.fps,
    )
    .context("Failed to initialize webcam capture")?;
    let (width, height) = capture.resolution();

    let mut window =
        PreviewWindow::new("Snapbooth", width, height, args.fps).context("Failed to open preview")?;

    let worker = match &args.model {
        Some(model_path) => {
            let quality = parse_quality(&args.model_quality)?;
            let model = segmentation::create_model(model_path, quality)
                .context("Failed to load segmentation model")?;
            Some(SegmentationWorker::spawn(model)?)
        }
        None => {
            tracing::info!("Running in passthrough mode (no segmentation)");
            None
        }
    };

    tracing::info!(
        "Keys: Space capture, Enter save, R retake, B background, F frame, V filter, T timer, 1-9 stickers, C clear gallery, Esc quit"
    );

    run_booth(
        &mut capture,
        &mut window,
        worker,
        &catalog,
        &mut gallery,
        args.show_matte,
    )
}

fn parse_quality(raw: &str) -> Result<ModelQuality> {
    match raw {
        "general" => Ok(ModelQuality::General),
        "landscape" => Ok(ModelQuality::Landscape),
        other => bail!("Unknown model quality {other:?} (expected \"general\" or \"landscape\")"),
    }
}

/// Which screen the booth is on: the live preview, or editing a frozen
/// capture.
enum BoothMode {
    Live,
    Edit {
        frame: RgbImage,
        matte: Option<Matte>,
    },
}

const STICKER_KEYS: [Key; 9] = [
    Key::Key1,
    Key::Key2,
    Key::Key3,
    Key::Key4,
    Key::Key5,
    Key::Key6,
    Key::Key7,
    Key::Key8,
    Key::Key9,
];

fn run_booth<C>(
    capture: &mut C,
    window: &mut PreviewWindow,
    worker: Option<SegmentationWorker>,
    catalog: &AssetCatalog,
    gallery: &mut Gallery,
    show_matte: bool,
) -> Result<()>
where
    C: CaptureSource,
{
    let (width, height) = capture.resolution();
    let mut compositor = Compositor::new(width, height);

    let mut editor = EditorState::default();
    let mut mode = BoothMode::Live;
    let mut countdown = Countdown::new();
    let mut timer_delay = TimerDelay::Off;

    let background_loader = AsyncImageLoader::new();
    let overlay_loader = AsyncImageLoader::new();
    let mut background_fit = FittedImage::new();
    let mut overlay_fit = FittedImage::new();
    let mut sticker_cache = StickerCache::new();

    let mut last_frame: Option<RgbImage> = None;

    let mut frame_count = 0u64;
    let mut total_capture_time = Duration::ZERO;
    let mut total_compose_time = Duration::ZERO;
    let mut total_present_time = Duration::ZERO;
    let mut frames_submitted = 0u64;
    let mut frames_dropped = 0u64;

    tracing::info!("Starting booth loop");

    while window.is_open() {
        let now = Instant::now();
        let pointer = window.pointer_events();

        // Selection, filter and timer keys work on both screens.
        if window.key_pressed(Key::B) {
            let selection =
                EditorState::cycle_selection(editor.background, catalog.backgrounds.len());
            apply_selection(&background_loader, &catalog.backgrounds, selection);
            editor = editor.with_background(selection);
            tracing::info!(
                "Background: {}",
                describe_selection(selection, &catalog.backgrounds)
            );
        }
        if window.key_pressed(Key::F) {
            let selection = EditorState::cycle_selection(editor.overlay, catalog.frames.len());
            apply_selection(&overlay_loader, &catalog.frames, selection);
            editor = editor.with_overlay(selection);
            tracing::info!("Frame: {}", describe_selection(selection, &catalog.frames));
        }
        if window.key_pressed(Key::V) {
            editor = editor.with_filter(editor.filter.next());
            tracing::info!("Filter: {}", editor.filter.label());
        }
        if window.key_pressed(Key::T) {
            timer_delay = timer_delay.next();
            tracing::info!("Timer: {}s", timer_delay.seconds());
        }
        if window.key_pressed(Key::C) {
            if gallery.is_empty() {
                tracing::info!("Gallery already empty");
            } else if let Err(e) = gallery.clear() {
                tracing::warn!("Failed to clear gallery: {e:#}");
            }
        }

        // The shutter only arms from the live screen, and never while a
        // countdown is already running.
        let mut fire = false;
        if matches!(mode, BoothMode::Live) && window.key_pressed(Key::Space) {
            match countdown.start(timer_delay, now) {
                CountdownEvent::Fire => fire = true,
                CountdownEvent::Tick(remaining) => tracing::info!("Countdown: {remaining}"),
                CountdownEvent::Idle => {}
            }
        }
        match countdown.advance(now) {
            CountdownEvent::Fire => fire = true,
            CountdownEvent::Tick(remaining) => tracing::info!("Countdown: {remaining}"),
            CountdownEvent::Idle => {}
        }

        if fire {
            match last_frame.clone() {
                Some(frame) => {
                    let matte = worker.as_ref().and_then(|w| w.latest());
                    mode = BoothMode::Edit { frame, matte };
                    tracing::info!("Captured; entering editor");
                }
                None => tracing::warn!("Capture skipped, camera not ready"),
            }
        }

        let mut save_requested = false;
        if let BoothMode::Edit { .. } = mode {
            for event in pointer {
                editor = match event {
                    PointerEvent::Down { x, y } => editor.pointer_down(x, y),
                    PointerEvent::Moved { x, y } => editor.pointer_move(x, y),
                    PointerEvent::Up | PointerEvent::Left => editor.pointer_up(),
                    PointerEvent::Wheel { delta } => editor.wheel(delta),
                };
            }

            for (index, key) in STICKER_KEYS.iter().enumerate() {
                if index < catalog.stickers.len() && window.key_pressed(*key) {
                    if let Some(image) = sticker_cache.fetch(&catalog.stickers[index]) {
                        editor = editor.add_sticker(image, width, height);
                        tracing::info!(
                            "Added sticker {}",
                            catalog.stickers[index].display()
                        );
                    }
                }
            }

            save_requested = window.key_pressed(Key::Enter);

            if window.key_pressed(Key::R) {
                editor = editor.reset();
                background_loader.clear();
                overlay_loader.clear();
                mode = BoothMode::Live;
                tracing::info!("Retake: editor cleared");
            }
        }

        // Drawing gate: skip the cycle while a referenced image is still
        // loading. The previous frame stays on screen.
        let background_slot = background_loader.slot();
        let overlay_slot = overlay_loader.slot();
        if !scene_ready(&editor, &background_slot, &overlay_slot) {
            window.pump();
            continue;
        }
        let background = background_fit.fit(background_slot.ready(), width, height);
        let overlay = overlay_fit.fit(overlay_slot.ready(), width, height);

        match &mut mode {
            BoothMode::Live => {
                if !capture.is_ready() {
                    window.pump();
                    continue;
                }

                let capture_start = Instant::now();
                let frame = match capture.grab() {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!("Capture failed: {e:#}");
                        window.pump();
                        continue;
                    }
                };
                total_capture_time += capture_start.elapsed();

                if let Some(worker) = &worker {
                    if worker.submit(frame.clone()) {
                        frames_submitted += 1;
                    } else {
                        frames_dropped += 1;
                    }
                }
                let matte = worker.as_ref().and_then(|w| w.latest());

                if show_matte {
                    match &matte {
                        Some(matte) => {
                            let gray = matte.to_gray_rgba();
                            window.present(&gray)?;
                        }
                        None => window.pump(),
                    }
                    last_frame = Some(frame);
                    continue;
                }

                let compose_start = Instant::now();
                let scene = Scene {
                    frame: &frame,
                    matte: matte.as_ref(),
                    background: background.as_deref(),
                    overlay: overlay.as_deref(),
                    stickers: &editor.stickers,
                    active_sticker: editor.active_sticker,
                    filter: editor.filter,
                    show_selection: false,
                };
                let buffer = compositor.render(&scene);
                if let Some(count) = countdown.display() {
                    ui::draw_countdown(buffer, count);
                }
                total_compose_time += compose_start.elapsed();

                let present_start = Instant::now();
                window.present(buffer)?;
                total_present_time += present_start.elapsed();

                last_frame = Some(frame);
            }
            BoothMode::Edit { frame, matte } => {
                // Adopt a matte that arrived after the shutter, if
                // segmentation was still catching up at capture time.
                if matte.is_none() {
                    if let Some(worker) = &worker {
                        *matte = worker.latest();
                    }
                }

                if save_requested {
                    let export = Scene {
                        frame,
                        matte: matte.as_ref(),
                        background: background.as_deref(),
                        overlay: overlay.as_deref(),
                        stickers: &editor.stickers,
                        active_sticker: editor.active_sticker,
                        filter: editor.filter,
                        show_selection: false,
                    };
                    let buffer = compositor.render(&export);
                    match gallery.save(buffer) {
                        Ok(_) => tracing::info!("Gallery now holds {} photos", gallery.len()),
                        Err(e) => tracing::warn!("Save failed: {e:#}"),
                    }
                }

                let compose_start = Instant::now();
                let scene = Scene {
                    frame,
                    matte: matte.as_ref(),
                    background: background.as_deref(),
                    overlay: overlay.as_deref(),
                    stickers: &editor.stickers,
                    active_sticker: editor.active_sticker,
                    filter: editor.filter,
                    show_selection: true,
                };
                let buffer = compositor.render(&scene);
                total_compose_time += compose_start.elapsed();

                let present_start = Instant::now();
                window.present(buffer)?;
                total_present_time += present_start.elapsed();
            }
        }

        frame_count += 1;

        // Log stats every 120 frames
        if frame_count % 120 == 0 {
            let avg_capture_ms =
                total_capture_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_compose_ms =
                total_compose_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_present_ms =
                total_present_time.as_secs_f64() * 1000.0 / frame_count as f64;
            tracing::info!(
                "Frame {}: capture={:.1}ms, compose={:.1}ms, present={:.1}ms, segmented={}/{}",
                frame_count,
                avg_capture_ms,
                avg_compose_ms,
                avg_present_ms,
                frames_submitted,
                frames_submitted + frames_dropped
            );
        }
    }

    tracing::info!("Snapbooth stopped after {frame_count} frames");
    Ok(())
}

fn apply_selection(loader: &AsyncImageLoader, paths: &[PathBuf], selection: Selection) {
    match selection.and_then(|index| paths.get(index)) {
        Some(path) => loader.request(path),
        None => loader.clear(),
    }
}

fn describe_selection(selection: Selection, paths: &[PathBuf]) -> String {
    selection
        .and_then(|index| paths.get(index))
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "none".to_string())
}
