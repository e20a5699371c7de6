use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "softcanvas", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one frame of a scene as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Server settings JSON. Defaults apply to missing keys.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Present to a display that keeps the alpha channel.
    #[arg(long)]
    alpha: bool,

    /// Print per-frame counters after drawing.
    #[arg(long)]
    stats: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
    }
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<softcanvas::ServerSettings> {
    let settings = match path {
        Some(p) => softcanvas::ServerSettings::load(p)
            .with_context(|| format!("load settings '{}'", p.display()))?,
        None => softcanvas::ServerSettings::default(),
    };
    Ok(settings.with_env_overrides())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let settings = load_settings(args.settings.as_deref())?;
    let scene = softcanvas::SceneDescription::load(&args.in_path)
        .with_context(|| format!("load scene '{}'", args.in_path.display()))?;

    let mut server = softcanvas::RenderingServer::new(settings);
    let assets_root = args.in_path.parent().unwrap_or_else(|| Path::new("."));
    let viewport = scene
        .build(&mut server, assets_root)
        .with_context(|| "build scene")?;

    let [w, h] = scene.viewport.size;
    server.set_display_window(Box::new(softcanvas::MemoryDisplay::new(w, h, args.alpha)));
    server.viewport_attach_to_screen(
        viewport,
        softcanvas::Rect::new(0.0, 0.0, f64::from(w), f64::from(h)),
    );
    server.viewport_draw(viewport, 0.0);

    if args.stats {
        for (label, info) in [
            ("objects", softcanvas::RenderInfo::ObjectsInFrame),
            ("primitives", softcanvas::RenderInfo::PrimitivesInFrame),
            ("draw_calls", softcanvas::RenderInfo::DrawCallsInFrame),
        ] {
            eprintln!("{label}: {}", server.viewport_get_render_info(viewport, info));
        }
    }

    let display = server
        .display()
        .context("display surface missing after registration")?;
    let frame = softcanvas::PixelBuffer::from_pixels(w, h, display.pixels().to_vec())?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.to_rgba8_bytes(),
        w,
        h,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
