use clap::{Parser, Subcommand};
use image_wizard::config::{self, WizardConfig};
use image_wizard::export::write_artifact;
use image_wizard::imaging::{
    AspectRatio, Dimensions, ImageFormat, MaskEvent, MaskQuality, NoPause, Pacer, QUICK_PRESETS,
    Quality, RustBackend, SleepPacer, estimate_size_bytes, format_size_estimate,
};
use image_wizard::output::{self, ExportSummary, RunSummary};
use image_wizard::pipeline::PipelineController;
use image_wizard::store::Step;
use image_wizard::upload::{UploadFile, accept_upload};
use std::path::PathBuf;
use std::sync::mpsc;

#[derive(Parser)]
#[command(name = "image-wizard")]
#[command(about = "Resize, strip backgrounds from, and re-encode images")]
#[command(long_about = "\
Resize, strip backgrounds from, and re-encode images

Runs one image through the four wizard steps:

  1. Upload      validate (image/*, at most 10MB) and decode
  2. Edit        resample to a target size, optionally aspect-locked
  3. Background  make bright pixels transparent (average > 240 or all > 250)
  4. Save        encode as png, jpg, webp or gif

Aspect ratios: free, 1:1, 4:3, 16:9, 3:2, 5:4
Presets:       800x600, 1920x1080, 1200x1200, 1500x1000

Run 'image-wizard gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Take one image through upload → edit → background → save
    Run(RunArgs),
    /// Print export size estimates for a target size
    Estimate(EstimateArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Image to process
    input: PathBuf,

    /// Target width in pixels (height follows a fixed aspect ratio)
    #[arg(long)]
    width: Option<u32>,

    /// Target height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Aspect-ratio lock: free, 1:1, 4:3, 16:9, 3:2, 5:4
    #[arg(long)]
    aspect: Option<AspectRatio>,

    /// Quick preset, e.g. 1920x1080 (ignores the aspect lock)
    #[arg(long, value_parser = parse_preset)]
    preset: Option<Dimensions>,

    /// Background-removal quality: low, medium, high
    #[arg(long)]
    mask_quality: Option<MaskQuality>,

    /// Go straight from Edit to Save
    #[arg(long)]
    skip_background: bool,

    /// Export format: png, jpg, webp, gif
    #[arg(long)]
    format: Option<ImageFormat>,

    /// Export quality for jpg/webp (1-100)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: Option<u32>,

    /// Export every format instead of one
    #[arg(long)]
    all_formats: bool,

    /// Base file name for exports (no extension)
    #[arg(long)]
    name: Option<String>,

    /// Output directory
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Skip the simulated background-removal delay
    #[arg(long)]
    no_delay: bool,

    /// Print a JSON summary instead of step-by-step output
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct EstimateArgs {
    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: Option<u32>,

    /// Only this format
    #[arg(long)]
    format: Option<ImageFormat>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let config = config::load_config(&cli.config_dir)?;
            run(&config, &args)?;
        }
        Command::Estimate(args) => {
            let config = config::load_config(&cli.config_dir)?;
            let dims = Dimensions::new(
                args.width.unwrap_or(config.resize.default_width),
                args.height.unwrap_or(config.resize.default_height),
            )
            .clamp_to(config.resize.max_dimension);
            let quality = args
                .quality
                .map(Quality::new)
                .unwrap_or(config.export_quality());
            match args.format {
                Some(format) => println!(
                    "{} {} {}",
                    format.id(),
                    dims,
                    format_size_estimate(estimate_size_bytes(dims, format, quality))
                ),
                None => output::print_estimates(dims, quality),
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn run(config: &WizardConfig, args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let human = !args.json;
    let backend = RustBackend::with_filter(config.resize.filter.filter_type());

    // Upload
    let file = UploadFile::read(&args.input)?;
    let image = accept_upload(&backend, &file, config.upload.max_bytes)?;
    if human {
        output::print_step_header(Step::Upload);
        println!("{}", output::format_source_line(&file.name, image.dimensions()));
    }
    let mut ctl = PipelineController::new(backend, config);
    if let Some(quality) = args.mask_quality {
        ctl.set_mask_quality(quality)?;
    }
    ctl.upload(image)?;

    // Edit
    if let Some(preset) = args.preset {
        ctl.apply_preset(preset)?;
    }
    if let Some(aspect) = args.aspect {
        ctl.set_aspect_ratio(aspect)?;
    }
    if let Some(width) = args.width {
        ctl.set_width(width)?;
    }
    if let Some(height) = args.height {
        ctl.set_height(height)?;
    }
    if human {
        output::print_step_header(Step::Edit);
        println!(
            "{}",
            output::format_target_line(ctl.state().target_dimensions(), ctl.state().aspect_ratio())
        );
    }

    // Background
    if args.skip_background {
        ctl.skip_background()?;
    } else {
        ctl.next()?;
        if human {
            output::print_step_header(Step::Background);
        }
        drive_masking(&mut ctl, args.no_delay, human)?;
        ctl.next()?;
        if human {
            if let Some(clear) = output::transparent_pixels(ctl.state()) {
                println!(
                    "    Transparent: {} of {} pixels",
                    clear,
                    ctl.state().target_dimensions().pixel_count()
                );
            }
        }
    }

    // Save
    if human {
        output::print_step_header(Step::Save);
    }
    let quality = args
        .quality
        .map(Quality::new)
        .unwrap_or(config.export_quality());
    let name = args.name.as_deref().unwrap_or(&config.export.file_name);
    let mut summary = RunSummary::new(
        &args.input.display().to_string(),
        ctl.state(),
        ctl.mask_quality(),
    );

    if args.all_formats {
        let results = ctl.export_all(quality, name)?;
        for (i, (format, result)) in results.into_iter().enumerate() {
            match result {
                Ok(artifact) => {
                    let path = write_artifact(&args.out, &artifact)?;
                    if human {
                        println!("{}", output::format_export_line(i + 1, &artifact, &path));
                    }
                    summary.exports.push(ExportSummary::new(&artifact, &path));
                }
                Err(e) => eprintln!("{}", output::format_export_failure(i + 1, format, &e)),
            }
        }
    } else {
        let format = args.format.unwrap_or(config.export.format);
        let artifact = ctl.export(format, quality, name)?;
        let path = write_artifact(&args.out, &artifact)?;
        if human {
            println!("{}", output::format_export_line(1, &artifact, &path));
        }
        summary.exports.push(ExportSummary::new(&artifact, &path));
    }

    if args.json {
        println!("{}", output::format_json_summary(&summary)?);
    }
    Ok(())
}

/// Run the live masking run on a worker thread; events come back over a
/// channel and are applied here, on the thread that owns the controller.
fn drive_masking(
    ctl: &mut PipelineController,
    no_delay: bool,
    human: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (generation, run) = ctl
        .take_mask_run()
        .ok_or("background removal did not start")?;
    let quality = run.quality();
    let pacer: Box<dyn Pacer + Send> = if no_delay {
        Box::new(NoPause)
    } else {
        Box::new(SleepPacer)
    };

    let (tx, rx) = mpsc::channel();
    let worker = std::thread::spawn(move || {
        run.drive(pacer.as_ref(), |event| {
            let _ = tx.send(event.clone());
        });
    });
    for event in rx {
        if let MaskEvent::Progress(percent) = &event {
            if human {
                output::print_mask_progress(quality, *percent);
            }
        }
        ctl.apply_mask_event(generation, event);
    }
    worker
        .join()
        .map_err(|_| "background removal worker panicked")?;
    Ok(())
}

/// Parse `WxH` into one of the quick presets.
fn parse_preset(s: &str) -> Result<Dimensions, String> {
    let known = QUICK_PRESETS
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, one of: {known}"))?;
    let dims = Dimensions::new(
        w.trim().parse().map_err(|_| format!("bad width '{w}'"))?,
        h.trim().parse().map_err(|_| format!("bad height '{h}'"))?,
    );
    if QUICK_PRESETS.contains(&dims) {
        Ok(dims)
    } else {
        Err(format!("{dims} is not a preset (one of: {known})"))
    }
}
