use clap::{Parser, Subcommand};
use gina::imaging::{self, LocalFs, Rect, SourceImage};
use gina::{config, logging, output};
use image::DynamicImage;
use std::path::PathBuf;

/// Input image plus output file, shared by every command that writes an image.
#[derive(clap::Args, Clone)]
struct ImageArgs {
    /// Input image file
    input: PathBuf,

    /// Output file; the format follows the extension (jpg, png, gif, tif, bmp)
    #[arg(short, long, default_value = "output.jpg")]
    output: PathBuf,
}

#[derive(Parser)]
#[command(name = "gina")]
#[command(about = "Small image processing tool")]
#[command(long_about = "\
Small image processing tool

Reads JPEG, PNG, GIF, TIFF and BMP. The output format is chosen from the
--output extension and may differ from the input's.

With --auto-orient (or decode.auto_orientation in gina.toml), JPEGs are
rotated and flipped according to their EXIF orientation tag while they are
being decoded.

Run 'gina gen-config' to generate a documented gina.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./gina.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON log lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Apply the EXIF orientation when opening images
    #[arg(long, global = true)]
    auto_orient: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Gaussian blur with the given sigma
    Blur {
        /// Blur strength; 0 or less copies the image
        #[arg(short, long, default_value_t = 0.0)]
        sigma: f64,
        #[command(flatten)]
        image: ImageArgs,
    },
    /// Unsharp-mask sharpening with the given sigma
    Sharpen {
        /// Sharpening radius; 0 or less copies the image
        #[arg(short, long, default_value_t = 0.0)]
        sigma: f64,
        #[command(flatten)]
        image: ImageArgs,
    },
    /// Adjust contrast
    Contrast {
        /// Percentage in (-100, 100); 0 leaves the image unchanged
        #[arg(short, long, default_value_t = 0.0, allow_hyphen_values = true)]
        percentage: f32,
        #[command(flatten)]
        image: ImageArgs,
    },
    /// Adjust gamma correction
    Gamma {
        /// Below 1.0 darkens, above 1.0 lightens; 1.0 leaves the image unchanged
        #[arg(short, long, default_value_t = 1.0)]
        gamma: f64,
        #[command(flatten)]
        image: ImageArgs,
    },
    /// Pixelate a rectangle with 10x10 tiles
    Mosaic {
        /// Rectangle as x,y,width,height
        #[arg(long)]
        rect: Rect,
        #[command(flatten)]
        image: ImageArgs,
    },
    /// Resize with Lanczos3; a zero side keeps the aspect ratio
    Resize {
        /// Width of the output image
        #[arg(short = 'W', long, default_value_t = 0)]
        width: u32,
        /// Height of the output image
        #[arg(short = 'H', long, default_value_t = 0)]
        height: u32,
        #[command(flatten)]
        image: ImageArgs,
    },
    /// Re-encode in the format of the output extension
    Convert(ImageArgs),
    /// Show dimensions, format, colour layout and EXIF orientation
    Info {
        /// Input image file
        input: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print a stock gina.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let cwd = std::env::current_dir()?;
    let config = config::load_config(cli.config.as_deref(), &cwd)?;
    logging::init(&config.logging, cli.verbose, cli.log_json);
    init_thread_pool(&config.processing);
    tracing::debug!(?config, "configuration loaded");

    let mut decode = config.decode.to_options();
    decode.auto_orientation |= cli.auto_orient;
    let encode = config.encode.to_options();
    let fs = LocalFs;

    let open = |image: &ImageArgs| imaging::open(&fs, &image.input, &decode);
    let finish = |action: String, image: &ImageArgs, img: DynamicImage| {
        imaging::save(&fs, &img, &image.output, &encode)?;
        output::print_saved(
            &action,
            &image.input,
            &image.output,
            (img.width(), img.height()),
        );
        Ok::<_, imaging::ImagingError>(())
    };

    match cli.command {
        Command::Blur { sigma, image } => {
            let src = SourceImage::from(open(&image)?);
            let dst = imaging::blur(&src, sigma);
            finish(format!("blur (sigma {sigma})"), &image, dst.into())?;
        }
        Command::Sharpen { sigma, image } => {
            let src = SourceImage::from(open(&image)?);
            let dst = imaging::sharpen(&src, sigma);
            finish(format!("sharpen (sigma {sigma})"), &image, dst.into())?;
        }
        Command::Contrast { percentage, image } => {
            let dst = imaging::adjust_contrast(&open(&image)?, percentage);
            finish(format!("contrast ({percentage}%)"), &image, dst)?;
        }
        Command::Gamma { gamma, image } => {
            let dst = imaging::adjust_gamma(&open(&image)?, gamma);
            finish(format!("gamma ({gamma})"), &image, dst)?;
        }
        Command::Mosaic { rect, image } => {
            let src = SourceImage::from(open(&image)?);
            let dst = imaging::mosaic(&src, rect);
            let action = format!(
                "mosaic ({},{} {}x{})",
                rect.x, rect.y, rect.width, rect.height
            );
            finish(action, &image, dst.into())?;
        }
        Command::Resize {
            width,
            height,
            image,
        } => {
            let src = open(&image)?;
            let dst = imaging::resize(&src, width, height)
                .ok_or("resize needs a non-empty image and --width or --height")?;
            finish("resize (lanczos3)".to_string(), &image, dst)?;
        }
        Command::Convert(image) => {
            let src = open(&image)?;
            finish("convert".to_string(), &image, src)?;
        }
        Command::Info { input, json } => {
            let info = imaging::probe(&fs, &input)?;
            if json {
                println!("{}", output::format_info_json(&info)?);
            } else {
                output::print_info(&input, &info);
            }
        }
        // Printed before any config is loaded.
        Command::GenConfig => {}
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
