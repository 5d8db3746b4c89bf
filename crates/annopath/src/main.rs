//! annopath: convert result mask images into per-class annotation paths.
//!
//! Recursively finds every `*_result.png` under the input directory,
//! traces the boundary of each color class and writes the polygons to a
//! sibling `*_result_path.json` file.
//!
//! # Usage
//!
//! ```text
//! annopath [OPTIONS] <INPUT_DIRECTORY>
//! annopath -i /path/to/result/data -b 2 --append
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use annopath_export::{CodecError, decode_document, encode_document};
use annopath_pipeline::{
    AnnotationDocument, ConvertConfig, ImageDiagnostics, PipelineError, PixelColor,
};
use clap::{ArgGroup, Parser};
use tracing_subscriber::EnvFilter;

/// Suffix identifying result images.
const DEFAULT_IMAGE_SUFFIX: &str = "_result.png";

/// Suffix replacing [`DEFAULT_IMAGE_SUFFIX`] in the output file name.
const DEFAULT_PATH_SUFFIX: &str = "_result_path.json";

/// Convert result mask images into per-class annotation paths.
///
/// Every pixel color other than the clean color is a class. The boundary
/// of each class region is traced and written as a list of polygons.
#[derive(Parser)]
#[command(name = "annopath", version)]
#[command(group(ArgGroup::new("input").required(true).args(["directory", "input_directory"])))]
struct Cli {
    /// Directory to search recursively for result images.
    directory: Option<PathBuf>,

    /// Directory to search recursively for result images.
    #[arg(short = 'i', long)]
    input_directory: Option<PathBuf>,

    /// Box blur radius applied to each class mask before tracing (0 disables).
    #[arg(short = 'b', long, default_value_t = ConvertConfig::DEFAULT_BLUR_RADIUS)]
    blur_amount: u32,

    /// Append to existing path files instead of replacing them.
    #[arg(short = 'a', long)]
    append: bool,

    /// Print per-image details instead of a progress counter.
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Pixel color treated as background, as RRGGBB or RRGGBBAA hex.
    #[arg(long, default_value_t = ConvertConfig::DEFAULT_CLEAN_COLOR)]
    clean_color: PixelColor,

    /// File name suffix identifying result images.
    #[arg(long, default_value = DEFAULT_IMAGE_SUFFIX)]
    image_suffix: String,

    /// File name suffix of the written path files.
    #[arg(long, default_value = DEFAULT_PATH_SUFFIX)]
    path_suffix: String,

    /// Full conversion config as a JSON string.
    ///
    /// When provided, `--blur-amount`, `--append` and `--clean-color` are
    /// ignored. Missing fields take their default values.
    #[arg(long)]
    config_json: Option<String>,
}

impl Cli {
    fn input(&self) -> Option<&Path> {
        self.input_directory.as_deref().or(self.directory.as_deref())
    }
}

/// Build a [`ConvertConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<ConvertConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(ConvertConfig {
        clean_color: cli.clean_color,
        blur_radius: cli.blur_amount,
        append: cli.append,
    })
}

/// Errors that stop a single image from being converted.
#[derive(Debug, thiserror::Error)]
enum ConvertError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Encode(#[from] CodecError),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("file name does not end with {suffix:?}")]
    Suffix { suffix: String },
}

/// Recursively collect files whose name ends with `suffix`, sorted by path.
///
/// Fails only when `root` itself cannot be listed. Unreadable
/// subdirectories are logged and skipped.
fn find_images(root: &Path, suffix: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![std::fs::read_dir(root)?];

    while let Some(entries) = pending.pop() {
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("skipping unreadable directory entry: {e}");
                    continue;
                }
            };
            let path = entry.path();
            if path.is_dir() {
                match std::fs::read_dir(&path) {
                    Ok(sub) => pending.push(sub),
                    Err(e) => tracing::warn!("skipping {}: {e}", path.display()),
                }
            } else if path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(suffix))
            {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

/// The path file written for `image`: same directory, suffix replaced.
fn output_path_for(image: &Path, image_suffix: &str, path_suffix: &str) -> Option<PathBuf> {
    let name = image.file_name()?.to_str()?;
    let stem = name.strip_suffix(image_suffix)?;
    Some(image.with_file_name(format!("{stem}{path_suffix}")))
}

/// Load the document previously written to `path`, if any.
///
/// A missing file is silently treated as no seed. Unreadable files and
/// schema problems are logged and whatever could be recovered is used.
fn load_seed(path: &Path) -> Option<AnnotationDocument> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("error reading existing file {}: {e}", path.display());
            return None;
        }
    };

    let decoded = decode_document(&bytes);
    for issue in &decoded.issues {
        tracing::warn!(file = %path.display(), "{issue}");
    }
    tracing::debug!(
        file = %path.display(),
        polygons = decoded.document.polygon_count(),
        "found previous file, appending"
    );
    Some(decoded.document)
}

/// Convert one result image and write its path file.
fn convert_file(
    image_path: &Path,
    output_path: &Path,
    config: &ConvertConfig,
) -> Result<ImageDiagnostics, ConvertError> {
    let bytes = std::fs::read(image_path).map_err(|source| ConvertError::Read {
        path: image_path.to_path_buf(),
        source,
    })?;
    let image = annopath_pipeline::decode_label_image(&bytes)?;

    let seed = if config.append {
        load_seed(output_path)
    } else {
        None
    };

    let (document, diagnostics) = annopath_pipeline::process_image(&image, config, seed);
    if diagnostics.discarded_traces > 0 {
        tracing::warn!(
            file = %image_path.display(),
            discarded = diagnostics.discarded_traces,
            "some borders could not be closed and were dropped"
        );
    }

    let json = encode_document(&document)?;
    std::fs::write(output_path, json).map_err(|source| ConvertError::Write {
        path: output_path.to_path_buf(),
        source,
    })?;
    Ok(diagnostics)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let Some(input) = cli.input() else {
        eprintln!("No input directory given");
        return ExitCode::FAILURE;
    };
    println!("Input directory = {}", input.display());
    tracing::debug!(?config, "conversion config");

    println!("Searching for result images...");
    let images = match find_images(input, &cli.image_suffix) {
        Ok(images) => images,
        Err(e) => {
            eprintln!("Error reading {}: {e}", input.display());
            return ExitCode::FAILURE;
        }
    };
    println!("Converting {} result images...", images.len());

    let mut failed = 0_usize;
    for (index, image_path) in images.iter().enumerate() {
        if cli.verbose {
            println!("Converting {}", image_path.display());
        } else {
            print!("\r{}", index + 1);
            let _ = std::io::stdout().flush();
        }

        let result = output_path_for(image_path, &cli.image_suffix, &cli.path_suffix)
            .ok_or_else(|| ConvertError::Suffix {
                suffix: cli.image_suffix.clone(),
            })
            .and_then(|output_path| convert_file(image_path, &output_path, &config));

        match result {
            Ok(diagnostics) => {
                if cli.verbose {
                    println!("{}", diagnostics.report());
                }
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(file = %image_path.display(), "skipping: {e}");
            }
        }
    }

    if failed > 0 {
        tracing::warn!(failed, total = images.len(), "some images could not be converted");
    }
    println!("\rDone                 ");
    ExitCode::SUCCESS
}
