use clap::{Parser, Subcommand};
use postpress::filters::FilterRegistry;
use postpress::posts::PostsManifest;
use postpress::{config, fortune, generate, output, posts, process};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt};

/// Shared flags for commands that process images.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Disable the processing cache and re-encode every variant
    #[arg(long)]
    no_cache: bool,
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "postpress")]
#[command(about = "Post enrichment and responsive cover images for a static blog")]
#[command(long_about = "\
Post enrichment and responsive cover images for a static blog

Reads posts with YAML front matter, fills in media paths and last-modified
dates, renders responsive variants of each post's cover image, and writes the
posts back out with rewritten image references.

Site structure:

  site/
  ├── config.toml                          # Optional, overrides stock defaults
  ├── _posts/
  │   └── 2024-03-01-hello.md              # image: cover.jpg
  └── assets/posts/2024-03-01-hello/
      └── cover.jpg                        # Default media directory

Front matter keys:
  image              Cover image (path or {path, alt}), relative to media_subpath
  cover_responsive   Use the 800px cover variant as the displayed image
  cover_hide         Prepend the configured style block that hides the cover
  media_subpath      Media directory (legacy alias: img_path)

Run 'postpress gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Site root
    #[arg(long, default_value = ".", global = true)]
    site: PathBuf,

    /// Output directory for generated posts
    #[arg(long, default_value = "out", global = true)]
    output: PathBuf,

    /// Directory for intermediate manifests
    #[arg(long, default_value = ".postpress", global = true)]
    temp_dir: PathBuf,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read posts and enrich their front matter into a manifest
    Enrich,
    /// Render responsive cover image variants
    Process(CacheArgs),
    /// Write posts with rewritten front matter
    Generate,
    /// Run the full pipeline: enrich → process → generate
    Build(CacheArgs),
    /// Validate posts and image references without building
    Check,
    /// Print a random fortune, reflowed for the given width
    Fortune {
        /// Display width in columns
        #[arg(long, default_value_t = 80)]
        columns: usize,
        /// Fortune file (defaults to fortune.file from config)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Enrich => {
            run_enrich(&cli)?;
        }
        Command::Process(cache_args) => {
            run_process(&cli, cache_args)?;
        }
        Command::Generate => {
            run_generate(&cli)?;
        }
        Command::Build(cache_args) => {
            println!("==> Stage 1: Enriching posts in {}", cli.site.display());
            run_enrich(&cli)?;

            println!("==> Stage 2: Processing images");
            run_process(&cli, cache_args)?;

            println!("==> Stage 3: Writing posts → {}", cli.output.display());
            run_generate(&cli)?;

            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.site.display());
            let manifest = posts::enrich(&cli.site)?;
            output::print_enrich_output(&manifest, has_config_file(&cli.site));
            let missing = posts::missing_images(&cli.site, &manifest);
            if !missing.is_empty() {
                for (slug, path) in &missing {
                    eprintln!("error: {}: image not found: {}", slug, path.display());
                }
                return Err(format!("{} missing image(s)", missing.len()).into());
            }
            println!("==> Content is valid");
        }
        Command::Fortune { columns, file } => {
            let site_config = config::load_config(&cli.site)?;
            let path = file
                .clone()
                .unwrap_or_else(|| cli.site.join(&site_config.fortune.file));
            let fortunes = fortune::load_fortunes(&path, &site_config.fortune.exclude)?;
            let quote = fortune::pick(&fortunes, &mut rand::rng())?;
            println!("{}", fortune::reflow(quote, fortune::column_budget(*columns)));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn posts_manifest_path(cli: &Cli) -> PathBuf {
    cli.temp_dir.join("posts.json")
}

fn processed_manifest_path(cli: &Cli) -> PathBuf {
    cli.temp_dir.join("processed.json")
}

fn has_config_file(site: &Path) -> bool {
    site.join("config.toml").is_file()
}

fn run_enrich(cli: &Cli) -> CliResult<()> {
    let manifest = posts::enrich(&cli.site)?;
    std::fs::create_dir_all(&cli.temp_dir)?;
    let json = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(posts_manifest_path(cli), json)?;
    output::print_enrich_output(&manifest, has_config_file(&cli.site));
    Ok(())
}

fn run_process(cli: &Cli, cache_args: &CacheArgs) -> CliResult<()> {
    let manifest_path = posts_manifest_path(cli);
    let content = std::fs::read_to_string(&manifest_path)?;
    let manifest: PostsManifest = serde_json::from_str(&content)?;
    init_thread_pool(&manifest.config.processing);
    let generated_root = cli.site.join(&manifest.config.output.generated_dir);

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = process::process(
        &manifest_path,
        &cli.site,
        &generated_root,
        !cache_args.no_cache,
        Some(tx),
    );
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    let result = result?;

    let json = serde_json::to_string_pretty(&result.manifest)?;
    std::fs::write(processed_manifest_path(cli), json)?;
    println!("Cache: {}", result.cache_stats);
    Ok(())
}

fn run_generate(cli: &Cli) -> CliResult<()> {
    let registry = FilterRegistry::with_defaults();
    let written = generate::generate(&processed_manifest_path(cli), &cli.output, &registry)?;
    output::print_generate_output(&written);
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down,
/// not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
