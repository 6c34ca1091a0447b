use clap::{Parser, Subcommand, ValueEnum};
use sitegen::pipeline::{self, BuildOptions, CacheMode};
use sitegen::render::HtmlRenderer;
use sitegen::site::Site;
use sitegen::tree::{SortKey, SortOrder};
use sitegen::{config, output};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sitegen")]
#[command(about = "Incremental static site generator")]
#[command(long_about = "\
Incremental static site generator

Markdown and HTML documents under source/ are rendered into build/. Only
pages whose source is newer than their output are rebuilt, and the indexed
source tree is cached between runs so unchanged sites skip the directory walk.

Site layout:

  my-site/
  ├── sitegen.toml          # Optional config (see 'sitegen gen-config')
  ├── source/               # Documents: *.md, *.markdown, *.html, *.htm
  │   ├── index.md          # → build/index.html, served at /
  │   └── blog/
  │       └── first.md      # → build/blog/first.html
  ├── build/                # Rendered output
  └── .sitegen-cache/       # Index snapshot")]
#[command(version)]
struct Cli {
    /// Site working directory
    #[arg(short = 'p', long, default_value = ".", global = true)]
    working_dir: PathBuf,

    /// Log debug detail (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that read the source tree.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Ignore the index snapshot and walk the source directory
    #[arg(long)]
    no_cache: bool,

    /// Ignore snapshots older than this many seconds (0 = always re-index)
    #[arg(long, value_name = "SECS")]
    max_age: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Render pages that changed since the last build
    Build {
        /// Render every page, even unchanged ones
        #[arg(short, long)]
        force: bool,
        /// Remove all rendered files first
        #[arg(short, long)]
        clean: bool,
        /// Decide and render without writing anything
        #[arg(short, long)]
        dry_run: bool,
        #[command(flatten)]
        cache: CacheArgs,
    },
    /// List indexed pages with their build decisions
    Index {
        /// List pages flat, ordered by this key
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
        /// Reverse the sort order
        #[arg(long)]
        desc: bool,
        /// Print page summaries as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        cache: CacheArgs,
    },
    /// Remove rendered output and the index snapshot
    Clean,
    /// Print a stock sitegen.toml with all options documented
    GenConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Decision,
    Kind,
    Url,
    SourceModified,
    DestModified,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Decision => SortKey::Decision,
            SortArg::Kind => SortKey::Kind,
            SortArg::Url => SortKey::UrlPath,
            SortArg::SourceModified => SortKey::SourceModified,
            SortArg::DestModified => SortKey::DestModified,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    eprintln!("sitegen {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Build {
            force,
            clean,
            dry_run,
            cache,
        } => {
            let site = Site::open(&cli.working_dir)?;
            let options = BuildOptions {
                force,
                clean,
                dry_run,
                cache: cache_mode(&site, &cache),
                max_age: max_age(&site, &cache),
            };
            let report = pipeline::build(&site, &options, &HtmlRenderer)?;
            println!("{}", report.stats);
            if !report.stats.succeeded() {
                std::process::exit(1);
            }
        }
        Command::Index {
            sort,
            desc,
            json,
            cache,
        } => {
            let site = Site::open(&cli.working_dir)?;
            let mut loaded =
                pipeline::load_tree(&site, cache_mode(&site, &cache), max_age(&site, &cache), true)?;
            loaded.tree.refresh_destinations(&site.dest_root);
            let tree = &loaded.tree;

            let order = if desc {
                SortOrder::Descending
            } else {
                SortOrder::Ascending
            };
            let entries = match sort {
                Some(key) => tree.sorted(key.into(), order),
                None if desc => tree.sorted(SortKey::UrlPath, order),
                None => tree.iter().collect(),
            };

            if json {
                println!("{}", output::format_json(&entries)?);
            } else if sort.is_some() || desc {
                output::print_page_list(&entries);
            } else {
                output::print_tree_output(tree);
            }
        }
        Command::Clean => {
            let site = Site::open(&cli.working_dir)?;
            let removed = pipeline::clean(&site)?;
            println!("Removed {removed} rendered files.");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// `-v` forces debug logging; otherwise `RUST_LOG` decides, defaulting to info.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cache_mode(site: &Site, args: &CacheArgs) -> CacheMode {
    if !site.config.cache.enabled {
        CacheMode::Off
    } else if args.no_cache {
        CacheMode::Refresh
    } else {
        CacheMode::Use
    }
}

fn max_age(site: &Site, args: &CacheArgs) -> Option<Duration> {
    args.max_age.map(Duration::from_secs).or(site.config.max_age())
}
