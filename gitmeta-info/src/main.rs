use std::io;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use gitmeta::config::Config;
use gitmeta::git::GitRepository;
use gitmeta::goals::GitMetadata;
use gitmeta::properties::{Prefixed, PropertyFormat, WriterSink};
use gitmeta::version::BuildInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// prefix.key=value lines
    Properties,
    /// Unprefixed JSON object
    Json,
    /// cargo:rustc-env directives for build scripts
    Cargo,
}

#[derive(Parser)]
#[command(
    name = "gitmeta-info",
    about = "Print branch and nearest-tag properties for a Git repository"
)]
struct Args {
    /// Directory inside the repository
    #[arg(long = "git-dir", env = "GITMETA_GIT_DIR")]
    git_dir: Option<PathBuf>,

    /// Directory inside the repository (positional, takes precedence over --git-dir)
    dir: Option<PathBuf>,

    /// Commit to describe, e.g. HEAD, HEAD~2, v1.0^2
    #[arg(long, env = "GITMETA_HEAD", default_value = "HEAD")]
    head: String,

    /// Property name prefix; repeat for several. Replaces the defaults (gitmeta, git)
    #[arg(short = 'p', long = "prefix")]
    prefixes: Vec<String>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = Format::Properties)]
    format: Format,

    /// Print JSON schema for the json output format and exit
    #[arg(long)]
    schema: bool,

    /// Display version and quit
    #[arg(long)]
    version: bool,
}

impl Args {
    fn config(&self) -> Config {
        let defaults = Config::default();
        Config {
            git_dir: self
                .dir
                .clone()
                .or_else(|| self.git_dir.clone())
                .unwrap_or(defaults.git_dir),
            head: self.head.clone(),
            prefixes: if self.prefixes.is_empty() {
                defaults.prefixes
            } else {
                self.prefixes.clone()
            },
        }
    }
}

fn main() {
    // Reset SIGPIPE to default so piped output (e.g. head/grep -m) exits cleanly
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.version {
        let info = BuildInfo {
            tool: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            authors: env!("CARGO_PKG_AUTHORS"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            describe: env!("GIT_TAG_DESCRIBE"),
            branch: env!("GIT_BRANCH"),
            commit: env!("GIT_COMMIT"),
        };
        print!("{info}");
        return Ok(());
    }

    if args.schema {
        let schema = schemars::schema_for!(GitMetadata);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let config = args.config();
    config.validate()?;

    let repo = GitRepository::open(&config.git_dir)?;
    log::debug!("Describing {} in {}", config.head, repo.path().display());
    let meta = GitMetadata::collect(&repo, &config.head)?;

    let format = match args.format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&meta)?);
            return Ok(());
        }
        Format::Properties => PropertyFormat::Properties,
        Format::Cargo => PropertyFormat::Cargo,
    };

    let mut sink = WriterSink::new(io::stdout().lock(), format);
    meta.publish(&mut Prefixed::new(&mut sink, &config.prefixes))?;
    sink.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["gitmeta-info"]).unwrap();
        let config = args.config();
        assert_eq!(config.git_dir, PathBuf::from("."));
        assert_eq!(config.prefixes, vec!["gitmeta", "git"]);
        assert_eq!(args.format, Format::Properties);
    }

    #[test]
    fn test_prefixes_replace_defaults() {
        let args =
            Args::try_parse_from(["gitmeta-info", "-p", "app", "--prefix", "build", "--head", "HEAD~1"])
                .unwrap();
        let config = args.config();
        assert_eq!(config.prefixes, vec!["app", "build"]);
        assert_eq!(config.head, "HEAD~1");
    }

    #[test]
    fn test_positional_dir_wins() {
        let args = Args::try_parse_from(["gitmeta-info", "--git-dir", "/a", "/b", "-f", "json"])
            .unwrap();
        assert_eq!(args.config().git_dir, PathBuf::from("/b"));
        assert_eq!(args.format, Format::Json);
    }
}
