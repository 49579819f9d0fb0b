use std::io;
use std::path::PathBuf;

use gitmeta::config::Config;
use gitmeta::git::GitRepository;
use gitmeta::goals::GitMetadata;
use gitmeta::properties::{Prefixed, PropertyFormat, PropertySink, WriterSink};
use gitmeta::revision;

/// Inject `GIT_COMMIT`, `GIT_BRANCH`, `GIT_TAG_NAME` and `GIT_TAG_DESCRIBE`
/// as compile-time environment variables. Outside a repository they are empty.
pub fn emit_git_metadata() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../build/shared_git_metadata.rs");

    let config = Config {
        git_dir: PathBuf::from(".."),
        ..Config::default()
    };
    let repo = GitRepository::open(&config.git_dir).ok();

    if let Some(repo) = &repo {
        // HEAD moves on commit and checkout, refs and packed-refs on tagging.
        ["HEAD", "refs", "packed-refs"]
            .iter()
            .map(|name| repo.path().join(name))
            .filter(|path| path.exists())
            .for_each(|path| println!("cargo:rerun-if-changed={}", path.display()));
    }

    let commit = repo
        .as_ref()
        .and_then(|r| revision::resolve(r, &config.head).ok())
        .map(|id| id.to_hex())
        .unwrap_or_default();
    let meta = repo
        .as_ref()
        .and_then(|r| GitMetadata::collect(r, &config.head).ok())
        .unwrap_or_default();

    if let Err(e) = publish(&commit, &meta) {
        println!("cargo:warning=could not emit git metadata: {e}");
    }
}

fn publish(commit: &str, meta: &GitMetadata) -> gitmeta::Result<()> {
    let prefixes = ["git".to_string()];
    let mut sink = WriterSink::new(io::stdout(), PropertyFormat::Cargo);
    let mut props = Prefixed::new(&mut sink, &prefixes);
    props.set_property("commit", commit)?;
    meta.publish(&mut props)?;
    sink.finish()?;
    Ok(())
}
