#![forbid(unsafe_code)]

use clap::{CommandFactory, Parser};
use log::error;
use std::path::PathBuf;

use xmma_archive::{pack_wad, unpack_wad, Action, ArchiveResult, Workspace, WAD_SIDE_EXT};

#[derive(Debug, Parser)]
#[command(
    name = "xmma-wad",
    version,
    about = "X-Men Mutant Academy WAD (PWF) extractor/packer",
    long_about = "Pass a WAD archive to extract it into ./WADdata with its header block in ./wadhead.hed,\n\
                  or wadhead.hed to pack ./WADdata back into ./WADnew.WAD."
)]
struct Cli {
    /// WAD archive to extract, or `.hed` header block to pack back.
    path: Option<PathBuf>,
}

fn run(path: PathBuf) -> ArchiveResult<()> {
    let ws = Workspace::current()?;
    match Action::detect(&path, WAD_SIDE_EXT) {
        Action::Unpack => unpack_wad(&path, &ws).map(|_| ()),
        Action::Pack => pack_wad(&path, &ws).map(|_| ()),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let Some(path) = cli.path else {
        let _ = Cli::command().print_help();
        return;
    };

    // Only a bad magic yields a failing exit code; other errors are reported
    // and the process still exits 0.
    if let Err(e) = run(path) {
        error!("{e}");
        if e.is_bad_magic() {
            std::process::exit(1);
        }
    }
}
