#![forbid(unsafe_code)]

use clap::{CommandFactory, Parser};
use log::error;
use std::path::PathBuf;

use xmma_archive::{pack_dot1, unpack_dot1, Action, ArchiveResult, Workspace, DOT1_SIDE_EXT};

#[derive(Debug, Parser)]
#[command(
    name = "xmma-dot",
    version,
    about = "X-Men Mutant Academy DOT1 extractor/packer",
    long_about = "Pass any DOT1 archive to extract it into ./DOTdata with a <name>.dhed index,\n\
                  or a .dhed index to pack ./DOTdata back into ./Dot1_new.dot."
)]
struct Cli {
    /// DOT1 archive to extract, or `.dhed` index to pack back.
    path: Option<PathBuf>,
}

fn run(path: PathBuf) -> ArchiveResult<()> {
    let ws = Workspace::current()?;
    match Action::detect(&path, DOT1_SIDE_EXT) {
        Action::Unpack => unpack_dot1(&path, &ws).map(|_| ()),
        Action::Pack => pack_dot1(&path, &ws).map(|_| ()),
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
