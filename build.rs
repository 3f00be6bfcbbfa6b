//! Build script generating the `labstack` man pages.
//!
//! One page is rendered for the top-level command and one per subcommand
//! (`labstack-launch.1` and so on) into the build output directory.

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

use cli::Cli;

fn render(command: clap::Command, out_dir: &Path, file_name: &str) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    Man::new(command).render(&mut buffer)?;
    File::create(out_dir.join(file_name))?.write_all(&buffer)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout();
    writeln!(stdout, "cargo:rerun-if-changed=build.rs")?;
    writeln!(stdout, "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "OUT_DIR was not set")
    })?);

    let command = Cli::command();
    for subcommand in command.get_subcommands() {
        let name = format!("labstack-{}", subcommand.get_name());
        let page = subcommand.clone().name(name.clone());
        render(page, &out_dir, &format!("{name}.1"))?;
    }
    render(command, &out_dir, "labstack.1")?;

    Ok(())
}
