/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use anyhow::{Context, Result};
use cicasm::emit;
use cicasm::errors::AssemblyError;
use cicasm::file_reader::AsmFileReader;
use cicasm::program::Mode;
use clap::Parser;
use log::{error, info, warn};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[clap(version = "0.3.4", author = "Connor Nolan")]
struct Cli {
    /// Assembly source file.
    input: PathBuf,

    /// Base path for output artifacts; defaults to the input file stem.
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Write `<base>.hex` (the default if no artifact flag is given).
    #[clap(long)]
    hex: bool,

    /// Write `<base>.lst`.
    #[clap(long)]
    lst: bool,

    /// Write `<base>.map.json`.
    #[clap(long)]
    map: bool,

    /// Enable --hex, --lst, and --map together.
    #[clap(long)]
    all: bool,

    /// Print the opcode control-word table to stdout and exit without assembling.
    #[clap(long)]
    dump_control_words: bool,

    /// Raise the log filter from info to debug.
    #[clap(short, long)]
    verbose: bool,
}

fn main() {
    if let Err(err) = run() {
        match err.chain().find_map(|cause| cause.downcast_ref::<AssemblyError>()) {
            Some(asm_err) => match asm_err.line() {
                Some(line) => error!("line {line}: {asm_err}"),
                None => error!("{asm_err}"),
            },
            None => error!("{err:#}"),
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if cli.dump_control_words {
        print!("{}", emit::control_words::emit());
        return Ok(());
    }

    let base = cli.output.clone().unwrap_or_else(|| {
        let mut stem = cli.input.clone();
        stem.set_extension("");
        stem
    });

    let reader = AsmFileReader;
    let mut program = cicasm::assemble(&cli.input, &reader)
        .with_context(|| format!("Failed to assemble {}", cli.input.display()))?;

    let (want_hex, want_lst, want_map) = if cli.all {
        (true, true, true)
    } else if cli.hex || cli.lst || cli.map {
        (cli.hex, cli.lst, cli.map)
    } else {
        (true, false, false)
    };

    if want_hex {
        let path = base.with_extension("hex");
        let contents = emit::hex::emit(&mut program).context("Failed during hex generation")?;
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("wrote {}", path.display());
    }

    if want_lst {
        let path = base.with_extension("lst");
        let contents = emit::listing::emit(&mut program).context("Failed during listing generation")?;
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("wrote {}", path.display());
    }

    if want_map {
        let path = base.with_extension("map.json");
        let contents = emit::map::emit(&program).context("Failed during map generation")?;
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("wrote {}", path.display());
    }

    if program.mode() == Mode::Harvard {
        warn!(
            "program never switched to Von-Neumann mode via `.dorg`; any `.word`/`.long`/`.words` \
             only registered addresses, no initializer code was generated"
        );
    }

    Ok(())
}
