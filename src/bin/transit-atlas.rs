// Copyright (C) 2017 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use structopt::clap::ErrorKind;
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    layer::SubscriberExt as _,
    util::SubscriberInitExt as _,
};
use transit_atlas::{input, Catalog, Result};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "transit-atlas",
    about = "Build a binary transit base and answer stat requests over it."
)]
enum Opt {
    /// Build the base from a JSON description and persist it.
    #[structopt(name = "make_base")]
    MakeBase {
        /// Input document; stdin when absent.
        #[structopt(parse(from_os_str))]
        input: Option<PathBuf>,
    },
    /// Load the base and answer stat requests.
    #[structopt(name = "process_requests")]
    ProcessRequests {
        /// Input document; stdin when absent.
        #[structopt(parse(from_os_str))]
        input: Option<PathBuf>,
    },
}

fn init_logger() {
    let default_level = LevelFilter::INFO;
    let rust_log =
        std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| default_level.to_string());
    let env_filter_subscriber = EnvFilter::try_new(rust_log).unwrap_or_else(|e| {
        eprintln!(
            "invalid {}, falling back to level '{}' - {}",
            EnvFilter::DEFAULT_ENV,
            default_level,
            e,
        );
        EnvFilter::new(default_level.to_string())
    });
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(env_filter_subscriber)
        .init();
}

fn open_input(path: Option<PathBuf>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) => Ok(Box::new(File::open(path)?)),
        None => Ok(Box::new(io::stdin())),
    }
}

fn run(opt: Opt) -> Result<()> {
    match opt {
        Opt::MakeBase { input } => {
            info!("Launching make_base...");
            let base = input::read_base_input(open_input(input)?)?;
            let output = base.serialization_settings.file.clone();
            let catalog = Catalog::from_base_input(base)?;
            catalog.save(&output)?;
        }
        Opt::ProcessRequests { input } => {
            info!("Launching process_requests...");
            let stat = input::read_stat_input(open_input(input)?)?;
            let mut catalog = Catalog::load(&stat.serialization_settings.file)?;
            let responses = catalog.process(stat.stat_requests)?;
            let stdout = io::stdout();
            let mut stdout = stdout.lock();
            serde_json::to_writer(&mut stdout, &responses)?;
            writeln!(&mut stdout)?;
        }
    }
    Ok(())
}

fn main() {
    init_logger();
    let opt = match Opt::from_iter_safe(std::env::args()) {
        Ok(opt) => opt,
        Err(error) => match error.kind {
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => {
                println!("{}", error.message);
                std::process::exit(0);
            }
            _ => {
                eprintln!("{}", error.message);
                std::process::exit(5);
            }
        },
    };
    if let Err(err) = run(opt) {
        for cause in err.chain() {
            eprintln!("{}", cause);
        }
        std::process::exit(1);
    }
}
