// SPDX-License-Identifier: AGPL-3.0-or-later
// VecLab - Named Vector Data Engine
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! VecLab CLI
//!
//! Command-line driver for the vector engine.
//!
//! ## Usage
//!
//! ```bash
//! # Evaluate an expression over command-line vectors
//! veclab expr --set x=1,2,3 --set y=10,20,30 "x * 2 + y"
//!
//! # Read raw doubles from a file
//! veclab binread samples.f64 --format r8 --count 1000
//!
//! # Reducer table for a vector
//! veclab stats --set x=2,4,4,4,5,5,7,9
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use veclab_client::{BinaryFormat, BinaryReadOptions, VectorOps};
use veclab_core::VectorRegistry;
use veclab_query::{Evaluator, FUNCTIONS, FunctionKind};
use veclab_tools::{VectorDef, format_values, load_config};

/// VecLab - named vector data engine
#[derive(Parser)]
#[command(name = "veclab")]
#[command(about = "Evaluate vector expressions and import binary data")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine configuration (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a vector expression
    Expr {
        /// Vector definition, name=v1,v2,...
        #[arg(short, long = "set")]
        set: Vec<VectorDef>,

        /// Store the result in this vector and print its name
        #[arg(long)]
        into: Option<String>,

        /// Expression to evaluate
        expression: String,
    },

    /// Read fixed-width binary records into a vector
    Binread {
        /// Input file
        file: PathBuf,

        /// Record format: i1, i2, i4, i8, u1, u2, u4, u8, r4, r8
        #[arg(short, long, default_value = "r8")]
        format: BinaryFormat,

        /// Reverse the byte order of each record
        #[arg(long)]
        swap: bool,

        /// Number of records to read (0 = to end of file)
        #[arg(long, default_value = "0")]
        count: usize,

        /// Print the values as well as the summary
        #[arg(long)]
        values: bool,
    },

    /// Print the reducer table for each vector
    Stats {
        /// Vector definition, name=v1,v2,...
        #[arg(short, long = "set", required = true)]
        set: Vec<VectorDef>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "engine configuration");
    let registry = VectorRegistry::new(config);

    match cli.command {
        Commands::Expr {
            set,
            into,
            expression,
        } => run_expr(&registry, &set, into.as_deref(), &expression),
        Commands::Binread {
            file,
            format,
            swap,
            count,
            values,
        } => run_binread(&registry, file, format, swap, count, values),
        Commands::Stats { set } => run_stats(&registry, &set),
    }
}

fn define_all(registry: &VectorRegistry, defs: &[VectorDef]) -> Result<()> {
    for def in defs {
        def.define(registry)?;
    }
    registry.run_idle();
    Ok(())
}

fn run_expr(
    registry: &VectorRegistry,
    defs: &[VectorDef],
    into: Option<&str>,
    expression: &str,
) -> Result<()> {
    define_all(registry, defs)?;
    let evaluator = Evaluator::new(registry);

    match into {
        Some(name) => {
            let (dest, _) = registry
                .create(name)
                .with_context(|| format!("failed to create vector \"{name}\""))?;
            evaluator
                .evaluate_into(expression, &dest)
                .with_context(|| format!("failed to evaluate \"{expression}\""))?;
            registry.run_idle();
            println!("{} = {}", dest.name(), format_values(&dest.values()));
        }
        None => {
            let values = evaluator
                .evaluate(expression)
                .with_context(|| format!("failed to evaluate \"{expression}\""))?;
            println!("{}", format_values(&values));
        }
    }
    Ok(())
}

fn run_binread(
    registry: &VectorRegistry,
    file: PathBuf,
    format: BinaryFormat,
    swap: bool,
    count: usize,
    print_values: bool,
) -> Result<()> {
    let ops = VectorOps::new(registry);
    let (vector, _) = registry.create("data")?;
    let mut reader = BufReader::new(
        File::open(&file).with_context(|| format!("failed to open {}", file.display()))?,
    );

    let options = BinaryReadOptions::new(format).swap(swap).count(count);
    let read = ops
        .binary_read(&vector, &mut reader, &options)
        .with_context(|| format!("failed to read {}", file.display()))?;
    registry.run_idle();

    let (min, max) = {
        let mut guard = vector.write();
        let store = guard.store_mut();
        (store.min(), store.max())
    };
    info!(file = %file.display(), records = read, "import complete");
    println!("count {read}");
    println!("min   {min}");
    println!("max   {max}");
    if print_values {
        println!("{}", format_values(&vector.values()));
    }
    Ok(())
}

fn run_stats(registry: &VectorRegistry, defs: &[VectorDef]) -> Result<()> {
    define_all(registry, defs)?;

    for def in defs {
        let values = registry.lookup(&def.name)?.values();
        println!("{}", def.name);
        for function in FUNCTIONS {
            if let FunctionKind::Scalar(reduce) = function.kind {
                println!("  {:<10} {}", function.name, reduce(&values));
            }
        }
    }
    Ok(())
}
