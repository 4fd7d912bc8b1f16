// TsnConf: Gate Scheduling and Stream Redundancy Configuration for TSN
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use tsnconf::config::Configuration;
use tsnconf::example_networks;
use tsnconf::output::ConfigurationOutput;
use tsnconf::printer;
use tsnconf::topology::Topology;
use tsnconf::{configure, export_smtlib};

use clap::{Parser, Subcommand, ValueEnum};
use log::*;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn Error>> {
    // run clap
    let args = CommandLineArguments::parse();

    // initialize the env logger
    pretty_env_logger::init();

    let (topology, config) = match args.cmd {
        MainCommand::Configure { topology, config } => {
            info!("Reading the topology from {}", topology.display());
            let topology = Topology::from_file(&topology)?;
            info!("Reading the configuration from {}", config.display());
            let config = Configuration::from_file(&config)?;
            (topology, config)
        }
        MainCommand::Example { network } => {
            let name = network.name();
            info!("Using the example network {}", name);
            example_networks::by_name(name).ok_or_else(|| format!("Unknown network {}", name))??
        }
    };

    if let Some(path) = args.smtlib.as_ref() {
        match export_smtlib(&topology, &config)? {
            Some(script) => {
                fs::write(path, script)?;
                info!("Gate scheduling problem written to {}", path.display());
            }
            None => warn!("Gate scheduling is not configured, nothing to export"),
        }
    }

    let output = match configure(&topology, &config) {
        Ok(output) => output,
        Err(e) => {
            if e.is_infeasible() {
                error!("No configuration satisfies all requirements");
            }
            return Err(e.into());
        }
    };

    write_output(&output, args.output, args.json)
}

fn write_output(
    output: &ConfigurationOutput,
    path: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    if json {
        println!("{}", output.to_json()?);
    } else {
        println!("{}", printer::output(output));
    }
    if let Some(path) = path {
        fs::write(&path, output.to_json()?)?;
        info!("Configuration written to {}", path.display());
    }
    Ok(())
}

/// Computes the stream redundancy tables, MAC address tables and gate schedules of a TSN network,
/// and prints them (or writes them as JSON).
#[derive(Parser, Debug)]
#[clap(name = "tsnconf", author = "Tibor Schneider")]
struct CommandLineArguments {
    /// Network to configure
    #[clap(subcommand)]
    cmd: MainCommand,
    /// Write the configuration as JSON to this file
    #[clap(short = 'o', long, global = true)]
    output: Option<PathBuf>,
    /// Print JSON instead of the human-readable summary
    #[clap(short = 'j', long, global = true)]
    json: bool,
    /// Write the gate scheduling problem as an SMT-LIB 2 script to this file
    #[clap(long, global = true)]
    smtlib: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum MainCommand {
    /// Configure the network described in a file
    #[clap(name = "configure")]
    Configure {
        /// JSON file with the topology description
        #[clap(short = 't', long)]
        topology: PathBuf,
        /// JSON file with the configuration of all streams
        #[clap(short = 'c', long)]
        config: PathBuf,
    },
    /// Configure one of the example networks
    #[clap(name = "example")]
    Example {
        /// Example network to use
        #[clap(value_enum)]
        network: ExampleNetworkName,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ExampleNetworkName {
    /// Single stream over a chain of two switches
    Line,
    /// Stream protected against a switch failure in a ring
    Ring,
    /// Two streams over a diamond, each on a single tree
    Diamond,
    /// Multicast stream protected against link failures
    Ladder,
}

impl ExampleNetworkName {
    fn name(&self) -> &'static str {
        match self {
            Self::Line => example_networks::EXAMPLE_NETWORKS[0],
            Self::Ring => example_networks::EXAMPLE_NETWORKS[1],
            Self::Diamond => example_networks::EXAMPLE_NETWORKS[2],
            Self::Ladder => example_networks::EXAMPLE_NETWORKS[3],
        }
    }
}
