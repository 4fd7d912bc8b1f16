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

//! # Configuration Pass
//!
//! A configuration pass takes a topology and a configuration, and computes the entire
//! configuration of the network at once:
//!
//! 1. The topology is cloned, and all stream tables of a previous pass are cleared.
//! 2. Source, destinations and destination address of every stream are resolved.
//! 3. The trees of every stream are either parsed from the configuration, or enumerated and
//!    selected such that all failure protection requirements are satisfied.
//! 4. The stream redundancy tables are computed for all streams, in configuration order.
//! 5. If gate scheduling is configured, the gate schedule is computed from the path fragments of
//!    all streams with traffic parameters.
//! 6. The static MAC address tables are computed.
//!
//! Any error aborts the pass, and no output is produced.

use crate::config::{ConfigError, Configuration, StreamConfig};
use crate::error::{Error, Infeasibility};
use crate::gate_scheduling::{self, Application, Input, Output as ScheduleOutput};
use crate::mac_table::static_mac_tables;
use crate::output::ConfigurationOutput;
use crate::protection::{
    check_link_failure_protection, check_node_failure_protection, reached_nodes,
};
use crate::redundancy::{path_fragments, RedundantStream, StreamRedundancyConfigurator};
use crate::selector::select_best_tree_subset;
use crate::topology::{NodeId, Topology};
use crate::trees::{collect_all_trees, Tree};

use log::*;
use std::collections::HashSet;
use std::time::Duration;

/// Run a full configuration pass. The topology is not modified.
///
/// ```
/// use tsnconf::config::{Configuration, StreamConfig};
/// use tsnconf::topology::{NamePattern, Topology};
///
/// let mut t = Topology::new();
/// let s = t.add_device("S");
/// let a = t.add_switch("A");
/// let d = t.add_device("D");
/// t.add_link(s, a);
/// t.add_link(a, d);
///
/// let mut config = Configuration::default();
/// config.streams.push(StreamConfig::new("s1", "S", "D".parse::<NamePattern>().unwrap()));
///
/// let output = tsnconf::configure(&t, &config).unwrap();
/// assert_eq!(output.trees["s1"], vec![vec![vec!["S", "A", "D"]]]);
/// assert_eq!(output.node("A").unwrap().stream_encodings[0].vlan, 0);
/// ```
pub fn configure(topology: &Topology, config: &Configuration) -> Result<ConfigurationOutput, Error> {
    let pass = Pass::prepare(topology, config)?;

    let schedule = match pass.input.as_ref() {
        Some(input) => {
            let timeout = config
                .gate_scheduling
                .as_ref()
                .and_then(|g| g.solver_timeout)
                .map(|t| Duration::from_secs_f64(t.value()));
            gate_scheduling::compute_schedule(input, timeout)?
        }
        None => ScheduleOutput::default(),
    };

    let static_tables = static_mac_tables(&pass.topology);
    let output = ConfigurationOutput::collect(&pass.topology, &pass.trees, &schedule, &static_tables);
    info!(
        "Configured {} streams on {} nodes ({} gate schedules)",
        pass.trees.len(),
        output.nodes.len(),
        schedule.schedules.len()
    );
    Ok(output)
}

/// Run the configuration pass up to the gate scheduling, and return the scheduling problem as an
/// SMT-LIB 2 script. Returns `None` if gate scheduling is not configured.
pub fn export_smtlib(topology: &Topology, config: &Configuration) -> Result<Option<String>, Error> {
    match Pass::prepare(topology, config)?.input {
        Some(input) => Ok(Some(gate_scheduling::export_smtlib(&input)?)),
        None => Ok(None),
    }
}

/// Stream with all names resolved in the topology.
#[derive(Debug, Clone)]
struct ResolvedStream<'c> {
    config: &'c StreamConfig,
    source: NodeId,
    destinations: Vec<NodeId>,
    destination_address: String,
}

/// State of a pass before the gate schedule is computed
struct Pass {
    topology: Topology,
    trees: Vec<(String, Vec<Tree>)>,
    input: Option<Input>,
}

impl Pass {
    fn prepare(topology: &Topology, config: &Configuration) -> Result<Self, Error> {
        config.validate()?;
        let mut topology = topology.clone();
        topology.clear_stream_configuration();

        let streams = config
            .streams
            .iter()
            .map(|s| resolve_stream(&topology, s))
            .collect::<Result<Vec<_>, _>>()?;

        let mut trees = Vec::with_capacity(streams.len());
        for stream in streams.iter() {
            trees.push((stream.config.name.clone(), stream_trees(&topology, stream)?));
        }

        let mut redundancy = StreamRedundancyConfigurator::new(config.min_vlan_id, config.max_vlan_id);
        for (stream, (_, trees)) in streams.iter().zip(trees.iter()) {
            redundancy.configure_stream(
                &mut topology,
                &RedundantStream {
                    name: stream.config.name.clone(),
                    packet_filter: stream.config.packet_filter.clone(),
                    packet_data_filter: stream.config.packet_data_filter.clone(),
                    source: stream.source,
                    destination_address: stream.destination_address.clone(),
                    trees: trees.clone(),
                },
            )?;
        }

        let input = match config.gate_scheduling.as_ref() {
            Some(gs) => {
                let mut input = Input::from_config(gs);
                for (stream, (_, trees)) in streams.iter().zip(trees.iter()) {
                    add_flow(&topology, &mut input, stream, trees)?;
                }
                Some(input)
            }
            None => None,
        };

        Ok(Self { topology, trees, input })
    }
}

fn resolve_stream<'c>(
    topology: &Topology,
    config: &'c StreamConfig,
) -> Result<ResolvedStream<'c>, ConfigError> {
    let source = topology.get_node_id(&config.source).map_err(|_| ConfigError::UnknownNode {
        stream: config.name.clone(),
        node: config.source.clone(),
    })?;
    if topology.node(source).is_switch() {
        return Err(ConfigError::SourceNotADevice {
            stream: config.name.clone(),
            node: config.source.clone(),
        });
    }
    let destinations: Vec<NodeId> = topology
        .node_ids()
        .filter(|n| *n != source && !topology.node(*n).is_switch())
        .filter(|n| config.destination.matches(topology.node_name(*n)))
        .collect();
    let first = destinations.first().ok_or_else(|| ConfigError::NoDestination(config.name.clone()))?;
    let destination_address = config
        .destination_address
        .clone()
        .unwrap_or_else(|| topology.node_name(*first).to_string());
    debug!(
        "Stream {} from {} to [{}] (address {})",
        config.name,
        config.source,
        destinations.iter().map(|d| topology.node_name(*d)).collect::<Vec<_>>().join(", "),
        destination_address
    );
    Ok(ResolvedStream { config, source, destinations, destination_address })
}

/// Returns the configured trees of the stream, or selects the best subset of all candidate trees.
fn stream_trees(topology: &Topology, stream: &ResolvedStream<'_>) -> Result<Vec<Tree>, Error> {
    let name = &stream.config.name;
    if let Some(configured) = stream.config.trees.as_ref() {
        let trees = configured
            .iter()
            .map(|t| Tree::from_names(topology, t))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::InvalidTree { stream: name.clone(), reason: e.to_string() })?;
        for tree in trees.iter() {
            let reached =
                reached_nodes(topology, stream.source, &[tree.clone()], &HashSet::new(), &HashSet::new());
            if let Some(d) = stream.destinations.iter().find(|d| !reached.contains(d)) {
                return Err(ConfigError::InvalidTree {
                    stream: name.clone(),
                    reason: format!("destination {} is not reached", topology.node_name(*d)),
                }
                .into());
            }
        }
        let config = stream.config;
        check_node_failure_protection(
            topology,
            stream.source,
            &stream.destinations,
            &trees,
            &config.node_failure_protection,
        )
        .and_then(|_| {
            check_link_failure_protection(
                topology,
                stream.source,
                &stream.destinations,
                &trees,
                &config.link_failure_protection,
            )
        })
        .map_err(|f| ConfigError::InvalidTree {
            stream: name.clone(),
            reason: format!("the trees are not protected against {}", f),
        })?;
        debug!("Stream {} uses {} configured trees", name, trees.len());
        return Ok(trees);
    }

    let candidates = collect_all_trees(topology, stream.source, &stream.destinations);
    if candidates.is_empty() {
        let destination = stream
            .destinations
            .iter()
            .find(|d| collect_all_trees(topology, stream.source, &[**d]).is_empty())
            .or_else(|| stream.destinations.first())
            .map(|d| topology.node_name(*d).to_string())
            .unwrap_or_default();
        return Err(Infeasibility::Unreachable { stream: name.clone(), destination }.into());
    }
    let selected = select_best_tree_subset(
        topology,
        name,
        stream.source,
        &stream.destinations,
        &candidates,
        stream.config.max_redundancy,
        &stream.config.node_failure_protection,
        &stream.config.link_failure_protection,
    )?;
    debug!("Stream {}: selected {} of {} trees", name, selected.len(), candidates.len());
    Ok(selected)
}

/// Add the stream as a flow of its application, if it carries traffic parameters.
fn add_flow(
    topology: &Topology,
    input: &mut Input,
    stream: &ResolvedStream<'_>,
    trees: &[Tree],
) -> Result<(), Error> {
    let config = stream.config;
    let (packet_length, packet_interval) = match (config.packet_length, config.packet_interval) {
        (Some(l), Some(i)) => (l.value(), i.value()),
        _ => {
            debug!("Stream {} has no traffic parameters and is not scheduled", config.name);
            return Ok(());
        }
    };
    let app = input.add_application(Application {
        name: config.application_name(),
        device: stream.source,
        device_name: config.source.clone(),
        priority: config.priority,
        packet_length,
        packet_interval,
        max_latency: config.max_latency.map(|l| l.value()),
    })?;
    let fragments = path_fragments(topology, &config.name, trees);
    trace!("Stream {} is scheduled over {} path fragments", config.name, fragments.len());
    input.add_flow(topology, config.name.clone(), app, fragments);
    Ok(())
}
