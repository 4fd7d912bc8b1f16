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

//! Per-node stream configuration records

use crate::topology::PortId;
use std::collections::BTreeSet;

/// Maps frames matching the packet filter (and the optional data filter) to the stream. Only
/// configured on the source of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamIdentification {
    /// Filter expression selecting the frames
    pub packet_filter: String,
    /// Filter expression on the frame payload
    pub packet_data_filter: Option<String>,
    /// Name of the stream
    pub stream: String,
}

/// Maps frames received on the port with the VLAN id to the named (member) stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDecoding {
    /// Port on which the frames are received
    pub port: PortId,
    /// VLAN id assigned by the sender
    pub vlan: u16,
    /// Name of the decoded stream
    pub stream: String,
}

/// Eliminates duplicates of several member streams, merging them into one output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMerging {
    /// Member streams, one per sender
    pub input_streams: Vec<String>,
    /// Merged stream
    pub output_stream: String,
}

/// Replicates a stream into several member streams, one per distinct set of receivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSplitting {
    /// Stream which is replicated
    pub input_stream: String,
    /// Member streams
    pub output_streams: Vec<String>,
}

/// Encodes the named stream with the VLAN id, and sends it over the port towards the destination
/// address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEncoding {
    /// Name of the encoded (member) stream
    pub stream: String,
    /// Port over which the frames are sent
    pub port: PortId,
    /// Assigned VLAN id
    pub vlan: u16,
    /// Destination address of the stream
    pub destination: String,
}

/// Stream configuration owned by a single network node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeStreamConfig {
    /// Stream identification
    pub identifications: Vec<StreamIdentification>,
    /// Stream decoding
    pub decodings: Vec<StreamDecoding>,
    /// Stream merging
    pub mergings: Vec<StreamMerging>,
    /// Stream splitting
    pub splittings: Vec<StreamSplitting>,
    /// Stream encoding
    pub encodings: Vec<StreamEncoding>,
}

impl NodeStreamConfig {
    /// Remove all records
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Returns true if no record is stored.
    pub fn is_empty(&self) -> bool {
        self.identifications.is_empty()
            && self.decodings.is_empty()
            && self.mergings.is_empty()
            && self.splittings.is_empty()
            && self.encodings.is_empty()
    }

    /// Returns true if the node merges member streams into the stream.
    pub fn is_merging(&self, stream: &str) -> bool {
        self.mergings.iter().any(|m| m.output_stream == stream)
    }

    /// Returns true if the node splits the stream.
    pub fn is_splitting(&self, stream: &str) -> bool {
        self.splittings.iter().any(|s| s.input_stream == stream)
    }

    /// Returns the VLAN ids accepted by the node (all decoded VLAN ids), sorted and unique.
    pub fn vlan_filter(&self) -> Vec<u16> {
        self.decodings.iter().map(|d| d.vlan).collect::<BTreeSet<u16>>().into_iter().collect()
    }
}
