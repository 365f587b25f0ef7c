use std::collections::BTreeMap;

use support::net::port_from_i64;

use crate::{
    config::{RawConfig, RawNode},
    errors::PlatformError,
};

/// One node of the cluster, as declared in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub hostname: String,
    pub trogdor_agent_port: Option<u16>,
    pub trogdor_coordinator_port: Option<u16>,
    pub tags: Vec<String>,
}

/// The cluster topology: a read-only directory of nodes by name.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    name_to_node: BTreeMap<String, Node>,
}

impl Topology {
    pub fn new(name_to_node: BTreeMap<String, Node>) -> Self {
        Self { name_to_node }
    }

    pub fn from_config(config: &RawConfig) -> Result<Self, PlatformError> {
        let nodes = config
            .nodes
            .as_ref()
            .ok_or_else(|| PlatformError::Config("no 'nodes' stanza was defined".to_owned()))?;
        let mut name_to_node = BTreeMap::new();
        for (name, raw) in nodes {
            name_to_node.insert(name.clone(), Self::build_node(name, raw)?);
        }
        Ok(Self { name_to_node })
    }

    fn build_node(name: &str, raw: &RawNode) -> Result<Node, PlatformError> {
        let hostname = raw.hostname.clone().ok_or_else(|| {
            PlatformError::Config(format!("no 'hostname' given for node '{name}'"))
        })?;
        Ok(Node {
            name: name.to_owned(),
            hostname,
            trogdor_agent_port: Self::validate_port(name, raw.trogdor_agent_port)?,
            trogdor_coordinator_port: Self::validate_port(name, raw.trogdor_coordinator_port)?,
            tags: raw.tags.clone().unwrap_or_default(),
        })
    }

    fn validate_port(node: &str, value: Option<i64>) -> Result<Option<u16>, PlatformError> {
        value
            .map(|value| {
                port_from_i64(value).map_err(|_| PlatformError::Port {
                    node: node.to_owned(),
                    value,
                })
            })
            .transpose()
    }

    /// All node names, sorted.
    pub fn node_names(&self) -> Vec<&str> {
        self.name_to_node.keys().map(String::as_str).collect()
    }

    pub fn get_node(&self, name: &str) -> Option<&Node> {
        self.name_to_node.get(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.name_to_node.values()
    }

    pub fn len(&self) -> usize {
        self.name_to_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_node.is_empty()
    }
}
