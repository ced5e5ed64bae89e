//! Loads the knowledge graph (nodes, parameters, risks, risk edges,
//! actions) from YAML fixture directories into a fresh `InMemoryStore`.
//! Stands in for the external CSV-bootstrap collaborator the core crate
//! never depends on directly.

use anyhow::{Context, Result};
use lss_core::store::InMemoryStore;
use lss_schemas::file_formats::{ActionFile, EdgeFile, NodeFile, ParameterFile, RiskEdgeFile, RiskFile};
use std::{fs, path::Path};

/// Loads every YAML file under `base_path` into `store`. Layout mirrors
/// the nine persisted tables: one directory per entity kind.
pub fn load(store: &InMemoryStore, base_path: &str) -> Result<()> {
    println!("Loading knowledge base from '{}'...", base_path);

    load_nodes(store, Path::new(base_path).join("1_nodes"))?;
    load_edges(store, Path::new(base_path).join("2_edges"))?;
    load_parameters(store, Path::new(base_path).join("3_parameters"))?;
    load_risks(store, Path::new(base_path).join("4_risks"))?;
    load_risk_edges(store, Path::new(base_path).join("5_risk_edges"))?;
    load_actions(store, Path::new(base_path).join("6_actions"))?;

    println!("Knowledge base loaded successfully.");
    Ok(())
}

fn read_yaml_files<P: AsRef<Path>>(dir_path: P) -> Result<Vec<String>> {
    let mut contents = Vec::new();
    for entry in fs::read_dir(dir_path.as_ref())
        .with_context(|| format!("Failed to read directory: {:?}", dir_path.as_ref()))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().map_or(false, |s| s == "yaml" || s == "yml") {
            contents.push(fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?);
        }
    }
    Ok(contents)
}

fn load_nodes(store: &InMemoryStore, dir: impl AsRef<Path>) -> Result<()> {
    for content in read_yaml_files(dir)? {
        let file: NodeFile = serde_yaml::from_str(&content).context("Failed to parse node YAML")?;
        for node in file.nodes {
            store.insert_node(node);
        }
    }
    Ok(())
}

fn load_edges(store: &InMemoryStore, dir: impl AsRef<Path>) -> Result<()> {
    for content in read_yaml_files(dir)? {
        let file: EdgeFile = serde_yaml::from_str(&content).context("Failed to parse edge YAML")?;
        for edge in file.edges {
            store.insert_edge(edge).map_err(|e| anyhow::anyhow!(e))?;
        }
    }
    Ok(())
}

fn load_parameters(store: &InMemoryStore, dir: impl AsRef<Path>) -> Result<()> {
    for content in read_yaml_files(dir)? {
        let file: ParameterFile = serde_yaml::from_str(&content).context("Failed to parse parameter YAML")?;
        for param in file.parameters {
            store.insert_parameter(param).map_err(|e| anyhow::anyhow!(e))?;
        }
    }
    Ok(())
}

fn load_risks(store: &InMemoryStore, dir: impl AsRef<Path>) -> Result<()> {
    for content in read_yaml_files(dir)? {
        let file: RiskFile = serde_yaml::from_str(&content).context("Failed to parse risk YAML")?;
        for risk in file.risks {
            store.insert_risk(risk);
        }
    }
    Ok(())
}

fn load_risk_edges(store: &InMemoryStore, dir: impl AsRef<Path>) -> Result<()> {
    for content in read_yaml_files(dir)? {
        let file: RiskEdgeFile = serde_yaml::from_str(&content).context("Failed to parse risk edge YAML")?;
        for edge in file.risk_edges {
            store.insert_risk_edge(edge).map_err(|e| anyhow::anyhow!(e))?;
        }
    }
    Ok(())
}

fn load_actions(store: &InMemoryStore, dir: impl AsRef<Path>) -> Result<()> {
    for content in read_yaml_files(dir)? {
        let file: ActionFile = serde_yaml::from_str(&content).context("Failed to parse action YAML")?;
        for action in file.actions {
            store.insert_action(action);
        }
    }
    Ok(())
}
