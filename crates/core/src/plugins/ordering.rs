//! Dependency ordering of plugins
//!
//! A stable topological sort: among the plugins whose dependencies have all
//! been placed, the earliest registered one goes next. Without dependencies
//! the registration order is kept unchanged.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::Plugin;
use crate::error::{Error, Result};

pub fn order_plugins(plugins: Vec<Box<dyn Plugin>>) -> Result<Vec<Box<dyn Plugin>>> {
    let mut index_of: HashMap<String, usize> = HashMap::with_capacity(plugins.len());
    for (index, plugin) in plugins.iter().enumerate() {
        if index_of.insert(plugin.name().to_string(), index).is_some() {
            return Err(Error::Config(format!(
                "Plugin '{}' is configured more than once",
                plugin.name()
            )));
        }
    }

    let mut dependencies: Vec<Vec<usize>> = Vec::with_capacity(plugins.len());
    for plugin in &plugins {
        let mut resolved = Vec::new();
        for dependency in plugin.dependencies() {
            let index = index_of.get(&dependency).ok_or_else(|| {
                Error::Config(format!(
                    "Plugin '{}' depends on '{}', which is not configured",
                    plugin.name(),
                    dependency
                ))
            })?;
            resolved.push(*index);
        }
        dependencies.push(resolved);
    }

    let mut placed = vec![false; plugins.len()];
    let mut order = Vec::with_capacity(plugins.len());
    while order.len() < plugins.len() {
        let next = (0..plugins.len())
            .find(|&i| !placed[i] && dependencies[i].iter().all(|&dep| placed[dep]));

        match next {
            Some(index) => {
                placed[index] = true;
                order.push(index);
            }
            None => {
                let remaining: BTreeSet<&str> = (0..plugins.len())
                    .filter(|&i| !placed[i])
                    .map(|i| plugins[i].name())
                    .collect();
                return Err(Error::Config(format!(
                    "Plugin dependency cycle between: {}",
                    remaining.into_iter().collect::<Vec<_>>().join(", ")
                )));
            }
        }
    }

    let mut slots: Vec<Option<Box<dyn Plugin>>> = plugins.into_iter().map(Some).collect();
    let ordered: Vec<Box<dyn Plugin>> = order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect();

    debug!(
        "Plugin order: {}",
        ordered.iter().map(|p| p.name()).collect::<Vec<_>>().join(" -> ")
    );
    Ok(ordered)
}
