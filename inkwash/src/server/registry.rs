//! JSON-file server registry.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::types::Server;
use crate::error::{InkwashError, InkwashResult};
use crate::fs_util;
use crate::traits::ServerRegistry;

const REGISTRY_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryData {
    version: u32,
    #[serde(default)]
    servers: Vec<Server>,
}

impl Default for RegistryData {
    fn default() -> Self {
        Self {
            version: REGISTRY_VERSION,
            servers: Vec::new(),
        }
    }
}

/// Registry of servers persisted as `{version, servers[]}` JSON.
#[derive(Debug)]
pub struct JsonRegistry {
    path: PathBuf,
    data: RwLock<RegistryData>,
}

impl JsonRegistry {
    /// Load the registry at `path`, creating an empty one if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> InkwashResult<Self> {
        let path = path.into();
        let data = match fs_util::read_json::<RegistryData>(&path)? {
            Some(data) => data,
            None => {
                let data = RegistryData::default();
                fs_util::write_json_atomic(&path, &data)?;
                data
            }
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<Server> {
        self.data.read().servers.iter().find(|s| s.name == name).cloned()
    }

    pub fn list(&self) -> Vec<Server> {
        self.data.read().servers.clone()
    }

    /// Unregister `name`. The server directory is left untouched.
    pub fn remove(&self, name: &str) -> InkwashResult<Server> {
        let mut data = self.data.write();
        let index = data
            .servers
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| InkwashError::ServerNotFound {
                name: name.to_string(),
            })?;

        let removed = data.servers.remove(index);
        fs_util::write_json_atomic(&self.path, &*data)?;
        info!(server = name, "Server unregistered");
        Ok(removed)
    }
}

impl ServerRegistry for JsonRegistry {
    fn exists(&self, name: &str) -> bool {
        self.data.read().servers.iter().any(|s| s.name == name)
    }

    fn add(&self, server: Server) -> InkwashResult<()> {
        let mut data = self.data.write();
        if data.servers.iter().any(|s| s.name == server.name) {
            return Err(InkwashError::Validation(format!(
                "server '{}' already exists",
                server.name
            )));
        }

        info!(server = %server.name, path = %server.path.display(), "Server registered");
        data.servers.push(server);
        fs_util::write_json_atomic(&self.path, &*data)
    }
}
