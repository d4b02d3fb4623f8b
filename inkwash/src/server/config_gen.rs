//! `server.cfg` and launch script generation.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::Server;
use crate::artifact::Platform;
use crate::error::{fs_context, InkwashResult};
use crate::traits::ConfigGenerator;

/// Player slots written into new configs.
pub const DEFAULT_MAX_CLIENTS: u32 = 32;

/// Resources started by a fresh `server.cfg`.
const DEFAULT_RESOURCES: &[&str] = &[
    "mapmanager",
    "chat",
    "spawnmanager",
    "sessionmanager",
    "basic-gamemode",
    "hardcap",
    "rconlog",
];

/// Renders the default `server.cfg` and launch script.
#[derive(Debug, Clone, Copy)]
pub struct TemplateConfigGenerator {
    platform: Platform,
    max_clients: u32,
}

impl Default for TemplateConfigGenerator {
    fn default() -> Self {
        Self::new(Platform::current())
    }
}

impl TemplateConfigGenerator {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            max_clients: DEFAULT_MAX_CLIENTS,
        }
    }

    pub fn with_max_clients(mut self, max_clients: u32) -> Self {
        self.max_clients = max_clients;
        self
    }

    /// Contents of `server.cfg` for `server`.
    pub fn render_server_config(&self, server: &Server, license_key: &str) -> String {
        let mut cfg = String::new();
        cfg.push_str("## Server Identity\n");
        cfg.push_str(&format!("sv_hostname \"{}\"\n", server.name));
        cfg.push_str(&format!("sv_licenseKey \"{}\"\n", license_key));
        cfg.push_str(&format!("sv_maxclients {}\n\n", self.max_clients));

        cfg.push_str("## Server Configuration\n");
        cfg.push_str(&format!("endpoint_add_tcp \"0.0.0.0:{}\"\n", server.port));
        cfg.push_str(&format!("endpoint_add_udp \"0.0.0.0:{}\"\n\n", server.port));

        cfg.push_str("## Resources\n");
        for resource in DEFAULT_RESOURCES {
            cfg.push_str(&format!("ensure {}\n", resource));
        }

        cfg.push_str("\n## Permissions\n");
        cfg.push_str("add_ace resource.* command allow\n\n");

        cfg.push_str("## Server Info\n");
        cfg.push_str(&format!("sets sv_projectName \"{}\"\n", server.name));
        cfg.push_str("sets sv_projectDesc \"FiveM Server powered by Inkwash\"\n");
        cfg.push_str("sets tags \"inkwash\"\n\n");

        cfg.push_str("## Logging\n");
        cfg.push_str("set sv_logFile \"logs/server.log\"\n");
        cfg
    }

    /// Launch script path and contents for `server`.
    pub fn render_launch_script(&self, server: &Server) -> (PathBuf, String) {
        match self.platform {
            Platform::Windows => (
                server.path.join("run.cmd"),
                format!(
                    "@echo off\r\ncd /d \"{}\"\r\nbin\\FXServer.exe +exec server.cfg\r\n",
                    server.path.display()
                ),
            ),
            Platform::Linux => (
                server.path.join("run.sh"),
                format!(
                    "#!/bin/bash\ncd \"{}\"\nbash bin/run.sh +exec server.cfg\n",
                    server.path.display()
                ),
            ),
        }
    }
}

impl ConfigGenerator for TemplateConfigGenerator {
    fn generate_server_config(&self, server: &Server, license_key: &str) -> InkwashResult<()> {
        let path = server.path.join("server.cfg");
        fs::write(&path, self.render_server_config(server, license_key))
            .map_err(fs_context("write", &path))?;
        debug!(path = %path.display(), "server.cfg written");
        Ok(())
    }

    fn generate_launch_script(&self, server: &Server) -> InkwashResult<()> {
        let (path, content) = self.render_launch_script(server);
        fs::write(&path, content).map_err(fs_context("write", &path))?;
        make_executable(&path)?;
        debug!(path = %path.display(), "Launch script written");
        Ok(())
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> InkwashResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(fs_context("set permissions on", path))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> InkwashResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn server(path: &Path) -> Server {
        Server {
            name: "My Server".to_string(),
            path: path.to_path_buf(),
            binary_path: path.join("bin"),
            build: 17000,
            build_hash: "abc".to_string(),
            port: 30125,
            created: Utc::now(),
            auto_start: false,
        }
    }

    #[test]
    fn test_render_server_config() {
        let generator = TemplateConfigGenerator::new(Platform::Linux);
        let cfg = generator.render_server_config(&server(Path::new("/srv/a")), "cfxk_123");

        assert!(cfg.contains("sv_hostname \"My Server\""));
        assert!(cfg.contains("sv_licenseKey \"cfxk_123\""));
        assert!(cfg.contains("sv_maxclients 32"));
        assert!(cfg.contains("endpoint_add_tcp \"0.0.0.0:30125\""));
        assert!(cfg.contains("endpoint_add_udp \"0.0.0.0:30125\""));
        assert!(cfg.contains("ensure basic-gamemode"));
    }

    #[test]
    fn test_launch_script_per_platform() {
        let srv = server(Path::new("/srv/a"));

        let (path, content) = TemplateConfigGenerator::new(Platform::Linux).render_launch_script(&srv);
        assert!(path.ends_with("run.sh"));
        assert!(content.starts_with("#!/bin/bash"));
        assert!(content.contains("bin/run.sh +exec server.cfg"));

        let (path, content) =
            TemplateConfigGenerator::new(Platform::Windows).render_launch_script(&srv);
        assert!(path.ends_with("run.cmd"));
        assert!(content.contains("bin\\FXServer.exe"));
    }

    #[test]
    fn test_generate_writes_files() {
        let temp = TempDir::new().unwrap();
        let srv = server(temp.path());
        let generator = TemplateConfigGenerator::new(Platform::Linux);

        generator.generate_server_config(&srv, "key").unwrap();
        generator.generate_launch_script(&srv).unwrap();

        assert!(temp.path().join("server.cfg").is_file());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(temp.path().join("run.sh")).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }
}
