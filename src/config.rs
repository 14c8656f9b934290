//! Turns raw command-line values into a validated, immutable [`Config`].

use std::{
    net::{IpAddr, UdpSocket},
    path::{Path, PathBuf},
};

use crate::{
    cli::Cli,
    data_dir::DataDir,
    error::{Error, Result},
    filename::RuleName,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub book_dir: PathBuf,
    pub data_dir: DataDir,
    /// `[host]:port` exactly as given.
    pub listen_addr: String,
    pub covers_enabled: bool,
    pub version: String,
    pub filename_rules: Vec<RuleName>,
}

impl Config {
    /// Validate the CLI values. Every error returned here is fatal.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let book_dir = match &cli.book_dir {
            Some(dir) => resolve_book_dir(dir)?,
            None => resolve_book_dir(&std::env::current_dir()?)?,
        };
        let (host, port) = split_listen_addr(&cli.addr)?;
        let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;

        if host.is_empty()
            && let Some(ip) = routable_ip()
        {
            tracing::info!("This server can be accessed at http://{ip}:{port}");
        }

        Ok(Self {
            book_dir,
            data_dir,
            listen_addr: cli.addr.clone(),
            covers_enabled: !cli.no_covers,
            version: crate::VERSION.to_string(),
            filename_rules: cli.filename_rules.clone(),
        })
    }

    /// The address handed to the listener; an empty host binds all
    /// interfaces.
    pub fn bind_addr(&self) -> String {
        match self.listen_addr.split_once(':') {
            Some(("", port)) => format!("0.0.0.0:{port}"),
            _ => self.listen_addr.clone(),
        }
    }
}

/// The book directory must already exist; it is returned in canonical form.
pub fn resolve_book_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        return Err(Error::BookDir(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(Error::Config(format!(
            "book directory is not a directory: {}",
            dir.display()
        )));
    }
    dir.canonicalize().map_err(|e| {
        Error::Config(format!(
            "could not resolve book directory {}: {e}",
            dir.display()
        ))
    })
}

/// Split `[host]:port` at the first colon.
pub fn split_listen_addr(addr: &str) -> Result<(&str, &str)> {
    addr.split_once(':')
        .ok_or_else(|| Error::Config("invalid listening address".into()))
}

/// The local address the OS would route outbound traffic from. Connecting
/// a UDP socket sends no packets.
fn routable_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}
