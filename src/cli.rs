use cumulus_core::{
    config::{self, ConfigError, Encryption, GlobalConfig},
    tools::{ToolCommand, Tools},
};
use std::path::PathBuf;

/// Backs up folders, databases and the list of installed packages into a
/// durable directory and prunes old copies.
#[derive(clap::Parser, Debug)]
#[command(version)]
pub struct Cli {
    /// Directory the backups are copied to
    #[arg(value_name = "DURABLE_ROOT")]
    pub durable_root: PathBuf,

    /// Scratch directory for staging backups before they are copied
    #[arg(value_name = "LOCAL_ROOT")]
    pub local_root: PathBuf,

    /// Whether to back up the list of installed packages (0 or 1)
    #[arg(value_name = "PACKAGE_LIST")]
    pub package_list: String,

    /// Whether to encrypt backups (0 or 1)
    #[arg(value_name = "ENCRYPT")]
    pub encrypt: String,

    /// Key to encrypt backups for
    #[arg(value_name = "RECIPIENT")]
    pub recipient: String,

    /// Sets the directory containing folders.conf and databases.conf;
    /// defaults to the directory of the executable
    #[arg(long, env = "CUMULUS_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Also appends log output to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[derive(clap::Args, Debug)]
pub struct ToolArgs {
    /// Sets the tar binary to use
    #[arg(long, default_value = "tar")]
    pub tar_binary: PathBuf,

    /// Sets the gzip binary to use
    #[arg(long, default_value = "gzip")]
    pub gzip_binary: PathBuf,

    /// Sets the gpg binary to use
    #[arg(long, default_value = "gpg")]
    pub gpg_binary: PathBuf,

    /// Sets the pg_dump binary to use
    #[arg(long, default_value = "pg_dump")]
    pub pg_dump_binary: PathBuf,

    /// Sets the mysqldump binary to use
    #[arg(long, default_value = "mysqldump")]
    pub mysqldump_binary: PathBuf,

    /// Sets the binary listing installed packages, called with --get-selections
    #[arg(long, default_value = "dpkg")]
    pub package_list_binary: PathBuf,
}

impl From<ToolArgs> for Tools {
    fn from(args: ToolArgs) -> Self {
        Tools {
            tar: ToolCommand::from_path(args.tar_binary),
            gzip: ToolCommand::from_path(args.gzip_binary),
            gpg: ToolCommand::from_path(args.gpg_binary),
            pg_dump: ToolCommand::from_path(args.pg_dump_binary),
            mysqldump: ToolCommand::from_path(args.mysqldump_binary),
            package_list: ToolCommand::from_path(args.package_list_binary),
        }
    }
}

fn current_exe_dir() -> Option<PathBuf> {
    let current_exe = std::env::current_exe().ok()?;
    let dir = current_exe.parent()?;
    Some(dir.to_owned())
}

impl Cli {
    pub fn into_config(self) -> Result<GlobalConfig, ConfigError> {
        let package_list = config::parse_flag("package list flag", &self.package_list)?;
        let encryption = if config::parse_flag("encryption flag", &self.encrypt)? {
            Encryption::Enabled {
                recipient: self.recipient,
            }
        } else {
            Encryption::Disabled
        };
        let catalog_dir = self
            .config_dir
            .or_else(current_exe_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(GlobalConfig {
            durable_root: self.durable_root,
            local_root: self.local_root,
            package_list,
            encryption,
            catalog_dir,
            tools: self.tools.into(),
            date: config::today(),
        })
    }
}
