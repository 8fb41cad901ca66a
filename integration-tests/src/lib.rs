use cumulus_core::{
    config::{self, Encryption, GlobalConfig},
    tools::{ToolCommand, Tools},
};
use std::path::{Path, PathBuf};

mod test_binary;
pub use test_binary::test_binary_main;

pub const TOOL_NAMES: &[&str] = &["tar", "gzip", "gpg", "pg_dump", "mysqldump", "dpkg"];

// Adapted from
// https://github.com/rust-lang/cargo/blob/485670b3983b52289a2f353d589c57fae2f60f82/tests/testsuite/support/mod.rs#L507
// https://github.com/assert-rs/assert_cmd/blob/3ae01c9cf76e8b652c8ed4d2d64ff53149096339/src/cargo.rs#L192
fn target_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .map(|mut path| {
            path.pop();
            if path.ends_with("deps") {
                path.pop();
            }
            path
        })
        .unwrap()
}

fn exe_name(name: &str) -> String {
    format!("{}{}", name, std::env::consts::EXE_SUFFIX)
}

fn cargo_bin(name: &str) -> PathBuf {
    target_dir().join(exe_name(name))
}

fn copy_or_symlink(src: &Path, dest: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(src, dest)
    }

    #[cfg(not(unix))]
    {
        std::fs::copy(src, dest).map(|_| ())
    }
}

/// A scratch environment for one backup run: fake tools in `bin`, the durable
/// and local roots, and a directory for the job catalogs.
pub struct Workdir {
    dir: tempfile::TempDir,
}

impl Workdir {
    const TEST_BINARY_NAME: &'static str = "test-binary";

    pub fn new() -> Self {
        let dir = tempfile::TempDir::new().unwrap();
        for sub in ["bin", "durable", "local", "catalogs"] {
            std::fs::create_dir(dir.path().join(sub)).unwrap();
        }
        let test_binary = cargo_bin(Self::TEST_BINARY_NAME);
        for tool in TOOL_NAMES {
            copy_or_symlink(&test_binary, &dir.path().join("bin").join(exe_name(tool))).unwrap();
        }
        Self { dir }
    }

    pub fn with_exit_status(self, tool: &str, exit_status: i32) -> Self {
        std::fs::write(
            self.bin_dir().join(format!("{}.exit-status", tool)),
            exit_status.to_string(),
        )
        .unwrap();
        self
    }

    pub fn with_stdout(self, tool: &str, stdout: impl AsRef<[u8]>) -> Self {
        std::fs::write(self.bin_dir().join(format!("{}.stdout", tool)), stdout).unwrap();
        self
    }

    pub fn with_catalog(self, name: &str, contents: &str) -> Self {
        std::fs::write(self.catalog_dir().join(name), contents).unwrap();
        self
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.dir.path().join("bin")
    }

    pub fn durable(&self) -> PathBuf {
        self.dir.path().join("durable")
    }

    pub fn local(&self) -> PathBuf {
        self.dir.path().join("local")
    }

    pub fn catalog_dir(&self) -> PathBuf {
        self.dir.path().join("catalogs")
    }

    pub fn tools(&self) -> Tools {
        let tool = |name: &str| ToolCommand::from_path(self.bin_dir().join(exe_name(name)));
        Tools {
            tar: tool("tar"),
            gzip: tool("gzip"),
            gpg: tool("gpg"),
            pg_dump: tool("pg_dump"),
            mysqldump: tool("mysqldump"),
            package_list: tool("dpkg"),
        }
    }

    pub fn config(&self, package_list: bool, encryption: Encryption) -> GlobalConfig {
        GlobalConfig {
            durable_root: self.durable(),
            local_root: self.local(),
            package_list,
            encryption,
            catalog_dir: self.catalog_dir(),
            tools: self.tools(),
            date: config::today(),
        }
    }

    pub fn was_run(&self, tool: &str) -> bool {
        self.bin_dir().join(format!("{}.args", tool)).exists()
    }

    pub fn args(&self, tool: &str) -> Args {
        Args::new(&self.bin_dir().join(format!("{}.args", tool))).unwrap()
    }

    pub fn env(&self, tool: &str) -> Env {
        Env::new(&self.bin_dir().join(format!("{}.env", tool))).unwrap()
    }
}

impl Default for Workdir {
    fn default() -> Self {
        Self::new()
    }
}

/// All regular files below `dir`, as sorted paths relative to it.
pub fn files_below(dir: &Path) -> Vec<String> {
    fn collect(root: &Path, dir: &Path, files: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                collect(root, &path, files);
            } else {
                let relative = path.strip_prefix(root).unwrap();
                files.push(relative.to_string_lossy().into_owned());
            }
        }
    }

    let mut files = Vec::new();
    collect(dir, dir, &mut files);
    files.sort();
    files
}

pub struct Args {
    args: Vec<String>,
}

impl Args {
    fn new(args_file: &Path) -> std::io::Result<Args> {
        let args = std::fs::read_to_string(args_file)?
            .lines()
            .map(|s| s.to_owned())
            .collect();
        Ok(Args { args })
    }

    pub fn assert_args(&self, args: &[impl AsRef<str>]) -> &Self {
        let args = args.iter().map(|s| s.as_ref()).collect::<Vec<_>>();
        assert_eq!(&self.args, &args);
        self
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }
}

pub struct Env {
    env: Vec<(String, String)>,
}

impl Env {
    fn new(env_file: &Path) -> std::io::Result<Self> {
        let env = std::fs::read_to_string(env_file)?
            .lines()
            .filter_map(|s| s.split_once('='))
            .map(|(key, value)| (key.to_owned(), value.to_owned()))
            .collect();
        Ok(Env { env })
    }

    pub fn assert_var(&self, key: impl AsRef<str>, value: impl AsRef<str>) -> &Self {
        let key = key.as_ref();
        let value = value.as_ref();
        assert!(
            self.env.iter().any(|(k, v)| k == key && v == value),
            "expected {}={} in environment",
            key,
            value
        );
        self
    }

    pub fn assert_no_var(&self, key: impl AsRef<str>) -> &Self {
        let key = key.as_ref();
        assert!(!self.env.iter().any(|(k, _)| k == key));
        self
    }
}
