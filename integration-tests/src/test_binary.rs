//! A stand-in for the external programs. Every copy is named after the tool
//! it replaces and keeps its state in files next to itself, prefixed with that
//! name:
//!
//! * `<tool>.args` and `<tool>.env` record how it was called
//! * `<tool>.stdout` is written to stdout if it exists, otherwise stdin is
//!   passed through
//! * `<tool>.exit-status` sets the exit status, 0 if missing

use std::{
    error::Error,
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

fn write_args(workdir: &Path, tool: &str) -> std::io::Result<()> {
    let mut file = File::create(workdir.join(format!("{}.args", tool)))?;
    for arg in std::env::args().skip(1) {
        file.write_all(arg.as_bytes())?;
        file.write_all(b"\n")?;
    }
    Ok(())
}

fn write_env(workdir: &Path, tool: &str) -> std::io::Result<()> {
    let mut file = File::create(workdir.join(format!("{}.env", tool)))?;
    for (key, value) in std::env::vars() {
        file.write_all(key.as_bytes())?;
        file.write_all(b"=")?;
        file.write_all(value.as_bytes())?;
        file.write_all(b"\n")?;
    }
    Ok(())
}

fn get_exit_status(workdir: &Path, tool: &str) -> Result<i32, Box<dyn Error>> {
    let exit_status = std::fs::read_to_string(workdir.join(format!("{}.exit-status", tool)))?
        .trim()
        .parse()?;
    Ok(exit_status)
}

fn write_stdout(workdir: &Path, tool: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    match File::open(workdir.join(format!("{}.stdout", tool))) {
        Ok(mut file) => std::io::copy(&mut file, &mut stdout)?,
        Err(_) => std::io::copy(&mut std::io::stdin(), &mut stdout)?,
    };
    stdout.flush()
}

pub fn test_binary_main() {
    // argv[0] rather than current_exe() so that symlinks keep their own name
    let invoked_as = PathBuf::from(std::env::args_os().next().unwrap());
    let workdir = invoked_as.parent().unwrap().to_owned();
    let tool = invoked_as
        .file_stem()
        .unwrap()
        .to_string_lossy()
        .into_owned();

    let _ = write_args(&workdir, &tool);
    let _ = write_env(&workdir, &tool);
    let _ = write_stdout(&workdir, &tool);

    let exit_status = get_exit_status(&workdir, &tool).unwrap_or(0);
    std::process::exit(exit_status);
}
