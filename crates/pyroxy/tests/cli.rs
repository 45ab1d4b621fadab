use std::{fs, path::Path, process::Command};

use anyhow::Result;
use serial_test::serial;
use tempfile::TempDir;

fn pyroxy(cwd: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_pyroxy"));
    command
        .current_dir(cwd)
        .env_remove("PYTHONPATH")
        .env_remove("PYROXY_SRC")
        .env_remove("PYROXY_OVERWRITE")
        .env_remove("PYROXY_EXCLUDE_TOP_LEVEL")
        .env_remove("PYROXY_RSCRIPT");
    command
}

fn python_tree(root: &Path) -> Result<()> {
    fs::create_dir_all(root.join("py/greet"))?;
    fs::write(root.join("py/greet/__init__.py"), "")?;
    fs::write(
        root.join("py/greet/hello.py"),
        "def hello(name, punctuation='!'):\n    \"\"\"Say hello.\"\"\"\n    return name\n",
    )?;
    Ok(())
}

#[test]
#[serial]
fn test_generates_without_toolchain() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    python_tree(root)?;

    let status = pyroxy(root)
        .args(["greet", "out", "--src", "py", "--no-toolchain"])
        .status()?;
    assert!(status.success());

    let hello = fs::read_to_string(root.join("out/R/hello.R"))?;
    assert!(hello.contains("hello <- function(name, punctuation = \"!\") {"));
    assert!(hello.contains("reticulate::import(\"greet.hello\")"));
    Ok(())
}

#[test]
#[serial]
fn test_refuses_existing_output_without_overwrite() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    python_tree(root)?;
    fs::create_dir_all(root.join("out"))?;

    let output = pyroxy(root)
        .args(["greet", "out", "--src", "py", "--no-toolchain"])
        .output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already exists"), "stderr: {stderr}");

    let status = pyroxy(root)
        .args(["greet", "out", "--src", "py", "--no-toolchain", "--overwrite"])
        .status()?;
    assert!(status.success());
    assert!(root.join("out/R/hello.R").is_file());
    Ok(())
}

#[test]
#[serial]
fn test_unknown_module_fails_before_writing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    python_tree(root)?;

    let output = pyroxy(root)
        .args(["nothere", "out", "--src", "py", "--no-toolchain"])
        .output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("could not be found"));
    assert!(!root.join("out").exists());
    Ok(())
}

#[test]
#[serial]
fn test_project_config_is_picked_up() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    python_tree(root)?;
    fs::write(
        root.join("pyroxy.toml"),
        "src = [\"py\"]\nexclude-top-level = false\nrun-toolchain = false\n",
    )?;

    let status = pyroxy(root).args(["greet", "out"]).status()?;
    assert!(status.success());
    assert!(root.join("out/R/greet/hello.R").is_file());
    Ok(())
}
