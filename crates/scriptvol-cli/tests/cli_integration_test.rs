//! Integration tests for the CLI command workflow.
//!
//! Each test writes a configuration file into a temporary directory and
//! drives commands through `execute_command`, so every invocation mounts
//! the volumes afresh the way the binary does.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use scriptvol::HarddiskImage;
use scriptvol_cli::commands::{files, volumes};
use scriptvol_cli::{Cli, ExitCode, OutputFormat, Session, SessionOptions, execute_command};
use tempfile::TempDir;

struct Workspace {
    temp: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        let text = format!(
            r#"[general]
prefer_compiled = false

[archive]
root = "{archive}"
newline = "lf"

[[harddisk]]
name = "scratch"
capacity = 64
image = "{image}"
"#,
            archive = temp.path().join("archive").display(),
            image = temp.path().join("images/scratch.json").display(),
        );
        fs::write(&config, text).unwrap();
        Self { temp, config }
    }

    fn options(&self) -> SessionOptions {
        SessionOptions {
            config: Some(self.config.clone()),
            ..SessionOptions::default()
        }
    }

    fn run(&self, args: &[&str]) -> anyhow::Result<ExitCode> {
        let cli = Cli::parse_from(std::iter::once("scriptvol").chain(args.iter().copied()));
        let options = SessionOptions {
            config: Some(self.config.clone()),
            volume: cli.volume,
            directory: cli.directory,
        };
        execute_command(cli.command, &options, cli.format.parse::<OutputFormat>()?)
    }

    fn session(&self) -> Session {
        Session::open(&self.options()).unwrap()
    }

    fn image(&self) -> HarddiskImage {
        HarddiskImage::load(&self.temp.path().join("images/scratch.json")).unwrap()
    }
}

#[test]
fn test_volumes_lists_archive_and_harddisk() {
    let ws = Workspace::new();
    assert_eq!(ws.run(&["volumes", "--format", "json"]).unwrap(), ExitCode::SUCCESS);

    let report = volumes::collect(&ws.session()).unwrap();
    let names: Vec<_> = report.volumes.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["Archive", "scratch"]);
}

#[test]
fn test_harddisk_contents_survive_between_runs() {
    let ws = Workspace::new();
    assert_eq!(
        ws.run(&["write", "scratch:/lib/boot.ks", "print 1.", "--format", "text"]).unwrap(),
        ExitCode::SUCCESS
    );

    let image = ws.image();
    assert_eq!(image.name, "scratch");
    assert!(image.root.contains_key("lib"));

    let report = files::describe(&ws.session(), "scratch:/lib/boot").unwrap();
    assert_eq!(report.path, "1:/lib/boot.ks");
    assert_eq!(report.size, 8);
}

#[test]
fn test_volume_and_directory_options() {
    let ws = Workspace::new();
    ws.run(&["mkdir", "scratch:/lib"]).unwrap();
    ws.run(&["--volume", "scratch", "--cd", "lib", "touch", "util.ks"]).unwrap();

    let report = files::describe(&ws.session(), "1:/lib/util.ks").unwrap();
    assert_eq!(report.size, 0);
}

#[test]
fn test_copy_from_archive_to_harddisk() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.temp.path().join("archive/scripts")).unwrap();
    fs::write(ws.temp.path().join("archive/scripts/launch.ks"), "stage.").unwrap();

    assert_eq!(ws.run(&["cp", "/scripts", "scratch:/"]).unwrap(), ExitCode::SUCCESS);
    let report = files::describe(&ws.session(), "scratch:/scripts/launch.ks").unwrap();
    assert_eq!(report.size, 6);
}

#[test]
fn test_move_to_harddisk_removes_host_file() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.temp.path().join("archive")).unwrap();
    fs::write(ws.temp.path().join("archive/notes.txt"), "abc").unwrap();

    assert_eq!(ws.run(&["mv", "0:/notes.txt", "scratch:/notes.txt"]).unwrap(), ExitCode::SUCCESS);
    assert!(!ws.temp.path().join("archive/notes.txt").exists());
    assert!(files::describe(&ws.session(), "scratch:/notes.txt").is_ok());
}

#[test]
fn test_no_room_exit_code() {
    let ws = Workspace::new();
    let big = "x".repeat(100);
    assert_eq!(ws.run(&["write", "scratch:/big", &big]).unwrap(), ExitCode::NO_ROOM);
    assert_eq!(ws.run(&["write", "scratch:/big", &big, "--no-verify"]).unwrap(), ExitCode::SUCCESS);
}

#[test]
fn test_error_exit_codes() {
    let ws = Workspace::new();

    let err = ws.run(&["cat", "/missing"]).unwrap_err();
    assert_eq!(ExitCode::from_error(&err), ExitCode::NOT_FOUND);

    let err = ws.run(&["stat", "nowhere:/x"]).unwrap_err();
    assert_eq!(ExitCode::from_error(&err), ExitCode::NOT_FOUND);

    let err = ws.run(&["mkdir", "/a\\b"]).unwrap_err();
    assert_eq!(ExitCode::from_error(&err), ExitCode::INVALID_INPUT);

    let err = ws.run(&["rename-volume", "0", "other"]).unwrap_err();
    assert_eq!(ExitCode::from_error(&err), ExitCode::ERROR);
}

#[test]
fn test_rename_volume_persists_name() {
    let ws = Workspace::new();
    assert_eq!(ws.run(&["rename-volume", "scratch", "backup"]).unwrap(), ExitCode::SUCCESS);
    assert_eq!(ws.image().name, "backup");

    let session = ws.session();
    assert_eq!(session.manager().raw_identifier(1).unwrap(), "backup");
}

#[test]
fn test_invalid_config_is_rejected() {
    let ws = Workspace::new();
    fs::write(&ws.config, "[[harddisk]]\nname = \"\"\ncapacity = 0\n").unwrap();
    assert!(ws.run(&["volumes"]).is_err());
}

#[test]
fn test_completions_need_no_config() {
    let cli = Cli::parse_from(["scriptvol", "completions", "bash"]);
    let options = SessionOptions {
        config: Some(PathBuf::from("/nonexistent/dir/config.toml")),
        ..SessionOptions::default()
    };
    assert_eq!(execute_command(cli.command, &options, OutputFormat::Text).unwrap(), ExitCode::SUCCESS);
}
