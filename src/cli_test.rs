use crate::cli::Cli;
use crate::config::{DEFAULT_ENDPOINT, DEFAULT_USER_STORAGE_ROOT};
use clap::Parser;
use serial_test::serial;
use std::env;
use std::path::PathBuf;

const VARS: [&str; 7] = [
    "STORAGE_ROOT",
    "TASK_MASTER_STORAGE_ROOT",
    "TASK_MASTER_PROJECT_ROOT",
    "HOST",
    "PORT",
    "MCP_ENDPOINT",
    "MCP_HTTP_ENABLED",
];

fn clear_env() {
    for var in VARS {
        unsafe {
            env::remove_var(var);
        }
    }
}

fn parse(args: &[&str]) -> Cli {
    let argv = std::iter::once("task-master-mcp").chain(args.iter().copied());
    Cli::try_parse_from(argv).unwrap()
}

#[test]
#[serial]
fn test_defaults_without_env() {
    clear_env();

    let config = parse(&[]).into_config();

    assert!(!config.transport.http_enabled);
    assert_eq!(config.transport.endpoint, DEFAULT_ENDPOINT);
    assert_eq!(config.storage.user_root, PathBuf::from(DEFAULT_USER_STORAGE_ROOT));
    assert!(config.storage.flat_root.is_none());
    assert_eq!(config.project_root, PathBuf::from("."));
}

#[test]
#[serial]
fn test_http_flag_accepts_boolish_env_values() {
    for (value, expected) in [
        ("1", true),
        ("yes", true),
        ("on", true),
        ("true", true),
        ("0", false),
        ("no", false),
        ("off", false),
        ("false", false),
    ] {
        clear_env();
        unsafe {
            env::set_var("MCP_HTTP_ENABLED", value);
        }

        assert_eq!(parse(&[]).http, expected, "MCP_HTTP_ENABLED={value}");
    }
    clear_env();
}

#[test]
#[serial]
fn test_http_flag_without_value() {
    clear_env();
    assert!(parse(&["--http"]).http);
    assert!(!parse(&["--http", "off"]).http);
}

#[test]
#[serial]
fn test_env_builds_http_config() {
    clear_env();
    unsafe {
        env::set_var("HOST", "0.0.0.0");
        env::set_var("PORT", "3005");
        env::set_var("MCP_ENDPOINT", "mcp");
        env::set_var("MCP_HTTP_ENABLED", "yes");
        env::set_var("STORAGE_ROOT", "/tmp/storage");
        env::set_var("TASK_MASTER_STORAGE_ROOT", "/custom/root");
        env::set_var("TASK_MASTER_PROJECT_ROOT", "/work/project");
    }

    let config = parse(&["-vv"]).into_config();

    assert_eq!(config.transport.host.as_deref(), Some("0.0.0.0"));
    assert_eq!(config.transport.port, Some(3005));
    assert_eq!(config.transport.endpoint, "mcp");
    assert!(config.transport.http_enabled);
    assert_eq!(config.storage.user_root, PathBuf::from("/tmp/storage"));
    assert_eq!(config.storage.flat_root, Some(PathBuf::from("/custom/root")));
    assert_eq!(config.project_root, PathBuf::from("/work/project"));
    assert_eq!(config.verbosity, 2);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_port_is_rejected() {
    clear_env();
    let argv = ["task-master-mcp", "--port", "not-a-port"];
    assert!(Cli::try_parse_from(argv).is_err());
}
