// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn path_arg(help: &'static str) -> Arg {
    Arg::new("path").required(true).value_name("PATH").help(help)
}

fn build_cli() -> Command {
    Command::new("appnest")
        .version(env!("CARGO_PKG_VERSION"))
        .author("AppNest Contributors")
        .about("Desktop integration for AppImages")
        .subcommand_required(false)
        .subcommand(
            Command::new("integrate")
                .about("Move an AppImage to the integration folder and add it to the menu")
                .arg(path_arg("Path to the AppImage"))
                .arg(
                    Arg::new("no_resolve_collisions")
                        .long("no-resolve-collisions")
                        .action(ArgAction::SetTrue)
                        .help("Keep the launcher name even if another entry uses it"),
                ),
        )
        .subcommand(
            Command::new("clean")
                .about("Remove launcher entries whose AppImage no longer exists")
                .arg(
                    Arg::new("verbose")
                        .short('v')
                        .long("verbose")
                        .action(ArgAction::SetTrue)
                        .help("Log every removed entry"),
                ),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove an integrated AppImage with its launcher entry and icons")
                .arg(path_arg("Path to the integrated AppImage"))
                .arg(
                    Arg::new("yes")
                        .short('y')
                        .long("yes")
                        .action(ArgAction::SetTrue)
                        .help("Delete without asking"),
                ),
        )
        .subcommand(
            Command::new("update")
                .about("Update an integrated AppImage and refresh its launcher entry")
                .arg(path_arg("Path to the integrated AppImage")),
        )
        .subcommand(
            Command::new("status")
                .about("Show integration details of an AppImage")
                .arg(path_arg("Path to the AppImage"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the report as JSON"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Show the effective configuration")
                .arg(
                    Arg::new("init")
                        .long("init")
                        .action(ArgAction::SetTrue)
                        .help("Write a configuration file with commented defaults if none exists"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("appnest.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
