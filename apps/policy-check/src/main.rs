mod commands;
mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use crate::commands::SubjectScope;
use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "policy-check", version, about = "Query twin policies from the command line")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print `granted` or `denied`; exits with 1 when denied, 2 on errors
    Check(CheckArgs),
    /// List the subjects effected by permissions on a resource
    Subjects(SubjectsArgs),
    /// Print the part of a JSON document the subjects may read
    View(ViewArgs),
}

#[derive(Args, Debug)]
struct Target {
    /// Policy document (JSON)
    #[arg(long, value_name = "FILE")]
    policy: PathBuf,

    /// Resource key `type:/path`, or `/path` for the default resource type
    #[arg(long, value_name = "KEY")]
    resource: String,

    /// Required permission, repeatable
    #[arg(long = "permission", value_name = "PERMISSION", required = true)]
    permissions: Vec<String>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    target: Target,

    /// Subject id `issuer:subject`, repeatable
    #[arg(long = "subject", value_name = "ID", required = true)]
    subjects: Vec<String>,
}

#[derive(Args, Debug)]
struct SubjectsArgs {
    #[command(flatten)]
    target: Target,

    /// Subjects holding the permissions anywhere below the resource
    #[arg(long, conflicts_with = "unrestricted")]
    partial: bool,

    /// Subjects holding the permissions everywhere below the resource
    #[arg(long)]
    unrestricted: bool,
}

#[derive(Args, Debug)]
struct ViewArgs {
    #[command(flatten)]
    target: Target,

    /// JSON document rooted at the resource
    #[arg(long, value_name = "FILE")]
    document: PathBuf,

    /// Subject id `issuer:subject`, repeatable
    #[arg(long = "subject", value_name = "ID", required = true)]
    subjects: Vec<String>,
}

impl SubjectsArgs {
    fn scope(&self) -> SubjectScope {
        if self.partial {
            SubjectScope::Partial
        } else if self.unrestricted {
            SubjectScope::Unrestricted
        } else {
            SubjectScope::Exact
        }
    }
}

/// Exit status for failures, kept apart from a `denied` check.
const ERROR_EXIT: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match start(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(ERROR_EXIT)
        }
    }
}

fn start(cli: &Cli) -> Result<ExitCode> {
    let config = AppConfig::load(cli.config.as_deref())?;
    logging::init(&config.logging)?;
    tracing::debug!(?config, "Loaded configuration");

    run(&cli.command, &config)
}

fn run(command: &Command, config: &AppConfig) -> Result<ExitCode> {
    match command {
        Command::Check(args) => {
            let (enforcer, key) = resolve(&args.target, config)?;
            let granted = commands::check(&enforcer, &key, &args.subjects, &args.target.permissions)?;
            println!("{}", if granted { "granted" } else { "denied" });
            Ok(if granted {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Subjects(args) => {
            let (enforcer, key) = resolve(&args.target, config)?;
            let subjects =
                commands::subjects(&enforcer, &key, &args.target.permissions, args.scope())?;
            print_json(&subjects)
        }
        Command::View(args) => {
            let (enforcer, key) = resolve(&args.target, config)?;
            let view = commands::view(
                &enforcer,
                &args.document,
                &key,
                &args.subjects,
                &args.target.permissions,
            )?;
            print_json(&view)
        }
    }
}

fn resolve(
    target: &Target,
    config: &AppConfig,
) -> Result<(policy_enforcer::PolicyEnforcer, policy_model::ResourceKey)> {
    let key = commands::resource_key(&target.resource, &config.default_resource_type)?;
    let enforcer = commands::load_enforcer(&target.policy)?;
    Ok((enforcer, key))
}

fn print_json(value: &Value) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_repeated_subjects_and_permissions() {
        let cli = Cli::try_parse_from([
            "policy-check",
            "check",
            "--policy",
            "p.json",
            "--resource",
            "/features",
            "--subject",
            "user:a",
            "--subject",
            "group:b",
            "--permission",
            "READ",
            "--permission",
            "WRITE",
        ])
        .unwrap();

        let Command::Check(args) = cli.command else {
            panic!("expected check command");
        };
        assert_eq!(args.subjects, vec!["user:a", "group:b"]);
        assert_eq!(args.target.permissions, vec!["READ", "WRITE"]);
    }

    #[test]
    fn partial_and_unrestricted_are_exclusive() {
        let result = Cli::try_parse_from([
            "policy-check",
            "subjects",
            "--policy",
            "p.json",
            "--resource",
            "thing:/",
            "--permission",
            "READ",
            "--partial",
            "--unrestricted",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from([
            "policy-check",
            "subjects",
            "--policy",
            "p.json",
            "--resource",
            "thing:/",
            "--permission",
            "READ",
            "--config",
            "policy-check.yaml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("policy-check.yaml")));
        let Command::Subjects(args) = cli.command else {
            panic!("expected subjects command");
        };
        assert_eq!(args.scope(), SubjectScope::Exact);
    }
}
