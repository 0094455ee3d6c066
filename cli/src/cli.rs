//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser, Subcommand};

use crate::app::{AppContext, AppFlags, OutputFlags};
use crate::commands;
use crate::infra::config::YamlConfigStore;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer};

/// Put a deployed Virtual Container Host appliance into a debuggable state
#[derive(Parser)]
#[command(
    name = "vch-debug",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// More log output on stderr; repeat for trace
    #[arg(short = 'd', long = "debug", action = ArgAction::Count, global = true)]
    pub verbosity: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Configure a VCH appliance for debug access
    Debug(commands::debug::DebugArgs),

    /// Show installer version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unusable or output cannot be
    /// rendered. Workflow failures are rendered by the command and come
    /// back as a failing exit code instead.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            verbosity,
            command,
        } = self;
        match command {
            Command::Version => {
                let ctx = OutputContext::new(no_color, quiet);
                let renderer = if json {
                    Renderer::Json(JsonRenderer)
                } else {
                    Renderer::Human(HumanRenderer::new(&ctx))
                };
                commands::version::run(&renderer)?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Debug(args) => {
                let flags = AppFlags {
                    output: OutputFlags {
                        no_color,
                        quiet,
                        json,
                    },
                    debug: verbosity,
                };
                let app = AppContext::new(&flags, &YamlConfigStore)?;
                commands::debug::run(&app, args).await
            }
        }
    }
}
