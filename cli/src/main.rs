use std::borrow::Cow;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as AnyhowContext;
use clap::{Parser, Subcommand};
use flexi_logger::{FileSpec, LevelFilter, LogSpecification, Logger, LoggerHandle, WriteMode};

use odsign::{Context, DefaultContext};

mod apex;
use apex::{ApexInfoCmd, InstallApex, UninstallApex};

mod artifacts;
use artifacts::{SystemServerArtifacts, VerifySystemServer, VerifyZygotes, ZygoteArtifacts};

mod check;
use check::RunCheck;

mod compilation_log;
use compilation_log::CompilationLog;

mod device;
use device::{Reboot, RestartZygote};

mod root;
use root::{EnableRoot, RestoreRoot};

mod utils;

const SIMPLE_VERSION_STRING: &str = include!(concat!(env!("OUT_DIR"), "/simple_version_string"));
const VERSION_STRING: &str = include!(concat!(env!("OUT_DIR"), "/version_string"));

#[derive(Parser)]
#[command(name = "odsign")]
#[command(version(SIMPLE_VERSION_STRING))]
#[command(long_version(VERSION_STRING))]
struct Cli {
    /// `-e`, `--log-stderr`: Flag value, when enabled will cause logs to be output to `stderr`
    /// instead of a log file. Disabled by default (logs go to a file by default)
    #[arg(short = 'e', long, help = "Log to stderr instead of a file", action = clap::ArgAction::SetTrue, default_value_t = false)]
    log_stderr: bool,

    /// `-f`, `--log-file`: Path to desired log output file location. Optional, defaults to
    /// `$ODSIGN_PROJECT_HOME/odsign_out/log`
    #[arg(short = 'f', long, help = "Send log output to the given file")]
    log_file: Option<PathBuf>,

    /// `-s`, `--log-spec`: Debug options for [flexi_logger](https://docs.rs/flexi_logger/0.30/flexi_logger/struct.LogSpecification.html)
    #[arg(short = 's', long, help = "Log spec for flexi_logger")]
    log_spec: Option<String>,

    /// `-l`, `--log-level`: Set the desired log verbosity. Defaults to 0, all values are listed
    /// below:
    ///
    /// | Value | Log Level |
    /// | ----- | --------- |
    /// | **0** | **Warn** |
    /// | 1 | Info |
    /// | 2 | Debug |
    /// | 3 | Trace |
    #[arg(
        short = 'l',
        long,
        help = "Set the log level, 0 = warn, 1 = info, etc",
        long_help = None,
        default_value_t = 0
    )]
    log_level: u8,

    /// The command being called. See [Commands] for the implemented options
    #[command(subcommand)]
    command: Commands,
}

/// The currently implemented commands
#[derive(Subcommand)]
enum Commands {
    /// Display the full version string and exit
    #[command()]
    Version,

    /// Check to see if you are able to use `odsign`
    #[command()]
    RunCheck(RunCheck),

    /// Install the test ART APEX and reboot into it
    ///
    /// Skipped if the device doesn't support updating APEXes.
    #[command()]
    InstallApex(InstallApex),

    /// Uninstall the APEX named in the test ART APEX's manifest
    #[command()]
    UninstallApex(UninstallApex),

    /// Print the name and version from an APEX file's manifest
    #[command()]
    ApexInfo(ApexInfoCmd),

    /// List the dalvik-cache boot image files Zygote has mapped
    #[command()]
    ZygoteArtifacts(ZygoteArtifacts),

    /// List the dalvik-cache files system_server has mapped
    #[command()]
    SystemServerArtifacts(SystemServerArtifacts),

    /// Verify every running Zygote mapped the boot image with the given stem
    #[command()]
    VerifyZygotes(VerifyZygotes),

    /// Verify system_server mapped the artifacts of its whole classpath
    #[command()]
    VerifySystemServer(VerifySystemServer),

    /// Inspect or remove odrefresh's compilation log
    #[command()]
    CompilationLog(CompilationLog),

    /// Reboot the device and wait for the boot to complete
    #[command()]
    Reboot(Reboot),

    /// Restart Zygote and wait for the boot to complete
    #[command()]
    RestartZygote(RestartZygote),

    /// Enable adb root, recording whether it was already enabled
    ///
    /// Skipped if adbd can't run as root.
    #[command()]
    EnableRoot(EnableRoot),

    /// Put adb root back the way it was before `enable-root`
    #[command()]
    RestoreRoot(RestoreRoot),
}

impl Cli {
    fn configure_loggers(&self, ctx: &DefaultContext) -> anyhow::Result<LoggerHandle> {
        let log_spec = match &self.log_spec {
            Some(s) => {
                LogSpecification::parse(s).with_context(|| format!("parsing log spec {}", s))?
            }
            None => {
                if self.log_level > 0 {
                    let lvl = match self.log_level {
                        1 => LevelFilter::Info,
                        2 => LevelFilter::Debug,
                        _ => LevelFilter::Trace,
                    };
                    LogSpecification::builder().module("odsign", lvl).build()
                } else {
                    LogSpecification::env().with_context(|| "getting log spec from env")?
                }
            }
        };

        let mut logger = Logger::with(log_spec);

        if !self.log_stderr {
            let path = match &self.log_file {
                Some(v) => {
                    if v.is_absolute() {
                        Some(Cow::Borrowed(v))
                    } else {
                        let full_path = std::env::current_dir()?.join(v);
                        Some(Cow::Owned(full_path))
                    }
                }
                None => ctx.get_output_dir_child("log").map(Cow::Owned).ok(),
            };

            if let Some(p) = &path {
                logger = logger
                    .log_to_file(
                        FileSpec::try_from(p.as_ref()).with_context(|| "creating filespec")?,
                    )
                    .append()
                    .write_mode(WriteMode::BufferAndFlush);
            }
        }

        logger.start().with_context(|| "starting logger")
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    if let Commands::Version = &cli.command {
        println!("{}", VERSION_STRING);
        return Ok(ExitCode::SUCCESS);
    }

    let ctx = DefaultContext::default();

    let log_handle = cli.configure_loggers(&ctx)?;

    let res = match cli.command {
        Commands::RunCheck(c) => c.run(&ctx),
        Commands::InstallApex(c) => c.run(&ctx),
        Commands::UninstallApex(c) => c.run(&ctx),
        Commands::ApexInfo(c) => c.run(),
        Commands::ZygoteArtifacts(c) => c.run(&ctx),
        Commands::SystemServerArtifacts(c) => c.run(&ctx),
        Commands::VerifyZygotes(c) => c.run(&ctx),
        Commands::VerifySystemServer(c) => c.run(&ctx),
        Commands::CompilationLog(c) => c.run(&ctx),
        Commands::Reboot(c) => c.run(&ctx),
        Commands::RestartZygote(c) => c.run(&ctx),
        Commands::EnableRoot(c) => c.run(&ctx),
        Commands::RestoreRoot(c) => c.run(&ctx),

        Commands::Version => panic!("unreachable"),
    };

    log_handle.flush();
    utils::exit_code(res).map(ExitCode::from)
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_verify_zygotes() {
        let cli = Cli::try_parse_from(["odsign", "-e", "-l", "2", "verify-zygotes", "--stem", "boot"])
            .expect("parsing args");
        assert!(cli.log_stderr);
        assert_eq!(cli.log_level, 2);
        assert!(matches!(cli.command, Commands::VerifyZygotes(_)));
    }

    #[test]
    fn test_verify_zygotes_requires_stem() {
        assert!(Cli::try_parse_from(["odsign", "verify-zygotes"]).is_err());
    }
}
