use clap::{self, Args, Subcommand};
use odsign::odsign::ODREFRESH_COMPILATION_LOG;
use odsign::Context;

use crate::utils::get_test_utils;

#[derive(Args)]
pub struct CompilationLog {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fail unless odrefresh's compilation log exists
    #[command()]
    Exists,

    /// Remove the compilation log so odrefresh doesn't back off
    #[command()]
    Remove,
}

impl CompilationLog {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let utils = get_test_utils(ctx)?;
        match &self.command {
            Command::Exists => {
                if !utils.have_compilation_log()? {
                    anyhow::bail!("{} doesn't exist", ODREFRESH_COMPILATION_LOG);
                }
                println!("{}", ODREFRESH_COMPILATION_LOG);
            }
            Command::Remove => utils.remove_compilation_log_to_avoid_backoff()?,
        }
        Ok(())
    }
}
