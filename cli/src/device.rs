use clap::{self, Args};
use odsign::Context;

use crate::utils::get_test_utils;

#[derive(Args)]
pub struct Reboot {}

impl Reboot {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        get_test_utils(ctx)?.reboot()?;
        Ok(())
    }
}

#[derive(Args)]
pub struct RestartZygote {}

impl RestartZygote {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        get_test_utils(ctx)?.restart_zygote()?;
        Ok(())
    }
}
