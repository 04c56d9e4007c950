use std::path::PathBuf;

use clap::{self, Args};
use odsign::{ApexInfo, Context};

use crate::utils::get_test_utils;

#[derive(Args)]
pub struct InstallApex {}

impl InstallApex {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let utils = get_test_utils(ctx)?;
        utils.install_test_apex()?;
        println!("Installed {}", utils.settings().test_apex);
        Ok(())
    }
}

#[derive(Args)]
pub struct UninstallApex {}

impl UninstallApex {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let utils = get_test_utils(ctx)?;
        utils.uninstall_test_apex()?;
        Ok(())
    }
}

#[derive(Args)]
pub struct ApexInfoCmd {
    /// The `.apex` file to read
    #[arg()]
    file: PathBuf,
}

impl ApexInfoCmd {
    pub fn run(&self) -> anyhow::Result<()> {
        let info = ApexInfo::from_file(&self.file)?;
        println!("{}@{}", info.name, info.version);
        Ok(())
    }
}
