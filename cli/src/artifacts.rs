use std::collections::BTreeSet;

use clap::{self, Args};
use itertools::Itertools;
use odsign::odsign::ZYGOTE_NAMES;
use odsign::Context;

use crate::utils::get_test_utils;

fn print_artifacts(artifacts: &BTreeSet<String>) {
    println!("{}", artifacts.iter().join("\n"));
}

#[derive(Args)]
pub struct ZygoteArtifacts {
    /// Only list the artifacts of this Zygote, e.g. `zygote64`
    #[arg(short, long)]
    name: Option<String>,
}

impl ZygoteArtifacts {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let utils = get_test_utils(ctx)?;
        let names: Vec<&str> = match &self.name {
            Some(v) => vec![v.as_str()],
            None => ZYGOTE_NAMES.to_vec(),
        };
        for name in names {
            match utils.get_zygote_loaded_artifacts(name)? {
                Some(artifacts) => {
                    println!("{}:", name);
                    print_artifacts(&artifacts);
                }
                None => println!("{}: not running", name),
            }
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct SystemServerArtifacts {}

impl SystemServerArtifacts {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let utils = get_test_utils(ctx)?;
        print_artifacts(&utils.get_system_server_loaded_artifacts()?);
        Ok(())
    }
}

#[derive(Args)]
pub struct VerifyZygotes {
    /// Boot image stem, e.g. `boot` or `boot-framework`
    #[arg(short, long)]
    stem: String,
}

impl VerifyZygotes {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let utils = get_test_utils(ctx)?;
        let verified = utils.verify_zygotes_loaded_artifacts(&self.stem)?;
        print_artifacts(&verified);
        Ok(())
    }
}

#[derive(Args)]
pub struct VerifySystemServer {}

impl VerifySystemServer {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        get_test_utils(ctx)?.verify_system_server_loaded_artifacts()?;
        Ok(())
    }
}
