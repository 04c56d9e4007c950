use std::fmt;

use clap::{self, Args};
use odsign::{Context, Settings};

#[derive(Args)]
pub struct RunCheck {}

enum Importance {
    Optional,
    Required,
}

enum Status {
    Missing,
    Exists(String),
}

struct Info {
    name: String,
    status: Status,
    importance: Importance,
}

impl Info {
    fn new(name: &str, found: Option<String>, importance: Importance) -> Self {
        Self {
            name: name.into(),
            status: found.map(Status::Exists).unwrap_or(Status::Missing),
            importance,
        }
    }

    fn is_fatal(&self) -> bool {
        matches!(
            (&self.status, &self.importance),
            (Status::Missing, Importance::Required)
        )
    }
}

fn check_bin(ctx: &dyn Context, bin: &str, importance: Importance) -> Info {
    Info::new(bin, ctx.maybe_get_bin(bin), importance)
}

fn check_env(ctx: &dyn Context, env: &str, importance: Importance) -> Info {
    Info::new(env, ctx.maybe_get_env(env), importance)
}

fn check_test_file(settings: &Settings, name: &str, importance: Importance) -> Info {
    let found = settings
        .find_test_file(name)
        .ok()
        .map(|it| it.to_string_lossy().into_owned());
    Info::new(name, found, importance)
}

#[cfg(feature = "emoji")]
mod status {
    pub const FAIL: &str = "💩";
    pub const OK: &str = "🚀";
    pub const MEH: &str = "😒";
}

#[cfg(not(feature = "emoji"))]
mod status {
    pub const FAIL: &str = "Fail";
    pub const OK: &str = "Ok";
    pub const MEH: &str = "Meh";
}

use status::*;

fn print_section(title: &str, checks: &[Info]) {
    println!("{}:\n", title);
    for c in checks {
        println!("{}", c);
    }
    println!();
}

impl RunCheck {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let settings = Settings::from_context(ctx)?;

        #[cfg(feature = "emoji")]
        {
            println!("{} = Present", OK);
            println!("{} = Required and missing", FAIL);
            println!("{} = Optional and missing\n", MEH);
        }

        let bins = vec![check_bin(ctx, "adb", Importance::Required)];
        print_section("External programs", &bins);

        let envs = vec![
            check_env(ctx, "ANDROID_SERIAL", Importance::Optional),
            check_env(ctx, "ODSIGN_PROJECT_HOME", Importance::Optional),
            check_env(ctx, "ODSIGN_TESTCASES", Importance::Optional),
        ];
        print_section("Environmental variables", &envs);

        // Only installing needs the APEX, everything else works without it
        let files = vec![check_test_file(
            &settings,
            &settings.test_apex,
            Importance::Optional,
        )];
        print_section("Test files", &files);

        let missing = bins
            .iter()
            .chain(envs.iter())
            .chain(files.iter())
            .filter(|it| it.is_fatal())
            .count();
        if missing > 0 {
            anyhow::bail!("{} required item(s) missing", missing);
        }
        Ok(())
    }
}

impl fmt::Display for Info {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.status {
            Status::Missing => {
                write!(
                    f,
                    "{}: {}",
                    match self.importance {
                        Importance::Optional => MEH,
                        Importance::Required => FAIL,
                    },
                    self.name
                )
            }
            Status::Exists(path) => {
                write!(f, "{}: {} ({})", OK, self.name, path)
            }
        }
    }
}
