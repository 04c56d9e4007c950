use clap::{self, Args};
use odsign::odsign::{ADB_ROOT_ENABLED_KEY, WAS_ADB_ROOT_KEY};
use odsign::{Context, TestProperties};

use crate::utils::{get_test_utils, load_properties, save_properties};

#[derive(Args)]
pub struct EnableRoot {}

impl EnableRoot {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let utils = get_test_utils(ctx)?;
        let mut props = load_properties(ctx)?;
        let res = utils.enable_adb_root_or_skip(&mut props);
        // The previous root state is needed by `restore-root` even if enabling
        // root was skipped
        save_properties(ctx, &props)?;
        res?;
        Ok(())
    }
}

#[derive(Args)]
pub struct RestoreRoot {}

impl RestoreRoot {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let mut props = load_properties(ctx)?;
        if !needs_restore(&props) {
            log::info!("adb root wasn't enabled by enable-root");
        } else {
            get_test_utils(ctx)?.restore_adb_root(&props)?;
        }
        clear_root_state(&mut props);
        save_properties(ctx, &props)
    }
}

fn needs_restore(props: &TestProperties) -> bool {
    props.get_bool_or_default(ADB_ROOT_ENABLED_KEY) && !props.get_bool_or_default(WAS_ADB_ROOT_KEY)
}

fn clear_root_state(props: &mut TestProperties) {
    props.remove(WAS_ADB_ROOT_KEY);
    props.remove(ADB_ROOT_ENABLED_KEY);
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(Some(true), Some(false), true)]
    #[case(Some(true), Some(true), false)]
    #[case(Some(false), Some(false), false)]
    #[case(None, None, false)]
    fn test_needs_restore(
        #[case] enabled: Option<bool>,
        #[case] was_root: Option<bool>,
        #[case] expected: bool,
    ) {
        let mut props = TestProperties::new();
        if let Some(v) = enabled {
            props.set_bool(ADB_ROOT_ENABLED_KEY, v);
        }
        if let Some(v) = was_root {
            props.set_bool(WAS_ADB_ROOT_KEY, v);
        }
        assert_eq!(needs_restore(&props), expected);

        clear_root_state(&mut props);
        assert!(props.is_empty());
    }
}
