use std::fmt::Display;

use anyhow::bail;
use promptly::prompt;

use odsign::adb::{Adb, ExecAdb};
use odsign::{Context, Device, OdsignTestUtils, Settings, TestProperties};

/// Exit status for a skipped test, the same one automake and meson use
pub const SKIPPED_EXIT_CODE: u8 = 77;

/// Turn a command result into the process exit status
///
/// Skips are reported on stdout and aren't failures. Any other error goes
/// back to `main` to be printed.
pub fn exit_code(res: anyhow::Result<()>) -> anyhow::Result<u8> {
    match res {
        Ok(()) => Ok(0),
        Err(e) => match skip_reason(&e) {
            Some(reason) => {
                println!("SKIPPED: {}", reason);
                Ok(SKIPPED_EXIT_CODE)
            }
            None => Err(e),
        },
    }
}

fn skip_reason(err: &anyhow::Error) -> Option<&str> {
    match err.downcast_ref::<odsign::Error>() {
        Some(odsign::Error::Skipped(reason)) => Some(reason.as_str()),
        _ => None,
    }
}

/// Gets an [Adb] implementation using the context
///
/// If multiple devices are plugged in and ANDROID_SERIAL isn't set,
/// the user will be prompted if `prompt_on_multiple` is true. When running
/// tests, `ANDROID_SERIAL` should basically always be set.
pub fn get_adb(ctx: &dyn Context, prompt_on_multiple: bool) -> anyhow::Result<ExecAdb> {
    let adb = ExecAdb::new(ctx)?;
    if adb.has_serial() {
        return Ok(adb);
    }
    let devices = adb.get_connected_devices()?;
    if devices.len() == 1 {
        return Ok(adb);
    }
    if !prompt_on_multiple {
        bail!("multiple adb devices connected and ANDROID_SERIAL unset");
    }

    let serial = prompt_choice(
        &devices,
        "Multiple ADB devices found, please select one:",
        "Device number: ",
    )?;

    Ok(adb.with_serial(serial.clone()))
}

/// Everything needed to run the test helpers against the configured device
pub fn get_test_utils(ctx: &dyn Context) -> anyhow::Result<OdsignTestUtils<ExecAdb>> {
    let settings = Settings::from_context(ctx)?;
    let adb = get_adb(ctx, true)?;
    let device = Device::new(adb)
        .with_poll_interval(settings.poll_interval)
        .with_offline_timeout(settings.reboot_offline_timeout);
    Ok(OdsignTestUtils::new(device, settings))
}

pub fn load_properties(ctx: &dyn Context) -> anyhow::Result<TestProperties> {
    let path = ctx.get_properties_file()?;
    Ok(TestProperties::load(&path)?)
}

pub fn save_properties(ctx: &dyn Context, props: &TestProperties) -> anyhow::Result<()> {
    let path = ctx.get_properties_file()?;
    props.save(&path)?;
    Ok(())
}

pub fn prompt_choice<'a, E: Display>(
    choices: &'a [E],
    desc: &str,
    prompt_text: &str,
) -> anyhow::Result<&'a E> {
    println!("{}", desc);
    for (i, c) in choices.iter().enumerate() {
        println!("({}) {}", i, c);
    }

    loop {
        let sel: usize = match prompt(prompt_text) {
            Ok(ans) => ans,
            Err(e) => bail!("prompt failed: {}", e),
        };
        match choices.get(sel) {
            Some(choice) => return Ok(choice),
            None => eprintln!("invalid selection {}", sel),
        }
    }
}
