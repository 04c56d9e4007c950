use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use mockall::mock;
use rstest::fixture;

use crate::command::CmdOutput;

mock! {
    pub Adb {

    }

    impl crate::adb::Adb for Adb {
        fn get_connected_devices(&self) -> crate::Result<Vec<String>>;
        fn install_multi_apex(&self, apexes: &[String]) -> io::Result<CmdOutput>;
        fn uninstall(&self, package: &str) -> crate::Result<()>;
        fn shell(&self, shell_cmd: &str) -> io::Result<CmdOutput>;
        fn root(&self) -> io::Result<CmdOutput>;
        fn unroot(&self) -> io::Result<CmdOutput>;
        fn reboot(&self) -> io::Result<CmdOutput>;
        fn wait_for_device(&self) -> io::Result<CmdOutput>;
        fn get_state(&self) -> io::Result<CmdOutput>;
    }
}

#[fixture]
pub fn mock_adb() -> MockAdb {
    MockAdb::new()
}

/// Build the output of a device command that exited with `code`
pub fn cmd_output(code: i32, stdout: &str) -> CmdOutput {
    CmdOutput {
        status: ExitStatus::from_raw(code << 8),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}
