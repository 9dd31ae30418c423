use super::RawMode;
use crate::{
    error::{Error, Result},
    source::InputDevice,
};
use std::{
    io,
    os::fd::OwnedFd,
    process::{Command, Stdio},
};
use tracing::warn;

const NAME: &str = "stty";
const RAW_ARGS: &[&str] = &["-echo", "-icanon", "-isig", "min", "1", "time", "0"];

/// Shells out to `stty`, handing it the source's device as its standard input.
/// For systems without a terminal attribute API we can call.
#[derive(Default)]
pub struct SttyRawMode {
    saved: Option<(OwnedFd, String)>,
}

impl SttyRawMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn available() -> bool {
        InputDevice::stdin()
            .try_clone_fd()
            .and_then(|fd| stty(&fd, &["-g"]))
            .is_ok()
    }
}

impl RawMode for SttyRawMode {
    fn name(&self) -> &'static str {
        NAME
    }

    fn disable(&mut self, device: InputDevice<'_>) -> Result<()> {
        let fd = device.try_clone_fd().map_err(|e| Error::device(NAME, e))?;
        let before = stty(&fd, &["-g"]).map_err(|e| Error::device(NAME, e))?;
        if let Err(err) = stty(&fd, RAW_ARGS) {
            // Some flags may have been applied before the failure.
            if let Err(restore_err) = stty(&fd, &[before.as_str()]) {
                warn!(error = %restore_err, "stty could not put back saved settings");
            }
            return Err(Error::device(NAME, err));
        }
        self.saved = Some((fd, before));
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        let Some((fd, before)) = self.saved.take() else {
            return Ok(());
        };
        stty(&fd, &[before.as_str()])?;
        Ok(())
    }
}

fn stty(device: &OwnedFd, args: &[&str]) -> io::Result<String> {
    let output = Command::new("stty")
        .args(args)
        .stdin(Stdio::from(device.try_clone()?))
        .stderr(Stdio::null())
        .output()?;
    if !output.status.success() {
        return Err(io::Error::other(format!(
            "stty {} exited with {}",
            args.join(" "),
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
