use std::process::{Command, Stdio};

/// Opens `url` with the platform's default handler.
///
/// Failures are logged only; the simulator keeps running without a browser.
pub fn open(url: &str) {
    let mut command = opener(url);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    match command.spawn() {
        Ok(_) => log::info!("Opened {url} in the default browser"),
        Err(e) => log::warn!("Could not open a browser ({e}); visit {url} manually"),
    }
}

fn opener(url: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        // the empty argument is the window title `start` expects first
        command.args(["/C", "start", "", url]);
        command
    } else if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(url);
        command
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(url);
        command
    }
}
