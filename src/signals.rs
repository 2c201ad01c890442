use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};
use tokio::sync::mpsc::Sender;

// NOTIFY_SOCKET stays set: a READY may be followed by any number of STOPPINGs.
pub fn notify_ready() {
    let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]);
}

fn notify_stopping() {
    let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Stopping]);
}

/// What should we do when the user stops
/// this program?
///
/// Every SIGINT/SIGTERM asks the watcher to stop; the watcher then closes
/// the event channel and the main loop drains and exits.
pub fn handle_stop(cancel: Sender<()>) -> std::io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    std::thread::spawn(move || {
        for signal in signals.forever() {
            log::info!("Received signal {signal}, stopping watch");
            notify_stopping();
            if cancel.blocking_send(()).is_err() {
                // The watcher is already gone.
                break;
            }
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixDatagram;
    use std::time::Duration;

    #[test]
    fn test_ready_then_stopping_reach_systemd() {
        let path = std::env::temp_dir().join(format!("dockwatch-notify-{}.sock", uuid::Uuid::now_v7()));
        let socket = UnixDatagram::bind(&path).expect("Failed to bind notify socket");
        socket
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("Failed to set timeout");

        // SAFETY: no other test in this binary reads or writes the environment.
        unsafe { std::env::set_var("NOTIFY_SOCKET", &path) };

        notify_ready();
        notify_stopping();

        let mut received = Vec::new();
        let mut buf = [0u8; 256];
        for _ in 0..2 {
            let n = socket.recv(&mut buf).expect("Missing notification");
            received.push(String::from_utf8_lossy(&buf[..n]).into_owned());
        }

        assert!(received[0].contains("READY=1"), "got {received:?}");
        assert!(received[1].contains("STOPPING=1"), "got {received:?}");
        assert!(std::env::var_os("NOTIFY_SOCKET").is_some());

        unsafe { std::env::remove_var("NOTIFY_SOCKET") };
        let _ = std::fs::remove_file(&path);
    }
}
