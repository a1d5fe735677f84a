//! systemd adapter and agent readiness probe.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{ReadinessProbe, ServiceManager};
use crate::command_runner::{ensure_success, CommandRunner, TokioCommandRunner, DEFAULT_CMD_TIMEOUT};

/// Where unit descriptors are installed.
pub const SERVICE_INSTALL_DIR: &str = "/etc/systemd/system";

/// Routes all service-manager operations through a [`CommandRunner`], so
/// tests can inject a recording runner instead of spawning `systemctl`.
pub struct SystemdManager<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> SystemdManager<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl SystemdManager<TokioCommandRunner> {
    #[must_use]
    pub fn default_runner() -> Self {
        Self::new(TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT))
    }
}

impl<R: CommandRunner> ServiceManager for SystemdManager<R> {
    async fn stop_unit(&self, unit: &str) -> Result<()> {
        let output = self
            .runner
            .run("sudo", &["systemctl", "stop", unit])
            .await
            .context("failed to run systemctl stop")?;
        ensure_success(&output, &format!("stopping {unit}"))
    }

    async fn install_unit(&self, descriptor: &Path) -> Result<()> {
        let source = descriptor.to_string_lossy();
        let output = self
            .runner
            .run("sudo", &["cp", &source, SERVICE_INSTALL_DIR])
            .await
            .context("failed to run cp")?;
        ensure_success(&output, &format!("installing {source}"))
    }

    async fn reload_manager(&self) -> Result<()> {
        let output = self
            .runner
            .run("sudo", &["systemctl", "daemon-reload"])
            .await
            .context("failed to run systemctl daemon-reload")?;
        ensure_success(&output, "reloading systemd")
    }

    async fn start_unit(&self, unit: &str) -> Result<()> {
        let output = self
            .runner
            .run("sudo", &["systemctl", "start", unit])
            .await
            .context("failed to run systemctl start")?;
        ensure_success(&output, &format!("starting {unit}"))
    }
}

/// Polls the agent's local API until it answers.
///
/// Any HTTP response counts as "listening" — yagna may reject an
/// unauthenticated probe with 401, which still proves the socket is up.
/// Transport errors count as not-ready.
pub struct HttpReadinessProbe {
    url: String,
    attempts: u32,
    interval: Duration,
}

impl HttpReadinessProbe {
    /// Probe `{api_url}/version/get` with the default budget (30 × 1 s).
    #[must_use]
    pub fn new(api_url: &str) -> Self {
        Self::with_budget(api_url, 30, Duration::from_secs(1))
    }

    #[must_use]
    pub fn with_budget(api_url: &str, attempts: u32, interval: Duration) -> Self {
        Self {
            url: format!("{api_url}/version/get"),
            attempts,
            interval,
        }
    }
}

impl ReadinessProbe for HttpReadinessProbe {
    async fn wait_ready(&self) -> Result<()> {
        let mut last_err = None;
        for attempt in 1..=self.attempts {
            // ureq is blocking; keep the connect/read off the runtime's
            // worker threads.
            let url = self.url.clone();
            let result = tokio::task::spawn_blocking(move || ureq::get(&url).call().map(drop))
                .await
                .context("readiness probe task failed")?;
            match result {
                Ok(()) | Err(ureq::Error::Status(_, _)) => return Ok(()),
                Err(e) => {
                    last_err = Some(e);
                    if attempt < self.attempts {
                        tokio::time::sleep(self.interval).await;
                    }
                }
            }
        }
        let context = format!(
            "agent API at {} not ready after {} attempts",
            self.url, self.attempts
        );
        match last_err {
            Some(e) => Err(anyhow::anyhow!(e).context(context)),
            None => anyhow::bail!(context),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::io::{Read as _, Write as _};
    use std::net::TcpListener;
    use std::process::Output;
    use std::sync::Mutex;

    use super::*;

    #[cfg(unix)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code << 8)
    }

    #[cfg(windows)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::windows::process::ExitStatusExt;
        #[allow(clippy::cast_sign_loss)]
        std::process::ExitStatus::from_raw(code as u32)
    }

    /// Records argv and returns a fixed exit code.
    struct RecordingRunner {
        calls: Mutex<Vec<String>>,
        exit_code: i32,
        stderr: &'static [u8],
    }

    impl RecordingRunner {
        fn ok() -> Self {
            Self { calls: Mutex::new(vec![]), exit_code: 0, stderr: b"" }
        }
        fn failing(stderr: &'static [u8]) -> Self {
            Self { calls: Mutex::new(vec![]), exit_code: 1, stderr }
        }
        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    impl CommandRunner for RecordingRunner {
        async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
            self.calls
                .lock()
                .expect("calls lock")
                .push(format!("{program} {}", args.join(" ")));
            Ok(Output {
                status: exit_status(self.exit_code),
                stdout: vec![],
                stderr: self.stderr.to_vec(),
            })
        }
        async fn run_in_dir(&self, _: &str, _: &[&str], _: &Path) -> Result<Output> {
            anyhow::bail!("not expected in this test")
        }
    }

    #[tokio::test]
    async fn test_manager_issues_expected_systemctl_commands() {
        let runner = RecordingRunner::ok();
        let mgr = SystemdManager::new(runner);

        mgr.stop_unit("yagna-alpha").await.expect("stop");
        mgr.install_unit(Path::new("/tmp/yagna-alpha.service"))
            .await
            .expect("install");
        mgr.reload_manager().await.expect("reload");
        mgr.start_unit("yagna-alpha").await.expect("start");

        assert_eq!(
            mgr.runner.calls(),
            vec![
                "sudo systemctl stop yagna-alpha",
                "sudo cp /tmp/yagna-alpha.service /etc/systemd/system",
                "sudo systemctl daemon-reload",
                "sudo systemctl start yagna-alpha",
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_start_carries_stderr() {
        let mgr = SystemdManager::new(RecordingRunner::failing(b"Unit not found."));
        let err = mgr.start_unit("vanity-alpha").await.expect_err("must fail");
        let msg = format!("{err:#}");
        assert!(msg.contains("starting vanity-alpha"), "got: {msg}");
        assert!(msg.contains("Unit not found."), "got: {msg}");
    }

    /// One-shot HTTP server answering with the given status line, after
    /// an optional delay.
    fn serve_once_after(delay: Duration, status_line: &str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let response =
            format!("HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                std::thread::sleep(delay);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        port
    }

    fn serve_once(status_line: &str) -> u16 {
        serve_once_after(Duration::ZERO, status_line)
    }

    #[tokio::test]
    async fn test_probe_accepts_any_http_response() {
        let port = serve_once("401 Unauthorized");
        let probe = HttpReadinessProbe::with_budget(
            &format!("http://127.0.0.1:{port}"),
            3,
            Duration::from_millis(10),
        );
        probe.wait_ready().await.expect("401 still proves the socket is up");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_probe_does_not_stall_the_runtime_while_waiting() {
        let port = serve_once_after(Duration::from_millis(400), "200 OK");
        let probe = HttpReadinessProbe::with_budget(
            &format!("http://127.0.0.1:{port}"),
            1,
            Duration::from_millis(10),
        );

        // On a single-threaded runtime a probe that blocked in-place would
        // starve this timer until the server answers at 400 ms.
        let start = std::time::Instant::now();
        let (probe_result, timer_elapsed) = tokio::join!(probe.wait_ready(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            start.elapsed()
        });
        probe_result.expect("server eventually answers");
        assert!(
            timer_elapsed < Duration::from_millis(300),
            "timer starved for {timer_elapsed:?}"
        );
    }

    #[tokio::test]
    async fn test_probe_exhausts_budget_on_unreachable_endpoint() {
        let probe = HttpReadinessProbe::with_budget(
            "http://127.0.0.1:1",
            2,
            Duration::from_millis(10),
        );
        let err = probe.wait_ready().await.expect_err("must give up");
        assert!(format!("{err:#}").contains("not ready after 2 attempts"), "got: {err:#}");
    }
}
