use std::process::{Command, Stdio};

fn panelwatch(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_panelwatch"))
        .args(args)
        .env_remove("PANELWATCH_LOG_LEVEL")
        .env_remove("PANELWATCH_LOG_PATH")
        .stdin(Stdio::null())
        .output()
        .unwrap()
}

#[test]
fn missing_display_exits_non_zero_after_retries() {
    let output = panelwatch(&[
        "run",
        "--bus-backend",
        "i2cdev",
        "--i2c-bus",
        "250",
        "--init-attempts",
        "2",
        "--init-delay",
        "1ms",
    ]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("display unavailable after 2 attempts"),
        "stderr: {stderr}"
    );
}

#[test]
fn invalid_flag_exits_non_zero_with_help() {
    let output = panelwatch(&["--pages", "9"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("pages must be between"));

    let output = panelwatch(&["--frobnicate"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("USAGE:"));
}

#[test]
fn version_exits_zero() {
    let output = panelwatch(&["--version"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        env!("CARGO_PKG_VERSION")
    );
}
