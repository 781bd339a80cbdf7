#![cfg(unix)]

use anyhow::Result;
use std::time::{Duration, Instant};
use stdlib_tour::{CommandSpec, PipeCoordinator, PipeState, ProcessRunner, StreamSource, TourError};

/// 寫入 stdin 後關閉，讀回轉換後的 stdout
#[tokio::test]
async fn test_filter_through_sed() -> Result<()> {
    let runner = ProcessRunner::new();
    let output = runner
        .run(CommandSpec::new("sed").arg("s/foo/bar/g"), b"foo foo")
        .await?;

    assert!(output.success());
    assert_eq!(output.stdout, b"bar bar");
    assert!(output.stderr.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_tr_uppercases_input() -> Result<()> {
    let runner = ProcessRunner::new();
    let output = runner
        .run(CommandSpec::new("tr").args(["a-z", "A-Z"]), b"some input")
        .await?;

    assert_eq!(format!("in all caps: {:?}", output.stdout_lossy()), "in all caps: \"SOME INPUT\"");
    Ok(())
}

/// 超過 pipe buffer 的資料量也不會卡死
#[tokio::test]
async fn test_large_payload_round_trips_through_cat() -> Result<()> {
    let payload: Vec<u8> = (0..(1024 * 1024 + 4096)).map(|i| (i % 251) as u8).collect();
    let runner = ProcessRunner::with_timeout(Some(Duration::from_secs(20)));

    let output = runner.run(CommandSpec::new("cat"), &payload).await?;

    assert_eq!(output.stdout.len(), payload.len());
    assert_eq!(output.stdout, payload);
    Ok(())
}

/// stderr 大量輸出時 stdout 也要能讀完
#[tokio::test]
async fn test_large_stderr_does_not_block_stdout() -> Result<()> {
    let script = "i=0; while [ $i -lt 20000 ]; do echo \"stderr line $i\" >&2; i=$((i+1)); done; echo done";
    let runner = ProcessRunner::with_timeout(Some(Duration::from_secs(20)));

    let output = runner.run(CommandSpec::shell(script), &[]).await?;

    assert_eq!(output.stdout_lossy(), "done\n");
    let stderr = output.stderr_lossy();
    assert_eq!(stderr.lines().count(), 20000);
    assert!(stderr.starts_with("stderr line 0\n"));
    assert!(stderr.ends_with("stderr line 19999\n"));
    Ok(())
}

#[tokio::test]
async fn test_exit_code_is_propagated() -> Result<()> {
    let runner = ProcessRunner::new();
    let output = runner
        .run(CommandSpec::shell("echo partial; echo oops >&2; exit 3"), &[])
        .await?;

    assert!(!output.success());
    assert_eq!(output.exit_code(), Some(3));
    // 非零退出碼時輸出仍完整保留
    assert_eq!(output.stdout_lossy(), "partial\n");
    assert_eq!(output.stderr_lossy(), "oops\n");

    let err = output.check().unwrap_err();
    assert_eq!(err.exit_code(), Some(3));
    assert_eq!(err.to_string(), "exit status 3");
    Ok(())
}

#[tokio::test]
async fn test_output_fails_on_nonzero_exit() -> Result<()> {
    let runner = ProcessRunner::new();
    let err = runner.output(CommandSpec::new("false")).await.unwrap_err();
    assert!(matches!(err, TourError::ExitStatus { code: Some(1), .. }));
    Ok(())
}

#[tokio::test]
async fn test_missing_program_is_launch_error() -> Result<()> {
    let mut coordinator = PipeCoordinator::new(CommandSpec::new("definitely-not-a-real-program-xyz"));
    let err = coordinator.run(b"ignored").await.unwrap_err();

    assert!(matches!(err, TourError::LaunchError { .. }));
    // 沒啟動成功就停在初始狀態
    assert_eq!(coordinator.state(), PipeState::NotStarted);
    Ok(())
}

/// 逾時會殺掉子行程並回報 Timeout
#[tokio::test]
async fn test_timeout_kills_child() -> Result<()> {
    let runner = ProcessRunner::new();
    let spec = CommandSpec::new("sleep")
        .arg("30")
        .timeout(Duration::from_millis(200));

    let started = Instant::now();
    let err = runner.run(spec, &[]).await.unwrap_err();

    assert!(matches!(err, TourError::Timeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(10));
    Ok(())
}

/// 逾時後子行程已被殺掉並回收，pid 不再存在
#[tokio::test]
async fn test_timeout_reaps_child_process() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let pid_file = dir.path().join("child.pid");
    let script = format!("echo $$ > '{}'; exec sleep 30", pid_file.display());

    let runner = ProcessRunner::new();
    let spec = CommandSpec::shell(script).timeout(Duration::from_millis(500));
    let err = runner.run(spec, &[]).await.unwrap_err();
    assert!(matches!(err, TourError::Timeout { .. }));

    let pid = std::fs::read_to_string(&pid_file)?.trim().to_string();
    assert!(!pid.is_empty());

    let alive = std::process::Command::new("kill")
        .args(["-0", &pid])
        .stderr(std::process::Stdio::null())
        .status()?;
    assert!(!alive.success(), "child {} is still running", pid);
    Ok(())
}

#[tokio::test]
async fn test_combined_output_keeps_arrival_order() -> Result<()> {
    let runner = ProcessRunner::new();
    let script = "echo 1; sleep 0.1; echo 2 >&2; sleep 0.1; echo 3 >&2; sleep 0.1; echo 4";

    let combined = runner.combined_output(CommandSpec::shell(script), &[]).await?;
    assert_eq!(String::from_utf8(combined)?, "1\n2\n3\n4\n");
    Ok(())
}

/// 同一個 key 設兩次時，以最後一次為準
#[tokio::test]
async fn test_env_last_value_wins() -> Result<()> {
    let runner = ProcessRunner::new();
    let spec = CommandSpec::shell("printf %s \"$FOO\"")
        .env("FOO", "duplicate_value")
        .env("FOO", "actual_value");

    let stdout = runner.output(spec).await?;
    assert_eq!(stdout, b"actual_value");
    Ok(())
}

#[tokio::test]
async fn test_env_clear_and_current_dir() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let runner = ProcessRunner::new();
    let spec = CommandSpec::new("/bin/sh")
        .args(["-c", "printf '%s|%s' \"$HOME\" \"$(pwd)\""])
        .env_clear()
        .current_dir(dir.path());

    let stdout = String::from_utf8(runner.output(spec).await?)?;
    let (home, pwd) = stdout.split_once('|').unwrap();
    assert_eq!(home, "");
    assert_eq!(
        std::fs::canonicalize(pwd)?,
        std::fs::canonicalize(dir.path())?
    );
    Ok(())
}

/// 即時逐行輸出，同時保留完整緩衝
#[tokio::test]
async fn test_streaming_lines_tee_into_buffers() -> Result<()> {
    let runner = ProcessRunner::new();
    let script = "echo 1; echo 2 >&2; echo 3 >&2; echo 4";
    let (mut lines, handle) = runner.spawn_streaming(CommandSpec::shell(script), Vec::new());

    let mut out = Vec::new();
    let mut err = Vec::new();
    while let Some(line) = lines.recv().await {
        match line.source {
            StreamSource::Stdout => out.push(line.line),
            StreamSource::Stderr => err.push(line.line),
        }
    }
    let captured = handle.await??;

    assert_eq!(out, vec!["1", "4"]);
    assert_eq!(err, vec!["2", "3"]);
    assert_eq!(captured.stdout_lossy(), "1\n4\n");
    assert_eq!(captured.stderr_lossy(), "2\n3\n");
    Ok(())
}

/// 子行程沒讀 stdin 就結束時不算錯誤
#[tokio::test]
async fn test_child_ignoring_stdin_is_not_an_error() -> Result<()> {
    let payload = vec![b'z'; 4 * 1024 * 1024];
    let runner = ProcessRunner::new();

    let output = runner.run(CommandSpec::new("true"), &payload).await?;
    assert!(output.success());
    assert!(output.stdout.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_decode_json_from_child() -> Result<()> {
    #[derive(serde::Deserialize)]
    struct Person {
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Age")]
        age: u32,
    }

    let runner = ProcessRunner::new();
    let person: Person = runner
        .decode_json_stdout(CommandSpec::shell(r#"echo '{"Name": "Bob", "Age": 32}'"#))
        .await?;

    assert_eq!(format!("{} is {} years old", person.name, person.age), "Bob is 32 years old");
    Ok(())
}
