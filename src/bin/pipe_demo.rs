use clap::Parser;
use std::time::Duration;
use stdlib_tour::core::command::look_path;
use stdlib_tour::utils::logger;
use stdlib_tour::{CommandSpec, ProcessRunner, StreamSource};

/// 輪流寫 stdout 和 stderr 的小腳本
const INTERLEAVED: &str = "echo 1 && sleep 0.2 && \
                           echo 2 >&2 && sleep 0.2 && \
                           echo 3 >&2 && sleep 0.2 && \
                           echo 4";

#[derive(Parser)]
#[command(name = "pipe-demo")]
#[command(about = "Walk through the subprocess pipe patterns: filter, tee, combined output and timeout")]
struct Args {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Bytes pushed through `cat` in the large-volume step
    #[arg(long, default_value = "1048576")]
    volume: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting pipe demo");
    let runner = ProcessRunner::with_timeout(Some(Duration::from_secs(10)));

    // 1. filter: 寫 stdin、讀 stdout
    let filtered = runner
        .run(CommandSpec::new("sed").arg("s/foo/bar/g"), b"foo foo")
        .await?
        .check()?;
    println!("sed: {}", filtered.stdout_lossy());

    let upper = runner
        .run(CommandSpec::new("tr").args(["a-z", "A-Z"]), b"some input")
        .await?;
    println!("in all caps: {:?}", upper.stdout_lossy());

    // 2. tee: 逐行即時印出，同時保留完整內容
    let (mut lines, handle) = runner.spawn_streaming(CommandSpec::shell(INTERLEAVED), Vec::new());
    while let Some(line) = lines.recv().await {
        match line.source {
            StreamSource::Stdout => println!("out: {}", line.line),
            StreamSource::Stderr => eprintln!("err: {}", line.line),
        }
    }
    let teed = handle.await??;
    println!(
        "captured stdout {:?}, stderr {:?}",
        teed.stdout_lossy(),
        teed.stderr_lossy()
    );

    // 3. combined: 依到達順序合併
    let combined = runner
        .combined_output(CommandSpec::shell(INTERLEAVED), &[])
        .await?;
    print!("combined:\n{}", String::from_utf8_lossy(&combined));

    // 4. 大量資料：stdin 與 stdout 同時進行才不會卡住
    let payload = vec![b'x'; args.volume];
    let echoed = runner.run(CommandSpec::new("cat"), &payload).await?;
    println!("cat echoed {} of {} bytes", echoed.stdout.len(), payload.len());

    // 5. 退出碼
    let failed = runner.run(CommandSpec::shell("exit 3"), &[]).await?;
    println!("exit code: {:?}", failed.exit_code());

    // 6. 逾時
    let slow = CommandSpec::new("sleep").arg("5").timeout(Duration::from_millis(200));
    match runner.run(slow, &[]).await {
        Ok(output) => println!("sleep finished early: {}", output.status),
        Err(e) => println!("timeout: {}", e),
    }

    match look_path("fortune") {
        Ok(path) => println!("fortune is available at {}", path.display()),
        Err(_) => tracing::info!("installing fortune is in your future"),
    }

    tracing::info!("✅ Pipe demo finished");
    Ok(())
}
