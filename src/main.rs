use anyhow::Context;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use stdlib_tour::adapters::router::{CountHandler, FileServer, HomeHandler, NotFoundHandler, StripPrefix, TextHandler};
use stdlib_tour::adapters::{env, http_server};
use stdlib_tour::codec::json;
use stdlib_tour::core::ConfigProvider;
use stdlib_tour::utils::error::ErrorSeverity;
use stdlib_tour::utils::{logger, validation::{self, Validate}};
use stdlib_tour::{
    CliConfig, CommandSpec, Commands, HttpClient, OutputLine, ProcessRunner, Router, Settings, StreamSource, TourConfig,
    TourError,
};
use tokio::io::AsyncReadExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let file_config = match &cli.config {
        Some(path) => TourConfig::from_file(path)
            .with_context(|| format!("failed to load config file {}", path.display()))?,
        None => TourConfig::default(),
    };
    let settings = Settings::from_file(&file_config).with_flags(cli.verbose, cli.json_logs);

    // 初始化日誌
    if settings.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(settings.verbose());
    }

    tracing::info!("Starting stdlib-tour CLI");
    tracing::debug!("CLI config: {:?}", cli);

    // 驗證配置
    if let Err(e) = file_config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    match execute(cli.command, settings).await {
        Ok(code) => {
            if code != 0 {
                std::process::exit(code);
            }
        }
        Err(e) => {
            tracing::error!("❌ Command failed: {} (Severity: {:?})", e, e.severity());

            // 輸出用戶友好的錯誤信息
            eprintln!("❌ {}", e.user_friendly_message());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => e.exit_code().unwrap_or(1),
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn execute(command: Commands, settings: Settings) -> stdlib_tour::Result<i32> {
    match command {
        Commands::Run {
            input,
            input_file,
            timeout,
            combined,
            program,
            args,
        } => {
            let settings = settings.with_process_timeout(timeout.map(Duration::from_secs));
            run_program(&settings, program, args, input, input_file, combined).await
        }
        Commands::Serve { addr, files } => {
            let settings = settings
                .with_server_addr(addr)
                .with_files_root(files.map(|p| p.to_string_lossy().into_owned()));
            serve(&settings).await?;
            Ok(0)
        }
        Commands::Fetch { url } => fetch(&url).await,
        Commands::Indent { prefix, indent } => {
            let mut src = Vec::new();
            tokio::io::stdin().read_to_end(&mut src).await?;
            let mut out = json::indent(&src, &prefix, &indent)?;
            out.push(b'\n');
            std::io::stdout().write_all(&out)?;
            Ok(0)
        }
        Commands::Expand { template } => {
            println!("{}", env::expand_env(&template));
            Ok(0)
        }
    }
}

async fn run_program(
    settings: &Settings,
    program: String,
    args: Vec<String>,
    input: Option<String>,
    input_file: Option<PathBuf>,
    combined: bool,
) -> stdlib_tour::Result<i32> {
    validation::validate_non_empty_string("program", &program)?;

    let payload = match (input, input_file) {
        (Some(text), _) => text.into_bytes(),
        (None, Some(path)) => tokio::fs::read(&path).await?,
        (None, None) => Vec::new(),
    };

    let mut spec = CommandSpec::new(program).args(args).combined(combined);
    for (key, value) in &settings.child_env {
        spec = spec.env(key, value);
    }

    let runner = ProcessRunner::with_timeout(settings.process_timeout());
    let (mut lines, handle) = runner.spawn_streaming(spec, payload);

    // 邊跑邊轉送原始位元組，stdout 與 stderr 各自輸出到對應的串流
    let mut out = std::io::stdout();
    let mut err = std::io::stderr();
    while let Some(line) = lines.recv().await {
        forward_line(&line, combined, &mut out, &mut err)?;
    }

    let captured = handle
        .await
        .map_err(|e| TourError::IoError(std::io::Error::other(e)))??;

    tracing::info!(
        "✅ Child finished with {} ({} bytes stdout, {} bytes stderr)",
        captured.status,
        captured.stdout.len(),
        captured.stderr.len()
    );

    // 被 signal 終止時照 shell 慣例回傳 128 + signal
    Ok(captured
        .exit_code()
        .or_else(|| captured.signal().map(|sig| 128 + sig))
        .unwrap_or(1))
}

/// 不經過 UTF-8 轉換，子行程寫什麼就輸出什麼
fn forward_line<O: Write, E: Write>(
    line: &OutputLine,
    combined: bool,
    out: &mut O,
    err: &mut E,
) -> std::io::Result<()> {
    match line.source {
        StreamSource::Stderr if !combined => {
            err.write_all(&line.raw)?;
            err.flush()
        }
        _ => {
            out.write_all(&line.raw)?;
            out.flush()
        }
    }
}

fn demo_router(settings: &Settings) -> Router {
    let mut router = Router::new()
        .route("/", HomeHandler::new("Welcome to the home page!\n"))
        .route("/hello", TextHandler::new("Hello, world!\n"))
        .route("/count", CountHandler::default())
        .route("/resources", NotFoundHandler);

    if let Some(root) = settings.files_root() {
        tracing::info!("📁 Serving {} under /files/", root);
        router = router.route("/files/", StripPrefix::new("/files/", FileServer::new(root)));
    }
    router
}

async fn serve(settings: &Settings) -> stdlib_tour::Result<()> {
    validation::validate_socket_addr("server.addr", settings.server_addr())?;
    if let Some(root) = settings.files_root() {
        validation::validate_directory("server.files_root", root)?;
    }

    let listener = http_server::bind(settings.server_addr()).await?;
    let router = Arc::new(demo_router(settings));

    http_server::serve(listener, router, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("❌ Failed to listen for Ctrl-C: {}", e);
        }
    })
    .await
}

async fn fetch(url: &str) -> stdlib_tour::Result<i32> {
    let url = validation::validate_url("url", url)?;

    let client = HttpClient::new();
    let fetched = client.get(url.as_str()).await?;

    println!("status: {}", fetched.status);
    println!("content-type: {}", fetched.content_type.as_deref().unwrap_or("-"));
    println!();
    std::io::stdout().write_all(&fetched.body)?;

    if !fetched.is_success() {
        return Err(TourError::HttpStatus {
            status: fetched.status,
            url: url.to_string(),
        });
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(source: StreamSource, raw: &[u8]) -> OutputLine {
        OutputLine {
            source,
            line: String::from_utf8_lossy(raw).into_owned(),
            raw: raw.to_vec(),
        }
    }

    #[test]
    fn test_forward_line_keeps_exact_bytes() {
        let mut out = Vec::new();
        let mut err = Vec::new();

        forward_line(&line(StreamSource::Stdout, b"crlf\r\n"), false, &mut out, &mut err).unwrap();
        forward_line(&line(StreamSource::Stderr, b"oops\n"), false, &mut out, &mut err).unwrap();
        forward_line(&line(StreamSource::Stdout, b"abc\xff"), false, &mut out, &mut err).unwrap();

        // 不合法的 UTF-8、CRLF、最後沒有換行都原樣保留
        assert_eq!(out, b"crlf\r\nabc\xff");
        assert_eq!(err, b"oops\n");
    }

    #[test]
    fn test_forward_line_combined_goes_to_stdout() {
        let mut out = Vec::new();
        let mut err = Vec::new();

        forward_line(&line(StreamSource::Stdout, b"1\n"), true, &mut out, &mut err).unwrap();
        forward_line(&line(StreamSource::Stderr, b"2\n"), true, &mut out, &mut err).unwrap();

        assert_eq!(out, b"1\n2\n");
        assert!(err.is_empty());
    }
}
