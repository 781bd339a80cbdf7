use chrono::{Local, Utc};
use std::fmt;
use std::io;
use std::ops::BitOr;
use std::sync::{Arc, Mutex};
use tracing::{Dispatch, Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_cli_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("stdlib_tour=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stdlib_tour=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(io::stderr)
                .compact(),
        )
        .init();
}

/// 給 log 收集系統用的 JSON 格式
pub fn init_json_logger() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stdlib_tour=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(io::stderr)
                .json(),
        )
        .init();
}

/// 每行 header 要包含哪些欄位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogFlags(u32);

impl LogFlags {
    pub const NONE: LogFlags = LogFlags(0);
    /// 2009/01/23
    pub const DATE: LogFlags = LogFlags(1);
    /// 01:23:23
    pub const TIME: LogFlags = LogFlags(1 << 1);
    /// 01:23:23.123123, implies TIME
    pub const MICROSECONDS: LogFlags = LogFlags(1 << 2);
    /// /a/b/c/d.rs:23
    pub const LONG_FILE: LogFlags = LogFlags(1 << 3);
    /// d.rs:23, overrides LONG_FILE
    pub const SHORT_FILE: LogFlags = LogFlags(1 << 4);
    pub const UTC: LogFlags = LogFlags(1 << 5);
    /// 前綴放在訊息前面，而不是行首
    pub const MSG_PREFIX: LogFlags = LogFlags(1 << 6);
    pub const STD: LogFlags = LogFlags(Self::DATE.0 | Self::TIME.0);

    pub fn contains(self, other: LogFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for LogFlags {
    type Output = LogFlags;

    fn bitor(self, rhs: LogFlags) -> LogFlags {
        LogFlags(self.0 | rhs.0)
    }
}

/// 共用的記憶體 buffer，同時實作 `io::Write` 與 `MakeWriter`
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer(Arc<Mutex<Vec<u8>>>);

impl CaptureBuffer {
    pub fn contents(&self) -> String {
        let guard = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&guard).into_owned()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl io::Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CaptureBuffer {
    type Writer = CaptureBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// `prefix date time file:line: message`
struct LineFormat {
    prefix: String,
    flags: LogFlags,
}

impl LineFormat {
    fn write_header(&self, writer: &mut Writer<'_>, event: &Event<'_>) -> fmt::Result {
        let flags = self.flags;
        if !flags.contains(LogFlags::MSG_PREFIX) {
            writer.write_str(&self.prefix)?;
        }

        let wants_time = flags.contains(LogFlags::TIME) || flags.contains(LogFlags::MICROSECONDS);
        if flags.contains(LogFlags::DATE) || wants_time {
            let mut pattern = String::new();
            if flags.contains(LogFlags::DATE) {
                pattern.push_str("%Y/%m/%d ");
            }
            if wants_time {
                pattern.push_str("%H:%M:%S");
                if flags.contains(LogFlags::MICROSECONDS) {
                    pattern.push_str("%.6f");
                }
                pattern.push(' ');
            }

            if flags.contains(LogFlags::UTC) {
                write!(writer, "{}", Utc::now().format(&pattern))?;
            } else {
                write!(writer, "{}", Local::now().format(&pattern))?;
            }
        }

        if flags.contains(LogFlags::SHORT_FILE) || flags.contains(LogFlags::LONG_FILE) {
            let metadata = event.metadata();
            let mut file = metadata.file().unwrap_or("???");
            if flags.contains(LogFlags::SHORT_FILE) {
                file = file.rsplit('/').next().unwrap_or(file);
            }
            write!(writer, "{}:{}: ", file, metadata.line().unwrap_or(0))?;
        }

        if flags.contains(LogFlags::MSG_PREFIX) {
            writer.write_str(&self.prefix)?;
        }
        Ok(())
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        self.write_header(&mut writer, event)?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// 把事件寫進記憶體的 logger，不會動到全域 subscriber。
///
/// ```ignore
/// let logger = CaptureLogger::new("logger: ", LogFlags::SHORT_FILE);
/// logger.in_scope(|| tracing::info!("Hello, log file!"));
/// // logger: logger.rs:42: Hello, log file!
/// ```
pub struct CaptureLogger {
    dispatch: Dispatch,
    buffer: CaptureBuffer,
}

impl CaptureLogger {
    pub fn new(prefix: impl Into<String>, flags: LogFlags) -> Self {
        let buffer = CaptureBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(buffer.clone())
            .event_format(LineFormat {
                prefix: prefix.into(),
                flags,
            })
            .finish();

        Self {
            dispatch: Dispatch::new(subscriber),
            buffer,
        }
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// 在這個 logger 底下執行 `f`
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    pub fn buffer(&self) -> &CaptureBuffer {
        &self.buffer
    }

    pub fn contents(&self) -> String {
        self.buffer.contents()
    }
}
