use bytes::BytesMut;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_stream::StreamExt;
use tokio_util::codec::{Decoder, FramedRead};

type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Unpin + Sync + Send>>>;

/// Lines longer than this are forwarded in pieces.
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Destination for a child's output stream.
///
/// Cloning shares the underlying writer, so several children can write to the
/// supervisor's stdout without interleaving inside a line.
#[derive(Clone)]
pub struct OutputSink(SharedWriter);

impl OutputSink {
    pub fn new(writer: Box<dyn AsyncWrite + Unpin + Sync + Send>) -> Self {
        OutputSink(Arc::new(Mutex::new(writer)))
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(tokio::io::stdout()))
    }

    pub fn stderr() -> Self {
        Self::new(Box::new(tokio::io::stderr()))
    }

    /// In-memory sink whose contents can be read back through the returned handle.
    pub fn capture() -> (Self, CapturedOutput) {
        let captured = CapturedOutput::default();
        (Self::new(Box::new(captured.clone())), captured)
    }

    /// Write one already-decorated record and flush it.
    pub async fn write_record(&self, record: &[u8]) -> io::Result<()> {
        let mut writer = self.0.lock().await;
        writer.write_all(record).await?;
        writer.flush().await
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

/// Shared byte buffer backing [`OutputSink::capture`].
#[derive(Clone, Default)]
pub struct CapturedOutput(Arc<std::sync::Mutex<Vec<u8>>>);

impl CapturedOutput {
    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }
}

impl AsyncWrite for CapturedOutput {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Splits a byte stream on `\n`, keeping raw bytes and the terminator.
#[derive(Debug, Default)]
struct LineCodec {
    next_index: usize,
}

impl Decoder for LineCodec {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let newline = src[self.next_index..]
            .iter()
            .position(|b| *b == b'\n')
            .map(|offset| self.next_index + offset);

        match newline {
            Some(index) => {
                self.next_index = 0;
                Ok(Some(src.split_to(index + 1)))
            }
            None if src.len() >= MAX_LINE_LENGTH => {
                self.next_index = 0;
                Ok(Some(src.split_to(src.len())))
            }
            None => {
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if src.is_empty() {
            Ok(None)
        } else {
            Ok(Some(src.split_to(src.len())))
        }
    }
}

/// Copy `io` into `out` line by line, prefixing every line with `label | `.
///
/// Returns when `io` reaches end of stream. A trailing partial line is
/// terminated with a newline so the next record starts on a fresh line.
pub async fn pump_lines<R: AsyncRead + Unpin>(
    io: R,
    label: &str,
    out: OutputSink,
) -> io::Result<()> {
    let mut frames = FramedRead::with_capacity(io, LineCodec::default(), 1024);
    let prefix = format!("{label} | ");

    while let Some(frame) = frames.next().await {
        let line = frame?;
        let mut record = Vec::with_capacity(prefix.len() + line.len() + 1);
        record.extend_from_slice(prefix.as_bytes());
        record.extend_from_slice(&line);
        if !line.ends_with(b"\n") {
            record.push(b'\n');
        }
        out.write_record(&record).await?;
    }

    Ok(())
}
